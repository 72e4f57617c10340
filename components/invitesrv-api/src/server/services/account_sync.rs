// Copyright (c) 2016-2017 Chef Software Inc. and/or applicable contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pushes accepted-membership events to the external account service.
//!
//! Delivery is best effort and fully decoupled from the request path:
//! `notify` only enqueues, and a background task drains the queue with
//! retries. The account service view of memberships is therefore
//! eventually consistent with ours.

use std::{cmp,
          time::Duration};

use tokio::sync::mpsc::{unbounded_channel,
                        UnboundedReceiver,
                        UnboundedSender};

use crate::config::AccountSyncCfg;

// Backoff exponent is clamped so long outages don't overflow the delay.
const BACKOFF_MAX_EXP: u32 = 6;
const BACKOFF_CAP_MS: u64 = 30_000;

/// A membership granted by an accepted invitation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MembershipEvent {
    pub account_id: i64,
    pub origin_id:  i64,
    pub origin:     String,
}

#[derive(Clone)]
pub struct AccountSyncClient {
    tx: UnboundedSender<MembershipEvent>,
}

impl AccountSyncClient {
    /// Spawn the delivery task on the current runtime and hand back the
    /// enqueue side.
    pub fn start(cfg: &AccountSyncCfg) -> Self {
        let (tx, rx) = unbounded_channel();
        actix_rt::spawn(worker(cfg.clone(), rx));
        AccountSyncClient { tx }
    }

    /// Queue an event for delivery. Never blocks and never fails the
    /// caller; a closed queue is only possible during shutdown.
    pub fn notify(&self, event: MembershipEvent) {
        if let Err(err) = self.tx.send(event) {
            warn!("Account sync queue closed, dropping event, err={}", err);
        }
    }
}

async fn worker(cfg: AccountSyncCfg, mut rx: UnboundedReceiver<MembershipEvent>) {
    let client = reqwest::Client::new();

    while let Some(event) = rx.recv().await {
        if !cfg.enabled {
            debug!("Account sync disabled, dropping event for account {}",
                   event.account_id);
            continue;
        }
        deliver(&cfg, &client, &event).await;
    }
}

async fn deliver(cfg: &AccountSyncCfg, client: &reqwest::Client, event: &MembershipEvent) {
    let url = format!("{}/accounts/{}/origins", cfg.url, event.account_id);

    for attempt in 1..=cfg.retry_limit {
        match client.post(&url).json(event).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!("Synced origin {} membership for account {}",
                       event.origin, event.account_id);
                return;
            }
            Ok(resp) => {
                warn!("Account sync attempt {}/{} for account {} got status {}",
                      attempt,
                      cfg.retry_limit,
                      event.account_id,
                      resp.status());
            }
            Err(err) => {
                warn!("Account sync attempt {}/{} for account {} failed, err={}",
                      attempt, cfg.retry_limit, event.account_id, err);
            }
        }

        if attempt < cfg.retry_limit {
            actix_rt::time::sleep(backoff_delay(attempt, cfg.retry_base_delay_ms)).await;
        }
    }

    error!("Giving up syncing origin {} membership for account {} after {} attempts",
           event.origin, event.account_id, cfg.retry_limit);
}

fn backoff_delay(attempt: usize, base_ms: u64) -> Duration {
    let exp = cmp::min((attempt - 1) as u32, BACKOFF_MAX_EXP);
    let delay = base_ms.saturating_mul(1 << exp);
    Duration::from_millis(cmp::min(delay, BACKOFF_CAP_MS))
}
