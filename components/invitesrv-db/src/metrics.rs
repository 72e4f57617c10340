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

//! Centralized definition of all datastore metrics that we wish to track.

use dogstatsd::{Client,
                Options};
use std::{borrow::Cow,
          env,
          sync::{mpsc::{channel,
                        Receiver,
                        Sender},
                 Mutex,
                 OnceLock},
          thread};

// Statsd application name
pub const APP_NAME: &str = "invitesrv";

// Statsd listener address
pub const STATS_ENV: &str = "INVITESRV_STATS_ADDR";

/// Metric identifiers will usually be static `str`s, but some may
/// need to be dynamically-generated `String`s. With a `Cow`, we can
/// accept either.
pub type MetricId = Cow<'static, str>;

pub trait Metric {
    /// Generate the metric name to be used
    fn id(&self) -> MetricId;
}

pub trait CounterMetric: Metric {
    /// Increment the metric by one
    fn increment(&self) {
        if let Some(sender) = sender() {
            match sender.lock() {
                Ok(tx) => {
                    if let Err(e) = tx.send((MetricOperation::Increment, self.id())) {
                        error!("Failed to increment counter, error: {:?}", e);
                    }
                }
                Err(e) => error!("Metric sender lock poisoned, error: {:?}", e),
            }
        }
    }
}

pub enum Counter {
    DBCall,
    InvitationAccept,
    InvitationCreate,
}

impl CounterMetric for Counter {}

impl Metric for Counter {
    fn id(&self) -> MetricId {
        match *self {
            Counter::DBCall => "db-call".into(),
            Counter::InvitationAccept => "invitation.accept".into(),
            Counter::InvitationCreate => "invitation.create".into(),
        }
    }
}

// Implementation details
////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy)]
enum MetricOperation {
    Increment,
}

type MetricTuple = (MetricOperation, MetricId);

static SENDER: OnceLock<Option<Mutex<Sender<MetricTuple>>>> = OnceLock::new();

fn sender() -> Option<&'static Mutex<Sender<MetricTuple>>> {
    SENDER.get_or_init(init).as_ref()
}

// One-time initialization of the metrics sender; disabled entirely
// when no statsd listener address is configured.
fn init() -> Option<Mutex<Sender<MetricTuple>>> {
    let addr = env::var(STATS_ENV).ok()?;
    let (tx, rx) = channel::<MetricTuple>();
    thread::Builder::new().name("metrics".to_string())
                          .spawn(move || receive(&addr, &rx))
                          .expect("couldn't start metrics thread");
    Some(Mutex::new(tx))
}

fn receive(addr: &str, rx: &Receiver<MetricTuple>) {
    let client = match statsd_client(addr) {
        Some(client) => client,
        None => return,
    };
    const NO_TAGS: [&str; 0] = [];
    while let Ok((op, id)) = rx.recv() {
        debug!("Received metric: {:?} {}", op, id);
        match op {
            MetricOperation::Increment => {
                if let Err(e) = client.incr(id.as_ref(), &NO_TAGS) {
                    error!("Could not increment metric {}; err = {:?}", id, e);
                }
            }
        }
    }
}

fn statsd_client(addr: &str) -> Option<Client> {
    info!("Creating statsd client sending to: {}", addr);
    match Client::new(Options::new("0.0.0.0:0", addr, APP_NAME)) {
        Ok(client) => Some(client),
        Err(e) => {
            error!("Error creating statsd client: {:?}", e);
            None
        }
    }
}
