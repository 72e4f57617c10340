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

use actix_web::{web::Data,
                HttpRequest};

use crate::{db,
            server::AppState};

pub fn req_state(req: &HttpRequest) -> &AppState {
    req.app_data::<Data<AppState>>()
       .expect("request state")
       .get_ref()
}

/// Store calls that report `Unavailable` are retried a bounded number of
/// times before the error surfaces to the client.
pub const DB_RETRY_MAX: usize = 3;

pub fn with_retry<T, F>(mut op: F) -> db::error::Result<T>
    where F: FnMut() -> db::error::Result<T>
{
    let mut attempts = 0;
    loop {
        match op() {
            Err(db::error::Error::Unavailable) if attempts + 1 < DB_RETRY_MAX => {
                attempts += 1;
                warn!("Datastore unavailable, retrying (attempt {})", attempts);
            }
            other => return other,
        }
    }
}
