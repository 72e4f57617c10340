// Copyright (c) 2018 Chef Software Inc. and/or applicable contributors
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

use actix_web::{HttpMessage,
                HttpRequest};

use crate::db::models::{account::Session,
                        origin::Origin};

use crate::server::{error::{Error,
                            Result},
                    helpers::req_state};

/// Pull the verified session off the request, optionally requiring
/// membership in an origin. An unknown origin is `NotFound`, which is
/// distinct from the `Authorization` refusal a non-member receives.
pub fn authorize_session(req: &HttpRequest, origin_opt: Option<&str>) -> Result<Session> {
    let session = match req.extensions().get::<Session>() {
        Some(session) => session.clone(),
        None => return Err(Error::Authentication),
    };

    if let Some(origin) = origin_opt {
        let state = req_state(req);
        Origin::get(origin, &state.db).map_err(Error::DbError)?;
        match Origin::check_membership(origin, session.id, &state.db).map_err(Error::DbError) {
            Ok(is_member) if is_member => (),
            Ok(_) => return Err(Error::Authorization),
            Err(err) => return Err(err),
        }
    }

    Ok(session)
}
