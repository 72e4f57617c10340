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

use actix_web::{body::{BoxBody,
                       MessageBody},
                dev::{ServiceRequest,
                      ServiceResponse},
                http::header,
                middleware::Next,
                web::Data,
                Error,
                HttpMessage,
                HttpResponse};

use crate::{db::models::account::Session,
            server::AppState};

// Resolves a bearer token to a Session and stashes it in the request
// extensions. Requests without an Authorization header pass through
// unauthenticated; the `authorize_session` check in each handler decides
// whether that is acceptable for the route.
pub async fn authentication_middleware(req: ServiceRequest,
                                       next: Next<impl MessageBody + 'static>)
                                       -> std::result::Result<ServiceResponse<BoxBody>, Error> {
    let token = match bearer_token(&req) {
        Ok(Some(token)) => token,
        Ok(None) => return Ok(next.call(req).await?.map_into_boxed_body()),
        Err(_) => {
            return Ok(req.into_response(HttpResponse::Unauthorized().finish()));
        }
    };

    let db = {
        let state = req.app_data::<Data<AppState>>()
                       .expect("request state")
                       .get_ref();
        state.db.clone()
    };

    match Session::from_token(&token, &db) {
        Ok(session) => {
            trace!("Authenticated request for {}", session.name);
            req.extensions_mut().insert::<Session>(session);
            Ok(next.call(req).await?.map_into_boxed_body())
        }
        Err(err) => {
            debug!("Failed to authenticate bearer token, err={}", err);
            Ok(req.into_response(HttpResponse::Unauthorized().finish()))
        }
    }
}

fn bearer_token(req: &ServiceRequest) -> std::result::Result<Option<String>, ()> {
    let hdr = match req.headers().get(header::AUTHORIZATION) {
        Some(hdr) => hdr,
        None => return Ok(None),
    };
    let hdr = hdr.to_str().map_err(|_| ())?;
    match hdr.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() => Ok(Some(token.to_string())),
        _ => Err(()),
    }
}
