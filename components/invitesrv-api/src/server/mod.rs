// Copyright (c) 2016 Chef Software Inc. and/or applicable contributors
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

pub mod authorize;
pub mod error;
pub mod framework;
pub mod handlers;
pub mod helpers;
pub mod resources;
pub mod services;

use std::time::Duration;

use actix_web::{http::StatusCode,
                middleware::{from_fn,
                             Logger},
                web::{self,
                      Data,
                      ServiceConfig},
                App,
                HttpResponse,
                HttpServer};

use crate::{config::{Config,
                     GatewayCfg},
            db::DataStore};

use self::{error::Result,
           framework::middleware::authentication_middleware,
           resources::{origins::Origins,
                       user::User},
           services::account_sync::AccountSyncClient};

// Application state
pub struct AppState {
    pub config:       Config,
    pub db:           DataStore,
    pub account_sync: AccountSyncClient,
}

impl AppState {
    pub fn new(config: &Config, db: &DataStore, account_sync: &AccountSyncClient) -> AppState {
        AppState { config:       config.clone(),
                   db:           db.clone(),
                   account_sync: account_sync.clone(), }
    }
}

/// Endpoint for determining availability of the service.
///
/// Returns a status 200 on success. Any non-200 responses are an outage or a partial outage.
pub async fn status() -> HttpResponse { HttpResponse::new(StatusCode::OK) }

// Route registration, shared between `run` and the test harness
pub fn routes(cfg: &mut ServiceConfig) {
    Origins::register(cfg);
    User::register(cfg);
    cfg.route("/status", web::get().to(status))
       .route("/status", web::head().to(status));
}

pub async fn run(config: Config) -> Result<()> {
    let db = DataStore::new(&config.datastore);
    db.setup().map_err(error::Error::DbError)?;
    let account_sync = AccountSyncClient::start(&config.accountsrv);

    info!("invitesrv listening on {}:{}",
          config.listen_addr(),
          config.listen_port());

    let cfg = config.clone();
    HttpServer::new(move || {
        let app_state = AppState::new(&cfg, &db, &account_sync);

        App::new().app_data(Data::new(app_state))
                  .wrap(from_fn(authentication_middleware))
                  .wrap(Logger::default().exclude("/status"))
                  .configure(routes)
    }).workers(config.handler_count())
      .keep_alive(Duration::from_secs(config.http.keep_alive))
      .bind((config.http.listen, config.http.port))?
      .run()
      .await?;

    Ok(())
}
