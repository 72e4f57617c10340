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

//! Configuration for the origin invitation service

use std::{error,
          fmt,
          fs,
          net::{IpAddr,
                Ipv4Addr},
          path::Path};

use crate::db::config::DataStoreCfg;

pub trait GatewayCfg {
    /// Default number of worker threads to simultaneously handle HTTP requests.
    fn default_handler_count() -> usize { num_cpus::get() * 8 }

    /// Number of worker threads to simultaneously handle HTTP requests.
    fn handler_count(&self) -> usize { Self::default_handler_count() }

    fn listen_addr(&self) -> &IpAddr;

    fn listen_port(&self) -> u16;
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http:       HttpCfg,
    pub datastore:  DataStoreCfg,
    pub accountsrv: AccountSyncCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError(format!("{}", e)))?;
        Self::from_raw(&raw)
    }

    pub fn from_raw(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError(format!("{}", e)))
    }
}

impl GatewayCfg for Config {
    fn handler_count(&self) -> usize {
        self.http
            .handler_count
            .unwrap_or_else(Self::default_handler_count)
    }

    fn listen_addr(&self) -> &IpAddr { &self.http.listen }

    fn listen_port(&self) -> u16 { self.http.port }
}

#[derive(Debug)]
pub struct ConfigError(String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}

impl error::Error for ConfigError {}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HttpCfg {
    pub listen:        IpAddr,
    pub port:          u16,
    pub keep_alive:    u64,
    pub handler_count: Option<usize>,
}

impl Default for HttpCfg {
    fn default() -> Self {
        HttpCfg { listen:        IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                  port:          9636,
                  keep_alive:    60,
                  handler_count: None, }
    }
}

/// Settings for pushing membership changes to the external account
/// service.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AccountSyncCfg {
    pub enabled: bool,
    pub url: String,
    /// Delivery attempts per event before giving up.
    pub retry_limit: usize,
    /// Base delay for the exponential backoff between attempts.
    pub retry_base_delay_ms: u64,
}

impl Default for AccountSyncCfg {
    fn default() -> Self {
        AccountSyncCfg { enabled: true,
                         url: String::from("http://localhost:9638/v1"),
                         retry_limit: 5,
                         retry_base_delay_ms: 500, }
    }
}
