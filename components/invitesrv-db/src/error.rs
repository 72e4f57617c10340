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

use std::{error,
          fmt,
          result};

use crate::models::invitations::InvitationStatus;

#[derive(Debug, PartialEq)]
pub enum Error {
    /// A live record already exists for the requested key.
    Conflict,
    DieselError(diesel::result::Error),
    /// Attempted invitation status change that the state machine forbids.
    InvalidTransition(InvitationStatus, InvitationStatus),
    Migration(diesel_migrations::RunMigrationsError),
    NotFound,
    /// The backing store could not be reached; safe to retry.
    Unavailable,
}

pub type Result<T> = result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match *self {
            Error::Conflict => "Entity conflict".to_string(),
            Error::DieselError(ref e) => format!("{}", e),
            Error::InvalidTransition(ref from, ref to) => {
                format!("Invalid invitation transition from {} to {}", from, to)
            }
            Error::Migration(ref e) => format!("{}", e),
            Error::NotFound => "Entity not found".to_string(),
            Error::Unavailable => "Datastore unavailable".to_string(),
        };
        write!(f, "{}", msg)
    }
}

impl error::Error for Error {}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Error {
        match err {
            diesel::result::Error::NotFound => Error::NotFound,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => Error::Conflict,
            e => Error::DieselError(e),
        }
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(_: diesel::r2d2::PoolError) -> Error { Error::Unavailable }
}

impl From<diesel_migrations::RunMigrationsError> for Error {
    fn from(err: diesel_migrations::RunMigrationsError) -> Error { Error::Migration(err) }
}
