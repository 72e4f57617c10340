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

use actix_web::{http::StatusCode,
                HttpResponse,
                ResponseError};
use std::{error,
          fmt,
          io,
          result};

use crate::db;

#[derive(Debug)]
pub enum Error {
    Authentication,
    Authorization,
    DbError(db::error::Error),
    IO(io::Error),
    NotFound,
}

pub type Result<T> = result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match *self {
            Error::Authentication => "User is not authenticated".to_string(),
            Error::Authorization => "User is not authorized to perform operation".to_string(),
            Error::DbError(ref e) => format!("{}", e),
            Error::IO(ref e) => format!("{}", e),
            Error::NotFound => "Entity not found".to_string(),
        };
        write!(f, "{}", msg)
    }
}

impl error::Error for Error {}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Authentication => StatusCode::UNAUTHORIZED,
            Error::Authorization => StatusCode::FORBIDDEN,
            Error::DbError(ref e) => db_err_to_http(e),
            Error::IO(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse { HttpResponse::new(self.status_code()) }
}

impl From<Error> for HttpResponse {
    fn from(err: Error) -> HttpResponse { HttpResponse::new(err.status_code()) }
}

fn db_err_to_http(err: &db::error::Error) -> StatusCode {
    match err {
        db::error::Error::Conflict => StatusCode::CONFLICT,
        db::error::Error::DieselError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        db::error::Error::InvalidTransition(..) => StatusCode::CONFLICT,
        db::error::Error::Migration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        db::error::Error::NotFound => StatusCode::NOT_FOUND,
        db::error::Error::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// From handlers - these make application level error handling cleaner

impl From<db::error::Error> for Error {
    fn from(err: db::error::Error) -> Error { Error::DbError(err) }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self { Error::IO(err) }
}
