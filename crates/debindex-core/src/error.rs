// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use thiserror::Error;

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum DebIndexError {
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0:?}")]
    Reqwest(#[from] reqwest::Error),

    #[error("SQL error executing '{statement}': {source}")]
    Sql {
        statement: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("integer parsing error: {0:?}")]
    ParseInt(#[from] std::num::ParseIntError),

    #[error("fetch of {0} failed with HTTP status {1}")]
    UnexpectedStatus(String, reqwest::StatusCode),

    #[error("malformed popularity-contest line: {0}")]
    PopularityParse(String),

    #[error("unknown compression for deb data member: {0}")]
    UnknownCompression(String),

    #[error("deb archive is missing a data.tar.* member")]
    MissingDataMember,

    #[error("deb archive member is not valid UTF-8: {0}")]
    BadMemberName(String),

    #[error("unknown distribution: {0}")]
    UnknownDistro(String),

    #[error("could not determine home directory to place default index")]
    NoHomeDirectory,
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, DebIndexError>;

impl DebIndexError {
    /// Wrap a `rusqlite` error with the name of the statement that produced it.
    ///
    /// Named so a bubbled-up error identifies which prepared statement failed,
    /// the same diagnostic the reference implementation's `log.Fatalf` gave.
    pub fn sql(statement: &'static str, source: rusqlite::Error) -> Self {
        Self::Sql { statement, source }
    }
}
