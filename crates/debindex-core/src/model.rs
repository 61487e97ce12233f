// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Data types shared by the index, parsers, and query surface. */

/// Metadata for a single package entry, as carried by a `Packages` file.
///
/// Mirrors the subset of a binary package control stanza this system cares
/// about: the upstream-relative filename, the version, and the raw
/// dependency list. Dependencies are recorded for display but never used to
/// drive a query.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PackageInfo {
    pub package: String,
    pub version: String,
    pub arch: String,
    pub filename: String,
    pub depends: Vec<String>,
}

impl PackageInfo {
    /// Whether this is the zero value returned for an unknown package.
    pub fn is_empty(&self) -> bool {
        self.package.is_empty() && self.version.is_empty() && self.filename.is_empty()
    }
}
