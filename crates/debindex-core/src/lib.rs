// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Incremental local index and retrieval for Debian/Ubuntu package
repositories.

Three pieces compose the public surface:

- [`index`] — the persistent, prepared-statement-backed store.
- [`refresh`] — pulls upstream `Contents`/`Packages`/popcon files through
  [`fetch`] and the [`parse`] module into the index, one area at a time.
- [`contents::Contents`] — the query surface consumed by callers, plus
  [`extract`] for pulling apart a `.deb`'s inner tar.
*/

pub mod config;
pub mod contents;
pub mod distro;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod index;
pub mod model;
pub mod parse;
pub mod refresh;

pub use {
    contents::Contents,
    distro::Distro,
    error::{DebIndexError, Result},
    index::{IndexHandle, SqliteIndex},
    model::PackageInfo,
};
