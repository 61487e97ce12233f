// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Streaming parsers for the three upstream text formats. */

pub mod contents;
pub mod packages;
pub mod popularity;

pub use contents::parse_contents;
pub use packages::parse_packages;
pub use popularity::parse_popularity;
