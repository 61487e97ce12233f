// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Resolution of the index's on-disk location. */

use {
    crate::error::{DebIndexError, Result},
    std::path::PathBuf,
};

const DEFAULT_FILENAME: &str = ".godebian.sqlite";

/// The default index path, `<home>/.godebian.sqlite`.
///
/// Callers that want a different location should bypass this and pass an
/// explicit path to `SqliteIndex::open`.
pub fn default_index_path() -> Result<PathBuf> {
    let home = directories::UserDirs::new().ok_or(DebIndexError::NoHomeDirectory)?;
    Ok(home.home_dir().join(DEFAULT_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_ends_with_expected_filename() {
        let path = default_index_path().unwrap();
        assert_eq!(path.file_name().unwrap(), DEFAULT_FILENAME);
    }
}
