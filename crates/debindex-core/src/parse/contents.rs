// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Parser for `Contents-<arch>` files. */

use {
    crate::error::Result,
    std::io::BufRead,
};

/// Parse a `Contents` file from `reader`, invoking `emit(path, package)` for
/// every `(path, package)` pair found.
///
/// Each non-empty line is split on whitespace; the first field is the
/// path relative to the archive root (stored with a leading `/`), and the
/// last field is a comma-separated list of package references. Only the
/// final `/`-separated component of each reference is kept, so
/// `utils/zfs-auto-snapshot` and a bare `zfs-auto-snapshot` both yield
/// `zfs-auto-snapshot`. Lines with fewer than two whitespace-separated
/// fields are skipped.
pub fn parse_contents(
    reader: impl BufRead,
    mut emit: impl FnMut(&str, &str) -> Result<()>,
) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        let fields = line.split_whitespace().collect::<Vec<_>>();

        if fields.len() < 2 {
            continue;
        }

        let path = format!("/{}", fields[0]);
        let refs = fields[fields.len() - 1];

        for package_ref in refs.split(',') {
            let package = package_ref
                .rsplit('/')
                .next()
                .unwrap_or(package_ref);
            emit(&path, package)?;
        }
    }

    Ok(())
}
