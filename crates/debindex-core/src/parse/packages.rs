// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Parser for `Packages` files.

RFC 822-style stanzas separated by blank lines. Only the four fields this
system cares about (`Package`, `Version`, `Filename`, `Depends`) are
extracted; everything else in a stanza is ignored.
*/

use {
    crate::{error::Result, model::PackageInfo},
    std::io::BufRead,
};

/// Line buffer capacity large enough to accommodate a `Depends:` field with
/// hundreds of alternatives without reallocating on every line.
const LINE_BUFFER_CAPACITY: usize = 1024 * 1024;

#[derive(Default)]
struct StanzaBuilder {
    package: Option<String>,
    version: Option<String>,
    filename: Option<String>,
    depends: Option<String>,
}

impl StanzaBuilder {
    fn is_empty(&self) -> bool {
        self.package.is_none()
            && self.version.is_none()
            && self.filename.is_none()
            && self.depends.is_none()
    }

    fn set_field(&mut self, key: &str, value: &str) {
        // First occurrence within a stanza wins; later duplicates are ignored.
        let slot = match key {
            "Package" => &mut self.package,
            "Version" => &mut self.version,
            "Filename" => &mut self.filename,
            "Depends" => &mut self.depends,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    fn finish(self, arch: &str) -> Option<PackageInfo> {
        if self.is_empty() {
            return None;
        }

        let depends = self
            .depends
            .map(|d| d.split(", ").map(|s| s.to_string()).collect())
            .unwrap_or_default();

        Some(PackageInfo {
            package: self.package.unwrap_or_default(),
            version: self.version.unwrap_or_default(),
            arch: arch.to_string(),
            filename: self.filename.unwrap_or_default(),
            depends,
        })
    }
}

/// Parse a `Packages` file from `reader`, invoking `emit(PackageInfo)` once
/// per stanza.
///
/// A stanza is emitted both on a blank line and at end-of-stream, so the
/// final stanza of a file lacking a trailing blank line is not silently
/// dropped.
pub fn parse_packages(
    reader: impl BufRead,
    arch: &str,
    mut emit: impl FnMut(PackageInfo) -> Result<()>,
) -> Result<()> {
    let mut builder = StanzaBuilder::default();
    let mut line = String::with_capacity(LINE_BUFFER_CAPACITY);
    let mut reader = reader;

    loop {
        line.clear();
        let read = std::io::BufRead::read_line(&mut reader, &mut line)?;
        if read == 0 {
            if let Some(info) = builder.finish(arch) {
                emit(info)?;
            }
            return Ok(());
        }

        let trimmed = line.trim_end_matches(['\n', '\r']);

        if trimmed.is_empty() {
            let previous = std::mem::take(&mut builder);
            if let Some(info) = previous.finish(arch) {
                emit(info)?;
            }
            continue;
        }

        // Continuation lines (leading whitespace) belong to the previous
        // field's folded/multiline value; this system has no use for them
        // since it only tracks single-line fields.
        if trimmed.starts_with([' ', '\t']) {
            continue;
        }

        if let Some((key, value)) = trimmed.split_once(':') {
            builder.set_field(key.trim(), value.trim());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str) -> Vec<PackageInfo> {
        let mut out = Vec::new();
        parse_packages(input.as_bytes(), "amd64", |info| {
            out.push(info);
            Ok(())
        })
        .unwrap();
        out
    }

    #[test]
    fn single_stanza_with_trailing_blank_line() {
        let input = "Package: xfig\nVersion: 3.2.8b-2+b2\nFilename: pool/main/x/xfig/xfig_3.2.8b-2+b2_amd64.deb\nDepends: libc6, libx11-6\n\n";
        let infos = collect(input);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].package, "xfig");
        assert_eq!(infos[0].version, "3.2.8b-2+b2");
        assert_eq!(
            infos[0].filename,
            "pool/main/x/xfig/xfig_3.2.8b-2+b2_amd64.deb"
        );
        assert_eq!(infos[0].depends, vec!["libc6", "libx11-6"]);
    }

    #[test]
    fn last_stanza_without_trailing_newline_is_still_emitted() {
        let input = "Package: a\nVersion: 1\n\nPackage: b\nVersion: 2";
        let infos = collect(input);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[1].package, "b");
        assert_eq!(infos[1].version, "2");
    }

    #[test]
    fn first_occurrence_of_a_field_wins() {
        let input = "Package: a\nVersion: 1\nVersion: 2\n\n";
        let infos = collect(input);
        assert_eq!(infos[0].version, "1");
    }

    #[test]
    fn stanza_without_depends_yields_empty_vec() {
        let input = "Package: a\nVersion: 1\n\n";
        let infos = collect(input);
        assert!(infos[0].depends.is_empty());
    }

    #[test]
    fn blank_lines_between_stanzas_do_not_emit_empty_records() {
        let input = "\n\nPackage: a\nVersion: 1\n\n\n\n";
        let infos = collect(input);
        assert_eq!(infos.len(), 1);
    }
}
