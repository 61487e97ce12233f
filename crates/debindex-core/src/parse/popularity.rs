// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Parser for popularity-contest (`by_vote`/`by_inst`) files. */

use {
    crate::error::{DebIndexError, Result},
    std::io::BufRead,
};

/// Parse a popcon file from `reader`, invoking `emit(package, rank)` for
/// each data line.
///
/// Lines starting with `#` are comments and are skipped. A data line with
/// fewer than two whitespace-separated fields, or whose first field is not
/// a valid integer, is treated as a malformed upstream and returns an
/// error immediately.
pub fn parse_popularity(
    reader: impl BufRead,
    mut emit: impl FnMut(&str, i64) -> Result<()>,
) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields = trimmed.split_whitespace().collect::<Vec<_>>();
        if fields.len() < 2 {
            return Err(DebIndexError::PopularityParse(line));
        }

        let rank: i64 = fields[0]
            .parse()
            .map_err(|_| DebIndexError::PopularityParse(line.clone()))?;
        let package = fields[1];

        emit(package, rank)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str) -> Vec<(String, i64)> {
        let mut out = Vec::new();
        parse_popularity(input.as_bytes(), |package, rank| {
            out.push((package.to_string(), rank));
            Ok(())
        })
        .unwrap();
        out
    }

    #[test]
    fn comment_lines_are_skipped() {
        let out = collect("# rank package\n1 xfig 100 0\n");
        assert_eq!(out, vec![("xfig".to_string(), 1)]);
    }

    #[test]
    fn unparseable_rank_is_fatal() {
        let err = parse_popularity("notanumber xfig\n".as_bytes(), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, DebIndexError::PopularityParse(_)));
    }

    #[test]
    fn short_line_is_fatal() {
        let err = parse_popularity("1\n".as_bytes(), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, DebIndexError::PopularityParse(_)));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let out = collect("\n1 xfig\n\n2 yfig\n");
        assert_eq!(out, vec![("xfig".to_string(), 1), ("yfig".to_string(), 2)]);
    }
}
