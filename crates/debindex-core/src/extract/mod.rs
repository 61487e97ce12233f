// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Streaming `.deb` extraction.

A `.deb` is an `ar` archive with members `debian-binary`, `control.tar.*`,
and `data.tar.*` in that order. This module streams past the first two
members, transparently decompresses the `data.tar.*` member, and hands
each inner tar entry to a caller-supplied sink.
*/

use {
    crate::error::{DebIndexError, Result},
    std::io::Read,
};

/// Metadata for a single entry inside the inner `data.tar.*` archive.
#[derive(Clone, Debug)]
pub struct FileEntry {
    /// Archive-relative path, as recorded (typically with a leading `./`).
    pub path: String,
    pub uid: u64,
    pub gid: u64,
    pub mode: u32,
    pub mtime: u64,
    pub is_dir: bool,
}

/// Stream every entry of the `data.tar.*` member of the `.deb` archive read
/// from `r`, invoking `sink(entry, reader)` once per entry in upstream
/// order.
///
/// The sink must fully consume `reader` before returning; the next
/// iteration is free to invalidate it. A missing `data.tar.*` member,
/// unrecognized inner compression, or any I/O failure is fatal.
pub fn extract_deb(r: impl Read, mut sink: impl FnMut(FileEntry, &mut dyn Read) -> Result<()>) -> Result<()> {
    let mut archive = ar::Archive::new(r);

    while let Some(entry) = archive.next_entry() {
        let mut entry = entry.map_err(DebIndexError::Io)?;
        let name = String::from_utf8(entry.header().identifier().to_vec())
            .map_err(|e| DebIndexError::BadMemberName(e.to_string()))?;

        if name.starts_with("data") {
            return extract_data_member(&name, &mut entry, sink);
        }
    }

    Err(DebIndexError::MissingDataMember)
}

fn extract_data_member(
    name: &str,
    reader: &mut impl Read,
    mut sink: impl FnMut(FileEntry, &mut dyn Read) -> Result<()>,
) -> Result<()> {
    let inner: Box<dyn Read> = if name.ends_with(".tar.gz") || name.ends_with(".tar.gzip") {
        Box::new(flate2::read::GzDecoder::new(reader))
    } else if name.ends_with(".tar.xz") {
        Box::new(xz2::read::XzDecoder::new(reader))
    } else if name.ends_with(".tar.zst") {
        Box::new(zstd::stream::read::Decoder::new(reader)?)
    } else if name.ends_with(".tar.bz2") {
        Box::new(bzip2::read::BzDecoder::new(reader))
    } else if name.ends_with(".tar") {
        Box::new(reader)
    } else {
        return Err(DebIndexError::UnknownCompression(name.to_string()));
    };

    let mut tar = tar::Archive::new(inner);

    for entry in tar.entries()? {
        let mut entry = entry?;
        let header = entry.header().clone();

        let path = entry
            .path()?
            .to_str()
            .ok_or_else(|| DebIndexError::BadMemberName(format!("{:?}", entry.path())))?
            .to_string();

        let file_entry = FileEntry {
            path,
            uid: header.uid()?,
            gid: header.gid()?,
            mode: header.mode()?,
            mtime: header.mtime()?,
            is_dir: header.entry_type().is_dir(),
        };

        sink(file_entry, &mut entry)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_test_deb(tar_member_name: &str, tar_bytes: Vec<u8>) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut builder = ar::Builder::new(&mut out);
            let mut header = ar::Header::new(b"debian-binary".to_vec(), 4);
            header.set_mode(0o644);
            builder.append(&header, "2.0\n".as_bytes()).unwrap();

            let mut header = ar::Header::new(tar_member_name.as_bytes().to_vec(), tar_bytes.len() as u64);
            header.set_mode(0o644);
            builder.append(&header, tar_bytes.as_slice()).unwrap();
        }
        out
    }

    fn build_plain_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *content).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn extracts_plain_tar_data_member_in_order() {
        let tar_bytes = build_plain_tar(&[("./etc/x", b"one"), ("./usr/bin/y", b"two")]);
        let deb = build_test_deb("data.tar", tar_bytes);

        let mut seen = Vec::new();
        extract_deb(deb.as_slice(), |entry, reader| {
            let mut content = Vec::new();
            reader.read_to_end(&mut content)?;
            seen.push((entry.path, content));
            Ok(())
        })
        .unwrap();

        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "./etc/x");
        assert_eq!(seen[0].1, b"one");
        assert_eq!(seen[1].0, "./usr/bin/y");
        assert_eq!(seen[1].1, b"two");
    }

    #[test]
    fn gzip_data_member_is_decompressed() {
        let tar_bytes = build_plain_tar(&[("./a", b"hello")]);
        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        gz.write_all(&tar_bytes).unwrap();
        let gz_bytes = gz.finish().unwrap();

        let deb = build_test_deb("data.tar.gz", gz_bytes);

        let mut seen = Vec::new();
        extract_deb(deb.as_slice(), |entry, reader| {
            let mut content = Vec::new();
            reader.read_to_end(&mut content)?;
            seen.push((entry.path, content));
            Ok(())
        })
        .unwrap();

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, b"hello");
    }

    #[test]
    fn missing_data_member_is_an_error() {
        let mut out = Vec::new();
        {
            let mut builder = ar::Builder::new(&mut out);
            let mut header = ar::Header::new(b"debian-binary".to_vec(), 4);
            header.set_mode(0o644);
            builder.append(&header, "2.0\n".as_bytes()).unwrap();
        }

        let err = extract_deb(out.as_slice(), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, DebIndexError::MissingDataMember));
    }

    #[test]
    fn unknown_compression_is_an_error() {
        let deb = build_test_deb("data.tar.lz4", vec![0u8; 4]);
        let err = extract_deb(deb.as_slice(), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, DebIndexError::UnknownCompression(_)));
    }
}
