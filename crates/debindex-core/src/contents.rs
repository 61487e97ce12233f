// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The public query surface: `Contents`, bound to one distro/version and
backed by an [`IndexHandle`]. */

use {
    crate::{
        distro::{distro_key, Distro},
        error::Result,
        extract::{extract_deb, FileEntry},
        fetch::{FetchOutcome, Fetcher},
        index::IndexHandle,
        model::PackageInfo,
        refresh,
    },
    std::{io::Read, sync::Arc},
};

/// Bound to a single `(distro, version)`; refreshed at construction and
/// queried thereafter through an [`IndexHandle`].
pub struct Contents {
    index: Arc<dyn IndexHandle>,
    fetcher: Fetcher,
    distro: Distro,
    version: String,
    key: String,
}

impl Contents {
    /// Construct a handle bound to Debian `version`, running a refresh
    /// against upstream before returning.
    pub fn new_debian(version: impl Into<String>, index: Arc<dyn IndexHandle>) -> Result<Self> {
        Self::new(Distro::Debian, version, index)
    }

    /// Construct a handle bound to Ubuntu `version`, running a refresh
    /// against upstream before returning.
    pub fn new_ubuntu(version: impl Into<String>, index: Arc<dyn IndexHandle>) -> Result<Self> {
        Self::new(Distro::Ubuntu, version, index)
    }

    fn new(distro: Distro, version: impl Into<String>, index: Arc<dyn IndexHandle>) -> Result<Self> {
        let version = version.into();
        let key = distro_key(distro, &version);
        let fetcher = Fetcher::new();

        refresh::refresh(index.as_ref(), &fetcher, distro, &version)?;

        Ok(Self {
            index,
            fetcher,
            distro,
            version,
            key,
        })
    }

    /// Construct a handle without refreshing, for use against an
    /// already-populated index (tests, or a caller that manages refresh
    /// timing itself).
    pub fn from_index(distro: Distro, version: impl Into<String>, index: Arc<dyn IndexHandle>) -> Self {
        let version = version.into();
        let key = distro_key(distro, &version);
        Self {
            index,
            fetcher: Fetcher::new(),
            distro,
            version,
            key,
        }
    }

    /// Look up packages shipping `path` (absolute paths match exactly,
    /// bare names match by trailing path component) and deduplicate by
    /// the basename of each stored reference.
    pub fn search(&self, path: &str) -> Result<Vec<String>> {
        let rows = self.index.get_packages_for_path(&self.key, path)?;

        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for package_ref in rows {
            let name = package_ref
                .rsplit('/')
                .next()
                .unwrap_or(&package_ref)
                .to_string();
            if seen.insert(name.clone()) {
                out.push(name);
            }
        }
        Ok(out)
    }

    pub fn package_info(&self, arch: &str, package: &str) -> Result<PackageInfo> {
        self.index.get_package_info(&self.key, arch, package)
    }

    /// The mirror URL for `package`'s `.deb`, or an empty string if the
    /// package (or its filename) is unknown.
    pub fn package_url(&self, arch: &str, package: &str) -> Result<String> {
        let info = self.package_info(arch, package)?;
        if info.filename.is_empty() {
            return Ok(String::new());
        }

        let base = self.distro.download_base_url().trim_end_matches('/');
        Ok(format!("{base}/{}", info.filename))
    }

    pub fn popularity(&self, package: &str) -> Result<i64> {
        self.index.get_popularity(&self.key, package)
    }

    /// Stream every `(path, package)` row of `(arch, area)`; stops as soon
    /// as `callback` returns `false`.
    pub fn walk(&self, arch: &str, area: &str, callback: &mut dyn FnMut(&str, &str) -> bool) -> Result<()> {
        self.index.walk(&self.key, arch, area, callback)
    }

    /// Fetch `package`'s `.deb` and stream its inner tar entries to `sink`.
    pub fn extract(
        &self,
        arch: &str,
        package: &str,
        sink: impl FnMut(FileEntry, &mut dyn Read) -> Result<()>,
    ) -> Result<()> {
        let url = self.package_url(arch, package)?;
        let outcome = self.fetcher.conditional_get(&url, "")?;

        match outcome {
            FetchOutcome::NotModified => Ok(()),
            FetchOutcome::Modified { body, .. } => extract_deb(body, sink),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn distro(&self) -> Distro {
        self.distro
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SqliteIndex;

    fn memory_contents() -> (Arc<SqliteIndex>, Contents) {
        let index = Arc::new(SqliteIndex::open_memory().unwrap());
        let contents = Contents::from_index(Distro::Debian, "stable", index.clone());
        (index, contents)
    }

    #[test]
    fn search_strips_section_from_stored_reference() {
        let (index, contents) = memory_contents();
        index
            .insert_file_mapping("debian/stable", "amd64", "main", "/usr/bin/xfig", "contrib/xfig")
            .unwrap();

        let found = contents.search("/usr/bin/xfig").unwrap();
        assert_eq!(found, vec!["xfig".to_string()]);
    }

    #[test]
    fn search_deduplicates_refs_collapsing_to_the_same_basename() {
        let (index, contents) = memory_contents();
        // Same package shipping the path from two areas, plus a second
        // reference that collapses to the same basename after stripping
        // its section.
        index
            .insert_file_mapping("debian/stable", "amd64", "main", "/bin/foo", "main/foo")
            .unwrap();
        index
            .insert_file_mapping("debian/stable", "amd64", "contrib", "/bin/foo", "contrib/foo")
            .unwrap();

        let found = contents.search("/bin/foo").unwrap();
        assert_eq!(found, vec!["foo".to_string()]);
    }

    #[test]
    fn package_url_is_empty_for_unknown_package() {
        let (_, contents) = memory_contents();
        assert_eq!(contents.package_url("amd64", "missing").unwrap(), "");
    }

    #[test]
    fn package_url_joins_download_base_and_filename() {
        let (index, contents) = memory_contents();
        let info = PackageInfo {
            package: "xfig".to_string(),
            version: "3.2.8b-2+b2".to_string(),
            arch: "amd64".to_string(),
            filename: "pool/main/x/xfig/xfig_3.2.8b-2+b2_amd64.deb".to_string(),
            depends: vec![],
        };
        index
            .insert_package_info("debian/stable", "main", "amd64", &info)
            .unwrap();

        assert_eq!(
            contents.package_url("amd64", "xfig").unwrap(),
            "http://ftp.debian.org/debian/pool/main/x/xfig/xfig_3.2.8b-2+b2_amd64.deb"
        );
    }
}
