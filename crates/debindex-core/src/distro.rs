// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Distribution-specific URL templates and area/arch coverage. */

use crate::error::{DebIndexError, Result};

const POPCON_URL: &str = "https://popcon.debian.org/by_vote.gz";

const DEBIAN_AREAS: &[&str] = &["main", "non-free"];
const DEBIAN_ARCHES: &[&str] = &["amd64", "all"];
const UBUNTU_AREAS: &[&str] = &["main", "universe", "multiverse", "restricted"];
const UBUNTU_ARCHES: &[&str] = &["amd64", "all"];

/// A supported upstream distribution family.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Distro {
    Debian,
    Ubuntu,
}

impl Distro {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "debian" => Ok(Self::Debian),
            "ubuntu" => Ok(Self::Ubuntu),
            other => Err(DebIndexError::UnknownDistro(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Debian => "debian",
            Self::Ubuntu => "ubuntu",
        }
    }

    /// `(area, arch)` pairs to refresh for this distro, per spec.
    ///
    /// Debian's Contents file is area-scoped; Ubuntu's is not, so Ubuntu's
    /// Contents refresh uses an empty area while its Packages refresh still
    /// iterates the real areas.
    pub fn areas_and_arches(self) -> Vec<(&'static str, &'static str)> {
        let (areas, arches) = match self {
            Self::Debian => (DEBIAN_AREAS, DEBIAN_ARCHES),
            Self::Ubuntu => (UBUNTU_AREAS, UBUNTU_ARCHES),
        };

        areas
            .iter()
            .flat_map(|area| arches.iter().map(move |arch| (*area, *arch)))
            .collect()
    }

    /// Arches for which a (distro-level, area-less) Contents file exists.
    ///
    /// Only Ubuntu has one; Debian's Contents file is always area-scoped
    /// (`areas_and_arches` covers it), so Debian has none here.
    pub fn content_arches(self) -> &'static [&'static str] {
        match self {
            Self::Debian => &[],
            Self::Ubuntu => UBUNTU_ARCHES,
        }
    }

    pub fn contents_url(self, version: &str, area: &str, arch: &str) -> String {
        match self {
            Self::Debian => format!(
                "http://ftp.debian.org/debian/dists/{version}/{area}/Contents-{arch}.gz"
            ),
            Self::Ubuntu => format!(
                "http://de.archive.ubuntu.com/ubuntu/dists/{version}/Contents-{arch}.gz"
            ),
        }
    }

    pub fn packages_url(self, version: &str, area: &str, arch: &str) -> String {
        match self {
            Self::Debian => format!(
                "http://ftp.debian.org/debian/dists/{version}/{area}/binary-{arch}/Packages.gz"
            ),
            Self::Ubuntu => format!(
                "http://de.archive.ubuntu.com/ubuntu/dists/{version}/{area}/binary-{arch}/Packages.gz"
            ),
        }
    }

    pub fn popularity_url(self) -> &'static str {
        POPCON_URL
    }

    pub fn download_base_url(self) -> &'static str {
        match self {
            Self::Debian => "http://ftp.debian.org/debian/",
            Self::Ubuntu => "http://de.archive.ubuntu.com/ubuntu",
        }
    }
}

/// `"<distro>/<version>"`, the top-level partition key for every table.
pub fn distro_key(distro: Distro, version: &str) -> String {
    format!("{}/{}", distro.name(), version)
}
