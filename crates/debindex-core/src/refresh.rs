// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Refresh orchestrator: fetch, parse, and atomically swap one area at a time. */

use {
    crate::{
        distro::{distro_key, Distro},
        error::Result,
        fetch::{FetchOutcome, Fetcher},
        index::IndexHandle,
        parse::{parse_contents, parse_packages, parse_popularity},
    },
    flate2::read::GzDecoder,
    log::info,
};

/// Refresh popularity, then every (area, arch) Contents/Packages pair, for
/// `distro`/`version` against `index`.
///
/// Each resource class (popularity, one area's Contents, one area's
/// Packages) is refreshed independently inside its own transaction; a
/// `304 Not Modified` response for one does not block the others.
pub fn refresh(index: &dyn IndexHandle, fetcher: &Fetcher, distro: Distro, version: &str) -> Result<()> {
    let key = distro_key(distro, version);

    refresh_popularity(index, fetcher, distro, &key)?;

    for arch in distro.content_arches() {
        refresh_contents(index, fetcher, distro, version, &key, "", arch)?;
    }

    for (area, arch) in distro.areas_and_arches() {
        if distro == Distro::Debian {
            refresh_contents(index, fetcher, distro, version, &key, area, arch)?;
        }
        refresh_packages(index, fetcher, distro, version, &key, area, arch)?;
    }

    Ok(())
}

fn refresh_popularity(
    index: &dyn IndexHandle,
    fetcher: &Fetcher,
    distro: Distro,
    key: &str,
) -> Result<()> {
    let prior = index.get_popularity_etag(key)?;
    match fetcher.conditional_get(distro.popularity_url(), &prior)? {
        FetchOutcome::NotModified => {
            info!("{key}: popularity not modified");
            Ok(())
        }
        FetchOutcome::Modified { body, etag } => {
            let decoder = GzDecoder::new(body);
            let reader = std::io::BufReader::new(decoder);

            index.begin_tx()?;
            index.remove_all_popularities(key)?;
            parse_popularity(reader, |package, rank| index.insert_popularity(key, package, rank))?;
            index.set_popularity_etag(key, &etag)?;
            index.end_tx()?;

            info!("{key}: popularity refreshed");
            Ok(())
        }
    }
}

fn refresh_contents(
    index: &dyn IndexHandle,
    fetcher: &Fetcher,
    distro: Distro,
    version: &str,
    key: &str,
    area: &str,
    arch: &str,
) -> Result<()> {
    let prior = index.get_content_etag(key, arch, area)?;
    let url = distro.contents_url(version, area, arch);

    match fetcher.conditional_get(&url, &prior)? {
        FetchOutcome::NotModified => {
            info!("{key} {arch}/{area}: contents not modified");
            Ok(())
        }
        FetchOutcome::Modified { body, etag } => {
            let decoder = GzDecoder::new(body);
            let reader = std::io::BufReader::new(decoder);

            index.begin_tx()?;
            index.remove_all_files(key, arch, area)?;
            parse_contents(reader, |path, package| {
                index.insert_file_mapping(key, arch, area, path, package)
            })?;
            index.set_content_etag(key, arch, area, &etag)?;
            index.end_tx()?;

            info!("{key} {arch}/{area}: contents refreshed");
            Ok(())
        }
    }
}

fn refresh_packages(
    index: &dyn IndexHandle,
    fetcher: &Fetcher,
    distro: Distro,
    version: &str,
    key: &str,
    area: &str,
    arch: &str,
) -> Result<()> {
    let prior = index.get_package_info_etag(key, area, arch)?;
    let url = distro.packages_url(version, area, arch);

    match fetcher.conditional_get(&url, &prior)? {
        FetchOutcome::NotModified => {
            info!("{key} {area}/{arch}: packages not modified");
            Ok(())
        }
        FetchOutcome::Modified { body, etag } => {
            let decoder = GzDecoder::new(body);
            let reader = std::io::BufReader::new(decoder);

            index.begin_tx()?;
            index.remove_all_package_infos(key, area, arch)?;
            parse_packages(reader, arch, |info| index.insert_package_info(key, area, arch, &info))?;
            index.set_package_info_etag(key, area, arch, &etag)?;
            index.end_tx()?;

            info!("{key} {area}/{arch}: packages refreshed");
            Ok(())
        }
    }
}
