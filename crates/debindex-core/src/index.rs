// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The persistent index: a typed, prepared-statement layer over a single
SQLite file.

Schema, transaction bookkeeping and lookups live here (spec.md §3 and
§4.1). `IndexHandle` is the capability set the refresh orchestrator and
query surface consume; [`SqliteIndex`] is the only production
implementation, following the Design Notes' "concrete handle behind an
abstract store" guidance.
*/

use {
    crate::{
        error::{DebIndexError, Result},
        model::PackageInfo,
    },
    indoc::indoc,
    rusqlite::{params_from_iter, Connection, OptionalExtension},
    std::{
        collections::HashMap,
        path::Path,
        sync::Mutex,
    },
};

const SCHEMA: &[&str] = &[
    indoc! {"
        CREATE TABLE IF NOT EXISTS file_mapping (
            distro_key TEXT NOT NULL,
            arch TEXT NOT NULL,
            area TEXT NOT NULL,
            path TEXT NOT NULL,
            package TEXT NOT NULL,
            PRIMARY KEY (distro_key, arch, area, path, package)
        )
    "},
    "CREATE INDEX IF NOT EXISTS file_mapping_path ON file_mapping(path)",
    indoc! {"
        CREATE TABLE IF NOT EXISTS package_info (
            distro_key TEXT NOT NULL,
            area TEXT NOT NULL,
            package TEXT NOT NULL,
            version TEXT NOT NULL,
            arch TEXT NOT NULL,
            filename TEXT NOT NULL,
            depends TEXT NOT NULL,
            PRIMARY KEY (distro_key, package, version, arch)
        )
    "},
    indoc! {"
        CREATE TABLE IF NOT EXISTS popularity (
            distro_key TEXT NOT NULL,
            package TEXT NOT NULL,
            rank INTEGER NOT NULL,
            PRIMARY KEY (distro_key, package)
        )
    "},
    indoc! {"
        CREATE TABLE IF NOT EXISTS content_etag (
            distro_key TEXT NOT NULL,
            arch TEXT NOT NULL,
            area TEXT NOT NULL,
            etag TEXT NOT NULL,
            PRIMARY KEY (distro_key, arch, area)
        )
    "},
    indoc! {"
        CREATE TABLE IF NOT EXISTS package_info_etag (
            distro_key TEXT NOT NULL,
            area TEXT NOT NULL,
            arch TEXT NOT NULL,
            etag TEXT NOT NULL,
            PRIMARY KEY (distro_key, area, arch)
        )
    "},
    indoc! {"
        CREATE TABLE IF NOT EXISTS popularity_etag (
            distro_key TEXT NOT NULL,
            etag TEXT NOT NULL,
            PRIMARY KEY (distro_key)
        )
    "},
];

/// Maximum number of `?` placeholders packed into a single `IN (...)` clause.
///
/// Spec.md §4.1 requires batched path lookups to chunk at this size to stay
/// within backend limits (SQLite's default `SQLITE_MAX_VARIABLE_NUMBER`
/// leaves ample headroom above it).
const MAX_BATCH_PLACEHOLDERS: usize = 1_000;

/// Build a SQL `IN (...)` placeholder fragment of exactly `n` placeholders.
///
/// Equivalent of the reference implementation's `createPackagesSqlFmtString`,
/// factored out and unit-tested on its own (spec.md §9 supplemented
/// features).
pub fn placeholders(n: usize) -> String {
    let mut s = String::with_capacity(n * 2);
    for i in 0..n {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}

/// Split `items` into chunks of at most `chunk_size` elements each.
///
/// Concatenating the returned chunks in order reproduces `items` exactly
/// (spec.md §8 testable property 7). Panics are never raised for
/// `chunk_size == 0`; callers must pass a positive size, as with the
/// reference implementation's `split()`.
pub fn split<T: Clone>(items: &[T], chunk_size: usize) -> Vec<Vec<T>> {
    assert!(chunk_size > 0, "chunk_size must be positive");
    items
        .chunks(chunk_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Capability set consumed by the refresh orchestrator and query surface.
///
/// Kept as a trait so tests can substitute an in-memory double without
/// depending on the SQLite-backed implementation, per the Design Notes.
pub trait IndexHandle: Send + Sync {
    fn begin_tx(&self) -> Result<()>;
    fn end_tx(&self) -> Result<()>;

    fn set_content_etag(&self, distro_key: &str, arch: &str, area: &str, etag: &str) -> Result<()>;
    fn get_content_etag(&self, distro_key: &str, arch: &str, area: &str) -> Result<String>;

    fn set_package_info_etag(
        &self,
        distro_key: &str,
        area: &str,
        arch: &str,
        etag: &str,
    ) -> Result<()>;
    fn get_package_info_etag(&self, distro_key: &str, area: &str, arch: &str) -> Result<String>;

    fn set_popularity_etag(&self, distro_key: &str, etag: &str) -> Result<()>;
    fn get_popularity_etag(&self, distro_key: &str) -> Result<String>;

    fn insert_file_mapping(
        &self,
        distro_key: &str,
        arch: &str,
        area: &str,
        path: &str,
        package: &str,
    ) -> Result<()>;
    fn insert_package_info(
        &self,
        distro_key: &str,
        area: &str,
        arch: &str,
        info: &PackageInfo,
    ) -> Result<()>;
    fn insert_popularity(&self, distro_key: &str, package: &str, rank: i64) -> Result<()>;

    fn remove_all_files(&self, distro_key: &str, arch: &str, area: &str) -> Result<()>;
    fn remove_all_package_infos(&self, distro_key: &str, area: &str, arch: &str) -> Result<()>;
    fn remove_all_popularities(&self, distro_key: &str) -> Result<()>;

    fn get_packages_for_path(&self, distro_key: &str, path: &str) -> Result<Vec<String>>;
    fn get_packages_for_paths(
        &self,
        distro_key: &str,
        paths: &[String],
    ) -> Result<HashMap<String, Vec<String>>>;

    fn get_package_info(&self, distro_key: &str, arch: &str, package: &str) -> Result<PackageInfo>;
    fn get_popularity(&self, distro_key: &str, package: &str) -> Result<i64>;

    /// Stream all `(path, package)` rows for `(distro_key, arch, area)`, invoking
    /// `callback` once per row in backend-natural order. Stops as soon as
    /// `callback` returns `false`.
    fn walk(
        &self,
        distro_key: &str,
        arch: &str,
        area: &str,
        callback: &mut dyn FnMut(&str, &str) -> bool,
    ) -> Result<()>;
}

struct Inner {
    conn: Connection,
    in_transaction: bool,
}

/// SQLite-backed [`IndexHandle`].
///
/// A single [`Mutex`] around the connection and the "already in a
/// transaction" flag serializes every call, matching the reference
/// implementation's `baseDB` (a `sync.Mutex`-guarded `*sql.DB`). This
/// protects the single underlying connection against reentrant use, e.g. a
/// `walk` callback that itself issues a query, per §5 and §9's mutex
/// discipline notes: `walk` fully materializes its result rows before
/// releasing the lock and invoking the callback, so callbacks are always
/// free to call back into the index without deadlocking.
pub struct SqliteIndex {
    inner: Mutex<Inner>,
}

impl SqliteIndex {
    /// Open or create the single-file store at `path`, running schema setup.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| DebIndexError::sql("open", e))?;
        Self::init(conn)
    }

    /// Open an in-memory store. Useful for tests.
    pub fn open_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DebIndexError::sql("open_memory", e))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| DebIndexError::sql("set journal_mode", e))?;

        for statement in SCHEMA {
            conn.execute(statement, [])
                .map_err(|e| DebIndexError::sql("create schema", e))?;
        }

        Ok(Self {
            inner: Mutex::new(Inner {
                conn,
                in_transaction: false,
            }),
        })
    }
}

impl IndexHandle for SqliteIndex {
    fn begin_tx(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.in_transaction {
            return Ok(());
        }
        inner
            .conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DebIndexError::sql("begin_tx", e))?;
        inner.in_transaction = true;
        Ok(())
    }

    fn end_tx(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.in_transaction {
            return Ok(());
        }
        inner
            .conn
            .execute_batch("COMMIT")
            .map_err(|e| DebIndexError::sql("end_tx", e))?;
        inner.in_transaction = false;
        Ok(())
    }

    fn set_content_etag(&self, distro_key: &str, arch: &str, area: &str, etag: &str) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        inner
            .conn
            .prepare_cached(
                "INSERT INTO content_etag (distro_key, arch, area, etag) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (distro_key, arch, area) DO UPDATE SET etag = excluded.etag",
            )
            .map_err(|e| DebIndexError::sql("set_content_etag", e))?
            .execute((distro_key, arch, area, etag))
            .map_err(|e| DebIndexError::sql("set_content_etag", e))?;
        Ok(())
    }

    fn get_content_etag(&self, distro_key: &str, arch: &str, area: &str) -> Result<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .conn
            .prepare_cached(
                "SELECT etag FROM content_etag WHERE distro_key = ?1 AND arch = ?2 AND area = ?3",
            )
            .map_err(|e| DebIndexError::sql("get_content_etag", e))?
            .query_row((distro_key, arch, area), |row| row.get(0))
            .optional()
            .map_err(|e| DebIndexError::sql("get_content_etag", e))
            .map(|v: Option<String>| v.unwrap_or_default())
    }

    fn set_package_info_etag(
        &self,
        distro_key: &str,
        area: &str,
        arch: &str,
        etag: &str,
    ) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        inner
            .conn
            .prepare_cached(
                "INSERT INTO package_info_etag (distro_key, area, arch, etag) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (distro_key, area, arch) DO UPDATE SET etag = excluded.etag",
            )
            .map_err(|e| DebIndexError::sql("set_package_info_etag", e))?
            .execute((distro_key, area, arch, etag))
            .map_err(|e| DebIndexError::sql("set_package_info_etag", e))?;
        Ok(())
    }

    fn get_package_info_etag(&self, distro_key: &str, area: &str, arch: &str) -> Result<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .conn
            .prepare_cached(
                "SELECT etag FROM package_info_etag WHERE distro_key = ?1 AND area = ?2 AND arch = ?3",
            )
            .map_err(|e| DebIndexError::sql("get_package_info_etag", e))?
            .query_row((distro_key, area, arch), |row| row.get(0))
            .optional()
            .map_err(|e| DebIndexError::sql("get_package_info_etag", e))
            .map(|v: Option<String>| v.unwrap_or_default())
    }

    fn set_popularity_etag(&self, distro_key: &str, etag: &str) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        inner
            .conn
            .prepare_cached(
                "INSERT INTO popularity_etag (distro_key, etag) VALUES (?1, ?2)
                 ON CONFLICT (distro_key) DO UPDATE SET etag = excluded.etag",
            )
            .map_err(|e| DebIndexError::sql("set_popularity_etag", e))?
            .execute((distro_key, etag))
            .map_err(|e| DebIndexError::sql("set_popularity_etag", e))?;
        Ok(())
    }

    fn get_popularity_etag(&self, distro_key: &str) -> Result<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .conn
            .prepare_cached("SELECT etag FROM popularity_etag WHERE distro_key = ?1")
            .map_err(|e| DebIndexError::sql("get_popularity_etag", e))?
            .query_row((distro_key,), |row| row.get(0))
            .optional()
            .map_err(|e| DebIndexError::sql("get_popularity_etag", e))
            .map(|v: Option<String>| v.unwrap_or_default())
    }

    fn insert_file_mapping(
        &self,
        distro_key: &str,
        arch: &str,
        area: &str,
        path: &str,
        package: &str,
    ) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        inner
            .conn
            .prepare_cached(
                "INSERT OR REPLACE INTO file_mapping (distro_key, arch, area, path, package)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(|e| DebIndexError::sql("insert_file_mapping", e))?
            .execute((distro_key, arch, area, path, package))
            .map_err(|e| DebIndexError::sql("insert_file_mapping", e))?;
        Ok(())
    }

    fn insert_package_info(
        &self,
        distro_key: &str,
        area: &str,
        arch: &str,
        info: &PackageInfo,
    ) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        let depends = info.depends.join(", ");
        inner
            .conn
            .prepare_cached(
                "INSERT OR REPLACE INTO package_info
                 (distro_key, area, package, version, arch, filename, depends)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(|e| DebIndexError::sql("insert_package_info", e))?
            .execute((
                distro_key,
                area,
                &info.package,
                &info.version,
                arch,
                &info.filename,
                &depends,
            ))
            .map_err(|e| DebIndexError::sql("insert_package_info", e))?;
        Ok(())
    }

    fn insert_popularity(&self, distro_key: &str, package: &str, rank: i64) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        inner
            .conn
            .prepare_cached(
                "INSERT OR REPLACE INTO popularity (distro_key, package, rank) VALUES (?1, ?2, ?3)",
            )
            .map_err(|e| DebIndexError::sql("insert_popularity", e))?
            .execute((distro_key, package, rank))
            .map_err(|e| DebIndexError::sql("insert_popularity", e))?;
        Ok(())
    }

    fn remove_all_files(&self, distro_key: &str, arch: &str, area: &str) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        inner
            .conn
            .prepare_cached(
                "DELETE FROM file_mapping WHERE distro_key = ?1 AND arch = ?2 AND area = ?3",
            )
            .map_err(|e| DebIndexError::sql("remove_all_files", e))?
            .execute((distro_key, arch, area))
            .map_err(|e| DebIndexError::sql("remove_all_files", e))?;
        Ok(())
    }

    fn remove_all_package_infos(&self, distro_key: &str, area: &str, arch: &str) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        inner
            .conn
            .prepare_cached(
                "DELETE FROM package_info WHERE distro_key = ?1 AND area = ?2 AND arch = ?3",
            )
            .map_err(|e| DebIndexError::sql("remove_all_package_infos", e))?
            .execute((distro_key, area, arch))
            .map_err(|e| DebIndexError::sql("remove_all_package_infos", e))?;
        Ok(())
    }

    fn remove_all_popularities(&self, distro_key: &str) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        inner
            .conn
            .prepare_cached("DELETE FROM popularity WHERE distro_key = ?1")
            .map_err(|e| DebIndexError::sql("remove_all_popularities", e))?
            .execute((distro_key,))
            .map_err(|e| DebIndexError::sql("remove_all_popularities", e))?;
        Ok(())
    }

    fn get_packages_for_path(&self, distro_key: &str, path: &str) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        query_packages_for_path(&inner.conn, distro_key, path)
    }

    fn get_packages_for_paths(
        &self,
        distro_key: &str,
        paths: &[String],
    ) -> Result<HashMap<String, Vec<String>>> {
        let mut result = HashMap::new();

        // Absolute and basename paths need different WHERE clauses, so the
        // batch is split into the two flavors before chunking placeholders.
        let (absolute, basenames): (Vec<&String>, Vec<&String>) =
            paths.iter().partition(|p| p.starts_with('/'));

        let inner = self.inner.lock().unwrap();

        for chunk in absolute.chunks(MAX_BATCH_PLACEHOLDERS) {
            query_batch(&inner.conn, distro_key, chunk, true, &mut result)?;
        }
        for chunk in basenames.chunks(MAX_BATCH_PLACEHOLDERS) {
            query_batch(&inner.conn, distro_key, chunk, false, &mut result)?;
        }

        Ok(result)
    }

    fn get_package_info(&self, distro_key: &str, arch: &str, package: &str) -> Result<PackageInfo> {
        let inner = self.inner.lock().unwrap();
        let row = inner
            .conn
            .prepare_cached(
                "SELECT package, version, arch, filename, depends FROM package_info
                 WHERE distro_key = ?1 AND arch = ?2 AND package = ?3
                 ORDER BY version DESC LIMIT 1",
            )
            .map_err(|e| DebIndexError::sql("get_package_info", e))?
            .query_row((distro_key, arch, package), |row| {
                let depends: String = row.get(4)?;
                Ok(PackageInfo {
                    package: row.get(0)?,
                    version: row.get(1)?,
                    arch: row.get(2)?,
                    filename: row.get(3)?,
                    depends: split_depends(&depends),
                })
            })
            .optional()
            .map_err(|e| DebIndexError::sql("get_package_info", e))?;

        Ok(row.unwrap_or_default())
    }

    fn get_popularity(&self, distro_key: &str, package: &str) -> Result<i64> {
        let inner = self.inner.lock().unwrap();
        inner
            .conn
            .prepare_cached("SELECT rank FROM popularity WHERE distro_key = ?1 AND package = ?2")
            .map_err(|e| DebIndexError::sql("get_popularity", e))?
            .query_row((distro_key, package), |row| row.get(0))
            .optional()
            .map_err(|e| DebIndexError::sql("get_popularity", e))
            .map(|v: Option<i64>| v.unwrap_or(0))
    }

    fn walk(
        &self,
        distro_key: &str,
        arch: &str,
        area: &str,
        callback: &mut dyn FnMut(&str, &str) -> bool,
    ) -> Result<()> {
        let rows = {
            let inner = self.inner.lock().unwrap();
            let mut stmt = inner
                .conn
                .prepare_cached(
                    "SELECT path, package FROM file_mapping
                     WHERE distro_key = ?1 AND arch = ?2 AND area = ?3",
                )
                .map_err(|e| DebIndexError::sql("walk", e))?;

            let rows = stmt
                .query_map((distro_key, arch, area), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|e| DebIndexError::sql("walk", e))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| DebIndexError::sql("walk", e))?;
            rows
        };

        for (path, package) in rows {
            if !callback(&path, &package) {
                break;
            }
        }

        Ok(())
    }
}

fn split_depends(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(", ").map(|s| s.to_string()).collect()
    }
}

fn query_packages_for_path(conn: &Connection, distro_key: &str, path: &str) -> Result<Vec<String>> {
    let (clause, bind_path) = if let Some(stripped) = path.strip_prefix('/') {
        ("path = ?2", format!("/{stripped}"))
    } else {
        ("path LIKE '%/' || ?2", path.to_string())
    };

    let sql = format!(
        "SELECT file_mapping.package
         FROM file_mapping
         LEFT JOIN popularity
           ON popularity.distro_key = file_mapping.distro_key
          AND popularity.package = file_mapping.package
         WHERE file_mapping.distro_key = ?1 AND {clause}
         ORDER BY (popularity.rank IS NULL), popularity.rank ASC"
    );

    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| DebIndexError::sql("get_packages_for_path", e))?;

    let rows = stmt
        .query_map((distro_key, bind_path), |row| row.get::<_, String>(0))
        .map_err(|e| DebIndexError::sql("get_packages_for_path", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| DebIndexError::sql("get_packages_for_path", e))?;

    Ok(rows)
}

/// Look up a chunk of paths sharing the same "absolute or basename" shape,
/// merging hits into `result`, keyed by the *queried* path (not the stored
/// one) so `get_packages_for_paths(P)[p]` always agrees with
/// `get_packages_for_path(p)`.
///
/// The absolute branch batches the whole chunk into a single `IN (...)`
/// query, since a stored path that matches an absolute query is the query
/// itself. The basename branch cannot do that: several distinct queried
/// basenames can each match a different stored path, and a single
/// OR-of-`LIKE`s query has no way to report which clause a given row
/// satisfied, so each basename is looked up with its own (prepared-cached,
/// hence cheap) query instead.
fn query_batch(
    conn: &Connection,
    distro_key: &str,
    chunk: &[&String],
    absolute: bool,
    result: &mut HashMap<String, Vec<String>>,
) -> Result<()> {
    if chunk.is_empty() {
        return Ok(());
    }

    if !absolute {
        for path in chunk {
            let packages = query_packages_for_path(conn, distro_key, path.as_str())?;
            if !packages.is_empty() {
                result.insert((*path).clone(), packages);
            }
        }
        return Ok(());
    }

    let place = placeholders(chunk.len());
    let sql = format!(
        "SELECT file_mapping.path, file_mapping.package
         FROM file_mapping
         LEFT JOIN popularity
           ON popularity.distro_key = file_mapping.distro_key
          AND popularity.package = file_mapping.package
         WHERE file_mapping.distro_key = ? AND file_mapping.path IN ({place})
         ORDER BY file_mapping.path, (popularity.rank IS NULL), popularity.rank ASC"
    );

    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| DebIndexError::sql("get_packages_for_paths", e))?;

    let mut bind: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(chunk.len() + 1);
    bind.push(&distro_key);
    for p in chunk {
        bind.push(*p);
    }

    let rows = stmt
        .query_map(params_from_iter(bind), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| DebIndexError::sql("get_packages_for_paths", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| DebIndexError::sql("get_packages_for_paths", e))?;

    // Absolute queries and stored paths coincide, so the stored path is the
    // queried one.
    for (path, package) in rows {
        result.entry(path).or_insert_with(Vec::new).push(package);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn open_creates_file_backed_store_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.sqlite");
        assert!(!path.exists());

        let idx = SqliteIndex::open(&path).unwrap();
        assert!(path.exists());

        idx.set_content_etag("stable", "amd64", "main", "etag-1")
            .unwrap();
        drop(idx);

        let reopened = SqliteIndex::open(&path).unwrap();
        assert_eq!(
            reopened.get_content_etag("stable", "amd64", "main").unwrap(),
            "etag-1"
        );
    }

    #[test]
    fn etag_upsert() {
        let idx = SqliteIndex::open_memory().unwrap();
        idx.set_content_etag("stable", "amd64", "contrib", "bar")
            .unwrap();
        idx.set_content_etag("stable", "amd64", "contrib", "foo")
            .unwrap();
        assert_eq!(
            idx.get_content_etag("stable", "amd64", "contrib").unwrap(),
            "foo"
        );
    }

    #[test]
    fn unknown_etag_is_empty_string() {
        let idx = SqliteIndex::open_memory().unwrap();
        assert_eq!(idx.get_content_etag("stable", "amd64", "main").unwrap(), "");
    }

    #[test]
    fn multi_package_path_with_and_without_leading_slash() {
        let idx = SqliteIndex::open_memory().unwrap();

        for i in 0..10u32 {
            for j in 0..=i {
                let package = format!("package-{i}-{j}");
                let path = format!("/usr/{i}/file");
                idx.insert_file_mapping("stable", "amd64", "main", &path, &package)
                    .unwrap();
            }
        }

        for i in 0..10u32 {
            let path = format!("/usr/{i}/file");
            let packages = idx.get_packages_for_path("stable", &path).unwrap();
            assert_eq!(packages.len() as u32, i + 1);

            let basename = format!("{i}/file");
            let packages = idx.get_packages_for_path("stable", &basename).unwrap();
            assert_eq!(packages.len() as u32, i + 1);
        }
    }

    #[test]
    fn walk_early_exit() {
        let idx = SqliteIndex::open_memory().unwrap();
        idx.insert_file_mapping("stable", "amd64", "main", "/usr/bin/foo", "foo")
            .unwrap();
        idx.insert_file_mapping("stable", "amd64", "main", "/usr/bin/bar", "bar")
            .unwrap();

        let mut seen = Vec::new();
        idx.walk("stable", "amd64", "main", &mut |path, pkg| {
            seen.push((path.to_string(), pkg.to_string()));
            false
        })
        .unwrap();

        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn refresh_replaces_area_rows() {
        let idx = SqliteIndex::open_memory().unwrap();
        idx.insert_file_mapping("stable", "amd64", "main", "/bin/old", "old-pkg")
            .unwrap();

        idx.begin_tx().unwrap();
        idx.remove_all_files("stable", "amd64", "main").unwrap();
        idx.insert_file_mapping("stable", "amd64", "main", "/bin/new", "new-pkg")
            .unwrap();
        idx.end_tx().unwrap();

        assert_eq!(idx.get_packages_for_path("stable", "/bin/old").unwrap().len(), 0);
        assert_eq!(idx.get_packages_for_path("stable", "/bin/new").unwrap().len(), 1);
    }

    #[test]
    fn batch_lookup_matches_single_lookups() {
        let idx = SqliteIndex::open_memory().unwrap();
        idx.insert_file_mapping("stable", "amd64", "main", "/bin/a", "pkg-a")
            .unwrap();
        idx.insert_file_mapping("stable", "amd64", "main", "/bin/b", "pkg-b")
            .unwrap();
        idx.insert_popularity("stable", "pkg-a", 1).unwrap();

        let paths = vec!["/bin/a".to_string(), "/bin/b".to_string(), "/bin/missing".to_string()];
        let batch = idx.get_packages_for_paths("stable", &paths).unwrap();

        for path in ["/bin/a", "/bin/b"] {
            let single = idx.get_packages_for_path("stable", path).unwrap();
            assert_eq!(batch.get(path).cloned().unwrap_or_default(), single);
        }
        assert!(!batch.contains_key("/bin/missing"));
    }

    #[test]
    fn batch_lookup_keys_basenames_by_the_queried_string() {
        let idx = SqliteIndex::open_memory().unwrap();
        idx.insert_file_mapping("stable", "amd64", "main", "/usr/bin/bash", "bash")
            .unwrap();
        idx.insert_file_mapping("stable", "amd64", "main", "/usr/sbin/other", "other-pkg")
            .unwrap();

        let paths = vec!["bin/bash".to_string(), "sbin/other".to_string()];
        let batch = idx.get_packages_for_paths("stable", &paths).unwrap();

        // Keyed by the queried basename, not the stored absolute path.
        assert_eq!(batch.get("bin/bash").cloned(), Some(vec!["bash".to_string()]));
        assert_eq!(
            batch.get("sbin/other").cloned(),
            Some(vec!["other-pkg".to_string()])
        );
        assert!(!batch.contains_key("/usr/bin/bash"));

        for path in ["bin/bash", "sbin/other"] {
            let single = idx.get_packages_for_path("stable", path).unwrap();
            assert_eq!(batch.get(path).cloned().unwrap_or_default(), single);
        }
    }

    #[test]
    fn package_info_roundtrip_and_popularity() {
        let idx = SqliteIndex::open_memory().unwrap();
        let info = PackageInfo {
            package: "xfig".to_string(),
            version: "3.2.8b-2+b2".to_string(),
            arch: "amd64".to_string(),
            filename: "pool/main/x/xfig/xfig_3.2.8b-2+b2_amd64.deb".to_string(),
            depends: vec!["libc6".to_string(), "libx11-6".to_string()],
        };
        idx.insert_package_info("debian/stable", "main", "amd64", &info)
            .unwrap();
        idx.insert_popularity("debian/stable", "xfig", 42).unwrap();

        let got = idx.get_package_info("debian/stable", "amd64", "xfig").unwrap();
        assert_eq!(got, info);
        assert_eq!(idx.get_popularity("debian/stable", "xfig").unwrap(), 42);
        assert_eq!(idx.get_popularity("debian/stable", "missing").unwrap(), 0);
    }

    #[test]
    fn unknown_package_info_is_zero_value() {
        let idx = SqliteIndex::open_memory().unwrap();
        let got = idx.get_package_info("debian/stable", "amd64", "missing").unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn placeholders_builds_expected_fragment() {
        assert_eq!(placeholders(0), "");
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?,?,?");
    }

    #[test]
    fn split_reproduces_input_when_flattened() {
        let items = vec!["0", "1", "2", "3", "4"];
        let chunks = split(&items, 3);
        assert_eq!(chunks, vec![vec!["0", "1", "2"], vec!["3", "4"]]);

        let flattened: Vec<_> = chunks.into_iter().flatten().collect();
        assert_eq!(flattened, items);
    }

    proptest::proptest! {
        // Carried forward from the reference implementation's
        // FuzzSplitStringArray: for any list and any positive chunk size,
        // flattening split(list, k) reproduces list exactly (spec.md §8
        // testable property 7).
        #[test]
        fn split_flattens_back_to_input(items: Vec<String>, chunk_size in 1usize..64) {
            let chunks = split(&items, chunk_size);
            let flattened: Vec<String> = chunks.iter().flatten().cloned().collect();
            prop_assert_eq!(flattened, items.clone());

            for chunk in &chunks {
                prop_assert!(chunk.len() <= chunk_size);
                prop_assert!(!chunk.is_empty());
            }
        }
    }
}
