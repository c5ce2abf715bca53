// src/storage/sqlite.rs - Read-only access to the master_queries SQLite store

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::storage::SerpSource;

/// Reads `master_queries(group_name, keyword, serp_top_urls)`. Rows come back
/// in insertion order.
pub struct SqliteSerpSource {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteSerpSource {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open SERP database {}", path.display()))?;

        let has_table: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'master_queries')",
                [],
                |row| row.get(0),
            )
            .context("Failed to inspect database schema")?;
        if !has_table {
            return Err(anyhow!(
                "{} has no master_queries table",
                path.display()
            ));
        }

        info!("Opened SERP database {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("SERP database connection mutex poisoned"))?;
        f(&conn).map_err(anyhow::Error::from)
    }
}

impl SerpSource for SqliteSerpSource {
    fn list_groups(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT group_name FROM master_queries ORDER BY group_name",
            )?;
            let groups = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(groups)
        })
        .context("Failed to list groups")
    }

    fn list_queries(&self, group_name: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT keyword FROM master_queries WHERE group_name = ?1 ORDER BY rowid",
            )?;
            let queries = stmt
                .query_map(params![group_name], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(queries)
        })
        .with_context(|| format!("Failed to list queries of group '{}'", group_name))
    }

    fn serp_payload(&self, group_name: &str, query: &str) -> Result<Option<String>> {
        let payload: Option<Option<String>> = self
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT serp_top_urls FROM master_queries WHERE group_name = ?1 AND keyword = ?2",
                    params![group_name, query],
                    |row| row.get(0),
                )
                .optional()
            })
            .with_context(|| format!("Failed to read SERP payload of '{}'", query))?;
        Ok(payload.flatten())
    }

    fn group_payloads(&self, group_name: &str) -> Result<Vec<(String, Option<String>)>> {
        let rows = self
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT keyword, serp_top_urls FROM master_queries WHERE group_name = ?1 ORDER BY rowid",
                )?;
                let rows = stmt
                    .query_map(params![group_name], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<(String, Option<String>)>>>()?;
                Ok(rows)
            })
            .with_context(|| format!("Failed to read SERP payloads of group '{}'", group_name))?;
        debug!("Group '{}': {} rows read from {}", group_name, rows.len(), self.path.display());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed_database(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("master_queries.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE master_queries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_name TEXT NOT NULL,
                keyword TEXT NOT NULL,
                serp_top_urls TEXT,
                serp_status TEXT,
                UNIQUE(group_name, keyword)
            );",
        )
        .unwrap();
        let rows: [(&str, &str, Option<&str>, &str); 5] = [
            ("скуд", "скуд купить", Some(r#"[{"url": "https://www.a.ru/1"}, {"url": "b.ru"}]"#), "completed"),
            ("скуд", "скуд цена", Some(r#"["https://a.ru/1/", "c.ru"]"#), "completed"),
            ("скуд", "скуд обои", None, "pending"),
            ("скуд", "скуд схема", Some(""), "failed"),
            ("обои", "обои в зал", Some(r#"["d.ru"]"#), "completed"),
        ];
        for (group, keyword, payload, status) in rows {
            conn.execute(
                "INSERT INTO master_queries (group_name, keyword, serp_top_urls, serp_status) VALUES (?1, ?2, ?3, ?4)",
                params![group, keyword, payload, status],
            )
            .unwrap();
        }
        path
    }

    #[test]
    fn test_sqlite_source_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = seed_database(&dir);
        let source = SqliteSerpSource::open(&path).unwrap();

        assert_eq!(source.list_groups().unwrap(), vec!["обои", "скуд"]);
        assert_eq!(
            source.list_queries("скуд").unwrap(),
            vec!["скуд купить", "скуд цена", "скуд обои", "скуд схема"]
        );
        assert_eq!(source.get_urls_for("скуд", "скуд купить").unwrap(), vec!["a.ru/1", "b.ru"]);
        assert_eq!(source.serp_payload("скуд", "скуд обои").unwrap(), None);
        assert_eq!(source.serp_payload("скуд", "нет").unwrap(), None);

        let data = source.load_group("скуд").unwrap();
        assert_eq!(data.with_urls.len(), 2);
        assert_eq!(data.without_urls, vec!["скуд обои", "скуд схема"]);
    }

    #[test]
    fn test_open_rejects_foreign_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE something (x INTEGER);")
            .unwrap();
        assert!(SqliteSerpSource::open(&path).is_err());
        assert!(SqliteSerpSource::open(&dir.path().join("missing.db")).is_err());
    }
}
