use crate::error::Result;
use crate::types::EnrichmentResult;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

/// SQLite-backed store for enriched locations.
pub struct LocationStore {
    conn: Connection,
}

/// One persisted row of the `locations` table.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRow {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub nearest_postcode: Option<String>,
}

impl LocationStore {
    /// Opens (creating if needed) the database at `path` and ensures the
    /// schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS locations (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                lat              REAL NOT NULL,
                lon              REAL NOT NULL,
                nearest_postcode TEXT,
                UNIQUE(lat, lon)
            );
            CREATE INDEX IF NOT EXISTS idx_locations_postcode ON locations(nearest_postcode);
            "#,
        )?;
        Ok(())
    }

    /// Inserts every result, silently skipping `(lat, lon)` pairs already
    /// present. Returns the number of rows actually written.
    pub fn insert_results(&mut self, results: &[EnrichmentResult]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO locations (lat, lon, nearest_postcode) VALUES (?1, ?2, ?3)",
            )?;
            for result in results {
                inserted += stmt.execute(params![
                    result.coordinate.lat,
                    result.coordinate.lon,
                    result.postcode(),
                ])?;
            }
        }
        tx.commit()?;
        info!("persisted {} new rows ({} submitted)", inserted, results.len());
        Ok(inserted)
    }

    pub fn all_rows(&self) -> Result<Vec<LocationRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, lat, lon, nearest_postcode FROM locations ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LocationRow {
                    id: row.get(0)?,
                    lat: row.get(1)?,
                    lon: row.get(2)?,
                    nearest_postcode: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn row_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
