use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::info;

use crate::model::{StoreCounts, StoreRow};
use crate::util::{ensure_directory, now_utc_string};

const STORE_SCHEMA_VERSION: &str = "1";

/// Opens (creating if needed) the annotation store.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let connection =
        Connection::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

/// Opens an existing store without creating or migrating it.
pub fn open_store_read_only(path: &Path) -> Result<Connection> {
    if !path.exists() {
        bail!("annotation store not found: {}", path.display());
    }

    let connection = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open {} read-only", path.display()))?;

    let version = connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'store_schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .with_context(|| format!("failed to read schema version of {}", path.display()))?;
    if version.as_deref() != Some(STORE_SCHEMA_VERSION) {
        bail!(
            "unsupported annotation store schema {:?} in {}",
            version,
            path.display()
        );
    }

    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS annotations (
          row_id INTEGER PRIMARY KEY AUTOINCREMENT,
          datetime TEXT,
          annotator TEXT,
          incident_ID TEXT,
          stakeholders TEXT,
          harm_category TEXT,
          harm_subcategory TEXT,
          harm_type TEXT,
          notes TEXT,
          timestamp TEXT,
          session_id TEXT,
          inserted_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_annotations_incident ON annotations(incident_ID);
        CREATE INDEX IF NOT EXISTS idx_annotations_annotator ON annotations(annotator);
        ",
        )
        .context("failed to create annotation store schema")?;

    connection
        .execute(
            "INSERT INTO metadata(key, value) VALUES('store_schema_version', ?1)
             ON CONFLICT(key) DO NOTHING",
            params![STORE_SCHEMA_VERSION],
        )
        .context("failed to record store schema version")?;

    Ok(())
}

/// Appends rows in one transaction. The store is append-only: rows are
/// never updated or deleted, a correction is a later submission.
pub fn append_rows(connection: &mut Connection, rows: &[StoreRow]) -> Result<usize> {
    let inserted_at = now_utc_string();
    let tx = connection
        .transaction()
        .context("failed to start annotation transaction")?;

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO annotations(
              datetime, annotator, incident_ID, stakeholders, harm_category,
              harm_subcategory, harm_type, notes, timestamp, session_id, inserted_at
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )?;

        for row in rows {
            statement
                .execute(params![
                    row.datetime,
                    row.annotator,
                    row.incident_id,
                    row.stakeholders,
                    row.harm_category,
                    row.harm_subcategory,
                    row.harm_type,
                    row.notes,
                    row.timestamp,
                    row.session_id,
                    inserted_at,
                ])
                .context("failed to insert annotation row")?;
        }
    }

    tx.commit().context("failed to commit annotation rows")?;
    info!(rows = rows.len(), "appended annotation rows");
    Ok(rows.len())
}

/// Every row in insertion order, read by a single statement.
pub fn load_snapshot(connection: &Connection) -> Result<Vec<StoreRow>> {
    let mut statement = connection.prepare(
        "
        SELECT
          datetime, annotator, incident_ID, stakeholders, harm_category,
          harm_subcategory, harm_type, notes, timestamp, session_id
        FROM annotations
        ORDER BY row_id ASC
        ",
    )?;

    let mut rows = statement.query([])?;
    let mut out = Vec::<StoreRow>::new();

    while let Some(row) = rows.next()? {
        out.push(StoreRow {
            datetime: row.get(0)?,
            annotator: row.get(1)?,
            incident_id: row.get(2)?,
            stakeholders: row.get(3)?,
            harm_category: row.get(4)?,
            harm_subcategory: row.get(5)?,
            harm_type: row.get(6)?,
            notes: row.get(7)?,
            timestamp: row.get(8)?,
            session_id: row.get(9)?,
        });
    }

    Ok(out)
}

pub fn store_counts(connection: &Connection) -> Result<StoreCounts> {
    let count = |sql: &str| -> Result<i64> {
        connection
            .query_row(sql, [], |row| row.get::<_, i64>(0))
            .with_context(|| format!("failed to run count query: {sql}"))
    };

    Ok(StoreCounts {
        rows: count("SELECT COUNT(*) FROM annotations")?,
        annotators: count("SELECT COUNT(DISTINCT annotator) FROM annotations")?,
        incidents: count("SELECT COUNT(DISTINCT incident_ID) FROM annotations")?,
        sessions: count(
            "SELECT COUNT(DISTINCT COALESCE(annotator, '') || char(31) || COALESCE(incident_ID, '') || char(31) || COALESCE(NULLIF(TRIM(session_id), ''), NULLIF(TRIM(timestamp), ''), ''))
             FROM annotations",
        )?,
        latest_datetime: connection
            .query_row("SELECT MAX(datetime) FROM annotations", [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .context("failed to read latest submission date")?,
    })
}
