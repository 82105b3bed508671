use crate::{Error, Lookup, MaterializationStore, ReadOp, ReadResult, WriteOp};
use anyhow::Context;
use rusqlite::OptionalExtension;
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS materializations (
    materialization TEXT NOT NULL,
    unit            TEXT NOT NULL,
    rule            TEXT NOT NULL,
    variant         TEXT,
    PRIMARY KEY (materialization, unit, rule)
);
"#;

const SELECT_VARIANT: &str = r#"
SELECT variant FROM materializations
WHERE materialization = ?1 AND unit = ?2 AND rule = ?3;
"#;

const UPSERT_VARIANT: &str = r#"
INSERT INTO materializations (materialization, unit, rule, variant)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT (materialization, unit, rule) DO UPDATE SET variant = excluded.variant;
"#;

/// SqliteStore persists sticky assignments in a SQLite database,
/// keyed by (materialization, unit, rule).
///
/// SQLite calls block, and are run on tokio's blocking thread pool.
/// The connection is None once the store is closed.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Option<rusqlite::Connection>>>,
}

impl SqliteStore {
    /// Open (or create) a store at the database `path`.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open(path)
            .with_context(|| format!("opening materializations database {}", path.display()))?;

        Self::from_connection(conn)
    }

    /// Open a store which lives only as long as this SqliteStore.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .context("opening in-memory materializations database")?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: rusqlite::Connection) -> anyhow::Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("creating materializations table")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    // Run `f` with the open connection on a blocking thread.
    async fn with_conn<F, T>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut rusqlite::Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        let result = tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap();
            let Some(conn) = conn.as_mut() else {
                anyhow::bail!("materialization store is closed");
            };
            f(conn)
        })
        .await
        .context("materializations database task failed")?;

        Ok(result?)
    }
}

fn read_all(conn: &rusqlite::Connection, ops: Vec<ReadOp>) -> anyhow::Result<Vec<ReadResult>> {
    let mut stmt = conn.prepare(SELECT_VARIANT)?;
    let mut results = Vec::with_capacity(ops.len());

    for op in ops {
        let row: Option<Option<String>> = stmt
            .query_row(
                rusqlite::params![op.materialization, op.unit, op.rule],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("reading materialization slot {op:?}"))?;

        let lookup = match row {
            Some(Some(variant)) => Lookup::Variant(variant),
            Some(None) => Lookup::Empty,
            None => Lookup::NotFound,
        };
        results.push(ReadResult::new(op, lookup));
    }
    Ok(results)
}

fn write_all(conn: &mut rusqlite::Connection, ops: &[WriteOp]) -> anyhow::Result<()> {
    let txn = conn.transaction()?;
    {
        let mut stmt = txn.prepare(UPSERT_VARIANT)?;

        for op in ops {
            stmt.execute(rusqlite::params![
                op.materialization,
                op.unit,
                op.rule,
                op.variant
            ])
            .with_context(|| format!("writing materialization slot {op:?}"))?;
        }
    }
    txn.commit().context("committing materialization writes")?;

    Ok(())
}

#[async_trait::async_trait]
impl MaterializationStore for SqliteStore {
    async fn read(&self, ops: Vec<ReadOp>) -> Result<Vec<ReadResult>, Error> {
        self.with_conn(move |conn| read_all(conn, ops)).await
    }

    async fn write(&self, ops: Vec<WriteOp>) -> Result<(), Error> {
        let count = ops.len();
        self.with_conn(move |conn| write_all(conn, &ops)).await?;

        tracing::debug!(count, "wrote materializations to sqlite");
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        let conn = self.conn.clone();

        // Closing flushes the database, and waits on the connection lock.
        let result = tokio::task::spawn_blocking(move || {
            let Some(conn) = conn.lock().unwrap().take() else {
                return Ok(());
            };
            conn.close().map_err(|(_conn, err)| {
                anyhow::Error::new(err).context("closing materializations database")
            })
        })
        .await
        .context("materializations database task failed")?;

        Ok(result?)
    }
}
