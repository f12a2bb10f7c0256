//! PostgreSQL backend
//!
//! `tokio-postgres` is driven from a private current-thread runtime so the
//! rest of the crate stays synchronous.

use tokio::runtime::Runtime;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info};

use crate::config::PostgresConfig;
use crate::entity::{ExtractedRow, FieldValue, SnapshotDate, UpsertStatement};

use super::{Dialect, Store, StoreError, after_rollback, count_sql};

type Param = Box<dyn ToSql + Sync + Send>;

/// PostgreSQL-backed store
pub struct PostgresStore {
    runtime: Runtime,
    client: Client,
}

impl PostgresStore {
    /// Connect using the given settings
    pub fn connect(settings: &PostgresConfig) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Connect(format!("failed to start runtime: {e}")))?;

        let mut config = tokio_postgres::Config::new();
        config
            .host(&settings.host)
            .port(settings.port)
            .dbname(&settings.database)
            .user(&settings.user)
            .password(&settings.password);

        let (client, connection) = runtime
            .block_on(config.connect(NoTls))
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        // Spawn connection handler
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        info!(server = %settings.describe(), "Connected to PostgreSQL");
        Ok(Self { runtime, client })
    }
}

fn bind(value: FieldValue) -> Param {
    match value {
        FieldValue::Integer(v) => Box::new(v),
        FieldValue::Decimal(v) => Box::new(v),
        FieldValue::Json(v) => Box::new(v),
        FieldValue::Date(date) => Box::new(date),
    }
}

impl Store for PostgresStore {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute_ddl(&mut self, statements: &[String]) -> Result<(), StoreError> {
        let Self {
            runtime, client, ..
        } = self;

        runtime.block_on(async {
            let tx = client.transaction().await?;
            for sql in statements {
                if let Err(e) = tx.batch_execute(sql).await {
                    return Err(after_rollback(e, tx.rollback().await));
                }
            }
            tx.commit().await?;
            Ok::<(), StoreError>(())
        })
    }

    fn upsert_rows(
        &mut self,
        statement: &UpsertStatement,
        rows: &[ExtractedRow],
    ) -> Result<usize, StoreError> {
        let sql = statement.render(Dialect::Postgres);
        let Self {
            runtime, client, ..
        } = self;

        runtime.block_on(async {
            let tx = client.transaction().await?;

            let result: Result<usize, tokio_postgres::Error> = async {
                let prepared = tx.prepare(&sql).await?;
                for row in rows {
                    let params: Vec<Param> = row.values().into_iter().map(bind).collect();
                    let refs: Vec<&(dyn ToSql + Sync)> = params
                        .iter()
                        .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                        .collect();
                    tx.execute(&prepared, &refs).await?;
                }
                Ok::<usize, tokio_postgres::Error>(rows.len())
            }
            .await;

            match result {
                Ok(written) => {
                    tx.commit().await?;
                    debug!(table = statement.table(), rows = written, "Batch committed");
                    Ok::<usize, StoreError>(written)
                }
                Err(e) => Err(after_rollback(e, tx.rollback().await)),
            }
        })
    }

    fn count_rows(&mut self, table: &str, date: Option<SnapshotDate>) -> Result<i64, StoreError> {
        let sql = count_sql(table, Dialect::Postgres, date.is_some());
        let Self {
            runtime, client, ..
        } = self;

        runtime.block_on(async {
            let row = match date {
                Some(date) => client.query_one(sql.as_str(), &[&date.to_string()]).await?,
                None => client.query_one(sql.as_str(), &[]).await?,
            };
            Ok::<i64, StoreError>(row.get(0))
        })
    }
}
