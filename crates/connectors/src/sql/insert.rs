use crate::sql::error::DbError;
use async_trait::async_trait;
use model::{
    contract::tables::TargetTable,
    records::{batch::MappedRecords, row::Row},
};
use tracing::{debug, warn};

/// A single connection able to bulk-load mapped rows inside a transaction.
#[async_trait]
pub trait BulkInsert: Send {
    async fn begin(&mut self) -> Result<(), DbError>;

    /// Inserts `rows` into the already-qualified `table` and returns the
    /// number of rows that landed.
    async fn execute_bulk_insert(
        &mut self,
        table: &str,
        rows: &[Row],
        enable_identity_insert: bool,
    ) -> Result<u64, DbError>;

    async fn commit(&mut self) -> Result<(), DbError>;

    async fn rollback(&mut self) -> Result<(), DbError>;
}

/// Hands out one [`BulkInsert`] per worker and resolves table names.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn get_connection(&self) -> Result<Box<dyn BulkInsert>, DbError>;

    fn qualified_table_name(&self, table: &str) -> String;
}

/// Writes every table of `records` in `order` inside one transaction.
///
/// Any failure rolls the whole document back, so a record either lands
/// completely or not at all.
pub async fn write_records(
    conn: &mut dyn BulkInsert,
    provider: &dyn ConnectionProvider,
    records: &MappedRecords,
    order: &[TargetTable],
) -> Result<u64, DbError> {
    conn.begin().await?;

    let mut inserted = 0;
    for (table, rows) in records.ordered(order) {
        if rows.is_empty() {
            continue;
        }
        let qualified = provider.qualified_table_name(table.as_str());
        let identity = records.requires_identity_insert(table);

        match conn.execute_bulk_insert(&qualified, rows, identity).await {
            Ok(count) => {
                debug!(table = %qualified, rows = count, "Inserted rows");
                inserted += count;
            }
            Err(err) => {
                if let Err(rollback_err) = conn.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                return Err(err);
            }
        }
    }

    conn.commit().await?;
    Ok(inserted)
}
