use crate::sql::{
    error::DbError,
    insert::{BulkInsert, ConnectionProvider},
};
use async_trait::async_trait;
use model::records::row::Row;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
};

/// Decides whether an insert into `table` should fail.
pub type FailureHook = Arc<dyn Fn(&str, &[Row]) -> Option<DbError> + Send + Sync>;

#[derive(Debug, Default)]
struct Committed {
    tables: BTreeMap<String, Vec<Row>>,
    identity_inserts: BTreeSet<String>,
    commits: usize,
    rollbacks: usize,
}

/// In-memory sink used for dry runs and tests. Every connection handed out
/// shares the same committed store.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    schema: String,
    store: Arc<Mutex<Committed>>,
    hook: Option<FailureHook>,
}

impl MemoryProvider {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            ..Self::default()
        }
    }

    pub fn with_failure_hook(mut self, hook: FailureHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Committed rows of an already-qualified table.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn tables(&self) -> Vec<String> {
        self.lock().tables.keys().cloned().collect()
    }

    pub fn total_rows(&self) -> usize {
        self.lock().tables.values().map(Vec::len).sum()
    }

    pub fn used_identity_insert(&self, table: &str) -> bool {
        self.lock().identity_inserts.contains(table)
    }

    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Committed> {
        // A poisoned store only means a test thread panicked mid-write.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ConnectionProvider for MemoryProvider {
    async fn get_connection(&self) -> Result<Box<dyn BulkInsert>, DbError> {
        Ok(Box::new(MemoryConnection {
            provider: self.clone(),
            pending: None,
        }))
    }

    fn qualified_table_name(&self, table: &str) -> String {
        if self.schema.is_empty() {
            format!("[{table}]")
        } else {
            format!("[{}].[{}]", self.schema, table)
        }
    }
}

#[derive(Default)]
struct Pending {
    tables: BTreeMap<String, Vec<Row>>,
    identity_inserts: BTreeSet<String>,
}

pub struct MemoryConnection {
    provider: MemoryProvider,
    pending: Option<Pending>,
}

#[async_trait]
impl BulkInsert for MemoryConnection {
    async fn begin(&mut self) -> Result<(), DbError> {
        if self.pending.is_some() {
            return Err(DbError::Write("Transaction already open".to_string()));
        }
        self.pending = Some(Pending::default());
        Ok(())
    }

    async fn execute_bulk_insert(
        &mut self,
        table: &str,
        rows: &[Row],
        enable_identity_insert: bool,
    ) -> Result<u64, DbError> {
        if let Some(err) = self.provider.hook.as_ref().and_then(|hook| hook(table, rows)) {
            return Err(err);
        }

        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| DbError::Write("No open transaction".to_string()))?;
        pending
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        if enable_identity_insert {
            pending.identity_inserts.insert(table.to_string());
        }
        Ok(rows.len() as u64)
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| DbError::Write("No open transaction".to_string()))?;

        let mut store = self.provider.lock();
        for (table, rows) in pending.tables {
            store.tables.entry(table).or_default().extend(rows);
        }
        store.identity_inserts.extend(pending.identity_inserts);
        store.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.pending = None;
        self.provider.lock().rollbacks += 1;
        Ok(())
    }
}
