use crate::sql::{
    error::DbError,
    insert::{BulkInsert, ConnectionProvider},
    mssql::{
        params::MssqlParamStore,
        statement::{insert_sql, plan_chunks, quote_ident},
    },
};
use async_trait::async_trait;
use model::{execution::connection::ConnectionSettings, records::row::Row};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, trace};

pub type MssqlClient = Client<Compat<TcpStream>>;

/// Opens one authenticated TDS session.
pub async fn connect(settings: &ConnectionSettings) -> Result<MssqlClient, DbError> {
    let mut config = Config::new();
    config.host(&settings.host);
    config.port(settings.port);
    if !settings.database.is_empty() {
        config.database(&settings.database);
    }
    if settings.trust_cert {
        config.trust_cert();
    }
    config.encryption(EncryptionLevel::Required);
    config.authentication(AuthMethod::sql_server(&settings.user, &settings.password));

    debug!(address = %settings.address(), database = %settings.database, "Connecting to SQL Server");

    let tcp = TcpStream::connect(config.get_addr())
        .await
        .map_err(|e| DbError::Connection(format!("{}: {e}", settings.address())))?;
    tcp.set_nodelay(true)?;

    Client::connect(config, tcp.compat_write())
        .await
        .map_err(|e| DbError::Connection(e.to_string()))
}

/// SQL Server insert connection owned by one worker.
pub struct MssqlBulkInsert {
    client: MssqlClient,
    in_transaction: bool,
}

impl MssqlBulkInsert {
    pub fn new(client: MssqlClient) -> Self {
        Self {
            client,
            in_transaction: false,
        }
    }

    async fn batch(&mut self, sql: &str) -> Result<(), DbError> {
        self.client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }
}

#[async_trait]
impl BulkInsert for MssqlBulkInsert {
    async fn begin(&mut self) -> Result<(), DbError> {
        self.batch("BEGIN TRANSACTION").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn execute_bulk_insert(
        &mut self,
        table: &str,
        rows: &[Row],
        enable_identity_insert: bool,
    ) -> Result<u64, DbError> {
        let mut inserted = 0;

        for chunk in plan_chunks(rows) {
            let sql = insert_sql(table, &chunk, enable_identity_insert);
            let store = MssqlParamStore::from_values(chunk.values());
            trace!(table, rows = chunk.rows.len(), params = store.params.len(), "Executing insert");

            let result = self.client.execute(sql, &store.as_refs()).await?;
            inserted += result.rows_affected().iter().sum::<u64>();
        }

        Ok(inserted)
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        if !self.in_transaction {
            return Err(DbError::Write("Commit without an open transaction".to_string()));
        }
        self.batch("COMMIT TRANSACTION").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.in_transaction = false;
        self.batch("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await
    }
}

/// Opens a fresh SQL Server session per worker.
#[derive(Debug, Clone)]
pub struct MssqlProvider {
    settings: ConnectionSettings,
    schema: String,
}

impl MssqlProvider {
    pub fn new(settings: ConnectionSettings, schema: impl Into<String>) -> Self {
        Self {
            settings,
            schema: schema.into(),
        }
    }
}

#[async_trait]
impl ConnectionProvider for MssqlProvider {
    async fn get_connection(&self) -> Result<Box<dyn BulkInsert>, DbError> {
        let client = connect(&self.settings).await?;
        Ok(Box::new(MssqlBulkInsert::new(client)))
    }

    fn qualified_table_name(&self, table: &str) -> String {
        if self.schema.is_empty() {
            quote_ident(table)
        } else {
            format!("{}.{}", quote_ident(&self.schema), quote_ident(table))
        }
    }
}
