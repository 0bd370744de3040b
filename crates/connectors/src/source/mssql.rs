use crate::{
    sql::{
        error::DbError,
        mssql::{MssqlClient, connect, statement::quote_ident},
    },
    source::{SourceReader, SourceRecord, error::SourceError},
};
use async_trait::async_trait;
use model::execution::connection::ConnectionSettings;
use tiberius::ColumnData;
use tracing::debug;

/// Pages `(key, xml)` pairs out of the source table with keyset pagination.
pub struct MssqlSource {
    client: MssqlClient,
    query: String,
    table: String,
    page_size: usize,
    last_key: i64,
    exhausted: bool,
}

impl MssqlSource {
    pub async fn open(
        settings: &ConnectionSettings,
        table: &str,
        xml_column: &str,
        key_column: &str,
        page_size: usize,
    ) -> Result<Self, SourceError> {
        let client = connect(settings).await?;
        Ok(Self::with_client(client, table, xml_column, key_column, page_size))
    }

    pub fn with_client(
        client: MssqlClient,
        table: &str,
        xml_column: &str,
        key_column: &str,
        page_size: usize,
    ) -> Self {
        Self {
            client,
            query: page_query(table, xml_column, key_column),
            table: table.to_string(),
            page_size: page_size.max(1),
            last_key: i64::MIN,
            exhausted: false,
        }
    }

    pub fn start_after(mut self, app_id: Option<i64>) -> Self {
        if let Some(id) = app_id {
            self.last_key = id;
        }
        self
    }
}

/// `schema.table` is quoted part by part.
fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(|part| quote_ident(part.trim_matches(|c| c == '[' || c == ']')))
        .collect::<Vec<_>>()
        .join(".")
}

fn page_query(table: &str, xml_column: &str, key_column: &str) -> String {
    let key = quote_ident(key_column);
    format!(
        "SELECT TOP (@P1) {key}, {xml} FROM {table} WHERE {key} > @P2 ORDER BY {key}",
        xml = quote_ident(xml_column),
        table = quote_qualified(table),
    )
}

fn key_of(data: ColumnData<'static>) -> Option<i64> {
    match data {
        ColumnData::U8(Some(v)) => Some(i64::from(v)),
        ColumnData::I16(Some(v)) => Some(i64::from(v)),
        ColumnData::I32(Some(v)) => Some(i64::from(v)),
        ColumnData::I64(Some(v)) => Some(v),
        _ => None,
    }
}

fn xml_of(data: ColumnData<'static>) -> String {
    match data {
        ColumnData::Xml(Some(v)) => v.into_owned().into_string(),
        ColumnData::String(Some(v)) => v.into_owned(),
        _ => String::new(),
    }
}

#[async_trait]
impl SourceReader for MssqlSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<SourceRecord>>, SourceError> {
        if self.exhausted {
            return Ok(None);
        }

        let top = i64::try_from(self.page_size).unwrap_or(i64::MAX);
        let rows = self
            .client
            .query(self.query.as_str(), &[&top, &self.last_key])
            .await
            .map_err(DbError::from)?
            .into_first_result()
            .await
            .map_err(DbError::from)?;

        if rows.len() < self.page_size {
            self.exhausted = true;
        }
        if rows.is_empty() {
            return Ok(None);
        }

        let mut batch = Vec::with_capacity(rows.len());
        for row in rows {
            let mut cells = row.into_iter();
            let key = cells
                .next()
                .and_then(key_of)
                .ok_or_else(|| SourceError::InvalidRow(format!("non-integer key in {}", self.table)))?;
            let xml = cells.next().map(xml_of).unwrap_or_default();

            self.last_key = key;
            batch.push(SourceRecord {
                app_id: Some(key),
                xml,
                record_id: format!("{}:{}", self.table, key),
            });
        }

        debug!(table = %self.table, records = batch.len(), last_key = self.last_key, "Fetched source page");
        Ok(Some(batch))
    }
}
