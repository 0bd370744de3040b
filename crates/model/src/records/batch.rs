use crate::{contract::tables::TargetTable, records::row::Row};
use std::collections::{BTreeMap, BTreeSet};

/// Every row produced from one source document, grouped by destination table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedRecords {
    tables: BTreeMap<TargetTable, Vec<Row>>,
    identity_tables: BTreeSet<TargetTable>,
}

impl MappedRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: TargetTable, row: Row) {
        self.tables.entry(table).or_default().push(row);
    }

    pub fn extend(&mut self, table: TargetTable, rows: impl IntoIterator<Item = Row>) {
        let mut rows = rows.into_iter().peekable();
        if rows.peek().is_some() {
            self.tables.entry(table).or_default().extend(rows);
        }
    }

    pub fn mark_identity_insert(&mut self, table: TargetTable) {
        self.identity_tables.insert(table);
    }

    pub fn requires_identity_insert(&self, table: TargetTable) -> bool {
        self.identity_tables.contains(&table)
    }

    pub fn rows(&self, table: TargetTable) -> &[Row] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(Vec::is_empty)
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Non-empty tables, following `order`; tables missing from `order` go last.
    pub fn ordered<'a>(&'a self, order: &[TargetTable]) -> Vec<(TargetTable, &'a [Row])> {
        let mut out: Vec<(TargetTable, &[Row])> = order
            .iter()
            .filter_map(|t| {
                self.tables
                    .get(t)
                    .filter(|rows| !rows.is_empty())
                    .map(|rows| (*t, rows.as_slice()))
            })
            .collect();

        for (table, rows) in &self.tables {
            if !rows.is_empty() && !order.contains(table) {
                out.push((*table, rows.as_slice()));
            }
        }
        out
    }

    pub fn tables_populated(&self, order: &[TargetTable]) -> Vec<String> {
        self.ordered(order)
            .into_iter()
            .map(|(t, _)| t.as_str().to_string())
            .collect()
    }

    pub fn to_json(&self, order: &[TargetTable]) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (table, rows) in self.ordered(order) {
            map.insert(
                table.as_str().to_string(),
                serde_json::Value::Array(rows.iter().map(Row::to_json).collect()),
            );
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;

    fn row(col: &str, v: i64) -> Row {
        [(col.to_string(), Value::Int(v))].into_iter().collect()
    }

    #[test]
    fn ordered_follows_insertion_order() {
        let mut records = MappedRecords::new();
        records.push(TargetTable::ContactAddress, row("con_id", 1));
        records.push(TargetTable::AppBase, row("app_id", 1));
        records.push(TargetTable::ContactBase, row("con_id", 1));

        let tables: Vec<_> = records
            .ordered(&TargetTable::DEFAULT_INSERTION_ORDER)
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tables,
            vec![
                TargetTable::AppBase,
                TargetTable::ContactBase,
                TargetTable::ContactAddress
            ]
        );
        assert_eq!(records.total_rows(), 3);
    }

    #[test]
    fn tables_outside_order_are_appended() {
        let mut records = MappedRecords::new();
        records.push(TargetTable::Scores, row("score", 0));
        records.push(TargetTable::AppBase, row("app_id", 1));
        let out = records.tables_populated(&[TargetTable::AppBase]);
        assert_eq!(out, vec!["app_base", "scores"]);
    }

    #[test]
    fn extend_with_nothing_leaves_no_table() {
        let mut records = MappedRecords::new();
        records.extend(TargetTable::Scores, Vec::new());
        assert!(records.is_empty());
        assert!(records.ordered(&TargetTable::DEFAULT_INSERTION_ORDER).is_empty());
    }
}
