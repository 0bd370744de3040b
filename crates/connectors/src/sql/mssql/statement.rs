use model::{core::value::Value, records::row::Row};

/// SQL Server rejects statements with more than 2100 parameters.
pub const MAX_PARAMS: usize = 2000;

/// Row-constructor limit of a single `INSERT ... VALUES`.
pub const MAX_ROWS: usize = 1000;

/// Rows sharing one column list, small enough for one statement.
#[derive(Debug, PartialEq)]
pub struct InsertChunk<'a> {
    pub columns: Vec<&'a str>,
    pub rows: Vec<&'a Row>,
}

impl InsertChunk<'_> {
    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().flat_map(move |row| {
            self.columns
                .iter()
                .map(move |c| row.get(c).unwrap_or(&Value::Null))
        })
    }
}

/// Groups consecutive rows with identical column sets and splits each group
/// under the parameter and row limits.
pub fn plan_chunks(rows: &[Row]) -> Vec<InsertChunk<'_>> {
    let mut chunks: Vec<InsertChunk<'_>> = Vec::new();

    for row in rows {
        let columns: Vec<&str> = row.columns().collect();
        if columns.is_empty() {
            continue;
        }
        let per_chunk = (MAX_PARAMS / columns.len()).clamp(1, MAX_ROWS);

        match chunks.last_mut() {
            Some(last) if last.columns == columns && last.rows.len() < per_chunk => {
                last.rows.push(row);
            }
            _ => chunks.push(InsertChunk {
                columns,
                rows: vec![row],
            }),
        }
    }

    chunks
}

pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Parameterised multi-row insert, wrapped in `SET IDENTITY_INSERT` when
/// explicit identity values are supplied.
pub fn insert_sql(table: &str, chunk: &InsertChunk<'_>, identity_insert: bool) -> String {
    let columns = chunk
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let width = chunk.columns.len();
    let tuples = (0..chunk.rows.len())
        .map(|r| {
            let params = (1..=width)
                .map(|c| format!("@P{}", r * width + c))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({params})")
        })
        .collect::<Vec<_>>()
        .join(", ");

    let insert = format!("INSERT INTO {table} ({columns}) VALUES {tuples};");
    if identity_insert {
        format!("SET IDENTITY_INSERT {table} ON; {insert} SET IDENTITY_INSERT {table} OFF;")
    } else {
        insert
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, i64)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Int(*v)))
            .collect()
    }

    #[test]
    fn test_insert_sql_numbers_params_row_major() {
        let rows = vec![row(&[("a", 1), ("b", 2)]), row(&[("a", 3), ("b", 4)])];
        let chunks = plan_chunks(&rows);
        assert_eq!(chunks.len(), 1);

        let sql = insert_sql("[dbo].[t]", &chunks[0], false);
        assert_eq!(
            sql,
            "INSERT INTO [dbo].[t] ([a], [b]) VALUES (@P1, @P2), (@P3, @P4);"
        );
        let values: Vec<_> = chunks[0].values().cloned().collect();
        assert_eq!(values, [1, 2, 3, 4].map(Value::Int));
    }

    #[test]
    fn test_identity_insert_wraps_statement() {
        let rows = vec![row(&[("app_id", 1)])];
        let chunks = plan_chunks(&rows);
        let sql = insert_sql("[dbo].[app_base]", &chunks[0], true);
        assert!(sql.starts_with("SET IDENTITY_INSERT [dbo].[app_base] ON;"));
        assert!(sql.ends_with("SET IDENTITY_INSERT [dbo].[app_base] OFF;"));
    }

    #[test]
    fn test_chunks_respect_parameter_limit() {
        let wide: Vec<(String, i64)> = (0..30).map(|i| (format!("c{i}"), i)).collect();
        let wide: Vec<(&str, i64)> = wide.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        let rows: Vec<Row> = (0..200).map(|_| row(&wide)).collect();

        let chunks = plan_chunks(&rows);
        assert!(chunks.iter().all(|c| c.rows.len() * c.columns.len() <= MAX_PARAMS));
        assert_eq!(chunks.iter().map(|c| c.rows.len()).sum::<usize>(), 200);
        assert_eq!(chunks[0].rows.len(), 66);
    }

    #[test]
    fn test_differing_columns_start_new_chunk() {
        let rows = vec![row(&[("a", 1)]), row(&[("a", 1), ("b", 2)]), row(&[("a", 5)])];
        assert_eq!(plan_chunks(&rows).len(), 3);
    }

    #[test]
    fn test_quote_ident_escapes_brackets() {
        assert_eq!(quote_ident("we]ird"), "[we]]ird]");
    }
}
