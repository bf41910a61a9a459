use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, ToSql};

/// Tabular query result: ordered column names and ordered rows.
///
/// A query that matches nothing still yields a table with its column list
/// intact; only a failed query surfaces as an error.
#[derive(Debug, Clone, Default)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Run a read query with positional parameters and collect the full result.
pub fn query_table(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<QueryTable> {
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("prepare query: {sql}"))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let column_count = columns.len();

    let mut rows = Vec::new();
    let mut raw = stmt.query(params).context("execute query")?;
    while let Some(row) = raw.next().context("fetch row")? {
        let mut out = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            out.push(row.get::<_, Value>(idx).context("decode column")?);
        }
        rows.push(out);
    }

    Ok(QueryTable { columns, rows })
}

/// Run a single write statement inside its own transaction.
///
/// Commits on success and returns the affected row count; any failure
/// rolls the statement back, so a constraint violation never leaves a
/// partial write behind.
pub fn execute_write(conn: &mut Connection, sql: &str, params: &[&dyn ToSql]) -> Result<usize> {
    let tx = conn.transaction().context("begin write transaction")?;
    let changed = tx
        .execute(sql, params)
        .with_context(|| format!("execute write: {sql}"))?;
    tx.commit().context("commit write transaction")?;
    Ok(changed)
}

/// Render a stored value for display or export.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(n) => n.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}
