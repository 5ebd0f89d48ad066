use chrono::NaiveTime;
use sqlx::MySqlConnection;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    U64(u64),
    I32(i32),
    F64(f64),
    Time(NaiveTime),
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug, PartialEq)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Returns `None` when there is nothing to set.
pub fn build_update_sql(
    table: &str,
    columns: Vec<(&'static str, SqlValue)>,
    id_column: &str,
    id_value: u64,
) -> Option<SqlUpdate> {
    if columns.is_empty() {
        return None;
    }

    let set_clause = columns
        .iter()
        .map(|(column, _)| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table, set_clause, id_column
    );

    let mut values: Vec<SqlValue> = columns.into_iter().map(|(_, v)| v).collect();
    values.push(SqlValue::U64(id_value));

    Some(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(
    conn: &mut MySqlConnection,
    update: SqlUpdate,
) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::U64(v) => query.bind(v),
            SqlValue::I32(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Time(v) => query.bind(v),
        };
    }

    let result = query.execute(conn).await?;
    Ok(result.rows_affected())
}

/// ===============================
/// Unique key violation
/// ===============================
/// True only for duplicate-key errors. Other integrity failures (a foreign
/// key pointing nowhere, a NOT NULL column) share SQLSTATE 23000 and must
/// not be reported as "already exists".
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
