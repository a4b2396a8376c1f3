//! Generic CRUD over registered tables.
//!
//! Nothing in here knows a concrete row type: every operation takes a
//! [`TableDescriptor`] and works on dynamically typed cell values, so one
//! implementation serves every table in the registry. Table and column names
//! are interpolated into SQL only from descriptors, never from request input;
//! submitted values always go through placeholders.

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

use crate::{
    admin::schema::{Column, ColumnType, TableDescriptor},
    error::ApiError,
};

/// A dynamically typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    Null,
}

impl FieldValue {
    /// Form-input / display representation; NULL renders empty.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Null => String::new(),
        }
    }
}

/// Coerce one submitted form value according to the column's type tag.
/// An empty string on an integer column means NULL (blank optional input).
fn coerce(col: &Column, raw: &str) -> Result<FieldValue, ApiError> {
    match col.ty {
        ColumnType::Integer => {
            if raw.is_empty() {
                Ok(FieldValue::Null)
            } else {
                raw.parse::<i64>().map(FieldValue::Integer).map_err(|_| {
                    ApiError::bad_request(format!(
                        "field `{}` expects an integer, got `{raw}`",
                        col.name
                    ))
                })
            }
        }
        ColumnType::Text => Ok(FieldValue::Text(raw.to_string())),
    }
}

/// Match submitted (name, value) pairs against the descriptor, coercing each.
fn coerce_fields(
    table: &TableDescriptor,
    fields: &[(String, String)],
) -> Result<Vec<(&'static str, FieldValue)>, ApiError> {
    let mut coerced = Vec::with_capacity(fields.len());
    for (key, raw) in fields {
        let col = table.column(key).ok_or_else(|| {
            ApiError::bad_request(format!("unknown field `{key}` for table `{}`", table.name))
        })?;
        coerced.push((col.name, coerce(col, raw)?));
    }
    if coerced.is_empty() {
        return Err(ApiError::bad_request("no fields submitted"));
    }
    Ok(coerced)
}

fn bind<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    value: &FieldValue,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match value {
        FieldValue::Integer(i) => query.bind(*i),
        FieldValue::Text(s) => query.bind(s.clone()),
        FieldValue::Null => query.bind(Option::<i64>::None),
    }
}

fn select_list(table: &TableDescriptor) -> String {
    table
        .columns
        .iter()
        .map(|c| format!("\"{}\"", c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn row_values(row: &SqliteRow, table: &TableDescriptor) -> anyhow::Result<Vec<FieldValue>> {
    let mut values = Vec::with_capacity(table.columns.len());
    for (i, col) in table.columns.iter().enumerate() {
        let value = match col.ty {
            ColumnType::Integer => row
                .try_get::<Option<i64>, _>(i)?
                .map_or(FieldValue::Null, FieldValue::Integer),
            ColumnType::Text => row
                .try_get::<Option<String>, _>(i)?
                .map_or(FieldValue::Null, FieldValue::Text),
        };
        values.push(value);
    }
    Ok(values)
}

/// All rows of a table, cells in descriptor column order.
pub async fn list_rows(
    db: &SqlitePool,
    table: &TableDescriptor,
) -> anyhow::Result<Vec<Vec<FieldValue>>> {
    let sql = format!(
        "SELECT {} FROM \"{}\" ORDER BY \"id\"",
        select_list(table),
        table.name
    );
    let rows = sqlx::query(&sql).fetch_all(db).await?;
    rows.iter().map(|row| row_values(row, table)).collect()
}

/// One row by id, for the edit form.
pub async fn get_row(
    db: &SqlitePool,
    table: &TableDescriptor,
    id: i64,
) -> anyhow::Result<Option<Vec<FieldValue>>> {
    let sql = format!(
        "SELECT {} FROM \"{}\" WHERE \"id\" = ?",
        select_list(table),
        table.name
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(db).await?;
    row.map(|row| row_values(&row, table)).transpose()
}

pub async fn count_rows(db: &SqlitePool, table: &TableDescriptor) -> anyhow::Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.name);
    let count = sqlx::query_scalar::<_, i64>(&sql).fetch_one(db).await?;
    Ok(count)
}

/// Insert a row from submitted form fields. Constraint violations from the
/// store (missing required field, bad foreign key, duplicate key) come back
/// as 400 with the store's message.
pub async fn create_row(
    db: &SqlitePool,
    table: &TableDescriptor,
    fields: &[(String, String)],
) -> Result<(), ApiError> {
    let coerced = coerce_fields(table, fields)?;
    let names = coerced
        .iter()
        .map(|(name, _)| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; coerced.len()].join(", ");
    let sql = format!(
        "INSERT INTO \"{}\" ({names}) VALUES ({placeholders})",
        table.name
    );

    let mut query = sqlx::query(&sql);
    for (_, value) in &coerced {
        query = bind(query, value);
    }
    query
        .execute(db)
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to create row: {e}")))?;

    debug!(table = table.name, "row created");
    Ok(())
}

/// Update the row matching `id` with the submitted fields.
pub async fn update_row(
    db: &SqlitePool,
    table: &TableDescriptor,
    id: i64,
    fields: &[(String, String)],
) -> Result<(), ApiError> {
    let coerced = coerce_fields(table, fields)?;
    let assignments = coerced
        .iter()
        .map(|(name, _)| format!("\"{name}\" = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE \"{}\" SET {assignments} WHERE \"id\" = ?",
        table.name
    );

    let mut query = sqlx::query(&sql);
    for (_, value) in &coerced {
        query = bind(query, value);
    }
    query
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to update row: {e}")))?;

    debug!(table = table.name, id, "row updated");
    Ok(())
}

/// Delete a row, removing the dependents named by the descriptor's cascades
/// first. Everything runs in one transaction so a failed cascade leaves no
/// orphaned or half-deleted state behind.
pub async fn delete_row(db: &SqlitePool, table: &TableDescriptor, id: i64) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;
    for cascade in table.cascades {
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = ?",
            cascade.table, cascade.column
        );
        sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
    }
    let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = ?", table.name);
    sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
    tx.commit().await?;

    debug!(table = table.name, id, "row deleted");
    Ok(())
}
