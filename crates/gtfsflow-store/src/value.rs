//! Conversions between core values and SQLite values.

use gtfsflow_core::row::Row;
use gtfsflow_core::schema::TableDef;
use gtfsflow_core::value::Value;
use rusqlite::types::{Value as SqlValue, ValueRef};

pub fn to_sql(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

pub fn from_sql(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
    }
}

/// Parameters for one row in `TableDef::storage_columns` order.
pub fn row_params(def: &TableDef, row: &Row) -> Vec<SqlValue> {
    let mut params = Vec::with_capacity(def.columns.len() + usize::from(def.custom_fields));
    for idx in 0..def.columns.len() {
        params.push(row.get(idx).map_or(SqlValue::Null, to_sql));
    }
    if def.custom_fields {
        params.push(row.extra.clone().map_or(SqlValue::Null, SqlValue::Text));
    }
    params
}

/// Decode a result row selected with `TableDef::storage_columns`.
pub fn read_row(def: &TableDef, sql_row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    let width = def.columns.len();
    let mut values = Vec::with_capacity(width);
    for idx in 0..width {
        values.push(from_sql(sql_row.get_ref(idx)?));
    }
    let extra = if def.custom_fields {
        sql_row.get::<_, Option<String>>(width)?
    } else {
        None
    };
    Ok(Row::new(values).with_extra(extra))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfsflow_core::feed;

    #[test]
    fn bools_bind_as_integers() {
        assert_eq!(to_sql(&Value::Bool(true)), SqlValue::Integer(1));
        assert_eq!(to_sql(&Value::Null), SqlValue::Null);
    }

    #[test]
    fn short_rows_are_padded_with_nulls() {
        let row = Row::new(vec![Value::from("A")]).with_extra(Some("{}".into()));
        let params = row_params(&feed::AGENCY, &row);
        assert_eq!(params.len(), feed::AGENCY.columns.len() + 1);
        assert_eq!(params[1], SqlValue::Null);
        assert_eq!(params.last(), Some(&SqlValue::Text("{}".into())));
    }
}
