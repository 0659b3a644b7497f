use anyhow::{bail, Context, Result};
use arrow::datatypes::{DataType, Schema};
use tokio_postgres::types::Type;

/// Map an arrow column type to its postgres counterpart.
///
/// Covers:
/// - Boolean                  → BOOL
/// - Int8, Int16              → INT2
/// - Int32                    → INT4
/// - Int64                    → INT8
/// - Float32                  → FLOAT4
/// - Float64                  → FLOAT8
/// - Utf8, LargeUtf8          → TEXT
/// - Binary, LargeBinary      → BYTEA
/// - Timestamp without tz     → TIMESTAMP
/// - Timestamp with tz        → TIMESTAMPTZ
/// - Date32, Date64           → DATE
///
/// Anything else (lists, structs, decimals, ...) is rejected so the run fails
/// before any DDL is issued, not halfway through an insert.
pub fn pg_type(dt: &DataType) -> Result<Type> {
    Ok(match dt {
        DataType::Boolean => Type::BOOL,
        DataType::Int8 | DataType::Int16 => Type::INT2,
        DataType::Int32 => Type::INT4,
        DataType::Int64 => Type::INT8,
        DataType::Float32 => Type::FLOAT4,
        DataType::Float64 => Type::FLOAT8,
        DataType::Utf8 | DataType::LargeUtf8 => Type::TEXT,
        DataType::Binary | DataType::LargeBinary => Type::BYTEA,
        DataType::Timestamp(_, None) => Type::TIMESTAMP,
        DataType::Timestamp(_, Some(_)) => Type::TIMESTAMPTZ,
        DataType::Date32 | DataType::Date64 => Type::DATE,
        other => bail!("unsupported column type `{other}`"),
    })
}

/// Postgres types for every column of `schema`, in field order.
pub fn pg_types(schema: &Schema) -> Result<Vec<Type>> {
    schema
        .fields()
        .iter()
        .map(|f| pg_type(f.data_type()).with_context(|| format!("column `{}`", f.name())))
        .collect()
}

/// DDL that drops any previous incarnation of `table` and recreates it empty,
/// with columns named and ordered exactly as in `schema`. Destructive on
/// purpose: each run replaces the table wholesale.
pub fn create_table_sql(table: &str, schema: &Schema) -> Result<String> {
    let cols = schema
        .fields()
        .iter()
        .map(|f| {
            let ty = pg_type(f.data_type()).with_context(|| format!("column `{}`", f.name()))?;
            Ok(format!("{} {}", quote_ident(f.name()), ty.name()))
        })
        .collect::<Result<Vec<_>>>()?
        .join(", ");

    let table = quote_ident(table);
    Ok(format!(
        "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({cols});"
    ))
}

/// COPY statement for bulk-loading one chunk, column list matching the DDL.
pub fn copy_in_sql(table: &str, schema: &Schema) -> String {
    let cols = schema
        .fields()
        .iter()
        .map(|f| quote_ident(f.name()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "COPY {} ({cols}) FROM STDIN BINARY",
        quote_ident(table)
    )
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
