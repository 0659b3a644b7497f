use anyhow::{Context, Result};
use arrow::array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Date32Array, Date64Array, Float32Array,
    Float64Array, Int16Array, Int32Array, Int64Array, Int8Array, LargeBinaryArray,
    LargeStringArray, StringArray, TimestampMicrosecondArray, TimestampMillisecondArray,
    TimestampNanosecondArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_postgres::types::ToSql;

/// One decoded cell, owned and typed for the postgres binary COPY protocol.
/// `None` payloads are SQL NULLs.
#[derive(Debug, Clone, PartialEq)]
pub enum PgValue {
    Bool(Option<bool>),
    Int2(Option<i16>),
    Int4(Option<i32>),
    Int8(Option<i64>),
    Float4(Option<f32>),
    Float8(Option<f64>),
    Text(Option<String>),
    Bytea(Option<Vec<u8>>),
    Timestamp(Option<NaiveDateTime>),
    TimestampTz(Option<DateTime<Utc>>),
    Date(Option<NaiveDate>),
}

impl PgValue {
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            PgValue::Bool(v) => v,
            PgValue::Int2(v) => v,
            PgValue::Int4(v) => v,
            PgValue::Int8(v) => v,
            PgValue::Float4(v) => v,
            PgValue::Float8(v) => v,
            PgValue::Text(v) => v,
            PgValue::Bytea(v) => v,
            PgValue::Timestamp(v) => v,
            PgValue::TimestampTz(v) => v,
            PgValue::Date(v) => v,
        }
    }
}

/// Extract every cell of one arrow column into `PgValue`s, null-preserving.
/// The match mirrors the type mapping in [`crate::schema::pg_type`]; a column
/// type missing there is unreachable here because the schema is validated
/// before any chunk is written.
pub fn column_values(array: &ArrayRef) -> Result<Vec<PgValue>> {
    match array.data_type() {
        DataType::Boolean => Ok(downcast::<BooleanArray>(array)?
            .iter()
            .map(PgValue::Bool)
            .collect()),
        DataType::Int8 => Ok(downcast::<Int8Array>(array)?
            .iter()
            .map(|v| PgValue::Int2(v.map(i16::from)))
            .collect()),
        DataType::Int16 => Ok(downcast::<Int16Array>(array)?
            .iter()
            .map(PgValue::Int2)
            .collect()),
        DataType::Int32 => Ok(downcast::<Int32Array>(array)?
            .iter()
            .map(PgValue::Int4)
            .collect()),
        DataType::Int64 => Ok(downcast::<Int64Array>(array)?
            .iter()
            .map(PgValue::Int8)
            .collect()),
        DataType::Float32 => Ok(downcast::<Float32Array>(array)?
            .iter()
            .map(PgValue::Float4)
            .collect()),
        DataType::Float64 => Ok(downcast::<Float64Array>(array)?
            .iter()
            .map(PgValue::Float8)
            .collect()),
        DataType::Utf8 => Ok(downcast::<StringArray>(array)?
            .iter()
            .map(|v| PgValue::Text(v.map(str::to_owned)))
            .collect()),
        DataType::LargeUtf8 => Ok(downcast::<LargeStringArray>(array)?
            .iter()
            .map(|v| PgValue::Text(v.map(str::to_owned)))
            .collect()),
        DataType::Binary => Ok(downcast::<BinaryArray>(array)?
            .iter()
            .map(|v| PgValue::Bytea(v.map(<[u8]>::to_vec)))
            .collect()),
        DataType::LargeBinary => Ok(downcast::<LargeBinaryArray>(array)?
            .iter()
            .map(|v| PgValue::Bytea(v.map(<[u8]>::to_vec)))
            .collect()),
        DataType::Timestamp(unit, tz) => timestamp_values(array, unit, tz.is_some()),
        DataType::Date32 => downcast::<Date32Array>(array)?
            .iter()
            .map(|v| Ok(PgValue::Date(v.map(date_from_days).transpose()?)))
            .collect(),
        DataType::Date64 => downcast::<Date64Array>(array)?
            .iter()
            .map(|v| {
                let d = v
                    .map(|ms| ts_utc(&TimeUnit::Millisecond, ms).map(|dt| dt.date_naive()))
                    .transpose()?;
                Ok(PgValue::Date(d))
            })
            .collect(),
        other => anyhow::bail!("unsupported column type `{other}`"),
    }
}

fn timestamp_values(array: &ArrayRef, unit: &TimeUnit, with_tz: bool) -> Result<Vec<PgValue>> {
    let raw: Vec<Option<i64>> = match unit {
        TimeUnit::Second => downcast::<TimestampSecondArray>(array)?.iter().collect(),
        TimeUnit::Millisecond => downcast::<TimestampMillisecondArray>(array)?.iter().collect(),
        TimeUnit::Microsecond => downcast::<TimestampMicrosecondArray>(array)?.iter().collect(),
        TimeUnit::Nanosecond => downcast::<TimestampNanosecondArray>(array)?.iter().collect(),
    };

    raw.into_iter()
        .map(|v| {
            let utc = v.map(|v| ts_utc(unit, v)).transpose()?;
            Ok(if with_tz {
                PgValue::TimestampTz(utc)
            } else {
                PgValue::Timestamp(utc.map(|dt| dt.naive_utc()))
            })
        })
        .collect()
}

/// Arrow timestamps are epoch offsets in the schema's unit; postgres wants a
/// calendar value.
fn ts_utc(unit: &TimeUnit, v: i64) -> Result<DateTime<Utc>> {
    match unit {
        TimeUnit::Second => DateTime::from_timestamp(v, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(v),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(v),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(v)),
    }
    .with_context(|| format!("timestamp value {v} ({unit:?}) out of range"))
}

// 1970-01-01 in days-from-CE terms.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn date_from_days(days: i32) -> Result<NaiveDate> {
    UNIX_EPOCH_DAYS_FROM_CE
        .checked_add(days)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .with_context(|| format!("date value {days} out of range"))
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .context("arrow array type does not match its declared data type")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use std::sync::Arc;

    #[test]
    fn extracts_primitives_with_nulls() {
        let array: ArrayRef = Arc::new(Int64Array::from(vec![Some(7), None, Some(-1)]));
        let values = column_values(&array).unwrap();
        assert_eq!(
            values,
            vec![
                PgValue::Int8(Some(7)),
                PgValue::Int8(None),
                PgValue::Int8(Some(-1)),
            ]
        );

        let array: ArrayRef = Arc::new(StringArray::from(vec![Some("cash"), None]));
        let values = column_values(&array).unwrap();
        assert_eq!(values[0], PgValue::Text(Some("cash".into())));
        assert_eq!(values[1], PgValue::Text(None));
    }

    #[test]
    fn narrow_ints_widen_to_int2() {
        let array: ArrayRef = Arc::new(Int8Array::from(vec![Some(-5), None]));
        let values = column_values(&array).unwrap();
        assert_eq!(values[0], PgValue::Int2(Some(-5)));
        assert_eq!(values[1], PgValue::Int2(None));
    }

    #[test]
    fn microsecond_timestamps_become_naive_datetimes() {
        // 2020-09-13 12:26:40 UTC
        let array: ArrayRef = Arc::new(TimestampMicrosecondArray::from(vec![
            Some(1_600_000_000_000_000),
            None,
        ]));
        let values = column_values(&array).unwrap();
        let expected = NaiveDate::from_ymd_opt(2020, 9, 13)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(12, 26, 40).unwrap());
        assert_eq!(values[0], PgValue::Timestamp(Some(expected)));
        assert_eq!(values[1], PgValue::Timestamp(None));
    }

    #[test]
    fn zoned_timestamps_keep_the_tz_flavor() {
        let array: ArrayRef = Arc::new(
            TimestampMillisecondArray::from(vec![Some(0)]).with_timezone("UTC"),
        );
        let values = column_values(&array).unwrap();
        assert_eq!(
            values[0],
            PgValue::TimestampTz(Some(DateTime::from_timestamp(0, 0).unwrap()))
        );
    }

    #[test]
    fn date32_counts_days_from_epoch() {
        let array: ArrayRef = Arc::new(Date32Array::from(vec![Some(0), Some(19_358), None]));
        let values = column_values(&array).unwrap();
        assert_eq!(
            values[0],
            PgValue::Date(NaiveDate::from_ymd_opt(1970, 1, 1))
        );
        assert_eq!(
            values[1],
            PgValue::Date(NaiveDate::from_ymd_opt(2023, 1, 1))
        );
        assert_eq!(values[2], PgValue::Date(None));
    }

    #[test]
    fn unsupported_column_type_is_reported() {
        use arrow::array::ListBuilder;
        let mut builder = ListBuilder::new(arrow::array::Int32Builder::new());
        builder.append(true);
        let array: ArrayRef = Arc::new(builder.finish());
        let err = column_values(&array).unwrap_err();
        assert!(err.to_string().contains("unsupported column type"));
    }

    #[test]
    fn sliced_arrays_respect_offsets() {
        let array: ArrayRef = Arc::new(Int32Array::from((0..10).collect::<Vec<_>>()));
        let slice = array.slice(4, 3);
        let values = column_values(&slice).unwrap();
        assert_eq!(
            values,
            vec![
                PgValue::Int4(Some(4)),
                PgValue::Int4(Some(5)),
                PgValue::Int4(Some(6)),
            ]
        );
    }
}
