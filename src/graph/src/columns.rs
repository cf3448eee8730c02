// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Helpers for the supported columnar property types.
//!
//! The engine supports exactly {i32, i64, u32, u64, f32, f64, utf8,
//! large-utf8}; everything else surfaces a `DataType` error at the point of
//! dispatch.

use std::sync::Arc;

use arrow_array::{
    Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray, UInt32Array, UInt64Array,
};
use arrow_schema::DataType;

use graph_types::{Archive, Error, ErrorKind};

fn unexpected(data_type: &DataType) -> Error {
    Error::new(
        ErrorKind::DataType,
        format!("unexpected type: {}", data_type),
    )
}

/// The engine's name for a supported columnar type.
pub fn type_name(data_type: &DataType) -> Result<&'static str, Error> {
    match data_type {
        DataType::Int32 => Ok("int32"),
        DataType::Int64 => Ok("int64"),
        DataType::UInt32 => Ok("uint32"),
        DataType::UInt64 => Ok("uint64"),
        DataType::Float32 => Ok("float"),
        DataType::Float64 => Ok("double"),
        DataType::Utf8 => Ok("string"),
        DataType::LargeUtf8 => Ok("large_string"),
        other => Err(unexpected(other)),
    }
}

/// The inverse of [`type_name`].
pub fn type_from_name(name: &str) -> Result<DataType, Error> {
    match name {
        "int32" => Ok(DataType::Int32),
        "int64" => Ok(DataType::Int64),
        "uint32" => Ok(DataType::UInt32),
        "uint64" => Ok(DataType::UInt64),
        "float" => Ok(DataType::Float32),
        "double" => Ok(DataType::Float64),
        "string" => Ok(DataType::Utf8),
        "large_string" => Ok(DataType::LargeUtf8),
        other => Err(Error::new(
            ErrorKind::DataType,
            format!("unexpected type name: {}", other),
        )),
    }
}

/// Infers the columnar type of a JSON property value.
pub fn infer_type(value: &serde_json::Value) -> Result<DataType, Error> {
    match value {
        serde_json::Value::Number(n) if n.is_i64() => Ok(DataType::Int64),
        serde_json::Value::Number(_) => Ok(DataType::Float64),
        serde_json::Value::String(_) => Ok(DataType::Utf8),
        other => Err(Error::new(
            ErrorKind::DataType,
            format!("cannot infer a columnar type for {}", other),
        )),
    }
}

/// Builds an Arrow column of the given type from JSON property values.
pub fn build_column(data_type: &DataType, values: &[serde_json::Value]) -> Result<ArrayRef, Error> {
    fn numeric<T, F>(values: &[serde_json::Value], f: F) -> Result<Vec<T>, Error>
    where
        F: Fn(&serde_json::Value) -> Option<T>,
    {
        values
            .iter()
            .map(|v| {
                f(v).ok_or_else(|| {
                    Error::new(
                        ErrorKind::DataType,
                        format!("property value {} does not fit the column type", v),
                    )
                })
            })
            .collect()
    }

    let array: ArrayRef = match data_type {
        DataType::Int32 => Arc::new(Int32Array::from(numeric(values, |v| {
            v.as_i64().map(|i| i as i32)
        })?)),
        DataType::Int64 => Arc::new(Int64Array::from(numeric(values, |v| v.as_i64())?)),
        DataType::UInt32 => Arc::new(UInt32Array::from(numeric(values, |v| {
            v.as_u64().map(|i| i as u32)
        })?)),
        DataType::UInt64 => Arc::new(UInt64Array::from(numeric(values, |v| v.as_u64())?)),
        DataType::Float32 => Arc::new(Float32Array::from(numeric(values, |v| {
            v.as_f64().map(|f| f as f32)
        })?)),
        DataType::Float64 => Arc::new(Float64Array::from(numeric(values, |v| v.as_f64())?)),
        DataType::Utf8 => Arc::new(StringArray::from(numeric(values, |v| {
            v.as_str().map(|s| s.to_string())
        })?)),
        DataType::LargeUtf8 => Arc::new(LargeStringArray::from(numeric(values, |v| {
            v.as_str().map(|s| s.to_string())
        })?)),
        other => return Err(unexpected(other)),
    };
    Ok(array)
}

/// Reads one cell of a column as a JSON value, dispatching on the columnar
/// type.
pub fn column_value(array: &ArrayRef, row: usize) -> Result<serde_json::Value, Error> {
    let value = match array.data_type() {
        DataType::Int32 => {
            serde_json::Value::from(array.as_any().downcast_ref::<Int32Array>().unwrap().value(row))
        }
        DataType::Int64 => {
            serde_json::Value::from(array.as_any().downcast_ref::<Int64Array>().unwrap().value(row))
        }
        DataType::UInt32 => serde_json::Value::from(
            array.as_any().downcast_ref::<UInt32Array>().unwrap().value(row),
        ),
        DataType::UInt64 => serde_json::Value::from(
            array.as_any().downcast_ref::<UInt64Array>().unwrap().value(row),
        ),
        DataType::Float32 => serde_json::Value::from(
            array.as_any().downcast_ref::<Float32Array>().unwrap().value(row),
        ),
        DataType::Float64 => serde_json::Value::from(
            array.as_any().downcast_ref::<Float64Array>().unwrap().value(row),
        ),
        DataType::Utf8 => serde_json::Value::from(
            array.as_any().downcast_ref::<StringArray>().unwrap().value(row),
        ),
        DataType::LargeUtf8 => serde_json::Value::from(
            array
                .as_any()
                .downcast_ref::<LargeStringArray>()
                .unwrap()
                .value(row),
        ),
        other => return Err(unexpected(other)),
    };
    Ok(value)
}

/// Reads one cell of a numeric column as an `f64`, if the column is numeric.
pub fn column_f64(array: &ArrayRef, row: usize) -> Option<f64> {
    match array.data_type() {
        DataType::Int32 => Some(f64::from(
            array.as_any().downcast_ref::<Int32Array>().unwrap().value(row),
        )),
        DataType::Int64 => {
            Some(array.as_any().downcast_ref::<Int64Array>().unwrap().value(row) as f64)
        }
        DataType::UInt32 => Some(f64::from(
            array.as_any().downcast_ref::<UInt32Array>().unwrap().value(row),
        )),
        DataType::UInt64 => {
            Some(array.as_any().downcast_ref::<UInt64Array>().unwrap().value(row) as f64)
        }
        DataType::Float32 => Some(f64::from(
            array.as_any().downcast_ref::<Float32Array>().unwrap().value(row),
        )),
        DataType::Float64 => {
            Some(array.as_any().downcast_ref::<Float64Array>().unwrap().value(row))
        }
        _ => None,
    }
}

/// Serializes the selected rows of a column into an archive.
///
/// Numeric payloads are raw little-endian values; strings are individually
/// length-prefixed.
pub fn serialize_column(array: &ArrayRef, rows: &[usize], arc: &mut Archive) -> Result<(), Error> {
    match array.data_type() {
        DataType::Int32 => {
            let a = array.as_any().downcast_ref::<Int32Array>().unwrap();
            for &row in rows {
                arc.write_i32(a.value(row));
            }
        }
        DataType::Int64 => {
            let a = array.as_any().downcast_ref::<Int64Array>().unwrap();
            for &row in rows {
                arc.write_i64(a.value(row));
            }
        }
        DataType::UInt32 => {
            let a = array.as_any().downcast_ref::<UInt32Array>().unwrap();
            for &row in rows {
                arc.write_i32(a.value(row) as i32);
            }
        }
        DataType::UInt64 => {
            let a = array.as_any().downcast_ref::<UInt64Array>().unwrap();
            for &row in rows {
                arc.write_u64(a.value(row));
            }
        }
        DataType::Float32 => {
            let a = array.as_any().downcast_ref::<Float32Array>().unwrap();
            for &row in rows {
                arc.write_f32(a.value(row));
            }
        }
        DataType::Float64 => {
            let a = array.as_any().downcast_ref::<Float64Array>().unwrap();
            for &row in rows {
                arc.write_f64(a.value(row));
            }
        }
        DataType::Utf8 => {
            let a = array.as_any().downcast_ref::<StringArray>().unwrap();
            for &row in rows {
                arc.write_str(a.value(row));
            }
        }
        DataType::LargeUtf8 => {
            let a = array.as_any().downcast_ref::<LargeStringArray>().unwrap();
            for &row in rows {
                arc.write_str(a.value(row));
            }
        }
        other => return Err(unexpected(other)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_read_back() {
        let values = vec![serde_json::json!(1), serde_json::json!(2)];
        let col = build_column(&DataType::Int64, &values).unwrap();
        assert_eq!(column_value(&col, 1).unwrap(), serde_json::json!(2));
        assert_eq!(column_f64(&col, 0), Some(1.0));
    }

    #[test]
    fn test_unsupported_type() {
        let err = build_column(&DataType::Boolean, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataType);
        assert_eq!(type_name(&DataType::Date32).unwrap_err().kind(), ErrorKind::DataType);
    }

    #[test]
    fn test_infer() {
        assert_eq!(infer_type(&serde_json::json!(3)).unwrap(), DataType::Int64);
        assert_eq!(
            infer_type(&serde_json::json!(0.5)).unwrap(),
            DataType::Float64
        );
        assert_eq!(
            infer_type(&serde_json::json!("x")).unwrap(),
            DataType::Utf8
        );
        assert!(infer_type(&serde_json::json!(null)).is_err());
    }
}
