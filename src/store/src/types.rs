// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Numeric type codes for serialized columns.
//!
//! The codes follow the Arrow C++ `Type::type` enumeration, which is what the
//! coordinator's client libraries decode.

use arrow_schema::DataType;

use graph_types::{Error, ErrorKind};

/// Maps a columnar type to its wire code.
///
/// Only the engine's supported property types are mapped; anything else is a
/// `DataType` error.
pub fn arrow_type_code(data_type: &DataType) -> Result<i32, Error> {
    match data_type {
        DataType::UInt32 => Ok(6),
        DataType::Int32 => Ok(7),
        DataType::UInt64 => Ok(8),
        DataType::Int64 => Ok(9),
        DataType::Float32 => Ok(11),
        DataType::Float64 => Ok(12),
        DataType::Utf8 => Ok(13),
        DataType::LargeUtf8 => Ok(34),
        other => Err(Error::new(
            ErrorKind::DataType,
            format!("unexpected type: {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_codes() {
        assert_eq!(arrow_type_code(&DataType::Int64).unwrap(), 9);
        assert_eq!(arrow_type_code(&DataType::Float64).unwrap(), 12);
        assert_eq!(arrow_type_code(&DataType::Utf8).unwrap(), 13);
    }

    #[test]
    fn test_unsupported_type_errors() {
        let err = arrow_type_code(&DataType::Boolean).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataType);
    }
}
