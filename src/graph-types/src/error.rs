// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::error;
use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

/// The closed set of error kinds recognized by the dispatcher and surfaced to
/// the coordinator.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A referenced artifact does not exist in the registry.
    NotFound,
    /// An artifact with the same id is already registered.
    DuplicateId,
    /// A registered artifact has a different type than requested.
    TypeMismatch,
    /// An argument was present but malformed.
    InvalidValue,
    /// A required argument was absent.
    MissingKey,
    /// The selector or serialization mode is not supported by this variant.
    UnsupportedOperation,
    /// The operation is not defined for this graph variant.
    InvalidOperation,
    /// A cross-fragment invariant would be violated.
    IllegalState,
    /// A columnar type outside the supported set was encountered.
    DataType,
    /// A dynamic library could not be loaded or is missing symbols.
    LibraryLoad,
    /// The shared object store reported a failure.
    StoreError,
    /// The communicator reported a failure mid-collective.
    CommError,
    /// The operation is recognized but not implemented in this build.
    Unimplemented,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::DuplicateId => "duplicate id",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::InvalidValue => "invalid value",
            ErrorKind::MissingKey => "missing key",
            ErrorKind::UnsupportedOperation => "unsupported operation",
            ErrorKind::InvalidOperation => "invalid operation",
            ErrorKind::IllegalState => "illegal state",
            ErrorKind::DataType => "data type error",
            ErrorKind::LibraryLoad => "library load error",
            ErrorKind::StoreError => "store error",
            ErrorKind::CommError => "communicator error",
            ErrorKind::Unimplemented => "unimplemented",
        };
        f.write_str(s)
    }
}

/// An error that can occur while dispatching a command.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    /// Creates an error of the given kind.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Error {
        Error {
            kind,
            message: message.into(),
        }
    }

    /// Reports the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Reports the human-readable message attached to this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::new(ErrorKind::StoreError, e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::new(ErrorKind::InvalidValue, e.to_string())
    }
}
