// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Original vertex ids for dynamic graphs.

use std::fmt;

use serde::{Deserialize, Serialize};

use graph_types::{Error, ErrorKind};

/// The original id of a vertex in a dynamic graph: an integer or a string.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Oid {
    /// An integer id.
    Int(i64),
    /// A string id.
    Str(String),
}

impl Oid {
    /// Parses an oid from one whitespace token: integers parse as integers,
    /// everything else is a string id.
    pub fn parse_token(token: &str) -> Oid {
        match token.parse::<i64>() {
            Ok(i) => Oid::Int(i),
            Err(_) => Oid::Str(token.to_string()),
        }
    }

    /// Converts a JSON value into an oid.
    pub fn from_json(value: &serde_json::Value) -> Result<Oid, Error> {
        match value {
            serde_json::Value::Number(n) if n.is_i64() => Ok(Oid::Int(n.as_i64().unwrap())),
            serde_json::Value::String(s) => Ok(Oid::Str(s.clone())),
            other => Err(Error::new(
                ErrorKind::InvalidValue,
                format!("vertex id must be an integer or a string: {}", other),
            )),
        }
    }

    /// Renders the oid as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Oid::Int(i) => serde_json::Value::from(*i),
            Oid::Str(s) => serde_json::Value::from(s.clone()),
        }
    }

    /// The integer form, if this oid is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Oid::Int(i) => Some(*i),
            Oid::Str(_) => None,
        }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Oid::Int(i) => write!(f, "{}", i),
            Oid::Str(s) => f.write_str(s),
        }
    }
}

/// Assigns an oid to a fragment.
///
/// The hash is fixed (FNV-1a) rather than the standard library's, so that
/// every worker of a set computes identical placements regardless of hasher
/// randomization.
pub fn partition_for(oid: &Oid, fnum: usize) -> usize {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    let mut eat = |bytes: &[u8]| {
        for b in bytes {
            hash ^= u64::from(*b);
            hash = hash.wrapping_mul(PRIME);
        }
    };
    match oid {
        Oid::Int(i) => eat(&i.to_le_bytes()),
        Oid::Str(s) => eat(s.as_bytes()),
    }
    (hash % fnum as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token() {
        assert_eq!(Oid::parse_token("42"), Oid::Int(42));
        assert_eq!(Oid::parse_token("-7"), Oid::Int(-7));
        assert_eq!(Oid::parse_token("alice"), Oid::Str("alice".into()));
    }

    #[test]
    fn test_partition_is_stable_and_in_range() {
        for i in 0..100 {
            let oid = Oid::Int(i);
            let p = partition_for(&oid, 4);
            assert!(p < 4);
            assert_eq!(p, partition_for(&oid, 4));
        }
    }
}
