// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Typed access to a command's attribute map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attr::{AttrValue, ModifyType, ParamKey, ReportType};
use crate::def::GraphType;
use crate::error::{Error, ErrorKind};

/// Conversion from an [`AttrValue`] into a concrete parameter type.
pub trait FromAttr: Sized {
    /// Extracts `Self` from the given attribute value, if the value has the
    /// right shape.
    fn from_attr(value: &AttrValue) -> Option<Self>;
}

impl FromAttr for bool {
    fn from_attr(value: &AttrValue) -> Option<bool> {
        match value {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromAttr for i64 {
    fn from_attr(value: &AttrValue) -> Option<i64> {
        match value {
            AttrValue::I64(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromAttr for f64 {
    fn from_attr(value: &AttrValue) -> Option<f64> {
        match value {
            AttrValue::F64(f) => Some(*f),
            _ => None,
        }
    }
}

impl FromAttr for String {
    fn from_attr(value: &AttrValue) -> Option<String> {
        match value {
            AttrValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromAttr for Vec<String> {
    fn from_attr(value: &AttrValue) -> Option<Vec<String>> {
        match value {
            AttrValue::StrList(l) => Some(l.clone()),
            _ => None,
        }
    }
}

impl FromAttr for GraphType {
    fn from_attr(value: &AttrValue) -> Option<GraphType> {
        match value {
            AttrValue::GraphType(t) => Some(*t),
            _ => None,
        }
    }
}

impl FromAttr for ModifyType {
    fn from_attr(value: &AttrValue) -> Option<ModifyType> {
        match value {
            AttrValue::ModifyType(t) => Some(*t),
            _ => None,
        }
    }
}

impl FromAttr for ReportType {
    fn from_attr(value: &AttrValue) -> Option<ReportType> {
        match value {
            AttrValue::ReportType(t) => Some(*t),
            _ => None,
        }
    }
}

/// A command's attribute map, with typed extraction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    attrs: BTreeMap<ParamKey, AttrValue>,
}

impl Params {
    /// Wraps an attribute map.
    pub fn new(attrs: BTreeMap<ParamKey, AttrValue>) -> Params {
        Params { attrs }
    }

    /// Reports whether the map carries a value for `key`.
    pub fn has(&self, key: ParamKey) -> bool {
        self.attrs.contains_key(&key)
    }

    /// Extracts the value for `key` as a `T`.
    ///
    /// Signals `MissingKey` if the key is absent and `InvalidValue` if the
    /// value has the wrong shape.
    pub fn get<T: FromAttr>(&self, key: ParamKey) -> Result<T, Error> {
        match self.attrs.get(&key) {
            None => Err(Error::new(
                ErrorKind::MissingKey,
                format!("no value for key {}", key),
            )),
            Some(value) => T::from_attr(value).ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidValue,
                    format!("malformed value for key {}: {:?}", key, value),
                )
            }),
        }
    }

    /// Extracts the value for `key` as a `T`, or `None` if the key is absent.
    pub fn get_opt<T: FromAttr>(&self, key: ParamKey) -> Result<Option<T>, Error> {
        if self.has(key) {
            self.get(key).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl FromIterator<(ParamKey, AttrValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (ParamKey, AttrValue)>>(iter: I) -> Params {
        Params {
            attrs: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key() {
        let params = Params::default();
        let err = params.get::<String>(ParamKey::GraphName).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingKey);
    }

    #[test]
    fn test_get_wrong_shape() {
        let params = Params::from_iter([(ParamKey::Directed, AttrValue::Str("yes".into()))]);
        let err = params.get::<bool>(ParamKey::Directed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn test_get_typed() {
        let params = Params::from_iter([
            (ParamKey::Directed, AttrValue::Bool(true)),
            (ParamKey::GraphName, AttrValue::Str("graph_0".into())),
        ]);
        assert!(params.get::<bool>(ParamKey::Directed).unwrap());
        assert_eq!(
            params.get::<String>(ParamKey::GraphName).unwrap(),
            "graph_0"
        );
        assert_eq!(params.get_opt::<i64>(ParamKey::Axis).unwrap(), None);
    }
}
