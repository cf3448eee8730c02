// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The selector grammar.
//!
//! A selector identifies which values of a fragment or context to extract:
//!
//! ```text
//! v.id | v.label_id | v.data | v.property.<ident> | r | r.<ident>
//! ```
//!
//! optionally prefixed with `#<label_id>:` for labeled variants. Multiple
//! selectors are comma-joined, each with an optional `<col_name>=` rename.

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};

/// A single parsed selector.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// `v.id`: original vertex ids.
    VertexId,
    /// `v.label_id`: the label id of each vertex.
    VertexLabelId,
    /// `v.data`: the vertex data slot.
    VertexData,
    /// `v.property.<name>`: a named vertex property.
    VertexProperty(String),
    /// `r`: the query result.
    Result,
    /// `r.<name>`: a named column of the query result.
    ResultProperty(String),
}

impl Selector {
    /// Parses a single unlabeled selector.
    pub fn parse(s: &str) -> Result<Selector, Error> {
        let s = s.trim();
        match s {
            "v.id" => Ok(Selector::VertexId),
            "v.label_id" => Ok(Selector::VertexLabelId),
            "v.data" => Ok(Selector::VertexData),
            "r" => Ok(Selector::Result),
            _ => {
                if let Some(name) = s.strip_prefix("v.property.") {
                    if name.is_empty() {
                        return Err(Error::new(
                            ErrorKind::InvalidValue,
                            format!("selector names no property: {}", s),
                        ));
                    }
                    Ok(Selector::VertexProperty(name.to_string()))
                } else if let Some(name) = s.strip_prefix("r.") {
                    if name.is_empty() {
                        return Err(Error::new(
                            ErrorKind::InvalidValue,
                            format!("selector names no result column: {}", s),
                        ));
                    }
                    Ok(Selector::ResultProperty(name.to_string()))
                } else {
                    Err(Error::new(
                        ErrorKind::InvalidValue,
                        format!("cannot parse selector: {}", s),
                    ))
                }
            }
        }
    }

    /// Parses a comma-joined selector list with optional `name=` renames.
    pub fn parse_selectors(s: &str) -> Result<Vec<(String, Selector)>, Error> {
        parse_list(s, |part| Selector::parse(part))
    }
}

/// A selector carrying a vertex label id.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct LabeledSelector {
    /// The vertex label the selector addresses.
    pub label_id: i32,
    /// The inner selector.
    pub selector: Selector,
}

impl LabeledSelector {
    /// Parses a single `#<label_id>:`-prefixed selector.
    pub fn parse(s: &str) -> Result<LabeledSelector, Error> {
        let s = s.trim();
        let rest = s.strip_prefix('#').ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidValue,
                format!("labeled selector lacks #<label_id>: prefix: {}", s),
            )
        })?;
        let (label, sel) = rest.split_once(':').ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidValue,
                format!("labeled selector lacks ':' after label id: {}", s),
            )
        })?;
        let label_id = label.parse::<i32>().map_err(|_| {
            Error::new(
                ErrorKind::InvalidValue,
                format!("label id is not an integer: {}", label),
            )
        })?;
        Ok(LabeledSelector {
            label_id,
            selector: Selector::parse(sel)?,
        })
    }

    /// Parses a comma-joined labeled selector list with optional renames.
    pub fn parse_selectors(s: &str) -> Result<Vec<(String, LabeledSelector)>, Error> {
        parse_list(s, |part| LabeledSelector::parse(part))
    }

    /// Returns the label id shared by all selectors in the list.
    ///
    /// Serializing one dataframe requires every column to come from the same
    /// vertex label.
    pub fn vertex_label_id(selectors: &[(String, LabeledSelector)]) -> Result<i32, Error> {
        let mut label_id = None;
        for (_, sel) in selectors {
            match label_id {
                None => label_id = Some(sel.label_id),
                Some(id) if id == sel.label_id => (),
                Some(id) => {
                    return Err(Error::new(
                        ErrorKind::InvalidValue,
                        format!("selectors mix label ids {} and {}", id, sel.label_id),
                    ));
                }
            }
        }
        label_id
            .ok_or_else(|| Error::new(ErrorKind::InvalidValue, "empty selector list".to_string()))
    }
}

fn parse_list<T, F>(s: &str, parse: F) -> Result<Vec<(String, T)>, Error>
where
    F: Fn(&str) -> Result<T, Error>,
{
    let mut out = Vec::new();
    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidValue,
                format!("empty selector in list: {}", s),
            ));
        }
        match part.split_once('=') {
            Some((name, sel)) => out.push((name.trim().to_string(), parse(sel)?)),
            None => out.push((part.to_string(), parse(part)?)),
        }
    }
    Ok(out)
}

/// An optional filter restricting serialization to vertices whose integer oid
/// falls in `[begin, end)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexRange {
    /// Inclusive lower bound.
    pub begin: Option<i64>,
    /// Exclusive upper bound.
    pub end: Option<i64>,
}

impl VertexRange {
    /// Parses the JSON form `{"begin": <n>, "end": <n>}`; both keys optional.
    pub fn parse(s: &str) -> Result<VertexRange, Error> {
        if s.trim().is_empty() {
            return Ok(VertexRange::default());
        }
        let value: serde_json::Value = serde_json::from_str(s)?;
        let get = |key: &str| -> Result<Option<i64>, Error> {
            match value.get(key) {
                None | Some(serde_json::Value::Null) => Ok(None),
                Some(v) => match v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())) {
                    Some(n) => Ok(Some(n)),
                    None => Err(Error::new(
                        ErrorKind::InvalidValue,
                        format!("range bound {} is not an integer: {}", key, v),
                    )),
                },
            }
        };
        Ok(VertexRange {
            begin: get("begin")?,
            end: get("end")?,
        })
    }

    /// Reports whether `oid` falls inside the range.
    pub fn contains(&self, oid: i64) -> bool {
        self.begin.map_or(true, |b| oid >= b) && self.end.map_or(true, |e| oid < e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_productions() {
        assert_eq!(Selector::parse("v.id").unwrap(), Selector::VertexId);
        assert_eq!(
            Selector::parse("v.label_id").unwrap(),
            Selector::VertexLabelId
        );
        assert_eq!(Selector::parse("v.data").unwrap(), Selector::VertexData);
        assert_eq!(
            Selector::parse("v.property.rank").unwrap(),
            Selector::VertexProperty("rank".into())
        );
        assert_eq!(Selector::parse("r").unwrap(), Selector::Result);
        assert_eq!(
            Selector::parse("r.dist").unwrap(),
            Selector::ResultProperty("dist".into())
        );
    }

    #[test]
    fn test_parse_rejects_junk() {
        for s in ["", "v", "v.", "x.id", "v.property.", "r."] {
            assert_eq!(
                Selector::parse(s).unwrap_err().kind(),
                ErrorKind::InvalidValue,
                "selector {:?}",
                s
            );
        }
    }

    #[test]
    fn test_parse_selector_list_with_renames() {
        let selectors = Selector::parse_selectors("id=v.id,r").unwrap();
        assert_eq!(
            selectors,
            vec![
                ("id".to_string(), Selector::VertexId),
                ("r".to_string(), Selector::Result),
            ]
        );
    }

    #[test]
    fn test_parse_labeled() {
        let sel = LabeledSelector::parse("#2:v.property.age").unwrap();
        assert_eq!(sel.label_id, 2);
        assert_eq!(sel.selector, Selector::VertexProperty("age".into()));
        assert_eq!(
            LabeledSelector::parse("v.id").unwrap_err().kind(),
            ErrorKind::InvalidValue
        );
    }

    #[test]
    fn test_labeled_list_must_share_label() {
        let selectors = LabeledSelector::parse_selectors("#0:v.id,#1:v.data").unwrap();
        assert_eq!(
            LabeledSelector::vertex_label_id(&selectors).unwrap_err().kind(),
            ErrorKind::InvalidValue
        );
    }

    #[test]
    fn test_vertex_range() {
        let range = VertexRange::parse(r#"{"begin": 1, "end": 3}"#).unwrap();
        assert!(range.contains(1));
        assert!(range.contains(2));
        assert!(!range.contains(3));
        assert!(VertexRange::parse("").unwrap().contains(i64::MAX));
    }
}
