// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The property schema of a labeled columnar graph.

use arrow_schema::DataType;
use serde::{Deserialize, Serialize};

use graph_types::{Error, ErrorKind};

use crate::columns;

/// One named, typed property.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// The property name.
    pub name: String,
    /// The engine name of the columnar type.
    pub data_type: String,
}

impl PropertySchema {
    /// Creates a property entry from an Arrow type.
    pub fn new(name: &str, data_type: &DataType) -> Result<PropertySchema, Error> {
        Ok(PropertySchema {
            name: name.to_string(),
            data_type: columns::type_name(data_type)?.to_string(),
        })
    }

    /// The Arrow type of this property.
    pub fn arrow_type(&self) -> Result<DataType, Error> {
        columns::type_from_name(&self.data_type)
    }
}

/// One vertex or edge label with its properties.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LabelSchema {
    /// The label name.
    pub label: String,
    /// The label's properties, in column order.
    pub properties: Vec<PropertySchema>,
}

/// The full property schema of a labeled graph.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PropertyGraphSchema {
    /// Vertex labels, in label-id order.
    pub vertex_labels: Vec<LabelSchema>,
    /// Edge labels, in label-id order.
    pub edge_labels: Vec<LabelSchema>,
}

impl PropertyGraphSchema {
    /// Renders the schema as JSON for a `GraphDef`.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).expect("schema serialization is infallible")
    }

    /// Parses a schema from its JSON rendering.
    pub fn from_json_str(s: &str) -> Result<PropertyGraphSchema, Error> {
        serde_json::from_str(s).map_err(|e| {
            Error::new(
                ErrorKind::InvalidValue,
                format!("malformed property schema: {}", e),
            )
        })
    }

    /// Resolves a vertex label name to its id.
    pub fn vertex_label_id(&self, label: &str) -> Option<i32> {
        self.vertex_labels
            .iter()
            .position(|l| l.label == label)
            .map(|i| i as i32)
    }

    /// The name of a vertex label, if the id is valid.
    pub fn vertex_label_name(&self, label_id: i32) -> Option<&str> {
        self.vertex_labels
            .get(label_id as usize)
            .map(|l| l.label.as_str())
    }

    /// Resolves an edge label name to its id.
    pub fn edge_label_id(&self, label: &str) -> Option<i32> {
        self.edge_labels
            .iter()
            .position(|l| l.label == label)
            .map(|i| i as i32)
    }

    /// Resolves a property name within a vertex label to its column id.
    pub fn vertex_property_id(&self, label_id: i32, name: &str) -> Option<i32> {
        self.vertex_labels
            .get(label_id as usize)?
            .properties
            .iter()
            .position(|p| p.name == name)
            .map(|i| i as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let schema = PropertyGraphSchema {
            vertex_labels: vec![LabelSchema {
                label: "person".into(),
                properties: vec![PropertySchema::new("age", &DataType::Int64).unwrap()],
            }],
            edge_labels: vec![LabelSchema {
                label: "knows".into(),
                properties: vec![],
            }],
        };
        let json = schema.to_json_string();
        let parsed = PropertyGraphSchema::from_json_str(&json).unwrap();
        assert_eq!(parsed, schema);
        assert_eq!(parsed.vertex_label_id("person"), Some(0));
        assert_eq!(parsed.vertex_label_name(0), Some("person"));
        assert_eq!(parsed.vertex_label_name(1), None);
        assert_eq!(parsed.vertex_property_id(0, "age"), Some(0));
        assert_eq!(parsed.edge_label_id("knows"), Some(0));
    }
}
