// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The context wrapper hierarchy.
//!
//! A context is the output of a query run: a tensor, one value per vertex, or
//! several named columns per vertex, each optionally per label. A context
//! always carries a back-pointer to the fragment wrapper that produced it, so
//! downstream operations can enforce vertex-map identity. Contexts live only
//! in the registry; they reach the object store only through the explicit
//! `ToVineyard*` materializations.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow_array::{Array, ArrayRef, Float64Array, Int32Array, Int64Array, StringArray};

use comm::CommSpec;
use graph::{gather_archives, FragmentHandle};
use graph_types::{
    Archive, ContextType, Error, ErrorKind, LabeledSelector, Selector, VertexRange,
};
use store::{Client, ObjectId, ObjectMeta};

use crate::wrapper::GraphWrapper;

/// A per-vertex result column.
#[derive(Clone, Debug)]
pub enum ContextData {
    /// Double results.
    F64(Vec<f64>),
    /// Integer results.
    I64(Vec<i64>),
    /// String results.
    Str(Vec<String>),
}

impl ContextData {
    /// The number of rows.
    pub fn len(&self) -> usize {
        match self {
            ContextData::F64(v) => v.len(),
            ContextData::I64(v) => v.len(),
            ContextData::Str(v) => v.len(),
        }
    }

    /// Reports whether the column is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_local(&self) -> LocalColumn {
        match self {
            ContextData::F64(v) => LocalColumn::F64(v.clone()),
            ContextData::I64(v) => LocalColumn::I64(v.clone()),
            ContextData::Str(v) => LocalColumn::Str(v.clone()),
        }
    }
}

/// A materialized local column with a wire type.
enum LocalColumn {
    I32(Vec<i32>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Str(Vec<String>),
    Arrow(ArrayRef),
}

impl LocalColumn {
    fn type_code(&self) -> Result<i32, Error> {
        match self {
            LocalColumn::I32(_) => store::arrow_type_code(&arrow_schema::DataType::Int32),
            LocalColumn::I64(_) => store::arrow_type_code(&arrow_schema::DataType::Int64),
            LocalColumn::F64(_) => store::arrow_type_code(&arrow_schema::DataType::Float64),
            LocalColumn::Str(_) => store::arrow_type_code(&arrow_schema::DataType::Utf8),
            LocalColumn::Arrow(a) => store::arrow_type_code(a.data_type()),
        }
    }

    fn serialize_rows(&self, rows: &[usize], arc: &mut Archive) -> Result<(), Error> {
        match self {
            LocalColumn::I32(v) => rows.iter().for_each(|&r| arc.write_i32(v[r])),
            LocalColumn::I64(v) => rows.iter().for_each(|&r| arc.write_i64(v[r])),
            LocalColumn::F64(v) => rows.iter().for_each(|&r| arc.write_f64(v[r])),
            LocalColumn::Str(v) => rows.iter().for_each(|&r| arc.write_str(&v[r])),
            LocalColumn::Arrow(a) => graph::serialize_column(a, rows, arc)?,
        }
        Ok(())
    }

    fn to_arrow(&self) -> ArrayRef {
        match self {
            LocalColumn::I32(v) => Arc::new(Int32Array::from(v.clone())),
            LocalColumn::I64(v) => Arc::new(Int64Array::from(v.clone())),
            LocalColumn::F64(v) => Arc::new(Float64Array::from(v.clone())),
            LocalColumn::Str(v) => Arc::new(StringArray::from(v.clone())),
            LocalColumn::Arrow(a) => Arc::clone(a),
        }
    }
}

/// The payload of a context, by granularity.
#[derive(Clone, Debug)]
pub enum ContextKind {
    /// No vertex association.
    Tensor {
        /// Flattened values.
        data: Vec<f64>,
        /// The local shape.
        shape: Vec<usize>,
    },
    /// One value per vertex.
    VertexData {
        /// The result column, in inner-vertex order.
        data: ContextData,
    },
    /// One value per vertex, per label.
    LabeledVertexData {
        /// Result columns keyed by label id.
        data: BTreeMap<i32, ContextData>,
    },
    /// Named columns per vertex.
    VertexProperty {
        /// The result columns, in inner-vertex order.
        columns: Vec<(String, ContextData)>,
    },
    /// Named columns per vertex, per label.
    LabeledVertexProperty {
        /// Result columns keyed by label id.
        columns: BTreeMap<i32, Vec<(String, ContextData)>>,
    },
}

/// A query result bound to the fragment wrapper that produced it.
#[derive(Debug)]
pub struct ContextWrapper {
    key: String,
    frag: Arc<GraphWrapper>,
    kind: ContextKind,
}

impl ContextWrapper {
    /// Creates a context wrapper.
    pub fn new(key: &str, frag: Arc<GraphWrapper>, kind: ContextKind) -> ContextWrapper {
        ContextWrapper {
            key: key.to_string(),
            frag,
            kind,
        }
    }

    /// The registry id of this context.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The granularity of this context.
    pub fn context_type(&self) -> ContextType {
        match &self.kind {
            ContextKind::Tensor { .. } => ContextType::Tensor,
            ContextKind::VertexData { .. } => ContextType::VertexData,
            ContextKind::LabeledVertexData { .. } => ContextType::LabeledVertexData,
            ContextKind::VertexProperty { .. } => ContextType::VertexProperty,
            ContextKind::LabeledVertexProperty { .. } => ContextType::LabeledVertexProperty,
        }
    }

    /// The fragment wrapper this context was produced from.
    pub fn fragment_wrapper(&self) -> &Arc<GraphWrapper> {
        &self.frag
    }

    /// The oids of the producing fragment's inner vertices, in the order the
    /// result columns were written.
    fn vertex_oids(&self) -> Result<Vec<serde_json::Value>, Error> {
        match self.frag.fragment() {
            FragmentHandle::Projected(frag) => {
                let base = frag.base();
                let label = frag.v_label();
                Ok(base
                    .inner_vertices(label)
                    .map(|offset| serde_json::Value::from(base.get_oid(label, offset)))
                    .collect())
            }
            FragmentHandle::Dynamic(frag) => Ok(frag
                .inner_vertices()
                .into_iter()
                .map(|(_, oid)| oid.to_json())
                .collect()),
            FragmentHandle::DynamicProjected(frag) => Ok(frag
                .base()
                .inner_vertices()
                .into_iter()
                .map(|(_, oid)| oid.to_json())
                .collect()),
            FragmentHandle::DynamicView(frag) => Ok(frag
                .base()
                .inner_vertices()
                .into_iter()
                .map(|(_, oid)| oid.to_json())
                .collect()),
            FragmentHandle::Property(_) => Err(Error::new(
                ErrorKind::IllegalState,
                "labeled fragments need a labeled selector",
            )),
        }
    }

    /// The oids of one label of the producing labeled fragment.
    fn labeled_vertex_oids(&self, label: i32) -> Result<Vec<i64>, Error> {
        match self.frag.fragment() {
            FragmentHandle::Property(frag) => {
                if frag.schema().vertex_label_name(label).is_none() {
                    return Err(Error::new(
                        ErrorKind::InvalidValue,
                        format!("invalid label id: {}", label),
                    ));
                }
                Ok(frag
                    .inner_vertices(label)
                    .map(|offset| frag.get_oid(label, offset))
                    .collect())
            }
            _ => Err(Error::new(
                ErrorKind::IllegalState,
                "labeled selectors need a labeled fragment",
            )),
        }
    }

    fn rows_in_range(oids: &[serde_json::Value], range: &VertexRange) -> Vec<usize> {
        oids.iter()
            .enumerate()
            .filter(|(_, oid)| match oid.as_i64() {
                Some(i) => range.contains(i),
                None => range.begin.is_none() && range.end.is_none(),
            })
            .map(|(row, _)| row)
            .collect()
    }

    /// Builds the column a selector addresses, as local rows.
    ///
    /// The vertex-id column's wire type is agreed collectively, so this must
    /// be entered by every worker.
    fn column_for(
        &self,
        comm: &CommSpec,
        selector: &Selector,
        oids: &[serde_json::Value],
    ) -> Result<LocalColumn, Error> {
        match selector {
            Selector::VertexId => {
                let any_str = oids.iter().any(|oid| !oid.is_i64());
                if comm.all_reduce_or(any_str)? {
                    Ok(LocalColumn::Str(
                        oids.iter()
                            .map(|oid| match oid.as_str() {
                                Some(s) => s.to_string(),
                                None => oid.to_string(),
                            })
                            .collect(),
                    ))
                } else {
                    Ok(LocalColumn::I64(
                        oids.iter().map(|oid| oid.as_i64().unwrap()).collect(),
                    ))
                }
            }
            Selector::VertexData => match self.frag.fragment() {
                FragmentHandle::Projected(frag) => {
                    let prop = frag.v_prop().ok_or_else(|| {
                        Error::new(
                            ErrorKind::UnsupportedOperation,
                            "projection carries no vertex property",
                        )
                    })?;
                    let column = frag.base().vertex_column(frag.v_label(), prop)?;
                    Ok(LocalColumn::Arrow(Arc::clone(column)))
                }
                FragmentHandle::Dynamic(frag) => Ok(LocalColumn::Str(
                    frag.inner_vertices()
                        .into_iter()
                        .map(|(gid, _)| {
                            serde_json::Value::Object(frag.vertex_attrs(gid).unwrap_or_default())
                                .to_string()
                        })
                        .collect(),
                )),
                FragmentHandle::DynamicProjected(frag) => {
                    let base = frag.base();
                    Ok(LocalColumn::Str(
                        base.inner_vertices()
                            .into_iter()
                            .map(|(gid, _)| {
                                let attrs = base.vertex_attrs(gid).unwrap_or_default();
                                match frag.v_prop() {
                                    Some(key) => attrs
                                        .get(key)
                                        .cloned()
                                        .unwrap_or(serde_json::Value::Null)
                                        .to_string(),
                                    None => serde_json::Value::Object(attrs).to_string(),
                                }
                            })
                            .collect(),
                    ))
                }
                _ => Err(Error::new(
                    ErrorKind::UnsupportedOperation,
                    "v.data is not defined for this fragment",
                )),
            },
            Selector::Result => match &self.kind {
                ContextKind::VertexData { data } => Ok(data.to_local()),
                _ => Err(Error::new(
                    ErrorKind::UnsupportedOperation,
                    format!("selector r is not defined for {}", self.context_type()),
                )),
            },
            Selector::ResultProperty(name) => match &self.kind {
                ContextKind::VertexProperty { columns } => columns
                    .iter()
                    .find(|(col, _)| col == name)
                    .map(|(_, data)| data.to_local())
                    .ok_or_else(|| {
                        Error::new(
                            ErrorKind::InvalidValue,
                            format!("context has no column {}", name),
                        )
                    }),
                _ => Err(Error::new(
                    ErrorKind::UnsupportedOperation,
                    format!("selector r.{} is not defined for {}", name, self.context_type()),
                )),
            },
            Selector::VertexLabelId | Selector::VertexProperty(_) => Err(Error::new(
                ErrorKind::UnsupportedOperation,
                format!("unsupported selector for {}", self.context_type()),
            )),
        }
    }

    /// Builds the column a labeled selector addresses.
    fn labeled_column_for(
        &self,
        label: i32,
        selector: &Selector,
        oids: &[i64],
    ) -> Result<LocalColumn, Error> {
        match selector {
            Selector::VertexId => Ok(LocalColumn::I64(oids.to_vec())),
            Selector::VertexLabelId => Ok(LocalColumn::I32(vec![label; oids.len()])),
            Selector::VertexProperty(name) => match self.frag.fragment() {
                FragmentHandle::Property(frag) => {
                    let prop = frag.schema().vertex_property_id(label, name).ok_or_else(|| {
                        Error::new(
                            ErrorKind::InvalidValue,
                            format!("Invalid property name: {}", name),
                        )
                    })?;
                    Ok(LocalColumn::Arrow(Arc::clone(frag.vertex_column(label, prop)?)))
                }
                _ => Err(Error::new(
                    ErrorKind::IllegalState,
                    "labeled selectors need a labeled fragment",
                )),
            },
            Selector::Result => match &self.kind {
                ContextKind::LabeledVertexData { data } => data
                    .get(&label)
                    .map(ContextData::to_local)
                    .ok_or_else(|| missing_label(label)),
                _ => Err(Error::new(
                    ErrorKind::UnsupportedOperation,
                    format!("selector r is not defined for {}", self.context_type()),
                )),
            },
            Selector::ResultProperty(name) => match &self.kind {
                ContextKind::LabeledVertexProperty { columns } => columns
                    .get(&label)
                    .ok_or_else(|| missing_label(label))?
                    .iter()
                    .find(|(col, _)| col == name)
                    .map(|(_, data)| data.to_local())
                    .ok_or_else(|| {
                        Error::new(
                            ErrorKind::InvalidValue,
                            format!("context has no column {}", name),
                        )
                    }),
                _ => Err(Error::new(
                    ErrorKind::UnsupportedOperation,
                    format!("selector r.{} is not defined for {}", name, self.context_type()),
                )),
            },
            Selector::VertexData => Err(Error::new(
                ErrorKind::UnsupportedOperation,
                "labeled contexts expose properties, not a data slot",
            )),
        }
    }

    fn columns_and_rows(
        &self,
        comm: &CommSpec,
        selectors: &[(String, Selector)],
        range: &VertexRange,
    ) -> Result<(Vec<(String, LocalColumn)>, Vec<usize>), Error> {
        let oids = self.vertex_oids()?;
        let rows = Self::rows_in_range(&oids, range);
        let mut columns = Vec::new();
        for (name, selector) in selectors {
            columns.push((name.clone(), self.column_for(comm, selector, &oids)?));
        }
        Ok((columns, rows))
    }

    fn labeled_columns_and_rows(
        &self,
        selectors: &[(String, LabeledSelector)],
        range: &VertexRange,
    ) -> Result<(Vec<(String, LocalColumn)>, Vec<usize>), Error> {
        let label = LabeledSelector::vertex_label_id(selectors)?;
        let oids = self.labeled_vertex_oids(label)?;
        let json_oids: Vec<serde_json::Value> =
            oids.iter().map(|&o| serde_json::Value::from(o)).collect();
        let rows = Self::rows_in_range(&json_oids, range);
        let mut columns = Vec::new();
        for (name, selector) in selectors {
            columns.push((
                name.clone(),
                self.labeled_column_for(label, &selector.selector, &oids)?,
            ));
        }
        Ok((columns, rows))
    }

    fn frame_ndarray(
        comm: &CommSpec,
        column: &LocalColumn,
        rows: &[usize],
    ) -> Result<Archive, Error> {
        let mut arc = Archive::new();
        let type_code = column.type_code()?;
        let total = comm.reduce_sum_i64(rows.len() as i64)?;
        if comm.worker_id() == 0 {
            let total = total.expect("reduce returns the total at the root");
            arc.write_i64(1);
            arc.write_i64(total);
            arc.write_i32(type_code);
            arc.write_i64(total);
        }
        let old_size = arc.len();
        column.serialize_rows(rows, &mut arc)?;
        gather_archives(&mut arc, comm, old_size)?;
        Ok(arc)
    }

    fn frame_dataframe(
        comm: &CommSpec,
        columns: &[(String, LocalColumn)],
        rows: &[usize],
    ) -> Result<Archive, Error> {
        let mut arc = Archive::new();
        let total = comm.reduce_sum_i64(rows.len() as i64)?;
        if comm.worker_id() == 0 {
            let total = total.expect("reduce returns the total at the root");
            arc.write_i64(columns.len() as i64);
            arc.write_i64(total);
        }
        for (name, column) in columns {
            let type_code = column.type_code()?;
            if comm.worker_id() == 0 {
                arc.write_str(name);
                arc.write_i32(type_code);
            }
            let old_size = arc.len();
            column.serialize_rows(rows, &mut arc)?;
            gather_archives(&mut arc, comm, old_size)?;
        }
        Ok(arc)
    }

    /// Serializes one selected column into an ndarray archive.
    pub fn to_ndarray(
        &self,
        comm: &CommSpec,
        selector: &str,
        range: &VertexRange,
        axis: i64,
    ) -> Result<Archive, Error> {
        match &self.kind {
            ContextKind::Tensor { data, shape } => {
                let _ = (shape, axis);
                let column = LocalColumn::F64(data.clone());
                let rows: Vec<usize> = (0..data.len()).collect();
                Self::frame_ndarray(comm, &column, &rows)
            }
            ContextKind::VertexData { .. } | ContextKind::VertexProperty { .. } => {
                let parsed = Selector::parse(selector)?;
                let oids = self.vertex_oids()?;
                let rows = Self::rows_in_range(&oids, range);
                let column = self.column_for(comm, &parsed, &oids)?;
                Self::frame_ndarray(comm, &column, &rows)
            }
            ContextKind::LabeledVertexData { .. } | ContextKind::LabeledVertexProperty { .. } => {
                let parsed = LabeledSelector::parse(selector)?;
                let oids = self.labeled_vertex_oids(parsed.label_id)?;
                let json_oids: Vec<serde_json::Value> =
                    oids.iter().map(|&o| serde_json::Value::from(o)).collect();
                let rows = Self::rows_in_range(&json_oids, range);
                let column = self.labeled_column_for(parsed.label_id, &parsed.selector, &oids)?;
                Self::frame_ndarray(comm, &column, &rows)
            }
        }
    }

    /// Serializes the selected columns into a dataframe archive.
    pub fn to_dataframe(
        &self,
        comm: &CommSpec,
        selectors: &str,
        range: &VertexRange,
    ) -> Result<Archive, Error> {
        match &self.kind {
            ContextKind::Tensor { data, .. } => {
                let columns = vec![("tensor".to_string(), LocalColumn::F64(data.clone()))];
                let rows: Vec<usize> = (0..data.len()).collect();
                Self::frame_dataframe(comm, &columns, &rows)
            }
            ContextKind::VertexData { .. } | ContextKind::VertexProperty { .. } => {
                let parsed = Selector::parse_selectors(selectors)?;
                let (columns, rows) = self.columns_and_rows(comm, &parsed, range)?;
                Self::frame_dataframe(comm, &columns, &rows)
            }
            ContextKind::LabeledVertexData { .. } | ContextKind::LabeledVertexProperty { .. } => {
                let parsed = LabeledSelector::parse_selectors(selectors)?;
                let (columns, rows) = self.labeled_columns_and_rows(&parsed, range)?;
                Self::frame_dataframe(comm, &columns, &rows)
            }
        }
    }

    /// Materializes one selected column into the store as a distributed
    /// tensor, returning the global object id.
    pub fn to_vineyard_tensor(
        &self,
        comm: &CommSpec,
        client: &Client,
        selector: &str,
        range: &VertexRange,
        axis: i64,
    ) -> Result<ObjectId, Error> {
        let (column, rows) = match &self.kind {
            ContextKind::Tensor { data, .. } => {
                let _ = axis;
                (LocalColumn::F64(data.clone()), (0..data.len()).collect())
            }
            ContextKind::VertexData { .. } | ContextKind::VertexProperty { .. } => {
                let parsed = Selector::parse(selector)?;
                let oids = self.vertex_oids()?;
                let rows = Self::rows_in_range(&oids, range);
                (self.column_for(comm, &parsed, &oids)?, rows)
            }
            ContextKind::LabeledVertexData { .. } | ContextKind::LabeledVertexProperty { .. } => {
                let parsed = LabeledSelector::parse(selector)?;
                let oids = self.labeled_vertex_oids(parsed.label_id)?;
                let json_oids: Vec<serde_json::Value> =
                    oids.iter().map(|&o| serde_json::Value::from(o)).collect();
                let rows = Self::rows_in_range(&json_oids, range);
                (
                    self.labeled_column_for(parsed.label_id, &parsed.selector, &oids)?,
                    rows,
                )
            }
        };
        let mut chunk = Archive::new();
        column.serialize_rows(&rows, &mut chunk)?;
        self.materialize(
            comm,
            client,
            "engine::Tensor",
            column.type_code()?,
            rows.len(),
            chunk.into_bytes(),
        )
    }

    /// Materializes the selected columns into the store as a distributed
    /// dataframe, returning the global object id.
    pub fn to_vineyard_dataframe(
        &self,
        comm: &CommSpec,
        client: &Client,
        selectors: &str,
        range: &VertexRange,
    ) -> Result<ObjectId, Error> {
        let (columns, rows) = match &self.kind {
            ContextKind::Tensor { data, .. } => (
                vec![("tensor".to_string(), LocalColumn::F64(data.clone()))],
                (0..data.len()).collect(),
            ),
            ContextKind::VertexData { .. } | ContextKind::VertexProperty { .. } => {
                let parsed = Selector::parse_selectors(selectors)?;
                self.columns_and_rows(comm, &parsed, range)?
            }
            ContextKind::LabeledVertexData { .. } | ContextKind::LabeledVertexProperty { .. } => {
                let parsed = LabeledSelector::parse_selectors(selectors)?;
                self.labeled_columns_and_rows(&parsed, range)?
            }
        };
        let mut chunk = Archive::new();
        for (name, column) in &columns {
            chunk.write_str(name);
            chunk.write_i32(column.type_code()?);
            column.serialize_rows(&rows, &mut chunk)?;
        }
        self.materialize(
            comm,
            client,
            "engine::DataFrame",
            columns.len() as i32,
            rows.len(),
            chunk.into_bytes(),
        )
    }

    fn materialize(
        &self,
        comm: &CommSpec,
        client: &Client,
        type_name: &str,
        type_or_columns: i32,
        local_len: usize,
        chunk: Vec<u8>,
    ) -> Result<ObjectId, Error> {
        let mut chunk_meta = ObjectMeta::new(format!("{}Chunk", type_name));
        chunk_meta.set_key_value("fid", comm.fid());
        chunk_meta.set_key_value("length", local_len);
        let chunk_id = client.put_object(chunk_meta, Arc::new(chunk))?;
        client.persist(chunk_id)?;

        let total = comm.all_reduce_sum_i64(local_len as i64)?;
        let gathered = comm.all_gather(chunk_id.as_u64().to_le_bytes().to_vec())?;
        let global_id = if comm.worker_id() == 0 {
            let mut meta = ObjectMeta::new(type_name);
            meta.set_key_value("total_length", total);
            meta.set_key_value("meta", type_or_columns);
            meta.set_key_value("partitions", comm.fnum());
            for (fid, bytes) in gathered.iter().enumerate() {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[..8]);
                meta.add_member(
                    &format!("partition_{}", fid),
                    ObjectId::from_i64(i64::from_le_bytes(buf)),
                );
            }
            let id = client.put_object(meta, Arc::new(()))?;
            client.persist(id)?;
            Some(id.as_u64().to_le_bytes().to_vec())
        } else {
            None
        };
        let bytes = comm.broadcast_from_root(global_id)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        Ok(ObjectId::from_i64(i64::from_le_bytes(buf)))
    }

    /// Builds Arrow arrays for this worker's full result columns, for column
    /// addition on a columnar graph.
    pub fn to_arrow_arrays(
        &self,
        comm: &CommSpec,
        selectors: &[(String, Selector)],
    ) -> Result<Vec<(String, ArrayRef)>, Error> {
        let oids = self.vertex_oids()?;
        let mut out = Vec::new();
        for (name, selector) in selectors {
            let column = self.column_for(comm, selector, &oids)?;
            out.push((name.clone(), column.to_arrow()));
        }
        Ok(out)
    }

    /// Builds per-label Arrow arrays for this worker's full result columns.
    pub fn to_labeled_arrow_arrays(
        &self,
        _comm: &CommSpec,
        selectors: &[(String, LabeledSelector)],
    ) -> Result<BTreeMap<i32, Vec<(String, ArrayRef)>>, Error> {
        let mut out: BTreeMap<i32, Vec<(String, ArrayRef)>> = BTreeMap::new();
        for (name, selector) in selectors {
            let oids = self.labeled_vertex_oids(selector.label_id)?;
            let column = self.labeled_column_for(selector.label_id, &selector.selector, &oids)?;
            out.entry(selector.label_id)
                .or_default()
                .push((name.clone(), column.to_arrow()));
        }
        Ok(out)
    }
}

fn missing_label(label: i32) -> Error {
    Error::new(
        ErrorKind::InvalidValue,
        format!("context has no results for label {}", label),
    )
}
