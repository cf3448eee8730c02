// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Algorithm entries.
//!
//! An algorithm arrives as a pre-built plugin library exposing a versioned
//! vtable, or as one of the engine's built-ins addressed with the
//! `builtin://` scheme. An entry resolves the vtable at load time and fails
//! with `LibraryLoad` if the library or its symbols are unusable; afterwards
//! it creates per-fragment workers and runs queries collectively.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;

use comm::CommSpec;
use graph::FragmentHandle;
use graph_types::{Error, ErrorKind, QueryArgs};

use crate::apps;
use crate::context::ContextData;

/// The plugin ABI understood by this engine.
pub const APP_ABI_VERSION: u32 = 1;

/// Execution parameters handed to a worker at creation.
#[derive(Clone, Copy, Debug)]
pub struct EngineSpec {
    /// Threads the algorithm may use internally.
    pub thread_num: usize,
}

impl Default for EngineSpec {
    fn default() -> EngineSpec {
        // The default parallel spec matches the process's core count.
        EngineSpec {
            thread_num: num_cpus::get(),
        }
    }
}

/// What a query run produced.
#[derive(Clone, Debug)]
pub enum AppOutput {
    /// The algorithm produces no context.
    None,
    /// One value per inner vertex, in inner-vertex order.
    VertexData(ContextData),
    /// Named columns per inner vertex.
    VertexProperty(Vec<(String, ContextData)>),
    /// A local tensor.
    Tensor {
        /// Flattened values.
        data: Vec<f64>,
        /// The local shape.
        shape: Vec<usize>,
    },
}

/// A worker created for one fragment; queries run collectively across the
/// worker set.
pub trait AppWorker: Send {
    /// Evaluates the algorithm.
    fn query(&mut self, comm: &CommSpec, args: &QueryArgs) -> Result<AppOutput, Error>;
}

/// The vtable an algorithm library exports.
pub struct AppModule {
    /// The algorithm's symbolic name.
    pub name: &'static str,
    /// Creates a worker over one fragment.
    pub create_worker:
        fn(&FragmentHandle, &EngineSpec) -> Result<Box<dyn AppWorker>, Error>,
}

impl fmt::Debug for AppModule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AppModule").field("name", &self.name).finish()
    }
}

static BUILTIN_APPS: Lazy<BTreeMap<&'static str, &'static AppModule>> = Lazy::new(|| {
    BTreeMap::from([
        ("builtin://sssp", &apps::sssp::MODULE),
        ("builtin://pagerank", &apps::pagerank::MODULE),
        ("builtin://wcc", &apps::wcc::MODULE),
    ])
});

enum ModuleHandle {
    Builtin(&'static AppModule),
    Loaded {
        // Dropping the library invalidates the vtable; keep them together.
        _lib: libloading::Library,
        module: &'static AppModule,
    },
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModuleHandle::Builtin(m) => write!(f, "Builtin({})", m.name),
            ModuleHandle::Loaded { module, .. } => write!(f, "Loaded({})", module.name),
        }
    }
}

impl ModuleHandle {
    fn module(&self) -> &AppModule {
        match self {
            ModuleHandle::Builtin(m) => m,
            ModuleHandle::Loaded { module, .. } => module,
        }
    }
}

/// A handle on a loaded algorithm.
#[derive(Debug)]
pub struct AppEntry {
    name: String,
    lib_path: String,
    module: ModuleHandle,
}

impl AppEntry {
    /// Resolves an algorithm from its library path.
    pub fn init(name: &str, lib_path: &str) -> Result<AppEntry, Error> {
        let module = if lib_path.starts_with("builtin://") {
            let module = BUILTIN_APPS.get(lib_path).ok_or_else(|| {
                Error::new(
                    ErrorKind::LibraryLoad,
                    format!("no built-in algorithm {}", lib_path),
                )
            })?;
            ModuleHandle::Builtin(*module)
        } else {
            // SAFETY: loading an algorithm library runs its initializers; the
            // deployment only installs libraries built against this engine.
            let lib = unsafe { libloading::Library::new(lib_path) }.map_err(|e| {
                Error::new(
                    ErrorKind::LibraryLoad,
                    format!("failed to load {}: {}", lib_path, e),
                )
            })?;
            let module = unsafe {
                let abi: libloading::Symbol<unsafe extern "C" fn() -> u32> =
                    lib.get(b"engine_app_abi_version").map_err(|e| {
                        Error::new(
                            ErrorKind::LibraryLoad,
                            format!("{} exports no ABI version: {}", lib_path, e),
                        )
                    })?;
                let version = abi();
                if version != APP_ABI_VERSION {
                    return Err(Error::new(
                        ErrorKind::LibraryLoad,
                        format!(
                            "ABI mismatch for {}: expected {} got {}",
                            lib_path, APP_ABI_VERSION, version
                        ),
                    ));
                }
                let entry: libloading::Symbol<unsafe extern "C" fn() -> *const AppModule> =
                    lib.get(b"engine_app_module_v1").map_err(|e| {
                        Error::new(
                            ErrorKind::LibraryLoad,
                            format!("{} exports no module entry: {}", lib_path, e),
                        )
                    })?;
                &*entry()
            };
            ModuleHandle::Loaded { _lib: lib, module }
        };
        Ok(AppEntry {
            name: name.to_string(),
            lib_path: lib_path.to_string(),
            module,
        })
    }

    /// The registry id of this entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The library this entry was loaded from.
    pub fn lib_path(&self) -> &str {
        &self.lib_path
    }

    /// Creates a worker over one fragment.
    pub fn create_worker(
        &self,
        frag: &FragmentHandle,
        spec: &EngineSpec,
    ) -> Result<Box<dyn AppWorker>, Error> {
        (self.module.module().create_worker)(frag, spec)
    }

    /// Runs the algorithm collectively.
    pub fn query(
        &self,
        worker: &mut dyn AppWorker,
        comm: &CommSpec,
        args: &QueryArgs,
    ) -> Result<AppOutput, Error> {
        worker.query(comm, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_builtin_fails_with_library_load() {
        let err = AppEntry::init("app_0", "builtin://does-not-exist").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LibraryLoad);
    }

    #[test]
    fn test_missing_library_fails_with_library_load() {
        let err = AppEntry::init("app_0", "/nonexistent/libapp.so").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LibraryLoad);
    }

    #[test]
    fn test_builtin_resolves() {
        let entry = AppEntry::init("app_0", "builtin://sssp").unwrap();
        assert_eq!(entry.lib_path(), "builtin://sssp");
    }
}
