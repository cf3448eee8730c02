// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository, or online at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Internal utility libraries for the graph engine.
//!
//! **ore** (_n_): the raw material from which more valuable materials are
//! extracted. Modules are included in this crate when they are broadly useful
//! but too small to warrant their own crate.

#![warn(missing_docs, missing_debug_implementations)]

pub mod id_gen;
pub mod thread;
