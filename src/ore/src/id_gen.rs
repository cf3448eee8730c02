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

//! ID generation utilities.

use std::marker::PhantomData;

/// Manages the allocation of unique IDs.
///
/// The counter is process local. Generated artifact names nonetheless stay
/// consistent across a symmetric worker set, because every worker allocates
/// ids in the same command order.
#[derive(Debug, Default)]
pub struct Gen<Id: From<u64> + Default> {
    id: u64,
    phantom: PhantomData<Id>,
}

impl<Id: From<u64> + Default> Gen<Id> {
    /// Allocates a new identifier of type `Id` and advances the generator.
    pub fn allocate_id(&mut self) -> Id {
        let id = self.id;
        self.id += 1;
        id.into()
    }
}

/// A generator of u64-bit IDs.
pub type IdGen = Gen<u64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_gen_is_monotonic() {
        let mut gen = IdGen::default();
        let ids: Vec<u64> = (0..5).map(|_| gen.allocate_id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }
}
