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

//! Thread utilities.

use std::thread::{self, JoinHandle};

/// Wraps a [`JoinHandle`] so that the child thread is joined when the handle
/// is dropped, rather than detached. If the child thread panics,
/// `JoinOnDropHandle` will panic when dropped.
#[derive(Debug)]
pub struct JoinOnDropHandle<T>(Option<JoinHandle<T>>);

impl<T> Drop for JoinOnDropHandle<T> {
    fn drop(&mut self) {
        self.0.take().unwrap().join().unwrap();
    }
}

/// Extension methods for [`JoinHandle`].
pub trait JoinHandleExt<T> {
    /// Converts a [`JoinHandle`] into a [`JoinOnDropHandle`].
    fn join_on_drop(self) -> JoinOnDropHandle<T>;
}

impl<T> JoinHandleExt<T> for JoinHandle<T> {
    fn join_on_drop(self) -> JoinOnDropHandle<T> {
        JoinOnDropHandle(Some(self))
    }
}

/// Runs `f(i)` for each `i` in `0..count` on `count` freshly spawned threads
/// and joins them all before returning.
///
/// The join is unconditional: the handles are join-on-drop, so every thread is
/// joined on all exit paths, including a panic in one of the closures.
pub fn fan_out<F, T>(count: usize, f: F) -> Vec<T>
where
    F: Fn(usize) -> T + Send + Sync,
    T: Send,
{
    thread::scope(|s| {
        let f = &f;
        let handles: Vec<_> = (0..count).map(|i| s.spawn(move || f(i))).collect();
        let mut out = Vec::with_capacity(count);
        for handle in handles {
            out.push(handle.join().unwrap());
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_preserves_index_order() {
        let squares = fan_out(8, |i| i * i);
        assert_eq!(squares, vec![0, 1, 4, 9, 16, 25, 36, 49]);
    }
}
