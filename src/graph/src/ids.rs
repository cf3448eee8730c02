// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Global-id packing for labeled columnar graphs.
//!
//! A gid encodes (fragment, label, offset): the fragment id in the high bits,
//! then a fixed 8-bit label, then the offset within the label's contiguous
//! inner-vertex block.

const LABEL_BITS: u32 = 8;

/// Packs and unpacks (fid, label, offset) triples into 64-bit gids.
#[derive(Clone, Copy, Debug)]
pub struct IdParser {
    fid_bits: u32,
}

impl IdParser {
    /// Creates a parser for a cluster of `fnum` fragments.
    pub fn new(fnum: usize) -> IdParser {
        let fid_bits = usize::BITS - fnum.next_power_of_two().leading_zeros() - 1;
        IdParser {
            fid_bits: fid_bits.max(1),
        }
    }

    fn offset_bits(&self) -> u32 {
        64 - self.fid_bits - LABEL_BITS
    }

    /// Builds the gid for a (fid, label, offset) triple.
    pub fn generate_id(&self, fid: usize, label: i32, offset: usize) -> u64 {
        ((fid as u64) << (64 - self.fid_bits))
            | ((label as u64) << self.offset_bits())
            | offset as u64
    }

    /// The fragment id encoded in a gid.
    pub fn fid(&self, gid: u64) -> usize {
        (gid >> (64 - self.fid_bits)) as usize
    }

    /// The label id encoded in a gid.
    pub fn label(&self, gid: u64) -> i32 {
        ((gid >> self.offset_bits()) & ((1 << LABEL_BITS) - 1)) as i32
    }

    /// The within-label offset encoded in a gid.
    pub fn offset(&self, gid: u64) -> usize {
        (gid & ((1u64 << self.offset_bits()) - 1)) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let parser = IdParser::new(4);
        for fid in 0..4 {
            for label in 0..3 {
                for offset in [0usize, 1, 17, 100_000] {
                    let gid = parser.generate_id(fid, label, offset);
                    assert_eq!(parser.fid(gid), fid);
                    assert_eq!(parser.label(gid), label);
                    assert_eq!(parser.offset(gid), offset);
                }
            }
        }
    }

    #[test]
    fn test_single_fragment() {
        let parser = IdParser::new(1);
        let gid = parser.generate_id(0, 2, 5);
        assert_eq!(parser.fid(gid), 0);
        assert_eq!(parser.label(gid), 2);
        assert_eq!(parser.offset(gid), 5);
    }
}
