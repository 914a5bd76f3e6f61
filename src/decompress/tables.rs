//! Canonical Huffman decode tables.
//!
//! A table is a flat array of [`Entry`] indexed by the next `bits` input
//! bits (LSB-first). Codes longer than the root width resolve through one
//! level of sub-tables, linked from the root by a [`Operation::SubTableLink`]
//! entry whose `value` is the sub-table offset relative to the root table.

use crate::common::*;
use std::cmp::min;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Operation {
    Literal,
    Length,
    Distance,
    EndOfBlock,
    #[default]
    Invalid,
    SubTableLink,
}

/// One decode table slot.
///
/// For a sub-table link, `code_bits` is the root width to drop, `extra_bits`
/// is the sub-table index width and `value` is the sub-table offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    pub op: Operation,
    pub extra_bits: u8,
    pub code_bits: u8,
    pub value: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeKind {
    CodeLengths,
    Lengths,
    Distances,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidCodeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuiltTable {
    /// Root index width actually used.
    pub bits: u32,
    /// Number of entries written, root plus sub-tables.
    pub used: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableSource {
    Fixed,
    Dynamic,
}

/// Location of a decode table: the arena it lives in, its first entry and
/// its root width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Table {
    pub source: TableSource,
    pub start: usize,
    pub bits: u32,
}

impl Table {
    pub const fn dynamic(start: usize, bits: u32) -> Self {
        Self {
            source: TableSource::Dynamic,
            start,
            bits,
        }
    }
}

// Symbols 257..=287. 285 carries 16 extra bits in Deflate64; 286 and 287
// never appear in a valid stream.
const LENGTH_BASE: [u16; 31] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 3, 0, 0,
];
const LENGTH_EXTRA: [u8; 31] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 16, 0, 0,
];
const NUM_LENGTH_CODES: usize = 29;

const OFFSET_BASE: [u16; DEFLATE_NUM_OFFSET_SYMS] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577, 32769, 49153,
];
const OFFSET_EXTRA: [u8; DEFLATE_NUM_OFFSET_SYMS] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13, 14, 14,
];

fn symbol_entry(kind: CodeKind, sym: usize, code_bits: u8) -> Entry {
    let (op, extra_bits, value) = match kind {
        CodeKind::CodeLengths => (Operation::Literal, 0, sym as u16),
        CodeKind::Lengths if sym < DEFLATE_NUM_LITERALS => (Operation::Literal, 0, sym as u16),
        CodeKind::Lengths if sym == DEFLATE_END_OF_BLOCK => (Operation::EndOfBlock, 0, 0),
        CodeKind::Lengths => {
            let idx = sym - DEFLATE_FIRST_LEN_SYM;
            if idx < NUM_LENGTH_CODES {
                (Operation::Length, LENGTH_EXTRA[idx], LENGTH_BASE[idx])
            } else {
                (Operation::Invalid, 0, 0)
            }
        }
        CodeKind::Distances => (Operation::Distance, OFFSET_EXTRA[sym], OFFSET_BASE[sym]),
    };
    Entry {
        op,
        extra_bits,
        code_bits,
        value,
    }
}

/// Builds a decode table for `lens` into `table`, whose length bounds the
/// space the root table and its sub-tables may use.
///
/// Over-subscribed sets are rejected. Incomplete sets are rejected too,
/// except a literal/length or distance set holding a single one-bit code;
/// the unused slot then decodes as [`Operation::Invalid`]. A set with no
/// codes at all produces a one-bit table of invalid entries.
pub fn build_decode_table(
    kind: CodeKind,
    lens: &[u16],
    table: &mut [Entry],
    root_bits: u32,
) -> Result<BuiltTable, InvalidCodeSet> {
    let mut count = [0u16; DEFLATE_MAX_CODEWORD_LEN + 1];
    for &len in lens {
        if len as usize > DEFLATE_MAX_CODEWORD_LEN {
            return Err(InvalidCodeSet);
        }
        count[len as usize] += 1;
    }

    let mut max = DEFLATE_MAX_CODEWORD_LEN;
    while max >= 1 && count[max] == 0 {
        max -= 1;
    }
    let mut root = min(root_bits as usize, max);
    if max == 0 {
        if table.len() < 2 {
            return Err(InvalidCodeSet);
        }
        let here = Entry {
            op: Operation::Invalid,
            code_bits: 1,
            ..Entry::default()
        };
        table[0] = here;
        table[1] = here;
        return Ok(BuiltTable { bits: 1, used: 2 });
    }
    let mut min_len = 1;
    while min_len < max && count[min_len] == 0 {
        min_len += 1;
    }
    if root < min_len {
        root = min_len;
    }

    let mut left: i32 = 1;
    for len in 1..=DEFLATE_MAX_CODEWORD_LEN {
        left <<= 1;
        left -= count[len] as i32;
        if left < 0 {
            return Err(InvalidCodeSet);
        }
    }
    if left > 0 && (kind == CodeKind::CodeLengths || max != 1) {
        return Err(InvalidCodeSet);
    }

    let mut offs = [0u16; DEFLATE_MAX_CODEWORD_LEN + 1];
    for len in 1..DEFLATE_MAX_CODEWORD_LEN {
        offs[len + 1] = offs[len] + count[len];
    }
    let mut sorted_syms = [0u16; DEFLATE_NUM_LITLEN_SYMS];
    for (sym, &len) in lens.iter().enumerate() {
        if len != 0 {
            sorted_syms[offs[len as usize] as usize] = sym as u16;
            offs[len as usize] += 1;
        }
    }

    let mask = (1u32 << root) - 1;
    let mut used = 1usize << root;
    if used > table.len() {
        return Err(InvalidCodeSet);
    }

    // `huff` is the current code bit-reversed, `next` the start of the
    // (sub-)table being filled, `drop` the root bits already consumed.
    let mut huff: u32 = 0;
    let mut sym = 0usize;
    let mut len = min_len;
    let mut next = 0usize;
    let mut curr = root;
    let mut drop = 0usize;
    let mut low = u32::MAX;

    loop {
        let here = symbol_entry(kind, sorted_syms[sym] as usize, (len - drop) as u8);

        let incr = 1usize << (len - drop);
        let size = 1usize << curr;
        let mut fill = size;
        loop {
            fill -= incr;
            table[next + (huff as usize >> drop) + fill] = here;
            if fill == 0 {
                break;
            }
        }

        let mut bit = 1u32 << (len - 1);
        while huff & bit != 0 {
            bit >>= 1;
        }
        if bit != 0 {
            huff &= bit - 1;
            huff += bit;
        } else {
            huff = 0;
        }

        sym += 1;
        count[len] -= 1;
        if count[len] == 0 {
            if len == max {
                break;
            }
            len = lens[sorted_syms[sym] as usize] as usize;
        }

        if len > root && (huff & mask) != low {
            if drop == 0 {
                drop = root;
            }
            next += size;

            curr = len - drop;
            let mut left: i32 = 1 << curr;
            while curr + drop < max {
                left -= count[curr + drop] as i32;
                if left <= 0 {
                    break;
                }
                curr += 1;
                left <<= 1;
            }

            used += 1 << curr;
            if used > table.len() {
                return Err(InvalidCodeSet);
            }

            low = huff & mask;
            table[low as usize] = Entry {
                op: Operation::SubTableLink,
                extra_bits: curr as u8,
                code_bits: root as u8,
                value: next as u16,
            };
        }
    }

    // Only a lone one-bit code leaves a hole.
    if huff != 0 {
        table[next + huff as usize] = Entry {
            op: Operation::Invalid,
            code_bits: (len - drop) as u8,
            ..Entry::default()
        };
    }

    Ok(BuiltTable {
        bits: root as u32,
        used,
    })
}

pub struct FixedTables {
    pub entries: [Entry; FIXED_TABLE_SIZE],
    pub litlen: Table,
    pub offset: Table,
}

static FIXED_TABLES: OnceLock<FixedTables> = OnceLock::new();

/// Process-wide fixed-Huffman tables, built on first use.
pub fn fixed_tables() -> &'static FixedTables {
    FIXED_TABLES.get_or_init(|| {
        let mut lens = [0u16; DEFLATE_NUM_LITLEN_SYMS];
        let mut i = 0;
        while i < 144 {
            lens[i] = 8;
            i += 1;
        }
        while i < 256 {
            lens[i] = 9;
            i += 1;
        }
        while i < 280 {
            lens[i] = 7;
            i += 1;
        }
        while i < 288 {
            lens[i] = 8;
            i += 1;
        }

        let mut entries = [Entry::default(); FIXED_TABLE_SIZE];
        let litlen = match build_decode_table(
            CodeKind::Lengths,
            &lens,
            &mut entries[..],
            LITLEN_TABLEBITS,
        ) {
            Ok(built) => built,
            Err(_) => unreachable!("fixed literal/length lengths form a complete code"),
        };

        let offset_lens = [5u16; DEFLATE_NUM_OFFSET_SYMS];
        let offset = match build_decode_table(
            CodeKind::Distances,
            &offset_lens,
            &mut entries[litlen.used..],
            FIXED_OFFSET_TABLEBITS,
        ) {
            Ok(built) => built,
            Err(_) => unreachable!("fixed distance lengths form a complete code"),
        };
        log::debug!(
            "built fixed tables: {} literal/length + {} distance entries",
            litlen.used,
            offset.used
        );

        FixedTables {
            entries,
            litlen: Table {
                source: TableSource::Fixed,
                start: 0,
                bits: litlen.bits,
            },
            offset: Table {
                source: TableSource::Fixed,
                start: litlen.used,
                bits: offset.bits,
            },
        }
    })
}
