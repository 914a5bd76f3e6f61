//! Minimal Deflate64 encoder used to produce test streams.
#![allow(dead_code)]

use std::cmp::{min, Reverse};
use std::collections::BinaryHeap;

use inflate64::{Flush, Inflater, Status};

pub const WINDOW_SIZE: usize = 65536;
pub const MAX_MATCH_LEN: usize = 65538;
pub const MAX_STORED_LEN: usize = 65535;

const LENGTH_BASE: [usize; 28] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227,
];
const LENGTH_EXTRA: [u32; 28] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5,
];
const DIST_BASE: [usize; 32] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537, 2049,
    3073, 4097, 6145, 8193, 12289, 16385, 24577, 32769, 49153,
];
const DIST_EXTRA: [u32; 32] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13, 13,
    14, 14,
];
const PRECODE_ORDER: [usize; 19] = [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

/// LSB-first bit writer.
pub struct Bitstream {
    pub output: Vec<u8>,
    pub bitbuf: u64,
    pub bitcount: u32,
}

impl Bitstream {
    pub fn new() -> Self {
        Self {
            output: Vec::new(),
            bitbuf: 0,
            bitcount: 0,
        }
    }

    pub fn write_bits(&mut self, bits: u32, count: u32) {
        assert!(count <= 32);
        if count == 0 {
            return;
        }
        let mask = (1u64 << count) - 1;
        self.bitbuf |= (bits as u64 & mask) << self.bitcount;
        self.bitcount += count;
        while self.bitcount >= 8 {
            self.output.push(self.bitbuf as u8);
            self.bitbuf >>= 8;
            self.bitcount -= 8;
        }
    }

    /// Huffman codes go out most significant bit first.
    pub fn write_code(&mut self, code: u32, len: u8) {
        assert!(len > 0, "symbol has no code");
        let reversed = code.reverse_bits() >> (32 - len as u32);
        self.write_bits(reversed, len as u32);
    }

    pub fn align_to_byte(&mut self) {
        if self.bitcount > 0 {
            self.output.push(self.bitbuf as u8);
            self.bitbuf = 0;
            self.bitcount = 0;
        }
    }

    pub fn bit_len(&self) -> usize {
        self.output.len() * 8 + self.bitcount as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    Literal(u8),
    Match { length: usize, distance: usize },
}

fn length_symbol(length: usize) -> (usize, u32, u32) {
    assert!((3..=MAX_MATCH_LEN).contains(&length));
    if length > 258 {
        return (285, 16, (length - 3) as u32);
    }
    let idx = LENGTH_BASE.iter().rposition(|&base| base <= length).unwrap();
    (257 + idx, LENGTH_EXTRA[idx], (length - LENGTH_BASE[idx]) as u32)
}

fn distance_symbol(distance: usize) -> (usize, u32, u32) {
    assert!((1..=WINDOW_SIZE).contains(&distance));
    let idx = DIST_BASE.iter().rposition(|&base| base <= distance).unwrap();
    (idx, DIST_EXTRA[idx], (distance - DIST_BASE[idx]) as u32)
}

/// Canonical codes for a set of code lengths.
pub fn canonical_codes(lens: &[u8]) -> Vec<u32> {
    let mut bl_count = [0u32; 16];
    for &len in lens {
        bl_count[len as usize] += 1;
    }
    bl_count[0] = 0;
    let mut next_code = [0u32; 16];
    let mut code = 0;
    for bits in 1..16 {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }
    lens.iter()
        .map(|&len| {
            if len == 0 {
                0
            } else {
                let c = next_code[len as usize];
                next_code[len as usize] += 1;
                c
            }
        })
        .collect()
}

/// Huffman code lengths no longer than `limit`. Frequencies are halved
/// until the tree fits. A lone used symbol gets a partner so the code is
/// complete.
pub fn huffman_lengths(freqs: &[u32], limit: u8) -> Vec<u8> {
    let mut lens = vec![0u8; freqs.len()];
    let used: Vec<usize> = (0..freqs.len()).filter(|&s| freqs[s] > 0).collect();
    match used.len() {
        0 => return lens,
        1 => {
            lens[used[0]] = 1;
            lens[if used[0] == 0 { 1 } else { 0 }] = 1;
            return lens;
        }
        _ => {}
    }

    let mut weights: Vec<u64> = used.iter().map(|&s| freqs[s] as u64).collect();
    loop {
        let depths = tree_depths(&weights);
        if depths.iter().all(|&d| d <= limit as u32) {
            for (i, &s) in used.iter().enumerate() {
                lens[s] = depths[i] as u8;
            }
            return lens;
        }
        for w in &mut weights {
            *w = (*w + 1) / 2;
        }
    }
}

fn tree_depths(weights: &[u64]) -> Vec<u32> {
    let n = weights.len();
    let mut parent = vec![usize::MAX; 2 * n];
    let mut heap = BinaryHeap::new();
    for (i, &w) in weights.iter().enumerate() {
        heap.push(Reverse((w, i)));
    }
    let mut next = n;
    while heap.len() > 1 {
        let Reverse((w1, a)) = heap.pop().unwrap();
        let Reverse((w2, b)) = heap.pop().unwrap();
        parent[a] = next;
        parent[b] = next;
        heap.push(Reverse((w1 + w2, next)));
        next += 1;
    }
    (0..n)
        .map(|leaf| {
            let mut depth = 0;
            let mut node = leaf;
            while parent[node] != usize::MAX {
                node = parent[node];
                depth += 1;
            }
            depth
        })
        .collect()
}

/// Greedy hash-chain matcher over the full 64KiB window.
pub fn lz77(data: &[u8]) -> Vec<Token> {
    const HASH_BITS: u32 = 15;
    const MAX_CHAIN: usize = 64;
    let hash = |p: usize| -> usize {
        let v = (data[p] as u32) << 16 | (data[p + 1] as u32) << 8 | data[p + 2] as u32;
        (v.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
    };
    let mut head = vec![usize::MAX; 1 << HASH_BITS];
    let mut prev = vec![usize::MAX; data.len()];

    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let mut best_len = 0;
        let mut best_dist = 0;
        if i + 3 <= data.len() {
            let max = min(MAX_MATCH_LEN, data.len() - i);
            let mut cand = head[hash(i)];
            let mut chain = 0;
            while cand != usize::MAX && i - cand <= WINDOW_SIZE && chain < MAX_CHAIN {
                let mut len = 0;
                while len < max && data[cand + len] == data[i + len] {
                    len += 1;
                }
                if len > best_len {
                    best_len = len;
                    best_dist = i - cand;
                    if len == max {
                        break;
                    }
                }
                cand = prev[cand];
                chain += 1;
            }
        }
        let step = if best_len >= 3 {
            tokens.push(Token::Match {
                length: best_len,
                distance: best_dist,
            });
            best_len
        } else {
            tokens.push(Token::Literal(data[i]));
            1
        };
        for p in i..i + step {
            if p + 3 <= data.len() {
                let h = hash(p);
                prev[p] = head[h];
                head[h] = p;
            }
        }
        i += step;
    }
    tokens
}

/// Expands tokens back into bytes; used to check test inputs.
pub fn expand(tokens: &[Token]) -> Vec<u8> {
    let mut out = Vec::new();
    for &token in tokens {
        match token {
            Token::Literal(b) => out.push(b),
            Token::Match { length, distance } => {
                let start = out.len() - distance;
                for k in 0..length {
                    out.push(out[start + k]);
                }
            }
        }
    }
    out
}

fn fixed_litlen_lens() -> Vec<u8> {
    let mut lens = vec![8u8; 288];
    lens[144..256].fill(9);
    lens[256..280].fill(7);
    lens
}

/// Block-by-block stream builder.
pub struct Encoder {
    bs: Bitstream,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            bs: Bitstream::new(),
        }
    }

    fn block_header(&mut self, last: bool, block_type: u32) {
        self.bs.write_bits(last as u32, 1);
        self.bs.write_bits(block_type, 2);
    }

    pub fn stored_block(&mut self, data: &[u8], last: bool) -> &mut Self {
        assert!(data.len() <= MAX_STORED_LEN);
        self.block_header(last, 0);
        self.bs.align_to_byte();
        let len = data.len() as u16;
        self.bs.output.extend_from_slice(&len.to_le_bytes());
        self.bs.output.extend_from_slice(&(!len).to_le_bytes());
        self.bs.output.extend_from_slice(data);
        self
    }

    pub fn fixed_block(&mut self, tokens: &[Token], last: bool) -> &mut Self {
        self.block_header(last, 1);
        let lit_lens = fixed_litlen_lens();
        let dist_lens = vec![5u8; 32];
        self.write_tokens(tokens, &lit_lens, &dist_lens);
        self
    }

    pub fn dynamic_block(&mut self, tokens: &[Token], last: bool) -> &mut Self {
        let mut lit_freq = vec![0u32; 286];
        let mut dist_freq = vec![0u32; 32];
        for &token in tokens {
            match token {
                Token::Literal(b) => lit_freq[b as usize] += 1,
                Token::Match { length, distance } => {
                    lit_freq[length_symbol(length).0] += 1;
                    dist_freq[distance_symbol(distance).0] += 1;
                }
            }
        }
        lit_freq[256] += 1;

        let lit_lens = huffman_lengths(&lit_freq, 15);
        let mut dist_lens = huffman_lengths(&dist_freq, 15);
        if dist_lens.iter().all(|&l| l == 0) {
            dist_lens[0] = 1;
            dist_lens[1] = 1;
        }
        self.dynamic_block_with_lens(tokens, &lit_lens, &dist_lens, last)
    }

    /// Dynamic block with caller-chosen code lengths. `lit_lens` holds up to
    /// 286 entries and `dist_lens` up to 32; trailing zeros are trimmed.
    pub fn dynamic_block_with_lens(
        &mut self,
        tokens: &[Token],
        lit_lens: &[u8],
        dist_lens: &[u8],
        last: bool,
    ) -> &mut Self {
        self.dynamic_header(lit_lens, dist_lens, last);
        let mut full_lit = lit_lens.to_vec();
        full_lit.resize(288, 0);
        let mut full_dist = dist_lens.to_vec();
        full_dist.resize(32, 0);
        self.write_tokens(tokens, &full_lit, &full_dist);
        self
    }

    /// Block header and code length tables only, with no body.
    pub fn dynamic_header(&mut self, lit_lens: &[u8], dist_lens: &[u8], last: bool) -> &mut Self {
        let nlen = (lit_lens.iter().rposition(|&l| l != 0).map_or(0, |p| p + 1)).max(257);
        let ndist = (dist_lens.iter().rposition(|&l| l != 0).map_or(0, |p| p + 1)).max(1);
        let mut all_lens = Vec::with_capacity(nlen + ndist);
        all_lens.extend((0..nlen).map(|s| lit_lens.get(s).copied().unwrap_or(0)));
        all_lens.extend((0..ndist).map(|s| dist_lens.get(s).copied().unwrap_or(0)));

        let runs = run_length_encode(&all_lens);
        let mut cl_freq = vec![0u32; 19];
        for &(sym, _, _) in &runs {
            cl_freq[sym as usize] += 1;
        }
        let cl_lens = huffman_lengths(&cl_freq, 7);
        let cl_codes = canonical_codes(&cl_lens);
        let ncode = PRECODE_ORDER
            .iter()
            .rposition(|&s| cl_lens[s] != 0)
            .map_or(0, |p| p + 1)
            .max(4);

        self.block_header(last, 2);
        self.bs.write_bits((nlen - 257) as u32, 5);
        self.bs.write_bits((ndist - 1) as u32, 5);
        self.bs.write_bits((ncode - 4) as u32, 4);
        for &s in &PRECODE_ORDER[..ncode] {
            self.bs.write_bits(cl_lens[s] as u32, 3);
        }
        for &(sym, extra_bits, extra) in &runs {
            self.bs.write_code(cl_codes[sym as usize], cl_lens[sym as usize]);
            self.bs.write_bits(extra, extra_bits);
        }
        self
    }

    fn write_tokens(&mut self, tokens: &[Token], lit_lens: &[u8], dist_lens: &[u8]) {
        let lit_codes = canonical_codes(lit_lens);
        let dist_codes = canonical_codes(dist_lens);
        for &token in tokens {
            match token {
                Token::Literal(b) => self.bs.write_code(lit_codes[b as usize], lit_lens[b as usize]),
                Token::Match { length, distance } => {
                    let (sym, extra_bits, extra) = length_symbol(length);
                    self.bs.write_code(lit_codes[sym], lit_lens[sym]);
                    self.bs.write_bits(extra, extra_bits);
                    let (dsym, dextra_bits, dextra) = distance_symbol(distance);
                    self.bs.write_code(dist_codes[dsym], dist_lens[dsym]);
                    self.bs.write_bits(dextra, dextra_bits);
                }
            }
        }
        self.bs.write_code(lit_codes[256], lit_lens[256]);
    }

    /// Raw bits, for hand-built corrupt streams.
    pub fn raw_bits(&mut self, bits: u32, count: u32) -> &mut Self {
        self.bs.write_bits(bits, count);
        self
    }

    /// A Huffman code, most significant bit first.
    pub fn raw_code(&mut self, code: u32, len: u8) -> &mut Self {
        self.bs.write_code(code, len);
        self
    }

    pub fn bit_len(&self) -> usize {
        self.bs.bit_len()
    }

    pub fn finish(&mut self) -> Vec<u8> {
        self.bs.align_to_byte();
        std::mem::take(&mut self.bs.output)
    }
}

/// Code-length symbols as `(symbol, extra bit count, extra value)`.
pub fn run_length_encode(lens: &[u8]) -> Vec<(u8, u32, u32)> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < lens.len() {
        let v = lens[i];
        let mut run = 1;
        while i + run < lens.len() && lens[i + run] == v {
            run += 1;
        }
        i += run;
        if v == 0 {
            while run >= 11 {
                let n = min(run, 138);
                out.push((18, 7, (n - 11) as u32));
                run -= n;
            }
            if run >= 3 {
                out.push((17, 3, (run - 3) as u32));
                run = 0;
            }
        } else {
            out.push((v, 0, 0));
            run -= 1;
            while run >= 3 {
                let n = min(run, 6);
                out.push((16, 2, (n - 3) as u32));
                run -= n;
            }
        }
        for _ in 0..run {
            out.push((v, 0, 0));
        }
    }
    out
}

pub fn compress_stored(data: &[u8]) -> Vec<u8> {
    let mut enc = Encoder::new();
    if data.is_empty() {
        enc.stored_block(&[], true);
    } else {
        let count = data.len().div_ceil(MAX_STORED_LEN);
        for (i, chunk) in data.chunks(MAX_STORED_LEN).enumerate() {
            enc.stored_block(chunk, i + 1 == count);
        }
    }
    enc.finish()
}

pub fn compress_fixed(data: &[u8]) -> Vec<u8> {
    let tokens = lz77(data);
    Encoder::new().fixed_block(&tokens, true).finish()
}

pub fn compress_dynamic(data: &[u8]) -> Vec<u8> {
    const TOKENS_PER_BLOCK: usize = 16 * 1024;
    let tokens = lz77(data);
    let mut enc = Encoder::new();
    if tokens.is_empty() {
        enc.dynamic_block(&[], true);
    } else {
        let count = tokens.len().div_ceil(TOKENS_PER_BLOCK);
        for (i, block) in tokens.chunks(TOKENS_PER_BLOCK).enumerate() {
            enc.dynamic_block(block, i + 1 == count);
        }
    }
    enc.finish()
}

/// Decodes `input` feeding at most `in_chunk` input bytes and offering at
/// most `out_chunk` output bytes per call. Returns the output and the final
/// status; stops on anything other than `Ok`.
pub fn inflate_chunked(input: &[u8], in_chunk: usize, out_chunk: usize) -> (Vec<u8>, Status) {
    let mut inflater = Inflater::new(-16).unwrap();
    let mut output = Vec::new();
    let mut buf = vec![0u8; out_chunk];
    let mut pos = 0;
    loop {
        let end = min(pos + in_chunk, input.len());
        let (status, consumed, produced) = inflater.inflate(&input[pos..end], &mut buf, Flush::None);
        pos += consumed;
        output.extend_from_slice(&buf[..produced]);
        match status {
            Status::Ok => {}
            other => {
                assert_eq!(inflater.total_in(), pos as u64);
                return (output, other);
            }
        }
    }
}

pub fn inflate_all(input: &[u8]) -> (Vec<u8>, Status) {
    inflate_chunked(input, input.len().max(1), 1 << 20)
}

/// Byte pattern used by the end-to-end tests.
pub fn sequential_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}
