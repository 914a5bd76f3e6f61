pub const DEFLATE_BLOCKTYPE_UNCOMPRESSED: u32 = 0;
pub const DEFLATE_BLOCKTYPE_STATIC_HUFFMAN: u32 = 1;
pub const DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN: u32 = 2;

pub const DEFLATE64_WINDOW_BITS: u32 = 16;
pub const DEFLATE64_WINDOW_SIZE: usize = 1 << DEFLATE64_WINDOW_BITS;
pub const MIN_WINDOW_BITS: u32 = 8;
pub const MAX_WINDOW_BITS: u32 = 16;

pub const DEFLATE64_MIN_MATCH_LEN: usize = 3;
pub const DEFLATE64_MAX_MATCH_LEN: usize = 65538;
pub const DEFLATE64_MAX_MATCH_OFFSET: usize = 65536;

pub const DEFLATE_NUM_PRECODE_SYMS: usize = 19;
pub const DEFLATE_NUM_LITLEN_SYMS: usize = 288;
pub const DEFLATE_NUM_OFFSET_SYMS: usize = 32;
pub const DEFLATE64_MAX_LITLEN_SYMS: usize = 286;

pub const DEFLATE_NUM_LITERALS: usize = 256;
pub const DEFLATE_END_OF_BLOCK: usize = 256;
pub const DEFLATE_FIRST_LEN_SYM: usize = 257;

pub const DEFLATE_MAX_CODEWORD_LEN: usize = 15;

pub const PRECODE_TABLEBITS: u32 = 7;
pub const LITLEN_TABLEBITS: u32 = 9;
pub const OFFSET_TABLEBITS: u32 = 6;
pub const FIXED_OFFSET_TABLEBITS: u32 = 5;

// Worst-case table sizes for root widths 9 and 6 over 286 and 32 symbols
// with codes of at most 15 bits.
pub const LITLEN_ENOUGH: usize = 852;
pub const OFFSET_ENOUGH: usize = 594;
pub const TABLE_ENOUGH: usize = LITLEN_ENOUGH + OFFSET_ENOUGH;

pub const FIXED_TABLE_SIZE: usize = 544;

/// Transmission order of the code-length code lengths.
pub const PRECODE_LENS_PERMUTATION: [usize; DEFLATE_NUM_PRECODE_SYMS] =
    [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];
