//! Resumable Deflate64 decoder.
//!
//! [`Inflater::inflate`] decodes as far as the supplied buffers allow and
//! returns. All progress (mode, bit accumulator, pending match, history) is
//! kept in the `Inflater`, so the next call resumes exactly where the
//! previous one stopped, whatever the chunking of input and output.

mod bits;
pub mod tables;
mod window;

use self::bits::{BitReader, BitState, Suspend};
use self::tables::*;
use self::window::{Output, TooFarBack, Window};
use crate::common::*;
use log::{debug, trace};
use std::cmp::min;

/// Decoder position between calls.
///
/// `CopyFirst` and `LenFirst` are the first entry into `Copy` and `Len`
/// right after a block header; `Flush::Trees` stops there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Mode {
    Type,
    Stored,
    CopyFirst,
    Copy,
    Table,
    LenLens,
    CodeLens,
    LenFirst,
    Len,
    LenExt,
    Dist,
    DistExt,
    Match,
    Lit,
    Done,
    Bad,
    Mem,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flush {
    None,
    Partial,
    Sync,
    Full,
    /// No more input follows; the stream must end in this call.
    Finish,
    /// Stop before the next block header.
    Block,
    /// Stop before the next block header and right after each header.
    Trees,
}

impl Flush {
    pub const fn code(self) -> i32 {
        match self {
            Flush::None => 0,
            Flush::Partial => 1,
            Flush::Sync => 2,
            Flush::Full => 3,
            Flush::Finish => 4,
            Flush::Block => 5,
            Flush::Trees => 6,
        }
    }
}

impl TryFrom<i32> for Flush {
    type Error = crate::Error;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Flush::None),
            1 => Ok(Flush::Partial),
            2 => Ok(Flush::Sync),
            3 => Ok(Flush::Full),
            4 => Ok(Flush::Finish),
            5 => Ok(Flush::Block),
            6 => Ok(Flush::Trees),
            _ => Err(crate::Error::Stream("invalid flush mode")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "Inflate status must be checked for errors"]
pub enum Status {
    Ok,
    StreamEnd,
    NeedDict,
    DataError,
    StreamError,
    MemError,
    BufError,
}

impl Status {
    pub const fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::StreamEnd => 1,
            Status::NeedDict => 2,
            Status::DataError => -3,
            Status::StreamError => -2,
            Status::MemError => -4,
            Status::BufError => -5,
        }
    }
}

/// Whether the caller asked for a wrapped or a raw stream. No container
/// header is parsed in either case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderMode {
    Raw,
    Wrapped,
}

/// Splits a signed window-bits request into header mode and window bits.
pub fn parse_window_bits(window_bits: i32) -> Option<(HeaderMode, u32)> {
    let (mode, bits) = if window_bits < 0 {
        (HeaderMode::Raw, window_bits.checked_neg()?)
    } else {
        (HeaderMode::Wrapped, window_bits)
    };
    let bits = bits as u32;
    if !(MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&bits) {
        return None;
    }
    Some((mode, bits))
}

pub struct Inflater {
    mode: Mode,
    last: bool,
    header: HeaderMode,
    dmax: usize,
    msg: Option<&'static str>,

    total_in: u64,
    total_out: u64,

    bit_state: BitState,

    // Stored length, match length or literal value.
    length: usize,
    offset: usize,
    extra: u32,

    ncode: usize,
    nlen: usize,
    ndist: usize,
    have: usize,
    lens: [u16; DEFLATE_NUM_LITLEN_SYMS + DEFLATE_NUM_OFFSET_SYMS],

    codes: Vec<Entry>,
    lencode: Table,
    distcode: Table,

    window: Window,
}

impl Inflater {
    /// Creates a decoder. `window_bits` is negative for a raw stream; its
    /// magnitude must lie in `8..=16`, with 16 being the Deflate64 window.
    pub fn new(window_bits: i32) -> Result<Self, Status> {
        let (header, bits) = parse_window_bits(window_bits).ok_or(Status::StreamError)?;
        let mut codes = Vec::new();
        codes
            .try_reserve_exact(TABLE_ENOUGH)
            .map_err(|_| Status::MemError)?;
        codes.resize(TABLE_ENOUGH, Entry::default());

        let mut inflater = Self {
            mode: Mode::Type,
            last: false,
            header,
            dmax: DEFLATE64_MAX_MATCH_OFFSET,
            msg: None,
            total_in: 0,
            total_out: 0,
            bit_state: BitState::default(),
            length: 0,
            offset: 0,
            extra: 0,
            ncode: 0,
            nlen: 0,
            ndist: 0,
            have: 0,
            lens: [0; DEFLATE_NUM_LITLEN_SYMS + DEFLATE_NUM_OFFSET_SYMS],
            codes,
            lencode: Table::dynamic(0, 0),
            distcode: Table::dynamic(0, 0),
            window: Window::new(bits),
        };
        inflater.reset();
        Ok(inflater)
    }

    /// Restarts decoding, keeping the window contents.
    pub fn reset_keep(&mut self) {
        self.total_in = 0;
        self.total_out = 0;
        self.msg = None;
        self.mode = Mode::Type;
        self.last = false;
        self.dmax = DEFLATE64_MAX_MATCH_OFFSET;
        self.bit_state = BitState::default();
        self.lencode = Table::dynamic(0, 0);
        self.distcode = Table::dynamic(0, 0);
        debug!("inflate64: reset");
    }

    /// Restarts decoding with an empty window.
    pub fn reset(&mut self) {
        self.window.reset();
        self.reset_keep();
    }

    /// Restarts decoding with a possibly different window size.
    pub fn reset2(&mut self, window_bits: i32) -> Status {
        let Some((header, bits)) = parse_window_bits(window_bits) else {
            return Status::StreamError;
        };
        self.window.set_bits(bits);
        self.header = header;
        self.reset();
        Status::Ok
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn header_mode(&self) -> HeaderMode {
        self.header
    }

    pub fn window_bits(&self) -> u32 {
        self.window.bits()
    }

    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Diagnostic for the last data error, if any.
    pub fn msg(&self) -> Option<&'static str> {
        self.msg
    }

    /// Pending bit count, plus 64 inside the last block, 128 at a block
    /// boundary and 256 right after a block header.
    pub fn data_type(&self) -> u32 {
        let mut word = self.bit_state.bits;
        if self.last {
            word += 64;
        }
        if self.mode == Mode::Type {
            word += 128;
        }
        if matches!(self.mode, Mode::LenFirst | Mode::CopyFirst) {
            word += 256;
        }
        word
    }

    /// Frees the window. The decoder stays usable and reallocates it lazily.
    pub fn release_window(&mut self) {
        self.window.release();
    }

    /// Decodes from `input` into `output`.
    ///
    /// Returns the status, the number of input bytes consumed and the number
    /// of output bytes produced. `Status::Ok` means more calls are expected;
    /// unless `flush` is `Block` or `Trees`, the input was then used up or
    /// the output filled. `Status::BufError` means no progress was possible,
    /// or `Flush::Finish` was requested and the stream did not end.
    pub fn inflate(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: Flush,
    ) -> (Status, usize, usize) {
        let mut bits = BitReader::new(input, self.bit_state);
        let (mut status, produced) = {
            let mut out = Output::new(output);
            let status = self.run(&mut bits, &mut out, flush).unwrap_or(Status::Ok);
            (status, out.position())
        };
        self.bit_state = bits.state();
        let consumed = bits.consumed();

        debug_assert!(
            status != Status::Ok
                || matches!(flush, Flush::Block | Flush::Trees)
                || consumed == input.len()
                || produced == output.len()
        );

        self.total_in += consumed as u64;
        self.total_out += produced as u64;

        if self.window.in_use()
            || (produced != 0
                && self.mode < Mode::Bad
                && (self.mode < Mode::Done || flush != Flush::Finish))
        {
            if self.window.update(&output[..produced]).is_err() {
                self.mode = Mode::Mem;
                return (Status::MemError, consumed, produced);
            }
        }

        if ((consumed == 0 && produced == 0) || flush == Flush::Finish) && status == Status::Ok {
            status = Status::BufError;
        }
        (status, consumed, produced)
    }

    fn fail(&mut self, msg: &'static str) {
        debug!("inflate64: {}", msg);
        self.msg = Some(msg);
        self.mode = Mode::Bad;
    }

    fn entries(&self, table: Table) -> &[Entry] {
        match table.source {
            TableSource::Fixed => &fixed_tables().entries[table.start..],
            TableSource::Dynamic => &self.codes[table.start..],
        }
    }

    /// Drives the state machine until the stream ends, fails, or a buffer
    /// runs dry.
    fn run(
        &mut self,
        bits: &mut BitReader<'_>,
        out: &mut Output<'_>,
        flush: Flush,
    ) -> Result<Status, Suspend> {
        // A call that starts on a block boundary reads the next header
        // instead of stopping there again.
        let mut at_entry = self.mode == Mode::Type;
        loop {
            match self.mode {
                Mode::Type => {
                    if !at_entry && matches!(flush, Flush::Block | Flush::Trees) {
                        return Err(Suspend);
                    }
                    at_entry = false;
                    self.block_header(bits, flush)?;
                }
                Mode::Stored => {
                    self.stored_header(bits)?;
                    if self.mode == Mode::CopyFirst && flush == Flush::Trees {
                        return Err(Suspend);
                    }
                }
                Mode::CopyFirst => self.mode = Mode::Copy,
                Mode::Copy => {
                    if self.length == 0 {
                        trace!("inflate64: stored end");
                        self.mode = Mode::Type;
                        continue;
                    }
                    let copy = min(self.length, min(bits.available(), out.remaining()));
                    if copy == 0 {
                        return Err(Suspend);
                    }
                    out.write(bits.take_bytes(copy));
                    self.length -= copy;
                }
                Mode::Table => self.table_sizes(bits)?,
                Mode::LenLens => self.code_length_lens(bits)?,
                Mode::CodeLens => {
                    self.code_lens(bits)?;
                    if self.mode == Mode::LenFirst && flush == Flush::Trees {
                        return Err(Suspend);
                    }
                }
                Mode::LenFirst => self.mode = Mode::Len,
                Mode::Len => {
                    let here = decode_symbol(bits, self.entries(self.lencode), self.lencode.bits)?;
                    self.length = here.value as usize;
                    match here.op {
                        Operation::Literal => self.mode = Mode::Lit,
                        Operation::EndOfBlock => {
                            trace!("inflate64: end of block");
                            self.mode = Mode::Type;
                        }
                        Operation::Length => {
                            self.extra = here.extra_bits as u32;
                            self.mode = Mode::LenExt;
                        }
                        _ => self.fail("invalid literal/length code"),
                    }
                }
                Mode::LenExt => {
                    if self.extra > 0 {
                        bits.need_bits(self.extra)?;
                        self.length += bits.peek(self.extra) as usize;
                        bits.drop_bits(self.extra);
                    }
                    trace!("inflate64: length {}", self.length);
                    self.mode = Mode::Dist;
                }
                Mode::Dist => {
                    let here =
                        decode_symbol(bits, self.entries(self.distcode), self.distcode.bits)?;
                    if here.op != Operation::Distance {
                        self.fail("invalid distance code");
                        continue;
                    }
                    self.offset = here.value as usize;
                    self.extra = here.extra_bits as u32;
                    self.mode = Mode::DistExt;
                }
                Mode::DistExt => {
                    if self.extra > 0 {
                        bits.need_bits(self.extra)?;
                        self.offset += bits.peek(self.extra) as usize;
                        bits.drop_bits(self.extra);
                    }
                    if self.offset > self.dmax {
                        self.fail("invalid distance too far back");
                        continue;
                    }
                    trace!("inflate64: distance {}", self.offset);
                    self.mode = Mode::Match;
                }
                Mode::Match => {
                    if out.remaining() == 0 {
                        return Err(Suspend);
                    }
                    match self.window.copy_match(self.offset, self.length, out) {
                        Ok(copied) => {
                            self.length -= copied;
                            if self.length == 0 {
                                self.mode = Mode::Len;
                            }
                        }
                        Err(TooFarBack) => self.fail("invalid distance too far back"),
                    }
                }
                Mode::Lit => {
                    if out.remaining() == 0 {
                        return Err(Suspend);
                    }
                    out.push(self.length as u8);
                    self.mode = Mode::Len;
                }
                Mode::Done => return Ok(Status::StreamEnd),
                Mode::Bad => return Ok(Status::DataError),
                Mode::Mem => return Ok(Status::MemError),
            }
        }
    }

    fn block_header(&mut self, bits: &mut BitReader<'_>, flush: Flush) -> Result<(), Suspend> {
        if self.last {
            bits.align_to_byte();
            self.mode = Mode::Done;
            return Ok(());
        }
        bits.need_bits(3)?;
        self.last = bits.peek(1) == 1;
        bits.drop_bits(1);
        let block_type = bits.peek(2);
        bits.drop_bits(2);
        let last = if self.last { " (last)" } else { "" };
        match block_type {
            DEFLATE_BLOCKTYPE_UNCOMPRESSED => {
                debug!("inflate64: stored block{}", last);
                self.mode = Mode::Stored;
            }
            DEFLATE_BLOCKTYPE_STATIC_HUFFMAN => {
                debug!("inflate64: fixed codes block{}", last);
                let fixed = fixed_tables();
                self.lencode = fixed.litlen;
                self.distcode = fixed.offset;
                self.mode = Mode::LenFirst;
                if flush == Flush::Trees {
                    return Err(Suspend);
                }
            }
            DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN => {
                debug!("inflate64: dynamic codes block{}", last);
                self.mode = Mode::Table;
            }
            _ => self.fail("invalid block type"),
        }
        Ok(())
    }

    fn stored_header(&mut self, bits: &mut BitReader<'_>) -> Result<(), Suspend> {
        bits.align_to_byte();
        bits.need_bits(32)?;
        let word = bits.peek(32);
        if word & 0xFFFF != (word >> 16) ^ 0xFFFF {
            self.fail("invalid stored block lengths");
            return Ok(());
        }
        self.length = (word & 0xFFFF) as usize;
        trace!("inflate64: stored length {}", self.length);
        bits.clear();
        self.mode = Mode::CopyFirst;
        Ok(())
    }

    fn table_sizes(&mut self, bits: &mut BitReader<'_>) -> Result<(), Suspend> {
        bits.need_bits(14)?;
        self.nlen = bits.peek(5) as usize + 257;
        bits.drop_bits(5);
        self.ndist = bits.peek(5) as usize + 1;
        bits.drop_bits(5);
        self.ncode = bits.peek(4) as usize + 4;
        bits.drop_bits(4);
        if self.nlen > DEFLATE64_MAX_LITLEN_SYMS {
            self.fail("too many length or distance symbols");
            return Ok(());
        }
        trace!("inflate64: table sizes ok");
        self.have = 0;
        self.mode = Mode::LenLens;
        Ok(())
    }

    fn code_length_lens(&mut self, bits: &mut BitReader<'_>) -> Result<(), Suspend> {
        while self.have < self.ncode {
            bits.need_bits(3)?;
            self.lens[PRECODE_LENS_PERMUTATION[self.have]] = bits.peek(3) as u16;
            bits.drop_bits(3);
            self.have += 1;
        }
        while self.have < DEFLATE_NUM_PRECODE_SYMS {
            self.lens[PRECODE_LENS_PERMUTATION[self.have]] = 0;
            self.have += 1;
        }
        match build_decode_table(
            CodeKind::CodeLengths,
            &self.lens[..DEFLATE_NUM_PRECODE_SYMS],
            &mut self.codes[..],
            PRECODE_TABLEBITS,
        ) {
            Ok(built) => {
                self.lencode = Table::dynamic(0, built.bits);
                trace!("inflate64: code lengths ok");
                self.have = 0;
                self.mode = Mode::CodeLens;
            }
            Err(InvalidCodeSet) => self.fail("invalid code lengths set"),
        }
        Ok(())
    }

    fn code_lens(&mut self, bits: &mut BitReader<'_>) -> Result<(), Suspend> {
        let total = self.nlen + self.ndist;
        while self.have < total {
            let table = &self.codes[self.lencode.start..];
            let here = loop {
                let here = table[bits.peek(self.lencode.bits) as usize];
                if here.code_bits as u32 <= bits.bits() {
                    break here;
                }
                bits.pull_byte()?;
            };
            let here_bits = here.code_bits as u32;

            if here.value < 16 {
                bits.drop_bits(here_bits);
                self.lens[self.have] = here.value;
                self.have += 1;
                continue;
            }

            let (len, repeat) = match here.value {
                16 => {
                    bits.need_bits(here_bits + 2)?;
                    bits.drop_bits(here_bits);
                    if self.have == 0 {
                        self.fail("invalid bit length repeat");
                        return Ok(());
                    }
                    let repeat = 3 + bits.peek(2) as usize;
                    bits.drop_bits(2);
                    (self.lens[self.have - 1], repeat)
                }
                17 => {
                    bits.need_bits(here_bits + 3)?;
                    bits.drop_bits(here_bits);
                    let repeat = 3 + bits.peek(3) as usize;
                    bits.drop_bits(3);
                    (0, repeat)
                }
                _ => {
                    bits.need_bits(here_bits + 7)?;
                    bits.drop_bits(here_bits);
                    let repeat = 11 + bits.peek(7) as usize;
                    bits.drop_bits(7);
                    (0, repeat)
                }
            };
            if self.have + repeat > total {
                self.fail("invalid bit length repeat");
                return Ok(());
            }
            self.lens[self.have..self.have + repeat].fill(len);
            self.have += repeat;
        }

        if self.lens[DEFLATE_END_OF_BLOCK] == 0 {
            self.fail("invalid code -- missing end-of-block");
            return Ok(());
        }

        let litlen = match build_decode_table(
            CodeKind::Lengths,
            &self.lens[..self.nlen],
            &mut self.codes[..LITLEN_ENOUGH],
            LITLEN_TABLEBITS,
        ) {
            Ok(built) => built,
            Err(InvalidCodeSet) => {
                self.fail("invalid literal/lengths set");
                return Ok(());
            }
        };
        self.lencode = Table::dynamic(0, litlen.bits);

        let offset = match build_decode_table(
            CodeKind::Distances,
            &self.lens[self.nlen..total],
            &mut self.codes[litlen.used..litlen.used + OFFSET_ENOUGH],
            OFFSET_TABLEBITS,
        ) {
            Ok(built) => built,
            Err(InvalidCodeSet) => {
                self.fail("invalid distances set");
                return Ok(());
            }
        };
        self.distcode = Table::dynamic(litlen.used, offset.bits);
        trace!("inflate64: codes ok");
        self.mode = Mode::LenFirst;
        Ok(())
    }
}

/// Decodes one symbol, following a sub-table link if needed. Bits are only
/// dropped once the whole code is buffered.
fn decode_symbol(bits: &mut BitReader<'_>, table: &[Entry], root_bits: u32) -> Result<Entry, Suspend> {
    let mut here = loop {
        let here = table[bits.peek(root_bits) as usize];
        if here.code_bits as u32 <= bits.bits() {
            break here;
        }
        bits.pull_byte()?;
    };
    if here.op == Operation::SubTableLink {
        let link = here;
        let root = link.code_bits as u32;
        let width = root + link.extra_bits as u32;
        here = loop {
            let idx = link.value as usize + (bits.peek(width) >> root) as usize;
            let here = table[idx];
            if root + here.code_bits as u32 <= bits.bits() {
                break here;
            }
            bits.pull_byte()?;
        };
        bits.drop_bits(root);
    }
    bits.drop_bits(here.code_bits as u32);
    Ok(here)
}
