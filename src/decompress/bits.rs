//! LSB-first bit accumulator over the caller's input slice.

/// Returned when a call has to give control back to the caller: input ran
/// out, output is full, or the flush mode asked to stop here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Suspend;

/// Accumulator contents carried between calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct BitState {
    pub hold: u64,
    pub bits: u32,
}

pub(crate) struct BitReader<'a> {
    input: &'a [u8],
    pos: usize,
    hold: u64,
    bits: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(input: &'a [u8], state: BitState) -> Self {
        Self {
            input,
            pos: 0,
            hold: state.hold,
            bits: state.bits,
        }
    }

    pub fn state(&self) -> BitState {
        BitState {
            hold: self.hold,
            bits: self.bits,
        }
    }

    /// Input bytes pulled so far in this call.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Input bytes not yet pulled.
    #[inline]
    pub fn available(&self) -> usize {
        self.input.len() - self.pos
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Moves one input byte into the accumulator. A pulled byte stays pulled
    /// even if the caller then suspends.
    #[inline]
    pub fn pull_byte(&mut self) -> Result<(), Suspend> {
        let Some(&byte) = self.input.get(self.pos) else {
            return Err(Suspend);
        };
        self.pos += 1;
        self.hold |= (byte as u64) << self.bits;
        self.bits += 8;
        Ok(())
    }

    #[inline]
    pub fn need_bits(&mut self, n: u32) -> Result<(), Suspend> {
        while self.bits < n {
            self.pull_byte()?;
        }
        Ok(())
    }

    #[inline]
    pub fn peek(&self, n: u32) -> u32 {
        debug_assert!(n <= 32);
        (self.hold & ((1u64 << n) - 1)) as u32
    }

    #[inline]
    pub fn drop_bits(&mut self, n: u32) {
        debug_assert!(n <= self.bits);
        self.hold >>= n;
        self.bits -= n;
    }

    /// Discards the rest of a partially consumed byte.
    #[inline]
    pub fn align_to_byte(&mut self) {
        let skip = self.bits & 7;
        self.drop_bits(skip);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.hold = 0;
        self.bits = 0;
    }

    /// Takes up to `n` raw bytes straight from the input. The accumulator
    /// must be empty.
    pub fn take_bytes(&mut self, n: usize) -> &'a [u8] {
        debug_assert_eq!(self.bits, 0);
        let end = self.pos + n.min(self.available());
        let bytes = &self.input[self.pos..end];
        self.pos = end;
        bytes
    }
}
