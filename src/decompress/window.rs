//! Circular history of the most recent output, and the output cursor that
//! matches are copied into.

use std::collections::TryReserveError;

/// Write cursor over the caller's output slice for one call.
pub(crate) struct Output<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Output<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes produced so far in this call.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.buf[self.pos] = byte;
        self.pos += 1;
    }

    #[inline]
    pub fn write(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }
}

/// A back-reference reached past the start of the available history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TooFarBack;

pub(crate) struct Window {
    buf: Vec<u8>,
    bits: u32,
    /// Capacity in use, zero until the first update.
    size: usize,
    have: usize,
    next: usize,
}

impl Window {
    pub fn new(bits: u32) -> Self {
        Self {
            buf: Vec::new(),
            bits,
            size: 0,
            have: 0,
            next: 0,
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Changes the window size, releasing the buffer if the size differs.
    pub fn set_bits(&mut self, bits: u32) {
        if !self.buf.is_empty() && self.bits != bits {
            self.release();
        }
        self.bits = bits;
    }

    /// Forgets the history but keeps the allocation.
    pub fn reset(&mut self) {
        self.size = 0;
        self.have = 0;
        self.next = 0;
    }

    pub fn release(&mut self) {
        self.buf = Vec::new();
        self.reset();
    }

    #[inline]
    pub fn in_use(&self) -> bool {
        self.size != 0
    }

    #[inline]
    pub fn have(&self) -> usize {
        self.have
    }

    #[inline]
    pub fn next(&self) -> usize {
        self.next
    }

    pub fn is_allocated(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Appends the bytes produced by a call, allocating the buffer on first
    /// use. Only the last `capacity` bytes of `produced` are kept.
    pub fn update(&mut self, produced: &[u8]) -> Result<(), TryReserveError> {
        if self.buf.is_empty() {
            let capacity = 1usize << self.bits;
            let mut buf = Vec::new();
            buf.try_reserve_exact(capacity)?;
            buf.resize(capacity, 0);
            self.buf = buf;
            log::debug!("allocated {} byte window", capacity);
        }

        if self.size == 0 {
            self.size = 1 << self.bits;
            self.next = 0;
            self.have = 0;
        }

        let copy = produced.len();
        if copy >= self.size {
            self.buf[..self.size].copy_from_slice(&produced[copy - self.size..]);
            self.next = 0;
            self.have = self.size;
            return Ok(());
        }

        let dist = (self.size - self.next).min(copy);
        self.buf[self.next..self.next + dist].copy_from_slice(&produced[..dist]);
        let rest = copy - dist;
        if rest > 0 {
            self.buf[..rest].copy_from_slice(&produced[dist..]);
            self.next = rest;
            self.have = self.size;
        } else {
            self.next += dist;
            if self.next == self.size {
                self.next = 0;
            }
            self.have = (self.have + dist).min(self.size);
        }
        Ok(())
    }

    /// Contiguous history starting `back` bytes before the newest byte, up
    /// to the end of that run.
    fn history(&self, back: usize) -> Option<&[u8]> {
        if back > self.have {
            return None;
        }
        if back > self.next {
            let start = self.size - (back - self.next);
            Some(&self.buf[start..self.size])
        } else {
            Some(&self.buf[self.next - back..self.next])
        }
    }

    /// Copies up to `length` bytes of a match at `distance` into `out`,
    /// bounded by the space left. Distances reaching before this call's
    /// output read from the history; shorter ones read the bytes already
    /// written in this call, overlapping byte by byte when
    /// `distance < length`. Returns the number of bytes copied.
    pub fn copy_match(
        &self,
        distance: usize,
        length: usize,
        out: &mut Output<'_>,
    ) -> Result<usize, TooFarBack> {
        let produced = out.pos;
        let n;
        if distance > produced {
            let src = self.history(distance - produced).ok_or(TooFarBack)?;
            n = src.len().min(length).min(out.remaining());
            out.buf[produced..produced + n].copy_from_slice(&src[..n]);
        } else {
            n = length.min(out.remaining());
            let from = produced - distance;
            if distance >= n {
                out.buf.copy_within(from..from + n, produced);
            } else {
                for i in 0..n {
                    out.buf[produced + i] = out.buf[from + i];
                }
            }
        }
        out.pos += n;
        Ok(n)
    }
}
