//! Two-slot lookahead over a byte stream, cut into fixed-size units.
//!
//! A unit is final when it is short (including empty), or when the unit
//! after it is empty. Deciding that requires holding the next unit before
//! the current one is processed, so the pipeline keeps two buffers: the
//! current unit and the peeked one. The last-segment flag is therefore known
//! before a segment is sealed or opened.

use std::io::{self, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slots {
    /// Nothing read yet
    Empty,
    /// `peeked` holds the unit after `current`
    Peeked,
    /// `current` was the final unit
    Drained,
}

pub struct SegmentPipeline<R> {
    reader: R,
    unit_len: usize,
    current: Vec<u8>,
    peeked: Vec<u8>,
    slots: Slots,
}

impl<R: Read> SegmentPipeline<R> {
    pub fn new(reader: R, unit_len: usize) -> Self {
        Self {
            reader,
            unit_len,
            current: Vec::with_capacity(unit_len),
            peeked: Vec::with_capacity(unit_len),
            slots: Slots::Empty,
        }
    }

    /// Move to the next unit. Returns `Some(last)` for a fresh unit in
    /// [`SegmentPipeline::current_mut`], or `None` once the final unit was
    /// handed out.
    pub fn advance(&mut self) -> io::Result<Option<bool>> {
        match self.slots {
            Slots::Drained => return Ok(None),
            Slots::Empty => fill_unit(&mut self.reader, &mut self.current, self.unit_len)?,
            Slots::Peeked => std::mem::swap(&mut self.current, &mut self.peeked),
        }

        if self.current.len() < self.unit_len {
            self.slots = Slots::Drained;
            return Ok(Some(true));
        }

        fill_unit(&mut self.reader, &mut self.peeked, self.unit_len)?;
        if self.peeked.is_empty() {
            self.slots = Slots::Drained;
            Ok(Some(true))
        } else {
            self.slots = Slots::Peeked;
            Ok(Some(false))
        }
    }

    /// The unit produced by the last [`SegmentPipeline::advance`]. Callers may
    /// transform it in place; the buffer is recycled on the next advance.
    pub fn current_mut(&mut self) -> &mut Vec<u8> {
        &mut self.current
    }
}

/// Read until `buf` holds `unit_len` bytes or the reader is exhausted.
fn fill_unit<R: Read>(reader: &mut R, buf: &mut Vec<u8>, unit_len: usize) -> io::Result<()> {
    buf.clear();
    buf.resize(unit_len, 0);
    let mut filled = 0;
    while filled < unit_len {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    buf.truncate(filled);
    Ok(())
}
