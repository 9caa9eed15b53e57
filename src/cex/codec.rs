// SPDX-License-Identifier: Apache-2.0

//! Compact byte storage for sorted patterns.
//!
//! Each pattern is written as its element count, then its first literal, then
//! the (strictly positive) difference between each literal and its
//! predecessor. Every number is an unsigned base-128 varint: low 7 bits
//! first, high bit set on every byte but the last (the same scheme binary
//! AIGER uses for its AND deltas).

use crate::cex::error::{CexError, CexResult};
use crate::cex::pattern::{PatLit, check_pattern_sorted};

pub fn encode_u32_varint(mut x: u32, out: &mut Vec<u8>) {
    while x & !0x7f != 0 {
        out.push(((x & 0x7f) as u8) | 0x80);
        x >>= 7;
    }
    out.push((x & 0x7f) as u8);
}

pub fn decode_u32_varint(src: &[u8], cursor: &mut usize) -> CexResult<u32> {
    let start = *cursor;
    let mut shift = 0u32;
    let mut acc = 0u32;
    loop {
        if *cursor >= src.len() {
            return Err(CexError::DecodeUnderrun {
                offset: *cursor,
                len: src.len(),
            });
        }
        let byte = src[*cursor];
        *cursor += 1;
        let group = (byte & 0x7f) as u32;
        if shift == 28 && group > 0x0f {
            return Err(CexError::MalformedStore {
                offset: start,
                reason: "varint does not fit 32 bits".to_string(),
            });
        }
        acc |= group << shift;
        if byte & 0x80 == 0 {
            return Ok(acc);
        }
        shift += 7;
        if shift > 28 {
            return Err(CexError::MalformedStore {
                offset: start,
                reason: "varint longer than 5 bytes".to_string(),
            });
        }
    }
}

/// Append-only sequence of encoded patterns plus a read cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternStore {
    storage: Vec<u8>,
    cursor: usize,
}

impl PatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte length of everything stored so far.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.storage
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the read cursor; `cursor` may equal the store length but not
    /// exceed it.
    pub fn set_cursor(&mut self, cursor: usize) -> CexResult<()> {
        if cursor > self.storage.len() {
            return Err(CexError::precondition(format!(
                "cursor {} is past the end ({} bytes)",
                cursor,
                self.storage.len()
            )));
        }
        self.cursor = cursor;
        Ok(())
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn has_more(&self) -> bool {
        self.cursor < self.storage.len()
    }

    /// Drops all stored patterns.
    pub fn clear(&mut self) {
        self.storage.clear();
        self.cursor = 0;
    }

    /// Appends `pattern`, which must be non-empty and strictly increasing.
    /// Nothing is written when the pattern is rejected.
    pub fn store(&mut self, pattern: &[PatLit]) -> CexResult<()> {
        check_pattern_sorted(pattern)?;
        let count = u32::try_from(pattern.len()).map_err(|_| {
            CexError::precondition(format!("pattern of {} literals is too long", pattern.len()))
        })?;
        encode_u32_varint(count, &mut self.storage);
        let mut prev = pattern[0].raw();
        encode_u32_varint(prev, &mut self.storage);
        for lit in &pattern[1..] {
            encode_u32_varint(lit.raw() - prev, &mut self.storage);
            prev = lit.raw();
        }
        Ok(())
    }

    /// Decodes the pattern at the cursor into `out` (cleared first) and
    /// advances the cursor past it.
    pub fn restore(&mut self, out: &mut Vec<PatLit>) -> CexResult<()> {
        decode_pattern(&self.storage, &mut self.cursor, out)
    }

    /// Decodes every pattern from the start without disturbing the cursor.
    pub fn restore_all(&self) -> CexResult<Vec<Vec<PatLit>>> {
        let mut cursor = 0;
        let mut patterns = Vec::new();
        while cursor < self.storage.len() {
            let mut pattern = Vec::new();
            decode_pattern(&self.storage, &mut cursor, &mut pattern)?;
            patterns.push(pattern);
        }
        Ok(patterns)
    }
}

fn decode_pattern(src: &[u8], cursor: &mut usize, out: &mut Vec<PatLit>) -> CexResult<()> {
    out.clear();
    let start = *cursor;
    let count = decode_u32_varint(src, cursor)?;
    if count == 0 {
        return Err(CexError::MalformedStore {
            offset: start,
            reason: "pattern with zero literals".to_string(),
        });
    }
    let mut value = decode_u32_varint(src, cursor)?;
    out.push(PatLit::from_raw(value));
    for _ in 1..count {
        let delta_offset = *cursor;
        let delta = decode_u32_varint(src, cursor)?;
        if delta == 0 {
            return Err(CexError::MalformedStore {
                offset: delta_offset,
                reason: "zero delta between literals".to_string(),
            });
        }
        value = value
            .checked_add(delta)
            .ok_or_else(|| CexError::MalformedStore {
                offset: delta_offset,
                reason: "literal overflows 32 bits".to_string(),
            })?;
        out.push(PatLit::from_raw(value));
    }
    debug_assert_eq!(out.len(), count as usize);
    Ok(())
}
