//! MAT v5 data-element I/O.
//!
//! Every piece of a level 5 file after the header is a data element:
//!
//! ```text
//! regular:  ┌──────────────┬──────────────┬────────────────────────────┐
//!           │ type : u32   │ nbytes : u32 │ payload, padded to 8 bytes │
//!           └──────────────┴──────────────┴────────────────────────────┘
//! small:    ┌──────────────┬──────────────┬──────────────────┐
//!           │ nbytes : u16 │ type : u16   │ payload (≤ 4 B)  │   ← 8 bytes total
//!           └──────────────┴──────────────┴──────────────────┘
//! ```
//!
//! A tag is "small" when the upper 16 bits of its first word are non-zero.
//! Word order follows the file's endian indicator.
//! `miCOMPRESSED` payloads are not padded.
use anyhow::{bail, Result};

use super::constants::*;

// ── Byte order ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    #[inline]
    pub fn u16(self, b: &[u8]) -> u16 {
        let b = [b[0], b[1]];
        match self {
            Endian::Little => u16::from_le_bytes(b),
            Endian::Big => u16::from_be_bytes(b),
        }
    }

    #[inline]
    pub fn u32(self, b: &[u8]) -> u32 {
        let b = [b[0], b[1], b[2], b[3]];
        match self {
            Endian::Little => u32::from_le_bytes(b),
            Endian::Big => u32::from_be_bytes(b),
        }
    }

    #[inline]
    pub fn u64(self, b: &[u8]) -> u64 {
        let mut a = [0u8; 8];
        a.copy_from_slice(&b[..8]);
        match self {
            Endian::Little => u64::from_le_bytes(a),
            Endian::Big => u64::from_be_bytes(a),
        }
    }
}

// ── Element tag ───────────────────────────────────────────────────────────

/// Decoded tag of one data element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementTag {
    /// `mi*` data type.
    pub dtype: u32,
    /// Payload size in bytes (without padding).
    pub size: usize,
    /// Small data element format (payload packed into the tag).
    pub small: bool,
}

impl ElementTag {
    /// Bytes taken by the tag before the payload starts.
    #[inline]
    pub fn header_len(&self) -> usize {
        if self.small { 4 } else { 8 }
    }

    /// Bytes from the start of the tag to the start of the next element.
    pub fn total_len(&self) -> usize {
        if self.small {
            8
        } else if self.dtype == MI_COMPRESSED {
            8 + self.size
        } else {
            8 + padded(self.size)
        }
    }
}

#[inline]
fn padded(n: usize) -> usize {
    (n + 7) & !7
}

/// One element: its tag and a borrowed payload slice.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    pub tag: ElementTag,
    pub data: &'a [u8],
    /// Offset of the tag within the buffer it was read from.
    pub offset: usize,
}

// ── Sequential reader ─────────────────────────────────────────────────────

/// Walks a byte buffer element by element.
pub struct ElementReader<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> ElementReader<'a> {
    pub fn new(buf: &'a [u8], endian: Endian) -> Self {
        Self { buf, pos: 0, endian }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Read the tag at the current position without consuming it.
    pub fn peek_tag(&self) -> Result<ElementTag> {
        let rest = &self.buf[self.pos.min(self.buf.len())..];
        if rest.len() < 8 {
            bail!("truncated element tag @ {:#x} ({} bytes left)", self.pos, rest.len());
        }
        let first = self.endian.u32(&rest[0..4]);
        if first >> 16 != 0 {
            let size = (first >> 16) as usize;
            if size > 4 {
                bail!("small element @ {:#x} claims {size} bytes", self.pos);
            }
            Ok(ElementTag { dtype: first & 0xffff, size, small: true })
        } else {
            let size = self.endian.u32(&rest[4..8]) as usize;
            Ok(ElementTag { dtype: first, size, small: false })
        }
    }

    /// Consume one element and return its payload.
    pub fn next_element(&mut self) -> Result<Element<'a>> {
        let tag = self.peek_tag()?;
        let start = self.pos + tag.header_len();
        let end = start + tag.size;
        if end > self.buf.len() {
            bail!(
                "element type {} @ {:#x} needs {} bytes, buffer has {}",
                tag.dtype, self.pos, tag.size, self.buf.len() - start.min(self.buf.len())
            );
        }
        let el = Element { tag, data: &self.buf[start..end], offset: self.pos };
        // Trailing padding may be cut off at the very end of a decompressed stream.
        self.pos = (self.pos + tag.total_len()).min(self.buf.len());
        Ok(el)
    }

    /// Consume one element and require its type.
    pub fn expect(&mut self, dtype: u32, what: &str) -> Result<Element<'a>> {
        let el = self.next_element()?;
        if el.tag.dtype != dtype {
            bail!("{what}: expected element type {dtype}, got {} @ {:#x}", el.tag.dtype, el.offset);
        }
        Ok(el)
    }
}

// ── Payload decoders ──────────────────────────────────────────────────────

/// Width in bytes of a numeric `mi*` type.
pub fn numeric_width(dtype: u32) -> Option<usize> {
    match dtype {
        MI_INT8 | MI_UINT8 => Some(1),
        MI_INT16 | MI_UINT16 => Some(2),
        MI_INT32 | MI_UINT32 | MI_SINGLE => Some(4),
        MI_DOUBLE | MI_INT64 | MI_UINT64 => Some(8),
        _ => None,
    }
}

/// Decode a numeric payload of any stored type to `f64`.
///
/// MATLAB stores a `double` array in the narrowest integer type that holds
/// its values exactly, so the stored type rarely matches the array class.
pub fn decode_numeric(el: &Element, endian: Endian) -> Result<Vec<f64>> {
    let Some(w) = numeric_width(el.tag.dtype) else {
        bail!("element type {} @ {:#x} is not numeric", el.tag.dtype, el.offset);
    };
    if el.data.len() % w != 0 {
        bail!(
            "numeric element @ {:#x}: {} bytes is not a multiple of {w}",
            el.offset, el.data.len()
        );
    }
    let chunks = el.data.chunks_exact(w);
    let out: Vec<f64> = match el.tag.dtype {
        MI_INT8 => chunks.map(|b| b[0] as i8 as f64).collect(),
        MI_UINT8 => chunks.map(|b| b[0] as f64).collect(),
        MI_INT16 => chunks.map(|b| endian.u16(b) as i16 as f64).collect(),
        MI_UINT16 => chunks.map(|b| endian.u16(b) as f64).collect(),
        MI_INT32 => chunks.map(|b| endian.u32(b) as i32 as f64).collect(),
        MI_UINT32 => chunks.map(|b| endian.u32(b) as f64).collect(),
        MI_SINGLE => chunks.map(|b| f32::from_bits(endian.u32(b)) as f64).collect(),
        MI_DOUBLE => chunks.map(|b| f64::from_bits(endian.u64(b))).collect(),
        MI_INT64 => chunks.map(|b| endian.u64(b) as i64 as f64).collect(),
        MI_UINT64 => chunks.map(|b| endian.u64(b) as f64).collect(),
        _ => unreachable!("width checked above"),
    };
    Ok(out)
}

/// Decode an `miINT32` payload (dimensions, field-name length).
pub fn decode_i32s(el: &Element, endian: Endian) -> Result<Vec<i32>> {
    if el.tag.dtype != MI_INT32 {
        bail!("expected miINT32 @ {:#x}, got type {}", el.offset, el.tag.dtype);
    }
    if el.data.len() % 4 != 0 {
        bail!("miINT32 element @ {:#x} has {} bytes", el.offset, el.data.len());
    }
    Ok(el.data.chunks_exact(4).map(|b| endian.u32(b) as i32).collect())
}

/// Decode a NUL-terminated ASCII name (array names, struct field names).
pub fn decode_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
