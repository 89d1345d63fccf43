//! MAT-File level 5 constants.
//!
//! Names follow the MathWorks "MAT-File Format" reference.

// ── File header ───────────────────────────────────────────────────────────

/// Size of the fixed file header.
pub const HEADER_LEN: usize = 128;
/// Descriptive text occupies the first 116 header bytes.
pub const HEADER_TEXT_LEN: usize = 116;
/// Version field offset (2 bytes), followed by the endian indicator.
pub const HEADER_VERSION_OFFSET: usize = 124;
pub const HEADER_ENDIAN_OFFSET: usize = 126;
/// Level 5 version number.
pub const MAT_VERSION_5: u16 = 0x0100;

// ── Data element types (mi*) ──────────────────────────────────────────────

pub const MI_INT8: u32 = 1;
pub const MI_UINT8: u32 = 2;
pub const MI_INT16: u32 = 3;
pub const MI_UINT16: u32 = 4;
pub const MI_INT32: u32 = 5;
pub const MI_UINT32: u32 = 6;
pub const MI_SINGLE: u32 = 7;
pub const MI_DOUBLE: u32 = 9;
pub const MI_INT64: u32 = 12;
pub const MI_UINT64: u32 = 13;
pub const MI_MATRIX: u32 = 14;
pub const MI_COMPRESSED: u32 = 15;
pub const MI_UTF8: u32 = 16;
pub const MI_UTF16: u32 = 17;
pub const MI_UTF32: u32 = 18;

// ── Array classes (mx*) ───────────────────────────────────────────────────

pub const MX_CELL_CLASS: u8 = 1;
pub const MX_STRUCT_CLASS: u8 = 2;
pub const MX_OBJECT_CLASS: u8 = 3;
pub const MX_CHAR_CLASS: u8 = 4;
pub const MX_SPARSE_CLASS: u8 = 5;
pub const MX_DOUBLE_CLASS: u8 = 6;
pub const MX_SINGLE_CLASS: u8 = 7;
pub const MX_INT8_CLASS: u8 = 8;
pub const MX_UINT8_CLASS: u8 = 9;
pub const MX_INT16_CLASS: u8 = 10;
pub const MX_UINT16_CLASS: u8 = 11;
pub const MX_INT32_CLASS: u8 = 12;
pub const MX_UINT32_CLASS: u8 = 13;
pub const MX_INT64_CLASS: u8 = 14;
pub const MX_UINT64_CLASS: u8 = 15;
pub const MX_FUNCTION_CLASS: u8 = 16;
pub const MX_OPAQUE_CLASS: u8 = 17;

// ── Array flags (first word of the array-flags subelement) ────────────────

pub const FLAG_COMPLEX: u32 = 0x0800;
pub const FLAG_GLOBAL: u32 = 0x0400;
pub const FLAG_LOGICAL: u32 = 0x0200;
pub const CLASS_MASK: u32 = 0x00ff;
