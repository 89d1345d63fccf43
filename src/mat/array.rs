//! `miMATRIX` decoding into owned array values.
//!
//! Layout of an `miMATRIX` payload:
//!
//! ```text
//! array flags   miUINT32 × 2   class (low byte) | complex / global / logical bits
//! dimensions    miINT32 × nd
//! array name    miINT8
//! ── numeric ─   real part (any numeric mi* type) [+ imaginary part]
//! ── char ────   characters (miUINT16 / miUTF8 / ...)
//! ── cell ────   one miMATRIX per element, column-major
//! ── struct ──   field-name length (miINT32), field names (miINT8, NUL padded),
//!                then one miMATRIX per (element, field), element-major
//! ```
//!
//! Numeric data is kept column-major exactly as stored.
use anyhow::{bail, Context, Result};
use ndarray::{Array2, ShapeBuilder};

use super::constants::*;
use super::element::{decode_i32s, decode_name, decode_numeric, Endian, ElementReader};

// ── Array class ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatClass {
    Cell,
    Struct,
    Char,
    Double,
    Single,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl MatClass {
    pub fn from_code(code: u8) -> Result<Self> {
        Ok(match code {
            MX_CELL_CLASS => MatClass::Cell,
            MX_STRUCT_CLASS => MatClass::Struct,
            MX_CHAR_CLASS => MatClass::Char,
            MX_DOUBLE_CLASS => MatClass::Double,
            MX_SINGLE_CLASS => MatClass::Single,
            MX_INT8_CLASS => MatClass::Int8,
            MX_UINT8_CLASS => MatClass::UInt8,
            MX_INT16_CLASS => MatClass::Int16,
            MX_UINT16_CLASS => MatClass::UInt16,
            MX_INT32_CLASS => MatClass::Int32,
            MX_UINT32_CLASS => MatClass::UInt32,
            MX_INT64_CLASS => MatClass::Int64,
            MX_UINT64_CLASS => MatClass::UInt64,
            MX_OBJECT_CLASS => bail!("object arrays are not supported"),
            MX_SPARSE_CLASS => bail!("sparse arrays are not supported"),
            MX_FUNCTION_CLASS | MX_OPAQUE_CLASS => bail!("function handles / opaque classes are not supported"),
            other => bail!("unknown array class {other}"),
        })
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, MatClass::Cell | MatClass::Struct | MatClass::Char)
    }
}

// ── Array values ──────────────────────────────────────────────────────────

/// Real numeric array, widened to `f64`, column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    pub class: MatClass,
    pub dims: Vec<usize>,
    pub logical: bool,
    pub data: Vec<f64>,
}

impl NumericArray {
    pub fn empty() -> Self {
        Self { class: MatClass::Double, dims: vec![0, 0], logical: false, data: vec![] }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat values in storage order; for row or column vectors this is
    /// simply the vector.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// The single value of a 1 × 1 array.
    pub fn scalar(&self) -> Option<f64> {
        (self.data.len() == 1).then(|| self.data[0])
    }

    /// View a 2-D array as `[rows, cols]`.
    pub fn to_array2(&self) -> Result<Array2<f64>> {
        let &[rows, cols] = self.dims.as_slice() else {
            bail!("expected a 2-D array, got dims {:?}", self.dims);
        };
        Array2::from_shape_vec((rows, cols).f(), self.data.clone())
            .with_context(|| format!("array data does not match dims {:?}", self.dims))
    }
}

/// Character array. Multi-row arrays are joined with `\n`.
#[derive(Debug, Clone, PartialEq)]
pub struct CharArray {
    pub dims: Vec<usize>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellArray {
    pub dims: Vec<usize>,
    /// Elements in column-major order.
    pub cells: Vec<MatArray>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructArray {
    pub dims: Vec<usize>,
    /// Field names in declaration order.
    pub field_names: Vec<String>,
    /// `elements[i][f]` is field `f` of element `i` (column-major `i`).
    pub elements: Vec<Vec<MatArray>>,
}

impl StructArray {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Field by declaration position.
    pub fn field_at(&self, elem: usize, field: usize) -> Option<&MatArray> {
        self.elements.get(elem)?.get(field)
    }

    /// Field by name.
    pub fn field(&self, elem: usize, name: &str) -> Option<&MatArray> {
        let idx = self.field_names.iter().position(|n| n == name)?;
        self.field_at(elem, idx)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatArray {
    Numeric(NumericArray),
    Char(CharArray),
    Cell(CellArray),
    Struct(StructArray),
}

impl MatArray {
    pub fn dims(&self) -> &[usize] {
        match self {
            MatArray::Numeric(a) => &a.dims,
            MatArray::Char(a) => &a.dims,
            MatArray::Cell(a) => &a.dims,
            MatArray::Struct(a) => &a.dims,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MatArray::Numeric(_) => "numeric",
            MatArray::Char(_) => "char",
            MatArray::Cell(_) => "cell",
            MatArray::Struct(_) => "struct",
        }
    }

    pub fn as_numeric(&self) -> Option<&NumericArray> {
        match self {
            MatArray::Numeric(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<&CharArray> {
        match self {
            MatArray::Char(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<&CellArray> {
        match self {
            MatArray::Cell(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructArray> {
        match self {
            MatArray::Struct(a) => Some(a),
            _ => None,
        }
    }
}

// ── Decoder ───────────────────────────────────────────────────────────────

/// Decode the payload of one `miMATRIX` element into `(name, value)`.
///
/// A zero-length payload is an empty `[]` (MATLAB writes those for empty
/// cell elements).
pub fn parse_matrix(payload: &[u8], endian: Endian) -> Result<(String, MatArray)> {
    if payload.is_empty() {
        return Ok((String::new(), MatArray::Numeric(NumericArray::empty())));
    }
    let mut r = ElementReader::new(payload, endian);

    let flags_el = r.expect(MI_UINT32, "array flags")?;
    if flags_el.data.len() < 8 {
        bail!("array flags element is {} bytes, expected 8", flags_el.data.len());
    }
    let flags = endian.u32(&flags_el.data[0..4]);
    let class = MatClass::from_code((flags & CLASS_MASK) as u8)?;

    let dims_el = r.next_element()?;
    let dims = decode_i32s(&dims_el, endian)?
        .into_iter()
        .map(|d| usize::try_from(d).context("negative dimension"))
        .collect::<Result<Vec<_>>>()?;
    let n = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .with_context(|| format!("dims {dims:?} overflow the element count"))?;

    let name_el = r.expect(MI_INT8, "array name")?;
    let name = decode_name(name_el.data);

    let value = match class {
        MatClass::Cell => {
            check_room(n, 1, payload.len() - r.position(), &name)?;
            let mut cells = Vec::with_capacity(n);
            for i in 0..n {
                let el = r.expect(MI_MATRIX, "cell element")?;
                let (_, v) = parse_matrix(el.data, endian)
                    .with_context(|| format!("cell {name:?}[{i}]"))?;
                cells.push(v);
            }
            MatArray::Cell(CellArray { dims, cells })
        }
        MatClass::Struct => {
            let len_el = r.next_element()?;
            let field_len = match decode_i32s(&len_el, endian)?.first() {
                Some(&l) if l > 0 => l as usize,
                _ => bail!("struct {name:?}: bad field-name length"),
            };
            let names_el = r.expect(MI_INT8, "field names")?;
            let field_names: Vec<String> =
                names_el.data.chunks(field_len).map(decode_name).collect();

            check_room(n, field_names.len(), payload.len() - r.position(), &name)?;
            let mut elements = Vec::with_capacity(n);
            for i in 0..n {
                let mut fields = Vec::with_capacity(field_names.len());
                for f in &field_names {
                    let el = r.expect(MI_MATRIX, "struct field")?;
                    let (_, v) = parse_matrix(el.data, endian)
                        .with_context(|| format!("struct {name:?}[{i}].{f}"))?;
                    fields.push(v);
                }
                elements.push(fields);
            }
            MatArray::Struct(StructArray { dims, field_names, elements })
        }
        MatClass::Char => {
            let text = if n == 0 || r.is_empty() {
                String::new()
            } else {
                decode_chars(&mut r, &dims, endian)?
            };
            MatArray::Char(CharArray { dims, text })
        }
        _ => {
            if flags & FLAG_COMPLEX != 0 {
                bail!("array {name:?}: complex data is not supported");
            }
            let data = if n == 0 && r.is_empty() {
                vec![]
            } else {
                let el = r.next_element()?;
                decode_numeric(&el, endian).with_context(|| format!("array {name:?}"))?
            };
            if data.len() != n {
                bail!("array {name:?}: {} values for dims {dims:?}", data.len());
            }
            MatArray::Numeric(NumericArray {
                class,
                dims,
                logical: flags & FLAG_LOGICAL != 0,
                data,
            })
        }
    };
    Ok((name, value))
}

/// Reject element counts the remaining payload cannot hold. Each of the
/// `fields` per element is an miMATRIX of at least one 8-byte tag; a
/// field-less struct element takes no bytes but is still bounded by the payload.
fn check_room(n: usize, fields: usize, remaining: usize, name: &str) -> Result<()> {
    let need = if fields == 0 {
        Some(n)
    } else {
        n.checked_mul(fields).and_then(|v| v.checked_mul(8))
    };
    match need {
        Some(need) if need <= remaining => Ok(()),
        _ => bail!("array {name:?}: {n} elements cannot fit in {remaining} bytes"),
    }
}

fn decode_chars(r: &mut ElementReader, dims: &[usize], endian: Endian) -> Result<String> {
    let el = r.next_element()?;
    let units: Vec<char> = match el.tag.dtype {
        MI_UINT16 | MI_UTF16 => {
            let codes: Vec<u16> = el.data.chunks_exact(2).map(|b| endian.u16(b)).collect();
            char::decode_utf16(codes)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        MI_UTF8 | MI_INT8 | MI_UINT8 => String::from_utf8_lossy(el.data).chars().collect(),
        other => bail!("unsupported character storage type {other}"),
    };

    // Column-major → rows.
    let rows = dims.first().copied().unwrap_or(1).max(1);
    if rows == 1 {
        return Ok(units.into_iter().collect());
    }
    let cols = units.len() / rows;
    let lines: Vec<String> = (0..rows)
        .map(|i| (0..cols).map(|j| units[j * rows + i]).collect())
        .collect();
    Ok(lines.join("\n"))
}
