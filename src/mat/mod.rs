//! MAT-File level 5 reader.
//!
//! Reads the subset of the format the BCI Competition IV-2a release uses:
//! numeric, char, cell and struct arrays, optionally zlib-compressed.
//! HDF5-based v7.3 files, sparse matrices and objects are rejected.
//!
//! # Quick start
//! ```no_run
//! use bci2a_prep::mat::MatFile;
//!
//! let mat = MatFile::open("data/s1/A01T.mat").unwrap();
//! let runs = mat.get("data").and_then(|a| a.as_cell()).unwrap();
//! println!("{} runs", runs.cells.len());
//! ```
pub mod array;
pub mod constants;
pub mod element;

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::ZlibDecoder;

pub use array::{parse_matrix, CellArray, CharArray, MatArray, MatClass, NumericArray, StructArray};
pub use element::{Element, ElementReader, ElementTag, Endian};

use constants::*;

/// Header fields of a level 5 file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatHeader {
    /// Descriptive text, trailing spaces/NULs trimmed.
    pub text: String,
    pub version: u16,
    pub endian: Endian,
}

/// A fully decoded MAT file: top-level variables in file order.
#[derive(Debug, Clone)]
pub struct MatFile {
    pub header: MatHeader,
    pub variables: Vec<(String, MatArray)>,
}

impl MatFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Self::parse(&bytes).with_context(|| format!("parse {}", path.display()))
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let header = read_header(bytes)?;
        let endian = header.endian;
        let mut reader = ElementReader::new(&bytes[HEADER_LEN..], endian);
        let mut variables = Vec::new();

        while !reader.is_empty() {
            let el = reader.next_element()?;
            match el.tag.dtype {
                MI_MATRIX => variables.push(parse_matrix(el.data, endian)?),
                MI_COMPRESSED => {
                    let inflated = inflate(el.data)
                        .with_context(|| format!("compressed element @ {:#x}", HEADER_LEN + el.offset))?;
                    let mut inner = ElementReader::new(&inflated, endian);
                    let m = inner.expect(MI_MATRIX, "compressed variable")?;
                    variables.push(parse_matrix(m.data, endian)?);
                }
                other => {
                    log::debug!("skipping top-level element type {other} @ {:#x}", el.offset);
                }
            }
        }
        Ok(MatFile { header, variables })
    }

    /// First variable with the given name.
    pub fn get(&self, name: &str) -> Option<&MatArray> {
        self.variables.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|(n, _)| n.as_str())
    }
}

fn read_header(bytes: &[u8]) -> Result<MatHeader> {
    if bytes.len() < HEADER_LEN {
        bail!("file too small for a MAT header ({} bytes)", bytes.len());
    }
    let text = String::from_utf8_lossy(&bytes[..HEADER_TEXT_LEN])
        .trim_end_matches(|c: char| c == ' ' || c == '\0')
        .to_string();
    if text.starts_with("MATLAB 7.3") {
        bail!("MAT v7.3 (HDF5) files are not supported; re-save with -v7");
    }
    let endian = match &bytes[HEADER_ENDIAN_OFFSET..HEADER_LEN] {
        b"IM" => Endian::Little,
        b"MI" => Endian::Big,
        other => bail!("not a MAT v5 file (endian indicator {other:?})"),
    };
    let version = endian.u16(&bytes[HEADER_VERSION_OFFSET..HEADER_ENDIAN_OFFSET]);
    if version != MAT_VERSION_5 {
        log::warn!("unexpected MAT version {version:#06x}, reading as level 5");
    }
    Ok(MatHeader { text, version, endian })
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4);
    ZlibDecoder::new(data).read_to_end(&mut out).context("zlib inflate")?;
    Ok(out)
}
