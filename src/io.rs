//! Artifact writers.
//!
//! The default artifact is a pickle of the 4-tuple
//! `(x_train, x_test, y_train_onehot, y_test_onehot)`, each a NumPy
//! `float64` array, loadable with plain `pickle.load`. A safetensors file
//! with the same four tensors can be written instead.
//!
//! Files are written next to their final path and renamed into place, so a
//! failed run never leaves a truncated artifact behind.
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use ndarray::{ArrayBase, Data, Dimension};

use crate::dataset::SubjectData;

// ── Output format ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Pickle,
    Safetensors,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pickle => "pkl",
            OutputFormat::Safetensors => "safetensors",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pkl" | "pickle" => Ok(OutputFormat::Pickle),
            "safetensors" | "st" => Ok(OutputFormat::Safetensors),
            other => Err(format!("unknown output format {other:?} (pkl|safetensors)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// `<out_dir>/data_all_<subject>.<ext>`
pub fn artifact_path(out_dir: &Path, subject: u32, format: OutputFormat) -> PathBuf {
    out_dir.join(format!("data_all_{subject}.{}", format.extension()))
}

// ── Pickle (protocol 3) ───────────────────────────────────────────────────
//
// Arrays are encoded the way `ndarray.__reduce__` describes them:
//
//   numpy.core.multiarray._reconstruct(numpy.ndarray, (0,), b'b')
//     .__setstate__((1, shape, numpy.dtype('f8', False, True)
//                                .__setstate__((3, '<', None, None, None, -1, -1, 0)),
//                    False, <C-order little-endian bytes>))

const PROTO: u8 = 0x80;
const MARK: u8 = b'(';
const TUPLE: u8 = b't';
const TUPLE1: u8 = 0x85;
const TUPLE3: u8 = 0x87;
const EMPTY_TUPLE: u8 = b')';
const GLOBAL: u8 = b'c';
const REDUCE: u8 = b'R';
const BUILD: u8 = b'b';
const BININT: u8 = b'J';
const BININT1: u8 = b'K';
const LONG1: u8 = 0x8a;
const BINUNICODE: u8 = b'X';
const SHORT_BINBYTES: u8 = b'C';
const BINBYTES: u8 = b'B';
const NONE: u8 = b'N';
const NEWTRUE: u8 = 0x88;
const NEWFALSE: u8 = 0x89;
const STOP: u8 = b'.';

/// Minimal pickle encoder for tuples of NumPy `float64` arrays.
///
/// ```rust,no_run
/// use bci2a_prep::io::PickleWriter;
/// use ndarray::Array2;
///
/// let mut w = PickleWriter::new();
/// w.begin_tuple();
/// w.ndarray_f64(&Array2::<f64>::eye(4)).unwrap();
/// w.end_tuple();
/// std::fs::write("/tmp/eye.pkl", w.finish()).unwrap();
/// ```
pub struct PickleWriter {
    buf: Vec<u8>,
}

impl Default for PickleWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PickleWriter {
    pub fn new() -> Self {
        Self { buf: vec![PROTO, 3] }
    }

    pub fn begin_tuple(&mut self) {
        self.buf.push(MARK);
    }

    pub fn end_tuple(&mut self) {
        self.buf.push(TUPLE);
    }

    /// Append one array as a NumPy `<f8` ndarray.
    pub fn ndarray_f64<S, D>(&mut self, arr: &ArrayBase<S, D>) -> Result<()>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let raw: Vec<u8> = arr.iter().flat_map(|v| v.to_le_bytes()).collect();

        self.global("numpy.core.multiarray", "_reconstruct");
        self.global("numpy", "ndarray");
        self.int(0);
        self.buf.push(TUPLE1);
        self.bytes(b"b")?;
        self.buf.push(TUPLE3);
        self.buf.push(REDUCE);

        self.buf.push(MARK);
        self.int(1);
        self.shape(arr.shape());
        self.dtype_f8();
        self.buf.push(NEWFALSE);
        self.bytes(&raw)?;
        self.buf.push(TUPLE);
        self.buf.push(BUILD);
        Ok(())
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.buf.push(STOP);
        self.buf
    }

    fn global(&mut self, module: &str, name: &str) {
        self.buf.push(GLOBAL);
        self.buf.extend_from_slice(module.as_bytes());
        self.buf.push(b'\n');
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.push(b'\n');
    }

    fn int(&mut self, v: i64) {
        if (0..256).contains(&v) {
            self.buf.push(BININT1);
            self.buf.push(v as u8);
        } else if i32::try_from(v).is_ok() {
            self.buf.push(BININT);
            self.buf.extend_from_slice(&(v as i32).to_le_bytes());
        } else {
            self.buf.push(LONG1);
            self.buf.push(8);
            self.buf.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn unicode(&mut self, s: &str) {
        self.buf.push(BINUNICODE);
        self.buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn bytes(&mut self, b: &[u8]) -> Result<()> {
        if b.len() < 256 {
            self.buf.push(SHORT_BINBYTES);
            self.buf.push(b.len() as u8);
        } else if let Ok(n) = u32::try_from(b.len()) {
            self.buf.push(BINBYTES);
            self.buf.extend_from_slice(&n.to_le_bytes());
        } else {
            bail!("array payload of {} bytes exceeds the protocol-3 limit", b.len());
        }
        self.buf.extend_from_slice(b);
        Ok(())
    }

    fn shape(&mut self, shape: &[usize]) {
        if shape.is_empty() {
            self.buf.push(EMPTY_TUPLE);
            return;
        }
        self.buf.push(MARK);
        for &d in shape {
            self.int(d as i64);
        }
        self.buf.push(TUPLE);
    }

    fn dtype_f8(&mut self) {
        self.global("numpy", "dtype");
        self.unicode("f8");
        self.buf.push(NEWFALSE);
        self.buf.push(NEWTRUE);
        self.buf.push(TUPLE3);
        self.buf.push(REDUCE);

        self.buf.push(MARK);
        self.int(3);
        self.unicode("<");
        self.buf.extend_from_slice(&[NONE, NONE, NONE]);
        self.int(-1);
        self.int(-1);
        self.int(0);
        self.buf.push(TUPLE);
        self.buf.push(BUILD);
    }
}

/// Encode a subject's artifact tuple.
pub fn pickle_subject(data: &SubjectData) -> Result<Vec<u8>> {
    let mut w = PickleWriter::new();
    w.begin_tuple();
    w.ndarray_f64(&data.x_train)?;
    w.ndarray_f64(&data.x_test)?;
    w.ndarray_f64(&data.y_train_onehot)?;
    w.ndarray_f64(&data.y_test_onehot)?;
    w.end_tuple();
    Ok(w.finish())
}

// ── Safetensors ───────────────────────────────────────────────────────────

/// Safetensors writer for `F64` tensors with optional string metadata.
///
/// ```rust,no_run
/// use bci2a_prep::io::StWriter;
/// use ndarray::Array2;
/// use std::path::Path;
///
/// let mut w = StWriter::new();
/// w.add_f64("eye", &Array2::<f64>::eye(3));
/// w.metadata("subject", "1");
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, Vec<usize>)>,
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f64<S, D>(&mut self, name: &str, arr: &ArrayBase<S, D>)
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let bytes: Vec<u8> = arr.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, arr.shape().to_vec()));
    }

    pub fn metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), serde_json::Value::from(value));
    }

    /// Serialise header and payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut header_map = serde_json::Map::new();
        if !self.metadata.is_empty() {
            header_map.insert("__metadata__".into(), serde_json::Value::Object(self.metadata.clone()));
        }
        let mut offset: usize = 0;
        for (name, data, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": "F64",
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;

        let mut out = Vec::with_capacity(8 + hdr_bytes.len() + pad + offset);
        out.extend_from_slice(&((hdr_bytes.len() + pad) as u64).to_le_bytes());
        out.extend_from_slice(&hdr_bytes);
        out.extend(std::iter::repeat(b' ').take(pad));
        for (_, data, _) in &self.entries {
            out.extend_from_slice(data);
        }
        Ok(out)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_bytes()?)
    }
}

/// Encode a subject's tensors as safetensors.
pub fn safetensors_subject(data: &SubjectData) -> Result<Vec<u8>> {
    let mut w = StWriter::new();
    w.add_f64("x_train", &data.x_train);
    w.add_f64("x_test", &data.x_test);
    w.add_f64("y_train", &data.y_train_onehot);
    w.add_f64("y_test", &data.y_test_onehot);
    w.metadata("subject", &data.subject.to_string());
    w.metadata("standardized", &data.stats.is_some().to_string());
    w.to_bytes()
}

// ── Saving ────────────────────────────────────────────────────────────────

/// Write a subject's artifact to `path`, replacing any previous file.
pub fn save_subject(data: &SubjectData, path: &Path, format: OutputFormat) -> Result<()> {
    let bytes = match format {
        OutputFormat::Pickle => pickle_subject(data)?,
        OutputFormat::Safetensors => safetensors_subject(data)?,
    };
    write_atomic(path, &bytes)?;
    log::info!("subject {}: wrote {} ({} bytes)", data.subject, path.display(), bytes.len());
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
    f.write_all(bytes).with_context(|| format!("write {}", tmp.display()))?;
    f.sync_all()?;
    drop(f);
    std::fs::rename(&tmp, path)
        .with_context(|| format!("rename {} → {}", tmp.display(), path.display()))?;
    Ok(())
}
