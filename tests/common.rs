/// Shared helpers: synthetic MAT v5 session files laid out like the
/// BCI Competition IV-2a release.
use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use ndarray::Array2;

const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;

const MX_CELL: u8 = 1;
const MX_STRUCT: u8 = 2;
const MX_CHAR: u8 = 4;
const MX_DOUBLE: u8 = 6;
const MX_UINT8: u8 = 9;

pub const N_SIGNAL_CHANNELS: usize = 25;
pub const WINDOW: usize = 1750;

// ── Element builders ──────────────────────────────────────────────────────

#[allow(unused)]
pub fn element(dtype: u32, payload: &[u8]) -> Vec<u8> {
    let mut b = Vec::with_capacity(8 + payload.len() + 7);
    b.extend_from_slice(&dtype.to_le_bytes());
    b.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    b.extend_from_slice(payload);
    while b.len() % 8 != 0 {
        b.push(0);
    }
    b
}

#[allow(unused)]
/// Complete `miMATRIX` element: flags, dims, name, then `body`.
pub fn matrix(class: u8, dims: &[usize], name: &str, body: &[u8]) -> Vec<u8> {
    let mut p = Vec::new();
    let flags: Vec<u8> = [class as u32, 0u32].iter().flat_map(|v| v.to_le_bytes()).collect();
    p.extend(element(MI_UINT32, &flags));
    let dims: Vec<u8> = dims.iter().flat_map(|&d| (d as i32).to_le_bytes()).collect();
    p.extend(element(MI_INT32, &dims));
    p.extend(element(MI_INT8, name.as_bytes()));
    p.extend_from_slice(body);
    element(MI_MATRIX, &p)
}

#[allow(unused)]
/// Double array stored as `miDOUBLE`; `values` in column-major order.
pub fn double(name: &str, dims: &[usize], values: &[f64]) -> Vec<u8> {
    let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let body = if values.is_empty() { vec![] } else { element(MI_DOUBLE, &raw) };
    matrix(MX_DOUBLE, dims, name, &body)
}

#[allow(unused)]
/// Double-class array stored narrowed to `miUINT8`, as MATLAB does for
/// small non-negative integers.
pub fn double_as_u8(name: &str, values: &[u8]) -> Vec<u8> {
    let body = if values.is_empty() { vec![] } else { element(MI_UINT8, values) };
    matrix(MX_DOUBLE, &[values.len(), if values.is_empty() { 0 } else { 1 }], name, &body)
}

#[allow(unused)]
pub fn uint8(name: &str, values: &[u8]) -> Vec<u8> {
    let body = if values.is_empty() { vec![] } else { element(MI_UINT8, values) };
    matrix(MX_UINT8, &[values.len(), if values.is_empty() { 0 } else { 1 }], name, &body)
}

#[allow(unused)]
pub fn char_array(name: &str, text: &str) -> Vec<u8> {
    let raw: Vec<u8> = text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    matrix(MX_CHAR, &[1, text.encode_utf16().count()], name, &element(MI_UINT16, &raw))
}

#[allow(unused)]
pub fn cell(name: &str, dims: &[usize], elems: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = elems.iter().flatten().copied().collect();
    matrix(MX_CELL, dims, name, &body)
}

#[allow(unused)]
/// 1 × 1 struct with the given fields, in order.
pub fn structure(name: &str, fields: &[(&str, Vec<u8>)]) -> Vec<u8> {
    const FIELD_LEN: usize = 32;
    let mut body = element(MI_INT32, &(FIELD_LEN as i32).to_le_bytes());
    let mut names = vec![0u8; FIELD_LEN * fields.len()];
    for (i, (f, _)) in fields.iter().enumerate() {
        names[i * FIELD_LEN..i * FIELD_LEN + f.len()].copy_from_slice(f.as_bytes());
    }
    body.extend(element(MI_INT8, &names));
    for (_, v) in fields {
        body.extend_from_slice(v);
    }
    matrix(MX_STRUCT, &[1, 1], name, &body)
}

#[allow(unused)]
/// Wrap a top-level `miMATRIX` element in `miCOMPRESSED`.
pub fn compressed(matrix_el: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(matrix_el).unwrap();
    let z = enc.finish().unwrap();
    let mut b = Vec::new();
    b.extend_from_slice(&MI_COMPRESSED.to_le_bytes());
    b.extend_from_slice(&(z.len() as u32).to_le_bytes());
    b.extend_from_slice(&z);
    b
}

#[allow(unused)]
pub fn mat_file(elements: &[Vec<u8>]) -> Vec<u8> {
    let mut b = vec![b' '; 128];
    let text = b"MATLAB 5.0 MAT-file, Platform: GLNXA64, Created on: synthetic fixture";
    b[..text.len()].copy_from_slice(text);
    b[116..124].fill(0);
    b[124..126].copy_from_slice(&0x0100u16.to_le_bytes());
    b[126..128].copy_from_slice(b"IM");
    for e in elements {
        b.extend_from_slice(e);
    }
    b
}

// ── BCI IV-2a shaped fixtures ─────────────────────────────────────────────

/// One run as it appears in the file.
#[derive(Debug, Clone)]
pub struct FakeRun {
    /// `[samples, channels]`, the on-disk orientation.
    pub x: Array2<f64>,
    pub onsets: Vec<usize>,
    pub classes: Vec<u8>,
    pub artifacts: Vec<u8>,
}

#[allow(unused)]
/// Deterministic non-constant signal value.
pub fn signal_value(seed: f64, t: usize, c: usize) -> f64 {
    (c as f64 + 1.0) * ((t as f64) * 0.013 + seed + c as f64 * 0.7).sin() + c as f64 * 0.5
}

#[allow(unused)]
/// EOG calibration run: signal only, no trials.
pub fn eog_run(seed: f64) -> FakeRun {
    FakeRun {
        x: Array2::from_shape_fn((600, N_SIGNAL_CHANNELS), |(t, c)| signal_value(seed, t, c)),
        onsets: vec![],
        classes: vec![],
        artifacts: vec![],
    }
}

#[allow(unused)]
/// Run with `n` trials every 1750 samples from sample 100. Classes cycle
/// 1..=4; trials where `flag(i)` is true are marked as artifacts.
pub fn trial_run(seed: f64, n: usize, flag: impl Fn(usize) -> bool) -> FakeRun {
    let n_samples = 100 + n * WINDOW + 400;
    FakeRun {
        x: Array2::from_shape_fn((n_samples, N_SIGNAL_CHANNELS), |(t, c)| signal_value(seed, t, c)),
        onsets: (0..n).map(|i| 100 + i * WINDOW).collect(),
        classes: (0..n).map(|i| (i % 4) as u8 + 1).collect(),
        artifacts: (0..n).map(|i| flag(i) as u8).collect(),
    }
}

#[allow(unused)]
pub fn run_struct(run: &FakeRun) -> Vec<u8> {
    let (n_t, n_c) = run.x.dim();
    // Column-major [samples, channels] == row-major [channels, samples].
    let x_col_major: Vec<f64> = run.x.t().iter().copied().collect();
    let onsets: Vec<f64> = run.onsets.iter().map(|&o| o as f64).collect();
    let n = onsets.len();
    let list_dims = if n == 0 { [0, 0] } else { [n, 1] };
    let class_names: Vec<Vec<u8>> = ["left hand", "right hand", "feet", "tongue"]
        .iter()
        .map(|s| char_array("", s))
        .collect();

    structure("", &[
        ("X", double("", &[n_t, n_c], &x_col_major)),
        ("trial", double("", &list_dims, &onsets)),
        ("y", double_as_u8("", &run.classes)),
        ("fs", double("", &[1, 1], &[250.0])),
        ("classes", cell("", &[1, 4], &class_names)),
        ("artifacts", uint8("", &run.artifacts)),
        ("gender", char_array("", "f")),
        ("age", double("", &[1, 1], &[24.0])),
    ])
}

#[allow(unused)]
/// Whole session file: `data` = 1 × n cell of run structs.
pub fn session_bytes(runs: &[FakeRun], compress: bool) -> Vec<u8> {
    let structs: Vec<Vec<u8>> = runs.iter().map(run_struct).collect();
    let data = cell("data", &[1, runs.len()], &structs);
    let el = if compress { compressed(&data) } else { data };
    mat_file(&[el])
}

#[allow(unused)]
/// Standard layout: 3 EOG runs followed by the trial runs.
pub fn session_runs(seed: f64, trial_runs: usize, trials_per_run: usize) -> Vec<FakeRun> {
    let mut runs: Vec<FakeRun> = (0..3).map(|i| eog_run(seed + i as f64)).collect();
    for r in 0..trial_runs {
        runs.push(trial_run(seed + 10.0 * (r + 1) as f64, trials_per_run, |i| i % 5 == 3));
    }
    runs
}

#[allow(unused)]
/// Write `<dir>/s<n>/A0<n>T.mat` and `A0<n>E.mat`.
pub fn write_subject(dir: &Path, subject: u32, train: &[FakeRun], test: &[FakeRun], compress: bool) {
    let sdir = dir.join(format!("s{subject}"));
    std::fs::create_dir_all(&sdir).unwrap();
    std::fs::write(sdir.join(format!("A0{subject}T.mat")), session_bytes(train, compress)).unwrap();
    std::fs::write(sdir.join(format!("A0{subject}E.mat")), session_bytes(test, compress)).unwrap();
}

#[allow(unused)]
/// Population mean and std of channel `j` of a `[N, 1, C, T]` array.
pub fn channel_moments(x: &ndarray::Array4<f64>, j: usize) -> (f64, f64) {
    let ch = x.slice(ndarray::s![.., 0, j, ..]);
    let n = ch.len() as f64;
    let m = ch.iter().sum::<f64>() / n;
    let v = ch.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / n;
    (m, v.sqrt())
}
