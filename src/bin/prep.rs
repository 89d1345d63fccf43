use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use bci2a_prep::{process_subject, DatasetConfig, OutputFormat, TrialWindow, ZeroVariance};

#[derive(Parser)]
#[command(name = "prep", about = "BCI Competition IV-2a → standardized per-subject tensors")]
struct Args {
    /// Dataset root containing s1/ … s9/ with A0nT.mat and A0nE.mat
    #[arg(long)]
    data_path: PathBuf,

    /// Directory for data_all_<n>.pkl
    #[arg(long, default_value = "data")]
    out_dir: PathBuf,

    /// Subjects to process (comma-separated; default: 1..=9)
    #[arg(long, value_delimiter = ',', default_values_t = [1, 2, 3, 4, 5, 6, 7, 8, 9])]
    subjects: Vec<u32>,

    /// Width of the one-hot labels
    #[arg(long, default_value_t = 4)]
    n_classes: usize,

    /// Skip per-channel standardization
    #[arg(long)]
    no_standardize: bool,

    /// Keep trials in file order
    #[arg(long)]
    no_shuffle: bool,

    /// Shuffle seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Drop trials flagged as artifacts
    #[arg(long)]
    drop_artifacts: bool,

    /// Zero-variance channel policy: unit | error
    #[arg(long, default_value_t = ZeroVariance::Unit)]
    zero_variance: ZeroVariance,

    /// Artifact format: pkl | safetensors
    #[arg(long, default_value_t = OutputFormat::Pickle)]
    format: OutputFormat,

    /// Log a failing subject and continue instead of stopping
    #[arg(long)]
    keep_going: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = DatasetConfig {
        data_path: args.data_path,
        n_classes: args.n_classes,
        standardize: !args.no_standardize,
        shuffle: !args.no_shuffle,
        seed: args.seed,
        keep_artifacts: !args.drop_artifacts,
        zero_variance: args.zero_variance,
        window: TrialWindow::default(),
    };
    log::info!(
        "{} subjects from {} → {} ({})",
        args.subjects.len(),
        cfg.data_path.display(),
        args.out_dir.display(),
        args.format
    );

    let mut failed = Vec::new();
    for &subject in &args.subjects {
        match process_subject(&cfg, subject, &args.out_dir, args.format) {
            Ok(path) => log::info!("subject {subject} done → {}", path.display()),
            Err(e) if args.keep_going => {
                log::error!("subject {subject} failed: {e:#}");
                failed.push(subject);
            }
            Err(e) => return Err(e.context(format!("subject {subject}"))),
        }
    }

    if !failed.is_empty() {
        bail!("{} subject(s) failed: {failed:?}", failed.len());
    }
    Ok(())
}
