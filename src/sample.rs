//! Sample batch-run data for trying out the pipeline.
//!
//! Layout written under `workdir`:
//!   models/<n>/stdin.csv    run inputs (name,value)
//!   models/<n>/results.csv  columns time,wave1,wave2,wave3

use crate::Result;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const RESULTS_FNAME: &str = "results.csv";
pub const INPUTS_FNAME: &str = "stdin.csv";
pub const CHANNELS: [&str; 4] = ["time", "wave1", "wave2", "wave3"];

const PERIODS: [f64; 3] = [1.0, 2.0, 3.0];
const NOISE_LEVEL: f64 = 0.05;

/// Write `n_folders` run directories and return them in order.
pub fn make_sample_data(workdir: &Path, n_folders: usize, seed: u64) -> Result<Vec<PathBuf>> {
    let models_dir = workdir.join("models");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut dirs = Vec::with_capacity(n_folders);

    for n in 0..n_folders {
        let subdir = models_dir.join(n.to_string());
        fs::create_dir_all(&subdir)
            .with_context(|| format!("create sample directory {}", subdir.display()))?;

        let n_samples: usize = rng.gen_range(40..50);
        let amplitudes: Vec<f64> = PERIODS.iter().map(|_| rng.gen_range(0.5..1.5)).collect();

        let mut inputs = csv::Writer::from_path(subdir.join(INPUTS_FNAME))?;
        inputs.write_record([String::from("n_samples"), n_samples.to_string()])?;
        for (i, p) in PERIODS.iter().enumerate() {
            inputs.write_record([format!("p{}", i), p.to_string()])?;
        }
        for (i, a) in amplitudes.iter().enumerate() {
            inputs.write_record([format!("a{}", i), a.to_string()])?;
        }
        inputs.flush()?;

        let mut results = csv::Writer::from_path(subdir.join(RESULTS_FNAME))?;
        results.write_record(CHANNELS)?;
        for k in 0..n_samples {
            let t = k as f64 / (n_samples - 1) as f64;
            let mut row = vec![t];
            for (p, a) in PERIODS.iter().zip(&amplitudes) {
                let noise = NOISE_LEVEL * rng.gen_range(-1.0..1.0);
                row.push(a * (t * 2.0 * PI / p).sin() + noise);
            }
            results.write_record(row.iter().map(|v| v.to_string()))?;
        }
        results.flush()?;

        dirs.push(subdir);
    }

    info!(dir = %models_dir.display(), count = n_folders, "wrote sample data");
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_data() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let dirs_a = make_sample_data(a.path(), 2, 7).unwrap();
        let dirs_b = make_sample_data(b.path(), 2, 7).unwrap();
        assert_eq!(dirs_a.len(), 2);
        for (x, y) in dirs_a.iter().zip(&dirs_b) {
            assert_eq!(
                fs::read_to_string(x.join(RESULTS_FNAME)).unwrap(),
                fs::read_to_string(y.join(RESULTS_FNAME)).unwrap()
            );
        }
        let text = fs::read_to_string(dirs_a[0].join(RESULTS_FNAME)).unwrap();
        assert!(text.starts_with("time,wave1,wave2,wave3"));
    }
}
