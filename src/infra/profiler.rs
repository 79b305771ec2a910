// ============================================================
// Layer 6 — Step Profiler
// ============================================================
// Wall-clock timings of a run, written next to the metrics:
//
//   profile.csv      step,epoch,batch,millis
//                    one row per training step inside the
//                    profiled window (steps 500 to 520)
//   epoch_times.csv  epoch,seconds
//                    one row per epoch, validation included
//
// Steps are counted from 1 across the whole run, not per epoch.
// The trainer synchronises the device before a profiled step is
// stopped, so GPU work queued by the step is part of its time.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    time::Duration,
};

/// Training steps that get a row in profile.csv
pub const PROFILE_STEPS: RangeInclusive<usize> = 500..=520;

pub const TRACE_HEADER: &str = "step,epoch,batch,millis";
pub const EPOCH_HEADER: &str = "epoch,seconds";

pub struct StepProfiler {
    steps:       RangeInclusive<usize>,
    trace_path:  PathBuf,
    epochs_path: PathBuf,
}

impl StepProfiler {
    /// Creates both CSV files with their headers.
    pub fn new(dir: impl AsRef<Path>, steps: RangeInclusive<usize>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let trace_path = dir.join("profile.csv");
        let epochs_path = dir.join("epoch_times.csv");
        write_header(&trace_path, TRACE_HEADER)?;
        write_header(&epochs_path, EPOCH_HEADER)?;

        Ok(Self { steps, trace_path, epochs_path })
    }

    /// Whether `step` falls inside the profiled window
    pub fn wants(&self, step: usize) -> bool {
        self.steps.contains(&step)
    }

    /// Append a step timing; steps outside the window are ignored.
    pub fn record_step(&self, step: usize, epoch: usize, batch: usize, took: Duration) -> Result<()> {
        if !self.wants(step) {
            return Ok(());
        }
        append(
            &self.trace_path,
            format_args!("{},{},{},{:.3}", step, epoch, batch, took.as_secs_f64() * 1e3),
        )
    }

    pub fn record_epoch(&self, epoch: usize, took: Duration) -> Result<()> {
        append(&self.epochs_path, format_args!("{},{:.3}", epoch, took.as_secs_f64()))
    }

    pub fn trace_path(&self) -> &Path {
        &self.trace_path
    }

    pub fn epochs_path(&self) -> &Path {
        &self.epochs_path
    }
}

fn write_header(path: &Path, header: &str) -> Result<()> {
    fs::write(path, format!("{header}\n"))
        .with_context(|| format!("Cannot create '{}'", path.display()))
}

fn append(path: &Path, row: std::fmt::Arguments<'_>) -> Result<()> {
    let mut f = OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;
    writeln!(f, "{row}")?;
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("cifar-bench-profiler-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_default_window() {
        assert_eq!(*PROFILE_STEPS.start(), 500);
        assert_eq!(*PROFILE_STEPS.end(), 520);
    }

    #[test]
    fn test_only_window_steps_are_traced() {
        let dir = scratch("window");
        let profiler = StepProfiler::new(&dir, 2..=3).unwrap();

        for step in 1..=5 {
            profiler
                .record_step(step, 1, step, Duration::from_micros(1500))
                .unwrap();
        }

        let trace = fs::read_to_string(profiler.trace_path()).unwrap();
        let lines: Vec<&str> = trace.lines().collect();
        assert_eq!(lines, vec![TRACE_HEADER, "2,1,2,1.500", "3,1,3,1.500"]);
        assert!(!profiler.wants(4));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_epoch_times() {
        let dir = scratch("epochs");
        let profiler = StepProfiler::new(&dir, PROFILE_STEPS).unwrap();
        profiler.record_epoch(1, Duration::from_millis(2500)).unwrap();
        profiler.record_epoch(2, Duration::from_millis(1250)).unwrap();

        let csv = fs::read_to_string(profiler.epochs_path()).unwrap();
        assert_eq!(csv.lines().collect::<Vec<_>>(), vec![EPOCH_HEADER, "1,2.500", "2,1.250"]);

        fs::remove_dir_all(&dir).ok();
    }
}
