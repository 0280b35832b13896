use std::path::Path;

use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

use crate::error::PipelineError;

/// Outcome of staging the training images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Images copied into the run.
    pub copied: usize,
    /// Images already present in the run.
    pub skipped: usize,
}

/// Create `dir` and its parents unless it already exists.
pub fn ensure_dir(dir: &Path) -> Result<(), PipelineError> {
    if dir.is_dir() {
        log::info!("Directory already exists: {}", dir.display());
    } else {
        log::info!("Creating directory: {}", dir.display());
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Fail with [`PipelineError::PreconditionFailed`] unless `path` is a file.
pub fn require_file(path: &Path) -> Result<(), PipelineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::PreconditionFailed(format!(
            "file does not exist: {}",
            path.display()
        )))
    }
}

/// Copy `src` to `dst` unless `dst` exists.
///
/// Returns whether the file was copied.
pub fn copy_if_missing(src: &Path, dst: &Path) -> Result<bool, PipelineError> {
    if dst.exists() {
        log::debug!("Skipped: {} (file already exists)", src.display());
        return Ok(false);
    }
    if !src.is_file() {
        return Err(PipelineError::PreconditionFailed(format!(
            "source image does not exist: {}",
            src.display()
        )));
    }
    std::fs::copy(src, dst)?;
    log::debug!("Copied: {} -> {}", src.display(), dst.display());
    Ok(true)
}

/// Copy the named images from `src_dir` into `dst_dir` on `workers` threads.
///
/// Images already present in `dst_dir` are left untouched. Returns once every
/// copy has finished; the first failure is reported.
pub fn copy_training_images<S: AsRef<str> + Sync>(
    names: &[S],
    src_dir: &Path,
    dst_dir: &Path,
    workers: usize,
) -> Result<CopyReport, PipelineError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()?;

    let pb = indicatif::ProgressBar::new(names.len() as u64);
    let style = indicatif::ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} {msg}")
        .map(|style| style.progress_chars("##>-"))
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar());
    pb.set_style(style);

    let copied = pool.install(|| {
        names
            .par_iter()
            .progress_with(pb)
            .map(|name| {
                let name = name.as_ref();
                copy_if_missing(&src_dir.join(name), &dst_dir.join(name))
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    let report = CopyReport {
        copied: copied.iter().filter(|c| **c).count(),
        skipped: copied.iter().filter(|c| !**c).count(),
    };
    log::info!(
        "staged {} training images ({} copied, {} already present)",
        names.len(),
        report.copied,
        report.skipped
    );
    Ok(report)
}

/// Fail unless at least `required_gb` GB are free on the volume of `path`.
pub fn check_free_space(path: &Path, required_gb: u64) -> Result<(), PipelineError> {
    let available_gb = fs2::available_space(path)? >> 30;
    log::debug!("{available_gb} GB available at {}", path.display());
    if available_gb < required_gb {
        return Err(PipelineError::InsufficientDiskSpace {
            path: path.to_path_buf(),
            required_gb,
            available_gb,
        });
    }
    Ok(())
}
