use std::collections::BTreeSet;

use crate::error::PipelineError;

/// Every `HOLDOUT_STRIDE`-th view (by sorted name) is held out for evaluation.
pub const HOLDOUT_STRIDE: usize = 8;

/// The result of splitting a set of views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSplit {
    /// Views used for reconstruction, ascending by name.
    pub train: Vec<String>,
    /// Views reserved for evaluation, ascending by name.
    pub holdout: Vec<String>,
}

/// Split views into training and holdout sets and subsample the training set.
///
/// Names are sorted first, so the result does not depend on enumeration
/// order. The view at sorted index `idx` is held out iff
/// `idx % holdout_stride == 0`. With `n_views > 0` the remaining candidates
/// are subsampled at `n_views` evenly spaced positions rounded half to even.
/// Rounding may map two positions to the same candidate, in which case fewer
/// than `n_views` views are returned.
///
/// # Arguments
///
/// * `names` - The names of all registered views.
/// * `holdout_stride` - The holdout stride, must be > 0.
/// * `n_views` - The number of training views to keep, 0 keeps all.
///
/// # Example
///
/// ```
/// use viewprep_pipeline::sampler::select_views;
///
/// let names = (0..16).map(|i| format!("{i:03}.png")).collect::<Vec<_>>();
/// let split = select_views(&names, 8, 0).unwrap();
/// assert_eq!(split.holdout, vec!["000.png", "008.png"]);
/// assert_eq!(split.train.len(), 14);
/// ```
pub fn select_views<S: AsRef<str>>(
    names: &[S],
    holdout_stride: usize,
    n_views: usize,
) -> Result<ViewSplit, PipelineError> {
    if holdout_stride == 0 {
        return Err(PipelineError::InvalidHoldoutStride(holdout_stride));
    }

    let mut sorted = names
        .iter()
        .map(|n| n.as_ref().to_string())
        .collect::<Vec<_>>();
    sorted.sort();

    let (holdout, candidates): (Vec<_>, Vec<_>) = sorted
        .into_iter()
        .enumerate()
        .partition(|(idx, _)| idx % holdout_stride == 0);

    let holdout = holdout.into_iter().map(|(_, name)| name).collect();
    let candidates = candidates
        .into_iter()
        .map(|(_, name)| name)
        .collect::<Vec<_>>();

    if n_views == 0 {
        return Ok(ViewSplit {
            train: candidates,
            holdout,
        });
    }

    let positions = subsample_positions(candidates.len(), n_views);
    let train = candidates
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| positions.contains(idx))
        .map(|(_, name)| name)
        .collect::<Vec<_>>();

    if train.len() < n_views {
        log::warn!(
            "requested {n_views} training views, sampled {} (rounding collisions or too few candidates)",
            train.len()
        );
    }

    Ok(ViewSplit { train, holdout })
}

/// Rounded positions of `n` evenly spaced samples over `[0, len - 1]`.
///
/// Samples follow `numpy.linspace` with the endpoint included and are
/// rounded half to even. Duplicates collapse. Without candidates there are
/// no positions.
pub fn subsample_positions(len: usize, n: usize) -> BTreeSet<usize> {
    if len == 0 {
        return BTreeSet::new();
    }
    let stop = len as f64 - 1.0;
    let step = if n > 1 { stop / (n - 1) as f64 } else { 0.0 };

    (0..n)
        .map(|i| {
            if n > 1 && i == n - 1 {
                stop
            } else {
                i as f64 * step
            }
        })
        .map(f64::round_ties_even)
        .map(|p| p as usize)
        .collect()
}
