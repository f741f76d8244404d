use thiserror::Error;

use crate::image::Crd;

/// Errors produced by the statistics and modeling passes.
///
/// Degenerate regression blocks are not represented here: they are recovered
/// locally (constant-mean fallback) and only logged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Statistics requested for a region with no samples")]
    EmptyRegion,

    #[error("Mask dimensions {mask_width}x{mask_height} do not match image dimensions {width}x{height}")]
    DimensionMismatch {
        width:       Crd,
        height:      Crd,
        mask_width:  Crd,
        mask_height: Crd,
    },

    #[error("Invalid value {value} for parameter `{name}`")]
    InvalidParameter {
        name:  &'static str,
        value: f64,
    },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
