use itertools::izip;
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use crate::calc::*;
use crate::errors::{Error, Result};
use crate::image::*;
use crate::log_utils::TimeLogger;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelOpts {
    /// Side length of the square modeling blocks, in pixels. Independent of
    /// the detector tile size.
    pub block_size: Crd,
}

impl Default for ModelOpts {
    fn default() -> Self {
        Self { block_size: 10 }
    }
}

/// Fits and evaluates the sky background of `image`, block by block.
///
/// Per block and channel an affine intensity plane is fitted by weighted
/// least squares with foreground pixels at weight zero, then evaluated at
/// every pixel of the block. Returns `(model, corrected)` where
/// `corrected = max(original - model, 0)`. Foreground pixels are excluded
/// from *fitting* only; they receive a modeled value and are corrected like
/// any other pixel.
pub fn model_background(
    image: &Image,
    mask:  &ImageMask,
    opts:  &ModelOpts,
) -> Result<(Image, Image)> {
    if opts.block_size <= 0 {
        return Err(Error::InvalidParameter {
            name: "block_size", value: opts.block_size as f64,
        });
    }
    if mask.width() != image.width() || mask.height() != image.height() {
        return Err(Error::DimensionMismatch {
            width:       image.width(),
            height:      image.height(),
            mask_width:  mask.width(),
            mask_height: mask.height(),
        });
    }

    let mut model = Image::new_same_layout(image);
    let mut corrected = Image::new_same_layout(image);

    let time_log = TimeLogger::start();
    for (src, mdl, corr) in izip!(
        image.layers(),
        model.layers_mut(),
        corrected.layers_mut()
    ) {
        model_layer_background(src, mask, opts.block_size, mdl);
        *corr = (*src).clone();
        corr.subtract_clamped(mdl);
    }
    time_log.log("background modeling");

    Ok((model, corrected))
}

/// One channel of [`model_background`]. Horizontal bands of blocks are
/// processed in parallel; each band writes a disjoint row range of the
/// model layer, so the result does not depend on the pool size. The model
/// holds the raw plane value, which may dip below zero; only the
/// subtraction clamps.
fn model_layer_background(
    src:        &ImageLayerF32,
    mask:       &ImageMask,
    block_size: Crd,
    model:      &mut ImageLayerF32,
) {
    let width = src.width() as usize;
    let band_len = block_size as usize * width;
    let src_data = src.as_slice();
    let mask_data = mask.as_slice();

    let degenerate_blocks: usize = model.as_slice_mut()
        .par_chunks_mut(band_len)
        .enumerate()
        .map(|(band_index, model_band)| {
            let band_start = band_index * band_len;
            let src_band = &src_data[band_start .. band_start + model_band.len()];
            let mask_band = &mask_data[band_start .. band_start + model_band.len()];
            let band_rows = (model_band.len() / width) as Crd;

            let mut degenerate = 0_usize;
            let mut x1: Crd = 0;
            while x1 < width as Crd {
                let block_width = block_size.min(width as Crd - x1);
                let fitted = fit_block(
                    src_band, mask_band, width,
                    x1, block_width, band_rows,
                );
                let plane = fitted.unwrap_or_else(|| {
                    degenerate += 1;
                    mean_plane(src_band, width, x1, block_width, band_rows)
                });

                for by in 0..band_rows {
                    for bx in 0..block_width {
                        let index = by as usize * width + (x1 + bx) as usize;
                        model_band[index] = plane.calc(bx as f64, by as f64) as f32;
                    }
                }
                x1 += block_size;
            }
            degenerate
        })
        .sum();

    if degenerate_blocks != 0 {
        log::warn!(
            "{} degenerate blocks (all-foreground or too thin), \
             fell back to constant mean model",
            degenerate_blocks
        );
    }
}

/// Weighted plane fit over one block. `None` when the normal equations are
/// singular: every pixel is foreground (zero effective weight) or the block
/// is a 1-pixel-wide strip (collinear positions).
fn fit_block(
    src_band:    &[f32],
    mask_band:   &[bool],
    width:       usize,
    x1:          Crd,
    block_width: Crd,
    block_rows:  Crd,
) -> Option<Plane> {
    let weight = 1.0 / (block_width * block_rows) as f64;
    let mut ls = PlaneLs::new();
    for by in 0..block_rows {
        for bx in 0..block_width {
            let index = by as usize * width + (x1 + bx) as usize;
            if mask_band[index] { continue; }
            ls.add(bx as f64, by as f64, src_band[index] as f64, weight);
        }
    }
    ls.result()
}

/// Constant fallback model: the unweighted mean over all block pixels,
/// foreground included.
fn mean_plane(
    src_band:    &[f32],
    width:       usize,
    x1:          Crd,
    block_width: Crd,
    block_rows:  Crd,
) -> Plane {
    let mut sum = 0_f64;
    for by in 0..block_rows {
        for bx in 0..block_width {
            sum += src_band[by as usize * width + (x1 + bx) as usize] as f64;
        }
    }
    Plane {
        a0: sum / (block_width * block_rows) as f64,
        ax: 0.0,
        ay: 0.0,
    }
}
