use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use crate::errors::{Error, Result};
use crate::image::*;
use crate::log_utils::TimeLogger;
use crate::stat::AreaStat;
use crate::tiles::TileGrid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum DetectMode {
    /// Local statistics from the tiled window estimate.
    Gaussian,
    /// Image-wide statistics.
    Brightness,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DetectOpts {
    pub mode: DetectMode,

    /// Half the side length of the approximate statistics window.
    pub half_width: Crd,

    /// How many local deviations brighter than the local mean a pixel must
    /// be to count as a star.
    pub z: f64,
}

impl Default for DetectOpts {
    fn default() -> Self {
        Self {
            mode: DetectMode::Gaussian,
            half_width: 10,
            z: 8.0,
        }
    }
}

/// Builds a binary star mask for `image`. Color images are reduced to a
/// luminance layer first; the mask applies to all channels.
pub fn detect_foreground(image: &Image, opts: &DetectOpts) -> Result<ImageMask> {
    let grey = image.create_greyscale_layer();
    detect_foreground_in_layer(&grey, opts)
}

/// Per-channel entry point of the detector.
///
/// The test is one-sided: a pixel is foreground iff it is more than
/// `z * std` *brighter* than its estimated background. Pixels dimmer than
/// background are never flagged; the point is isolating point sources, not
/// general outliers.
pub fn detect_foreground_in_layer(
    layer: &ImageLayerF32,
    opts:  &DetectOpts,
) -> Result<ImageMask> {
    if opts.z < 0.0 {
        return Err(Error::InvalidParameter { name: "z", value: opts.z });
    }

    let mask = match opts.mode {
        DetectMode::Gaussian => {
            let grid_log = TimeLogger::start();
            let grid = TileGrid::build(layer, opts.half_width)?;
            grid_log.log("tile statistics setup");

            let mark_log = TimeLogger::start();
            let mask = mark_foreground(layer, opts.z, |x, y| grid.local_stat(x, y));
            mark_log.log("foreground classification");
            mask
        }
        DetectMode::Brightness => {
            let global = AreaStat::of_layer(layer, false)?;
            log::info!(
                "image-wide mean = {:.2}, std = {:.2}",
                global.mean, global.std
            );
            mark_foreground(layer, opts.z, |_, _| global)
        }
    };

    log::info!(
        "{} of {} pixels classified as foreground",
        mask.iter().filter(|&&m| m).count(),
        mask.as_slice().len()
    );

    Ok(mask)
}

fn mark_foreground(
    layer:    &ImageLayerF32,
    z:        f64,
    stat_fun: impl Fn(Crd, Crd) -> AreaStat + Sync,
) -> ImageMask {
    let width = layer.width() as usize;
    let mut mask = ImageMask::new(layer.width(), layer.height());

    // Each worker writes one mask row; only finalized tile stats are read
    mask.as_slice_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, mask_row)| {
            let src_row = &layer.as_slice()[y * width .. (y + 1) * width];
            for (x, (m, &v)) in mask_row.iter_mut().zip(src_row).enumerate() {
                let stat = stat_fun(x as Crd, y as Crd);
                *m = v as f64 - stat.mean > z * stat.std;
            }
        });

    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_layer(width: Crd, height: Crd, value: f32) -> ImageLayerF32 {
        let mut layer = ImageLayerF32::new(width, height);
        for v in layer.iter_mut() { *v = value; }
        layer
    }

    #[test]
    fn negative_z_is_rejected() {
        let layer = constant_layer(16, 16, 10.0);
        let opts = DetectOpts { z: -1.0, ..DetectOpts::default() };
        assert!(matches!(
            detect_foreground_in_layer(&layer, &opts),
            Err(Error::InvalidParameter { name: "z", .. })
        ));
    }

    #[test]
    fn uniform_image_has_no_foreground() {
        let layer = constant_layer(40, 30, 100.0);
        for mode in [DetectMode::Gaussian, DetectMode::Brightness] {
            for z in [0.0, 1.0, 8.0] {
                let opts = DetectOpts { mode, half_width: 5, z };
                let mask = detect_foreground_in_layer(&layer, &opts).unwrap();
                assert!(mask.iter().all(|&m| !m));
            }
        }
    }

    #[test]
    fn single_spike_flagged_iff_z_below_its_score() {
        // Base layer with mild checkerboard texture so std != 0, plus one
        // strong spike in the middle.
        let mut layer = ImageLayerF32::new(32, 32);
        for (x, y, v) in layer.iter_crd_mut() {
            *v = if (x + y) % 2 == 0 { 10.0 } else { 12.0 };
        }
        layer.set(16, 16, 200.0);

        let stat = AreaStat::of_layer(&layer, false).unwrap();
        let k = (200.0 - stat.mean) / stat.std;
        assert!(k > 2.0);

        let flagged = |z: f64| {
            let opts = DetectOpts { mode: DetectMode::Brightness, half_width: 4, z };
            let mask = detect_foreground_in_layer(&layer, &opts).unwrap();
            mask.get(16, 16).unwrap()
        };

        assert!(flagged(k - 1.0));
        assert!(!flagged(k + 1.0));
    }

    #[test]
    fn dim_pixels_are_never_flagged() {
        let mut layer = constant_layer(32, 32, 100.0);
        layer.set(10, 10, 0.0); // much dimmer than surroundings
        let opts = DetectOpts { half_width: 4, z: 0.0, ..DetectOpts::default() };
        let mask = detect_foreground_in_layer(&layer, &opts).unwrap();
        assert!(!mask.get(10, 10).unwrap());
    }

    #[test]
    fn gaussian_mode_finds_bright_star() {
        let mut layer = constant_layer(64, 64, 20.0);
        // faint noise floor so local std is non-zero but small
        for (x, y, v) in layer.iter_crd_mut() {
            if (x * 7 + y * 3) % 5 == 0 { *v += 1.0; }
        }
        layer.set(30, 30, 250.0);
        layer.set(31, 30, 250.0);

        let opts = DetectOpts { half_width: 8, z: 8.0, ..DetectOpts::default() };
        let mask = detect_foreground_in_layer(&layer, &opts).unwrap();
        assert!(mask.get(30, 30).unwrap());
        assert!(mask.get(31, 30).unwrap());
        assert!(!mask.get(5, 5).unwrap());
    }
}
