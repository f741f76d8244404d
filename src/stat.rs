use crate::calc::*;
use crate::errors::{Error, Result};
use crate::image::*;

/// Statistical aggregate over a set of pixel samples.
///
/// Two aggregates can be merged into the statistics of their union without
/// revisiting raw pixels; this is what makes the tiled window estimate in
/// [`crate::tiles::TileGrid`] cheap.
#[derive(Debug, Clone, Copy)]
pub struct AreaStat {
    pub n: usize,

    pub mean: f64,

    /// Mean absolute deviation, *not* a true standard deviation. The z-score
    /// defaults downstream are calibrated against this definition.
    pub std: f64,

    /// `std` squared.
    pub var: f64,

    /// Mean sample position (x, y).
    pub centroid: (f64, f64),

    /// Exact median; only present on directly accumulated stats, a merge
    /// cannot produce one without the raw samples.
    pub median: Option<f64>,
}

impl AreaStat {
    /// Accumulates over the pixels of `area` clipped to the layer. The area
    /// is scanned twice (mean, then deviation); median, when requested, is
    /// exact via selection.
    pub fn of_area(
        layer:       &ImageLayerF32,
        area:        &RectArea,
        with_median: bool,
    ) -> Result<AreaStat> {
        let mut n = 0_usize;
        let mut sum = 0_f64;
        let mut x_sum = 0_f64;
        let mut y_sum = 0_f64;
        for (x, y, v) in layer.iter_area_crd(area) {
            sum += v as f64;
            x_sum += x as f64;
            y_sum += y as f64;
            n += 1;
        }
        if n == 0 {
            return Err(Error::EmptyRegion);
        }

        let mean = sum / n as f64;
        let mut dev_sum = 0_f64;
        let mut values = Vec::with_capacity(if with_median { n } else { 0 });
        for (_, _, v) in layer.iter_area_crd(area) {
            dev_sum += (v as f64 - mean).abs();
            if with_median { values.push(v as f64); }
        }

        let std = dev_sum / n as f64;
        Ok(AreaStat {
            n,
            mean,
            std,
            var: std * std,
            centroid: (x_sum / n as f64, y_sum / n as f64),
            median: if with_median { median_f64(&mut values) } else { None },
        })
    }

    /// Accumulates over bare sample values (no positions, centroid is 0,0).
    /// Reorders `values` when a median is requested.
    pub fn from_values(values: &mut [f64], with_median: bool) -> Result<AreaStat> {
        if values.is_empty() {
            return Err(Error::EmptyRegion);
        }
        let mean = mean_f64(values);
        let dev_sum: f64 = values.iter().map(|v| (v - mean).abs()).sum();
        let std = dev_sum / values.len() as f64;
        Ok(AreaStat {
            n: values.len(),
            mean,
            std,
            var: std * std,
            centroid: (0.0, 0.0),
            median: if with_median { median_f64(values) } else { None },
        })
    }

    /// Statistics of an entire layer.
    pub fn of_layer(layer: &ImageLayerF32, with_median: bool) -> Result<AreaStat> {
        if layer.is_empty() {
            return Err(Error::EmptyRegion);
        }
        let area = RectArea {
            x1: 0,
            y1: 0,
            x2: layer.width() - 1,
            y2: layer.height() - 1,
        };
        AreaStat::of_area(layer, &area, with_median)
    }
}

/// Closed-form parallel combination of two aggregates. Commutative, and
/// associative within floating-point tolerance; the tiled estimator relies
/// on both, since neighbor tiles merge in varying order by pixel position.
impl std::ops::Add for AreaStat {
    type Output = AreaStat;

    fn add(self, rhs: AreaStat) -> AreaStat {
        if self.n == 0 { return rhs; }
        if rhs.n == 0 { return self; }

        let a_n = self.n as f64;
        let b_n = rhs.n as f64;
        let n = self.n + rhs.n;
        let n_f = n as f64;

        let mean = (a_n * self.mean + b_n * rhs.mean) / n_f;
        let var = if n <= 1 {
            0.0
        } else {
            let mean_diff = self.mean - rhs.mean;
            ((a_n - 1.0) * self.var + (b_n - 1.0) * rhs.var) / (n_f - 1.0) +
                a_n * b_n * mean_diff * mean_diff / (n_f * (n_f - 1.0))
        };

        AreaStat {
            n,
            mean,
            std: var.sqrt(),
            var,
            centroid: (
                (a_n * self.centroid.0 + b_n * rhs.centroid.0) / n_f,
                (a_n * self.centroid.1 + b_n * rhs.centroid.1) / n_f,
            ),
            median: None,
        }
    }
}

impl std::ops::AddAssign for AreaStat {
    fn add_assign(&mut self, rhs: AreaStat) {
        *self = *self + rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat_of(values: &[f64]) -> AreaStat {
        let mut values = values.to_vec();
        AreaStat::from_values(&mut values, false).unwrap()
    }

    fn assert_close(v1: f64, v2: f64) {
        assert!((v1 - v2).abs() < 1e-9, "{} != {}", v1, v2);
    }

    #[test]
    fn empty_region_is_an_error() {
        let mut empty: [f64; 0] = [];
        assert!(matches!(
            AreaStat::from_values(&mut empty, false),
            Err(Error::EmptyRegion)
        ));
    }

    #[test]
    fn accumulation_basics() {
        let stat = stat_of(&[1.0, 2.0, 3.0, 4.0]);
        assert!(stat.n == 4);
        assert_close(stat.mean, 2.5);
        assert_close(stat.std, 1.0); // mean |v - 2.5| = (1.5+0.5+0.5+1.5)/4
        assert_close(stat.var, 1.0);
    }

    #[test]
    fn merge_variance_matches_parallel_formula() {
        let a = stat_of(&[1.0, 2.0, 3.0]);
        let b = stat_of(&[10.0, 20.0]);
        let c = a + b;
        assert!(c.n == 5);
        assert_close(c.mean, 36.0 / 5.0);
        let expected_var =
            (2.0 * a.var + 1.0 * b.var) / 4.0 +
            3.0 * 2.0 * (a.mean - b.mean) * (a.mean - b.mean) / (5.0 * 4.0);
        assert_close(c.var, expected_var);
        assert_close(c.std, expected_var.sqrt());
    }

    #[test]
    fn merge_is_commutative_and_associative() {
        let a = stat_of(&[1.0, 5.0, 2.0]);
        let b = stat_of(&[7.0, 3.0]);
        let c = stat_of(&[4.0, 4.0, 9.0, 1.0]);

        let ab_c = (a + b) + c;
        let a_bc = a + (b + c);
        assert!(ab_c.n == a_bc.n);
        assert_close(ab_c.mean, a_bc.mean);
        assert_close(ab_c.var, a_bc.var);

        let ba = b + a;
        let ab = a + b;
        assert_close(ab.mean, ba.mean);
        assert_close(ab.var, ba.var);
    }

    #[test]
    fn merge_single_sample_sides() {
        // (n - 1) terms hit zero here; must not divide by zero
        let a = stat_of(&[5.0]);
        let b = stat_of(&[7.0]);
        let c = a + b;
        assert!(c.n == 2);
        assert_close(c.mean, 6.0);
        assert!(c.var.is_finite());
        assert!(c.std.is_finite());
    }

    #[test]
    fn merge_with_empty_side_returns_other() {
        let a = stat_of(&[2.0, 4.0]);
        let empty = AreaStat {
            n: 0, mean: 0.0, std: 0.0, var: 0.0,
            centroid: (0.0, 0.0), median: None,
        };
        let c = empty + a;
        assert!(c.n == 2);
        assert_close(c.mean, 3.0);
        let c = a + empty;
        assert!(c.n == 2);
        assert_close(c.mean, 3.0);
    }

    #[test]
    fn of_area_centroid_and_median() {
        let mut layer = ImageLayerF32::new(4, 4);
        for (x, y, v) in layer.iter_crd_mut() {
            *v = (y * 4 + x) as f32;
        }
        let area = RectArea { x1: 1, y1: 1, x2: 2, y2: 2 };
        let stat = AreaStat::of_area(&layer, &area, true).unwrap();
        assert!(stat.n == 4);
        assert_close(stat.centroid.0, 1.5);
        assert_close(stat.centroid.1, 1.5);
        // samples 5, 6, 9, 10
        assert_close(stat.mean, 7.5);
        assert!(stat.median.is_some());
    }

    #[test]
    fn merged_stat_has_no_median() {
        let mut v1 = [1.0, 2.0, 3.0];
        let mut v2 = [4.0, 5.0];
        let a = AreaStat::from_values(&mut v1, true).unwrap();
        let b = AreaStat::from_values(&mut v2, true).unwrap();
        assert!(a.median.is_some());
        assert!((a + b).median.is_none());
    }
}
