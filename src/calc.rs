#[inline]
pub fn cmp_f64(v1: &f64, v2: &f64) -> core::cmp::Ordering {
    if *v1 < *v2 { core::cmp::Ordering::Less }
    else if *v1 > *v2 { core::cmp::Ordering::Greater }
    else { core::cmp::Ordering::Equal }
}

pub fn mean_f64(values: &[f64]) -> f64 {
    let sum: f64 = values.iter().sum();
    sum / values.len() as f64
}

/// Exact median by selection. Reorders `values`.
pub fn median_f64(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() { return None; }
    let median_index = values.len() / 2;
    values.select_nth_unstable_by(median_index, cmp_f64);
    Some(values[median_index])
}

fn det2(
    a11: f64, a12: f64,
    a21: f64, a22: f64
) -> f64 {
    a11 * a22 - a12 * a21
}

fn det3(
    a11: f64, a12: f64, a13: f64,
    a21: f64, a22: f64, a23: f64,
    a31: f64, a32: f64, a33: f64
) -> f64 {
    a11 * det2(a22, a23, a32, a33) -
    a12 * det2(a21, a23, a31, a33) +
    a13 * det2(a21, a22, a31, a32)
}

fn linear_solve3(
    a11: f64, a12: f64, a13: f64, b1: f64,
    a21: f64, a22: f64, a23: f64, b2: f64,
    a31: f64, a32: f64, a33: f64, b3: f64
) -> Option<(f64, f64, f64)> {
    let det = det3(
        a11, a12, a13,
        a21, a22, a23,
        a31, a32, a33
    );

    if det == 0.0 {
        return None;
    }

    let det1 = det3(
        b1, a12, a13,
        b2, a22, a23,
        b3, a32, a33
    );

    let det2 = det3(
        a11, b1, a13,
        a21, b2, a23,
        a31, b3, a33
    );

    let det3 = det3(
        a11, a12, b1,
        a21, a22, b2,
        a31, a32, b3
    );

    Some((det1/det, det2/det, det3/det))
}

/// Intensity plane `v = a0 + ax*x + ay*y`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub a0: f64,
    pub ax: f64,
    pub ay: f64,
}

impl Plane {
    pub fn calc(&self, x: f64, y: f64) -> f64 {
        self.a0 + self.ax * x + self.ay * y
    }
}

/// Weighted least squares fit of a `Plane` from accumulated moments.
///
/// Accumulating the normal equations directly avoids materializing the
/// design matrix: samples are streamed in and only nine sums are kept.
pub struct PlaneLs {
    sum_w:  f64,
    sum_x:  f64,
    sum_y:  f64,
    sum_xx: f64,
    sum_xy: f64,
    sum_yy: f64,
    sum_v:  f64,
    sum_xv: f64,
    sum_yv: f64,
}

impl PlaneLs {
    pub fn new() -> PlaneLs {
        PlaneLs {
            sum_w:  0.0,
            sum_x:  0.0,
            sum_y:  0.0,
            sum_xx: 0.0,
            sum_xy: 0.0,
            sum_yy: 0.0,
            sum_v:  0.0,
            sum_xv: 0.0,
            sum_yv: 0.0,
        }
    }

    pub fn add(&mut self, x: f64, y: f64, value: f64, weight: f64) {
        self.sum_w  += weight;
        self.sum_x  += weight * x;
        self.sum_y  += weight * y;
        self.sum_xx += weight * x * x;
        self.sum_xy += weight * x * y;
        self.sum_yy += weight * y * y;
        self.sum_v  += weight * value;
        self.sum_xv += weight * x * value;
        self.sum_yv += weight * y * value;
    }

    pub fn weight_sum(&self) -> f64 {
        self.sum_w
    }

    /// `None` if the system is singular (no effective weight, or the
    /// sample positions are collinear).
    pub fn result(&self) -> Option<Plane> {
        linear_solve3(
            self.sum_w, self.sum_x,  self.sum_y,  self.sum_v,
            self.sum_x, self.sum_xx, self.sum_xy, self.sum_xv,
            self.sum_y, self.sum_xy, self.sum_yy, self.sum_yv,
        ).map(|coeffs| {
            Plane { a0: coeffs.0, ax: coeffs.1, ay: coeffs.2 }
        })
    }
}
