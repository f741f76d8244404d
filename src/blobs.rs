use std::collections::HashSet;

use crate::image::*;

/// One 4-connected group of foreground pixels, with the background pixels
/// that border it. Useful as a lightweight star inventory for callers that
/// do not carry a full centroid-extraction stage.
pub struct Blob {
    pub points:    Vec<(Crd, Crd)>,
    pub perimeter: Vec<(Crd, Crd)>,
}

impl Blob {
    pub fn pixels_count(&self) -> usize {
        self.points.len()
    }

    /// Unweighted mean position (x, y) of the blob pixels.
    pub fn centroid(&self) -> (f64, f64) {
        let n = self.points.len() as f64;
        let (x_sum, y_sum) = self.points.iter().fold(
            (0_f64, 0_f64),
            |(xs, ys), &(x, y)| (xs + x as f64, ys + y as f64)
        );
        (x_sum / n, y_sum / n)
    }
}

/// Splits a foreground mask into 4-connected blobs. Uses an explicit work
/// queue, so arbitrarily large contiguous regions are fine.
pub fn find_blobs(mask: &ImageMask) -> Vec<Blob> {
    let mut visited = ImageMask::new(mask.width(), mask.height());
    let mut flood_filler = FloodFiller::new();
    let mut blobs = Vec::new();

    for (x, y, m) in mask.iter_crd() {
        if !m || visited.get(x, y).unwrap_or(true) { continue; }

        let mut points = Vec::new();
        flood_filler.fill(x, y, |px, py| {
            match (mask.get(px, py), visited.get(px, py)) {
                (Some(true), Some(false)) => {
                    visited.set(px, py, true);
                    points.push((px, py));
                    true
                }
                _ => false,
            }
        });

        let point_set: HashSet<(Crd, Crd)> = points.iter().copied().collect();
        let mut perim_set = HashSet::new();
        let mut perimeter = Vec::new();
        for &(bx, by) in &points {
            for (nx, ny) in [(bx+1, by), (bx-1, by), (bx, by+1), (bx, by-1)] {
                if mask.get(nx, ny).is_none() { continue; }
                if point_set.contains(&(nx, ny)) { continue; }
                if perim_set.insert((nx, ny)) {
                    perimeter.push((nx, ny));
                }
            }
        }

        blobs.push(Blob { points, perimeter });
    }

    blobs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_has_no_blobs() {
        let mask = ImageMask::new(10, 10);
        assert!(find_blobs(&mask).is_empty());
    }

    #[test]
    fn separate_groups_become_separate_blobs() {
        let mut mask = ImageMask::new(16, 16);
        // 2x2 square
        mask.set(2, 2, true);
        mask.set(3, 2, true);
        mask.set(2, 3, true);
        mask.set(3, 3, true);
        // lone pixel, diagonal contact only is not connectivity
        mask.set(4, 4, true);

        let blobs = find_blobs(&mask);
        assert!(blobs.len() == 2);
        let mut sizes: Vec<_> = blobs.iter().map(|b| b.pixels_count()).collect();
        sizes.sort();
        assert!(sizes == [1, 4]);
    }

    #[test]
    fn centroid_of_a_square() {
        let mut mask = ImageMask::new(8, 8);
        for y in 2..=4 { for x in 2..=4 {
            mask.set(x, y, true);
        }}
        let blobs = find_blobs(&mask);
        assert!(blobs.len() == 1);
        let (cx, cy) = blobs[0].centroid();
        assert!((cx - 3.0).abs() < 1e-9);
        assert!((cy - 3.0).abs() < 1e-9);
    }

    #[test]
    fn perimeter_surrounds_the_blob() {
        let mut mask = ImageMask::new(8, 8);
        mask.set(3, 3, true);
        let blobs = find_blobs(&mask);
        assert!(blobs.len() == 1);
        assert!(blobs[0].perimeter.len() == 4);
        for &(x, y) in &blobs[0].perimeter {
            assert!(!mask.get(x, y).unwrap());
        }

        // A corner pixel has only in-image perimeter neighbors
        let mut mask = ImageMask::new(8, 8);
        mask.set(0, 0, true);
        let blobs = find_blobs(&mask);
        assert!(blobs[0].perimeter.len() == 2);
    }

    #[test]
    fn snake_shaped_region_is_a_single_blob() {
        let mut mask = ImageMask::new(32, 32);
        let mut count = 0;
        for y in 0..32 {
            if y % 2 == 0 {
                for x in 0..32 { mask.set(x, y, true); count += 1; }
            } else if (y / 2) % 2 == 0 {
                mask.set(31, y, true);
                count += 1;
            } else {
                mask.set(0, y, true);
                count += 1;
            }
        }
        let blobs = find_blobs(&mask);
        assert!(blobs.len() == 1);
        assert!(blobs[0].pixels_count() == count);
    }
}
