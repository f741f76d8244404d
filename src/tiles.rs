use rayon::prelude::*;

use crate::errors::{Error, Result};
use crate::image::*;
use crate::stat::AreaStat;

/// Per-tile statistics of one image layer, for cheap local window estimates.
///
/// A literal sliding (2w+1)x(2w+1) window costs O(w^2) per pixel. Instead the
/// layer is split once into fixed `dw = 2w` tiles with one [`AreaStat`] each
/// (a single O(width*height) pass), and the window statistic at a pixel is
/// approximated by merging its tile with up to four direct neighbors. Lookup
/// is then O(1) per pixel independent of `w`. The window shape is only
/// approximate; seams at tile boundaries are accepted estimation error, and
/// larger `w` trades detection granularity for robustness against them.
pub struct TileGrid {
    tiles:     Vec<AreaStat>,
    tiles_x:   Crd,
    tiles_y:   Crd,
    tile_size: Crd,
}

impl TileGrid {
    pub fn build(layer: &ImageLayerF32, half_width: Crd) -> Result<TileGrid> {
        if half_width <= 0 {
            return Err(Error::InvalidParameter {
                name: "half_width", value: half_width as f64,
            });
        }
        if layer.is_empty() {
            return Err(Error::EmptyRegion);
        }

        let tile_size = 2 * half_width;
        let width = layer.width();
        let height = layer.height();
        let tiles_x = (width + tile_size - 1) / tile_size;
        let tiles_y = (height + tile_size - 1) / tile_size;

        // Tile rows are independent; row-major order is preserved by collect
        let tiles = (0..tiles_y as usize)
            .into_par_iter()
            .flat_map_iter(|ty| (0..tiles_x).map(move |tx| {
                let area = RectArea::grid_cell(tx, ty as Crd, tile_size, width, height);
                AreaStat::of_area(layer, &area, false)
            }))
            .collect::<Result<Vec<_>>>()?;

        Ok(TileGrid { tiles, tiles_x, tiles_y, tile_size })
    }

    pub fn tiles_x(&self) -> Crd {
        self.tiles_x
    }

    pub fn tiles_y(&self) -> Crd {
        self.tiles_y
    }

    pub fn tile_size(&self) -> Crd {
        self.tile_size
    }

    pub fn tile(&self, tx: Crd, ty: Crd) -> &AreaStat {
        &self.tiles[(ty * self.tiles_x + tx) as usize]
    }

    /// Approximate window statistics at pixel `(x, y)`: the containing tile
    /// merged with its left/right/up/down neighbors (no diagonals). Border
    /// tiles merge only the neighbors that exist.
    pub fn local_stat(&self, x: Crd, y: Crd) -> AreaStat {
        let tx = (x / self.tile_size).clamp(0, self.tiles_x - 1);
        let ty = (y / self.tile_size).clamp(0, self.tiles_y - 1);

        let mut stat = *self.tile(tx, ty);
        if tx > 0                { stat += *self.tile(tx - 1, ty); }
        if ty > 0                { stat += *self.tile(tx, ty - 1); }
        if tx < self.tiles_x - 1 { stat += *self.tile(tx + 1, ty); }
        if ty < self.tiles_y - 1 { stat += *self.tile(tx, ty + 1); }
        stat
    }
}
