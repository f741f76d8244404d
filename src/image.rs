use std::collections::VecDeque;

use crate::errors::{Error, Result};

pub type Crd = i64;

/*****************************************************************************/

/* Image layer */

#[derive(Clone)]
pub struct ImageLayer<T>
where
    T: Copy + Clone + ImgLayerDefValue<Type = T>
{
    data:   Vec<T>,
    width:  Crd,
    height: Crd,
}

pub type ImageLayerF32 = ImageLayer::<f32>;
pub type ImageMask = ImageLayer::<bool>;

impl<T> ImageLayer<T>
where T: Copy + Clone + ImgLayerDefValue<Type = T> {
    pub fn new(width: Crd, height: Crd) -> ImageLayer<T> {
        let mut result = ImageLayer::<T> { data: vec![], width, height };
        result.data.resize((width * height) as usize, T::DEF_VALUE);
        result
    }

    pub fn new_empty() -> ImageLayer<T> {
        ImageLayer { data: vec![], width: 0, height: 0 }
    }

    pub fn width(&self) -> Crd {
        self.width
    }

    pub fn height(&self) -> Crd {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        (self.width == 0) && self.data.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, x: Crd, y: Crd) -> Option<T> {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return None;
        }
        Some(self.data[(y * self.width + x) as usize])
    }

    #[inline(always)]
    pub fn set(&mut self, x: Crd, y: Crd, value: T) {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            panic!("Internal error")
        }
        self.data[(y*self.width+x) as usize] = value;
    }

    pub fn iter(&self) -> std::slice::Iter<T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<T> {
        self.data.iter_mut()
    }

    pub fn iter_crd(&self) -> ImageLayerIter1<T> {
        ImageLayerIter1 {
            iter1: self.data.iter(),
            x: 0,
            y: 0,
            width: self.width,
        }
    }

    pub fn iter_crd_mut(&mut self) -> ImageLayerMutIter1<T> {
        ImageLayerMutIter1 {
            iter1: self.data.iter_mut(),
            x: 0,
            y: 0,
            width: self.width,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn iter_area_crd(&self, area: &RectArea) -> RectIterCrd<T> {
        RectIterCrd::new(self, area.x1, area.y1, area.x2, area.y2)
    }
}

impl ImageLayer<f32> {
    /// Subtracts `other`, clamping at zero. Intensities are non-negative
    /// and must not underflow.
    pub fn subtract_clamped(&mut self, other: &ImageLayerF32) {
        assert!(self.width == other.width);
        assert!(self.height == other.height);
        for (s, o) in self.data.iter_mut().zip(other.iter()) {
            *s = (*s - *o).max(0.0);
        }
    }
}

pub trait ImgLayerDefValue {
    type Type;
    const DEF_VALUE: Self::Type;
}

impl ImgLayerDefValue for f32 {
    type Type = f32;
    const DEF_VALUE: Self::Type = 0.0;
}

impl ImgLayerDefValue for bool {
    type Type = bool;
    const DEF_VALUE: Self::Type = false;
}

pub struct ImageLayerIter1<'a, T: Copy + Clone> {
    iter1: std::slice::Iter<'a, T>,
    x: Crd,
    y: Crd,
    width: Crd,
}

impl<'a, T: Copy + Clone> Iterator for ImageLayerIter1<'a, T> {
    type Item = (Crd, Crd, T);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(next_val1) = self.iter1.next() {
            let ret = (self.x, self.y, *next_val1);
            self.x += 1;
            if self.x == self.width { self.x = 0; self.y += 1; }
            Some(ret)
        } else {
            None
        }
    }
}

pub struct ImageLayerMutIter1<'a, T: Copy + Clone> {
    iter1: std::slice::IterMut<'a, T>,
    x:     Crd,
    y:     Crd,
    width: Crd,
}

impl<'a, T: Copy + Clone> Iterator for ImageLayerMutIter1<'a, T> {
    type Item = (Crd, Crd, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(next_val1) = self.iter1.next() {
            let ret = (self.x, self.y, next_val1);
            self.x += 1;
            if self.x == self.width { self.x = 0; self.y += 1; }
            Some(ret)
        } else {
            None
        }
    }
}

pub struct RectIterCrd<'a, T: Copy + Clone + ImgLayerDefValue<Type = T>> {
    img: &'a ImageLayer<T>,
    x1: Crd,
    y1: Crd,
    x2: Crd,
    y2: Crd,
    x: Crd,
    y: Crd,
    iter: std::slice::Iter<'a, T>,
}

impl<'a, T: Copy + Clone + ImgLayerDefValue<Type = T>> RectIterCrd<'a, T> {
    fn new(
        img:    &'a ImageLayer<T>,
        mut x1: Crd,
        mut y1: Crd,
        mut x2: Crd,
        mut y2: Crd
    ) -> RectIterCrd<'a, T> {
        if x1 < 0 { x1 = 0; }
        if y1 < 0 { y1 = 0; }
        if x2 >= img.width { x2 = img.width-1; }
        if y2 >= img.height { y2 = img.height-1; }
        if x2 < x1 || y2 < y1 {
            // fully clipped away, yields nothing
            return RectIterCrd {
                img, x1: 0, y1: 0, x2: 0, y2: -1, x: 0, y: 0,
                iter: img.data[0..0].iter(),
            };
        }
        RectIterCrd {
            img, x1, y1, x2, y2, x: x1, y: y1,
            iter: RectIterCrd::create_iter(img, x1, x2, y1)
        }
    }

    fn create_iter(
        img: &'a ImageLayer<T>,
        x1:  Crd,
        x2:  Crd,
        y:   Crd
    ) -> std::slice::Iter<'a, T> {
        let line_start = y*img.width;
        img.data[(line_start+x1) as usize ..= (line_start+x2) as usize].iter()
    }
}

impl<'a, T: Copy + Clone + ImgLayerDefValue<Type = T>> Iterator
for RectIterCrd<'a, T> {
    type Item = (Crd, Crd, T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(v) = self.iter.next() {
                let result = (self.x, self.y, *v);
                self.x += 1;
                return Some(result);
            } else {
                self.y += 1;
                if self.y > self.y2 { return None; }
                self.x = self.x1;
                self.iter = RectIterCrd::create_iter(self.img, self.x1, self.x2, self.y);
            }
        }
    }
}

/*****************************************************************************/

/* Image */

pub struct Image {
    pub r: ImageLayerF32,
    pub g: ImageLayerF32,
    pub b: ImageLayerF32,
    pub l: ImageLayerF32,
}

impl Image {
    pub fn new_grey(width: Crd, height: Crd) -> Image {
        Image {
            r: ImageLayerF32::new_empty(),
            g: ImageLayerF32::new_empty(),
            b: ImageLayerF32::new_empty(),
            l: ImageLayerF32::new(width, height),
        }
    }

    pub fn new_color(width: Crd, height: Crd) -> Image {
        Image {
            r: ImageLayerF32::new(width, height),
            g: ImageLayerF32::new(width, height),
            b: ImageLayerF32::new(width, height),
            l: ImageLayerF32::new_empty(),
        }
    }

    /// Empty image with the same layer population and dimensions as `other`.
    pub fn new_same_layout(other: &Image) -> Image {
        if other.is_greyscale() {
            Image::new_grey(other.width(), other.height())
        } else {
            Image::new_color(other.width(), other.height())
        }
    }

    /// Seam to the external decoder: wraps a decoded 8-bit interleaved
    /// raster (rows x cols x channels, channels 1 or 3).
    pub fn from_u8_interleaved(
        data:     &[u8],
        width:    Crd,
        height:   Crd,
        channels: usize,
    ) -> Result<Image> {
        if width <= 0 || height <= 0 || (channels != 1 && channels != 3) {
            return Err(Error::InvalidParameter {
                name: "channels", value: channels as f64,
            });
        }
        if data.len() != (width * height) as usize * channels {
            return Err(Error::InvalidParameter {
                name: "data_len", value: data.len() as f64,
            });
        }
        let mut image = if channels == 1 {
            Image::new_grey(width, height)
        } else {
            Image::new_color(width, height)
        };
        if channels == 1 {
            for (d, s) in image.l.iter_mut().zip(data.iter()) {
                *d = *s as f32;
            }
        } else {
            for (i, px) in data.chunks_exact(3).enumerate() {
                image.r.data[i] = px[0] as f32;
                image.g.data[i] = px[1] as f32;
                image.b.data[i] = px[2] as f32;
            }
        }
        Ok(image)
    }

    /// Inverse of [`Image::from_u8_interleaved`]. Values are rounded and
    /// saturated into `0..=255`.
    pub fn to_u8_interleaved(&self) -> Vec<u8> {
        let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        if self.is_greyscale() {
            self.l.iter().map(|&v| to_u8(v)).collect()
        } else {
            let mut result = Vec::with_capacity(self.r.data.len() * 3);
            for ((&r, &g), &b) in self.r.iter().zip(self.g.iter()).zip(self.b.iter()) {
                result.push(to_u8(r));
                result.push(to_u8(g));
                result.push(to_u8(b));
            }
            result
        }
    }

    pub fn width(&self) -> Crd {
        if      self.is_greyscale() { self.l.width }
        else if self.is_rgb()       { self.r.width }
        else                        { 0 }
    }

    pub fn height(&self) -> Crd {
        if      self.is_greyscale() { self.l.height }
        else if self.is_rgb()       { self.r.height }
        else                        { 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty() &&
        self.g.is_empty() &&
        self.b.is_empty() &&
        self.l.is_empty()
    }

    pub fn is_greyscale(&self) -> bool {
        !self.l.is_empty()
    }

    pub fn is_rgb(&self) -> bool {
        !self.r.is_empty() && !self.g.is_empty() && !self.b.is_empty()
    }

    pub fn layers(&self) -> Vec<&ImageLayerF32> {
        let mut result = Vec::new();
        if !self.l.is_empty() { result.push(&self.l); }
        if !self.r.is_empty() { result.push(&self.r); }
        if !self.g.is_empty() { result.push(&self.g); }
        if !self.b.is_empty() { result.push(&self.b); }
        result
    }

    pub fn layers_mut(&mut self) -> Vec<&mut ImageLayerF32> {
        let mut result = Vec::new();
        if !self.l.is_empty() { result.push(&mut self.l); }
        if !self.r.is_empty() { result.push(&mut self.r); }
        if !self.g.is_empty() { result.push(&mut self.g); }
        if !self.b.is_empty() { result.push(&mut self.b); }
        result
    }

    pub fn create_greyscale_layer(&self) -> ImageLayerF32 {
        assert!(!self.is_empty());
        if self.is_greyscale() {
            self.l.clone()
        } else {
            let mut result = ImageLayerF32::new(self.width(), self.height());
            for (d, ((&r, &g), &b))
            in result.iter_mut().zip(self.r.iter().zip(self.g.iter()).zip(self.b.iter())) {
                *d = 0.2126 * r + 0.7152 * g + 0.0722 * b;
            }
            result
        }
    }
}

/*****************************************************************************/

/* Rectangular areas */

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectArea {
    pub x1: Crd,
    pub y1: Crd,
    pub x2: Crd,
    pub y2: Crd,
}

impl RectArea {
    /// Cell `(i, j)` of a fixed-size grid over a `width` x `height` raster.
    /// The last row and column of cells are truncated at the raster edge,
    /// never padded.
    pub fn grid_cell(i: Crd, j: Crd, cell_size: Crd, width: Crd, height: Crd) -> RectArea {
        let x1 = i * cell_size;
        let y1 = j * cell_size;
        RectArea {
            x1,
            y1,
            x2: (x1 + cell_size).min(width) - 1,
            y2: (y1 + cell_size).min(height) - 1,
        }
    }
}

/*****************************************************************************/

/* Iterative flood filler */

pub struct FloodFiller {
    visited: VecDeque<(Crd, Crd)>,
}

impl FloodFiller {
    pub fn new() -> FloodFiller {
        FloodFiller {
            visited: VecDeque::new(),
        }
    }

    pub fn fill<SetFilled: FnMut(Crd, Crd) -> bool>(
        &mut self,
        x: Crd,
        y: Crd,
        mut try_set_filled: SetFilled
    ) {
        if !try_set_filled(x, y) { return; }

        self.visited.clear();
        self.visited.push_back((x, y));

        while let Some((pt_x, pt_y)) = self.visited.pop_front() {
            let mut check_neibour = |x, y| {
                if !try_set_filled(x, y) { return; }
                self.visited.push_back((x, y));
            };
            check_neibour(pt_x-1, pt_y);
            check_neibour(pt_x+1, pt_y);
            check_neibour(pt_x, pt_y-1);
            check_neibour(pt_x, pt_y+1);
        }
    }
}
