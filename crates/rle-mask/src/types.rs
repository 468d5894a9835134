use serde::{Deserialize, Serialize};

use crate::error::{Result, RleMaskError};

/// Spatial dimensions of an image; any channel dimension is dropped.
///
/// Always holds two positive dimensions whose product fits in `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "RawShape")]
pub struct ImageShape {
    height: usize,
    width: usize,
}

#[derive(Deserialize)]
struct RawShape {
    height: usize,
    width: usize,
}

impl TryFrom<RawShape> for ImageShape {
    type Error = RleMaskError;

    fn try_from(raw: RawShape) -> Result<Self> {
        Self::new(raw.height, raw.width)
    }
}

impl ImageShape {
    /// Both dimensions must be positive and `height * width` must not overflow.
    pub fn new(height: usize, width: usize) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(RleMaskError::invalid_shape(format!(
                "dimensions must be positive, got {height}x{width}"
            )));
        }
        if height.checked_mul(width).is_none() {
            return Err(RleMaskError::invalid_shape(format!(
                "{height}x{width} pixels overflow usize"
            )));
        }
        Ok(Self { height, width })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Build a shape from `(height, width, ...)`, ignoring trailing dimensions.
    pub fn from_dims(dims: &[usize]) -> Result<Self> {
        match dims {
            [h, w, ..] => Self::new(*h, *w),
            _ => Err(RleMaskError::invalid_shape(format!(
                "need at least 2 dimensions, got {}",
                dims.len()
            ))),
        }
    }

    /// Number of pixels, `height * width`; cannot overflow since `new` checked it.
    pub fn len(&self) -> usize {
        self.height * self.width
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run-length encoding for a single segment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Rle {
    pub h: u32,
    pub w: u32,
    /// Run counts: alternating runs of 0s and 1s, starting with 0s.
    pub counts: Vec<u32>,
}

impl Rle {
    pub fn shape(&self) -> Result<ImageShape> {
        ImageShape::new(self.h as usize, self.w as usize)
    }
}

/// Dense binary mask of shape `(height, width)` holding 0.0 or 1.0.
///
/// Storage is row-major: pixel `(row, col)` is at `row * width + col`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl Mask {
    /// All-zero mask.
    pub fn zeros(shape: ImageShape) -> Self {
        Self {
            height: shape.height,
            width: shape.width,
            data: vec![0.0; shape.len()],
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn shape(&self) -> ImageShape {
        ImageShape {
            height: self.height,
            width: self.width,
        }
    }

    /// Value at `(row, col)`, or `None` outside the mask.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    pub(crate) fn set_on(&mut self, row: usize, col: usize) {
        self.data[row * self.width + col] = 1.0;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.width.max(1))
    }

    /// Number of pixels set to 1.0.
    pub fn area(&self) -> u64 {
        self.data.iter().filter(|&&v| v != 0.0).count() as u64
    }

    /// Bounding box `[x, y, w, h]` of the set pixels, all zeros for an empty mask.
    pub fn bbox(&self) -> [f64; 4] {
        let mut xs = usize::MAX;
        let mut ys = usize::MAX;
        let mut xe = 0usize;
        let mut ye = 0usize;
        for (row, values) in self.rows().enumerate() {
            for (col, &v) in values.iter().enumerate() {
                if v == 0.0 {
                    continue;
                }
                xs = xs.min(col);
                ys = ys.min(row);
                xe = xe.max(col + 1);
                ye = ye.max(row + 1);
            }
        }
        if xe == 0 {
            return [0.0, 0.0, 0.0, 0.0];
        }
        [xs as f64, ys as f64, (xe - xs) as f64, (ye - ys) as f64]
    }

    /// 8-bit grayscale rendering, 255 where the mask is set.
    pub fn to_luma8(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let v = self.data[y as usize * self.width + x as usize];
            image::Luma([if v != 0.0 { 255 } else { 0 }])
        })
    }
}

/// Top-level annotation file: images plus their RLE annotations.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Dataset {
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Image {
    pub id: u64,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Annotation {
    #[serde(default)]
    pub id: u64,
    pub image_id: u64,
    /// `[height, width]` the segments were encoded against.
    #[serde(default)]
    pub size: Option<[u32; 2]>,
    /// One run-length sequence per object instance.
    #[serde(default, alias = "rle_counts")]
    pub segments: Vec<Vec<u32>>,
}
