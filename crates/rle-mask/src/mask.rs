//! Decoding of column-major run-length encoded segments into dense masks.
//!
//! A segment is a list of run lengths alternating between "off" and "on",
//! always starting with "off". Runs are laid out in column-major (Fortran)
//! order: pixel `(row, col)` is position `row + height * col`. Several
//! segments decoded into one mask are OR-ed together.

use tracing::{debug, warn};

use crate::error::{Result, RleMaskError};
use crate::params::{DecodeOptions, SumPolicy};
use crate::types::{ImageShape, Mask, Rle};

/// Decode RLE segments into a fresh `(height, width)` mask.
///
/// An empty `segments` list yields an all-zero mask. Under
/// [`SumPolicy::Strict`] the first segment whose runs do not sum to
/// `height * width` aborts the decode.
pub fn decode_mask<S: AsRef<[u32]>>(
    shape: ImageShape,
    segments: &[S],
    options: &DecodeOptions,
) -> Result<Mask> {
    let mut mask = Mask::zeros(shape);
    for (index, segment) in segments.iter().enumerate() {
        apply_indexed(&mut mask, index, segment.as_ref(), options.sum_policy)?;
    }
    debug!(
        height = shape.height(),
        width = shape.width(),
        segments = segments.len(),
        "decoded mask"
    );
    Ok(mask)
}

/// Same as [`decode_mask`], taking the shape as `(height, width, ...)` dimensions.
pub fn decode_mask_from_dims<S: AsRef<[u32]>>(
    dims: &[usize],
    segments: &[S],
    options: &DecodeOptions,
) -> Result<Mask> {
    decode_mask(ImageShape::from_dims(dims)?, segments, options)
}

/// Decode a single shaped RLE.
pub fn decode_rle(rle: &Rle, options: &DecodeOptions) -> Result<Mask> {
    decode_mask(rle.shape()?, &[&rle.counts], options)
}

/// OR one segment into an existing mask.
pub fn apply_segment(mask: &mut Mask, segment: &[u32], policy: SumPolicy) -> Result<()> {
    apply_indexed(mask, 0, segment, policy)
}

fn apply_indexed(mask: &mut Mask, index: usize, segment: &[u32], policy: SumPolicy) -> Result<()> {
    check_sum(index, segment, mask.shape(), policy)?;
    or_segment(mask, segment);
    Ok(())
}

fn check_sum(index: usize, segment: &[u32], shape: ImageShape, policy: SumPolicy) -> Result<()> {
    let sum: u64 = segment.iter().map(|&c| c as u64).sum();
    let expected = shape.len() as u64;
    if sum == expected {
        return Ok(());
    }
    match policy {
        SumPolicy::Strict => Err(RleMaskError::MalformedSegment {
            index,
            sum,
            expected,
        }),
        SumPolicy::Lenient => {
            warn!(
                segment = index,
                sum, expected, "run lengths do not cover the mask exactly"
            );
            Ok(())
        }
    }
}

/// Walk the mask column by column, writing 1.0 wherever the toggle is on.
///
/// Off positions are never written, so earlier segments survive. Once the
/// runs are exhausted the remaining positions are left untouched.
fn or_segment(mask: &mut Mask, segment: &[u32]) {
    let mut runs = segment.iter().map(|&c| c as usize);
    let mut remaining = runs.next();
    let mut on = false;

    for col in 0..mask.width() {
        for row in 0..mask.height() {
            // Zero-length runs flip the toggle again without consuming a pixel.
            while remaining == Some(0) {
                remaining = runs.next();
                on = !on;
            }
            let Some(left) = remaining.as_mut() else {
                return;
            };
            if on {
                mask.set_on(row, col);
            }
            *left -= 1;
        }
    }
}

/// Number of foreground pixels covered by an RLE, clamped to `h * w`.
///
/// Only the odd-indexed runs (the 1s) contribute.
pub fn area(rle: &Rle) -> u64 {
    let n = (rle.h as u64) * (rle.w as u64);
    let mut a = 0u64;
    let mut pos = 0u64;
    for (i, &c) in rle.counts.iter().enumerate() {
        let end = (pos + c as u64).min(n);
        if i % 2 == 1 {
            a += end - pos;
        }
        pos = end;
    }
    a
}

/// Bounding box `[x, y, w, h]` of an RLE's foreground, computed on the runs
/// without materializing the mask.
pub fn to_bbox(rle: &Rle) -> [f64; 4] {
    let h = rle.h as usize;
    let n = h * rle.w as usize;
    if n == 0 {
        return [0.0, 0.0, 0.0, 0.0];
    }

    let mut xs = rle.w as usize;
    let mut xe = 0usize;
    let mut ys = h;
    let mut ye = 0usize;
    let mut has_any = false;

    let mut cc = 0usize;
    for (i, &c) in rle.counts.iter().enumerate() {
        let end = (cc + c as usize).min(n);
        if i % 2 == 1 && end > cc {
            has_any = true;
            let (x1, y1) = (cc / h, cc % h);
            let (x2, y2) = ((end - 1) / h, (end - 1) % h);

            xs = xs.min(x1);
            xe = xe.max(x2 + 1);
            ys = ys.min(y1);
            ye = ye.max(y2 + 1);
            // A run spilling into the next column covers every row in between.
            if x1 != x2 {
                ys = 0;
                ye = h;
            }
        }
        cc = end;
    }

    if !has_any {
        return [0.0, 0.0, 0.0, 0.0];
    }
    [xs as f64, ys as f64, (xe - xs) as f64, (ye - ys) as f64]
}
