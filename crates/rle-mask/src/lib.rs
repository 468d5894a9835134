pub mod annotations;
pub mod error;
pub mod mask;
pub mod params;
pub mod types;

pub use annotations::MaskIndex;
pub use error::{Result, RleMaskError};
pub use mask::{apply_segment, decode_mask, decode_mask_from_dims, decode_rle};
pub use params::{DecodeOptions, SumPolicy};
pub use types::{Annotation, Dataset, Image, ImageShape, Mask, Rle};
