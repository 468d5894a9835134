//! Loading and indexing of RLE annotation files.
//!
//! The file is either an object with `images` and `annotations` arrays or a
//! bare array of annotations. Each annotation carries one or more segments
//! for a single image.

use std::collections::HashMap;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Result, RleMaskError};
use crate::mask;
use crate::params::DecodeOptions;
use crate::types::{Annotation, Dataset, Image, ImageShape, Mask};

/// Annotation file indexed by image.
pub struct MaskIndex {
    pub dataset: Dataset,
    /// ann_id -> index into dataset.annotations (first occurrence wins)
    anns: HashMap<u64, usize>,
    /// img_id -> index into dataset.images
    imgs: HashMap<u64, usize>,
    /// img_id -> [index into dataset.annotations, ...]
    img_to_anns: HashMap<u64, Vec<usize>>,
}

impl MaskIndex {
    /// Load an annotation JSON file and build indices.
    pub fn new(annotation_file: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(annotation_file)?;
        let dataset = if text.trim_start().starts_with('[') {
            Dataset {
                images: Vec::new(),
                annotations: serde_json::from_str::<Vec<Annotation>>(&text)?,
            }
        } else {
            serde_json::from_str::<Dataset>(&text)?
        };
        info!(
            path = %annotation_file.display(),
            images = dataset.images.len(),
            annotations = dataset.annotations.len(),
            "loaded annotations"
        );
        Ok(Self::from_dataset(dataset))
    }

    /// Build an index from an already-loaded dataset.
    pub fn from_dataset(dataset: Dataset) -> Self {
        let mut index = MaskIndex {
            dataset,
            anns: HashMap::new(),
            imgs: HashMap::new(),
            img_to_anns: HashMap::new(),
        };
        index.create_index();
        index
    }

    fn create_index(&mut self) {
        // Annotations without an id get a 1-based position id.
        for (i, ann) in self.dataset.annotations.iter_mut().enumerate() {
            if ann.id == 0 {
                ann.id = (i + 1) as u64;
            }
        }

        // Segments are looked up by position so clashing ids never mix images.
        for (i, ann) in self.dataset.annotations.iter().enumerate() {
            if self.anns.contains_key(&ann.id) {
                warn!(ann_id = ann.id, "duplicate annotation id");
            } else {
                self.anns.insert(ann.id, i);
            }
            self.img_to_anns.entry(ann.image_id).or_default().push(i);
        }
        for (i, img) in self.dataset.images.iter().enumerate() {
            self.imgs.insert(img.id, i);
        }
    }

    /// Image IDs known to the index, restricted to `img_ids` when non-empty.
    ///
    /// Images referenced only by annotations are included.
    pub fn get_img_ids(&self, img_ids: &[u64]) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .dataset
            .images
            .iter()
            .map(|img| img.id)
            .chain(self.img_to_anns.keys().copied())
            .filter(|id| img_ids.is_empty() || img_ids.contains(id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn get_img(&self, id: u64) -> Option<&Image> {
        self.imgs.get(&id).map(|&i| &self.dataset.images[i])
    }

    pub fn get_ann(&self, id: u64) -> Option<&Annotation> {
        self.anns.get(&id).map(|&i| &self.dataset.annotations[i])
    }

    /// Annotations on a specific image, in file order.
    pub fn anns_for_img(&self, img_id: u64) -> Vec<&Annotation> {
        self.img_to_anns
            .get(&img_id)
            .map(|idx| idx.iter().map(|&i| &self.dataset.annotations[i]).collect())
            .unwrap_or_default()
    }

    /// Annotation IDs for a specific image, in file order.
    pub fn get_ann_ids_for_img(&self, img_id: u64) -> Vec<u64> {
        self.anns_for_img(img_id).iter().map(|ann| ann.id).collect()
    }

    /// Load annotations by IDs.
    pub fn load_anns(&self, ids: &[u64]) -> Vec<&Annotation> {
        ids.iter().filter_map(|&id| self.get_ann(id)).collect()
    }

    /// Shape recorded for an image: its `height`/`width`, else the first
    /// annotation `size`.
    pub fn shape_for(&self, img_id: u64) -> Option<ImageShape> {
        if let Some(Image {
            height: Some(h),
            width: Some(w),
            ..
        }) = self.get_img(img_id)
        {
            return ImageShape::new(*h as usize, *w as usize).ok();
        }
        self.anns_for_img(img_id)
            .into_iter()
            .find_map(|ann| ann.size)
            .and_then(|[h, w]| ImageShape::new(h as usize, w as usize).ok())
    }

    /// OR every segment of every annotation on `img_id` into one mask.
    ///
    /// `shape` overrides the recorded shape; without either the image is
    /// reported as [`RleMaskError::MissingShape`].
    pub fn decode_image(
        &self,
        img_id: u64,
        shape: Option<ImageShape>,
        options: &DecodeOptions,
    ) -> Result<Mask> {
        if self.get_img(img_id).is_none() && !self.img_to_anns.contains_key(&img_id) {
            return Err(RleMaskError::UnknownImage(img_id));
        }
        let shape = shape
            .or_else(|| self.shape_for(img_id))
            .ok_or(RleMaskError::MissingShape(img_id))?;

        let segments: Vec<&[u32]> = self
            .anns_for_img(img_id)
            .into_iter()
            .flat_map(|ann| ann.segments.iter().map(|s| s.as_slice()))
            .collect();
        debug!(img_id, segments = segments.len(), "decoding image");
        mask::decode_mask(shape, &segments, options)
    }

    /// Decode several images in parallel using their recorded shapes.
    ///
    /// Results come back in the order of `img_ids`.
    pub fn decode_all(&self, img_ids: &[u64], options: &DecodeOptions) -> Vec<(u64, Result<Mask>)> {
        img_ids
            .par_iter()
            .map(|&id| (id, self.decode_image(id, None, options)))
            .collect()
    }
}
