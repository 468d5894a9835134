use std::path::PathBuf;

use rle_mask::{Dataset, DecodeOptions, ImageShape, MaskIndex, RleMaskError};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[test]
fn test_load_annotations() {
    let index = MaskIndex::new(&fixtures_dir().join("annotations.json")).expect("Failed to load");
    assert_eq!(index.dataset.images.len(), 3);
    assert_eq!(index.dataset.annotations.len(), 5);
    assert_eq!(index.get_ann_ids_for_img(1), vec![1, 2]);
    assert!(index.get_ann_ids_for_img(99).is_empty());
    // Image 4 only appears in annotations.
    assert_eq!(index.get_img_ids(&[]), vec![1, 2, 3, 4]);
    assert_eq!(index.get_img_ids(&[2, 4, 7]), vec![2, 4]);
}

#[test]
fn test_load_bare_array() {
    let index =
        MaskIndex::new(&fixtures_dir().join("bare_annotations.json")).expect("Failed to load");
    assert!(index.dataset.images.is_empty());
    assert_eq!(index.get_img_ids(&[]), vec![10, 11]);
    // Missing ids are assigned by position.
    assert_eq!(index.get_ann_ids_for_img(10), vec![1, 2]);
}

#[test]
fn test_shape_resolution() {
    let index = MaskIndex::new(&fixtures_dir().join("annotations.json")).expect("Failed to load");
    assert_eq!(index.shape_for(1), Some(ImageShape::new(3, 4).unwrap()));
    assert_eq!(index.shape_for(2), Some(ImageShape::new(2, 2).unwrap()));
    assert_eq!(index.shape_for(3), None);
}

#[test]
fn test_decode_image_unions_annotations() {
    let index = MaskIndex::new(&fixtures_dir().join("annotations.json")).expect("Failed to load");
    let mask = index
        .decode_image(1, None, &DecodeOptions::default())
        .expect("decode image 1");

    assert_eq!(mask.shape(), ImageShape::new(3, 4).unwrap());
    assert_eq!(mask.area(), 6);
    // First annotation fills column 1.
    for row in 0..3 {
        assert_eq!(mask.get(row, 1), Some(1.0));
    }
    // Second annotation: row 2 of column 2, rows 0-1 of column 3.
    assert_eq!(mask.get(2, 2), Some(1.0));
    assert_eq!(mask.get(0, 3), Some(1.0));
    assert_eq!(mask.get(1, 3), Some(1.0));
    assert_eq!(mask.get(2, 3), Some(0.0));
}

#[test]
fn test_decode_image_shape_errors() {
    let index = MaskIndex::new(&fixtures_dir().join("annotations.json")).expect("Failed to load");
    let opts = DecodeOptions::default();

    assert!(matches!(
        index.decode_image(3, None, &opts),
        Err(RleMaskError::MissingShape(3))
    ));
    let mask = index
        .decode_image(3, Some(ImageShape::new(2, 2).unwrap()), &opts)
        .expect("explicit shape");
    assert_eq!(mask.area(), 0);

    assert!(matches!(
        index.decode_image(42, None, &opts),
        Err(RleMaskError::UnknownImage(42))
    ));
}

#[test]
fn test_decode_all_keeps_order_and_policy() {
    let index =
        MaskIndex::new(&fixtures_dir().join("bare_annotations.json")).expect("Failed to load");

    let strict = index.decode_all(&[11, 10], &DecodeOptions::strict());
    assert_eq!(strict[0].0, 11);
    assert!(matches!(
        strict[0].1,
        Err(RleMaskError::MalformedSegment {
            sum: 10,
            expected: 4,
            ..
        })
    ));
    assert_eq!(strict[1].0, 10);
    let mask = strict[1].1.as_ref().expect("image 10 is well formed");
    // Column 0 from the first annotation, column 2 from the second.
    assert_eq!(mask.area(), 4);
    assert_eq!(mask.bbox(), [0.0, 0.0, 3.0, 2.0]);
    assert_eq!(mask.get(0, 1), Some(0.0));

    let lenient = index.decode_all(&[11], &DecodeOptions::lenient());
    let mask = lenient[0].1.as_ref().expect("lenient decode");
    assert_eq!(mask.area(), 3);
    assert_eq!(mask.get(0, 0), Some(0.0));
}

fn index_from_json(value: serde_json::Value) -> MaskIndex {
    let dataset: Dataset = serde_json::from_value(value).expect("valid dataset");
    MaskIndex::from_dataset(dataset)
}

#[test]
fn test_assigned_id_clashing_with_explicit_id() {
    // The first annotation is assigned id 1, which the second one also carries.
    let index = index_from_json(serde_json::json!({
        "annotations": [
            {"image_id": 1, "size": [2, 2], "segments": [[0, 2, 2]]},
            {"id": 1, "image_id": 1, "size": [2, 2], "segments": [[2, 2]]}
        ]
    }));
    assert_eq!(index.anns_for_img(1).len(), 2);

    let mask = index
        .decode_image(1, None, &DecodeOptions::default())
        .expect("decode image 1");
    assert_eq!(mask.area(), 4);
}

#[test]
fn test_duplicate_ids_across_images() {
    let index = index_from_json(serde_json::json!({
        "annotations": [
            {"id": 7, "image_id": 1, "size": [2, 2], "segments": [[0, 2, 2]]},
            {"id": 7, "image_id": 2, "size": [2, 2], "segments": [[4]]}
        ]
    }));
    let opts = DecodeOptions::default();

    let one = index.decode_image(1, None, &opts).expect("decode image 1");
    assert_eq!(one.area(), 2);
    assert_eq!(one.get(0, 0), Some(1.0));
    assert_eq!(one.get(1, 0), Some(1.0));

    let two = index.decode_image(2, None, &opts).expect("decode image 2");
    assert_eq!(two.area(), 0);
}

#[test]
fn test_bare_array_reports_field_error() {
    let err = MaskIndex::new(&fixtures_dir().join("bare_negative_run.json"))
        .err()
        .expect("negative run must fail to load");
    let msg = err.to_string();
    assert!(matches!(err, RleMaskError::Json(_)));
    assert!(!msg.contains("Dataset"), "got: {msg}");
    assert!(msg.contains("-3"), "got: {msg}");
}
