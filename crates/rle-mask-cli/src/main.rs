use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use image::{DynamicImage, RgbImage};
use rle_mask::{DecodeOptions, ImageShape, Mask, MaskIndex};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rle-mask", version)]
#[command(about = "Decode run-length encoded segmentation masks and render them as PNG")]
struct Cli {
    /// Path to the annotations JSON file
    #[arg(long)]
    annotations: PathBuf,

    /// Directory the rendered masks are written to
    #[arg(long)]
    out_dir: PathBuf,

    /// Directory holding the reference images named by each image's `file_name`
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Only render these image IDs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    img_ids: Option<Vec<u64>>,

    /// Also write the mask blended over the reference image
    #[arg(long)]
    overlay: bool,

    /// Overlay opacity between 0 and 1
    #[arg(long, default_value_t = 0.5)]
    alpha: f32,

    /// Accept segments whose run lengths do not sum to height * width
    #[arg(long)]
    lenient: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    if !(0.0..=1.0).contains(&cli.alpha) {
        error!(alpha = cli.alpha, "alpha must be between 0 and 1");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            error!(failed, "some images could not be rendered");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Render every selected image; returns how many failed.
fn run(cli: &Cli) -> Result<usize, Box<dyn std::error::Error>> {
    let index = MaskIndex::new(&cli.annotations)?;
    std::fs::create_dir_all(&cli.out_dir)?;

    let options = if cli.lenient {
        DecodeOptions::lenient()
    } else {
        DecodeOptions::strict()
    };
    let filter = cli.img_ids.clone().unwrap_or_default();
    let img_ids = index.get_img_ids(&filter);
    for missing in filter.iter().filter(|id| !img_ids.contains(id)) {
        warn!("image {missing} not found in {}", cli.annotations.display());
    }

    let mut failed = 0;
    for img_id in img_ids {
        if let Err(e) = render_image(cli, &index, img_id, &options) {
            error!(img_id, "{e}");
            failed += 1;
        }
    }
    Ok(failed)
}

fn render_image(
    cli: &Cli,
    index: &MaskIndex,
    img_id: u64,
    options: &DecodeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let reference = reference_path(cli, index, img_id);
    let shape = match (index.shape_for(img_id), &reference) {
        (Some(shape), _) => Some(shape),
        (None, Some(path)) => {
            let (w, h) = image::image_dimensions(path)?;
            Some(ImageShape::from_dims(&[h as usize, w as usize])?)
        }
        (None, None) => None,
    };

    let mask = index.decode_image(img_id, shape, options)?;
    let mask_path = cli.out_dir.join(format!("{img_id}_mask.png"));
    mask.to_luma8().save(&mask_path)?;
    info!(img_id, path = %mask_path.display(), "wrote mask");

    if cli.overlay {
        match &reference {
            Some(path) => {
                let blended = overlay(&image::open(path)?, &mask, cli.alpha);
                let overlay_path = cli.out_dir.join(format!("{img_id}_overlay.png"));
                blended.save(&overlay_path)?;
                info!(img_id, path = %overlay_path.display(), "wrote overlay");
            }
            None => warn!(img_id, "no reference image, skipping overlay"),
        }
    }

    let bbox = mask.bbox();
    println!(
        "{} area={} bbox=[{}, {}, {}, {}]",
        img_id,
        mask.area(),
        bbox[0],
        bbox[1],
        bbox[2],
        bbox[3]
    );
    Ok(())
}

fn reference_path(cli: &Cli, index: &MaskIndex, img_id: u64) -> Option<PathBuf> {
    let dir = cli.image_dir.as_deref()?;
    let img = index.get_img(img_id)?;
    if img.file_name.is_empty() {
        return None;
    }
    Some(Path::new(dir).join(&img.file_name))
}

/// Blend set mask pixels toward red by `alpha`.
fn overlay(reference: &DynamicImage, mask: &Mask, alpha: f32) -> RgbImage {
    let mut rgb = reference.to_rgb8();
    if (rgb.height() as usize, rgb.width() as usize) != (mask.height(), mask.width()) {
        warn!(
            image_height = rgb.height(),
            image_width = rgb.width(),
            mask_height = mask.height(),
            mask_width = mask.width(),
            "reference image and mask differ in size"
        );
    }
    for (x, y, px) in rgb.enumerate_pixels_mut() {
        if mask.get(y as usize, x as usize) != Some(1.0) {
            continue;
        }
        for (c, target) in px.0.iter_mut().zip([255.0f32, 0.0, 0.0]) {
            *c = ((1.0 - alpha) * *c as f32 + alpha * target).round() as u8;
        }
    }
    rgb
}
