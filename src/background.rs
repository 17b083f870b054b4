// The picture we draw on top of.
// Visual: the image covers the whole canvas (aspect-fill, centered crop),
// exactly like a photo filling the screen behind the ink.

use crate::error::Error;
use crate::types::{Color, Layer};
use image::{DynamicImage, imageops::FilterType};
use std::path::Path;

/// Open and decode `path`, then fit it to `width x height`.
pub fn load(path: &Path, width: usize, height: usize) -> Result<Layer, Error> {
    let img = image::open(path)?;
    log::info!("background {} is {}x{}", path.display(), img.width(), img.height());
    Ok(fill(&img, width, height))
}

/// Scale `img` so it covers the whole area, cropping whatever sticks out.
/// Alpha is kept so a transparent picture stays transparent in the export.
pub fn fill(img: &DynamicImage, width: usize, height: usize) -> Layer {
    if width == 0 || height == 0 {
        return Layer::transparent(width, height);
    }
    let fitted = img
        .resize_to_fill(width as u32, height as u32, FilterType::Triangle)
        .to_rgba8();

    let mut layer = Layer::transparent(width, height);
    for (x, y, px) in fitted.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        layer.pixels[y as usize * width + x as usize] = Color { r, g, b, a }.to_argb();
    }
    layer
}

/// Plain backdrop used when no picture was given.
pub fn solid(width: usize, height: usize, color: Color) -> Layer {
    Layer::filled(width, height, color)
}
