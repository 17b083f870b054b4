// Flattening a stack of layers into one exportable image.
// Anything that can list its visible layers back-to-front can be captured;
// the window toolkit never leaks in here.

use crate::gamma::GammaLut;
use crate::types::{Color, FrameBuffer, Layer};
use image::{DynamicImage, RgbaImage, imageops::FilterType};

/// Largest capture handed out, in pixels (about 1 GiB of RGBA).
const MAX_CAPTURE_PIXELS: u64 = 1 << 28;

/// Something that can be flattened to pixels.
pub trait Scene {
    /// Native size in pixels (width, height).
    fn size(&self) -> (usize, usize);

    /// True when nothing behind the scene can ever show through.
    fn is_opaque(&self) -> bool;

    /// Bring every layer up to date (pending repaints etc.).
    fn flush(&mut self);

    /// Visible layers, back to front.
    fn layers(&self) -> Vec<&Layer>;
}

/// Temporary buffer the layers are composited into during a capture.
/// Dropped on every exit path of [`capture_flattened_image`].
struct CaptureContext {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl CaptureContext {
    fn acquire(width: usize, height: usize) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height, pixels: vec![0u32; width.checked_mul(height)?] })
    }

    fn draw(&mut self, layer: &Layer, lut: &GammaLut) {
        for y in 0..self.height {
            let row = y * self.width;
            for x in 0..self.width {
                let px = &mut self.pixels[row + x];
                *px = lut.over(*px, layer.get(x, y));
            }
        }
    }

    /// Read the composited pixels out as RGBA8.
    fn sample(&self) -> Option<RgbaImage> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for &px in &self.pixels {
            let c = Color::from_argb(px);
            bytes.extend_from_slice(&[c.r, c.g, c.b, c.a]);
        }
        RgbaImage::from_raw(u32::try_from(self.width).ok()?, u32::try_from(self.height).ok()?, bytes)
    }
}

impl Drop for CaptureContext {
    fn drop(&mut self) {
        log::trace!("capture context {}x{} released", self.width, self.height);
    }
}

/// Flatten `scene` into one image, `scale` times its native size.
///
/// Opaque scenes come out as RGB, anything else keeps its alpha channel.
/// If the capture cannot be taken an empty image is returned instead.
pub fn capture_flattened_image<S: Scene + ?Sized>(scene: &mut S, lut: &GammaLut, scale: u32) -> DynamicImage {
    // Never sample a stale frame.
    scene.flush();

    let (width, height) = scene.size();
    let Some(mut ctx) = CaptureContext::acquire(width, height) else {
        log::warn!("scene is {width}x{height}; nothing to capture");
        return DynamicImage::new_rgba8(0, 0);
    };
    for layer in scene.layers() {
        ctx.draw(layer, lut);
    }
    let Some(mut rgba) = ctx.sample() else {
        log::warn!("sampling the capture failed; returning an empty image");
        return DynamicImage::new_rgba8(0, 0);
    };
    drop(ctx);

    let scale = scale.max(1);
    if scale > 1 {
        let (w, h) = rgba.dimensions();
        let scaled = w
            .checked_mul(scale)
            .zip(h.checked_mul(scale))
            .filter(|&(sw, sh)| (sw as u64) * (sh as u64) <= MAX_CAPTURE_PIXELS);
        let Some((sw, sh)) = scaled else {
            log::warn!("{w}x{h} at scale {scale} is too large to capture; returning an empty image");
            return DynamicImage::new_rgba8(0, 0);
        };
        rgba = image::imageops::resize(&rgba, sw, sh, FilterType::Nearest);
    }

    if scene.is_opaque() {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8())
    } else {
        DynamicImage::ImageRgba8(rgba)
    }
}

/// Composite the scene over black into the window framebuffer.
/// Visual: this is the frame you see on screen.
pub fn present_into<S: Scene + ?Sized>(scene: &S, lut: &GammaLut, fb: &mut FrameBuffer) {
    let layers = scene.layers();
    for y in 0..fb.height {
        let row = y * fb.width;
        for x in 0..fb.width {
            let px = layers.iter().fold(0xFF00_0000u32, |acc, layer| lut.over(acc, layer.get(x, y)));
            fb.pixels[row + x] = px & 0x00FF_FFFF;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::CanvasRenderer;
    use crate::stroke::StrokeModel;
    use crate::types::Point;

    struct TestScene {
        background: Layer,
        strokes: Layer,
        flushed: bool,
    }

    impl Scene for TestScene {
        fn size(&self) -> (usize, usize) {
            (self.background.width, self.background.height)
        }
        fn is_opaque(&self) -> bool {
            self.background.is_opaque()
        }
        fn flush(&mut self) {
            self.flushed = true;
        }
        fn layers(&self) -> Vec<&Layer> {
            vec![&self.background, &self.strokes]
        }
    }

    fn gradient(w: usize, h: usize) -> Layer {
        let mut layer = Layer::transparent(w, h);
        for y in 0..h {
            for x in 0..w {
                layer.pixels[y * w + x] = Color::rgb((x * 17) as u8, (y * 29) as u8, 0x40).to_argb();
            }
        }
        layer
    }

    #[test]
    fn no_strokes_reproduces_background() {
        let background = gradient(12, 9);
        let mut scene = TestScene { strokes: Layer::transparent(12, 9), background: background.clone(), flushed: false };
        let image = capture_flattened_image(&mut scene, &GammaLut::new(), 1);
        assert!(scene.flushed);

        let rgb = image.as_rgb8().expect("opaque background exports as RGB");
        assert_eq!(rgb.dimensions(), (12, 9));
        for (x, y, px) in rgb.enumerate_pixels() {
            let c = Color::from_argb(background.get(x as usize, y as usize));
            assert_eq!(px.0, [c.r, c.g, c.b]);
        }
    }

    #[test]
    fn scale_multiplies_size() {
        let mut scene = TestScene {
            background: gradient(4, 3),
            strokes: Layer::transparent(4, 3),
            flushed: false,
        };
        let image = capture_flattened_image(&mut scene, &GammaLut::new(), 2);
        assert_eq!((image.width(), image.height()), (8, 6));
        let rgb = image.to_rgb8();
        assert_eq!(rgb.get_pixel(2, 2), rgb.get_pixel(3, 3));
    }

    #[test]
    fn transparent_background_keeps_alpha() {
        let mut scene = TestScene {
            background: Layer::transparent(5, 5),
            strokes: Layer::transparent(5, 5),
            flushed: false,
        };
        scene.strokes.pixels[0] = Color::RED.to_argb();
        let image = capture_flattened_image(&mut scene, &GammaLut::new(), 1);
        let rgba = image.as_rgba8().expect("transparent scene exports as RGBA");
        assert_eq!(rgba.get_pixel(0, 0).0, [0xFF, 0, 0, 0xFF]);
        assert_eq!(rgba.get_pixel(1, 1).0[3], 0);
    }

    #[test]
    fn overlap_shows_the_newer_stroke() {
        let renderer = CanvasRenderer::new(5.0);
        let mut model = StrokeModel::default();
        model.set_color(Color::RED);
        model.begin_stroke();
        model.extend_active_stroke(Point::new(0.0, 10.0));
        model.extend_active_stroke(Point::new(20.0, 10.0));
        model.set_color(Color::rgb(0, 0, 0xFF));
        model.begin_stroke();
        model.extend_active_stroke(Point::new(10.0, 0.0));
        model.extend_active_stroke(Point::new(10.0, 20.0));

        let mut scene = TestScene {
            background: Layer::filled(20, 20, Color::WHITE),
            strokes: Layer::transparent(20, 20),
            flushed: false,
        };
        renderer.repaint(&mut scene.strokes, &model);
        let image = capture_flattened_image(&mut scene, renderer.lut(), 1).to_rgb8();
        assert_eq!(image.get_pixel(10, 10).0, [0, 0, 0xFF]);
        assert_eq!(image.get_pixel(3, 10).0, [0xFF, 0, 0]);
        assert_eq!(image.get_pixel(3, 3).0, [0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn oversized_scale_gives_placeholder() {
        let mut scene = TestScene {
            background: Layer::filled(4, 3, Color::WHITE),
            strokes: Layer::transparent(4, 3),
            flushed: false,
        };
        let image = capture_flattened_image(&mut scene, &GammaLut::new(), 2_000_000_000);
        assert_eq!((image.width(), image.height()), (0, 0));
        let image = capture_flattened_image(&mut scene, &GammaLut::new(), u32::MAX);
        assert_eq!((image.width(), image.height()), (0, 0));
    }

    #[test]
    fn empty_scene_gives_placeholder() {
        let mut scene = TestScene {
            background: Layer::transparent(0, 0),
            strokes: Layer::transparent(0, 0),
            flushed: false,
        };
        let image = capture_flattened_image(&mut scene, &GammaLut::new(), 1);
        assert_eq!((image.width(), image.height()), (0, 0));
    }

    #[test]
    fn present_drops_alpha() {
        let scene = TestScene {
            background: Layer::filled(2, 2, Color::rgb(1, 2, 3)),
            strokes: Layer::transparent(2, 2),
            flushed: false,
        };
        let mut fb = FrameBuffer::new(2, 2);
        present_into(&scene, &GammaLut::new(), &mut fb);
        assert!(fb.pixels.iter().all(|&p| p == 0x0001_0203));
    }
}
