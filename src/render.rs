// Software stroke painter.
// Visual: every stroke becomes a round-capped, round-joined polyline of a fixed
// width, painted oldest first so newer strokes sit on top.

use crate::gamma::GammaLut;
use crate::stroke::{Stroke, StrokeModel};
use crate::types::{Layer, Point};
use std::rc::Rc;

pub const DEFAULT_STROKE_WIDTH: f32 = 5.0;

/// Exclusive access to a layer for the duration of one repaint.
/// Dropping it ends the repaint; it cannot outlive the borrow it came from.
pub struct Surface<'a> {
    layer: &'a mut Layer,
}

impl<'a> Surface<'a> {
    /// `None` when the layer has no drawable area (e.g. a minimized window).
    pub fn acquire(layer: &'a mut Layer) -> Option<Self> {
        if layer.width == 0 || layer.height == 0 || layer.pixels.len() != layer.width * layer.height {
            return None;
        }
        Some(Self { layer })
    }

    pub fn width(&self) -> usize {
        self.layer.width
    }

    pub fn height(&self) -> usize {
        self.layer.height
    }

    /// Wipe to fully transparent.
    pub fn clear(&mut self) {
        self.layer.pixels.fill(0);
    }

    #[inline]
    fn blend(&mut self, x: usize, y: usize, color: u32, coverage: f32, lut: &GammaLut) {
        let idx = y * self.layer.width + x;
        self.layer.pixels[idx] = lut.over_with_coverage(self.layer.pixels[idx], color, coverage);
    }
}

pub struct CanvasRenderer {
    stroke_width: f32,
    lut: Rc<GammaLut>,
}

impl CanvasRenderer {
    pub fn new(stroke_width: f32) -> Self {
        let stroke_width = if stroke_width.is_finite() && stroke_width > 0.0 {
            stroke_width
        } else {
            log::warn!("stroke width {stroke_width} is unusable, using {DEFAULT_STROKE_WIDTH}");
            DEFAULT_STROKE_WIDTH
        };
        Self { stroke_width, lut: Rc::new(GammaLut::new()) }
    }

    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }

    pub fn lut(&self) -> &GammaLut {
        &self.lut
    }

    /// The same tables, for compositing done outside the renderer.
    pub fn shared_lut(&self) -> Rc<GammaLut> {
        Rc::clone(&self.lut)
    }

    /// Clear `layer` and paint every stroke of `model` into it, in order.
    /// Returns false when no surface could be acquired and the frame was skipped.
    pub fn repaint(&self, layer: &mut Layer, model: &StrokeModel) -> bool {
        let Some(mut surface) = Surface::acquire(layer) else {
            log::debug!("no drawable surface; skipping repaint");
            return false;
        };
        surface.clear();
        for stroke in model.strokes() {
            self.paint_stroke(&mut surface, stroke);
        }
        true
    }

    /// Rasterize one stroke as a single path, then composite it.
    /// Coverage is the max over its segments, so a stroke crossing itself
    /// is not blended twice.
    fn paint_stroke(&self, surface: &mut Surface<'_>, stroke: &Stroke) {
        let points = stroke.points();
        let Some(first) = points.first() else { return };
        let half = self.stroke_width * 0.5;
        // Anti-aliasing ramp is one pixel wide, centered on the edge.
        let reach = half + 0.5;

        let Some(area) = Area::around(points, reach, surface.width(), surface.height()) else {
            return;
        };
        let mut coverage = vec![0.0f32; area.width() * area.height()];

        if points.len() == 1 {
            // Degenerate stroke: a round dot.
            area.accumulate(&mut coverage, *first, *first, reach);
        } else {
            for seg in points.windows(2) {
                area.accumulate(&mut coverage, seg[0], seg[1], reach);
            }
        }

        let color = stroke.color().to_argb();
        for (row, y) in (area.y0..area.y1).enumerate() {
            for (col, x) in (area.x0..area.x1).enumerate() {
                let c = coverage[row * area.width() + col];
                if c > 0.0 {
                    surface.blend(x, y, color, c, &self.lut);
                }
            }
        }
    }
}

/// Pixel rectangle `[x0, x1) x [y0, y1)` a stroke can touch, clipped to the surface.
struct Area {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

impl Area {
    fn around(points: &[Point], reach: f32, width: usize, height: usize) -> Option<Self> {
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let clip = |v: f32, limit: usize| v.clamp(0.0, limit as f32) as usize;
        let area = Self {
            x0: clip((min_x - reach).floor(), width),
            y0: clip((min_y - reach).floor(), height),
            x1: clip((max_x + reach).ceil() + 1.0, width),
            y1: clip((max_y + reach).ceil() + 1.0, height),
        };
        (area.x0 < area.x1 && area.y0 < area.y1).then_some(area)
    }

    fn width(&self) -> usize {
        self.x1 - self.x0
    }

    fn height(&self) -> usize {
        self.y1 - self.y0
    }

    /// Max-in the coverage of the capsule around segment `a -> b`.
    fn accumulate(&self, coverage: &mut [f32], a: Point, b: Point, reach: f32) {
        let fx0 = (a.x.min(b.x) - reach).floor().max(self.x0 as f32) as usize;
        let fy0 = (a.y.min(b.y) - reach).floor().max(self.y0 as f32) as usize;
        let fx1 = ((a.x.max(b.x) + reach).ceil() + 1.0).min(self.x1 as f32) as usize;
        let fy1 = ((a.y.max(b.y) + reach).ceil() + 1.0).min(self.y1 as f32) as usize;

        for y in fy0..fy1 {
            for x in fx0..fx1 {
                // Sample at the pixel center.
                let d = distance_to_segment(Point::new(x as f32 + 0.5, y as f32 + 0.5), a, b);
                let c = (reach - d).clamp(0.0, 1.0);
                let slot = &mut coverage[(y - self.y0) * self.width() + (x - self.x0)];
                if c > *slot {
                    *slot = c;
                }
            }
        }
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let len2 = abx * abx + aby * aby;
    let t = if len2 <= f32::EPSILON {
        0.0
    } else {
        (((p.x - a.x) * abx + (p.y - a.y) * aby) / len2).clamp(0.0, 1.0)
    };
    let (qx, qy) = (a.x + t * abx, a.y + t * aby);
    ((p.x - qx).powi(2) + (p.y - qy).powi(2)).sqrt()
}
