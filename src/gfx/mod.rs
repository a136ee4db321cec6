//! Drawing façade. Scripts talk to `Gfx`; `Gfx` keeps the current fill and
//! stroke and forwards shapes to whatever `DrawingSurface` the host provides.

pub mod recording;

pub use recording::{DrawCommand, DrawLog, RecordingSurface};

use serde::{Deserialize, Serialize};

use crate::model::{Color, Vector2};

/// A host-registered image. Pixel data stays with the host; scripts only
/// need its name and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    pub width: f64,
    pub height: f64,
}

/// Fill and stroke applied to one shape. A transparent color is still sent
/// to the surface; it just leaves no visible mark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paint {
    pub fill: Color,
    pub stroke: Color,
}

/// External 2D drawing capability.
pub trait DrawingSurface {
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn set_resolution(&mut self, width: f64, height: f64);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, paint: Paint);
    /// Full circle centred on (x, y).
    fn arc(&mut self, x: f64, y: f64, radius: f64, paint: Paint);
    /// Draw `image` with its top-left corner at (x, y).
    fn draw_image(&mut self, image: &Image, x: f64, y: f64);
}

pub struct Gfx {
    surface: Box<dyn DrawingSurface>,
    fill: Color,
    stroke: Color,
}

impl Gfx {
    pub fn new(surface: Box<dyn DrawingSurface>) -> Self {
        Self {
            surface,
            fill: Color::BLACK,
            stroke: Color::BLACK,
        }
    }

    pub fn width(&self) -> f64 {
        self.surface.width()
    }

    pub fn height(&self) -> f64 {
        self.surface.height()
    }

    pub fn set_resolution(&mut self, width: f64, height: f64) {
        self.surface.set_resolution(width.max(0.0), height.max(0.0));
    }

    /// Paint the whole surface with `color`.
    pub fn set_background(&mut self, color: Color) {
        let (w, h) = (self.width(), self.height());
        self.surface.fill_rect(
            0.0,
            0.0,
            w,
            h,
            Paint {
                fill: color,
                stroke: Color::TRANSPARENT,
            },
        );
    }

    pub fn fill(&mut self, color: Color) {
        self.fill = color;
    }

    pub fn stroke(&mut self, color: Color) {
        self.stroke = color;
    }

    pub fn no_fill(&mut self) {
        self.fill = Color::TRANSPARENT;
    }

    pub fn no_stroke(&mut self) {
        self.stroke = Color::TRANSPARENT;
    }

    pub fn paint(&self) -> Paint {
        Paint {
            fill: self.fill,
            stroke: self.stroke,
        }
    }

    pub fn draw_circle(&mut self, center: Vector2, radius: f64) {
        let paint = self.paint();
        self.surface.arc(center.x, center.y, radius.abs(), paint);
    }

    pub fn draw_rect(&mut self, top_left: Vector2, width: f64, height: f64) {
        let paint = self.paint();
        self.surface.fill_rect(top_left.x, top_left.y, width, height, paint);
    }

    /// Draw `image` centred on `center`.
    pub fn draw_image(&mut self, image: &Image, center: Vector2) {
        self.surface.draw_image(
            image,
            center.x - image.width / 2.0,
            center.y - image.height / 2.0,
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gfx() -> (Gfx, DrawLog) {
        let surface = RecordingSurface::new(100.0, 50.0);
        let log = surface.log();
        (Gfx::new(Box::new(surface)), log)
    }

    #[test]
    fn no_fill_still_draws_transparent() {
        let (mut g, log) = gfx();
        g.fill(Color::rgb(255, 0, 0));
        g.no_fill();
        g.draw_circle(Vector2::new(10.0, 10.0), 5.0);
        let cmds = log.take();
        assert_eq!(cmds.len(), 1);
        let DrawCommand::Circle { paint, .. } = cmds.first().unwrap() else {
            unreachable!("expected circle");
        };
        assert!(paint.fill.is_transparent());
    }

    #[test]
    fn default_paint_is_black() {
        let (mut g, log) = gfx();
        g.draw_rect(Vector2::ZERO, 1.0, 1.0);
        let DrawCommand::Rect { paint, .. } = log.take().into_iter().next().unwrap() else {
            unreachable!("expected rect");
        };
        assert_eq!(paint, Paint { fill: Color::BLACK, stroke: Color::BLACK });
    }

    #[test]
    fn background_covers_surface() {
        let (mut g, log) = gfx();
        g.set_background(Color::BLACK);
        assert_eq!(log.take(), vec![DrawCommand::Rect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 50.0,
            paint: Paint { fill: Color::BLACK, stroke: Color::TRANSPARENT },
        }]);
    }

    #[test]
    fn image_is_centred() {
        let (mut g, log) = gfx();
        let img = Image { name: "ship".into(), width: 20.0, height: 10.0 };
        g.draw_image(&img, Vector2::new(50.0, 25.0));
        assert_eq!(log.take(), vec![DrawCommand::Image {
            name: "ship".into(),
            x: 40.0,
            y: 20.0,
            width: 20.0,
            height: 10.0,
        }]);
    }

    #[test]
    fn resolution_changes_size() {
        let (mut g, _log) = gfx();
        g.set_resolution(320.0, 240.0);
        assert!((g.width() - 320.0).abs() < f64::EPSILON);
        assert!((g.height() - 240.0).abs() < f64::EPSILON);
    }
}
