use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use super::{DrawingSurface, Image, Paint};

/// One call that reached the surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    SetResolution {
        width: f64,
        height: f64,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        paint: Paint,
    },
    Circle {
        x: f64,
        y: f64,
        radius: f64,
        paint: Paint,
    },
    Image {
        name: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

/// Shared handle to the commands a `RecordingSurface` has captured.
#[derive(Debug, Clone, Default)]
pub struct DrawLog(Rc<RefCell<Vec<DrawCommand>>>);

impl DrawLog {
    fn push(&self, cmd: DrawCommand) {
        self.0.borrow_mut().push(cmd);
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<DrawCommand> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn snapshot(&self) -> Vec<DrawCommand> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Headless surface that records every draw call.
#[derive(Debug)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    log: DrawLog,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            log: DrawLog::default(),
        }
    }

    pub fn log(&self) -> DrawLog {
        self.log.clone()
    }
}

impl DrawingSurface for RecordingSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn set_resolution(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.log.push(DrawCommand::SetResolution { width, height });
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, paint: Paint) {
        self.log.push(DrawCommand::Rect {
            x,
            y,
            width,
            height,
            paint,
        });
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, paint: Paint) {
        self.log.push(DrawCommand::Circle { x, y, radius, paint });
    }

    fn draw_image(&mut self, image: &Image, x: f64, y: f64) {
        self.log.push(DrawCommand::Image {
            name: image.name.clone(),
            x,
            y,
            width: image.width,
            height: image.height,
        });
    }
}
