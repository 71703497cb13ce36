//! Rectangular screen areas used to restrict scanning

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SearchRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from top-left and bottom-right corners (bottom-right exclusive)
    pub fn from_corners(top_left: (u32, u32), bottom_right: (u32, u32)) -> Self {
        let (x0, y0) = top_left;
        let (x1, y1) = bottom_right;
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: x1.abs_diff(x0),
            height: y1.abs_diff(y0),
        }
    }

    /// Clip region to screen boundaries
    pub fn clip_to(mut self, screen_width: u32, screen_height: u32) -> SearchRegion {
        self.x = self.x.min(screen_width);
        self.y = self.y.min(screen_height);
        self.width = self.width.min(screen_width - self.x);
        self.height = self.height.min(screen_height - self.y);
        self
    }

    /// Check if this region is valid (non-zero dimensions)
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}
