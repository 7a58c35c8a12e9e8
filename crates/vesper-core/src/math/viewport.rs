// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Viewports and pixel rectangles.
//!
//! Recorded render passes describe their viewport in normalised target
//! coordinates (`0.0..=1.0` on both axes). The executor scales them by the
//! size of whatever target is bound when the pass runs, producing a [`Rect`]
//! in pixels.

use serde::Deserialize;

/// A two-dimensional extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct Extent2D {
    /// The width in pixels.
    pub width: u32,
    /// The height in pixels.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A viewport in normalised target coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge, as a fraction of the target width.
    pub x: f32,
    /// Top edge, as a fraction of the target height.
    pub y: f32,
    /// Width, as a fraction of the target width.
    pub width: f32,
    /// Height, as a fraction of the target height.
    pub height: f32,
}

impl Viewport {
    /// The viewport covering the whole target.
    pub const FULL: Self = Self::new(0.0, 0.0, 1.0, 1.0);

    /// Creates a new normalised viewport.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Scales this viewport by the size of a target, rounding to whole pixels.
    pub fn scaled(&self, size: Extent2D) -> Rect {
        let w = size.width as f32;
        let h = size.height as f32;
        Rect {
            x: (self.x * w).round() as u32,
            y: (self.y * h).round() as u32,
            width: (self.width * w).round() as u32,
            height: (self.height * h).round() as u32,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::FULL
    }
}

/// A rectangle in pixels, as handed to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Creates a rectangle anchored at the origin covering `size`.
    pub const fn from_extent(size: Extent2D) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_viewport_covers_target() {
        let size = Extent2D::new(640, 480);
        assert_eq!(Viewport::FULL.scaled(size), Rect::from_extent(size));
    }

    #[test]
    fn test_partial_viewport_scales_per_axis() {
        let rect = Viewport::new(0.5, 0.25, 0.5, 0.5).scaled(Extent2D::new(200, 100));
        assert_eq!(
            rect,
            Rect {
                x: 100,
                y: 25,
                width: 100,
                height: 50
            }
        );
    }
}
