//! Packed-pixel screen buffer with guard lines
//!
//! The buffer holds two planes in one allocation:
//!
//! ```text
//! [ guard lines | main screen | guard lines ][ sub screen ]
//! ```
//!
//! Renderers address pixels by a plane-relative offset (`y * pitch + x`) plus
//! the plane's origin, so switching between main and sub screen rendering is
//! a change of origin and never a per-pixel branch. The guard lines absorb the
//! one-pixel overrun the hires plotters produce at the end of the last line.

use serde::{Deserialize, Serialize};

/// Which of the two screens a renderer writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Main,
    Sub,
}

/// Fixed dimensions of the screen allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenGeometry {
    /// Pixels per buffer line (the real pitch).
    pub width: u32,
    /// Visible lines per plane.
    pub height: u32,
    /// Lines reserved above and below the main plane.
    pub guard_lines: u32,
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self {
            width: 512,
            height: 478,
            guard_lines: 32,
        }
    }
}

impl ScreenGeometry {
    /// Number of pixels in one visible plane.
    #[inline]
    pub fn plane_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn main_region_len(&self) -> usize {
        self.width as usize * (self.height + self.guard_lines * 2) as usize
    }
}

/// Main and sub screen color planes.
#[derive(Debug, Clone)]
pub struct ScreenBuffer {
    geometry: ScreenGeometry,
    pixels: Vec<u16>,
}

impl ScreenBuffer {
    pub fn new(geometry: ScreenGeometry) -> Self {
        Self {
            geometry,
            pixels: vec![0; geometry.main_region_len() + geometry.plane_len()],
        }
    }

    pub fn geometry(&self) -> ScreenGeometry {
        self.geometry
    }

    /// Index of plane offset 0 in [`Self::pixels`].
    #[inline]
    pub fn origin(&self, plane: Plane) -> usize {
        match plane {
            Plane::Main => self.geometry.width as usize * self.geometry.guard_lines as usize,
            Plane::Sub => self.geometry.main_region_len(),
        }
    }

    /// The whole allocation, guard lines included.
    #[inline]
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u16] {
        &mut self.pixels
    }

    /// The visible part of one plane.
    pub fn plane(&self, plane: Plane) -> &[u16] {
        let start = self.origin(plane);
        &self.pixels[start..start + self.geometry.plane_len()]
    }

    /// One visible line of a plane, `width` pixels long.
    pub fn row(&self, plane: Plane, y: u32) -> &[u16] {
        let start = self.origin(plane) + (y * self.geometry.width) as usize;
        &self.pixels[start..start + self.geometry.width as usize]
    }

    /// Read a pixel; `None` outside the visible plane.
    pub fn read(&self, plane: Plane, x: u32, y: u32) -> Option<u16> {
        if x >= self.geometry.width || y >= self.geometry.height {
            return None;
        }
        Some(self.pixels[self.origin(plane) + (y * self.geometry.width + x) as usize])
    }

    /// Fill the visible part of a plane.
    pub fn fill(&mut self, plane: Plane, color: u16) {
        let start = self.origin(plane);
        let len = self.geometry.plane_len();
        self.pixels[start..start + len].fill(color);
    }

    /// Zero everything, guard lines included.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Reallocate for new dimensions; contents are cleared.
    pub fn resize(&mut self, geometry: ScreenGeometry) {
        *self = Self::new(geometry);
    }
}
