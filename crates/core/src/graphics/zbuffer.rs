//! Depth buffer for priority-ordered layer composition
//!
//! Tile hardware does not sort layers by distance; it resolves priority per
//! pixel. Each write carries a test depth and a store depth: the plotters
//! write only when the test depth is strictly greater than the stored one,
//! and then the store depth replaces it. Sprites use different test and store
//! values, backgrounds use the same value for both.
//!
//! The buffer is addressed like the screen: a plane origin plus a
//! plane-relative offset.
//!
//! ```
//! use gfx_core::graphics::{DepthBuffer, Plane};
//!
//! let mut depth = DepthBuffer::new(256, 224);
//! let index = depth.origin(Plane::Sub) + 10 * 256 + 10;
//! depth.as_mut_slice()[index] = 5;
//! assert_eq!(depth.read(Plane::Sub, 10, 10), Some(5));
//! ```

use super::screen::Plane;

/// Per-pixel depth tags for the main and sub screen.
///
/// `0` means nothing has been drawn yet.
pub struct DepthBuffer {
    width: u32,
    height: u32,
    /// Main plane followed by sub plane, row-major
    buffer: Vec<u8>,
}

impl DepthBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width * height) as usize;
        Self {
            width,
            height,
            buffer: vec![0; size * 2],
        }
    }

    /// Reset both planes.
    pub fn clear(&mut self) {
        self.buffer.fill(0);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Index of plane offset 0 in [`Self::as_slice`].
    #[inline]
    pub fn origin(&self, plane: Plane) -> usize {
        match plane {
            Plane::Main => 0,
            Plane::Sub => (self.width * self.height) as usize,
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Read a depth tag; `None` outside the plane.
    pub fn read(&self, plane: Plane, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.buffer
            .get(self.origin(plane) + (y * self.width + x) as usize)
            .copied()
    }

    /// Reallocate for new dimensions; contents are cleared.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }
}

impl Default for DepthBuffer {
    fn default() -> Self {
        Self::new(512, 478)
    }
}
