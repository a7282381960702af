//! Common renderer trait for tile-based video pipelines
//!
//! A renderer owns a packed [`ScreenBuffer`] that its per-system drawing code
//! fills scanline by scanline. Presentation collaborators (a window, a movie
//! writer, a screenshot sink) never read the packed buffer directly; they ask
//! the renderer to `present` it as an ARGB [`Frame`] once a frame completes.
//!
//! ```text
//! composition loop -> system renderer (ScreenBuffer) -> present() -> Frame
//! ```
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use gfx_core::renderer::Renderer;
//!
//! fn show(renderer: &mut impl Renderer) {
//!     let frame = renderer.present();
//!     println!("{}: {}x{}", renderer.name(), frame.width, frame.height);
//! }
//! ```

use crate::graphics::{ScreenBuffer, ScreenGeometry};
use crate::types::Frame;

/// Common renderer trait for tile-based graphics systems
pub trait Renderer: Send {
    /// The packed screen as it stands (read-only)
    fn screen(&self) -> &ScreenBuffer;

    /// Convert the visible main screen into a presentation frame
    fn present(&mut self) -> &Frame;

    /// Fill the visible main screen with one packed color
    fn clear(&mut self, color: u16);

    /// Reset the renderer to its initial state
    ///
    /// Clears the screen and depth buffers and drops any per-frame caches.
    fn reset(&mut self);

    /// Get the name of this renderer (for debugging/UI)
    fn name(&self) -> &str;

    /// Reallocate every resolution-dependent buffer
    fn resize(&mut self, geometry: ScreenGeometry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{PixelFormat, Plane};

    struct MockRenderer {
        screen: ScreenBuffer,
        frame: Frame,
    }

    impl MockRenderer {
        fn new(geometry: ScreenGeometry) -> Self {
            Self {
                screen: ScreenBuffer::new(geometry),
                frame: Frame::new(0, 0),
            }
        }
    }

    impl Renderer for MockRenderer {
        fn screen(&self) -> &ScreenBuffer {
            &self.screen
        }

        fn present(&mut self) -> &Frame {
            let g = self.screen.geometry();
            self.frame = Frame::from_plane(&self.screen, Plane::Main, PixelFormat::Rgb555, g.width, g.height);
            &self.frame
        }

        fn clear(&mut self, color: u16) {
            self.screen.fill(Plane::Main, color);
        }

        fn reset(&mut self) {
            self.screen.clear();
        }

        fn resize(&mut self, geometry: ScreenGeometry) {
            self.screen.resize(geometry);
        }

        fn name(&self) -> &str {
            "Mock Renderer"
        }
    }

    fn geometry() -> ScreenGeometry {
        ScreenGeometry {
            width: 256,
            height: 224,
            guard_lines: 8,
        }
    }

    #[test]
    fn test_renderer_present() {
        let mut renderer = MockRenderer::new(geometry());
        renderer.clear(0x7C00); // Red in 555
        assert_eq!(renderer.name(), "Mock Renderer");

        let frame = renderer.present();
        assert_eq!(frame.width, 256);
        assert_eq!(frame.height, 224);
        assert!(frame.pixels.iter().all(|&p| p == 0xFFFF0000));
    }

    #[test]
    fn test_renderer_reset() {
        let mut renderer = MockRenderer::new(geometry());
        renderer.clear(0x7C00);
        renderer.reset();
        assert!(renderer.screen().plane(Plane::Main).iter().all(|&p| p == 0));
    }

    #[test]
    fn test_renderer_resize() {
        let mut renderer = MockRenderer::new(geometry());
        renderer.resize(ScreenGeometry::default());
        let frame = renderer.present();
        assert_eq!(frame.width, 512);
        assert_eq!(frame.height, 478);
        assert_eq!(frame.pixels.len(), 512 * 478);
    }
}
