//! Core graphics primitives shared by tile-based renderers.
//!
//! - [`graphics`]: packed pixel formats, the two-plane screen buffer and the
//!   priority depth buffer
//! - [`ppu`]: bitplane tile decoders and brightness-scaled palettes
//! - [`renderer`]: the presentation-facing renderer trait
//! - [`logging`]: rate-limited, per-category logging

pub mod graphics;
pub mod logging;
pub mod ppu;
pub mod renderer;

pub mod types {
    use serde::{Deserialize, Serialize};

    use crate::graphics::{PixelFormat, Plane, ScreenBuffer};

    /// ARGB8888 image handed to presentation and capture collaborators.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; (width * height) as usize],
            }
        }

        /// Convert the top-left `width` x `height` region of a screen plane.
        ///
        /// The region is clamped to the plane's geometry.
        pub fn from_plane(
            screen: &ScreenBuffer,
            plane: Plane,
            format: PixelFormat,
            width: u32,
            height: u32,
        ) -> Self {
            let geometry = screen.geometry();
            let width = width.min(geometry.width);
            let height = height.min(geometry.height);
            let mut frame = Self::new(width, height);
            for y in 0..height {
                let row = screen.row(plane, y);
                let out = &mut frame.pixels[(y * width) as usize..((y + 1) * width) as usize];
                for (dst, &src) in out.iter_mut().zip(row) {
                    *dst = format.to_argb(src);
                }
            }
            frame
        }
    }
}
