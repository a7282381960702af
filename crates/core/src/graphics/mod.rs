//! Framebuffer primitives shared by the tile renderers
//!
//! Packed pixel formats, the two-plane screen buffer, and the priority depth
//! buffer that gates every pixel write.

pub mod color;
pub mod screen;
pub mod zbuffer;

pub use color::{ColorOps, PixelFormat, PixelLayout};
pub use screen::{Plane, ScreenBuffer, ScreenGeometry};
pub use zbuffer::DepthBuffer;
