//! Reusable tile-hardware building blocks.
//!
//! Bitplane tile decoders and brightness-scaled palettes. The system crates
//! combine these with their own addressing and blending rules.

pub mod palette;
pub mod tile;

pub use palette::{ColorMap, ScreenPalette, MUL_BRIGHTNESS, PALETTE_SIZE};
pub use tile::{get_decoder, TileDecoder, TileFormat, VRAM_SIZE};
