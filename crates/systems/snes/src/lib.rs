//! SNES (Super Nintendo Entertainment System) PPU pixel pipeline.
//!
//! This crate draws SNES backgrounds and sprites into packed screen buffers
//! and catalogs every tile it draws. The scanline composition loop (deciding
//! *what* to draw, window masks, priorities) lives with the emulator; this
//! crate provides the drawing primitives it calls:
//!
//! - **ColorMath**: packed-pixel add/sub/brightness blends ([`color_math`])
//! - **PixelPlotter**: depth-tested pixel writes in five addressing modes ([`plotter`])
//! - **TileCache**: per-frame lazy tile decoding and palette selection ([`tile_cache`])
//! - **TileRenderer**: plain/clipped/mosaic tiles and backdrop fills ([`tile_renderer`])
//!   plus the Mode 7 affine layers ([`mode7`])
//! - **RendererDispatch**: per-layer selection of monomorphic renderers ([`dispatch`])
//! - **CaptureStore**: the content-addressed tile and palette catalog ([`capture`])
//!
//! [`SnesRenderer`] owns all frame state and hands out a [`RenderContext`]
//! for drawing.

pub mod capture;
pub mod color_math;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod mode7;
pub mod names;
pub mod plotter;
pub mod ppu_renderer;
pub mod screenshot;
pub mod tile_cache;
pub mod tile_renderer;

pub use capture::{CaptureConfig, CaptureStore, CaptureSummary};
pub use config::RenderConfig;
pub use context::{Gfx, RenderContext};
pub use dispatch::{MathMode, RenderSet, RendererFlags, TileRenderers};
pub use ppu_renderer::SnesRenderer;
pub use screenshot::{ReferenceScreenshotSink, ScreenshotOutcome};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("VRAM must be 64 KiB, got {0} bytes")]
    VramSize(usize),
    #[error("Unknown math mode index: {0}")]
    UnknownMathMode(usize),
    #[error("Unsupported tile bit depth: {0}")]
    InvalidBitDepth(u8),
    #[error("Invalid screen geometry {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum ScreenshotError {
    #[error("Screenshot sink failed: {0}")]
    Sink(String),
}
