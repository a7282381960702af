//! PPU Renderer - frame-level owner of the SNES drawing state
//!
//! [`SnesRenderer`] owns the screen and depth buffers, the tile cache, the
//! palettes, the Mode 7 registers, the renderer tables and the capture
//! catalog. The scanline composition loop drives it once per frame:
//!
//! ```text
//! begin_frame(interlace)
//!   for each band/layer:
//!       select_tile_renderers(flags, $2130, $2131) -> TileRenderers
//!       context(vram, renderers) -> RenderContext -> draw_tile / draw_backdrop / ...
//! service_reference_screenshot(sink)
//! present() -> Frame
//! ```
//!
//! It also implements the common `gfx_core::renderer::Renderer` trait so
//! presentation code can treat it like any other system renderer.

use gfx_core::graphics::{Plane, ScreenBuffer, ScreenGeometry};
use gfx_core::logging::{log, LogCategory, LogLevel};
use gfx_core::ppu::ScreenPalette;
use gfx_core::renderer::Renderer;
use gfx_core::types::Frame;

use crate::capture::CaptureStore;
use crate::config::RenderConfig;
use crate::context::{Gfx, RenderContext};
use crate::dispatch::{MathMode, RendererFlags, RendererTables, TileRenderers};
use crate::mode7::Mode7State;
use crate::screenshot::{service_reference_screenshot, ReferenceScreenshotSink, ScreenshotOutcome};
use crate::tile_cache::TileCache;
use crate::RenderError;

/// Software SNES renderer (CPU-based tile rendering)
pub struct SnesRenderer {
    config: RenderConfig,
    gfx: Gfx,
    tiles: TileCache,
    capture: CaptureStore,
    palette: ScreenPalette,
    mode7: Mode7State,
    tables: RendererTables,
    visible: (u32, u32),
    framebuffer: Frame,
}

impl SnesRenderer {
    pub fn new(config: RenderConfig) -> Result<Self, RenderError> {
        check_geometry(config.geometry)?;

        let format = config.pixel_format;
        let mut palette = ScreenPalette::new(format);
        palette.set_forced_backdrop(config.forced_backdrop);

        log(LogCategory::Render, LogLevel::Info, || {
            format!(
                "SNES renderer: {:?}, {}x{} (+{} guard lines)",
                format, config.geometry.width, config.geometry.height, config.geometry.guard_lines
            )
        });

        Ok(Self {
            gfx: Gfx::new(config.geometry, format),
            tiles: TileCache::new(),
            capture: CaptureStore::new(config.capture.clone(), format),
            palette,
            mode7: Mode7State::default(),
            tables: RendererTables::new(),
            visible: (config.geometry.width, config.geometry.height),
            framebuffer: Frame::new(0, 0),
            config,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn gfx(&self) -> &Gfx {
        &self.gfx
    }

    pub fn gfx_mut(&mut self) -> &mut Gfx {
        &mut self.gfx
    }

    pub fn palette(&self) -> &ScreenPalette {
        &self.palette
    }

    /// CGRAM and brightness; derived maps rebuild on write.
    pub fn palette_mut(&mut self) -> &mut ScreenPalette {
        &mut self.palette
    }

    pub fn mode7(&self) -> &Mode7State {
        &self.mode7
    }

    pub fn mode7_mut(&mut self) -> &mut Mode7State {
        &mut self.mode7
    }

    pub fn capture(&self) -> &CaptureStore {
        &self.capture
    }

    pub fn capture_mut(&mut self) -> &mut CaptureStore {
        &mut self.capture
    }

    pub fn tile_cache(&self) -> &TileCache {
        &self.tiles
    }

    /// Region of the main screen converted by `present`.
    pub fn set_visible_area(&mut self, width: u32, height: u32) {
        self.visible = (width, height);
    }

    /// Start a new frame: next frame number, stale tile cache, cleared depth.
    pub fn begin_frame(&mut self, interlace: bool) {
        self.gfx.advance_frame();
        self.tiles.invalidate();
        self.gfx.depth_mut().clear();
        self.gfx.set_interlace(interlace);
        log(LogCategory::Render, LogLevel::Trace, || {
            format!("Frame {} (interlace {})", self.gfx.frame(), interlace)
        });
    }

    /// Renderers for the next layer, from CGWSEL ($2130) and CGADSUB ($2131).
    pub fn select_tile_renderers(&self, flags: RendererFlags, cgwsel: u8, cgadsub: u8) -> TileRenderers {
        let mode = MathMode::from_registers(
            cgwsel,
            cgadsub,
            self.config.transparency,
            self.palette.brightness(),
        );
        self.tables.select(flags, mode)
    }

    /// Draw context over this frame's state and `vram`.
    pub fn context<'a>(
        &'a mut self,
        vram: &'a [u8],
        renderers: TileRenderers,
    ) -> Result<RenderContext<'a>, RenderError> {
        let ctx = RenderContext::new(
            &mut self.gfx,
            &mut self.tiles,
            &self.palette,
            &self.mode7,
            vram,
            renderers,
        )?;
        Ok(if self.capture.is_enabled() {
            ctx.with_capture(&mut self.capture)
        } else {
            ctx
        })
    }

    /// Pass the finished frame to `sink` if the catalog asked for a screenshot.
    pub fn service_reference_screenshot<S: ReferenceScreenshotSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> ScreenshotOutcome {
        if !self.capture.reference_screenshot_requested() {
            return ScreenshotOutcome::Idle;
        }
        self.refresh_framebuffer();
        service_reference_screenshot(&mut self.capture, &self.framebuffer, sink)
    }

    fn refresh_framebuffer(&mut self) {
        let (width, height) = self.visible;
        self.framebuffer = Frame::from_plane(
            self.gfx.screen(),
            Plane::Main,
            self.gfx.format(),
            width,
            height,
        );
    }
}

fn check_geometry(geometry: ScreenGeometry) -> Result<(), RenderError> {
    if geometry.width < 256 || geometry.height == 0 {
        return Err(RenderError::InvalidGeometry {
            width: geometry.width,
            height: geometry.height,
        });
    }
    Ok(())
}

impl Renderer for SnesRenderer {
    fn screen(&self) -> &ScreenBuffer {
        self.gfx.screen()
    }

    fn present(&mut self) -> &Frame {
        self.refresh_framebuffer();
        &self.framebuffer
    }

    fn clear(&mut self, color: u16) {
        self.gfx.screen_mut().fill(Plane::Main, color);
    }

    fn reset(&mut self) {
        self.gfx.screen_mut().clear();
        self.gfx.depth_mut().clear();
        self.tiles.invalidate();
    }

    fn name(&self) -> &str {
        "SNES Software Renderer"
    }

    fn resize(&mut self, geometry: ScreenGeometry) {
        if let Err(e) = check_geometry(geometry) {
            log(LogCategory::Render, LogLevel::Error, || format!("Resize rejected: {}", e));
            return;
        }
        self.gfx.resize(geometry);
        self.visible = (geometry.width, geometry.height);
        self.config.geometry = geometry;
    }
}
