//! Render state shared by the tile renderers and pixel plotters.
//!
//! [`Gfx`] owns everything the per-pixel path writes: the screen and depth
//! buffers, the color math operands, the depth pair for the current layer and
//! the line range being drawn. A [`RenderContext`] borrows a `Gfx` together
//! with the frame's read-only inputs (video memory, palettes, Mode 7 state)
//! and the tile cache, and is what every draw function receives.
//!
//! Offsets passed to the plotters are relative to the target plane
//! (`y * ppl + x`). Switching between the main and sub screen only moves the
//! plane origins, so the plotters never branch on the target.

use gfx_core::graphics::{DepthBuffer, PixelFormat, Plane, ScreenBuffer, ScreenGeometry};
use gfx_core::ppu::{ScreenPalette, VRAM_SIZE};

use crate::capture::CaptureStore;
use crate::color_math::ColorMath;
use crate::dispatch::{RenderSet, TileRenderers};
use crate::mode7::{Mode7Args, Mode7State};
use crate::tile_cache::{BgState, TileCache};
use crate::tile_renderer::{BackdropArgs, ClippedTileArgs, MosaicPixelArgs, TileArgs};
use crate::RenderError;

/// Palette pair a plotter draws with.
///
/// `screen` is what normal pixels use; it is the black map while color
/// clipping is active. `real` is never clipped and feeds the hires sub
/// pixel blend.
#[derive(Debug, Clone, Copy)]
pub struct ActivePalette<'a> {
    pub screen: &'a [u16],
    pub real: &'a [u16],
}

impl<'a> ActivePalette<'a> {
    pub fn new(colors: &'a [u16]) -> Self {
        Self {
            screen: colors,
            real: colors,
        }
    }

    /// `real`, with `black` substituted on screen when clipping.
    #[inline]
    pub fn clipped(real: &'a [u16], black: &'a [u16], clip_colors: bool) -> Self {
        Self {
            screen: if clip_colors { black } else { real },
            real,
        }
    }
}

/// Framebuffers and per-layer drawing state.
pub struct Gfx {
    screen: ScreenBuffer,
    depth: DepthBuffer,
    pub math: ColorMath,
    /// Draw when `z1` is greater than the stored depth.
    pub z1: u8,
    /// Depth stored for drawn pixels.
    pub z2: u8,
    /// First line of the current band.
    pub start_y: u32,
    /// Last line of the current band, inclusive.
    pub end_y: u32,
    real_ppl: u32,
    ppl: u32,
    target: Plane,
    color_origin: usize,
    depth_origin: usize,
    sub_color_origin: usize,
    sub_depth_origin: usize,
    frame: u32,
}

impl Gfx {
    pub fn new(geometry: ScreenGeometry, format: PixelFormat) -> Self {
        let screen = ScreenBuffer::new(geometry);
        let depth = DepthBuffer::new(geometry.width, geometry.height);
        let mut gfx = Self {
            sub_color_origin: screen.origin(Plane::Sub),
            sub_depth_origin: depth.origin(Plane::Sub),
            color_origin: 0,
            depth_origin: 0,
            screen,
            depth,
            math: ColorMath::new(format),
            z1: 0,
            z2: 0,
            start_y: 0,
            end_y: geometry.height.saturating_sub(1),
            real_ppl: geometry.width,
            ppl: geometry.width,
            target: Plane::Main,
            frame: 0,
        };
        gfx.set_target(Plane::Main);
        gfx
    }

    #[inline]
    pub fn screen(&self) -> &ScreenBuffer {
        &self.screen
    }

    #[inline]
    pub fn screen_mut(&mut self) -> &mut ScreenBuffer {
        &mut self.screen
    }

    #[inline]
    pub fn depth(&self) -> &DepthBuffer {
        &self.depth
    }

    #[inline]
    pub fn depth_mut(&mut self) -> &mut DepthBuffer {
        &mut self.depth
    }

    pub fn format(&self) -> PixelFormat {
        self.math.format()
    }

    /// Pixels per buffer line.
    #[inline]
    pub fn real_ppl(&self) -> u32 {
        self.real_ppl
    }

    /// Offset step between drawn lines; twice the pitch when interlacing.
    #[inline]
    pub fn ppl(&self) -> u32 {
        self.ppl
    }

    pub fn set_interlace(&mut self, interlace: bool) {
        self.ppl = self.real_ppl << interlace as u32;
    }

    #[inline]
    pub fn target(&self) -> Plane {
        self.target
    }

    /// Direct subsequent draws at the main or sub screen.
    pub fn set_target(&mut self, plane: Plane) {
        self.target = plane;
        self.color_origin = self.screen.origin(plane);
        self.depth_origin = self.depth.origin(plane);
    }

    #[inline]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub(crate) fn advance_frame(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }

    /// Reallocate the buffers; contents are cleared.
    pub fn resize(&mut self, geometry: ScreenGeometry) {
        self.screen.resize(geometry);
        self.depth.resize(geometry.width, geometry.height);
        self.real_ppl = geometry.width;
        self.ppl = geometry.width;
        self.start_y = 0;
        self.end_y = geometry.height.saturating_sub(1);
        self.sub_color_origin = self.screen.origin(Plane::Sub);
        self.sub_depth_origin = self.depth.origin(Plane::Sub);
        self.set_target(self.target);
    }

    #[inline]
    pub(crate) fn depth_at(&self, offset: usize) -> u8 {
        self.depth.as_slice()[self.depth_origin + offset]
    }

    #[inline]
    pub(crate) fn sub_color(&self, offset: usize) -> u16 {
        self.screen.pixels()[self.sub_color_origin + offset]
    }

    #[inline]
    pub(crate) fn sub_depth(&self, offset: usize) -> u8 {
        self.depth.as_slice()[self.sub_depth_origin + offset]
    }

    #[inline]
    pub(crate) fn put_color(&mut self, offset: usize, color: u16) {
        let origin = self.color_origin;
        self.screen.pixels_mut()[origin + offset] = color;
    }

    #[inline]
    pub(crate) fn put_depth(&mut self, offset: usize, depth: u8) {
        let origin = self.depth_origin;
        self.depth.as_mut_slice()[origin + offset] = depth;
    }
}

/// Everything a draw call needs for one frame.
pub struct RenderContext<'a> {
    pub gfx: &'a mut Gfx,
    pub tiles: &'a mut TileCache,
    /// Tile catalog; `None` disables capture.
    pub capture: Option<&'a mut CaptureStore>,
    /// Layer parameters, changed by the caller between layers.
    pub bg: BgState,
    pub mode7: &'a Mode7State,
    pub palette: &'a ScreenPalette,
    pub vram: &'a [u8],
    pub renderers: TileRenderers,
    pub(crate) colors: ActivePalette<'a>,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        gfx: &'a mut Gfx,
        tiles: &'a mut TileCache,
        palette: &'a ScreenPalette,
        mode7: &'a Mode7State,
        vram: &'a [u8],
        renderers: TileRenderers,
    ) -> Result<Self, RenderError> {
        if vram.len() != VRAM_SIZE {
            return Err(RenderError::VramSize(vram.len()));
        }
        Ok(Self {
            gfx,
            tiles,
            capture: None,
            bg: BgState::default(),
            mode7,
            palette,
            vram,
            renderers,
            colors: ActivePalette::new(&palette.screen_colors()[..]),
        })
    }

    pub fn with_capture(mut self, capture: &'a mut CaptureStore) -> Self {
        self.capture = Some(capture);
        self
    }

    /// The palette the last draw selected.
    pub fn colors(&self) -> ActivePalette<'a> {
        self.colors
    }

    pub fn draw_tile(&mut self, set: RenderSet, args: TileArgs) {
        let draw = self.renderers.set(set).tile;
        draw(self, args);
    }

    pub fn draw_clipped_tile(&mut self, set: RenderSet, args: ClippedTileArgs) {
        let draw = self.renderers.set(set).clipped_tile;
        draw(self, args);
    }

    pub fn draw_mosaic_pixel(&mut self, set: RenderSet, args: MosaicPixelArgs) {
        let draw = self.renderers.set(set).mosaic_pixel;
        draw(self, args);
    }

    pub fn draw_backdrop(&mut self, set: RenderSet, args: BackdropArgs) {
        let draw = self.renderers.set(set).backdrop;
        draw(self, args);
    }

    pub fn draw_mode7_bg1(&mut self, set: RenderSet, args: Mode7Args) {
        let draw = self.renderers.set(set).mode7_bg1;
        draw(self, args);
    }

    pub fn draw_mode7_bg2(&mut self, set: RenderSet, args: Mode7Args) {
        let draw = self.renderers.set(set).mode7_bg2;
        draw(self, args);
    }

    pub fn draw_mode7_mosaic_bg1(&mut self, set: RenderSet, args: Mode7Args) {
        let draw = self.renderers.set(set).mode7_mosaic_bg1;
        draw(self, args);
    }

    pub fn draw_mode7_mosaic_bg2(&mut self, set: RenderSet, args: Mode7Args) {
        let draw = self.renderers.set(set).mode7_mosaic_bg2;
        draw(self, args);
    }
}
