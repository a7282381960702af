//! Mode 7: the affine background.
//!
//! Every screen line carries its own 2x2 matrix, rotation centre and scroll
//! offsets (latched per line so HDMA effects work). For each drawn column the
//! renderer steps a fixed-point source coordinate through the 1024x1024 map:
//!
//! ```text
//! [X]   [A B] [x + hofs - cx]   [cx]
//! [Y] = [C D] [y + vofs - cy] + [cy]
//! ```
//!
//! Video memory interleaves the map and the tiles: even bytes are the 128x128
//! tile map, odd bytes the 256 8bpp tiles (64 pixels each, one byte per pixel).
//! Coordinates outside the map either wrap, leave the pixel transparent, or
//! sample tile 0, selected by bits 6-7 of $211A.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::context::{ActivePalette, RenderContext};
use crate::names::ShapeKind;
use crate::plotter::PixelPlotter;
use crate::tile_renderer::TileShape;

/// Visible lines with latched matrix data.
pub const MODE7_LINES: usize = 240;

/// Sign-extend bit 9 of a 10-bit value.
#[inline]
pub const fn clip_10_bit_signed(value: i32) -> i32 {
    ((value & 0x3ff) ^ 0x200) - 0x200
}

/// Sign-extend a 13-bit register value.
#[inline]
const fn sign_extend_13(value: i16) -> i32 {
    ((value as i32) << 19) >> 19
}

/// Handling of coordinates outside the 1024x1024 map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode7Repeat {
    /// The map repeats.
    #[default]
    Wrap,
    /// Nothing is drawn outside the map.
    Transparent,
    /// Outside the map is filled with tile 0.
    TileZero,
}

impl Mode7Repeat {
    /// Decode bits 6-7 of M7SEL ($211A).
    pub const fn from_m7sel(m7sel: u8) -> Self {
        match (m7sel >> 6) & 3 {
            0 | 1 => Mode7Repeat::Wrap,
            2 => Mode7Repeat::Transparent,
            _ => Mode7Repeat::TileZero,
        }
    }
}

/// Matrix registers as latched at the start of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineMatrix {
    pub matrix_a: i16,
    pub matrix_b: i16,
    pub matrix_c: i16,
    pub matrix_d: i16,
    pub centre_x: i16,
    pub centre_y: i16,
    pub hofs: i16,
    pub vofs: i16,
}

impl LineMatrix {
    /// Unscaled, unrotated map.
    pub const IDENTITY: LineMatrix = LineMatrix {
        matrix_a: 0x100,
        matrix_b: 0,
        matrix_c: 0,
        matrix_d: 0x100,
        centre_x: 0,
        centre_y: 0,
        hofs: 0,
        vofs: 0,
    };
}

/// Frame-wide Mode 7 settings and the per-line matrices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode7State {
    pub repeat: Mode7Repeat,
    pub h_flip: bool,
    pub v_flip: bool,
    /// BG1 uses direct colour ($2130 bit 0).
    pub direct_colour: bool,
    /// Mosaic block size in pixels (1-16).
    pub mosaic_size: u32,
    /// Mosaic enable per BG; BG1's flag also controls vertical mosaic.
    pub bg_mosaic: [bool; 4],
    /// Line where the current mosaic block pattern started.
    pub mosaic_start: u32,
    lines: Vec<LineMatrix>,
}

impl Default for Mode7State {
    fn default() -> Self {
        Self {
            repeat: Mode7Repeat::Wrap,
            h_flip: false,
            v_flip: false,
            direct_colour: false,
            mosaic_size: 1,
            bg_mosaic: [false; 4],
            mosaic_start: 0,
            lines: vec![LineMatrix::default(); MODE7_LINES],
        }
    }
}

impl Mode7State {
    /// Apply M7SEL ($211A): flips and repeat mode.
    pub fn set_m7sel(&mut self, value: u8) {
        self.h_flip = value & 1 != 0;
        self.v_flip = value & 2 != 0;
        self.repeat = Mode7Repeat::from_m7sel(value);
    }

    /// Latch the matrix for line `y`; lines past the end are ignored.
    pub fn set_line(&mut self, y: u32, matrix: LineMatrix) {
        if let Some(line) = self.lines.get_mut(y as usize) {
            *line = matrix;
        }
    }

    /// Latch the same matrix for every line.
    pub fn fill_lines(&mut self, matrix: LineMatrix) {
        self.lines.fill(matrix);
    }

    /// Matrix for line `y`, clamped to the latched range.
    #[inline]
    pub fn line(&self, y: i32) -> &LineMatrix {
        let index = (y.max(0) as usize).min(MODE7_LINES - 1);
        &self.lines[index]
    }
}

/// Which Mode 7 layer a renderer draws.
pub trait Mode7Layer {
    const KIND: ShapeKind;
    const MOSAIC_KIND: ShapeKind;
    /// Color portion of the map byte.
    const MASK: u8;
    /// Index into [`Mode7State::bg_mosaic`].
    const BG: usize;
    fn depth(d: i32, b: u8) -> u8;
    fn direct_colour(state: &Mode7State) -> bool;
}

/// The 8bpp map layer.
pub struct Bg1;

/// EXTBG: 7 color bits plus a priority bit.
pub struct Bg2;

impl Mode7Layer for Bg1 {
    const KIND: ShapeKind = ShapeKind::Mode7Bg1;
    const MOSAIC_KIND: ShapeKind = ShapeKind::Mode7MosaicBg1;
    const MASK: u8 = 0xff;
    const BG: usize = 0;

    #[inline]
    fn depth(d: i32, _b: u8) -> u8 {
        (d + 7) as u8
    }

    #[inline]
    fn direct_colour(state: &Mode7State) -> bool {
        state.direct_colour
    }
}

impl Mode7Layer for Bg2 {
    const KIND: ShapeKind = ShapeKind::Mode7Bg2;
    const MOSAIC_KIND: ShapeKind = ShapeKind::Mode7MosaicBg2;
    const MASK: u8 = 0x7f;
    const BG: usize = 1;

    #[inline]
    fn depth(d: i32, b: u8) -> u8 {
        (d + if b & 0x80 != 0 { 11 } else { 3 }) as u8
    }

    #[inline]
    fn direct_colour(_state: &Mode7State) -> bool {
        false
    }
}

/// Columns `[left, right)` of every line in the band, at base depth `depth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode7Args {
    pub left: u32,
    pub right: u32,
    pub depth: i32,
}

/// Fixed-point source coordinates for one line.
struct LineWalk {
    aa: i32,
    cc: i32,
    bb: i32,
    dd: i32,
    step_a: i32,
    step_c: i32,
}

impl LineWalk {
    fn new(state: &Mode7State, line: i32, left: i32, right: i32) -> Self {
        let m = state.line(line);
        let hofs = sign_extend_13(m.hofs);
        let vofs = sign_extend_13(m.vofs);
        let centre_x = sign_extend_13(m.centre_x);
        let centre_y = sign_extend_13(m.centre_y);
        let (a, b, c, d) = (
            m.matrix_a as i32,
            m.matrix_b as i32,
            m.matrix_c as i32,
            m.matrix_d as i32,
        );

        let start_y = if state.v_flip { 255 - (line + 1) } else { line + 1 };
        let yy = clip_10_bit_signed(vofs - centre_y);
        let bb = ((b * start_y) & !63) + ((b * yy) & !63) + (centre_x << 8);
        let dd = ((d * start_y) & !63) + ((d * yy) & !63) + (centre_y << 8);

        let (start_x, step_a, step_c) = if state.h_flip {
            (right - 1, -a, -c)
        } else {
            (left, a, c)
        };
        let xx = clip_10_bit_signed(hofs - centre_x);
        Self {
            aa: a * start_x + ((a * xx) & !63),
            cc: c * start_x + ((c * xx) & !63),
            bb,
            dd,
            step_a,
            step_c,
        }
    }

    /// Map coordinate of the current column, then step to the next.
    #[inline]
    fn next(&mut self) -> (i32, i32) {
        let x = (self.aa + self.bb) >> 8;
        let y = (self.cc + self.dd) >> 8;
        self.aa += self.step_a;
        self.cc += self.step_c;
        (x, y)
    }
}

#[inline]
fn fetch(vram: &[u8], x: i32, y: i32) -> u8 {
    let tile = vram[(((y & !7) << 5) + ((x >> 2) & !1)) as usize] as i32;
    vram[(1 + (tile << 7) + ((y & 7) << 4) + ((x & 7) << 1)) as usize]
}

/// Map byte at `(x, y)` under the repeat mode, or `None` for no pixel.
#[inline]
fn sample(vram: &[u8], repeat: Mode7Repeat, x: i32, y: i32) -> Option<u8> {
    match repeat {
        Mode7Repeat::Wrap => Some(fetch(vram, x & 0x3ff, y & 0x3ff)),
        _ if (x | y) & !0x3ff == 0 => Some(fetch(vram, x, y)),
        Mode7Repeat::TileZero => Some(vram[(1 + ((y & 7) << 4) + ((x & 7) << 1)) as usize]),
        Mode7Repeat::Transparent => None,
    }
}

fn select_colors<'a, L: Mode7Layer>(ctx: &mut RenderContext<'a>) -> ActivePalette<'a> {
    let palette = ctx.palette;
    let real: &'a [u16] = if L::direct_colour(ctx.mode7) {
        &palette.direct_colour_map(0)[..]
    } else {
        &palette.screen_colors()[..]
    };
    ctx.colors = ActivePalette::clipped(real, &palette.black()[..], ctx.gfx.math.clip_colors);
    ctx.colors
}

/// One Mode 7 layer over a band of lines.
pub struct Mode7Row<L>(PhantomData<fn() -> L>);

impl<L: Mode7Layer> TileShape for Mode7Row<L> {
    const KIND: ShapeKind = L::KIND;
    type Args = Mode7Args;

    fn draw<P: PixelPlotter>(ctx: &mut RenderContext<'_>, args: Mode7Args) {
        let colors = select_colors::<L>(ctx);
        let (state, vram) = (ctx.mode7, ctx.vram);
        let gfx = &mut *ctx.gfx;
        let ppl = gfx.ppl();
        let mut offset = gfx.start_y * ppl;
        let offset_in_line = offset % gfx.real_ppl();
        let (left, right) = (args.left as i32, args.right as i32);

        for line in gfx.start_y..=gfx.end_y {
            let mut walk = LineWalk::new(state, line as i32, left, right);
            for x in args.left..args.right {
                let (mx, my) = walk.next();
                if let Some(b) = sample(vram, state.repeat, mx, my) {
                    let pix = b & L::MASK;
                    let z = L::depth(args.depth, b);
                    P::draw(gfx, colors, x, pix != 0, offset, offset_in_line, pix, z, z);
                }
            }
            offset += ppl;
        }
    }
}

/// One Mode 7 layer with mosaic blocks.
///
/// Samples are taken at the top-left of each block and replicated over it;
/// block columns outside `[left, right)` are not written. Block rows are
/// addressed by screen line, so the plotter's column scale never changes the
/// row stride.
pub struct Mode7MosaicRow<L>(PhantomData<fn() -> L>);

impl<L: Mode7Layer> TileShape for Mode7MosaicRow<L> {
    const KIND: ShapeKind = L::MOSAIC_KIND;
    type Args = Mode7Args;

    fn draw<P: PixelPlotter>(ctx: &mut RenderContext<'_>, args: Mode7Args) {
        let colors = select_colors::<L>(ctx);
        let (state, vram) = (ctx.mode7, ctx.vram);
        let gfx = &mut *ctx.gfx;
        let ppl = gfx.ppl();
        let end_y = gfx.end_y as i32;
        let (left, right) = (args.left as i32, args.right as i32);

        let mut start_y = gfx.start_y as i32;
        let (mut h_mosaic, mut v_mosaic, mut mosaic_start) = (1i32, 1i32, 0i32);
        let (mut m_left, mut m_right) = (left, right);
        let size = state.mosaic_size.clamp(1, 16) as i32;

        if state.bg_mosaic[0] {
            v_mosaic = size;
            mosaic_start = (gfx.start_y.wrapping_sub(state.mosaic_start) % size as u32) as i32;
            start_y -= mosaic_start;
        }
        if state.bg_mosaic[L::BG] {
            h_mosaic = size;
            m_left -= m_left % h_mosaic;
            m_right += h_mosaic - 1;
            m_right -= m_right % h_mosaic;
        }

        let offset_in_line = (gfx.start_y * ppl) % gfx.real_ppl();
        let mut line = start_y;
        while line <= end_y {
            if line + v_mosaic > end_y {
                v_mosaic = end_y - line + 1;
            }

            let mut walk = LineWalk::new(state, line, m_left, m_right);
            let mut ctr = 1u8;
            for x in m_left..m_right {
                let (mx, my) = walk.next();
                ctr = ctr.wrapping_sub(1);
                if ctr != 0 {
                    continue;
                }
                ctr = h_mosaic as u8;

                let Some(b) = sample(vram, state.repeat, mx, my) else {
                    continue;
                };
                let pix = b & L::MASK;
                if pix == 0 {
                    continue;
                }
                let z = L::depth(args.depth, b);
                for h in mosaic_start..v_mosaic {
                    let row_offset = ((line + h) as u32) * ppl;
                    for w in (x..x + h_mosaic).rev() {
                        let visible = w >= left && w < right;
                        P::draw(gfx, colors, w as u32, visible, row_offset, offset_in_line, pix, z, z);
                    }
                }
            }

            mosaic_start = 0;
            line += v_mosaic;
        }
    }
}
