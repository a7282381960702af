//! Pixel plotters: depth test, blend and store for one logical pixel.
//!
//! A tile renderer walks a tile and calls its plotter once per column with
//! `n` (the column within the run), a draw flag `m`, the plane offset of the
//! row and the palette index. The plotter decides which buffer cells that
//! column covers:
//!
//! | Plotter          | Cells per pixel | Source line step |
//! |------------------|-----------------|------------------|
//! | `Normal1x1`      | 1               | 1                |
//! | `Normal2x1`      | 2               | 1                |
//! | `Interlace`      | 2               | 2                |
//! | `Hires`          | 2 (main + sub)  | 1                |
//! | `HiresInterlace` | 2 (main + sub)  | 2                |
//!
//! Hires plotters write the main pixel to the odd cell and blend the next
//! even cell from the sub screen, using the main pixel as that cell's "sub
//! screen" operand. The sub cell is clipped when the main pixel is, not when
//! the next main pixel is. The sub cell left of column 0 has no main pixel
//! driving it; the plotter fills it from the first main pixel.

use std::marker::PhantomData;

use crate::color_math::Blend;
use crate::context::{ActivePalette, Gfx};
use crate::names::{LineKind, PixelKind};

/// Buffer column of the last hires main pixel on a 256-pixel line.
pub const LAST_HIRES_COLUMN: u32 = (256 - 1) << 1;

/// How a renderer steps through a tile's rows.
pub trait LineStart {
    const KIND: LineKind;
    /// Tile rows advanced per drawn line.
    const PITCH: u32;
    /// Byte offset of the first drawn row within the decoded tile.
    fn get(start_line: u32, interlace_line: u32) -> u32;
}

pub struct Progressive;
pub struct Interlaced;

impl LineStart for Progressive {
    const KIND: LineKind = LineKind::Progressive;
    const PITCH: u32 = 1;

    #[inline]
    fn get(start_line: u32, _interlace_line: u32) -> u32 {
        start_line
    }
}

impl LineStart for Interlaced {
    const KIND: LineKind = LineKind::Interlace;
    const PITCH: u32 = 2;

    #[inline]
    fn get(start_line: u32, interlace_line: u32) -> u32 {
        start_line * 2 + interlace_line
    }
}

/// One pixel addressing variant with its blend rule.
pub trait PixelPlotter {
    const KIND: PixelKind;
    type Math: Blend;
    type Lines: LineStart;

    /// Plot palette index `pix` at column `n` of the row at `offset`.
    ///
    /// Nothing is written unless `m` holds and `z1` beats the stored depth.
    #[allow(clippy::too_many_arguments)]
    fn draw(
        gfx: &mut Gfx,
        colors: ActivePalette<'_>,
        n: u32,
        m: bool,
        offset: u32,
        offset_in_line: u32,
        pix: u8,
        z1: u8,
        z2: u8,
    );
}

pub struct Normal1x1<M>(PhantomData<fn() -> M>);
pub struct Normal2x1<M>(PhantomData<fn() -> M>);
pub struct Interlace<M>(PhantomData<fn() -> M>);
pub struct Hires<M>(PhantomData<fn() -> M>);
pub struct HiresInterlace<M>(PhantomData<fn() -> M>);

impl<M: Blend> PixelPlotter for Normal1x1<M> {
    const KIND: PixelKind = PixelKind::Normal1x1;
    type Math = M;
    type Lines = Progressive;

    #[inline]
    fn draw(
        gfx: &mut Gfx,
        colors: ActivePalette<'_>,
        n: u32,
        m: bool,
        offset: u32,
        _offset_in_line: u32,
        pix: u8,
        z1: u8,
        z2: u8,
    ) {
        let o = (offset + n) as usize;
        if m && z1 > gfx.depth_at(o) {
            let color = M::calc(&gfx.math, colors.screen[pix as usize], gfx.sub_color(o), gfx.sub_depth(o));
            gfx.put_color(o, color);
            gfx.put_depth(o, z2);
        }
    }
}

#[inline]
#[allow(clippy::too_many_arguments)]
fn draw_2x1<M: Blend>(gfx: &mut Gfx, colors: ActivePalette<'_>, n: u32, m: bool, offset: u32, pix: u8, z1: u8, z2: u8) {
    let o = (offset + 2 * n) as usize;
    if m && z1 > gfx.depth_at(o) {
        let color = M::calc(&gfx.math, colors.screen[pix as usize], gfx.sub_color(o), gfx.sub_depth(o));
        gfx.put_color(o, color);
        gfx.put_color(o + 1, color);
        gfx.put_depth(o, z2);
        gfx.put_depth(o + 1, z2);
    }
}

#[inline]
#[allow(clippy::too_many_arguments)]
fn draw_hires<M: Blend>(
    gfx: &mut Gfx,
    colors: ActivePalette<'_>,
    n: u32,
    m: bool,
    offset: u32,
    offset_in_line: u32,
    pix: u8,
    z1: u8,
    z2: u8,
) {
    let o = (offset + 2 * n) as usize;
    if !(m && z1 > gfx.depth_at(o)) {
        return;
    }
    let sd = gfx.sub_depth(o);
    let main = M::calc(&gfx.math, colors.screen[pix as usize], gfx.sub_color(o), sd);
    gfx.put_color(o + 1, main);

    let column = offset_in_line + 2 * n;
    if column != LAST_HIRES_COLUMN {
        let behind = if gfx.math.clip_colors { 0 } else { gfx.sub_color(o + 2) };
        let color = M::calc(&gfx.math, behind, colors.real[pix as usize], sd);
        gfx.put_color(o + 2, color);
    }
    if column == 0 || column == gfx.real_ppl() {
        let behind = if gfx.math.clip_colors { 0 } else { gfx.sub_color(o) };
        let color = M::calc(&gfx.math, behind, colors.real[pix as usize], sd);
        gfx.put_color(o, color);
    }
    gfx.put_depth(o, z2);
    gfx.put_depth(o + 1, z2);
}

impl<M: Blend> PixelPlotter for Normal2x1<M> {
    const KIND: PixelKind = PixelKind::Normal2x1;
    type Math = M;
    type Lines = Progressive;

    #[inline]
    fn draw(
        gfx: &mut Gfx,
        colors: ActivePalette<'_>,
        n: u32,
        m: bool,
        offset: u32,
        _offset_in_line: u32,
        pix: u8,
        z1: u8,
        z2: u8,
    ) {
        draw_2x1::<M>(gfx, colors, n, m, offset, pix, z1, z2);
    }
}

impl<M: Blend> PixelPlotter for Interlace<M> {
    const KIND: PixelKind = PixelKind::Interlace;
    type Math = M;
    type Lines = Interlaced;

    #[inline]
    fn draw(
        gfx: &mut Gfx,
        colors: ActivePalette<'_>,
        n: u32,
        m: bool,
        offset: u32,
        _offset_in_line: u32,
        pix: u8,
        z1: u8,
        z2: u8,
    ) {
        draw_2x1::<M>(gfx, colors, n, m, offset, pix, z1, z2);
    }
}

impl<M: Blend> PixelPlotter for Hires<M> {
    const KIND: PixelKind = PixelKind::Hires;
    type Math = M;
    type Lines = Progressive;

    #[inline]
    fn draw(
        gfx: &mut Gfx,
        colors: ActivePalette<'_>,
        n: u32,
        m: bool,
        offset: u32,
        offset_in_line: u32,
        pix: u8,
        z1: u8,
        z2: u8,
    ) {
        draw_hires::<M>(gfx, colors, n, m, offset, offset_in_line, pix, z1, z2);
    }
}

impl<M: Blend> PixelPlotter for HiresInterlace<M> {
    const KIND: PixelKind = PixelKind::HiresInterlace;
    type Math = M;
    type Lines = Interlaced;

    #[inline]
    fn draw(
        gfx: &mut Gfx,
        colors: ActivePalette<'_>,
        n: u32,
        m: bool,
        offset: u32,
        offset_in_line: u32,
        pix: u8,
        z1: u8,
        z2: u8,
    ) {
        draw_hires::<M>(gfx, colors, n, m, offset, offset_in_line, pix, z1, z2);
    }
}

/// A plotter variant, generic over the blend rule.
///
/// Lets the dispatch tables instantiate one addressing variant with each of
/// the nine blend rules.
pub trait PlotterFamily {
    const KIND: PixelKind;
    type Plotter<M: Blend>: PixelPlotter<Math = M>;
}

pub struct Normal1x1Family;
pub struct Normal2x1Family;
pub struct InterlaceFamily;
pub struct HiresFamily;
pub struct HiresInterlaceFamily;

impl PlotterFamily for Normal1x1Family {
    const KIND: PixelKind = PixelKind::Normal1x1;
    type Plotter<M: Blend> = Normal1x1<M>;
}

impl PlotterFamily for Normal2x1Family {
    const KIND: PixelKind = PixelKind::Normal2x1;
    type Plotter<M: Blend> = Normal2x1<M>;
}

impl PlotterFamily for InterlaceFamily {
    const KIND: PixelKind = PixelKind::Interlace;
    type Plotter<M: Blend> = Interlace<M>;
}

impl PlotterFamily for HiresFamily {
    const KIND: PixelKind = PixelKind::Hires;
    type Plotter<M: Blend> = Hires<M>;
}

impl PlotterFamily for HiresInterlaceFamily {
    const KIND: PixelKind = PixelKind::HiresInterlace;
    type Plotter<M: Blend> = HiresInterlace<M>;
}
