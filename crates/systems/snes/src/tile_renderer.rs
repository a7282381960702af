//! Tile drawing strategies.
//!
//! Each shape walks one unit of work (a tile, part of a tile, a mosaic block,
//! a backdrop span) and hands every pixel to a [`PixelPlotter`]. Shapes are
//! generic over the plotter, so every (shape, plotter, blend) combination is
//! its own monomorphic function; the dispatch tables pick one per layer.
//!
//! `start_line` is the byte offset of the first drawn row inside the decoded
//! tile (row * 8). Offsets are plane offsets of the first drawn line.

use crate::capture::TileSighting;
use crate::color_math::Blend;
use crate::context::{ActivePalette, Gfx, RenderContext};
use crate::names::{RenderMode, ShapeKind};
use crate::plotter::{LineStart, PixelPlotter};
use crate::tile_cache::{H_FLIP, V_FLIP};

/// A drawing strategy, generic over the pixel plotter.
pub trait TileShape {
    const KIND: ShapeKind;
    type Args: Copy;

    fn draw<P: PixelPlotter>(ctx: &mut RenderContext<'_>, args: Self::Args);
}

/// Identity of the renderer `S` instantiated with plotter `P`.
pub fn render_mode<S: TileShape, P: PixelPlotter>() -> RenderMode {
    RenderMode {
        math: <P::Math as Blend>::MATH,
        op: <P::Math as Blend>::OP,
        pixel: P::KIND,
        lines: <P::Lines as LineStart>::KIND,
        shape: S::KIND,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileArgs {
    pub tile: u32,
    pub offset: u32,
    pub start_line: u32,
    pub line_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClippedTileArgs {
    pub tile: u32,
    pub offset: u32,
    /// First column drawn (0-7).
    pub start_pixel: u32,
    /// Columns drawn; 0 draws through the end of the row.
    pub width: u32,
    pub start_line: u32,
    pub line_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicPixelArgs {
    pub tile: u32,
    pub offset: u32,
    pub start_line: u32,
    /// Column sampled from the tile.
    pub start_pixel: u32,
    /// Columns the sample is replicated across.
    pub width: u32,
    pub line_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackdropArgs {
    pub offset: u32,
    pub left: u32,
    pub right: u32,
}

/// Rows and columns of a drawn tile.
#[derive(Clone, Copy)]
struct RowWalk {
    offset: u32,
    offset_in_line: u32,
    ppl: u32,
    start: usize,
    line_count: u32,
    z1: u8,
    z2: u8,
}

impl RowWalk {
    fn new<P: PixelPlotter>(ctx: &RenderContext<'_>, offset: u32, start_line: u32, line_count: u32) -> Self {
        Self {
            offset,
            offset_in_line: offset % ctx.gfx.real_ppl(),
            ppl: ctx.gfx.ppl(),
            start: P::Lines::get(start_line, ctx.bg.interlace_line) as usize,
            line_count,
            z1: ctx.gfx.z1,
            z2: ctx.gfx.z2,
        }
    }

    /// Byte offset of row `l` of the walk in the decoded tile.
    #[inline(always)]
    fn row<P: PixelPlotter, const V_FLIPPED: bool>(&self, l: u32) -> usize {
        let step = (l * 8 * P::Lines::PITCH) as usize;
        if V_FLIPPED {
            56usize.wrapping_sub(self.start).wrapping_sub(step)
        } else {
            self.start.wrapping_add(step)
        }
    }
}

#[inline(always)]
fn column<const H_FLIPPED: bool>(x: u32) -> usize {
    if H_FLIPPED {
        (7 - x) as usize
    } else {
        x as usize
    }
}

fn walk_tile<P: PixelPlotter, const H_FLIPPED: bool, const V_FLIPPED: bool>(
    gfx: &mut Gfx,
    colors: ActivePalette<'_>,
    bp: &[u8; 64],
    walk: RowWalk,
) {
    let mut offset = walk.offset;
    for l in 0..walk.line_count {
        let row = walk.row::<P, V_FLIPPED>(l);
        for x in 0..8 {
            let pix = bp[(row + column::<H_FLIPPED>(x)) & 63];
            P::draw(gfx, colors, x, pix != 0, offset, walk.offset_in_line, pix, walk.z1, walk.z2);
        }
        offset += walk.ppl;
    }
}

fn walk_clipped<P: PixelPlotter, const H_FLIPPED: bool, const V_FLIPPED: bool>(
    gfx: &mut Gfx,
    colors: ActivePalette<'_>,
    bp: &[u8; 64],
    walk: RowWalk,
    start_pixel: u32,
    width: u32,
) {
    let mut offset = walk.offset;
    for l in 0..walk.line_count {
        let row = walk.row::<P, V_FLIPPED>(l);
        // Width counts down in 8 bits; zero runs to the end of the row
        let mut w = width as u8;
        for x in start_pixel..8 {
            let pix = bp[(row + column::<H_FLIPPED>(x)) & 63];
            P::draw(gfx, colors, x, pix != 0, offset, walk.offset_in_line, pix, walk.z1, walk.z2);
            w = w.wrapping_sub(1);
            if w == 0 {
                break;
            }
        }
        offset += walk.ppl;
    }
}

/// A whole 8-pixel-wide tile.
pub struct PlainTile;

impl TileShape for PlainTile {
    const KIND: ShapeKind = ShapeKind::Tile;
    type Args = TileArgs;

    fn draw<P: PixelPlotter>(ctx: &mut RenderContext<'_>, args: TileArgs) {
        let cached = ctx.tiles.resolve(&ctx.bg, ctx.vram, args.tile);
        if cached.is_blank() {
            return;
        }
        ctx.colors = cached.select_palette(&ctx.bg, ctx.palette, ctx.gfx.math.clip_colors);
        let walk = RowWalk::new::<P>(ctx, args.offset, args.start_line, args.line_count);
        let bp = ctx.tiles.pixels(&cached);
        let colors = ctx.colors;

        if let Some(capture) = ctx.capture.as_deref_mut() {
            capture.record(&TileSighting {
                tile: args.tile,
                pixels: bp,
                palette: colors.screen,
                palette_size: ctx.bg.palette_size,
                offset: args.offset,
                start_line: args.start_line,
                line_count: args.line_count,
                real_ppl: ctx.gfx.real_ppl(),
                frame: ctx.gfx.frame(),
                mode: render_mode::<Self, P>(),
            });
        }

        match (args.tile & H_FLIP != 0, args.tile & V_FLIP != 0) {
            (false, false) => walk_tile::<P, false, false>(ctx.gfx, colors, bp, walk),
            (true, false) => walk_tile::<P, true, false>(ctx.gfx, colors, bp, walk),
            (false, true) => walk_tile::<P, false, true>(ctx.gfx, colors, bp, walk),
            (true, true) => walk_tile::<P, true, true>(ctx.gfx, colors, bp, walk),
        }
    }
}

/// A tile cut by the edge of the screen or a window.
pub struct ClippedTile;

impl TileShape for ClippedTile {
    const KIND: ShapeKind = ShapeKind::ClippedTile;
    type Args = ClippedTileArgs;

    fn draw<P: PixelPlotter>(ctx: &mut RenderContext<'_>, args: ClippedTileArgs) {
        let cached = ctx.tiles.resolve(&ctx.bg, ctx.vram, args.tile);
        if cached.is_blank() {
            return;
        }
        ctx.colors = cached.select_palette(&ctx.bg, ctx.palette, ctx.gfx.math.clip_colors);
        let walk = RowWalk::new::<P>(ctx, args.offset, args.start_line, args.line_count);
        let bp = ctx.tiles.pixels(&cached);
        let colors = ctx.colors;
        let (sp, w) = (args.start_pixel, args.width);

        match (args.tile & H_FLIP != 0, args.tile & V_FLIP != 0) {
            (false, false) => walk_clipped::<P, false, false>(ctx.gfx, colors, bp, walk, sp, w),
            (true, false) => walk_clipped::<P, true, false>(ctx.gfx, colors, bp, walk, sp, w),
            (false, true) => walk_clipped::<P, false, true>(ctx.gfx, colors, bp, walk, sp, w),
            (true, true) => walk_clipped::<P, true, true>(ctx.gfx, colors, bp, walk, sp, w),
        }
    }
}

/// One tile pixel replicated over a mosaic block.
pub struct MosaicPixel;

impl TileShape for MosaicPixel {
    const KIND: ShapeKind = ShapeKind::MosaicPixel;
    type Args = MosaicPixelArgs;

    fn draw<P: PixelPlotter>(ctx: &mut RenderContext<'_>, args: MosaicPixelArgs) {
        let cached = ctx.tiles.resolve(&ctx.bg, ctx.vram, args.tile);
        if cached.is_blank() {
            return;
        }
        ctx.colors = cached.select_palette(&ctx.bg, ctx.palette, ctx.gfx.math.clip_colors);
        let walk = RowWalk::new::<P>(ctx, args.offset, args.start_line, args.line_count);

        let start_pixel = if args.tile & H_FLIP != 0 {
            7u32.wrapping_sub(args.start_pixel) as usize
        } else {
            args.start_pixel as usize
        };
        let row = if args.tile & V_FLIP != 0 {
            56usize.wrapping_sub(walk.start)
        } else {
            walk.start
        };
        let pix = ctx.tiles.pixels(&cached)[row.wrapping_add(start_pixel) & 63];
        if pix == 0 {
            return;
        }

        let colors = ctx.colors;
        let mut offset = walk.offset;
        for _ in 0..walk.line_count {
            for w in (0..args.width).rev() {
                P::draw(ctx.gfx, colors, w, true, offset, walk.offset_in_line, pix, walk.z1, walk.z2);
            }
            offset += walk.ppl;
        }
    }
}

/// Color 0 over `[left, right)` for every line of the band.
pub struct Backdrop;

impl TileShape for Backdrop {
    const KIND: ShapeKind = ShapeKind::Backdrop;
    type Args = BackdropArgs;

    fn draw<P: PixelPlotter>(ctx: &mut RenderContext<'_>, args: BackdropArgs) {
        let palette = ctx.palette;
        let mut colors = ActivePalette::clipped(
            &palette.screen_colors()[..],
            &palette.black()[..],
            ctx.gfx.math.clip_colors,
        );
        if let Some(forced) = palette.forced_backdrop() {
            colors.screen = forced;
        }
        ctx.colors = colors;

        let gfx = &mut *ctx.gfx;
        let offset_in_line = args.offset % gfx.real_ppl();
        let ppl = gfx.ppl();
        let mut offset = args.offset;
        for _ in gfx.start_y..=gfx.end_y {
            for x in args.left..args.right {
                P::draw(gfx, colors, x, true, offset, offset_in_line, 0, 1, 1);
            }
            offset += ppl;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_math::{Add, NoMath, RegMath};
    use crate::dispatch::TileRenderers;
    use crate::mode7::Mode7State;
    use crate::plotter::{Interlace, Normal1x1, Normal2x1};
    use crate::tile_cache::TileCache;
    use gfx_core::graphics::{PixelFormat, Plane, ScreenGeometry};
    use gfx_core::ppu::{ScreenPalette, VRAM_SIZE};

    const FORMAT: PixelFormat = PixelFormat::Rgb555;

    struct Fixture {
        gfx: Gfx,
        tiles: TileCache,
        palette: ScreenPalette,
        mode7: Mode7State,
        vram: Vec<u8>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut palette = ScreenPalette::new(FORMAT);
            // Color i of palette 0 has blue = i
            for i in 0..16u16 {
                palette.set_cgram(i as u8, i << 10);
            }
            let mut gfx = Gfx::new(
                ScreenGeometry {
                    width: 32,
                    height: 16,
                    guard_lines: 2,
                },
                FORMAT,
            );
            gfx.z1 = 5;
            gfx.z2 = 5;
            Self {
                gfx,
                tiles: TileCache::new(),
                palette,
                mode7: Mode7State::default(),
                vram: vec![0; VRAM_SIZE],
            }
        }

        /// Write a 4bpp tile whose pixel (x, y) is `f(x, y)`.
        fn put_tile(&mut self, number: usize, f: impl Fn(usize, usize) -> u8) {
            let base = number * 32;
            for y in 0..8 {
                for x in 0..8 {
                    let pix = f(x, y);
                    let bit = 7 - x;
                    for plane in 0..4 {
                        let addr = base + (plane / 2) * 16 + y * 2 + (plane & 1);
                        self.vram[addr] |= ((pix >> plane) & 1) << bit;
                    }
                }
            }
        }

        fn context(&mut self) -> RenderContext<'_> {
            RenderContext::new(
                &mut self.gfx,
                &mut self.tiles,
                &self.palette,
                &self.mode7,
                &self.vram,
                TileRenderers::default(),
            )
            .unwrap()
        }

        fn blue(&self, x: u32, y: u32) -> u8 {
            FORMAT.decompose(self.gfx.screen().read(Plane::Main, x, y).unwrap()).2
        }
    }

    fn tile(tile: u32, offset: u32) -> TileArgs {
        TileArgs {
            tile,
            offset,
            start_line: 0,
            line_count: 8,
        }
    }

    #[test]
    fn test_plain_tile_flips() {
        let mut fx = Fixture::new();
        // Even rows hold 1..=8, odd rows 8..=15
        fx.put_tile(1, |x, y| 1 + x as u8 + (y as u8 & 1) * 7);

        {
            let mut ctx = fx.context();
            PlainTile::draw::<Normal1x1<NoMath>>(&mut ctx, tile(1, 0));
            PlainTile::draw::<Normal1x1<NoMath>>(&mut ctx, tile(1 | H_FLIP, 8));
            PlainTile::draw::<Normal1x1<NoMath>>(&mut ctx, tile(1 | V_FLIP, 16));
            PlainTile::draw::<Normal1x1<NoMath>>(&mut ctx, tile(1 | H_FLIP | V_FLIP, 24));
        }

        assert_eq!(fx.blue(0, 0), 1);
        assert_eq!(fx.blue(7, 1), 15);
        assert_eq!(fx.blue(8, 0), 8);
        assert_eq!(fx.blue(15, 0), 1);
        // V-flip: first drawn line is the tile's row 7 (odd)
        assert_eq!(fx.blue(16, 0), 8);
        assert_eq!(fx.blue(16, 1), 1);
        assert_eq!(fx.blue(24, 0), 15);
        assert_eq!(fx.blue(31, 7), 1);
    }

    #[test]
    fn test_start_line_and_line_count() {
        let mut fx = Fixture::new();
        fx.put_tile(1, |_, y| y as u8 + 1);
        {
            let mut ctx = fx.context();
            let args = TileArgs {
                tile: 1,
                offset: 0,
                start_line: 3 * 8,
                line_count: 2,
            };
            PlainTile::draw::<Normal1x1<NoMath>>(&mut ctx, args);
        }
        assert_eq!(fx.blue(0, 0), 4);
        assert_eq!(fx.blue(0, 1), 5);
        assert_eq!(fx.blue(0, 2), 0);
    }

    #[test]
    fn test_interlace_skips_rows() {
        let mut fx = Fixture::new();
        fx.put_tile(1, |_, y| y as u8 + 1);
        fx.gfx.set_interlace(true);
        {
            let mut ctx = fx.context();
            ctx.bg.interlace_line = 8;
            let args = TileArgs {
                tile: 1,
                offset: 0,
                start_line: 0,
                line_count: 4,
            };
            PlainTile::draw::<Interlace<NoMath>>(&mut ctx, args);
        }
        // Odd field: rows 1, 3, 5, 7 on every other buffer line
        assert_eq!(fx.blue(0, 0), 2);
        assert_eq!(fx.blue(1, 0), 2);
        assert_eq!(fx.blue(0, 1), 0);
        assert_eq!(fx.blue(0, 2), 4);
        assert_eq!(fx.blue(0, 6), 8);
    }

    #[test]
    fn test_blank_tile_leaves_buffers_untouched() {
        let mut fx = Fixture::new();
        fx.gfx.screen_mut().fill(Plane::Main, 0x1234);
        let before_screen = fx.gfx.screen().pixels().to_vec();
        let before_depth = fx.gfx.depth().as_slice().to_vec();
        {
            let mut ctx = fx.context();
            PlainTile::draw::<Normal2x1<RegMath<Add>>>(&mut ctx, tile(9, 0));
            ClippedTile::draw::<Normal1x1<NoMath>>(
                &mut ctx,
                ClippedTileArgs {
                    tile: 9,
                    offset: 0,
                    start_pixel: 0,
                    width: 8,
                    start_line: 0,
                    line_count: 8,
                },
            );
        }
        assert_eq!(fx.gfx.screen().pixels(), &before_screen[..]);
        assert_eq!(fx.gfx.depth().as_slice(), &before_depth[..]);
    }

    #[test]
    fn test_transparent_pixels_skipped() {
        let mut fx = Fixture::new();
        fx.put_tile(1, |x, _| if x == 3 { 7 } else { 0 });
        {
            let mut ctx = fx.context();
            PlainTile::draw::<Normal1x1<NoMath>>(&mut ctx, tile(1, 0));
        }
        assert_eq!(fx.gfx.depth().read(Plane::Main, 2, 0), Some(0));
        assert_eq!(fx.gfx.depth().read(Plane::Main, 3, 0), Some(5));
        assert_eq!(fx.blue(3, 4), 7);
    }

    #[test]
    fn test_clipped_tile_window() {
        let mut fx = Fixture::new();
        fx.put_tile(1, |x, _| x as u8 + 1);
        {
            let mut ctx = fx.context();
            let args = ClippedTileArgs {
                tile: 1,
                offset: 0,
                start_pixel: 2,
                width: 3,
                start_line: 0,
                line_count: 1,
            };
            ClippedTile::draw::<Normal1x1<NoMath>>(&mut ctx, args);
            ClippedTile::draw::<Normal1x1<NoMath>>(
                &mut ctx,
                ClippedTileArgs {
                    tile: 1 | H_FLIP,
                    offset: 32,
                    ..args
                },
            );
            // Zero width runs to the end of the row
            ClippedTile::draw::<Normal1x1<NoMath>>(
                &mut ctx,
                ClippedTileArgs {
                    offset: 64,
                    start_pixel: 5,
                    width: 0,
                    ..args
                },
            );
        }
        let row = |fx: &Fixture, y| (0..8).map(|x| fx.blue(x, y)).collect::<Vec<_>>();
        assert_eq!(row(&fx, 0), vec![0, 0, 3, 4, 5, 0, 0, 0]);
        assert_eq!(row(&fx, 1), vec![0, 0, 6, 5, 4, 0, 0, 0]);
        assert_eq!(row(&fx, 2), vec![0, 0, 0, 0, 0, 6, 7, 8]);
    }

    #[test]
    fn test_mosaic_pixel_block() {
        let mut fx = Fixture::new();
        fx.put_tile(1, |x, y| if (x, y) == (6, 2) { 9 } else { 1 });
        {
            let mut ctx = fx.context();
            let args = MosaicPixelArgs {
                tile: 1 | H_FLIP,
                offset: 0,
                start_line: 2 * 8,
                start_pixel: 1,
                width: 3,
                line_count: 2,
            };
            MosaicPixel::draw::<Normal1x1<NoMath>>(&mut ctx, args);
        }
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(fx.blue(x, y), 9);
            }
            assert_eq!(fx.blue(3, y), 0);
        }
        assert_eq!(fx.blue(0, 2), 0);
    }

    #[test]
    fn test_backdrop_fill_and_forced_color() {
        let mut fx = Fixture::new();
        fx.palette.set_cgram(0, 3 << 10);
        fx.gfx.start_y = 1;
        fx.gfx.end_y = 2;
        {
            let mut ctx = fx.context();
            let args = BackdropArgs {
                offset: 32,
                left: 4,
                right: 6,
            };
            Backdrop::draw::<Normal1x1<NoMath>>(&mut ctx, args);
        }
        assert_eq!(fx.blue(4, 1), 3);
        assert_eq!(fx.blue(5, 2), 3);
        assert_eq!(fx.blue(6, 1), 0);
        assert_eq!(fx.blue(4, 3), 0);
        assert_eq!(fx.gfx.depth().read(Plane::Main, 4, 1), Some(1));

        fx.palette.set_forced_backdrop(Some(FORMAT.build_pixel(0, 0, 20)));
        fx.gfx.depth_mut().clear();
        {
            let mut ctx = fx.context();
            Backdrop::draw::<Normal1x1<NoMath>>(
                &mut ctx,
                BackdropArgs {
                    offset: 32,
                    left: 0,
                    right: 1,
                },
            );
        }
        assert_eq!(fx.blue(0, 1), 20);
    }

    #[test]
    fn test_render_mode_names() {
        let mode = render_mode::<PlainTile, Normal2x1<RegMath<Add>>>();
        assert_eq!(
            mode.names(),
            ["REGMATH", "Normal2x1", "ADD", "BPProgressive", "DrawTile16"]
        );
    }
}
