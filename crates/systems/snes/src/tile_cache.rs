//! Per-frame cache of decoded background and sprite tiles.
//!
//! A tile reference word carries the tile index (bits 0-9), the palette
//! number (bits 10-12), priority (bit 13) and the flip bits (14, 15). The
//! cache turns the index into a video memory address using the layer's
//! [`BgState`], decodes the tile's bitplanes into 64 palette indices the first
//! time it is drawn in a frame, and hands out the decoded bytes for every
//! later draw.
//!
//! Decoded tiles are kept per [`TileFormat`], so a 4bpp tile and a 2bpp tile
//! at the same address never alias. Each tile number has two slots, one for
//! plain references and one for horizontally flipped ones, each decoded at
//! most once per frame. Flipped references decode with the layer's alternate
//! format, which only differs from the primary one in hires modes, where
//! flipping swaps which columns of the tile pair land on the even and odd
//! pixels.

use gfx_core::logging::{log, LogCategory, LogLevel};
use gfx_core::ppu::{get_decoder, ScreenPalette, TileFormat, PALETTE_SIZE};

use crate::context::ActivePalette;
use crate::RenderError;

pub const H_FLIP: u32 = 0x4000;
pub const V_FLIP: u32 = 0x8000;

/// Decode state of one cached tile for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TileState {
    Stale = 0,
    Decoded = 1,
    /// Decoded and every pixel is transparent.
    Blank = 2,
}

/// Addressing and palette parameters of the layer being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BgState {
    /// Character base address in bytes.
    pub tile_address: u32,
    /// Extra offset for references with bit 0x100 set (sprite name select).
    pub name_select: u32,
    /// log2 of the tile size in bytes.
    pub tile_shift: u32,
    pub palette_shift: u32,
    pub palette_mask: u32,
    pub start_palette: u32,
    /// Colors per palette, used to key captured palettes.
    pub palette_size: u32,
    pub direct_colour_mode: bool,
    /// Byte offset of the odd field's rows in interlaced drawing (0 or 8).
    pub interlace_line: u32,
    pub primary: TileFormat,
    pub alternate: TileFormat,
}

impl Default for BgState {
    fn default() -> Self {
        Self {
            tile_address: 0,
            name_select: 0,
            tile_shift: 5,
            palette_shift: 10 - 4,
            palette_mask: 7 << 4,
            start_palette: 0,
            palette_size: 16,
            direct_colour_mode: false,
            interlace_line: 0,
            primary: TileFormat::Planar4Bpp,
            alternate: TileFormat::Planar4Bpp,
        }
    }
}

impl BgState {
    /// Configure tile size, palette selection and converters for a bit depth.
    ///
    /// Hires layers on the main screen decode odd columns into the primary
    /// slot and even columns into the alternate one. The sub screen and
    /// mosaic layers use the even columns for both.
    pub fn select_tile_converter(
        &mut self,
        depth: u8,
        hires: bool,
        sub: bool,
        mosaic: bool,
        direct_colour: bool,
    ) -> Result<(), RenderError> {
        let (plain, even, odd) = match depth {
            8 => {
                self.tile_shift = 6;
                self.palette_shift = 0;
                self.palette_mask = 0;
                self.palette_size = 256;
                self.direct_colour_mode = direct_colour;
                self.primary = TileFormat::Planar8Bpp;
                self.alternate = TileFormat::Planar8Bpp;
                return Ok(());
            }
            4 => {
                self.tile_shift = 5;
                self.palette_shift = 10 - 4;
                self.palette_mask = 7 << 4;
                self.palette_size = 16;
                (
                    TileFormat::Planar4Bpp,
                    TileFormat::Planar4BppHiresEven,
                    TileFormat::Planar4BppHiresOdd,
                )
            }
            2 => {
                self.tile_shift = 4;
                self.palette_shift = 10 - 2;
                self.palette_mask = 7 << 2;
                self.palette_size = 4;
                (
                    TileFormat::Planar2Bpp,
                    TileFormat::Planar2BppHiresEven,
                    TileFormat::Planar2BppHiresOdd,
                )
            }
            other => return Err(RenderError::InvalidBitDepth(other)),
        };

        self.direct_colour_mode = false;
        (self.primary, self.alternate) = if !hires {
            (plain, plain)
        } else if sub || mosaic {
            (even, even)
        } else {
            (odd, even)
        };
        Ok(())
    }
}

/// A resolved tile reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedTile {
    tile: u32,
    format: TileFormat,
    flipped: bool,
    number: usize,
    state: TileState,
}

impl CachedTile {
    /// The reference word this tile was resolved from.
    #[inline]
    pub fn tile(&self) -> u32 {
        self.tile
    }

    #[inline]
    pub fn number(&self) -> usize {
        self.number
    }

    #[inline]
    pub fn format(&self) -> TileFormat {
        self.format
    }

    #[inline]
    pub fn is_blank(&self) -> bool {
        self.state == TileState::Blank
    }

    /// Palette this tile draws with.
    ///
    /// Direct colour layers pick one of the eight direct maps from the
    /// palette bits; other layers get the CGRAM slice the palette bits point
    /// at. The screen colors are black while color clipping is active.
    pub fn select_palette<'a>(
        &self,
        bg: &BgState,
        palette: &'a ScreenPalette,
        clip_colors: bool,
    ) -> ActivePalette<'a> {
        let real: &'a [u16] = if bg.direct_colour_mode {
            &palette.direct_colour_map(((self.tile >> 10) & 7) as usize)[..]
        } else {
            let start = ((self.tile >> bg.palette_shift) & bg.palette_mask) + bg.start_palette;
            &palette.screen_colors()[start as usize & (PALETTE_SIZE - 1)..]
        };
        ActivePalette::clipped(real, palette.black(), clip_colors)
    }
}

struct TileBank {
    pixels: Vec<[u8; 64]>,
    state: Vec<TileState>,
}

impl TileBank {
    fn new(format: TileFormat) -> Self {
        let count = format.tile_count();
        Self {
            pixels: vec![[0; 64]; count],
            state: vec![TileState::Stale; count],
        }
    }
}

/// Decoded tiles for every tile format, valid for one frame.
pub struct TileCache {
    /// Plain and H-flipped banks per format.
    banks: Vec<[TileBank; 2]>,
    decodes: u64,
}

impl TileCache {
    pub fn new() -> Self {
        Self {
            banks: TileFormat::ALL
                .iter()
                .map(|&f| [TileBank::new(f), TileBank::new(f)])
                .collect(),
            decodes: 0,
        }
    }

    /// Forget every decoded tile. Called once per frame.
    pub fn invalidate(&mut self) {
        for bank in self.banks.iter_mut().flatten() {
            bank.state.fill(TileState::Stale);
        }
    }

    /// Number of tile decodes since creation.
    pub fn decodes(&self) -> u64 {
        self.decodes
    }

    /// Resolve a tile reference, decoding it if this frame has not yet.
    pub fn resolve(&mut self, bg: &BgState, vram: &[u8], tile: u32) -> CachedTile {
        let mut address = bg.tile_address.wrapping_add((tile & 0x3ff) << bg.tile_shift);
        if tile & 0x100 != 0 {
            address = address.wrapping_add(bg.name_select);
        }
        address &= 0xffff;

        let flipped = tile & H_FLIP != 0;
        let format = if flipped { bg.alternate } else { bg.primary };
        let bank = &mut self.banks[format.index()][flipped as usize];
        let number = (address >> bg.tile_shift) as usize & (bank.state.len() - 1);

        if bank.state[number] == TileState::Stale {
            let opaque = get_decoder(format).decode(
                vram,
                address as usize,
                (tile & 0x3ff) as u16,
                &mut bank.pixels[number],
            );
            bank.state[number] = if opaque {
                TileState::Decoded
            } else {
                TileState::Blank
            };
            self.decodes += 1;
            log(LogCategory::TileCache, LogLevel::Trace, || {
                format!(
                    "decoded {:?} tile {:03X} at {:04X}{}",
                    format,
                    number,
                    address,
                    if opaque { "" } else { " (blank)" }
                )
            });
        }

        CachedTile {
            tile,
            format,
            flipped,
            number,
            state: bank.state[number],
        }
    }

    /// Decoded pixels of a resolved tile, row-major.
    #[inline]
    pub fn pixels(&self, cached: &CachedTile) -> &[u8; 64] {
        &self.banks[cached.format.index()][cached.flipped as usize].pixels[cached.number]
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gfx_core::graphics::PixelFormat;
    use gfx_core::ppu::VRAM_SIZE;

    fn bg_4bpp() -> BgState {
        let mut bg = BgState::default();
        bg.select_tile_converter(4, false, false, false, false).unwrap();
        bg
    }

    #[test]
    fn test_resolve_address() {
        let mut vram = vec![0u8; VRAM_SIZE];
        let mut cache = TileCache::new();
        let mut bg = bg_4bpp();
        bg.tile_address = 0x2000;

        vram[0x2000 + (5 << 5)] = 0x80;
        let cached = cache.resolve(&bg, &vram, 5);
        assert_eq!(cached.number(), (0x2000 >> 5) + 5);
        assert!(!cached.is_blank());
        assert_eq!(cache.pixels(&cached)[0], 1);
    }

    #[test]
    fn test_address_wraps_and_name_select() {
        let vram = vec![0u8; VRAM_SIZE];
        let mut cache = TileCache::new();
        let mut bg = bg_4bpp();
        bg.tile_address = 0xF000;
        bg.name_select = 0x2000;

        // 0xF000 + (0x1ff << 5) + 0x2000 wraps past 64 KiB
        let cached = cache.resolve(&bg, &vram, 0x1ff);
        let expected = (0xF000 + (0x1ff << 5) + 0x2000) & 0xffff;
        assert_eq!(cached.number(), expected >> 5);
    }

    #[test]
    fn test_decodes_once_per_frame() {
        let mut vram = vec![0u8; VRAM_SIZE];
        vram[0] = 0xFF;
        let mut cache = TileCache::new();
        let bg = bg_4bpp();

        for _ in 0..5 {
            cache.resolve(&bg, &vram, 0);
            cache.resolve(&bg, &vram, V_FLIP);
        }
        assert_eq!(cache.decodes(), 1);

        // H-flipped references have their own slot, V-flip shares it
        for _ in 0..3 {
            cache.resolve(&bg, &vram, H_FLIP);
            cache.resolve(&bg, &vram, H_FLIP | V_FLIP);
        }
        assert_eq!(cache.decodes(), 2);

        cache.invalidate();
        cache.resolve(&bg, &vram, 0);
        assert_eq!(cache.decodes(), 3);
    }

    #[test]
    fn test_flip_slots_hold_same_pixels_outside_hires() {
        let mut vram = vec![0u8; VRAM_SIZE];
        vram[7 << 5] = 0xC0;
        let mut cache = TileCache::new();
        let bg = bg_4bpp();

        let plain = cache.resolve(&bg, &vram, 7);
        let flipped = cache.resolve(&bg, &vram, 7 | H_FLIP);
        assert_eq!(plain.number(), flipped.number());
        assert_eq!(plain.format(), flipped.format());
        assert_eq!(cache.pixels(&plain), cache.pixels(&flipped));
        assert_eq!(&cache.pixels(&flipped)[0..3], &[1, 1, 0]);
        assert_eq!(cache.decodes(), 2);
    }

    #[test]
    fn test_hires_flip_slot_decodes_separately() {
        let vram = vec![0u8; VRAM_SIZE];
        let mut cache = TileCache::new();
        let mut bg = BgState::default();
        bg.select_tile_converter(4, true, false, false, false).unwrap();
        assert_eq!(bg.primary, TileFormat::Planar4BppHiresOdd);
        assert_eq!(bg.alternate, TileFormat::Planar4BppHiresEven);

        cache.resolve(&bg, &vram, 3);
        cache.resolve(&bg, &vram, 3 | H_FLIP);
        cache.resolve(&bg, &vram, 3 | H_FLIP | V_FLIP);
        assert_eq!(cache.decodes(), 2);
    }

    #[test]
    fn test_blank_tile() {
        let vram = vec![0u8; VRAM_SIZE];
        let mut cache = TileCache::new();
        let cached = cache.resolve(&bg_4bpp(), &vram, 42);
        assert!(cached.is_blank());
        // Blank state survives a second lookup without decoding
        assert!(cache.resolve(&bg_4bpp(), &vram, 42).is_blank());
        assert_eq!(cache.decodes(), 1);
    }

    #[test]
    fn test_converter_selection() {
        let mut bg = BgState::default();
        bg.select_tile_converter(8, false, false, false, true).unwrap();
        assert_eq!((bg.tile_shift, bg.palette_shift, bg.palette_mask), (6, 0, 0));
        assert_eq!(bg.palette_size, 256);
        assert!(bg.direct_colour_mode);

        bg.select_tile_converter(2, true, true, false, true).unwrap();
        assert_eq!((bg.tile_shift, bg.palette_shift, bg.palette_mask), (4, 8, 7 << 2));
        assert!(!bg.direct_colour_mode);
        assert_eq!(bg.primary, TileFormat::Planar2BppHiresEven);
        assert_eq!(bg.alternate, TileFormat::Planar2BppHiresEven);

        bg.select_tile_converter(4, true, false, true, false).unwrap();
        assert_eq!(bg.primary, TileFormat::Planar4BppHiresEven);

        assert!(matches!(
            bg.select_tile_converter(3, false, false, false, false),
            Err(RenderError::InvalidBitDepth(3))
        ));
    }

    #[test]
    fn test_select_palette() {
        let format = PixelFormat::Rgb555;
        let mut palette = ScreenPalette::new(format);
        palette.set_cgram(0x10 + 3, 0x001F);
        let bg = bg_4bpp();
        let vram = vec![0u8; VRAM_SIZE];
        let mut cache = TileCache::new();

        // Palette 1 of a 4bpp layer starts at color 16
        let cached = cache.resolve(&bg, &vram, 1 << 10);
        let colors = cached.select_palette(&bg, &palette, false);
        assert_eq!(colors.screen[3], format.build_pixel(31, 0, 0));
        assert_eq!(colors.real[3], colors.screen[3]);

        let clipped = cached.select_palette(&bg, &palette, true);
        assert_eq!(clipped.screen[3], 0);
        assert_eq!(clipped.real[3], format.build_pixel(31, 0, 0));
    }

    #[test]
    fn test_select_direct_colour_palette() {
        let palette = ScreenPalette::new(PixelFormat::Rgb565);
        let mut bg = BgState::default();
        bg.select_tile_converter(8, false, false, false, true).unwrap();
        let vram = vec![0u8; VRAM_SIZE];
        let mut cache = TileCache::new();

        let cached = cache.resolve(&bg, &vram, 5 << 10);
        let colors = cached.select_palette(&bg, &palette, false);
        assert_eq!(colors.real[0x47], palette.direct_colour_map(5)[0x47]);
    }
}
