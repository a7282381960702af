//! Planar tile decoders.
//!
//! SNES background and sprite tiles are 8x8 pixels stored as interleaved
//! bitplane pairs. For row `r`, planes 0 and 1 live at bytes `2r` and `2r + 1`;
//! planes 2 and 3 follow 16 bytes later, planes 4-7 at +32 and +48. Pixel `x`
//! of a row is bit `7 - x` of each plane byte.
//!
//! | Format | Bytes per tile | Colors |
//! |--------|----------------|--------|
//! | 2bpp   | 16             | 4      |
//! | 4bpp   | 32             | 16     |
//! | 8bpp   | 64             | 256    |
//!
//! Hires modes render two tiles' worth of columns into one 8-pixel-wide
//! cell. The hires decoders take every other column from the tile and its
//! successor: the even decoder keeps columns 0, 2, 4, 6 and the odd decoder
//! columns 1, 3, 5, 7.
//!
//! All addresses wrap at 64 KiB, matching the video memory address bus.

/// Video memory is a flat 64 KiB byte array.
pub const VRAM_SIZE: usize = 0x10000;

const VRAM_MASK: usize = VRAM_SIZE - 1;

/// Tile bitplane layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileFormat {
    Planar2Bpp,
    Planar4Bpp,
    Planar8Bpp,
    /// Even columns of a 2bpp tile and its successor.
    Planar2BppHiresEven,
    /// Odd columns of a 2bpp tile and its successor.
    Planar2BppHiresOdd,
    Planar4BppHiresEven,
    Planar4BppHiresOdd,
}

impl TileFormat {
    pub const ALL: [TileFormat; 7] = [
        TileFormat::Planar2Bpp,
        TileFormat::Planar4Bpp,
        TileFormat::Planar8Bpp,
        TileFormat::Planar2BppHiresEven,
        TileFormat::Planar2BppHiresOdd,
        TileFormat::Planar4BppHiresEven,
        TileFormat::Planar4BppHiresOdd,
    ];

    /// Dense index, for tables keyed by format.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn bits_per_pixel(self) -> u8 {
        match self {
            TileFormat::Planar2Bpp
            | TileFormat::Planar2BppHiresEven
            | TileFormat::Planar2BppHiresOdd => 2,
            TileFormat::Planar4Bpp
            | TileFormat::Planar4BppHiresEven
            | TileFormat::Planar4BppHiresOdd => 4,
            TileFormat::Planar8Bpp => 8,
        }
    }

    /// log2 of the tile size in bytes.
    pub const fn tile_shift(self) -> u32 {
        match self.bits_per_pixel() {
            2 => 4,
            4 => 5,
            _ => 6,
        }
    }

    /// Number of distinct tile numbers in 64 KiB of video memory.
    pub const fn tile_count(self) -> usize {
        VRAM_SIZE >> self.tile_shift()
    }
}

/// Trait for decoding tile data into pixel indices.
pub trait TileDecoder: Sync {
    /// Decode the tile at `addr` into 64 row-major palette indices.
    ///
    /// `tile` is the 10-bit tile index, used by decoders that need the
    /// neighbouring tile. Returns `false` when every decoded pixel is zero.
    fn decode(&self, vram: &[u8], addr: usize, tile: u16, out: &mut [u8; 64]) -> bool;

    /// Size of a single tile in bytes.
    fn tile_size(&self) -> usize;
}

/// Plain planar decoder for 2, 4 or 8 bitplanes.
#[derive(Debug, Clone, Copy)]
pub struct PlanarDecoder {
    planes: u8,
}

impl PlanarDecoder {
    pub const fn new(planes: u8) -> Self {
        Self { planes }
    }
}

#[inline]
fn planar_pixel(vram: &[u8], addr: usize, planes: u8, row: usize, column: usize) -> u8 {
    let bit = 7 - column;
    let mut pixel = 0u8;
    for pair in 0..(planes as usize / 2) {
        let base = addr + pair * 16 + row * 2;
        let lo = vram[base & VRAM_MASK];
        let hi = vram[(base + 1) & VRAM_MASK];
        pixel |= ((lo >> bit) & 1) << (pair * 2);
        pixel |= ((hi >> bit) & 1) << (pair * 2 + 1);
    }
    pixel
}

impl TileDecoder for PlanarDecoder {
    fn decode(&self, vram: &[u8], addr: usize, _tile: u16, out: &mut [u8; 64]) -> bool {
        let mut any = 0u8;
        for row in 0..8 {
            for column in 0..8 {
                let pixel = planar_pixel(vram, addr, self.planes, row, column);
                out[row * 8 + column] = pixel;
                any |= pixel;
            }
        }
        any != 0
    }

    fn tile_size(&self) -> usize {
        self.planes as usize * 8
    }
}

/// Half-resolution decoder for hires modes.
#[derive(Debug, Clone, Copy)]
pub struct HiresDecoder {
    planes: u8,
    odd: bool,
}

impl HiresDecoder {
    pub const fn new(planes: u8, odd: bool) -> Self {
        Self { planes, odd }
    }
}

impl TileDecoder for HiresDecoder {
    fn decode(&self, vram: &[u8], addr: usize, tile: u16, out: &mut [u8; 64]) -> bool {
        let size = self.tile_size();
        // Tile 0x3ff's successor wraps back to tile 0
        let next = if tile & 0x3ff == 0x3ff {
            addr.wrapping_sub(0x3ff * size)
        } else {
            addr + size
        };
        let next = next & VRAM_MASK;

        let mut any = 0u8;
        for row in 0..8 {
            for column in 0..8 {
                let source = if column < 4 { addr } else { next };
                let source_column = (column % 4) * 2 + self.odd as usize;
                let pixel = planar_pixel(vram, source, self.planes, row, source_column);
                out[row * 8 + column] = pixel;
                any |= pixel;
            }
        }
        any != 0
    }

    fn tile_size(&self) -> usize {
        self.planes as usize * 8
    }
}

static PLANAR_2BPP: PlanarDecoder = PlanarDecoder::new(2);
static PLANAR_4BPP: PlanarDecoder = PlanarDecoder::new(4);
static PLANAR_8BPP: PlanarDecoder = PlanarDecoder::new(8);
static HIRES_2BPP_EVEN: HiresDecoder = HiresDecoder::new(2, false);
static HIRES_2BPP_ODD: HiresDecoder = HiresDecoder::new(2, true);
static HIRES_4BPP_EVEN: HiresDecoder = HiresDecoder::new(4, false);
static HIRES_4BPP_ODD: HiresDecoder = HiresDecoder::new(4, true);

/// Get a tile decoder for the specified format.
pub fn get_decoder(format: TileFormat) -> &'static dyn TileDecoder {
    match format {
        TileFormat::Planar2Bpp => &PLANAR_2BPP,
        TileFormat::Planar4Bpp => &PLANAR_4BPP,
        TileFormat::Planar8Bpp => &PLANAR_8BPP,
        TileFormat::Planar2BppHiresEven => &HIRES_2BPP_EVEN,
        TileFormat::Planar2BppHiresOdd => &HIRES_2BPP_ODD,
        TileFormat::Planar4BppHiresEven => &HIRES_4BPP_EVEN,
        TileFormat::Planar4BppHiresOdd => &HIRES_4BPP_ODD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vram() -> Vec<u8> {
        vec![0u8; VRAM_SIZE]
    }

    #[test]
    fn test_2bpp_checkerboard() {
        let mut mem = vram();
        // Row 0: plane 0 alternating, plane 1 solid
        mem[0] = 0b1010_1010;
        mem[1] = 0b1111_1111;
        // Row 1: plane 0 alternating the other way
        mem[2] = 0b0101_0101;

        let mut out = [0u8; 64];
        assert!(get_decoder(TileFormat::Planar2Bpp).decode(&mem, 0, 0, &mut out));

        assert_eq!(&out[0..8], &[3, 2, 3, 2, 3, 2, 3, 2]);
        assert_eq!(&out[8..16], &[0, 1, 0, 1, 0, 1, 0, 1]);
        assert!(out[16..].iter().all(|&p| p == 0));
    }

    #[test]
    fn test_4bpp_upper_planes() {
        let mut mem = vram();
        // Plane 2 of row 3, pixel 0
        mem[0x100 + 16 + 6] = 0x80;
        // Plane 3 of row 3, pixel 7
        mem[0x100 + 16 + 7] = 0x01;

        let mut out = [0u8; 64];
        assert!(get_decoder(TileFormat::Planar4Bpp).decode(&mem, 0x100, 8, &mut out));
        assert_eq!(out[3 * 8], 4);
        assert_eq!(out[3 * 8 + 7], 8);
    }

    #[test]
    fn test_8bpp_all_planes() {
        let mut mem = vram();
        for pair in 0..4 {
            mem[pair * 16] = 0x80;
            mem[pair * 16 + 1] = 0x80;
        }
        let mut out = [0u8; 64];
        assert!(get_decoder(TileFormat::Planar8Bpp).decode(&mem, 0, 0, &mut out));
        assert_eq!(out[0], 0xFF);
        assert_eq!(out[1], 0);
    }

    #[test]
    fn test_blank_tile_reports_false() {
        let mem = vram();
        let mut out = [0xAAu8; 64];
        for format in TileFormat::ALL {
            assert!(!get_decoder(format).decode(&mem, 0x2000, 0, &mut out));
            assert!(out.iter().all(|&p| p == 0));
        }
    }

    #[test]
    fn test_address_wraps_at_64k() {
        let mut mem = vram();
        // Second plane pair of a 4bpp tile at 0xFFF0 wraps to 0x0000
        mem[0x0000] = 0x80;
        let mut out = [0u8; 64];
        assert!(get_decoder(TileFormat::Planar4Bpp).decode(&mem, 0xFFF0, 0, &mut out));
        assert_eq!(out[0], 4);
    }

    #[test]
    fn test_hires_even_odd_columns() {
        let mut mem = vram();
        // Tile 0 row 0 plane 0: columns 0 and 1 set
        mem[0] = 0b1100_0000;
        // Tile 1 row 0 plane 0: column 1 set
        mem[16] = 0b0100_0000;

        let mut even = [0u8; 64];
        let mut odd = [0u8; 64];
        get_decoder(TileFormat::Planar2BppHiresEven).decode(&mem, 0, 0, &mut even);
        get_decoder(TileFormat::Planar2BppHiresOdd).decode(&mem, 0, 0, &mut odd);

        assert_eq!(&even[0..8], &[1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&odd[0..8], &[1, 0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_hires_last_tile_wraps_to_first() {
        let mut mem = vram();
        mem[0] = 0x80; // tile 0, column 0
        let last = 0x3ff * 16;
        let mut out = [0u8; 64];
        assert!(get_decoder(TileFormat::Planar2BppHiresEven).decode(&mem, last, 0x3ff, &mut out));
        assert_eq!(out[4], 1);
    }

    #[test]
    fn test_format_geometry() {
        assert_eq!(TileFormat::Planar2Bpp.tile_shift(), 4);
        assert_eq!(TileFormat::Planar4BppHiresOdd.tile_shift(), 5);
        assert_eq!(TileFormat::Planar8Bpp.tile_shift(), 6);
        assert_eq!(TileFormat::Planar2Bpp.tile_count(), 4096);
        assert_eq!(TileFormat::Planar8Bpp.tile_count(), 1024);
        assert_eq!(get_decoder(TileFormat::Planar4Bpp).tile_size(), 32);
        for (i, format) in TileFormat::ALL.iter().enumerate() {
            assert_eq!(format.index(), i);
        }
    }
}
