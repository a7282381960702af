//! Brightness-scaled screen palettes.
//!
//! CGRAM holds 256 BGR555 words. Before rendering they are converted to the
//! framebuffer's packed format through the master brightness table, giving
//! the "screen colors" every tile renderer indexes. Two more fixed maps are
//! derived here:
//!
//! - **Direct colour maps**: 8bpp tiles in direct-colour mode bypass CGRAM.
//!   The pixel byte supplies BBGGGRRR and three palette bits from the tile
//!   word supply the low bit of each channel, giving 8 maps of 256 colors.
//! - **Black map**: 256 zeros, used while color-window clipping is active.

use crate::graphics::PixelFormat;

/// `MUL_BRIGHTNESS[b][c]` scales 5-bit channel `c` by master brightness `b`.
///
/// Row 15 is the identity.
pub const MUL_BRIGHTNESS: [[u8; 32]; 16] = [
    [
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
    ],
    [
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
        0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02,
        0x02, 0x02,
    ],
    [
        0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x02, 0x02,
        0x02, 0x02, 0x02, 0x02, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x04, 0x04, 0x04,
        0x04, 0x04,
    ],
    [
        0x00, 0x00, 0x00, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x02, 0x02, 0x02, 0x02, 0x03, 0x03,
        0x03, 0x03, 0x03, 0x04, 0x04, 0x04, 0x04, 0x04, 0x05, 0x05, 0x05, 0x05, 0x05, 0x06, 0x06,
        0x06, 0x06,
    ],
    [
        0x00, 0x00, 0x01, 0x01, 0x01, 0x01, 0x02, 0x02, 0x02, 0x02, 0x03, 0x03, 0x03, 0x03, 0x04,
        0x04, 0x04, 0x05, 0x05, 0x05, 0x05, 0x06, 0x06, 0x06, 0x06, 0x07, 0x07, 0x07, 0x07, 0x08,
        0x08, 0x08,
    ],
    [
        0x00, 0x00, 0x01, 0x01, 0x01, 0x02, 0x02, 0x02, 0x03, 0x03, 0x03, 0x04, 0x04, 0x04, 0x05,
        0x05, 0x05, 0x06, 0x06, 0x06, 0x07, 0x07, 0x07, 0x08, 0x08, 0x08, 0x09, 0x09, 0x09, 0x0a,
        0x0a, 0x0a,
    ],
    [
        0x00, 0x00, 0x01, 0x01, 0x02, 0x02, 0x02, 0x03, 0x03, 0x04, 0x04, 0x04, 0x05, 0x05, 0x06,
        0x06, 0x06, 0x07, 0x07, 0x08, 0x08, 0x08, 0x09, 0x09, 0x0a, 0x0a, 0x0a, 0x0b, 0x0b, 0x0c,
        0x0c, 0x0c,
    ],
    [
        0x00, 0x00, 0x01, 0x01, 0x02, 0x02, 0x03, 0x03, 0x04, 0x04, 0x05, 0x05, 0x06, 0x06, 0x07,
        0x07, 0x07, 0x08, 0x08, 0x09, 0x09, 0x0a, 0x0a, 0x0b, 0x0b, 0x0c, 0x0c, 0x0d, 0x0d, 0x0e,
        0x0e, 0x0e,
    ],
    [
        0x00, 0x01, 0x01, 0x02, 0x02, 0x03, 0x03, 0x04, 0x04, 0x05, 0x05, 0x06, 0x06, 0x07, 0x07,
        0x08, 0x09, 0x09, 0x0a, 0x0a, 0x0b, 0x0b, 0x0c, 0x0c, 0x0d, 0x0d, 0x0e, 0x0e, 0x0f, 0x0f,
        0x10, 0x11,
    ],
    [
        0x00, 0x01, 0x01, 0x02, 0x02, 0x03, 0x04, 0x04, 0x05, 0x05, 0x06, 0x07, 0x07, 0x08, 0x08,
        0x09, 0x0a, 0x0a, 0x0b, 0x0b, 0x0c, 0x0d, 0x0d, 0x0e, 0x0e, 0x0f, 0x10, 0x10, 0x11, 0x11,
        0x12, 0x13,
    ],
    [
        0x00, 0x01, 0x01, 0x02, 0x03, 0x03, 0x04, 0x05, 0x05, 0x06, 0x07, 0x07, 0x08, 0x09, 0x09,
        0x0a, 0x0b, 0x0b, 0x0c, 0x0d, 0x0d, 0x0e, 0x0f, 0x0f, 0x10, 0x11, 0x11, 0x12, 0x13, 0x13,
        0x14, 0x15,
    ],
    [
        0x00, 0x01, 0x01, 0x02, 0x03, 0x04, 0x04, 0x05, 0x06, 0x07, 0x07, 0x08, 0x09, 0x0a, 0x0a,
        0x0b, 0x0c, 0x0c, 0x0d, 0x0e, 0x0f, 0x0f, 0x10, 0x11, 0x12, 0x12, 0x13, 0x14, 0x15, 0x15,
        0x16, 0x17,
    ],
    [
        0x00, 0x01, 0x02, 0x02, 0x03, 0x04, 0x05, 0x06, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0a, 0x0b,
        0x0c, 0x0d, 0x0e, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x12, 0x13, 0x14, 0x15, 0x16, 0x16, 0x17,
        0x18, 0x19,
    ],
    [
        0x00, 0x01, 0x02, 0x03, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0a, 0x0b, 0x0c,
        0x0d, 0x0e, 0x0f, 0x10, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x17, 0x18, 0x19,
        0x1a, 0x1b,
    ],
    [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
        0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b,
        0x1c, 0x1d,
    ],
    [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d,
        0x1e, 0x1f,
    ],
];

pub const PALETTE_SIZE: usize = 256;

/// A full 256-entry palette of packed colors.
pub type ColorMap = [u16; PALETTE_SIZE];

/// All palettes a renderer may select from, rebuilt when CGRAM or brightness changes.
#[derive(Debug, Clone)]
pub struct ScreenPalette {
    format: PixelFormat,
    brightness: u8,
    cgram: [u16; PALETTE_SIZE],
    screen_colors: ColorMap,
    direct_colour_maps: [ColorMap; 8],
    black: ColorMap,
    forced_backdrop: Option<[u16; 1]>,
}

impl ScreenPalette {
    /// Black palette at full brightness.
    pub fn new(format: PixelFormat) -> Self {
        let mut palette = Self {
            format,
            brightness: 15,
            cgram: [0; PALETTE_SIZE],
            screen_colors: [0; PALETTE_SIZE],
            direct_colour_maps: [[0; PALETTE_SIZE]; 8],
            black: [0; PALETTE_SIZE],
            forced_backdrop: None,
        };
        palette.rebuild_direct_colour_maps();
        palette
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Load all 256 CGRAM words.
    pub fn load_cgram(&mut self, cgram: &[u16; PALETTE_SIZE]) {
        self.cgram = *cgram;
        for index in 0..PALETTE_SIZE {
            self.screen_colors[index] = self.scale(self.cgram[index]);
        }
    }

    /// Update one CGRAM entry.
    pub fn set_cgram(&mut self, index: u8, bgr555: u16) {
        self.cgram[index as usize] = bgr555 & 0x7FFF;
        self.screen_colors[index as usize] = self.scale(self.cgram[index as usize]);
    }

    /// Change master brightness (0-15) and rebuild every derived map.
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness.min(15);
        let cgram = self.cgram;
        self.load_cgram(&cgram);
        self.rebuild_direct_colour_maps();
    }

    /// Replace the color used for backdrop fills, or `None` to use CGRAM entry 0.
    pub fn set_forced_backdrop(&mut self, color: Option<u16>) {
        self.forced_backdrop = color.map(|c| [c]);
    }

    #[inline]
    pub fn screen_colors(&self) -> &ColorMap {
        &self.screen_colors
    }

    #[inline]
    pub fn direct_colour_map(&self, index: usize) -> &ColorMap {
        &self.direct_colour_maps[index & 7]
    }

    #[inline]
    pub fn black(&self) -> &ColorMap {
        &self.black
    }

    /// One-entry palette holding the forced backdrop color, if set.
    #[inline]
    pub fn forced_backdrop(&self) -> Option<&[u16]> {
        self.forced_backdrop.as_ref().map(|c| &c[..])
    }

    fn scale(&self, bgr555: u16) -> u16 {
        let table = &MUL_BRIGHTNESS[self.brightness as usize];
        self.format.build_pixel(
            table[(bgr555 & 0x1f) as usize] as u16,
            table[((bgr555 >> 5) & 0x1f) as usize] as u16,
            table[((bgr555 >> 10) & 0x1f) as usize] as u16,
        )
    }

    fn rebuild_direct_colour_maps(&mut self) {
        let table = &MUL_BRIGHTNESS[self.brightness as usize];
        for p in 0..8usize {
            for c in 0..PALETTE_SIZE {
                let r = table[((c & 7) << 2) | ((p & 1) << 1)];
                let g = table[((c & 0x38) >> 1) | (p & 2)];
                let b = table[((c & 0xc0) >> 3) | (p & 4)];
                self.direct_colour_maps[p][c] = self.format.build_pixel(r as u16, g as u16, b as u16);
            }
        }
    }
}
