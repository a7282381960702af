//! Packed pixel formats for 15/16-bit framebuffers
//!
//! Tile hardware of this era produces 5 bits per channel. The framebuffer keeps
//! colors packed into a `u16`, either as RGB555 or RGB565. In 565 mode green
//! has 6 bits; `build_pixel` copies the 5-bit green's high bit into the extra
//! low bit so full-intensity green stays full intensity.
//!
//! All the blend arithmetic in the system crates works on the masks exposed by
//! [`PixelLayout`], never on hard-coded shift amounts.

use serde::{Deserialize, Serialize};

/// Bit layout of a packed framebuffer pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 0RRRRRGGGGGBBBBB
    Rgb555,
    /// RRRRRGGGGGGBBBBB
    #[default]
    Rgb565,
}

/// Shift and mask constants for one [`PixelFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    pub red_shift: u32,
    pub green_shift: u32,
    pub red_mask: u16,
    pub green_mask: u16,
    pub blue_mask: u16,
    /// Lowest bit of every channel.
    pub low_bits_mask: u16,
    /// Highest bit of every channel.
    pub hi_bits_mask: u16,
    /// `hi_bits_mask << 1`; may not fit in 16 bits.
    pub hi_bits_mask_x2: u32,
    pub max_green: u16,
    pub green_hi_bit: u16,
}

const RGB555: PixelLayout = PixelLayout {
    red_shift: 10,
    green_shift: 5,
    red_mask: 0x7C00,
    green_mask: 0x03E0,
    blue_mask: 0x001F,
    low_bits_mask: 0x0421,
    hi_bits_mask: 0x4210,
    hi_bits_mask_x2: 0x8420,
    max_green: 31,
    green_hi_bit: 0x10,
};

const RGB565: PixelLayout = PixelLayout {
    red_shift: 11,
    green_shift: 6,
    red_mask: 0xF800,
    green_mask: 0x07E0,
    blue_mask: 0x001F,
    low_bits_mask: 0x0821,
    hi_bits_mask: 0x8410,
    hi_bits_mask_x2: 0x10820,
    max_green: 63,
    green_hi_bit: 0x20,
};

impl PixelLayout {
    /// Everything but the lowest bit of each channel.
    #[inline]
    pub const fn remove_low_bits_mask(&self) -> u16 {
        !self.low_bits_mask
    }

    /// Red and blue channels together.
    #[inline]
    pub const fn red_blue_mask(&self) -> u16 {
        self.red_mask | self.blue_mask
    }
}

impl PixelFormat {
    #[inline]
    pub const fn layout(self) -> &'static PixelLayout {
        match self {
            PixelFormat::Rgb555 => &RGB555,
            PixelFormat::Rgb565 => &RGB565,
        }
    }

    /// Pack 5-bit channels.
    #[inline]
    pub const fn build_pixel(self, r: u16, g: u16, b: u16) -> u16 {
        match self {
            PixelFormat::Rgb555 => (r << 10) | (g << 5) | b,
            PixelFormat::Rgb565 => (r << 11) | (g << 6) | ((g & 0x10) << 1) | b,
        }
    }

    /// Pack with green already at native width (6 bits in 565).
    #[inline]
    pub const fn build_pixel_native(self, r: u16, g: u16, b: u16) -> u16 {
        match self {
            PixelFormat::Rgb555 => (r << 10) | (g << 5) | b,
            PixelFormat::Rgb565 => (r << 11) | (g << 5) | b,
        }
    }

    /// Unpack into 5-bit channels.
    #[inline]
    pub const fn decompose(self, pixel: u16) -> (u8, u8, u8) {
        let layout = self.layout();
        (
            ((pixel >> layout.red_shift) & 0x1f) as u8,
            ((pixel >> layout.green_shift) & 0x1f) as u8,
            (pixel & 0x1f) as u8,
        )
    }

    /// Expand to 8 bits per channel, replicating the top bits into the bottom.
    #[inline]
    pub const fn to_rgb888(self, pixel: u16) -> (u8, u8, u8) {
        let (r, g, b) = self.decompose(pixel);
        (expand5(r), expand5(g), expand5(b))
    }

    /// Opaque ARGB8888, the layout used by [`crate::types::Frame`].
    #[inline]
    pub fn to_argb(self, pixel: u16) -> u32 {
        let (r, g, b) = self.to_rgb888(pixel);
        ColorOps::from_rgb(r, g, b)
    }

    /// Pack an SNES BGR555 CGRAM word without brightness scaling.
    #[inline]
    pub const fn from_bgr555(self, word: u16) -> u16 {
        self.build_pixel(word & 0x1f, (word >> 5) & 0x1f, (word >> 10) & 0x1f)
    }
}

#[inline]
const fn expand5(v: u8) -> u8 {
    (v << 3) | (v >> 2)
}

/// ARGB8888 helpers for presentation frames
pub struct ColorOps;

impl ColorOps {
    /// Construct RGB color with full alpha
    #[inline]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> u32 {
        0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_decompose_all_channels() {
        for format in [PixelFormat::Rgb555, PixelFormat::Rgb565] {
            for v in 0..32u16 {
                let p = format.build_pixel(v, 31 - v, v ^ 0x15);
                assert_eq!(
                    format.decompose(p),
                    (v as u8, (31 - v) as u8, (v ^ 0x15) as u8),
                    "{:?} channel {}",
                    format,
                    v
                );
            }
        }
    }

    #[test]
    fn test_565_green_promotion() {
        // Full 5-bit green becomes full 6-bit green
        assert_eq!(PixelFormat::Rgb565.build_pixel(0, 31, 0), 0x07E0);
        // Below the high bit nothing is promoted
        assert_eq!(PixelFormat::Rgb565.build_pixel(0, 0x0f, 0), 0x0f << 6);
        assert_eq!(PixelFormat::Rgb555.build_pixel(0, 31, 0), 0x03E0);
    }

    #[test]
    fn test_masks_cover_whole_pixel() {
        for format in [PixelFormat::Rgb555, PixelFormat::Rgb565] {
            let l = format.layout();
            assert_eq!(l.red_mask & l.green_mask, 0);
            assert_eq!(l.green_mask & l.blue_mask, 0);
            assert_eq!(l.hi_bits_mask_x2, (l.hi_bits_mask as u32) << 1);
            assert_eq!(l.red_blue_mask(), l.red_mask | l.blue_mask);
            assert_eq!(l.low_bits_mask & l.hi_bits_mask, 0);
        }
        assert_eq!(
            PixelFormat::Rgb565.layout().red_mask
                | PixelFormat::Rgb565.layout().green_mask
                | PixelFormat::Rgb565.layout().blue_mask,
            0xFFFF
        );
    }

    #[test]
    fn test_to_argb() {
        let white = PixelFormat::Rgb565.build_pixel(31, 31, 31);
        assert_eq!(PixelFormat::Rgb565.to_argb(white), 0xFFFFFFFF);

        let red = PixelFormat::Rgb555.build_pixel(31, 0, 0);
        assert_eq!(PixelFormat::Rgb555.to_argb(red), ColorOps::from_rgb(0xFF, 0, 0));

        let mid = PixelFormat::Rgb555.build_pixel(16, 1, 0);
        assert_eq!(PixelFormat::Rgb555.to_argb(mid), ColorOps::from_rgb(0x84, 0x08, 0));
    }

    #[test]
    fn test_from_bgr555() {
        // CGRAM stores blue in the high bits
        let word = 0x7C00;
        assert_eq!(PixelFormat::Rgb555.decompose(PixelFormat::Rgb555.from_bgr555(word)), (0, 0, 31));
    }

    #[test]
    fn test_format_serde_names() {
        let json = serde_json::to_string(&PixelFormat::Rgb555).expect("serialize");
        assert_eq!(json, "\"rgb555\"");
        let back: PixelFormat = serde_json::from_str("\"rgb565\"").expect("deserialize");
        assert_eq!(back, PixelFormat::Rgb565);
    }
}
