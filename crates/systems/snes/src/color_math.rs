//! Color math: blending a main screen pixel with a sub screen pixel
//!
//! The PPU blends two packed colors per channel. There are three operators:
//!
//! | Operator        | Clipped (full)         | Unclipped (half)       |
//! |-----------------|------------------------|------------------------|
//! | `Add`           | saturating add         | average                |
//! | `Sub`           | saturating subtract    | halved subtract        |
//! | `AddBrightness` | capped add via table   | average                |
//!
//! Each operator is wrapped in one of four blend rules that decide where the
//! second operand comes from (the sub screen or the fixed color) and whether
//! the full or half form applies. The blend rules are zero-sized types so the
//! per-pixel plotters are monomorphized per rule and never branch on the mode.
//!
//! All arithmetic works on every channel at once using the masks of the
//! configured [`PixelFormat`].

use std::marker::PhantomData;

use gfx_core::graphics::{PixelFormat, PixelLayout};
use gfx_core::logging::{log, LogCategory, LogLevel};

use crate::names::{MathKind, OpKind};

/// Selects the sub screen pixel instead of the fixed color.
pub const SD_SUBSCREEN: u8 = 0x20;

/// Blend operators and the lookup tables they need.
#[derive(Clone)]
pub struct ColorMath {
    format: PixelFormat,
    layout: &'static PixelLayout,
    /// Halved-subtract result table, indexed by the shifted difference.
    zero: Box<[u16]>,
    brightness_cap: [u8; 64],
    /// Fixed color ($2132), packed in the screen format.
    pub fixed_colour: u16,
    /// Color window clipping is active for the pixels being drawn.
    pub clip_colors: bool,
}

impl std::fmt::Debug for ColorMath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorMath")
            .field("format", &self.format)
            .field("fixed_colour", &self.fixed_colour)
            .field("clip_colors", &self.clip_colors)
            .finish()
    }
}

impl ColorMath {
    pub fn new(format: PixelFormat) -> Self {
        let mut brightness_cap = [0u8; 64];
        for (i, cap) in brightness_cap.iter_mut().enumerate() {
            *cap = i.min(31) as u8;
        }
        log(LogCategory::ColorMath, LogLevel::Debug, || {
            format!("building blend tables for {:?}", format)
        });
        Self {
            format,
            layout: format.layout(),
            zero: build_zero_table(format),
            brightness_cap,
            fixed_colour: 0,
            clip_colors: false,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    fn promote_green(&self, pixel: u32) -> u32 {
        match self.format {
            PixelFormat::Rgb555 => pixel,
            PixelFormat::Rgb565 => pixel | ((pixel & 0x0400) >> 5),
        }
    }

    /// Per-channel `min(31, c1 + c2)`.
    #[inline]
    pub fn add(&self, c1: u16, c2: u16) -> u16 {
        let rs = self.layout.red_shift;
        let gs = self.layout.green_shift;
        let rb_mask = (0x1f << rs) | 0x1f;
        let g_mask = 0x1f << gs;
        let (c1, c2) = (c1 as u32, c2 as u32);

        let rb = (c1 & rb_mask) + (c2 & rb_mask);
        let rb_carry = rb & ((0x20 << rs) | 0x20);
        let g = (c1 & g_mask) + (c2 & g_mask);
        let saturate = (((g & (0x20 << gs)) | rb_carry) >> 5) * 0x1f;
        let pixel = (rb & rb_mask) | (g & g_mask) | saturate;
        self.promote_green(pixel) as u16
    }

    /// Per-channel `max(0, c1 - c2)`.
    #[inline]
    pub fn sub(&self, c1: u16, c2: u16) -> u16 {
        let rs = self.layout.red_shift;
        let gs = self.layout.green_shift;
        let rb_mask = (0x1f << rs) | 0x1f;
        let g_mask = 0x1f << gs;
        let (c1, c2) = (c1 as u32, c2 as u32);

        // Guard bits above each channel absorb the borrow
        let rb = ((c1 & rb_mask) | (0x20 << rs) | 0x20) - (c2 & rb_mask);
        let rb_carry = rb & ((0x20 << rs) | 0x20);
        let g = ((c1 & g_mask) | (0x20 << gs)) - (c2 & g_mask);
        let saturate = (((g & (0x20 << gs)) | rb_carry) >> 5) * 0x1f;
        let pixel = ((rb & rb_mask) | (g & g_mask)) & saturate;
        self.promote_green(pixel) as u16
    }

    /// Per-channel average, rounding down.
    #[inline]
    pub fn add_half(&self, c1: u16, c2: u16) -> u16 {
        let low = self.layout.low_bits_mask as u32;
        let keep = self.layout.remove_low_bits_mask() as u32;
        let (c1, c2) = (c1 as u32, c2 as u32);
        ((((c1 & keep) + (c2 & keep)) >> 1) + (c1 & c2 & low)) as u16
    }

    /// Per-channel halved subtract, clamped at zero.
    #[inline]
    pub fn sub_half(&self, c1: u16, c2: u16) -> u16 {
        let keep = self.layout.remove_low_bits_mask() as u32;
        let index = ((c1 as u32 | self.layout.hi_bits_mask_x2).wrapping_sub(c2 as u32 & keep)) >> 1;
        self.zero[index as usize & 0xffff]
    }

    /// Per-channel sum through the brightness cap table.
    #[inline]
    pub fn add_brightness(&self, c1: u16, c2: u16) -> u16 {
        let rs = self.layout.red_shift;
        let gs = self.layout.green_shift;
        let cap = &self.brightness_cap;
        let channel = |shift: u32| (((c1 >> shift) & 0x1f) + ((c2 >> shift) & 0x1f)) as usize;

        let r = cap[channel(rs)] as u16;
        let g = cap[channel(gs)] as u16;
        let b = cap[channel(0)] as u16;
        let mut pixel = (r << rs) | (g << gs) | b;
        if self.format == PixelFormat::Rgb565 {
            pixel |= (g & 0x10) << 1;
        }
        pixel
    }

    #[inline]
    pub fn add_brightness_half(&self, c1: u16, c2: u16) -> u16 {
        self.add_half(c1, c2)
    }
}

fn build_zero_table(format: PixelFormat) -> Box<[u16]> {
    let layout = format.layout();
    let mut zero = vec![0u16; 0x10000].into_boxed_slice();
    // Channels whose high bit is clear underflowed and go to zero
    let clear = |v: u16, hi: u16| if v & hi != 0 { v & !hi } else { 0 };

    for r in 0..32u16 {
        for g in 0..=layout.max_green {
            for b in 0..32u16 {
                let index = format.build_pixel_native(r, g, b) as usize;
                zero[index] = format.build_pixel_native(
                    clear(r, 0x10),
                    clear(g, layout.green_hi_bit),
                    clear(b, 0x10),
                );
            }
        }
    }
    zero
}

/// A blend operator with its saturating and halving forms.
pub trait ColorOp {
    const KIND: OpKind;
    fn full(math: &ColorMath, c1: u16, c2: u16) -> u16;
    fn half(math: &ColorMath, c1: u16, c2: u16) -> u16;
}

pub struct Add;
pub struct Sub;
pub struct AddBrightness;

impl ColorOp for Add {
    const KIND: OpKind = OpKind::Add;

    #[inline]
    fn full(math: &ColorMath, c1: u16, c2: u16) -> u16 {
        math.add(c1, c2)
    }

    #[inline]
    fn half(math: &ColorMath, c1: u16, c2: u16) -> u16 {
        math.add_half(c1, c2)
    }
}

impl ColorOp for Sub {
    const KIND: OpKind = OpKind::Sub;

    #[inline]
    fn full(math: &ColorMath, c1: u16, c2: u16) -> u16 {
        math.sub(c1, c2)
    }

    #[inline]
    fn half(math: &ColorMath, c1: u16, c2: u16) -> u16 {
        math.sub_half(c1, c2)
    }
}

impl ColorOp for AddBrightness {
    const KIND: OpKind = OpKind::AddBrightness;

    #[inline]
    fn full(math: &ColorMath, c1: u16, c2: u16) -> u16 {
        math.add_brightness(c1, c2)
    }

    #[inline]
    fn half(math: &ColorMath, c1: u16, c2: u16) -> u16 {
        math.add_brightness_half(c1, c2)
    }
}

/// How a plotter combines the main color with what is behind it.
///
/// `sub` is the sub screen pixel at the same position and `sd` its depth
/// tag; bit [`SD_SUBSCREEN`] of `sd` says whether the sub screen has real
/// content there.
pub trait Blend {
    const MATH: MathKind;
    const OP: OpKind;
    fn calc(math: &ColorMath, main: u16, sub: u16, sd: u8) -> u16;
}

/// No blending.
pub struct NoMath;

/// Full operator against the sub screen, or the fixed color where it is empty.
pub struct RegMath<Op>(PhantomData<fn() -> Op>);

/// Operator against the fixed color; halved unless clipped.
pub struct MathF1_2<Op>(PhantomData<fn() -> Op>);

/// Halved against the sub screen, full against the fixed color.
pub struct MathS1_2<Op>(PhantomData<fn() -> Op>);

impl Blend for NoMath {
    const MATH: MathKind = MathKind::NoMath;
    const OP: OpKind = OpKind::Null;

    #[inline]
    fn calc(_math: &ColorMath, main: u16, _sub: u16, _sd: u8) -> u16 {
        main
    }
}

impl<Op: ColorOp> Blend for RegMath<Op> {
    const MATH: MathKind = MathKind::RegMath;
    const OP: OpKind = Op::KIND;

    #[inline]
    fn calc(math: &ColorMath, main: u16, sub: u16, sd: u8) -> u16 {
        let other = if sd & SD_SUBSCREEN != 0 { sub } else { math.fixed_colour };
        Op::full(math, main, other)
    }
}

impl<Op: ColorOp> Blend for MathF1_2<Op> {
    const MATH: MathKind = MathKind::MathF1_2;
    const OP: OpKind = Op::KIND;

    #[inline]
    fn calc(math: &ColorMath, main: u16, _sub: u16, _sd: u8) -> u16 {
        if math.clip_colors {
            Op::full(math, main, math.fixed_colour)
        } else {
            Op::half(math, main, math.fixed_colour)
        }
    }
}

impl<Op: ColorOp> Blend for MathS1_2<Op> {
    const MATH: MathKind = MathKind::MathS1_2;
    const OP: OpKind = Op::KIND;

    #[inline]
    fn calc(math: &ColorMath, main: u16, sub: u16, sd: u8) -> u16 {
        if math.clip_colors {
            RegMath::<Op>::calc(math, main, sub, sd)
        } else if sd & SD_SUBSCREEN != 0 {
            Op::half(math, main, sub)
        } else {
            Op::full(math, main, math.fixed_colour)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OTHERS: [u16; 3] = [0, 17, 31];

    /// Run `check` for every (v1, v2) pair on `channel` with the other channels
    /// held at assorted values.
    fn for_each_channel_pair(format: PixelFormat, channel: usize, mut check: impl FnMut(u16, u16, u16, u16)) {
        for v1 in 0..32u16 {
            for v2 in 0..32u16 {
                for &o1 in &OTHERS {
                    for &o2 in &OTHERS {
                        let mut a = [o1, o2, o1];
                        let mut b = [o2, o1, o2];
                        a[channel] = v1;
                        b[channel] = v2;
                        let c1 = format.build_pixel(a[0], a[1], a[2]);
                        let c2 = format.build_pixel(b[0], b[1], b[2]);
                        check(v1, v2, c1, c2);
                    }
                }
            }
        }
    }

    fn channel_of(format: PixelFormat, pixel: u16, channel: usize) -> u16 {
        let (r, g, b) = format.decompose(pixel);
        [r, g, b][channel] as u16
    }

    #[test]
    fn test_add_saturates_per_channel() {
        for format in [PixelFormat::Rgb555, PixelFormat::Rgb565] {
            let math = ColorMath::new(format);
            for channel in 0..3 {
                for_each_channel_pair(format, channel, |v1, v2, c1, c2| {
                    let got = channel_of(format, math.add(c1, c2), channel);
                    assert_eq!(got, (v1 + v2).min(31), "{:?} ch{} {}+{}", format, channel, v1, v2);
                });
            }
        }
    }

    #[test]
    fn test_sub_clamps_per_channel() {
        for format in [PixelFormat::Rgb555, PixelFormat::Rgb565] {
            let math = ColorMath::new(format);
            for channel in 0..3 {
                for_each_channel_pair(format, channel, |v1, v2, c1, c2| {
                    let got = channel_of(format, math.sub(c1, c2), channel);
                    assert_eq!(got, v1.saturating_sub(v2), "{:?} ch{} {}-{}", format, channel, v1, v2);
                });
            }
        }
    }

    #[test]
    fn test_add_brightness_caps_per_channel() {
        for format in [PixelFormat::Rgb555, PixelFormat::Rgb565] {
            let math = ColorMath::new(format);
            for channel in 0..3 {
                for_each_channel_pair(format, channel, |v1, v2, c1, c2| {
                    let got = channel_of(format, math.add_brightness(c1, c2), channel);
                    assert_eq!(got, (v1 + v2).min(31));
                });
            }
        }
    }

    #[test]
    fn test_half_forms_555() {
        let format = PixelFormat::Rgb555;
        let math = ColorMath::new(format);
        for channel in 0..3 {
            for_each_channel_pair(format, channel, |v1, v2, c1, c2| {
                assert_eq!(channel_of(format, math.add_half(c1, c2), channel), (v1 + v2) >> 1);
                assert_eq!(
                    channel_of(format, math.sub_half(c1, c2), channel),
                    (v1 >> 1).saturating_sub(v2 >> 1)
                );
            });
        }
    }

    #[test]
    fn test_half_forms_565_red_blue() {
        // Green carries a sixth bit in 565, so only red and blue are exact
        let format = PixelFormat::Rgb565;
        let math = ColorMath::new(format);
        for channel in [0, 2] {
            for_each_channel_pair(format, channel, |v1, v2, c1, c2| {
                assert_eq!(channel_of(format, math.add_half(c1, c2), channel), (v1 + v2) >> 1);
                assert_eq!(
                    channel_of(format, math.sub_half(c1, c2), channel),
                    (v1 >> 1).saturating_sub(v2 >> 1)
                );
            });
        }
    }

    #[test]
    fn test_565_green_low_bit_follows_high_bit() {
        let format = PixelFormat::Rgb565;
        let math = ColorMath::new(format);
        for g1 in 0..32u16 {
            for g2 in 0..32u16 {
                let c1 = format.build_pixel(3, g1, 9);
                let c2 = format.build_pixel(28, g2, 30);
                for pixel in [math.add(c1, c2), math.sub(c1, c2), math.add_brightness(c1, c2)] {
                    assert_eq!((pixel >> 5) & 1, (pixel >> 10) & 1, "{:04X}", pixel);
                }
            }
        }
    }

    #[test]
    fn test_operators_are_total() {
        for format in [PixelFormat::Rgb555, PixelFormat::Rgb565] {
            let math = ColorMath::new(format);
            for c1 in (0..=0xFFFFu16).step_by(251) {
                for c2 in (0..=0xFFFFu16).step_by(257) {
                    math.add(c1, c2);
                    math.sub(c1, c2);
                    math.add_half(c1, c2);
                    math.sub_half(c1, c2);
                    math.add_brightness(c1, c2);
                }
            }
        }
    }

    #[test]
    fn test_blend_operand_selection() {
        let format = PixelFormat::Rgb555;
        let mut math = ColorMath::new(format);
        math.fixed_colour = format.build_pixel(0, 0, 4);
        let main = format.build_pixel(0, 0, 10);
        let sub = format.build_pixel(0, 0, 20);

        assert_eq!(NoMath::calc(&math, main, sub, 0x20), main);

        // Sub screen empty: fixed color
        assert_eq!(RegMath::<Add>::calc(&math, main, sub, 0), format.build_pixel(0, 0, 14));
        // Sub screen present: sub pixel
        assert_eq!(RegMath::<Add>::calc(&math, main, sub, 0x21), format.build_pixel(0, 0, 30));
        assert_eq!(RegMath::<Sub>::calc(&math, sub, main, 0x20), format.build_pixel(0, 0, 10));

        // Fixed-color half unless clipped
        assert_eq!(MathF1_2::<Add>::calc(&math, main, sub, 0x20), format.build_pixel(0, 0, 7));
        math.clip_colors = true;
        assert_eq!(MathF1_2::<Add>::calc(&math, main, sub, 0x20), format.build_pixel(0, 0, 14));

        // Clipped S1_2 behaves like RegMath
        assert_eq!(MathS1_2::<Add>::calc(&math, main, sub, 0x20), format.build_pixel(0, 0, 30));
        math.clip_colors = false;
        assert_eq!(MathS1_2::<Add>::calc(&math, main, sub, 0x20), format.build_pixel(0, 0, 15));
        assert_eq!(MathS1_2::<Add>::calc(&math, main, sub, 0), format.build_pixel(0, 0, 14));
    }

    #[test]
    fn test_blend_names() {
        assert_eq!(<RegMath<AddBrightness> as Blend>::OP, OpKind::AddBrightness);
        assert_eq!(<MathS1_2<Sub> as Blend>::MATH, MathKind::MathS1_2);
        assert_eq!(<NoMath as Blend>::OP, OpKind::Null);
    }
}
