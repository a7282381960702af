//! Stable names for renderer instantiations.
//!
//! Every renderer is a combination of a blend wrapper, a color operator, a
//! pixel plotter, a line-start rule and a tile shape. Reference records store
//! the names of that combination so offline tools can tell how a tile reached
//! the screen. The strings are part of the catalog format and never change.

use serde::{Deserialize, Serialize};

/// How the blend wrapper picks its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MathKind {
    NoMath,
    RegMath,
    MathF1_2,
    MathS1_2,
}

/// The color operator inside a blend wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Null,
    Add,
    Sub,
    AddBrightness,
}

/// Pixel addressing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelKind {
    Normal1x1,
    Normal2x1,
    Interlace,
    Hires,
    HiresInterlace,
}

/// Tile row stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineKind {
    Progressive,
    Interlace,
}

/// Drawing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Tile,
    ClippedTile,
    MosaicPixel,
    Backdrop,
    Mode7Bg1,
    Mode7Bg2,
    Mode7MosaicBg1,
    Mode7MosaicBg2,
}

impl MathKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MathKind::NoMath => "NOMATH",
            MathKind::RegMath => "REGMATH",
            MathKind::MathF1_2 => "MATHF1_2",
            MathKind::MathS1_2 => "MATHS1_2",
        }
    }
}

impl OpKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            OpKind::Null => "NULL",
            OpKind::Add => "ADD",
            OpKind::Sub => "SUB",
            OpKind::AddBrightness => "ADD_BRIGHTNESS",
        }
    }
}

impl PixelKind {
    pub const ALL: [PixelKind; 5] = [
        PixelKind::Normal1x1,
        PixelKind::Normal2x1,
        PixelKind::Interlace,
        PixelKind::Hires,
        PixelKind::HiresInterlace,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PixelKind::Normal1x1 => "Normal1x1",
            PixelKind::Normal2x1 => "Normal2x1",
            PixelKind::Interlace => "Interlace",
            PixelKind::Hires => "Hires",
            PixelKind::HiresInterlace => "HiresInterlace",
        }
    }
}

impl LineKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            LineKind::Progressive => "BPProgressive",
            LineKind::Interlace => "BPInterlace",
        }
    }
}

impl ShapeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Tile => "DrawTile16",
            ShapeKind::ClippedTile => "DrawClippedTile16",
            ShapeKind::MosaicPixel => "DrawMosaicPixel16",
            ShapeKind::Backdrop => "DrawBackdrop16",
            ShapeKind::Mode7Bg1 => "DrawMode7BG1",
            ShapeKind::Mode7Bg2 => "DrawMode7BG2",
            ShapeKind::Mode7MosaicBg1 => "DrawMode7MosaicBG1",
            ShapeKind::Mode7MosaicBg2 => "DrawMode7MosaicBG2",
        }
    }
}

/// The full identity of one renderer instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderMode {
    pub math: MathKind,
    pub op: OpKind,
    pub pixel: PixelKind,
    pub lines: LineKind,
    pub shape: ShapeKind,
}

impl RenderMode {
    /// Names in catalog order: math, pixel, op, line start, shape.
    pub fn names(&self) -> [&'static str; 5] {
        [
            self.math.as_str(),
            self.pixel.as_str(),
            self.op.as_str(),
            self.lines.as_str(),
            self.shape.as_str(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        let names = [
            MathKind::NoMath.as_str(),
            MathKind::RegMath.as_str(),
            MathKind::MathF1_2.as_str(),
            MathKind::MathS1_2.as_str(),
            OpKind::Null.as_str(),
            OpKind::Add.as_str(),
            OpKind::Sub.as_str(),
            OpKind::AddBrightness.as_str(),
            LineKind::Progressive.as_str(),
            LineKind::Interlace.as_str(),
            ShapeKind::Tile.as_str(),
            ShapeKind::ClippedTile.as_str(),
            ShapeKind::MosaicPixel.as_str(),
            ShapeKind::Backdrop.as_str(),
            ShapeKind::Mode7Bg1.as_str(),
            ShapeKind::Mode7Bg2.as_str(),
            ShapeKind::Mode7MosaicBg1.as_str(),
            ShapeKind::Mode7MosaicBg2.as_str(),
        ];
        let pixels = PixelKind::ALL.map(PixelKind::as_str);
        for name in names.iter().chain(pixels.iter()) {
            assert!(seen.insert(*name), "duplicate name {}", name);
        }
    }

    #[test]
    fn test_descriptor_order() {
        let mode = RenderMode {
            math: MathKind::MathS1_2,
            op: OpKind::Sub,
            pixel: PixelKind::Hires,
            lines: LineKind::Progressive,
            shape: ShapeKind::Tile,
        };
        assert_eq!(
            mode.names(),
            ["MATHS1_2", "Hires", "SUB", "BPProgressive", "DrawTile16"]
        );
    }
}
