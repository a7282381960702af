//! Renderer selection.
//!
//! Every shape is instantiated for every plotter family and every blend, and
//! the resulting functions are collected into tables once at start-up. The
//! composition loop picks a [`TileRenderers`] per layer; the draw calls then
//! go straight to a monomorphic inner loop.
//!
//! ```text
//! RendererTables[family][shape][math mode] -> DrawFn
//!        select(flags, mode) -> TileRenderers { nomath, math }
//! ```

use serde::{Deserialize, Serialize};

use gfx_core::logging::{log, LogCategory, LogLevel};

use crate::color_math::{Add, AddBrightness, MathF1_2, MathS1_2, NoMath, RegMath, Sub};
use crate::context::RenderContext;
use crate::mode7::{Bg1, Bg2, Mode7Args, Mode7MosaicRow, Mode7Row};
use crate::names::PixelKind;
use crate::plotter::{
    HiresFamily, HiresInterlaceFamily, InterlaceFamily, Normal1x1Family, Normal2x1Family,
    PlotterFamily,
};
use crate::tile_renderer::{
    Backdrop, BackdropArgs, ClippedTile, ClippedTileArgs, MosaicPixel, MosaicPixelArgs, PlainTile,
    TileArgs, TileShape,
};
use crate::RenderError;

/// A concrete (shape, plotter, blend) renderer.
pub type DrawFn<A> = fn(&mut RenderContext<'_>, A);

/// Blend applied when a pixel is drawn.
///
/// "Half" modes halve the result unless color clipping is active; the
/// conditional variants halve only where a sub screen pixel was blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MathMode {
    #[default]
    None,
    Add,
    AddHalf,
    AddHalfConditional,
    Sub,
    SubHalf,
    SubHalfConditional,
    AddBrightness,
    AddBrightnessHalfConditional,
}

impl MathMode {
    pub const COUNT: usize = 9;

    pub const ALL: [MathMode; Self::COUNT] = [
        MathMode::None,
        MathMode::Add,
        MathMode::AddHalf,
        MathMode::AddHalfConditional,
        MathMode::Sub,
        MathMode::SubHalf,
        MathMode::SubHalfConditional,
        MathMode::AddBrightness,
        MathMode::AddBrightnessHalfConditional,
    ];

    /// Position in the renderer tables.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Self, RenderError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(RenderError::UnknownMathMode(index))
    }

    /// Derive the mode from CGWSEL ($2130), CGADSUB ($2131), the
    /// transparency setting and the frame's maximum brightness.
    ///
    /// The per-layer enable bits of CGADSUB are not consulted here; they
    /// decide which [`RenderSet`] each layer draws with.
    pub fn from_registers(cgwsel: u8, cgadsub: u8, transparency: bool, max_brightness: u8) -> Self {
        if !transparency {
            return MathMode::None;
        }

        let mut index = if cgadsub & 0x80 != 0 { 4 } else { 1 };
        if cgadsub & 0x40 != 0 {
            index += 1;
            if cgwsel & 0x02 != 0 {
                index += 1;
            }
        }
        if max_brightness != 0xf {
            index = match index {
                1 => 7,
                3 => 8,
                other => other,
            };
        }
        Self::ALL[index]
    }
}

/// Screen state that decides the pixel addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RendererFlags {
    /// Background mode (0-7).
    pub bg_mode: u8,
    /// Drawing the sub screen.
    pub sub: bool,
    /// The frame has 512-pixel lines.
    pub double_width: bool,
    pub interlace: bool,
}

impl RendererFlags {
    /// Modes 5 and 6 draw real hires pixels on the main screen.
    pub fn hires(&self) -> bool {
        !self.sub && matches!(self.bg_mode, 5 | 6) && self.double_width
    }

    pub fn family(&self) -> PixelKind {
        if !self.double_width {
            return PixelKind::Normal1x1;
        }
        match (self.interlace, self.hires()) {
            (true, true) => PixelKind::HiresInterlace,
            (true, false) => PixelKind::Interlace,
            (false, true) => PixelKind::Hires,
            (false, false) => PixelKind::Normal2x1,
        }
    }

    /// Mode 7 never uses hires or interlaced addressing.
    pub fn mode7_family(&self) -> PixelKind {
        if self.double_width {
            PixelKind::Normal2x1
        } else {
            PixelKind::Normal1x1
        }
    }
}

/// One renderer per shape.
#[derive(Clone, Copy)]
pub struct ShapeSet {
    pub tile: DrawFn<TileArgs>,
    pub clipped_tile: DrawFn<ClippedTileArgs>,
    pub mosaic_pixel: DrawFn<MosaicPixelArgs>,
    pub backdrop: DrawFn<BackdropArgs>,
    pub mode7_bg1: DrawFn<Mode7Args>,
    pub mode7_bg2: DrawFn<Mode7Args>,
    pub mode7_mosaic_bg1: DrawFn<Mode7Args>,
    pub mode7_mosaic_bg2: DrawFn<Mode7Args>,
}

/// Which of a layer's two renderer sets to draw with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSet {
    /// Plain writes, used for the sub screen and math-disabled layers.
    NoMath,
    /// The layer's selected blend.
    Math,
}

/// Renderers chosen for the current layer.
#[derive(Clone, Copy)]
pub struct TileRenderers {
    nomath: ShapeSet,
    math: ShapeSet,
    mode: MathMode,
    family: PixelKind,
}

impl TileRenderers {
    #[inline]
    pub fn set(&self, set: RenderSet) -> &ShapeSet {
        match set {
            RenderSet::NoMath => &self.nomath,
            RenderSet::Math => &self.math,
        }
    }

    pub fn mode(&self) -> MathMode {
        self.mode
    }

    pub fn family(&self) -> PixelKind {
        self.family
    }
}

impl std::fmt::Debug for TileRenderers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileRenderers")
            .field("mode", &self.mode)
            .field("family", &self.family)
            .finish()
    }
}

impl Default for TileRenderers {
    fn default() -> Self {
        let table = FamilyTable::build::<Normal1x1Family>();
        let nomath = table.shapes(MathMode::None, &table);
        Self {
            nomath,
            math: nomath,
            mode: MathMode::None,
            family: PixelKind::Normal1x1,
        }
    }
}

fn blends<S: TileShape, F: PlotterFamily>() -> [DrawFn<S::Args>; MathMode::COUNT] {
    [
        S::draw::<F::Plotter<NoMath>>,
        S::draw::<F::Plotter<RegMath<Add>>>,
        S::draw::<F::Plotter<MathF1_2<Add>>>,
        S::draw::<F::Plotter<MathS1_2<Add>>>,
        S::draw::<F::Plotter<RegMath<Sub>>>,
        S::draw::<F::Plotter<MathF1_2<Sub>>>,
        S::draw::<F::Plotter<MathS1_2<Sub>>>,
        S::draw::<F::Plotter<RegMath<AddBrightness>>>,
        S::draw::<F::Plotter<MathS1_2<AddBrightness>>>,
    ]
}

/// All blends of all shapes for one plotter family.
struct FamilyTable {
    tile: [DrawFn<TileArgs>; MathMode::COUNT],
    clipped_tile: [DrawFn<ClippedTileArgs>; MathMode::COUNT],
    mosaic_pixel: [DrawFn<MosaicPixelArgs>; MathMode::COUNT],
    backdrop: [DrawFn<BackdropArgs>; MathMode::COUNT],
    mode7_bg1: [DrawFn<Mode7Args>; MathMode::COUNT],
    mode7_bg2: [DrawFn<Mode7Args>; MathMode::COUNT],
    mode7_mosaic_bg1: [DrawFn<Mode7Args>; MathMode::COUNT],
    mode7_mosaic_bg2: [DrawFn<Mode7Args>; MathMode::COUNT],
}

impl FamilyTable {
    fn build<F: PlotterFamily>() -> Self {
        Self {
            tile: blends::<PlainTile, F>(),
            clipped_tile: blends::<ClippedTile, F>(),
            mosaic_pixel: blends::<MosaicPixel, F>(),
            backdrop: blends::<Backdrop, F>(),
            mode7_bg1: blends::<Mode7Row<Bg1>, F>(),
            mode7_bg2: blends::<Mode7Row<Bg2>, F>(),
            mode7_mosaic_bg1: blends::<Mode7MosaicRow<Bg1>, F>(),
            mode7_mosaic_bg2: blends::<Mode7MosaicRow<Bg2>, F>(),
        }
    }

    /// Tile shapes from `self`, Mode 7 shapes from `mode7`.
    fn shapes(&self, mode: MathMode, mode7: &FamilyTable) -> ShapeSet {
        let i = mode.index();
        ShapeSet {
            tile: self.tile[i],
            clipped_tile: self.clipped_tile[i],
            mosaic_pixel: self.mosaic_pixel[i],
            backdrop: self.backdrop[i],
            mode7_bg1: mode7.mode7_bg1[i],
            mode7_bg2: mode7.mode7_bg2[i],
            mode7_mosaic_bg1: mode7.mode7_mosaic_bg1[i],
            mode7_mosaic_bg2: mode7.mode7_mosaic_bg2[i],
        }
    }
}

/// Every renderer, built once.
pub struct RendererTables {
    families: [FamilyTable; 5],
}

impl RendererTables {
    pub fn new() -> Self {
        Self {
            families: [
                FamilyTable::build::<Normal1x1Family>(),
                FamilyTable::build::<Normal2x1Family>(),
                FamilyTable::build::<InterlaceFamily>(),
                FamilyTable::build::<HiresFamily>(),
                FamilyTable::build::<HiresInterlaceFamily>(),
            ],
        }
    }

    fn family(&self, kind: PixelKind) -> &FamilyTable {
        let index = match kind {
            PixelKind::Normal1x1 => 0,
            PixelKind::Normal2x1 => 1,
            PixelKind::Interlace => 2,
            PixelKind::Hires => 3,
            PixelKind::HiresInterlace => 4,
        };
        &self.families[index]
    }

    /// Renderers for one layer.
    pub fn select(&self, flags: RendererFlags, mode: MathMode) -> TileRenderers {
        let kind = flags.family();
        let family = self.family(kind);
        let mode7 = self.family(flags.mode7_family());

        log(LogCategory::Render, LogLevel::Trace, || {
            format!(
                "Renderers: {} / {:?} (bg mode {}, sub {})",
                kind.as_str(),
                mode,
                flags.bg_mode,
                flags.sub
            )
        });

        TileRenderers {
            nomath: family.shapes(MathMode::None, mode7),
            math: family.shapes(mode, mode7),
            mode,
            family: kind,
        }
    }
}

impl Default for RendererTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_mode_index_roundtrip() {
        for (i, mode) in MathMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
            assert_eq!(MathMode::from_index(i).unwrap(), *mode);
        }
        assert!(matches!(
            MathMode::from_index(9),
            Err(RenderError::UnknownMathMode(9))
        ));
    }

    #[test]
    fn test_math_mode_from_registers() {
        assert_eq!(MathMode::from_registers(0x02, 0xff, false, 15), MathMode::None);
        // Layer enable bits do not affect the mode
        assert_eq!(MathMode::from_registers(0, 0x00, true, 15), MathMode::Add);
        assert_eq!(MathMode::from_registers(0, 0xc0, true, 15), MathMode::SubHalf);

        assert_eq!(MathMode::from_registers(0, 0x01, true, 15), MathMode::Add);
        assert_eq!(MathMode::from_registers(0, 0x41, true, 15), MathMode::AddHalf);
        assert_eq!(
            MathMode::from_registers(0x02, 0x41, true, 15),
            MathMode::AddHalfConditional
        );
        assert_eq!(MathMode::from_registers(0, 0x81, true, 15), MathMode::Sub);
        assert_eq!(MathMode::from_registers(0, 0xc1, true, 15), MathMode::SubHalf);
        assert_eq!(
            MathMode::from_registers(0x02, 0xc1, true, 15),
            MathMode::SubHalfConditional
        );
    }

    #[test]
    fn test_dimmed_frames_use_brightness_blends() {
        assert_eq!(MathMode::from_registers(0, 0x01, true, 8), MathMode::AddBrightness);
        assert_eq!(
            MathMode::from_registers(0x02, 0x41, true, 8),
            MathMode::AddBrightnessHalfConditional
        );
        // Fixed-colour half add and subtraction are unaffected
        assert_eq!(MathMode::from_registers(0, 0x41, true, 8), MathMode::AddHalf);
        assert_eq!(MathMode::from_registers(0, 0x81, true, 8), MathMode::Sub);
    }

    #[test]
    fn test_family_selection() {
        let mut flags = RendererFlags::default();
        assert_eq!(flags.family(), PixelKind::Normal1x1);
        assert_eq!(flags.mode7_family(), PixelKind::Normal1x1);

        flags.double_width = true;
        assert_eq!(flags.family(), PixelKind::Normal2x1);
        assert_eq!(flags.mode7_family(), PixelKind::Normal2x1);

        flags.bg_mode = 5;
        assert_eq!(flags.family(), PixelKind::Hires);
        flags.interlace = true;
        assert_eq!(flags.family(), PixelKind::HiresInterlace);

        flags.sub = true;
        assert_eq!(flags.family(), PixelKind::Interlace);

        flags.interlace = false;
        flags.double_width = false;
        assert_eq!(flags.family(), PixelKind::Normal1x1);
    }

    #[test]
    fn test_select_records_mode() {
        let tables = RendererTables::new();
        let flags = RendererFlags {
            bg_mode: 1,
            double_width: true,
            ..Default::default()
        };
        let renderers = tables.select(flags, MathMode::SubHalf);
        assert_eq!(renderers.mode(), MathMode::SubHalf);
        assert_eq!(renderers.family(), PixelKind::Normal2x1);

        let default = TileRenderers::default();
        assert_eq!(default.mode(), MathMode::None);
        assert_eq!(default.family(), PixelKind::Normal1x1);
    }
}
