//! Catalog of every tile and palette drawn during a session.
//!
//! Tiles and palettes are keyed by their raw content, so a tile drawn with
//! different palettes, at different positions or on different layers is one
//! record. Each tile accumulates references: screen positions where it was
//! seen, recorded on its first sighting, at configurable milestones of
//! distinct frames, and once per orientation. Each new reference raises a
//! request for a screenshot that shows it in context.
//!
//! Records are only appended or counted; the catalog is cleared as a whole
//! by [`CaptureStore::reset`].

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use gfx_core::graphics::PixelFormat;
use gfx_core::logging::{log, LogCategory, LogLevel};

use crate::names::RenderMode;
use crate::tile_cache::{H_FLIP, V_FLIP};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub enabled: bool,
    /// Distinct-frame sighting counts that create a reference.
    pub milestones: Vec<u32>,
    /// Record one reference per flip orientation.
    pub track_orientations: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            milestones: vec![1, 10, 100, 1000],
            track_orientations: true,
        }
    }
}

/// Flip combination a tile was drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Normal,
    HFlip,
    VFlip,
    HVFlip,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Normal,
        Orientation::HFlip,
        Orientation::VFlip,
        Orientation::HVFlip,
    ];

    pub fn from_tile(tile: u32) -> Self {
        match (tile & H_FLIP != 0, tile & V_FLIP != 0) {
            (false, false) => Orientation::Normal,
            (true, false) => Orientation::HFlip,
            (false, true) => Orientation::VFlip,
            (true, true) => Orientation::HVFlip,
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// One opaque tile draw, as reported by the tile renderer.
#[derive(Debug, Clone, Copy)]
pub struct TileSighting<'a> {
    /// Tile reference word, flip bits included.
    pub tile: u32,
    pub pixels: &'a [u8; 64],
    /// Active palette, starting at the tile's first color.
    pub palette: &'a [u16],
    pub palette_size: u32,
    /// Plane offset of the first drawn line.
    pub offset: u32,
    /// Byte offset of the first drawn row in the tile.
    pub start_line: u32,
    pub line_count: u32,
    pub real_ppl: u32,
    pub frame: u32,
    pub mode: RenderMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub id: u32,
    pub pixels: [u8; 64],
    pub palette_size: u32,
    pub last_seen_frame: u32,
    /// Number of distinct frames the tile was drawn on.
    pub seen_on_frames: u32,
    /// Draws per palette id.
    pub palettes_used: BTreeMap<u32, u32>,
    pub used_in_background: bool,
    pub used_in_sprite: bool,
    /// Reference id per reached milestone.
    pub milestone_refs: BTreeMap<u32, u32>,
    /// Reference id per orientation, 0 when never drawn that way.
    pub orientation_refs: [u32; 4],
}

impl TileRecord {
    pub fn orientation_ref(&self, orientation: Orientation) -> u32 {
        self.orientation_refs[orientation.index()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteRecord {
    pub id: u32,
    pub colors: Vec<u16>,
    /// Draw calls that used this palette.
    pub frequency: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReferenceRecord {
    #[serde(rename = "ID")]
    pub id: u32,
    pub tile: u32,
    #[serde(rename = "ScreenshotID")]
    pub screenshot_id: u32,
    pub frame: u32,
    pub x: u32,
    pub y: u32,
    pub start_line: u32,
    pub line_count: u32,
    #[serde(rename = "MATH")]
    pub math: &'static str,
    #[serde(rename = "PIXEL")]
    pub pixel: &'static str,
    #[serde(rename = "OP")]
    pub op: &'static str,
    #[serde(rename = "BPSTART")]
    pub bp_start: &'static str,
    #[serde(rename = "TILE")]
    pub shape: &'static str,
    #[serde(rename = "ColorPaletteID")]
    pub palette_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptureSummary {
    pub tiles: usize,
    pub palettes: usize,
    pub references: usize,
}

pub struct CaptureStore {
    config: CaptureConfig,
    format: PixelFormat,
    tiles: Vec<TileRecord>,
    tile_index: HashMap<[u8; 64], usize>,
    palettes: Vec<PaletteRecord>,
    palette_index: HashMap<Vec<u16>, usize>,
    references: Vec<ReferenceRecord>,
    next_tile_id: u32,
    next_palette_id: u32,
    next_reference_id: u32,
    screenshot_id: u32,
    take_reference_screenshot: bool,
    drawing_objects: bool,
}

impl CaptureStore {
    pub fn new(config: CaptureConfig, format: PixelFormat) -> Self {
        Self {
            config,
            format,
            tiles: Vec::new(),
            tile_index: HashMap::new(),
            palettes: Vec::new(),
            palette_index: HashMap::new(),
            references: Vec::new(),
            next_tile_id: 1,
            next_palette_id: 1,
            next_reference_id: 1,
            screenshot_id: 1,
            take_reference_screenshot: false,
            drawing_objects: false,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Mark following sightings as sprite (`true`) or background draws.
    pub fn set_drawing_objects(&mut self, drawing_objects: bool) {
        self.drawing_objects = drawing_objects;
    }

    /// Catalog one tile draw.
    pub fn record(&mut self, sighting: &TileSighting<'_>) {
        if !self.config.enabled {
            return;
        }

        let size = (sighting.palette_size as usize).min(sighting.palette.len());
        let palette_id = self.find_or_insert_palette(&sighting.palette[..size]);

        let index = match self.tile_index.get(sighting.pixels) {
            Some(&index) => index,
            None => self.insert_tile(sighting, palette_id),
        };

        if self.drawing_objects {
            self.tiles[index].used_in_sprite = true;
        } else {
            self.tiles[index].used_in_background = true;
        }

        if self.config.track_orientations {
            let slot = Orientation::from_tile(sighting.tile).index();
            if self.tiles[index].orientation_refs[slot] == 0 {
                let id = self.create_reference(sighting, palette_id);
                self.tiles[index].orientation_refs[slot] = id;
            }
        }

        if self.tiles[index].last_seen_frame != sighting.frame {
            let tile = &mut self.tiles[index];
            tile.last_seen_frame = sighting.frame;
            tile.seen_on_frames += 1;
            let seen = tile.seen_on_frames;
            if self.config.milestones.contains(&seen) {
                let id = self.create_reference(sighting, palette_id);
                self.tiles[index].milestone_refs.insert(seen, id);
            }
        }

        let tile = &mut self.tiles[index];
        *tile.palettes_used.entry(palette_id).or_insert(0) += 1;

        if tile.palette_size != sighting.palette_size {
            log(LogCategory::Capture, LogLevel::Info, || {
                format!(
                    "Tile #{} drawn with a {}-color palette (first seen with {})",
                    tile.id, sighting.palette_size, tile.palette_size
                )
            });
        }
    }

    fn find_or_insert_palette(&mut self, colors: &[u16]) -> u32 {
        if let Some(&index) = self.palette_index.get(colors) {
            let palette = &mut self.palettes[index];
            palette.frequency += 1;
            return palette.id;
        }

        let id = self.next_palette_id;
        self.next_palette_id += 1;
        self.palette_index.insert(colors.to_vec(), self.palettes.len());
        self.palettes.push(PaletteRecord {
            id,
            colors: colors.to_vec(),
            frequency: 1,
        });
        id
    }

    fn insert_tile(&mut self, sighting: &TileSighting<'_>, palette_id: u32) -> usize {
        let id = self.next_tile_id;
        self.next_tile_id += 1;

        let mut milestone_refs = BTreeMap::new();
        if self.config.milestones.contains(&1) {
            milestone_refs.insert(1, self.create_reference(sighting, palette_id));
        }

        let index = self.tiles.len();
        self.tiles.push(TileRecord {
            id,
            pixels: *sighting.pixels,
            palette_size: sighting.palette_size,
            last_seen_frame: sighting.frame,
            seen_on_frames: 1,
            palettes_used: BTreeMap::new(),
            used_in_background: false,
            used_in_sprite: false,
            milestone_refs,
            orientation_refs: [0; 4],
        });
        self.tile_index.insert(*sighting.pixels, index);

        log(LogCategory::Capture, LogLevel::Debug, || {
            format!("New tile #{} on frame {}", id, sighting.frame)
        });
        index
    }

    fn create_reference(&mut self, sighting: &TileSighting<'_>, palette_id: u32) -> u32 {
        let id = self.next_reference_id;
        self.next_reference_id += 1;

        let real_ppl = sighting.real_ppl.max(1);
        let [math, pixel, op, bp_start, shape] = sighting.mode.names();
        self.references.push(ReferenceRecord {
            id,
            tile: sighting.tile,
            screenshot_id: self.screenshot_id,
            frame: sighting.frame,
            x: sighting.offset % real_ppl,
            y: (sighting.offset / real_ppl).saturating_sub(sighting.start_line / 8),
            start_line: sighting.start_line,
            line_count: sighting.line_count,
            math,
            pixel,
            op,
            bp_start,
            shape,
            palette_id,
        });
        self.take_reference_screenshot = true;

        log(LogCategory::Capture, LogLevel::Debug, || {
            format!(
                "Reference #{} for tile word {:#06x} (screenshot {})",
                id, sighting.tile, self.screenshot_id
            )
        });
        id
    }

    /// A reference was created since the last screenshot.
    pub fn reference_screenshot_requested(&self) -> bool {
        self.take_reference_screenshot
    }

    /// Id the next reference screenshot is stored under.
    pub fn screenshot_id(&self) -> u32 {
        self.screenshot_id
    }

    /// Clear the request and move to the next screenshot id.
    pub fn complete_reference_screenshot(&mut self) {
        self.take_reference_screenshot = false;
        self.screenshot_id += 1;
    }

    pub fn tiles(&self) -> &[TileRecord] {
        &self.tiles
    }

    pub fn palettes(&self) -> &[PaletteRecord] {
        &self.palettes
    }

    pub fn references(&self) -> &[ReferenceRecord] {
        &self.references
    }

    pub fn tile(&self, pixels: &[u8; 64]) -> Option<&TileRecord> {
        self.tile_index.get(pixels).map(|&i| &self.tiles[i])
    }

    pub fn palette(&self, colors: &[u16]) -> Option<&PaletteRecord> {
        self.palette_index.get(colors).map(|&i| &self.palettes[i])
    }

    pub fn summary(&self) -> CaptureSummary {
        let summary = CaptureSummary {
            tiles: self.tiles.len(),
            palettes: self.palettes.len(),
            references: self.references.len(),
        };
        log(LogCategory::Capture, LogLevel::Info, || {
            format!(
                "Unique tiles: {}, unique palettes: {}, references: {}",
                summary.tiles, summary.palettes, summary.references
            )
        });
        summary
    }

    /// Drop every record and restart all ids at 1.
    pub fn reset(&mut self) {
        self.tiles.clear();
        self.tile_index.clear();
        self.palettes.clear();
        self.palette_index.clear();
        self.references.clear();
        self.next_tile_id = 1;
        self.next_palette_id = 1;
        self.next_reference_id = 1;
        self.screenshot_id = 1;
        self.take_reference_screenshot = false;
        self.drawing_objects = false;
        log(LogCategory::Capture, LogLevel::Info, || "Capture catalog reset".to_string());
    }

    /// The whole catalog as nested JSON.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        let catalog = CatalogExport {
            tiles: self.tiles.iter().map(TileExport::from).collect(),
            palettes: self
                .palettes
                .iter()
                .map(|p| PaletteExport {
                    id: p.id,
                    size: p.colors.len(),
                    frequency: p.frequency,
                    colors: p
                        .colors
                        .iter()
                        .map(|&c| {
                            let (r, g, b) = self.format.to_rgb888(c);
                            [r, g, b]
                        })
                        .collect(),
                })
                .collect(),
            references: &self.references,
        };
        serde_json::to_string_pretty(&catalog)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TileExport<'a> {
    #[serde(rename = "ID")]
    id: u32,
    milestone_refs: &'a BTreeMap<u32, u32>,
    #[serde(rename = "RefNNID")]
    ref_nn: u32,
    #[serde(rename = "RefFNID")]
    ref_fn: u32,
    #[serde(rename = "RefNFID")]
    ref_nf: u32,
    #[serde(rename = "RefFFID")]
    ref_ff: u32,
    pixels: &'a [u8],
    palettes: &'a BTreeMap<u32, u32>,
    palette_size: u32,
    last_seen_on_frame: u32,
    seen_on_frames: u32,
    palettes_seen: usize,
    used_in_background: bool,
    used_in_sprite: bool,
}

impl<'a> From<&'a TileRecord> for TileExport<'a> {
    fn from(tile: &'a TileRecord) -> Self {
        Self {
            id: tile.id,
            milestone_refs: &tile.milestone_refs,
            ref_nn: tile.orientation_ref(Orientation::Normal),
            ref_fn: tile.orientation_ref(Orientation::HFlip),
            ref_nf: tile.orientation_ref(Orientation::VFlip),
            ref_ff: tile.orientation_ref(Orientation::HVFlip),
            pixels: &tile.pixels,
            palettes: &tile.palettes_used,
            palette_size: tile.palette_size,
            last_seen_on_frame: tile.last_seen_frame,
            seen_on_frames: tile.seen_on_frames,
            palettes_seen: tile.palettes_used.len(),
            used_in_background: tile.used_in_background,
            used_in_sprite: tile.used_in_sprite,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PaletteExport {
    #[serde(rename = "ID")]
    id: u32,
    size: usize,
    frequency: u32,
    colors: Vec<[u8; 3]>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogExport<'a> {
    tiles: Vec<TileExport<'a>>,
    palettes: Vec<PaletteExport>,
    references: &'a [ReferenceRecord],
}
