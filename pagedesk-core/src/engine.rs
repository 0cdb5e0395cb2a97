use std::path::{Path, PathBuf};

use anyhow::Result;

/// Quarter-turn page rotation, clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageRotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl PageRotation {
    pub fn degrees(self) -> u16 {
        match self {
            PageRotation::None => 0,
            PageRotation::Clockwise90 => 90,
            PageRotation::Clockwise180 => 180,
            PageRotation::Clockwise270 => 270,
        }
    }

    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => PageRotation::Clockwise90,
            180 => PageRotation::Clockwise180,
            270 => PageRotation::Clockwise270,
            _ => PageRotation::None,
        }
    }

    /// The next quarter turn clockwise, wrapping at 360.
    pub fn advanced(self) -> Self {
        match self {
            PageRotation::None => PageRotation::Clockwise90,
            PageRotation::Clockwise90 => PageRotation::Clockwise180,
            PageRotation::Clockwise180 => PageRotation::Clockwise270,
            PageRotation::Clockwise270 => PageRotation::None,
        }
    }

    pub fn swaps_axes(self) -> bool {
        matches!(self, PageRotation::Clockwise90 | PageRotation::Clockwise270)
    }
}

/// Per-page geometry as reported by the engine. `width`/`height` are in page
/// points with the current rotation already applied, so a 90°/270° rotation
/// swaps the two.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub rotation: PageRotation,
}

#[derive(Debug, Clone, Copy)]
pub struct RasterRequest {
    pub page_index: usize,
    pub zoom: f32,
}

impl Default for RasterRequest {
    fn default() -> Self {
        Self {
            page_index: 0,
            zoom: 1.0,
        }
    }
}

/// RGBA8 bitmap produced by rasterization.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Bounding box of an embedded image on a page, in unscaled page points with
/// a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Factory side of the engine boundary: turns paths into open documents.
pub trait DocumentEngine {
    fn open(&self, path: &Path) -> Result<Box<dyn DocumentHandle>>;

    /// Concatenates every source document's pages, in list order, into one
    /// new in-memory document.
    fn concatenate(&self, sources: &[PathBuf]) -> Result<Box<dyn DocumentHandle>>;
}

/// An open document. The handle is owned exclusively by the session and
/// replaced wholesale when another file is opened.
pub trait DocumentHandle {
    fn page_count(&self) -> usize;

    fn page_geometry(&self, page_index: usize) -> Result<PageGeometry>;

    fn rotation(&self, page_index: usize) -> Result<PageRotation>;

    fn set_rotation(&mut self, page_index: usize, rotation: PageRotation) -> Result<()>;

    fn rasterize(&self, request: RasterRequest) -> Result<PageImage>;

    /// Bounding boxes of embedded images on the page, used to blank them in
    /// text-only mode.
    fn image_regions(&self, page_index: usize) -> Result<Vec<RegionRect>>;

    /// Removes the page at `from` and reinserts it at `to`.
    fn move_page(&mut self, from: usize, to: usize) -> Result<()>;

    fn delete_page(&mut self, page_index: usize) -> Result<()>;

    /// Builds a new document containing exactly the given pages, in the
    /// given order. Indices are 0-based and must be in range.
    fn select_pages(&self, page_indices: &[usize]) -> Result<Box<dyn DocumentHandle>>;

    fn save_as(&self, path: &Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_quarter_turns_return_to_origin() {
        let mut rotation = PageRotation::None;
        for _ in 0..4 {
            rotation = rotation.advanced();
        }
        assert_eq!(rotation, PageRotation::None);
    }

    #[test]
    fn rotation_degrees_round_trip() {
        for rotation in [
            PageRotation::None,
            PageRotation::Clockwise90,
            PageRotation::Clockwise180,
            PageRotation::Clockwise270,
        ] {
            assert_eq!(
                PageRotation::from_degrees(rotation.degrees() as i32),
                rotation
            );
        }
        assert_eq!(PageRotation::from_degrees(450), PageRotation::Clockwise90);
        assert_eq!(PageRotation::from_degrees(-90), PageRotation::Clockwise270);
    }

    #[test]
    fn only_odd_quarter_turns_swap_axes() {
        assert!(!PageRotation::None.swaps_axes());
        assert!(PageRotation::Clockwise90.swaps_axes());
        assert!(!PageRotation::Clockwise180.swaps_axes());
        assert!(PageRotation::Clockwise270.swaps_axes());
    }
}
