use std::collections::HashMap;

use crate::engine::{PageImage, RegionRect};
use crate::layout::Layout;

/// Rasterized pages for the current zoom level, keyed by page index. An
/// image computed at a stale zoom is never reused: any zoom, layout-mode, or
/// text-only change clears the whole map.
#[derive(Debug)]
pub struct RenderCache {
    entries: HashMap<usize, PageImage>,
    invalidated: bool,
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderCache {
    /// A new cache starts invalidated so the first reconcile pass tells the
    /// UI to drop whatever textures a previous document left behind.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            invalidated: true,
        }
    }

    pub fn contains(&self, page_index: usize) -> bool {
        self.entries.contains_key(&page_index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cached_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.entries.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn insert(&mut self, page_index: usize, image: PageImage) {
        self.entries.insert(page_index, image);
    }

    pub fn remove(&mut self, page_index: usize) {
        self.entries.remove(&page_index);
    }

    /// Drops every entry and marks the cache as wholesale-invalidated so the
    /// next reconcile pass can tell the UI to drop its textures too.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.invalidated = true;
    }

    pub fn take_invalidated(&mut self) -> bool {
        std::mem::take(&mut self.invalidated)
    }
}

/// Work order produced by [`plan_reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// In-range pages missing from the cache, in page-index order.
    pub to_render: Vec<usize>,
    /// Cached pages that scrolled out of range.
    pub to_evict: Vec<usize>,
}

/// What a reconcile pass actually did, for the UI to mirror into textures.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub rendered: Vec<(usize, PageImage)>,
    pub evicted: Vec<usize>,
    /// True when the cache was wholesale-invalidated since the last pass.
    pub cache_cleared: bool,
}

/// Decides which pages to render and which cached entries to evict for the
/// band `[band_top, band_bottom]` (viewport plus lookahead, in canvas
/// points). Pure so it can be tested without an engine.
pub fn plan_reconcile(
    layout: &Layout,
    cache: &RenderCache,
    band_top: f32,
    band_bottom: f32,
) -> ReconcilePlan {
    let mut to_render = Vec::new();
    let mut in_range = vec![false; layout.rects.len()];

    for (index, rect) in layout.rects.iter().enumerate() {
        if rect.overlaps_band(band_top, band_bottom) {
            in_range[index] = true;
            if !cache.contains(index) {
                to_render.push(index);
            }
        }
    }

    let to_evict = cache
        .cached_indices()
        .into_iter()
        .filter(|&index| !in_range.get(index).copied().unwrap_or(false))
        .collect();

    ReconcilePlan {
        to_render,
        to_evict,
    }
}

/// Paints the given page-point regions solid white on a bitmap rasterized at
/// `zoom`, for text-only mode.
pub fn blank_image_regions(image: &mut PageImage, regions: &[RegionRect], zoom: f32) {
    if image.width == 0 || image.height == 0 {
        return;
    }

    let stride = image.width as usize * 4;
    for region in regions {
        let x0 = ((region.x * zoom).floor().max(0.0) as usize).min(image.width as usize);
        let y0 = ((region.y * zoom).floor().max(0.0) as usize).min(image.height as usize);
        let x1 = (((region.x + region.width) * zoom).ceil().max(0.0) as usize)
            .min(image.width as usize);
        let y1 = (((region.y + region.height) * zoom).ceil().max(0.0) as usize)
            .min(image.height as usize);

        for y in y0..y1 {
            let row = y * stride;
            for x in x0..x1 {
                let idx = row + x * 4;
                image.pixels[idx] = 255;
                image.pixels[idx + 1] = 255;
                image.pixels[idx + 2] = 255;
                image.pixels[idx + 3] = 255;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{compute_layout, LayoutMode};

    fn test_layout(pages: usize) -> Layout {
        compute_layout(&vec![(600.0, 800.0); pages], 1.0, LayoutMode::Single, 40.0)
    }

    fn dummy_image() -> PageImage {
        PageImage {
            width: 1,
            height: 1,
            pixels: vec![0, 0, 0, 255],
        }
    }

    #[test]
    fn plans_renders_for_visible_uncached_pages() {
        let layout = test_layout(10);
        let cache = RenderCache::new();

        // Viewport over the first page plus an 800pt lookahead either side.
        let plan = plan_reconcile(&layout, &cache, -760.0, 1640.0);
        assert_eq!(plan.to_render, vec![0, 1]);
        assert!(plan.to_evict.is_empty());
    }

    #[test]
    fn evicts_pages_that_scrolled_out_of_range() {
        let layout = test_layout(10);
        let mut cache = RenderCache::new();
        cache.insert(0, dummy_image());
        cache.insert(1, dummy_image());

        // Scrolled far down: pages 0 and 1 leave the band.
        let band_top = layout.rects[7].y - 800.0;
        let band_bottom = layout.rects[7].bottom() + 800.0;
        let plan = plan_reconcile(&layout, &cache, band_top, band_bottom);

        assert_eq!(plan.to_evict, vec![0, 1]);
        assert!(!plan.to_render.contains(&0));
    }

    #[test]
    fn cache_never_holds_out_of_range_pages_after_pass() {
        let layout = test_layout(20);
        let mut cache = RenderCache::new();
        for index in 0..5 {
            cache.insert(index, dummy_image());
        }

        let band_top = layout.rects[10].y - 800.0;
        let band_bottom = layout.rects[10].bottom() + 800.0;
        let plan = plan_reconcile(&layout, &cache, band_top, band_bottom);
        for index in plan.to_render {
            cache.insert(index, dummy_image());
        }
        for index in plan.to_evict {
            cache.remove(index);
        }

        for index in cache.cached_indices() {
            assert!(
                layout.rects[index].overlaps_band(band_top, band_bottom),
                "page {index} cached but out of range"
            );
        }
    }

    #[test]
    fn eviction_ignores_stale_indices_beyond_layout() {
        // A shrunken document (page deleted) may leave higher indices cached.
        let layout = test_layout(2);
        let mut cache = RenderCache::new();
        cache.insert(5, dummy_image());

        let plan = plan_reconcile(&layout, &cache, 0.0, 10_000.0);
        assert_eq!(plan.to_evict, vec![5]);
    }

    #[test]
    fn clear_reports_invalidation_once() {
        let mut cache = RenderCache::new();
        cache.insert(0, dummy_image());
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.take_invalidated());
        assert!(!cache.take_invalidated());
    }

    #[test]
    fn blanking_fills_scaled_region_with_white() {
        let mut image = PageImage {
            width: 4,
            height: 4,
            pixels: vec![0; 4 * 4 * 4],
        };
        let regions = [RegionRect {
            x: 1.0,
            y: 1.0,
            width: 1.0,
            height: 1.0,
        }];

        blank_image_regions(&mut image, &regions, 2.0);

        // Pixels inside the scaled region (2..4 on both axes) are white.
        let idx = |x: usize, y: usize| (y * 4 + x) * 4;
        assert_eq!(image.pixels[idx(2, 2)], 255);
        assert_eq!(image.pixels[idx(3, 3)], 255);
        // Outside stays untouched.
        assert_eq!(image.pixels[idx(0, 0)], 0);
        assert_eq!(image.pixels[idx(1, 2)], 0);
    }

    #[test]
    fn blanking_clamps_regions_to_image_bounds() {
        let mut image = PageImage {
            width: 2,
            height: 2,
            pixels: vec![0; 2 * 2 * 4],
        };
        let regions = [RegionRect {
            x: -5.0,
            y: -5.0,
            width: 100.0,
            height: 100.0,
        }];

        blank_image_regions(&mut image, &regions, 1.0);
        assert!(image.pixels.iter().all(|&byte| byte == 255));
    }
}
