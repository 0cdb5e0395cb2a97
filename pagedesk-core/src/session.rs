use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::cache::{blank_image_regions, plan_reconcile, ReconcileOutcome, RenderCache};
use crate::config::ViewerConfig;
use crate::engine::{DocumentEngine, DocumentHandle, PageImage, RasterRequest};
use crate::history::{HistoryMap, HistoryStore};
use crate::layout::{compute_layout, Layout, LayoutMode};
use crate::ranges::parse_page_ranges;
use crate::{document_id_for_path, DocumentId};

/// Probe offset below the viewport top used to decide the current page.
const CURRENT_PAGE_PROBE: f32 = 20.0;
/// Stand-in canvas width when fit-width runs before the first real layout
/// pass has produced one.
const FALLBACK_FIT_WIDTH: f32 = 800.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub enum Command {
    ZoomIn,
    ZoomOut,
    FitWidth { available_width: f32 },
    SetLayoutMode(LayoutMode),
    ToggleTextOnly,
    GotoPage { page: usize },
    MoveCurrentPage { direction: MoveDirection },
    RotateCurrentPage,
    DeletePage { page: usize },
}

/// The open document plus everything derived from it: layout state, page
/// rectangles, render cache, and scroll position.
pub struct DocumentView {
    pub id: DocumentId,
    pub path: PathBuf,
    handle: Box<dyn DocumentHandle>,
    config: ViewerConfig,
    pub zoom: f32,
    pub layout_mode: LayoutMode,
    pub text_only: bool,
    pub layout: Layout,
    cache: RenderCache,
    pub scroll_top: f32,
    pub viewport_height: f32,
    pub current_page: usize,
    pending_scroll: Option<f32>,
}

impl DocumentView {
    fn new(
        id: DocumentId,
        path: PathBuf,
        handle: Box<dyn DocumentHandle>,
        config: ViewerConfig,
        start_page: usize,
    ) -> Result<Self> {
        let mut view = Self {
            id,
            path,
            handle,
            config,
            zoom: 1.0,
            layout_mode: LayoutMode::Single,
            text_only: false,
            layout: Layout::default(),
            cache: RenderCache::new(),
            scroll_top: 0.0,
            viewport_height: 0.0,
            current_page: 0,
            pending_scroll: None,
        };
        view.relayout()?;
        view.goto_page(start_page);
        Ok(view)
    }

    pub fn page_count(&self) -> usize {
        self.handle.page_count()
    }

    pub fn cached_pages(&self) -> Vec<usize> {
        self.cache.cached_indices()
    }

    /// A one-shot scroll target (canvas y) set by navigation, zooming, and
    /// page mutations; the UI consumes it on its next frame.
    pub fn take_pending_scroll(&mut self) -> Option<f32> {
        self.pending_scroll.take()
    }

    fn page_sizes(&self) -> Result<Vec<(f32, f32)>> {
        (0..self.handle.page_count())
            .map(|index| {
                self.handle
                    .page_geometry(index)
                    .map(|geometry| (geometry.width, geometry.height))
            })
            .collect()
    }

    fn relayout(&mut self) -> Result<()> {
        let sizes = self.page_sizes()?;
        self.layout = compute_layout(
            &sizes,
            self.zoom,
            self.layout_mode,
            self.config.page_padding,
        );
        self.current_page = match self.layout.rects.len() {
            0 => 0,
            len => self.current_page.min(len - 1),
        };
        Ok(())
    }

    pub fn goto_page(&mut self, page: usize) {
        if let Some(rect) = self.layout.rects.get(page) {
            self.current_page = page;
            self.pending_scroll = Some(rect.y);
        }
    }

    /// Records the viewport and re-derives the current page: the first page
    /// whose vertical span contains a probe just below the viewport top.
    /// Probes landing in padding keep the previous page.
    pub fn update_scroll(&mut self, scroll_top: f32, viewport_height: f32) {
        self.scroll_top = scroll_top;
        self.viewport_height = viewport_height;
        if let Some(page) = self.layout.page_at(scroll_top + CURRENT_PAGE_PROBE) {
            self.current_page = page;
        }
    }

    pub fn zoom_in(&mut self) -> Result<()> {
        self.set_zoom(self.zoom * self.config.zoom_step)
    }

    pub fn zoom_out(&mut self) -> Result<()> {
        self.set_zoom(self.zoom / self.config.zoom_step)
    }

    /// Clamps into the configured bounds, recomputes the layout, drops the
    /// cache, and pins the previous current page back to the viewport top so
    /// zooming never visually jumps to another page.
    pub fn set_zoom(&mut self, zoom: f32) -> Result<()> {
        let zoom = self.config.clamp_zoom(zoom);
        if (zoom - self.zoom).abs() <= f32::EPSILON {
            return Ok(());
        }
        let top_page = self.current_page;
        self.zoom = zoom;
        self.relayout()?;
        self.cache.clear();
        self.goto_page(top_page);
        Ok(())
    }

    pub fn fit_width(&mut self, available_width: f32) -> Result<()> {
        if self.layout.is_empty() {
            return Ok(());
        }
        let available = if available_width < 100.0 {
            FALLBACK_FIT_WIDTH
        } else {
            available_width
        };
        let geometry = self.handle.page_geometry(0)?;
        if geometry.width <= 0.0 {
            return Ok(());
        }
        let columns = self.layout_mode.column_factor();
        let content = (available - self.config.page_padding * (columns + 1.0)).max(1.0);
        self.set_zoom(content / (geometry.width * columns))
    }

    pub fn set_layout_mode(&mut self, mode: LayoutMode) -> Result<()> {
        if mode == self.layout_mode {
            return Ok(());
        }
        let top_page = self.current_page;
        self.layout_mode = mode;
        self.relayout()?;
        self.cache.clear();
        self.goto_page(top_page);
        Ok(())
    }

    pub fn toggle_text_only(&mut self) -> Result<()> {
        self.text_only = !self.text_only;
        self.relayout()?;
        self.cache.clear();
        Ok(())
    }

    /// One reconciliation pass over `[viewport - lookahead, viewport +
    /// lookahead]`: rasterizes missing in-range pages, evicts the rest. A
    /// page that fails to rasterize is logged and left as a placeholder
    /// without aborting the pass.
    pub fn reconcile(&mut self) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome {
            cache_cleared: self.cache.take_invalidated(),
            ..ReconcileOutcome::default()
        };
        let band_top = self.scroll_top - self.config.lookahead;
        let band_bottom = self.scroll_top + self.viewport_height + self.config.lookahead;
        let plan = plan_reconcile(&self.layout, &self.cache, band_top, band_bottom);

        for page in plan.to_render {
            match self.render_page(page) {
                Ok(image) => {
                    self.cache.insert(page, image.clone());
                    outcome.rendered.push((page, image));
                }
                Err(err) => warn!(?err, page, "failed to rasterize page"),
            }
        }
        for page in plan.to_evict {
            self.cache.remove(page);
            outcome.evicted.push(page);
        }
        outcome
    }

    fn render_page(&self, page_index: usize) -> Result<PageImage> {
        let mut image = self.handle.rasterize(RasterRequest {
            page_index,
            zoom: self.zoom,
        })?;
        if self.text_only {
            let regions = self.handle.image_regions(page_index)?;
            blank_image_regions(&mut image, &regions, self.zoom);
        }
        Ok(image)
    }

    /// Swaps the current page with its neighbor. A no-op at the boundaries.
    pub fn move_current_page(&mut self, direction: MoveDirection) -> Result<()> {
        let from = self.current_page;
        let to = match direction {
            MoveDirection::Up => {
                if from == 0 {
                    return Ok(());
                }
                from - 1
            }
            MoveDirection::Down => {
                if from + 1 >= self.handle.page_count() {
                    return Ok(());
                }
                from + 1
            }
        };
        self.handle.move_page(from, to)?;
        self.relayout()?;
        self.cache.clear();
        self.goto_page(to);
        Ok(())
    }

    /// Advances the page's rotation a quarter turn. Only the rotated page is
    /// re-rendered; the rest of the cache stays valid at this zoom.
    pub fn rotate_page(&mut self, page: usize) -> Result<()> {
        if page >= self.handle.page_count() {
            bail!("page {page} out of range");
        }
        let rotation = self.handle.rotation(page)?;
        self.handle.set_rotation(page, rotation.advanced())?;
        self.relayout()?;
        self.cache.remove(page);
        Ok(())
    }

    pub fn delete_page(&mut self, page: usize) -> Result<()> {
        if page >= self.handle.page_count() {
            bail!("page {page} out of range");
        }
        self.handle.delete_page(page)?;
        self.relayout()?;
        self.cache.clear();
        Ok(())
    }

    pub fn select_pages(&self, pages: &[usize]) -> Result<Box<dyn DocumentHandle>> {
        self.handle.select_pages(pages)
    }

    pub fn save_as(&self, path: &Path) -> Result<()> {
        self.handle
            .save_as(path)
            .with_context(|| format!("failed to save document to {path:?}"))
    }
}

/// Owns the (at most one) open document and the reading history. Replaced
/// documents record their last page; the mapping is persisted wholesale.
pub struct Session {
    config: ViewerConfig,
    store: Box<dyn HistoryStore>,
    history: HistoryMap,
    document: Option<DocumentView>,
}

impl Session {
    pub fn new(config: ViewerConfig, store: Box<dyn HistoryStore>) -> Self {
        let history = store.load();
        Self {
            config,
            store,
            history,
            document: None,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn document(&self) -> Option<&DocumentView> {
        self.document.as_ref()
    }

    pub fn document_mut(&mut self) -> Option<&mut DocumentView> {
        self.document.as_mut()
    }

    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    pub fn history(&self) -> &HistoryMap {
        &self.history
    }

    /// Opens `path`, replacing any previous document. The previous document's
    /// last page is recorded first; the new document starts on its saved page
    /// (or 0 when unknown or out of range). On failure the prior document
    /// stays open untouched.
    #[instrument(skip(self, engine))]
    pub fn open_with(&mut self, engine: &dyn DocumentEngine, path: PathBuf) -> Result<()> {
        let handle = engine
            .open(&path)
            .with_context(|| format!("failed to open {path:?}"))?;

        if self.document.is_some() {
            self.record_current();
            if let Err(err) = self.store.save(&self.history) {
                warn!(?err, "failed to save history");
            }
        }

        let saved = self.history.get(&path).copied().unwrap_or(0);
        let start_page = if saved >= handle.page_count() { 0 } else { saved };
        let id = document_id_for_path(&path);
        let view = DocumentView::new(id, path, handle, self.config.clone(), start_page)?;
        info!(%id, page_count = view.page_count(), "opened document");
        self.document = Some(view);
        Ok(())
    }

    /// Applies a navigation/zoom/edit command. Commands without an open
    /// document are no-ops.
    pub fn apply(&mut self, command: Command) -> Result<()> {
        let Some(doc) = self.document.as_mut() else {
            debug!(?command, "ignoring command with no open document");
            return Ok(());
        };
        match command {
            Command::ZoomIn => doc.zoom_in(),
            Command::ZoomOut => doc.zoom_out(),
            Command::FitWidth { available_width } => doc.fit_width(available_width),
            Command::SetLayoutMode(mode) => doc.set_layout_mode(mode),
            Command::ToggleTextOnly => doc.toggle_text_only(),
            Command::GotoPage { page } => {
                if page >= doc.page_count() {
                    bail!("page must be between 1 and {}", doc.page_count());
                }
                doc.goto_page(page);
                Ok(())
            }
            Command::MoveCurrentPage { direction } => doc.move_current_page(direction),
            Command::RotateCurrentPage => {
                let page = doc.current_page;
                doc.rotate_page(page)
            }
            Command::DeletePage { page } => doc.delete_page(page),
        }
    }

    pub fn save_as(&self, path: &Path) -> Result<()> {
        let Some(doc) = self.document.as_ref() else {
            bail!("no document open");
        };
        doc.save_as(path)
    }

    /// Concatenates ≥2 source files into `destination`. Any open or write
    /// failure aborts before the destination is touched by a later step.
    pub fn merge_with(
        &self,
        engine: &dyn DocumentEngine,
        sources: &[PathBuf],
        destination: &Path,
    ) -> Result<()> {
        if sources.len() < 2 {
            bail!("merge requires at least two source files");
        }
        let merged = engine
            .concatenate(sources)
            .context("failed to merge source documents")?;
        merged
            .save_as(destination)
            .with_context(|| format!("failed to write {destination:?}"))?;
        info!(
            sources = sources.len(),
            pages = merged.page_count(),
            ?destination,
            "merged documents"
        );
        Ok(())
    }

    /// Extracts the pages selected by `expression` into `destination`.
    /// Returns the number of pages written. Malformed syntax and an empty
    /// selection surface as distinct [`RangeError`](crate::RangeError)s.
    pub fn split_to(&self, expression: &str, destination: &Path) -> Result<usize> {
        let Some(doc) = self.document.as_ref() else {
            bail!("no document open");
        };
        let selected = parse_page_ranges(expression, doc.page_count())?;
        let extracted = doc.select_pages(&selected)?;
        extracted
            .save_as(destination)
            .with_context(|| format!("failed to write {destination:?}"))?;
        info!(pages = selected.len(), ?destination, "split document");
        Ok(selected.len())
    }

    fn record_current(&mut self) {
        if let Some(doc) = &self.document {
            self.history.insert(doc.path.clone(), doc.current_page);
        }
    }

    /// Records the current page and writes the whole history mapping.
    pub fn persist(&mut self) -> Result<()> {
        self.record_current();
        self.store.save(&self.history)
    }
}
