use std::convert::TryFrom;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use pagedesk_core::{
    DocumentEngine, DocumentHandle, PageGeometry, PageImage, PageRotation, RasterRequest,
    RegionRect,
};
use tracing::{instrument, warn};

/// Factory bound to a loaded pdfium library. One instance serves the whole
/// session; handles hold a shared reference to it.
pub struct PdfiumEngine {
    pdfium: Arc<Pdfium>,
}

impl PdfiumEngine {
    pub fn new() -> Result<Self> {
        let pdfium = match bind_pdfium_from_build_hint() {
            Some(pdfium) => pdfium,
            None => bind_pdfium_default()?,
        };
        Ok(Self {
            pdfium: Arc::new(pdfium),
        })
    }

    fn load_document(&self, path: &Path) -> Result<PdfDocument<'static>> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .with_context(|| format!("failed to open {path:?}"))?;
        // SAFETY: the returned PdfDocument borrows the Pdfium bindings owned
        // by self.pdfium. Every PdfiumDocument stores the document alongside
        // an Arc of those bindings, with the document field declared first so
        // it drops before the bindings do. The borrow therefore never
        // outlives the bindings.
        Ok(unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) })
    }

    fn blank_document(&self) -> Result<PdfDocument<'static>> {
        let document = self
            .pdfium
            .create_new_pdf()
            .map_err(|err| anyhow!("failed to create document: {err}"))?;
        // SAFETY: same ownership argument as in load_document.
        Ok(unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) })
    }
}

impl DocumentEngine for PdfiumEngine {
    #[instrument(skip(self))]
    fn open(&self, path: &Path) -> Result<Box<dyn DocumentHandle>> {
        let absolute = path
            .canonicalize()
            .with_context(|| format!("failed to resolve path for {path:?}"))?;
        let document = self.load_document(&absolute)?;
        Ok(Box::new(PdfiumDocument {
            document: Mutex::new(document),
            pdfium: Arc::clone(&self.pdfium),
        }))
    }

    #[instrument(skip(self))]
    fn concatenate(&self, sources: &[PathBuf]) -> Result<Box<dyn DocumentHandle>> {
        let mut merged = self.blank_document()?;
        for source in sources {
            let source_doc = self.load_document(source)?;
            let count = source_doc.pages().len();
            if count == 0 {
                continue;
            }
            let insert_at = merged.pages().len();
            merged
                .pages_mut()
                .copy_pages_from_document(&source_doc, &format!("1-{count}"), insert_at)
                .with_context(|| format!("failed to import pages from {source:?}"))?;
        }
        Ok(Box::new(PdfiumDocument {
            document: Mutex::new(merged),
            pdfium: Arc::clone(&self.pdfium),
        }))
    }
}

/// An open pdfium document. Structural edits that pdfium has no in-place
/// primitive for (move, delete, select) are realized by importing the wanted
/// pages, in order, into a fresh document that then replaces this one.
struct PdfiumDocument {
    document: Mutex<PdfDocument<'static>>,
    pdfium: Arc<Pdfium>,
}

impl PdfiumDocument {
    fn page_index(&self, page_index: usize) -> Result<PdfPageIndex> {
        PdfPageIndex::try_from(page_index)
            .map_err(|_| anyhow!("page {page_index} is out of supported range"))
    }

    /// Builds a fresh document holding exactly the pages of `order`, in that
    /// order (0-based indices into the current document).
    fn rebuilt_with_order(&self, order: &[usize]) -> Result<PdfDocument<'static>> {
        let mut rebuilt = {
            let document = self.pdfium.create_new_pdf().map_err(|err| {
                anyhow!("failed to create document: {err}")
            })?;
            // SAFETY: same ownership argument as PdfiumEngine::load_document;
            // this handle also keeps the bindings alive via self.pdfium.
            unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) }
        };

        let guard = self.document.lock();
        let count = guard.pages().len() as usize;
        for &index in order {
            ensure!(index < count, "page {index} out of range");
        }
        if !order.is_empty() {
            rebuilt
                .pages_mut()
                .copy_pages_from_document(&guard, &page_order_expression(order), 0)
                .context("failed to copy pages into reordered document")?;
        }
        Ok(rebuilt)
    }
}

impl DocumentHandle for PdfiumDocument {
    fn page_count(&self) -> usize {
        usize::from(self.document.lock().pages().len())
    }

    fn page_geometry(&self, page_index: usize) -> Result<PageGeometry> {
        let index = self.page_index(page_index)?;
        let guard = self.document.lock();
        let page = guard
            .pages()
            .get(index)
            .with_context(|| format!("page {page_index} out of range"))?;
        let rotation = page
            .rotation()
            .map(rotation_from_pdfium)
            .unwrap_or_default();
        Ok(PageGeometry {
            width: page.width().value,
            height: page.height().value,
            rotation,
        })
    }

    fn rotation(&self, page_index: usize) -> Result<PageRotation> {
        let index = self.page_index(page_index)?;
        let guard = self.document.lock();
        let page = guard
            .pages()
            .get(index)
            .with_context(|| format!("page {page_index} out of range"))?;
        Ok(page
            .rotation()
            .map(rotation_from_pdfium)
            .unwrap_or_default())
    }

    fn set_rotation(&mut self, page_index: usize, rotation: PageRotation) -> Result<()> {
        let index = self.page_index(page_index)?;
        let guard = self.document.lock();
        let mut page = guard
            .pages()
            .get(index)
            .with_context(|| format!("page {page_index} out of range"))?;
        page.set_rotation(rotation_to_pdfium(rotation));
        Ok(())
    }

    #[instrument(skip(self))]
    fn rasterize(&self, request: RasterRequest) -> Result<PageImage> {
        let index = self.page_index(request.page_index)?;
        let guard = self.document.lock();
        let page = guard
            .pages()
            .get(index)
            .with_context(|| format!("page {} out of range", request.page_index))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(request.zoom.max(0.1));
        let bitmap = page
            .render_with_config(&config)
            .with_context(|| format!("failed to render page {}", request.page_index))?;
        let image = bitmap.as_image().to_rgba8();
        let pixels = image.into_raw();

        Ok(PageImage {
            width: u32::try_from(bitmap.width()).unwrap_or_default(),
            height: u32::try_from(bitmap.height()).unwrap_or_default(),
            pixels,
        })
    }

    fn image_regions(&self, page_index: usize) -> Result<Vec<RegionRect>> {
        let index = self.page_index(page_index)?;
        let guard = self.document.lock();
        let page = guard
            .pages()
            .get(index)
            .with_context(|| format!("page {page_index} out of range"))?;

        let page_height = page.height().value;
        let mut regions = Vec::new();
        for object in page.objects().iter() {
            if object.object_type() != PdfPageObjectType::Image {
                continue;
            }
            let bounds = match object.bounds() {
                Ok(bounds) => bounds,
                Err(err) => {
                    warn!(?err, page = page_index, "failed to resolve image bounds");
                    continue;
                }
            };
            let left = bounds.left().value;
            let right = bounds.right().value;
            let top = bounds.top().value;
            let bottom = bounds.bottom().value;
            let region = RegionRect {
                x: left,
                // Pdfium uses a bottom-left origin; flip to top-left.
                y: page_height - top,
                width: right - left,
                height: top - bottom,
            };
            if region.width > 0.0 && region.height > 0.0 {
                regions.push(region);
            }
        }
        Ok(regions)
    }

    fn move_page(&mut self, from: usize, to: usize) -> Result<()> {
        let count = self.page_count();
        ensure!(from < count, "page {from} out of range");
        ensure!(to < count, "page {to} out of range");
        if from == to {
            return Ok(());
        }
        let mut order: Vec<usize> = (0..count).collect();
        let page = order.remove(from);
        order.insert(to, page);
        let rebuilt = self.rebuilt_with_order(&order)?;
        *self.document.lock() = rebuilt;
        Ok(())
    }

    fn delete_page(&mut self, page_index: usize) -> Result<()> {
        let count = self.page_count();
        ensure!(page_index < count, "page {page_index} out of range");
        let order: Vec<usize> = (0..count).filter(|&index| index != page_index).collect();
        let rebuilt = self.rebuilt_with_order(&order)?;
        *self.document.lock() = rebuilt;
        Ok(())
    }

    fn select_pages(&self, page_indices: &[usize]) -> Result<Box<dyn DocumentHandle>> {
        let rebuilt = self.rebuilt_with_order(page_indices)?;
        Ok(Box::new(PdfiumDocument {
            document: Mutex::new(rebuilt),
            pdfium: Arc::clone(&self.pdfium),
        }))
    }

    fn save_as(&self, path: &Path) -> Result<()> {
        self.document
            .lock()
            .save_to_file(path)
            .with_context(|| format!("failed to save document to {path:?}"))
    }
}

/// 1-based pdfium page-range expression for an explicit 0-based ordering,
/// e.g. `[2, 0, 1]` → `"3,1,2"`.
fn page_order_expression(order: &[usize]) -> String {
    let pages: Vec<String> = order.iter().map(|index| (index + 1).to_string()).collect();
    pages.join(",")
}

fn rotation_from_pdfium(rotation: PdfPageRenderRotation) -> PageRotation {
    match rotation {
        PdfPageRenderRotation::None => PageRotation::None,
        PdfPageRenderRotation::Degrees90 => PageRotation::Clockwise90,
        PdfPageRenderRotation::Degrees180 => PageRotation::Clockwise180,
        PdfPageRenderRotation::Degrees270 => PageRotation::Clockwise270,
    }
}

fn rotation_to_pdfium(rotation: PageRotation) -> PdfPageRenderRotation {
    match rotation {
        PageRotation::None => PdfPageRenderRotation::None,
        PageRotation::Clockwise90 => PdfPageRenderRotation::Degrees90,
        PageRotation::Clockwise180 => PdfPageRenderRotation::Degrees180,
        PageRotation::Clockwise270 => PdfPageRenderRotation::Degrees270,
    }
}

fn bind_pdfium_from_build_hint() -> Option<Pdfium> {
    match option_env!("PAGEDESK_PDFIUM_LIBRARY_PATH") {
        Some(path) if !path.is_empty() => match Pdfium::bind_to_library(path) {
            Ok(bindings) => Some(Pdfium::new(bindings)),
            Err(err) => {
                warn!(
                    "failed to load pdfium from build-provided path {}: {}",
                    path, err
                );
                None
            }
        },
        _ => None,
    }
}

fn bind_pdfium_default() -> Result<Pdfium> {
    let mut errors = Vec::new();

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("{}: {}", cwd_path.display(), err));
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; ensure it is installed ({})",
                errors.join(", ")
            ))
        }
    }
}
