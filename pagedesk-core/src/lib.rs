use std::path::Path;

use once_cell::sync::Lazy;
use uuid::Uuid;

mod cache;
mod config;
mod engine;
mod history;
mod layout;
mod ranges;
mod session;

pub use cache::{blank_image_regions, plan_reconcile, ReconcileOutcome, ReconcilePlan, RenderCache};
pub use config::ViewerConfig;
pub use engine::{
    DocumentEngine, DocumentHandle, PageGeometry, PageImage, PageRotation, RasterRequest,
    RegionRect,
};
pub use history::{FileHistoryStore, HistoryMap, HistoryStore, MemoryHistoryStore};
pub use layout::{compute_layout, Layout, LayoutMode, PageRect};
pub use ranges::{parse_page_ranges, RangeError};
pub use session::{Command, DocumentView, MoveDirection, Session};

pub type DocumentId = Uuid;

static DOCUMENT_NAMESPACE: Lazy<Uuid> = Lazy::new(|| {
    Uuid::parse_str("4f1a6b77-30dd-5f02-9c41-8be2a8d0f6a3").expect("valid namespace UUID")
});

/// Stable identity for a document, derived from its canonical path. Two
/// opens of the same file map to the same id across sessions.
pub fn document_id_for_path(path: &Path) -> DocumentId {
    let resolved = path
        .canonicalize()
        .or_else(|_| {
            if path.is_absolute() {
                Ok(path.to_path_buf())
            } else {
                std::env::current_dir().map(|cwd| cwd.join(path))
            }
        })
        .unwrap_or_else(|_| path.to_path_buf());
    let rendered = resolved.to_string_lossy();
    Uuid::new_v5(&DOCUMENT_NAMESPACE, rendered.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_is_stable_for_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("sample.pdf");
        std::fs::write(&file_path, b"dummy").unwrap();

        assert_eq!(
            document_id_for_path(&file_path),
            document_id_for_path(&file_path)
        );
    }

    #[test]
    fn document_id_differs_across_paths() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.pdf");
        let second = dir.path().join("b.pdf");
        std::fs::write(&first, b"a").unwrap();
        std::fs::write(&second, b"b").unwrap();

        assert_ne!(document_id_for_path(&first), document_id_for_path(&second));
    }
}
