//! Pdfium-backed implementation of the document-engine contract.

#[cfg(feature = "pdf")]
mod pdfium;

#[cfg(feature = "pdf")]
pub use pdfium::PdfiumEngine;
