//! Pipeline stages for batch OCR.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ ocr ──▶ merge ──▶ archive
//! (*.pdf)     (tool)  (pages)   (move)
//! ```
//!
//! 1. [`discover`] — list the PDFs in the input directory, sorted by name
//! 2. [`ocr`]      — run the external OCR tool on one PDF with a timeout
//! 3. [`merge`]    — combine the tool's per-page fragments into one file
//! 4. [`archive`]  — move the processed PDF into the processed directory

pub mod archive;
pub mod discover;
pub mod merge;
pub mod ocr;
