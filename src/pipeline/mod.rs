//! Pipeline stages for Markdown-to-AZW3 conversion.
//!
//! Each submodule implements exactly one transformation step. The render,
//! cover and encode stages sit behind traits so the orchestrator can be
//! driven with alternative implementations.
//!
//! ## Data Flow
//!
//! ```text
//! naming ──▶ render ──▶ cover ──▶ workspace ──▶ encode
//! (title)   (markdown)  (image)   (temp dir)    (azw3)
//! ```
//!
//! 1. [`naming`]    derive the book title and the download filename
//! 2. [`render`]    markdown bytes to XHTML chapter content
//! 3. [`cover`]     decode the optional cover upload
//! 4. [`workspace`] per-request scratch directory, removed on drop
//! 5. [`encode`]    serialise the book description into the output file

pub mod cover;
pub mod encode;
pub mod naming;
pub mod render;
pub mod workspace;
