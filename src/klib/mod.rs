//! Kernel Library (KLib).
//!
//! Utilitários agnósticos de hardware para uso interno do pager.

pub mod bitmap;

pub use bitmap::Bitmap;
