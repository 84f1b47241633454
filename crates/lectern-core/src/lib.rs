// Public fallible APIs in this crate share one concrete error contract (`LecternError`).
// Repeating per-function `# Errors` boilerplate obscures behavior more than it clarifies.
#![allow(
    clippy::missing_errors_doc,
    reason = "fallible APIs share one concrete error type; per-item sections would repeat it"
)]

pub mod archive;
pub mod bundles;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod rank;
pub mod render;
pub mod suggest;
pub(crate) mod text;

pub use archive::{Archive, ArchiveStats};
pub use config::ArchiveConfig;
pub use error::{LecternError, Result};
pub use render::ContentRenderer;
