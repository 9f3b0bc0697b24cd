//! MDM Core - markdown browsing, rendering, summaries and sync
//!
//! This crate contains the logic behind the `mdm` command line, independent
//! of any front end:
//! - Document model, folder browsing and link resolution
//! - Diagram-fence preprocessing and HTML rendering
//! - Conversion to printable PDF elements (and PDF files with `pdf`)
//! - AI summaries over a chat-completion backend (feature `ai`)
//! - Blob storage push/pull of a project's documents (feature `sync`)
//! - Configuration, sessions and per-project settings

pub mod browse;
pub mod config;
pub mod diagram;
pub mod doc;
pub mod error;
pub mod html;
pub mod pdf;
pub mod project;
pub mod session;
pub mod toc;

#[cfg(feature = "ai")]
pub mod ai;
#[cfg(feature = "sync")]
pub mod sync;

// Re-export commonly used types
pub use config::AppConfig;
pub use doc::Document;
pub use error::{AiError, SyncError};
pub use session::SessionContext;
