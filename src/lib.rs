//! Document question answering.
//!
//! Documents are split into overlapping character windows, embedded, and
//! stored in a vector collection. Questions are embedded the same way and
//! answered from the nearest passages.

pub mod answer;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod rag;
pub mod service;

pub use config::Config;
pub use error::{Error, ErrorKind, Result, Stage};
pub use service::{AskResult, DocumentService, SourceRef, UploadResult};
