//! notescrape: recover a Xiaohongshu note's title, body, and image URLs from pasted share text.

pub mod cli;
pub mod config;
pub mod formats;
pub mod images;
pub mod model;
pub mod pipeline;

// Re-exports for CLI and consumers.
pub use formats::{render, FormatError, OutputFormat, Report};
pub use images::{materialize_images, MaterializeError, MaterializedImage};
pub use model::{ContentId, ExtractedContent, ExtractionLog, ExtractionRequest, Outcome};
pub use pipeline::{
    extract, BrowserClient, BrowserClientBuilder, ExtractOptions, Fetch, FetchAttempt, FetchError,
    Stage,
};
