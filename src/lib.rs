pub mod archive;
pub mod cli;
pub mod config;
mod db;
pub mod error;
pub mod extractor;
pub mod hash;
pub mod index;
pub mod ingest;
pub mod store;
pub mod utils;

pub use archive::PictureArchive;
pub use config::Opts;
pub use db::EmbeddingRecord;
pub use error::{Error, Result};
pub use index::{EmbeddingIndex, Hit, IndexKind};
pub use store::EmbeddingStore;
