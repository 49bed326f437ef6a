pub mod cli;
pub mod config;
pub mod documents;
pub mod extract;
pub mod ingest;
pub mod logging;
pub mod rag;
pub mod server;
pub mod service;

pub use config::Settings;
pub use documents::{DocumentStore, VectorCollection};
pub use ingest::{IngestOutcome, IngestStatus, Ingestor, UploadedFile};
pub use rag::{Answer, AnswerSynthesizer, GenerationBackend, RagError, Retriever};
pub use service::{RagService, Stats};
