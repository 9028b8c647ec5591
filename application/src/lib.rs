pub mod index_loader;
pub mod ingest_service;
pub mod rag_service;
