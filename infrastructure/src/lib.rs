pub mod config;
pub mod embedder;
pub mod embedding_storage;
pub mod file_scanner;
pub mod groq_client;
pub mod http;
pub mod ollama_client;
pub mod search;

#[cfg(test)]
mod test_server;
