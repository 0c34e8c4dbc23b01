pub mod chunking;
pub mod completion;
pub mod document;
pub mod embeddings;
pub mod guard;
pub mod index;
pub mod openai;
pub mod rag;
pub mod server;
