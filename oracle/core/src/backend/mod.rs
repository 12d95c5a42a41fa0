//! Language Model Backends
//!
//! Abstracted access to the model that voices the spirits.
//!
//! # Available Backends
//!
//! - **Ollama**: local model server (default)
//!
//! # Usage
//!
//! ```ignore
//! use oracle_core::backend::{LlmBackend, LlmRequest, OllamaBackend};
//!
//! let backend = OllamaBackend::from_settings(&config.backend)?;
//! let request = LlmRequest::new("Is anyone there?", "llama3.2").with_system(instruction);
//! let response = backend.send(&request).await?;
//! ```

mod ollama;
mod traits;

pub use ollama::OllamaBackend;
pub use traits::{LlmBackend, LlmRequest, LlmResponse};
