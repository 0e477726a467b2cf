//! CV RAG - context retrieval and prompt assembly for the chat assistant
//!
//! The pipeline here is deliberately small:
//! - [`retrieve_context`] reads a fixed prefix of stored embedding records
//! - [`compose_prompt`] interpolates the chunks into the profile template
//! - [`GroqClient`] forwards the composed messages to the hosted LLM
//!
//! Retrieval does not rank by similarity: it returns the first N records in
//! store listing order, ignoring the query and the stored vectors. That
//! matches the behavior of the deployed site and keeps the serving path free
//! of any embedding call.

pub mod llm;
pub mod prompt;
pub mod retriever;

pub use llm::GroqClient;
pub use prompt::{compose_prompt, ProfileIdentity};
pub use retriever::retrieve_context;
