//! Engine service implementations

pub mod analytics;
pub mod cache;
pub mod heuristic_analyzer;
pub mod memory_store;
pub mod openai_provider;
pub mod scripted_provider;
pub mod template_registry;

#[cfg(test)]
pub mod tests;

pub use analytics::*;
pub use cache::*;
pub use heuristic_analyzer::*;
pub use memory_store::*;
pub use openai_provider::*;
pub use scripted_provider::*;
pub use template_registry::*;
