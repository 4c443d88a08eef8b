//! Content generation engine for course authoring platforms
//!
//! This library orchestrates AI content generation end to end: request
//! lifecycle management, deterministic result caching, quality scoring
//! with automatic retries, template selection, bounded refinement and
//! parallel batch execution with per-tenant analytics.

pub mod batch;
pub mod core;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod refinement;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use batch::BatchCoordinator;
pub use core::QualityScorer;
pub use engine::{ContentEngine, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use lifecycle::{RequestLifecycle, RequestSnapshot};
pub use refinement::RefinementCoordinator;
pub use traits::{ContentStore, GenerationProvider, ProviderReply, ProviderRequest, QualityAnalyzer};
