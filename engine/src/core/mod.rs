//! Core business logic modules
//!
//! Pure, deterministic logic with no I/O dependencies: scoring math,
//! cache-key derivation, output cleanup and cost estimation.

pub mod fingerprint;
pub mod postprocess;
pub mod pricing;
pub mod quality;

pub use fingerprint::cache_key;
pub use quality::QualityScorer;
