//! Shared vocabulary for the content generation engine
//!
//! Contains the persisted entities, the tagged parameter map and the
//! error/logging primitives every component speaks. Engine behavior
//! (lifecycle, caching, scoring) lives in the `engine` crate.

pub mod errors;
pub mod logging;
pub mod params;
pub mod types;

pub use errors::*;
pub use types::*;

// Parameter map plus its validation/rendering helpers
pub use params::{ParamValue, Parameters};
