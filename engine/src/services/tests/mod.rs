//! Tests for engine services
//!
//! These tests exercise each service against the in-memory store,
//! including concurrent access and error conditions.
