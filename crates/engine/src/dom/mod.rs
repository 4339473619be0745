// ABOUTME: DOM helpers for fragment parsing, selection, sanitizing and serialization.
// ABOUTME: Everything here works on dom_query documents built from body fragments.

//! DOM utilities for HTML fragment manipulation.
//!
//! This module provides helpers for parsing fragments, compiled selector
//! lookups, the idempotency guard, comment/attribute sanitizing, and the
//! whitespace-aware serializer.

pub mod compiled;
pub mod guard;
pub mod sanitize;
pub mod serialize;
pub mod tree;
