//! Utility functions and supporting infrastructure.
//!
//! Provides little-endian record serialization, error types and the
//! time window used to restrict processing to part of a recording.

pub mod byteorder;
pub mod errors;
pub mod window;
