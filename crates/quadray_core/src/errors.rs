//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`QuadRayError`] covers all failure modes including:
//! - Arena/allocator exhaustion
//! - Malformed scene literals
//! - Polyhedron generation limits
//! - Worker-thread failures
//! - Unsupported SIMD targets
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, QuadRayError>`.
//!
//! ```rust,ignore
//! use quadray_core::errors::{QuadRayError, Result};
//!
//! fn build_scene() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the QuadRay engine.
///
/// Construction-time errors (see [`QuadRayError::MalformedScene`],
/// [`QuadRayError::AllocExhausted`]) abort scene creation entirely — no
/// partial scene survives. Per-frame errors ([`QuadRayError::WorkerFailure`])
/// abort only the current frame; the scene remains valid for the next one.
#[derive(Error, Debug)]
pub enum QuadRayError {
    // ========================================================================
    // Scene construction errors
    // ========================================================================
    /// A required pointer/handle in a scene literal was null, or a child
    /// count did not match the payload, or an unknown tag appeared where
    /// unknowns are not accepted.
    #[error("malformed scene: {0}")]
    MalformedScene(String),

    /// A surface's generated polyhedron would exceed `VERTS_LIMIT`,
    /// `EDGES_LIMIT` or `FACES_LIMIT`.
    #[error("limit exceeded while generating shape geometry: {0}")]
    LimitExceeded(String),

    // ========================================================================
    // Allocation errors
    // ========================================================================
    /// The arena (or the caller-supplied allocator backing it) is exhausted,
    /// or a requested pointer fell outside the allowed address window.
    #[error("arena allocation exhausted: requested {requested} bytes, {available} available")]
    AllocExhausted {
        /// Bytes requested.
        requested: usize,
        /// Bytes remaining in the arena.
        available: usize,
    },

    // ========================================================================
    // Rendering / SIMD backend errors
    // ========================================================================
    /// `set_simd` was asked for a width/type combination with no registered
    /// backend.
    #[error("unsupported SIMD target: width={width:?} variant={variant}")]
    UnsupportedTarget {
        /// Requested lane width.
        width: crate::options::SimdWidth,
        /// Requested backend variant name.
        variant: String,
    },

    // ========================================================================
    // Concurrency errors
    // ========================================================================
    /// A worker thread recorded an error string during a parallel phase;
    /// the frame that triggered it is aborted.
    #[error("worker thread failure: {0}")]
    WorkerFailure(String),

    // ========================================================================
    // I/O errors (texture loads, saved frames — collaborator-propagated)
    // ========================================================================
    /// A texture failed to load, or a saved frame failed to write.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Alias for `Result<T, QuadRayError>`.
pub type Result<T> = std::result::Result<T, QuadRayError>;
