//! Common library for the Sticker Forge services
//!
//! This crate provides functionality shared by the media library, the CLI and
//! the HTTP service: the per-request scratch storage and its error type.

pub mod error;
pub mod scratch;

pub use error::{ScratchError, ScratchResult};
pub use scratch::ScratchDir;
