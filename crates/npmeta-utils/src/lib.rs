//! Shared building blocks for npmeta: per-package locking, deadlines and
//! path resolution.

pub mod error;
pub mod lock;
pub mod path;
pub mod time;
