//! Path normalization and translation between named roots
//!
//! This crate provides:
//! - Separator and case normalization
//! - `.`/`..` collapsing that refuses to escape its root
//! - Join / strip helpers that never share scratch buffers
//! - The `Roots` table mapping named path spaces to search paths
//!
//! Everything here is stateless or immutable after construction, so it can be
//! called from the notification thread and the poll thread alike.

pub mod normalize;
pub mod roots;

pub use normalize::{fix_slashes, join, normalize, remove_dot_slashes, strip_file_name};
pub use roots::Roots;
