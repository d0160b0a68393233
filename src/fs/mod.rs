//! Filesystem utilities for aiedit.
//!
//! Target files are only ever replaced through [`atomic_write_file`], so an
//! interrupted run cannot leave a half-written file behind.

pub mod atomic;

pub use atomic::{atomic_write_file, write_backup};

#[cfg(test)]
pub use atomic::backup_path_for;
