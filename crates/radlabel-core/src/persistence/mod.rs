//! JSON persistence primitives.
//!
//! This module provides:
//! - Atomic JSON file reads and writes
//! - Per-path mutual exclusion for read-modify-write cycles

mod atomic;
mod lock;

pub use atomic::{atomic_read_json, atomic_write_json, backup_path_for};
pub use lock::{FileLock, KeyedLocks};
