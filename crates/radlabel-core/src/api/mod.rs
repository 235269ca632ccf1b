//! API implementation submodules.
//!
//! Each submodule contains `impl LabelApi` blocks that extend the public API
//! with domain-specific methods. The struct definition remains in `lib.rs`.

mod builder;
mod session;

pub use builder::LabelApiBuilder;
