//! Top-level facade crate for uapub.
//!
//! Re-exports the JSON encoding core and the publisher library so users can
//! depend on a single crate.

pub mod core {
    pub use uapub_core::*;
}

pub mod publisher {
    pub use uapub_publisher::*;
}
