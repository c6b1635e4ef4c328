//! Built-in address sources
//!
//! Sources that need no network client live here. HTTP and DNS sources are
//! provided by the `addrsync-source-http` and `addrsync-source-dns` crates.

pub mod static_list;

pub use static_list::{StaticSource, StaticSourceFactory};
