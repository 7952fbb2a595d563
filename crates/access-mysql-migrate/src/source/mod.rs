//! Source store implementations.

mod access;

pub use access::AccessSource;
