//! Content package catalog.

mod package;

pub use package::Package;
