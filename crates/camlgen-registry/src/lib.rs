//! camlgen registry crate.
//!
//! Holds [`TypeRegistry`], the mapping from canonical native type names to
//! type algebra nodes, with structural resolution of compound names.

pub mod registry;

pub use registry::TypeRegistry;
