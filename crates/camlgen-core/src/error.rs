//! Error types for the binding generator.
//!
//! Two failure classes exist and they are deliberately kept apart:
//!
//! - [`RegistrationError`] - configuration mistakes in the type algebra
//!   setup (duplicate registrations, dangling aliases). These indicate an
//!   inconsistent profile rather than a property of the scanned input, so
//!   they are fatal and abort the run.
//! - Per-declaration conditions (unresolved types, unknown owning classes,
//!   unknown base classes) are *not* errors at the run level: the declaration
//!   is skipped or repaired, a diagnostic is recorded, and generation
//!   continues. [`SkippedDecl`] captures the skip for the post-run summary.

use thiserror::Error;

/// Fatal configuration errors raised while populating the type registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A type was registered under a name that already resolves.
    #[error("duplicate type registration: {0}")]
    DuplicateType(String),

    /// An alias was requested for a name that does not resolve.
    #[error("alias target not found: {0}")]
    AliasTargetNotFound(String),

    /// An alias name is already taken.
    #[error("duplicate alias: {0}")]
    DuplicateAlias(String),
}

/// Top-level error for a generation run.
///
/// Only configuration-class failures surface here; everything input-shaped
/// degrades per declaration and is reported through diagnostics instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    /// The profile's type algebra setup is inconsistent.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Record of a declaration excluded from all four artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDecl {
    /// The declaration's native name.
    pub declaration: String,
    /// The type name that failed to resolve.
    pub missing_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_error_messages() {
        let err = RegistrationError::DuplicateType("cv::Mat".to_string());
        assert_eq!(err.to_string(), "duplicate type registration: cv::Mat");
    }

    #[test]
    fn gen_error_wraps_registration() {
        let err: GenError = RegistrationError::DuplicateAlias("Matx".to_string()).into();
        assert_eq!(err.to_string(), "duplicate alias: Matx");
    }
}
