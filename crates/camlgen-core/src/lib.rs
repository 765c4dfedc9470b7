//! camlgen core types.
//!
//! This crate holds the pieces every other camlgen crate builds on:
//!
//! - [`type_node`]: the closed type algebra - one [`TypeNode`] per native
//!   type, deriving the four coordinated representations (native, shim,
//!   foreign descriptor, host) and the conversions between adjacent layers
//! - [`conv`]: structured conversion expressions and templates
//! - [`decl`]: the raw scanner tuples and the materialized declaration model
//! - [`error`]: the fatal configuration errors and the per-declaration skip
//!   record
//! - [`diagnostics`]: warning collection for the run report

pub mod conv;
pub mod decl;
pub mod diagnostics;
pub mod error;
pub mod type_node;

pub use conv::{ConvExpr, ConvTemplate, PostTemplate};
pub use decl::{
    Class, Enum, EnumConstant, Function, MethodKind, ParamFlags, Parameter, Program, RawDecl,
    RawDeclKind, RawParam, StructField, ValueStruct,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{GenError, RegistrationError, SkippedDecl};
pub use type_node::{CustomType, PrimitiveType, TypeNode};
