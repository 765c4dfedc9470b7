//! camlgen - OCaml binding generator for C++ vision libraries.
//!
//! The engine consumes the declaration stream produced by an external
//! header scanner and emits four coordinated artifacts: a C shim header, the
//! shim implementation, an OCaml implementation wiring ctypes foreign calls
//! to idiomatic wrappers, and the matching OCaml interface.
//!
//! ## Pipeline
//!
//! - [`profile`]: library-specific configuration (namespace, builtin types,
//!   value structs, reserved identifiers, preludes)
//! - [`names`]: name resolution with independent shim and host overload
//!   counters
//! - [`collect`]: three ordered passes turning raw declarations into the
//!   immutable [`Program`]
//! - [`emit`]: the four-artifact emitter, including struct accessors, enum
//!   constants and the deferred drawing module
//!
//! The pipeline is single-threaded and deterministic: declarations are
//! processed in encounter order, which decides overload numbering and
//! emission order. Unresolvable types skip their declaration and surface in
//! the post-run summary; only an inconsistent profile aborts the run.
//!
//! ## Example
//!
//! ```
//! use camlgen::{Profile, RawDecl, RawParam, generate};
//!
//! let profile = Profile::vision();
//! let decls = vec![RawDecl::function(
//!     "cv.blur",
//!     "void",
//!     vec![
//!         RawParam::plain("InputArray", "src"),
//!         RawParam::output("OutputArray", "dst"),
//!     ],
//! )];
//! let report = generate(&profile, &decls).unwrap();
//! assert!(report.artifacts.host_intf.contains("val blur"));
//! ```

pub mod collect;
pub mod emit;
pub mod names;
pub mod profile;
pub mod writer;

pub use camlgen_core::{
    Class, ConvExpr, ConvTemplate, CustomType, Diagnostic, DiagnosticKind, Diagnostics, Enum,
    EnumConstant, Function, GenError, MethodKind, ParamFlags, Parameter, PostTemplate,
    PrimitiveType, Program, RawDecl, RawDeclKind, RawParam, RegistrationError, SkippedDecl,
    StructField, TypeNode, ValueStruct,
};
pub use camlgen_registry::TypeRegistry;

pub use emit::{Artifacts, Emitter, GenReport};
pub use names::{NameRules, ResolutionContext, ResolvedName};
pub use profile::Profile;
pub use writer::SourceWriter;

/// Run the whole pipeline over one declaration stream.
///
/// Fails only on configuration-class errors from the profile's registry
/// setup; per-declaration problems degrade into diagnostics and the
/// missing-type summary on the returned [`GenReport`].
pub fn generate(profile: &Profile, decls: &[RawDecl]) -> Result<GenReport, GenError> {
    let mut registry = profile.build_registry()?;
    let mut diagnostics = Diagnostics::new();
    let program = collect::collect(profile, &mut registry, decls, &mut diagnostics);
    let emitter = Emitter::new(profile, &registry, diagnostics);
    Ok(emitter.emit(&program))
}
