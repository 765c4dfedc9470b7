//! The four-artifact emitter.
//!
//! [`Emitter`] walks the collected [`Program`] declaration by declaration
//! and writes the four coordinated artifacts in lockstep: the shim
//! interface, the shim implementation, the host implementation, and the host
//! interface. Every fragment of every artifact is derived from the same
//! registry nodes, so a declaration either appears in all four or - when a
//! type fails to resolve - in none.
//!
//! Submodules cover the declaration families:
//!
//! - [`function`]: functions, constructors and methods, including default
//!   suppliers, recycle flags, output promotion and signature layout
//! - [`structs`]: value structs as constructor + accessor shims
//! - [`enums`]: named variant types, shim-exported constants and the closed
//!   constant sum type
//! - [`draw`]: the deferred drawing module layered over qualifying functions

pub mod draw;
pub mod enums;
pub mod function;
pub mod structs;

use std::collections::BTreeSet;

use tracing::warn;

use camlgen_core::{Class, Diagnostics, Program, SkippedDecl, TypeNode};
use camlgen_registry::TypeRegistry;

use crate::profile::Profile;
use crate::writer::SourceWriter;

use draw::DrawCandidate;

/// The four generated artifacts, always produced together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// Shim interface: one `extern "C"` block of forward declarations.
    pub shim_header: String,
    /// Shim implementation: one function body per emitted declaration.
    pub shim_impl: String,
    /// Host implementation: foreign bindings and wrapper functions.
    pub host_impl: String,
    /// Host interface: public signatures and reformatted documentation.
    pub host_intf: String,
}

/// Everything a generation run returns.
#[derive(Debug)]
pub struct GenReport {
    /// The four artifacts.
    pub artifacts: Artifacts,
    /// Warnings and notes collected across the run.
    pub diagnostics: Diagnostics,
    /// Native type names that never resolved; advisory only.
    pub missing_types: BTreeSet<String>,
    /// Declarations excluded from all four artifacts.
    pub skipped: Vec<SkippedDecl>,
}

/// Writes the four artifacts for one collected program.
pub struct Emitter<'a> {
    profile: &'a Profile,
    registry: &'a TypeRegistry,
    h: SourceWriter,
    cpp: SourceWriter,
    ml: SourceWriter,
    mli: SourceWriter,
    missing_types: BTreeSet<String>,
    skipped: Vec<SkippedDecl>,
    diagnostics: Diagnostics,
    draw_candidates: Vec<DrawCandidate>,
}

impl<'a> Emitter<'a> {
    /// Create an emitter over a populated registry.
    pub fn new(
        profile: &'a Profile,
        registry: &'a TypeRegistry,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            profile,
            registry,
            h: SourceWriter::new(),
            cpp: SourceWriter::new(),
            ml: SourceWriter::new(),
            mli: SourceWriter::new(),
            missing_types: BTreeSet::new(),
            skipped: Vec::new(),
            diagnostics,
            draw_candidates: Vec::new(),
        }
    }

    /// Emit every declaration and finish the run.
    pub fn emit(mut self, program: &Program) -> GenReport {
        self.open();

        for value_struct in &program.structs {
            self.emit_struct(value_struct);
        }
        for class in &program.classes {
            self.emit_class(class, program);
        }
        for function in &program.functions {
            self.emit_function(function, None, false);
        }
        self.emit_enum_types(program);
        self.emit_constants(program);
        self.emit_draw();

        self.finish()
    }

    fn open(&mut self) {
        self.h.write_all(&self.profile.shim_header_prelude);
        self.h.blank();
        self.h.write("extern \"C\" {");
        self.h.indent();

        self.cpp.write_all(&self.profile.shim_impl_prelude);
        self.cpp.blank();
        self.cpp.write("extern \"C\" {");
        self.cpp.indent();

        self.ml.write_all(&self.profile.host_impl_prelude);
        self.ml.blank();

        self.mli.write_all(&self.profile.host_intf_prelude);
        self.mli.blank();
    }

    fn finish(mut self) -> GenReport {
        self.h.unindent();
        self.h.write("}");
        self.cpp.unindent();
        self.cpp.write("}");

        if !self.missing_types.is_empty() {
            self.diagnostics.info(format!(
                "missing types: {}",
                self.missing_types
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        GenReport {
            artifacts: Artifacts {
                shim_header: self.h.finish(),
                shim_impl: self.cpp.finish(),
                host_impl: self.ml.finish(),
                host_intf: self.mli.finish(),
            },
            diagnostics: self.diagnostics,
            missing_types: self.missing_types,
            skipped: self.skipped,
        }
    }

    /// Resolve a declaration type, recording the miss when asked to.
    fn resolve_or_record(
        &mut self,
        type_text: &str,
        declaration: &str,
        record: bool,
    ) -> Option<TypeNode> {
        match self.registry.resolve(type_text) {
            Some(node) => Some(node),
            None => {
                if record {
                    warn!(
                        declaration = %declaration,
                        type_text = %type_text,
                        "skipping declaration: unresolved type"
                    );
                    self.diagnostics.warn(format!(
                        "skipping {}: type {} not in registry",
                        declaration, type_text
                    ));
                    self.missing_types.insert(type_text.trim().to_string());
                    self.skipped.push(SkippedDecl {
                        declaration: declaration.to_string(),
                        missing_type: type_text.trim().to_string(),
                    });
                }
                None
            }
        }
    }

    fn emit_class(&mut self, class: &Class, program: &Program) {
        self.write_doc_comment(&class.docs);

        self.ml.blank();
        self.ml.write(format!(
            "let {} = {}",
            class.descriptor_binding, class.descriptor_expr
        ));
        self.ml
            .write(format!("module {} = struct", class.host_module));
        self.ml.indent();

        self.mli.blank();
        self.mli
            .write(format!("module {} : sig", class.host_module));
        self.mli.indent();

        let base = class
            .base
            .as_ref()
            .and_then(|base| program.classes.iter().find(|c| &c.native_name == base));
        match base {
            Some(base_class) => {
                self.ml.write(format!("include {}", base_class.host_module));
                // the interface cannot include a module it only sees sealed,
                // so the inherited surface is restated
                self.mli.write(format!("type t = {}", class.host_type));
                for method in &base_class.methods {
                    self.emit_function(method, Some(base_class), true);
                }
            }
            None => {
                self.ml.write(format!("type t = {}", class.host_type));
                if class.public_type {
                    self.mli.write(format!("type t = {}", class.host_type));
                } else {
                    self.mli.write("type t");
                }
            }
        }

        for method in &class.methods {
            self.emit_function(method, Some(class), false);
        }

        self.ml.unindent();
        self.ml.write("end");
        self.mli.unindent();
        self.mli.write("end");
    }

    /// Write a sanitized documentation block into the host interface.
    fn write_doc_comment(&mut self, docs: &str) {
        if docs.is_empty() {
            return;
        }
        self.mli.blank();
        self.mli.write("(**");
        self.mli.write(sanitize_docs(docs));
        self.mli.write("*)");
    }
}

/// Keep raw documentation from terminating the comment or opening a quoted
/// string literal.
pub fn sanitize_docs(docs: &str) -> String {
    docs.replace("*)", "* )").replace("{|", "{ |")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_docs_escapes_comment_enders() {
        assert_eq!(sanitize_docs("a *) b {| c"), "a * ) b { | c");
        assert_eq!(sanitize_docs("plain"), "plain");
    }
}
