//! Enum emission.
//!
//! Each named enum becomes a polymorphic-variant type alias in both host
//! artifacts. Independently, every constant across every enum feeds one
//! closed sum type plus a total lookup function:
//!
//! - exported constants read a shim-level `int` global initialized from the
//!   native enumerator at shim load time
//! - constants whose scanned value is not an integer literal get a stub arm
//!   that fails at host run time ("constant ... is broken")
//! - constants filtered by the profile's ignore list get an arm that fails
//!   with "constant ... is unsupported"
//!
//! Duplicate constant names across enums are exported once; the first
//! occurrence wins.

use rustc_hash::FxHashSet;
use tracing::warn;

use camlgen_core::Program;

use super::Emitter;

/// How one constant is represented at host run time.
enum ConstantExport {
    /// Shim global plus a host binding reading it.
    Exported,
    /// Value text did not parse; fails at invocation.
    Broken,
    /// Filtered by the profile; fails at invocation.
    Filtered,
}

struct ConstantEntry {
    name: String,
    native_path: String,
    export: ConstantExport,
}

impl<'a> Emitter<'a> {
    /// Emit the per-enum variant type aliases.
    pub(crate) fn emit_enum_types(&mut self, program: &Program) {
        for decl in &program.enums {
            let name = self.profile.rules.strip_namespace(&decl.name);
            // anonymous class-scope enums have no name of their own
            if name == self.profile.namespace
                || program.classes.iter().any(|c| c.native_name == name)
            {
                continue;
            }
            let mut name = crate::names::snake_case(name).replace('.', "_");
            if let Some(stripped) = name.strip_prefix('_') {
                name = stripped.to_string();
            }
            let constants: Vec<&str> = decl
                .constants
                .iter()
                .filter(|c| is_valid_tag(&c.host_name))
                .map(|c| c.host_name.as_str())
                .collect();
            if constants.is_empty() {
                continue;
            }

            for writer in [&mut self.ml, &mut self.mli] {
                writer.write(format!("type {} = [", name));
                writer.indent();
                writer.indent();
                for constant in &constants {
                    writer.write(format!("| `{}", constant));
                }
                writer.unindent();
                writer.write("]");
                writer.unindent();
                writer.blank();
            }
        }
    }

    /// Emit the shim constant globals, the closed constant sum type, and the
    /// total lookup function.
    pub(crate) fn emit_constants(&mut self, program: &Program) {
        let mut seen = FxHashSet::default();
        let mut entries: Vec<ConstantEntry> = Vec::new();
        for decl in &program.enums {
            for constant in &decl.constants {
                if !seen.insert(constant.host_name.clone()) {
                    continue;
                }
                if !is_valid_tag(&constant.host_name) {
                    warn!(constant = %constant.host_name, "constant name is not a valid variant tag");
                    self.diagnostics.warn(format!(
                        "dropping constant {}: not a valid variant tag",
                        constant.host_name
                    ));
                    continue;
                }
                let export = if self.profile.is_ignored_constant(&constant.host_name) {
                    ConstantExport::Filtered
                } else if constant.is_broken() {
                    ConstantExport::Broken
                } else {
                    ConstantExport::Exported
                };
                entries.push(ConstantEntry {
                    name: constant.host_name.clone(),
                    native_path: constant.native_path(),
                    export,
                });
            }
        }
        if entries.is_empty() {
            return;
        }

        let ns = &self.profile.namespace;
        for entry in &entries {
            if let ConstantExport::Exported = entry.export {
                self.h.write(format!("extern int {}_const_{};", ns, entry.name));
                // the cast keeps scoped enumerators convertible
                self.cpp.write(format!(
                    "int {}_const_{} = (int){};",
                    ns, entry.name, entry.native_path
                ));
                self.ml.write(format!(
                    "let __const_{} = foreign_value \"{}_const_{}\" int",
                    entry.name, ns, entry.name
                ));
            }
        }
        self.ml.blank();

        let sum_type = format!("{}_const", ns);
        for writer in [&mut self.ml, &mut self.mli] {
            writer.write(format!("type {} = [", sum_type));
            writer.indent();
            writer.indent();
            for entry in &entries {
                writer.write(format!("| `{}", entry.name));
            }
            writer.unindent();
            writer.write("]");
            writer.unindent();
            writer.blank();
        }

        self.mli
            .write(format!("val int_of_{} : {} -> int", sum_type, sum_type));
        self.mli.write(format!("val (~~) : {} -> int", sum_type));
        self.mli.blank();

        self.ml.write(format!("let int_of_{} = function", sum_type));
        self.ml.indent();
        for entry in &entries {
            let arm = match entry.export {
                ConstantExport::Exported => {
                    format!("| `{} -> !@ __const_{}", entry.name, entry.name)
                }
                ConstantExport::Broken => format!(
                    "| `{} -> failwith \"constant {} is broken\"",
                    entry.name, entry.name
                ),
                ConstantExport::Filtered => format!(
                    "| `{} -> failwith \"constant {} is unsupported\"",
                    entry.name, entry.name
                ),
            };
            self.ml.write(arm);
        }
        self.ml.unindent();
        self.ml.blank();
        self.ml.write(format!("let (~~) = int_of_{}", sum_type));
        self.ml.blank();
    }
}

/// A constant name usable as an OCaml polymorphic variant tag.
fn is_valid_tag(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_validity() {
        assert!(is_valid_tag("LINE_8"));
        assert!(!is_valid_tag("_internal"));
        assert!(!is_valid_tag(""));
    }
}
