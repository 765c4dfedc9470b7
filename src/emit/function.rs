//! Function, constructor and method emission.
//!
//! Per declaration the emitter derives one host signature plan shared by the
//! host implementation, the host interface, and the draw classifier. The
//! plan applies the fixed per-parameter order: default synthesis first, then
//! recycle-flag insertion, then output promotion. Optional parameters are
//! stably moved to the front of the host signature, and a terminating `()`
//! parameter is appended whenever no required parameter remains, so an
//! all-optional function can still be invoked unambiguously.

use camlgen_core::{Class, Function, MethodKind, Parameter, TypeNode};

use crate::profile::RECYCLE_MARKER;

use super::Emitter;
use super::draw::{DrawArg, DrawCandidate};

/// A parameter together with its resolved algebra node.
struct ResolvedParam {
    param: Parameter,
    node: TypeNode,
}

/// An optional argument of the host signature.
struct OptionalArg {
    name: String,
    ty: String,
    default: String,
    is_recycle: bool,
}

/// A required (positional) argument of the host signature.
struct RequiredArg {
    name: String,
    ty: String,
    is_buffer: bool,
}

/// A synthesized shim supplier for a native default literal.
struct DefaultSupplier {
    shim_name: String,
    ml_binding: String,
    literal: String,
}

impl<'a> Emitter<'a> {
    /// Emit one function into all four artifacts.
    ///
    /// With `mli_only` set, only the interface signature is written; this is
    /// used to restate an inherited method in a subclass interface and must
    /// not re-record skips for declarations the base class already reported.
    pub(crate) fn emit_function(
        &mut self,
        f: &Function,
        enclosing: Option<&Class>,
        mli_only: bool,
    ) {
        let record = !mli_only;
        let Some(ret) = self.resolve_or_record(&f.return_type, &f.native_name, record) else {
            return;
        };
        let mut resolved: Vec<ResolvedParam> = Vec::with_capacity(f.parameters.len());
        for param in &f.parameters {
            let Some(node) = self.resolve_or_record(&param.type_text, &f.native_name, record)
            else {
                return;
            };
            resolved.push(ResolvedParam {
                param: param.clone(),
                node,
            });
        }
        let is_void = f.return_type == "void";

        // ---- host signature plan ------------------------------------------
        let cloneable_count = resolved
            .iter()
            .filter(|rp| rp.node.is_cloneable())
            .count();
        let mut optional: Vec<OptionalArg> = Vec::new();
        let mut required: Vec<RequiredArg> = Vec::new();
        let mut recycle_flags: Vec<Option<String>> = vec![None; resolved.len()];
        let mut suppliers: Vec<Option<DefaultSupplier>> = Vec::with_capacity(resolved.len());

        for (i, rp) in resolved.iter().enumerate() {
            let host_ty = rp.node.host_type();
            if rp.node.is_cloneable() {
                let flag = if cloneable_count > 1 {
                    format!("{}_recycle", rp.param.host_name)
                } else {
                    "recycle".to_string()
                };
                let (flag_ty, flag_default) = self.recycle_signature();
                optional.push(OptionalArg {
                    name: flag.clone(),
                    ty: flag_ty,
                    default: flag_default,
                    is_recycle: true,
                });
                recycle_flags[i] = Some(flag);
            }
            if let Some(literal) = &rp.param.default {
                let supplier = DefaultSupplier {
                    shim_name: format!("{}__{}_default", f.shim_name, rp.param.native_name),
                    ml_binding: format!("__{}_{}_default", f.host_name, rp.param.host_name),
                    literal: literal.clone(),
                };
                let default = rp
                    .node
                    .foreign_to_host(&format!("{} ()", supplier.ml_binding))
                    .expr;
                optional.push(OptionalArg {
                    name: rp.param.host_name.clone(),
                    ty: host_ty,
                    default,
                    is_recycle: false,
                });
                suppliers.push(Some(supplier));
            } else if let Some(default) = rp.node.default_value() {
                optional.push(OptionalArg {
                    name: rp.param.host_name.clone(),
                    ty: host_ty,
                    default: default.to_string(),
                    is_recycle: false,
                });
                suppliers.push(None);
            } else {
                required.push(RequiredArg {
                    name: rp.param.host_name.clone(),
                    ty: host_ty,
                    is_buffer: rp.node.is_cloneable(),
                });
                suppliers.push(None);
            }
        }
        let unit_terminated = required.is_empty();
        let outputs: Vec<&ResolvedParam> = resolved
            .iter()
            .filter(|rp| rp.node.is_output() || rp.param.output)
            .collect();

        // ---- shim interface and implementation ----------------------------
        if !mli_only {
            for (rp, supplier) in resolved.iter().zip(&suppliers) {
                if let Some(supplier) = supplier {
                    let ty = rp.node.shim_type();
                    self.h.write(format!("{} {}();", ty, supplier.shim_name));
                    self.cpp.write(format!("{} {}() {{", ty, supplier.shim_name));
                    self.cpp.indent();
                    self.cpp.write(format!(
                        "return {};",
                        rp.node.native_to_shim(&supplier.literal).expr
                    ));
                    self.cpp.unindent();
                    self.cpp.write("}");
                }
            }

            let params_h = resolved
                .iter()
                .map(|rp| format!("{} {}", rp.node.shim_type(), rp.param.native_name))
                .collect::<Vec<_>>()
                .join(", ");
            let stub = format!("{} {}({})", ret.shim_type(), f.shim_name, params_h);
            self.h.write(format!("{};", stub));

            let call_offset = resolved.len() - f.call_parameters.len();
            let args = f
                .call_parameters
                .iter()
                .zip(&resolved[call_offset..])
                .map(|(param, rp)| rp.node.shim_to_native(&param.native_name).expr)
                .collect::<Vec<_>>()
                .join(", ");
            let value = format!("{}({})", f.native_name, args);
            self.cpp.write(format!("{} {{", stub));
            self.cpp.indent();
            if is_void {
                self.cpp.write(format!("{};", value));
            } else {
                self.cpp
                    .write(format!("return {};", ret.native_to_shim(&value).expr));
            }
            self.cpp.unindent();
            self.cpp.write("}");
        }

        // ---- host implementation ------------------------------------------
        if !mli_only {
            for (rp, supplier) in resolved.iter().zip(&suppliers) {
                if let Some(supplier) = supplier {
                    self.ml.write(format!(
                        "let {} = foreign \"{}\" (void @-> returning ({}))",
                        supplier.ml_binding,
                        supplier.shim_name,
                        rp.node.descriptor()
                    ));
                }
            }

            let mut foreign_sig: Vec<String> =
                resolved.iter().map(|rp| rp.node.descriptor()).collect();
            if foreign_sig.is_empty() {
                foreign_sig.push("void".to_string());
            }
            foreign_sig.push(format!("returning ({})", ret.descriptor()));
            self.ml.write(format!(
                "let __{} = foreign \"{}\" ({})",
                f.host_name,
                f.shim_name,
                foreign_sig.join(" @-> ")
            ));

            let mut args: Vec<String> = optional
                .iter()
                .map(|opt| format!("?{}:({} = {})", opt.name, opt.name, opt.default))
                .collect();
            args.extend(required.iter().map(|req| req.name.clone()));
            if unit_terminated {
                args.push("()".to_string());
            }
            self.ml
                .write(format!("let {} {} =", f.host_name, args.join(" ")));
            self.ml.indent();

            for (i, rp) in resolved.iter().enumerate() {
                if let Some(flag) = &recycle_flags[i] {
                    self.ml.write(format!(
                        "let {} = if {} then {} else {} {} in",
                        rp.param.host_name,
                        flag,
                        rp.param.host_name,
                        self.profile.clone_fn,
                        rp.param.host_name
                    ));
                }
                let conv = rp.node.host_to_foreign(&rp.param.host_name);
                self.ml
                    .write(format!("let {}' = {} in", rp.param.host_name, conv.expr));
            }

            let call = if resolved.is_empty() {
                format!("__{} ()", f.host_name)
            } else {
                format!(
                    "__{} {}",
                    f.host_name,
                    resolved
                        .iter()
                        .map(|rp| format!("{}'", rp.param.host_name))
                        .collect::<Vec<_>>()
                        .join(" ")
                )
            };
            if is_void && !outputs.is_empty() {
                self.ml.write(format!("let () = {} in", call));
            } else {
                self.ml
                    .write(format!("let res = {} in", ret.foreign_to_host(&call).expr));
            }

            for rp in &resolved {
                if let Some(post) = rp.node.host_to_foreign(&rp.param.host_name).post {
                    self.ml.write(format!(
                        "{};",
                        post.render(&rp.param.host_name, &format!("{}'", rp.param.host_name))
                    ));
                }
            }

            let result = match outputs.as_slice() {
                [] => "res".to_string(),
                [single] if is_void => single.param.host_name.clone(),
                many => {
                    let mut parts: Vec<String> = Vec::new();
                    if !is_void {
                        parts.push("res".to_string());
                    }
                    parts.extend(many.iter().map(|rp| rp.param.host_name.clone()));
                    format!("({})", parts.join(", "))
                }
            };
            self.ml.write(result);
            self.ml.unindent();
        }

        // ---- host interface -----------------------------------------------
        let rewrite = |ty: &str| -> String {
            match enclosing {
                Some(class) => ty.replace(&format!("{}.t", class.host_module), "t"),
                None => ty.to_string(),
            }
        };

        self.write_doc_comment(&f.docs);
        let mut sig: Vec<String> = optional
            .iter()
            .map(|opt| format!("?{}:{}", opt.name, rewrite(&opt.ty)))
            .collect();
        sig.extend(required.iter().map(|req| rewrite(&req.ty)));
        if unit_terminated {
            sig.push("unit".to_string());
        }
        let out_tys: Vec<String> = outputs
            .iter()
            .map(|rp| rewrite(&rp.node.host_type()))
            .collect();
        let ret_text = if is_void {
            if out_tys.is_empty() {
                "unit".to_string()
            } else {
                out_tys.join(" * ")
            }
        } else if out_tys.is_empty() {
            rewrite(&ret.host_type())
        } else {
            format!("{} * {}", rewrite(&ret.host_type()), out_tys.join(" * "))
        };
        sig.push(ret_text);
        self.mli
            .write(format!("val {} : {}", f.host_name, sig.join(" -> ")));

        // ---- draw classification ------------------------------------------
        if !mli_only && f.kind == MethodKind::Free {
            self.classify_for_draw(
                f,
                is_void,
                &resolved,
                &optional,
                &required,
                &recycle_flags,
                &outputs,
            );
        }
    }

    /// The host type and default expression of the synthetic recycle flag.
    fn recycle_signature(&self) -> (String, String) {
        match self.registry.resolve(RECYCLE_MARKER) {
            Some(node) => {
                let default = node.default_value().unwrap_or("false").to_string();
                (node.host_type(), default)
            }
            None => ("bool".to_string(), "false".to_string()),
        }
    }

    /// Record a deferred-drawing candidate when the function qualifies: void
    /// return, exactly one required mutable-buffer parameter, no other
    /// promoted outputs, and at least one required non-buffer parameter.
    #[allow(clippy::too_many_arguments)]
    fn classify_for_draw(
        &mut self,
        f: &Function,
        is_void: bool,
        resolved: &[ResolvedParam],
        optional: &[OptionalArg],
        required: &[RequiredArg],
        recycle_flags: &[Option<String>],
        outputs: &[&ResolvedParam],
    ) {
        if !is_void {
            return;
        }
        let buffers: Vec<usize> = resolved
            .iter()
            .enumerate()
            .filter(|(_, rp)| rp.node.is_cloneable())
            .map(|(i, _)| i)
            .collect();
        let [buffer_index] = buffers.as_slice() else {
            return;
        };
        if outputs.iter().any(|rp| !rp.node.is_cloneable()) {
            return;
        }
        if !required.iter().any(|req| req.is_buffer) {
            return;
        }
        if !required.iter().any(|req| !req.is_buffer) {
            return;
        }
        let Some(recycle_flag) = recycle_flags[*buffer_index].clone() else {
            return;
        };
        self.draw_candidates.push(DrawCandidate {
            host_name: f.host_name.clone(),
            optional: optional
                .iter()
                .filter(|opt| !opt.is_recycle)
                .map(|opt| (opt.name.clone(), opt.ty.clone()))
                .collect(),
            required: required
                .iter()
                .map(|req| DrawArg {
                    name: req.name.clone(),
                    ty: req.ty.clone(),
                    is_buffer: req.is_buffer,
                })
                .collect(),
            recycle_flag,
            buffer_host_type: resolved[*buffer_index].node.host_type(),
        });
    }
}
