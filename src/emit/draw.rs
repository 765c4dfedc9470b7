//! Deferred drawing operations.
//!
//! Drawing primitives mutate a buffer in place. Qualifying functions (void
//! return, exactly one required mutable-buffer parameter, no other promoted
//! outputs, at least one required non-buffer parameter) are re-exposed in a
//! `Draw` host module as deferred operations: calling the generated function
//! captures the non-buffer arguments and returns an opaque `op`; `apply`
//! clones the target buffer once, runs every op against the clone in list
//! order (recycle mode, so the clone is mutated in place), and returns the
//! clone. The original buffer is never touched.

use super::Emitter;

/// One qualifying function, recorded during function emission.
pub(crate) struct DrawCandidate {
    /// Host name of the generated binding the op forwards to.
    pub host_name: String,
    /// Forwarded optional arguments (name, host type), recycle excluded.
    pub optional: Vec<(String, String)>,
    /// Required arguments in order, the buffer marked.
    pub required: Vec<DrawArg>,
    /// Label of the buffer's recycle flag.
    pub recycle_flag: String,
    /// Host type of the mutable buffer.
    pub buffer_host_type: String,
}

/// One required argument of a draw candidate.
pub(crate) struct DrawArg {
    pub name: String,
    pub ty: String,
    pub is_buffer: bool,
}

impl<'a> Emitter<'a> {
    /// Emit the `Draw` module from the candidates recorded so far.
    pub(crate) fn emit_draw(&mut self) {
        if self.draw_candidates.is_empty() {
            return;
        }
        let candidates = std::mem::take(&mut self.draw_candidates);
        let buffer_ty = candidates[0].buffer_host_type.clone();
        let clone_fn = self.profile.clone_fn.clone();

        self.ml.blank();
        self.ml.write("module Draw = struct");
        self.ml.indent();
        self.ml.write(format!("type op = {} -> unit", buffer_ty));
        self.ml.write("let apply ops buf =");
        self.ml.indent();
        self.ml.write(format!("let buf = {} buf in", clone_fn));
        self.ml.write("List.iter (fun op -> op buf) ops;");
        self.ml.write("buf");
        self.ml.unindent();

        self.mli.blank();
        self.mli.write("module Draw : sig");
        self.mli.indent();
        self.mli.write("type op");
        self.mli
            .write(format!("val apply : op list -> {} -> {}", buffer_ty, buffer_ty));

        for candidate in &candidates {
            let mut args: Vec<String> = candidate
                .optional
                .iter()
                .map(|(name, _)| format!("?{}", name))
                .collect();
            args.extend(
                candidate
                    .required
                    .iter()
                    .filter(|arg| !arg.is_buffer)
                    .map(|arg| arg.name.clone()),
            );
            let mut forwarded: Vec<String> = candidate
                .optional
                .iter()
                .map(|(name, _)| format!("?{}", name))
                .collect();
            forwarded.push(format!("~{}:true", candidate.recycle_flag));
            forwarded.extend(candidate.required.iter().map(|arg| {
                if arg.is_buffer {
                    "__buf".to_string()
                } else {
                    arg.name.clone()
                }
            }));
            self.ml.write(format!(
                "let {} {} = fun __buf ->",
                candidate.host_name,
                args.join(" ")
            ));
            self.ml.indent();
            self.ml.write(format!(
                "ignore ({} {})",
                candidate.host_name,
                forwarded.join(" ")
            ));
            self.ml.unindent();

            let mut sig: Vec<String> = candidate
                .optional
                .iter()
                .map(|(name, ty)| format!("?{}:{}", name, ty))
                .collect();
            sig.extend(
                candidate
                    .required
                    .iter()
                    .filter(|arg| !arg.is_buffer)
                    .map(|arg| arg.ty.clone()),
            );
            sig.push("op".to_string());
            self.mli
                .write(format!("val {} : {}", candidate.host_name, sig.join(" -> ")));
        }

        self.ml.unindent();
        self.ml.write("end");
        self.mli.unindent();
        self.mli.write("end");
    }
}
