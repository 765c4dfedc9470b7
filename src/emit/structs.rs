//! Value struct emission.
//!
//! The host FFI cannot read native memory layout directly, so every value
//! struct is exposed through synthesized shims: one constructor packing the
//! field values into a heap-boxed native value, and one accessor per field
//! unboxing it again. The host side gets a plain record type plus the
//! pack/unpack functions the struct's registry node routes its conversions
//! through.

use camlgen_core::{TypeNode, ValueStruct};

use super::Emitter;

impl<'a> Emitter<'a> {
    /// Emit one value struct into all four artifacts.
    pub(crate) fn emit_struct(&mut self, value_struct: &ValueStruct) {
        let declaration = format!("struct {}", value_struct.native_name);
        let mut fields: Vec<(&camlgen_core::StructField, TypeNode)> =
            Vec::with_capacity(value_struct.fields.len());
        for field in &value_struct.fields {
            let Some(node) = self.resolve_or_record(&field.type_text, &declaration, true) else {
                return;
            };
            fields.push((field, node));
        }

        let boxed = format!("{}::{} *", self.profile.namespace, value_struct.native_name);
        let native = format!("{}::{}", self.profile.namespace, value_struct.native_name);

        // constructor shim: pack N fields into a heap-boxed native value
        let params_h = fields
            .iter()
            .map(|(field, node)| format!("{} {}", node.shim_type(), field.native_name))
            .collect::<Vec<_>>()
            .join(", ");
        let make = value_struct.make_shim_name();
        self.h.write(format!("{}{}({});", boxed, make, params_h));
        self.cpp.write(format!("{}{}({}) {{", boxed, make, params_h));
        self.cpp.indent();
        let ctor_args = fields
            .iter()
            .map(|(field, node)| node.shim_to_native(&field.native_name).expr)
            .collect::<Vec<_>>()
            .join(", ");
        self.cpp
            .write(format!("return new {}({});", native, ctor_args));
        self.cpp.unindent();
        self.cpp.write("}");

        // one accessor shim per field
        for (field, node) in &fields {
            let accessor = value_struct.accessor_shim_name(field);
            let ty = node.shim_type();
            self.h.write(format!("{} {}({}v);", ty, accessor, boxed));
            self.cpp.write(format!("{} {}({}v) {{", ty, accessor, boxed));
            self.cpp.indent();
            self.cpp.write(format!(
                "return {};",
                node.native_to_shim(&format!("v->{}", field.native_name)).expr
            ));
            self.cpp.unindent();
            self.cpp.write("}");
        }

        // host record type, in both artifacts
        let record_fields = fields
            .iter()
            .map(|(field, node)| format!("{} : {}", field.host_name, node.host_type()))
            .collect::<Vec<_>>()
            .join("; ");
        let type_decl = format!("type {} = {{ {} }}", value_struct.host_name, record_fields);
        self.mli.write(&type_decl);
        self.mli.blank();
        self.ml.write(&type_decl);

        // foreign bindings for the shims
        let make_sig = fields
            .iter()
            .map(|(_, node)| node.descriptor())
            .collect::<Vec<_>>()
            .join(" @-> ");
        self.ml.write(format!(
            "let __{} = foreign \"{}\" ({} @-> returning (ptr void))",
            make, make, make_sig
        ));
        for (field, node) in &fields {
            let accessor = value_struct.accessor_shim_name(field);
            self.ml.write(format!(
                "let __{} = foreign \"{}\" (ptr void @-> returning ({}))",
                accessor,
                accessor,
                node.descriptor()
            ));
        }

        // pack: record -> boxed native value
        let make_args = fields
            .iter()
            .map(|(field, node)| {
                let conv = node.host_to_foreign(&format!("v.{}", field.host_name));
                format!("({})", conv.expr)
            })
            .collect::<Vec<_>>()
            .join(" ");
        self.ml.write(format!(
            "let {} (v : {}) = __{} {}",
            value_struct.host_to_c_name(),
            value_struct.host_name,
            make,
            make_args
        ));

        // unpack: boxed native value -> record
        let record_build = fields
            .iter()
            .map(|(field, node)| {
                let accessor = value_struct.accessor_shim_name(field);
                let conv = node.foreign_to_host(&format!("__{} p", accessor));
                format!("{} = {}", field.host_name, conv.expr)
            })
            .collect::<Vec<_>>()
            .join("; ");
        self.ml.write(format!(
            "let {} p : {} = {{ {} }}",
            value_struct.c_to_host_name(),
            value_struct.host_name,
            record_build
        ));
        self.ml.blank();
    }
}
