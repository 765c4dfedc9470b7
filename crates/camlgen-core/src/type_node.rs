//! The closed type algebra.
//!
//! Every native type the generator understands is a [`TypeNode`]: either a
//! leaf (primitive or fully custom) or a wrapper around exactly one inner
//! node. Each node derives four coordinated textual representations:
//!
//! - **native**: the type as written in the library's C++ headers
//! - **shim**: the type at the generated `extern "C"` boundary
//! - **descriptor**: the OCaml ctypes value describing the foreign call slot
//! - **host**: the type the OCaml caller sees
//!
//! plus the four conversions between adjacent layers. Dispatching by pattern
//! match keeps the algebra exhaustively checkable: adding a wrapper kind
//! fails to compile until every derivation handles it.
//!
//! # Boxing policy
//!
//! Heap-sized aggregates (growable sequences, custom boxed types) cross the
//! shim boundary behind a pointer and report `must_box() == true`. Types that
//! are already pointers or references are never double-boxed.

use crate::conv::{ConvExpr, ConvTemplate, PostTemplate};

/// A leaf type with identical structure in all four layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveType {
    /// Native (C++) spelling, e.g. `double`.
    pub native: String,
    /// Shim-boundary (C) spelling.
    pub shim: String,
    /// ctypes value expression, e.g. `double`.
    pub descriptor: String,
    /// Host (OCaml) type, e.g. `float`.
    pub host: String,
}

/// A fully custom leaf: conversion templates and policy flags supplied at
/// registration time.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomType {
    /// Native (C++) spelling; also the canonical registry key.
    pub native: String,
    /// Shim-boundary spelling (already boxed when `must_box` is set).
    pub shim: String,
    /// ctypes value expression.
    pub descriptor: String,
    /// Host (OCaml) type.
    pub host: String,
    /// Conversion applied when a native value crosses into the shim layer.
    pub native_to_shim: ConvTemplate,
    /// Conversion applied when a shim value is handed to native code.
    pub shim_to_native: ConvTemplate,
    /// Conversion applied to a foreign-call result or argument on its way
    /// into host code.
    pub foreign_to_host: ConvTemplate,
    /// Conversion applied to a host value on its way into a foreign call.
    pub host_to_foreign: ConvTemplate,
    /// Write-back statement rendered after the foreign call.
    pub post: Option<PostTemplate>,
    /// Passed behind a pointer across the shim boundary.
    pub must_box: bool,
    /// Host-side default expression; parameters of this type become optional.
    pub default: Option<String>,
    /// Values of this type are threaded back to the caller as extra returns.
    pub output: bool,
    /// Parameters of this type may be cloned before in-place mutation.
    pub cloneable: bool,
}

impl CustomType {
    /// A custom type with identity conversions and no policy flags.
    pub fn new(
        native: impl Into<String>,
        shim: impl Into<String>,
        descriptor: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            native: native.into(),
            shim: shim.into(),
            descriptor: descriptor.into(),
            host: host.into(),
            native_to_shim: ConvTemplate::identity(),
            shim_to_native: ConvTemplate::identity(),
            foreign_to_host: ConvTemplate::identity(),
            host_to_foreign: ConvTemplate::identity(),
            post: None,
            must_box: false,
            default: None,
            output: false,
            cloneable: false,
        }
    }

    /// Set the native/shim conversion pair.
    pub fn with_shim_conversions(
        mut self,
        native_to_shim: impl Into<String>,
        shim_to_native: impl Into<String>,
    ) -> Self {
        self.native_to_shim = ConvTemplate::new(native_to_shim);
        self.shim_to_native = ConvTemplate::new(shim_to_native);
        self
    }

    /// Set the foreign/host conversion pair.
    pub fn with_host_conversions(
        mut self,
        foreign_to_host: impl Into<String>,
        host_to_foreign: impl Into<String>,
    ) -> Self {
        self.foreign_to_host = ConvTemplate::new(foreign_to_host);
        self.host_to_foreign = ConvTemplate::new(host_to_foreign);
        self
    }

    /// Set the post-call write-back statement.
    pub fn with_post(mut self, post: impl Into<String>) -> Self {
        self.post = Some(PostTemplate::new(post));
        self
    }

    /// Mark the type as boxed across the shim boundary.
    pub fn boxed(mut self) -> Self {
        self.must_box = true;
        self
    }

    /// Give parameters of this type a host-side default expression.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark parameters of this type as promoted return values.
    pub fn as_output(mut self) -> Self {
        self.output = true;
        self
    }

    /// Mark parameters of this type as cloneable before mutation.
    pub fn as_cloneable(mut self) -> Self {
        self.cloneable = true;
        self
    }
}

/// A node in the type algebra.
///
/// Wrappers hold exactly one inner node. Structural resolution in the
/// registry builds these from native type text; the emitter only ever
/// consumes the derivations below.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    /// A plain value type, identical in shape across all layers.
    Primitive(PrimitiveType),
    /// `const` qualification; purely textual on the native and shim layers.
    Const(Box<TypeNode>),
    /// A native pointer (`T*`).
    Pointer(Box<TypeNode>),
    /// A native reference (`T&`).
    Reference(Box<TypeNode>),
    /// A fixed-length native array (`T[n]`, length optional).
    FixedArray {
        /// Element type.
        inner: Box<TypeNode>,
        /// Declared length text, if any.
        len: Option<String>,
    },
    /// A growable heap-owned sequence (`std::vector<T>`).
    Sequence(Box<TypeNode>),
    /// A fully custom leaf.
    Custom(Box<CustomType>),
}

impl TypeNode {
    /// Build a primitive node.
    pub fn primitive(
        native: impl Into<String>,
        shim: impl Into<String>,
        descriptor: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        TypeNode::Primitive(PrimitiveType {
            native: native.into(),
            shim: shim.into(),
            descriptor: descriptor.into(),
            host: host.into(),
        })
    }

    /// Build a custom node.
    pub fn custom(custom: CustomType) -> Self {
        TypeNode::Custom(Box::new(custom))
    }

    /// Wrap a node in `const`.
    pub fn const_of(inner: TypeNode) -> Self {
        TypeNode::Const(Box::new(inner))
    }

    /// Wrap a node in a pointer.
    pub fn pointer_to(inner: TypeNode) -> Self {
        TypeNode::Pointer(Box::new(inner))
    }

    /// Wrap a node in a reference.
    pub fn reference_to(inner: TypeNode) -> Self {
        TypeNode::Reference(Box::new(inner))
    }

    /// Wrap a node in a fixed-length array.
    pub fn fixed_array(inner: TypeNode, len: Option<String>) -> Self {
        TypeNode::FixedArray {
            inner: Box::new(inner),
            len,
        }
    }

    /// Wrap a node in a growable sequence.
    pub fn sequence_of(inner: TypeNode) -> Self {
        TypeNode::Sequence(Box::new(inner))
    }

    // ==========================================================================
    // Representation derivations
    // ==========================================================================

    /// The type as written in the native headers.
    pub fn native_type(&self) -> String {
        match self {
            TypeNode::Primitive(p) => p.native.clone(),
            // never double the qualifier, even if the inner type carries one
            TypeNode::Const(inner) => {
                format!("const {}", inner.native_type().replace("const ", ""))
            }
            TypeNode::Pointer(inner) => format!("{}*", inner.native_type()),
            TypeNode::Reference(inner) => format!("{}&", inner.native_type()),
            TypeNode::FixedArray { inner, len } => format!(
                "{}[{}]",
                inner.native_type(),
                len.as_deref().unwrap_or_default()
            ),
            TypeNode::Sequence(inner) => format!("std::vector<{}>", inner.native_type()),
            TypeNode::Custom(c) => c.native.clone(),
        }
    }

    /// The type at the generated `extern "C"` boundary.
    pub fn shim_type(&self) -> String {
        match self {
            TypeNode::Primitive(p) => p.shim.clone(),
            TypeNode::Const(inner) => {
                format!("const {}", inner.shim_type().replace("const ", ""))
            }
            TypeNode::Pointer(inner) => format!("{}*", inner.shim_type()),
            TypeNode::Reference(inner) => format!("{}&", inner.shim_type()),
            TypeNode::FixedArray { inner, len } => format!(
                "{}[{}]",
                inner.shim_type(),
                len.as_deref().unwrap_or_default()
            ),
            // sequences always cross the boundary as a boxed handle
            TypeNode::Sequence(inner) => format!("std::vector<{}> *", inner.shim_type()),
            TypeNode::Custom(c) => c.shim.clone(),
        }
    }

    /// The ctypes value expression describing the foreign-call slot.
    pub fn descriptor(&self) -> String {
        match self {
            TypeNode::Primitive(p) => p.descriptor.clone(),
            TypeNode::Const(inner) => inner.descriptor(),
            TypeNode::Pointer(inner) | TypeNode::Reference(inner) => {
                format!("ptr ({})", inner.descriptor())
            }
            TypeNode::FixedArray { inner, .. } => format!("ptr ({})", inner.descriptor()),
            TypeNode::Sequence(inner) => format!("ptr ({})", inner.descriptor()),
            TypeNode::Custom(c) => c.descriptor.clone(),
        }
    }

    /// The type the OCaml caller sees.
    pub fn host_type(&self) -> String {
        match self {
            TypeNode::Primitive(p) => p.host.clone(),
            TypeNode::Const(inner) => inner.host_type(),
            TypeNode::Pointer(inner) | TypeNode::Reference(inner) => inner.host_type(),
            // no element-wise decoding for fixed arrays; the raw pointer is exposed
            TypeNode::FixedArray { inner, .. } => format!("({}) ptr", inner.descriptor()),
            TypeNode::Sequence(inner) => format!("({}) list", inner.host_type()),
            TypeNode::Custom(c) => c.host.clone(),
        }
    }

    // ==========================================================================
    // Conversions
    // ==========================================================================

    /// Convert a native expression into its shim-boundary form.
    pub fn native_to_shim(&self, expr: &str) -> ConvExpr {
        match self {
            TypeNode::Primitive(_) => ConvExpr::pure(expr),
            TypeNode::Const(inner)
            | TypeNode::Pointer(inner)
            | TypeNode::Reference(inner)
            | TypeNode::FixedArray { inner, .. } => inner.native_to_shim(expr),
            TypeNode::Sequence(inner) => ConvExpr::pure(format!(
                "new std::vector<{}>({})",
                inner.shim_type(),
                expr
            )),
            TypeNode::Custom(c) => ConvExpr::pure(c.native_to_shim.apply(expr)),
        }
    }

    /// Convert a shim-boundary expression into its native form.
    pub fn shim_to_native(&self, expr: &str) -> ConvExpr {
        match self {
            TypeNode::Primitive(_) => ConvExpr::pure(expr),
            TypeNode::Const(inner)
            | TypeNode::Pointer(inner)
            | TypeNode::Reference(inner)
            | TypeNode::FixedArray { inner, .. } => inner.shim_to_native(expr),
            TypeNode::Sequence(_) => ConvExpr::pure(format!("*({})", expr)),
            TypeNode::Custom(c) => ConvExpr::pure(c.shim_to_native.apply(expr)),
        }
    }

    /// Convert a foreign-call expression into its host form.
    pub fn foreign_to_host(&self, expr: &str) -> ConvExpr {
        match self {
            TypeNode::Primitive(_) | TypeNode::FixedArray { .. } => ConvExpr::pure(expr),
            TypeNode::Const(inner) => inner.foreign_to_host(expr),
            TypeNode::Pointer(inner) | TypeNode::Reference(inner) => {
                inner.foreign_to_host(&format!("(!@ ({}))", expr))
            }
            TypeNode::Sequence(inner) => {
                let elem = inner.foreign_to_host("x");
                ConvExpr::pure(format!(
                    "list_of_vector ({}) ({}) |> List.map (fun x -> {})",
                    inner.descriptor(),
                    expr,
                    elem.expr
                ))
            }
            TypeNode::Custom(c) => ConvExpr::pure(c.foreign_to_host.apply(expr)),
        }
    }

    /// Convert a host expression into its foreign-call form.
    pub fn host_to_foreign(&self, expr: &str) -> ConvExpr {
        match self {
            TypeNode::Primitive(_) | TypeNode::FixedArray { .. } => ConvExpr::pure(expr),
            TypeNode::Const(inner) => inner.host_to_foreign(expr),
            // the allocated cell is a temporary; inner write-backs do not apply
            TypeNode::Pointer(inner) | TypeNode::Reference(inner) => {
                let converted = inner.host_to_foreign(expr);
                ConvExpr::pure(format!(
                    "(allocate ({}) ({}))",
                    inner.descriptor(),
                    converted.expr
                ))
            }
            TypeNode::Sequence(inner) => {
                let elem = inner.host_to_foreign("x");
                ConvExpr::pure(format!(
                    "vector_of_list ({}) ({} |> List.map (fun x -> {})) |> from_voidp ({})",
                    inner.descriptor(),
                    expr,
                    elem.expr,
                    inner.descriptor()
                ))
            }
            TypeNode::Custom(c) => ConvExpr {
                expr: c.host_to_foreign.apply(expr),
                post: c.post.clone(),
            },
        }
    }

    // ==========================================================================
    // Policy
    // ==========================================================================

    /// True when values cross the shim boundary behind a pointer.
    pub fn must_box(&self) -> bool {
        match self {
            TypeNode::Primitive(_) => false,
            TypeNode::Const(inner) | TypeNode::FixedArray { inner, .. } => inner.must_box(),
            // already a pointer, never double-boxed
            TypeNode::Pointer(_) | TypeNode::Reference(_) => false,
            TypeNode::Sequence(_) => true,
            TypeNode::Custom(c) => c.must_box,
        }
    }

    /// True for pointer and reference wrappers.
    pub fn is_pointer(&self) -> bool {
        match self {
            TypeNode::Pointer(_) | TypeNode::Reference(_) => true,
            TypeNode::Const(inner) => inner.is_pointer(),
            _ => false,
        }
    }

    /// Host-side default expression, making parameters of this type optional.
    pub fn default_value(&self) -> Option<&str> {
        match self {
            TypeNode::Custom(c) => c.default.as_deref(),
            _ => None,
        }
    }

    /// True when parameters of this type are promoted to return values.
    pub fn is_output(&self) -> bool {
        match self {
            TypeNode::Custom(c) => c.output,
            _ => false,
        }
    }

    /// True when parameters of this type may be cloned before mutation.
    pub fn is_cloneable(&self) -> bool {
        match self {
            TypeNode::Custom(c) => c.cloneable,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> TypeNode {
        TypeNode::primitive("int", "int", "int", "int")
    }

    fn string_type() -> TypeNode {
        TypeNode::custom(
            CustomType::new("cv::String", "const char *", "string", "string")
                .with_shim_conversions("({}).c_str()", "cv::String({})"),
        )
    }

    #[test]
    fn primitive_representations_match() {
        let d = TypeNode::primitive("double", "double", "double", "float");
        assert_eq!(d.native_type(), "double");
        assert_eq!(d.shim_type(), "double");
        assert_eq!(d.descriptor(), "double");
        assert_eq!(d.host_type(), "float");
    }

    #[test]
    fn const_never_doubles() {
        let c = TypeNode::const_of(TypeNode::const_of(int()));
        assert_eq!(c.native_type(), "const int");
        assert_eq!(c.shim_type(), "const int");
    }

    #[test]
    fn pointer_text_and_descriptor() {
        let p = TypeNode::pointer_to(int());
        assert_eq!(p.native_type(), "int*");
        assert_eq!(p.descriptor(), "ptr (int)");
        assert_eq!(p.host_type(), "int");
        assert!(p.is_pointer());
        assert!(!p.must_box());
    }

    #[test]
    fn const_pointer_composes() {
        let cp = TypeNode::const_of(TypeNode::pointer_to(TypeNode::primitive(
            "char", "char", "char", "char",
        )));
        assert_eq!(cp.native_type(), "const char*");
        assert!(cp.is_pointer());
    }

    #[test]
    fn shim_round_trip_is_lossless_for_unboxed_types() {
        for node in [int(), TypeNode::pointer_to(int()), TypeNode::reference_to(int())] {
            let through = node.native_to_shim("v");
            let back = node.shim_to_native(&through.expr);
            assert_eq!(back.expr, "v");
        }
    }

    #[test]
    fn pointer_host_conversions_deref_and_allocate() {
        let p = TypeNode::pointer_to(int());
        assert_eq!(p.foreign_to_host("v").expr, "(!@ (v))");
        assert_eq!(p.host_to_foreign("v").expr, "(allocate (int) (v))");
    }

    #[test]
    fn sequence_is_boxed_and_compositional() {
        let v = TypeNode::sequence_of(string_type());
        assert_eq!(v.native_type(), "std::vector<cv::String>");
        assert_eq!(v.shim_type(), "std::vector<const char *> *");
        assert_eq!(v.host_type(), "(string) list");
        assert!(v.must_box());

        let f2h = v.foreign_to_host("res");
        assert_eq!(
            f2h.expr,
            "list_of_vector (string) (res) |> List.map (fun x -> x)"
        );
        let h2f = v.host_to_foreign("xs");
        assert!(h2f.expr.starts_with("vector_of_list (string) (xs |> List.map"));
    }

    #[test]
    fn sequence_shim_conversions_box_and_unbox() {
        let v = TypeNode::sequence_of(int());
        assert_eq!(v.native_to_shim("vec").expr, "new std::vector<int>(vec)");
        assert_eq!(v.shim_to_native("vec").expr, "*(vec)");
    }

    #[test]
    fn custom_flags_surface_through_the_node() {
        let c = TypeNode::custom(
            CustomType::new("cv::InputOutputArray", "cv::InputOutputArray *", "ptr void", "Cvdata.t")
                .boxed()
                .as_output()
                .as_cloneable()
                .with_post("Cvdata.pack_cvdata_post {orig} {tmp}"),
        );
        assert!(c.must_box());
        assert!(c.is_output());
        assert!(c.is_cloneable());
        let conv = c.host_to_foreign("img");
        let post = conv.post.expect("post action");
        assert_eq!(post.render("img", "img'"), "Cvdata.pack_cvdata_post img img'");
    }

    #[test]
    fn custom_default_makes_parameters_optional() {
        let c = TypeNode::custom(
            CustomType::new("cv::OutputArray", "cv::OutputArray *", "ptr void", "Cvdata.t")
                .with_default("(Cvdata.Mat (Mat.create ()))"),
        );
        assert_eq!(c.default_value(), Some("(Cvdata.Mat (Mat.create ()))"));
    }

    #[test]
    fn string_conversions_follow_templates() {
        let s = string_type();
        assert_eq!(s.native_to_shim("name").expr, "(name).c_str()");
        assert_eq!(s.shim_to_native("name").expr, "cv::String(name)");
    }
}
