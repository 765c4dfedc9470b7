//! Declaration model.
//!
//! Two layers live here. [`RawDecl`] mirrors the tuple stream produced by the
//! external header scanner: loosely typed text fields, one entry per parsed
//! declaration, tagged by its name prefix. The collector turns that stream
//! into the materialized records ([`Function`], [`Class`], [`Enum`],
//! [`ValueStruct`]) that the emitter consumes. Materialized records are
//! created once during collection and never mutated afterwards, except that
//! discovered methods are appended to their owning [`Class`].

use bitflags::bitflags;

bitflags! {
    /// Markers carried in the scanner's per-parameter flag string.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ParamFlags: u8 {
        /// `/O` - the parameter is filled in by the callee.
        const OUTPUT = 1 << 0;
        /// `/S` - the declaration is a static method.
        const STATIC = 1 << 1;
    }
}

impl ParamFlags {
    /// Parse the scanner's marker string (e.g. `"/O"` or `"/S"`).
    pub fn from_markers(markers: &str) -> Self {
        let mut flags = ParamFlags::empty();
        if markers.contains("/O") {
            flags |= ParamFlags::OUTPUT;
        }
        if markers.contains("/S") {
            flags |= ParamFlags::STATIC;
        }
        flags
    }
}

/// One parameter tuple as produced by the header scanner.
///
/// For enum declarations the scanner reuses the same tuple shape: the
/// constant's qualified name rides in the last word of `type_text` and its
/// value text rides in `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawParam {
    /// Native type text, e.g. `const cv::Mat&`.
    pub type_text: String,
    /// Parameter name.
    pub name: String,
    /// Native default literal, empty when absent.
    pub default: String,
    /// Marker string (`/O`, `/S`).
    pub flags: String,
}

impl RawParam {
    /// Build a parameter tuple without default or flags.
    pub fn plain(type_text: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_text: type_text.into(),
            name: name.into(),
            default: String::new(),
            flags: String::new(),
        }
    }

    /// Build a parameter tuple with a native default literal.
    pub fn with_default(
        type_text: impl Into<String>,
        name: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            type_text: type_text.into(),
            name: name.into(),
            default: default.into(),
            flags: String::new(),
        }
    }

    /// Build an output-flagged parameter tuple.
    pub fn output(type_text: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_text: type_text.into(),
            name: name.into(),
            default: String::new(),
            flags: "/O".to_string(),
        }
    }
}

/// Kind tag of a raw declaration, derived from its name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawDeclKind {
    /// An enumeration (`enum …`).
    Enum,
    /// A class (`class …`).
    Class,
    /// Anything else: free function, method, constructor.
    Other,
}

/// One declaration tuple from the header scanner.
///
/// The `name` field keeps the scanner's spelling, including the `class ` /
/// `enum ` prefix tag, e.g. `class cv.VideoCapture` or `cv.line`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDecl {
    /// Tagged declaration name as emitted by the scanner.
    pub name: String,
    /// Base-class text (classes only), empty when absent.
    pub base: String,
    /// Declaration-level marker string (`/S` for static methods).
    pub modifiers: String,
    /// Parameter tuples (or enum constant tuples).
    pub params: Vec<RawParam>,
    /// Return type text; empty means void.
    pub return_type: String,
    /// Raw documentation string.
    pub docs: String,
}

impl RawDecl {
    /// Build a function or method declaration tuple.
    pub fn function(
        name: impl Into<String>,
        return_type: impl Into<String>,
        params: Vec<RawParam>,
    ) -> Self {
        Self {
            name: name.into(),
            base: String::new(),
            modifiers: String::new(),
            params,
            return_type: return_type.into(),
            docs: String::new(),
        }
    }

    /// Build a class declaration tuple.
    pub fn class(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            name: format!("class {}", name.into()),
            base: base.into(),
            modifiers: String::new(),
            params: Vec::new(),
            return_type: String::new(),
            docs: String::new(),
        }
    }

    /// Build an enum declaration tuple; constants ride in `params`.
    pub fn enumeration(name: impl Into<String>, constants: Vec<RawParam>) -> Self {
        Self {
            name: format!("enum {}", name.into()),
            base: String::new(),
            modifiers: String::new(),
            params: constants,
            return_type: String::new(),
            docs: String::new(),
        }
    }

    /// Attach documentation text.
    pub fn with_docs(mut self, docs: impl Into<String>) -> Self {
        self.docs = docs.into();
        self
    }

    /// Attach declaration-level markers (`/S`).
    pub fn with_modifiers(mut self, modifiers: impl Into<String>) -> Self {
        self.modifiers = modifiers.into();
        self
    }

    /// The kind tag, derived from the name prefix.
    pub fn kind(&self) -> RawDeclKind {
        if self.name.starts_with("enum") {
            RawDeclKind::Enum
        } else if self.name.starts_with("class") {
            RawDeclKind::Class
        } else {
            RawDeclKind::Other
        }
    }

    /// The qualified name with the kind tag stripped (last space-separated
    /// word, matching the scanner's layout).
    pub fn qualified_name(&self) -> &str {
        self.name.rsplit(' ').next().unwrap_or(&self.name)
    }
}

/// A materialized function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Name in the native headers; used in the shim artifacts.
    pub native_name: String,
    /// Name in the host artifacts (lowercased, reserved words remapped).
    pub host_name: String,
    /// Native type text; resolved lazily through the registry.
    pub type_text: String,
    /// Native default literal, if any.
    pub default: Option<String>,
    /// The scanner flagged this parameter as an output.
    pub output: bool,
}

/// How a materialized function is invoked on the native side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// A free function.
    Free,
    /// A constructor; the shim allocates and returns a boxed handle.
    Constructor,
    /// A static method, called with full qualification and no receiver.
    Static,
    /// An instance method, routed through an implicit `__self` receiver.
    Instance,
}

/// A materialized function, method, or constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// The native call target: `cv::line`, `new cv::VideoCapture`,
    /// `cv::VideoCapture::open`, or `__self->read`.
    pub native_name: String,
    /// Disambiguated shim symbol name.
    pub shim_name: String,
    /// Host-facing identifier.
    pub host_name: String,
    /// Native return type text (`void` for none).
    pub return_type: String,
    /// Parameters as they appear in the shim prototype (including the
    /// implicit receiver for instance methods).
    pub parameters: Vec<Parameter>,
    /// Parameters forwarded to the native call (excluding the receiver).
    pub call_parameters: Vec<Parameter>,
    /// Native invocation shape.
    pub kind: MethodKind,
    /// Raw documentation string.
    pub docs: String,
}

/// A materialized class, emitted as one host module of methods around an
/// opaque boxed handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    /// Simple native name (`VideoCapture`).
    pub native_name: String,
    /// Host module name (`Video_capture`).
    pub host_module: String,
    /// Name of the host-side ctypes descriptor binding
    /// (`video_capture_type`).
    pub descriptor_binding: String,
    /// Descriptor expression the binding is defined as (`ptr void`).
    pub descriptor_expr: String,
    /// Host type of the handle (`unit ptr`).
    pub host_type: String,
    /// Whether the handle type is exposed concretely in the interface.
    pub public_type: bool,
    /// Simple name of the base class, when one was declared and found.
    pub base: Option<String>,
    /// Raw documentation string.
    pub docs: String,
    /// Methods discovered in collection pass 3, in encounter order.
    pub methods: Vec<Function>,
}

impl Class {
    /// Append a discovered method.
    pub fn add_method(&mut self, method: Function) {
        self.methods.push(method);
    }
}

/// One enum constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    /// Qualified native name (`cv.LINE_8`).
    pub native_name: String,
    /// Host-facing constant name (`LINE_8`).
    pub host_name: String,
    /// Native value text as scanned.
    pub value_text: String,
    /// The value, when the text parses as an integer.
    pub value: Option<i64>,
}

impl EnumConstant {
    /// Build a constant from the scanner's tuple: the qualified name is the
    /// last word of the type slot, the value text rides in the name slot.
    pub fn from_raw(raw: &RawParam) -> Self {
        let native_name = raw
            .type_text
            .rsplit(' ')
            .next()
            .unwrap_or(&raw.type_text)
            .to_string();
        let host_name = native_name
            .rsplit('.')
            .next()
            .unwrap_or(&native_name)
            .to_string();
        let value_text = raw.name.clone();
        let value = value_text.trim().parse::<i64>().ok();
        Self {
            native_name,
            host_name,
            value_text,
            value,
        }
    }

    /// The native enumerator spelled for C++ (`cv::LINE_8`).
    pub fn native_path(&self) -> String {
        self.native_name.replace('.', "::")
    }

    /// True when the scanned value text is not an integer literal; such
    /// constants get a failing stub binding instead of an exported value.
    pub fn is_broken(&self) -> bool {
        self.value.is_none()
    }
}

/// A materialized enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    /// Qualified enum name as scanned (`cv.LineTypes`).
    pub name: String,
    /// Constants in declaration order.
    pub constants: Vec<EnumConstant>,
    /// Raw documentation string.
    pub docs: String,
}

/// One field of a value struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    /// Field name in the native struct.
    pub native_name: String,
    /// Field name in the host record.
    pub host_name: String,
    /// Native type text of the field.
    pub type_text: String,
}

impl StructField {
    /// A field whose host name matches its native name.
    pub fn new(type_text: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            native_name: name.clone(),
            host_name: name,
            type_text: type_text.into(),
        }
    }
}

/// A small value struct exposed as a host record via constructor and
/// accessor shims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueStruct {
    /// Simple native name (`Point`).
    pub native_name: String,
    /// Host record type name (`point2i`).
    pub host_name: String,
    /// Fields in declaration order.
    pub fields: Vec<StructField>,
}

impl ValueStruct {
    /// Build a struct description.
    pub fn new(
        native_name: impl Into<String>,
        host_name: impl Into<String>,
        fields: Vec<StructField>,
    ) -> Self {
        Self {
            native_name: native_name.into(),
            host_name: host_name.into(),
            fields,
        }
    }

    /// Shim symbol of the synthesized constructor.
    pub fn make_shim_name(&self) -> String {
        format!("{}_make", self.host_name)
    }

    /// Shim symbol of the accessor for `field`.
    pub fn accessor_shim_name(&self, field: &StructField) -> String {
        format!("{}_get_{}", self.host_name, field.host_name)
    }

    /// Name of the host function packing a record into a boxed native value.
    pub fn host_to_c_name(&self) -> String {
        format!("{}_ocaml2c", self.host_name)
    }

    /// Name of the host function unpacking a boxed native value.
    pub fn c_to_host_name(&self) -> String {
        format!("{}_c2ocaml", self.host_name)
    }
}

/// Everything the collector materialized from one declaration stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    /// Classes in encounter order.
    pub classes: Vec<Class>,
    /// Free functions in encounter order.
    pub functions: Vec<Function>,
    /// Enumerations in encounter order.
    pub enums: Vec<Enum>,
    /// Value structs from the profile.
    pub structs: Vec<ValueStruct>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_markers() {
        assert_eq!(ParamFlags::from_markers("/O"), ParamFlags::OUTPUT);
        assert_eq!(ParamFlags::from_markers("/S"), ParamFlags::STATIC);
        assert_eq!(
            ParamFlags::from_markers("/O /S"),
            ParamFlags::OUTPUT | ParamFlags::STATIC
        );
        assert!(ParamFlags::from_markers("").is_empty());
    }

    #[test]
    fn raw_decl_kind_follows_prefix() {
        assert_eq!(RawDecl::class("cv.Mat", "").kind(), RawDeclKind::Class);
        assert_eq!(
            RawDecl::enumeration("cv.LineTypes", vec![]).kind(),
            RawDeclKind::Enum
        );
        assert_eq!(
            RawDecl::function("cv.line", "void", vec![]).kind(),
            RawDeclKind::Other
        );
    }

    #[test]
    fn qualified_name_strips_the_tag() {
        let decl = RawDecl::class("cv.VideoCapture", "");
        assert_eq!(decl.qualified_name(), "cv.VideoCapture");
    }

    #[test]
    fn enum_constant_from_raw_tuple() {
        let c = EnumConstant::from_raw(&RawParam::plain("const cv.LINE_8", "8"));
        assert_eq!(c.native_name, "cv.LINE_8");
        assert_eq!(c.host_name, "LINE_8");
        assert_eq!(c.value, Some(8));
        assert!(!c.is_broken());
        assert_eq!(c.native_path(), "cv::LINE_8");
    }

    #[test]
    fn non_integer_constant_is_broken() {
        let c = EnumConstant::from_raw(&RawParam::plain("const cv.MAGIC", "1 << 12"));
        assert!(c.is_broken());
        assert_eq!(c.value_text, "1 << 12");
    }

    #[test]
    fn struct_shim_names() {
        let s = ValueStruct::new(
            "Point",
            "point2i",
            vec![StructField::new("int", "x"), StructField::new("int", "y")],
        );
        assert_eq!(s.make_shim_name(), "point2i_make");
        assert_eq!(s.accessor_shim_name(&s.fields[1]), "point2i_get_y");
        assert_eq!(s.host_to_c_name(), "point2i_ocaml2c");
        assert_eq!(s.c_to_host_name(), "point2i_c2ocaml");
    }
}
