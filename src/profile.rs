//! Library profiles.
//!
//! A [`Profile`] carries everything library-specific: the namespace prefix,
//! reserved-identifier remaps, the builtin type registrations, the value
//! structs, artifact preludes, and the host-side clone function. The engine
//! itself never names a concrete library type; profiles are data fed into
//! the pipeline, so a second library means a second profile, not new engine
//! code.
//!
//! [`Profile::vision`] describes the OpenCV-style vision library this
//! generator was grown around: the `cv` namespace, the `Mat` buffer type and
//! its `Cvdata` argument wrappers, the `Scalar` color type, and the small
//! geometry value structs.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use camlgen_core::{CustomType, RegistrationError, StructField, TypeNode, ValueStruct};
use camlgen_registry::TypeRegistry;

use crate::names::NameRules;

lazy_static! {
    /// Builtin nodes shared by every profile: the primitives and the
    /// boundary string type.
    static ref BUILTIN_TYPES: Vec<TypeNode> = vec![
        TypeNode::primitive("void", "void", "void", "unit"),
        TypeNode::primitive("int", "int", "int", "int"),
        TypeNode::primitive("double", "double", "double", "float"),
        TypeNode::primitive("float", "float", "float", "float"),
        TypeNode::primitive("bool", "bool", "bool", "bool"),
        TypeNode::primitive("char", "char", "char", "char"),
        TypeNode::custom(
            CustomType::new("cv::String", "const char *", "string", "string")
                .with_shim_conversions("({}).c_str()", "cv::String({})"),
        ),
    ];
}

/// Marker type name for the synthetic recycle flag.
pub const RECYCLE_MARKER: &str = "__recycle_flag";

/// Everything library-specific about one generation run.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Library namespace (`cv`), used for registry prefix resolution and
    /// shim constant symbols.
    pub namespace: String,
    /// Naming configuration.
    pub rules: NameRules,
    /// Value structs exposed as host records.
    pub structs: Vec<ValueStruct>,
    /// Host modules whose classes are hand-written in the prelude and must
    /// not be generated.
    pub masked_modules: Vec<String>,
    /// Lines opening the shim interface artifact.
    pub shim_header_prelude: Vec<String>,
    /// Lines opening the shim implementation artifact.
    pub shim_impl_prelude: Vec<String>,
    /// Lines opening the host implementation artifact.
    pub host_impl_prelude: Vec<String>,
    /// Lines opening the host interface artifact.
    pub host_intf_prelude: Vec<String>,
    /// Host function cloning a mutable buffer (`Cvdata.clone`).
    pub clone_fn: String,
    /// Constant-name prefixes filtered from the shim export.
    pub ignored_constant_prefixes: Vec<String>,
}

impl Profile {
    /// The OpenCV-style vision library profile.
    pub fn vision() -> Self {
        let mut shim_reserved = FxHashMap::default();
        for (from, to) in [
            ("sqrt", "cv_sqrt"),
            ("pow", "cv_pow"),
            ("exp", "cv_exp"),
            ("log", "cv_log"),
        ] {
            shim_reserved.insert(from.to_string(), to.to_string());
        }
        let mut host_reserved = FxHashMap::default();
        for (from, to) in [
            ("open", "cv_open"),
            ("val", "cv_val"),
            ("method", "cv_method"),
            ("type", "cv_type"),
        ] {
            host_reserved.insert(from.to_string(), to.to_string());
        }

        Self {
            namespace: "cv".to_string(),
            rules: NameRules {
                namespace_prefix: "cv.".to_string(),
                shim_reserved,
                host_reserved,
            },
            structs: vec![
                ValueStruct::new(
                    "Point",
                    "point2i",
                    vec![StructField::new("int", "x"), StructField::new("int", "y")],
                ),
                ValueStruct::new(
                    "Point2f",
                    "point2f",
                    vec![
                        StructField::new("float", "x"),
                        StructField::new("float", "y"),
                    ],
                ),
                ValueStruct::new(
                    "Rect",
                    "rect",
                    vec![
                        StructField::new("int", "x"),
                        StructField::new("int", "y"),
                        StructField::new("int", "width"),
                        StructField::new("int", "height"),
                    ],
                ),
                ValueStruct::new(
                    "Size",
                    "size",
                    vec![
                        StructField::new("int", "width"),
                        StructField::new("int", "height"),
                    ],
                ),
            ],
            masked_modules: vec!["Mat".to_string()],
            shim_header_prelude: vec![
                "#include <opencv2/opencv.hpp>".to_string(),
                "#include <opencv2/core.hpp>".to_string(),
                "#include <opencv2/imgproc.hpp>".to_string(),
                String::new(),
                "#include \"../glue.h\"".to_string(),
            ],
            shim_impl_prelude: vec![
                "#include \"opencv.h\"".to_string(),
                String::new(),
                "using namespace cv;".to_string(),
            ],
            host_impl_prelude: vec![
                "open Bigarray".to_string(),
                String::new(),
                "open Ctypes".to_string(),
                "open Foreign".to_string(),
                "open Ctypes_static".to_string(),
                String::new(),
                "include Glue".to_string(),
            ],
            host_intf_prelude: vec![
                "open Bigarray".to_string(),
                "open Ctypes".to_string(),
                String::new(),
                "open Glue".to_string(),
            ],
            clone_fn: "Cvdata.clone".to_string(),
            ignored_constant_prefixes: vec!["HAL_".to_string()],
        }
    }

    /// Build the run's registry: builtins plus the profile's custom types.
    ///
    /// Registration here is strict; a duplicate means the profile itself is
    /// inconsistent and the run must not proceed.
    pub fn build_registry(&self) -> Result<TypeRegistry, RegistrationError> {
        let mut registry = TypeRegistry::new(&self.namespace);
        for node in BUILTIN_TYPES.iter() {
            registry.register(node.clone())?;
        }

        registry.register(TypeNode::custom(
            CustomType::new("cv::Mat", "cv::Mat *", "ptr void", "Mat.t")
                .with_shim_conversions("new cv::Mat({})", "*({})")
                .with_host_conversions(
                    "(Mat.bigarray_of_cmat ({}))",
                    "(Mat.cmat_of_bigarray ({}))",
                )
                .with_post("Mat.copy_cmat_bigarray {orig} {tmp}")
                .boxed(),
        ))?;

        registry.register(TypeNode::custom(
            CustomType::new("cv::Scalar", "cv::Scalar *", "ptr void", "Scalar.t")
                .with_shim_conversions("new cv::Scalar({})", "*({})")
                .with_host_conversions(
                    "(Scalar.ctypes_to_ocaml ({}))",
                    "(Scalar.ocaml_to_ctypes ({}))",
                )
                .boxed(),
        ))?;

        for (name, optional, output, cloneable) in [
            ("InputArray", false, false, false),
            ("OutputArray", true, true, false),
            ("InputOutputArray", false, true, true),
            ("InputArrayOfArrays", false, false, false),
            ("OutputArrayOfArrays", true, true, false),
            ("InputOutputArrayOfArrays", false, true, true),
        ] {
            registry.register(self.array_argument(name, optional, output, cloneable))?;
        }

        registry.register(TypeNode::custom(
            CustomType::new(RECYCLE_MARKER, "bool", "bool", "bool").with_default("false"),
        ))?;

        Ok(registry)
    }

    /// One of the proxy argument wrappers the vision library uses for
    /// buffer parameters.
    fn array_argument(
        &self,
        name: &str,
        optional: bool,
        output: bool,
        cloneable: bool,
    ) -> TypeNode {
        let native = format!("cv::{}", name);
        let mut custom = CustomType::new(&native, format!("{} *", native), "ptr void", "Cvdata.t")
            .with_shim_conversions("{}", "*({})")
            .with_host_conversions("(Cvdata.extract_cvdata ({}))", "(Cvdata.pack_cvdata ({}))")
            .with_post("Cvdata.pack_cvdata_post {orig} {tmp}")
            .boxed();
        if optional {
            custom = custom.with_default("(Cvdata.Mat (Mat.create ()))");
        }
        if output {
            custom = custom.as_output();
        }
        if cloneable {
            custom = custom.as_cloneable();
        }
        TypeNode::custom(custom)
    }

    /// The registry node for a value struct: a boxed handle converted
    /// through the struct's generated pack/unpack functions.
    pub fn struct_node(&self, value_struct: &ValueStruct) -> TypeNode {
        let native = format!("{}::{}", self.namespace, value_struct.native_name);
        TypeNode::custom(
            CustomType::new(
                &native,
                format!("{} *", native),
                "ptr void",
                &value_struct.host_name,
            )
            .with_shim_conversions(format!("new {}({{}})", native), "*({})")
            .with_host_conversions(
                format!("({} ({{}}))", value_struct.c_to_host_name()),
                format!("({} ({{}}))", value_struct.host_to_c_name()),
            )
            .boxed(),
        )
    }

    /// True when a host module is covered by the hand-written prelude.
    pub fn is_masked(&self, module: &str) -> bool {
        self.masked_modules.iter().any(|m| m == module)
    }

    /// True when an enum constant is filtered from the shim export.
    pub fn is_ignored_constant(&self, name: &str) -> bool {
        self.ignored_constant_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}
