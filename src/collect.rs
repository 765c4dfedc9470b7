//! Declaration collection: three ordered passes over the scanner stream.
//!
//! The pass order is mandatory, because each pass consumes tables the
//! previous one built:
//!
//! 1. [`register_types`] - register enums, classes (with their opaque
//!    handle nodes) and the profile's value structs.
//! 2. [`precount_overloads`] - walk every function and method once, purely
//!    to learn which host-scope names are genuinely ambiguous. No
//!    declaration objects are created.
//! 3. [`materialize`] - resolve names, classify methods, and build the
//!    immutable [`Program`] the emitter consumes.
//!
//! Encounter order is semantically load-bearing throughout: it decides which
//! overload keeps the unsuffixed name, and it is the order declarations are
//! later emitted in.

use rustc_hash::FxHashMap;
use tracing::warn;

use camlgen_core::{
    Class, Diagnostics, Enum, EnumConstant, Function, MethodKind, ParamFlags, Parameter, Program,
    RawDecl, RawDeclKind,
};
use camlgen_registry::TypeRegistry;

use crate::names::{ResolutionContext, capitalize};
use crate::profile::Profile;

/// Class table preserving first-encounter order.
///
/// A re-announced class replaces its shell but keeps its original position,
/// so emission order stays stable.
#[derive(Debug, Default)]
pub struct ClassTable {
    order: Vec<String>,
    map: FxHashMap<String, Class>,
}

impl ClassTable {
    fn insert(&mut self, key: String, class: Class) {
        if !self.map.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.map.insert(key, class);
    }

    /// True when a class was registered under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut Class> {
        self.map.get_mut(key)
    }

    fn keys(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    fn into_ordered(mut self) -> Vec<Class> {
        self.order
            .iter()
            .filter_map(|key| self.map.remove(key))
            .collect()
    }
}

/// Output of collection pass 1.
#[derive(Debug, Default)]
pub struct TypeTables {
    /// Registered classes, keyed by canonical name.
    pub classes: ClassTable,
    /// Enumerations in encounter order.
    pub enums: Vec<Enum>,
}

/// Run all three passes over one declaration stream.
pub fn collect(
    profile: &Profile,
    registry: &mut TypeRegistry,
    decls: &[RawDecl],
    diagnostics: &mut Diagnostics,
) -> Program {
    let mut ctx = ResolutionContext::new();
    let tables = register_types(profile, registry, decls, &mut ctx, diagnostics);
    precount_overloads(profile, decls, &tables, &mut ctx);
    materialize(profile, decls, tables, &mut ctx, diagnostics)
}

/// Pass 1: register enums, classes and value structs.
pub fn register_types(
    profile: &Profile,
    registry: &mut TypeRegistry,
    decls: &[RawDecl],
    ctx: &mut ResolutionContext,
    diagnostics: &mut Diagnostics,
) -> TypeTables {
    // value structs may be shared between profiles; repeats are expected
    for value_struct in &profile.structs {
        registry.register_if_absent(profile.struct_node(value_struct));
    }

    let mut tables = TypeTables::default();
    for decl in decls {
        match decl.kind() {
            RawDeclKind::Enum => {
                let mut qualified = decl.qualified_name().to_string();
                // the scanner reports some nested anonymous enums as enums of
                // a class that never got its own declaration
                if let Some(stripped) = qualified.strip_suffix(".<unnamed>") {
                    qualified = stripped.to_string();
                    let key = profile.rules.strip_namespace(&qualified).to_string();
                    if !tables.classes.contains(&key) {
                        add_class(profile, registry, ctx, &mut tables, &qualified, "", "");
                    }
                }
                tables.enums.push(Enum {
                    name: qualified,
                    constants: decl.params.iter().map(EnumConstant::from_raw).collect(),
                    docs: decl.docs.clone(),
                });
            }
            RawDeclKind::Class => {
                add_class(
                    profile,
                    registry,
                    ctx,
                    &mut tables,
                    decl.qualified_name(),
                    &decl.base,
                    &decl.docs,
                );
            }
            RawDeclKind::Other => {}
        }
    }

    // inheritance edges can point forward, so validate once the table is full
    let broken: Vec<(String, String)> = tables
        .classes
        .keys()
        .filter_map(|key| {
            let class = &tables.classes.map[key];
            match &class.base {
                Some(base) if !tables.classes.contains(base) => {
                    Some((key.clone(), base.clone()))
                }
                _ => None,
            }
        })
        .collect();
    for (key, base) in broken {
        warn!(class = %key, base = %base, "unknown base class; dropping inheritance edge");
        diagnostics.warn(format!(
            "class {} inherits from {}, but {} does not exist",
            key, base, base
        ));
        if let Some(class) = tables.classes.get_mut(&key) {
            class.base = None;
        }
    }

    tables
}

fn add_class(
    profile: &Profile,
    registry: &mut TypeRegistry,
    ctx: &mut ResolutionContext,
    tables: &mut TypeTables,
    qualified: &str,
    base: &str,
    docs: &str,
) {
    let (canonical, shim) = ctx.next_shim(&profile.rules, qualified);
    let host_base = profile.rules.host_candidate(qualified);
    let host_module = capitalize(&host_base);
    if profile.is_masked(&host_module) {
        return;
    }

    let descriptor_binding = format!("{}_type", host_base);
    let base = base
        .rsplit("::")
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string);

    // the opaque handle node: methods and constructors traffic in pointers
    // to the native object
    registry.register_if_absent(camlgen_core::TypeNode::custom(
        camlgen_core::CustomType::new(
            format!("{}::{}*", profile.namespace, canonical),
            format!("{}::{}*", profile.namespace, shim),
            &descriptor_binding,
            format!("{}.t", host_module),
        ),
    ));

    tables.classes.insert(
        canonical.clone(),
        Class {
            native_name: canonical,
            host_module,
            descriptor_binding,
            descriptor_expr: "ptr void".to_string(),
            host_type: "unit ptr".to_string(),
            public_type: false,
            base,
            docs: docs.to_string(),
            methods: Vec::new(),
        },
    );
}

/// Pass 2: populate the host-level overload counters.
///
/// No declaration objects are created here; the pass exists so pass 3 can
/// tell a genuine host-scope collision from a shim-only one before the first
/// name is assigned.
pub fn precount_overloads(
    profile: &Profile,
    decls: &[RawDecl],
    tables: &TypeTables,
    ctx: &mut ResolutionContext,
) {
    for decl in decls {
        if decl.kind() != RawDeclKind::Other {
            continue;
        }
        let canonical = profile.rules.strip_namespace(decl.qualified_name());
        match canonical.rsplit_once('.') {
            Some((owner, simple)) if tables.classes.contains(owner) => {
                ctx.precount_host(&profile.rules, simple, owner);
            }
            Some(_) => {}
            None => ctx.precount_host(&profile.rules, canonical, ""),
        }
    }
}

/// Pass 3: materialize functions and methods.
pub fn materialize(
    profile: &Profile,
    decls: &[RawDecl],
    tables: TypeTables,
    ctx: &mut ResolutionContext,
    diagnostics: &mut Diagnostics,
) -> Program {
    let TypeTables { mut classes, enums } = tables;
    let mut functions = Vec::new();

    for decl in decls {
        if decl.kind() != RawDeclKind::Other {
            continue;
        }
        let return_type = if decl.return_type.is_empty() {
            "void".to_string()
        } else {
            decl.return_type.clone()
        };

        let (canonical, shim) = ctx.next_shim(&profile.rules, decl.qualified_name());
        let params: Vec<Parameter> = decl
            .params
            .iter()
            .map(|raw| Parameter {
                native_name: raw.name.clone(),
                host_name: profile.rules.host_param(&raw.name),
                type_text: raw.type_text.clone(),
                default: (!raw.default.is_empty()).then(|| raw.default.clone()),
                output: ParamFlags::from_markers(&raw.flags).contains(ParamFlags::OUTPUT),
            })
            .collect();

        match canonical.rsplit_once('.') {
            Some((owner, simple)) => {
                let Some(class) = classes.get_mut(owner) else {
                    warn!(class = %owner, method = %simple, "unknown owning class; dropping method");
                    diagnostics.warn(format!("missing class: {}", owner));
                    continue;
                };
                let host = ctx.next_host(&profile.rules, simple, owner);
                let is_static =
                    ParamFlags::from_markers(&decl.modifiers).contains(ParamFlags::STATIC);
                let method = if simple == class.native_name {
                    Function {
                        native_name: format!("new {}::{}", profile.namespace, simple),
                        shim_name: shim,
                        host_name: host,
                        return_type: format!("{}*", simple),
                        parameters: params.clone(),
                        call_parameters: params,
                        kind: MethodKind::Constructor,
                        docs: decl.docs.clone(),
                    }
                } else if is_static {
                    Function {
                        native_name: format!(
                            "{}::{}::{}",
                            profile.namespace,
                            owner.replace('.', "::"),
                            simple
                        ),
                        shim_name: shim,
                        host_name: host,
                        return_type,
                        parameters: params.clone(),
                        call_parameters: params,
                        kind: MethodKind::Static,
                        docs: decl.docs.clone(),
                    }
                } else {
                    let receiver = Parameter {
                        native_name: "__self".to_string(),
                        host_name: "__self".to_string(),
                        type_text: format!("{}*", owner),
                        default: None,
                        output: false,
                    };
                    let mut parameters = Vec::with_capacity(params.len() + 1);
                    parameters.push(receiver);
                    parameters.extend(params.iter().cloned());
                    Function {
                        native_name: format!("__self->{}", simple),
                        shim_name: shim,
                        host_name: host,
                        return_type,
                        parameters,
                        call_parameters: params,
                        kind: MethodKind::Instance,
                        docs: decl.docs.clone(),
                    }
                };
                class.add_method(method);
            }
            None => {
                let host = ctx.next_host(&profile.rules, &canonical, "");
                functions.push(Function {
                    native_name: format!("{}::{}", profile.namespace, canonical),
                    shim_name: shim,
                    host_name: host,
                    return_type,
                    parameters: params.clone(),
                    call_parameters: params,
                    kind: MethodKind::Free,
                    docs: decl.docs.clone(),
                });
            }
        }
    }

    Program {
        classes: classes.into_ordered(),
        functions,
        enums,
        structs: profile.structs.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camlgen_core::RawParam;

    fn run(decls: &[RawDecl]) -> (Program, Diagnostics) {
        let profile = Profile::vision();
        let mut registry = profile.build_registry().expect("consistent profile");
        let mut diagnostics = Diagnostics::new();
        let program = collect(&profile, &mut registry, decls, &mut diagnostics);
        (program, diagnostics)
    }

    #[test]
    fn free_function_is_materialized() {
        let decls = vec![RawDecl::function(
            "cv.blur",
            "void",
            vec![
                RawParam::plain("InputArray", "src"),
                RawParam::output("OutputArray", "dst"),
            ],
        )];
        let (program, diagnostics) = run(&decls);
        assert!(diagnostics.is_empty());
        assert_eq!(program.functions.len(), 1);

        let f = &program.functions[0];
        assert_eq!(f.native_name, "cv::blur");
        assert_eq!(f.shim_name, "blur");
        assert_eq!(f.host_name, "blur");
        assert_eq!(f.kind, MethodKind::Free);
        assert!(f.parameters[1].output);
    }

    #[test]
    fn methods_are_classified_and_attached() {
        let decls = vec![
            RawDecl::class("cv.VideoCapture", ""),
            RawDecl::function("cv.VideoCapture.VideoCapture", "", vec![]),
            RawDecl::function(
                "cv.VideoCapture.read",
                "bool",
                vec![RawParam::output("OutputArray", "image")],
            ),
            RawDecl::function("cv.VideoCapture.waitAny", "bool", vec![])
                .with_modifiers("/S"),
        ];
        let (program, diagnostics) = run(&decls);
        assert!(diagnostics.is_empty());
        assert_eq!(program.classes.len(), 1);

        let class = &program.classes[0];
        assert_eq!(class.host_module, "Video_capture");
        assert_eq!(class.descriptor_binding, "video_capture_type");
        assert_eq!(class.methods.len(), 3);

        let ctor = &class.methods[0];
        assert_eq!(ctor.kind, MethodKind::Constructor);
        assert_eq!(ctor.native_name, "new cv::VideoCapture");
        assert_eq!(ctor.return_type, "VideoCapture*");
        assert_eq!(ctor.shim_name, "VideoCapture_VideoCapture");

        let read = &class.methods[1];
        assert_eq!(read.kind, MethodKind::Instance);
        assert_eq!(read.native_name, "__self->read");
        assert_eq!(read.parameters[0].native_name, "__self");
        assert_eq!(read.parameters[0].type_text, "VideoCapture*");
        assert_eq!(read.call_parameters.len(), 1);

        let wait = &class.methods[2];
        assert_eq!(wait.kind, MethodKind::Static);
        assert_eq!(wait.native_name, "cv::VideoCapture::waitAny");
    }

    #[test]
    fn method_with_unknown_class_is_dropped() {
        let decls = vec![RawDecl::function("cv.Tracker.update", "bool", vec![])];
        let (program, diagnostics) = run(&decls);
        assert!(program.functions.is_empty());
        assert!(program.classes.is_empty());
        assert!(diagnostics.has_warnings());
    }

    #[test]
    fn unknown_base_edge_is_dropped_but_class_kept() {
        let decls = vec![RawDecl::class("cv.BFMatcher", "cv::DescriptorMatcher")];
        let (program, diagnostics) = run(&decls);
        assert_eq!(program.classes.len(), 1);
        assert_eq!(program.classes[0].base, None);
        assert!(diagnostics.has_warnings());
    }

    #[test]
    fn known_base_edge_is_kept() {
        let decls = vec![
            RawDecl::class("cv.DescriptorMatcher", ""),
            RawDecl::class("cv.BFMatcher", "cv::DescriptorMatcher"),
        ];
        let (program, diagnostics) = run(&decls);
        assert!(diagnostics.is_empty());
        assert_eq!(
            program.classes[1].base.as_deref(),
            Some("DescriptorMatcher")
        );
    }

    #[test]
    fn anonymous_enum_synthesizes_class() {
        let decls = vec![RawDecl::enumeration(
            "cv.Formatter.<unnamed>",
            vec![RawParam::plain("const cv.Formatter.FMT_DEFAULT", "0")],
        )];
        let (program, _) = run(&decls);
        assert_eq!(program.classes.len(), 1);
        assert_eq!(program.classes[0].native_name, "Formatter");
        assert_eq!(program.enums.len(), 1);
        assert_eq!(program.enums[0].name, "cv.Formatter");
    }

    #[test]
    fn masked_class_is_not_generated() {
        let decls = vec![
            RawDecl::class("cv.Mat", ""),
            RawDecl::function("cv.Mat.clone", "Mat", vec![]),
        ];
        let (program, diagnostics) = run(&decls);
        assert!(program.classes.is_empty());
        // the method has no generated owner and is dropped with a warning
        assert!(diagnostics.has_warnings());
    }

    #[test]
    fn host_overload_precount_limits_suffixes() {
        let decls = vec![
            RawDecl::function("cv.getValue", "int", vec![]),
            RawDecl::function("cv.get_value", "int", vec![]),
            RawDecl::function("cv.resize", "void", vec![]),
            RawDecl::function("cv.resize", "void", vec![RawParam::plain("int", "flags")]),
        ];
        let (program, _) = run(&decls);
        let names: Vec<(&str, &str)> = program
            .functions
            .iter()
            .map(|f| (f.shim_name.as_str(), f.host_name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                // distinct shim symbols, colliding host names
                ("getValue", "get_value"),
                ("get_value", "get_value2"),
                // repeated shim symbol, repeated host name
                ("resize", "resize"),
                ("resize2", "resize2"),
            ]
        );
    }
}
