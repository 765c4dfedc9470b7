//! End-to-end tests over the whole pipeline: vision profile in, four
//! artifacts out.

use pretty_assertions::assert_eq;

use camlgen::{GenReport, Profile, RawDecl, RawParam, generate};

fn run(decls: Vec<RawDecl>) -> GenReport {
    generate(&Profile::vision(), &decls).expect("consistent profile")
}

fn line_decl() -> RawDecl {
    RawDecl::function(
        "cv.line",
        "void",
        vec![
            RawParam::plain("InputOutputArray", "img"),
            RawParam::plain("Point", "pt1"),
            RawParam::plain("Point", "pt2"),
            RawParam::plain("const Scalar&", "color"),
            RawParam::with_default("int", "thickness", "1"),
        ],
    )
}

#[test]
fn minimal_interface_is_exact() {
    let report = run(vec![RawDecl::function("cv.getTickCount", "double", vec![])]);
    assert_eq!(
        report.artifacts.host_intf,
        "open Bigarray\n\
         open Ctypes\n\
         \n\
         open Glue\n\
         \n\
         type point2i = { x : int; y : int }\n\
         \n\
         type point2f = { x : float; y : float }\n\
         \n\
         type rect = { x : int; y : int; width : int; height : int }\n\
         \n\
         type size = { width : int; height : int }\n\
         \n\
         val get_tick_count : unit -> float\n"
    );
}

#[test]
fn four_artifacts_stay_in_lockstep() {
    let report = run(vec![line_decl()]);
    let a = &report.artifacts;

    assert!(a.shim_header.contains(
        "void line(cv::InputOutputArray * img, cv::Point * pt1, cv::Point * pt2, \
         const cv::Scalar *& color, int thickness);"
    ));
    assert!(a.shim_impl.contains("cv::line(*(img), *(pt1), *(pt2), *(color), thickness);"));
    assert!(a.host_impl.contains(
        "let __line = foreign \"line\" (ptr void @-> ptr void @-> ptr void @-> \
         ptr (ptr void) @-> int @-> returning (void))"
    ));
    assert!(a.host_intf.contains(
        "val line : ?recycle:bool -> ?thickness:int -> Cvdata.t -> point2i -> point2i -> \
         Scalar.t -> Cvdata.t"
    ));
    assert!(report.missing_types.is_empty());
}

#[test]
fn native_default_becomes_shim_supplier() {
    let report = run(vec![line_decl()]);
    let a = &report.artifacts;

    assert!(a.shim_header.contains("int line__thickness_default();"));
    assert!(a
        .shim_impl
        .contains("  int line__thickness_default() {\n    return 1;\n  }"));
    assert!(a.host_impl.contains(
        "let __line_thickness_default = foreign \"line__thickness_default\" \
         (void @-> returning (int))"
    ));
    assert!(a
        .host_impl
        .contains("?thickness:(thickness = __line_thickness_default ())"));
}

#[test]
fn cloneable_parameter_gets_recycle_flag_and_clone() {
    let report = run(vec![line_decl()]);
    let ml = &report.artifacts.host_impl;

    assert!(ml.contains("?recycle:(recycle = false)"));
    assert!(ml.contains("let img = if recycle then img else Cvdata.clone img in"));
    // the mutated buffer is written back and returned
    assert!(ml.contains("Cvdata.pack_cvdata_post img img';"));
}

#[test]
fn void_return_with_output_drops_unit_placeholder() {
    let report = run(vec![line_decl()]);
    // the wrapper discards the foreign unit and returns the promoted buffer
    assert!(report.artifacts.host_impl.contains("let () = __line"));
    assert!(!report
        .artifacts
        .host_intf
        .contains("val line : ?recycle:bool -> ?thickness:int -> Cvdata.t -> point2i -> point2i -> Scalar.t -> unit"));
}

#[test]
fn all_optional_signature_accepts_zero_arguments() {
    let report = run(vec![RawDecl::function(
        "cv.createBuffer",
        "void",
        vec![RawParam::plain("OutputArray", "dst")],
    )]);
    let a = &report.artifacts;

    assert!(a.host_impl.contains(
        "let create_buffer ?dst:(dst = (Cvdata.Mat (Mat.create ()))) () ="
    ));
    assert!(a
        .host_intf
        .contains("val create_buffer : ?dst:Cvdata.t -> unit -> Cvdata.t"));
}

#[test]
fn non_void_return_prepends_res_to_promoted_outputs() {
    let report = run(vec![
        RawDecl::class("cv.VideoCapture", ""),
        RawDecl::function("cv.VideoCapture.VideoCapture", "", vec![]),
        RawDecl::function(
            "cv.VideoCapture.read",
            "bool",
            vec![RawParam::output("OutputArray", "image")],
        ),
    ]);
    let a = &report.artifacts;

    assert!(a.host_impl.contains("let video_capture_type = ptr void"));
    assert!(a.host_impl.contains("module Video_capture = struct"));
    assert!(a.shim_impl.contains("return new cv::VideoCapture();"));
    assert!(a.host_impl.contains("(res, image)"));
    assert!(a
        .host_intf
        .contains("val read : ?image:Cvdata.t -> t -> bool * Cvdata.t"));
    assert!(a.host_intf.contains("val video_capture : unit -> t"));
}

#[test]
fn shim_suffixes_are_unconditional_host_suffixes_genuine() {
    let report = run(vec![
        RawDecl::function("cv.blur", "void", vec![]),
        RawDecl::function("cv.blur", "void", vec![RawParam::plain("int", "ksize")]),
        RawDecl::function("cv.blur", "void", vec![RawParam::plain("double", "sigma")]),
        RawDecl::function("cv.getValue", "int", vec![]),
        RawDecl::function("cv.get_value", "int", vec![]),
    ]);
    let a = &report.artifacts;

    // three identical raw names: every shim symbol after the first is numbered
    for shim in ["\"blur\"", "\"blur2\"", "\"blur3\""] {
        assert!(a.host_impl.contains(&format!("foreign {}", shim)));
    }
    // distinct raw names colliding only by casing: host suffixes only
    assert!(a.host_impl.contains("foreign \"getValue\""));
    assert!(a.host_impl.contains("foreign \"get_value\""));
    assert!(a.host_intf.contains("val get_value : unit -> int"));
    assert!(a.host_intf.contains("val get_value2 : unit -> int"));
}

#[test]
fn enum_constants_export_broken_and_lookup() {
    let report = run(vec![RawDecl::enumeration(
        "cv.LineTypes",
        vec![
            RawParam::plain("const cv.LINE_4", "4"),
            RawParam::plain("const cv.LINE_8", "8"),
            RawParam::plain("const cv.MAGIC", "1 << 12"),
        ],
    )]);
    let a = &report.artifacts;

    // exported constants are computed at shim load time
    assert!(a.shim_header.contains("extern int cv_const_LINE_4;"));
    assert!(a.shim_impl.contains("int cv_const_LINE_8 = (int)cv::LINE_8;"));
    assert!(a
        .host_impl
        .contains("let __const_LINE_4 = foreign_value \"cv_const_LINE_4\" int"));

    // the named enum type lists every constant
    for artifact in [&a.host_impl, &a.host_intf] {
        assert!(artifact.contains("type line_types = ["));
        assert!(artifact.contains("| `MAGIC"));
    }

    // the broken constant gets a failing stub, not a shim export
    assert!(!a.shim_header.contains("cv_const_MAGIC"));
    assert!(a
        .host_impl
        .contains("| `MAGIC -> failwith \"constant MAGIC is broken\""));
    assert!(a.host_impl.contains("| `LINE_4 -> !@ __const_LINE_4"));
    assert!(a.host_intf.contains("val int_of_cv_const : cv_const -> int"));
    assert!(a.host_intf.contains("val (~~) : cv_const -> int"));
}

#[test]
fn filtered_constants_fail_as_unsupported() {
    let report = run(vec![RawDecl::enumeration(
        "cv.HalFlags",
        vec![RawParam::plain("const cv.HAL_GEMM_1_T", "1")],
    )]);
    let a = &report.artifacts;

    assert!(!a.shim_header.contains("cv_const_HAL_GEMM_1_T"));
    assert!(a
        .host_impl
        .contains("| `HAL_GEMM_1_T -> failwith \"constant HAL_GEMM_1_T is unsupported\""));
}

#[test]
fn struct_pack_and_unpack_round_trip_through_the_same_shims() {
    let report = run(vec![]);
    let a = &report.artifacts;

    assert!(a.shim_header.contains("cv::Point *point2i_make(int x, int y);"));
    assert!(a.shim_header.contains("int point2i_get_x(cv::Point *v);"));
    assert!(a.shim_impl.contains("return new cv::Point(x, y);"));
    assert!(a.shim_impl.contains("return v->x;"));

    assert!(a.host_impl.contains("type point2i = { x : int; y : int }"));
    assert!(a.host_impl.contains(
        "let __point2i_make = foreign \"point2i_make\" (int @-> int @-> returning (ptr void))"
    ));
    assert!(a
        .host_impl
        .contains("let point2i_ocaml2c (v : point2i) = __point2i_make (v.x) (v.y)"));
    assert!(a.host_impl.contains(
        "let point2i_c2ocaml p : point2i = { x = __point2i_get_x p; y = __point2i_get_y p }"
    ));
    assert!(a.host_intf.contains("type point2i = { x : int; y : int }"));
}

#[test]
fn unresolved_type_skips_the_declaration_everywhere() {
    let report = run(vec![
        RawDecl::function("cv.goodFunc", "int", vec![]),
        RawDecl::function("cv.badFunc", "Tracker", vec![]),
        RawDecl::function(
            "cv.alsoBad",
            "void",
            vec![RawParam::plain("TrackerParams", "params")],
        ),
    ]);
    let a = &report.artifacts;

    for artifact in [&a.shim_header, &a.shim_impl, &a.host_impl, &a.host_intf] {
        assert!(!artifact.contains("badFunc"));
        assert!(!artifact.contains("bad_func"));
        assert!(!artifact.contains("alsoBad"));
    }
    assert!(a.host_intf.contains("val good_func : unit -> int"));

    assert_eq!(report.skipped.len(), 2);
    assert!(report.missing_types.contains("Tracker"));
    assert!(report.missing_types.contains("TrackerParams"));
    assert!(report.diagnostics.has_warnings());
}

#[test]
fn draw_module_defers_and_applies_on_a_single_clone() {
    let report = run(vec![
        line_decl(),
        // does not qualify: no non-buffer required parameter
        RawDecl::function(
            "cv.flipInPlace",
            "void",
            vec![RawParam::plain("InputOutputArray", "img")],
        ),
    ]);
    let ml = &report.artifacts.host_impl;
    let mli = &report.artifacts.host_intf;

    assert!(ml.contains("module Draw = struct"));
    assert!(ml.contains("type op = Cvdata.t -> unit"));
    // apply clones once, then mutates the clone in place
    assert!(ml.contains("let apply ops buf =\n    let buf = Cvdata.clone buf in"));
    assert!(ml.contains("List.iter (fun op -> op buf) ops;"));
    assert!(ml.contains("let line ?thickness pt1 pt2 color = fun __buf ->"));
    assert!(ml.contains("ignore (line ?thickness ~recycle:true __buf pt1 pt2 color)"));
    assert!(!ml.contains("let flip_in_place ?recycle = fun"));

    assert!(mli.contains("module Draw : sig"));
    assert!(mli.contains("val apply : op list -> Cvdata.t -> Cvdata.t"));
    assert!(mli.contains("val line : ?thickness:int -> point2i -> point2i -> Scalar.t -> op"));
    assert!(!mli.contains("val flip_in_place : op"));
}

#[test]
fn documentation_is_sanitized_into_the_interface() {
    let report = run(vec![RawDecl::function("cv.blur", "void", vec![])
        .with_docs("Blurs an image *) using {| a box filter")]);
    let mli = &report.artifacts.host_intf;
    assert!(mli.contains("(**"));
    assert!(mli.contains("Blurs an image * ) using { | a box filter"));
    assert!(mli.contains("*)"));
}

#[test]
fn inherited_interface_is_restated_in_the_subclass() {
    let report = run(vec![
        RawDecl::class("cv.DescriptorMatcher", ""),
        RawDecl::function("cv.DescriptorMatcher.empty", "bool", vec![]),
        RawDecl::class("cv.BFMatcher", "cv::DescriptorMatcher"),
    ]);
    let a = &report.artifacts;

    assert!(a.host_impl.contains("include Descriptor_matcher"));
    let derived = a
        .host_intf
        .split("module Bf_matcher : sig")
        .nth(1)
        .expect("derived module present");
    assert!(derived.contains("type t = unit ptr"));
    assert!(derived.contains("val empty : t -> bool"));
}

#[test]
fn extern_blocks_bracket_the_shim_artifacts() {
    let report = run(vec![line_decl()]);
    let a = &report.artifacts;

    for artifact in [&a.shim_header, &a.shim_impl] {
        assert!(artifact.contains("extern \"C\" {"));
        assert!(artifact.trim_end().ends_with('}'));
    }
    assert!(a.shim_header.contains("#include \"../glue.h\""));
    assert!(a.shim_impl.contains("#include \"opencv.h\""));
}
