//! Conversion expressions produced by the type algebra.
//!
//! Every boundary crossing (native to shim, shim to native, foreign call to
//! host, host to foreign call) is described by a [`ConvExpr`]: the rewritten
//! expression, plus an optional write-back statement to run after the foreign
//! call. The write-back is how in/out buffer arguments propagate mutations
//! performed by the native side back into the host value.
//!
//! Custom types carry their conversion logic as small templates rather than
//! as code: [`ConvTemplate`] has a single hole for the value expression, and
//! [`PostTemplate`] has two holes (the original host variable and the
//! converted temporary). The emitter renders the post template once it knows
//! both names, so artifact text is always assembled from structured parts.

use std::fmt;

/// The hole marker in conversion templates.
const HOLE: &str = "{}";

/// A one-hole expression template.
///
/// `apply` substitutes the value expression for every `{}` occurrence:
///
/// ```
/// use camlgen_core::ConvTemplate;
///
/// let t = ConvTemplate::new("(Scalar.ocaml_to_ctypes ({}))");
/// assert_eq!(t.apply("color"), "(Scalar.ocaml_to_ctypes (color))");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvTemplate(String);

impl ConvTemplate {
    /// Create a template from its textual form.
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// The identity template: the value passes through unchanged.
    pub fn identity() -> Self {
        Self(HOLE.to_string())
    }

    /// True when applying this template returns its input unchanged.
    pub fn is_identity(&self) -> bool {
        self.0 == HOLE
    }

    /// Substitute `value` into every hole.
    pub fn apply(&self, value: &str) -> String {
        self.0.replace(HOLE, value)
    }
}

impl Default for ConvTemplate {
    fn default() -> Self {
        Self::identity()
    }
}

/// A two-hole statement template for post-call write-back.
///
/// `{orig}` is the host-side variable the caller passed in; `{tmp}` is the
/// converted value that crossed the boundary. The rendered statement runs
/// after the foreign call so native mutations become visible to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTemplate(String);

impl PostTemplate {
    /// Create a post template from its textual form.
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Render the statement for a concrete variable pair.
    pub fn render(&self, orig: &str, tmp: &str) -> String {
        self.0.replace("{orig}", orig).replace("{tmp}", tmp)
    }
}

impl fmt::Display for PostTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A converted expression plus its optional post-call statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvExpr {
    /// The expression text after conversion.
    pub expr: String,
    /// Write-back statement to render after the call, if any.
    pub post: Option<PostTemplate>,
}

impl ConvExpr {
    /// A conversion with no post-call side effect.
    pub fn pure(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            post: None,
        }
    }

    /// A conversion that requires a post-call write-back.
    pub fn with_post(expr: impl Into<String>, post: PostTemplate) -> Self {
        Self {
            expr: expr.into(),
            post: Some(post),
        }
    }
}

impl fmt::Display for ConvExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_template_passes_through() {
        let t = ConvTemplate::identity();
        assert!(t.is_identity());
        assert_eq!(t.apply("x"), "x");
    }

    #[test]
    fn template_substitutes_every_hole() {
        let t = ConvTemplate::new("f ({}) ({})");
        assert_eq!(t.apply("v"), "f (v) (v)");
    }

    #[test]
    fn post_template_renders_both_names() {
        let t = PostTemplate::new("Mat.copy_cmat_bigarray {orig} {tmp}");
        assert_eq!(t.render("img", "img'"), "Mat.copy_cmat_bigarray img img'");
    }

    #[test]
    fn pure_conv_has_no_post() {
        let c = ConvExpr::pure("x + 1");
        assert!(c.post.is_none());
    }
}
