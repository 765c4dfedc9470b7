//! Name resolution and overload disambiguation.
//!
//! Every declaration name is resolved into three coordinated names:
//!
//! - **canonical**: the scanner name with the library namespace stripped
//! - **shim**: the `extern "C"` symbol, with reserved identifiers remapped
//!   and an unconditional numeric suffix on every repeat
//! - **host**: the OCaml identifier, snake-cased and remapped independently,
//!   suffixed only when the host-level pre-count says the name is genuinely
//!   ambiguous within its scope
//!
//! The two overload counters are independent by design: a shim-only
//! collision (say, two spellings remapped onto the same C symbol) must never
//! leak a suffix into the host API, and a host-only collision (two distinct
//! native names that happen to snake-case identically) must never rename a
//! shim symbol. Counters live in [`ResolutionContext`], created per run and
//! threaded through the collector passes, so separate runs cannot
//! cross-contaminate.

use rustc_hash::FxHashMap;

/// Naming configuration supplied by the library profile.
#[derive(Debug, Clone, Default)]
pub struct NameRules {
    /// Namespace prefix stripped from scanner names (`cv.`).
    pub namespace_prefix: String,
    /// Shim identifiers that collide with linker-visible built-ins.
    pub shim_reserved: FxHashMap<String, String>,
    /// Host identifiers that collide with OCaml keywords.
    pub host_reserved: FxHashMap<String, String>,
}

impl NameRules {
    /// Strip the library namespace prefix, if present.
    pub fn strip_namespace<'a>(&self, raw: &'a str) -> &'a str {
        raw.strip_prefix(self.namespace_prefix.as_str()).unwrap_or(raw)
    }

    /// The host identifier a raw name maps to, before any overload suffix.
    pub fn host_candidate(&self, raw: &str) -> String {
        let name = snake_case(self.strip_namespace(raw));
        match self.host_reserved.get(&name) {
            Some(remapped) => remapped.clone(),
            None => name,
        }
    }

    /// The shim symbol a raw name maps to, before any overload suffix.
    pub fn shim_candidate(&self, raw: &str) -> String {
        let name = self.strip_namespace(raw);
        let name = match self.shim_reserved.get(name) {
            Some(remapped) => remapped.clone(),
            None => name.to_string(),
        };
        name.replace('.', "_")
    }

    /// Sanitize a parameter name for the host layer.
    pub fn host_param(&self, name: &str) -> String {
        let name = name.to_lowercase();
        match self.host_reserved.get(&name) {
            Some(remapped) => remapped.clone(),
            None => name,
        }
    }
}

/// The three coordinated names of one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// Scanner name with the namespace stripped.
    pub canonical: String,
    /// Disambiguated shim symbol.
    pub shim: String,
    /// Host-facing identifier.
    pub host: String,
}

/// Overload counters for one generation run.
///
/// `host_totals` is populated by the collector's pre-count pass before any
/// declaration is materialized; `next_host` consults it so a host suffix
/// appears only when more than one declaration truly lands on the same
/// host-scope name.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    /// Shim symbol occurrences seen so far.
    shim_counts: FxHashMap<String, u32>,
    /// (scope, host name) -> total occurrences, from the pre-count pass.
    host_totals: FxHashMap<(String, String), u32>,
    /// (scope, host name) -> occurrences assigned so far.
    host_assigned: FxHashMap<(String, String), u32>,
}

impl ResolutionContext {
    /// Create a fresh context with empty counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-count pass: note that `raw` will materialize in `scope`.
    pub fn precount_host(&mut self, rules: &NameRules, raw: &str, scope: &str) {
        let host = rules.host_candidate(raw);
        *self
            .host_totals
            .entry((scope.to_string(), host))
            .or_insert(0) += 1;
    }

    /// Resolve the canonical and shim names for `raw`, consuming one shim
    /// occurrence. Every repeat of the same shim symbol gets a suffix:
    /// bare, `2`, `3`, ... in encounter order.
    pub fn next_shim(&mut self, rules: &NameRules, raw: &str) -> (String, String) {
        let canonical = rules.strip_namespace(raw).to_string();
        let candidate = rules.shim_candidate(raw);
        let count = self.shim_counts.entry(candidate.clone()).or_insert(0);
        *count += 1;
        let shim = if *count > 1 {
            format!("{}{}", candidate, count)
        } else {
            candidate
        };
        (canonical, shim)
    }

    /// Resolve the host name for `raw` in `scope`, consuming one host
    /// occurrence. A suffix is applied only when the pre-count saw more than
    /// one declaration on this (scope, name) pair: the first keeps the bare
    /// name, later ones get `2`, `3`, ... in encounter order.
    pub fn next_host(&mut self, rules: &NameRules, raw: &str, scope: &str) -> String {
        let candidate = rules.host_candidate(raw);
        let key = (scope.to_string(), candidate.clone());
        let total = self.host_totals.get(&key).copied().unwrap_or(1);
        if total <= 1 {
            return candidate;
        }
        let assigned = self.host_assigned.entry(key).or_insert(0);
        *assigned += 1;
        if *assigned > 1 {
            format!("{}{}", candidate, assigned)
        } else {
            candidate
        }
    }

    /// Resolve all three names for a free declaration.
    pub fn resolve(&mut self, rules: &NameRules, raw: &str, scope: &str) -> ResolvedName {
        let (canonical, shim) = self.next_shim(rules, raw);
        let host = self.next_host(rules, raw, scope);
        ResolvedName {
            canonical,
            shim,
            host,
        }
    }
}

/// Convert a camel-cased identifier to lower snake case.
///
/// Word boundaries are inserted after a lowercase letter or digit followed
/// by an uppercase letter, and before the last uppercase letter of an
/// uppercase run followed by a lowercase letter (`HTTPServer` ->
/// `http_server`).
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let boundary = match chars.get(i.wrapping_sub(1)) {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => {
                    chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase())
                }
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Uppercase the first character; host module names are capitalized
/// snake-case identifiers (`video_capture` -> `Video_capture`).
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
