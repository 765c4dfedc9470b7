//! TypeRegistry - canonical native type names to algebra nodes.
//!
//! The registry is the single source of type knowledge for a run. It is
//! populated single-threaded while the profile and collector register types,
//! and read-only afterwards while the emitter resolves declaration types.
//!
//! # Resolution order
//!
//! `resolve` tries, in order: an exact hit, a namespaced hit
//! (`<ns>::<name>`), then structural decomposition - strip `const`, a
//! trailing `*`, a trailing `&`, a trailing `[...]`, or a leading
//! `std::vector<` - recursing on the inner text. An unresolvable name yields
//! `None`; that is not fatal here and propagates to the caller, which skips
//! the owning declaration.
//!
//! # Registration policy
//!
//! `register` is strict: re-registering a name that already resolves is the
//! fatal configuration error [`RegistrationError::DuplicateType`]. Call
//! sites that may legitimately see a type twice (class handles re-announced
//! by the scanner, value structs shared between profiles) opt in explicitly
//! through `register_if_absent`.

use rustc_hash::FxHashMap;

use camlgen_core::{RegistrationError, TypeNode};

const CONST_PREFIX: &str = "const ";
const SEQUENCE_PREFIX: &str = "std::vector<";

/// Mapping from canonical native type names to [`TypeNode`]s.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    /// Nodes stored by canonical native name.
    types: FxHashMap<String, TypeNode>,
    /// Library namespace tried as a prefix during resolution (`cv`).
    namespace: String,
}

impl TypeRegistry {
    /// Create an empty registry for the given library namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            types: FxHashMap::default(),
            namespace: namespace.into(),
        }
    }

    /// The library namespace tried as a resolution prefix.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of registered nodes (aliases included).
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Register `node` under its native name. Strict: fails if the name is
    /// already registered.
    pub fn register(&mut self, node: TypeNode) -> Result<(), RegistrationError> {
        let name = node.native_type();
        if self.types.contains_key(&name) {
            return Err(RegistrationError::DuplicateType(name));
        }
        self.types.insert(name, node);
        Ok(())
    }

    /// Register `node` unless its native name is already taken.
    ///
    /// Returns true when the node was inserted. This is the explicit opt-in
    /// for call sites where a repeat registration is expected and harmless.
    pub fn register_if_absent(&mut self, node: TypeNode) -> bool {
        let name = node.native_type();
        if self.types.contains_key(&name) {
            return false;
        }
        self.types.insert(name, node);
        true
    }

    /// Register `alias` as an alternative name for `existing`.
    ///
    /// The target must resolve and the alias must be fresh.
    pub fn alias(&mut self, existing: &str, alias: &str) -> Result<(), RegistrationError> {
        let node = self
            .resolve(existing)
            .ok_or_else(|| RegistrationError::AliasTargetNotFound(existing.to_string()))?;
        if self.types.contains_key(alias) {
            return Err(RegistrationError::DuplicateAlias(alias.to_string()));
        }
        self.types.insert(alias.to_string(), node);
        Ok(())
    }

    /// True when `name` resolves to a node.
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Resolve a native type name to an algebra node.
    pub fn resolve(&self, name: &str) -> Option<TypeNode> {
        let name = name.trim();
        if let Some(node) = self.types.get(name) {
            return Some(node.clone());
        }
        if let Some(node) = self.types.get(&format!("{}::{}", self.namespace, name)) {
            return Some(node.clone());
        }
        if let Some(rest) = name.strip_prefix(CONST_PREFIX) {
            return self.resolve(rest).map(TypeNode::const_of);
        }
        if let Some(rest) = name.strip_suffix('*') {
            return self.resolve(rest).map(TypeNode::pointer_to);
        }
        if let Some(rest) = name.strip_suffix('&') {
            return self.resolve(rest).map(TypeNode::reference_to);
        }
        if name.ends_with(']') {
            if let Some(left) = name.rfind('[') {
                let len = &name[left + 1..name.len() - 1];
                let len = (!len.is_empty()).then(|| len.to_string());
                return self
                    .resolve(&name[..left])
                    .map(|inner| TypeNode::fixed_array(inner, len));
            }
        }
        if let Some(rest) = name.strip_prefix(SEQUENCE_PREFIX) {
            if let Some(right) = rest.rfind('>') {
                return self.resolve(&rest[..right]).map(TypeNode::sequence_of);
            }
        }
        None
    }
}
