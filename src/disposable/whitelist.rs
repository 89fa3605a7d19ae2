//! Exemption tables for known safe-to-leak types and call sites.

use rustc_hash::FxHashSet;

use crate::source::{MethodHandle, NamedType, TypeName};

/// Disposable-exempt types and method signatures, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    types: FxHashSet<(String, String)>,
    methods: FxHashSet<String>,
}

impl Whitelist {
    pub fn new(types: &[TypeName], methods: &[String]) -> Self {
        Self {
            types: types
                .iter()
                .map(|t| (t.namespace.clone(), t.name.clone()))
                .collect(),
            methods: methods.iter().map(|m| normalize_signature(m)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.methods.is_empty()
    }

    pub fn contains_type(&self, t: &NamedType) -> bool {
        self.types.contains(&(t.namespace.clone(), t.name.clone()))
    }

    pub fn contains_method(&self, method: &MethodHandle) -> bool {
        !self.methods.is_empty()
            && self
                .methods
                .contains(&normalize_signature(&method.original_definition_display()))
    }
}

/// Signatures compare without whitespace, so `Get<T>(int, string)` and
/// `Get<T>(int,string)` are the same entry.
fn normalize_signature(signature: &str) -> String {
    signature.chars().filter(|c| !c.is_whitespace()).collect()
}
