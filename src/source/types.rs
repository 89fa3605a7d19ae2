//! Type and member handles produced by the semantic model.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::tree::NodeId;

/// Resolved type reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeHandle {
    /// Class, struct, interface, record, enum or delegate.
    Named(NamedType),
    /// Generic type parameter (`T`).
    Parameter(String),
    Array(Box<TypeHandle>),
    /// C# keyword type (`int`, `string`, `void`, ...).
    Predefined(String),
    /// Syntax that could not be resolved, kept so generic arity survives.
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedType {
    /// Containing namespace, or the containing type's full name for nested
    /// types. Empty for the global namespace.
    pub namespace: String,
    pub name: String,
    pub args: Vec<TypeHandle>,
}

impl NamedType {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, args: Vec<TypeHandle>) -> Self {
        Self { namespace: namespace.into(), name: name.into(), args }
    }

    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl TypeHandle {
    pub fn named(namespace: impl Into<String>, name: impl Into<String>, args: Vec<TypeHandle>) -> Self {
        Self::Named(NamedType::new(namespace, name, args))
    }

    pub fn as_named(&self) -> Option<&NamedType> {
        match self {
            Self::Named(n) => Some(n),
            _ => None,
        }
    }

    /// Containing namespace; empty for non-named types.
    pub fn namespace(&self) -> &str {
        match self {
            Self::Named(n) => &n.namespace,
            _ => "",
        }
    }

    /// Generic type arguments.
    pub fn args(&self) -> &[TypeHandle] {
        match self {
            Self::Named(n) => &n.args,
            _ => &[],
        }
    }

    pub fn is_named(&self, namespace: &str, name: &str) -> bool {
        matches!(self, Self::Named(n) if n.is(namespace, name))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Predefined(k) if k == "void")
    }

    /// Short display: `List<DisposeMe>`.
    pub fn display(&self) -> String {
        match self {
            Self::Named(n) if n.args.is_empty() => n.name.clone(),
            Self::Named(n) => format!("{}<{}>", n.name, join(&n.args, TypeHandle::display)),
            Self::Parameter(p) => p.clone(),
            Self::Array(elem) => format!("{}[]", elem.display()),
            Self::Predefined(k) => k.clone(),
            Self::Unknown(raw) => raw.clone(),
        }
    }

    /// Fully qualified display: `System.Collections.Generic.List<Acme.DisposeMe>`.
    pub fn qualified_display(&self) -> String {
        match self {
            Self::Named(n) if n.args.is_empty() => n.full_name(),
            Self::Named(n) => format!(
                "{}<{}>",
                n.full_name(),
                join(&n.args, TypeHandle::qualified_display)
            ),
            Self::Array(elem) => format!("{}[]", elem.qualified_display()),
            other => other.display(),
        }
    }

    /// Replace type parameters according to `map`.
    pub fn substitute(&self, map: &FxHashMap<String, TypeHandle>) -> TypeHandle {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Self::Parameter(p) => map.get(p).cloned().unwrap_or_else(|| self.clone()),
            Self::Named(n) => Self::Named(NamedType {
                namespace: n.namespace.clone(),
                name: n.name.clone(),
                args: n.args.iter().map(|a| a.substitute(map)).collect(),
            }),
            Self::Array(elem) => Self::Array(Box::new(elem.substitute(map))),
            other => other.clone(),
        }
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn join(items: &[TypeHandle], render: fn(&TypeHandle) -> String) -> String {
    items.iter().map(render).collect::<Vec<_>>().join(", ")
}

/// Namespace-qualified type name as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeName {
    pub namespace: String,
    pub name: String,
}

impl TypeName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }

    pub fn matches(&self, t: &NamedType) -> bool {
        t.is(&self.namespace, &self.name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

// =============================================================================
// DEFINITIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Record,
    Enum,
    Delegate,
}

/// Where a definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefOrigin {
    /// Framework catalogue.
    Builtin,
    /// Declared in the analysed sources: file index and declaration node of
    /// the first (or only) partial declaration.
    Source { file: usize, node: NodeId },
    /// Named in configuration as an external disposable type.
    Configured,
}

/// Unbound (original) definition of a type.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub namespace: String,
    pub name: String,
    pub kind: TypeKind,
    pub type_params: Vec<String>,
    /// Direct base class and interfaces, in terms of `type_params`.
    pub bases: Vec<TypeHandle>,
    pub members: Vec<MemberDef>,
    pub is_static: bool,
    pub origin: DefOrigin,
}

impl TypeDef {
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// `System.Collections.Generic.List<T>`
    pub fn definition_display(&self) -> String {
        if self.type_params.is_empty() {
            self.full_name()
        } else {
            format!("{}<{}>", self.full_name(), self.type_params.join(", "))
        }
    }

    /// The definition as a handle over its own type parameters.
    pub fn self_handle(&self) -> NamedType {
        NamedType::new(
            self.namespace.clone(),
            self.name.clone(),
            self.type_params.iter().cloned().map(TypeHandle::Parameter).collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Property,
    Method,
    Constructor,
    Indexer,
}

#[derive(Debug, Clone)]
pub struct MemberDef {
    pub name: String,
    pub kind: MemberKind,
    /// Field/property type or method return type.
    pub ty: Option<TypeHandle>,
    pub params: Vec<ParamDef>,
    pub type_params: Vec<String>,
    pub is_static: bool,
    /// First parameter is `this T` (extension method).
    pub is_extension: bool,
}

#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: String,
    pub ty: Option<TypeHandle>,
    /// Rendering used in signature displays.
    pub display: String,
    pub optional: bool,
    pub is_params: bool,
}

impl MemberDef {
    /// Whether a call with `count` arguments can bind to this member.
    pub fn accepts_arity(&self, count: usize) -> bool {
        let params = if self.is_extension { &self.params[1.min(self.params.len())..] } else { &self.params[..] };
        let required = params.iter().filter(|p| !p.optional && !p.is_params).count();
        let variadic = params.iter().any(|p| p.is_params);
        count >= required && (variadic || count <= params.len())
    }
}

/// Resolved method target of an invocation.
#[derive(Debug, Clone)]
pub struct MethodHandle {
    /// Containing type's original definition display.
    pub containing_display: String,
    pub containing: NamedType,
    pub name: String,
    pub type_params: Vec<String>,
    pub param_displays: Vec<String>,
    /// Return type with receiver and explicit method type arguments applied.
    pub return_type: Option<TypeHandle>,
    pub is_static: bool,
}

impl MethodHandle {
    /// `System.Collections.Generic.List<T>.RemoveAt(int)`
    pub fn original_definition_display(&self) -> String {
        let generics = if self.type_params.is_empty() {
            String::new()
        } else {
            format!("<{}>", self.type_params.join(", "))
        };
        format!(
            "{}.{}{}({})",
            self.containing_display,
            self.name,
            generics,
            self.param_displays.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(arg: TypeHandle) -> TypeHandle {
        TypeHandle::named("System.Collections.Generic", "List", vec![arg])
    }

    #[test]
    fn test_display_forms() {
        let t = list_of(TypeHandle::named("Acme", "DisposeMe", vec![]));
        assert_eq!(t.display(), "List<DisposeMe>");
        assert_eq!(t.qualified_display(), "System.Collections.Generic.List<Acme.DisposeMe>");
        assert_eq!(t.namespace(), "System.Collections.Generic");
    }

    #[test]
    fn test_substitute_type_parameters() {
        let open = list_of(TypeHandle::Parameter("T".into()));
        let mut map = FxHashMap::default();
        map.insert("T".to_string(), TypeHandle::Predefined("int".into()));
        assert_eq!(open.substitute(&map).display(), "List<int>");
    }

    #[test]
    fn test_method_display() {
        let method = MethodHandle {
            containing_display: "System.Collections.Generic.List<T>".into(),
            containing: NamedType::new("System.Collections.Generic", "List", vec![]),
            name: "RemoveAt".into(),
            type_params: vec![],
            param_displays: vec!["int".into()],
            return_type: Some(TypeHandle::Predefined("void".into())),
            is_static: false,
        };
        assert_eq!(
            method.original_definition_display(),
            "System.Collections.Generic.List<T>.RemoveAt(int)"
        );
    }

    #[test]
    fn test_accepts_arity_with_optional_params() {
        let member = MemberDef {
            name: "Open".into(),
            kind: MemberKind::Method,
            ty: None,
            params: vec![
                ParamDef { name: "path".into(), ty: None, display: "string".into(), optional: false, is_params: false },
                ParamDef { name: "mode".into(), ty: None, display: "int".into(), optional: true, is_params: false },
            ],
            type_params: vec![],
            is_static: true,
            is_extension: false,
        };
        assert!(member.accepts_arity(1));
        assert!(member.accepts_arity(2));
        assert!(!member.accepts_arity(0));
        assert!(!member.accepts_arity(3));
    }
}
