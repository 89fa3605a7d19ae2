//! Disposability oracle.
//!
//! Decides whether a type, or the type behind a syntax node, implements
//! `System.IDisposable`. Whitelisted types are never disposable, except the
//! interface itself.

use crate::source::syntax;
use crate::source::{MethodHandle, NodeId, NodeKind, SemanticModel, SyntaxTree, TypeHandle};

use super::whitelist::Whitelist;

pub const DISPOSABLE_NAMESPACE: &str = "System";
pub const DISPOSABLE_NAME: &str = "IDisposable";
const DISPOSABLE_DISPLAY: &str = "System.IDisposable";

/// Shape of a collection-typed member, which decides how its disposal is
/// checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionType {
    #[default]
    None,
    List,
    Dictionary,
    Collection,
}

pub struct DisposableOracle<'m> {
    model: &'m SemanticModel,
    whitelist: &'m Whitelist,
}

impl<'m> DisposableOracle<'m> {
    pub fn new(model: &'m SemanticModel, whitelist: &'m Whitelist) -> Self {
        Self { model, whitelist }
    }

    pub fn model(&self) -> &'m SemanticModel {
        self.model
    }

    pub fn whitelist(&self) -> &'m Whitelist {
        self.whitelist
    }

    /// Whether values of type `t` must be disposed.
    pub fn is_disposable(&self, t: &TypeHandle) -> bool {
        if self.model.original_definition_display(t) == DISPOSABLE_DISPLAY {
            return true;
        }
        if self.is_type_whitelisted(t) {
            return false;
        }
        self.model
            .all_interfaces(t)
            .iter()
            .any(|i| i.is(DISPOSABLE_NAMESPACE, DISPOSABLE_NAME))
    }

    pub fn is_type_whitelisted(&self, t: &TypeHandle) -> bool {
        t.as_named().is_some_and(|n| self.whitelist.contains_type(n))
    }

    pub fn is_method_whitelisted(&self, method: &MethodHandle) -> bool {
        self.whitelist.contains_method(method)
    }

    /// Collection shape of `t`: dictionaries, lists (`List<T>`, `IList<T>`),
    /// and any other generic sequence or array.
    pub fn collection_type(&self, t: &TypeHandle) -> CollectionType {
        match t {
            TypeHandle::Array(_) => CollectionType::Collection,
            TypeHandle::Named(named) => {
                if self.model.dictionary_view(t).is_some() {
                    CollectionType::Dictionary
                } else if named.is("System.Collections.Generic", "List")
                    || named.is("System.Collections.Generic", "IList")
                {
                    CollectionType::List
                } else if !named.args.is_empty()
                    && self
                        .model
                        .find_supertype(t, "System.Collections.Generic", "IEnumerable")
                        .is_some()
                {
                    CollectionType::Collection
                } else {
                    CollectionType::None
                }
            }
            _ => CollectionType::None,
        }
    }

    pub fn element_type(&self, t: &TypeHandle) -> Option<TypeHandle> {
        self.model.element_type(t)
    }

    /// Whether `t` is a collection whose elements (values, for
    /// dictionaries) are disposable.
    pub fn has_disposable_elements(&self, t: &TypeHandle) -> bool {
        self.collection_type(t) != CollectionType::None
            && self.element_type(t).is_some_and(|e| self.is_disposable(&e))
    }

    /// Disposable itself, or a collection of disposables.
    pub fn owns_disposables(&self, t: &TypeHandle) -> bool {
        self.is_disposable(t) || self.has_disposable_elements(t)
    }

    /// Type that a node contributes, chosen by syntactic kind.
    ///
    /// Declarations yield their declared type (inferred for `var`), class
    /// declarations their own type, invocations their return type, object
    /// creations the created type. Anything else has no type here.
    pub fn node_type(&self, tree: &SyntaxTree, node: NodeId) -> Option<TypeHandle> {
        match tree.kind(node) {
            NodeKind::InvocationExpression => self.model.resolve_method(tree, node)?.return_type,
            NodeKind::FieldDeclaration
            | NodeKind::EventFieldDeclaration
            | NodeKind::LocalDeclarationStatement
            | NodeKind::VariableDeclaration => {
                let declaration = syntax::variable_declaration(tree, node)?;
                let first = syntax::declarators(tree, declaration).into_iter().next()?;
                self.model.declarator_type(tree, first)
            }
            NodeKind::VariableDeclarator => self.model.declarator_type(tree, node),
            NodeKind::PropertyDeclaration | NodeKind::IndexerDeclaration => {
                self.model.property_type(tree, node)
            }
            NodeKind::ClassDeclaration | NodeKind::StructDeclaration | NodeKind::RecordDeclaration => {
                self.model.declared_type(tree, node).map(TypeHandle::Named)
            }
            NodeKind::ObjectCreationExpression | NodeKind::ImplicitObjectCreationExpression => {
                self.model.type_of(tree, node)
            }
            NodeKind::Parameter => self.model.parameter_type(tree, node),
            _ => None,
        }
    }

    /// Whether the value behind `node` must be disposed.
    ///
    /// Member and local declarations of collection type test the element
    /// type (`Dictionary<K, V>` tests `V`), so `List<Stream>` counts.
    pub fn is_node_disposable(&self, tree: &SyntaxTree, node: NodeId) -> bool {
        let Some(t) = self.node_type(tree, node) else {
            return false;
        };
        match tree.kind(node) {
            NodeKind::FieldDeclaration
            | NodeKind::EventFieldDeclaration
            | NodeKind::LocalDeclarationStatement
            | NodeKind::VariableDeclaration
            | NodeKind::VariableDeclarator
            | NodeKind::PropertyDeclaration
            | NodeKind::IndexerDeclaration => self.owns_disposables(&t),
            _ => self.is_disposable(&t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{parse_csharp, TypeName};
    use std::path::Path;

    fn parse(src: &str) -> SyntaxTree {
        parse_csharp(Path::new("Test.cs"), src).expect("parse")
    }

    fn named(ns: &str, name: &str, args: Vec<TypeHandle>) -> TypeHandle {
        TypeHandle::named(ns, name, args)
    }

    #[test]
    fn test_framework_types() {
        let model = SemanticModel::builtin_only();
        let whitelist = Whitelist::default();
        let oracle = DisposableOracle::new(&model, &whitelist);
        assert!(oracle.is_disposable(&named("System", "IDisposable", vec![])));
        assert!(oracle.is_disposable(&named("System.IO", "FileStream", vec![])));
        assert!(oracle.is_disposable(&named("System.Net.Http", "HttpClient", vec![])));
        assert!(!oracle.is_disposable(&named("System", "String", vec![])));
        assert!(!oracle.is_disposable(&named("System.Threading.Tasks", "Task", vec![])));
        assert!(!oracle.is_disposable(&TypeHandle::Predefined("int".into())));
    }

    #[test]
    fn test_whitelisted_type_is_not_disposable() {
        let model = SemanticModel::builtin_only();
        let whitelist = Whitelist::new(&[TypeName::new("System.IO", "MemoryStream")], &[]);
        let oracle = DisposableOracle::new(&model, &whitelist);
        assert!(!oracle.is_disposable(&named("System.IO", "MemoryStream", vec![])));
        assert!(oracle.is_disposable(&named("System.IO", "FileStream", vec![])));
    }

    #[test]
    fn test_collection_types() {
        let model = SemanticModel::builtin_only();
        let whitelist = Whitelist::default();
        let oracle = DisposableOracle::new(&model, &whitelist);
        let stream = named("System.IO", "Stream", vec![]);
        let string = TypeHandle::Predefined("string".into());
        let list = named("System.Collections.Generic", "List", vec![stream.clone()]);
        let dict = named("System.Collections.Generic", "Dictionary", vec![string.clone(), stream.clone()]);
        let queue = named("System.Collections.Generic", "Queue", vec![stream.clone()]);
        let names = named("System.Collections.Generic", "List", vec![string]);

        assert_eq!(oracle.collection_type(&list), CollectionType::List);
        assert_eq!(oracle.collection_type(&dict), CollectionType::Dictionary);
        assert_eq!(oracle.collection_type(&queue), CollectionType::Collection);
        assert_eq!(oracle.collection_type(&stream), CollectionType::None);
        assert!(oracle.has_disposable_elements(&list));
        assert!(oracle.has_disposable_elements(&dict));
        assert!(!oracle.has_disposable_elements(&names));
        assert!(!oracle.is_disposable(&list));
    }

    #[test]
    fn test_node_dispatch() {
        let tree = parse(
            "using System; using System.IO; using System.Collections.Generic;\n\
             class Res : IDisposable { public void Dispose() { } }\n\
             class Holder {\n\
               Dictionary<string, Res> byName;\n\
               int count;\n\
               Holder(Stream input) { }\n\
               Stream Open() { return null; }\n\
               void M() { var r = new Res(); Open(); }\n\
             }",
        );
        let model = SemanticModel::build(std::slice::from_ref(&tree), &[]);
        let whitelist = Whitelist::default();
        let oracle = DisposableOracle::new(&model, &whitelist);

        let fields: Vec<_> = tree.nodes_of_kind(NodeKind::FieldDeclaration).collect();
        assert!(oracle.is_node_disposable(&tree, fields[0]));
        assert!(!oracle.is_node_disposable(&tree, fields[1]));

        let classes: Vec<_> = tree.nodes_of_kind(NodeKind::ClassDeclaration).collect();
        assert!(oracle.is_node_disposable(&tree, classes[0]));
        assert!(!oracle.is_node_disposable(&tree, classes[1]));

        let param = tree.nodes_of_kind(NodeKind::Parameter).next().expect("param");
        assert!(oracle.is_node_disposable(&tree, param));

        let creation = tree.nodes_of_kind(NodeKind::ObjectCreationExpression).next().expect("new");
        assert!(oracle.is_node_disposable(&tree, creation));

        let call = tree.nodes_of_kind(NodeKind::InvocationExpression).next().expect("call");
        assert!(oracle.is_node_disposable(&tree, call));

        let block = tree.nodes_of_kind(NodeKind::Block).next().expect("block");
        assert!(!oracle.is_node_disposable(&tree, block));
    }
}
