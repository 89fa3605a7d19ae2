//! Project-wide semantic model.
//!
//! Indexes every type declared in the analysed files together with the
//! framework catalogue, and answers the questions the disposal rules ask:
//! what type does this syntax denote, what type does this expression have,
//! which method does this call bind to, and what does a type implement.
//!
//! Resolution is best effort. Anything that cannot be resolved yields
//! `None`, which callers treat as "not disposable".

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::builtins::{builtin_defs, is_predefined};
use super::syntax::{self, declarator_name, declarator_value};
use super::tree::{NodeId, NodeKind, SyntaxTree};
use super::types::{
    DefOrigin, MemberDef, MemberKind, MethodHandle, NamedType, ParamDef, TypeDef, TypeHandle,
    TypeKind, TypeName,
};

/// Upper bound on nested inference steps (`var a = b.C().D;` chains).
const MAX_DEPTH: u8 = 32;
/// Upper bound on supertypes visited for a single type.
const MAX_SUPERTYPES: usize = 256;

type TypeKey = (String, String, usize);

pub struct SemanticModel {
    defs: Vec<TypeDef>,
    index: FxHashMap<TypeKey, usize>,
    by_name: FxHashMap<String, Vec<usize>>,
}

/// Name-resolution context at a syntax position.
#[derive(Debug, Default)]
struct Scope {
    /// Enclosing namespaces, innermost first, ending with the global one.
    namespaces: Vec<String>,
    /// Full names of enclosing types, innermost first.
    enclosing_types: Vec<String>,
    usings: Vec<String>,
    aliases: Vec<(String, String)>,
    type_params: Vec<String>,
}

impl SemanticModel {
    /// Build the model over all parsed files.
    ///
    /// `extra_disposable` names types from referenced assemblies that should
    /// be treated as implementing `System.IDisposable`.
    pub fn build(trees: &[SyntaxTree], extra_disposable: &[TypeName]) -> Self {
        let mut model = Self {
            defs: Vec::new(),
            index: FxHashMap::default(),
            by_name: FxHashMap::default(),
        };
        for def in builtin_defs() {
            model.insert(def.clone());
        }

        // Phase 1: declare every source type so that phase 2 can resolve
        // references between files.
        let mut declarations = Vec::new();
        for (file, tree) in trees.iter().enumerate() {
            for node in tree.subtree(tree.root()) {
                if let Some(def) = declared_skeleton(tree, file, node) {
                    let idx = model.insert_or_merge(def);
                    declarations.push((idx, file, node));
                }
            }
        }

        // Phase 2: resolve bases and members.
        let resolved: Vec<(usize, Vec<TypeHandle>, Vec<MemberDef>)> = declarations
            .iter()
            .map(|&(idx, file, node)| {
                let tree = &trees[file];
                (idx, model.declared_bases(tree, node), model.declared_members(tree, node))
            })
            .collect();
        for (idx, bases, members) in resolved {
            let def = &mut model.defs[idx];
            for base in bases {
                if !def.bases.contains(&base) {
                    def.bases.push(base);
                }
            }
            def.members.extend(members);
        }

        let disposable = TypeHandle::named("System", "IDisposable", Vec::new());
        for extra in extra_disposable {
            let key = (extra.namespace.clone(), extra.name.clone(), 0);
            match model.index.get(&key).copied() {
                Some(idx) => {
                    if !model.defs[idx].bases.contains(&disposable) {
                        model.defs[idx].bases.push(disposable.clone());
                    }
                }
                None => {
                    model.insert(TypeDef {
                        namespace: extra.namespace.clone(),
                        name: extra.name.clone(),
                        kind: TypeKind::Class,
                        type_params: Vec::new(),
                        bases: vec![disposable.clone()],
                        members: Vec::new(),
                        is_static: false,
                        origin: DefOrigin::Configured,
                    });
                }
            }
        }

        debug!(
            "semantic model: {} type definitions ({} from source)",
            model.defs.len(),
            declarations.len()
        );
        model
    }

    /// Model with only the framework catalogue.
    pub fn builtin_only() -> Self {
        Self::build(&[], &[])
    }

    fn insert(&mut self, def: TypeDef) -> usize {
        let idx = self.defs.len();
        let key = (def.namespace.clone(), def.name.clone(), def.type_params.len());
        self.by_name.entry(def.name.clone()).or_default().push(idx);
        self.index.insert(key, idx);
        self.defs.push(def);
        idx
    }

    /// Partial declarations share one definition.
    fn insert_or_merge(&mut self, def: TypeDef) -> usize {
        let key = (def.namespace.clone(), def.name.clone(), def.type_params.len());
        match self.index.get(&key) {
            Some(&idx) if matches!(self.defs[idx].origin, DefOrigin::Source { .. }) => {
                self.defs[idx].is_static |= def.is_static;
                idx
            }
            _ => self.insert(def),
        }
    }

    // -------------------------------------------------------------------------
    // Definitions and supertypes
    // -------------------------------------------------------------------------

    pub fn definition(&self, t: &NamedType) -> Option<&TypeDef> {
        let key = (t.namespace.clone(), t.name.clone(), t.args.len());
        self.index.get(&key).map(|&i| &self.defs[i])
    }

    pub fn definitions(&self) -> &[TypeDef] {
        &self.defs
    }

    /// Display of the unbound generic definition, e.g.
    /// `System.Collections.Generic.List<T>` for `List<Stream>`.
    pub fn original_definition_display(&self, t: &TypeHandle) -> String {
        match t {
            TypeHandle::Named(named) => match self.definition(named) {
                Some(def) => def.definition_display(),
                None => t.qualified_display(),
            },
            other => other.display(),
        }
    }

    /// Every base class and interface of `t`, transitively, with generic
    /// arguments substituted. `t` itself is not included.
    pub fn supertypes(&self, t: &TypeHandle) -> Vec<NamedType> {
        let TypeHandle::Named(start) = t else {
            return Vec::new();
        };
        let mut result = Vec::new();
        let mut seen = FxHashSet::default();
        let mut queue = vec![start.clone()];
        seen.insert(TypeHandle::Named(start.clone()).qualified_display());

        while let Some(current) = queue.pop() {
            let Some(def) = self.definition(&current) else {
                continue;
            };
            let map = substitution(&def.type_params, &current.args);
            for base in &def.bases {
                if let TypeHandle::Named(base) = base.substitute(&map) {
                    let key = TypeHandle::Named(base.clone()).qualified_display();
                    if seen.insert(key) && result.len() < MAX_SUPERTYPES {
                        result.push(base.clone());
                        queue.push(base);
                    }
                }
            }
        }
        result
    }

    /// Interfaces implemented by `t`, transitively. Supertypes without a
    /// known definition are included since their kind cannot be ruled out.
    pub fn all_interfaces(&self, t: &TypeHandle) -> Vec<NamedType> {
        self.supertypes(t)
            .into_iter()
            .filter(|s| {
                self.definition(s)
                    .map(|d| d.kind == TypeKind::Interface)
                    .unwrap_or(true)
            })
            .collect()
    }

    /// `t` or the supertype of `t` that is `namespace.name`.
    pub fn find_supertype(&self, t: &TypeHandle, namespace: &str, name: &str) -> Option<NamedType> {
        if let TypeHandle::Named(named) = t {
            if named.is(namespace, name) {
                return Some(named.clone());
            }
        }
        self.supertypes(t).into_iter().find(|s| s.is(namespace, name))
    }

    pub fn kind_of(&self, t: &TypeHandle) -> Option<TypeKind> {
        t.as_named().and_then(|n| self.definition(n)).map(|d| d.kind)
    }

    /// Members named `name` on `t` and its supertypes, nearest first, each
    /// with the substitution that maps the owner's type parameters.
    fn lookup_members<'m>(
        &'m self,
        t: &NamedType,
        name: &str,
    ) -> Vec<(&'m TypeDef, &'m MemberDef, FxHashMap<String, TypeHandle>)> {
        let mut found = Vec::new();
        let mut chain = vec![t.clone()];
        chain.extend(self.supertypes(&TypeHandle::Named(t.clone())));
        for owner in chain {
            let Some(def) = self.definition(&owner) else {
                continue;
            };
            let map = substitution(&def.type_params, &owner.args);
            for member in def.members.iter().filter(|m| m.name == name) {
                found.push((def, member, map.clone()));
            }
        }
        found
    }

    fn member_type(&self, t: &NamedType, name: &str, want_static: Option<bool>) -> Option<TypeHandle> {
        self.lookup_members(t, name)
            .into_iter()
            .find(|(_, m, _)| {
                matches!(m.kind, MemberKind::Field | MemberKind::Property)
                    && want_static.map_or(true, |s| m.is_static == s)
            })
            .and_then(|(_, m, map)| m.ty.as_ref().map(|ty| ty.substitute(&map)))
    }

    fn indexer_type(&self, t: &NamedType) -> Option<TypeHandle> {
        self.lookup_members(t, "this[]")
            .into_iter()
            .find_map(|(_, m, map)| m.ty.as_ref().map(|ty| ty.substitute(&map)))
    }

    // -------------------------------------------------------------------------
    // Type syntax
    // -------------------------------------------------------------------------

    /// Type denoted by a type syntax node. `var` yields `None`.
    pub fn resolve_type(&self, tree: &SyntaxTree, node: NodeId) -> Option<TypeHandle> {
        let scope = scope_at(tree, node);
        self.resolve_type_in(tree, node, &scope)
    }

    fn resolve_type_in(&self, tree: &SyntaxTree, node: NodeId, scope: &Scope) -> Option<TypeHandle> {
        match tree.kind(node) {
            NodeKind::PredefinedType => Some(TypeHandle::Predefined(tree.text(node).trim().to_string())),
            NodeKind::ImplicitType => None,
            NodeKind::Identifier => {
                let name = tree.text(node);
                if name == "var" {
                    return None;
                }
                self.resolve_name(scope, name, Vec::new())
            }
            NodeKind::GenericName => {
                let name = syntax::simple_name(tree, node);
                let args = self.type_arguments(tree, node, scope);
                self.resolve_name(scope, name, args)
            }
            NodeKind::QualifiedName | NodeKind::AliasQualifiedName => {
                let qualifier = tree
                    .child_by_field(node, "qualifier")
                    .or_else(|| tree.first_syntax_child(node))?;
                let name_node = tree
                    .child_by_field(node, "name")
                    .or_else(|| tree.last_syntax_child(node))?;
                let name = syntax::simple_name(tree, name_node);
                let args = if tree.kind(name_node) == NodeKind::GenericName {
                    self.type_arguments(tree, name_node, scope)
                } else {
                    Vec::new()
                };
                let namespace = compact(tree.text(qualifier));
                let namespace = namespace.strip_prefix("global::").unwrap_or(&namespace).to_string();
                self.resolve_qualified(scope, &namespace, name, args)
            }
            NodeKind::NullableType => {
                let inner = tree.child_by_field(node, "type").or_else(|| tree.first_syntax_child(node))?;
                self.resolve_type_in(tree, inner, scope)
            }
            NodeKind::ArrayType => {
                let elem = tree.child_by_field(node, "type").or_else(|| tree.first_syntax_child(node))?;
                let elem = self
                    .resolve_type_in(tree, elem, scope)
                    .unwrap_or_else(|| TypeHandle::Unknown(tree.text(elem).to_string()));
                Some(TypeHandle::Array(Box::new(elem)))
            }
            _ => None,
        }
    }

    fn type_arguments(&self, tree: &SyntaxTree, generic: NodeId, scope: &Scope) -> Vec<TypeHandle> {
        tree.child_of_kind(generic, NodeKind::TypeArgumentList)
            .map(|list| {
                tree.syntax_children(list)
                    .map(|arg| {
                        self.resolve_type_in(tree, arg, scope)
                            .unwrap_or_else(|| TypeHandle::Unknown(compact(tree.text(arg))))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lookup(&self, namespace: &str, name: &str, arity: usize) -> Option<&TypeDef> {
        let key = (namespace.to_string(), name.to_string(), arity);
        self.index.get(&key).map(|&i| &self.defs[i])
    }

    fn handle_for(def: &TypeDef, args: Vec<TypeHandle>) -> TypeHandle {
        TypeHandle::named(def.namespace.clone(), def.name.clone(), args)
    }

    /// Resolve a simple type name in scope.
    ///
    /// Lookup order follows C#: type parameters, nested types of enclosing
    /// types, enclosing namespaces, aliases, `using` namespaces. As a last
    /// resort a name that is unique across the whole model is accepted, so
    /// that files with missing `using` directives still resolve.
    fn resolve_name(&self, scope: &Scope, name: &str, args: Vec<TypeHandle>) -> Option<TypeHandle> {
        if args.is_empty() {
            if scope.type_params.iter().any(|p| p == name) {
                return Some(TypeHandle::Parameter(name.to_string()));
            }
            if is_predefined(name) {
                return Some(TypeHandle::Predefined(name.to_string()));
            }
        }
        let arity = args.len();
        for container in scope.enclosing_types.iter().chain(scope.namespaces.iter()) {
            if let Some(def) = self.lookup(container, name, arity) {
                return Some(Self::handle_for(def, args));
            }
        }
        if arity == 0 {
            if let Some((_, target)) = scope.aliases.iter().find(|(alias, _)| alias == name) {
                if let Some((ns, simple)) = target.rsplit_once('.') {
                    if let Some(def) = self.lookup(ns, simple, 0) {
                        return Some(Self::handle_for(def, args));
                    }
                }
            }
        }
        for using in &scope.usings {
            if let Some(def) = self.lookup(using, name, arity) {
                return Some(Self::handle_for(def, args));
            }
        }
        let candidates: Vec<&TypeDef> = self
            .by_name
            .get(name)
            .map(|ids| {
                ids.iter()
                    .map(|&i| &self.defs[i])
                    .filter(|d| d.type_params.len() == arity)
                    .collect()
            })
            .unwrap_or_default();
        match candidates.as_slice() {
            [only] => Some(Self::handle_for(only, args)),
            _ => None,
        }
    }

    fn resolve_qualified(
        &self,
        scope: &Scope,
        qualifier: &str,
        name: &str,
        args: Vec<TypeHandle>,
    ) -> Option<TypeHandle> {
        if let Some(def) = self.lookup(qualifier, name, args.len()) {
            return Some(Self::handle_for(def, args));
        }
        // Namespace relative to an enclosing namespace, or an alias.
        for ns in &scope.namespaces {
            if ns.is_empty() {
                continue;
            }
            let full = format!("{}.{}", ns, qualifier);
            if let Some(def) = self.lookup(&full, name, args.len()) {
                return Some(Self::handle_for(def, args));
            }
        }
        if let Some((_, target)) = scope.aliases.iter().find(|(alias, _)| alias == qualifier) {
            if let Some(def) = self.lookup(target, name, args.len()) {
                return Some(Self::handle_for(def, args));
            }
        }
        // Nested type of a resolvable outer type.
        if !qualifier.contains('<') {
            let outer = match qualifier.rsplit_once('.') {
                Some((ns, outer)) => self.resolve_qualified(scope, ns, outer, Vec::new()),
                None => self.resolve_name(scope, qualifier, Vec::new()),
            };
            if let Some(TypeHandle::Named(outer)) = outer {
                if let Some(def) = self.lookup(&outer.full_name(), name, args.len()) {
                    return Some(Self::handle_for(def, args));
                }
            }
        }
        Some(TypeHandle::named(qualifier, name, args))
    }

    /// Resolve an expression that names a type (`File`, `System.IO.File`).
    fn resolve_type_expression(&self, tree: &SyntaxTree, expr: NodeId) -> Option<TypeHandle> {
        let scope = scope_at(tree, expr);
        match tree.kind(expr) {
            NodeKind::Identifier | NodeKind::GenericName | NodeKind::QualifiedName | NodeKind::PredefinedType => {
                self.resolve_type_in(tree, expr, &scope)
            }
            NodeKind::MemberAccessExpression => {
                let text = compact(tree.text(expr));
                let (qualifier, name) = text.rsplit_once('.')?;
                match self.resolve_qualified(&scope, qualifier, name, Vec::new()) {
                    Some(TypeHandle::Named(n)) if self.definition(&n).is_some() => Some(TypeHandle::Named(n)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Declarations
    // -------------------------------------------------------------------------

    /// Own type of a class, struct, record or interface declaration, over
    /// its type parameters.
    pub fn declared_type(&self, tree: &SyntaxTree, type_decl: NodeId) -> Option<NamedType> {
        let name = tree.name_of(type_decl)?;
        Some(NamedType::new(
            declared_namespace(tree, type_decl),
            name,
            type_parameters(tree, type_decl)
                .into_iter()
                .map(TypeHandle::Parameter)
                .collect(),
        ))
    }

    /// Declared (or inferred, for `var`) type of a variable declarator.
    pub fn declarator_type(&self, tree: &SyntaxTree, declarator: NodeId) -> Option<TypeHandle> {
        self.declarator_type_depth(tree, declarator, 0)
    }

    fn declarator_type_depth(&self, tree: &SyntaxTree, declarator: NodeId, depth: u8) -> Option<TypeHandle> {
        let declaration = syntax::variable_declaration(tree, declarator)?;
        let type_node = syntax::declaration_type(tree, declaration)?;
        match self.resolve_type(tree, type_node) {
            Some(t) => Some(t),
            None if is_var(tree, type_node) => {
                let value = declarator_value(tree, declarator)?;
                self.type_of_depth(tree, value, depth + 1)
            }
            None => None,
        }
    }

    /// Declared type of a parameter.
    pub fn parameter_type(&self, tree: &SyntaxTree, parameter: NodeId) -> Option<TypeHandle> {
        let type_node = syntax::parameter_type(tree, parameter)?;
        self.resolve_type(tree, type_node)
    }

    /// Declared type of a property or indexer.
    pub fn property_type(&self, tree: &SyntaxTree, property: NodeId) -> Option<TypeHandle> {
        let type_node = syntax::property_type(tree, property)?;
        self.resolve_type(tree, type_node)
    }

    /// Value type produced by a member body: method/local-function return
    /// type, or the property type for accessors and expression-bodied
    /// properties.
    pub fn member_value_type(&self, tree: &SyntaxTree, member: NodeId) -> Option<TypeHandle> {
        match tree.kind(member) {
            NodeKind::MethodDeclaration | NodeKind::LocalFunctionStatement => {
                let node = syntax::return_type(tree, member)?;
                self.resolve_type(tree, node)
            }
            NodeKind::PropertyDeclaration | NodeKind::IndexerDeclaration => self.property_type(tree, member),
            NodeKind::AccessorDeclaration => {
                let property = tree.nearest_ancestor_where(member, |k| {
                    matches!(k, NodeKind::PropertyDeclaration | NodeKind::IndexerDeclaration)
                })?;
                self.property_type(tree, property)
            }
            _ => None,
        }
    }

    fn declared_bases(&self, tree: &SyntaxTree, decl: NodeId) -> Vec<TypeHandle> {
        let Some(list) = tree.child_of_kind(decl, NodeKind::BaseList) else {
            return Vec::new();
        };
        let scope = scope_at(tree, list);
        tree.syntax_children(list)
            .filter_map(|base| {
                // `record R(int X) : Base(X)` wraps the type in a
                // primary-constructor base node.
                let type_node = if syntax::is_type_kind(tree.kind(base)) {
                    base
                } else {
                    tree.syntax_children(base).find(|&c| syntax::is_type_kind(tree.kind(c)))?
                };
                self.resolve_type_in(tree, type_node, &scope)
            })
            .collect()
    }

    fn declared_members(&self, tree: &SyntaxTree, decl: NodeId) -> Vec<MemberDef> {
        let mut members = Vec::new();

        if tree.kind(decl) == NodeKind::RecordDeclaration {
            for param in syntax::parameters(tree, decl) {
                if let Some(name) = tree.name_of(param) {
                    members.push(MemberDef {
                        name: name.to_string(),
                        kind: MemberKind::Property,
                        ty: self.parameter_type(tree, param),
                        params: Vec::new(),
                        type_params: Vec::new(),
                        is_static: false,
                        is_extension: false,
                    });
                }
            }
        }

        let Some(body) = tree.child_of_kind(decl, NodeKind::DeclarationList) else {
            return members;
        };
        for member in tree.syntax_children(body) {
            let is_static = tree.has_modifier(member, "static");
            match tree.kind(member) {
                NodeKind::FieldDeclaration => {
                    let Some(declaration) = syntax::variable_declaration(tree, member) else {
                        continue;
                    };
                    let ty = syntax::declaration_type(tree, declaration)
                        .and_then(|t| self.resolve_type(tree, t));
                    for declarator in syntax::declarators(tree, declaration) {
                        if let Some(name) = declarator_name(tree, declarator) {
                            members.push(MemberDef {
                                name: tree.text(name).to_string(),
                                kind: MemberKind::Field,
                                ty: ty.clone(),
                                params: Vec::new(),
                                type_params: Vec::new(),
                                is_static,
                                is_extension: false,
                            });
                        }
                    }
                }
                NodeKind::PropertyDeclaration => {
                    if let Some(name) = tree.name_of(member) {
                        members.push(MemberDef {
                            name: name.to_string(),
                            kind: MemberKind::Property,
                            ty: self.property_type(tree, member),
                            params: Vec::new(),
                            type_params: Vec::new(),
                            is_static,
                            is_extension: false,
                        });
                    }
                }
                NodeKind::IndexerDeclaration => {
                    members.push(MemberDef {
                        name: "this[]".to_string(),
                        kind: MemberKind::Indexer,
                        ty: self.property_type(tree, member),
                        params: self.declared_params(tree, member),
                        type_params: Vec::new(),
                        is_static: false,
                        is_extension: false,
                    });
                }
                NodeKind::MethodDeclaration => {
                    let Some(name) = tree.name_of(member) else {
                        continue;
                    };
                    let params = self.declared_params(tree, member);
                    let is_extension = syntax::parameters(tree, member)
                        .first()
                        .is_some_and(|&p| tree.text(p).trim_start().starts_with("this "));
                    members.push(MemberDef {
                        name: name.to_string(),
                        kind: MemberKind::Method,
                        ty: syntax::return_type(tree, member).and_then(|r| self.resolve_type(tree, r)),
                        params,
                        type_params: type_parameters(tree, member),
                        is_static,
                        is_extension,
                    });
                }
                NodeKind::ConstructorDeclaration => {
                    members.push(MemberDef {
                        name: ".ctor".to_string(),
                        kind: MemberKind::Constructor,
                        ty: None,
                        params: self.declared_params(tree, member),
                        type_params: Vec::new(),
                        is_static,
                        is_extension: false,
                    });
                }
                _ => {}
            }
        }
        members
    }

    fn declared_params(&self, tree: &SyntaxTree, member: NodeId) -> Vec<ParamDef> {
        syntax::parameters(tree, member)
            .into_iter()
            .map(|param| {
                let ty = self.parameter_type(tree, param);
                let text = tree.text(param).trim_start();
                let modifier = ["out ", "ref ", "in "]
                    .iter()
                    .find(|m| text.starts_with(*m))
                    .copied()
                    .unwrap_or("");
                let type_display = match &ty {
                    Some(t) => t.qualified_display(),
                    None => syntax::parameter_type(tree, param)
                        .map(|t| compact(tree.text(t)))
                        .unwrap_or_default(),
                };
                ParamDef {
                    name: tree.name_of(param).unwrap_or("").to_string(),
                    ty,
                    display: format!("{}{}", modifier, type_display),
                    optional: tree.child_of_kind(param, NodeKind::EqualsValueClause).is_some()
                        || text.contains('='),
                    is_params: text.starts_with("params "),
                }
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    /// Static type of an expression.
    pub fn type_of(&self, tree: &SyntaxTree, expr: NodeId) -> Option<TypeHandle> {
        self.type_of_depth(tree, expr, 0)
    }

    fn type_of_depth(&self, tree: &SyntaxTree, expr: NodeId, depth: u8) -> Option<TypeHandle> {
        if depth > MAX_DEPTH {
            return None;
        }
        let next = depth + 1;
        match tree.kind(expr) {
            NodeKind::ParenthesizedExpression => self.type_of_depth(tree, tree.first_syntax_child(expr)?, next),
            NodeKind::ObjectCreationExpression | NodeKind::ArrayCreationExpression => {
                let type_node = tree
                    .child_by_field(expr, "type")
                    .or_else(|| tree.syntax_children(expr).find(|&c| syntax::is_type_kind(tree.kind(c))))?;
                self.resolve_type(tree, type_node)
            }
            NodeKind::ImplicitObjectCreationExpression => self.target_type(tree, expr, next),
            NodeKind::CastExpression => {
                let type_node = tree.child_by_field(expr, "type").or_else(|| tree.first_syntax_child(expr))?;
                self.resolve_type(tree, type_node)
            }
            NodeKind::AsExpression => {
                let type_node = tree.child_by_field(expr, "right").or_else(|| tree.last_syntax_child(expr))?;
                self.resolve_type(tree, type_node)
            }
            NodeKind::BinaryExpression => {
                let left = tree.child_by_field(expr, "left").or_else(|| tree.first_syntax_child(expr))?;
                let right = tree.child_by_field(expr, "right").or_else(|| tree.last_syntax_child(expr))?;
                let op = tree
                    .source()
                    .get(tree.node(left).end_byte..tree.node(right).start_byte)
                    .unwrap_or("")
                    .trim();
                match op {
                    "as" => self.resolve_type(tree, right),
                    "??" => self
                        .type_of_depth(tree, left, next)
                        .or_else(|| self.type_of_depth(tree, right, next)),
                    _ => None,
                }
            }
            NodeKind::ConditionalExpression => {
                let (_, consequence, alternative) = syntax::ternary_parts(tree, expr)?;
                self.type_of_depth(tree, consequence, next)
                    .or_else(|| self.type_of_depth(tree, alternative, next))
            }
            NodeKind::AwaitExpression => {
                let inner = self.type_of_depth(tree, tree.first_syntax_child(expr)?, next)?;
                match inner {
                    TypeHandle::Named(n)
                        if (n.is("System.Threading.Tasks", "Task") || n.is("System.Threading.Tasks", "ValueTask"))
                            && n.args.len() == 1 =>
                    {
                        n.args.into_iter().next()
                    }
                    _ => None,
                }
            }
            NodeKind::Identifier => self.identifier_type(tree, expr, next),
            NodeKind::This => self.enclosing_type_handle(tree, expr).map(TypeHandle::Named),
            NodeKind::MemberAccessExpression => {
                let (receiver, name_node) = syntax::member_access_parts(tree, expr)?;
                let name = syntax::simple_name(tree, name_node);
                self.member_access_type(tree, receiver, name, next)
            }
            NodeKind::MemberBindingExpression => {
                let access = tree.nearest_ancestor(expr, NodeKind::ConditionalAccessExpression)?;
                let receiver = tree
                    .child_by_field(access, "condition")
                    .or_else(|| tree.first_syntax_child(access))?;
                let name = syntax::simple_name(tree, expr);
                self.member_access_type(tree, receiver, name, next)
            }
            NodeKind::ConditionalAccessExpression => {
                let tail = tree.last_syntax_child(expr)?;
                self.type_of_depth(tree, tail, next)
            }
            NodeKind::InvocationExpression => self.resolve_method_depth(tree, expr, next)?.return_type,
            NodeKind::ElementAccessExpression => {
                let receiver = tree.child_by_field(expr, "expression").or_else(|| tree.first_syntax_child(expr))?;
                match self.type_of_depth(tree, receiver, next)? {
                    TypeHandle::Array(elem) => Some(*elem),
                    TypeHandle::Named(n) => self.indexer_type(&n),
                    _ => None,
                }
            }
            NodeKind::Literal => match tree.node(expr).grammar_kind {
                "string_literal" | "verbatim_string_literal" | "raw_string_literal"
                | "interpolated_string_expression" => Some(TypeHandle::Predefined("string".into())),
                "integer_literal" => Some(TypeHandle::Predefined("int".into())),
                "boolean_literal" => Some(TypeHandle::Predefined("bool".into())),
                "character_literal" => Some(TypeHandle::Predefined("char".into())),
                "real_literal" => Some(TypeHandle::Predefined("double".into())),
                _ => None,
            },
            NodeKind::TypeofExpression => Some(TypeHandle::named("System", "Type", Vec::new())),
            NodeKind::DeclarationExpression => {
                let type_node = tree.child_by_field(expr, "type").or_else(|| tree.first_syntax_child(expr))?;
                self.resolve_type(tree, type_node)
            }
            _ => None,
        }
    }

    fn member_access_type(&self, tree: &SyntaxTree, receiver: NodeId, name: &str, depth: u8) -> Option<TypeHandle> {
        match self.receiver_type(tree, receiver, depth) {
            Some((TypeHandle::Named(t), is_static)) => {
                self.member_type(&t, name, if is_static { Some(true) } else { None })
            }
            Some((TypeHandle::Array(_), _)) if name == "Length" => Some(TypeHandle::Predefined("int".into())),
            _ => None,
        }
    }

    /// Type of a member-access receiver and whether it names a type (static
    /// access) rather than a value.
    fn receiver_type(&self, tree: &SyntaxTree, receiver: NodeId, depth: u8) -> Option<(TypeHandle, bool)> {
        match tree.kind(receiver) {
            NodeKind::This => self
                .enclosing_type_handle(tree, receiver)
                .map(|t| (TypeHandle::Named(t), false)),
            NodeKind::Base => {
                let own = self.enclosing_type_handle(tree, receiver)?;
                let def = self.definition(&own)?;
                let base = def
                    .bases
                    .iter()
                    .find(|b| self.kind_of(b) != Some(TypeKind::Interface))?
                    .clone();
                Some((base, false))
            }
            NodeKind::PredefinedType => Some((self.resolve_type(tree, receiver)?, true)),
            _ => match self.type_of_depth(tree, receiver, depth) {
                Some(t) => Some((t, false)),
                None => self.resolve_type_expression(tree, receiver).map(|t| (t, true)),
            },
        }
    }

    /// Type expected at the position of a target-typed `new()`.
    fn target_type(&self, tree: &SyntaxTree, expr: NodeId, depth: u8) -> Option<TypeHandle> {
        let mut child = expr;
        for ancestor in tree.ancestors(expr) {
            match tree.kind(ancestor) {
                NodeKind::ParenthesizedExpression | NodeKind::EqualsValueClause => {}
                NodeKind::VariableDeclarator => {
                    let declaration = syntax::variable_declaration(tree, ancestor)?;
                    let type_node = syntax::declaration_type(tree, declaration)?;
                    return self.resolve_type(tree, type_node);
                }
                NodeKind::AssignmentExpression => {
                    let (left, _, right) = syntax::assignment_parts(tree, ancestor)?;
                    if right != child {
                        return None;
                    }
                    return self.type_of_depth(tree, left, depth);
                }
                NodeKind::PropertyDeclaration => return self.property_type(tree, ancestor),
                NodeKind::ReturnStatement | NodeKind::ArrowExpressionClause => {
                    let member = syntax::enclosing_member(tree, ancestor)?;
                    return self.member_value_type(tree, member);
                }
                _ => return None,
            }
            child = ancestor;
        }
        None
    }

    /// Type of a name used as an expression: local, parameter, field or
    /// property, in that order.
    fn identifier_type(&self, tree: &SyntaxTree, ident: NodeId, depth: u8) -> Option<TypeHandle> {
        let name = tree.text(ident);
        let ident_start = tree.node(ident).start_byte;

        // Locals visible at this point: the nearest preceding declarator
        // whose scope contains the use.
        if let Some(member) = syntax::enclosing_member(tree, ident) {
            let local = tree
                .descendants(member)
                .filter(|&n| tree.kind(n) == NodeKind::VariableDeclarator)
                .filter(|&n| tree.node(n).start_byte < ident_start && !tree.is_within(ident, n))
                .filter(|&n| declarator_name(tree, n).is_some_and(|d| tree.text(d) == name))
                .filter(|&n| local_scope(tree, n).is_some_and(|s| tree.is_within(ident, s)))
                .last();
            if let Some(declarator) = local {
                return self.declarator_type_depth(tree, declarator, depth);
            }
            let out_var = tree
                .descendants(member)
                .filter(|&n| tree.kind(n) == NodeKind::DeclarationExpression)
                .filter(|&n| tree.node(n).start_byte < ident_start)
                .filter(|&n| {
                    tree.last_syntax_child(n)
                        .is_some_and(|d| tree.text(d) == name)
                })
                .last();
            if let Some(decl) = out_var {
                let type_node = tree.child_by_field(decl, "type").or_else(|| tree.first_syntax_child(decl))?;
                return self.resolve_type(tree, type_node);
            }
        }

        for ancestor in tree.ancestors(ident) {
            match tree.kind(ancestor) {
                NodeKind::ForEachStatement => {
                    let declared = tree
                        .child_by_field(ancestor, "left")
                        .filter(|&l| tree.kind(l) == NodeKind::Identifier);
                    if declared.is_some_and(|d| tree.text(d) == name) {
                        let type_node = tree.child_by_field(ancestor, "type")?;
                        if let Some(t) = self.resolve_type(tree, type_node) {
                            return Some(t);
                        }
                        let source = tree.child_by_field(ancestor, "right")?;
                        let collection = self.type_of_depth(tree, source, depth)?;
                        return self.element_type(&collection);
                    }
                }
                NodeKind::LambdaExpression | NodeKind::AnonymousMethodExpression => {
                    let params = syntax::parameters(tree, ancestor);
                    if params.iter().any(|&p| tree.name_of(p) == Some(name)) {
                        return params
                            .iter()
                            .find(|&&p| tree.name_of(p) == Some(name))
                            .and_then(|&p| self.parameter_type(tree, p));
                    }
                    let implicit = tree
                        .children_of_kind(ancestor, NodeKind::Identifier)
                        .next()
                        .is_some_and(|p| tree.text(p) == name && p != ident);
                    if implicit {
                        return None;
                    }
                }
                NodeKind::MethodDeclaration
                | NodeKind::ConstructorDeclaration
                | NodeKind::LocalFunctionStatement
                | NodeKind::IndexerDeclaration
                | NodeKind::RecordDeclaration => {
                    if let Some(&param) = syntax::parameters(tree, ancestor)
                        .iter()
                        .find(|&&p| tree.name_of(p) == Some(name))
                    {
                        return self.parameter_type(tree, param);
                    }
                }
                NodeKind::AccessorDeclaration if name == "value" => {
                    let accessor = tree.name_of(ancestor).unwrap_or("");
                    let keyword = tree.text(ancestor);
                    if accessor == "set" || accessor == "init" || keyword.contains("set") || keyword.contains("init") {
                        return self.member_value_type(tree, ancestor);
                    }
                }
                kind if kind.is_type_declaration() => {
                    let own = self.declared_type(tree, ancestor)?;
                    if let Some(t) = self.member_type(&own, name, None) {
                        return Some(t);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Element type of a collection: `V` for dictionaries, otherwise the
    /// argument of its `IEnumerable<T>`.
    pub fn element_type(&self, collection: &TypeHandle) -> Option<TypeHandle> {
        match collection {
            TypeHandle::Array(elem) => Some((**elem).clone()),
            TypeHandle::Named(_) => {
                if let Some(dict) = self.dictionary_view(collection) {
                    return dict.args.get(1).cloned();
                }
                self.find_supertype(collection, "System.Collections.Generic", "IEnumerable")
                    .and_then(|e| e.args.into_iter().next())
            }
            _ => None,
        }
    }

    /// `IDictionary<K, V>` view of a dictionary-like type.
    pub fn dictionary_view(&self, t: &TypeHandle) -> Option<NamedType> {
        self.find_supertype(t, "System.Collections.Generic", "IDictionary")
            .or_else(|| self.find_supertype(t, "System.Collections.Generic", "IReadOnlyDictionary"))
            .filter(|d| d.args.len() == 2)
    }

    /// The type declaring `node`, over its own type parameters.
    pub fn enclosing_type_handle(&self, tree: &SyntaxTree, node: NodeId) -> Option<NamedType> {
        let decl = syntax::enclosing_type(tree, node)?;
        self.declared_type(tree, decl)
    }

    // -------------------------------------------------------------------------
    // Invocations
    // -------------------------------------------------------------------------

    /// Method an invocation binds to.
    pub fn resolve_method(&self, tree: &SyntaxTree, invocation: NodeId) -> Option<MethodHandle> {
        self.resolve_method_depth(tree, invocation, 0)
    }

    fn resolve_method_depth(&self, tree: &SyntaxTree, invocation: NodeId, depth: u8) -> Option<MethodHandle> {
        if depth > MAX_DEPTH {
            return None;
        }
        let function = syntax::invocation_function(tree, invocation)?;
        let arg_count = syntax::argument_list(tree, invocation)
            .map(|list| tree.children_of_kind(list, NodeKind::Argument).count())
            .unwrap_or(0);

        match tree.kind(function) {
            NodeKind::Identifier | NodeKind::GenericName => {
                let name = syntax::simple_name(tree, function);
                let explicit = self.method_type_args(tree, function);
                if let Some(local) = self.local_function(tree, invocation, name) {
                    let ret = syntax::return_type(tree, local).and_then(|r| self.resolve_type(tree, r));
                    let owner = self.enclosing_type_handle(tree, invocation)?;
                    return Some(MethodHandle {
                        containing_display: self.original_definition_display(&TypeHandle::Named(owner.clone())),
                        containing: owner,
                        name: name.to_string(),
                        type_params: type_parameters(tree, local),
                        param_displays: self.declared_params(tree, local).into_iter().map(|p| p.display).collect(),
                        return_type: ret,
                        is_static: false,
                    });
                }
                // Own members, then members of outer types.
                for decl in tree.ancestors(invocation).filter(|&a| tree.kind(a).is_type_declaration()) {
                    let owner = self.declared_type(tree, decl)?;
                    if let Some(m) = self.bind_method(&owner, name, arg_count, None, &explicit) {
                        return Some(m);
                    }
                }
                None
            }
            NodeKind::MemberAccessExpression => {
                let (receiver, name_node) = syntax::member_access_parts(tree, function)?;
                let name = syntax::simple_name(tree, name_node);
                let explicit = self.method_type_args(tree, name_node);
                self.bind_on_receiver(tree, receiver, name, arg_count, &explicit, depth)
            }
            NodeKind::MemberBindingExpression => {
                let access = tree.nearest_ancestor(function, NodeKind::ConditionalAccessExpression)?;
                let receiver = tree
                    .child_by_field(access, "condition")
                    .or_else(|| tree.first_syntax_child(access))?;
                let name = syntax::simple_name(tree, function);
                self.bind_on_receiver(tree, receiver, name, arg_count, &[], depth)
            }
            NodeKind::ConditionalAccessExpression => {
                let receiver = tree
                    .child_by_field(function, "condition")
                    .or_else(|| tree.first_syntax_child(function))?;
                let binding = tree.last_syntax_child(function)?;
                let name = syntax::simple_name(tree, binding);
                self.bind_on_receiver(tree, receiver, name, arg_count, &[], depth)
            }
            _ => None,
        }
    }

    fn bind_on_receiver(
        &self,
        tree: &SyntaxTree,
        receiver: NodeId,
        name: &str,
        arg_count: usize,
        explicit: &[TypeHandle],
        depth: u8,
    ) -> Option<MethodHandle> {
        let (receiver_type, is_static) = self.receiver_type(tree, receiver, depth + 1)?;
        let TypeHandle::Named(owner) = &receiver_type else {
            return None;
        };
        let want_static = if is_static { Some(true) } else { None };
        self.bind_method(owner, name, arg_count, want_static, explicit)
            .or_else(|| self.bind_extension(&receiver_type, name, arg_count, explicit))
    }

    fn bind_method(
        &self,
        owner: &NamedType,
        name: &str,
        arg_count: usize,
        want_static: Option<bool>,
        explicit: &[TypeHandle],
    ) -> Option<MethodHandle> {
        let candidates: Vec<_> = self
            .lookup_members(owner, name)
            .into_iter()
            .filter(|(_, m, _)| m.kind == MemberKind::Method && !m.is_extension)
            .filter(|(_, m, _)| want_static.map_or(true, |s| m.is_static == s))
            .collect();
        let chosen = candidates
            .iter()
            .find(|(_, m, _)| m.params.len() == arg_count)
            .or_else(|| candidates.iter().find(|(_, m, _)| m.accepts_arity(arg_count)))
            .or_else(|| candidates.first())?;
        let (def, member, map) = chosen;
        Some(self.method_handle(def, member, map.clone(), explicit))
    }

    /// Extension methods declared in source static classes.
    fn bind_extension(
        &self,
        receiver: &TypeHandle,
        name: &str,
        arg_count: usize,
        explicit: &[TypeHandle],
    ) -> Option<MethodHandle> {
        let receiver_def = receiver.as_named().map(|n| (n.namespace.clone(), n.name.clone()));
        let supertypes = self.supertypes(receiver);
        let mut fallback = None;
        for def in self.defs.iter().filter(|d| d.is_static) {
            for member in def.members.iter().filter(|m| m.is_extension && m.name == name) {
                if !member.accepts_arity(arg_count) {
                    continue;
                }
                let target = member.params.first().and_then(|p| p.ty.as_ref());
                let matches = match target {
                    Some(TypeHandle::Named(t)) => {
                        receiver_def.as_ref().is_some_and(|(ns, n)| t.is(ns, n))
                            || supertypes.iter().any(|s| s.is(&t.namespace, &t.name))
                    }
                    _ => false,
                };
                if matches {
                    return Some(self.method_handle(def, member, FxHashMap::default(), explicit));
                }
                fallback.get_or_insert((def, member));
            }
        }
        fallback.map(|(def, member)| self.method_handle(def, member, FxHashMap::default(), explicit))
    }

    fn method_handle(
        &self,
        owner: &TypeDef,
        member: &MemberDef,
        mut map: FxHashMap<String, TypeHandle>,
        explicit: &[TypeHandle],
    ) -> MethodHandle {
        for (param, arg) in member.type_params.iter().zip(explicit) {
            map.insert(param.clone(), arg.clone());
        }
        MethodHandle {
            containing_display: owner.definition_display(),
            containing: owner.self_handle(),
            name: member.name.clone(),
            type_params: member.type_params.clone(),
            param_displays: member.params.iter().map(|p| p.display.clone()).collect(),
            return_type: member.ty.as_ref().map(|t| t.substitute(&map)),
            is_static: member.is_static,
        }
    }

    fn method_type_args(&self, tree: &SyntaxTree, name: NodeId) -> Vec<TypeHandle> {
        if tree.kind(name) != NodeKind::GenericName {
            return Vec::new();
        }
        let scope = scope_at(tree, name);
        self.type_arguments(tree, name, &scope)
    }

    fn local_function(&self, tree: &SyntaxTree, at: NodeId, name: &str) -> Option<NodeId> {
        let member = tree.nearest_ancestor_where(at, |k| {
            matches!(
                k,
                NodeKind::MethodDeclaration
                    | NodeKind::ConstructorDeclaration
                    | NodeKind::AccessorDeclaration
                    | NodeKind::PropertyDeclaration
            )
        })?;
        tree.descendants(member)
            .filter(|&n| tree.kind(n) == NodeKind::LocalFunctionStatement)
            .find(|&n| tree.name_of(n) == Some(name))
    }
}

fn substitution(params: &[String], args: &[TypeHandle]) -> FxHashMap<String, TypeHandle> {
    params.iter().cloned().zip(args.iter().cloned()).collect()
}

/// Strip whitespace from a name written across lines or with spaces.
fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_var(tree: &SyntaxTree, type_node: NodeId) -> bool {
    tree.kind(type_node) == NodeKind::ImplicitType
        || (tree.kind(type_node) == NodeKind::Identifier && tree.text(type_node) == "var")
}

/// Region in which a local declared by `declarator` is visible.
fn local_scope(tree: &SyntaxTree, declarator: NodeId) -> Option<NodeId> {
    let declaration = tree.parent(declarator)?;
    let holder = tree.parent(declaration)?;
    match tree.kind(holder) {
        NodeKind::LocalDeclarationStatement => tree.parent(holder),
        NodeKind::FieldDeclaration | NodeKind::EventFieldDeclaration => None,
        _ => Some(holder),
    }
}

/// Names of the type parameters declared directly on `decl`.
fn type_parameters(tree: &SyntaxTree, decl: NodeId) -> Vec<String> {
    tree.child_of_kind(decl, NodeKind::TypeParameterList)
        .map(|list| {
            tree.children_of_kind(list, NodeKind::TypeParameter)
                .filter_map(|p| {
                    tree.name_of(p)
                        .or_else(|| Some(tree.text(p)))
                        .map(|n| n.trim().to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

fn namespace_name(tree: &SyntaxTree, ns: NodeId) -> String {
    tree.child_by_field(ns, "name")
        .or_else(|| {
            tree.syntax_children(ns).find(|&c| {
                matches!(tree.kind(c), NodeKind::Identifier | NodeKind::QualifiedName)
            })
        })
        .map(|n| compact(tree.text(n)))
        .unwrap_or_default()
}

/// Full namespace enclosing `node`, including a file-scoped namespace.
fn namespace_of(tree: &SyntaxTree, node: NodeId) -> String {
    let mut parts: Vec<String> = tree
        .ancestors(node)
        .filter(|&a| tree.kind(a) == NodeKind::NamespaceDeclaration)
        .map(|a| namespace_name(tree, a))
        .collect();
    parts.reverse();
    if let Some(file_scoped) = tree.child_of_kind(tree.root(), NodeKind::FileScopedNamespace) {
        parts.insert(0, namespace_name(tree, file_scoped));
    }
    parts.retain(|p| !p.is_empty());
    parts.join(".")
}

/// Container name recorded for a declared type: the enclosing type's full
/// name for nested types, otherwise the namespace.
fn declared_namespace(tree: &SyntaxTree, decl: NodeId) -> String {
    let outer: Vec<NodeId> = tree
        .ancestors(decl)
        .filter(|&a| tree.kind(a).is_type_declaration())
        .collect();
    let mut container = namespace_of(tree, decl);
    for &outer_decl in outer.iter().rev() {
        let name = tree.name_of(outer_decl).unwrap_or("");
        container = if container.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", container, name)
        };
    }
    container
}

fn declared_skeleton(tree: &SyntaxTree, file: usize, node: NodeId) -> Option<TypeDef> {
    let kind = match tree.kind(node) {
        NodeKind::ClassDeclaration => TypeKind::Class,
        NodeKind::InterfaceDeclaration => TypeKind::Interface,
        NodeKind::StructDeclaration => TypeKind::Struct,
        NodeKind::RecordDeclaration => TypeKind::Record,
        NodeKind::EnumDeclaration => TypeKind::Enum,
        NodeKind::DelegateDeclaration => TypeKind::Delegate,
        _ => return None,
    };
    Some(TypeDef {
        namespace: declared_namespace(tree, node),
        name: tree.name_of(node)?.to_string(),
        kind,
        type_params: type_parameters(tree, node),
        bases: Vec::new(),
        members: Vec::new(),
        is_static: tree.has_modifier(node, "static"),
        origin: DefOrigin::Source { file, node },
    })
}

fn scope_at(tree: &SyntaxTree, node: NodeId) -> Scope {
    let mut scope = Scope::default();

    let namespace = namespace_of(tree, node);
    let mut current = namespace.as_str();
    loop {
        scope.namespaces.push(current.to_string());
        match current.rsplit_once('.') {
            Some((outer, _)) => current = outer,
            None if current.is_empty() => break,
            None => current = "",
        }
    }

    for decl in tree.ancestors(node).filter(|&a| tree.kind(a).is_type_declaration()) {
        let container = declared_namespace(tree, decl);
        let name = tree.name_of(decl).unwrap_or("");
        scope.enclosing_types.push(if container.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", container, name)
        });
    }

    for ancestor in tree.ancestors(node) {
        let kind = tree.kind(ancestor);
        if kind.is_type_declaration()
            || matches!(
                kind,
                NodeKind::MethodDeclaration | NodeKind::LocalFunctionStatement | NodeKind::DelegateDeclaration
            )
        {
            scope.type_params.extend(type_parameters(tree, ancestor));
        }
    }
    if tree.kind(node).is_type_declaration() || tree.kind(node) == NodeKind::MethodDeclaration {
        scope.type_params.extend(type_parameters(tree, node));
    }

    // Using directives of the file and of enclosing namespace bodies.
    let mut holders = vec![tree.root()];
    for ns in tree.ancestors(node).filter(|&a| tree.kind(a) == NodeKind::NamespaceDeclaration) {
        holders.push(ns);
        if let Some(body) = tree.child_of_kind(ns, NodeKind::DeclarationList) {
            holders.push(body);
        }
    }
    if let Some(file_scoped) = tree.child_of_kind(tree.root(), NodeKind::FileScopedNamespace) {
        holders.push(file_scoped);
    }
    for holder in holders {
        for using in tree.children_of_kind(holder, NodeKind::UsingDirective) {
            parse_using(tree.text(using), &mut scope);
        }
    }
    scope
}

fn parse_using(text: &str, scope: &mut Scope) {
    let text = text.trim();
    let text = text.strip_prefix("global").map(str::trim_start).unwrap_or(text);
    let Some(body) = text.strip_prefix("using") else {
        return;
    };
    let body = body.trim().trim_end_matches(';').trim();
    if body.starts_with("static ") {
        return;
    }
    match body.split_once('=') {
        Some((alias, target)) => scope
            .aliases
            .push((compact(alias), compact(target).trim_start_matches("global::").to_string())),
        None => scope.usings.push(compact(body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_csharp;
    use std::path::Path;

    fn parse(src: &str) -> SyntaxTree {
        parse_csharp(Path::new("Test.cs"), src).expect("parse")
    }

    fn model_for(tree: &SyntaxTree) -> SemanticModel {
        SemanticModel::build(std::slice::from_ref(tree), &[])
    }

    fn nth(tree: &SyntaxTree, kind: NodeKind, n: usize) -> NodeId {
        tree.nodes_of_kind(kind).nth(n).expect("node")
    }

    const PRELUDE: &str = "using System; using System.IO; using System.Collections.Generic;\n";

    #[test]
    fn test_resolves_framework_type_through_using() {
        let tree = parse(&format!("{}class A {{ Stream s; }}", PRELUDE));
        let model = model_for(&tree);
        let declarator = nth(&tree, NodeKind::VariableDeclarator, 0);
        let t = model.declarator_type(&tree, declarator).expect("type");
        assert!(t.is_named("System.IO", "Stream"));
    }

    #[test]
    fn test_source_type_implements_idisposable() {
        let tree = parse(&format!(
            "{}namespace Acme {{ class DisposeMe : IDisposable {{ public void Dispose() {{}} }} class User {{ DisposeMe d; }} }}",
            PRELUDE
        ));
        let model = model_for(&tree);
        let declarator = nth(&tree, NodeKind::VariableDeclarator, 0);
        let t = model.declarator_type(&tree, declarator).expect("type");
        assert!(t.is_named("Acme", "DisposeMe"));
        let interfaces = model.all_interfaces(&t);
        assert!(interfaces.iter().any(|i| i.is("System", "IDisposable")));
    }

    #[test]
    fn test_transitive_interfaces_through_base_class() {
        let model = SemanticModel::builtin_only();
        let t = TypeHandle::named("System.IO", "MemoryStream", vec![]);
        assert!(model.all_interfaces(&t).iter().any(|i| i.is("System", "IDisposable")));
    }

    #[test]
    fn test_generic_supertypes_are_substituted() {
        let model = SemanticModel::builtin_only();
        let stream = TypeHandle::named("System.IO", "Stream", vec![]);
        let list = TypeHandle::named("System.Collections.Generic", "List", vec![stream.clone()]);
        let enumerable = model
            .find_supertype(&list, "System.Collections.Generic", "IEnumerable")
            .expect("IEnumerable<T>");
        assert_eq!(enumerable.args, vec![stream.clone()]);
        assert_eq!(model.element_type(&list), Some(stream));
    }

    #[test]
    fn test_dictionary_element_is_value_type() {
        let model = SemanticModel::builtin_only();
        let stream = TypeHandle::named("System.IO", "Stream", vec![]);
        let dict = TypeHandle::named(
            "System.Collections.Generic",
            "Dictionary",
            vec![TypeHandle::Predefined("string".into()), stream.clone()],
        );
        assert_eq!(model.element_type(&dict), Some(stream));
    }

    #[test]
    fn test_var_is_inferred_from_initializer() {
        let tree = parse(&format!(
            "{}class A {{ void M() {{ var s = new MemoryStream(); var r = File.OpenRead(\"x\"); }} }}",
            PRELUDE
        ));
        let model = model_for(&tree);
        let first = model.declarator_type(&tree, nth(&tree, NodeKind::VariableDeclarator, 0));
        assert!(first.is_some_and(|t| t.is_named("System.IO", "MemoryStream")));
        let second = model.declarator_type(&tree, nth(&tree, NodeKind::VariableDeclarator, 1));
        assert!(second.is_some_and(|t| t.is_named("System.IO", "FileStream")));
    }

    #[test]
    fn test_method_display_for_list_remove_at() {
        let tree = parse(&format!(
            "{}class A {{ List<Stream> items; void M() {{ items.RemoveAt(0); }} }}",
            PRELUDE
        ));
        let model = model_for(&tree);
        let inv = nth(&tree, NodeKind::InvocationExpression, 0);
        let method = model.resolve_method(&tree, inv).expect("method");
        assert_eq!(
            method.original_definition_display(),
            "System.Collections.Generic.List<T>.RemoveAt(int)"
        );
    }

    #[test]
    fn test_source_method_return_type() {
        let tree = parse(&format!(
            "{}class A {{ Stream Create() {{ return null; }} void M() {{ Create().Dispose(); }} }}",
            PRELUDE
        ));
        let model = model_for(&tree);
        let create_call = tree
            .nodes_of_kind(NodeKind::InvocationExpression)
            .find(|&i| tree.text(i) == "Create()")
            .expect("call");
        let method = model.resolve_method(&tree, create_call).expect("method");
        assert!(method.return_type.as_ref().is_some_and(|t| t.is_named("System.IO", "Stream")));
        assert_eq!(method.original_definition_display(), "A.Create()");
    }

    #[test]
    fn test_generic_return_type_substitution() {
        let tree = parse(&format!(
            "{}class A {{ Dictionary<string, Stream> map; void M() {{ var s = map[\"k\"]; }} }}",
            PRELUDE
        ));
        let model = model_for(&tree);
        let t = model.declarator_type(&tree, nth(&tree, NodeKind::VariableDeclarator, 1));
        assert!(t.is_some_and(|t| t.is_named("System.IO", "Stream")));
    }

    #[test]
    fn test_types_resolve_across_files() {
        let a = parse("namespace Acme.Core { public class Handle : System.IDisposable { public void Dispose() {} } }");
        let b = parse("using Acme.Core; class User { Handle h; }");
        let model = SemanticModel::build(&[a, b], &[]);
        let b = parse("using Acme.Core; class User { Handle h; }");
        let t = model.declarator_type(&b, nth(&b, NodeKind::VariableDeclarator, 0)).expect("type");
        assert!(t.is_named("Acme.Core", "Handle"));
        assert!(model.all_interfaces(&t).iter().any(|i| i.is("System", "IDisposable")));
    }

    #[test]
    fn test_configured_disposable_type() {
        let extra = vec![TypeName { namespace: "Vendor".into(), name: "NativeHandle".into() }];
        let model = SemanticModel::build(&[], &extra);
        let t = TypeHandle::named("Vendor", "NativeHandle", vec![]);
        assert!(model.all_interfaces(&t).iter().any(|i| i.is("System", "IDisposable")));
    }

    #[test]
    fn test_nested_type_namespace() {
        let tree = parse("namespace N { class Outer { class Inner { } Inner field; } }");
        let model = model_for(&tree);
        let t = model.declarator_type(&tree, nth(&tree, NodeKind::VariableDeclarator, 0)).expect("type");
        assert!(t.is_named("N.Outer", "Inner"));
    }

    #[test]
    fn test_field_access_through_this() {
        let tree = parse(&format!(
            "{}class A {{ MemoryStream s; void M() {{ var x = this.s; }} }}",
            PRELUDE
        ));
        let model = model_for(&tree);
        let t = model.declarator_type(&tree, nth(&tree, NodeKind::VariableDeclarator, 1));
        assert!(t.is_some_and(|t| t.is_named("System.IO", "MemoryStream")));
    }
}
