//! C# source model: parsing, syntax navigation and semantic resolution.

pub mod builtins;
pub mod csharp;
pub mod semantic;
pub mod syntax;
pub mod tree;
pub mod types;

pub use csharp::parse_csharp;
pub use semantic::SemanticModel;
pub use tree::{Comment, Node, NodeId, NodeKind, Span, SyntaxTree};
pub use types::{
    DefOrigin, MemberDef, MemberKind, MethodHandle, NamedType, ParamDef, TypeDef, TypeHandle,
    TypeKind, TypeName,
};
