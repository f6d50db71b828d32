//! Type descriptors: the recursive shape vocabulary for parameters and returns.
//!
//! The wire form is the question envelope's `{"type": ..., "type_children": ...}`.
//! In memory a descriptor is a closed [`Kind`] plus an optional element
//! descriptor; constructors enforce that composites carry a child and scalars
//! do not.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{CodecError, CodecResult};

/// Scalar payload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Integer,
    Double,
    String,
    Boolean,
}

/// Every shape a descriptor can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Scalar(ScalarKind),
    Array,
    Matrix,
    BinaryTree,
    LinkedList,
    Graph,
}

impl Kind {
    pub const INTEGER: Kind = Kind::Scalar(ScalarKind::Integer);

    /// Parse a wire type name. Accepts the question store's names and the
    /// descriptive aliases (`BinaryTree`, `LinkedList`, `GraphNode`).
    pub fn parse(name: &str) -> CodecResult<Self> {
        let kind = match name {
            "Integer" => Kind::Scalar(ScalarKind::Integer),
            "Double" => Kind::Scalar(ScalarKind::Double),
            "String" => Kind::Scalar(ScalarKind::String),
            "Boolean" => Kind::Scalar(ScalarKind::Boolean),
            "Array" => Kind::Array,
            "Matrix" => Kind::Matrix,
            "TreeNode" | "BinaryTree" => Kind::BinaryTree,
            "ListNode" | "LinkedList" => Kind::LinkedList,
            "Graph" | "GraphNode" => Kind::Graph,
            other => return Err(CodecError::UnsupportedType(other.to_string())),
        };
        Ok(kind)
    }

    /// Canonical wire name.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Scalar(ScalarKind::Integer) => "Integer",
            Kind::Scalar(ScalarKind::Double) => "Double",
            Kind::Scalar(ScalarKind::String) => "String",
            Kind::Scalar(ScalarKind::Boolean) => "Boolean",
            Kind::Array => "Array",
            Kind::Matrix => "Matrix",
            Kind::BinaryTree => "TreeNode",
            Kind::LinkedList => "ListNode",
            Kind::Graph => "Graph",
        }
    }

    pub fn is_scalar(self) -> bool {
        matches!(self, Kind::Scalar(_))
    }

    /// Representation a candidate callable receives for this kind.
    pub fn runtime_kind(self) -> RuntimeKind {
        match self {
            Kind::Scalar(ScalarKind::Integer) => RuntimeKind::Integer,
            Kind::Scalar(ScalarKind::Double) => RuntimeKind::Double,
            Kind::Scalar(ScalarKind::String) => RuntimeKind::String,
            Kind::Scalar(ScalarKind::Boolean) => RuntimeKind::Boolean,
            Kind::Array | Kind::Matrix => RuntimeKind::List,
            Kind::BinaryTree => RuntimeKind::BinaryTree,
            Kind::LinkedList => RuntimeKind::LinkedList,
            Kind::Graph => RuntimeKind::Graph,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime representation used when matching a callable's parameter list.
///
/// Arrays and matrices share the sequence representation, so two callables
/// differing only in `Array` vs `Matrix` parameters are indistinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeKind {
    Integer,
    Double,
    String,
    Boolean,
    List,
    #[serde(rename = "TreeNode")]
    BinaryTree,
    #[serde(rename = "ListNode")]
    LinkedList,
    Graph,
}

/// Recursive description of a value's shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor", into = "RawDescriptor")]
pub struct TypeDescriptor {
    kind: Kind,
    child: Option<Box<TypeDescriptor>>,
}

impl TypeDescriptor {
    /// Build a descriptor, checking that `child` is present exactly when
    /// `kind` is a composite.
    pub fn new(kind: Kind, child: Option<TypeDescriptor>) -> CodecResult<Self> {
        match (kind.is_scalar(), &child) {
            (true, Some(_)) => Err(CodecError::UnexpectedChildType(kind.name().to_string())),
            (false, None) => Err(CodecError::MissingChildType(kind.name().to_string())),
            _ => Ok(Self {
                kind,
                child: child.map(Box::new),
            }),
        }
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        Self {
            kind: Kind::Scalar(kind),
            child: None,
        }
    }

    pub fn integer() -> Self {
        Self::scalar(ScalarKind::Integer)
    }

    pub fn double() -> Self {
        Self::scalar(ScalarKind::Double)
    }

    pub fn string() -> Self {
        Self::scalar(ScalarKind::String)
    }

    pub fn boolean() -> Self {
        Self::scalar(ScalarKind::Boolean)
    }

    pub fn array(child: TypeDescriptor) -> Self {
        Self::composite(Kind::Array, child)
    }

    pub fn matrix(child: TypeDescriptor) -> Self {
        Self::composite(Kind::Matrix, child)
    }

    pub fn binary_tree(child: TypeDescriptor) -> Self {
        Self::composite(Kind::BinaryTree, child)
    }

    pub fn linked_list(child: TypeDescriptor) -> Self {
        Self::composite(Kind::LinkedList, child)
    }

    pub fn graph(child: TypeDescriptor) -> Self {
        Self::composite(Kind::Graph, child)
    }

    fn composite(kind: Kind, child: TypeDescriptor) -> Self {
        Self {
            kind,
            child: Some(Box::new(child)),
        }
    }

    pub fn resolved_kind(&self) -> Kind {
        self.kind
    }

    pub fn runtime_kind(&self) -> RuntimeKind {
        self.kind.runtime_kind()
    }

    pub fn child(&self) -> Option<&TypeDescriptor> {
        self.child.as_deref()
    }

    /// Element descriptor of a composite.
    pub fn element(&self) -> CodecResult<&TypeDescriptor> {
        self.child()
            .ok_or_else(|| CodecError::MissingChildType(self.kind.name().to_string()))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.child {
            Some(child) => write!(f, "{}<{}>", self.kind, child),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Envelope form of a descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDescriptor {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    type_children: Option<Box<RawDescriptor>>,
}

impl TryFrom<RawDescriptor> for TypeDescriptor {
    type Error = CodecError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        let kind = Kind::parse(&raw.type_name)?;
        let child = raw
            .type_children
            .map(|child| TypeDescriptor::try_from(*child))
            .transpose()?;
        TypeDescriptor::new(kind, child)
    }
}

impl From<TypeDescriptor> for RawDescriptor {
    fn from(descriptor: TypeDescriptor) -> Self {
        RawDescriptor {
            type_name: descriptor.kind.name().to_string(),
            type_children: descriptor
                .child
                .map(|child| Box::new(RawDescriptor::from(*child))),
        }
    }
}
