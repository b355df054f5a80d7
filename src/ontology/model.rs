//! Ontology document model
//!
//! A parsed source is decomposed into a flat document: header, signature
//! declarations, anonymous class expressions and axioms. Item kinds form
//! a closed tagged union; the consumer side dispatches with a single
//! `match` instead of an open visitor hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a node-shaped ontology term: a named IRI or a
/// document-scoped blank node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermRef {
    Iri(String),
    Blank(String),
}

impl TermRef {
    pub fn iri(iri: impl Into<String>) -> Self {
        TermRef::Iri(iri.into())
    }

    pub fn blank(id: impl Into<String>) -> Self {
        TermRef::Blank(id.into())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, TermRef::Blank(_))
    }
}

impl fmt::Display for TermRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermRef::Iri(iri) => write!(f, "<{}>", iri),
            TermRef::Blank(id) => write!(f, "_:{}", id),
        }
    }
}

/// Kind of a declared signature entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Class,
    ObjectProperty,
    DataProperty,
    AnnotationProperty,
    NamedIndividual,
    Datatype,
}

impl EntityKind {
    /// Label applied to nodes of this kind
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Class => "class",
            EntityKind::ObjectProperty => "objectProperty",
            EntityKind::DataProperty => "dataProperty",
            EntityKind::AnnotationProperty => "annotationProperty",
            EntityKind::NamedIndividual => "individual",
            EntityKind::Datatype => "datatype",
        }
    }
}

/// A declared entity in the ontology signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: EntityKind,
    pub iri: String,
}

/// Value of an annotation: a literal (with optional datatype or language
/// tag) or an IRI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationValue {
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
    Iri(String),
}

impl AnnotationValue {
    pub fn literal(value: impl Into<String>) -> Self {
        AnnotationValue::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }
}

/// One annotation: predicate plus value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub predicate: String,
    pub value: AnnotationValue,
}

/// An anonymous class expression: a blank node plus its outgoing links
/// (restriction targets, property references, operand lists already
/// flattened)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassExpression {
    /// Blank node id, document-scoped
    pub id: String,

    /// Outgoing links: predicate IRI -> term
    pub links: Vec<(String, TermRef)>,
}

/// A logical or annotation axiom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Axiom {
    SubClassOf {
        sub: TermRef,
        sup: TermRef,
    },
    EquivalentClasses {
        a: TermRef,
        b: TermRef,
    },
    DisjointClasses {
        a: TermRef,
        b: TermRef,
    },
    /// n-ary disjointness (owl:AllDisjointClasses); expands pairwise
    AllDisjoint {
        members: Vec<TermRef>,
    },
    SubPropertyOf {
        sub: String,
        sup: String,
    },
    SameAs {
        a: TermRef,
        b: TermRef,
    },
    ClassAssertion {
        individual: TermRef,
        class: TermRef,
    },
    PropertyAssertion {
        subject: TermRef,
        predicate: String,
        object: TermRef,
    },
    AnnotationAssertion {
        subject: TermRef,
        predicate: String,
        value: AnnotationValue,
    },
}

/// A fully parsed ontology document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ontology {
    /// Ontology IRI; a synthetic identifier when the document declares
    /// none
    pub iri: String,

    /// Whether the document carried an explicit `owl:Ontology` header.
    /// Undeclared documents contribute no structure node.
    pub declared: bool,

    /// Version IRI, if declared
    pub version_iri: Option<String>,

    /// Imported ontology IRIs
    pub imports: Vec<String>,

    /// Ontology-level annotations
    pub annotations: Vec<Annotation>,

    /// Signature declarations
    pub declarations: Vec<Declaration>,

    /// Anonymous class expressions
    pub expressions: Vec<ClassExpression>,

    /// Logical and annotation axioms
    pub axioms: Vec<Axiom>,
}

impl Ontology {
    pub fn new(iri: impl Into<String>) -> Self {
        Ontology {
            iri: iri.into(),
            declared: true,
            ..Default::default()
        }
    }

    /// Total number of work items this document decomposes into: the
    /// header (when declared), then expressions, declarations, axioms
    /// and ontology annotations.
    pub fn item_count(&self) -> usize {
        usize::from(self.declared)
            + self.expressions.len()
            + self.declarations.len()
            + self.axioms.len()
            + self.annotations.len()
    }
}
