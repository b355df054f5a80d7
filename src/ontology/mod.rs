//! Ontology document model, parsing and source loading

pub mod model;
pub mod parser;
pub mod reasoner;
pub mod source;
pub mod vocab;

pub use model::{
    Annotation, AnnotationValue, Axiom, ClassExpression, Declaration, EntityKind, Ontology,
    TermRef,
};
pub use parser::{parse_document, RdfFormat};
pub use reasoner::{reasoner_for, Reasoner, ReasonerKind};
pub use source::load_ontology;

use thiserror::Error;

/// Source-level errors: a document fails to fetch or parse
#[derive(Error, Debug)]
pub enum OntologyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("parse error: {0}")]
    Parse(String),
}
