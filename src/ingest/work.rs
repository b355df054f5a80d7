//! Units of ingestion work
//!
//! A parsed ontology decomposes into a fixed sequence of fragments:
//! the structure header first, then every anonymous class expression,
//! then every signature declaration, then every axiom, with
//! annotation-assertion axioms synthesized for ontology-level
//! annotations at the end. Each fragment travels the shared queue tagged
//! with its owning ontology IRI and is consumed exactly once.

use crate::ontology::vocab::curie;
use crate::ontology::{Axiom, ClassExpression, Declaration, Ontology, TermRef};
use std::sync::Arc;

/// One element of the shared work queue
#[derive(Debug, Clone, PartialEq)]
pub enum WorkItem {
    /// A decomposed ontology fragment
    Fragment {
        /// Owning ontology IRI
        ontology: Arc<str>,
        fragment: Fragment,
    },

    /// Sentinel: no more work will be produced; the receiving consumer
    /// terminates
    PoisonPill,
}

/// The closed set of fragment shapes
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Ontology structure: its node, version and import edges
    Header {
        iri: String,
        version_iri: Option<String>,
        imports: Vec<String>,
    },

    /// An anonymous class expression
    Expression(ClassExpression),

    /// A signature declaration
    Declaration(Declaration),

    /// A logical or annotation axiom
    Axiom(Axiom),
}

impl Fragment {
    /// Short description used when logging a failed item
    pub fn describe(&self) -> String {
        match self {
            Fragment::Header { iri, .. } => format!("header <{}>", iri),
            Fragment::Expression(expr) => format!("expression _:{}", expr.id),
            Fragment::Declaration(decl) => format!("declaration {}", curie(&decl.iri)),
            Fragment::Axiom(axiom) => {
                let kind = match axiom {
                    Axiom::SubClassOf { .. } => "SubClassOf",
                    Axiom::EquivalentClasses { .. } => "EquivalentClasses",
                    Axiom::DisjointClasses { .. } => "DisjointClasses",
                    Axiom::AllDisjoint { .. } => "AllDisjoint",
                    Axiom::SubPropertyOf { .. } => "SubPropertyOf",
                    Axiom::SameAs { .. } => "SameAs",
                    Axiom::ClassAssertion { .. } => "ClassAssertion",
                    Axiom::PropertyAssertion { .. } => "PropertyAssertion",
                    Axiom::AnnotationAssertion { .. } => "AnnotationAssertion",
                };
                format!("axiom {}", kind)
            }
        }
    }
}

/// Decompose a parsed document into work items, in the fixed
/// per-producer order.
pub fn decompose(ontology: Ontology) -> Vec<WorkItem> {
    let tag: Arc<str> = Arc::from(ontology.iri.as_str());
    let mut items = Vec::with_capacity(ontology.item_count());

    if ontology.declared {
        items.push(WorkItem::Fragment {
            ontology: Arc::clone(&tag),
            fragment: Fragment::Header {
                iri: ontology.iri.clone(),
                version_iri: ontology.version_iri,
                imports: ontology.imports,
            },
        });
    }

    for expression in ontology.expressions {
        items.push(WorkItem::Fragment {
            ontology: Arc::clone(&tag),
            fragment: Fragment::Expression(expression),
        });
    }

    for declaration in ontology.declarations {
        items.push(WorkItem::Fragment {
            ontology: Arc::clone(&tag),
            fragment: Fragment::Declaration(declaration),
        });
    }

    for axiom in ontology.axioms {
        items.push(WorkItem::Fragment {
            ontology: Arc::clone(&tag),
            fragment: Fragment::Axiom(axiom),
        });
    }

    // ontology-level annotations become annotation assertions on the
    // ontology node
    let iri = ontology.iri;
    for annotation in ontology.annotations {
        items.push(WorkItem::Fragment {
            ontology: Arc::clone(&tag),
            fragment: Fragment::Axiom(Axiom::AnnotationAssertion {
                subject: TermRef::iri(iri.clone()),
                predicate: annotation.predicate,
                value: annotation.value,
            }),
        });
    }

    items
}
