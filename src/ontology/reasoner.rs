//! Reasoning hook run by a producer before decomposition
//!
//! A reasoner rewrites the parsed document, typically adding inferred
//! axioms. The built-in closure reasoner materializes the transitive
//! closure of `SubClassOf` over named classes; heavier reasoners plug in
//! through the same trait.

use super::model::{Axiom, Ontology, TermRef};
use super::OntologyError;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Reasoner selection in the session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonerKind {
    #[default]
    None,
    SubclassClosure,
}

/// Rewrites an ontology before decomposition
pub trait Reasoner: Send + Sync {
    fn name(&self) -> &'static str;

    fn reason(&self, ontology: Ontology) -> Result<Ontology, OntologyError>;
}

/// Passes the document through untouched
pub struct NoopReasoner;

impl Reasoner for NoopReasoner {
    fn name(&self) -> &'static str {
        "none"
    }

    fn reason(&self, ontology: Ontology) -> Result<Ontology, OntologyError> {
        Ok(ontology)
    }
}

/// Materializes the transitive closure of `SubClassOf` between named
/// classes
pub struct SubclassClosureReasoner;

impl Reasoner for SubclassClosureReasoner {
    fn name(&self) -> &'static str {
        "subclass-closure"
    }

    fn reason(&self, mut ontology: Ontology) -> Result<Ontology, OntologyError> {
        let mut parents: HashMap<String, Vec<String>> = HashMap::new();
        let mut existing: FxHashSet<(String, String)> = FxHashSet::default();
        for axiom in &ontology.axioms {
            if let Axiom::SubClassOf {
                sub: TermRef::Iri(sub),
                sup: TermRef::Iri(sup),
            } = axiom
            {
                parents.entry(sub.clone()).or_default().push(sup.clone());
                existing.insert((sub.clone(), sup.clone()));
            }
        }

        let mut inferred = Vec::new();
        for sub in parents.keys() {
            // depth-first walk of ancestors, cycle-guarded
            let mut stack: Vec<&String> = parents[sub].iter().collect();
            let mut seen: FxHashSet<&String> = FxHashSet::default();
            while let Some(ancestor) = stack.pop() {
                if !seen.insert(ancestor) {
                    continue;
                }
                if ancestor != sub && !existing.contains(&(sub.clone(), ancestor.clone())) {
                    inferred.push(Axiom::SubClassOf {
                        sub: TermRef::iri(sub.clone()),
                        sup: TermRef::iri(ancestor.clone()),
                    });
                }
                if let Some(grandparents) = parents.get(ancestor) {
                    stack.extend(grandparents.iter());
                }
            }
        }

        if !inferred.is_empty() {
            debug!(
                ontology = %ontology.iri,
                inferred = inferred.len(),
                "materialized subclass closure"
            );
        }
        ontology.axioms.extend(inferred);
        Ok(ontology)
    }
}

/// Reasoner instance for a configured kind
pub fn reasoner_for(kind: ReasonerKind) -> Box<dyn Reasoner> {
    match kind {
        ReasonerKind::None => Box::new(NoopReasoner),
        ReasonerKind::SubclassClosure => Box::new(SubclassClosureReasoner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub_class_of(sub: &str, sup: &str) -> Axiom {
        Axiom::SubClassOf {
            sub: TermRef::iri(sub),
            sup: TermRef::iri(sup),
        }
    }

    #[test]
    fn test_closure_materializes_grandparents() {
        let mut ontology = Ontology::new("http://example.org/o");
        ontology.axioms.push(sub_class_of("a", "b"));
        ontology.axioms.push(sub_class_of("b", "c"));
        ontology.axioms.push(sub_class_of("c", "d"));

        let reasoned = SubclassClosureReasoner.reason(ontology).unwrap();
        assert!(reasoned.axioms.contains(&sub_class_of("a", "c")));
        assert!(reasoned.axioms.contains(&sub_class_of("a", "d")));
        assert!(reasoned.axioms.contains(&sub_class_of("b", "d")));
        assert_eq!(reasoned.axioms.len(), 6);
    }

    #[test]
    fn test_closure_survives_cycles() {
        let mut ontology = Ontology::new("http://example.org/o");
        ontology.axioms.push(sub_class_of("a", "b"));
        ontology.axioms.push(sub_class_of("b", "a"));

        let reasoned = SubclassClosureReasoner.reason(ontology).unwrap();
        // no self-loops are inferred
        assert!(!reasoned.axioms.contains(&sub_class_of("a", "a")));
        assert!(!reasoned.axioms.contains(&sub_class_of("b", "b")));
    }

    #[test]
    fn test_noop_is_identity() {
        let mut ontology = Ontology::new("http://example.org/o");
        ontology.axioms.push(sub_class_of("a", "b"));
        let reasoned = NoopReasoner.reason(ontology.clone()).unwrap();
        assert_eq!(reasoned, ontology);
    }
}
