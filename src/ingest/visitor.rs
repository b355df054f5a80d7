//! Fragment-to-graph mapping
//!
//! Consumers dispatch every fragment to an injected [`IngestVisitor`].
//! The provided [`GraphMapper`] turns fragments into write-layer calls:
//! nodes for terms, edges for logical axioms, merged properties for
//! annotations, with mapped-property aliases applied as configured.

use super::work::Fragment;
use crate::config::MappedProperty;
use crate::graph::{GraphError, NodeId, PropertyValue};
use crate::ontology::vocab::{self, local_name};
use crate::ontology::{AnnotationValue, Axiom, TermRef};
use crate::writer::GraphWriter;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Property accumulating the ontology IRIs that contributed an entity
pub const SOURCES_PROPERTY: &str = "sources";

/// A recoverable per-item failure
#[derive(Error, Debug)]
pub enum VisitError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("malformed item: {0}")]
    Malformed(String),
}

/// Applies one fragment to the graph. Implementations must be safe to
/// call from every consumer thread at once.
pub trait IngestVisitor: Send + Sync {
    fn visit(&self, ontology: &str, fragment: &Fragment) -> Result<(), VisitError>;
}

/// The standard fragment mapper
pub struct GraphMapper {
    writer: Arc<GraphWriter>,

    /// Source property name or IRI -> output property names
    property_aliases: HashMap<String, Vec<String>>,
}

impl GraphMapper {
    pub fn new(writer: Arc<GraphWriter>, mapped_properties: &[MappedProperty]) -> Self {
        let mut property_aliases: HashMap<String, Vec<String>> = HashMap::new();
        for mapped in mapped_properties {
            for source in &mapped.sources {
                property_aliases
                    .entry(source.clone())
                    .or_default()
                    .push(mapped.name.clone());
            }
        }
        GraphMapper {
            writer,
            property_aliases,
        }
    }

    /// External key of a term: the IRI itself, or the scoped blank id
    fn term_key(term: &TermRef) -> String {
        match term {
            TermRef::Iri(iri) => iri.clone(),
            TermRef::Blank(id) => format!("_:{}", id),
        }
    }

    fn node_for(&self, term: &TermRef, ontology: &str) -> Result<NodeId, VisitError> {
        let id = self.writer.get_or_create_node(&Self::term_key(term));
        self.writer.add_property(id, SOURCES_PROPERTY, ontology)?;
        Ok(id)
    }

    fn relate(
        &self,
        start: NodeId,
        end: NodeId,
        rel_type: &str,
        ontology: &str,
    ) -> Result<(), VisitError> {
        let edge = self.writer.create_relationship(start, end, rel_type)?;
        self.writer.add_property(edge, SOURCES_PROPERTY, ontology)?;
        Ok(())
    }

    fn visit_header(
        &self,
        ontology: &str,
        iri: &str,
        version_iri: Option<&str>,
        imports: &[String],
    ) -> Result<(), VisitError> {
        let node = self.node_for(&TermRef::iri(iri), ontology)?;
        self.writer.add_label(node, "ontology")?;

        if let Some(version) = version_iri {
            let version_node = self.node_for(&TermRef::iri(version), ontology)?;
            self.relate(node, version_node, "versionIRI", ontology)?;
        }
        for import in imports {
            let imported = self.node_for(&TermRef::iri(import.clone()), ontology)?;
            self.relate(node, imported, "imports", ontology)?;
        }
        Ok(())
    }

    fn visit_axiom(&self, ontology: &str, axiom: &Axiom) -> Result<(), VisitError> {
        match axiom {
            Axiom::SubClassOf { sub, sup } => {
                let sub = self.node_for(sub, ontology)?;
                let sup = self.node_for(sup, ontology)?;
                self.relate(sub, sup, "subClassOf", ontology)
            }
            Axiom::EquivalentClasses { a, b } => {
                let a = self.node_for(a, ontology)?;
                let b = self.node_for(b, ontology)?;
                self.relate(a, b, "equivalentClass", ontology)
            }
            Axiom::DisjointClasses { a, b } => {
                let a = self.node_for(a, ontology)?;
                let b = self.node_for(b, ontology)?;
                self.relate(a, b, "disjointWith", ontology)
            }
            Axiom::AllDisjoint { members } => {
                let nodes: Vec<NodeId> = members
                    .iter()
                    .map(|m| self.node_for(m, ontology))
                    .collect::<Result<_, _>>()?;
                for edge in self
                    .writer
                    .create_relationships_pairwise(&nodes, "disjointWith")?
                {
                    self.writer.add_property(edge, SOURCES_PROPERTY, ontology)?;
                }
                Ok(())
            }
            Axiom::SubPropertyOf { sub, sup } => {
                let sub = self.node_for(&TermRef::iri(sub.clone()), ontology)?;
                let sup = self.node_for(&TermRef::iri(sup.clone()), ontology)?;
                self.relate(sub, sup, "subPropertyOf", ontology)
            }
            Axiom::SameAs { a, b } => {
                let a = self.node_for(a, ontology)?;
                let b = self.node_for(b, ontology)?;
                self.relate(a, b, "sameAs", ontology)
            }
            Axiom::ClassAssertion { individual, class } => {
                let individual = self.node_for(individual, ontology)?;
                let class = self.node_for(class, ontology)?;
                self.relate(individual, class, "type", ontology)
            }
            Axiom::PropertyAssertion {
                subject,
                predicate,
                object,
            } => {
                let subject = self.node_for(subject, ontology)?;
                let object = self.node_for(object, ontology)?;
                self.relate(subject, object, local_name(predicate), ontology)
            }
            Axiom::AnnotationAssertion {
                subject,
                predicate,
                value,
            } => self.visit_annotation(ontology, subject, predicate, value),
        }
    }

    fn visit_annotation(
        &self,
        ontology: &str,
        subject: &TermRef,
        predicate: &str,
        value: &AnnotationValue,
    ) -> Result<(), VisitError> {
        let node = self.node_for(subject, ontology)?;
        match value {
            AnnotationValue::Iri(target) => {
                // IRI-valued annotations become relationships
                let target = self.node_for(&TermRef::iri(target.clone()), ontology)?;
                self.relate(node, target, local_name(predicate), ontology)
            }
            AnnotationValue::Literal {
                value,
                datatype,
                language: _,
            } => {
                let property = literal_to_property(value, datatype.as_deref());
                let name = local_name(predicate).to_string();
                self.writer.add_property(node, &name, property.clone())?;

                for output in self.alias_targets(predicate, &name) {
                    self.writer.add_property(node, output, property.clone())?;
                }
                Ok(())
            }
        }
    }

    /// Output names a source annotation property feeds, matched by full
    /// IRI or local name
    fn alias_targets<'a>(&'a self, predicate: &str, name: &str) -> Vec<&'a str> {
        let mut targets = Vec::new();
        if let Some(outputs) = self.property_aliases.get(predicate) {
            targets.extend(outputs.iter().map(|s| s.as_str()));
        }
        if predicate != name {
            if let Some(outputs) = self.property_aliases.get(name) {
                targets.extend(outputs.iter().map(|s| s.as_str()));
            }
        }
        targets
    }
}

impl IngestVisitor for GraphMapper {
    fn visit(&self, ontology: &str, fragment: &Fragment) -> Result<(), VisitError> {
        match fragment {
            Fragment::Header {
                iri,
                version_iri,
                imports,
            } => self.visit_header(ontology, iri, version_iri.as_deref(), imports),
            Fragment::Expression(expression) => {
                let node = self.node_for(&TermRef::blank(expression.id.clone()), ontology)?;
                for (predicate, target) in &expression.links {
                    let target = self.node_for(target, ontology)?;
                    let rel = if predicate == vocab::RDF_TYPE {
                        "type"
                    } else {
                        local_name(predicate)
                    };
                    self.relate(node, target, rel, ontology)?;
                }
                Ok(())
            }
            Fragment::Declaration(declaration) => {
                let node =
                    self.node_for(&TermRef::iri(declaration.iri.clone()), ontology)?;
                self.writer.add_label(node, declaration.kind.label())?;
                Ok(())
            }
            Fragment::Axiom(axiom) => self.visit_axiom(ontology, axiom),
        }
    }
}

/// Convert a typed literal to a property value using its XSD datatype
fn literal_to_property(value: &str, datatype: Option<&str>) -> PropertyValue {
    match datatype.map(local_name) {
        Some("integer") | Some("int") | Some("long") | Some("short") | Some("nonNegativeInteger") => {
            value
                .parse::<i64>()
                .map(PropertyValue::Integer)
                .unwrap_or_else(|_| PropertyValue::from(value))
        }
        Some("float") | Some("double") | Some("decimal") => value
            .parse::<f64>()
            .map(PropertyValue::Float)
            .unwrap_or_else(|_| PropertyValue::from(value)),
        Some("boolean") => value
            .parse::<bool>()
            .map(PropertyValue::Boolean)
            .unwrap_or_else(|_| PropertyValue::from(value)),
        _ => PropertyValue::from(value),
    }
}
