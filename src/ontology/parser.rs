//! RDF-level ontology parsing
//!
//! Parses a Turtle, N-Triples or RDF/XML document with the `rio` parser
//! stack and assembles the triples into an [`Ontology`] document: header,
//! signature declarations, anonymous class expressions and axioms.
//! RDF collection cells (`rdf:first`/`rdf:rest`) are flattened into their
//! owning expression or n-ary axiom.

use super::model::{
    Annotation, AnnotationValue, Axiom, ClassExpression, Declaration, EntityKind, Ontology,
    TermRef,
};
use super::vocab::*;
use super::OntologyError;
use rio_api::parser::TriplesParser;
use rio_turtle::{NTriplesParser, TurtleParser};
use rio_xml::RdfXmlParser;
use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufReader, Cursor};

/// Supported serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    Turtle,
    NTriples,
    RdfXml,
}

impl RdfFormat {
    /// Pick a format from a location's extension; unknown extensions
    /// default to Turtle.
    pub fn from_location(location: &str) -> Self {
        let lower = location.to_lowercase();
        if lower.ends_with(".nt") {
            RdfFormat::NTriples
        } else if lower.ends_with(".owl") || lower.ends_with(".rdf") || lower.ends_with(".xml") {
            RdfFormat::RdfXml
        } else {
            RdfFormat::Turtle
        }
    }
}

/// Parse one document into an [`Ontology`].
///
/// `default_iri` identifies the ontology when the document declares no
/// `owl:Ontology` header; `scope` namespaces blank node ids so blanks
/// from different documents never collide.
pub fn parse_document(
    content: &str,
    format: RdfFormat,
    default_iri: &str,
    scope: &str,
) -> Result<Ontology, OntologyError> {
    let mut collector = Collector::new(scope);

    // relative IRIs resolve against the document location; plain file
    // paths are promoted to file:// IRIs
    let base = oxiri::Iri::parse(default_iri.to_string())
        .or_else(|_| oxiri::Iri::parse(format!("file://{}", default_iri)))
        .ok();

    let reader = BufReader::new(Cursor::new(content));
    match format {
        RdfFormat::Turtle => {
            let mut parser = TurtleParser::new(reader, base);
            parser
                .parse_all(&mut |t| -> Result<(), rio_turtle::TurtleError> {
                    collector.add(t);
                    Ok(())
                })
                .map_err(|e| OntologyError::Parse(e.to_string()))?;
        }
        RdfFormat::NTriples => {
            let mut parser = NTriplesParser::new(reader);
            parser
                .parse_all(&mut |t| -> Result<(), rio_turtle::TurtleError> {
                    collector.add(t);
                    Ok(())
                })
                .map_err(|e| OntologyError::Parse(e.to_string()))?;
        }
        RdfFormat::RdfXml => {
            let mut parser = RdfXmlParser::new(reader, base);
            parser
                .parse_all(&mut |t| -> Result<(), rio_xml::RdfXmlError> {
                    collector.add(t);
                    Ok(())
                })
                .map_err(|e| OntologyError::Parse(e.to_string()))?;
        }
    }

    Ok(collector.finish(default_iri))
}

/// Object position of a collected triple
enum Object {
    Term(TermRef),
    Literal(AnnotationValue),
}

/// Accumulates triples and assembles the document at the end
struct Collector {
    scope: String,
    ontology_iri: Option<String>,
    version_iri: Option<String>,
    imports: Vec<String>,
    declarations: Vec<Declaration>,
    /// Blank node id -> outgoing links
    blank_links: BTreeMap<String, Vec<(String, TermRef)>>,
    /// RDF collection cells
    list_first: HashMap<String, TermRef>,
    list_rest: HashMap<String, Option<String>>,
    /// (subject, predicate, list head) for operand lists
    list_links: Vec<(TermRef, String, String)>,
    /// Blank subjects typed owl:AllDisjointClasses
    all_disjoint: FxHashSet<String>,
    /// (subject, list head) from owl:members / owl:distinctMembers
    members_links: Vec<(String, String)>,
    /// Literal-valued triples, split at finish into ontology annotations
    /// and annotation assertions
    literals: Vec<(TermRef, String, AnnotationValue)>,
    axioms: Vec<Axiom>,
}

impl Collector {
    fn new(scope: &str) -> Self {
        Collector {
            scope: scope.to_string(),
            ontology_iri: None,
            version_iri: None,
            imports: Vec::new(),
            declarations: Vec::new(),
            blank_links: BTreeMap::new(),
            list_first: HashMap::new(),
            list_rest: HashMap::new(),
            list_links: Vec::new(),
            all_disjoint: FxHashSet::default(),
            members_links: Vec::new(),
            literals: Vec::new(),
            axioms: Vec::new(),
        }
    }

    fn blank_id(&self, raw: &str) -> String {
        if self.scope.is_empty() {
            raw.to_string()
        } else {
            format!("{}~{}", self.scope, raw)
        }
    }

    fn subject(&self, s: rio_api::model::Subject<'_>) -> Option<TermRef> {
        match s {
            rio_api::model::Subject::NamedNode(n) => Some(TermRef::iri(n.iri)),
            rio_api::model::Subject::BlankNode(b) => Some(TermRef::blank(self.blank_id(b.id))),
            _ => None, // RDF-star subjects are out of scope
        }
    }

    fn object(&self, o: rio_api::model::Term<'_>) -> Option<Object> {
        match o {
            rio_api::model::Term::NamedNode(n) => Some(Object::Term(TermRef::iri(n.iri))),
            rio_api::model::Term::BlankNode(b) => {
                Some(Object::Term(TermRef::blank(self.blank_id(b.id))))
            }
            rio_api::model::Term::Literal(l) => Some(Object::Literal(match l {
                rio_api::model::Literal::Simple { value } => AnnotationValue::Literal {
                    value: value.to_string(),
                    datatype: None,
                    language: None,
                },
                rio_api::model::Literal::LanguageTaggedString { value, language } => {
                    AnnotationValue::Literal {
                        value: value.to_string(),
                        datatype: None,
                        language: Some(language.to_string()),
                    }
                }
                rio_api::model::Literal::Typed { value, datatype } => AnnotationValue::Literal {
                    value: value.to_string(),
                    datatype: Some(datatype.iri.to_string()),
                    language: None,
                },
            })),
            _ => None,
        }
    }

    fn add(&mut self, t: rio_api::model::Triple<'_>) {
        let subject = match self.subject(t.subject) {
            Some(s) => s,
            None => return,
        };
        let predicate = t.predicate.iri.to_string();
        let object = match self.object(t.object) {
            Some(o) => o,
            None => return,
        };
        self.collect(subject, &predicate, object);
    }

    fn collect(&mut self, subject: TermRef, predicate: &str, object: Object) {
        match object {
            Object::Literal(value) => {
                self.literals.push((subject, predicate.to_string(), value));
            }
            Object::Term(term) => self.collect_term(subject, predicate, term),
        }
    }

    fn collect_term(&mut self, subject: TermRef, predicate: &str, term: TermRef) {
        match predicate {
            RDF_TYPE => self.collect_type(subject, term),
            OWL_VERSION_IRI => {
                if let TermRef::Iri(iri) = term {
                    self.version_iri = Some(iri);
                }
            }
            OWL_IMPORTS => {
                if let TermRef::Iri(iri) = term {
                    self.imports.push(iri);
                }
            }
            RDFS_SUBCLASS_OF => self.axioms.push(Axiom::SubClassOf {
                sub: subject,
                sup: term,
            }),
            OWL_EQUIVALENT_CLASS => self.axioms.push(Axiom::EquivalentClasses {
                a: subject,
                b: term,
            }),
            OWL_DISJOINT_WITH => self.axioms.push(Axiom::DisjointClasses {
                a: subject,
                b: term,
            }),
            OWL_SAME_AS => self.axioms.push(Axiom::SameAs {
                a: subject,
                b: term,
            }),
            RDFS_SUBPROPERTY_OF => {
                if let (TermRef::Iri(sub), TermRef::Iri(sup)) = (&subject, &term) {
                    self.axioms.push(Axiom::SubPropertyOf {
                        sub: sub.clone(),
                        sup: sup.clone(),
                    });
                }
            }
            RDF_FIRST => {
                if let TermRef::Blank(id) = subject {
                    self.list_first.insert(id, term);
                }
            }
            RDF_REST => {
                if let TermRef::Blank(id) = subject {
                    let next = match term {
                        TermRef::Iri(ref iri) if iri == RDF_NIL => None,
                        TermRef::Blank(next) => Some(next),
                        TermRef::Iri(_) => None,
                    };
                    self.list_rest.insert(id, next);
                }
            }
            OWL_MEMBERS | OWL_DISTINCT_MEMBERS => {
                if let (TermRef::Blank(id), TermRef::Blank(head)) = (subject, term) {
                    self.members_links.push((id, head));
                }
            }
            OWL_UNION_OF | OWL_INTERSECTION_OF | OWL_ONE_OF => {
                if let TermRef::Blank(head) = term {
                    self.list_links
                        .push((subject, predicate.to_string(), head));
                }
            }
            _ => match subject {
                TermRef::Blank(id) => {
                    self.blank_links
                        .entry(id)
                        .or_default()
                        .push((predicate.to_string(), term));
                }
                subject => self.axioms.push(Axiom::PropertyAssertion {
                    subject,
                    predicate: predicate.to_string(),
                    object: term,
                }),
            },
        }
    }

    fn collect_type(&mut self, subject: TermRef, class: TermRef) {
        let class_iri = match &class {
            TermRef::Iri(iri) => iri.as_str(),
            TermRef::Blank(_) => {
                // typed by an anonymous expression
                self.axioms.push(Axiom::ClassAssertion {
                    individual: subject,
                    class,
                });
                return;
            }
        };

        let decl_kind = match class_iri {
            OWL_CLASS => Some(EntityKind::Class),
            OWL_OBJECT_PROPERTY => Some(EntityKind::ObjectProperty),
            OWL_DATATYPE_PROPERTY => Some(EntityKind::DataProperty),
            OWL_ANNOTATION_PROPERTY => Some(EntityKind::AnnotationProperty),
            OWL_NAMED_INDIVIDUAL => Some(EntityKind::NamedIndividual),
            _ => None,
        };

        match (&subject, decl_kind) {
            (TermRef::Iri(iri), Some(kind)) => self.declarations.push(Declaration {
                kind,
                iri: iri.clone(),
            }),
            (TermRef::Blank(id), Some(_)) => {
                // anonymous class expression typed owl:Class etc.
                self.blank_links
                    .entry(id.clone())
                    .or_default()
                    .push((RDF_TYPE.to_string(), class));
            }
            (TermRef::Iri(iri), None) if class_iri == OWL_ONTOLOGY => {
                self.ontology_iri = Some(iri.clone());
            }
            (TermRef::Blank(id), None) if class_iri == OWL_ALL_DISJOINT_CLASSES => {
                self.all_disjoint.insert(id.clone());
            }
            (TermRef::Blank(id), None) => {
                self.blank_links
                    .entry(id.clone())
                    .or_default()
                    .push((RDF_TYPE.to_string(), class));
            }
            (TermRef::Iri(_), None) => self.axioms.push(Axiom::ClassAssertion {
                individual: subject,
                class,
            }),
        }
    }

    /// Walk an RDF collection, cycle-guarded
    fn resolve_list(&self, head: &str) -> Vec<TermRef> {
        let mut members = Vec::new();
        let mut seen = FxHashSet::default();
        let mut cell = Some(head.to_string());
        while let Some(id) = cell {
            if !seen.insert(id.clone()) {
                break;
            }
            if let Some(member) = self.list_first.get(&id) {
                members.push(member.clone());
            }
            cell = self.list_rest.get(&id).cloned().flatten();
        }
        members
    }

    fn finish(mut self, default_iri: &str) -> Ontology {
        let iri = self
            .ontology_iri
            .clone()
            .unwrap_or_else(|| default_iri.to_string());

        // flatten operand lists into their owning expression or subject
        let list_links = std::mem::take(&mut self.list_links);
        for (subject, predicate, head) in list_links {
            for member in self.resolve_list(&head) {
                match &subject {
                    TermRef::Blank(id) => self
                        .blank_links
                        .entry(id.clone())
                        .or_default()
                        .push((predicate.clone(), member)),
                    TermRef::Iri(_) => self.axioms.push(Axiom::PropertyAssertion {
                        subject: subject.clone(),
                        predicate: predicate.clone(),
                        object: member,
                    }),
                }
            }
        }

        // n-ary disjointness
        let members_links = std::mem::take(&mut self.members_links);
        for (subject, head) in members_links {
            if self.all_disjoint.contains(&subject) {
                let members = self.resolve_list(&head);
                if members.len() > 1 {
                    self.axioms.push(Axiom::AllDisjoint { members });
                }
            }
        }

        // remaining blank subjects are anonymous class expressions;
        // collection cells and n-ary axiom scaffolding are not
        let expressions: Vec<ClassExpression> = self
            .blank_links
            .iter()
            .filter(|(id, _)| {
                !self.list_first.contains_key(*id)
                    && !self.list_rest.contains_key(*id)
                    && !self.all_disjoint.contains(*id)
            })
            .map(|(id, links)| ClassExpression {
                id: id.clone(),
                links: links.clone(),
            })
            .collect();

        // literal triples on the ontology node are ontology annotations
        let mut annotations = Vec::new();
        let mut axioms = self.axioms;
        for (subject, predicate, value) in self.literals {
            match &subject {
                TermRef::Iri(s) if *s == iri => annotations.push(Annotation { predicate, value }),
                _ => axioms.push(Axiom::AnnotationAssertion {
                    subject,
                    predicate,
                    value,
                }),
            }
        }

        Ontology {
            declared: self.ontology_iri.is_some(),
            iri,
            version_iri: self.version_iri,
            imports: self.imports,
            annotations,
            declarations: self.declarations,
            expressions,
            axioms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIZZA: &str = r#"
        @prefix : <http://example.org/pizza#> .
        @prefix owl: <http://www.w3.org/2002/07/owl#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        @prefix dc: <http://purl.org/dc/elements/1.1/> .

        <http://example.org/pizza> a owl:Ontology ;
            owl:versionIRI <http://example.org/pizza/1.0> ;
            owl:imports <http://example.org/toppings> ;
            dc:title "Pizza ontology" .

        :Pizza a owl:Class ;
            rdfs:label "Pizza" .

        :Margherita a owl:Class ;
            rdfs:label "Margherita" ;
            rdfs:subClassOf :Pizza .
    "#;

    #[test]
    fn test_parse_header_and_declarations() {
        let ontology =
            parse_document(PIZZA, RdfFormat::Turtle, "http://fallback", "doc").unwrap();

        assert_eq!(ontology.iri, "http://example.org/pizza");
        assert_eq!(
            ontology.version_iri.as_deref(),
            Some("http://example.org/pizza/1.0")
        );
        assert_eq!(ontology.imports, vec!["http://example.org/toppings"]);
        assert_eq!(ontology.annotations.len(), 1);
        assert_eq!(ontology.declarations.len(), 2);

        let sub_class_of = ontology
            .axioms
            .iter()
            .filter(|a| matches!(a, Axiom::SubClassOf { .. }))
            .count();
        assert_eq!(sub_class_of, 1);

        // rdfs:label triples on the classes are annotation assertions
        let labels = ontology
            .axioms
            .iter()
            .filter(|a| matches!(a, Axiom::AnnotationAssertion { .. }))
            .count();
        assert_eq!(labels, 2);
    }

    #[test]
    fn test_parse_restriction_blank_node() {
        let doc = r#"
            @prefix : <http://example.org/v#> .
            @prefix owl: <http://www.w3.org/2002/07/owl#> .
            @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

            :A a owl:Class ;
                rdfs:subClassOf [
                    a owl:Restriction ;
                    owl:onProperty :hasPart ;
                    owl:someValuesFrom :B
                ] .
        "#;
        let ontology = parse_document(doc, RdfFormat::Turtle, "http://fallback", "doc").unwrap();

        assert_eq!(ontology.expressions.len(), 1);
        let expr = &ontology.expressions[0];
        assert!(expr.id.starts_with("doc~"));
        assert_eq!(expr.links.len(), 3);

        // the subClassOf axiom points at the blank expression
        assert!(ontology.axioms.iter().any(|a| matches!(
            a,
            Axiom::SubClassOf { sup: TermRef::Blank(_), .. }
        )));
    }

    #[test]
    fn test_parse_union_list_flattened() {
        let doc = r#"
            @prefix : <http://example.org/v#> .
            @prefix owl: <http://www.w3.org/2002/07/owl#> .

            :C owl:equivalentClass [ a owl:Class ; owl:unionOf ( :A :B ) ] .
        "#;
        let ontology = parse_document(doc, RdfFormat::Turtle, "http://fallback", "doc").unwrap();

        assert_eq!(ontology.expressions.len(), 1);
        let expr = &ontology.expressions[0];
        let operands: Vec<&TermRef> = expr
            .links
            .iter()
            .filter(|(p, _)| p == OWL_UNION_OF)
            .map(|(_, t)| t)
            .collect();
        assert_eq!(
            operands,
            vec![
                &TermRef::iri("http://example.org/v#A"),
                &TermRef::iri("http://example.org/v#B")
            ]
        );
    }

    #[test]
    fn test_parse_all_disjoint_classes() {
        let doc = r#"
            @prefix : <http://example.org/v#> .
            @prefix owl: <http://www.w3.org/2002/07/owl#> .

            [ a owl:AllDisjointClasses ; owl:members ( :A :B :C ) ] .
        "#;
        let ontology = parse_document(doc, RdfFormat::Turtle, "http://fallback", "doc").unwrap();

        assert!(ontology.expressions.is_empty());
        let members = ontology
            .axioms
            .iter()
            .find_map(|a| match a {
                Axiom::AllDisjoint { members } => Some(members.len()),
                _ => None,
            })
            .unwrap();
        assert_eq!(members, 3);
    }

    #[test]
    fn test_ntriples_and_default_iri() {
        let doc = "<http://example.org/A> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#Class> .\n";
        let ontology =
            parse_document(doc, RdfFormat::NTriples, "file:///sources/a.nt", "a").unwrap();
        assert_eq!(ontology.iri, "file:///sources/a.nt");
        assert_eq!(ontology.declarations.len(), 1);
    }

    #[test]
    fn test_malformed_document_is_a_parse_error() {
        let doc = "this is not turtle at all {{{";
        let err = parse_document(doc, RdfFormat::Turtle, "x", "x").unwrap_err();
        assert!(matches!(err, OntologyError::Parse(_)));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(RdfFormat::from_location("a/b/c.ttl"), RdfFormat::Turtle);
        assert_eq!(RdfFormat::from_location("c.NT"), RdfFormat::NTriples);
        assert_eq!(RdfFormat::from_location("pizza.owl"), RdfFormat::RdfXml);
        assert_eq!(RdfFormat::from_location("nolabel"), RdfFormat::Turtle);
    }
}
