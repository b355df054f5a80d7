//! Ontology source loading
//!
//! A source is a file path or an http(s) URL. Loading fetches the
//! document, parses it, and (unless the source opts out) walks its
//! `owl:imports` closure, merging imported declarations and axioms into
//! the root document. The closure walk is cycle-guarded.

use super::model::Ontology;
use super::parser::{parse_document, RdfFormat};
use super::OntologyError;
use rustc_hash::FxHashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Maximum depth of the imports closure walk
const MAX_IMPORT_DEPTH: usize = 16;

/// Whether a location is a remote URL
pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Fetch the raw content of a source
pub fn fetch(location: &str) -> Result<String, OntologyError> {
    if is_url(location) {
        debug!(location, "fetching remote ontology");
        let response = reqwest::blocking::get(location)?;
        if !response.status().is_success() {
            return Err(OntologyError::Fetch(format!(
                "{}: HTTP {}",
                location,
                response.status()
            )));
        }
        Ok(response.text()?)
    } else {
        Ok(fs::read_to_string(location)?)
    }
}

/// Resolve an import IRI against the location that declared it.
///
/// URL imports stand on their own; file IRIs map back to paths;
/// anything relative is tried against the importing document's
/// directory.
pub fn resolve_import(base_location: &str, import: &str) -> String {
    if is_url(import) {
        return import.to_string();
    }
    let import = import.strip_prefix("file://").unwrap_or(import);
    if Path::new(import).is_absolute() {
        return import.to_string();
    }
    match Path::new(base_location).parent() {
        Some(dir) => dir.join(import).to_string_lossy().into_owned(),
        None => import.to_string(),
    }
}

/// Load a source and, unless skipped, merge its imports closure.
pub fn load_ontology(location: &str, skip_imports: bool) -> Result<Ontology, OntologyError> {
    let content = fetch(location)?;
    let format = RdfFormat::from_location(location);
    let mut ontology = parse_document(&content, format, location, location)?;

    if skip_imports {
        return Ok(ontology);
    }

    let mut seen: FxHashSet<String> = FxHashSet::default();
    seen.insert(location.to_string());
    seen.insert(ontology.iri.clone());

    let mut pending: Vec<(String, usize)> = ontology
        .imports
        .iter()
        .map(|import| (resolve_import(location, import), 1))
        .collect();

    while let Some((import_location, depth)) = pending.pop() {
        if depth > MAX_IMPORT_DEPTH || !seen.insert(import_location.clone()) {
            continue;
        }
        let imported = match fetch(&import_location) {
            Ok(content) => parse_document(
                &content,
                RdfFormat::from_location(&import_location),
                &import_location,
                &import_location,
            )?,
            Err(e) => {
                // a missing import degrades the document, it does not
                // fail the source
                warn!(import = %import_location, error = %e, "skipping unresolvable import");
                continue;
            }
        };
        seen.insert(imported.iri.clone());
        for import in &imported.imports {
            pending.push((resolve_import(&import_location, import), depth + 1));
        }
        merge(&mut ontology, imported);
    }

    Ok(ontology)
}

/// Merge an imported document into the root: declarations, expressions
/// and axioms accumulate; header fields stay with the root.
fn merge(root: &mut Ontology, imported: Ontology) {
    root.declarations.extend(imported.declarations);
    root.expressions.extend(imported.expressions);
    root.axioms.extend(imported.axioms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_import() {
        assert_eq!(
            resolve_import("/data/onts/a.ttl", "b.ttl"),
            "/data/onts/b.ttl"
        );
        assert_eq!(
            resolve_import("/data/onts/a.ttl", "http://example.org/b.ttl"),
            "http://example.org/b.ttl"
        );
    }

    #[test]
    fn test_load_with_imports() {
        let dir = tempfile::tempdir().unwrap();
        let root_path = dir.path().join("root.ttl");
        let import_path = dir.path().join("imported.ttl");

        let mut root = std::fs::File::create(&root_path).unwrap();
        writeln!(
            root,
            r#"@prefix owl: <http://www.w3.org/2002/07/owl#> .
               <http://example.org/root> a owl:Ontology ;
                   owl:imports <imported.ttl> .
               <http://example.org/root#A> a owl:Class ."#
        )
        .unwrap();

        let mut imported = std::fs::File::create(&import_path).unwrap();
        writeln!(
            imported,
            r#"@prefix owl: <http://www.w3.org/2002/07/owl#> .
               <http://example.org/imported> a owl:Ontology .
               <http://example.org/imported#B> a owl:Class ."#
        )
        .unwrap();

        let ontology = load_ontology(root_path.to_str().unwrap(), false).unwrap();
        assert_eq!(ontology.iri, "http://example.org/root");
        assert_eq!(ontology.declarations.len(), 2);

        // skip_imports leaves only the root's own declarations
        let ontology = load_ontology(root_path.to_str().unwrap(), true).unwrap();
        assert_eq!(ontology.declarations.len(), 1);
    }

    #[test]
    fn test_missing_import_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root_path = dir.path().join("root.ttl");
        std::fs::write(
            &root_path,
            r#"@prefix owl: <http://www.w3.org/2002/07/owl#> .
               <http://example.org/root> a owl:Ontology ;
                   owl:imports <nowhere.ttl> ."#,
        )
        .unwrap();

        let ontology = load_ontology(root_path.to_str().unwrap(), false).unwrap();
        assert_eq!(ontology.iri, "http://example.org/root");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_ontology("/definitely/not/here.ttl", true).is_err());
    }
}
