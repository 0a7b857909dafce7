use super::composition::{Composition, NAME_SEPARATOR};
use std::collections::{HashMap, HashSet};
use std::io;
use thiserror::Error;

const AUTO_IDENTIFIERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed monomer entry on line {line}: expected '<identifier> <descriptor>', found '{content}'")]
    Format { line: usize, content: String },
    #[error("Invalid monomer identifier '{id}': {reason}")]
    InvalidIdentifier { id: String, reason: &'static str },
    #[error("Duplicate monomer identifier '{0}'")]
    DuplicateMonomer(String),
    #[error("Monomer '{0}' is not present in the catalog")]
    UnknownMonomer(String),
    #[error("Monomer catalog is empty")]
    Empty,
    #[error("At most {max} descriptors can be named automatically, got {given}")]
    TooManyDescriptors { given: usize, max: usize },
}

/// A monomer building block: an identifier and its linear structural descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monomer {
    pub id: String,
    pub descriptor: String,
}

/// Read-only mapping from monomer identifier to structural descriptor.
///
/// Insertion order is preserved; it defines the enumeration order of the
/// composition space.
#[derive(Debug, Clone, Default)]
pub struct MonomerCatalog {
    monomers: Vec<Monomer>,
    index: HashMap<String, usize>,
}

impl MonomerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from bare descriptors, naming them `A`, `B`, `C`, ... in order.
    pub fn from_descriptors<S: AsRef<str>>(descriptors: &[S]) -> Result<Self, CatalogError> {
        if descriptors.len() > AUTO_IDENTIFIERS.len() {
            return Err(CatalogError::TooManyDescriptors {
                given: descriptors.len(),
                max: AUTO_IDENTIFIERS.len(),
            });
        }
        let mut catalog = Self::new();
        for (id, descriptor) in AUTO_IDENTIFIERS.chars().zip(descriptors) {
            catalog.insert(id.to_string(), descriptor.as_ref().to_string())?;
        }
        Ok(catalog)
    }

    /// Adds a monomer. Identifiers become path components and name fragments, so
    /// they may not contain the name separator, path separators or whitespace,
    /// and may not be `.` or `..`.
    pub fn insert(&mut self, id: String, descriptor: String) -> Result<(), CatalogError> {
        if let Some(reason) = identifier_problem(&id) {
            return Err(CatalogError::InvalidIdentifier { id, reason });
        }
        if self.index.contains_key(&id) {
            return Err(CatalogError::DuplicateMonomer(id));
        }
        self.index.insert(id.clone(), self.monomers.len());
        self.monomers.push(Monomer { id, descriptor });
        Ok(())
    }

    pub fn descriptor(&self, id: &str) -> Option<&str> {
        self.index
            .get(id)
            .map(|&i| self.monomers[i].descriptor.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.monomers.iter().map(|m| m.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.monomers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monomers.is_empty()
    }

    /// Resolves every identifier of `composition` to its descriptor, in sequence order.
    pub fn descriptors_for(&self, composition: &Composition) -> Result<Vec<&str>, CatalogError> {
        composition
            .ids()
            .iter()
            .map(|id| {
                self.descriptor(id)
                    .ok_or_else(|| CatalogError::UnknownMonomer(id.clone()))
            })
            .collect()
    }

    /// `id=descriptor` pairs for each distinct member of `composition`, used as error context.
    pub fn context_for(&self, composition: &Composition) -> Vec<String> {
        let mut seen = HashSet::new();
        composition
            .ids()
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .map(|id| format!("{}={}", id, self.descriptor(id).unwrap_or("?")))
            .collect()
    }
}

fn identifier_problem(id: &str) -> Option<&'static str> {
    if id.is_empty() {
        Some("identifier is empty")
    } else if id.contains(NAME_SEPARATOR) {
        Some("identifiers may not contain the name separator '-'")
    } else if id.contains(['/', '\\']) {
        Some("identifiers may not contain path separators")
    } else if id.chars().any(char::is_whitespace) {
        Some("identifiers may not contain whitespace")
    } else if id == "." || id == ".." {
        Some("'.' and '..' are not valid directory names")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_preserves_order_and_rejects_duplicates() {
        let mut catalog = MonomerCatalog::new();
        catalog.insert("B".into(), "c1ccsc1".into()).unwrap();
        catalog.insert("A".into(), "c1ccccc1".into()).unwrap();
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["B", "A"]);

        let err = catalog.insert("A".into(), "C".into()).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateMonomer(id) if id == "A"));
    }

    #[test]
    fn insert_rejects_identifiers_that_collide_as_names_or_paths() {
        let mut catalog = MonomerCatalog::new();
        for bad in ["A-B", "..", ".", "x/y", "x\\y", "a b", ""] {
            assert!(
                matches!(
                    catalog.insert(bad.to_string(), "C".into()),
                    Err(CatalogError::InvalidIdentifier { ref id, .. }) if id == bad
                ),
                "'{}' should be rejected",
                bad
            );
        }
        assert!(catalog.is_empty());
        catalog.insert("A.1".into(), "C".into()).unwrap();
        catalog.insert("B_2".into(), "C".into()).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn from_descriptors_assigns_letters() {
        let catalog = MonomerCatalog::from_descriptors(&["Brc1ccc(Br)s1", "Brc1ccc(Br)cc1"]).unwrap();
        assert_eq!(catalog.descriptor("A"), Some("Brc1ccc(Br)s1"));
        assert_eq!(catalog.descriptor("B"), Some("Brc1ccc(Br)cc1"));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn from_descriptors_rejects_more_than_alphabet() {
        let many = vec!["C"; 27];
        assert!(matches!(
            MonomerCatalog::from_descriptors(&many),
            Err(CatalogError::TooManyDescriptors { given: 27, max: 26 })
        ));
    }

    #[test]
    fn descriptors_for_resolves_in_sequence_order() {
        let catalog = MonomerCatalog::from_descriptors(&["d1", "d2"]).unwrap();
        let comp: Composition = ["B", "A", "B"].into_iter().collect();
        assert_eq!(catalog.descriptors_for(&comp).unwrap(), vec!["d2", "d1", "d2"]);

        let unknown: Composition = ["A", "Z"].into_iter().collect();
        assert!(matches!(
            catalog.descriptors_for(&unknown),
            Err(CatalogError::UnknownMonomer(id)) if id == "Z"
        ));
    }

    #[test]
    fn context_lists_each_member_once() {
        let catalog = MonomerCatalog::from_descriptors(&["d1", "d2"]).unwrap();
        let comp: Composition = ["A", "B", "A"].into_iter().collect();
        assert_eq!(catalog.context_for(&comp), vec!["A=d1", "B=d2"]);
    }
}
