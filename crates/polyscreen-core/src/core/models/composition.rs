use serde::Serialize;
use std::fmt;

/// Separator used when a composition is turned into a directory or report name.
pub const NAME_SEPARATOR: &str = "-";

/// An ordered sequence of monomer identifiers forming one co-polymer repeat unit.
///
/// `PartialEq` is strict; reverse sequences are distinct values and are matched
/// up by the work-log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Composition(Vec<String>);

impl Composition {
    pub fn new(ids: Vec<String>) -> Self {
        Self(ids)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn reversed(&self) -> Self {
        Self(self.0.iter().rev().cloned().collect())
    }

    /// Name used for the working directory and report rows, e.g. `A-B`.
    pub fn name(&self) -> String {
        self.0.join(NAME_SEPARATOR)
    }

    pub(crate) fn to_worklog_line(&self) -> String {
        self.0.join(" ")
    }

    pub(crate) fn from_worklog_line(line: &str) -> Option<Self> {
        let ids: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if ids.is_empty() { None } else { Some(Self(ids)) }
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl<S: Into<String>> FromIterator<S> for Composition {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp(ids: &[&str]) -> Composition {
        ids.iter().copied().collect()
    }

    #[test]
    fn reversed_flips_identifier_order() {
        assert_eq!(comp(&["A", "B", "C"]).reversed(), comp(&["C", "B", "A"]));
    }

    #[test]
    fn name_joins_identifiers_with_separator() {
        assert_eq!(comp(&["A", "B"]).name(), "A-B");
        assert_eq!(comp(&["X1", "Y2", "X1"]).to_string(), "X1-Y2-X1");
    }

    #[test]
    fn worklog_line_parses_back_to_same_composition() {
        let original = comp(&["thio", "benz"]);
        let line = original.to_worklog_line();
        assert_eq!(line, "thio benz");
        assert_eq!(Composition::from_worklog_line(&line), Some(original));
        assert_eq!(Composition::from_worklog_line("   "), None);
    }
}
