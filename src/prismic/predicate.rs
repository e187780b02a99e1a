use std::fmt;

/// A query predicate in the content API's query language, e.g.
/// `[at(document.type, "publication")]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate(String);

impl Predicate {
    /// Exact match of `path` against `value`.
    pub fn at(path: &str, value: &str) -> Self {
        Self(format!("[at({}, {})]", path, quote(value)))
    }

    /// Renders the `q` parameter for a set of predicates.
    pub fn query_param(predicates: &[Predicate]) -> String {
        let inner: String = predicates.iter().map(|p| p.0.as_str()).collect();
        format!("[{inner}]")
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
