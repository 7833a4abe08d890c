//! Field mapping between export API identifiers and store columns
//!
//! The export API names fields like `ym:s:clientID` or `ym:pv:date`. Store
//! columns drop the namespace prefix and capitalize the first character, so
//! those become `ClientID` and `Date`.

use std::collections::BTreeMap;

/// Namespace prefixes stripped by default
pub const DEFAULT_PREFIXES: [&str; 2] = ["ym:s:", "ym:pv:"];

/// Translates external field identifiers into column names and types
#[derive(Debug, Clone)]
pub struct FieldMapper {
    prefixes: Vec<String>,
    types: BTreeMap<String, String>,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl FieldMapper {
    /// Create a mapper with the default prefixes and the given column types
    pub fn new(types: BTreeMap<String, String>) -> Self {
        Self {
            prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
            types,
        }
    }

    /// Replace the recognized prefixes
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Column name for an external field identifier
    ///
    /// Leading prefixes are stripped in any order until none applies, then the
    /// first remaining character is uppercased. Applying the mapping to its own
    /// output is a no-op.
    pub fn column_name(&self, field: &str) -> String {
        let mut name = field;
        'strip: loop {
            for prefix in &self.prefixes {
                if prefix.is_empty() {
                    continue;
                }
                if let Some(rest) = name.strip_prefix(prefix.as_str()) {
                    name = rest;
                    continue 'strip;
                }
            }
            break;
        }

        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Column type configured for an external field identifier
    pub fn column_type(&self, field: &str) -> Option<&str> {
        self.types.get(field).map(String::as_str)
    }

    /// Map a tab-separated header line to column names
    pub fn map_header(&self, header: &str) -> String {
        header
            .split('\t')
            .map(|cell| self.column_name(cell))
            .collect::<Vec<_>>()
            .join("\t")
    }
}
