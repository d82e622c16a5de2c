use serde_json::Value;

use crate::store::StoreError;

/// A JSON path in the `$.field.sub` form.
///
/// `$` alone addresses the document root. A trailing `.*` selects every element of the
/// array at that position, and is only meaningful for index definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<String>,
    each: bool
}

impl JsonPath {
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let invalid = || StoreError::InvalidPath(path.to_string());
        let rest = path.trim().strip_prefix('$').ok_or_else(invalid)?;

        if rest.is_empty() {
            return Ok(Self { segments: Vec::new(), each: false });
        }

        let rest = rest.strip_prefix('.').ok_or_else(invalid)?;
        let mut segments: Vec<String> = rest.split('.').map(str::to_string).collect();
        let each = segments.last().is_some_and(|segment| segment == "*");

        if each {
            segments.pop();
        }

        if segments.iter().any(|segment| segment.is_empty() || segment == "*") {
            return Err(invalid());
        }

        Ok(Self { segments, each })
    }

    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.segments.iter().try_fold(document, |current, segment| current.get(segment.as_str()))
    }

    pub fn resolve_mut<'a>(&self, document: &'a mut Value) -> Option<&'a mut Value> {
        self.segments.iter().try_fold(document, |current, segment| current.get_mut(segment.as_str()))
    }

    /// Every value addressed by the path, expanding a trailing wildcard.
    pub fn select<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        match (self.resolve(document), self.each) {
            (Some(Value::Array(items)), true) => items.iter().collect(),
            (Some(_), true) | (None, _) => Vec::new(),
            (Some(value), false) => vec![value]
        }
    }
}
