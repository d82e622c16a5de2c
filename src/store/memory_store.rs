use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, trace};

use crate::store::{
    words, DocumentStore, FieldType, IndexDefinition, JsonPath, Multi, SearchQuery, SearchResult, StoreError, WriteOp
};

struct Document {
    value: Value,
    revision: u64
}

#[derive(Default)]
struct Documents {
    entries: HashMap<String, Document>,
    revision: u64
}

impl Documents {
    fn revision_of(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|document| document.revision)
    }

    fn put(&mut self, key: String, value: Value) {
        self.revision += 1;
        self.entries.insert(key, Document { value, revision: self.revision });
    }
}

/// Revisions of the watched keys at watch time. A missing key is recorded as `None`.
#[derive(Debug, Clone, Default)]
pub struct Revisions {
    revisions: HashMap<String, Option<u64>>
}

/// In-process [`DocumentStore`] shared by every engine instance holding the same `Arc`.
///
/// Documents and their revision counter sit behind one lock, so `exec` is atomic for
/// readers as well as writers. A failing operation inside `exec` leaves every key
/// untouched. Numeric fields may hold JSON numbers or decimal text; increments are
/// computed with exact decimal arithmetic and written back as decimal text.
pub struct MemoryStore {
    documents: RwLock<Documents>,
    indices: DashMap<String, IndexDefinition>
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Documents::default()),
            indices: DashMap::new()
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Documents>, StoreError> {
        self.documents.read().map_err(|_| StoreError::Unavailable("document lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Documents>, StoreError> {
        self.documents.write().map_err(|_| StoreError::Unavailable("document lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn append_value(document: &mut Value, key: &str, path: &str, value: Value) -> Result<(), StoreError> {
    let target = JsonPath::parse(path)?.resolve_mut(document)
        .ok_or_else(|| StoreError::not_found(key, path))?;

    match target {
        Value::Array(items) => {
            items.push(value);
            Ok(())
        }
        _ => Err(StoreError::wrong_type(key, path, "an array"))
    }
}

fn increment(document: &mut Value, key: &str, path: &str, delta: Decimal) -> Result<Decimal, StoreError> {
    let target = JsonPath::parse(path)?.resolve_mut(document)
        .ok_or_else(|| StoreError::not_found(key, path))?;

    let current = match target {
        Value::Number(_) | Value::String(_) => serde_json::from_value::<Decimal>(target.clone())
            .map_err(|_| StoreError::wrong_type(key, path, "a number"))?,
        _ => return Err(StoreError::wrong_type(key, path, "a number"))
    };

    let updated = current.checked_add(delta)
        .ok_or_else(|| StoreError::Overflow { key: key.to_string(), path: path.to_string() })?;

    *target = serde_json::to_value(updated)?;

    Ok(updated)
}

fn index_matches(path: &JsonPath, field_type: FieldType, document: &Value, query: &SearchQuery) -> bool {
    let values = path.select(document);

    match (field_type, query) {
        (FieldType::Text, SearchQuery::Text(text)) => {
            let indexed: Vec<String> = values.iter()
                .filter_map(|value| value.as_str())
                .flat_map(words)
                .collect();
            let mut wanted = words(text).peekable();

            wanted.peek().is_some() && wanted.all(|word| indexed.contains(&word))
        }
        (FieldType::Tag, SearchQuery::Tag(tag)) => {
            let tag = tag.trim();

            values.iter()
                .filter_map(|value| value.as_str())
                .any(|value| value.trim().eq_ignore_ascii_case(tag))
        }
        _ => false
    }
}

impl DocumentStore for MemoryStore {
    type Watch = Revisions;

    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }

    async fn create_index(&self, index: IndexDefinition) -> Result<(), StoreError> {
        JsonPath::parse(&index.path)?;

        match self.indices.entry(index.name.clone()) {
            Entry::Occupied(_) => Err(StoreError::IndexExists { index: index.name }),
            Entry::Vacant(entry) => {
                debug!("Created index [{}] over [{}]", index.name, index.path);
                entry.insert(index);
                Ok(())
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.entries.contains_key(key))
    }

    async fn get(&self, key: &str, path: &str) -> Result<Value, StoreError> {
        let path_expression = JsonPath::parse(path)?;
        let documents = self.read()?;
        let document = documents.entries.get(key).ok_or_else(|| StoreError::not_found(key, "$"))?;

        path_expression.resolve(&document.value)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key, path))
    }

    async fn set_if_absent(&self, key: &str, document: Value) -> Result<bool, StoreError> {
        let mut documents = self.write()?;

        if documents.entries.contains_key(key) {
            return Ok(false);
        }

        documents.put(key.to_string(), document);
        Ok(true)
    }

    async fn watch(&self, keys: &[&str]) -> Result<Revisions, StoreError> {
        let documents = self.read()?;
        let revisions = keys.iter()
            .map(|key| (key.to_string(), documents.revision_of(key)))
            .collect();

        Ok(Revisions { revisions })
    }

    async fn exec(&self, watch: Revisions, multi: Multi) -> Result<(), StoreError> {
        let mut documents = self.write()?;

        for (key, observed) in &watch.revisions {
            if documents.revision_of(key) != *observed {
                debug!("Aborting exec, watched key [{key}] changed");
                return Err(StoreError::Conflict { key: key.to_string() });
            }
        }

        // Writes are applied to copies first so a failing operation leaves every key untouched.
        let mut staged: HashMap<String, Value> = HashMap::new();

        for op in multi.into_ops() {
            trace!("Staging write on [{}]", op.key());

            match op {
                WriteOp::Append { key, path, value } => {
                    let document = stage(&documents, &mut staged, &key)?;
                    append_value(document, &key, &path, value)?;
                }
                WriteOp::IncrBy { key, path, delta } => {
                    let document = stage(&documents, &mut staged, &key)?;
                    increment(document, &key, &path, delta)?;
                }
            }
        }

        for (key, value) in staged {
            documents.put(key, value);
        }

        Ok(())
    }

    async fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchResult, StoreError> {
        let definition = self.indices.get(index)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::UnknownIndex { index: index.to_string() })?;

        match (definition.field_type, query) {
            (FieldType::Text, SearchQuery::Text(_)) | (FieldType::Tag, SearchQuery::Tag(_)) => {}
            _ => return Err(StoreError::InvalidQuery {
                index: index.to_string(),
                reason: format!("field [{}] is {:?}", definition.field, definition.field_type)
            })
        }

        let path = JsonPath::parse(&definition.path)?;
        let documents = self.read()?;

        let mut matches: Vec<(String, Value)> = documents.entries.iter()
            .filter(|(key, _)| key.starts_with(&definition.prefix))
            .filter(|(_, document)| index_matches(&path, definition.field_type, &document.value, query))
            .map(|(key, document)| (key.clone(), document.value.clone()))
            .collect();

        matches.sort_by(|left, right| left.0.cmp(&right.0));

        Ok(SearchResult { total: matches.len(), documents: matches })
    }
}

fn stage<'a>(documents: &Documents, staged: &'a mut HashMap<String, Value>, key: &str) -> Result<&'a mut Value, StoreError> {
    match staged.entry(key.to_string()) {
        MapEntry::Occupied(entry) => Ok(entry.into_mut()),
        MapEntry::Vacant(entry) => {
            let current = documents.entries.get(key)
                .map(|document| document.value.clone())
                .ok_or_else(|| StoreError::not_found(key, "$"))?;

            Ok(entry.insert(current))
        }
    }
}
