use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::criteria::{Direction, FieldRef, Predicate, Query};
use crate::entity::{Collection, Record, ID_FIELD};
use crate::errors::KoreError;
use crate::store::{DataStore, Row, StoreCapabilities};

/// In-memory store for tests and development.
///
/// Evaluates criteria directly and joins with nested loops. Record order
/// within a collection is insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record of a collection, unfiltered.
    pub fn records(&self, collection: &str) -> Vec<Record> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

trait Fields {
    fn field(&self, field: &FieldRef) -> Option<&Value>;
}

struct RowView<'a> {
    row: &'a Row,
    root: &'a str,
}

impl Fields for RowView<'_> {
    fn field(&self, field: &FieldRef) -> Option<&Value> {
        let alias = field.source.as_deref().unwrap_or(self.root);
        self.row.get(alias)?.get(&field.field)
    }
}

struct RecordView<'a> {
    record: &'a Record,
    collection: &'a str,
}

impl Fields for RecordView<'_> {
    fn field(&self, field: &FieldRef) -> Option<&Value> {
        match field.source.as_deref() {
            Some(source) if source != self.collection => None,
            _ => self.record.get(&field.field),
        }
    }
}

fn is_null(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn eval<F: Fields>(predicate: &Predicate, view: &F) -> bool {
    match predicate {
        Predicate::Eq(field, value) => view.field(field).unwrap_or(&Value::Null) == value,
        Predicate::Ne(field, value) => view.field(field).unwrap_or(&Value::Null) != value,
        Predicate::In(field, values) => {
            let actual = view.field(field).unwrap_or(&Value::Null);
            values.iter().any(|v| v == actual)
        }
        Predicate::IsNull(field) => is_null(view.field(field)),
        Predicate::FieldEq(left, right) => {
            let (l, r) = (view.field(left), view.field(right));
            !is_null(l) && l == r
        }
        Predicate::And(parts) => parts.iter().all(|p| eval(p, view)),
        Predicate::Or(parts) => parts.iter().any(|p| eval(p, view)),
        Predicate::Not(inner) => !eval(inner, view),
    }
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(_) => 4,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::full()
    }

    async fn select(&self, query: &Query) -> Result<Vec<Row>> {
        let root = query.root.alias.as_str();

        let mut rows: Vec<Row> = {
            let collections = self.collections.read();

            let mut rows: Vec<Row> = collections
                .get(query.root.collection.name)
                .into_iter()
                .flatten()
                .map(|record| Row::from([(root.to_string(), record.clone())]))
                .collect();

            for join in &query.joins {
                let right = collections.get(join.source.collection.name);
                let mut joined = Vec::new();
                for row in &rows {
                    for record in right.into_iter().flatten() {
                        let mut candidate = row.clone();
                        candidate.insert(join.source.alias.clone(), record.clone());
                        if eval(&join.on, &RowView { row: &candidate, root }) {
                            joined.push(candidate);
                        }
                    }
                }
                rows = joined;
            }
            rows
        };

        let criteria = &query.criteria;
        if let Some(filter) = &criteria.filter {
            rows.retain(|row| eval(filter, &RowView { row, root }));
        }

        if !criteria.order_by.is_empty() {
            rows.sort_by(|a, b| {
                let (a, b) = (RowView { row: a, root }, RowView { row: b, root });
                for order in &criteria.order_by {
                    let ord = compare(a.field(&order.field), b.field(&order.field));
                    let ord = match order.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let paged = rows.into_iter().skip(criteria.offset.unwrap_or(0));
        Ok(match criteria.limit {
            Some(limit) => paged.take(limit).collect(),
            None => paged.collect(),
        })
    }

    async fn insert(&self, collection: &Collection, record: Record) -> Result<Record> {
        let mut collections = self.collections.write();
        let records = collections.entry(collection.name.to_string()).or_default();

        if let Some(id) = record.get(ID_FIELD).filter(|v| !v.is_null()) {
            if records.iter().any(|r| r.get(ID_FIELD) == Some(id)) {
                return Err(KoreError::conflict(format!(
                    "{}: duplicate id {id}",
                    collection.name
                ))
                .into_anyhow());
            }
        }

        records.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        collection: &Collection,
        filter: &Predicate,
        changes: &Record,
    ) -> Result<Vec<Record>> {
        let mut collections = self.collections.write();
        let Some(records) = collections.get_mut(collection.name) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for record in records.iter_mut() {
            let view = RecordView {
                record: &*record,
                collection: collection.name,
            };
            if !eval(filter, &view) {
                continue;
            }
            for (key, value) in changes {
                record.insert(key.clone(), value.clone());
            }
            updated.push(record.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, collection: &Collection, filter: &Predicate) -> Result<u64> {
        let mut collections = self.collections.write();
        let Some(records) = collections.get_mut(collection.name) else {
            return Ok(0);
        };

        let before = records.len();
        records.retain(|record| {
            !eval(
                filter,
                &RecordView {
                    record,
                    collection: collection.name,
                },
            )
        });
        Ok((before - records.len()) as u64)
    }
}
