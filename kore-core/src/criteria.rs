//! Store-agnostic criteria.
//!
//! Repositories never filter after fetching; they rewrite criteria and let
//! the store evaluate them. A [`FieldRef`] without a source refers to the
//! query's root collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Collection, Entity};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    /// Alias of the source the field lives on; `None` means the root.
    pub source: Option<String>,
    pub field: String,
}

impl FieldRef {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            source: None,
            field: field.into(),
        }
    }

    pub fn of(source: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            field: field.into(),
        }
    }
}

impl From<&str> for FieldRef {
    fn from(field: &str) -> Self {
        FieldRef::new(field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Eq(FieldRef, Value),
    Ne(FieldRef, Value),
    In(FieldRef, Vec<Value>),
    /// Missing or JSON null.
    IsNull(FieldRef),
    /// Both fields present, non-null and equal. Used for join conditions.
    FieldEq(FieldRef, FieldRef),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eq(field: impl Into<FieldRef>, value: impl Into<Value>) -> Self {
        Predicate::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<FieldRef>, value: impl Into<Value>) -> Self {
        Predicate::Ne(field.into(), value.into())
    }

    pub fn is_in(field: impl Into<FieldRef>, values: Vec<Value>) -> Self {
        Predicate::In(field.into(), values)
    }

    pub fn is_null(field: impl Into<FieldRef>) -> Self {
        Predicate::IsNull(field.into())
    }

    pub fn not_null(field: impl Into<FieldRef>) -> Self {
        Predicate::Not(Box::new(Predicate::IsNull(field.into())))
    }

    pub fn field_eq(left: FieldRef, right: FieldRef) -> Self {
        Predicate::FieldEq(left, right)
    }

    /// Matches every row.
    pub fn always() -> Self {
        Predicate::And(Vec::new())
    }

    /// AND-compose, flattening nested conjunctions.
    pub fn and(self, other: Predicate) -> Self {
        let mut parts = match self {
            Predicate::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Predicate::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Predicate::And(parts)
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(vec![self, other])
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub field: FieldRef,
    pub direction: Direction,
}

/// Filter plus paging for a single-collection operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub filter: Option<Predicate>,
    pub order_by: Vec<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// AND `predicate` into the filter.
    pub fn and_where(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn eq(self, field: impl Into<FieldRef>, value: impl Into<Value>) -> Self {
        self.and_where(Predicate::eq(field, value))
    }

    pub fn order_by(mut self, field: impl Into<FieldRef>, direction: Direction) -> Self {
        self.order_by.push(Order {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// A collection taking part in a query, under an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub collection: Collection,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub source: Source,
    pub on: Predicate,
}

/// A root collection, optional inner joins and criteria over all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub root: Source,
    pub joins: Vec<Join>,
    pub criteria: Criteria,
}

impl Query {
    /// Query rooted at `E`, aliased by its collection name.
    pub fn from<E: Entity>() -> Self {
        Self::from_collection(E::collection(), E::COLLECTION)
    }

    pub fn from_collection(collection: Collection, alias: impl Into<String>) -> Self {
        Self {
            root: Source {
                collection,
                alias: alias.into(),
            },
            joins: Vec::new(),
            criteria: Criteria::default(),
        }
    }

    /// Inner join `E` under `alias` where `left == right`.
    pub fn join<E: Entity>(self, alias: impl Into<String>, left: FieldRef, right: FieldRef) -> Self {
        self.join_collection(E::collection(), alias, left, right)
    }

    pub fn join_collection(
        mut self,
        collection: Collection,
        alias: impl Into<String>,
        left: FieldRef,
        right: FieldRef,
    ) -> Self {
        self.joins.push(Join {
            source: Source {
                collection,
                alias: alias.into(),
            },
            on: Predicate::field_eq(left, right),
        });
        self
    }

    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.criteria = self.criteria.and_where(predicate);
        self
    }

    /// Root first, then joins in order.
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        std::iter::once(&self.root).chain(self.joins.iter().map(|j| &j.source))
    }
}
