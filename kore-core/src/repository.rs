//! Tenant-scoped repository.
//!
//! Reads AND-compose `tenant_field = current tenant` into the caller's
//! criteria (on every tenant-owned source of a join); writes are stamped
//! with the current tenant. The store only ever sees rewritten criteria.

use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::anyhow;
use serde_json::Value;
use uuid::Uuid;

use crate::audit::OperationKind;
use crate::criteria::{Criteria, FieldRef, Predicate, Query};
use crate::entity::{Entity, Record, ID_FIELD};
use crate::errors::{TenancyError, TenancyResult};
use crate::store::{DataStore, Row, StoreMethod};
use crate::tenant::{AccessScope, TenantContext, TenantId};

pub struct ScopedRepository<E> {
    store: Arc<dyn DataStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for ScopedRepository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

fn tenant_predicate(source: Option<&str>, field: &str, tenant: &TenantId) -> Predicate {
    let field = match source {
        Some(alias) => FieldRef::of(alias, field),
        None => FieldRef::new(field),
    };
    Predicate::Eq(field, Value::String(tenant.as_str().to_string()))
}

/// Tenant id a caller put on a record, if any. Blank counts as unset.
fn supplied_tenant(record: &Record, field: &str) -> Option<TenantId> {
    match record.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(TenantId::new(s.as_str())),
        Some(other) => Some(TenantId::new(other.to_string())),
    }
}

/// Pull the record under `alias` out of a row and deserialize it.
pub fn take_entity<T: Entity>(row: &mut Row, alias: &str) -> TenancyResult<T> {
    let record = row
        .remove(alias)
        .ok_or_else(|| TenancyError::Store(anyhow!("row has no source `{alias}`")))?;
    T::from_record(record)
}

impl<E: Entity> ScopedRepository<E> {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    fn require(&self, method: StoreMethod) -> TenancyResult<()> {
        if self.store.capabilities().supports(method) {
            return Ok(());
        }
        Err(TenancyError::Unsupported {
            entity: E::COLLECTION.to_string(),
            what: method.as_str().to_string(),
        })
    }

    fn scope_criteria(
        &self,
        ctx: &TenantContext,
        operation: OperationKind,
        criteria: Criteria,
    ) -> TenancyResult<Criteria> {
        match ctx.resolve_scope(operation, E::COLLECTION)? {
            AccessScope::Tenant(tenant) => {
                tracing::debug!(
                    operation_id = %ctx.operation_id(),
                    entity = E::COLLECTION,
                    operation = operation.as_str(),
                    tenant = %tenant,
                    "criteria scoped to tenant"
                );
                Ok(criteria.and_where(tenant_predicate(None, E::TENANT_FIELD, &tenant)))
            }
            AccessScope::Bypassed { .. } => Ok(criteria),
        }
    }

    /// Every tenant-owned source of `query` gets its own tenant predicate.
    fn scope_query(&self, ctx: &TenantContext, query: Query) -> TenancyResult<Query> {
        let tenant = match ctx.resolve_scope(OperationKind::Join, query.root.collection.name)? {
            AccessScope::Tenant(tenant) => tenant,
            AccessScope::Bypassed { .. } => return Ok(query),
        };

        let predicates: Vec<Predicate> = query
            .sources()
            .filter_map(|source| {
                source
                    .collection
                    .tenant_field
                    .map(|field| tenant_predicate(Some(&source.alias), field, &tenant))
            })
            .collect();

        tracing::debug!(
            operation_id = %ctx.operation_id(),
            root = query.root.collection.name,
            scoped_sources = predicates.len(),
            tenant = %tenant,
            "join scoped to tenant"
        );

        Ok(predicates.into_iter().fold(query, Query::filter))
    }

    async fn select(
        &self,
        ctx: &TenantContext,
        operation: OperationKind,
        criteria: Criteria,
    ) -> TenancyResult<Vec<E>> {
        self.require(StoreMethod::Select)?;
        let criteria = self.scope_criteria(ctx, operation, criteria)?;
        let query = Query::from::<E>().with_criteria(criteria);
        let rows = self.store.select(&query).await?;
        rows.into_iter()
            .map(|mut row| take_entity::<E>(&mut row, E::COLLECTION))
            .collect()
    }

    pub async fn list(&self, ctx: &TenantContext, criteria: Criteria) -> TenancyResult<Vec<E>> {
        self.select(ctx, OperationKind::List, criteria).await
    }

    /// First visible match, if any.
    pub async fn find(&self, ctx: &TenantContext, criteria: Criteria) -> TenancyResult<Option<E>> {
        let mut found = self
            .select(ctx, OperationKind::Find, criteria.limit(1))
            .await?;
        Ok(found.pop())
    }

    pub async fn get(&self, ctx: &TenantContext, id: &str) -> TenancyResult<E> {
        self.find(ctx, Criteria::new().eq(ID_FIELD, id))
            .await?
            .ok_or_else(|| TenancyError::NotFound {
                entity: E::COLLECTION.to_string(),
                id: id.to_string(),
            })
    }

    /// Insert `entity`, stamping the tenant field from the context.
    ///
    /// A record that already names a different tenant is rejected unless a
    /// bypass is active. Missing ids are generated.
    pub async fn create(&self, ctx: &TenantContext, entity: E) -> TenancyResult<E> {
        self.require(StoreMethod::Insert)?;
        let mut record = entity.to_record()?;
        let supplied = supplied_tenant(&record, E::TENANT_FIELD);

        let tenant = match (ctx.resolve_scope(OperationKind::Create, E::COLLECTION)?, supplied) {
            (AccessScope::Tenant(current), None) => current,
            (AccessScope::Tenant(current), Some(found)) if found == current => current,
            (AccessScope::Tenant(current), Some(found)) => {
                tracing::warn!(
                    operation_id = %ctx.operation_id(),
                    entity = E::COLLECTION,
                    expected = %current,
                    found = %found,
                    "rejected: tenant mismatch on create"
                );
                return Err(TenancyError::TenantMismatch {
                    entity: E::COLLECTION.to_string(),
                    expected: current,
                    found,
                });
            }
            (AccessScope::Bypassed { .. }, Some(found)) => found,
            (AccessScope::Bypassed { tenant: Some(current) }, None) => current,
            (AccessScope::Bypassed { tenant: None }, None) => {
                return Err(TenancyError::MissingTenantId {
                    entity: E::COLLECTION.to_string(),
                });
            }
        };

        record.insert(
            E::TENANT_FIELD.to_string(),
            Value::String(tenant.as_str().to_string()),
        );
        if record.get(ID_FIELD).map_or(true, Value::is_null) {
            record.insert(
                ID_FIELD.to_string(),
                Value::String(Uuid::new_v4().to_string()),
            );
        }

        let stored = self.store.insert(&E::collection(), record).await?;
        E::from_record(stored)
    }

    /// Apply `changes` to the visible record `id`.
    ///
    /// Touching the tenant field is always an [`TenancyError::ImmutableField`],
    /// bypass or not. The id itself is never rewritten.
    pub async fn update(&self, ctx: &TenantContext, id: &str, changes: Record) -> TenancyResult<E> {
        self.update_with(ctx, id, changes, |_| Ok(())).await
    }

    /// Like [`update`](Self::update), but `check` sees the merged entity
    /// first. Nothing is written unless the merged record deserializes
    /// and `check` passes; both failures are [`TenancyError::InvalidUpdate`].
    pub async fn update_with<F>(
        &self,
        ctx: &TenantContext,
        id: &str,
        mut changes: Record,
        check: F,
    ) -> TenancyResult<E>
    where
        F: FnOnce(&E) -> anyhow::Result<()>,
    {
        self.require(StoreMethod::Select)?;
        self.require(StoreMethod::Update)?;
        if changes.contains_key(E::TENANT_FIELD) {
            tracing::warn!(
                operation_id = %ctx.operation_id(),
                entity = E::COLLECTION,
                id,
                "rejected: tenant field change"
            );
            return Err(TenancyError::ImmutableField {
                entity: E::COLLECTION.to_string(),
                field: E::TENANT_FIELD.to_string(),
            });
        }
        changes.remove(ID_FIELD);

        let criteria =
            self.scope_criteria(ctx, OperationKind::Update, Criteria::new().eq(ID_FIELD, id))?;
        let filter = criteria.filter.clone().unwrap_or_else(Predicate::always);
        let not_found = || TenancyError::NotFound {
            entity: E::COLLECTION.to_string(),
            id: id.to_string(),
        };

        let query = Query::from::<E>().with_criteria(criteria.limit(1));
        let mut current = self
            .store
            .select(&query)
            .await?
            .pop()
            .and_then(|mut row| row.remove(E::COLLECTION))
            .ok_or_else(not_found)?;
        for (field, value) in &changes {
            current.insert(field.clone(), value.clone());
        }

        let rejected = |source: anyhow::Error| {
            tracing::warn!(
                operation_id = %ctx.operation_id(),
                entity = E::COLLECTION,
                id,
                error = %source,
                "rejected: invalid update"
            );
            TenancyError::InvalidUpdate {
                entity: E::COLLECTION.to_string(),
                source,
            }
        };
        let merged = match E::from_record(current) {
            Ok(merged) => merged,
            Err(TenancyError::Serialization(err)) => return Err(rejected(err.into())),
            Err(other) => return Err(other),
        };
        check(&merged).map_err(rejected)?;

        let mut updated = self
            .store
            .update(&E::collection(), &filter, &changes)
            .await?;
        match updated.pop() {
            Some(record) => E::from_record(record),
            None => Err(not_found()),
        }
    }

    /// Delete every visible match; returns how many went.
    ///
    /// Paging and ordering have no meaning for a delete and are refused
    /// rather than silently widened to every match.
    pub async fn delete(&self, ctx: &TenantContext, criteria: Criteria) -> TenancyResult<u64> {
        self.require(StoreMethod::Delete)?;
        if criteria.limit.is_some() || criteria.offset.is_some() || !criteria.order_by.is_empty() {
            return Err(TenancyError::Unsupported {
                entity: E::COLLECTION.to_string(),
                what: "limit, offset or order_by on delete".to_string(),
            });
        }
        let criteria = self.scope_criteria(ctx, OperationKind::Delete, criteria)?;
        let filter = criteria.filter.unwrap_or_else(Predicate::always);
        Ok(self.store.delete(&E::collection(), &filter).await?)
    }

    /// Run a multi-collection query, scoped on every tenant-owned source.
    pub async fn join(&self, ctx: &TenantContext, query: Query) -> TenancyResult<Vec<Row>> {
        self.require(StoreMethod::Select)?;
        if !query.joins.is_empty() && !self.store.capabilities().joins {
            return Err(TenancyError::Unsupported {
                entity: query.root.collection.name.to_string(),
                what: "joins".to_string(),
            });
        }
        let query = self.scope_query(ctx, query)?;
        Ok(self.store.select(&query).await?)
    }
}
