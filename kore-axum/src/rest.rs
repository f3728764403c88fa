use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    routing, Json, Router,
};
use kore_core::{Criteria, Entity, KoreError, Record, ScopedRepository, TenantContext, ID_FIELD};
use serde_json::json;

use crate::{params::criteria_from_query, KoreAxumError, Tenancy};

/// Runs inside the request's tenant context before a write reaches the
/// repository. An error aborts the write and is returned to the client.
#[async_trait]
pub trait EntityHook<E: Entity>: Send + Sync {
    async fn before_create(&self, _ctx: &TenantContext, _entity: &E) -> anyhow::Result<()> {
        Ok(())
    }

    async fn before_patch(
        &self,
        _ctx: &TenantContext,
        _id: &str,
        _changes: &Record,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Sees the record as it would be after a patch, before anything is
    /// written.
    fn check_patched(&self, _merged: &E) -> anyhow::Result<()> {
        Ok(())
    }
}

/// REST routes over one scoped repository, plus its hooks.
pub struct EntityRoutes<E: Entity> {
    repo: ScopedRepository<E>,
    hooks: Vec<Arc<dyn EntityHook<E>>>,
}

impl<E: Entity> Clone for EntityRoutes<E> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

fn map_json_rejection(rejection: JsonRejection) -> KoreAxumError {
    KoreError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({"_schema": [rejection.body_text()]}))
        .into()
}

fn map_query_rejection(rejection: QueryRejection) -> KoreAxumError {
    KoreError::bad_request("Failed to parse the query string")
        .with_errors(json!({"_query": [rejection.body_text()]}))
        .into()
}

fn criteria(query: QueryPairs) -> Result<Criteria, KoreAxumError> {
    let Query(pairs) = query.map_err(map_query_rejection)?;
    Ok(criteria_from_query(&pairs)?)
}

async fn list<E: Entity>(
    State(routes): State<EntityRoutes<E>>,
    tenancy: Tenancy,
    query: QueryPairs,
) -> Result<Json<Vec<E>>, KoreAxumError> {
    let criteria = criteria(query)?;
    Ok(Json(routes.repo.list(&tenancy, criteria).await?))
}

async fn create<E: Entity>(
    State(routes): State<EntityRoutes<E>>,
    tenancy: Tenancy,
    body: Result<Json<E>, JsonRejection>,
) -> Result<(StatusCode, Json<E>), KoreAxumError> {
    let Json(entity) = body.map_err(map_json_rejection)?;
    for hook in &routes.hooks {
        hook.before_create(&tenancy, &entity).await?;
    }
    let created = routes.repo.create(&tenancy, entity).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get<E: Entity>(
    State(routes): State<EntityRoutes<E>>,
    tenancy: Tenancy,
    Path(id): Path<String>,
) -> Result<Json<E>, KoreAxumError> {
    Ok(Json(routes.repo.get(&tenancy, &id).await?))
}

async fn patch<E: Entity>(
    State(routes): State<EntityRoutes<E>>,
    tenancy: Tenancy,
    Path(id): Path<String>,
    body: Result<Json<Record>, JsonRejection>,
) -> Result<Json<E>, KoreAxumError> {
    let Json(changes) = body.map_err(map_json_rejection)?;
    for hook in &routes.hooks {
        hook.before_patch(&tenancy, &id, &changes).await?;
    }
    let hooks = &routes.hooks;
    let updated = routes
        .repo
        .update_with(&tenancy, &id, changes, |merged| {
            hooks.iter().try_for_each(|hook| hook.check_patched(merged))
        })
        .await?;
    Ok(Json(updated))
}

/// Responds with the removed record.
async fn remove<E: Entity>(
    State(routes): State<EntityRoutes<E>>,
    tenancy: Tenancy,
    Path(id): Path<String>,
) -> Result<Json<E>, KoreAxumError> {
    let existing = routes.repo.get(&tenancy, &id).await?;
    routes
        .repo
        .delete(&tenancy, Criteria::new().eq(ID_FIELD, id.as_str()))
        .await?;
    Ok(Json(existing))
}

impl<E: Entity> EntityRoutes<E> {
    pub fn new(repo: ScopedRepository<E>) -> Self {
        Self {
            repo,
            hooks: Vec::new(),
        }
    }

    pub fn hook(mut self, hook: Arc<dyn EntityHook<E>>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// `GET /`, `POST /`, `GET /{id}`, `PATCH /{id}` and `DELETE /{id}`.
    /// Requires [`crate::TenancyLayer`] further out.
    pub fn into_router(self) -> Router<()> {
        Router::new()
            .route("/", routing::get(list::<E>).post(create::<E>))
            .route(
                "/{id}",
                routing::get(get::<E>)
                    .patch(patch::<E>)
                    .delete(remove::<E>),
            )
            .with_state(self)
    }
}

pub fn entity_router<E: Entity>(repo: ScopedRepository<E>) -> Router<()> {
    EntityRoutes::new(repo).into_router()
}
