use anyhow::Result;
use async_trait::async_trait;
use kore_axum::EntityHook;
use kore_core::{Entity, KoreError, Record, ScopedRepository, TenancyError, TenantContext};
use serde_json::{json, Value};
use validator::{Validate, ValidationErrors};

/// 422 with one list of messages per offending field.
pub fn validation_error(collection: &str, errors: &ValidationErrors) -> anyhow::Error {
    let mut fields = serde_json::Map::new();
    for (field, errs) in errors.field_errors() {
        let messages = errs
            .iter()
            .map(|e| {
                let message = match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                };
                Value::String(message)
            })
            .collect();
        fields.insert(field.to_string(), Value::Array(messages));
    }
    KoreError::unprocessable(format!("{collection} validation failed"))
        .with_errors(Value::Object(fields))
        .into_anyhow()
}

/// Runs the entity's `validator` rules before it is created, and on the
/// merged record before a patch is written.
pub struct ValidateSchema;

#[async_trait]
impl<E: Entity + Validate> EntityHook<E> for ValidateSchema {
    async fn before_create(&self, _ctx: &TenantContext, entity: &E) -> Result<()> {
        entity
            .validate()
            .map_err(|errors| validation_error(E::COLLECTION, &errors))
    }

    fn check_patched(&self, merged: &E) -> Result<()> {
        merged
            .validate()
            .map_err(|errors| validation_error(E::COLLECTION, &errors))
    }
}

/// Rejects writes pointing at a record the caller's agency cannot see.
///
/// The lookup goes through a scoped repository, so an id belonging to
/// another agency fails exactly like an id that does not exist.
pub struct RequireVisible<E, R: Entity> {
    field: &'static str,
    reference: fn(&E) -> Option<&str>,
    target: ScopedRepository<R>,
}

impl<E, R: Entity> RequireVisible<E, R> {
    pub fn new(
        field: &'static str,
        reference: fn(&E) -> Option<&str>,
        target: ScopedRepository<R>,
    ) -> Self {
        Self {
            field,
            reference,
            target,
        }
    }

    async fn check(&self, ctx: &TenantContext, collection: &str, id: &str) -> Result<()> {
        match self.target.get(ctx, id).await {
            Ok(_) => Ok(()),
            Err(TenancyError::NotFound { .. }) => {
                Err(KoreError::unprocessable(format!("{collection} validation failed"))
                    .with_errors(json!({ self.field: [format!("{} {id} not found", R::COLLECTION)] }))
                    .into_anyhow())
            }
            Err(other) => Err(other.into()),
        }
    }
}

#[async_trait]
impl<E: Entity, R: Entity> EntityHook<E> for RequireVisible<E, R> {
    async fn before_create(&self, ctx: &TenantContext, entity: &E) -> Result<()> {
        match (self.reference)(entity) {
            Some(id) => self.check(ctx, E::COLLECTION, id).await,
            None => Ok(()),
        }
    }

    async fn before_patch(&self, ctx: &TenantContext, _id: &str, changes: &Record) -> Result<()> {
        match changes.get(self.field) {
            Some(Value::String(id)) => self.check(ctx, E::COLLECTION, id).await,
            Some(Value::Null) | None => Ok(()),
            Some(_) => Err(KoreError::unprocessable(format!("{} validation failed", E::COLLECTION))
                .with_errors(json!({ self.field: ["must be a string"] }))
                .into_anyhow()),
        }
    }
}

/// Rejects patches that set `field` to a blank string.
pub struct RejectBlank(pub &'static [&'static str]);

#[async_trait]
impl<E: Entity> EntityHook<E> for RejectBlank {
    async fn before_patch(&self, _ctx: &TenantContext, _id: &str, changes: &Record) -> Result<()> {
        let mut fields = serde_json::Map::new();
        for field in self.0 {
            if let Some(Value::String(v)) = changes.get(*field) {
                if v.trim().is_empty() {
                    fields.insert(field.to_string(), json!(["must not be empty"]));
                }
            }
        }
        if fields.is_empty() {
            return Ok(());
        }
        Err(KoreError::unprocessable(format!("{} validation failed", E::COLLECTION))
            .with_errors(Value::Object(fields))
            .into_anyhow())
    }
}
