use std::sync::Arc;

use anyhow::Result;
use kore_core::{
    Collection, Criteria, DataStore, Direction, OperationKind, Query, Record, TenancyError,
    TenancyResult, TenantContext, TenantId, ID_FIELD,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::services::shared::validation_error;

/// The agency directory is shared by every tenant; it is the list of
/// tenants itself.
pub const AGENCIES: Collection = Collection::global("agencies");

/// A property-management agency: the isolation boundary for all business
/// data, and the source of its locale and currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Agency {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub id: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[validate(length(equal = 3, message = "must be a 3-letter ISO code"))]
    pub currency: String,
    #[validate(length(equal = 2, message = "must be a 2-letter ISO code"))]
    pub country: String,
}

fn default_locale() -> String {
    "en".to_string()
}

impl Agency {
    pub fn tenant(&self) -> TenantId {
        TenantId::new(self.id.as_str())
    }
}

#[derive(Clone)]
pub struct AgencyDirectory {
    store: Arc<dyn DataStore>,
}

impl AgencyDirectory {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    async fn select(&self, criteria: Criteria) -> Result<Vec<Agency>> {
        let query = Query::from_collection(AGENCIES, AGENCIES.name).with_criteria(criteria);
        let rows = self.store.select(&query).await?;
        let mut agencies = Vec::with_capacity(rows.len());
        for mut row in rows {
            if let Some(record) = row.remove(AGENCIES.name) {
                agencies.push(serde_json::from_value(Value::Object(record))?);
            }
        }
        Ok(agencies)
    }

    pub async fn register(&self, agency: Agency) -> Result<Agency> {
        agency
            .validate()
            .map_err(|errors| validation_error(AGENCIES.name, &errors))?;
        let record: Record = match serde_json::to_value(&agency)? {
            Value::Object(map) => map,
            _ => anyhow::bail!("agency must serialize to a JSON object"),
        };
        self.store.insert(&AGENCIES, record).await?;
        tracing::info!(agency = %agency.id, name = %agency.name, "agency registered");
        Ok(agency)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Agency>> {
        let criteria = Criteria::new().eq(ID_FIELD, id).limit(1);
        Ok(self.select(criteria).await?.into_iter().next())
    }

    /// Every agency, ordered by id.
    pub async fn list(&self) -> Result<Vec<Agency>> {
        self.select(Criteria::new().order_by(ID_FIELD, Direction::Asc))
            .await
    }

    /// Profile of the agency `ctx` is scoped to.
    pub async fn current(&self, ctx: &TenantContext) -> Result<Agency> {
        let tenant = require_tenant(ctx)?;
        match self.get(tenant.as_str()).await? {
            Some(agency) => Ok(agency),
            None => Err(TenancyError::NotFound {
                entity: AGENCIES.name.to_string(),
                id: tenant.to_string(),
            }
            .into()),
        }
    }
}

fn require_tenant(ctx: &TenantContext) -> TenancyResult<TenantId> {
    ctx.current().ok_or_else(|| TenancyError::NoActiveTenant {
        operation: OperationKind::Find,
        entity: AGENCIES.name.to_string(),
    })
}
