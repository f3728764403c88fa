use kore_core::{Entity, TenantId};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Building {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<TenantId>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub address: String,
    #[serde(default)]
    #[validate(range(max = 300, message = "must be at most 300"))]
    pub floors: u32,
}

impl Entity for Building {
    const COLLECTION: &'static str = "buildings";
}
