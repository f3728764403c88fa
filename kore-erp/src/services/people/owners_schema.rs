use kore_core::{Entity, TenantId};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Landlord whose units the agency manages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Owner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<TenantId>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Entity for Owner {
    const COLLECTION: &'static str = "owners";
}
