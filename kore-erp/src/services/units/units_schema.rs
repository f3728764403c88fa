use kore_core::{Entity, TenantId};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A rentable unit inside a building. `monthly_rent` is in minor units of
/// `currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Unit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<TenantId>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub building_id: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub label: String,
    #[serde(default)]
    pub bedrooms: u8,
    #[validate(range(
        min = 0,
        max = 1_000_000_000_000_i64,
        message = "must be between 0 and 1000000000000"
    ))]
    pub monthly_rent: i64,
    #[validate(length(equal = 3, message = "must be a 3-letter ISO code"))]
    pub currency: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Set while the unit is let.
    #[serde(default)]
    pub renter_id: Option<String>,
}

impl Unit {
    pub fn is_occupied(&self) -> bool {
        self.renter_id.is_some()
    }
}

impl Entity for Unit {
    const COLLECTION: &'static str = "units";
}
