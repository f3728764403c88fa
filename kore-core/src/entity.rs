//! Persisted shapes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::{TenancyError, TenancyResult};

/// A stored document: field name -> JSON value.
pub type Record = serde_json::Map<String, Value>;

/// Tenant foreign key used unless an entity says otherwise.
pub const DEFAULT_TENANT_FIELD: &str = "agency_id";

pub const ID_FIELD: &str = "id";

/// A named collection and whether (and by which field) it is tenant-owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Collection {
    pub name: &'static str,
    pub tenant_field: Option<&'static str>,
}

impl Collection {
    pub const fn tenant_owned(name: &'static str, tenant_field: &'static str) -> Self {
        Self {
            name,
            tenant_field: Some(tenant_field),
        }
    }

    /// A collection shared by all tenants (e.g. the agency directory).
    pub const fn global(name: &'static str) -> Self {
        Self {
            name,
            tenant_field: None,
        }
    }
}

/// A tenant-owned entity.
///
/// The tenant field is written once, at creation, by the repository; it
/// should be modelled as `Option<TenantId>` so "not yet stamped" is
/// representable.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const TENANT_FIELD: &'static str = DEFAULT_TENANT_FIELD;

    fn collection() -> Collection {
        Collection::tenant_owned(Self::COLLECTION, Self::TENANT_FIELD)
    }

    fn to_record(&self) -> TenancyResult<Record> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(TenancyError::Serialization(serde::ser::Error::custom(
                format!("{} must serialize to a JSON object", Self::COLLECTION),
            ))),
        }
    }

    fn from_record(record: Record) -> TenancyResult<Self> {
        Ok(serde_json::from_value(Value::Object(record))?)
    }
}
