use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const ADDRESSES: &str = "addresses";

pub const ADDRESS_COLUMNS: &str = "id, user_id, label, recipient_name, phone, province, city, \
     district, sub_district, postal_code, full_address, is_primary, is_active, created_at, \
     updated_at, deleted_at, created_by, updated_by, deleted_by";

/// A shipping address owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    pub recipient_name: String,
    pub phone: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub sub_district: String,
    pub postal_code: String,
    pub full_address: String,
    pub is_primary: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<Uuid>,
}

kratify_db::impl_from_row!(Address {
    id,
    user_id,
    label,
    recipient_name,
    phone,
    province,
    city,
    district,
    sub_district,
    postal_code,
    full_address,
    is_primary,
    is_active,
    created_at,
    updated_at,
    deleted_at,
    created_by,
    updated_by,
    deleted_by,
});

#[derive(Debug, Clone)]
pub struct NewAddress {
    pub label: String,
    pub recipient_name: String,
    pub phone: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub sub_district: String,
    pub postal_code: String,
    pub full_address: String,
    pub is_primary: bool,
}

/// Partial update; only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct AddressChanges {
    pub label: Option<String>,
    pub recipient_name: Option<String>,
    pub phone: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub sub_district: Option<String>,
    pub postal_code: Option<String>,
    pub full_address: Option<String>,
    pub is_primary: Option<bool>,
}

impl AddressChanges {
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.recipient_name.is_none()
            && self.phone.is_none()
            && self.province.is_none()
            && self.city.is_none()
            && self.district.is_none()
            && self.sub_district.is_none()
            && self.postal_code.is_none()
            && self.full_address.is_none()
            && self.is_primary.is_none()
    }
}
