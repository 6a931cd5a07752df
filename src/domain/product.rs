use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents one line of the shopping list.
///
/// Serialized field names follow the backend collection schema, so a stored
/// document decodes straight into this struct. The `id` lives outside the
/// document body and is filled in by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "nomeProduto")]
    pub name: String,
    #[serde(rename = "quantidade")]
    pub quantity: f64,
    #[serde(rename = "precoUnitario")]
    pub unit_price: f64,
    #[serde(rename = "comprado", default)]
    pub purchased: bool,
    #[serde(rename = "dataAdicao")]
    pub added_at: DateTime<Utc>,
}

impl Product {
    /// Creates a new Product instance.
    ///
    /// # Notes
    /// Outside of tests the `id` and `added_at` fields are assigned by the
    /// backend, never by the caller.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        quantity: f64,
        unit_price: f64,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quantity,
            unit_price,
            purchased: false,
            added_at,
        }
    }

    /// Quantity times unit price. Always recomputed, never stored.
    pub fn line_total(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// Validated input for creating a product or replacing its editable fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDraft {
    #[serde(rename = "nomeProduto")]
    pub name: String,
    #[serde(rename = "quantidade")]
    pub quantity: f64,
    #[serde(rename = "precoUnitario")]
    pub unit_price: f64,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
        }
    }
}

/// Partial update of a product. Only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductPatch {
    #[serde(rename = "nomeProduto", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "quantidade", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(rename = "precoUnitario", skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(rename = "comprado", skip_serializing_if = "Option::is_none")]
    pub purchased: Option<bool>,
}

impl ProductPatch {
    /// Patch touching only the purchased flag.
    pub fn purchased(purchased: bool) -> Self {
        Self {
            purchased: Some(purchased),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.quantity.is_none()
            && self.unit_price.is_none()
            && self.purchased.is_none()
    }
}

/// An edit replaces name, quantity and unit price wholesale.
impl From<ProductDraft> for ProductPatch {
    fn from(draft: ProductDraft) -> Self {
        Self {
            name: Some(draft.name),
            quantity: Some(draft.quantity),
            unit_price: Some(draft.unit_price),
            purchased: None,
        }
    }
}
