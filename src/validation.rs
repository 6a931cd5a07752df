//! Validation of the add/edit form. The only place product rules are
//! enforced locally; nothing invalid reaches the gateway.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::domain::ProductDraft;

/// Raw text of the product form, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub quantity: String,
    pub unit_price: String,
}

impl ProductInput {
    pub fn new(
        name: impl Into<String>,
        quantity: impl Into<String>,
        unit_price: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
            unit_price: unit_price.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Name,
    Quantity,
    UnitPrice,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormField::Name => write!(f, "name"),
            FormField::Quantity => write!(f, "quantity"),
            FormField::UnitPrice => write!(f, "unit_price"),
        }
    }
}

/// Per-field messages for a rejected form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("Invalid product input: {}", field_list(.errors))]
pub struct ValidationErrors {
    errors: BTreeMap<FormField, String>,
}

impl ValidationErrors {
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: FormField) -> bool {
        self.errors.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.errors.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    fn insert(&mut self, field: FormField, message: &str) {
        self.errors.insert(field, message.to_string());
    }
}

fn field_list(errors: &BTreeMap<FormField, String>) -> String {
    errors
        .keys()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub const NAME_REQUIRED: &str = "Product name is required";
pub const QUANTITY_INVALID: &str = "Quantity must be greater than 0";
pub const PRICE_INVALID: &str = "Price must be greater than 0";
pub const TOTAL_TOO_LARGE: &str = "Quantity times price is too large";

/// Largest accepted line total. Keeps list sums finite, so the summary
/// always satisfies `total = purchased + remaining`.
pub const MAX_LINE_TOTAL: f64 = 1e12;

/// Checks every field and returns either a normalised draft or all the
/// problems found.
pub fn validate(input: &ProductInput) -> Result<ProductDraft, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = input.name.trim();
    if name.is_empty() {
        errors.insert(FormField::Name, NAME_REQUIRED);
    }

    let quantity = parse_positive(&input.quantity);
    if quantity.is_none() {
        errors.insert(FormField::Quantity, QUANTITY_INVALID);
    }

    let unit_price = parse_positive(&input.unit_price);
    if unit_price.is_none() {
        errors.insert(FormField::UnitPrice, PRICE_INVALID);
    }

    if let (Some(quantity), Some(unit_price)) = (quantity, unit_price) {
        let line_total = quantity * unit_price;
        if !line_total.is_finite() || line_total > MAX_LINE_TOTAL {
            errors.insert(FormField::UnitPrice, TOTAL_TOO_LARGE);
        }
    }

    match (quantity, unit_price) {
        (Some(quantity), Some(unit_price)) if errors.is_empty() => {
            Ok(ProductDraft::new(name, quantity, unit_price))
        }
        _ => Err(errors),
    }
}

/// A finite number above zero, ignoring surrounding whitespace.
fn parse_positive(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}
