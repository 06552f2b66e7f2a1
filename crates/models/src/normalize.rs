//! Coercion of loosely typed form input into canonical record shapes.
//!
//! Everything here is pure: no storage access, no clock.

use serde::{Deserialize, Serialize};

use crate::category::{Category, CategoryRef};
use crate::errors::ModelError;
use crate::ids::{self, RecordId};
use crate::listing::PriceUnit;

/// A list field as it may arrive from a form: a real list, a JSON array
/// encoded as a string, or a comma separated string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LooseList {
    Items(Vec<String>),
    Text(String),
}

impl From<Vec<&str>> for LooseList {
    fn from(items: Vec<&str>) -> Self { Self::Items(items.into_iter().map(String::from).collect()) }
}

impl From<&str> for LooseList {
    fn from(text: &str) -> Self { Self::Text(text.to_string()) }
}

/// A numeric field that may arrive as a number or as text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl From<f64> for LooseNumber {
    fn from(n: f64) -> Self { Self::Number(n) }
}

impl From<&str> for LooseNumber {
    fn from(text: &str) -> Self { Self::Text(text.to_string()) }
}

/// The category hints a service draft or patch may carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryDraft {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default, deserialize_with = "ids::loose_opt")]
    pub category_id: Option<RecordId>,
}

impl CategoryDraft {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.category_name.is_none() && self.category_id.is_none()
    }
}

/// Trimmed, non-empty entries of a loose list, in input order.
pub fn normalize_list(input: Option<&LooseList>) -> Vec<String> {
    match input {
        None => Vec::new(),
        Some(LooseList::Items(items)) => clean(items.iter().map(String::as_str)),
        Some(LooseList::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Vec::new();
            }
            match serde_json::from_str::<Vec<String>>(trimmed) {
                Ok(items) => clean(items.iter().map(String::as_str)),
                Err(_) => clean(trimmed.split(',')),
            }
        }
    }
}

fn clean<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    items.map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

/// Resolve the category triple: known slug, then display name, then numeric id,
/// then the catch-all `outros`.
pub fn resolve_category(draft: &CategoryDraft) -> CategoryRef {
    let by_slug = draft
        .category
        .as_deref()
        .and_then(|slug| Category::by_slug(&slug.trim().to_lowercase()));
    let by_name = || draft.category_name.as_deref().and_then(Category::by_name);
    let by_id = || draft.category_id.and_then(Category::by_id);

    by_slug
        .or_else(by_name)
        .or_else(by_id)
        .unwrap_or_else(Category::fallback)
        .to_ref()
}

/// Non-numeric input coerces to zero; negative prices are rejected.
pub fn normalize_price(input: Option<&LooseNumber>) -> Result<f64, ModelError> {
    let value = match input {
        None => 0.0,
        Some(LooseNumber::Number(n)) => *n,
        Some(LooseNumber::Text(s)) => {
            let s = s.trim();
            if s.is_empty() { 0.0 } else { s.parse::<f64>().unwrap_or(0.0) }
        }
    };
    if !value.is_finite() {
        return Ok(0.0);
    }
    if value < 0.0 {
        return Err(ModelError::validation("price must not be negative"));
    }
    Ok(value)
}

pub fn format_price(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    format!("{value:.2}")
}

/// Absent or blank means `service`; anything outside the four units is rejected.
pub fn normalize_price_unit(input: Option<&str>) -> Result<PriceUnit, ModelError> {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(PriceUnit::default()),
        Some(raw) => PriceUnit::parse(raw)
            .ok_or_else(|| ModelError::validation(format!("unknown price unit {raw:?}"))),
    }
}
