use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::CategoryRef;
use crate::errors::ModelError;
use crate::ids::{self, RecordId};
use crate::normalize::{
    normalize_list, normalize_price, normalize_price_unit, resolve_category, CategoryDraft, LooseList, LooseNumber,
};
use crate::user::PublicUser;

pub const DEFAULT_SERVICE_IMAGE: &str =
    "https://images.unsplash.com/photo-1552664730-d307ca884978?ixlib=rb-1.2.1&auto=format&fit=crop&w=800&q=60";
pub const STATUS_ACTIVE: &str = "active";
pub const DEFAULT_AVAILABILITY: &str = "flexible";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriceUnit {
    Hour,
    Day,
    #[default]
    Service,
    Visit,
}

impl PriceUnit {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "service" => Some(Self::Service),
            "visit" => Some(Self::Visit),
            _ => None,
        }
    }

    /// Display label shown next to the price.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hour => "hora",
            Self::Day => "dia",
            Self::Service => "serviço",
            Self::Visit => "visita",
        }
    }
}

/// A listing offered by a provider.
///
/// `avg_rating` and `review_count` are derived from the reviews collection and
/// only ever written by the rating aggregator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    #[serde(deserialize_with = "ids::loose")]
    pub id: RecordId,
    #[serde(deserialize_with = "ids::loose")]
    pub provider_id: RecordId,
    pub provider_name: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default, rename = "price_type")]
    pub price_unit: PriceUnit,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub availability: String,
    #[serde(default, deserialize_with = "ids::loose_uint")]
    pub experience_years: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub category: CategoryRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Advisory copy of the provider's photo; the user record is canonical.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub avg_rating: f64,
    #[serde(default)]
    pub review_count: u32,
}

/// Input for creating a service, as loosely typed as a web form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<LooseNumber>,
    #[serde(default)]
    pub price_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default, deserialize_with = "ids::loose_uint_opt")]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub images: Option<LooseList>,
    #[serde(default)]
    pub tags: Option<LooseList>,
    #[serde(flatten)]
    pub category: CategoryDraft,
}

/// Shallow update of a service; only present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<LooseNumber>,
    pub price_type: Option<String>,
    pub location: Option<String>,
    pub availability: Option<String>,
    #[serde(default, deserialize_with = "ids::loose_uint_opt")]
    pub experience_years: Option<u32>,
    pub images: Option<LooseList>,
    pub tags: Option<LooseList>,
    #[serde(flatten)]
    pub category: CategoryDraft,
    pub status: Option<String>,
}

impl Service {
    /// Build a new active listing owned by `provider`, normalizing every loose field.
    pub fn from_draft(
        id: RecordId,
        provider: &PublicUser,
        draft: ServiceDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        validate_title(&draft.title)?;
        let location = draft
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .unwrap_or_else(|| provider.location_label());
        Ok(Self {
            id,
            provider_id: provider.id,
            provider_name: provider.name.clone(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            price: normalize_price(draft.price.as_ref())?,
            price_unit: normalize_price_unit(draft.price_type.as_deref())?,
            location,
            availability: draft
                .availability
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AVAILABILITY.to_string()),
            experience_years: draft.experience_years.unwrap_or(0),
            images: normalize_list(draft.images.as_ref()),
            tags: normalize_list(draft.tags.as_ref()),
            category: resolve_category(&draft.category),
            status: Some(STATUS_ACTIVE.to_string()),
            profile_image: None,
            created_at: now,
            avg_rating: 0.0,
            review_count: 0,
        })
    }

    /// Merge `patch` into this service. Validation happens before any field is
    /// touched, so a rejected patch leaves the record unchanged.
    pub fn apply_patch(&mut self, patch: ServicePatch) -> Result<(), ModelError> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }
        let price = patch.price.as_ref().map(|p| normalize_price(Some(p))).transpose()?;
        let price_unit = patch.price_type.as_deref().map(|u| normalize_price_unit(Some(u))).transpose()?;

        if let Some(title) = patch.title { self.title = title.trim().to_string(); }
        if let Some(description) = patch.description { self.description = description; }
        if let Some(price) = price { self.price = price; }
        if let Some(unit) = price_unit { self.price_unit = unit; }
        if let Some(location) = patch.location { self.location = location; }
        if let Some(availability) = patch.availability { self.availability = availability; }
        if let Some(years) = patch.experience_years { self.experience_years = years; }
        if let Some(images) = patch.images { self.images = normalize_list(Some(&images)); }
        if let Some(tags) = patch.tags { self.tags = normalize_list(Some(&tags)); }
        if !patch.category.is_empty() { self.category = resolve_category(&patch.category); }
        if let Some(status) = patch.status { self.status = Some(status); }
        Ok(())
    }

    /// Services without a status predate the field and count as active.
    pub fn is_publicly_visible(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == STATUS_ACTIVE)
    }

    pub fn primary_image(&self) -> &str {
        self.images.first().map(String::as_str).unwrap_or(DEFAULT_SERVICE_IMAGE)
    }
}

fn validate_title(title: &str) -> Result<(), ModelError> {
    if title.trim().is_empty() {
        return Err(ModelError::validation("title required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Role;

    fn provider() -> PublicUser {
        PublicUser {
            id: 9,
            name: "Carlos Mendes".into(),
            email: "carlos@example.com".into(),
            role: Role::Provider,
            phone: String::new(),
            address: String::new(),
            city: "Marília".into(),
            state: "SP".into(),
            profile_image: String::new(),
        }
    }

    fn draft() -> ServiceDraft {
        ServiceDraft {
            title: "Pintura residencial".into(),
            description: "Paredes e tetos".into(),
            price: Some(LooseNumber::from("150")),
            images: Some(LooseList::from("a.jpg, b.jpg")),
            tags: Some(LooseList::from(vec!["pintura", " "])),
            category: CategoryDraft { category_name: Some("pintura".into()), ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn from_draft_normalizes_and_defaults() -> anyhow::Result<()> {
        let svc = Service::from_draft(1, &provider(), draft(), Utc::now())?;
        assert_eq!(svc.price, 150.0);
        assert_eq!(svc.price_unit, PriceUnit::Service);
        assert_eq!(svc.location, "Marília, SP");
        assert_eq!(svc.availability, DEFAULT_AVAILABILITY);
        assert_eq!(svc.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(svc.tags, vec!["pintura"]);
        assert_eq!(svc.category.category, "pintura");
        assert_eq!(svc.provider_id, 9);
        assert_eq!((svc.avg_rating, svc.review_count), (0.0, 0));
        assert!(svc.is_publicly_visible());
        assert_eq!(svc.primary_image(), "a.jpg");
        Ok(())
    }

    #[test]
    fn from_draft_rejects_blank_title() {
        let bad = ServiceDraft { title: "  ".into(), ..draft() };
        assert!(Service::from_draft(1, &provider(), bad, Utc::now()).is_err());
    }

    #[test]
    fn patch_is_shallow_and_atomic() -> anyhow::Result<()> {
        let mut svc = Service::from_draft(1, &provider(), draft(), Utc::now())?;
        svc.apply_patch(ServicePatch { price: Some(LooseNumber::from(99.9)), ..Default::default() })?;
        assert_eq!(svc.price, 99.9);
        assert_eq!(svc.title, "Pintura residencial");
        assert_eq!(svc.category.category, "pintura");

        let before = svc.clone();
        let bad = ServicePatch {
            title: Some("Novo".into()),
            price_type: Some("fortnight".into()),
            ..Default::default()
        };
        assert!(svc.apply_patch(bad).is_err());
        assert_eq!(svc, before);
        Ok(())
    }

    #[test]
    fn stored_record_round_trips_with_flattened_category() -> anyhow::Result<()> {
        let svc = Service::from_draft(1, &provider(), draft(), Utc::now())?;
        let json = serde_json::to_value(&svc)?;
        assert_eq!(json["category"], "pintura");
        assert_eq!(json["category_id"], 3);
        assert_eq!(json["price_type"], "service");
        let back: Service = serde_json::from_value(json)?;
        assert_eq!(back, svc);
        Ok(())
    }

    #[test]
    fn missing_status_is_visible() -> anyhow::Result<()> {
        let mut svc = Service::from_draft(1, &provider(), draft(), Utc::now())?;
        svc.status = None;
        assert!(svc.is_publicly_visible());
        svc.status = Some("cancelled".into());
        assert!(!svc.is_publicly_visible());
        Ok(())
    }

    #[test]
    fn form_string_experience_years_decode() -> anyhow::Result<()> {
        let svc = Service::from_draft(1, &provider(), draft(), Utc::now())?;
        let mut json = serde_json::to_value(&svc)?;
        json["experience_years"] = serde_json::json!("5");
        let back: Service = serde_json::from_value(json)?;
        assert_eq!(back.experience_years, 5);

        let patch: ServicePatch = serde_json::from_str(r#"{"experience_years": "7"}"#)?;
        assert_eq!(patch.experience_years, Some(7));
        Ok(())
    }
}
