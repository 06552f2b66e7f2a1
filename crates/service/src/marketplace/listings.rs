use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, instrument};

use models::category::{Category, CATEGORIES};
use models::ids::{self, RecordId};
use models::listing::{Service, ServiceDraft, ServicePatch};
use models::user::Role;

use super::Marketplace;
use crate::errors::ServiceError;
use crate::storage::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Highest average first.
    Rating,
    /// Cheapest first.
    Price,
    /// Newest first.
    Recent,
}

/// Query for [`Marketplace::search_services`]. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Restrict to one provider and show their services in every status.
    #[serde(default, alias = "user_id", deserialize_with = "ids::loose_opt")]
    pub owner_id: Option<RecordId>,
    /// Slug, numeric id or display name.
    #[serde(default, alias = "category_id", deserialize_with = "category_key")]
    pub category: Option<String>,
    pub search: Option<String>,
    pub location: Option<String>,
    pub sort: Option<SortBy>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryKey {
    Id(i64),
    Text(String),
}

/// Category ids arrive as numbers or strings; both become the filter text.
fn category_key<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<CategoryKey>::deserialize(d)?.map(|key| match key {
        CategoryKey::Id(id) => id.to_string(),
        CategoryKey::Text(text) => text,
    }))
}

fn matches_category(service: &Service, filter: &str) -> bool {
    let filter = filter.trim();
    let numeric = filter.parse::<RecordId>().ok();
    let wanted = numeric.and_then(Category::by_id).map(|c| c.slug).unwrap_or(filter);
    let c = &service.category;
    c.category == wanted
        || c.category == filter
        || numeric == Some(c.category_id)
        || c.category_name.to_lowercase() == wanted.to_lowercase()
}

fn matches_text(service: &Service, needle: &str) -> bool {
    service.title.to_lowercase().contains(needle)
        || service.description.to_lowercase().contains(needle)
        || service.provider_name.to_lowercase().contains(needle)
        || service.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

/// Filter, sort and truncate `services` in memory. Ratings are used as they
/// are; callers refresh them first.
pub fn apply_filters(services: Vec<Service>, filters: &SearchFilters) -> Vec<Service> {
    let category = filters.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let search = filters.search.as_deref().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
    let location = filters.location.as_deref().map(|l| l.trim().to_lowercase()).filter(|l| !l.is_empty());

    let mut found: Vec<Service> = services
        .into_iter()
        .filter(|s| match filters.owner_id {
            Some(owner) => s.provider_id == owner,
            None => s.is_publicly_visible(),
        })
        .filter(|s| category.map_or(true, |c| matches_category(s, c)))
        .filter(|s| search.as_deref().map_or(true, |q| matches_text(s, q)))
        .filter(|s| location.as_deref().map_or(true, |l| s.location.to_lowercase().contains(l)))
        .collect();

    match filters.sort {
        Some(SortBy::Rating) => found.sort_by(|a, b| b.avg_rating.total_cmp(&a.avg_rating)),
        Some(SortBy::Price) => found.sort_by(|a, b| a.price.total_cmp(&b.price)),
        Some(SortBy::Recent) => found.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        None => {}
    }
    if let Some(limit) = filters.limit.filter(|l| *l > 0) {
        found.truncate(limit);
    }
    found
}

impl Marketplace {
    /// Refresh ratings, then query listings.
    #[instrument(skip(self, filters))]
    pub async fn search_services(&self, filters: &SearchFilters) -> Result<Vec<Service>, ServiceError> {
        self.simulate_latency().await;
        let services = self.ratings().recompute_all_ratings().await?;
        let found = apply_filters(services, filters);
        debug!(results = found.len(), "services searched");
        Ok(found)
    }

    pub async fn get_service(&self, id: RecordId) -> Result<Service, ServiceError> {
        self.simulate_latency().await;
        self.ratings().recompute_one(id).await?.ok_or_else(|| ServiceError::not_found("service"))
    }

    /// Every service owned by `user_id`, whatever its status.
    pub async fn get_user_services(&self, user_id: RecordId) -> Result<Vec<Service>, ServiceError> {
        self.search_services(&SearchFilters { owner_id: Some(user_id), ..Default::default() }).await
    }

    pub fn get_categories(&self) -> &'static [Category] { &CATEGORIES }

    /// Publish a listing as the session's provider.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_service(&self, draft: ServiceDraft) -> Result<Service, ServiceError> {
        self.simulate_latency().await;
        let me = self.session.require_user().await?;
        if me.role != Role::Provider {
            return Err(ServiceError::NotAuthorized);
        }
        let service = Service::from_draft(self.next_id(), &me, draft, Utc::now())?;

        let mut services: Vec<Service> = self.store.load(Collection::Services).await;
        services.push(service.clone());
        self.store.save(Collection::Services, &services).await?;
        info!(service_id = service.id, provider_id = me.id, category = %service.category.category, "service_created");
        Ok(service)
    }

    /// Shallow merge of `patch` into a service owned by the session user.
    #[instrument(skip(self, patch))]
    pub async fn update_service(&self, id: RecordId, patch: ServicePatch) -> Result<Service, ServiceError> {
        self.simulate_latency().await;
        let me = self.session.require_user().await?;
        let mut services: Vec<Service> = self.store.load(Collection::Services).await;
        let service = services.iter_mut().find(|s| s.id == id).ok_or_else(|| ServiceError::not_found("service"))?;
        if service.provider_id != me.id {
            return Err(ServiceError::NotAuthorized);
        }
        service.apply_patch(patch)?;
        let updated = service.clone();
        self.store.save(Collection::Services, &services).await?;
        info!(service_id = id, "service_updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_service(&self, id: RecordId) -> Result<(), ServiceError> {
        self.simulate_latency().await;
        let me = self.session.require_user().await?;
        let mut services: Vec<Service> = self.store.load(Collection::Services).await;
        let idx = services.iter().position(|s| s.id == id).ok_or_else(|| ServiceError::not_found("service"))?;
        if services[idx].provider_id != me.id {
            return Err(ServiceError::NotAuthorized);
        }
        services.remove(idx);
        self.store.save(Collection::Services, &services).await?;
        info!(service_id = id, "service_deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{login_as, sample_draft, sample_service, seeded};
    use models::normalize::{normalize_list, resolve_category, CategoryDraft, LooseList, LooseNumber};

    #[test]
    fn category_filter_accepts_slug_id_and_name() {
        let mut s = sample_service(1, 9, "active");
        s.category = Category::by_slug("eletrica").map(Category::to_ref).unwrap_or_default();
        for filter in ["eletrica", "4", "Elétrica", "ELÉTRICA"] {
            assert!(matches_category(&s, filter), "{filter}");
        }
        assert!(!matches_category(&s, "pintura"));
        assert!(!matches_category(&s, "3"));
    }

    #[test]
    fn sort_and_limit_apply_in_order() {
        let mut cheap = sample_service(1, 9, "active");
        cheap.price = 50.0;
        cheap.avg_rating = 3.0;
        let mut pricey = sample_service(2, 9, "active");
        pricey.price = 200.0;
        pricey.avg_rating = 4.8;
        pricey.created_at = cheap.created_at + chrono::Duration::seconds(5);
        let all = vec![cheap, pricey];

        let by_rating = apply_filters(all.clone(), &SearchFilters { sort: Some(SortBy::Rating), ..Default::default() });
        assert_eq!(by_rating.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2, 1]);
        let by_price = apply_filters(all.clone(), &SearchFilters { sort: Some(SortBy::Price), ..Default::default() });
        assert_eq!(by_price.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2]);
        let recent = apply_filters(
            all,
            &SearchFilters { sort: Some(SortBy::Recent), limit: Some(1), ..Default::default() },
        );
        assert_eq!(recent.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn text_and_location_filters_are_case_insensitive() {
        let mut s = sample_service(1, 9, "active");
        s.tags = vec!["Hidráulica".into()];
        s.location = "Marília, SP".into();
        let found = apply_filters(
            vec![s],
            &SearchFilters { search: Some("hidrá".into()), location: Some("marília".into()), ..Default::default() },
        );
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn filters_decode_legacy_names() -> anyhow::Result<()> {
        let f: SearchFilters = serde_json::from_str(r#"{"user_id": "12", "category_id": "3", "sort": "price"}"#)?;
        assert_eq!(f.owner_id, Some(12));
        assert_eq!(f.category.as_deref(), Some("3"));
        assert_eq!(f.sort, Some(SortBy::Price));

        let numeric: SearchFilters = serde_json::from_str(r#"{"category_id": 3}"#)?;
        assert_eq!(numeric.category.as_deref(), Some("3"));
        Ok(())
    }

    #[tokio::test]
    async fn create_then_owner_search_round_trips() -> Result<(), anyhow::Error> {
        let (m, seed) = seeded().await?;
        let draft = ServiceDraft {
            title: "Jardim".into(),
            images: Some(LooseList::from(r#"["a.jpg", " ", "b.jpg"]"#)),
            tags: Some(LooseList::from("poda, grama")),
            price: Some(LooseNumber::from("80")),
            category: CategoryDraft { category_name: Some("JARDINAGEM".into()), ..Default::default() },
            ..Default::default()
        };
        let expected_images = normalize_list(draft.images.as_ref());
        let expected_tags = normalize_list(draft.tags.as_ref());
        let expected_category = resolve_category(&draft.category);

        assert!(matches!(m.create_service(draft.clone()).await, Err(ServiceError::NotAuthorized)));
        login_as(&m, &seed.client.email).await?;
        assert!(matches!(m.create_service(draft.clone()).await, Err(ServiceError::NotAuthorized)));

        login_as(&m, &seed.provider.email).await?;
        let created = m.create_service(draft).await?;
        assert_eq!(created.location, "Marília, SP");
        assert!(created.profile_image.is_none());

        let mine = m.get_user_services(seed.provider.id).await?;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, created.id);
        assert_eq!(mine[0].images, expected_images);
        assert_eq!(mine[0].tags, expected_tags);
        assert_eq!(mine[0].category, expected_category);
        assert_eq!((mine[0].avg_rating, mine[0].review_count), (0.0, 0));
        Ok(())
    }

    #[tokio::test]
    async fn create_keeps_rows_written_with_string_counts() -> Result<(), anyhow::Error> {
        let (m, seed) = seeded().await?;
        let mut legacy = serde_json::to_value(sample_service(1, seed.provider.id, "active"))?;
        legacy["experience_years"] = serde_json::json!("5");
        let plain = serde_json::to_value(sample_service(2, seed.provider.id, "active"))?;
        m.store().set_raw("services", serde_json::to_string(&[legacy, plain])?).await?;

        login_as(&m, &seed.provider.email).await?;
        assert_eq!(m.search_services(&SearchFilters::default()).await?.len(), 2);
        m.create_service(sample_draft("Pintura")).await?;

        let stored: Vec<Service> = m.store().load(Collection::Services).await;
        assert_eq!(stored.len(), 3);
        assert_eq!(stored.iter().find(|s| s.id == 1).map(|s| s.experience_years), Some(5));
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_services_are_visible_only_to_owner_queries() -> Result<(), anyhow::Error> {
        let (m, seed) = seeded().await?;
        login_as(&m, &seed.provider.email).await?;
        let s = m.create_service(sample_draft("Faxina")).await?;
        m.update_service(s.id, ServicePatch { status: Some("cancelled".into()), ..Default::default() }).await?;

        assert!(m.search_services(&SearchFilters::default()).await?.is_empty());
        let owner = m
            .search_services(&SearchFilters { owner_id: Some(seed.provider.id), ..Default::default() })
            .await?;
        assert_eq!(owner.len(), 1);
        assert_eq!(m.get_service(s.id).await?.status.as_deref(), Some("cancelled"));
        Ok(())
    }

    #[tokio::test]
    async fn update_and_delete_check_existence_and_owner() -> Result<(), anyhow::Error> {
        let (m, seed) = seeded().await?;
        login_as(&m, &seed.provider.email).await?;
        let s = m.create_service(sample_draft("Reparo")).await?;

        let patched = m
            .update_service(s.id, ServicePatch { title: Some("Reparo geral".into()), ..Default::default() })
            .await?;
        assert_eq!(patched.title, "Reparo geral");
        assert_eq!(patched.description, s.description);
        assert_eq!(patched.category, s.category);

        assert!(matches!(m.update_service(-1, ServicePatch::default()).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(m.delete_service(-1).await, Err(ServiceError::NotFound(_))));

        login_as(&m, &seed.client.email).await?;
        assert!(matches!(m.delete_service(s.id).await, Err(ServiceError::NotAuthorized)));

        login_as(&m, &seed.provider.email).await?;
        m.delete_service(s.id).await?;
        assert!(matches!(m.get_service(s.id).await, Err(ServiceError::NotFound(_))));
        assert_eq!(m.get_categories().len(), 7);
        Ok(())
    }
}
