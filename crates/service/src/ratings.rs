//! Derived rating fields of services.
//!
//! `avg_rating` and `review_count` are a pure function of the reviews
//! collection. The aggregator recomputes them from source data and writes the
//! services collection back only when something changed. A service without
//! reviews, or a review pointing at a missing service, is "no data", never an
//! error.

use std::collections::HashMap;

use tracing::debug;

use models::ids::RecordId;
use models::listing::Service;
use models::review::{mean_rating, round_rating, Review};

use crate::errors::ServiceError;
use crate::storage::{Collection, RecordStore};

/// Rounded mean and count of the reviews of `service_id`.
pub fn aggregate(reviews: &[Review], service_id: RecordId) -> (f64, u32) {
    let (mean, count) = mean_rating(reviews.iter().filter(|r| r.service_id == service_id));
    (round_rating(mean), count)
}

fn set_rating(service: &mut Service, (avg, count): (f64, u32)) -> bool {
    if service.avg_rating == avg && service.review_count == count {
        return false;
    }
    service.avg_rating = avg;
    service.review_count = count;
    true
}

/// Recompute every service in place; returns whether any field changed.
pub fn apply_all(services: &mut [Service], reviews: &[Review]) -> bool {
    let mut by_service: HashMap<RecordId, Vec<&Review>> = HashMap::new();
    for review in reviews {
        by_service.entry(review.service_id).or_default().push(review);
    }
    let mut changed = false;
    for service in services.iter_mut() {
        let rating = match by_service.get(&service.id) {
            Some(rs) => {
                let (mean, count) = mean_rating(rs.iter().copied());
                (round_rating(mean), count)
            }
            None => (0.0, 0),
        };
        changed |= set_rating(service, rating);
    }
    changed
}

/// Recompute one service in place; `None` when it does not exist, otherwise
/// whether its fields changed.
pub fn apply_one(services: &mut [Service], reviews: &[Review], service_id: RecordId) -> Option<bool> {
    let service = services.iter_mut().find(|s| s.id == service_id)?;
    Some(set_rating(service, aggregate(reviews, service_id)))
}

#[derive(Clone)]
pub struct RatingAggregator {
    store: RecordStore,
}

impl RatingAggregator {
    pub fn new(store: RecordStore) -> Self { Self { store } }

    /// Refresh every service and return the refreshed collection.
    pub async fn recompute_all_ratings(&self) -> Result<Vec<Service>, ServiceError> {
        let mut services: Vec<Service> = self.store.load(Collection::Services).await;
        let reviews: Vec<Review> = self.store.load(Collection::Reviews).await;
        if apply_all(&mut services, &reviews) {
            self.store.save(Collection::Services, &services).await?;
            debug!(services = services.len(), reviews = reviews.len(), "ratings refreshed");
        }
        Ok(services)
    }

    /// Refresh a single service; `None` when it does not exist.
    pub async fn recompute_one(&self, service_id: RecordId) -> Result<Option<Service>, ServiceError> {
        let mut services: Vec<Service> = self.store.load(Collection::Services).await;
        let reviews: Vec<Review> = self.store.load(Collection::Reviews).await;
        match apply_one(&mut services, &reviews, service_id) {
            None => Ok(None),
            Some(changed) => {
                if changed {
                    self.store.save(Collection::Services, &services).await?;
                    debug!(service_id, "rating refreshed");
                }
                Ok(services.into_iter().find(|s| s.id == service_id))
            }
        }
    }
}
