use chrono::Utc;
use tracing::{info, instrument, warn};

use models::ids::RecordId;
use models::review::{NewReview, Review};

use super::Marketplace;
use crate::errors::ServiceError;
use crate::storage::Collection;

impl Marketplace {
    /// Append a review by the session user and refresh that service's rating.
    /// A client may review the same service more than once. Once the review is
    /// saved the call succeeds; a failed refresh is logged and left to the next
    /// rating-bearing read.
    #[instrument(skip(self, input), fields(service_id = input.service_id, rating = input.rating))]
    pub async fn create_review(&self, input: NewReview) -> Result<Review, ServiceError> {
        self.simulate_latency().await;
        let me = self.session.require_user().await?;
        input.validate()?;
        let review = Review {
            id: self.next_id(),
            service_id: input.service_id,
            client_id: me.id,
            client_name: me.name,
            rating: input.rating,
            comment: input.comment,
            created_at: Utc::now(),
        };
        let mut reviews: Vec<Review> = self.store.load(Collection::Reviews).await;
        reviews.push(review.clone());
        self.store.save(Collection::Reviews, &reviews).await?;
        if let Err(e) = self.ratings().recompute_one(review.service_id).await {
            warn!(review_id = review.id, error = %e, "rating refresh failed after review saved");
        }
        info!(review_id = review.id, "review_created");
        Ok(review)
    }

    /// Reviews of a service, newest first.
    pub async fn get_reviews(&self, service_id: RecordId) -> Result<Vec<Review>, ServiceError> {
        self.simulate_latency().await;
        let reviews: Vec<Review> = self.store.load(Collection::Reviews).await;
        let mut found: Vec<Review> = reviews.into_iter().filter(|r| r.service_id == service_id).collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}
