use std::collections::HashSet;

use models::appointment::{Appointment, AppointmentStatus};
use models::ids::RecordId;
use models::listing::Service;
use models::review::{mean_rating, Review};
use models::stats::{Stats, UserStats};
use models::user::User;

use super::Marketplace;
use crate::errors::ServiceError;
use crate::storage::Collection;

/// Counters for `user_id` over already loaded collections.
pub fn user_stats(user_id: RecordId, appointments: &[Appointment], services: &[Service], reviews: &[Review]) -> UserStats {
    let mine: Vec<&Appointment> = appointments.iter().filter(|a| a.involves(user_id)).collect();
    let count = |status: AppointmentStatus| mine.iter().filter(|a| a.status == status).count();
    let owned: HashSet<RecordId> = services.iter().filter(|s| s.provider_id == user_id).map(|s| s.id).collect();
    let (avg_rating, total_reviews) = mean_rating(reviews.iter().filter(|r| owned.contains(&r.service_id)));
    UserStats {
        total_appointments: mine.len(),
        pending_appointments: count(AppointmentStatus::Pending),
        confirmed_appointments: count(AppointmentStatus::Confirmed),
        completed_appointments: count(AppointmentStatus::Completed),
        cancelled_appointments: count(AppointmentStatus::Cancelled),
        total_services: owned.len(),
        avg_rating,
        total_reviews: total_reviews as usize,
    }
}

impl Marketplace {
    /// Marketplace-wide counters; the rating is the mean over every review.
    pub async fn get_stats(&self) -> Result<Stats, ServiceError> {
        self.simulate_latency().await;
        let users: Vec<User> = self.store.load(Collection::Users).await;
        let services: Vec<Service> = self.store.load(Collection::Services).await;
        let appointments: Vec<Appointment> = self.store.load(Collection::Appointments).await;
        let reviews: Vec<Review> = self.store.load(Collection::Reviews).await;
        Ok(Stats {
            total_users: users.len(),
            total_services: services.len(),
            total_appointments: appointments.len(),
            avg_rating: mean_rating(&reviews).0,
        })
    }

    pub async fn get_user_stats(&self, user_id: RecordId) -> Result<UserStats, ServiceError> {
        self.simulate_latency().await;
        let appointments: Vec<Appointment> = self.store.load(Collection::Appointments).await;
        let services: Vec<Service> = self.store.load(Collection::Services).await;
        let reviews: Vec<Review> = self.store.load(Collection::Reviews).await;
        Ok(user_stats(user_id, &appointments, &services, &reviews))
    }
}
