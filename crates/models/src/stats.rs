use serde::{Deserialize, Serialize};

/// Marketplace-wide counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    pub total_users: usize,
    pub total_services: usize,
    pub total_appointments: usize,
    /// Mean over every review, unrounded; 0 with no reviews.
    pub avg_rating: f64,
}

/// Counters scoped to one user, as client or provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    pub total_appointments: usize,
    pub pending_appointments: usize,
    pub confirmed_appointments: usize,
    pub completed_appointments: usize,
    pub cancelled_appointments: usize,
    pub total_services: usize,
    /// Mean over reviews of services this user provides.
    pub avg_rating: f64,
    pub total_reviews: usize,
}
