#![cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use models::appointment::{Appointment, NewAppointment};
use models::category::CategoryRef;
use models::ids::RecordId;
use models::listing::{PriceUnit, Service, ServiceDraft};
use models::normalize::LooseNumber;
use models::review::Review;
use models::user::{PublicUser, Role};

use crate::auth::domain::{AuthSession, LoginInput, RegisterInput};
use crate::errors::ServiceError;
use crate::marketplace::{Marketplace, MarketplaceSettings};
use crate::storage::{KvBackend, MemoryKv};

pub const PASSWORD: &str = "123456";

/// No latency and a poll interval long enough that only the first tick runs.
pub fn settings() -> MarketplaceSettings {
    MarketplaceSettings {
        latency: Duration::ZERO,
        poll_interval: Duration::from_secs(3600),
        enforce_transitions: false,
    }
}

pub async fn marketplace() -> Arc<Marketplace> {
    Marketplace::new(Arc::new(MemoryKv::new()), "servlink_", settings()).await
}

/// Memory medium whose writes can be made to fail for keys with a given suffix.
#[derive(Default)]
pub struct FlakyKv {
    inner: MemoryKv,
    failing_suffix: Mutex<Option<String>>,
}

impl FlakyKv {
    pub fn fail_writes_to(&self, suffix: &str) {
        *self.failing_suffix.lock().unwrap() = Some(suffix.to_string());
    }

    fn check(&self, key: &str) -> Result<(), ServiceError> {
        match self.failing_suffix.lock().unwrap().as_deref() {
            Some(suffix) if key.ends_with(suffix) => Err(ServiceError::Storage(format!("write to {key} refused"))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl KvBackend for FlakyKv {
    async fn get(&self, key: &str) -> Option<String> { self.inner.get(key).await }

    async fn set(&self, key: &str, value: String) -> Result<(), ServiceError> {
        self.check(key)?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<bool, ServiceError> {
        self.check(key)?;
        self.inner.remove(key).await
    }
}

pub struct Seed {
    pub client: PublicUser,
    pub provider: PublicUser,
    /// A second client with no appointments.
    pub other: PublicUser,
}

pub fn register_input(email: &str, role: Role) -> RegisterInput {
    RegisterInput {
        name: format!("User {email}"),
        email: email.into(),
        password: PASSWORD.into(),
        phone: String::new(),
        address: String::new(),
        city: "Marília".into(),
        state: "SP".into(),
        role,
    }
}

pub async fn seeded_with(settings: MarketplaceSettings) -> Result<(Arc<Marketplace>, Seed), anyhow::Error> {
    let m = Marketplace::new(Arc::new(MemoryKv::new()), "servlink_", settings).await;
    let client = m.register(register_input("maria@example.com", Role::Client)).await?.user;
    let provider = m.register(register_input("carlos@example.com", Role::Provider)).await?.user;
    let other = m.register(register_input("joao@example.com", Role::Client)).await?.user;
    Ok((m, Seed { client, provider, other }))
}

pub async fn seeded() -> Result<(Arc<Marketplace>, Seed), anyhow::Error> {
    seeded_with(settings()).await
}

pub async fn login_as(m: &Arc<Marketplace>, email: &str) -> Result<AuthSession, anyhow::Error> {
    Ok(m.login(LoginInput { email: email.into(), password: PASSWORD.into() }).await?)
}

/// Book `service_id` as the session user.
pub async fn book(m: &Marketplace, service_id: RecordId) -> Result<Appointment, anyhow::Error> {
    let input = NewAppointment {
        service_id,
        date: "2024-05-01".into(),
        time: "10:00".into(),
        notes: Some("portão azul".into()),
    };
    Ok(m.create_appointment(input).await?)
}

pub fn sample_draft(title: &str) -> ServiceDraft {
    ServiceDraft {
        title: title.into(),
        description: format!("{title} com garantia"),
        price: Some(LooseNumber::from(120.0)),
        ..Default::default()
    }
}

pub fn sample_service(id: RecordId, provider_id: RecordId, status: &str) -> Service {
    Service {
        id,
        provider_id,
        provider_name: "Carlos".into(),
        title: format!("Serviço {id}"),
        description: String::new(),
        price: 100.0,
        price_unit: PriceUnit::Service,
        location: "Marília, SP".into(),
        availability: "flexible".into(),
        experience_years: 0,
        images: Vec::new(),
        tags: Vec::new(),
        category: CategoryRef::default(),
        status: Some(status.into()),
        profile_image: None,
        created_at: Utc::now(),
        avg_rating: 0.0,
        review_count: 0,
    }
}

pub fn sample_review(id: RecordId, service_id: RecordId, rating: u8) -> Review {
    Review {
        id,
        service_id,
        client_id: 5,
        client_name: "Maria".into(),
        rating,
        comment: String::new(),
        created_at: Utc::now(),
    }
}
