use chrono::Utc;
use tracing::{info, instrument, warn};

use models::appointment::{Appointment, AppointmentStatus, NewAppointment};
use models::ids::RecordId;
use models::listing::Service;

use super::Marketplace;
use crate::errors::ServiceError;
use crate::storage::Collection;

impl Marketplace {
    /// Book a service as the session user. Names are copied at booking time.
    #[instrument(skip(self, input), fields(service_id = input.service_id))]
    pub async fn create_appointment(&self, input: NewAppointment) -> Result<Appointment, ServiceError> {
        self.simulate_latency().await;
        let me = self.session.require_user().await?;
        if input.date.trim().is_empty() || input.time.trim().is_empty() {
            return Err(ServiceError::Validation("date and time required".into()));
        }
        let services: Vec<Service> = self.store.load(Collection::Services).await;
        let service = services
            .iter()
            .find(|s| s.id == input.service_id)
            .ok_or_else(|| ServiceError::not_found("service"))?;

        let appointment = Appointment {
            id: self.next_id(),
            service_id: service.id,
            service_title: service.title.clone(),
            client_id: me.id,
            client_name: me.name.clone(),
            provider_id: service.provider_id,
            provider_name: service.provider_name.clone(),
            date: input.date,
            time: input.time,
            notes: input.notes.unwrap_or_default(),
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
        };
        let mut appointments: Vec<Appointment> = self.store.load(Collection::Appointments).await;
        appointments.push(appointment.clone());
        self.store.save(Collection::Appointments, &appointments).await?;
        info!(appointment_id = appointment.id, client_id = me.id, provider_id = appointment.provider_id, "appointment_created");
        Ok(appointment)
    }

    /// Appointments where the session user is client or provider, optionally
    /// narrowed to one status. Empty without a session.
    pub async fn get_appointments(&self, status: Option<AppointmentStatus>) -> Result<Vec<Appointment>, ServiceError> {
        self.simulate_latency().await;
        let Some(me) = self.session.user().await else {
            return Ok(Vec::new());
        };
        let appointments: Vec<Appointment> = self.store.load(Collection::Appointments).await;
        Ok(appointments
            .into_iter()
            .filter(|a| a.involves(me.id))
            .filter(|a| status.map_or(true, |s| a.status == s))
            .collect())
    }

    /// Set the status of an appointment. With transition enforcement enabled
    /// the session user must be a party and the change must be in the table.
    #[instrument(skip(self))]
    pub async fn update_appointment_status(
        &self,
        id: RecordId,
        status: AppointmentStatus,
    ) -> Result<Appointment, ServiceError> {
        self.simulate_latency().await;
        let actor = if self.settings.enforce_transitions {
            Some(self.session.require_user().await?)
        } else {
            None
        };

        let mut appointments: Vec<Appointment> = self.store.load(Collection::Appointments).await;
        let appointment = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ServiceError::not_found("appointment"))?;

        if let Some(actor) = actor {
            let party = appointment.party_of(actor.id).ok_or(ServiceError::NotAuthorized)?;
            if !appointment.status.can_transition(status, party) {
                warn!(appointment_id = id, from = %appointment.status, to = %status, "transition rejected");
                return Err(ServiceError::InvalidTransition { from: appointment.status, to: status });
            }
        }

        let from = appointment.status;
        appointment.status = status;
        appointment.updated_at = Some(Utc::now());
        let updated = appointment.clone();
        self.store.save(Collection::Appointments, &appointments).await?;
        info!(appointment_id = id, %from, to = %status, "appointment_status_updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::MarketplaceSettings;
    use crate::test_support::{book, login_as, sample_draft, seeded, seeded_with};

    #[tokio::test]
    async fn booking_denormalizes_names() -> Result<(), anyhow::Error> {
        let (m, seed) = seeded().await?;
        login_as(&m, &seed.provider.email).await?;
        let service = m.create_service(sample_draft("Limpeza pesada")).await?;

        login_as(&m, &seed.client.email).await?;
        let missing = m
            .create_appointment(NewAppointment { service_id: -1, date: "2024-05-01".into(), time: "10:00".into(), notes: None })
            .await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));

        let appt = book(&m, service.id).await?;
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert_eq!(appt.service_title, "Limpeza pesada");
        assert_eq!(appt.client_name, seed.client.name);
        assert_eq!(appt.provider_id, seed.provider.id);
        assert_eq!(appt.provider_name, seed.provider.name);
        Ok(())
    }

    #[tokio::test]
    async fn appointments_are_scoped_to_participants() -> Result<(), anyhow::Error> {
        let (m, seed) = seeded().await?;
        login_as(&m, &seed.provider.email).await?;
        let service = m.create_service(sample_draft("Encanamento")).await?;
        login_as(&m, &seed.client.email).await?;
        let appt = book(&m, service.id).await?;

        assert_eq!(m.get_appointments(None).await?.len(), 1);
        login_as(&m, &seed.provider.email).await?;
        assert_eq!(m.get_appointments(Some(AppointmentStatus::Pending)).await?.len(), 1);
        assert!(m.get_appointments(Some(AppointmentStatus::Completed)).await?.is_empty());

        login_as(&m, &seed.other.email).await?;
        assert!(m.get_appointments(None).await?.is_empty());

        m.logout().await?;
        assert!(m.get_appointments(None).await?.is_empty());

        let updated = m.update_appointment_status(appt.id, AppointmentStatus::Completed).await?;
        assert_eq!(updated.status, AppointmentStatus::Completed);
        assert!(updated.updated_at.is_some());
        assert!(matches!(
            m.update_appointment_status(-5, AppointmentStatus::Cancelled).await,
            Err(ServiceError::NotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn enforced_transitions_follow_the_table() -> Result<(), anyhow::Error> {
        let settings = MarketplaceSettings { enforce_transitions: true, ..crate::test_support::settings() };
        let (m, seed) = seeded_with(settings).await?;
        login_as(&m, &seed.provider.email).await?;
        let service = m.create_service(sample_draft("Jardinagem")).await?;
        login_as(&m, &seed.client.email).await?;
        let appt = book(&m, service.id).await?;

        let client_confirm = m.update_appointment_status(appt.id, AppointmentStatus::Confirmed).await;
        assert!(matches!(
            client_confirm,
            Err(ServiceError::InvalidTransition { from: AppointmentStatus::Pending, to: AppointmentStatus::Confirmed })
        ));

        login_as(&m, &seed.other.email).await?;
        assert!(matches!(
            m.update_appointment_status(appt.id, AppointmentStatus::Cancelled).await,
            Err(ServiceError::NotAuthorized)
        ));

        login_as(&m, &seed.provider.email).await?;
        m.update_appointment_status(appt.id, AppointmentStatus::Confirmed).await?;
        m.update_appointment_status(appt.id, AppointmentStatus::Completed).await?;
        assert!(matches!(
            m.update_appointment_status(appt.id, AppointmentStatus::Pending).await,
            Err(ServiceError::InvalidTransition { .. })
        ));
        Ok(())
    }
}
