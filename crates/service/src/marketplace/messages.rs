use chrono::Utc;
use tracing::{debug, instrument};

use models::ids::RecordId;
use models::message::{Message, NewMessage};

use super::Marketplace;
use crate::errors::ServiceError;
use crate::storage::Collection;

impl Marketplace {
    #[instrument(skip(self, input), fields(appointment_id = input.appointment_id))]
    pub async fn send_message(&self, input: NewMessage) -> Result<Message, ServiceError> {
        self.simulate_latency().await;
        let me = self.session.require_user().await?;
        if input.message.trim().is_empty() {
            return Err(ServiceError::Validation("message required".into()));
        }
        let message = Message {
            id: self.next_id(),
            appointment_id: input.appointment_id,
            sender_id: me.id,
            sender_name: me.name,
            receiver_id: input.receiver_id,
            body: input.message,
            created_at: Utc::now(),
        };
        let mut messages: Vec<Message> = self.store.load(Collection::Messages).await;
        messages.push(message.clone());
        self.store.save(Collection::Messages, &messages).await?;
        debug!(message_id = message.id, "message_sent");
        Ok(message)
    }

    /// Messages of one appointment in the order they were stored.
    pub async fn get_messages(&self, appointment_id: RecordId) -> Result<Vec<Message>, ServiceError> {
        self.simulate_latency().await;
        let messages: Vec<Message> = self.store.load(Collection::Messages).await;
        Ok(messages.into_iter().filter(|m| m.appointment_id == appointment_id).collect())
    }
}
