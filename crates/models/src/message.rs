use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{self, RecordId};

/// Chat line attached to an appointment. Append only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(deserialize_with = "ids::loose")]
    pub id: RecordId,
    #[serde(deserialize_with = "ids::loose")]
    pub appointment_id: RecordId,
    #[serde(deserialize_with = "ids::loose")]
    pub sender_id: RecordId,
    pub sender_name: String,
    #[serde(deserialize_with = "ids::loose")]
    pub receiver_id: RecordId,
    #[serde(rename = "message")]
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(deserialize_with = "ids::loose")]
    pub appointment_id: RecordId,
    #[serde(deserialize_with = "ids::loose")]
    pub receiver_id: RecordId,
    pub message: String,
}
