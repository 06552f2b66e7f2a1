use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{self, RecordId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

/// Which side of an appointment is acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Client,
    Provider,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pendente",
            Self::Confirmed => "Confirmado",
            Self::Completed => "Concluído",
            Self::Cancelled => "Cancelado",
        }
    }

    /// The conventional transition table:
    ///
    /// | from      | to        | actor              |
    /// |-----------|-----------|--------------------|
    /// | pending   | confirmed | provider           |
    /// | pending   | cancelled | client or provider |
    /// | confirmed | completed | provider           |
    pub fn can_transition(self, to: AppointmentStatus, actor: Party) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, to, actor),
            (Pending, Confirmed, Party::Provider)
                | (Pending, Cancelled, _)
                | (Confirmed, Completed, Party::Provider)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    #[serde(deserialize_with = "ids::loose")]
    pub id: RecordId,
    #[serde(deserialize_with = "ids::loose")]
    pub service_id: RecordId,
    /// Title at booking time.
    pub service_title: String,
    #[serde(deserialize_with = "ids::loose")]
    pub client_id: RecordId,
    pub client_name: String,
    #[serde(deserialize_with = "ids::loose")]
    pub provider_id: RecordId,
    pub provider_name: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub notes: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn involves(&self, user_id: RecordId) -> bool {
        self.client_id == user_id || self.provider_id == user_id
    }

    pub fn party_of(&self, user_id: RecordId) -> Option<Party> {
        if self.provider_id == user_id {
            Some(Party::Provider)
        } else if self.client_id == user_id {
            Some(Party::Client)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    #[serde(deserialize_with = "ids::loose")]
    pub service_id: RecordId,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub notes: Option<String>,
}
