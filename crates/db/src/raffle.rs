use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{event::Event, store::Row};

/// A drawable prize pool inside an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Raffle {
    pub id: String,
    pub name: String,
    /// How many winners the raffle is meant to produce.
    pub quantity: i64,
    /// Globally unique: the organizer code followed by an upper-cased suffix.
    pub code: String,
    pub event_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Row for Raffle {
    const TABLE: &'static str = "raffles";
}

impl Raffle {
    /// Composes the full raffle code for an organizer and a user-chosen
    /// suffix.
    pub fn compose_code(organizer_code: &str, suffix: &str) -> String {
        format!("{organizer_code}{}", suffix.trim().to_uppercase())
    }
}

/// A raffle fetched together with the event it belongs to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RaffleWithEvent {
    #[serde(flatten)]
    pub raffle: Raffle,
    #[serde(rename = "events", default)]
    pub event: Option<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRaffle {
    pub name: String,
    pub quantity: i64,
    pub code: String,
    pub event_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RaffleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}
