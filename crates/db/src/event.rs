use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    storage::{ImageInput, WithImage},
    store::Row,
};

/// A container for raffles and exhibitor companies, owned by one organizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    pub organizer_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Row for Event {
    const TABLE: &'static str = "events";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewEvent {
    pub name: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default)]
    pub banner: Option<ImageInput>,
    pub organizer_id: String,
}

impl WithImage for NewEvent {
    fn image_slot(&mut self) -> &mut Option<ImageInput> {
        &mut self.banner
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<ImageInput>,
}

impl WithImage for EventUpdate {
    fn image_slot(&mut self) -> &mut Option<ImageInput> {
        &mut self.banner
    }
}
