use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    storage::{ImageInput, WithImage},
    store::Row,
};

/// An account which owns events and raffles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organizer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub responsible: Option<String>,
    pub email: String,
    /// Never written back out (in particular not into the session).
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    /// Prefix of every raffle code this organizer creates.
    pub organizer_code: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Row for Organizer {
    const TABLE: &'static str = "organizers";
}

impl Organizer {
    /// Organizer codes are short upper-case alphanumeric prefixes.
    pub fn validate_code(code: &str) -> bool {
        (2..=10).contains(&code.chars().count())
            && code
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewOrganizer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub photo: Option<ImageInput>,
    pub organizer_code: String,
}

impl WithImage for NewOrganizer {
    fn image_slot(&mut self) -> &mut Option<ImageInput> {
        &mut self.photo
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrganizerUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<ImageInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer_code: Option<String>,
}

impl WithImage for OrganizerUpdate {
    fn image_slot(&mut self) -> &mut Option<ImageInput> {
        &mut self.photo
    }
}

/// A super-admin account. Only read to check credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: String,
    pub email: String,
    pub password: String,
}

impl Row for Admin {
    const TABLE: &'static str = "admins";
}
