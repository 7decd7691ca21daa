use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    event::Event,
    storage::{ImageInput, WithImage},
    store::Row,
};

/// An exhibitor within an event, running its own prize wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub customization: Customization,
    pub event_id: String,
    /// Entry code collaborators use to check in.
    pub code: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Row for Company {
    const TABLE: &'static str = "companies";
}

/// Per-company presentation settings for the wheel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    #[serde(default)]
    pub segment_colors: Vec<String>,
}

/// A company fetched together with its event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompanyWithEvent {
    #[serde(flatten)]
    pub company: Company,
    #[serde(rename = "events", default)]
    pub event: Option<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCompany {
    pub name: String,
    #[serde(default)]
    pub logo: Option<ImageInput>,
    #[serde(default)]
    pub customization: Customization,
    pub event_id: String,
    pub code: String,
}

impl WithImage for NewCompany {
    fn image_slot(&mut self) -> &mut Option<ImageInput> {
        &mut self.logo
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<ImageInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization: Option<Customization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl WithImage for CompanyUpdate {
    fn image_slot(&mut self) -> &mut Option<ImageInput> {
        &mut self.logo
    }
}

/// A staff account scoped to one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub photo: Option<String>,
    /// Personal code, unique within the company.
    pub code: String,
    pub company_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Row for Collaborator {
    const TABLE: &'static str = "collaborators";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCollaborator {
    pub name: String,
    #[serde(default)]
    pub photo: Option<ImageInput>,
    pub code: String,
    pub company_id: String,
}

impl WithImage for NewCollaborator {
    fn image_slot(&mut self) -> &mut Option<ImageInput> {
        &mut self.photo
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollaboratorUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<ImageInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl WithImage for CollaboratorUpdate {
    fn image_slot(&mut self) -> &mut Option<ImageInput> {
        &mut self.photo
    }
}

/// A prize on a company's wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    pub id: String,
    pub name: String,
    pub company_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Row for Prize {
    const TABLE: &'static str = "prizes";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPrize {
    pub name: String,
    pub company_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PrizeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
