//! Who is using the application, and what they have selected.
//!
//! The session is an explicit value: operations receive it (through
//! [`crate::sync::SyncContext`]) rather than reading ambient state. It is
//! persisted as six independent keyed values through a [`SessionStorage`].

use db::{company::Collaborator, organizer::Organizer};
use rocket::http::{Cookie, CookieJar};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use ui::Viewer;

use crate::sync::scope::Scope;

pub const ORGANIZER_KEY: &str = "raffle_organizer";
pub const COLLABORATOR_KEY: &str = "raffle_collaborator";
pub const SELECTED_EVENT_KEY: &str = "raffle_selected_event";
pub const SELECTED_RAFFLE_KEY: &str = "raffle_selected_raffle";
pub const SUPER_ADMIN_KEY: &str = "raffle_super_admin";
pub const IMPERSONATING_KEY: &str = "raffle_impersonating";

/// Keyed string storage which outlives a single request (or page load).
pub trait SessionStorage {
    fn read(&self, key: &'static str) -> Option<String>;
    /// Stores the value, or removes the key when given `None`.
    fn write(&self, key: &'static str, value: Option<String>);
}

impl SessionStorage for CookieJar<'_> {
    fn read(&self, key: &'static str) -> Option<String> {
        self.get_private(key).map(|cookie| cookie.value().to_string())
    }

    fn write(&self, key: &'static str, value: Option<String>) {
        match value {
            Some(value) => self.add_private(Cookie::new(key, value)),
            None => self.remove_private(Cookie::from(key)),
        }
    }
}

/// Storage held in memory, for tests and tools.
#[derive(Default)]
pub struct MemorySessionStorage {
    values: parking_lot::Mutex<std::collections::HashMap<&'static str, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn read(&self, key: &'static str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn write(&self, key: &'static str, value: Option<String>) {
        let mut values = self.values.lock();
        match value {
            Some(value) => {
                values.insert(key, value);
            }
            None => {
                values.remove(key);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub organizer: Option<Organizer>,
    pub collaborator: Option<Collaborator>,
    pub selected_event_id: Option<String>,
    pub selected_raffle_id: Option<String>,
    pub super_admin: bool,
    /// Whether the organizer session was entered by a super-admin viewing
    /// as that organizer.
    pub impersonating: bool,
}

impl SessionState {
    /// The organizer whose data is in effect.
    ///
    /// An impersonated organizer wins over the super-admin flag; otherwise a
    /// super-admin session hides any stored organizer.
    pub fn effective_organizer(&self) -> Option<&Organizer> {
        if self.impersonating {
            self.organizer.as_ref()
        } else if self.super_admin {
            None
        } else {
            self.organizer.as_ref()
        }
    }

    /// Whether the super-admin is acting as themselves (not viewing as an
    /// organizer).
    pub fn acting_as_super_admin(&self) -> bool {
        self.super_admin && !self.impersonating
    }

    /// The slice of the store this session may see.
    pub fn scope(&self) -> Scope {
        if let Some(organizer) = self.effective_organizer() {
            Scope::Organizer(organizer.id.clone())
        } else if self.super_admin {
            Scope::Admin
        } else if let Some(collaborator) = &self.collaborator {
            Scope::Collaborator {
                collaborator_id: collaborator.id.clone(),
                company_id: collaborator.company_id.clone(),
            }
        } else {
            Scope::Anonymous
        }
    }

    pub fn viewer(&self) -> Viewer {
        match self.scope() {
            Scope::Organizer(_) => Viewer::Organizer {
                name: self
                    .effective_organizer()
                    .map(|o| o.name.clone())
                    .unwrap_or_default(),
                impersonated: self.impersonating,
            },
            Scope::Admin => Viewer::SuperAdmin,
            Scope::Collaborator { .. } => Viewer::Collaborator(
                self.collaborator
                    .as_ref()
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
            ),
            Scope::Anonymous => Viewer::Anonymous,
        }
    }

    pub fn select_event(&mut self, event_id: Option<String>) {
        if self.selected_event_id != event_id {
            self.selected_raffle_id = None;
        }
        self.selected_event_id = event_id;
    }

    pub fn select_raffle(&mut self, raffle_id: Option<String>) {
        self.selected_raffle_id = raffle_id;
    }

    /// Reads every key; values which cannot be decoded are dropped from the
    /// storage and treated as absent.
    pub fn load(storage: &dyn SessionStorage) -> Self {
        SessionState {
            organizer: read_json(storage, ORGANIZER_KEY),
            collaborator: read_json(storage, COLLABORATOR_KEY),
            selected_event_id: storage.read(SELECTED_EVENT_KEY),
            selected_raffle_id: storage.read(SELECTED_RAFFLE_KEY),
            super_admin: read_flag(storage, SUPER_ADMIN_KEY),
            impersonating: read_flag(storage, IMPERSONATING_KEY),
        }
    }

    pub fn save(&self, storage: &dyn SessionStorage) {
        storage.write(ORGANIZER_KEY, write_json(&self.organizer));
        storage.write(COLLABORATOR_KEY, write_json(&self.collaborator));
        storage.write(SELECTED_EVENT_KEY, self.selected_event_id.clone());
        storage.write(SELECTED_RAFFLE_KEY, self.selected_raffle_id.clone());
        storage.write(SUPER_ADMIN_KEY, self.super_admin.then(|| "true".into()));
        storage.write(
            IMPERSONATING_KEY,
            self.impersonating.then(|| "true".into()),
        );
    }
}

fn read_json<T: DeserializeOwned>(
    storage: &dyn SessionStorage,
    key: &'static str,
) -> Option<T> {
    let raw = storage.read(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            // a malformed value would otherwise stick around and keep the
            // session broken
            tracing::warn!("discarding malformed session value `{key}`: {e}");
            storage.write(key, None);
            None
        }
    }
}

fn write_json<T: Serialize>(value: &Option<T>) -> Option<String> {
    value
        .as_ref()
        .and_then(|value| serde_json::to_string(value).ok())
}

fn read_flag(storage: &dyn SessionStorage, key: &'static str) -> bool {
    storage.read(key).as_deref() == Some("true")
}
