//! Raffle creation, lookup by code and participant registration.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use db::{
    event::NewEvent,
    participant::{NewParticipant, Participant},
    raffle::{NewRaffle, Raffle, RaffleWithEvent},
    Query, Row,
};
use rocket::tokio::sync::Mutex as AsyncMutex;

use crate::{
    error::{Error, Result, DUPLICATE_EMAIL, RAFFLE_FULL},
    sync::{
        mutations::{non_empty, valid_quantity},
        SyncContext,
    },
    util::{is_valid_code, is_valid_email, normalize_code, normalize_email},
};

/// One async mutex per raffle. Registration and the draw for a raffle hold
/// it, so their check-then-write sequences do not interleave.
#[derive(Default)]
pub struct RaffleLocks {
    locks: parking_lot::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RaffleLocks {
    pub fn get(&self, raffle_id: &str) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry(raffle_id.to_string())
            .or_default()
            .clone()
    }

    /// Drops the lock of a deleted raffle. Holders keep their `Arc`.
    pub fn remove(&self, raffle_id: &str) {
        self.locks.lock().remove(raffle_id);
    }
}

impl SyncContext {
    /// Creates a raffle in the selected event, or in a new event dated now
    /// when none is selected. The new raffle becomes the selected one.
    #[tracing::instrument(skip(self))]
    pub async fn create_event_with_raffle(
        &mut self,
        event_name: &str,
        raffle_name: &str,
        quantity: i64,
        code_suffix: &str,
    ) -> Result<Raffle> {
        let organizer = self.require_organizer()?.clone();
        non_empty(raffle_name, "raffle name")?;
        valid_quantity(quantity)?;
        let suffix = normalize_code(code_suffix);
        if !is_valid_code(&suffix) {
            return Err(Error::invalid(
                "The raffle code must be letters and digits only.",
            ));
        }

        let code = Raffle::compose_code(&organizer.organizer_code, &suffix);
        // checked before anything is written, so a clash leaves no stray
        // event behind
        self.ensure_unique(
            Query::table(Raffle::TABLE).eq("code", code.as_str()),
            None,
            "A raffle with that code already exists.",
        )
        .await?;

        let event = match self.selected_event() {
            Some(event) if event.organizer_id == organizer.id => event,
            _ => {
                non_empty(event_name, "event name")?;
                self.create_event(NewEvent {
                    name: event_name.trim().to_string(),
                    date: Utc::now(),
                    details: None,
                    banner: None,
                    organizer_id: organizer.id.clone(),
                })
                .await?
            }
        };

        let raffle = self
            .create_raffle(NewRaffle {
                name: raffle_name.trim().to_string(),
                quantity,
                code,
                event_id: event.id.clone(),
            })
            .await?;

        let session = self.session_mut();
        session.select_event(Some(event.id));
        session.select_raffle(Some(raffle.id.clone()));
        Ok(raffle)
    }

    /// Looks a raffle up by its public code, with its event. Raffles whose
    /// event is gone are treated as missing.
    #[tracing::instrument(skip(self))]
    pub async fn find_raffle_by_code(&self, code: &str) -> Result<Option<RaffleWithEvent>> {
        let found = self
            .db()
            .fetch_one::<RaffleWithEvent>(
                Query::table(Raffle::TABLE)
                    .eq("code", normalize_code(code))
                    .embed("events", "event_id"),
            )
            .await?;
        Ok(found.filter(|raffle| raffle.event.is_some()))
    }

    /// Registers a participant. Needs no identity: this is what the public
    /// registration page calls.
    #[tracing::instrument(skip(self, name, phone))]
    pub async fn add_participant(
        &self,
        raffle_id: &str,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<Participant> {
        non_empty(name, "name")?;
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(Error::invalid("That is not a valid email address."));
        }
        let phone = phone
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
            .map(str::to_string);

        let lock = self.services().locks.get(raffle_id);
        let _guard = lock.lock().await;

        let raffle = self
            .db()
            .fetch_one::<Raffle>(Query::table(Raffle::TABLE).eq("id", raffle_id))
            .await?
            .ok_or_else(|| Error::not_found("That raffle does not exist."))?;

        let registered = self
            .db()
            .count(
                Query::table(Participant::TABLE)
                    .eq("raffle_id", raffle_id)
                    .eq("email", email.as_str()),
            )
            .await?;
        if registered > 0 {
            return Err(Error::conflict(DUPLICATE_EMAIL));
        }

        let winners = self
            .db()
            .count(
                Query::table(Participant::TABLE)
                    .eq("raffle_id", raffle_id)
                    .eq("winner", true),
            )
            .await?;
        if winners as i64 >= raffle.quantity {
            return Err(Error::conflict(RAFFLE_FULL));
        }

        let participant = self
            .db()
            .insert::<Participant, _>(&NewParticipant {
                name: name.trim().to_string(),
                email,
                phone,
                raffle_id: raffle.id.clone(),
                winner: false,
            })
            .await?;
        tracing::info!("registered participant {} for raffle {}", participant.id, raffle.id);
        self.after_write().await;
        Ok(participant)
    }
}
