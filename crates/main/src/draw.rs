//! Drawing winners and spinning the prize wheel.

use chrono::Utc;
use db::{
    company::Prize,
    participant::{Participant, ParticipantUpdate},
    query::Filter,
    raffle::Raffle,
    Query, Row,
};
use rand::{seq::SliceRandom, Rng};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    sync::SyncContext,
};

/// Every entry is equally likely.
pub fn pick_uniform<'a, T, R: Rng + ?Sized>(
    entries: &'a [T],
    rng: &mut R,
) -> Option<&'a T> {
    entries.choose(rng)
}

/// Picks a wheel segment. The wheel needs at least two prizes; the same
/// prize may come up on any number of spins.
pub fn spin_wheel<R: Rng + ?Sized>(
    prize_count: usize,
    rng: &mut R,
) -> Result<usize> {
    if prize_count < 2 {
        return Err(Error::invalid("The wheel needs at least two prizes."));
    }
    Ok(rng.gen_range(0..prize_count))
}

impl SyncContext {
    /// Draws a winner for the selected raffle, for an organizer or a
    /// checked-in collaborator.
    ///
    /// Returns `None` when nobody is left to draw, when the raffle already
    /// has as many winners as it was created for, or when the chosen
    /// participant was marked by a concurrent draw in the meantime.
    #[tracing::instrument(skip(self))]
    pub async fn draw_winner(&self) -> Result<Option<Participant>> {
        let session = self.session();
        if session.effective_organizer().is_none() && session.collaborator.is_none() {
            return Err(Error::forbidden(
                "Log in as an organizer or check in as a collaborator to draw.",
            ));
        }
        let raffle = self
            .selected_raffle()
            .ok_or_else(|| Error::invalid("Select a raffle before drawing."))?;

        let lock = self.services().locks.get(&raffle.id);
        let _guard = lock.lock().await;

        let candidates = self
            .db()
            .fetch::<Participant>(
                Query::table(Participant::TABLE).eq("raffle_id", raffle.id.as_str()),
            )
            .await?;
        let winners = candidates.iter().filter(|p| p.winner).count();
        if winners as i64 >= raffle.quantity {
            tracing::info!("raffle {} already has {winners} winners", raffle.id);
            return Ok(None);
        }

        let eligible: Vec<Participant> =
            candidates.into_iter().filter(|p| !p.winner).collect();
        let chosen = {
            let mut rng = rand::thread_rng();
            pick_uniform(&eligible, &mut rng).cloned()
        };
        let Some(chosen) = chosen else {
            return Ok(None);
        };

        let marked = self
            .db()
            .update_guarded::<Participant, _>(
                &chosen.id,
                vec![Filter::Eq("winner".to_string(), Value::Bool(false))],
                &ParticipantUpdate {
                    winner: Some(true),
                    drawn_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        match &marked {
            Some(winner) => {
                tracing::info!("participant {} won raffle {}", winner.id, raffle.id)
            }
            None => tracing::warn!("participant {} was already marked as a winner", chosen.id),
        }
        self.after_write().await;
        Ok(marked)
    }

    /// Raffles of the checked-in collaborator's event.
    pub fn collaborator_raffles(&self) -> Vec<Raffle> {
        match self.collaborator_company() {
            Some(company) => self
                .mirror()
                .raffles_of_event(&company.event_id)
                .into_iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Selects (or with `None` clears) the raffle a collaborator draws
    /// from. Only raffles of the collaborator's event can be selected.
    pub fn select_collaborator_raffle(&mut self, raffle_id: Option<&str>) -> Result<()> {
        self.require_collaborator()?;
        if let Some(id) = raffle_id {
            if !self.collaborator_raffles().iter().any(|raffle| raffle.id == id) {
                return Err(Error::not_found("That raffle does not exist."));
            }
        }
        self.session_mut()
            .select_raffle(raffle_id.map(ToString::to_string));
        Ok(())
    }

    /// Spins the checked-in collaborator's wheel. Nothing is recorded.
    #[tracing::instrument(skip(self))]
    pub fn spin(&self) -> Result<Prize> {
        let collaborator = self.require_collaborator()?;
        let prizes = self.prizes_of(&collaborator.company_id);
        let index = spin_wheel(prizes.len(), &mut rand::thread_rng())?;
        Ok(prizes[index].clone())
    }
}
