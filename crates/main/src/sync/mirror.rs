//! The in-memory copy of the rows visible to the current session, and the
//! views derived from it.

use db::{
    company::{Collaborator, Company, Prize},
    event::Event,
    organizer::Organizer,
    participant::Participant,
    raffle::Raffle,
};
use itertools::Itertools;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mirror {
    pub organizers: Vec<Organizer>,
    pub events: Vec<Event>,
    pub raffles: Vec<Raffle>,
    pub participants: Vec<Participant>,
    pub companies: Vec<Company>,
    pub collaborators: Vec<Collaborator>,
    pub prizes: Vec<Prize>,
}

impl Mirror {
    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn raffle(&self, id: &str) -> Option<&Raffle> {
        self.raffles.iter().find(|raffle| raffle.id == id)
    }

    pub fn company(&self, id: &str) -> Option<&Company> {
        self.companies.iter().find(|company| company.id == id)
    }

    /// Events owned by the organizer, most recent first.
    pub fn events_by_date(&self, organizer_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|event| event.organizer_id == organizer_id)
            .sorted_by(|a, b| b.date.cmp(&a.date))
            .collect()
    }

    pub fn raffles_of_event(&self, event_id: &str) -> Vec<&Raffle> {
        self.raffles
            .iter()
            .filter(|raffle| raffle.event_id == event_id)
            .collect()
    }

    pub fn companies_of_event(&self, event_id: &str) -> Vec<&Company> {
        self.companies
            .iter()
            .filter(|company| company.event_id == event_id)
            .collect()
    }

    pub fn participants_of(&self, raffle_id: &str) -> Vec<&Participant> {
        self.participants
            .iter()
            .filter(|participant| participant.raffle_id == raffle_id)
            .collect()
    }

    pub fn winners(&self) -> Vec<&Participant> {
        self.participants.iter().filter(|p| p.winner).collect()
    }

    /// Participants of the raffle who have not won yet.
    ///
    /// Counted from the mirror, so this is only as fresh as the last
    /// resynchronization.
    pub fn eligible_count(&self, raffle_id: &str) -> usize {
        self.participants
            .iter()
            .filter(|p| p.raffle_id == raffle_id && !p.winner)
            .count()
    }

    pub fn collaborators_of(&self, company_id: &str) -> Vec<&Collaborator> {
        self.collaborators
            .iter()
            .filter(|c| c.company_id == company_id)
            .collect()
    }

    pub fn prizes_of(&self, company_id: &str) -> Vec<&Prize> {
        self.prizes
            .iter()
            .filter(|prize| prize.company_id == company_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn event(id: &str, organizer_id: &str, day: u32) -> Event {
        Event {
            id: id.to_string(),
            name: format!("Event {id}"),
            date: Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap(),
            details: None,
            banner: None,
            organizer_id: organizer_id.to_string(),
            created_at: None,
        }
    }

    fn participant(id: &str, raffle_id: &str, winner: bool) -> Participant {
        Participant {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@example.com"),
            phone: None,
            raffle_id: raffle_id.to_string(),
            winner,
            drawn_at: None,
            created_at: None,
        }
    }

    #[test]
    fn test_events_sorted_most_recent_first() {
        let mirror = Mirror {
            events: vec![
                event("a", "o1", 3),
                event("b", "o1", 20),
                event("c", "o2", 25),
                event("d", "o1", 11),
            ],
            ..Default::default()
        };
        let ids: Vec<&str> = mirror
            .events_by_date("o1")
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
    }

    #[test]
    fn test_winners_and_eligible_count() {
        let mirror = Mirror {
            participants: vec![
                participant("p1", "r1", true),
                participant("p2", "r1", false),
                participant("p3", "r1", false),
                participant("p4", "r2", false),
            ],
            ..Default::default()
        };
        assert_eq!(mirror.winners().len(), 1);
        assert_eq!(mirror.eligible_count("r1"), 2);
        assert_eq!(mirror.eligible_count("r2"), 1);
        assert_eq!(mirror.eligible_count("r3"), 0);
        assert_eq!(mirror.participants_of("r1").len(), 3);
    }
}
