//! Which rows a session may see, and the cascading fetch that loads them.

use db::{
    company::{Collaborator, Company, CompanyWithEvent, Prize},
    event::Event,
    organizer::Organizer,
    participant::Participant,
    raffle::Raffle,
    Db, Query, Row, StoreResult,
};

use super::mirror::Mirror;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// No identity: nothing is mirrored.
    Anonymous,
    /// Every organizer and event.
    Admin,
    /// Everything owned by one organizer.
    Organizer(String),
    /// One collaborator's company and that company's event.
    Collaborator {
        collaborator_id: String,
        company_id: String,
    },
}

/// Fetches the rows whose parent column is in `parents`. An empty parent set
/// is not sent to the store at all (an empty `in` filter would be
/// meaningless there), it just yields no rows.
async fn fetch_children<T: Row>(
    db: &Db,
    parent_column: &str,
    parents: &[String],
) -> StoreResult<Vec<T>> {
    if parents.is_empty() {
        return Ok(Vec::new());
    }
    db.fetch(Query::table(T::TABLE).is_in(parent_column, parents.iter().cloned()))
        .await
}

impl Scope {
    /// Loads a fresh mirror for this scope. Collections outside the scope
    /// are left empty.
    #[tracing::instrument(skip(db))]
    pub async fn fetch(&self, db: &Db) -> StoreResult<Mirror> {
        match self {
            Scope::Anonymous => Ok(Mirror::default()),
            Scope::Admin => {
                let organizers = db
                    .fetch::<Organizer>(
                        Query::table(Organizer::TABLE).order_by("name", false),
                    )
                    .await?;
                let events = db
                    .fetch::<Event>(
                        Query::table(Event::TABLE).order_by("date", true),
                    )
                    .await?;
                Ok(Mirror {
                    organizers,
                    events,
                    ..Default::default()
                })
            }
            Scope::Organizer(organizer_id) => {
                let events = db
                    .fetch::<Event>(
                        Query::table(Event::TABLE)
                            .eq("organizer_id", organizer_id.as_str()),
                    )
                    .await?;
                let event_ids = events.iter().map(|e| e.id.clone()).collect::<Vec<_>>();

                let raffles =
                    fetch_children::<Raffle>(db, "event_id", &event_ids).await?;
                let companies =
                    fetch_children::<Company>(db, "event_id", &event_ids)
                        .await?;

                let raffle_ids = raffles.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
                let company_ids = companies.iter().map(|c| c.id.clone()).collect::<Vec<_>>();

                let participants = fetch_children::<Participant>(
                    db,
                    "raffle_id",
                    &raffle_ids,
                )
                .await?;
                let collaborators = fetch_children::<Collaborator>(
                    db,
                    "company_id",
                    &company_ids,
                )
                .await?;
                let prizes =
                    fetch_children::<Prize>(db, "company_id", &company_ids)
                        .await?;

                Ok(Mirror {
                    organizers: Vec::new(),
                    events,
                    raffles,
                    participants,
                    companies,
                    collaborators,
                    prizes,
                })
            }
            Scope::Collaborator {
                collaborator_id,
                company_id,
            } => {
                let collaborators = db
                    .fetch::<Collaborator>(
                        Query::table(Collaborator::TABLE)
                            .eq("id", collaborator_id.as_str())
                            .eq("company_id", company_id.as_str()),
                    )
                    .await?;

                let company = db
                    .fetch_one::<CompanyWithEvent>(
                        Query::table(Company::TABLE)
                            .eq("id", company_id.as_str())
                            .embed(Event::TABLE, "event_id"),
                    )
                    .await?;

                let Some(CompanyWithEvent { company, event }) = company else {
                    return Ok(Mirror {
                        collaborators,
                        ..Default::default()
                    });
                };

                let raffles = match &event {
                    Some(event) => {
                        db.fetch::<Raffle>(
                            Query::table(Raffle::TABLE)
                                .eq("event_id", event.id.as_str()),
                        )
                        .await?
                    }
                    None => Vec::new(),
                };
                let prizes = db
                    .fetch::<Prize>(
                        Query::table(Prize::TABLE)
                            .eq("company_id", company.id.as_str()),
                    )
                    .await?;
                let raffle_ids = raffles.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
                let participants = fetch_children::<Participant>(
                    db,
                    "raffle_id",
                    &raffle_ids,
                )
                .await?;

                Ok(Mirror {
                    organizers: Vec::new(),
                    events: event.into_iter().collect(),
                    raffles,
                    participants,
                    companies: vec![company],
                    collaborators,
                    prizes,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use db::memory::MemoryStore;
    use serde_json::json;

    use super::*;

    fn seeded() -> (Arc<MemoryStore>, Db) {
        let store = Arc::new(MemoryStore::new());
        let db = Db::new(store.clone());

        store.seed(
            "organizers",
            json!({
                "id": "o1",
                "name": "One",
                "email": "one@x.test",
                "password": "p",
                "organizer_code": "ONE"
            }),
        );
        store.seed(
            "organizers",
            json!({
                "id": "o2",
                "name": "Two",
                "email": "two@x.test",
                "password": "p",
                "organizer_code": "TWO"
            }),
        );
        store.seed(
            "events",
            json!({
                "id": "e1",
                "name": "Expo",
                "date": "2024-05-01T09:00:00Z",
                "organizer_id": "o1"
            }),
        );
        store.seed(
            "events",
            json!({
                "id": "e2",
                "name": "Fair",
                "date": "2024-06-01T09:00:00Z",
                "organizer_id": "o2"
            }),
        );
        store.seed(
            "raffles",
            json!({
                "id": "r1",
                "name": "Main",
                "quantity": 2,
                "code": "ONEMAIN",
                "event_id": "e1"
            }),
        );
        store.seed(
            "raffles",
            json!({
                "id": "r2",
                "name": "Other",
                "quantity": 1,
                "code": "TWOX",
                "event_id": "e2"
            }),
        );
        store.seed(
            "participants",
            json!({
                "id": "p1",
                "name": "Ana",
                "email": "ana@x.test",
                "raffle_id": "r1",
                "winner": false
            }),
        );
        store.seed(
            "participants",
            json!({
                "id": "p2",
                "name": "Bo",
                "email": "bo@x.test",
                "raffle_id": "r2",
                "winner": false
            }),
        );
        store.seed(
            "companies",
            json!({
                "id": "c1",
                "name": "Acme",
                "event_id": "e1",
                "code": "ACME",
                "customization": null
            }),
        );
        store.seed(
            "collaborators",
            json!({ "id": "k1", "name": "Kim", "code": "K1", "company_id": "c1" }),
        );
        store.seed(
            "collaborators",
            json!({ "id": "k2", "name": "Lee", "code": "K2", "company_id": "c1" }),
        );
        store.seed(
            "prizes",
            json!({ "id": "z1", "name": "Mug", "company_id": "c1" }),
        );
        (store, db)
    }

    #[rocket::async_test]
    async fn test_organizer_scope_only_sees_own_rows() {
        let (_, db) = seeded();
        let mirror = Scope::Organizer("o1".into()).fetch(&db).await.unwrap();

        assert!(mirror.organizers.is_empty());
        assert_eq!(mirror.events.len(), 1);
        assert_eq!(mirror.raffles.len(), 1);
        assert_eq!(mirror.participants.len(), 1);
        assert_eq!(mirror.participants[0].id, "p1");
        assert_eq!(mirror.companies.len(), 1);
        assert_eq!(mirror.collaborators.len(), 2);
        assert_eq!(mirror.prizes.len(), 1);
    }

    #[rocket::async_test]
    async fn test_empty_parent_sets_skip_fetches() {
        let (store, db) = seeded();
        store.seed(
            "organizers",
            json!({
                "id": "o3",
                "name": "Three",
                "email": "three@x.test",
                "password": "p",
                "organizer_code": "THR"
            }),
        );
        let mirror = Scope::Organizer("o3".into()).fetch(&db).await.unwrap();
        assert_eq!(mirror, Mirror::default());
    }

    #[rocket::async_test]
    async fn test_admin_scope() {
        let (_, db) = seeded();
        let mirror = Scope::Admin.fetch(&db).await.unwrap();
        assert_eq!(mirror.organizers.len(), 2);
        assert_eq!(mirror.events.len(), 2);
        // most recent event first
        assert_eq!(mirror.events[0].id, "e2");
        assert!(mirror.raffles.is_empty());
    }

    #[rocket::async_test]
    async fn test_collaborator_scope() {
        let (_, db) = seeded();
        let mirror = Scope::Collaborator {
            collaborator_id: "k1".into(),
            company_id: "c1".into(),
        }
        .fetch(&db)
        .await
        .unwrap();

        assert_eq!(mirror.companies.len(), 1);
        assert_eq!(mirror.events.len(), 1);
        assert_eq!(mirror.events[0].id, "e1");
        assert_eq!(mirror.raffles.len(), 1);
        assert_eq!(mirror.participants.len(), 1);
        assert_eq!(mirror.prizes.len(), 1);
        assert_eq!(mirror.collaborators.len(), 1);
        assert_eq!(mirror.collaborators[0].id, "k1");
    }
}
