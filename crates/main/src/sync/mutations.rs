//! Write-through mutations. Each one writes to the store and, once the
//! write succeeded, re-fetches the session's scope.

use db::{
    company::{
        Collaborator, CollaboratorUpdate, Company, CompanyUpdate, NewCollaborator,
        NewCompany, NewPrize, Prize, PrizeUpdate,
    },
    event::{Event, EventUpdate, NewEvent},
    organizer::{NewOrganizer, Organizer, OrganizerUpdate},
    participant::{Participant, ParticipantUpdate},
    raffle::{NewRaffle, Raffle, RaffleUpdate},
    Query, Row,
};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    util::{is_valid_code, is_valid_email, normalize_code, normalize_email},
};

use super::SyncContext;

pub(crate) fn non_empty(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::invalid(format!("The {what} cannot be empty.")))
    } else {
        Ok(())
    }
}

pub(crate) fn valid_quantity(quantity: i64) -> Result<()> {
    if quantity < 1 {
        Err(Error::invalid("A raffle needs at least one winner."))
    } else {
        Ok(())
    }
}

impl SyncContext {
    /// Fails with `message` if a row other than `except` matches `query`.
    pub(crate) async fn ensure_unique(
        &self,
        query: Query,
        except: Option<&str>,
        message: &str,
    ) -> Result<()> {
        let taken = self
            .db()
            .fetch::<Value>(query)
            .await?
            .iter()
            .any(|row| row.get("id").and_then(Value::as_str) != except);
        if taken {
            Err(Error::conflict(message))
        } else {
            Ok(())
        }
    }

    pub(crate) fn owned_event(&self, id: &str) -> Result<Event> {
        self.mirror()
            .event(id)
            .cloned()
            .ok_or_else(|| Error::not_found("That event does not exist."))
    }

    pub(crate) fn owned_raffle(&self, id: &str) -> Result<Raffle> {
        self.mirror()
            .raffle(id)
            .cloned()
            .ok_or_else(|| Error::not_found("That raffle does not exist."))
    }

    pub(crate) fn owned_company(&self, id: &str) -> Result<Company> {
        self.mirror()
            .company(id)
            .cloned()
            .ok_or_else(|| Error::not_found("That company does not exist."))
    }

    fn owned_collaborator(&self, id: &str) -> Result<Collaborator> {
        self.mirror()
            .collaborators
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("That collaborator does not exist."))
    }

    fn owned_prize(&self, id: &str) -> Result<Prize> {
        self.mirror()
            .prizes
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("That prize does not exist."))
    }

    fn owned_participant(&self, id: &str) -> Result<Participant> {
        self.mirror()
            .participants
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("That participant does not exist."))
    }

    // organizers

    #[tracing::instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_organizer(&self, mut input: NewOrganizer) -> Result<Organizer> {
        self.require_super_admin()?;
        non_empty(&input.name, "name")?;
        input.email = normalize_email(&input.email);
        if !is_valid_email(&input.email) {
            return Err(Error::invalid("That is not a valid email address."));
        }
        input.organizer_code = normalize_code(&input.organizer_code);
        if !Organizer::validate_code(&input.organizer_code) {
            return Err(Error::invalid(
                "Organizer codes are 2 to 10 upper-case letters or digits.",
            ));
        }
        non_empty(&input.password, "password")?;

        self.ensure_unique(
            Query::table(Organizer::TABLE).eq_ignore_case("email", &input.email),
            None,
            "An organizer with that email already exists.",
        )
        .await?;
        self.ensure_unique(
            Query::table(Organizer::TABLE).eq("organizer_code", input.organizer_code.as_str()),
            None,
            "Another organizer already uses that code.",
        )
        .await?;

        input.password = self.services().verifier.prepare(&input.password)?;
        self.resolve_image(&mut input, true).await?;
        let organizer = self.db().insert::<Organizer, _>(&input).await?;
        tracing::info!("created organizer {}", organizer.id);
        self.after_write().await;
        Ok(organizer)
    }

    /// The administrator may update any organizer; an organizer only
    /// itself.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_organizer(
        &mut self,
        id: &str,
        mut patch: OrganizerUpdate,
    ) -> Result<Organizer> {
        let is_self = self
            .session()
            .effective_organizer()
            .is_some_and(|organizer| organizer.id == id);
        if !is_self {
            self.require_super_admin()?;
        }

        if let Some(email) = &mut patch.email {
            *email = normalize_email(email);
            if !is_valid_email(email) {
                return Err(Error::invalid("That is not a valid email address."));
            }
            self.ensure_unique(
                Query::table(Organizer::TABLE).eq_ignore_case("email", email),
                Some(id),
                "An organizer with that email already exists.",
            )
            .await?;
        }
        if let Some(code) = &mut patch.organizer_code {
            *code = normalize_code(code);
            if !Organizer::validate_code(code) {
                return Err(Error::invalid(
                    "Organizer codes are 2 to 10 upper-case letters or digits.",
                ));
            }
            self.ensure_unique(
                Query::table(Organizer::TABLE).eq("organizer_code", code.as_str()),
                Some(id),
                "Another organizer already uses that code.",
            )
            .await?;
        }
        if let Some(password) = patch.password.take() {
            non_empty(&password, "password")?;
            patch.password = Some(self.services().verifier.prepare(&password)?);
        }
        self.resolve_image(&mut patch, false).await?;

        let organizer = self
            .db()
            .update::<Organizer, _>(id, &patch)
            .await?
            .ok_or_else(|| Error::not_found("That organizer does not exist."))?;

        if is_self {
            let mut stored = organizer.clone();
            stored.password.clear();
            self.session_mut().organizer = Some(stored);
        }
        self.after_write().await;
        Ok(organizer)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_organizer(&self, id: &str) -> Result<()> {
        self.require_super_admin()?;
        self.db().delete::<Organizer>(id).await?;
        self.after_write().await;
        Ok(())
    }

    // events

    #[tracing::instrument(skip(self, input))]
    pub async fn create_event(&self, mut input: NewEvent) -> Result<Event> {
        input.organizer_id = self.require_organizer()?.id.clone();
        non_empty(&input.name, "event name")?;
        self.resolve_image(&mut input, true).await?;
        let event = self.db().insert::<Event, _>(&input).await?;
        self.after_write().await;
        Ok(event)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_event(&self, id: &str, mut patch: EventUpdate) -> Result<Event> {
        self.require_organizer()?;
        self.owned_event(id)?;
        if let Some(name) = &patch.name {
            non_empty(name, "event name")?;
        }
        self.resolve_image(&mut patch, false).await?;
        let event = self
            .db()
            .update::<Event, _>(id, &patch)
            .await?
            .ok_or_else(|| Error::not_found("That event does not exist."))?;
        self.after_write().await;
        Ok(event)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_event(&mut self, id: &str) -> Result<()> {
        self.require_organizer()?;
        self.owned_event(id)?;
        let raffle_ids = self
            .mirror()
            .raffles_of_event(id)
            .into_iter()
            .map(|raffle| raffle.id.clone())
            .collect::<Vec<_>>();
        self.db().delete::<Event>(id).await?;
        for raffle_id in &raffle_ids {
            self.services().locks.remove(raffle_id);
        }
        if self.session().selected_event_id.as_deref() == Some(id) {
            self.session_mut().select_event(None);
        }
        self.after_write().await;
        Ok(())
    }

    // companies

    #[tracing::instrument(skip(self, input))]
    pub async fn create_company(&self, mut input: NewCompany) -> Result<Company> {
        self.require_organizer()?;
        self.owned_event(&input.event_id)?;
        non_empty(&input.name, "company name")?;
        input.code = normalize_code(&input.code);
        if !is_valid_code(&input.code) {
            return Err(Error::invalid("Company codes are letters and digits only."));
        }
        self.ensure_unique(
            Query::table(Company::TABLE).eq_ignore_case("code", &input.code),
            None,
            "Another company already uses that code.",
        )
        .await?;

        self.resolve_image(&mut input, true).await?;
        let company = self.db().insert::<Company, _>(&input).await?;
        self.after_write().await;
        Ok(company)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_company(&self, id: &str, mut patch: CompanyUpdate) -> Result<Company> {
        self.require_organizer()?;
        self.owned_company(id)?;
        if let Some(code) = &mut patch.code {
            *code = normalize_code(code);
            if !is_valid_code(code) {
                return Err(Error::invalid("Company codes are letters and digits only."));
            }
            self.ensure_unique(
                Query::table(Company::TABLE).eq_ignore_case("code", code),
                Some(id),
                "Another company already uses that code.",
            )
            .await?;
        }
        self.resolve_image(&mut patch, false).await?;
        let company = self
            .db()
            .update::<Company, _>(id, &patch)
            .await?
            .ok_or_else(|| Error::not_found("That company does not exist."))?;
        self.after_write().await;
        Ok(company)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_company(&self, id: &str) -> Result<()> {
        self.require_organizer()?;
        self.owned_company(id)?;
        self.db().delete::<Company>(id).await?;
        self.after_write().await;
        Ok(())
    }

    // collaborators

    #[tracing::instrument(skip(self, input))]
    pub async fn create_collaborator(
        &self,
        mut input: NewCollaborator,
    ) -> Result<Collaborator> {
        self.require_organizer()?;
        self.owned_company(&input.company_id)?;
        non_empty(&input.name, "name")?;
        input.code = input.code.trim().to_string();
        non_empty(&input.code, "collaborator code")?;
        self.ensure_unique(
            Query::table(Collaborator::TABLE)
                .eq("company_id", input.company_id.as_str())
                .eq("code", input.code.as_str()),
            None,
            "Another collaborator of this company already uses that code.",
        )
        .await?;

        self.resolve_image(&mut input, true).await?;
        let collaborator = self.db().insert::<Collaborator, _>(&input).await?;
        self.after_write().await;
        Ok(collaborator)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_collaborator(
        &self,
        id: &str,
        mut patch: CollaboratorUpdate,
    ) -> Result<Collaborator> {
        self.require_organizer()?;
        let existing = self.owned_collaborator(id)?;
        if let Some(code) = &mut patch.code {
            *code = code.trim().to_string();
            non_empty(code, "collaborator code")?;
            self.ensure_unique(
                Query::table(Collaborator::TABLE)
                    .eq("company_id", existing.company_id.as_str())
                    .eq("code", code.as_str()),
                Some(id),
                "Another collaborator of this company already uses that code.",
            )
            .await?;
        }
        self.resolve_image(&mut patch, false).await?;
        let collaborator = self
            .db()
            .update::<Collaborator, _>(id, &patch)
            .await?
            .ok_or_else(|| Error::not_found("That collaborator does not exist."))?;
        self.after_write().await;
        Ok(collaborator)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_collaborator(&self, id: &str) -> Result<()> {
        self.require_organizer()?;
        self.owned_collaborator(id)?;
        self.db().delete::<Collaborator>(id).await?;
        self.after_write().await;
        Ok(())
    }

    // prizes

    #[tracing::instrument(skip(self, input))]
    pub async fn create_prize(&self, input: NewPrize) -> Result<Prize> {
        self.require_organizer()?;
        self.owned_company(&input.company_id)?;
        non_empty(&input.name, "prize name")?;
        let prize = self.db().insert::<Prize, _>(&input).await?;
        self.after_write().await;
        Ok(prize)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_prize(&self, id: &str, patch: PrizeUpdate) -> Result<Prize> {
        self.require_organizer()?;
        self.owned_prize(id)?;
        if let Some(name) = &patch.name {
            non_empty(name, "prize name")?;
        }
        let prize = self
            .db()
            .update::<Prize, _>(id, &patch)
            .await?
            .ok_or_else(|| Error::not_found("That prize does not exist."))?;
        self.after_write().await;
        Ok(prize)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_prize(&self, id: &str) -> Result<()> {
        self.require_organizer()?;
        self.owned_prize(id)?;
        self.db().delete::<Prize>(id).await?;
        self.after_write().await;
        Ok(())
    }

    // raffles

    /// Creates a raffle from a full code (organizer code and suffix).
    #[tracing::instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_raffle(&self, mut input: NewRaffle) -> Result<Raffle> {
        self.require_organizer()?;
        self.owned_event(&input.event_id)?;
        non_empty(&input.name, "raffle name")?;
        valid_quantity(input.quantity)?;
        input.code = normalize_code(&input.code);
        if !is_valid_code(&input.code) {
            return Err(Error::invalid("Raffle codes are letters and digits only."));
        }
        self.ensure_unique(
            Query::table(Raffle::TABLE).eq("code", input.code.as_str()),
            None,
            "A raffle with that code already exists.",
        )
        .await?;

        let raffle = self.db().insert::<Raffle, _>(&input).await?;
        tracing::info!("created raffle {} ({})", raffle.id, raffle.code);
        self.after_write().await;
        Ok(raffle)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_raffle(&self, id: &str, patch: RaffleUpdate) -> Result<Raffle> {
        self.require_organizer()?;
        self.owned_raffle(id)?;
        if let Some(quantity) = patch.quantity {
            valid_quantity(quantity)?;
        }
        if let Some(name) = &patch.name {
            non_empty(name, "raffle name")?;
        }
        let raffle = self
            .db()
            .update::<Raffle, _>(id, &patch)
            .await?
            .ok_or_else(|| Error::not_found("That raffle does not exist."))?;
        self.after_write().await;
        Ok(raffle)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_raffle(&mut self, id: &str) -> Result<()> {
        self.require_organizer()?;
        self.owned_raffle(id)?;
        self.db().delete::<Raffle>(id).await?;
        self.services().locks.remove(id);
        if self.session().selected_raffle_id.as_deref() == Some(id) {
            self.session_mut().select_raffle(None);
        }
        self.after_write().await;
        Ok(())
    }

    // participants (registration itself is in `crate::raffles`)

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_participant(
        &self,
        id: &str,
        mut patch: ParticipantUpdate,
    ) -> Result<Participant> {
        self.require_organizer()?;
        let existing = self.owned_participant(id)?;
        if let Some(email) = &mut patch.email {
            *email = normalize_email(email);
            if !is_valid_email(email) {
                return Err(Error::invalid("That is not a valid email address."));
            }
            self.ensure_unique(
                Query::table(Participant::TABLE)
                    .eq("raffle_id", existing.raffle_id.as_str())
                    .eq("email", email.as_str()),
                Some(id),
                crate::error::DUPLICATE_EMAIL,
            )
            .await?;
        }
        let participant = self
            .db()
            .update::<Participant, _>(id, &patch)
            .await?
            .ok_or_else(|| Error::not_found("That participant does not exist."))?;
        self.after_write().await;
        Ok(participant)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_participant(&self, id: &str) -> Result<()> {
        self.require_organizer()?;
        self.owned_participant(id)?;
        self.db().delete::<Participant>(id).await?;
        self.after_write().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::company::Customization;
    use serde_json::json;

    use super::*;
    use crate::{
        session::SessionState,
        sync::tests::{Fixture, decode},
    };

    fn new_company(event_id: &str, code: &str) -> NewCompany {
        NewCompany {
            name: "Acme".into(),
            logo: None,
            customization: Customization {
                segment_colors: vec!["#ff0000".into(), "#00ff00".into()],
            },
            event_id: event_id.into(),
            code: code.into(),
        }
    }

    #[rocket::async_test]
    async fn test_writes_are_followed_by_a_refetch() {
        let fixture = Fixture::new();
        let (organizer, event) = fixture.organizer();
        let ctx = fixture.organizer_context(&organizer).await;

        let company = ctx.create_company(new_company(&event.id, " acme1")).await.unwrap();
        assert_eq!(company.code, "ACME1");
        assert_eq!(
            company.logo.as_deref(),
            Some(fixture.services.config.default_image_url.as_str())
        );
        assert_eq!(ctx.mirror().companies, vec![company.clone()]);

        ctx.create_prize(NewPrize {
            name: "Mug".into(),
            company_id: company.id.clone(),
        })
        .await
        .unwrap();
        assert_eq!(ctx.prizes_of(&company.id).len(), 1);
    }

    #[rocket::async_test]
    async fn test_company_codes_are_unique_ignoring_case() {
        let fixture = Fixture::new();
        let (organizer, event) = fixture.organizer();
        let ctx = fixture.organizer_context(&organizer).await;

        ctx.create_company(new_company(&event.id, "ACME")).await.unwrap();
        let err = ctx
            .create_company(new_company(&event.id, "acme"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(fixture.store.rows("companies").len(), 1);
    }

    #[rocket::async_test]
    async fn test_collaborator_codes_are_unique_per_company() {
        let fixture = Fixture::new();
        let (organizer, event) = fixture.organizer();
        let ctx = fixture.organizer_context(&organizer).await;
        let acme = ctx.create_company(new_company(&event.id, "ACME")).await.unwrap();
        let globex = ctx.create_company(new_company(&event.id, "GLOBEX")).await.unwrap();

        let collaborator = |company_id: &str| NewCollaborator {
            name: "Kim".into(),
            photo: None,
            code: "K1".into(),
            company_id: company_id.into(),
        };

        ctx.create_collaborator(collaborator(&acme.id)).await.unwrap();
        ctx.create_collaborator(collaborator(&globex.id)).await.unwrap();
        let err = ctx
            .create_collaborator(collaborator(&acme.id))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(ctx.collaborators_of(&acme.id).len(), 1);
    }

    #[rocket::async_test]
    async fn test_failed_write_leaves_mirror_alone() {
        let fixture = Fixture::new();
        let (organizer, event) = fixture.organizer();
        let ctx = fixture.organizer_context(&organizer).await;
        let before = ctx.mirror().clone();

        fixture.store.fail_writes_to("companies");
        let err = ctx
            .create_company(new_company(&event.id, "ACME"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(*ctx.mirror(), before);
    }

    #[rocket::async_test]
    async fn test_only_the_administrator_creates_organizers() {
        let fixture = Fixture::new();
        let (organizer, _) = fixture.organizer();
        let input = NewOrganizer {
            name: "Fair Co".into(),
            responsible: None,
            email: "Fair@Example.com".into(),
            password: "pw".into(),
            phone: None,
            photo: None,
            organizer_code: "fair".into(),
        };

        let ctx = fixture.organizer_context(&organizer).await;
        assert!(matches!(
            ctx.create_organizer(input.clone()).await,
            Err(Error::Forbidden(_))
        ));

        let admin = fixture
            .context(SessionState {
                super_admin: true,
                ..Default::default()
            })
            .await;
        let created = admin.create_organizer(input.clone()).await.unwrap();
        assert_eq!(created.email, "fair@example.com");
        assert_eq!(created.organizer_code, "FAIR");
        assert_eq!(admin.mirror().organizers.len(), 2);

        let duplicate = NewOrganizer {
            organizer_code: "OTHER".into(),
            email: "FAIR@example.com".into(),
            ..input
        };
        assert!(matches!(
            admin.create_organizer(duplicate).await,
            Err(Error::Conflict(_))
        ));
    }

    #[rocket::async_test]
    async fn test_organizer_updates_itself() {
        let fixture = Fixture::new();
        let (organizer, _) = fixture.organizer();
        let mut ctx = fixture.organizer_context(&organizer).await;

        let updated = ctx
            .update_organizer(
                &organizer.id,
                OrganizerUpdate {
                    name: Some("Expo Company".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Expo Company");
        assert_eq!(
            ctx.session().organizer.as_ref().unwrap().name,
            "Expo Company"
        );

        let stranger: Organizer = decode(fixture.store.seed(
            "organizers",
            json!({
                "name": "Other",
                "email": "o@x.test",
                "password": "p",
                "organizer_code": "OTH"
            }),
        ));
        assert!(matches!(
            ctx.update_organizer(&stranger.id, OrganizerUpdate::default()).await,
            Err(Error::Forbidden(_))
        ));
    }

    #[rocket::async_test]
    async fn test_deleting_the_selected_event_clears_selection() {
        let fixture = Fixture::new();
        let (organizer, _) = fixture.organizer();
        let mut ctx = fixture.organizer_context(&organizer).await;

        let event = ctx
            .create_event(NewEvent {
                name: "Fair".into(),
                date: Utc::now(),
                details: None,
                banner: None,
                organizer_id: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(event.organizer_id, organizer.id);
        assert_eq!(ctx.organizer_events().len(), 2);

        ctx.session_mut().select_event(Some(event.id.clone()));
        ctx.delete_event(&event.id).await.unwrap();
        assert!(ctx.session().selected_event_id.is_none());
        assert_eq!(ctx.organizer_events().len(), 1);
    }

    #[rocket::async_test]
    async fn test_rows_outside_scope_are_not_found() {
        let fixture = Fixture::new();
        let (organizer, _) = fixture.organizer();
        let other: Organizer = decode(fixture.store.seed(
            "organizers",
            json!({
                "name": "Other",
                "email": "o@x.test",
                "password": "p",
                "organizer_code": "OTH"
            }),
        ));
        let foreign: Event = decode(fixture.store.seed(
            "events",
            json!({
                "name": "Theirs",
                "date": "2024-01-01T00:00:00Z",
                "organizer_id": other.id
            }),
        ));

        let ctx = fixture.organizer_context(&organizer).await;
        assert!(matches!(
            ctx.create_company(new_company(&foreign.id, "ACME")).await,
            Err(Error::NotFound(_))
        ));
    }
}
