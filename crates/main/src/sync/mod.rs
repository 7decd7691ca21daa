//! The sync context: a session, the services it talks to, and the mirror of
//! the rows the session is allowed to see.
//!
//! Reads go to the mirror. Writes go to the store first, and the mirror is
//! then re-fetched for the session's scope; nothing is updated locally in
//! anticipation of a write.

pub mod images;
pub mod mirror;
pub mod mutations;
pub mod scope;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use db::{
    company::{Collaborator, Company, Prize},
    config::AppConfig,
    event::Event,
    memory::{MemoryObjectStore, MemoryStore},
    organizer::{Admin, Organizer},
    participant::Participant,
    raffle::Raffle,
    rest::{RestObjectStore, RestStore},
    storage::ObjectStore,
    Db, Row,
};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use rocket::request::{self, FromRequest, Request};

use crate::{
    auth::{verifier_for, CredentialVerifier},
    error::{Error, Result},
    raffles::RaffleLocks,
    session::{SessionState, SessionStorage},
};

use self::{mirror::Mirror, scope::Scope};

/// Everything the application talks to. Managed by Rocket as
/// `Arc<Services>`.
pub struct Services {
    pub db: Db,
    pub objects: Arc<dyn ObjectStore>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub config: AppConfig,
    pub locks: RaffleLocks,
}

impl Services {
    pub fn new(db: Db, objects: Arc<dyn ObjectStore>, config: AppConfig) -> Self {
        Services {
            db,
            objects,
            verifier: verifier_for(config.credential_scheme),
            config,
            locks: RaffleLocks::default(),
        }
    }

    /// Connects to the configured remote store, or falls back to memory
    /// when no `store_url` is set.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        match &config.store_url {
            Some(url) => {
                let db = Db::new(Arc::new(RestStore::new(url, &config.store_key)));
                let objects = Arc::new(RestObjectStore::new(
                    url,
                    &config.store_key,
                    &config.bucket,
                ));
                Ok(Services::new(db, objects, config))
            }
            None => {
                tracing::warn!("no store_url configured, keeping all data in memory");
                let store = Arc::new(MemoryStore::new());
                let objects = Arc::new(MemoryObjectStore::new(&format!(
                    "{}/uploads",
                    config.public_base_url.trim_end_matches('/')
                )));
                let services = Services::new(Db::new(store.clone()), objects, config);
                if let (Some(email), Some(password)) =
                    (&services.config.admin_email, &services.config.admin_password)
                {
                    let password = services.verifier.prepare(password)?;
                    store.seed(
                        Admin::TABLE,
                        serde_json::json!({ "email": email, "password": password }),
                    );
                    tracing::info!("seeded administrator {email}");
                }
                Ok(services)
            }
        }
    }
}

/// The mirror together with the ticket of the fetch that produced it.
#[derive(Default)]
struct MirrorCell {
    issued: AtomicU64,
    applied: RwLock<(u64, Mirror)>,
}

pub struct SyncContext {
    services: Arc<Services>,
    session: SessionState,
    mirror: Arc<MirrorCell>,
}

impl SyncContext {
    /// A context with an empty mirror. Call [`SyncContext::refresh`] to
    /// populate it.
    pub fn new(services: Arc<Services>, session: SessionState) -> Self {
        SyncContext {
            services,
            session,
            mirror: Arc::new(MirrorCell::default()),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn db(&self) -> &Db {
        &self.services.db
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn persist(&self, storage: &dyn SessionStorage) {
        self.session.save(storage);
    }

    /// Read access to the mirror. Do not hold the guard across an `.await`.
    pub fn mirror(&self) -> MappedRwLockReadGuard<'_, Mirror> {
        RwLockReadGuard::map(self.mirror.applied.read(), |(_, mirror)| mirror)
    }

    fn next_ticket(&self) -> u64 {
        self.mirror.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Installs `mirror` unless a fetch which started later has already
    /// been applied.
    fn apply(&self, ticket: u64, mirror: Mirror) -> bool {
        let mut applied = self.mirror.applied.write();
        if ticket <= applied.0 {
            tracing::debug!(
                "discarding stale fetch {ticket} (already at {})",
                applied.0
            );
            return false;
        }
        *applied = (ticket, mirror);
        true
    }

    /// Re-fetches the rows visible in `scope`. Returns whether the result
    /// was applied.
    #[tracing::instrument(skip(self))]
    pub async fn resynchronize(&self, scope: &Scope) -> Result<bool> {
        let ticket = self.next_ticket();
        let mirror = scope.fetch(self.db()).await?;
        Ok(self.apply(ticket, mirror))
    }

    pub async fn refresh(&self) -> Result<bool> {
        self.resynchronize(&self.session.scope()).await
    }

    /// Called after every successful write. The write already happened, so
    /// a failing re-fetch only leaves the mirror stale.
    pub(crate) async fn after_write(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!("re-fetch after write failed: {e}");
        }
    }

    pub fn require_organizer(&self) -> Result<&Organizer> {
        self.session
            .effective_organizer()
            .ok_or_else(|| {
                Error::forbidden("You must be logged in as an organizer.")
            })
    }

    pub fn require_super_admin(&self) -> Result<()> {
        if self.session.acting_as_super_admin() {
            Ok(())
        } else {
            Err(Error::forbidden("Only the administrator can do that."))
        }
    }

    pub fn require_collaborator(&self) -> Result<&Collaborator> {
        self.session
            .collaborator
            .as_ref()
            .ok_or_else(|| {
                Error::forbidden("Please check in with your company code first.")
            })
    }

    pub fn selected_event(&self) -> Option<Event> {
        let id = self.session.selected_event_id.as_deref()?;
        self.mirror().event(id).cloned()
    }

    pub fn selected_raffle(&self) -> Option<Raffle> {
        let id = self.session.selected_raffle_id.as_deref()?;
        self.mirror().raffle(id).cloned()
    }

    /// The organizer's events, most recent first.
    pub fn organizer_events(&self) -> Vec<Event> {
        match self.session.effective_organizer() {
            Some(organizer) => self
                .mirror()
                .events_by_date(&organizer.id)
                .into_iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn selected_event_raffles(&self) -> Vec<Raffle> {
        match self.session.selected_event_id.as_deref() {
            Some(id) => self
                .mirror()
                .raffles_of_event(id)
                .into_iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn selected_event_companies(&self) -> Vec<Company> {
        match self.session.selected_event_id.as_deref() {
            Some(id) => self
                .mirror()
                .companies_of_event(id)
                .into_iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn selected_raffle_participants(&self) -> Vec<Participant> {
        match self.session.selected_raffle_id.as_deref() {
            Some(id) => self
                .mirror()
                .participants_of(id)
                .into_iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn winners(&self) -> Vec<Participant> {
        self.mirror().winners().into_iter().cloned().collect()
    }

    /// Participants of the selected raffle who can still win, as of the
    /// last re-fetch.
    pub fn eligible_count(&self) -> usize {
        self.session
            .selected_raffle_id
            .as_deref()
            .map(|id| self.mirror().eligible_count(id))
            .unwrap_or(0)
    }

    /// The company of the checked-in collaborator.
    pub fn collaborator_company(&self) -> Option<Company> {
        let collaborator = self.session.collaborator.as_ref()?;
        self.mirror().company(&collaborator.company_id).cloned()
    }

    pub fn collaborators_of(&self, company_id: &str) -> Vec<Collaborator> {
        self.mirror()
            .collaborators_of(company_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn prizes_of(&self, company_id: &str) -> Vec<Prize> {
        self.mirror()
            .prizes_of(company_id)
            .into_iter()
            .cloned()
            .collect()
    }
}

/// Builds a context from the managed [`Services`] and the session cookies,
/// and loads the mirror for the session's scope.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for SyncContext {
    type Error = std::convert::Infallible;

    async fn from_request(
        request: &'r Request<'_>,
    ) -> request::Outcome<Self, Self::Error> {
        let services = request
            .rocket()
            .state::<Arc<Services>>()
            .expect("`Services` must be managed by the application")
            .clone();
        let session = SessionState::load(request.cookies());
        let ctx = SyncContext::new(services, session);
        if let Err(e) = ctx.refresh().await {
            tracing::warn!("could not load data for the session: {e}");
        }
        request::Outcome::Success(ctx)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use db::{
        config::AppConfig,
        memory::{MemoryObjectStore, MemoryStore},
    };
    use serde_json::json;

    use super::*;

    pub(crate) struct Fixture {
        pub store: Arc<MemoryStore>,
        pub objects: Arc<MemoryObjectStore>,
        pub services: Arc<Services>,
    }

    impl Fixture {
        pub fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let objects = Arc::new(MemoryObjectStore::new("https://cdn.test"));
            let services = Arc::new(Services::new(
                Db::new(store.clone()),
                objects.clone(),
                AppConfig::default(),
            ));
            Fixture {
                store,
                objects,
                services,
            }
        }

        /// Seeds an organizer (code `ABC`, password `secret`) with one
        /// event.
        pub fn organizer(&self) -> (Organizer, Event) {
            let organizer: Organizer = decode(self.store.seed(
                "organizers",
                json!({
                    "name": "Expo Co",
                    "email": "team@expo.test",
                    "password": "secret",
                    "organizer_code": "ABC"
                }),
            ));
            let event: Event = decode(self.store.seed(
                "events",
                json!({
                    "name": "Expo",
                    "date": "2024-05-01T09:00:00Z",
                    "organizer_id": organizer.id
                }),
            ));
            (organizer, event)
        }

        pub async fn context(&self, session: SessionState) -> SyncContext {
            let ctx = SyncContext::new(self.services.clone(), session);
            ctx.refresh().await.unwrap();
            ctx
        }

        pub async fn organizer_context(&self, organizer: &Organizer) -> SyncContext {
            self.context(SessionState {
                organizer: Some(organizer.clone()),
                ..Default::default()
            })
            .await
        }
    }

    pub(crate) fn decode<T: serde::de::DeserializeOwned>(
        row: serde_json::Value,
    ) -> T {
        serde_json::from_value(db::case::to_camel(row)).unwrap()
    }

    #[rocket::async_test]
    async fn test_stale_fetch_is_discarded() {
        let fixture = Fixture::new();
        let (organizer, _) = fixture.organizer();
        let ctx = fixture.organizer_context(&organizer).await;

        let stale = ctx.next_ticket();
        let fresh = ctx.next_ticket();

        let mut newer = ctx.mirror().clone();
        newer.prizes.clear();
        assert!(ctx.apply(fresh, newer));

        let older = Mirror::default();
        assert!(!ctx.apply(stale, older));
        assert_eq!(ctx.mirror().events.len(), 1);
    }

    #[rocket::async_test]
    async fn test_derived_views_follow_selection() {
        let fixture = Fixture::new();
        let (organizer, event) = fixture.organizer();
        fixture.store.seed(
            "raffles",
            json!({
                "id": "r1",
                "name": "Main",
                "quantity": 1,
                "code": "ABCMAIN",
                "event_id": event.id
            }),
        );
        fixture.store.seed(
            "participants",
            json!({
                "name": "Ana",
                "email": "ana@x.test",
                "raffle_id": "r1",
                "winner": false
            }),
        );
        fixture.store.seed(
            "participants",
            json!({ "name": "Bo", "email": "bo@x.test", "raffle_id": "r1", "winner": true }),
        );

        let mut ctx = fixture.organizer_context(&organizer).await;
        assert!(ctx.selected_event().is_none());
        assert_eq!(ctx.eligible_count(), 0);

        ctx.session_mut().select_event(Some(event.id.clone()));
        ctx.session_mut().select_raffle(Some("r1".to_string()));

        assert_eq!(ctx.selected_event().unwrap().id, event.id);
        assert_eq!(ctx.selected_raffle().unwrap().code, "ABCMAIN");
        assert_eq!(ctx.selected_event_raffles().len(), 1);
        assert_eq!(ctx.selected_raffle_participants().len(), 2);
        assert_eq!(ctx.winners().len(), 1);
        assert_eq!(ctx.eligible_count(), 1);
        assert_eq!(ctx.organizer_events().len(), 1);
    }

    #[rocket::async_test]
    async fn test_anonymous_context_mirrors_nothing() {
        let fixture = Fixture::new();
        fixture.organizer();
        let ctx = fixture.context(SessionState::default()).await;
        assert_eq!(*ctx.mirror(), Mirror::default());
        assert!(ctx.require_organizer().is_err());
        assert!(ctx.require_super_admin().is_err());
    }
}
