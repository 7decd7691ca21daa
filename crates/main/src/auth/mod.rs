//! Credential checks and the identity operations of the session.

pub mod admin;
pub mod collaborator;
pub mod login;
pub mod logout;

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use db::{
    company::{Collaborator, Company},
    config::CredentialScheme,
    organizer::{Admin, Organizer},
    Query, Row,
};
use rand::rngs::OsRng;

use crate::{
    error::{Error, Result, INVALID_CREDENTIALS},
    sync::SyncContext,
    util::{normalize_code, normalize_email},
};

pub const COMPANY_NOT_FOUND: &str = "No company uses that code.";
pub const COLLABORATOR_NOT_FOUND: &str =
    "No collaborator of this company uses that code.";

/// Checks a submitted password against the stored credential, and turns a
/// new password into the form it is stored in.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, submitted: &str, stored: &str) -> bool;

    fn prepare(&self, password: &str) -> Result<String>;
}

/// Stored credentials are the passwords themselves.
pub struct PlaintextVerifier;

impl CredentialVerifier for PlaintextVerifier {
    fn verify(&self, submitted: &str, stored: &str) -> bool {
        !stored.is_empty() && submitted == stored
    }

    fn prepare(&self, password: &str) -> Result<String> {
        Ok(password.to_string())
    }
}

/// Stored credentials are argon2 PHC strings.
pub struct Argon2Verifier;

impl CredentialVerifier for Argon2Verifier {
    fn verify(&self, submitted: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(hash) => Argon2::default()
                .verify_password(submitted.as_bytes(), &hash)
                .is_ok(),
            Err(e) => {
                tracing::warn!("stored credential is not a valid hash: {e}");
                false
            }
        }
    }

    fn prepare(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::invalid(format!("Could not store that password ({e}).")))
    }
}

pub fn verifier_for(scheme: CredentialScheme) -> Arc<dyn CredentialVerifier> {
    match scheme {
        CredentialScheme::Plaintext => Arc::new(PlaintextVerifier),
        CredentialScheme::Argon2 => Arc::new(Argon2Verifier),
    }
}

impl SyncContext {
    /// Logs an organizer in. On any failure the session is left as it was.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Organizer> {
        let organizer = self
            .db()
            .fetch_one::<Organizer>(
                Query::table(Organizer::TABLE)
                    .eq_ignore_case("email", &normalize_email(email)),
            )
            .await?
            .filter(|organizer| {
                self.services().verifier.verify(password, &organizer.password)
            })
            .ok_or_else(|| Error::conflict(INVALID_CREDENTIALS))?;

        tracing::info!("organizer {} logged in", organizer.id);
        let mut stored = organizer.clone();
        stored.password.clear();
        self.session_mut().organizer = Some(stored);
        self.after_write().await;
        Ok(organizer)
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn login_super_admin(&mut self, email: &str, password: &str) -> Result<()> {
        let admin = self
            .db()
            .fetch_one::<Admin>(
                Query::table(Admin::TABLE)
                    .eq_ignore_case("email", &normalize_email(email)),
            )
            .await?
            .filter(|admin| self.services().verifier.verify(password, &admin.password))
            .ok_or_else(|| Error::conflict(INVALID_CREDENTIALS))?;

        tracing::info!("administrator {} logged in", admin.id);
        let session = self.session_mut();
        session.super_admin = true;
        session.impersonating = false;
        self.after_write().await;
        Ok(())
    }

    /// Clears the organizer (impersonated or not) together with the event
    /// and raffle selection.
    pub async fn logout(&mut self) {
        let session = self.session_mut();
        session.organizer = None;
        session.impersonating = false;
        session.selected_event_id = None;
        session.selected_raffle_id = None;
        self.after_write().await;
    }

    pub async fn logout_super_admin(&mut self) {
        self.session_mut().super_admin = false;
        self.after_write().await;
    }

    pub async fn logout_collaborator(&mut self) {
        let session = self.session_mut();
        session.collaborator = None;
        if session.organizer.is_none() {
            session.select_raffle(None);
        }
        self.after_write().await;
    }

    /// Lets the administrator act as an organizer, with one of its events
    /// selected.
    #[tracing::instrument(skip(self))]
    pub async fn view_as_organizer(
        &mut self,
        organizer_id: &str,
        event_id: &str,
    ) -> Result<()> {
        if !self.session().super_admin {
            return Err(Error::forbidden("Only the administrator can do that."));
        }
        let mut organizer = self
            .db()
            .fetch_one::<Organizer>(Query::table(Organizer::TABLE).eq("id", organizer_id))
            .await?
            .ok_or_else(|| Error::not_found("That organizer does not exist."))?;
        organizer.password.clear();

        let session = self.session_mut();
        session.impersonating = true;
        session.organizer = Some(organizer);
        session.select_event(Some(event_id.to_string()));
        self.after_write().await;
        Ok(())
    }

    /// Returns the administrator to their own view.
    pub async fn stop_impersonating(&mut self) {
        self.session_mut().impersonating = false;
        self.logout().await;
    }

    /// Checks a collaborator in with their company's code and their own.
    #[tracing::instrument(skip(self))]
    pub async fn validate_collaborator(
        &mut self,
        company_code: &str,
        personal_code: &str,
    ) -> Result<Collaborator> {
        let company = self
            .db()
            .fetch_one::<Company>(
                Query::table(Company::TABLE)
                    .eq_ignore_case("code", &normalize_code(company_code)),
            )
            .await?
            .ok_or_else(|| Error::not_found(COMPANY_NOT_FOUND))?;

        let collaborator = self
            .db()
            .fetch_one::<Collaborator>(
                Query::table(Collaborator::TABLE)
                    .eq("company_id", company.id.as_str())
                    .eq("code", personal_code.trim()),
            )
            .await?
            .ok_or_else(|| Error::not_found(COLLABORATOR_NOT_FOUND))?;

        self.session_mut().collaborator = Some(collaborator.clone());
        self.after_write().await;
        Ok(collaborator)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        session::SessionState,
        sync::{scope::Scope, tests::Fixture},
    };

    #[test]
    fn test_argon2_verifier() {
        let verifier = Argon2Verifier;
        let stored = verifier.prepare("hunter2").unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(verifier.verify("hunter2", &stored));
        assert!(!verifier.verify("hunter3", &stored));
        assert!(!verifier.verify("hunter2", "not a hash"));
    }

    #[test]
    fn test_plaintext_verifier() {
        assert!(PlaintextVerifier.verify("secret", "secret"));
        assert!(!PlaintextVerifier.verify("Secret", "secret"));
        assert!(!PlaintextVerifier.verify("", ""));
    }

    #[rocket::async_test]
    async fn test_login_is_case_insensitive_on_email() {
        let fixture = Fixture::new();
        let (organizer, _) = fixture.organizer();
        let mut ctx = fixture.context(SessionState::default()).await;

        let err = ctx.login("TEAM@expo.test", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), INVALID_CREDENTIALS);
        assert!(ctx.session().organizer.is_none());

        ctx.login("TEAM@expo.test", "secret").await.unwrap();
        let stored = ctx.session().organizer.as_ref().unwrap();
        assert_eq!(stored.id, organizer.id);
        assert!(stored.password.is_empty());
        assert_eq!(ctx.mirror().events.len(), 1);
    }

    #[rocket::async_test]
    async fn test_login_fails_closed_when_store_is_down() {
        let fixture = Fixture::new();
        fixture.organizer();
        let mut ctx = fixture.context(SessionState::default()).await;
        fixture.store.fail_reads(true);

        assert!(ctx.login("team@expo.test", "secret").await.is_err());
        assert_eq!(ctx.session(), &SessionState::default());
    }

    #[rocket::async_test]
    async fn test_impersonation_round_trip() {
        let fixture = Fixture::new();
        let (organizer, event) = fixture.organizer();
        fixture.store.seed(
            "admins",
            json!({ "email": "root@raffle.test", "password": "toor" }),
        );
        let mut ctx = fixture.context(SessionState::default()).await;

        assert!(ctx
            .view_as_organizer(&organizer.id, &event.id)
            .await
            .is_err());

        ctx.login_super_admin("root@raffle.test", "toor").await.unwrap();
        assert_eq!(ctx.session().scope(), Scope::Admin);

        ctx.view_as_organizer(&organizer.id, &event.id).await.unwrap();
        assert_eq!(ctx.session().scope(), Scope::Organizer(organizer.id.clone()));
        assert_eq!(ctx.selected_event().unwrap().id, event.id);

        ctx.stop_impersonating().await;
        assert_eq!(ctx.session().scope(), Scope::Admin);
        assert!(ctx.session().organizer.is_none());
        assert!(ctx.session().selected_event_id.is_none());

        ctx.logout_super_admin().await;
        assert_eq!(ctx.session().scope(), Scope::Anonymous);
    }

    #[rocket::async_test]
    async fn test_logout_while_impersonating_restores_the_admin() {
        let fixture = Fixture::new();
        let (organizer, event) = fixture.organizer();
        fixture.store.seed(
            "admins",
            json!({ "email": "root@raffle.test", "password": "toor" }),
        );
        let mut ctx = fixture.context(SessionState::default()).await;

        ctx.login_super_admin("root@raffle.test", "toor").await.unwrap();
        ctx.view_as_organizer(&organizer.id, &event.id).await.unwrap();
        ctx.logout().await;

        assert!(!ctx.session().impersonating);
        assert_eq!(ctx.session().scope(), Scope::Admin);
        assert!(ctx.require_super_admin().is_ok());

        // a stale flag from an older session is cleared by logging in again
        ctx.session_mut().impersonating = true;
        ctx.login_super_admin("root@raffle.test", "toor").await.unwrap();
        assert!(ctx.require_super_admin().is_ok());
    }

    #[rocket::async_test]
    async fn test_collaborator_validation_messages() {
        let fixture = Fixture::new();
        let (_, event) = fixture.organizer();
        let company = fixture.store.seed(
            "companies",
            json!({ "name": "Acme", "code": "ACME", "event_id": event.id }),
        );
        fixture.store.seed(
            "collaborators",
            json!({ "name": "Kim", "code": "k-7", "company_id": company["id"] }),
        );
        let mut ctx = fixture.context(SessionState::default()).await;

        let err = ctx.validate_collaborator("NOPE", "k-7").await.unwrap_err();
        assert_eq!(err.to_string(), COMPANY_NOT_FOUND);

        let err = ctx.validate_collaborator("acme", "K-7").await.unwrap_err();
        assert_eq!(err.to_string(), COLLABORATOR_NOT_FOUND);

        let collaborator = ctx.validate_collaborator(" acme ", "k-7").await.unwrap();
        assert_eq!(collaborator.name, "Kim");
        assert!(matches!(ctx.session().scope(), Scope::Collaborator { .. }));
        assert_eq!(ctx.collaborator_company().unwrap().name, "Acme");

        ctx.logout_collaborator().await;
        assert_eq!(ctx.session().scope(), Scope::Anonymous);
    }
}
