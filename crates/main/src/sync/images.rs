use chrono::Utc;
use db::storage::{object_path, ImageInput, WithImage};

use crate::error::{Error, Result};

use super::SyncContext;

impl SyncContext {
    /// Replaces an image file in the payload by the public URL it was
    /// uploaded to. When `creating` and no image was given, the configured
    /// default image is used instead.
    ///
    /// A row write which fails after this point leaves the upload behind.
    pub(crate) async fn resolve_image<I: WithImage + Send>(
        &self,
        input: &mut I,
        creating: bool,
    ) -> Result<()> {
        let slot = input.image_slot();
        match slot.take() {
            Some(ImageInput::File(file)) => {
                let path = object_path(&file.file_name, Utc::now());
                let url = self
                    .services()
                    .objects
                    .upload(&path, &file)
                    .await
                    .map_err(|e| {
                        tracing::error!("upload of `{path}` failed: {e}");
                        Error::Upload(e.to_string())
                    })?;
                tracing::debug!("uploaded `{path}`");
                *slot = Some(ImageInput::Url(url));
            }
            Some(url) => *slot = Some(url),
            None if creating => {
                *slot = Some(ImageInput::Url(
                    self.services().config.default_image_url.clone(),
                ));
            }
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::{company::NewCompany, storage::ImageFile};

    use super::*;
    use crate::{session::SessionState, sync::tests::Fixture};

    fn company(logo: Option<ImageInput>) -> NewCompany {
        NewCompany {
            name: "Acme".into(),
            logo,
            customization: Default::default(),
            event_id: "e1".into(),
            code: "ACME".into(),
        }
    }

    fn file() -> ImageInput {
        ImageInput::File(ImageFile {
            file_name: "acme logo.png".into(),
            content_type: "image/png".into(),
            bytes: vec![0x89, 0x50],
        })
    }

    #[rocket::async_test]
    async fn test_files_are_uploaded() {
        let fixture = Fixture::new();
        let ctx = fixture.context(SessionState::default()).await;

        let mut input = company(Some(file()));
        ctx.resolve_image(&mut input, true).await.unwrap();

        let paths = fixture.objects.paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("-acme-logo.png"));
        assert_eq!(
            input.logo,
            Some(ImageInput::Url(format!("https://cdn.test/{}", paths[0])))
        );
    }

    #[rocket::async_test]
    async fn test_default_image_only_on_create() {
        let fixture = Fixture::new();
        let ctx = fixture.context(SessionState::default()).await;

        let mut created = company(None);
        ctx.resolve_image(&mut created, true).await.unwrap();
        assert_eq!(
            created.logo.as_ref().and_then(ImageInput::as_url),
            Some(fixture.services.config.default_image_url.as_str())
        );

        let mut updated = company(None);
        ctx.resolve_image(&mut updated, false).await.unwrap();
        assert!(updated.logo.is_none());
    }

    #[rocket::async_test]
    async fn test_upload_failure_aborts() {
        let fixture = Fixture::new();
        fixture.objects.set_failing(true);
        let ctx = fixture.context(SessionState::default()).await;

        let mut input = company(Some(file()));
        let err = ctx.resolve_image(&mut input, true).await.unwrap_err();
        assert!(matches!(err, Error::Upload(_)));
    }
}
