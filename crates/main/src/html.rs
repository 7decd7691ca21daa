//! Glue between operations and pages: rendering with the session's
//! navigation, and turning errors into flashes or error pages.

use maud::Markup;
use rocket::{
    request::FlashMessage,
    response::{Flash, Redirect},
};
use ui::{error_403, error_404, page_of_body_and_flash_msg};

use crate::{error::Error, sync::SyncContext};

pub fn page(ctx: &SyncContext, body: Markup, flash: Option<FlashMessage<'_>>) -> Markup {
    page_of_body_and_flash_msg(
        body,
        flash.map(|flash| flash.into_inner()),
        &ctx.session().viewer(),
    )
}

/// Full-page rendering of an error, for `GET` handlers.
pub fn error_page(ctx: &SyncContext, error: Error) -> Markup {
    let viewer = ctx.session().viewer();
    match error {
        Error::NotFound(msg) => error_404(Some(msg), &viewer),
        Error::Forbidden(msg) => error_403(Some(msg), &viewer),
        other => {
            tracing::error!("request failed: {other}");
            page_of_body_and_flash_msg(
                maud::html! {},
                Some(("error".to_string(), other.to_string())),
                &viewer,
            )
        }
    }
}

/// Redirects to `to` with the error as a flash message, for form posts.
pub fn back_with(to: impl Into<String>, error: Error) -> Flash<Redirect> {
    if let Error::Store(e) = &error {
        tracing::error!("store failure: {e}");
    }
    Flash::error(Redirect::to(to.into()), error.to_string())
}

pub fn done(to: impl Into<String>, msg: impl Into<String>) -> Flash<Redirect> {
    Flash::success(Redirect::to(to.into()), msg.into())
}
