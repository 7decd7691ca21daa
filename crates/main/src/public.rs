//! Pages anyone can reach: raffle registration and the QR codes of the
//! shared links.

use db::{company::Company, Query, Row};
use maud::Markup;
use rocket::{
    form::Form,
    http::{ContentType, Status},
    request::FlashMessage,
    response::{Flash, Redirect},
};
use serde::Serialize;
use trace_request::TracingSpan;
use tracing::Instrument;
use ui::page_title;

use crate::{
    error::Error,
    html::{back_with, done, error_page, page},
    share::qr_svg,
    sync::SyncContext,
};

const RAFFLE_NOT_FOUND: &str = "There is no raffle with that code.";

#[get("/r/<code>")]
pub async fn registration_page(
    ctx: SyncContext,
    code: &str,
    flash: Option<FlashMessage<'_>>,
    span: TracingSpan,
) -> Markup {
    let found = match ctx.find_raffle_by_code(code).instrument(span.0).await {
        Ok(Some(found)) => found,
        Ok(None) => return error_page(&ctx, Error::not_found(RAFFLE_NOT_FOUND)),
        Err(e) => return error_page(&ctx, e),
    };
    let raffle = &found.raffle;

    let body = maud::html! {
        @if let Some(event) = &found.event {
            @if let Some(banner) = &event.banner {
                img src=(banner) alt=(event.name) class="img-fluid mb-3";
            }
            p class="text-muted" { (event.name) " - " (event.date.format("%Y-%m-%d")) }
        }
        (page_title(&raffle.name))
        form method="post" action=(format!("/r/{}", raffle.code)) {
            div class="mb-3" {
                label for="name" class="form-label" { "Name" }
                input type="text" class="form-control" id="name" name="name" required;
            }
            div class="mb-3" {
                label for="email" class="form-label" { "Email" }
                input type="email" class="form-control" id="email" name="email" required;
            }
            div class="mb-3" {
                label for="phone" class="form-label" { "Phone (optional)" }
                input type="tel" class="form-control" id="phone" name="phone";
            }
            button type="submit" class="btn btn-primary" { "Enter the raffle" }
        }
    };

    page(&ctx, body, flash)
}

#[derive(FromForm, Serialize, Debug)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[post("/r/<code>", data = "<form>")]
pub async fn do_register(
    ctx: SyncContext,
    code: &str,
    form: Form<RegistrationForm>,
    span: TracingSpan,
) -> Flash<Redirect> {
    let back = format!("/r/{code}");
    async move {
        let raffle = match ctx.find_raffle_by_code(code).await {
            Ok(Some(found)) => found.raffle,
            Ok(None) => return back_with(back, Error::not_found(RAFFLE_NOT_FOUND)),
            Err(e) => return back_with(back, e),
        };
        let phone = form
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty());
        match ctx
            .add_participant(&raffle.id, &form.name, &form.email, phone)
            .await
        {
            Ok(_) => done(back, "You are registered. Good luck!"),
            Err(e) => back_with(back, e),
        }
    }
    .instrument(span.0)
    .await
}

fn svg_response(link: crate::error::Result<String>) -> Result<(ContentType, String), Status> {
    link.and_then(|link| qr_svg(&link))
        .map(|svg| (ContentType::SVG, svg))
        .map_err(|e| {
            tracing::warn!("could not render QR code: {e}");
            Status::InternalServerError
        })
}

#[get("/r/<code>/qr.svg")]
pub async fn raffle_qr(
    ctx: SyncContext,
    code: &str,
    span: TracingSpan,
) -> Result<(ContentType, String), Status> {
    match ctx.find_raffle_by_code(code).instrument(span.0).await {
        Ok(Some(found)) => svg_response(ctx.raffle_link(&found.raffle.code)),
        Ok(None) => Err(Status::NotFound),
        Err(e) => {
            tracing::error!("raffle lookup failed: {e}");
            Err(Status::ServiceUnavailable)
        }
    }
}

#[get("/companies/<company_id>/qr.svg")]
pub async fn company_qr(
    ctx: SyncContext,
    company_id: &str,
    span: TracingSpan,
) -> Result<(ContentType, String), Status> {
    let company = ctx
        .db()
        .fetch_one::<Company>(Query::table(Company::TABLE).eq("id", company_id))
        .instrument(span.0)
        .await;
    match company {
        Ok(Some(company)) => svg_response(ctx.company_link(&company.id)),
        Ok(None) => Err(Status::NotFound),
        Err(e) => {
            tracing::error!("company lookup failed: {e}");
            Err(Status::ServiceUnavailable)
        }
    }
}
