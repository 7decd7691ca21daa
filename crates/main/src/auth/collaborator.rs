//! Collaborator check-in, reached through a company's shared link.

use db::{company::Company, Query, Row};
use maud::Markup;
use rocket::{
    form::Form,
    http::CookieJar,
    request::FlashMessage,
    response::{Flash, Redirect},
};
use serde::Serialize;
use trace_request::TracingSpan;
use tracing::Instrument;
use ui::page_title;

use crate::{
    auth::COMPANY_NOT_FOUND,
    error::Error,
    html::{back_with, done, error_page, page},
    sync::SyncContext,
};

#[get("/companies/<company_id>/check-in")]
pub async fn check_in_page(
    ctx: SyncContext,
    company_id: &str,
    flash: Option<FlashMessage<'_>>,
    span: TracingSpan,
) -> Markup {
    let company = ctx
        .db()
        .fetch_one::<Company>(Query::table(Company::TABLE).eq("id", company_id))
        .instrument(span.0)
        .await;

    let company = match company {
        Ok(Some(company)) => company,
        Ok(None) => return error_page(&ctx, Error::not_found(COMPANY_NOT_FOUND)),
        Err(e) => return error_page(&ctx, e.into()),
    };

    let body = maud::html! {
        (page_title(format!("Check in to {}", company.name)))
        @if let Some(logo) = &company.logo {
            img src=(logo) alt=(company.name) class="img-thumbnail mb-3" style="max-height: 120px";
        }
        form method="post" action=(format!("/companies/{}/check-in", company.id)) {
            div class="mb-3" {
                label for="company_code" class="form-label" { "Company code" }
                input type="text" class="form-control" id="company_code" name="company_code" required;
            }
            div class="mb-3" {
                label for="personal_code" class="form-label" { "Your code" }
                input type="text" class="form-control" id="personal_code" name="personal_code" required;
            }
            button type="submit" class="btn btn-primary" { "Check in" }
        }
    };

    page(&ctx, body, flash)
}

#[derive(FromForm, Serialize, Debug)]
pub struct CheckInForm {
    pub company_code: String,
    pub personal_code: String,
}

#[post("/companies/<company_id>/check-in", data = "<form>")]
pub async fn do_check_in(
    mut ctx: SyncContext,
    company_id: &str,
    form: Form<CheckInForm>,
    jar: &CookieJar<'_>,
    span: TracingSpan,
) -> Flash<Redirect> {
    let back = format!("/companies/{company_id}/check-in");
    match ctx
        .validate_collaborator(&form.company_code, &form.personal_code)
        .instrument(span.0)
        .await
    {
        Ok(collaborator) => {
            ctx.persist(jar);
            done("/collaborator", format!("Welcome, {}.", collaborator.name))
        }
        Err(e) => back_with(back, e),
    }
}

#[get("/collaborator/logout")]
pub async fn collaborator_logout(
    mut ctx: SyncContext,
    jar: &CookieJar<'_>,
) -> Flash<Redirect> {
    ctx.logout_collaborator().await;
    ctx.persist(jar);
    done("/", "You have been checked out.")
}
