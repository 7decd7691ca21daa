//! The administrator's pages: organizer accounts and acting as an
//! organizer.

use db::organizer::NewOrganizer;
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
    auth::login::{login_form, LoginForm},
    html::{back_with, done, error_page, page},
    sync::SyncContext,
};

#[get("/admin/login")]
pub async fn admin_login_page(
    ctx: SyncContext,
    flash: Option<FlashMessage<'_>>,
) -> Result<Markup, Redirect> {
    if ctx.session().acting_as_super_admin() {
        return Err(Redirect::to("/admin"));
    }
    Ok(page(&ctx, login_form("/admin/login", "Administrator login"), flash))
}

#[post("/admin/login", data = "<form>")]
pub async fn do_admin_login(
    mut ctx: SyncContext,
    form: Form<LoginForm>,
    jar: &CookieJar<'_>,
    span: TracingSpan,
) -> Flash<Redirect> {
    async move {
        match ctx.login_super_admin(&form.email, &form.password).await {
            Ok(()) => {
                ctx.persist(jar);
                done("/admin", "Logged in as administrator.")
            }
            Err(e) => back_with("/admin/login", e),
        }
    }
    .instrument(span.0)
    .await
}

#[get("/admin/logout")]
pub async fn admin_logout(mut ctx: SyncContext, jar: &CookieJar<'_>) -> Flash<Redirect> {
    ctx.logout_super_admin().await;
    ctx.persist(jar);
    done("/", "You have been logged out.")
}

#[get("/admin")]
pub async fn admin_page(
    ctx: SyncContext,
    flash: Option<FlashMessage<'_>>,
) -> Result<Markup, Flash<Redirect>> {
    if let Err(e) = ctx.require_super_admin() {
        return Err(back_with("/admin/login", e));
    }

    let body = {
        let mirror = ctx.mirror();
        maud::html! {
            (page_title("Organizers"))
            table class="table" {
                thead {
                    tr {
                        th scope="col" { "Name" }
                        th scope="col" { "Email" }
                        th scope="col" { "Code" }
                        th scope="col" { "Events" }
                    }
                }
                tbody {
                    @for organizer in &mirror.organizers {
                        tr {
                            th scope="row" { (organizer.name) }
                            td { (organizer.email) }
                            td { code { (organizer.organizer_code) } }
                            td {
                                @for event in mirror.events_by_date(&organizer.id) {
                                    form method="post" class="d-inline me-2"
                                        action=(format!("/admin/view-as/{}/{}", organizer.id, event.id)) {
                                        button type="submit" class="btn btn-sm btn-outline-primary" {
                                            "View " (event.name)
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }

            h3 { "New organizer" }
            form method="post" action="/admin/organizers" {
                div class="row g-3" {
                    div class="col-md-6" {
                        label for="name" class="form-label" { "Name" }
                        input type="text" class="form-control" id="name" name="name" required;
                    }
                    div class="col-md-6" {
                        label for="responsible" class="form-label" { "Responsible person" }
                        input type="text" class="form-control" id="responsible" name="responsible";
                    }
                    div class="col-md-6" {
                        label for="email" class="form-label" { "Email" }
                        input type="email" class="form-control" id="email" name="email" required;
                    }
                    div class="col-md-6" {
                        label for="password" class="form-label" { "Password" }
                        input type="password" class="form-control" id="password" name="password" required;
                    }
                    div class="col-md-6" {
                        label for="phone" class="form-label" { "Phone" }
                        input type="tel" class="form-control" id="phone" name="phone";
                    }
                    div class="col-md-6" {
                        label for="organizer_code" class="form-label" { "Raffle code prefix" }
                        input type="text" class="form-control" id="organizer_code" name="organizer_code" required;
                    }
                }
                button type="submit" class="btn btn-primary mt-3" { "Create organizer" }
            }
        }
    };

    Ok(page(&ctx, body, flash))
}

#[derive(FromForm, Serialize, Debug)]
pub struct NewOrganizerForm {
    pub name: String,
    pub responsible: Option<String>,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub organizer_code: String,
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

#[post("/admin/organizers", data = "<form>")]
pub async fn do_create_organizer(
    ctx: SyncContext,
    form: Form<NewOrganizerForm>,
    span: TracingSpan,
) -> Flash<Redirect> {
    let input = NewOrganizer {
        name: form.name.trim().to_string(),
        responsible: optional(&form.responsible),
        email: form.email.clone(),
        password: form.password.clone(),
        phone: optional(&form.phone),
        photo: None,
        organizer_code: form.organizer_code.clone(),
    };

    match ctx.create_organizer(input).instrument(span.0).await {
        Ok(organizer) => done("/admin", format!("Created {}.", organizer.name)),
        Err(e) => back_with("/admin", e),
    }
}

#[post("/admin/view-as/<organizer_id>/<event_id>")]
pub async fn view_as(
    mut ctx: SyncContext,
    organizer_id: &str,
    event_id: &str,
    jar: &CookieJar<'_>,
    span: TracingSpan,
) -> Result<Redirect, Markup> {
    match ctx
        .view_as_organizer(organizer_id, event_id)
        .instrument(span.0)
        .await
    {
        Ok(()) => {
            ctx.persist(jar);
            Ok(Redirect::to("/dashboard"))
        }
        Err(e) => Err(error_page(&ctx, e)),
    }
}

#[post("/admin/stop-impersonating")]
pub async fn stop_impersonating(mut ctx: SyncContext, jar: &CookieJar<'_>) -> Redirect {
    ctx.stop_impersonating().await;
    ctx.persist(jar);
    Redirect::to("/admin")
}
