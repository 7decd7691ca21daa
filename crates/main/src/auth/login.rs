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
    html::{back_with, done, page},
    sync::SyncContext,
};

#[get("/login")]
pub async fn login_page(
    ctx: SyncContext,
    flash: Option<FlashMessage<'_>>,
) -> Result<Markup, Flash<Redirect>> {
    if ctx.session().organizer.is_some() {
        return Err(Flash::error(
            Redirect::to("/dashboard"),
            "You are already logged in!",
        ));
    }

    Ok(page(&ctx, login_form("/login", "Organizer login"), flash))
}

pub(crate) fn login_form(action: &str, title: &str) -> Markup {
    maud::html! {
        (page_title(title))
        form method="post" action=(action) {
            div class="mb-3" {
                label for="email" class="form-label" { "Email" }
                input type="email" class="form-control" id="email" name="email" required;
            }
            div class="mb-3" {
                label for="password" class="form-label" { "Password" }
                input type="password" class="form-control" id="password" name="password" required;
            }
            button type="submit" class="btn btn-primary" { "Login" }
        }
    }
}

#[derive(FromForm, Serialize, Debug)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[post("/login", data = "<form>")]
pub async fn do_login(
    mut ctx: SyncContext,
    form: Form<LoginForm>,
    jar: &CookieJar<'_>,
    span: TracingSpan,
) -> Flash<Redirect> {
    async move {
        match ctx.login(&form.email, &form.password).await {
            Ok(organizer) => {
                ctx.persist(jar);
                done("/dashboard", format!("Welcome, {}.", organizer.name))
            }
            Err(e) => back_with("/login", e),
        }
    }
    .instrument(span.0)
    .await
}
