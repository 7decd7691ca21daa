//! The checked-in collaborator's pages: the prize wheel, draws in the
//! company's event and the participant exports.

use db::company::{Company, Prize};
use maud::Markup;
use rocket::{
    form::Form,
    http::{ContentType, CookieJar},
    request::FlashMessage,
    response::{Flash, Redirect},
};
use serde::Serialize;
use trace_request::TracingSpan;
use tracing::Instrument;
use ui::page_title;

use crate::{
    export::{printable, to_csv, ExportView},
    html::{back_with, done, page},
    sync::SyncContext,
};

const WHEEL: &str = "/collaborator";

/// Used when a company has not chosen its own segment colors.
const DEFAULT_COLORS: [&str; 4] = ["#6f42c1", "#fd7e14", "#20c997", "#0d6efd"];

fn segment_color(company: &Company, index: usize) -> &str {
    let colors = &company.customization.segment_colors;
    if colors.is_empty() {
        DEFAULT_COLORS[index % DEFAULT_COLORS.len()]
    } else {
        &colors[index % colors.len()]
    }
}

fn wheel(company: &Company, prizes: &[Prize]) -> Markup {
    maud::html! {
        div class="d-flex flex-wrap gap-2 my-3" {
            @for (i, prize) in prizes.iter().enumerate() {
                div class="p-3 rounded text-white"
                    style=(format!("background-color: {}", segment_color(company, i))) {
                    (prize.name)
                }
            }
        }
    }
}

#[get("/collaborator")]
pub async fn wheel_page(
    ctx: SyncContext,
    flash: Option<FlashMessage<'_>>,
) -> Result<Markup, Flash<Redirect>> {
    if let Err(e) = ctx.require_collaborator() {
        return Err(back_with("/", e));
    }
    let Some(company) = ctx.collaborator_company() else {
        return Err(Flash::error(
            Redirect::to("/"),
            "Your company could not be loaded. Please check in again.",
        ));
    };
    let prizes = ctx.prizes_of(&company.id);
    let raffles = ctx.collaborator_raffles();
    let selected = ctx.selected_raffle();
    let participants = ctx.selected_raffle_participants();
    let winners = participants.iter().filter(|p| p.winner).count();

    let body = maud::html! {
        @if let Some(logo) = &company.logo {
            img src=(logo) alt=(company.name) class="img-thumbnail mb-3" style="max-height: 120px";
        }
        (page_title(&company.name))
        @if prizes.len() < 2 {
            p class="text-muted" { "The wheel needs at least two prizes." }
        }
        (wheel(&company, &prizes))
        form method="post" action="/collaborator/spin" {
            button type="submit" class="btn btn-lg btn-success" disabled[prizes.len() < 2] { "Spin" }
        }

        h3 class="mt-4" { "Raffles" }
        @if raffles.is_empty() {
            p class="text-muted" { "There are no raffles in this event yet." }
        }
        div class="d-flex flex-wrap gap-2 mb-3" {
            @for raffle in &raffles {
                @let active = selected.as_ref().is_some_and(|s| s.id == raffle.id);
                form method="post" action="/collaborator/select" {
                    input type="hidden" name="raffle_id" value=(raffle.id);
                    button type="submit"
                        class=(if active { "btn btn-primary" } else { "btn btn-outline-primary" }) {
                        (raffle.name)
                    }
                }
            }
        }
        @if let Some(raffle) = &selected {
            p {
                (participants.len()) " registered, "
                (ctx.eligible_count()) " still in the draw, "
                (winners) " of " (raffle.quantity) " winners drawn."
            }
            form method="post" action="/collaborator/draw" {
                button type="submit" class="btn btn-success" { "Draw a winner" }
            }

            h3 class="mt-4" { "Participants" }
            ul {
                @for view in [ExportView::Drawn, ExportView::Registered] {
                    @let name = match view {
                        ExportView::Drawn => "drawn",
                        ExportView::Registered => "registered",
                    };
                    li {
                        (view.title()) ": "
                        a href=(format!("/collaborator/export.csv?view={name}")) { "CSV" }
                        " | "
                        a href=(format!("/collaborator/export?view={name}")) target="_blank" { "Print" }
                    }
                }
            }
        }
    };

    Ok(page(&ctx, body, flash))
}

#[post("/collaborator/spin")]
pub async fn do_spin(ctx: SyncContext) -> Flash<Redirect> {
    match ctx.spin() {
        Ok(prize) => done(WHEEL, format!("The wheel landed on {}!", prize.name)),
        Err(e) => back_with(WHEEL, e),
    }
}

#[derive(FromForm, Serialize, Debug)]
pub struct CollaboratorSelectForm {
    pub raffle_id: Option<String>,
}

#[post("/collaborator/select", data = "<form>")]
pub async fn do_select_raffle(
    mut ctx: SyncContext,
    form: Form<CollaboratorSelectForm>,
    jar: &CookieJar<'_>,
) -> Flash<Redirect> {
    let raffle_id = form.raffle_id.as_deref().filter(|id| !id.trim().is_empty());
    match ctx.select_collaborator_raffle(raffle_id) {
        Ok(()) => {
            ctx.persist(jar);
            done(WHEEL, "Raffle selected.")
        }
        Err(e) => back_with(WHEEL, e),
    }
}

#[post("/collaborator/draw")]
pub async fn do_collaborator_draw(ctx: SyncContext, span: TracingSpan) -> Flash<Redirect> {
    if let Err(e) = ctx.require_collaborator() {
        return back_with("/", e);
    }
    match ctx.draw_winner().instrument(span.0).await {
        Ok(Some(winner)) => done(WHEEL, format!("{} won!", winner.name)),
        Ok(None) => Flash::error(
            Redirect::to(WHEEL),
            "No winner was drawn: the raffle is complete or nobody is left.",
        ),
        Err(e) => back_with(WHEEL, e),
    }
}

#[get("/collaborator/export.csv?<view>")]
pub async fn export_csv(
    ctx: SyncContext,
    view: ExportView,
) -> Result<(ContentType, String), Flash<Redirect>> {
    ctx.collaborator_participants()
        .and_then(|participants| to_csv(view, &participants))
        .map(|csv| (ContentType::CSV, csv))
        .map_err(|e| back_with(WHEEL, e))
}

#[get("/collaborator/export?<view>")]
pub async fn export_printable(
    ctx: SyncContext,
    view: ExportView,
) -> Result<Markup, Flash<Redirect>> {
    let participants = ctx
        .collaborator_participants()
        .map_err(|e| back_with(WHEEL, e))?;
    let company = ctx
        .collaborator_company()
        .map(|company| company.name)
        .unwrap_or_default();
    let heading = match ctx.selected_raffle() {
        Some(raffle) => format!("{company} - {}", raffle.name),
        None => company,
    };
    Ok(printable(view, &heading, &participants))
}
