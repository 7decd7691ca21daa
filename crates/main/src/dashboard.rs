//! The organizer's dashboard: events, raffles, the draw and the companies
//! taking part in the selected event.

use db::{
    company::{Company, Customization, NewCollaborator, NewCompany, NewPrize},
    participant::Participant,
    raffle::Raffle,
    storage::{ImageFile, ImageInput},
};
use maud::Markup;
use rocket::{
    form::Form,
    fs::TempFile,
    http::CookieJar,
    request::FlashMessage,
    response::{Flash, Redirect},
    tokio::io::AsyncReadExt,
};
use serde::Serialize;
use trace_request::TracingSpan;
use tracing::Instrument;
use ui::page_title;

use crate::{
    error::{Error, Result},
    html::{back_with, done, page},
    sync::SyncContext,
};

const DASHBOARD: &str = "/dashboard";

#[get("/dashboard")]
pub async fn dashboard_page(
    ctx: SyncContext,
    flash: Option<FlashMessage<'_>>,
) -> Result<Markup, Flash<Redirect>> {
    if let Err(e) = ctx.require_organizer() {
        return Err(back_with("/login", e));
    }

    let events = ctx.organizer_events();
    let selected_event = ctx.selected_event();
    let raffles = ctx.selected_event_raffles();
    let selected_raffle = ctx.selected_raffle();
    let companies = ctx.selected_event_companies();

    let body = maud::html! {
        (page_title("Dashboard"))

        form method="post" action="/dashboard/select" class="row g-2 mb-4" {
            div class="col-auto" {
                select class="form-select" name="event_id" {
                    option value="" { "No event selected" }
                    @for event in &events {
                        option value=(event.id)
                            selected[selected_event.as_ref().is_some_and(|e| e.id == event.id)] {
                            (event.name) " (" (event.date.format("%Y-%m-%d")) ")"
                        }
                    }
                }
            }
            div class="col-auto" {
                button type="submit" class="btn btn-outline-primary" { "Select" }
            }
        }

        @if let Some(event) = &selected_event {
            h2 { (event.name) }
            @if let Some(details) = &event.details {
                p class="lead" { (details) }
            }
        }

        (raffle_list(&ctx, &raffles, selected_raffle.as_ref()))

        @if let Some(raffle) = &selected_raffle {
            (raffle_panel(raffle, &ctx.selected_raffle_participants(), ctx.eligible_count()))
        }

        h3 class="mt-4" { "New raffle" }
        form method="post" action="/raffles/new" class="row g-3" {
            @if selected_event.is_none() {
                div class="col-md-6" {
                    label for="event_name" class="form-label" { "Event name" }
                    input type="text" class="form-control" id="event_name" name="event_name" required;
                }
            } @else {
                input type="hidden" name="event_name" value="";
            }
            div class="col-md-6" {
                label for="raffle_name" class="form-label" { "Raffle name" }
                input type="text" class="form-control" id="raffle_name" name="raffle_name" required;
            }
            div class="col-md-3" {
                label for="quantity" class="form-label" { "Winners" }
                input type="number" min="1" value="1" class="form-control" id="quantity" name="quantity" required;
            }
            div class="col-md-3" {
                label for="code_suffix" class="form-label" { "Code" }
                input type="text" class="form-control" id="code_suffix" name="code_suffix" required;
            }
            div class="col-12" {
                button type="submit" class="btn btn-primary" { "Create raffle" }
            }
        }

        @if selected_event.is_some() {
            h3 class="mt-4" { "Companies" }
            @for company in &companies {
                (company_card(&ctx, company))
            }
            form method="post" action="/companies/new" enctype="multipart/form-data" class="row g-3 mt-2" {
                div class="col-md-4" {
                    label for="company_name" class="form-label" { "Company name" }
                    input type="text" class="form-control" id="company_name" name="name" required;
                }
                div class="col-md-2" {
                    label for="company_code" class="form-label" { "Code" }
                    input type="text" class="form-control" id="company_code" name="code" required;
                }
                div class="col-md-3" {
                    label for="colors" class="form-label" { "Wheel colors" }
                    input type="text" class="form-control" id="colors" name="colors" placeholder="#ff0000, #00ff00";
                }
                div class="col-md-3" {
                    label for="logo" class="form-label" { "Logo" }
                    input type="file" accept="image/*" class="form-control" id="logo" name="logo";
                }
                div class="col-12" {
                    button type="submit" class="btn btn-primary" { "Add company" }
                }
            }
        }
    };

    Ok(page(&ctx, body, flash))
}

fn raffle_list(ctx: &SyncContext, raffles: &[Raffle], selected: Option<&Raffle>) -> Markup {
    maud::html! {
        @if !raffles.is_empty() {
            table class="table" {
                thead {
                    tr {
                        th scope="col" { "Raffle" }
                        th scope="col" { "Code" }
                        th scope="col" { "Winners" }
                        th scope="col" { "Link" }
                        th scope="col" {}
                    }
                }
                tbody {
                    @for raffle in raffles {
                        tr class=[selected.is_some_and(|s| s.id == raffle.id).then_some("table-active")] {
                            th scope="row" { (raffle.name) }
                            td { code { (raffle.code) } }
                            td { (raffle.quantity) }
                            td {
                                @if let Ok(link) = ctx.raffle_link(&raffle.code) {
                                    a href=(link) { (link) }
                                    " "
                                    a href=(format!("/r/{}/qr.svg", raffle.code)) { "QR" }
                                }
                            }
                            td {
                                form method="post" action="/dashboard/select" class="d-inline" {
                                    input type="hidden" name="event_id" value=(raffle.event_id);
                                    input type="hidden" name="raffle_id" value=(raffle.id);
                                    button type="submit" class="btn btn-sm btn-outline-primary me-1" { "Open" }
                                }
                                form method="post" action=(format!("/raffles/{}/delete", raffle.id)) class="d-inline" {
                                    button type="submit" class="btn btn-sm btn-outline-danger" { "Delete" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn raffle_panel(raffle: &Raffle, participants: &[Participant], eligible: usize) -> Markup {
    let winners = participants.iter().filter(|p| p.winner).count();
    maud::html! {
        div class="card mb-4" {
            div class="card-body" {
                h3 class="card-title" { (raffle.name) }
                p {
                    (participants.len()) " registered, "
                    (eligible) " still in the draw, "
                    (winners) " of " (raffle.quantity) " winners drawn."
                }
                form method="post" action="/draw" {
                    button type="submit" class="btn btn-success" { "Draw a winner" }
                }
                table class="table mt-3" {
                    thead {
                        tr {
                            th scope="col" { "Name" }
                            th scope="col" { "Email" }
                            th scope="col" { "Phone" }
                            th scope="col" { "Drawn" }
                        }
                    }
                    tbody {
                        @for participant in participants {
                            tr class=[participant.winner.then_some("table-success")] {
                                td { (participant.name) }
                                td { (participant.email) }
                                td { (participant.phone.as_deref().unwrap_or("")) }
                                td {
                                    @if let Some(at) = participant.drawn_at {
                                        (at.format("%Y-%m-%d %H:%M"))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn company_card(ctx: &SyncContext, company: &Company) -> Markup {
    let collaborators = ctx.collaborators_of(&company.id);
    let prizes = ctx.prizes_of(&company.id);
    maud::html! {
        div class="card mb-3" {
            div class="card-body" {
                h4 class="card-title" {
                    (company.name) " " small class="text-muted" { code { (company.code) } }
                }
                @if let Ok(link) = ctx.company_link(&company.id) {
                    p {
                        "Check-in link: " a href=(link) { (link) }
                        " "
                        a href=(format!("/companies/{}/qr.svg", company.id)) { "QR" }
                    }
                }
                div class="row" {
                    div class="col-md-6" {
                        h5 { "Collaborators" }
                        ul {
                            @for collaborator in &collaborators {
                                li {
                                    (collaborator.name) " (" code { (collaborator.code) } ") "
                                    form method="post" class="d-inline"
                                        action=(format!("/collaborators/{}/delete", collaborator.id)) {
                                        button type="submit" class="btn btn-sm btn-link text-danger" { "Remove" }
                                    }
                                }
                            }
                        }
                        form method="post" action=(format!("/companies/{}/collaborators", company.id)) class="row g-2" {
                            div class="col" {
                                input type="text" class="form-control" name="name" placeholder="Name" required;
                            }
                            div class="col" {
                                input type="text" class="form-control" name="code" placeholder="Code" required;
                            }
                            div class="col-auto" {
                                button type="submit" class="btn btn-outline-primary" { "Add" }
                            }
                        }
                    }
                    div class="col-md-6" {
                        h5 { "Prizes" }
                        ul {
                            @for prize in &prizes {
                                li {
                                    (prize.name) " "
                                    form method="post" class="d-inline"
                                        action=(format!("/prizes/{}/delete", prize.id)) {
                                        button type="submit" class="btn btn-sm btn-link text-danger" { "Remove" }
                                    }
                                }
                            }
                        }
                        form method="post" action=(format!("/companies/{}/prizes", company.id)) class="row g-2" {
                            div class="col" {
                                input type="text" class="form-control" name="name" placeholder="Prize" required;
                            }
                            div class="col-auto" {
                                button type="submit" class="btn btn-outline-primary" { "Add" }
                            }
                        }
                    }
                }
                form method="post" action=(format!("/companies/{}/delete", company.id)) class="mt-2" {
                    button type="submit" class="btn btn-sm btn-outline-danger" { "Delete company" }
                }
            }
        }
    }
}

#[derive(FromForm, Serialize, Debug, Default)]
pub struct SelectForm {
    pub event_id: Option<String>,
    pub raffle_id: Option<String>,
}

fn present(value: &Option<String>) -> Option<String> {
    value.clone().filter(|value| !value.trim().is_empty())
}

#[post("/dashboard/select", data = "<form>")]
pub async fn do_select(
    mut ctx: SyncContext,
    form: Form<SelectForm>,
    jar: &CookieJar<'_>,
) -> Flash<Redirect> {
    if let Err(e) = ctx.require_organizer() {
        return back_with("/login", e);
    }

    let event_id = present(&form.event_id);
    if let Some(id) = &event_id {
        if let Err(e) = ctx.owned_event(id) {
            return back_with(DASHBOARD, e);
        }
    }
    let raffle_id = match (&event_id, present(&form.raffle_id)) {
        (Some(event_id), Some(raffle_id)) => match ctx.owned_raffle(&raffle_id) {
            Ok(raffle) if &raffle.event_id == event_id => Some(raffle_id),
            Ok(_) => {
                return back_with(
                    DASHBOARD,
                    Error::invalid("That raffle belongs to another event."),
                )
            }
            Err(e) => return back_with(DASHBOARD, e),
        },
        _ => None,
    };

    let session = ctx.session_mut();
    session.select_event(event_id);
    session.select_raffle(raffle_id);
    ctx.persist(jar);
    Flash::success(Redirect::to(DASHBOARD), "Selection updated.")
}

#[derive(FromForm, Serialize, Debug)]
pub struct NewRaffleForm {
    pub event_name: String,
    pub raffle_name: String,
    pub quantity: i64,
    pub code_suffix: String,
}

#[post("/raffles/new", data = "<form>")]
pub async fn do_create_raffle(
    mut ctx: SyncContext,
    form: Form<NewRaffleForm>,
    jar: &CookieJar<'_>,
    span: TracingSpan,
) -> Flash<Redirect> {
    async move {
        match ctx
            .create_event_with_raffle(
                &form.event_name,
                &form.raffle_name,
                form.quantity,
                &form.code_suffix,
            )
            .await
        {
            Ok(raffle) => {
                ctx.persist(jar);
                done(DASHBOARD, format!("Created raffle {}.", raffle.code))
            }
            Err(e) => back_with(DASHBOARD, e),
        }
    }
    .instrument(span.0)
    .await
}

#[post("/raffles/<raffle_id>/delete")]
pub async fn do_delete_raffle(
    mut ctx: SyncContext,
    raffle_id: &str,
    jar: &CookieJar<'_>,
    span: TracingSpan,
) -> Flash<Redirect> {
    match ctx.delete_raffle(raffle_id).instrument(span.0).await {
        Ok(()) => {
            ctx.persist(jar);
            done(DASHBOARD, "Raffle deleted.")
        }
        Err(e) => back_with(DASHBOARD, e),
    }
}

#[post("/draw")]
pub async fn do_draw(ctx: SyncContext, span: TracingSpan) -> Flash<Redirect> {
    match ctx.draw_winner().instrument(span.0).await {
        Ok(Some(winner)) => done(DASHBOARD, format!("{} won!", winner.name)),
        Ok(None) => Flash::error(
            Redirect::to(DASHBOARD),
            "No winner was drawn: the raffle is complete or nobody is left.",
        ),
        Err(e) => back_with(DASHBOARD, e),
    }
}

#[derive(FromForm)]
pub struct NewCompanyForm<'r> {
    pub name: String,
    pub code: String,
    pub colors: Option<String>,
    pub logo: Option<TempFile<'r>>,
}

/// Reads an uploaded file into memory. Empty uploads (a file input left
/// blank) count as no upload.
async fn read_upload(file: Option<&TempFile<'_>>) -> Result<Option<ImageInput>> {
    let Some(file) = file.filter(|file| file.len() > 0) else {
        return Ok(None);
    };

    let mut bytes = Vec::with_capacity(file.len() as usize);
    let reader = file
        .open()
        .await
        .map_err(|e| Error::Upload(e.to_string()))?;
    rocket::tokio::pin!(reader);
    reader
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| Error::Upload(e.to_string()))?;

    let extension = file
        .content_type()
        .and_then(|ct| ct.extension())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    Ok(Some(ImageInput::File(ImageFile {
        file_name: format!("{}{extension}", file.name().unwrap_or("upload")),
        content_type: file
            .content_type()
            .map(ToString::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        bytes,
    })))
}

fn segment_colors(colors: Option<&str>) -> Vec<String> {
    colors
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|color| !color.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[post("/companies/new", data = "<form>")]
pub async fn do_create_company(
    ctx: SyncContext,
    form: Form<NewCompanyForm<'_>>,
    span: TracingSpan,
) -> Flash<Redirect> {
    async move {
        let Some(event) = ctx.selected_event() else {
            return back_with(DASHBOARD, Error::invalid("Select an event first."));
        };
        let logo = match read_upload(form.logo.as_ref()).await {
            Ok(logo) => logo,
            Err(e) => return back_with(DASHBOARD, e),
        };
        let input = NewCompany {
            name: form.name.trim().to_string(),
            logo,
            customization: Customization {
                segment_colors: segment_colors(form.colors.as_deref()),
            },
            event_id: event.id,
            code: form.code.clone(),
        };
        match ctx.create_company(input).await {
            Ok(company) => done(DASHBOARD, format!("Added {}.", company.name)),
            Err(e) => back_with(DASHBOARD, e),
        }
    }
    .instrument(span.0)
    .await
}

#[post("/companies/<company_id>/delete")]
pub async fn do_delete_company(
    ctx: SyncContext,
    company_id: &str,
    span: TracingSpan,
) -> Flash<Redirect> {
    match ctx.delete_company(company_id).instrument(span.0).await {
        Ok(()) => done(DASHBOARD, "Company deleted."),
        Err(e) => back_with(DASHBOARD, e),
    }
}

#[derive(FromForm, Serialize, Debug)]
pub struct NewCollaboratorForm {
    pub name: String,
    pub code: String,
}

#[post("/companies/<company_id>/collaborators", data = "<form>")]
pub async fn do_create_collaborator(
    ctx: SyncContext,
    company_id: &str,
    form: Form<NewCollaboratorForm>,
    span: TracingSpan,
) -> Flash<Redirect> {
    let input = NewCollaborator {
        name: form.name.trim().to_string(),
        photo: None,
        code: form.code.clone(),
        company_id: company_id.to_string(),
    };
    match ctx.create_collaborator(input).instrument(span.0).await {
        Ok(collaborator) => done(DASHBOARD, format!("Added {}.", collaborator.name)),
        Err(e) => back_with(DASHBOARD, e),
    }
}

#[post("/collaborators/<collaborator_id>/delete")]
pub async fn do_delete_collaborator(
    ctx: SyncContext,
    collaborator_id: &str,
    span: TracingSpan,
) -> Flash<Redirect> {
    match ctx.delete_collaborator(collaborator_id).instrument(span.0).await {
        Ok(()) => done(DASHBOARD, "Collaborator removed."),
        Err(e) => back_with(DASHBOARD, e),
    }
}

#[derive(FromForm, Serialize, Debug)]
pub struct NewPrizeForm {
    pub name: String,
}

#[post("/companies/<company_id>/prizes", data = "<form>")]
pub async fn do_create_prize(
    ctx: SyncContext,
    company_id: &str,
    form: Form<NewPrizeForm>,
    span: TracingSpan,
) -> Flash<Redirect> {
    let input = NewPrize {
        name: form.name.trim().to_string(),
        company_id: company_id.to_string(),
    };
    match ctx.create_prize(input).instrument(span.0).await {
        Ok(prize) => done(DASHBOARD, format!("Added {}.", prize.name)),
        Err(e) => back_with(DASHBOARD, e),
    }
}

#[post("/prizes/<prize_id>/delete")]
pub async fn do_delete_prize(
    ctx: SyncContext,
    prize_id: &str,
    span: TracingSpan,
) -> Flash<Redirect> {
    match ctx.delete_prize(prize_id).instrument(span.0).await {
        Ok(()) => done(DASHBOARD, "Prize removed."),
        Err(e) => back_with(DASHBOARD, e),
    }
}
