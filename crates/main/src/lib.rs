use std::sync::Arc;

use auth::{
    admin::{
        admin_login_page, admin_logout, admin_page, do_admin_login,
        do_create_organizer, stop_impersonating, view_as,
    },
    collaborator::{check_in_page, collaborator_logout, do_check_in},
    login::{do_login, login_page},
    logout,
};
use dashboard::{
    dashboard_page, do_create_collaborator, do_create_company,
    do_create_prize, do_create_raffle, do_delete_collaborator,
    do_delete_company, do_delete_prize, do_delete_raffle, do_draw, do_select,
};
use html::page;
use public::{company_qr, do_register, raffle_qr, registration_page};
use rocket::{request::FlashMessage, Build, Rocket};
use sync::{Services, SyncContext};
use trace_request::RequestIdFairing;
use wheel::{
    do_collaborator_draw, do_select_raffle, do_spin, export_csv, export_printable, wheel_page,
};

pub mod auth;
pub mod dashboard;
pub mod draw;
pub mod error;
pub mod export;
pub mod html;
pub mod public;
pub mod raffles;
pub mod session;
pub mod share;
pub mod sync;
pub mod util;
pub mod wheel;

#[cfg(test)]
mod basic_test_sequence;

#[macro_use]
extern crate rocket;

#[get("/")]
fn index(ctx: SyncContext, flash: Option<FlashMessage<'_>>) -> maud::Markup {
    let session = ctx.session();
    page(
        &ctx,
        maud::html! {
            div {
                h1 { "Raffles" }
                @if session.effective_organizer().is_some() {
                    p { a href="/dashboard" { "Go to your dashboard" } }
                } @else if session.acting_as_super_admin() {
                    p { a href="/admin" { "Manage organizers" } }
                } @else if session.collaborator.is_some() {
                    p { a href="/collaborator" { "Spin the wheel" } }
                } @else {
                    p { "Scan a raffle's QR code to take part, or log in to run your own." }
                }
            }
        },
        flash,
    )
}

pub fn make_rocket(services: Arc<Services>) -> Rocket<Build> {
    rocket::build()
        .manage(services)
        .mount(
            "/",
            routes![
                index,
                login_page,
                do_login,
                logout::logout,
                admin_login_page,
                do_admin_login,
                admin_logout,
                admin_page,
                do_create_organizer,
                view_as,
                stop_impersonating,
                check_in_page,
                do_check_in,
                collaborator_logout,
                dashboard_page,
                do_select,
                do_create_raffle,
                do_delete_raffle,
                do_draw,
                do_create_company,
                do_delete_company,
                do_create_collaborator,
                do_delete_collaborator,
                do_create_prize,
                do_delete_prize,
                registration_page,
                do_register,
                raffle_qr,
                company_qr,
                wheel_page,
                do_spin,
                do_select_raffle,
                do_collaborator_draw,
                export_csv,
                export_printable
            ],
        )
        .attach(RequestIdFairing)
}
