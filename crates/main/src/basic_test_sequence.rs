//! The happy path through the application, driven over HTTP against an
//! in-memory store: an administrator creates an organizer, who runs a
//! raffle and sets up a company, whose collaborator then spins the wheel,
//! draws the last winner and exports the participants.

use std::sync::Arc;

use db::{
    config::AppConfig,
    memory::{MemoryObjectStore, MemoryStore},
    Db,
};
use rocket::http::{ContentType, Status};
use rocket::local::blocking::{Client, LocalResponse};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    auth::{admin::NewOrganizerForm, collaborator::CheckInForm, login::LoginForm},
    dashboard::{NewCollaboratorForm, NewPrizeForm, NewRaffleForm},
    make_rocket,
    public::RegistrationForm,
    sync::Services,
    wheel::CollaboratorSelectForm,
};

const PASSWORD: &str = "random@string123!!:";

fn get_test_rocket_instance() -> (Client, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.seed(
        "admins",
        json!({ "email": "admin@raffle.test", "password": PASSWORD }),
    );
    let services = Services::new(
        Db::new(store.clone()),
        Arc::new(MemoryObjectStore::new("https://cdn.test")),
        AppConfig::default(),
    );
    (Client::tracked(make_rocket(Arc::new(services))).unwrap(), store)
}

fn post_form<'c, T: Serialize>(client: &'c Client, uri: &str, form: &T) -> LocalResponse<'c> {
    client
        .post(uri.to_string())
        .header(ContentType::Form)
        .body(serde_urlencoded::to_string(form).unwrap())
        .dispatch()
}

fn winners(store: &MemoryStore) -> Vec<Value> {
    store
        .rows("participants")
        .into_iter()
        .filter(|p| p["winner"] == json!(true))
        .collect()
}

#[test]
fn basic_test_sequence() {
    let (client, store) = get_test_rocket_instance();

    // (1) the administrator creates an organizer
    let response = post_form(
        &client,
        "/admin/login",
        &LoginForm {
            email: "ADMIN@raffle.test".to_string(),
            password: PASSWORD.to_string(),
        },
    );
    assert_eq!(response.status(), Status::SeeOther);

    post_form(
        &client,
        "/admin/organizers",
        &NewOrganizerForm {
            name: "Expo Co".to_string(),
            responsible: None,
            email: "team@expo.test".to_string(),
            password: PASSWORD.to_string(),
            phone: None,
            organizer_code: "expo".to_string(),
        },
    );
    let organizers = store.rows("organizers");
    assert_eq!(organizers.len(), 1);
    assert_eq!(organizers[0]["organizer_code"], json!("EXPO"));

    let admin_page = client.get("/admin").dispatch().into_string().unwrap();
    assert!(admin_page.contains("Expo Co"));

    client.get("/admin/logout").dispatch();

    // (2) the organizer logs in and creates a raffle
    post_form(
        &client,
        "/login",
        &LoginForm {
            email: "team@expo.test".to_string(),
            password: PASSWORD.to_string(),
        },
    );
    post_form(
        &client,
        "/raffles/new",
        &NewRaffleForm {
            event_name: "Expo 2024".to_string(),
            raffle_name: "Grand prize".to_string(),
            quantity: 2,
            code_suffix: "promo4k".to_string(),
        },
    );
    let raffles = store.rows("raffles");
    assert_eq!(raffles.len(), 1);
    assert_eq!(raffles[0]["code"], json!("EXPOPROMO4K"));
    let raffle_id = raffles[0]["id"].as_str().unwrap().to_string();

    // (3) participants register through the public page
    let registration = client.get("/r/expopromo4k").dispatch();
    assert_eq!(registration.status(), Status::Ok);
    assert!(registration.into_string().unwrap().contains("Grand prize"));

    for (name, email) in [
        ("Ada", "ada@example.com"),
        ("Grace", "grace@example.com"),
        ("Linus", "linus@example.com"),
        ("Ada again", "ADA@example.com"),
    ] {
        post_form(
            &client,
            "/r/EXPOPROMO4K",
            &RegistrationForm {
                name: name.to_string(),
                email: email.to_string(),
                phone: None,
            },
        );
    }
    assert_eq!(store.rows("participants").len(), 3);

    // (4) the draw
    let response = client.post("/draw").dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    let drawn = winners(&store);
    assert_eq!(drawn.len(), 1);

    let dashboard = client.get("/dashboard").dispatch().into_string().unwrap();
    assert!(dashboard.contains("Grand prize"));
    assert!(dashboard.contains("1 of 2 winners drawn."));

    // (5) a company with a collaborator and a wheel of prizes
    client
        .post("/companies/new")
        .header(ContentType::Form)
        .body("name=Acme&code=acme&colors=%23ff0000%2C%2300ff00")
        .dispatch();
    let companies = store.rows("companies");
    assert_eq!(companies.len(), 1);
    assert_eq!(companies[0]["code"], json!("ACME"));
    assert_eq!(companies[0]["logo"], json!(AppConfig::default().default_image_url));
    let company_id = companies[0]["id"].as_str().unwrap().to_string();

    post_form(
        &client,
        &format!("/companies/{company_id}/collaborators"),
        &NewCollaboratorForm {
            name: "Sam".to_string(),
            code: "1234".to_string(),
        },
    );
    for prize in ["Sticker", "T-shirt"] {
        post_form(
            &client,
            &format!("/companies/{company_id}/prizes"),
            &NewPrizeForm {
                name: prize.to_string(),
            },
        );
    }
    assert_eq!(store.rows("prizes").len(), 2);

    client.get("/logout").dispatch();
    assert_eq!(
        client.get("/dashboard").dispatch().status(),
        Status::SeeOther
    );

    // (6) the collaborator checks in and spins
    let response = post_form(
        &client,
        &format!("/companies/{company_id}/check-in"),
        &CheckInForm {
            company_code: "Acme".to_string(),
            personal_code: "1234".to_string(),
        },
    );
    assert_eq!(response.headers().get_one("Location"), Some("/collaborator"));

    let wheel = client.get("/collaborator").dispatch().into_string().unwrap();
    assert!(wheel.contains("Acme"));
    assert!(wheel.contains("#ff0000"));

    client.post("/collaborator/spin").dispatch();
    let wheel = client.get("/collaborator").dispatch().into_string().unwrap();
    assert!(wheel.contains("The wheel landed on"));

    // (7) the collaborator draws the second winner of the event's raffle
    let response = client.get("/collaborator/export.csv?view=drawn").dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    client.post("/collaborator/draw").dispatch();
    assert_eq!(winners(&store).len(), 1);

    let response = post_form(
        &client,
        "/collaborator/select",
        &CollaboratorSelectForm {
            raffle_id: Some(raffle_id),
        },
    );
    assert_eq!(response.headers().get_one("Location"), Some("/collaborator"));
    let wheel = client.get("/collaborator").dispatch().into_string().unwrap();
    assert!(wheel.contains("1 of 2 winners drawn."));

    client.post("/collaborator/draw").dispatch();
    let drawn = winners(&store);
    assert_eq!(drawn.len(), 2);
    let wheel = client.get("/collaborator").dispatch().into_string().unwrap();
    assert!(wheel.contains("won!"));
    assert!(wheel.contains("2 of 2 winners drawn."));

    // (8) exports of the selected raffle
    let csv = client.get("/collaborator/export.csv?view=drawn").dispatch();
    assert_eq!(csv.content_type(), Some(ContentType::CSV));
    let csv = csv.into_string().unwrap();
    assert!(csv.starts_with("name,email,phone,drawn at\n"));
    for winner in &drawn {
        assert!(csv.contains(winner["email"].as_str().unwrap()));
    }

    let printable = client
        .get("/collaborator/export?view=registered")
        .dispatch()
        .into_string()
        .unwrap();
    assert!(printable.contains("Acme - Grand prize"));
    assert!(printable.contains("Registered participants"));
    assert!(printable.contains("Page 1 of 1"));

    // (9) the shared links
    let qr = client.get("/r/EXPOPROMO4K/qr.svg").dispatch();
    assert_eq!(qr.content_type(), Some(ContentType::SVG));
    assert!(qr.into_string().unwrap().contains("<svg"));
    assert_eq!(
        client.get("/r/NOSUCHCODE/qr.svg").dispatch().status(),
        Status::NotFound
    );
    let qr = client.get(format!("/companies/{company_id}/qr.svg")).dispatch();
    assert_eq!(qr.content_type(), Some(ContentType::SVG));
    assert_eq!(
        client.get("/companies/nope/qr.svg").dispatch().status(),
        Status::NotFound
    );
    assert!(client
        .get("/r/NOSUCHCODE")
        .dispatch()
        .into_string()
        .unwrap()
        .contains("404"));
}

#[test]
fn wrong_password_is_rejected() {
    let (client, _store) = get_test_rocket_instance();

    let response = post_form(
        &client,
        "/admin/login",
        &LoginForm {
            email: "admin@raffle.test".to_string(),
            password: "nope".to_string(),
        },
    );
    assert_eq!(response.headers().get_one("Location"), Some("/admin/login"));

    let page = client.get("/admin/login").dispatch().into_string().unwrap();
    assert!(page.contains(crate::error::INVALID_CREDENTIALS));
    assert_eq!(client.get("/admin").dispatch().status(), Status::SeeOther);
}
