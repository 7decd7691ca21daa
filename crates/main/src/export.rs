//! Participant lists for collaborators, as CSV or as a printable page.

use db::participant::Participant;
use itertools::Itertools;
use maud::{html, Markup, DOCTYPE};

use crate::{
    error::{Error, Result},
    sync::SyncContext,
};

pub const ROWS_PER_PAGE: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum ExportView {
    /// Participants who have won, with the time they were drawn.
    Drawn,
    /// Participants who have not won (yet).
    Registered,
}

impl ExportView {
    pub fn title(self) -> &'static str {
        match self {
            ExportView::Drawn => "Winners",
            ExportView::Registered => "Registered participants",
        }
    }

    fn headers(self) -> &'static [&'static str] {
        match self {
            ExportView::Drawn => &["name", "email", "phone", "drawn at"],
            ExportView::Registered => &["name", "email", "phone"],
        }
    }

    fn cells(self, participant: &Participant) -> Vec<String> {
        let mut cells = vec![
            participant.name.clone(),
            participant.email.clone(),
            participant.phone.clone().unwrap_or_default(),
        ];
        if self == ExportView::Drawn {
            cells.push(
                participant
                    .drawn_at
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default(),
            );
        }
        cells
    }

    /// The participants this view lists, in listing order.
    pub fn select<'a>(self, participants: &'a [Participant]) -> Vec<&'a Participant> {
        match self {
            ExportView::Drawn => participants
                .iter()
                .filter(|p| p.winner)
                .sorted_by_key(|p| p.drawn_at)
                .collect(),
            ExportView::Registered => participants
                .iter()
                .filter(|p| !p.winner)
                .sorted_by(|a, b| {
                    a.created_at
                        .cmp(&b.created_at)
                        .then_with(|| a.name.cmp(&b.name))
                })
                .collect(),
        }
    }
}

pub fn to_csv(view: ExportView, participants: &[Participant]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(view.headers())
        .map_err(|e| Error::Export(e.to_string()))?;
    for participant in view.select(participants) {
        writer
            .write_record(view.cells(participant))
            .map_err(|e| Error::Export(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Export(e.to_string()))
}

/// A standalone HTML document, one table per printed page.
pub fn printable(view: ExportView, heading: &str, participants: &[Participant]) -> Markup {
    let rows = view.select(participants);
    let pages: Vec<&[&Participant]> = if rows.is_empty() {
        vec![&rows[..]]
    } else {
        rows.chunks(ROWS_PER_PAGE).collect()
    };
    let total = pages.len();

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (heading) " - " (view.title()) }
                style {
                    "body { font-family: sans-serif; } "
                    "table { width: 100%; border-collapse: collapse; } "
                    "th, td { border: 1px solid #999; padding: 4px; text-align: left; } "
                    ".page { page-break-after: always; } "
                    ".page:last-child { page-break-after: auto; }"
                }
            }
            body {
                @for (i, page) in pages.iter().enumerate() {
                    section class="page" {
                        h1 { (heading) }
                        h2 { (view.title()) }
                        @if page.is_empty() {
                            p { "No participants." }
                        } @else {
                            table {
                                thead {
                                    tr {
                                        @for header in view.headers() {
                                            th { (header) }
                                        }
                                    }
                                }
                                tbody {
                                    @for participant in page.iter() {
                                        tr {
                                            @for cell in view.cells(participant) {
                                                td { (cell) }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                        footer { "Page " (i + 1) " of " (total) }
                    }
                }
            }
        }
    }
}

impl SyncContext {
    /// Participants of the raffle the checked-in collaborator selected.
    pub fn collaborator_participants(&self) -> Result<Vec<Participant>> {
        self.require_collaborator()?;
        let raffle = self
            .selected_raffle()
            .ok_or_else(|| Error::invalid("Select a raffle before exporting."))?;
        Ok(self
            .mirror()
            .participants_of(&raffle.id)
            .into_iter()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::{session::SessionState, sync::tests::Fixture};

    fn participant(i: usize, winner: bool) -> Participant {
        Participant {
            id: format!("p{i}"),
            name: format!("Person {i:02}"),
            email: format!("p{i}@example.com"),
            phone: (i % 2 == 0).then(|| format!("555-{i:04}")),
            raffle_id: "r1".to_string(),
            winner,
            drawn_at: winner
                .then(|| Utc.with_ymd_and_hms(2024, 5, 1, 10, i as u32, 0).unwrap()),
            created_at: Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, i as u32).unwrap()),
        }
    }

    #[test]
    fn test_csv_columns_follow_view() {
        let participants = vec![participant(1, true), participant(2, false)];

        let drawn = to_csv(ExportView::Drawn, &participants).unwrap();
        assert_eq!(
            drawn,
            "name,email,phone,drawn at\nPerson 01,p1@example.com,,2024-05-01 10:01\n"
        );

        let registered = to_csv(ExportView::Registered, &participants).unwrap();
        assert_eq!(
            registered,
            "name,email,phone\nPerson 02,p2@example.com,555-0002\n"
        );
    }

    #[test]
    fn test_csv_quotes_commas() {
        let mut p = participant(2, false);
        p.name = "Doe, Jane".to_string();
        let csv = to_csv(ExportView::Registered, &[p]).unwrap();
        assert!(csv.contains("\"Doe, Jane\""));
    }

    #[test]
    fn test_printable_is_paginated() {
        let participants: Vec<Participant> =
            (0..(ROWS_PER_PAGE * 2 + 3)).map(|i| participant(i, false)).collect();
        let page = printable(ExportView::Registered, "Expo", &participants).into_string();

        assert_eq!(page.matches("<section class=\"page\">").count(), 3);
        assert!(page.contains("Page 1 of 3"));
        assert!(page.contains("Page 3 of 3"));
        assert!(!page.contains("drawn at"));
    }

    #[test]
    fn test_empty_printable_has_one_page() {
        let page = printable(ExportView::Drawn, "Expo", &[]).into_string();
        assert!(page.contains("No participants."));
        assert!(page.contains("Page 1 of 1"));
    }

    #[rocket::async_test]
    async fn test_collaborator_export_follows_selected_raffle() {
        let fixture = Fixture::new();
        let (_, event) = fixture.organizer();
        let company = fixture.store.seed(
            "companies",
            json!({ "name": "Acme", "code": "ACME", "event_id": event.id }),
        );
        fixture.store.seed(
            "collaborators",
            json!({ "name": "Kim", "code": "K1", "company_id": company["id"] }),
        );
        for (id, code) in [("r1", "ABCMAIN"), ("r2", "ABCSIDE")] {
            fixture.store.seed(
                "raffles",
                json!({
                    "id": id,
                    "name": code,
                    "quantity": 1,
                    "code": code,
                    "event_id": event.id
                }),
            );
        }
        for (name, raffle) in [("Ana", "r1"), ("Bo", "r2"), ("Cy", "r2")] {
            fixture.store.seed(
                "participants",
                json!({
                    "name": name,
                    "email": format!("{name}@x.test"),
                    "raffle_id": raffle,
                    "winner": false
                }),
            );
        }

        let mut ctx = fixture.context(SessionState::default()).await;
        ctx.validate_collaborator("ACME", "K1").await.unwrap();
        assert!(matches!(
            ctx.collaborator_participants(),
            Err(Error::Invalid(_))
        ));

        ctx.select_collaborator_raffle(Some("r2")).unwrap();
        let csv = to_csv(
            ExportView::Registered,
            &ctx.collaborator_participants().unwrap(),
        )
        .unwrap();
        assert!(csv.contains("Bo@x.test"));
        assert!(csv.contains("Cy@x.test"));
        assert!(!csv.contains("Ana@x.test"));
    }
}
