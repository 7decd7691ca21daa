//! Request ids and per-request tracing spans for Rocket.

use std::fmt;

use rocket::{
    Data, Response,
    fairing::{Fairing, Info, Kind},
    http::Status,
    request::{self, FromRequest, Request},
};
use sentry::configure_scope;
use tracing::{Span, info};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// The id of the current request: the caller's `X-Request-Id` if one was
/// sent, otherwise a fresh UUID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestId {
    type Error = ();

    async fn from_request(
        request: &'r Request<'_>,
    ) -> request::Outcome<Self, Self::Error> {
        // computed at most once per request
        request::Outcome::Success(
            request
                .local_cache(|| {
                    RequestId(
                        request
                            .headers()
                            .get_one(REQUEST_ID_HEADER)
                            .map(ToString::to_string)
                            .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    )
                })
                .clone(),
        )
    }
}

/// The span opened for this request by [`RequestIdFairing`]. Handlers
/// instrument their futures with it.
pub struct TracingSpan<T = tracing::Span>(pub T);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TracingSpan {
    type Error = ();

    async fn from_request(
        request: &'r Request<'_>,
    ) -> rocket::request::Outcome<Self, ()> {
        match request.local_cache(|| TracingSpan::<Option<Span>>(None)) {
            TracingSpan(Some(span)) => {
                rocket::request::Outcome::Success(TracingSpan(span.to_owned()))
            }
            TracingSpan(None) => rocket::request::Outcome::Error((
                Status::InternalServerError,
                (),
            )),
        }
    }
}

/// Opens a span per request, tags the Sentry scope with the request id and
/// echoes the id back in the response headers.
pub struct RequestIdFairing;

#[rocket::async_trait]
impl Fairing for RequestIdFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request ID fairing",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let request_id = req.guard::<RequestId>().await;
        let user_agent = req.headers().get_one("User-Agent").unwrap_or("");

        if let request::Outcome::Success(request_id) = request_id {
            let span = tracing::info_span!(
                "request",
                http.method = %req.method(),
                http.uri = %req.uri().path(),
                http.user_agent = %user_agent,
                http.status_code = tracing::field::Empty,
                http.request_id = %request_id
            );
            span.in_scope(|| {
                tracing::debug!("received request");
                configure_scope(|scope| {
                    scope.set_tag("request_id", &request_id);
                    scope.set_transaction(Some(&format!(
                        "{} {}",
                        req.method(),
                        req.uri().path()
                    )));
                });
            });
            req.local_cache(|| TracingSpan::<Option<Span>>(Some(span)));
        }
    }

    async fn on_response<'r>(
        &self,
        req: &'r Request<'_>,
        res: &mut Response<'r>,
    ) {
        let request_id = req.guard::<RequestId>().await;

        if let Some(span) = req
            .local_cache(|| TracingSpan::<Option<Span>>(None))
            .0
            .to_owned()
        {
            let entered = span.entered();
            entered.record("http.status_code", res.status().code);
            info!("responding with {}", res.status());
            entered.exit();
        }

        if let request::Outcome::Success(request_id) = request_id {
            res.set_raw_header(REQUEST_ID_HEADER, request_id.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::{get, local::blocking::Client, routes};

    use super::*;

    #[get("/")]
    fn index(id: RequestId, span: TracingSpan) -> String {
        let _ = span.0;
        id.to_string()
    }

    fn client() -> Client {
        let rocket = rocket::build()
            .mount("/", routes![index])
            .attach(RequestIdFairing);
        Client::tracked(rocket).unwrap()
    }

    #[test]
    fn test_incoming_id_is_echoed() {
        let client = client();
        let response = client
            .get("/")
            .header(rocket::http::Header::new(REQUEST_ID_HEADER, "abc-123"))
            .dispatch();
        assert_eq!(response.headers().get_one(REQUEST_ID_HEADER), Some("abc-123"));
        assert_eq!(response.into_string().as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_missing_id_is_generated() {
        let client = client();
        let response = client.get("/").dispatch();
        let id = response.headers().get_one(REQUEST_ID_HEADER).unwrap().to_string();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(response.into_string(), Some(id));
    }
}
