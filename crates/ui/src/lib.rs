use maud::{html, Markup, DOCTYPE};

/// Who the page is being rendered for, as far as the navigation bar is
/// concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    SuperAdmin,
    Organizer { name: String, impersonated: bool },
    Collaborator(String),
}

/// Renders the page with a flash message above the body. The flash is a
/// `(kind, message)` pair; kind `success` is shown in green, everything
/// else as an error.
pub fn page_of_body_and_flash_msg(
    body: Markup,
    flash: Option<(String, String)>,
    viewer: &Viewer,
) -> Markup {
    page_of_body(
        maud::html! {
            @if let Some((kind, flash_msg)) = flash {
                div class="container mt-3" {
                    div class=(if kind == "success" { "alert alert-success" } else { "alert alert-danger" }) role="alert" {
                        (flash_msg)
                    }
                }
            }
            (body)
        },
        viewer,
    )
}

fn nav_link(href: &str, text: &str) -> Markup {
    html! {
        li class="nav-item nav-justify-start" {
            a class="nav-link text-white" href=(href) { (text) }
        }
    }
}

pub fn page_of_body_with_extra_head(
    body: Markup,
    viewer: &Viewer,
    extra_head: Option<Markup>,
) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                title { "Raffle" }
                link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-QWTKZyjpPEjISv5WaRU9OFeRpok6YctnYmDr5pNlyT2bRjXh0JMhjY6hW+ALEwIH" crossorigin="anonymous" {}
                meta name="viewport" content="width=device-width, initial-scale=1" {}
                @if let Some(head) = extra_head {
                    (head)
                }
            }
            body {
                nav class="navbar navbar-expand" style="background-color: #6f42c1" data-bs-theme="dark" {
                    div class="container-fluid" {
                        ul class="nav nav-justify-start" data-bs-theme="dark" {
                            (nav_link("/", "Home"))
                        }
                        ul class="nav nav-justify-end" data-bs-theme="dark" {
                            @match viewer {
                                Viewer::Organizer { name, impersonated } => {
                                    (nav_link("/dashboard", name))
                                    @if *impersonated {
                                        li class="nav-item" {
                                            form method="post" action="/admin/stop-impersonating" {
                                                button type="submit" class="btn btn-link nav-link text-white" { "Back to admin" }
                                            }
                                        }
                                    } @else {
                                        (nav_link("/logout", "Logout"))
                                    }
                                }
                                Viewer::SuperAdmin => {
                                    (nav_link("/admin", "Admin"))
                                    (nav_link("/admin/logout", "Logout"))
                                }
                                Viewer::Collaborator(name) => {
                                    (nav_link("/collaborator", name))
                                    (nav_link("/collaborator/logout", "Logout"))
                                }
                                Viewer::Anonymous => {
                                    (nav_link("/login", "Organizer login"))
                                    (nav_link("/admin/login", "Admin"))
                                }
                            }
                        }
                    }
                }
                div class="container" {
                    div class="mt-4" {
                        (body)
                    }
                }
            }
        }
    }
}

/// Renders an HTML page with the provided body markup.
pub fn page_of_body(body: Markup, viewer: &Viewer) -> Markup {
    page_of_body_with_extra_head(body, viewer, None)
}

pub fn error_403<T: ToString>(error: Option<T>, viewer: &Viewer) -> Markup {
    page_of_body(
        html! {
            div class="text-center" {
                h1 class="display-1 text-danger" { "403" }
                h2 class="mb-4" { "Forbidden" }
                p class="lead" { "You don't have permission to access this resource." }
                @if let Some(err) = error {
                    div class="alert alert-danger" role="alert" {
                        (err.to_string())
                    }
                }
                a class="btn btn-danger" href="/" { "Return Home" }
            }
        },
        viewer,
    )
}

pub fn error_404<T: ToString>(error: Option<T>, viewer: &Viewer) -> Markup {
    page_of_body(
        html! {
            div class="text-center" {
                h1 class="display-1 text-danger" { "404" }
                h2 class="mb-4" { "Not found" }
                p class="lead" { "We could not find what you were looking for." }
                @if let Some(err) = error {
                    div class="alert alert-danger" role="alert" {
                        (err.to_string())
                    }
                }
                a class="btn btn-danger" href="/" { "Return Home" }
            }
        },
        viewer,
    )
}

pub fn page_title<T: ToString>(title: T) -> Markup {
    maud::html! {
        div class="col-md m-3 h2 d-flex align-items-center" {
            h1 { (title.to_string()) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_follows_viewer() {
        let page = page_of_body(html! { p { "hi" } }, &Viewer::Anonymous).into_string();
        assert!(page.contains("/admin/login"));

        let page = page_of_body(
            html! {},
            &Viewer::Organizer {
                name: "Expo Co".into(),
                impersonated: true,
            },
        )
        .into_string();
        assert!(page.contains("Expo Co"));
        assert!(page.contains("/admin/stop-impersonating"));
        assert!(!page.contains("href=\"/logout\""));
    }

    #[test]
    fn test_flash_kinds() {
        let ok = page_of_body_and_flash_msg(
            html! {},
            Some(("success".into(), "Saved.".into())),
            &Viewer::SuperAdmin,
        )
        .into_string();
        assert!(ok.contains("alert-success"));

        let err = page_of_body_and_flash_msg(
            html! {},
            Some(("error".into(), "Nope.".into())),
            &Viewer::SuperAdmin,
        )
        .into_string();
        assert!(err.contains("alert-danger"));
    }
}
