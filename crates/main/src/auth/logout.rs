use rocket::{
    http::CookieJar,
    response::{Flash, Redirect},
};

use crate::{html::done, sync::SyncContext};

#[get("/logout")]
pub async fn logout(mut ctx: SyncContext, jar: &CookieJar<'_>) -> Flash<Redirect> {
    ctx.logout().await;
    ctx.persist(jar);
    done("/", "You have been logged out.")
}
