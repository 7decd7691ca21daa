//! Public links to a company's check-in page and a raffle's registration
//! page, and their QR codes.

use qrcode::{render::svg, EcLevel, QrCode};
use url::Url;

use crate::{
    error::{Error, Result},
    sync::SyncContext,
};

fn link(base: &str, segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(base)
        .map_err(|e| Error::invalid(format!("The public base URL is not valid ({e}).")))?;
    url.path_segments_mut()
        .map_err(|_| Error::invalid("The public base URL cannot take a path."))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.to_string())
}

pub fn company_link(base: &str, company_id: &str) -> Result<String> {
    link(base, &["companies", company_id, "check-in"])
}

pub fn raffle_link(base: &str, raffle_code: &str) -> Result<String> {
    link(base, &["r", raffle_code])
}

/// Renders `data` as a standalone SVG QR code.
pub fn qr_svg(data: &str) -> Result<String> {
    let code = QrCode::with_error_correction_level(data, EcLevel::M)
        .map_err(|e| Error::invalid(format!("That link cannot be encoded ({e}).")))?;
    Ok(code
        .render()
        .min_dimensions(240, 240)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

impl SyncContext {
    pub fn company_link(&self, company_id: &str) -> Result<String> {
        company_link(&self.services().config.public_base_url, company_id)
    }

    pub fn raffle_link(&self, raffle_code: &str) -> Result<String> {
        raffle_link(&self.services().config.public_base_url, raffle_code)
    }
}
