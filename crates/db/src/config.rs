use serde::Deserialize;

/// Application settings, read from Rocket's figment (`Rocket.toml` or
/// `ROCKET_*` environment variables).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Base URL of the remote store. Without one, an in-memory store is used.
    #[serde(default)]
    pub store_url: Option<String>,
    #[serde(default)]
    pub store_key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Prefix of the shareable links encoded into QR codes.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Written into image fields when a row is created without an image.
    #[serde(default = "default_image_url")]
    pub default_image_url: String,
    #[serde(default)]
    pub credential_scheme: CredentialScheme,
    /// Administrator seeded into the in-memory store at startup.
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialScheme {
    /// Stored credentials are compared verbatim.
    #[default]
    Plaintext,
    /// Stored credentials are argon2 PHC strings.
    Argon2,
}

fn default_bucket() -> String {
    "images".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_image_url() -> String {
    "https://placehold.co/400x400/png?text=Raffle".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            store_url: None,
            store_key: String::new(),
            bucket: default_bucket(),
            public_base_url: default_public_base_url(),
            default_image_url: default_image_url(),
            credential_scheme: CredentialScheme::default(),
            admin_email: None,
            admin_password: None,
        }
    }
}
