//! Images attached to rows and the object storage they are uploaded to.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StoreResult;

/// Raw image bytes supplied with a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// An image field in a mutation payload: either a URL that is already
/// public, or a file which must be uploaded before the row is written.
///
/// Only the `Url` form can be serialized, so a payload still holding a
/// file never reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageInput {
    Url(String),
    File(ImageFile),
}

impl ImageInput {
    pub fn as_url(&self) -> Option<&str> {
        match self {
            ImageInput::Url(url) => Some(url),
            ImageInput::File(_) => None,
        }
    }
}

impl Serialize for ImageInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ImageInput::Url(url) => serializer.serialize_str(url),
            ImageInput::File(file) => Err(ser::Error::custom(format!(
                "image `{}` has not been uploaded",
                file.file_name
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for ImageInput {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let url = String::deserialize(deserializer)?;
        if url.trim().is_empty() {
            return Err(de::Error::custom("image URL is empty"));
        }
        Ok(ImageInput::Url(url))
    }
}

/// Implemented by payloads that carry an image field.
pub trait WithImage {
    fn image_slot(&mut self) -> &mut Option<ImageInput>;
}

/// Path-addressed object storage returning publicly resolvable URLs.
#[rocket::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, path: &str, file: &ImageFile) -> StoreResult<String>;
}

/// The storage path for an upload: a millisecond timestamp, then the file
/// name with each run of whitespace replaced by `-`.
pub fn object_path(file_name: &str, now: DateTime<Utc>) -> String {
    static WHITESPACE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\s+").unwrap());

    format!(
        "{}-{}",
        now.timestamp_millis(),
        WHITESPACE.replace_all(file_name.trim(), "-")
    )
}
