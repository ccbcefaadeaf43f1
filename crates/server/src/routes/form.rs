//! Request body helpers.
//!
//! - [`MultipartForm`] collects text fields and an optional `image` file.
//! - [`lenient`] accepts ids and quantities sent either as JSON numbers or
//!   as numeric strings, which older mobile clients do.

use std::collections::HashMap;

use axum::extract::{FromRequest, Multipart, Request};

use crate::error::AppError;
use crate::media::Upload;

/// Name of the file field on product and profile forms.
const IMAGE_FIELD: &str = "image";

/// A `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    pub image: Option<Upload>,
}

impl MultipartForm {
    /// Take a text field. Missing and blank fields are `None`.
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name).filter(|v| !v.trim().is_empty())
    }
}

impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_owned();

            if name == IMAGE_FIELD && field.file_name().is_some() {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                // Browsers send an empty part when no file was picked
                if !bytes.is_empty() {
                    form.image = Some(Upload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }
}

/// Deserialize `Option<T>` from a number, a numeric string, or null.
pub mod lenient {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: Display,
    {
        let text = match Option::<Raw>::deserialize(deserializer)? {
            None => return Ok(None),
            Some(Raw::Number(n)) => n.to_string(),
            Some(Raw::Text(s)) if s.trim().is_empty() => return Ok(None),
            Some(Raw::Text(s)) => s,
        };
        text.trim().parse().map(Some).map_err(D::Error::custom)
    }
}
