//! Inbound body parsing by content type

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use super::field_mapper::Payload;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("invalid JSON body: {0}")]
    Json(String),

    #[error("JSON body must be an object")]
    NotAnObject,

    #[error("invalid form body: {0}")]
    Form(String),

    #[error("invalid multipart body: {0}")]
    Multipart(String),

    #[error("empty body")]
    Empty,

    #[error("body is neither JSON nor form encoded")]
    Unrecognized,
}

/// Body encodings the pipeline understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadFormat {
    Json,
    Form,
    Multipart,
    /// Absent or unrecognised content type: JSON, then form.
    Sniff,
}

impl PayloadFormat {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return Self::Sniff;
        };
        let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/json" | "text/json" => Self::Json,
            "application/x-www-form-urlencoded" => Self::Form,
            "multipart/form-data" => Self::Multipart,
            other if other.ends_with("+json") => Self::Json,
            _ => Self::Sniff,
        }
    }
}

/// Parse a request body into a flat key/value payload.
pub async fn parse_payload(body: Bytes, content_type: Option<&str>) -> Result<Payload, PayloadError> {
    match PayloadFormat::from_content_type(content_type) {
        PayloadFormat::Json => parse_json(&body),
        PayloadFormat::Form => parse_form(&body),
        PayloadFormat::Multipart => parse_multipart(body, content_type.unwrap_or_default()).await,
        PayloadFormat::Sniff => parse_json(&body).or_else(|_| parse_form(&body)).map_err(|err| {
            if err == PayloadError::Empty {
                err
            } else {
                PayloadError::Unrecognized
            }
        }),
    }
}

fn parse_json(body: &[u8]) -> Result<Payload, PayloadError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(PayloadError::Empty);
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(PayloadError::NotAnObject),
        Err(err) => Err(PayloadError::Json(err.to_string())),
    }
}

fn parse_form(body: &[u8]) -> Result<Payload, PayloadError> {
    let text = std::str::from_utf8(body).map_err(|err| PayloadError::Form(err.to_string()))?;
    if text.trim().is_empty() {
        return Err(PayloadError::Empty);
    }
    // A JSON-looking body that failed to parse is not a form either.
    if text.trim_start().starts_with(['{', '[']) {
        return Err(PayloadError::Form("body looks like malformed JSON".into()));
    }

    let mut payload = Payload::new();
    for (key, value) in url::form_urlencoded::parse(text.trim().as_bytes()) {
        if key.is_empty() {
            continue;
        }
        payload.insert(key.into_owned(), Value::String(value.into_owned()));
    }

    if payload.is_empty() {
        return Err(PayloadError::Form("no fields".into()));
    }
    Ok(payload)
}

async fn parse_multipart(body: Bytes, content_type: &str) -> Result<Payload, PayloadError> {
    let boundary =
        multer::parse_boundary(content_type).map_err(|err| PayloadError::Multipart(err.to_string()))?;
    let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut payload = Payload::new();
    while let Some(field) =
        multipart.next_field().await.map_err(|err| PayloadError::Multipart(err.to_string()))?
    {
        // Uploaded files are not lead attributes.
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field.text().await.map_err(|err| PayloadError::Multipart(err.to_string()))?;
        payload.insert(name, Value::String(value));
    }
    Ok(payload)
}
