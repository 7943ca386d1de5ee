//! # Separation Requests
//!
//! Types shared by the separation service and the HTTP adapters:
//! - [`SeparateRequest`]: the JSON body a caller POSTs
//! - [`SeparationType`]: the known stem labels
//! - [`StorageKeys`]: where the input and output copies of one upload live
//! - [`SeparateResponse`]: the JSON body returned on success
//!
//! ## Key layout:
//! ```text
//! audio/input/<file-id>/<filename>
//! audio/output/<file-id>/<type>_<filename>
//! ```
//! Both keys share one freshly generated file id, so two uploads of the same file
//! never land on the same key.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub mod service;

pub use service::SeparationService;

/// Body of a separation request.
///
/// Every field is optional at the parsing stage; the service decides what a missing
/// value means (`audio` is required, `type` and `filename` fall back to defaults).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeparateRequest {
    /// Base64-encoded audio file. Kept as raw JSON until [`Self::audio_text`] so
    /// that `false` or `[]` read as "no audio" instead of a type error.
    pub audio: Option<serde_json::Value>,

    /// Stem label, echoed back and used in the output key
    #[serde(rename = "type")]
    pub separation_type: Option<String>,

    /// Original file name, used as the last key segment
    pub filename: Option<String>,
}

impl SeparateRequest {
    /// Parse a request body.
    ///
    /// The body must be a JSON object. Anything else, including invalid JSON, is an
    /// internal fault (500) rather than a validation error.
    pub fn parse(body: &str) -> AppResult<Self> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        if !value.is_object() {
            return Err(AppError::Internal(format!(
                "request body must be a JSON object, got {}",
                json_kind(&value)
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// The `audio` field as base64 text.
    ///
    /// Empty JSON values (`null`, `false`, `0`, `""`, `[]`, `{}`) count as missing and
    /// give `Ok(None)`. Any other non-string is an internal fault.
    pub fn audio_text(&self) -> AppResult<Option<&str>> {
        match &self.audio {
            None => Ok(None),
            Some(value) if is_empty_value(value) => Ok(None),
            Some(serde_json::Value::String(audio)) => Ok(Some(audio)),
            Some(other) => Err(AppError::Internal(format!(
                "audio must be a base64 string, got {}",
                json_kind(other)
            ))),
        }
    }
}

fn is_empty_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(fields) => fields.is_empty(),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// The stems a caller can ask for.
///
/// The label never changes what is stored; it only names the output. Labels outside
/// this list are still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeparationType {
    Vocals,
    Instruments,
    Drums,
    Bass,
}

impl SeparationType {
    pub const ALL: [SeparationType; 4] = [
        SeparationType::Vocals,
        SeparationType::Instruments,
        SeparationType::Drums,
        SeparationType::Bass,
    ];

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeparationType::Vocals => "vocals",
            SeparationType::Instruments => "instruments",
            SeparationType::Drums => "drums",
            SeparationType::Bass => "bass",
        }
    }
}

/// Storage keys for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub file_id: String,
    pub input_key: String,
    pub output_key: String,
    /// `<type>_<filename>`, the name reported back to the caller
    pub output_filename: String,
}

impl StorageKeys {
    pub fn new(file_id: &str, separation_type: &str, filename: &str) -> Self {
        let output_filename = format!("{}_{}", separation_type, filename);
        Self {
            file_id: file_id.to_string(),
            input_key: format!("audio/input/{}/{}", file_id, filename),
            output_key: format!("audio/output/{}/{}", file_id, output_filename),
            output_filename,
        }
    }
}

/// Successful separation reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeparateResponse {
    pub success: bool,
    pub url: String,
    #[serde(rename = "type")]
    pub separation_type: String,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_body() {
        let request = SeparateRequest::parse(
            r#"{"audio": "SUQz", "type": "drums", "filename": "song.mp3"}"#,
        )
        .unwrap();
        assert_eq!(request.audio_text().unwrap(), Some("SUQz"));
        assert_eq!(request.separation_type.as_deref(), Some("drums"));
        assert_eq!(request.filename.as_deref(), Some("song.mp3"));
    }

    #[test]
    fn test_parse_empty_object_and_nulls() {
        let request = SeparateRequest::parse("{}").unwrap();
        assert!(request.audio.is_none());
        assert_eq!(request.audio_text().unwrap(), None);

        let request = SeparateRequest::parse(r#"{"type": null, "filename": null}"#).unwrap();
        assert!(request.separation_type.is_none());
        assert!(request.filename.is_none());
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        for body in ["[]", "42", "\"audio\"", "null", "not json", ""] {
            let err = SeparateRequest::parse(body).unwrap_err();
            assert!(matches!(err, AppError::Internal(_)), "body {:?} gave {:?}", body, err);
            assert!(!err.message().is_empty());
        }
    }

    #[test]
    fn test_empty_audio_values_read_as_missing() {
        for audio in [r#"null"#, "false", "0", "0.0", r#""""#, "[]", "{}"] {
            let request = SeparateRequest::parse(&format!(r#"{{"audio": {}}}"#, audio)).unwrap();
            assert_eq!(request.audio_text().unwrap(), None, "audio {}", audio);
        }
    }

    #[test]
    fn test_non_string_audio_is_internal() {
        for audio in ["123", "true", "[1]", r#"{"data": "SUQz"}"#] {
            let request = SeparateRequest::parse(&format!(r#"{{"audio": {}}}"#, audio)).unwrap();
            let err = request.audio_text().unwrap_err();
            assert!(matches!(err, AppError::Internal(_)), "audio {}", audio);
            assert!(err.message().starts_with("audio must be a base64 string"));
        }
    }

    #[test]
    fn test_separation_type_labels() {
        assert_eq!(SeparationType::from_label("bass"), Some(SeparationType::Bass));
        assert_eq!(SeparationType::from_label("instruments"), Some(SeparationType::Instruments));
        assert_eq!(SeparationType::from_label("Vocals"), None);
        assert_eq!(SeparationType::from_label("guitar"), None);
    }

    #[test]
    fn test_storage_keys() {
        let keys = StorageKeys::new("1234", "vocals", "song.mp3");
        assert_eq!(keys.input_key, "audio/input/1234/song.mp3");
        assert_eq!(keys.output_key, "audio/output/1234/vocals_song.mp3");
        assert_eq!(keys.output_filename, "vocals_song.mp3");
    }

    #[test]
    fn test_response_uses_type_field_name() {
        let response = SeparateResponse {
            success: true,
            url: "https://cdn/x".to_string(),
            separation_type: "bass".to_string(),
            filename: "bass_a.mp3".to_string(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], "bass");
        assert_eq!(value["success"], true);
        assert!(value.get("separation_type").is_none());
    }
}
