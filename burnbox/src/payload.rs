// Copyright 2026 burnbox Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};

/// The plaintext of a secret: a text message or a file.
///
/// Serialized as JSON before sealing. Empty fields are omitted and `file_data` is base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecretPayload {
    /// The text message.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// The file content.
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "base64_bytes")]
    pub file_data: Vec<u8>,
    /// The original file name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
    /// The file MIME type.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    /// Whether the payload is a file.
    #[serde(default)]
    pub is_file: bool,
}

impl SecretPayload {
    /// A text payload.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// A file payload.
    pub fn file(filename: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_data: data.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            is_file: true,
            ..Default::default()
        }
    }

    /// Decode a payload from opened plaintext.
    ///
    /// Plaintext that is not a JSON payload is taken as text.
    pub fn from_plaintext(plaintext: &[u8]) -> Self {
        serde_json::from_slice(plaintext).unwrap_or_else(|_| Self::text(String::from_utf8_lossy(plaintext)))
    }
}

/// Serde adapter for bytes as standard padded base64.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as a base64 string.
    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Deserialize bytes from a base64 string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_json() {
        let json = serde_json::to_string(&SecretPayload::text("hi")).unwrap();
        assert_eq!(json, r#"{"text":"hi","is_file":false}"#);
    }

    #[test]
    fn test_file_json() {
        let payload = SecretPayload::file("a.bin", "application/octet-stream", vec![0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["file_data"], "3q2+7w==");
        assert_eq!(json["is_file"], true);
        assert!(json.get("text").is_none());

        let decoded: SecretPayload = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_plaintext_fallback() {
        assert_eq!(
            SecretPayload::from_plaintext(br#"{"text":"json"}"#),
            SecretPayload::text("json")
        );
        assert_eq!(SecretPayload::from_plaintext(b"raw words"), SecretPayload::text("raw words"));
    }

    #[test]
    fn test_bad_base64_rejected() {
        let res = serde_json::from_str::<SecretPayload>(r#"{"file_data":"%%%","is_file":true}"#);
        assert!(res.is_err());
    }
}
