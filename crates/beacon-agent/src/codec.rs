use std::borrow::Cow;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use beacon_crypto::{Algorithm, digest, latin1_bytes};
use beacon_types::{DeliveryError, RequestParameters};
use url::form_urlencoded;

/// Character encoding used for form bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormCharset {
    Utf8,
    /// Single-byte encoding the collector parses by default.
    #[default]
    Latin1,
}

impl FormCharset {
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "ISO-8859-1",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "iso-8859-1" | "latin1" | "latin-1" => Some(Self::Latin1),
            _ => None,
        }
    }
}

/// How a task serializes its parameters on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadFormat {
    /// `application/x-www-form-urlencoded` key/value pairs.
    #[default]
    Form,
    /// One base64 blob of the JSON object, nulls dropped.
    Compact,
}

/// Encoded request body with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub content_type: String,
    pub body: String,
}

/// URL-form-encode the non-null parameters in insertion order.
///
/// With [`FormCharset::Latin1`], characters above U+00FF are sent as `?`,
/// the same substitution the signature digests use.
pub fn encode_form(
    params: &RequestParameters,
    charset: FormCharset,
) -> Result<EncodedBody, DeliveryError> {
    let latin1: &dyn Fn(&str) -> Cow<'_, [u8]> = &latin1_bytes;
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if charset == FormCharset::Latin1 {
        serializer.encoding_override(Some(latin1));
    }
    for (name, value) in params.present() {
        serializer.append_pair(name, value);
    }

    Ok(EncodedBody {
        content_type: format!("application/x-www-form-urlencoded; charset={}", charset.name()),
        body: serializer.finish(),
    })
}

/// Serialize the parameters as a JSON object and base64 it without line breaks.
///
/// With `include_nulls`, null parameters are kept as JSON `null`.
pub fn encode_compact(
    params: &RequestParameters,
    include_nulls: bool,
) -> Result<String, DeliveryError> {
    let json = if include_nulls {
        serde_json::to_vec(params)
    } else {
        let present: RequestParameters = params.present().map(|(k, v)| (k, Some(v))).collect();
        serde_json::to_vec(&present)
    };
    let json = json.map_err(|e| DeliveryError::Encoding(e.to_string()))?;

    Ok(BASE64.encode(json))
}

/// Body for `format`. Compact bodies are sent as `text/plain`.
pub fn encode_body(
    params: &RequestParameters,
    format: PayloadFormat,
    charset: FormCharset,
) -> Result<EncodedBody, DeliveryError> {
    match format {
        PayloadFormat::Form => encode_form(params, charset),
        PayloadFormat::Compact => Ok(EncodedBody {
            content_type: "text/plain; charset=US-ASCII".to_string(),
            body: encode_compact(params, false)?,
        }),
    }
}

/// Insert `name = digest(text)` unless the digest is unavailable.
///
/// Returns whether the parameter was added; callers send unsigned otherwise.
pub fn insert_digest(
    params: &mut RequestParameters,
    name: &str,
    text: &str,
    algorithm: Algorithm,
) -> bool {
    let value = digest(text, algorithm);
    if value.is_empty() {
        return false;
    }
    params.insert(name, Some(value));
    true
}
