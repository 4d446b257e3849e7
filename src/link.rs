use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use thiserror::Error;
use url::{form_urlencoded, Url};

pub const LINK_PARAM: &str = "link";

// Accepts what a browser's `atob` accepts.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("No link provided! Add a base64-encoded link as a URL parameter: ?link=BASE64_ENCODED_LINK")]
    Missing,
    #[error("Invalid base64 encoded link provided!")]
    InvalidBase64(#[source] base64::DecodeError),
    #[error("The decoded link is not valid text.")]
    NotUtf8(#[source] std::string::FromUtf8Error),
    #[error("Could not read the URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkPayload {
    /// Exactly as it appeared in the parameter; this is the maze seed.
    pub encoded: String,
    pub decoded: String,
}

impl LinkPayload {
    pub fn display_text(&self) -> String {
        self.decoded.chars().filter(|c| !c.is_control()).collect()
    }
}

pub fn decode(encoded: &str) -> Result<LinkPayload, DecodeError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(DecodeError::Missing);
    }
    let bytes = LENIENT
        .decode(compact.as_bytes())
        .map_err(DecodeError::InvalidBase64)?;
    let decoded = String::from_utf8(bytes).map_err(DecodeError::NotUtf8)?;
    Ok(LinkPayload {
        encoded: encoded.to_string(),
        decoded,
    })
}

pub fn from_url(url: &str) -> Result<LinkPayload, DecodeError> {
    let url = Url::parse(url)?;
    from_query_pairs(url.query_pairs())
}

/// Accepts a full URL, a bare `?link=...` query, or the base64 text itself.
pub fn resolve(input: &str) -> Result<LinkPayload, DecodeError> {
    let input = input.trim();
    if let Some(query) = input.strip_prefix('?') {
        return from_query_pairs(form_urlencoded::parse(query.as_bytes()));
    }
    match Url::parse(input) {
        Ok(url) => from_query_pairs(url.query_pairs()),
        Err(_) => decode(input),
    }
}

fn from_query_pairs<'a>(
    mut pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
) -> Result<LinkPayload, DecodeError> {
    let value = pairs
        .find(|(key, _)| key == LINK_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .ok_or(DecodeError::Missing)?;
    decode(&value)
}

pub fn encode(link: &str) -> String {
    STANDARD.encode(link)
}

/// `?link=...` with the base64 escaped so `+` survives query decoding.
pub fn share_query(link: &str) -> String {
    let encoded = encode(link);
    let escaped: String = form_urlencoded::byte_serialize(encoded.as_bytes()).collect();
    format!("?{LINK_PARAM}={escaped}")
}
