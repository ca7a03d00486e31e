//! AWS Signature Version 4 request signing.
//!
//! Hosted endpoints on the SageMaker runtime reject unsigned calls. The
//! signing flow is:
//!
//! 1. Build the canonical request from method, path, signed headers and
//!    the SHA-256 of the payload.
//! 2. Build the string to sign from the timestamp, credential scope and the
//!    hash of the canonical request.
//! 3. Derive the signing key by chaining HMAC-SHA256 over date, region,
//!    service and `aws4_request`, then sign the string.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Everything except the RFC 3986 unreserved characters
const URI_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// AWS access credentials
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Scope of a signature
#[derive(Debug, Clone, Copy)]
pub struct SigningParams<'a> {
    pub credentials: &'a Credentials,
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

/// Headers to attach to a signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `x-amz-date`
    pub amz_date: String,
    /// `x-amz-security-token`, for temporary credentials
    pub security_token: Option<String>,
    /// `authorization`
    pub authorization: String,
}

impl SignedHeaders {
    /// Header name/value pairs in the order they should be sent
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![("x-amz-date", self.amz_date.as_str())];
        if let Some(token) = &self.security_token {
            pairs.push(("x-amz-security-token", token.as_str()));
        }
        pairs.push(("authorization", self.authorization.as_str()));
        pairs
    }
}

/// Sign a request with an empty query string.
///
/// # Arguments
///
/// * `method` -- HTTP method, e.g. `POST`.
/// * `path` -- Absolute request path as sent on the wire, already
///   percent-encoded. Each segment is encoded once more for the signature.
/// * `headers` -- Headers to include in the signature, e.g. `host` and
///   `content-type`. `x-amz-date` and `x-amz-security-token` are added here.
/// * `payload` -- Request body.
pub fn sign(
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    payload: &[u8],
    params: &SigningParams<'_>,
) -> SignedHeaders {
    let amz_date = params.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date = params.time.format("%Y%m%d").to_string();
    let security_token = params.credentials.session_token.clone();

    let mut signed: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    signed.push(("x-amz-date".to_string(), amz_date.clone()));
    if let Some(token) = &security_token {
        signed.push(("x-amz-security-token".to_string(), token.clone()));
    }
    signed.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = signed
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_header_names = signed
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{method}\n{}\n\n{canonical_headers}\n{signed_header_names}\n{}",
        canonical_uri(path),
        sha256_hex(payload)
    );

    let scope = format!("{date}/{}/{}/aws4_request", params.region, params.service);
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(
        &params.credentials.secret_access_key,
        &date,
        params.region,
        params.service,
    );
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_header_names}, Signature={signature}",
        params.credentials.access_key_id
    );

    SignedHeaders {
        amz_date,
        security_token,
        authorization,
    }
}

/// URI-encode every path segment.
///
/// Services other than S3 sign the path encoded twice, so a `%` already
/// present on the wire becomes `%25` here.
pub fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, URI_ENCODE).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Derive the per-day signing key.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> [u8; 32] {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
