//! AWS Signature Version 4 request signing, used by the Bedrock and
//! SageMaker adapters.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Credentials used to sign a request. `session_token` is `Some` when the
/// caller is using temporary (STS) credentials.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// A fully-signed request: the caller merges `headers` into the outbound
/// HTTP request before sending `body`.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub headers: BTreeMap<String, String>,
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any length");
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Signs `method`/`path`/`query`/`headers`/`body` for `region`/`service` at
/// `timestamp`, per the six-step algorithm: canonical request, string-to-sign,
/// derived signing key, and the `Authorization` header.
#[allow(clippy::too_many_arguments)]
pub fn sign(
    creds: &AwsCredentials,
    method: &str,
    host: &str,
    path: &str,
    query: &str,
    headers: &BTreeMap<String, String>,
    body: &[u8],
    region: &str,
    service: &str,
    timestamp: chrono::DateTime<chrono::Utc>,
) -> SignedRequest {
    let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = timestamp.format("%Y%m%d").to_string();

    let mut all_headers = headers.clone();
    all_headers.insert("host".to_string(), host.to_string());
    all_headers.insert("x-amz-date".to_string(), amz_date.clone());
    if let Some(token) = &creds.session_token {
        all_headers.insert("x-amz-security-token".to_string(), token.clone());
    }

    // BTreeMap keeps header names sorted for the canonical request.
    let canonical_headers: String = all_headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k.to_lowercase(), v.trim()))
        .collect();
    let signed_headers = all_headers
        .keys()
        .map(|k| k.to_lowercase())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{method}\n{path}\n{query}\n{canonical_headers}\n{signed_headers}\n{}",
        sha256_hex(body)
    );

    let scope = format!("{date_stamp}/{region}/{service}/aws4_request");
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );

    let k_date = hmac_sha256(format!("AWS4{}", creds.secret_access_key).as_bytes(), &date_stamp);
    let k_region = hmac_sha256(&k_date, region);
    let k_service = hmac_sha256(&k_region, service);
    let k_signing = hmac_sha256(&k_service, "aws4_request");

    let signature = hex::encode(hmac_sha256(&k_signing, &string_to_sign));

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        creds.access_key_id
    );

    let mut out_headers = BTreeMap::new();
    out_headers.insert("Authorization".to_string(), authorization);
    out_headers.insert("X-Amz-Date".to_string(), amz_date);
    if let Some(token) = &creds.session_token {
        out_headers.insert("X-Amz-Security-Token".to_string(), token.clone());
    }

    SignedRequest { headers: out_headers }
}
