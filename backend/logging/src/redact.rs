//! Log Redaction Layer
//!
//! Scrubs signed-request credentials, API keys, bearer tokens and phone
//! numbers from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static TELEPHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9]{32,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});
/// `authorization=` in a signed query string, up to the next parameter.
static AUTH_QUERY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(authorization=)[^&\s]+").unwrap());
/// Quoted `api_key="..."` / `signature="..."` pairs of an unencoded auth origin.
static AUTH_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"((?:api_key|signature)=)"[^"]*""#).unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let mut redacted = AUTH_QUERY_RE
        .replace_all(input, "${1}[REDACTED_AUTH]")
        .to_string();
    redacted = AUTH_FIELD_RE
        .replace_all(&redacted, "${1}\"[REDACTED]\"")
        .to_string();
    redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]").to_string();
    redacted = TELEPHONE_RE.replace_all(&redacted, "[REDACTED_PHONE]").to_string();

    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction() {
        let raw = "Sending to +1-555-123-4567 with Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("+1-555-123-4567"));
        assert!(!clean.contains("Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
    }

    #[test]
    fn signed_url_keeps_host_and_date() {
        let url = "wss://spark.example.com/v4.0/chat?authorization=YXBpX2tleT0ia2V5Ig%3D%3D&date=Mon%2C%2001%20Jan%202024%2000%3A00%3A00%20GMT&host=spark.example.com";
        let clean = redact_sensitive_data(url);
        assert!(!clean.contains("YXBpX2tleT0ia2V5Ig"));
        assert!(clean.contains("authorization=[REDACTED_AUTH]&date="));
        assert!(clean.ends_with("&host=spark.example.com"));
    }

    #[test]
    fn auth_origin_fields_are_masked() {
        let origin = r#"api_key="abc",algorithm="hmac-sha256",headers="host date request-line",signature="c2ln""#;
        let clean = redact_sensitive_data(origin);
        assert!(!clean.contains("abc"));
        assert!(!clean.contains("c2ln"));
        assert!(clean.contains(r#"algorithm="hmac-sha256""#));
    }
}
