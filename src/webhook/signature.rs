//! Webhook signature verification
//!
//! The provider signs `"{ts}:{rawBody}"` with HMAC-SHA256 and delivers
//! the result as `Paddle-Signature: ts={unix};h1={hex}`. The raw body
//! bytes are captured once and verified verbatim; re-serializing a
//! parsed body is not bit-equivalent and would produce false
//! rejections.

use std::net::IpAddr;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Why a delivery was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    IpNotAllowed(IpAddr),
    MissingHeader,
    MalformedHeader,
    SignatureMismatch,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::IpNotAllowed(ip) => write!(f, "source ip {} not in allow-list", ip),
            Rejection::MissingHeader => write!(f, "signature header missing"),
            Rejection::MalformedHeader => write!(f, "signature header malformed"),
            Rejection::SignatureMismatch => write!(f, "signature mismatch"),
        }
    }
}

/// Verify a webhook delivery
///
/// `raw_body` must be the exact bytes received on the wire.
pub fn verify(
    raw_body: &[u8],
    signature_header: Option<&str>,
    source_ip: IpAddr,
    allowed_ips: &[IpAddr],
    secret: &str,
) -> Result<(), Rejection> {
    // Allow-list first: defense in depth, not a substitute for the
    // signature check below
    if !allowed_ips.contains(&source_ip) {
        return Err(Rejection::IpNotAllowed(source_ip));
    }

    let header = signature_header.ok_or(Rejection::MissingHeader)?;
    let (ts, h1) = parse_signature_header(header).ok_or(Rejection::MalformedHeader)?;

    let supplied = hex::decode(h1).map_err(|_| Rejection::MalformedHeader)?;

    // Signed payload is the byte concatenation "{ts}:{rawBody}"
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| Rejection::MalformedHeader)?;
    mac.update(ts.as_bytes());
    mac.update(b":");
    mac.update(raw_body);

    // Mac::verify_slice compares in constant time
    mac.verify_slice(&supplied)
        .map_err(|_| Rejection::SignatureMismatch)
}

/// Parse `ts={timestamp};h1={hex}` (semicolon-separated key=value pairs)
fn parse_signature_header(header: &str) -> Option<(&str, &str)> {
    let mut ts = None;
    let mut h1 = None;

    for part in header.split(';') {
        let (key, value) = part.split_once('=')?;
        match key {
            "ts" => ts = Some(value),
            "h1" => h1 = Some(value),
            // Unknown pairs are tolerated for forward compatibility
            _ => {}
        }
    }

    Some((ts?, h1?))
}

/// Compute the hex signature for a payload (test and tooling helper)
pub fn sign(raw_body: &[u8], ts: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(ts.as_bytes());
    mac.update(b":");
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    fn allowed() -> Vec<IpAddr> {
        vec!["34.194.127.46".parse().unwrap()]
    }

    fn good_ip() -> IpAddr {
        "34.194.127.46".parse().unwrap()
    }

    #[test]
    fn test_accepts_valid_signature() {
        let body = br#"{"event_type":"subscription.activated"}"#;
        let ts = "1724764800";
        let header = format!("ts={};h1={}", ts, sign(body, ts, SECRET));

        assert_eq!(
            verify(body, Some(&header), good_ip(), &allowed(), SECRET),
            Ok(())
        );
    }

    #[test]
    fn test_rejects_unlisted_ip() {
        let body = b"{}";
        let header = format!("ts=1;h1={}", sign(body, "1", SECRET));
        let stranger: IpAddr = "203.0.113.9".parse().unwrap();

        assert_eq!(
            verify(body, Some(&header), stranger, &allowed(), SECRET),
            Err(Rejection::IpNotAllowed(stranger))
        );
    }

    #[test]
    fn test_rejects_missing_or_malformed_header() {
        let body = b"{}";

        assert_eq!(
            verify(body, None, good_ip(), &allowed(), SECRET),
            Err(Rejection::MissingHeader)
        );
        assert_eq!(
            verify(body, Some("garbage"), good_ip(), &allowed(), SECRET),
            Err(Rejection::MalformedHeader)
        );
        assert_eq!(
            verify(body, Some("ts=1"), good_ip(), &allowed(), SECRET),
            Err(Rejection::MalformedHeader)
        );
        assert_eq!(
            verify(body, Some("ts=1;h1=nothex"), good_ip(), &allowed(), SECRET),
            Err(Rejection::MalformedHeader)
        );
    }

    #[test]
    fn test_rejects_any_body_bit_flip() {
        let body = br#"{"amount":100}"#.to_vec();
        let ts = "1724764800";
        let header = format!("ts={};h1={}", ts, sign(&body, ts, SECRET));

        assert_eq!(
            verify(&body, Some(&header), good_ip(), &allowed(), SECRET),
            Ok(())
        );

        // Flip every single bit of the body in turn
        for byte in 0..body.len() {
            for bit in 0..8 {
                let mut tampered = body.clone();
                tampered[byte] ^= 1 << bit;
                assert_eq!(
                    verify(&tampered, Some(&header), good_ip(), &allowed(), SECRET),
                    Err(Rejection::SignatureMismatch),
                    "bit {} of byte {} accepted",
                    bit,
                    byte
                );
            }
        }
    }

    #[test]
    fn test_rejects_tampered_timestamp() {
        let body = b"{}";
        let header = format!("ts=1724764800;h1={}", sign(body, "1724764800", SECRET));
        let tampered = header.replace("ts=1724764800", "ts=1724764801");

        assert_eq!(
            verify(body, Some(&tampered), good_ip(), &allowed(), SECRET),
            Err(Rejection::SignatureMismatch)
        );
    }

    #[test]
    fn test_signed_payload_uses_raw_bytes() {
        // Whitespace-different JSON parses the same but must not verify
        let body = br#"{"a": 1}"#;
        let reserialized = br#"{"a":1}"#;
        let ts = "1";
        let header = format!("ts={};h1={}", ts, sign(body, ts, SECRET));

        assert_eq!(
            verify(reserialized, Some(&header), good_ip(), &allowed(), SECRET),
            Err(Rejection::SignatureMismatch)
        );
    }
}
