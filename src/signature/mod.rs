//! Signed-path verification.
//!
//! A signed path carries a `sign` token of the form
//! `<base64url(HMAC-SHA256(secret, "<path>:<expiry>"))>:<expiry>`, where
//! `expiry` is a Unix timestamp in seconds.
//!
//! # Checks, in order
//! 1. Format: a `:` separator, a non-empty signature, an all-digit expiry.
//! 2. HMAC: recomputed over the decoded path and compared in constant time.
//! 3. Expiry: `expiry < now` is rejected.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Minted signatures are padded; verification accepts either form.
const SIGNATURE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a signature was rejected.
///
/// The `Display` text is the message returned to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("InvalidSignatureFormat")]
    InvalidFormat,

    #[error("SignatureMismatch")]
    Mismatch,

    #[error("SignatureExpired")]
    Expired,
}

impl SignatureError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            SignatureError::InvalidFormat => "format",
            SignatureError::Mismatch => "mismatch",
            SignatureError::Expired => "expired",
        }
    }
}

/// A parsed `sign` token bound to the path it claims to authorize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest<'a> {
    pub decoded_path: &'a str,
    pub expiry_epoch_seconds: u64,
    pub signature: &'a str,
}

impl<'a> SignedRequest<'a> {
    /// Split `token` into signature and expiry.
    pub fn parse(decoded_path: &'a str, token: &'a str) -> Result<Self, SignatureError> {
        let (signature, expiry) = token.rsplit_once(':').ok_or(SignatureError::InvalidFormat)?;

        if signature.is_empty() || expiry.is_empty() || !expiry.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SignatureError::InvalidFormat);
        }
        let expiry_epoch_seconds = expiry.parse().map_err(|_| SignatureError::InvalidFormat)?;

        Ok(Self {
            decoded_path,
            expiry_epoch_seconds,
            signature,
        })
    }
}

/// HMAC-SHA256 signer/verifier keyed by the shared secret.
#[derive(Clone)]
pub struct Signer {
    key: Vec<u8>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

impl Signer {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, path: &str, expiry: u64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length");
        mac.update(path.as_bytes());
        mac.update(b":");
        mac.update(expiry.to_string().as_bytes());
        mac
    }

    /// Mint a `sign` token for `path` valid until `expiry`.
    pub fn sign(&self, path: &str, expiry: u64) -> String {
        let digest = self.mac(path, expiry).finalize().into_bytes();
        format!("{}:{}", SIGNATURE_ENGINE.encode(digest), expiry)
    }

    /// Verify `token` for `path` against the current time.
    pub fn verify(&self, path: &str, token: &str) -> Result<(), SignatureError> {
        self.verify_at(path, token, unix_now())
    }

    /// Verify `token` for `path` as of `now` (Unix seconds).
    pub fn verify_at(&self, path: &str, token: &str, now: u64) -> Result<(), SignatureError> {
        let request = SignedRequest::parse(path, token)?;

        let supplied = SIGNATURE_ENGINE
            .decode(request.signature)
            .map_err(|_| SignatureError::Mismatch)?;
        self.mac(request.decoded_path, request.expiry_epoch_seconds)
            .verify_slice(&supplied)
            .map_err(|_| SignatureError::Mismatch)?;

        if request.expiry_epoch_seconds < now {
            return Err(SignatureError::Expired);
        }

        Ok(())
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_762_805_037;

    fn signer() -> Signer {
        Signer::new("your-secret-token")
    }

    #[test]
    fn round_trip_for_future_expiry() {
        let signer = signer();
        for path in ["/", "/test/file.jpg", "/目录/文件 名.mp4", "/a:b/c"] {
            for expiry in [NOW, NOW + 1, NOW + 86_400, u32::MAX as u64] {
                let token = signer.sign(path, expiry);
                assert_eq!(signer.verify_at(path, &token, NOW), Ok(()), "{path} {expiry}");
            }
        }
    }

    #[test]
    fn token_shape() {
        let token = signer().sign("/test/file.jpg", NOW);
        let (sig, expiry) = token.rsplit_once(':').unwrap();
        assert_eq!(expiry, NOW.to_string());
        assert_eq!(sig.len(), 44);
        assert!(sig.ends_with('='));
        assert!(!sig.contains('+') && !sig.contains('/'));
    }

    #[test]
    fn accepts_unpadded_signature() {
        let token = signer().sign("/x", NOW + 10);
        let unpadded = token.replacen('=', "", 1);
        assert_eq!(signer().verify_at("/x", &unpadded, NOW), Ok(()));
    }

    #[test]
    fn past_expiry_is_expired() {
        let signer = signer();
        for expiry in [0, 1, NOW - 1_000, NOW - 1] {
            let token = signer.sign("/file", expiry);
            assert_eq!(signer.verify_at("/file", &token, NOW), Err(SignatureError::Expired));
        }
    }

    #[test]
    fn tampered_signature_never_accepted() {
        let signer = signer();
        let token = signer.sign("/test/file.jpg", NOW + 3600);
        let sig_len = token.rfind(':').unwrap();

        for i in 0..sig_len {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            assert_eq!(
                signer.verify_at("/test/file.jpg", &tampered, NOW),
                Err(SignatureError::Mismatch),
                "position {i}"
            );
        }
    }

    #[test]
    fn wrong_path_secret_or_expiry_mismatch() {
        let token = signer().sign("/a", NOW + 60);
        assert_eq!(signer().verify_at("/b", &token, NOW), Err(SignatureError::Mismatch));
        assert_eq!(Signer::new("other").verify_at("/a", &token, NOW), Err(SignatureError::Mismatch));

        let (sig, _) = token.rsplit_once(':').unwrap();
        let moved = format!("{sig}:{}", NOW + 61);
        assert_eq!(signer().verify_at("/a", &moved, NOW), Err(SignatureError::Mismatch));
    }

    #[test]
    fn malformed_tokens() {
        let signer = signer();
        for token in ["", "abc", ":123", "abc:", "abc:12x", "abc:-5", "abc:+5"] {
            assert_eq!(
                signer.verify_at("/a", token, NOW),
                Err(SignatureError::InvalidFormat),
                "{token:?}"
            );
        }
    }

    #[test]
    fn error_messages_name_the_case() {
        assert_eq!(SignatureError::InvalidFormat.to_string(), "InvalidSignatureFormat");
        assert_eq!(SignatureError::Mismatch.to_string(), "SignatureMismatch");
        assert_eq!(SignatureError::Expired.to_string(), "SignatureExpired");
    }
}
