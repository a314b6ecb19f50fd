use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::NaiveDateTime;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha1::Sha1;

/// Addition challenge shown before a booking can be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathChallenge {
    pub a: u8,
    pub b: u8,
}

impl MathChallenge {
    pub fn new(a: u8, b: u8) -> Self {
        Self { a, b }
    }

    /// Operands are drawn from 1..=10.
    pub fn random() -> Self {
        let bytes = *uuid::Uuid::new_v4().as_bytes();
        Self {
            a: bytes[0] % 10 + 1,
            b: bytes[1] % 10 + 1,
        }
    }

    pub fn question(&self) -> String {
        format!("{} + {} = ?", self.a, self.b)
    }

    pub fn expected(&self) -> u16 {
        u16::from(self.a) + u16::from(self.b)
    }

    pub fn check(&self, answer: &str) -> bool {
        answer
            .trim()
            .parse::<u16>()
            .is_ok_and(|n| n == self.expected())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptchaError {
    #[error("malformed challenge token")]
    Malformed,
    #[error("challenge signature mismatch")]
    BadSignature,
    #[error("challenge expired")]
    Expired,
    #[error("invalid signing key")]
    InvalidKey,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedChallenge {
    pub question: String,
    pub token: String,
}

/// Issues challenges as self-contained signed tokens so the HTTP front keeps
/// no per-visitor state.
///
/// Token layout: `base64url("a:b:expires") "." base64url(hmac_sha1(payload))`.
#[derive(Clone)]
pub struct ChallengeSigner {
    secret: Vec<u8>,
    ttl_secs: i64,
}

type HmacSha1 = Hmac<Sha1>;

impl ChallengeSigner {
    pub fn new(secret: impl AsRef<[u8]>, ttl_secs: i64) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            ttl_secs,
        }
    }

    fn mac(&self) -> Result<HmacSha1, CaptchaError> {
        HmacSha1::new_from_slice(&self.secret).map_err(|_| CaptchaError::InvalidKey)
    }

    pub fn issue(
        &self,
        challenge: MathChallenge,
        now: NaiveDateTime,
    ) -> Result<SignedChallenge, CaptchaError> {
        let expires = now.and_utc().timestamp() + self.ttl_secs;
        let payload = format!("{}:{}:{expires}", challenge.a, challenge.b);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(SignedChallenge {
            question: challenge.question(),
            token: format!(
                "{}.{}",
                URL_SAFE_NO_PAD.encode(payload),
                URL_SAFE_NO_PAD.encode(signature)
            ),
        })
    }

    pub fn open(&self, token: &str, now: NaiveDateTime) -> Result<MathChallenge, CaptchaError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(CaptchaError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| CaptchaError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| CaptchaError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| CaptchaError::BadSignature)?;

        let payload = String::from_utf8(payload).map_err(|_| CaptchaError::Malformed)?;
        let mut parts = payload.split(':');
        let (Some(a), Some(b), Some(expires), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CaptchaError::Malformed);
        };
        let a: u8 = a.parse().map_err(|_| CaptchaError::Malformed)?;
        let b: u8 = b.parse().map_err(|_| CaptchaError::Malformed)?;
        let expires: i64 = expires.parse().map_err(|_| CaptchaError::Malformed)?;

        if now.and_utc().timestamp() > expires {
            return Err(CaptchaError::Expired);
        }
        Ok(MathChallenge::new(a, b))
    }
}
