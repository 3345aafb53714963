//! Short-lived signing credentials for browser uploads to the image CDN.
//!
//! The CDN verifies `hex(HMAC-SHA1(token + expire, private_key))`, where
//! `token` is a fresh UUID and `expire` is a unix timestamp. Credentials
//! are minted per request and valid for thirty minutes.

use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha1::Sha1;
use uuid::Uuid;

type HmacSha1 = Hmac<Sha1>;

const TOKEN_TTL_SECS: i64 = 30 * 60;

/// One set of upload credentials, serialized straight to the client.
#[derive(Debug, Clone, Serialize)]
pub struct UploadAuthParams {
    pub token: String,
    pub signature: String,
    pub expire: i64,
}

/// Signs upload tokens with the CDN private key.
pub struct UploadSigner {
    private_key: SecretString,
}

impl UploadSigner {
    #[must_use]
    pub fn new(private_key: SecretString) -> Self {
        Self { private_key }
    }

    /// Mint credentials expiring [`TOKEN_TTL_SECS`] from now.
    #[must_use]
    pub fn generate(&self) -> UploadAuthParams {
        let token = Uuid::new_v4().to_string();
        let expire = Utc::now().timestamp() + TOKEN_TTL_SECS;
        let signature = self.sign(&token, expire);
        UploadAuthParams {
            token,
            signature,
            expire,
        }
    }

    fn sign(&self, token: &str, expire: i64) -> String {
        // HMAC accepts keys of any length, so new_from_slice cannot fail.
        let mut mac = HmacSha1::new_from_slice(self.private_key.expose_secret().as_bytes())
            .unwrap_or_else(|_| unreachable!("hmac accepts any key length"));
        mac.update(token.as_bytes());
        mac.update(expire.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UploadSigner {
        UploadSigner::new(SecretString::from("private_key_for_tests"))
    }

    #[test]
    fn test_signature_is_deterministic_for_same_inputs() {
        let signer = signer();
        let a = signer.sign("token-1", 1_700_000_000);
        let b = signer.sign("token-1", 1_700_000_000);
        assert_eq!(a, b);
        // SHA-1 digest is 20 bytes, 40 hex chars.
        assert_eq!(a.len(), 40);
    }

    #[test]
    fn test_signature_varies_with_expire() {
        let signer = signer();
        let a = signer.sign("token-1", 1_700_000_000);
        let b = signer.sign("token-1", 1_700_000_001);
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_expires_in_the_future() {
        let params = signer().generate();
        assert!(params.expire > Utc::now().timestamp());
        assert!(!params.token.is_empty());
    }
}
