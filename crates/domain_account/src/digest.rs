//! Keyed digests for API keys
//!
//! API keys are never stored; the account store keeps their HMAC-SHA256
//! digest under a server secret. The digester is an ordinary value built
//! from that secret and handed to whoever needs it.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use core_kernel::{codes, ActionResult, DomainError};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 digester with hex output
#[derive(Clone)]
pub struct HmacDigest {
    mac: HmacSha256,
}

impl HmacDigest {
    /// Shortest accepted secret, in bytes
    pub const MIN_SECRET_LEN: usize = 32;

    pub fn new(secret: impl AsRef<[u8]>) -> ActionResult<HmacDigest> {
        let secret = secret.as_ref();
        if secret.len() < Self::MIN_SECRET_LEN {
            return ActionResult::failure(DomainError::bad_request(
                codes::ACCOUNT_INVALID_SECRET,
                format!("digest secret must be at least {} bytes", Self::MIN_SECRET_LEN),
            ));
        }
        match HmacSha256::new_from_slice(secret) {
            Ok(mac) => ActionResult::success(HmacDigest { mac }),
            Err(_) => ActionResult::failure(DomainError::bad_request(
                codes::ACCOUNT_INVALID_SECRET,
                "digest secret rejected",
            )),
        }
    }

    /// Lowercase hex digest of `message`
    pub fn digest(&self, message: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Checks a hex digest in constant time
    pub fn verify(&self, message: &str, expected: &str) -> bool {
        let Ok(expected) = hex::decode(expected) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl fmt::Debug for HmacDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HmacDigest { .. }")
    }
}
