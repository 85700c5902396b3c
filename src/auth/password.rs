//! PBKDF2-HMAC-SHA256 password hashes.
//!
//! Stored form: `pbkdf2_sha256$<iterations>$<salt>$<hex digest>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "pbkdf2_sha256";

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    let digest = pbkdf2(password.as_bytes(), salt.as_bytes(), iterations);
    format!("{}${}${}${}", SCHEME, iterations, salt, hex::encode(digest))
}

/// Check a password against a stored hash. Unparseable hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(digest), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    if scheme != SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let Ok(expected) = hex::decode(digest) else {
        return false;
    };
    if iterations == 0 {
        return false;
    }

    let actual = pbkdf2(password.as_bytes(), salt.as_bytes(), iterations);
    constant_time_eq(&actual, &expected)
}

/// Single-block PBKDF2 (32-byte output).
fn pbkdf2(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let prf = HmacSha256::new_from_slice(password).expect("HMAC can take key of any size");

    let mut mac = prf.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut u: [u8; 32] = mac.finalize().into_bytes().into();
    let mut out = u;

    for _ in 1..iterations {
        let mut mac = prf.clone();
        mac.update(&u);
        u = mac.finalize().into_bytes().into();
        for (o, b) in out.iter_mut().zip(u.iter()) {
            *o ^= b;
        }
    }

    out
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
