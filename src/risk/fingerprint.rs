//! Device fingerprinting
//!
//! A fingerprint is a SHA-256 digest over a normalized subset of
//! client-reported device attributes. Normalization keeps cosmetic changes
//! (new browser tab size, extra reported fields) from minting a "new"
//! device on every request.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Normalized device descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub user_agent: String,
    pub platform: String,
    pub language: String,
    pub timezone: String,
    pub screen_width: u64,
    pub screen_height: u64,
}

impl DeviceInfo {
    /// Lenient decode of a client-supplied descriptor. A non-object value is
    /// treated as "no device supplied"; missing or mistyped sub-fields
    /// coerce to empty/zero instead of failing the request.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string()
        };
        let num = |key: &str| obj.get(key).and_then(Value::as_u64).unwrap_or(0);

        Some(Self {
            user_agent: text("userAgent"),
            platform: text("platform"),
            language: text("language"),
            timezone: text("timezone"),
            screen_width: num("screenWidth"),
            screen_height: num("screenHeight"),
        })
    }

    /// Deterministic SHA-256 hex digest over the normalized attributes.
    pub fn fingerprint(&self) -> String {
        let canonical = format!(
            "{}|{}|{}|{}|{}x{}",
            self.user_agent,
            self.platform,
            self.language,
            self.timezone,
            self.screen_width,
            self.screen_height
        );
        format!("{:x}", Sha256::digest(canonical.as_bytes()))
    }
}
