//! # Encryptors
//!
//! Column encryption is delegated to an `Encryptor`. The optimize layer only calls
//! it for values written by insert statements; the cipher algorithm itself is the
//! encryptor's business.
//!
//! An encryptor may additionally produce a *query-assisted* value: a deterministic
//! digest stored in a companion column so that equality lookups can be rewritten
//! against it when the cipher itself is not deterministic.

use crate::error::Result;
use crate::value::ScalarValue;

pub trait Encryptor: Send + Sync {
    /// Encrypt a plaintext value. NULL stays NULL.
    fn encrypt(&self, plain: &ScalarValue) -> Result<ScalarValue>;

    /// Value for the assisted-query column, if this encryptor supports one.
    fn query_assisted_encrypt(&self, _plain: &ScalarValue) -> Option<ScalarValue> {
        None
    }
}

/// One-way MD5 digest rendered as lowercase hex.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Encryptor;

impl Md5Encryptor {
    fn digest(plain: &ScalarValue) -> Option<ScalarValue> {
        let text = match plain {
            ScalarValue::Null => return None,
            ScalarValue::Utf8(s) => s.clone(),
            other => other.to_string(),
        };
        Some(ScalarValue::Utf8(format!("{:x}", md5::compute(text.as_bytes()))))
    }
}

impl Encryptor for Md5Encryptor {
    fn encrypt(&self, plain: &ScalarValue) -> Result<ScalarValue> {
        Ok(Self::digest(plain).unwrap_or(ScalarValue::Null))
    }

    fn query_assisted_encrypt(&self, plain: &ScalarValue) -> Option<ScalarValue> {
        Self::digest(plain)
    }
}
