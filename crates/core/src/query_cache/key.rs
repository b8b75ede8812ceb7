//! Canonical cache keys for parametrized reads.
//!
//! The encoding is length-prefixed and type-tagged, so it can be parsed back
//! unambiguously: two different `(signature, params)` pairs never share a key.

use std::fmt;

use super::SqlValue;

/// Key of one cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    /// Build the key for `signature` with positional `params`.
    ///
    /// Layout: `s<len>:<signature>` then `#<count>` then one token per value:
    /// `n` for NULL, `i<int>;`, `r<hex bits>;`, `t<len>:<text>`, `b<len>:<hex>`.
    pub fn new(signature: &str, params: &[SqlValue]) -> Self {
        let mut key = String::with_capacity(signature.len() + 8 + params.len() * 8);
        key.push_str(&format!("s{}:", signature.len()));
        key.push_str(signature);
        key.push_str(&format!("#{}", params.len()));

        for value in params {
            match value {
                SqlValue::Null => key.push('n'),
                SqlValue::Integer(i) => key.push_str(&format!("i{i};")),
                SqlValue::Real(f) => key.push_str(&format!("r{:016x};", f.to_bits())),
                SqlValue::Text(s) => {
                    key.push_str(&format!("t{}:", s.len()));
                    key.push_str(s);
                }
                SqlValue::Blob(b) => {
                    key.push_str(&format!("b{}:", b.len()));
                    key.push_str(&hex::encode(b));
                }
            }
        }

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
