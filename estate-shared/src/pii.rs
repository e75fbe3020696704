use serde::{Serialize, Deserialize, Serializer};
use std::fmt;

/// Wrapper for client and vendor contact or banking data.
///
/// `Debug` and `Display` never print the inner value so that `tracing` fields
/// like `?job` cannot leak an email address or an account number. Serialization
/// still writes the real value because API responses need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl Masked<String> {
    /// Last `n` characters with everything before replaced, e.g. `****6789`.
    pub fn tail(&self, n: usize) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= n {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - n..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - n), visible)
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Masked<String> {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_value() {
        let email = Masked::new("owner@example.com".to_string());
        assert_eq!(format!("{:?}", email), "********");
        assert_eq!(format!("{}", email), "********");
    }

    #[test]
    fn test_serializes_inner_value() {
        let email: Masked<String> = "owner@example.com".into();
        let json = serde_json::to_string(&email).unwrap();
        assert_eq!(json, "\"owner@example.com\"");

        let back: Masked<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, email);
    }

    #[test]
    fn test_tail() {
        let account: Masked<String> = "000123456789".into();
        assert_eq!(account.tail(4), "********6789");

        let short: Masked<String> = "12".into();
        assert_eq!(short.tail(4), "**");
    }
}
