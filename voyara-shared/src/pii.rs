use serde::{Deserialize, Serialize};
use std::fmt;

/// Contact email attached to a service request.
///
/// `Debug` and `Display` keep the first character and the domain
/// (`a***@example.com`) so logs can tell agencies apart without carrying the
/// address. Serialization writes the full address for the parties' API payloads.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaskedEmail(String);

impl MaskedEmail {
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    fn masked(&self) -> String {
        match self.0.split_once('@') {
            Some((local, domain)) => {
                let first: String = local.chars().take(1).collect();
                format!("{}***@{}", first, domain)
            }
            None => "***".to_string(),
        }
    }
}

impl fmt::Debug for MaskedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MaskedEmail({})", self.masked())
    }
}

impl fmt::Display for MaskedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_keep_only_first_letter_and_domain() {
        let email = MaskedEmail::new("bookings@harbourview.example");
        assert_eq!(email.to_string(), "b***@harbourview.example");
        assert_eq!(format!("{:?}", email), "MaskedEmail(b***@harbourview.example)");
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"bookings@harbourview.example\"");
        assert_eq!(email.expose(), "bookings@harbourview.example");

        assert_eq!(MaskedEmail::new("not-an-address").to_string(), "***");
    }
}
