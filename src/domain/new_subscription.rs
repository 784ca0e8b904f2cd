use crate::domain::subscriber_email::SubscriberEmail;

/// Placeholder stored when a piece of provenance was not supplied.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub ip_address: String,
    pub user_agent: String,
    pub source: String,
}

impl Provenance {
    pub fn new(
        ip_address: Option<String>,
        user_agent: Option<String>,
        source: Option<String>,
    ) -> Provenance {
        Provenance {
            ip_address: or_unknown(ip_address),
            user_agent: or_unknown(user_agent),
            source: or_unknown(source),
        }
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Provenance::new(None, None, None)
    }
}

fn or_unknown(value: Option<String>) -> String {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| String::from(UNKNOWN))
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub email: SubscriberEmail,
    pub provenance: Provenance,
}
