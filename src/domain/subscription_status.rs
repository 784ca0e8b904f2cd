#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum SubscriptionStatus {
    #[default]
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "UNSUBSCRIBED")]
    Unsubscribed,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 2] =
        [SubscriptionStatus::Active, SubscriptionStatus::Unsubscribed];

    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }

    /// Accepts the stored representation in any letter case.
    pub fn parse(status: String) -> Result<SubscriptionStatus, String> {
        match status.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(SubscriptionStatus::Active),
            "UNSUBSCRIBED" => Ok(SubscriptionStatus::Unsubscribed),
            _ => Err(format!("{} is not a valid subscription status", status)),
        }
    }
}

impl AsRef<str> for SubscriptionStatus {
    fn as_ref(&self) -> &str {
        match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Unsubscribed => "UNSUBSCRIBED",
        }
    }
}
