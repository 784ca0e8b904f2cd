use validator::validate_email;

/// An email address trimmed and lower-cased, so two spellings of the same
/// mailbox always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(email: String) -> Result<SubscriberEmail, String> {
        let normalized = email.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(String::from("Email address cannot be empty"));
        }

        if !validate_email(normalized.as_str()) || !has_top_level_domain(&normalized) {
            return Err(format!("{} email is not valid", email.trim()));
        }

        Ok(Self(normalized))
    }
}

// `validate_email` accepts bare hosts such as `user@localhost`, a waitlist address needs a tld.
fn has_top_level_domain(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((_, domain)) => match domain.rsplit_once('.') {
            Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
            None => false,
        },
        None => false,
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
