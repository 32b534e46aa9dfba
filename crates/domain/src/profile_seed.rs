use crate::auth_activity::AuthActivityEvent;

const NAME_DETAIL: &str = "name";
const USERNAME_DETAIL: &str = "username";
const EMAIL_DETAIL: &str = "email";
const PICTURE_DETAILS: [&str; 3] = ["picture_url", "avatar_url", "picture"];

/// Minimal profile fields derived from a login event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileBootstrapSeed {
    /// Principal the profile is keyed by.
    pub subject: String,
    /// Numeric user id, when the event carried a valid one.
    pub user_id: Option<i64>,
    /// `name` detail, then `username`, then the principal itself.
    pub preferred_name: String,
    /// `email` detail.
    pub email: Option<String>,
    /// First present provider picture detail.
    pub picture_url: Option<String>,
}

impl ProfileBootstrapSeed {
    /// Builds a seed, or `None` when the event has no usable principal.
    #[must_use]
    pub fn from_activity(event: &AuthActivityEvent) -> Option<Self> {
        let subject = event.subject()?.to_owned();

        let preferred_name = event
            .detail(NAME_DETAIL)
            .or_else(|| event.detail(USERNAME_DETAIL))
            .unwrap_or_else(|| subject.clone());
        let picture_url = PICTURE_DETAILS
            .iter()
            .find_map(|key| event.detail(key));

        Some(Self {
            subject,
            user_id: event.user_id,
            preferred_name,
            email: event.detail(EMAIL_DETAIL),
            picture_url,
        })
    }
}
