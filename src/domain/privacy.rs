use serde::{Deserialize, Serialize};

/// Who may see or use a piece of a user's account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    Everyone,
    Followers,
    Nobody,
}

impl Audience {
    /// The owner always passes; `Followers` needs an active follow from the viewer.
    pub fn permits(self, viewer_id: Option<i64>, owner_id: i64, viewer_follows_owner: bool) -> bool {
        if viewer_id == Some(owner_id) {
            return true;
        }
        match self {
            Self::Everyone => true,
            Self::Followers => viewer_id.is_some() && viewer_follows_owner,
            Self::Nobody => false,
        }
    }

    /// Whether evaluating this audience needs the follow edge looked up.
    pub fn needs_follow_state(self) -> bool {
        matches!(self, Self::Followers)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacySettings {
    #[serde(alias = "who_can_message")]
    pub allow_messages: Audience,
    #[serde(alias = "who_sees_likes")]
    pub show_likes: Audience,
    #[serde(alias = "who_sees_reposts")]
    pub show_reposts: Audience,
    #[serde(alias = "who_sees_followers")]
    pub show_followers: Audience,
    #[serde(alias = "who_sees_following")]
    pub show_following: Audience,
    #[serde(alias = "who_sees_friends")]
    pub show_friends: Audience,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_always_permitted() {
        for audience in [Audience::Everyone, Audience::Followers, Audience::Nobody] {
            assert!(audience.permits(Some(5), 5, false));
        }
    }

    #[test]
    fn everyone_includes_anonymous() {
        assert!(Audience::Everyone.permits(None, 5, false));
        assert!(Audience::Everyone.permits(Some(6), 5, false));
    }

    #[test]
    fn followers_requires_active_follow() {
        assert!(!Audience::Followers.permits(None, 5, false));
        assert!(!Audience::Followers.permits(Some(6), 5, false));
        assert!(Audience::Followers.permits(Some(6), 5, true));
    }

    #[test]
    fn nobody_excludes_followers() {
        assert!(!Audience::Nobody.permits(Some(6), 5, true));
        assert!(!Audience::Nobody.permits(None, 5, false));
    }

    #[test]
    fn settings_default_missing_fields() {
        let settings: PrivacySettings =
            serde_json::from_str(r#"{"allow_messages":"nobody"}"#).expect("valid settings");
        assert_eq!(settings.allow_messages, Audience::Nobody);
        assert_eq!(settings.show_likes, Audience::Everyone);
        assert_eq!(settings.show_friends, Audience::Everyone);
    }

    #[test]
    fn settings_accept_client_field_names() {
        let settings: PrivacySettings = serde_json::from_str(
            r#"{"who_can_message":"followers","who_sees_likes":"nobody"}"#,
        )
        .expect("valid settings");
        assert_eq!(settings.allow_messages, Audience::Followers);
        assert_eq!(settings.show_likes, Audience::Nobody);
    }

    #[test]
    fn unknown_audience_is_rejected() {
        let parsed = serde_json::from_str::<PrivacySettings>(r#"{"show_likes":"friends"}"#);
        assert!(parsed.is_err());
    }
}
