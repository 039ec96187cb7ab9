use serde::{Deserialize, Serialize};

/// State of a follower -> following edge. Only `Active` grants visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowStatus {
    Pending,
    Active,
    Rejected,
    Removed,
}

impl FollowStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "rejected" => Some(Self::Rejected),
            "removed" => Some(Self::Removed),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Rejected => "rejected",
            Self::Removed => "removed",
        }
    }

    /// Whether a new follow attempt should replace this edge.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Removed)
    }

    /// Status a fresh follow request lands in.
    pub fn initial_for(target_is_private: bool) -> Self {
        if target_is_private {
            Self::Pending
        } else {
            Self::Active
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowRequestAction {
    Accept,
    Reject,
}

impl FollowRequestAction {
    /// Anything other than `accept` declines the request.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("accept") {
            Self::Accept
        } else {
            Self::Reject
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_targets_start_pending() {
        assert_eq!(FollowStatus::initial_for(true), FollowStatus::Pending);
        assert_eq!(FollowStatus::initial_for(false), FollowStatus::Active);
    }

    #[test]
    fn only_rejected_and_removed_are_terminal() {
        assert!(FollowStatus::Rejected.is_terminal());
        assert!(FollowStatus::Removed.is_terminal());
        assert!(!FollowStatus::Pending.is_terminal());
        assert!(!FollowStatus::Active.is_terminal());
    }

    #[test]
    fn db_names_parse() {
        for status in [
            FollowStatus::Pending,
            FollowStatus::Active,
            FollowStatus::Rejected,
            FollowStatus::Removed,
        ] {
            assert_eq!(FollowStatus::from_db(status.as_db()), Some(status));
        }
        assert_eq!(FollowStatus::from_db("blocked"), None);
    }

    #[test]
    fn unknown_request_action_rejects() {
        assert_eq!(FollowRequestAction::parse("accept"), FollowRequestAction::Accept);
        assert_eq!(FollowRequestAction::parse("ACCEPT "), FollowRequestAction::Accept);
        assert_eq!(FollowRequestAction::parse("decline"), FollowRequestAction::Reject);
        assert_eq!(FollowRequestAction::parse(""), FollowRequestAction::Reject);
    }
}
