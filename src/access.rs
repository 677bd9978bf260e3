use std::collections::HashSet;

pub const DENIED_REPLY: &str = "You are not welcome here";

/// Allow-list of chats that may submit posts.
#[derive(Debug, Clone)]
pub struct AccessGate {
    allowed: HashSet<i64>,
}

/// Reason an inbound message was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    NotOnAllowlist,
}

impl std::fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotOnAllowlist => write!(f, "chat not on allowlist"),
        }
    }
}

impl AccessGate {
    pub fn new(allowed: impl IntoIterator<Item = i64>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// An empty allow-list denies everyone.
    pub fn check(&self, chat_id: i64) -> Result<(), AccessDenied> {
        if self.allowed.contains(&chat_id) {
            Ok(())
        } else {
            Err(AccessDenied::NotOnAllowlist)
        }
    }
}
