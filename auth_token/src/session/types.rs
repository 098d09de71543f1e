use std::fmt;

/// Identifier of the user a session token is bound to, as stored
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a request was not admitted.
///
/// All reasons lead to the same response on the wire; the distinction exists
/// for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialReason {
    /// No usable token in the request
    MissingToken,
    /// Token presented but not bound in the store
    UnknownToken,
    /// The store could not answer
    StoreUnavailable,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::UnknownToken => "unknown_token",
            Self::StoreUnavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the admission check for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Admitted(UserId),
    Denied(DenialReason),
}

impl Verdict {
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Admitted(user_id) => Some(user_id),
            Self::Denied(_) => None,
        }
    }
}
