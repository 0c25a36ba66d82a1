use chrono::{DateTime, Utc};

/// Identity asserted by a validated token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TokenClaims {
    pub(crate) email: String,
    pub(crate) user_id: i64,
    pub(crate) issued_at: DateTime<Utc>,
    pub(crate) expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeySource {
    /// Bytes came from the operating system CSPRNG.
    Os,
    /// OS source failed; bytes came from a time-seeded generator.
    Seeded,
}

#[derive(Debug, Clone)]
pub(crate) struct TransmissionKey {
    pub(crate) value: String,
    pub(crate) source: KeySource,
}

impl TransmissionKey {
    pub(crate) fn is_weak(&self) -> bool {
        self.source == KeySource::Seeded
    }
}

/// Access + refresh pair handed out on sign-in and refresh.
#[derive(Debug, Clone)]
pub(crate) struct TokenDetails {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    pub(crate) transmission_key: TransmissionKey,
    pub(crate) access_expires_at: DateTime<Utc>,
    pub(crate) refresh_expires_at: DateTime<Utc>,
}
