use time::OffsetDateTime;

pub mod cancellation;

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct Id(uuid::Uuid);

impl Default for Id {
    fn default() -> Self {
        Id(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Id {
    pub fn new() -> Self {
        Default::default()
    }
}

/// Opaque token for one backup trigger, handed over by the external
/// scheduler. Carries nothing the handler depends on beyond identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: Id,
    pub triggered_at: OffsetDateTime,
}

impl Job {
    pub fn new() -> Self {
        Job {
            id: Id::new(),
            triggered_at: OffsetDateTime::now_utc(),
        }
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}
