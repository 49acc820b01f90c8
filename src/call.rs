use std::fmt;

use uuid::Uuid;

/// Identifies one RPC invocation in log output.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct CallId(Uuid);

impl CallId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
