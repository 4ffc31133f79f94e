//! Surrogate identifier newtypes shared across every entity kind.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! surrogate_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[doc = concat!("Generate a new random ", stringify!($name), ".")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

surrogate_id!(WorkspaceId, "Surrogate identifier for a [`Workspace`].");
surrogate_id!(ProjectId, "Surrogate identifier for a [`Project`].");
surrogate_id!(VolumeId, "Surrogate identifier for a shared or workspace storage volume.");
surrogate_id!(TemplateId, "Surrogate identifier for a [`Template`].");
surrogate_id!(IdlePolicyId, "Surrogate identifier for an [`IdlePolicy`].");
surrogate_id!(BudgetId, "Surrogate identifier for a [`Budget`].");
surrogate_id!(EventId, "Surrogate identifier for an [`EventRecord`].");
surrogate_id!(CheckpointId, "Surrogate identifier for a template rollback checkpoint.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_roundtrip_through_display() {
        let a = WorkspaceId::new();
        let b = WorkspaceId::new();
        assert_ne!(a, b);

        let parsed: WorkspaceId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
    }
}
