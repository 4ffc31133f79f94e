//! Deterministic UID/GID assignment for `(project, principal)` pairs.
//!
//! UIDs and GIDs are derived by hashing the pair into a reserved numeric
//! range rather than handed out sequentially from a counter. This makes
//! the assignment stable across workspaces and daemon restarts without
//! needing its own persisted allocation table — the same `(project,
//! principal)` pair always hashes to the same id, which is what keeps
//! shared-volume permissions consistent for a user across every
//! workspace they touch.

use basecamp_core::ids::ProjectId;
use serde::{Deserialize, Serialize};

/// Lower bound (inclusive) of the UID/GID range reserved for
/// orchestrator-assigned identities. Chosen to sit above the typical
/// system/service account range (0-999) and the typical first local
/// user (1000) on Linux distributions, and below the anonymous/nobody
/// range some distributions reserve above 65000.
const RESERVED_RANGE_START: u32 = 20_000;

/// Exclusive upper bound of the reserved range.
const RESERVED_RANGE_END: u32 = 60_000;

const RANGE_SIZE: u32 = RESERVED_RANGE_END - RESERVED_RANGE_START;

/// A POSIX uid/gid pair assigned to one `(project, principal)` scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnixIdentity {
    pub uid: u32,
    pub gid: u32,
}

/// Deterministically derive the [`UnixIdentity`] for a project member.
///
/// The uid and gid are hashed from independent domains (`"uid"` and
/// `"gid"` prefixes) so that, barring a hash collision, a principal's
/// uid and gid differ even though both are bound to the same project.
#[must_use]
pub fn assign_identity(project: ProjectId, principal: &str) -> UnixIdentity {
    UnixIdentity {
        uid: hash_into_range("uid", project, principal),
        gid: hash_into_range("gid", project, principal),
    }
}

fn hash_into_range(domain: &str, project: ProjectId, principal: &str) -> u32 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain.as_bytes());
    hasher.update(project.0.as_bytes());
    hasher.update(principal.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&digest.as_bytes()[0..4]);
    let raw = u32::from_le_bytes(bytes);

    RESERVED_RANGE_START + (raw % RANGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_is_deterministic() {
        let project = ProjectId::new();
        let a = assign_identity(project, "alice");
        let b = assign_identity(project, "alice");
        assert_eq!(a, b);
    }

    #[test]
    fn different_principals_get_different_uids() {
        let project = ProjectId::new();
        let alice = assign_identity(project, "alice");
        let bob = assign_identity(project, "bob");
        assert_ne!(alice.uid, bob.uid);
    }

    #[test]
    fn uid_and_gid_differ_for_same_principal() {
        let project = ProjectId::new();
        let id = assign_identity(project, "alice");
        assert_ne!(id.uid, id.gid);
    }

    #[test]
    fn same_principal_different_projects_get_different_uids() {
        let alice_in_p1 = assign_identity(ProjectId::new(), "alice");
        let alice_in_p2 = assign_identity(ProjectId::new(), "alice");
        assert_ne!(alice_in_p1.uid, alice_in_p2.uid);
    }

    #[test]
    fn ids_stay_within_reserved_range() {
        let project = ProjectId::new();
        for name in ["alice", "bob", "carol", "dave", "erin"] {
            let id = assign_identity(project, name);
            assert!(id.uid >= RESERVED_RANGE_START && id.uid < RESERVED_RANGE_END);
            assert!(id.gid >= RESERVED_RANGE_START && id.gid < RESERVED_RANGE_END);
        }
    }
}
