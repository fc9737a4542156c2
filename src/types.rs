use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Sentinel permission that satisfies any authorization check (superuser bypass).
pub const ADMIN_PERMISSION: &str = "admin";

/// Sentinel required-permission meaning "any authenticated principal".
///
/// A route guarded with this accepts every logged-in user, but never an
/// anonymous request — the gateway must still have authenticated the caller.
pub const ANY_AUTHENTICATED: &str = "all";

/// Identifier of an authenticated user (the principal).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

/// Identifier of a role in the Directory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct RoleId(pub i64);

/// A named bundle of permissions, as returned by the Directory's joined fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    /// Permission names assigned to this role. May legitimately be empty.
    pub permissions: Vec<String>,
}

/// A user record with roles preloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: PrincipalId,
    pub email: String,
    pub roles: Vec<Role>,
}

impl User {
    /// Role ids in declaration order.
    #[must_use]
    pub fn role_ids(&self) -> Vec<RoleId> {
        self.roles.iter().map(|r| r.id).collect()
    }

    /// Role names in declaration order.
    #[must_use]
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: PrincipalId(7),
            email: "editor@example.com".into(),
            roles: vec![
                Role {
                    id: RoleId(1),
                    name: "editor".into(),
                    permissions: vec!["read".into(), "write".into()],
                },
                Role {
                    id: RoleId(2),
                    name: "viewer".into(),
                    permissions: vec!["read".into()],
                },
            ],
        }
    }

    #[test]
    fn role_ids_preserve_order() {
        assert_eq!(sample_user().role_ids(), vec![RoleId(1), RoleId(2)]);
    }

    #[test]
    fn role_names_preserve_order() {
        assert_eq!(sample_user().role_names(), vec!["editor", "viewer"]);
    }

    #[test]
    fn ids_serialize_transparently() {
        assert_eq!(serde_json::to_string(&PrincipalId(42)).unwrap(), "42");
        assert_eq!(serde_json::from_str::<RoleId>("3").unwrap(), RoleId(3));
    }
}
