use std::collections::HashSet;
use std::time::Duration;

use tokio::time::timeout;

use crate::directory::Directory;
use crate::error::Error;
use crate::store::TtlStore;
use crate::types::{PrincipalId, Role, RoleId};

// Cache values are delimiter-joined name lists; Directory implementors
// must keep the delimiter out of permission names.
const DELIMITER: &str = ",";

fn cache_key(role: RoleId) -> String {
    format!("role_perms:{role}")
}

fn encode_permissions(permissions: &[String]) -> String {
    permissions.join(DELIMITER)
}

fn decode_permissions(raw: &str) -> Vec<String> {
    raw.split(DELIMITER)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Cache-aside role→permission resolution.
///
/// Per-role entries live under `role_perms:{roleID}` with a short TTL, so
/// assignment changes converge quickly. A role with zero permissions caches
/// an *empty* entry — a hit, not a miss — so permission-less roles don't
/// hammer the Directory on every request.
///
/// Two concurrent requests for the same principal can both miss and both
/// reload; both compute the same value from the same authoritative source,
/// so last-write-wins on the cache key is benign and no lock is taken.
#[derive(Debug, Clone)]
pub struct PermissionResolver<S> {
    store: S,
    cache_ttl: Duration,
    backend_timeout: Duration,
}

impl<S: TtlStore> PermissionResolver<S> {
    pub fn new(store: S, cache_ttl: Duration, backend_timeout: Duration) -> Self {
        Self {
            store,
            cache_ttl,
            backend_timeout,
        }
    }

    /// Resolve the deduplicated union of permission names for `role_ids`.
    ///
    /// All-hit resolutions are served from cache; any miss falls back to a
    /// single joined Directory fetch that repopulates every role it
    /// returns, amortizing the next miss for sibling roles. An empty
    /// `role_ids` (token issued without role data) forces the reload path.
    ///
    /// Cache backend errors are absorbed as misses; only Directory failures
    /// surface. The returned set is unordered.
    ///
    /// # Errors
    ///
    /// [`Error::Directory`] when the fallback fetch fails or times out.
    pub async fn resolve<D: Directory>(
        &self,
        directory: &D,
        principal: PrincipalId,
        role_ids: &[RoleId],
    ) -> Result<HashSet<String>, Error> {
        if role_ids.is_empty() {
            return self.reload(directory, principal).await;
        }

        let mut cached: Vec<Vec<String>> = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            match self.cache_get(*role_id).await {
                Some(raw) => cached.push(decode_permissions(&raw)),
                // No point probing the remaining roles; the reload
                // repopulates all of them anyway.
                None => return self.reload(directory, principal).await,
            }
        }

        Ok(cached.into_iter().flatten().collect())
    }

    /// Full reload path: one joined Directory fetch, then repopulate the
    /// cache entry of every returned role.
    ///
    /// # Errors
    ///
    /// [`Error::Directory`] when the fetch fails or times out.
    pub async fn reload<D: Directory>(
        &self,
        directory: &D,
        principal: PrincipalId,
    ) -> Result<HashSet<String>, Error> {
        let roles = timeout(
            self.backend_timeout,
            directory.roles_and_permissions_for_user(principal),
        )
        .await
        .map_err(|elapsed| Error::Directory(Box::new(elapsed)))?
        .map_err(Error::Directory)?;

        Ok(self.populate(&roles).await)
    }

    /// Write cache entries for already-loaded roles and return their
    /// permission union. Used by the reload path and by refresh rotation,
    /// which has the roles in hand from its own Directory load.
    pub(crate) async fn populate(&self, roles: &[Role]) -> HashSet<String> {
        let mut permissions = HashSet::new();
        for role in roles {
            let encoded = encode_permissions(&role.permissions);
            match timeout(
                self.backend_timeout,
                self.store.put(&cache_key(role.id), &encoded, self.cache_ttl),
            )
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::warn!(error = %error, role_id = %role.id, "failed to cache role permissions");
                }
                Err(_) => {
                    tracing::warn!(role_id = %role.id, "permission cache write timed out");
                }
            }
            permissions.extend(role.permissions.iter().cloned());
        }
        permissions
    }

    /// Cache read with backend errors and timeouts absorbed as misses.
    async fn cache_get(&self, role_id: RoleId) -> Option<String> {
        match timeout(self.backend_timeout, self.store.get(&cache_key(role_id))).await {
            Ok(Ok(value)) => value,
            Ok(Err(error)) => {
                tracing::warn!(error = %error, role_id = %role_id, "permission cache read failed; treating as miss");
                None
            }
            Err(_) => {
                tracing::warn!(role_id = %role_id, "permission cache read timed out; treating as miss");
                None
            }
        }
    }
}
