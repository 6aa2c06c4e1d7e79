// Dungeon Oracle — Access Control
// Open or allowlist admission, checked before the rate limiter. The admin
// always passes; admin-only operations check `is_admin` separately.

use crate::atoms::types::UserId;
use crate::engine::config::{AccessConfig, AccessPolicyKind};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    kind: AccessPolicyKind,
    allowed: HashSet<UserId>,
    admin: Option<UserId>,
}

impl AccessPolicy {
    pub fn new(config: &AccessConfig, admin: Option<i64>) -> Self {
        AccessPolicy {
            kind: config.policy,
            allowed: config.allowed_users.iter().copied().map(UserId).collect(),
            admin: admin.map(UserId),
        }
    }

    pub fn open() -> Self {
        AccessPolicy { kind: AccessPolicyKind::Open, allowed: HashSet::new(), admin: None }
    }

    pub fn is_allowed(&self, user_id: UserId) -> bool {
        match self.kind {
            AccessPolicyKind::Open => true,
            AccessPolicyKind::Allowlist => self.is_admin(user_id) || self.allowed.contains(&user_id),
        }
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admin == Some(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_admits_everyone() {
        let p = AccessPolicy::open();
        assert!(p.is_allowed(UserId(123)));
        assert!(!p.is_admin(UserId(123)));
    }

    #[test]
    fn allowlist_admits_listed_and_admin_only() {
        let cfg = AccessConfig { policy: AccessPolicyKind::Allowlist, allowed_users: vec![1, 2] };
        let p = AccessPolicy::new(&cfg, Some(99));
        assert!(p.is_allowed(UserId(1)));
        assert!(p.is_allowed(UserId(99)));
        assert!(!p.is_allowed(UserId(3)));
        assert!(p.is_admin(UserId(99)));
    }
}
