//! Peer authentication policy.

use std::collections::HashMap;

use dmr_proto::calc_password_hash;

pub trait AuthPolicy: Send + Sync + 'static {
    fn allow_peer_id(&self, peer_id: u32) -> bool;
    fn check_password(&self, peer_id: u32, salt: &[u8; 4], pass_hash: &[u8; 32]) -> bool;
}

/// Rejects every peer. The default policy on a fresh server.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl AuthPolicy for DenyAll {
    fn allow_peer_id(&self, _peer_id: u32) -> bool {
        false
    }

    fn check_password(&self, _peer_id: u32, _salt: &[u8; 4], _pass_hash: &[u8; 32]) -> bool {
        false
    }
}

/// Accepts every peer id with any password. Development use only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AuthPolicy for AllowAll {
    fn allow_peer_id(&self, _peer_id: u32) -> bool {
        true
    }

    fn check_password(&self, _peer_id: u32, _salt: &[u8; 4], _pass_hash: &[u8; 32]) -> bool {
        true
    }
}

/// Accepts only the listed peer ids. An empty password for an entry means
/// "accept any hash" (development mode).
#[derive(Debug, Clone, Default)]
pub struct ListAuth {
    passwords: HashMap<u32, String>,
}

impl ListAuth {
    pub fn new(passwords: HashMap<u32, String>) -> Self {
        Self { passwords }
    }
}

impl AuthPolicy for ListAuth {
    fn allow_peer_id(&self, peer_id: u32) -> bool {
        self.passwords.contains_key(&peer_id)
    }

    fn check_password(&self, peer_id: u32, salt: &[u8; 4], pass_hash: &[u8; 32]) -> bool {
        match self.passwords.get(&peer_id) {
            None => false,
            Some(password) if password.is_empty() => true,
            Some(password) => &calc_password_hash(salt, password) == pass_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_all_rejects_everything() {
        let policy = DenyAll;
        assert!(!policy.allow_peer_id(1));
        assert!(!policy.check_password(1, &[0; 4], &[0; 32]));
    }

    #[test]
    fn allow_all_accepts_everything() {
        let policy = AllowAll;
        assert!(policy.allow_peer_id(1));
        assert!(policy.check_password(1, &[0; 4], &[1; 32]));
    }

    #[test]
    fn list_auth_checks_password_hash() {
        let mut passwords = HashMap::new();
        passwords.insert(312000, "secret".to_string());
        passwords.insert(312001, String::new());
        let policy = ListAuth::new(passwords);

        assert!(policy.allow_peer_id(312000));
        assert!(!policy.allow_peer_id(999));

        let salt = [1, 2, 3, 4];
        let good_hash = calc_password_hash(&salt, "secret");
        assert!(policy.check_password(312000, &salt, &good_hash));
        assert!(!policy.check_password(312000, &salt, &[0; 32]));

        // Empty password entry accepts any hash.
        assert!(policy.check_password(312001, &salt, &[0; 32]));
    }
}
