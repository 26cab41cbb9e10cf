//! The set of repeaters currently known to the master, keyed by source
//! address. Owned exclusively by the dispatcher's task; no locking.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::peer::{Peer, PeerStatus};

pub const UNIT_TIMEOUT: Duration = Duration::from_secs(3600);
pub const PING_TIMEOUT: Duration = Duration::from_secs(130);

#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<SocketAddr, Peer>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing peer for `addr`, or creates a fresh one in
    /// `LOGIN`.
    pub fn get_by_addr(&mut self, addr: SocketAddr, now: Instant) -> &mut Peer {
        self.peers.entry(addr).or_insert_with(|| Peer::new(addr, now))
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<&Peer> {
        self.peers.get(addr)
    }

    pub fn get_mut(&mut self, addr: &SocketAddr) -> Option<&mut Peer> {
        self.peers.get_mut(addr)
    }

    pub fn remove(&mut self, addr: &SocketAddr) -> Option<Peer> {
        self.peers.remove(addr)
    }

    /// All peers currently registered under `peer_id` (used to detect
    /// duplicate logins).
    pub fn get_by_id(&self, peer_id: u32) -> Vec<&Peer> {
        self.peers.values().filter(|p| p.peer_id == peer_id).collect()
    }

    /// All peers whose unit table currently contains `unit_id`. Per
    /// SPEC_FULL.md, when more than one peer has heard the same unit, every
    /// candidate is a routing target — this is deliberately not
    /// disambiguated.
    pub fn get_by_unit(&self, unit_id: u32) -> Vec<&Peer> {
        self.peers.values().filter(|p| p.has_unit(unit_id)).collect()
    }

    pub fn get_active(&self) -> Vec<&Peer> {
        self.peers.values().filter(|p| p.status == PeerStatus::Active).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Expires stale units on every peer and marks idle peers `DEAD`, then
    /// prunes any peer already `DEAD`. Runs every `MAINTENANCE_PERIOD`.
    pub fn maintain(&mut self, now: Instant) {
        for peer in self.peers.values_mut() {
            peer.expire_units(now, UNIT_TIMEOUT);
            if peer.status != PeerStatus::Dead && now.duration_since(peer.last_active) >= PING_TIMEOUT
            {
                tracing::info!(peer_id = peer.peer_id, addr = %peer.addr, "peer ping timeout, marking dead");
                peer.status = PeerStatus::Dead;
            }
        }
        self.peers.retain(|_, peer| peer.status != PeerStatus::Dead);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    #[test]
    fn get_by_addr_creates_peer_in_login() {
        let mut registry = PeerRegistry::new();
        let now = Instant::now();
        let peer = registry.get_by_addr(addr(1000), now);
        assert_eq!(peer.status, PeerStatus::Login);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_by_id_finds_duplicate_logins() {
        let mut registry = PeerRegistry::new();
        let now = Instant::now();
        registry.get_by_addr(addr(1), now).peer_id = 312000;
        registry.get_by_addr(addr(2), now).peer_id = 312000;
        assert_eq!(registry.get_by_id(312000).len(), 2);
    }

    #[test]
    fn get_by_unit_returns_every_candidate_peer() {
        let mut registry = PeerRegistry::new();
        let now = Instant::now();
        registry.get_by_addr(addr(1), now).update_unit(555, now);
        registry.get_by_addr(addr(2), now).update_unit(555, now);
        assert_eq!(registry.get_by_unit(555).len(), 2);
    }

    #[test]
    fn maintain_marks_idle_peer_dead_then_prunes() {
        let mut registry = PeerRegistry::new();
        let start = Instant::now();
        registry.get_by_addr(addr(1), start).status = PeerStatus::Active;

        let after_timeout = start + PING_TIMEOUT;
        registry.maintain(after_timeout);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn maintain_expires_stale_units() {
        let mut registry = PeerRegistry::new();
        let start = Instant::now();
        let peer = registry.get_by_addr(addr(1), start);
        peer.status = PeerStatus::Active;
        peer.touch(start);
        peer.update_unit(1, start);

        let later = start + UNIT_TIMEOUT;
        registry.get_mut(&addr(1)).unwrap().touch(later);
        registry.maintain(later);
        let peer = registry.get(&addr(1)).unwrap();
        assert!(!peer.has_unit(1));
    }
}
