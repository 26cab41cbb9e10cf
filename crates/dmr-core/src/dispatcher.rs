//! The single receive entry point: resolves the peer, runs the codec and
//! controller, tracks calls, and distributes `DMRD`/`DMRA` traffic to the
//! right set of peers.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use dmr_proto::packet::{Data, MasterClose};
use dmr_proto::{CallType, Packet, VoiceType};

use crate::auth::AuthPolicy;
use crate::call::{CallTracker, RouteTo};
use crate::controller;
use crate::peer::Peer;
use crate::registry::PeerRegistry;
use crate::transport::DatagramTransport;

fn call_type_label(call_type: CallType) -> &'static str {
    match call_type {
        CallType::Group => "group",
        CallType::Unit => "unit",
    }
}

fn drop_reason(err: &dmr_proto::ProtoError) -> &'static str {
    use dmr_proto::ProtoError::*;
    match err {
        UnknownPacketType(_) => "unknown_type",
        BadPacket(_) | FieldOutOfRange { .. } => "bad_packet",
        EmbLcAssembler(_) | CallLcDecoder(_) | Factory(_) => "protocol_violation",
    }
}

/// Observability hook the dispatcher drives; the binary wires this to the
/// Prometheus recorder (see `dmr-metrics`). Every method defaults to a
/// no-op so tests can skip instrumentation entirely.
pub trait DispatcherMetrics: Send + Sync {
    fn peer_login(&self) {}
    fn peer_auth_failure(&self) {}
    fn peer_timeout(&self) {}
    fn packet_rx(&self, _packet_type: &str) {}
    fn packet_dropped(&self, _reason: &str) {}
    fn call_started(&self, _call_type: &str) {}
    fn call_duration(&self, _secs: f64) {}
    fn emblc_assembler_error(&self) {}
    fn peers_active(&self, _n: usize) {}
    fn calls_active(&self, _n: usize) {}
}

#[derive(Default)]
pub struct NoopMetrics;
impl DispatcherMetrics for NoopMetrics {}

/// An external application that observes every dispatched call/packet pair
/// and may synthesize a new `DMRD` packet to inject back into dispatch.
pub trait AppInterceptor: Send + Sync {
    fn on_data(&self, call: &crate::call::Call, packet: &Data) -> Option<Data>;
}

pub struct Dispatcher<T: DatagramTransport> {
    registry: PeerRegistry,
    calls: CallTracker,
    auth: Arc<dyn AuthPolicy>,
    transport: T,
    metrics: Arc<dyn DispatcherMetrics>,
    interceptors: Vec<Arc<dyn AppInterceptor>>,
}

impl<T: DatagramTransport> Dispatcher<T> {
    pub fn new(transport: T, auth: Arc<dyn AuthPolicy>, metrics: Arc<dyn DispatcherMetrics>) -> Self {
        Self {
            registry: PeerRegistry::new(),
            calls: CallTracker::new(),
            auth,
            transport,
            metrics,
            interceptors: Vec::new(),
        }
    }

    pub fn register_interceptor(&mut self, interceptor: Arc<dyn AppInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn calls(&self) -> &CallTracker {
        &self.calls
    }

    /// Blocks for the next datagram and runs it through [`Self::handle_datagram`].
    /// The top-level `select!` loop calls this as one of its branches.
    pub async fn recv_and_handle(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let (n, addr) = self.transport.recv_dg(buf).await?;
        self.handle_datagram(&buf[..n], addr, Instant::now()).await;
        Ok(())
    }

    /// Entry point for one inbound datagram from `addr`.
    pub async fn handle_datagram(&mut self, data: &[u8], addr: SocketAddr, now: Instant) {
        let packet = match dmr_proto::parse(data) {
            Ok(p) => p,
            Err(e) => {
                self.metrics.packet_dropped(drop_reason(&e));
                tracing::debug!(%addr, error = %e, "dropping unparseable datagram");
                return;
            }
        };
        self.metrics.packet_rx(packet.type_name());

        let was_login = matches!(packet, Packet::Login(_));
        let was_auth = matches!(packet, Packet::Auth(_));

        let control = match controller::handle_inbound(&mut self.registry, self.auth.as_ref(), addr, &packet, now)
        {
            Ok(c) => c,
            Err(e) => {
                self.metrics.packet_dropped("protocol_violation");
                tracing::warn!(%addr, error = %e, "protocol violation");
                return;
            }
        };

        if let Some(reply) = &control.reply {
            if let Err(e) = self.transport.send_dg(reply, addr).await {
                tracing::warn!(%addr, error = %e, "send failed");
            }
        }

        let peer_alive = self.registry.get(&addr).map(|p| p.status != crate::peer::PeerStatus::Dead);
        if was_login && peer_alive == Some(true) {
            self.metrics.peer_login();
        }
        if was_auth && peer_alive == Some(false) {
            self.metrics.peer_auth_failure();
        }

        if !control.forward {
            return;
        }

        match &packet {
            Packet::Data(data_pkt) => self.handle_data(data_pkt.clone(), Some(addr), now).await,
            Packet::TalkerAlias(_) => {
                self.distribute(&packet, &RouteTo::Broadcast, Some(addr)).await;
            }
            _ => {}
        }
    }

    /// Synthesizes a `DMRD` packet as if it arrived from the network, with
    /// no originating address to skip during distribution.
    pub async fn inject_packet(&mut self, data_pkt: Data, now: Instant) {
        self.handle_data(data_pkt, None, now).await;
    }

    async fn handle_data(&mut self, data_pkt: Data, orig_addr: Option<SocketAddr>, now: Instant) {
        let stream_id = data_pkt.stream_id();
        let call_type = data_pkt.call_type();
        let src_id = data_pkt.src_id();
        let dst_id = data_pkt.dst_id();
        let peer_id = data_pkt.peer_id();
        let is_term = data_pkt.is_voice_term();
        let is_new = self.calls.get(stream_id).is_none();

        let registry = &self.registry;
        let route_to = || -> RouteTo {
            if call_type == CallType::Unit {
                let targets: Vec<SocketAddr> =
                    registry.get_by_unit(dst_id).into_iter().map(|p| p.addr).collect();
                if targets.is_empty() {
                    RouteTo::Broadcast
                } else {
                    RouteTo::Targets(targets)
                }
            } else {
                RouteTo::Broadcast
            }
        };

        let call =
            self.calls.on_data(stream_id, src_id, dst_id, peer_id, call_type, is_term, now, route_to).clone();

        if is_new {
            self.metrics.call_started(call_type_label(call_type));
        }
        if is_term {
            if let Some(duration) = call.duration() {
                self.metrics.call_duration(duration.as_secs_f64());
            }
        }

        if data_pkt.voice_type() != VoiceType::None && self.calls.on_voice_frame(stream_id, &data_pkt) {
            self.metrics.emblc_assembler_error();
        }

        let mut injected = Vec::new();
        for interceptor in &self.interceptors {
            if let Some(packet) = interceptor.on_data(&call, &data_pkt) {
                injected.push(packet);
            }
        }

        self.distribute(&Packet::Data(data_pkt), &call.route_to, orig_addr).await;

        for packet in injected {
            // Re-enters with no originating address, per SPEC_FULL.md §4.F.
            Box::pin(self.inject_packet(packet, now)).await;
        }
    }

    /// Sends `packet` to every peer named by `route_to` (or every active
    /// peer for `Broadcast`), rewriting each copy's `peer_id` to the
    /// target's own id. Skips `skip_addr` to avoid looping a packet back to
    /// its sender.
    async fn distribute(&self, packet: &Packet, route_to: &RouteTo, skip_addr: Option<SocketAddr>) {
        let targets: Vec<&Peer> = match route_to {
            RouteTo::Broadcast => self.registry.get_active(),
            RouteTo::Targets(addrs) => addrs.iter().filter_map(|a| self.registry.get(a)).collect(),
        };
        for target in targets {
            if Some(target.addr) == skip_addr {
                continue;
            }
            let mut out = packet.clone();
            out.set_peer_id(target.peer_id);
            if let Err(e) = self.transport.send_dg(out.as_bytes(), target.addr).await {
                tracing::warn!(addr = %target.addr, error = %e, "distribute send failed");
            }
        }
    }

    /// Runs registry and call-tracker maintenance, in that order, and
    /// reports current gauge levels. Fired every `MAINTENANCE_PERIOD`.
    pub fn run_maintenance(&mut self, now: Instant) {
        let before = self.registry.len();
        self.registry.maintain(now);
        let timed_out = before.saturating_sub(self.registry.len());
        for _ in 0..timed_out {
            self.metrics.peer_timeout();
        }
        self.calls.maintain(now);
        self.metrics.peers_active(self.registry.get_active().len());
        self.metrics.calls_active(self.calls.active_count());
    }

    /// Sends `MSTCL` to every known peer, then releases the transport.
    pub async fn shutdown(self) {
        for peer in self.registry.iter() {
            let mut p = MasterClose::new();
            p.set_peer_id(peer.peer_id);
            if let Err(e) = self.transport.send_dg(p.as_bytes(), peer.addr).await {
                tracing::warn!(addr = %peer.addr, error = %e, "shutdown send failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AllowAll;
    use crate::transport::fake::FakeTransport;
    use dmr_proto::packet::{Auth, Config, Login};
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    async fn handshake(dispatcher: &mut Dispatcher<FakeTransport>, peer_addr: SocketAddr, peer_id: u32, now: Instant) {
        let mut login = Login::new();
        login.set_peer_id(peer_id);
        dispatcher.handle_datagram(login.as_bytes(), peer_addr, now).await;

        let salt = dispatcher.registry().get(&peer_addr).unwrap().salt;
        let mut auth = Auth::new();
        auth.set_peer_id(peer_id);
        auth.set_password_hash(&salt, "whatever");
        dispatcher.handle_datagram(auth.as_bytes(), peer_addr, now).await;

        let mut config = Config::new();
        config.set_peer_id(peer_id);
        config.set_callsign("TEST");
        dispatcher.handle_datagram(config.as_bytes(), peer_addr, now).await;
    }

    #[tokio::test]
    async fn group_call_broadcasts_to_every_other_active_peer() {
        let transport = FakeTransport::new();
        let mut dispatcher = Dispatcher::new(transport, Arc::new(AllowAll), Arc::new(NoopMetrics));
        let now = Instant::now();

        handshake(&mut dispatcher, addr(1), 100, now).await;
        handshake(&mut dispatcher, addr(2), 200, now).await;

        let mut data = Data::new();
        data.set_peer_id(100);
        data.set_src_id(555).unwrap();
        data.set_dst_id(9).unwrap();
        data.set_stream_id(777);
        dispatcher.handle_datagram(data.as_bytes(), addr(1), now).await;

        let sent = dispatcher.transport.sent.lock().await;
        // Peer 1 (the sender) is skipped; peer 2 gets the DMRD, with its
        // own peer_id rewritten in.
        let dmrd_to_peer2 = sent
            .iter()
            .filter(|(_, a)| *a == addr(2))
            .find(|(bytes, _)| bytes.starts_with(b"DMRD"));
        assert!(dmrd_to_peer2.is_some());
        let (bytes, _) = dmrd_to_peer2.unwrap();
        let parsed = dmr_proto::parse(bytes).unwrap();
        assert_eq!(parsed.peer_id(), 200);
    }

    #[tokio::test]
    async fn unit_call_routes_only_to_peers_that_heard_the_unit() {
        let transport = FakeTransport::new();
        let mut dispatcher = Dispatcher::new(transport, Arc::new(AllowAll), Arc::new(NoopMetrics));
        let now = Instant::now();

        handshake(&mut dispatcher, addr(1), 100, now).await;
        handshake(&mut dispatcher, addr(2), 200, now).await;
        handshake(&mut dispatcher, addr(3), 300, now).await;

        // Peer 2 has heard unit 42 transmit before.
        let mut heard = Data::new();
        heard.set_peer_id(200);
        heard.set_src_id(42).unwrap();
        heard.set_dst_id(1).unwrap();
        heard.set_stream_id(1);
        dispatcher.handle_datagram(heard.as_bytes(), addr(2), now).await;

        let mut unit_call = Data::new();
        unit_call.set_peer_id(100);
        unit_call.set_call_type(dmr_proto::CallType::Unit);
        unit_call.set_src_id(555).unwrap();
        unit_call.set_dst_id(42).unwrap();
        unit_call.set_stream_id(2);
        dispatcher.handle_datagram(unit_call.as_bytes(), addr(1), now).await;

        let sent = dispatcher.transport.sent.lock().await;
        let to_peer2 = sent.iter().any(|(b, a)| {
            *a == addr(2)
                && dmr_proto::parse(b)
                    .ok()
                    .map(|p| matches!(p, Packet::Data(d) if d.stream_id() == 2))
                    .unwrap_or(false)
        });
        let to_peer3 = sent.iter().any(|(_, a)| *a == addr(3));
        assert!(to_peer2, "unit call should reach the peer that heard unit 42");
        assert!(!to_peer3, "unit call should not reach peers that never heard unit 42");
    }

    #[tokio::test]
    async fn deny_all_rejects_every_login() {
        let transport = FakeTransport::new();
        let mut dispatcher =
            Dispatcher::new(transport, Arc::new(crate::auth::DenyAll), Arc::new(NoopMetrics));
        let now = Instant::now();

        let mut login = Login::new();
        login.set_peer_id(12345);
        dispatcher.handle_datagram(login.as_bytes(), addr(1), now).await;

        assert_eq!(dispatcher.registry().get(&addr(1)).unwrap().status, crate::peer::PeerStatus::Dead);
    }
}
