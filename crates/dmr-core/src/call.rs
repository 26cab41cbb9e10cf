//! Call bookkeeping keyed by `stream_id`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use dmr_proto::packet::{Data, VoiceType};
use dmr_proto::{CallLcDecoder, CallType, Lc};

pub const DEAD_TIMEOUT: Duration = Duration::from_secs(5);
pub const CLEAN_TIMEOUT: Duration = Duration::from_secs(60);
pub const CLEAN_LOG_TIMEOUT: Duration = Duration::from_secs(6 * 3600);

/// Where to forward the packets of a call. `Broadcast` means "every active
/// peer"; resolved once at call creation and never recomputed.
#[derive(Debug, Clone)]
pub enum RouteTo {
    Broadcast,
    Targets(Vec<SocketAddr>),
}

#[derive(Debug, Clone)]
pub struct Call {
    pub call_id: u32,
    pub src_id: u32,
    pub dst_id: u32,
    pub peer_id: u32,
    pub call_type: CallType,
    pub start_time: Instant,
    pub last_packet_time: Instant,
    pub end_time: Option<Instant>,
    pub packets: u64,
    pub route_to: RouteTo,
    /// Most recently decoded Link Control block, if any voice header,
    /// terminator, or complete embedded-LC sequence has been seen.
    pub lc: Option<Lc>,
    pub talker_alias: Option<String>,
}

impl Call {
    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end.duration_since(self.start_time))
    }
}

#[derive(Debug, Default)]
pub struct CallTracker {
    active: HashMap<u32, Call>,
    log: HashMap<u32, Call>,
    decoders: HashMap<u32, CallLcDecoder>,
}

impl CallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stream_id: u32) -> Option<&Call> {
        self.active.get(&stream_id)
    }

    /// Looks up the call for `stream_id`, creating it via `route_to` (only
    /// invoked for a new call) if it doesn't exist yet, then advances its
    /// bookkeeping: packet count, `last_packet_time`, and — if this is a
    /// voice terminator — `end_time`.
    pub fn on_data(
        &mut self,
        stream_id: u32,
        src_id: u32,
        dst_id: u32,
        peer_id: u32,
        call_type: CallType,
        is_voice_term: bool,
        now: Instant,
        route_to: impl FnOnce() -> RouteTo,
    ) -> &Call {
        let call = self.active.entry(stream_id).or_insert_with(|| {
            tracing::info!(stream_id, src_id, dst_id, ?call_type, "call started");
            Call {
                call_id: stream_id,
                src_id,
                dst_id,
                peer_id,
                call_type,
                start_time: now,
                last_packet_time: now,
                end_time: None,
                packets: 0,
                route_to: route_to(),
                lc: None,
                talker_alias: None,
            }
        });

        call.last_packet_time = now;
        call.packets += 1;
        if is_voice_term && call.end_time.is_none() {
            call.end_time = Some(now);
            tracing::info!(
                stream_id,
                duration_secs = call.duration().map(|d| d.as_secs_f64()),
                "call ended"
            );
        }
        call
    }

    /// Feeds a voice header/terminator/burst frame into the per-call LC
    /// decoder keyed by `stream_id`, caching any newly decoded Link
    /// Control (and, once complete, talker alias) onto the active call.
    /// Reassembly failures never affect voice routing; they're reported
    /// back to the caller so it can count a metric.
    pub fn on_voice_frame(&mut self, stream_id: u32, frame: &Data) -> bool {
        let voice_type = frame.voice_type();
        let decoder = self.decoders.entry(stream_id).or_default();
        let result = match voice_type {
            VoiceType::Head => decoder.on_voice_header(frame).map(Some),
            VoiceType::Term => decoder.on_voice_terminator(frame).map(Some),
            vt if vt.is_voice_burst() => decoder.on_voice_burst(frame),
            _ => Ok(None),
        };

        match result {
            Ok(Some(lc)) => {
                let alias = decoder.feed_talker_alias(&lc);
                if let Some(call) = self.active.get_mut(&stream_id) {
                    call.lc = Some(lc);
                    if alias.is_some() {
                        call.talker_alias = alias;
                    }
                }
                false
            }
            Ok(None) => false,
            Err(e) => {
                tracing::debug!(stream_id, error = %e, "LC reassembly failed, call unaffected");
                true
            }
        }
    }

    /// Closes unended calls idle for `DEAD_TIMEOUT`, moves calls ended more
    /// than `CLEAN_TIMEOUT` ago into the log set, and prunes log entries
    /// older than `CLEAN_LOG_TIMEOUT`. Runs every `MAINTENANCE_PERIOD`.
    pub fn maintain(&mut self, now: Instant) {
        for call in self.active.values_mut() {
            if call.end_time.is_none() && now.duration_since(call.last_packet_time) >= DEAD_TIMEOUT {
                call.end_time = Some(call.last_packet_time);
                tracing::warn!(stream_id = call.call_id, "call closed by timeout");
            }
        }

        let to_log: Vec<u32> = self
            .active
            .iter()
            .filter_map(|(id, call)| {
                call.end_time.filter(|end| now.duration_since(*end) >= CLEAN_TIMEOUT).map(|_| *id)
            })
            .collect();
        for id in to_log {
            if let Some(call) = self.active.remove(&id) {
                self.decoders.remove(&id);
                self.log.insert(id, call);
            }
        }

        self.log.retain(|_, call| {
            call.end_time.map(|end| now.duration_since(end) < CLEAN_LOG_TIMEOUT).unwrap_or(true)
        });
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|(_, c)| c.end_time.is_none()).count()
    }
}
