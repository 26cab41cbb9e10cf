//! Cardinality control for label values. Unlike a channel id or similar
//! unbounded key, every label this server emits (packet type, drop reason,
//! call type) is drawn from a small fixed set, so bounding means rejecting
//! anything outside that set rather than hash-bucketing it.

/// A label value known in advance to come from a bounded, fixed set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundedLabel(&'static str);

impl BoundedLabel {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Maps an arbitrary string onto one of `known`, falling back to `"other"`
/// so a misbehaving peer can't inflate label cardinality.
pub fn bound(value: &str, known: &[&'static str]) -> BoundedLabel {
    match known.iter().find(|&&k| k == value) {
        Some(k) => BoundedLabel(k),
        None => BoundedLabel("other"),
    }
}

pub const PACKET_TYPES: &[&str] =
    &["RPTL", "RPTK", "RPTC", "RPTPING", "MSTPONG", "MSTNAK", "MSTCL", "RPTCL", "RPTACK", "RPTSBKN", "DMRD", "DMRA"];

pub const DROP_REASONS: &[&str] = &["unknown_type", "bad_packet", "protocol_violation"];

pub const CALL_TYPES: &[&str] = &["group", "unit"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_value_falls_back_to_other() {
        assert_eq!(bound("DMRD", PACKET_TYPES).as_str(), "DMRD");
        assert_eq!(bound("BOGUS", PACKET_TYPES).as_str(), "other");
    }
}
