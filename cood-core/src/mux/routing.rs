//! Return-stack item encoding for the multiplexer and the session-ID
//! wrap-safe comparison used to reject stale responses.

/// Bit layout of a return-stack item's `info` field, fixed by the wire
/// contract: `port_index:8 | my_ping:1 | gap:15 | session_id:8`.
pub fn encode_info(port_index: u8, my_ping: bool, session_id: u8) -> u32 {
    ((port_index as u32) << 24) | ((my_ping as u32) << 23) | (session_id as u32)
}

pub struct DecodedInfo {
    pub port_index: u8,
    pub my_ping: bool,
    pub gap: u32,
    pub session_id: u8,
}

pub fn decode_info(info: u32) -> DecodedInfo {
    DecodedInfo {
        port_index: (info >> 24) as u8,
        my_ping: (info >> 23) & 1 != 0,
        gap: (info >> 8) & 0x7fff,
        session_id: (info & 0xff) as u8,
    }
}

/// `true` if `session_id` is strictly older than `oldest_used`, using modular
/// (wrapping) 8-bit distance so a port that reconnects 128+ times without the
/// client observing every generation still rejects genuinely stale responses.
pub fn session_is_stale(session_id: u8, oldest_used: u8) -> bool {
    (session_id.wrapping_sub(oldest_used) as i8) < 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_round_trips() {
        let info = encode_info(0x12, true, 0xab);
        let decoded = decode_info(info);
        assert_eq!(decoded.port_index, 0x12);
        assert!(decoded.my_ping);
        assert_eq!(decoded.gap, 0);
        assert_eq!(decoded.session_id, 0xab);
    }

    #[test]
    fn gap_field_is_zero_for_valid_items() {
        let info = encode_info(0, false, 0);
        assert_eq!(decode_info(info).gap, 0);
    }

    #[test]
    fn session_staleness_uses_wrapping_distance() {
        // The sequence wraps 253, 254, 255, 0, 1, ...: 250 precedes 0, so it's
        // stale relative to an oldest-used of 0; 0 does not precede 250.
        assert!(session_is_stale(250, 0));
        assert!(!session_is_stale(0, 250));
        assert!(!session_is_stale(5, 5));
    }
}
