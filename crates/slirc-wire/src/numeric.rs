//! Numeric replies consumed by the console.
//!
//! Only the numerics the engine dispatches on are named here; everything
//! else flows through as an uninterpreted command token.

/// 001 — registration completed.
pub const RPL_WELCOME: u16 = 1;

/// 311 — WHOIS user line.
pub const RPL_WHOISUSER: u16 = 311;
/// 312 — WHOIS server line.
pub const RPL_WHOISSERVER: u16 = 312;
/// 317 — WHOIS idle time.
pub const RPL_WHOISIDLE: u16 = 317;
/// 318 — end of WHOIS; flushes the accumulator.
pub const RPL_ENDOFWHOIS: u16 = 318;
/// 319 — WHOIS channel list.
pub const RPL_WHOISCHANNELS: u16 = 319;

/// 322 — LIST row: channel, user count, topic.
pub const RPL_LIST: u16 = 322;
/// 353 — NAMES row: membership with privilege prefixes.
pub const RPL_NAMREPLY: u16 = 353;

/// WHOIS detail numerics accumulated between query and terminator: the
/// RFC core (311/312/317/319) plus the common extensions for secure
/// connection (671), account (330), actual host (338), special whois
/// (320), and MOTD-style info (378).
const WHOIS_DETAILS: &[u16] = &[311, 312, 317, 319, 320, 330, 338, 378, 671];

/// Whether `code` is a WHOIS reply fragment (not the terminator).
pub fn is_whois_detail(code: u16) -> bool {
    WHOIS_DETAILS.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whois_details() {
        assert!(is_whois_detail(RPL_WHOISUSER));
        assert!(is_whois_detail(671));
        assert!(!is_whois_detail(RPL_ENDOFWHOIS));
        assert!(!is_whois_detail(RPL_LIST));
    }
}
