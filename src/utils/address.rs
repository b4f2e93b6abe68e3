//! RFC1918 address classification on IPv4 string literals.
//!
//! Deliberately a prefix test on the literal, not a CIDR parse: IPv6 and
//! malformed input simply classify as public.

/// Returns true when `ip` is inside 10.0.0.0/8, 192.168.0.0/16 or 172.16.0.0/12.
pub fn is_private(ip: &str) -> bool {
    if ip.starts_with("10.") || ip.starts_with("192.168.") {
        return true;
    }

    if let Some(rest) = ip.strip_prefix("172.") {
        let second = rest.split('.').next().unwrap_or_default();
        return matches!(second.parse::<u32>(), Ok(octet) if (16..=31).contains(&octet));
    }

    false
}
