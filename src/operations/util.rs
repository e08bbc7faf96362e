//! Pure host and path string helpers.
//!
//! Nothing in here touches the tree: these are the boundary utilities the
//! lookup path and client-IP resolver implementations share.

use ipnetwork::{IpNetwork, IpNetworkError};
use std::borrow::Cow;
use std::net::IpAddr;

/// Strips an optional `:port` suffix, IPv6 brackets and a trailing `.`
/// from a `Host` header value.
///
/// The port is only stripped when it is non-empty and all digits, and only
/// when the remainder cannot be a raw (unbracketed) IPv6 address.
///
/// # Examples
/// ```rust
/// use arbor::operations::util::strip_host_port;
///
/// assert_eq!(strip_host_port("example.com:8080"), "example.com");
/// assert_eq!(strip_host_port("example.com."), "example.com");
/// assert_eq!(strip_host_port("[::1]:8080"), "::1");
/// assert_eq!(strip_host_port("example.com:http"), "example.com:http");
/// ```
pub fn strip_host_port(hostport: &str) -> &str {
    if let Some(rest) = hostport.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &rest[..end],
            None => hostport,
        };
    }
    let mut host = hostport;
    if let Some(idx) = host.rfind(':') {
        let (head, port) = (&host[..idx], &host[idx + 1..]);
        if !head.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
            host = head;
        }
    }
    host.strip_suffix('.').unwrap_or(host)
}

/// Separates an IPv6 zone identifier (`%zone`) from the address. The zone
/// is empty when none is present.
///
/// # Examples
/// ```rust
/// use arbor::operations::util::split_host_zone;
///
/// assert_eq!(split_host_zone("fe80::1%eth0"), ("fe80::1", "eth0"));
/// assert_eq!(split_host_zone("::1"), ("::1", ""));
/// ```
pub fn split_host_zone(host: &str) -> (&str, &str) {
    match host.find('%') {
        Some(i) => (&host[..i], &host[i + 1..]),
        None => (host, ""),
    }
}

/// Parses a CIDR or a bare IP address. A bare IPv4 address becomes a `/32`
/// network, a bare IPv6 address a `/128` network.
pub fn parse_cidr(s: &str) -> Result<IpNetwork, IpNetworkError> {
    if s.contains('/') {
        return s.parse();
    }
    let ip: IpAddr = s
        .parse()
        .map_err(|_| IpNetworkError::InvalidAddr(s.to_string()))?;
    let prefix = match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    IpNetwork::new(ip, prefix)
}

/// Uppercases the two hex digits of every percent-encoded byte triplet.
///
/// Double-encoded sequences are left alone: the scan jumps over a whole
/// triplet at a time, so the `xx` in `%25xx` is literal text and never
/// rewritten. Returns the input unchanged (and unallocated) when it is
/// already normalized.
pub fn normalize_hex_uppercase(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut i = 0;
    while i + 2 < bytes.len() {
        if bytes[i] != b'%' || !bytes[i + 1].is_ascii_hexdigit() || !bytes[i + 2].is_ascii_hexdigit()
        {
            i += 1;
            continue;
        }
        let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
        if hi.is_ascii_lowercase() || lo.is_ascii_lowercase() {
            if out.is_empty() {
                out.reserve(s.len());
            }
            out.push_str(&s[copied..i]);
            out.push('%');
            out.push(hi.to_ascii_uppercase() as char);
            out.push(lo.to_ascii_uppercase() as char);
            copied = i + 3;
        }
        i += 3;
    }
    if out.is_empty() {
        return Cow::Borrowed(s);
    }
    out.push_str(&s[copied..]);
    Cow::Owned(out)
}

/// Byte-wise ASCII case-insensitive equality restricted to the characters
/// hostnames are made of. Letters fold A–Z↔a–z; digits, `-`, `_` and `.`
/// must match exactly; anything else compares unequal even to itself.
pub fn equal_ascii_ignore_case(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes().zip(b.bytes()).all(|(x, y)| {
            let (x, y) = (x.to_ascii_lowercase(), y.to_ascii_lowercase());
            x == y && matches!(x, b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.')
        })
}

/// Length in bytes of the longest common prefix of `a` and `b`, never
/// splitting a multibyte character.
pub(crate) fn common_prefix_len(a: &str, b: &str, ignore_ascii_case: bool) -> usize {
    let mut len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| {
            if ignore_ascii_case {
                x.eq_ignore_ascii_case(y)
            } else {
                x == y
            }
        })
        .count();
    while len > 0 && (!a.is_char_boundary(len) || !b.is_char_boundary(len)) {
        len -= 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_host_port() {
        assert_eq!(strip_host_port("example.com"), "example.com");
        assert_eq!(strip_host_port("example.com:80"), "example.com");
        assert_eq!(strip_host_port("example.com.:80"), "example.com");
        assert_eq!(strip_host_port("example.com."), "example.com");
        assert_eq!(strip_host_port("[::1]"), "::1");
        assert_eq!(strip_host_port("[fe80::1]:8443"), "fe80::1");
        // Not a digit port: left alone.
        assert_eq!(strip_host_port("example.com:"), "example.com:");
        assert_eq!(strip_host_port("example.com:x1"), "example.com:x1");
        // Raw IPv6 has more than one colon: nothing stripped.
        assert_eq!(strip_host_port("fe80::1"), "fe80::1");
    }

    #[test]
    fn test_split_host_zone() {
        assert_eq!(split_host_zone("fe80::1%eth0"), ("fe80::1", "eth0"));
        assert_eq!(split_host_zone("fe80::1%"), ("fe80::1", ""));
        assert_eq!(split_host_zone("10.0.0.1"), ("10.0.0.1", ""));
    }

    #[test]
    fn test_parse_cidr() {
        assert_eq!(parse_cidr("10.0.0.0/8").unwrap().prefix(), 8);
        assert_eq!(parse_cidr("10.1.2.3").unwrap().prefix(), 32);
        assert_eq!(parse_cidr("::1").unwrap().prefix(), 128);
        assert_eq!(parse_cidr("2001:db8::/32").unwrap().prefix(), 32);
        assert!(parse_cidr("not-an-ip").is_err());
        assert!(parse_cidr("10.0.0.0/40").is_err());
    }

    #[test]
    fn test_normalize_hex_uppercase() {
        // Already normalized: no allocation.
        assert!(matches!(
            normalize_hex_uppercase("/a%2Fb"),
            Cow::Borrowed("/a%2Fb")
        ));
        assert!(matches!(normalize_hex_uppercase("/plain"), Cow::Borrowed(_)));
        assert_eq!(normalize_hex_uppercase("/a%2fb"), "/a%2Fb");
        assert_eq!(normalize_hex_uppercase("%ff%AA%e2"), "%FF%AA%E2");
        // Double-encoded: the text after %25 is literal and stays as-is.
        assert_eq!(normalize_hex_uppercase("%252f"), "%252f");
        assert_eq!(normalize_hex_uppercase("%25%2f"), "%25%2F");
        // Incomplete triplets are not touched.
        assert_eq!(normalize_hex_uppercase("%2"), "%2");
        assert_eq!(normalize_hex_uppercase("100%"), "100%");
    }

    #[test]
    fn test_equal_ascii_ignore_case() {
        assert!(equal_ascii_ignore_case("API.Example.Com", "api.example.com"));
        assert!(equal_ascii_ignore_case("a-b_c.9", "A-B_C.9"));
        assert!(!equal_ascii_ignore_case("api", "apx"));
        assert!(!equal_ascii_ignore_case("api", "ap"));
        // Outside the hostname alphabet nothing compares equal.
        assert!(!equal_ascii_ignore_case("a b", "a b"));
    }

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len("/users/a", "/users/b", false), 7);
        assert_eq!(common_prefix_len("abc", "abc", false), 3);
        assert_eq!(common_prefix_len("API.x", "api.y", true), 4);
        assert_eq!(common_prefix_len("API.x", "api.y", false), 0);
        // Never splits a multibyte character.
        assert_eq!(common_prefix_len("/é1", "/é2", false), 3);
        assert_eq!(common_prefix_len("/é", "/è", false), 1);
    }
}
