/// Turns an `Alt-Svc` header value into a human-readable QUIC support
/// string.
///
/// The header is a semicolon-separated attribute list whose first
/// segment is itself a comma-separated list of service tokens. A
/// `quic="host:port"` token advertises a QUIC endpoint and a `v="..."`
/// attribute lists the supported versions. Repeated tokens overwrite
/// earlier ones. Malformed input never fails, it just degrades to
/// whatever tokens still parse.
pub fn parse_alt_svc(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let mut location = None;
    let mut versions = None;

    let segments: Vec<&str> = value.split(';').collect();
    if let Some(first) = segments.first() {
        for token in first.split(',') {
            if let Some(loc) = strip_quoted(token.trim(), "quic=") {
                location = Some(loc);
            }
        }
    }
    for segment in &segments {
        if let Some(v) = strip_quoted(segment.trim(), "v=") {
            versions = Some(v);
        }
    }

    match (location, versions) {
        (None, _) => String::from("No"),
        (Some(loc), None) => format!("Yes, at {loc}"),
        (Some(loc), Some(v)) => format!("Yes, at {loc} with versions: {v}"),
    }
}

fn strip_quoted<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = token.strip_prefix(prefix)?;
    let rest = rest.strip_prefix('"').unwrap_or(rest);
    Some(rest.strip_suffix('"').unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_header_means_no_advertisement() {
        assert_eq!(parse_alt_svc(""), "");
    }

    #[test]
    fn location_only() {
        assert_eq!(
            parse_alt_svc("quic=\"example.com:443\""),
            "Yes, at example.com:443"
        );
    }

    #[test]
    fn location_with_versions() {
        assert_eq!(
            parse_alt_svc("quic=\"example.com:443\"; v=\"46,43\""),
            "Yes, at example.com:443 with versions: 46,43"
        );
    }

    #[test]
    fn non_quic_service_token() {
        assert_eq!(parse_alt_svc("h3=\":443\""), "No");
    }

    #[test]
    fn last_quic_token_wins() {
        assert_eq!(
            parse_alt_svc("quic=\"a.example:443\",quic=\"b.example:443\""),
            "Yes, at b.example:443"
        );
    }

    #[test]
    fn versions_found_in_any_segment() {
        assert_eq!(
            parse_alt_svc("quic=\":443\"; ma=2592000; v=\"44,43,39\""),
            "Yes, at :443 with versions: 44,43,39"
        );
    }

    #[test]
    fn malformed_input_degrades_instead_of_failing() {
        assert_eq!(parse_alt_svc(";;;"), "No");
        assert_eq!(parse_alt_svc("quic=\"unterminated:443"), "Yes, at unterminated:443");
        assert_eq!(parse_alt_svc("garbage, more garbage"), "No");
    }
}
