use crate::stream::Envelope;

/// Encodings the server is able to produce, in preference order.
pub const SUPPORTED_ENCODINGS: [&str; 3] = ["gzip", "deflate", "identity"];

/// The content encoding chosen for a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EncodingDecision {
    /// Gzip compression.
    Gzip,
    /// Deflate (zlib-wrapped) compression.
    Deflate,
    /// The client asked for the body unencoded.
    Identity,
    /// No acceptable encoding overlapped the supported set.
    #[default]
    None,
}

impl EncodingDecision {
    /// Returns the Content-Encoding header value for this decision, if any.
    pub fn content_encoding(&self) -> Option<&'static str> {
        match self {
            EncodingDecision::Gzip => Some("gzip"),
            EncodingDecision::Deflate => Some("deflate"),
            EncodingDecision::Identity => Some("identity"),
            EncodingDecision::None => None,
        }
    }

    /// Returns true if this decision calls for running the codec.
    pub fn compresses(&self) -> bool {
        matches!(self, EncodingDecision::Gzip | EncodingDecision::Deflate)
    }

    /// Returns the envelope the codec should produce.
    pub(crate) fn envelope(&self) -> Option<Envelope> {
        match self {
            EncodingDecision::Gzip => Some(Envelope::Gzip),
            EncodingDecision::Deflate => Some(Envelope::Zlib),
            EncodingDecision::Identity | EncodingDecision::None => None,
        }
    }

    /// Parses an Accept-Encoding header and negotiates against the supported set.
    ///
    /// ```
    /// use http_payload_compression::EncodingDecision;
    ///
    /// assert_eq!(
    ///     EncodingDecision::from_accept_encoding("deflate;q=0.5, gzip"),
    ///     EncodingDecision::Gzip
    /// );
    /// ```
    pub fn from_accept_encoding(header: &str) -> EncodingDecision {
        let entries = parse_entries(header);
        // Refused codings still count as listed, so `*` never selects them.
        let listed: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
        let acceptable: Vec<&str> = entries
            .iter()
            .filter(|(_, quality)| *quality > 0.0)
            .map(|(name, _)| name.as_str())
            .collect();
        negotiate_listed(&acceptable, &SUPPORTED_ENCODINGS, &listed)
    }
}

/// Picks an encoding from the client's acceptable list.
///
/// The first entry (in the client's order) that the server supports wins.
/// Choosing `identity`, or finding no overlap at all, yields
/// [`EncodingDecision::None`]. A `*` entry matches the first server-supported
/// encoding the client did not name explicitly, which prefers gzip.
pub fn negotiate<S: AsRef<str>>(client: &[S], server: &[&str]) -> EncodingDecision {
    negotiate_listed(client, server, client)
}

fn negotiate_listed<S, L>(client: &[S], server: &[&str], listed: &[L]) -> EncodingDecision
where
    S: AsRef<str>,
    L: AsRef<str>,
{
    let supports = |name: &str| server.iter().any(|s| s.eq_ignore_ascii_case(name));
    let is_listed = |name: &str| {
        listed
            .iter()
            .any(|l| canonical_name(l.as_ref().trim()).eq_ignore_ascii_case(name))
    };

    for entry in client {
        let name = canonical_name(entry.as_ref().trim());
        let chosen = if name == "*" {
            server.iter().copied().find(|s| !is_listed(*s))
        } else if supports(name) {
            Some(name)
        } else {
            None
        };

        if let Some(chosen) = chosen {
            return match chosen.to_ascii_lowercase().as_str() {
                "gzip" => EncodingDecision::Gzip,
                "deflate" => EncodingDecision::Deflate,
                _ => EncodingDecision::None,
            };
        }
    }

    EncodingDecision::None
}

/// Parses an Accept-Encoding header into codings ordered by preference.
///
/// The header value is expected to be comma-separated encodings with optional
/// quality values (e.g., "gzip, deflate;q=0.8"). Entries with `q=0` are
/// dropped, higher quality sorts first, and equal qualities keep the client's
/// order.
pub fn parse_accept_encoding(header: &str) -> Vec<String> {
    parse_entries(header)
        .into_iter()
        .filter(|(_, quality)| *quality > 0.0)
        .map(|(encoding, _)| encoding)
        .collect()
}

/// Every named coding with its quality, refused ones included.
fn parse_entries(header: &str) -> Vec<(String, f32)> {
    let mut entries: Vec<(String, f32)> = header
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_encoding_with_quality)
        .filter(|(encoding, _)| !encoding.is_empty())
        .map(|(encoding, quality)| (encoding.to_ascii_lowercase(), quality))
        .collect();

    // Stable, so equal qualities stay in client order.
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    entries
}

fn canonical_name(name: &str) -> &str {
    if name.eq_ignore_ascii_case("x-gzip") {
        "gzip"
    } else {
        name
    }
}

/// Parses an encoding entry like "gzip" or "deflate;q=0.8" into (encoding, quality).
fn parse_encoding_with_quality(s: &str) -> (&str, f32) {
    let mut parts = s.splitn(2, ';');
    let encoding = parts.next().unwrap_or("").trim();

    let quality = parts
        .next()
        .and_then(|q| {
            let q = q.trim();
            if q.starts_with("q=") || q.starts_with("Q=") {
                q[2..].trim().parse::<f32>().ok()
            } else {
                None
            }
        })
        .unwrap_or(1.0);

    (encoding, quality)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_encoding() {
        assert_eq!(EncodingDecision::Gzip.content_encoding(), Some("gzip"));
        assert_eq!(EncodingDecision::Deflate.content_encoding(), Some("deflate"));
        assert_eq!(EncodingDecision::Identity.content_encoding(), Some("identity"));
        assert_eq!(EncodingDecision::None.content_encoding(), None);
    }

    #[test]
    fn test_negotiate_first_listed_wins() {
        assert_eq!(
            negotiate(&["gzip", "deflate"], &SUPPORTED_ENCODINGS),
            EncodingDecision::Gzip
        );
        assert_eq!(
            negotiate(&["deflate", "gzip"], &SUPPORTED_ENCODINGS),
            EncodingDecision::Deflate
        );
    }

    #[test]
    fn test_negotiate_identity_is_none() {
        assert_eq!(
            negotiate(&["identity"], &SUPPORTED_ENCODINGS),
            EncodingDecision::None
        );
        assert_eq!(
            negotiate(&["identity", "gzip"], &SUPPORTED_ENCODINGS),
            EncodingDecision::None
        );
    }

    #[test]
    fn test_negotiate_no_overlap() {
        let empty: [&str; 0] = [];
        assert_eq!(negotiate(&empty, &SUPPORTED_ENCODINGS), EncodingDecision::None);
        assert_eq!(
            negotiate(&["br", "zstd"], &SUPPORTED_ENCODINGS),
            EncodingDecision::None
        );
    }

    #[test]
    fn test_negotiate_skips_unsupported_entries() {
        assert_eq!(
            negotiate(&["br", "deflate"], &SUPPORTED_ENCODINGS),
            EncodingDecision::Deflate
        );
    }

    #[test]
    fn test_negotiate_respects_server_set() {
        assert_eq!(
            negotiate(&["gzip", "deflate"], &["deflate", "identity"]),
            EncodingDecision::Deflate
        );
    }

    #[test]
    fn test_negotiate_wildcard_prefers_gzip() {
        assert_eq!(negotiate(&["*"], &SUPPORTED_ENCODINGS), EncodingDecision::Gzip);
        assert_eq!(
            negotiate(&["br", "*"], &["deflate", "identity"]),
            EncodingDecision::Deflate
        );
    }

    #[test]
    fn test_negotiate_x_gzip_alias() {
        assert_eq!(
            negotiate(&["x-gzip"], &SUPPORTED_ENCODINGS),
            EncodingDecision::Gzip
        );
    }

    #[test]
    fn test_parse_orders_by_quality() {
        assert_eq!(
            parse_accept_encoding("deflate;q=0.5, gzip;q=1.0, br;q=0.8"),
            vec!["gzip", "br", "deflate"]
        );
    }

    #[test]
    fn test_parse_keeps_client_order_on_ties() {
        assert_eq!(parse_accept_encoding("gzip, deflate"), vec!["gzip", "deflate"]);
        assert_eq!(parse_accept_encoding("deflate, gzip"), vec!["deflate", "gzip"]);
    }

    #[test]
    fn test_parse_drops_quality_zero() {
        assert_eq!(parse_accept_encoding("gzip;q=0, deflate"), vec!["deflate"]);
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        assert_eq!(
            parse_accept_encoding(" GZIP ;Q=0.9 ,, Deflate"),
            vec!["deflate", "gzip"]
        );
    }

    #[test]
    fn test_from_accept_encoding() {
        assert_eq!(
            EncodingDecision::from_accept_encoding("gzip, deflate"),
            EncodingDecision::Gzip
        );
        assert_eq!(
            EncodingDecision::from_accept_encoding("deflate"),
            EncodingDecision::Deflate
        );
        assert_eq!(
            EncodingDecision::from_accept_encoding("identity"),
            EncodingDecision::None
        );
        assert_eq!(
            EncodingDecision::from_accept_encoding("gzip;q=0"),
            EncodingDecision::None
        );
        assert_eq!(EncodingDecision::from_accept_encoding(""), EncodingDecision::None);
    }

    #[test]
    fn test_wildcard_skips_refused_codings() {
        assert_eq!(
            EncodingDecision::from_accept_encoding("gzip;q=0, *"),
            EncodingDecision::Deflate
        );
        assert_eq!(
            EncodingDecision::from_accept_encoding("x-gzip;q=0, *"),
            EncodingDecision::Deflate
        );
        assert_eq!(
            EncodingDecision::from_accept_encoding("gzip;q=0, deflate;q=0, *"),
            EncodingDecision::None
        );
    }

    #[test]
    fn test_wildcard_skips_codings_listed_with_lower_quality() {
        assert_eq!(
            EncodingDecision::from_accept_encoding("gzip;q=0.5, *"),
            EncodingDecision::Deflate
        );
    }
}
