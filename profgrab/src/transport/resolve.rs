//! Source string to fetch URL resolution
//!
//! A source is either a URL or a local path. Strings like `host:8080/path`
//! parse as an opaque URL with scheme `host`, so they get a second chance with
//! an `http://` prefix before falling back to "local path".

use std::collections::BTreeMap;
use std::time::Duration;

use url::Url;

/// Timeout used when neither a timeout nor a duration is requested.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A source that should be fetched over the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: Url,
    /// Requested duration, possibly derived from the `seconds` parameter.
    pub duration: Duration,
    pub timeout: Duration,
}

/// Resolve `source` into a fetch URL.
///
/// A positive `duration` overrides the URL's `seconds` parameter; otherwise an
/// existing `seconds` parameter supplies the duration. A zero `timeout` becomes
/// 1.5 × duration, or [`DEFAULT_TIMEOUT`] when there is no duration either.
///
/// Returns `None` when `source` has no host, i.e. it names a local file.
#[must_use]
pub fn adjust_url(source: &str, duration: Duration, timeout: Duration) -> Option<ResolvedUrl> {
    let parsed = if has_scheme(source) {
        Url::parse(source).ok().filter(|u| host(u).is_some() || u.scheme() == "file")
    } else if first_segment_has_colon(source) {
        // `127.0.0.1:8080/path`: not a valid relative reference either
        None
    } else {
        return None;
    };

    let mut url = match parsed {
        Some(u) => u,
        None if plausible_authority(source) => Url::parse(&format!("http://{source}")).ok()?,
        None => return None,
    };
    host(&url)?;

    let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (k, v) in url.query_pairs() {
        values.entry(k.into_owned()).or_default().push(v.into_owned());
    }

    let mut duration = duration;
    if duration > Duration::ZERO {
        values.insert("seconds".to_string(), vec![duration.as_secs().to_string()]);
    } else if let Some(secs) = values
        .get("seconds")
        .and_then(|v| v.first())
        .and_then(|s| s.parse::<i32>().ok())
        .and_then(|s| u64::try_from(s).ok())
    {
        duration = Duration::from_secs(secs);
    }

    let timeout = if timeout > Duration::ZERO {
        timeout
    } else if duration > Duration::ZERO {
        duration + duration / 2
    } else {
        DEFAULT_TIMEOUT
    };

    if values.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut()
            .clear()
            .extend_pairs(values.iter().flat_map(|(k, vs)| vs.iter().map(move |v| (k, v))));
    }

    Some(ResolvedUrl { url, duration, timeout })
}

fn host(url: &Url) -> Option<&str> {
    url.host_str().filter(|h| !h.is_empty())
}

/// `scheme ":"` with `scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
fn has_scheme(s: &str) -> bool {
    let Some((scheme, _)) = s.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Whether `s` would have a usable authority once `http://` is prefixed: no
/// backslashes, and a port, if any, made of digits. Rejects drive-letter
/// paths like `C:\profiles\cpu.pb.gz`, which `url` would otherwise accept.
fn plausible_authority(s: &str) -> bool {
    let authority = s.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.contains('\\') {
        return false;
    }
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    if host_port.ends_with(']') {
        return true;
    }
    match host_port.rsplit_once(':') {
        Some((_, port)) => !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    }
}

fn first_segment_has_colon(s: &str) -> bool {
    s.split('/').next().is_some_and(|segment| segment.contains(':'))
}
