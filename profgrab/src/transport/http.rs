//! Blocking HTTP retrieval of remote profiles

use std::time::Duration;

use ureq::tls::{RootCerts, TlsConfig, TlsProvider};
use ureq::Agent;
use url::Url;

use crate::domain::FetchError;

/// Slack added on top of the fetch timeout while waiting for response headers.
pub const TRANSPORT_MARGIN: Duration = Duration::from_secs(5);

fn agent(timeout: Duration) -> Agent {
    let tls_config = TlsConfig::builder()
        .provider(TlsProvider::NativeTls)
        .root_certs(RootCerts::PlatformVerifier)
        .build();

    Agent::config_builder()
        .tls_config(tls_config)
        // Only the wait for the response is bounded; large bodies may take longer
        .timeout_recv_response(Some(timeout + TRANSPORT_MARGIN))
        .http_status_as_error(false)
        .build()
        .into()
}

/// GET `url` and return the response body.
///
/// # Errors
/// Returns [`FetchError::Http`] on transport failure and
/// [`FetchError::Status`] for any non-2xx response. Plain-text error bodies are
/// appended to the status message.
pub fn fetch_url(url: &Url, timeout: Duration) -> Result<Vec<u8>, FetchError> {
    let http_err = |source| FetchError::Http { url: url.to_string(), source: Box::new(source) };

    let mut response = agent(timeout).get(url.as_str()).call().map_err(http_err)?;

    let status = response.status();
    if !status.is_success() {
        let plain = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/plain"));
        let mut msg = status.to_string();
        if plain {
            if let Ok(body) = response.body_mut().read_to_string() {
                msg.push('\n');
                msg.push_str(body.trim_end());
            }
        }
        return Err(FetchError::Status(msg));
    }

    response.body_mut().with_config().limit(u64::MAX).read_to_vec().map_err(http_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_fetch_ok_returns_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/debug/pprof/heap");
            then.status(200).body(b"\x1f\x8bprofile");
        });

        let url = Url::parse(&server.url("/debug/pprof/heap")).unwrap();
        let body = fetch_url(&url, Duration::from_secs(5)).unwrap();

        mock.assert();
        assert_eq!(body, b"\x1f\x8bprofile");
    }

    #[test]
    fn test_non_success_status_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).header("content-type", "text/plain").body("no such profile\n");
        });

        let url = Url::parse(&server.url("/missing")).unwrap();
        let err = fetch_url(&url, Duration::from_secs(5)).unwrap_err();

        assert!(matches!(err, FetchError::Status(_)));
        assert_eq!(err.to_string(), "server response: 404 Not Found\nno such profile");
    }

    #[test]
    fn test_slow_response_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/debug/pprof/profile");
            then.status(200).delay(TRANSPORT_MARGIN + Duration::from_millis(1500)).body("late");
        });

        let url = Url::parse(&server.url("/debug/pprof/profile")).unwrap();
        let err = fetch_url(&url, Duration::ZERO).unwrap_err();

        assert!(matches!(err, FetchError::Http { .. }));
    }

    #[test]
    fn test_connection_refused_is_http_error() {
        let url = Url::parse("http://127.0.0.1:1/profile").unwrap();
        let err = fetch_url(&url, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, FetchError::Http { .. }));
    }
}
