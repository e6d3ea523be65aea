use std::sync::Arc;
use std::time::Duration;

use hyper::body::{Bytes, to_bytes};
use hyper::client::HttpConnector;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use tokio::time::timeout;
use tracing::debug;
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{AdapterError, AdapterResult};

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

pub(crate) const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/";

#[allow(clippy::unnecessary_wraps)]
pub(crate) fn build_https_client() -> AdapterResult<HyperClient> {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    let connector = HttpsConnector::from((http, Arc::new(config)));

    Ok(Client::builder().build::<_, Body>(connector))
}

/// Posts a JSON body with bearer auth and returns the successful response body.
pub(crate) async fn post_json(
    client: &HyperClient,
    endpoint: &Uri,
    api_key: &str,
    body: Vec<u8>,
    deadline: Duration,
) -> AdapterResult<Bytes> {
    let request = Request::post(endpoint.clone())
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {api_key}"))
        .body(Body::from(body))
        .map_err(|err| AdapterError::transport(format!("failed to build request: {err}")))?;

    let response = timeout(deadline, client.request(request))
        .await
        .map_err(|_| AdapterError::transport(format!("request to {endpoint} timed out")))?
        .map_err(|err| AdapterError::transport(format!("request to {endpoint} failed: {err}")))?;

    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let bytes = to_bytes(response.into_body())
        .await
        .map_err(|err| AdapterError::transport(format!("failed to read response: {err}")))?;

    debug!(%endpoint, %status, bytes = bytes.len(), "provider responded");

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AdapterError::RateLimited { retry_after });
    }

    if !status.is_success() {
        let reason = String::from_utf8_lossy(&bytes).to_string();
        return Err(AdapterError::Response {
            reason: format!("provider returned {status}: {reason}"),
        });
    }

    Ok(bytes)
}

pub(crate) fn sanitize_base_url(input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(
            "base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid base URL: {err}")))?;
    Ok(base)
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> AdapterResult<Uri> {
    format!("{base_url}{path}")
        .parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid endpoint `{path}`: {err}")))
}
