//! Reachability probe backed by reqwest.

use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{Client, redirect};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::utils::address_safety::is_public_ip;
use crate::utils::url_validator::{Probe, ProbeError, ProbeResponse};

pub const PROBE_USER_AGENT: &str = "URL-Shortener-Bot/1.0";

/// DNS resolver for the probe client that drops non-public addresses.
///
/// The validator already checked the host, but the client resolves again
/// when it connects; filtering here keeps a rebinding answer from reaching
/// an internal address between the two lookups.
struct PublicOnlyResolver;

impl Resolve for PublicOnlyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let addrs = tokio::net::lookup_host((name.as_str(), 0)).await?;
            let public: Vec<SocketAddr> = addrs.filter(|addr| is_public_ip(addr.ip())).collect();

            if public.is_empty() {
                return Err(Box::new(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("{} has no public addresses", name.as_str()),
                )) as Box<dyn std::error::Error + Send + Sync>);
            }

            Ok(Box::new(public.into_iter()) as Addrs)
        })
    }
}

/// Issues HEAD requests without following redirects.
///
/// Environment proxies are ignored: a proxy would resolve the host itself and
/// bypass [`PublicOnlyResolver`].
///
/// Redirects are handed back to [`crate::utils::url_validator::UrlValidator`],
/// which checks each hop before asking for the next one.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// Builds the probe client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(PROBE_USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(redirect::Policy::none())
            .no_proxy()
            .dns_resolver(Arc::new(PublicOnlyResolver))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn head(&self, url: &Url) -> Result<ProbeResponse, ProbeError> {
        let response = self
            .client
            .head(url.as_str())
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::Timeout
                } else {
                    ProbeError::Transport(e.to_string())
                }
            })?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        tracing::debug!(url = %url, status = response.status().as_u16(), "Probe answered");

        Ok(ProbeResponse {
            status: response.status().as_u16(),
            location,
        })
    }
}
