//! HTTP adapters for the reachability probe and the device registry.
//!
//! Blocking calls with no request timeout: a slow endpoint delays the
//! caller's loop instead of failing it.

use log::{debug, warn};
use reqwest::blocking::Client;

use crate::app::ports::{DeviceRegistry, ProbeOutcome, ReachabilityProbe};

/// Shared client with the timeout disabled.
pub fn client() -> reqwest::Result<Client> {
    Client::builder().timeout(None).build()
}

/// `GET url`; any response at all counts as reachable.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl ReachabilityProbe for HttpProbe {
    fn probe(&self) -> ProbeOutcome {
        match self.client.get(&self.url).send() {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response
                    .text()
                    .inspect_err(|e| warn!("Cannot fetch HTTP response body. Error: {e}"))
                    .ok();
                ProbeOutcome::Responded { status, body }
            }
            Err(e) => ProbeOutcome::Unreachable(e.to_string()),
        }
    }
}

/// Device lookup against the metadata service:
/// `GET {base}/api/v2/device/name/{name}`.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: Client,
    base_url: String,
}

impl HttpRegistry {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn device_url(&self, device_name: &str) -> String {
        format!(
            "{}/api/v2/device/name/{}",
            self.base_url.trim_end_matches('/'),
            device_name
        )
    }
}

impl DeviceRegistry for HttpRegistry {
    fn contains(&self, device_name: &str) -> bool {
        let url = self.device_url(device_name);
        match self.client.get(&url).send() {
            Ok(response) => {
                debug!("Registry lookup {url}: {}", response.status());
                response.status().is_success()
            }
            Err(e) => {
                warn!("Registry lookup {url} failed: {e}");
                false
            }
        }
    }
}
