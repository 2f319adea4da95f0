//! HTTP fetcher backed by a blocking `reqwest` client

use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use tracing::debug;

use crate::get_version;

use super::fetch::{Fetcher, LOCAL_PROXY_HOST};

/// Fetches subscription bodies over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(user_agent: Option<String>) -> Self {
        Self {
            user_agent: user_agent.unwrap_or_else(default_user_agent),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn client(&self, timeout: Option<Duration>, proxy_port: Option<u16>) -> Result<Client> {
        let mut builder = Client::builder().user_agent(self.user_agent.clone());

        builder = match proxy_port {
            Some(port) => {
                let proxy_url = format!("http://{}:{}", LOCAL_PROXY_HOST, port);
                let proxy = reqwest::Proxy::all(&proxy_url)
                    .with_context(|| format!("Invalid proxy URL: {}", proxy_url))?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        builder.build().context("Failed to build HTTP client")
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(
        &self,
        url: &str,
        timeout: Option<Duration>,
        proxy_port: Option<u16>,
    ) -> Result<String> {
        debug!("Fetching URL: {} (proxy port: {:?})", url, proxy_port);

        let response = self
            .client(timeout, proxy_port)?
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch URL: {}", url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP request failed with status {}: {}", status, url);
        }

        response
            .text()
            .with_context(|| format!("Failed to read response body from: {}", url))
    }
}

fn default_user_agent() -> String {
    format!("proxylink/{}", get_version())
}
