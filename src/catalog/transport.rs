use std::time::Duration;

/// Plain HTTP GET, the only request the launcher makes
pub trait HttpTransport: Send + Sync {
    /// Fetch the full response body, failing on network errors,
    /// timeouts and non-success statuses
    fn get(&self, url: &str, timeout: Duration) -> anyhow::Result<Vec<u8>>;
}

/// Blocking reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client
}

impl ReqwestTransport {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("romhack-launcher/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, timeout: Duration) -> anyhow::Result<Vec<u8>> {
        let response = self.client
            .get(url)
            .timeout(timeout)
            .send()?
            .error_for_status()?;

        Ok(response.bytes()?.to_vec())
    }
}
