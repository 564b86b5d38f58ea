use crate::collectors::CollectError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct IpLookup {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

impl IpLookup {
    /// Asks the lookup service for the WAN address of this box.
    pub async fn fetch(&self, client: &Client) -> Result<String, CollectError> {
        let http_err = |source| CollectError::Http {
            url: self.url.clone(),
            source,
        };
        let body = client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(http_err)?
            .text()
            .await
            .map_err(http_err)?;

        parse_ip_response(&body)
    }
}

pub fn parse_ip_response(body: &str) -> Result<String, CollectError> {
    let parsed: IpResponse = serde_json::from_str(body).map_err(|err| CollectError::Parse {
        what: "ip lookup response",
        detail: err.to_string(),
    })?;
    let ip = parsed.ip.trim();
    if ip.is_empty() {
        return Err(CollectError::Parse {
            what: "ip lookup response",
            detail: "empty ip field".to_string(),
        });
    }
    Ok(ip.to_string())
}
