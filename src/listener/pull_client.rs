//! HTTP poll source for the pull fallback

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chime_core::{PullSource, TransportError};
use chime_types::{Delivery, DeliveryId, PullResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpPullClient {
    client: reqwest::Client,
    url: String,
    /// Ids for servers that only send bare `amounts`
    local_seq: AtomicU64,
}

impl HttpPullClient {
    pub fn new(server_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/api/check-amounts", server_url.trim_end_matches('/')),
            local_seq: AtomicU64::new(0),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn deliveries(&self, body: PullResponse) -> Vec<Delivery> {
        if body.deliveries.len() == body.amounts.len() {
            return body.deliveries;
        }
        // boot 0 never collides with a server-assigned id
        body.amounts
            .into_iter()
            .map(|amount| Delivery {
                id: DeliveryId::new(0, self.local_seq.fetch_add(1, Ordering::Relaxed) + 1),
                amount,
            })
            .collect()
    }
}

impl PullSource for HttpPullClient {
    async fn fetch(&self) -> Result<Vec<Delivery>, TransportError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body: PullResponse = response.json().await.map_err(|e| TransportError::Decode {
            reason: e.to_string(),
        })?;
        Ok(self.deliveries(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_built_from_base() {
        let client = HttpPullClient::new("http://127.0.0.1:3000/");
        assert_eq!(client.url(), "http://127.0.0.1:3000/api/check-amounts");
    }

    #[test]
    fn bare_amounts_get_local_ids() {
        let client = HttpPullClient::new("http://localhost:3000");
        let body: PullResponse = serde_json::from_str(r#"{"amounts":[456.78,5]}"#).unwrap();
        let deliveries = client.deliveries(body);
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].id, DeliveryId::new(0, 1));
        assert_eq!(deliveries[1].amount, 5.0);

        let body: PullResponse = serde_json::from_str(r#"{"amounts":[1]}"#).unwrap();
        assert_eq!(client.deliveries(body)[0].id, DeliveryId::new(0, 3));
    }

    #[test]
    fn server_ids_are_kept() {
        let client = HttpPullClient::new("http://localhost:3000");
        let delivery = Delivery {
            id: DeliveryId::new(77, 4),
            amount: 12.0,
        };
        let body = PullResponse::from_deliveries(vec![delivery]);
        assert_eq!(client.deliveries(body), vec![delivery]);
    }
}
