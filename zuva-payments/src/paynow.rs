use async_trait::async_trait;
use sha2::{Digest, Sha512};
use std::collections::HashMap;
use std::time::Duration;

use zuva_core::payment::{
    charged_amount, InitiateOutcome, PaymentError, PaymentRequest, ProviderAdapter,
};

/// Merchant integration settings for the Paynow mobile-money gateway.
#[derive(Debug, Clone)]
pub struct PaynowConfig {
    pub integration_id: String,
    pub integration_key: String,
    pub initiate_url: String,
    pub result_url: String,
    pub timeout_ms: u64,
}

/// Mobile-money adapter. Initiation posts a signed form to the gateway and
/// gets back a browser redirect URL plus an opaque poll URL; settlement is
/// later observed by polling that URL.
pub struct PaynowAdapter {
    http: reqwest::Client,
    config: PaynowConfig,
}

impl PaynowAdapter {
    pub fn new(config: PaynowConfig) -> Result<Self, PaymentError> {
        let timeout_ms = if config.timeout_ms > 0 {
            config.timeout_ms
        } else {
            15_000
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| PaymentError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Form fields in gateway submission order. The hash is computed over
    /// the values in this exact order, so it must stay stable.
    fn build_fields(&self, request: &PaymentRequest) -> Vec<(String, String)> {
        let amount = charged_amount(request);
        let additional_info = match &request.items {
            Some(items) if !items.is_empty() => items
                .iter()
                .map(|item| item.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            _ => request.description.clone().unwrap_or_default(),
        };

        vec![
            ("id".to_string(), self.config.integration_id.clone()),
            ("reference".to_string(), request.reference.clone()),
            ("amount".to_string(), format!("{:.2}", amount)),
            ("additionalinfo".to_string(), additional_info),
            (
                "returnurl".to_string(),
                request.return_url.clone().unwrap_or_default(),
            ),
            ("resulturl".to_string(), self.config.result_url.clone()),
            ("authemail".to_string(), request.email.clone()),
            (
                "phone".to_string(),
                request.phone.clone().unwrap_or_default(),
            ),
            ("status".to_string(), "Message".to_string()),
        ]
    }
}

/// SHA-512 of the concatenated field values plus the integration key,
/// uppercase hex, as the gateway verifies it.
fn request_hash(fields: &[(String, String)], integration_key: &str) -> String {
    let mut hasher = Sha512::new();
    for (_, value) in fields {
        hasher.update(value.as_bytes());
    }
    hasher.update(integration_key.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02X}", byte))
        .collect()
}

/// Gateway replies are form-urlencoded key/value pairs.
fn parse_reply(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .map(|(key, value)| (key.to_ascii_lowercase(), value))
        .collect()
}

#[async_trait]
impl ProviderAdapter for PaynowAdapter {
    async fn initiate(&self, request: &PaymentRequest) -> Result<InitiateOutcome, PaymentError> {
        let mut fields = self.build_fields(request);
        let hash = request_hash(&fields, &self.config.integration_key);
        fields.push(("hash".to_string(), hash));

        let response = self
            .http
            .post(&self.config.initiate_url)
            .form(&fields)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;
        let reply = parse_reply(&body);

        match reply.get("status").map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("ok") => {
                let redirect_url = reply
                    .get("browserurl")
                    .cloned()
                    .ok_or_else(|| PaymentError::Provider("reply missing browserurl".to_string()))?;
                let poll_url = reply
                    .get("pollurl")
                    .cloned()
                    .ok_or_else(|| PaymentError::Provider("reply missing pollurl".to_string()))?;
                tracing::info!(reference = %request.reference, "mobile money payment initiated");
                Ok(InitiateOutcome::MobileMoney {
                    redirect_url,
                    poll_url,
                })
            }
            Some("error") => {
                let error = reply
                    .get("error")
                    .cloned()
                    .unwrap_or_else(|| "payment declined by gateway".to_string());
                tracing::warn!(reference = %request.reference, "gateway declined payment: {}", error);
                Ok(InitiateOutcome::Declined { error })
            }
            other => Err(PaymentError::Provider(format!(
                "unexpected gateway status: {:?}",
                other
            ))),
        }
    }

    async fn poll_status(&self, poll_url: &str) -> Result<String, PaymentError> {
        let response = self
            .http
            .get(poll_url)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;
        let reply = parse_reply(&body);

        reply
            .get("status")
            .cloned()
            .ok_or_else(|| PaymentError::Provider("poll reply missing status".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zuva_core::payment::LineItem;

    fn request() -> PaymentRequest {
        PaymentRequest {
            amount: 150.0,
            reference: "BK-2026-0001".to_string(),
            email: "guest@example.com".to_string(),
            phone: Some("0771234567".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn hash_is_uppercase_hex_and_deterministic() {
        let fields = vec![
            ("id".to_string(), "3001".to_string()),
            ("reference".to_string(), "BK-1".to_string()),
        ];
        let first = request_hash(&fields, "secret");
        let second = request_hash(&fields, "secret");
        assert_eq!(first, second);
        assert_eq!(first.len(), 128);
        assert!(first.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        // Different key, different signature.
        assert_ne!(first, request_hash(&fields, "other"));
    }

    #[test]
    fn items_drive_the_submitted_amount_and_description() {
        let config = PaynowConfig {
            integration_id: "3001".to_string(),
            integration_key: "key".to_string(),
            initiate_url: "https://example.test/initiate".to_string(),
            result_url: "https://merchant.test/result".to_string(),
            timeout_ms: 1000,
        };
        let adapter = PaynowAdapter::new(config).unwrap();

        let mut req = request();
        req.items = Some(vec![
            LineItem { name: "Lodge".to_string(), amount: 120.0 },
            LineItem { name: "Game drive".to_string(), amount: 35.5 },
        ]);
        let fields = adapter.build_fields(&req);
        let amount = fields.iter().find(|(k, _)| k == "amount").unwrap();
        assert_eq!(amount.1, "155.50");
        let info = fields.iter().find(|(k, _)| k == "additionalinfo").unwrap();
        assert_eq!(info.1, "Lodge, Game drive");
    }

    #[test]
    fn fields_format_amount_to_cents() {
        let config = PaynowConfig {
            integration_id: "3001".to_string(),
            integration_key: "key".to_string(),
            initiate_url: "https://example.test/initiate".to_string(),
            result_url: "https://merchant.test/result".to_string(),
            timeout_ms: 1000,
        };
        let adapter = PaynowAdapter::new(config).unwrap();
        let fields = adapter.build_fields(&request());
        let amount = fields.iter().find(|(k, _)| k == "amount").unwrap();
        assert_eq!(amount.1, "150.00");
    }

    #[test]
    fn parses_ok_reply() {
        let reply = parse_reply(
            "Status=Ok&BrowserUrl=https%3A%2F%2Fgw.test%2Fpay%2F1&PollUrl=https%3A%2F%2Fgw.test%2Fpoll%2F1&Hash=ABC",
        );
        assert_eq!(reply.get("status").map(String::as_str), Some("Ok"));
        assert_eq!(
            reply.get("pollurl").map(String::as_str),
            Some("https://gw.test/poll/1")
        );
    }

    #[test]
    fn parses_error_reply() {
        let reply = parse_reply("Status=Error&Error=Insufficient+balance");
        assert_eq!(reply.get("status").map(String::as_str), Some("Error"));
        assert_eq!(
            reply.get("error").map(String::as_str),
            Some("Insufficient balance")
        );
    }
}
