use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use widget_core::{Message, WidgetConfig};

use crate::error::{GatewayError, Result};
use crate::extract::parse_reply_body;
use crate::protocol::ChatPayload;
use crate::resolver::ConfigResolver;

/// Wall-clock limit on one request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send the conversation and return the assistant's reply text.
    ///
    /// # Arguments
    /// * `history` - The full ordered conversation
    /// * `cancel` - Optional external cancellation; takes precedence over the timeout
    async fn send(&self, history: &[Message], cancel: Option<&CancellationToken>)
        -> Result<String>;
}

/// Gateway that POSTs the conversation to the resolved chat endpoint.
///
/// The endpoint is resolved on first use and never re-evaluated. Each call
/// issues exactly one request; nothing is retried.
pub struct HttpGateway {
    client: Client,
    resolver: ConfigResolver,
    config: OnceCell<Option<WidgetConfig>>,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(resolver: ConfigResolver) -> Self {
        Self {
            client: Client::new(),
            resolver,
            config: OnceCell::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Session configuration, resolving the endpoint on first call.
    pub fn config(&self) -> Option<&WidgetConfig> {
        self.config
            .get_or_init(|| match self.resolver.resolve() {
                Some(endpoint) => {
                    log::info!(
                        "Chat API endpoint resolved from {}: {}",
                        endpoint.source,
                        endpoint.url
                    );
                    Some(WidgetConfig::new(endpoint.url))
                }
                None => {
                    log::warn!("Chat API URL is not configured in any source");
                    None
                }
            })
            .as_ref()
    }

    async fn post(&self, config: &WidgetConfig, payload: &ChatPayload) -> Result<String> {
        let response = self
            .client
            .post(&config.endpoint_url)
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::error!("Backend error (HTTP {}): {}", status, text);
            return Err(GatewayError::ServerError(status.as_u16()));
        }

        let body = response.bytes().await?;
        parse_reply_body(&body)
    }
}

async fn cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn send(
        &self,
        history: &[Message],
        cancel: Option<&CancellationToken>,
    ) -> Result<String> {
        let config = self.config().ok_or(GatewayError::ConfigMissing)?;
        let payload = ChatPayload::from_history(history, &config.language_tag);

        log::debug!(
            "Sending {} messages to {}",
            payload.chat_history.len(),
            config.endpoint_url
        );

        // Losing branches are dropped, which aborts the in-flight request.
        let result = tokio::select! {
            biased;
            _ = cancelled(cancel) => Err(GatewayError::Cancelled),
            _ = tokio::time::sleep(self.timeout) => Err(GatewayError::Timeout),
            result = self.post(config, &payload) => result,
        };

        if let Err(e) = &result {
            log::warn!("Chat API call failed [{}]: {}", e.kind(), e);
        }
        result
    }
}
