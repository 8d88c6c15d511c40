//! Outgoing messages through the WhatsApp HTTP gateway.
//!
//! The gateway exposes one endpoint per session:
//!
//! ```text
//! POST {base_url}/api/{session}/send-message
//! { "phone": "5511999990000", "isGroup": false, "message": "..." }
//! ```

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use pelada_core::models::player::PhoneNumber;

use crate::config::GatewayConfig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    #[error("Gateway call timed out")]
    Timeout,

    #[error("Gateway unreachable: {0}")]
    Transport(String),

    #[error("Gateway rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl MessagingError {
    /// Worth one more attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            MessagingError::Timeout | MessagingError::Transport(_) => true,
            MessagingError::Rejected { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
        }
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_individual(&self, phone: &PhoneNumber, text: &str) -> Result<(), MessagingError>;

    async fn send_to_group(&self, group_chat_id: &str, text: &str) -> Result<(), MessagingError>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    phone: &'a str,
    #[serde(rename = "isGroup")]
    is_group: bool,
    message: &'a str,
}

#[derive(Clone)]
pub struct GatewayMessenger {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayMessenger {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn send_url(&self) -> String {
        format!(
            "{}/api/{}/send-message",
            self.config.base_url,
            urlencoding::encode(&self.config.session)
        )
    }

    async fn post(&self, request: &SendMessageRequest<'_>) -> Result<(), MessagingError> {
        let mut builder = self.client.post(self.send_url()).json(request);
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                MessagingError::Timeout
            } else {
                MessagingError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessagingError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(recipient = request.phone, is_group = request.is_group, "Message accepted by gateway");
        Ok(())
    }
}

#[async_trait]
impl Messenger for GatewayMessenger {
    async fn send_individual(&self, phone: &PhoneNumber, text: &str) -> Result<(), MessagingError> {
        self.post(&SendMessageRequest {
            phone: phone.as_str(),
            is_group: false,
            message: text,
        })
        .await
    }

    async fn send_to_group(&self, group_chat_id: &str, text: &str) -> Result<(), MessagingError> {
        self.post(&SendMessageRequest {
            phone: group_chat_id,
            is_group: true,
            message: text,
        })
        .await
    }
}
