//! Order notification client.
//!
//! After an order is stored, the checkout asks the notification endpoint to
//! mail the customer and the restaurant. The call crosses a request boundary
//! (`POST {notification_url}` with `{ "orderDetails": ... }`) and its outcome
//! is only ever reported, never allowed to fail the order.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use dar_sellami_core::OrderNotification;

/// Response body of the notification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NotifyResponse {
    /// A successful response.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// A failed response with a reason.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Request body of the notification endpoint.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub order_details: Option<OrderNotification>,
}

/// Errors reaching the notification endpoint.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The request could not be sent or the body not read.
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with something other than a notify response.
    #[error("notification endpoint returned {status}")]
    UnexpectedResponse { status: u16 },
}

/// Sends order confirmations.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// Ask for the customer confirmation and the operator alert to be sent.
    async fn send_order_confirmation(
        &self,
        details: &OrderNotification,
    ) -> Result<NotifyResponse, NotifyError>;
}

/// [`OrderNotifier`] that posts to the notification endpoint over HTTP.
#[derive(Clone)]
pub struct HttpOrderNotifier {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpOrderNotifier {
    /// Create a notifier posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Http` if the HTTP client cannot be built.
    pub fn new(endpoint: Url) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl OrderNotifier for HttpOrderNotifier {
    #[instrument(skip(self, details), fields(order_id = %details.order_reference()))]
    async fn send_order_confirmation(
        &self,
        details: &OrderNotification,
    ) -> Result<NotifyResponse, NotifyError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&serde_json::json!({ "orderDetails": details }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), "Notification endpoint responded");

        serde_json::from_str::<NotifyResponse>(&body).map_err(|_| {
            NotifyError::UnexpectedResponse {
                status: status.as_u16(),
            }
        })
    }
}
