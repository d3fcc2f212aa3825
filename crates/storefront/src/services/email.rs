//! Order mail: the customer confirmation and the restaurant alert.
//!
//! Messages are rendered from Askama templates (HTML and plain text) and
//! handed to a [`MailTransport`]; production uses SMTP via lettre.

use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{info, instrument, warn};

use dar_sellami_core::{DeliveryType, OrderNotification};

use crate::config::{EmailConfig, RestaurantProfile};
use crate::services::notifier::{NotifyError, NotifyResponse, OrderNotifier};

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Delivers rendered mail.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send one message.
    async fn deliver(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// SMTP delivery (STARTTLS relay).
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create an SMTP mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(mail
                .to
                .parse()
                .map_err(|_| MailError::InvalidAddress(mail.to.clone()))?)
            .subject(&mail.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(mail.text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(mail.html_body),
                    ),
            )?;

        self.mailer.send(email).await?;

        info!(to = %mail.to, subject = %mail.subject, "Email sent successfully");
        Ok(())
    }
}

/// One item line as rendered in mail.
struct MailLine {
    name: String,
    quantity: u32,
    unit_price: String,
    line_total: String,
}

/// Values shared by every order template.
struct OrderMailContext<'a> {
    order: &'a OrderNotification,
    restaurant: &'a RestaurantProfile,
    reference: String,
    customer_name: String,
    is_delivery: bool,
    lines: Vec<MailLine>,
    subtotal: String,
    delivery_fee: String,
    total: String,
}

impl<'a> OrderMailContext<'a> {
    fn new(order: &'a OrderNotification, restaurant: &'a RestaurantProfile) -> Self {
        let lines = order
            .items
            .iter()
            .map(|item| MailLine {
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price.display(),
                line_total: item.line_total().display(),
            })
            .collect();

        Self {
            order,
            restaurant,
            reference: order.order_reference(),
            customer_name: order.customer_name(),
            is_delivery: order.delivery_type == DeliveryType::Delivery,
            lines,
            subtotal: order.totals.subtotal.display(),
            delivery_fee: order.totals.delivery_fee.display(),
            total: order.totals.total.display(),
        }
    }
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    ctx: &'a OrderMailContext<'a>,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    ctx: &'a OrderMailContext<'a>,
}

#[derive(Template)]
#[template(path = "email/order_alert.html")]
struct OrderAlertHtml<'a> {
    ctx: &'a OrderMailContext<'a>,
}

#[derive(Template)]
#[template(path = "email/order_alert.txt")]
struct OrderAlertText<'a> {
    ctx: &'a OrderMailContext<'a>,
}

/// Renders and sends order mail.
#[derive(Clone)]
pub struct OrderMailer {
    transport: Arc<dyn MailTransport>,
    restaurant: RestaurantProfile,
}

impl OrderMailer {
    /// Create a mailer sending through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn MailTransport>, restaurant: RestaurantProfile) -> Self {
        Self {
            transport,
            restaurant,
        }
    }

    /// Render the customer's confirmation.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Template` if rendering fails.
    pub fn confirmation_mail(
        &self,
        order: &OrderNotification,
        to: &str,
    ) -> Result<OutgoingMail, MailError> {
        let ctx = OrderMailContext::new(order, &self.restaurant);
        Ok(OutgoingMail {
            to: to.to_owned(),
            subject: format!(
                "Order Confirmation #{} - {}",
                ctx.reference, self.restaurant.name
            ),
            text_body: OrderConfirmationText { ctx: &ctx }.render()?,
            html_body: OrderConfirmationHtml { ctx: &ctx }.render()?,
        })
    }

    /// Render the restaurant's new-order alert.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Template` if rendering fails.
    pub fn alert_mail(&self, order: &OrderNotification, to: &str) -> Result<OutgoingMail, MailError> {
        let ctx = OrderMailContext::new(order, &self.restaurant);
        Ok(OutgoingMail {
            to: to.to_owned(),
            subject: format!(
                "New Order #{} - {} ({})",
                ctx.reference,
                order.delivery_type.label(),
                ctx.total
            ),
            text_body: OrderAlertText { ctx: &ctx }.render()?,
            html_body: OrderAlertHtml { ctx: &ctx }.render()?,
        })
    }

    /// Send the confirmation to the customer and the alert to the restaurant.
    ///
    /// A payload without a customer email sends nothing. A missing restaurant
    /// mailbox skips the alert with a warning.
    #[instrument(skip(self, order), fields(order_id = %order.order_reference()))]
    pub async fn send_order_mail(&self, order: &OrderNotification) -> NotifyResponse {
        let Some(customer) = order.email.as_ref() else {
            warn!("No customer email provided");
            return NotifyResponse::failed("No customer email provided");
        };

        match self.try_send(order, customer.as_str()).await {
            Ok(()) => NotifyResponse::ok(),
            Err(e) => {
                warn!(error = %e, "Order mail failed");
                NotifyResponse::failed(e.to_string())
            }
        }
    }

    async fn try_send(&self, order: &OrderNotification, customer: &str) -> Result<(), MailError> {
        self.transport
            .deliver(self.confirmation_mail(order, customer)?)
            .await?;

        match &self.restaurant.email {
            Some(operator) => {
                self.transport
                    .deliver(self.alert_mail(order, operator.as_str())?)
                    .await
            }
            None => {
                warn!("RESTAURANT_EMAIL not set; new-order alert not sent");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl OrderNotifier for OrderMailer {
    async fn send_order_confirmation(
        &self,
        details: &OrderNotification,
    ) -> Result<NotifyResponse, NotifyError> {
        Ok(self.send_order_mail(details).await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use dar_sellami_core::{
        CustomerDetails, DEFAULT_DELIVERY_FEE, Email, FulfillmentSelection, OrderId, OrderItem,
        Price, ProductId, assemble,
    };

    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutgoingMail>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn deliver(&self, mail: OutgoingMail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
    }

    fn restaurant() -> RestaurantProfile {
        RestaurantProfile {
            email: Some(Email::parse("kitchen@darsellami.tn").unwrap()),
            ..RestaurantProfile::default()
        }
    }

    fn notification() -> OrderNotification {
        let items = vec![OrderItem {
            product_id: ProductId::from("couscous"),
            name: "Couscous <Royal>".to_owned(),
            unit_price: Price::from_cents(1250),
            quantity: 2,
        }];
        let fulfillment = FulfillmentSelection::Delivery {
            customer: CustomerDetails {
                first_name: "Leila".to_owned(),
                last_name: "Haddad".to_owned(),
                phone: "98 765 432".to_owned(),
                email: Email::parse("leila@example.tn").unwrap(),
            },
            address: "7 Rue Ibn Khaldoun".to_owned(),
            governorate: "Ariana".to_owned(),
        };
        assemble(items, fulfillment, DEFAULT_DELIVERY_FEE)
            .unwrap()
            .notification
            .with_order_id(OrderId::new(17))
    }

    #[tokio::test]
    async fn test_sends_confirmation_and_alert() {
        let transport = Arc::new(RecordingTransport::default());
        let mailer = OrderMailer::new(transport.clone(), restaurant());

        let response = mailer.send_order_mail(&notification()).await;

        assert!(response.success);
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "leila@example.tn");
        assert_eq!(
            sent[0].subject,
            "Order Confirmation #17 - Dar Sellami Restaurant"
        );
        assert_eq!(sent[1].to, "kitchen@darsellami.tn");
        assert_eq!(sent[1].subject, "New Order #17 - Delivery ($33.00)");
    }

    #[tokio::test]
    async fn test_missing_customer_email_sends_nothing() {
        let transport = Arc::new(RecordingTransport::default());
        let mailer = OrderMailer::new(transport.clone(), restaurant());
        let mut order = notification();
        order.email = None;

        let response = mailer.send_order_mail(&order).await;

        assert_eq!(response, NotifyResponse::failed("No customer email provided"));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_templates_render_order_facts() {
        let mailer = OrderMailer::new(Arc::new(RecordingTransport::default()), restaurant());
        let mail = mailer
            .confirmation_mail(&notification(), "leila@example.tn")
            .unwrap();

        assert!(mail.text_body.contains("Couscous <Royal>"));
        assert!(mail.text_body.contains("$33.00"));
        assert!(mail.text_body.contains("7 Rue Ibn Khaldoun"));
        assert!(mail.html_body.contains("Couscous &#60;Royal&#62;") || mail.html_body.contains("Couscous &lt;Royal&gt;"));
    }
}
