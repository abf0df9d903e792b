//! Stripe client for charging cards at checkout.
//!
//! Charges are confirmed Payment Intents: the client sends the payment
//! method id produced by Stripe.js on the frontend and the intent is
//! confirmed in the same request.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use cyber_shop_core::Price;

use crate::config::StripeConfig;

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// Every charge is in US dollars.
pub const CURRENCY: &str = "USD";

/// Errors that can occur when charging a card.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe rejected the charge. The message is safe to show the shopper.
    #[error("{message}")]
    Declined { status: u16, message: String },

    /// The intent was created but not paid, e.g. it needs 3-D Secure.
    #[error("Your payment could not be completed ({status})")]
    Incomplete { id: String, status: String },

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A confirmed charge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Charge {
    /// Payment Intent id, stored on the order.
    pub id: String,
    /// Amount charged in cents.
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

impl Charge {
    /// Stripe status of a paid intent.
    pub const SUCCEEDED: &'static str = "succeeded";

    /// Accept only intents that were actually paid.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Incomplete` for any other status.
    pub fn confirmed(self) -> Result<Self, PaymentError> {
        if self.status == Self::SUCCEEDED {
            Ok(self)
        } else {
            Err(PaymentError::Incomplete {
                id: self.id,
                status: self.status,
            })
        }
    }

    /// The charged amount.
    #[must_use]
    pub const fn total(&self) -> Price {
        Price::from_cents(self.amount)
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// Pull the human readable message out of a Stripe error response.
fn decline_message(body: &str) -> String {
    serde_json::from_str::<StripeErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| "Payment failed".to_string())
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Config(format!("Invalid secret key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Charge `amount` to the given payment method and confirm immediately.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Declined` with Stripe's message if the charge is
    /// refused, `PaymentError::Incomplete` if the intent wasn't paid, and
    /// `PaymentError::Http` if Stripe can't be reached.
    pub async fn charge(&self, amount: Price, payment_method: &str) -> Result<Charge, PaymentError> {
        let amount = amount.cents().to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", CURRENCY),
            ("confirm", "true"),
            ("payment_method", payment_method),
        ];

        let response = self
            .client
            .post(format!("{BASE_URL}/payment_intents"))
            .form(&form)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Declined {
                status: status.as_u16(),
                message: decline_message(&body),
            });
        }

        response.json::<Charge>().await?.confirmed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decline_message_from_stripe_error() {
        let body = r#"{"error":{"code":"card_declined","message":"Your card was declined.","type":"card_error"}}"#;
        assert_eq!(decline_message(body), "Your card was declined.");
    }

    #[test]
    fn test_decline_message_fallback() {
        assert_eq!(decline_message("<html>bad gateway</html>"), "Payment failed");
        assert_eq!(decline_message(r#"{"error":{}}"#), "Payment failed");
    }

    #[test]
    fn test_charge_deserializes() {
        let body = r#"{"id":"pi_3ABC","object":"payment_intent","amount":4999,"currency":"usd","status":"succeeded"}"#;
        let charge: Charge = serde_json::from_str(body).unwrap();
        assert_eq!(charge.id, "pi_3ABC");
        assert_eq!(charge.total(), Price::from_cents(4999));
    }

    #[test]
    fn test_unpaid_intent_is_rejected() {
        let body = r#"{"id":"pi_3DEF","amount":4999,"currency":"usd","status":"requires_action"}"#;
        let charge: Charge = serde_json::from_str(body).unwrap();
        let err = charge.confirmed().unwrap_err();
        assert!(matches!(
            err,
            PaymentError::Incomplete { ref id, ref status } if id == "pi_3DEF" && status == "requires_action"
        ));
    }

    #[test]
    fn test_paid_intent_is_accepted() {
        let body = r#"{"id":"pi_3ABC","amount":4999,"currency":"usd","status":"succeeded"}"#;
        let charge: Charge = serde_json::from_str(body).unwrap();
        assert_eq!(charge.confirmed().unwrap().id, "pi_3ABC");
    }

    #[test]
    fn test_declined_displays_message_only() {
        let err = PaymentError::Declined {
            status: 402,
            message: "Your card has insufficient funds.".to_string(),
        };
        assert_eq!(err.to_string(), "Your card has insufficient funds.");
    }
}
