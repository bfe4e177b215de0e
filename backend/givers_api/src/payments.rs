//! Checkout provider client.
//!
//! Payment capture is entirely external: this module only asks the
//! provider for a hosted checkout URL to redirect the donor to. Settled
//! payments come back through `POST /payments/completed`.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use givers_core::{Interval, Money};

use crate::errors::Result;

#[derive(Debug, Serialize)]
pub struct CheckoutRequest<'a> {
    pub project_id: &'a str,
    pub amount: Money,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<Interval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub url: String,
}

/// Create a hosted checkout session and return its redirect URL.
pub async fn create_checkout(
    client: &Client,
    base_url: &str,
    request: &CheckoutRequest<'_>,
) -> Result<CheckoutSession> {
    let response = client
        .post(format!("{base_url}/checkout_sessions"))
        .json(request)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json().await?)
}
