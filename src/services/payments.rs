use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::config::CheckoutConfig;
use crate::error::ApiError;
use crate::models::Tour;

/// A checkout session handed back to the client, which redirects the
/// browser to `url` to complete payment.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
    pub tour_id: Uuid,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct ProviderSession {
    id: String,
    url: String,
}

/// Client for the external payment provider. Without provider credentials
/// it synthesizes a local session that redirects straight to the success
/// URL, which keeps the booking flow usable in development.
pub struct CheckoutClient {
    http: reqwest::Client,
    config: CheckoutConfig,
}

impl CheckoutClient {
    pub fn new(config: CheckoutConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub async fn create_session(
        &self,
        tour: &Tour,
        customer_email: &str,
    ) -> Result<CheckoutSession, ApiError> {
        let (Some(endpoint), Some(api_key)) =
            (self.config.endpoint.as_deref(), self.config.api_key.as_deref())
        else {
            tracing::info!(tour_id = %tour.id, "checkout provider not configured, issuing local session");
            return Ok(CheckoutSession {
                id: format!("local_{}", Uuid::new_v4()),
                url: self.config.success_url.clone(),
                tour_id: tour.id,
                amount: tour.price,
                currency: self.config.currency.clone(),
            });
        };

        let payload = json!({
            "customer_email": customer_email,
            "client_reference_id": tour.id,
            "success_url": self.config.success_url,
            "cancel_url": self.config.cancel_url,
            "currency": self.config.currency,
            "amount": tour.price,
            "name": format!("{} Tour", tour.name),
            "description": tour.summary,
        });

        let response = self
            .http
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("checkout provider request failed: {e}");
                ApiError::service_unavailable("Payment provider is unavailable, try again later")
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body, "checkout provider rejected session");
            return Err(ApiError::service_unavailable(
                "Payment provider is unavailable, try again later",
            ));
        }

        let session: ProviderSession = response.json().await.map_err(|e| {
            tracing::error!("checkout provider returned malformed session: {e}");
            ApiError::service_unavailable("Payment provider is unavailable, try again later")
        })?;

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
            tour_id: tour.id,
            amount: tour.price,
            currency: self.config.currency.clone(),
        })
    }
}
