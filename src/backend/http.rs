use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use crate::backend::{RemoteBackend, RemoteTrip};
use crate::error::{classify_http_status, TripError};
use crate::models::driver::DriverCandidate;
use crate::models::trip::{Location, PaymentMethod};

/// JSON-over-HTTP backend client.
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TripError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|err| TripError::Internal(format!("http client build failed: {err}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, TripError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|err| TripError::Remote(format!("malformed backend response: {err}")));
        }

        let message = extract_error_message(response).await;
        Err(classify_http_status(status.as_u16(), message))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TripError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(transport_error)?;
        Self::parse(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, TripError> {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        Self::parse(response).await
    }
}

fn transport_error(err: reqwest::Error) -> TripError {
    TripError::Network(format!("request failed: {err}"))
}

/// The backend reports failures as `{"error": "..."}`; fall back to the raw
/// body or the status text when it does not.
async fn extract_error_message(response: Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) => serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status_line(status)
                } else {
                    body
                }
            }),
        Err(_) => status_line(status),
    }
}

fn status_line(status: StatusCode) -> String {
    format!("backend answered {status}")
}

#[async_trait]
impl RemoteBackend for HttpBackend {
    async fn request_ride(
        &self,
        passenger_id: Uuid,
        origin: &Location,
        destination: &Location,
        method: PaymentMethod,
    ) -> Result<RemoteTrip, TripError> {
        self.post_json(
            "/trips",
            json!({
                "passenger_id": passenger_id,
                "origin": origin,
                "destination": destination,
                "payment_method": method,
            }),
        )
        .await
    }

    async fn get_trip_by_id(&self, id: Uuid) -> Result<RemoteTrip, TripError> {
        self.get_json(&format!("/trips/{id}")).await
    }

    async fn cancel_trip(&self, id: Uuid) -> Result<RemoteTrip, TripError> {
        self.post_json(&format!("/trips/{id}/cancel"), json!({})).await
    }

    async fn pay_trip(&self, id: Uuid, method: PaymentMethod) -> Result<RemoteTrip, TripError> {
        self.post_json(&format!("/trips/{id}/pay"), json!({ "payment_method": method }))
            .await
    }

    async fn rate_trip(
        &self,
        id: Uuid,
        rating: u8,
        comment: Option<&str>,
    ) -> Result<RemoteTrip, TripError> {
        self.post_json(
            &format!("/trips/{id}/rate"),
            json!({ "rating": rating, "comment": comment }),
        )
        .await
    }

    async fn get_user_trips(&self, passenger_id: Uuid) -> Result<Vec<RemoteTrip>, TripError> {
        self.get_json(&format!("/passengers/{passenger_id}/trips"))
            .await
    }

    async fn get_available_drivers(&self) -> Result<Vec<DriverCandidate>, TripError> {
        self.get_json("/drivers/available").await
    }

    async fn select_driver(&self, trip_id: Uuid, driver_id: Uuid) -> Result<(), TripError> {
        let _: serde_json::Value = self
            .post_json(
                &format!("/trips/{trip_id}/driver"),
                json!({ "driver_id": driver_id }),
            )
            .await?;
        Ok(())
    }
}
