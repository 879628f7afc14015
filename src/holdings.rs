use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::api::{ApiClient, Envelope};
use crate::error::ApiError;
use crate::portfolio::PortfolioStats;

/// A position as the backend stores it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "coinName")]
    pub coin_name: String,
    #[serde(deserialize_with = "number")]
    pub quantity: f64,
    #[serde(rename = "buyPrice", deserialize_with = "number")]
    pub buy_price: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewHolding {
    #[serde(rename = "coinName")]
    pub coin_name: String,
    pub quantity: f64,
    #[serde(rename = "buyPrice")]
    pub buy_price: f64,
}

impl NewHolding {
    /// Build from raw form input, rejecting blanks and non-positive numbers.
    pub fn parse(coin_name: &str, quantity: &str, buy_price: &str) -> Result<Self, ApiError> {
        let coin_name = coin_name.trim();
        if coin_name.is_empty() || quantity.trim().is_empty() || buy_price.trim().is_empty() {
            return Err(ApiError::validation("Coin name, quantity and buy price are required"));
        }
        Ok(Self {
            coin_name: coin_name.to_string(),
            quantity: parse_positive("quantity", quantity)?,
            buy_price: parse_positive("buy price", buy_price)?,
        })
    }
}

pub fn parse_positive(field: &str, raw: &str) -> Result<f64, ApiError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(ApiError::validation(format!("{field} must be a positive number, got {raw:?}"))),
    }
}

/// Accepts `1.5` as well as `"1.5"`; older records were saved from form strings.
fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
struct HoldingsReply {
    holdings: Vec<Holding>,
}

#[derive(Debug, Serialize)]
struct QuantityUpdate {
    quantity: f64,
}

/// Typed wrapper over the `/holdings` endpoints.
#[derive(Clone)]
pub struct HoldingsApi {
    api: ApiClient,
}

impl HoldingsApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<Holding>, ApiError> {
        let reply: HoldingsReply = self.api.get("/holdings/get").await?;
        Ok(reply.holdings)
    }

    pub async fn stats(&self) -> Result<PortfolioStats, ApiError> {
        self.api.get("/holdings/stats").await
    }

    pub async fn add(&self, holding: &NewHolding) -> Result<Holding, ApiError> {
        let created: Holding = self.api.post("/holdings/add", holding).await?;
        info!(id = %created.id, coin = %created.coin_name, quantity = created.quantity, "added holding");
        Ok(created)
    }

    pub async fn update_quantity(&self, id: &str, quantity: f64) -> Result<(), ApiError> {
        let reply: Envelope = self
            .api
            .put(&format!("/holdings/{id}"), &QuantityUpdate { quantity })
            .await?;
        if !reply.success {
            return Err(ApiError::Rejected(reply.failure_message("Failed to update quantity")));
        }
        info!(id, quantity, "updated holding");
        Ok(())
    }

    /// A 2xx reply is enough; the body, empty or not, is not inspected.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self.api.delete(&format!("/holdings/{id}")).await?;
        info!(id, "deleted holding");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use mockito::{Matcher, Server};
    use serde_json::json;

    async fn api(url: String) -> HoldingsApi {
        let session = SessionStore::in_memory();
        session.set_session("tok", "alice").await.unwrap();
        HoldingsApi::new(ApiClient::with_base(url, session))
    }

    #[test]
    fn holding_accepts_mongo_and_plain_ids() {
        let mongo: Holding = serde_json::from_value(json!({
            "_id": "66a1", "coinName": "bitcoin", "quantity": 2, "buyPrice": "30000.5"
        }))
        .unwrap();
        assert_eq!(mongo.id, "66a1");
        assert_eq!(mongo.buy_price, 30000.5);

        let plain: Holding = serde_json::from_value(json!({
            "id": "7", "coinName": "eth", "quantity": 1.5, "buyPrice": 2000
        }))
        .unwrap();
        assert_eq!(plain.id, "7");
    }

    #[test]
    fn new_holding_validation() {
        assert!(NewHolding::parse("", "1", "2").is_err());
        assert!(NewHolding::parse("btc", "abc", "2").is_err());
        assert!(NewHolding::parse("btc", "-1", "2").is_err());
        assert!(NewHolding::parse("btc", "1", "NaN").is_err());
        let ok = NewHolding::parse(" btc ", "0.5", "60000").unwrap();
        assert_eq!(ok, NewHolding { coin_name: "btc".into(), quantity: 0.5, buy_price: 60000.0 });
    }

    #[tokio::test]
    async fn add_posts_camel_case_body() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/holdings/add")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(json!({"coinName": "solana", "quantity": 3.0, "buyPrice": 150.0})))
            .with_status(201)
            .with_body(r#"{"_id":"s1","coinName":"solana","quantity":3,"buyPrice":150,"userId":"u"}"#)
            .create_async()
            .await;
        let created = api(server.url())
            .await
            .add(&NewHolding { coin_name: "solana".into(), quantity: 3.0, buy_price: 150.0 })
            .await
            .unwrap();
        assert_eq!(created.id, "s1");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn add_rejects_reply_that_is_not_a_holding() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/holdings/add")
            .with_status(201)
            .with_body(r#"{"message":"Holding added"}"#)
            .create_async()
            .await;
        let err = api(server.url())
            .await
            .add(&NewHolding { coin_name: "x".into(), quantity: 1.0, buy_price: 1.0 })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Malformed { .. }));
    }

    #[tokio::test]
    async fn update_reports_unsuccessful_reply() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/holdings/h1")
            .with_status(200)
            .with_body(r#"{"success":false,"message":"Holding not found"}"#)
            .create_async()
            .await;
        let err = api(server.url()).await.update_quantity("h1", 2.0).await.unwrap_err();
        assert_eq!(err.user_message(), "Holding not found");
    }
}
