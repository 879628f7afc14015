use serde::{Deserialize, Deserializer, Serialize};

/// Server-computed aggregates at fetch time.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PortfolioStats {
    pub total_value: f64,
    pub profit_loss: f64,
    pub total_holdings: usize,
}

#[derive(Deserialize)]
struct StatsReply {
    #[serde(rename = "totalCurrentValue")]
    total_current_value: f64,
    #[serde(rename = "totalProfitLoss")]
    total_profit_loss: f64,
    #[serde(rename = "portfolioDetails")]
    portfolio_details: Vec<serde_json::Value>,
}

impl<'de> Deserialize<'de> for PortfolioStats {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let reply = StatsReply::deserialize(deserializer)?;
        Ok(Self {
            total_value: reply.total_current_value,
            profit_loss: reply.total_profit_loss,
            total_holdings: reply.portfolio_details.len(),
        })
    }
}
