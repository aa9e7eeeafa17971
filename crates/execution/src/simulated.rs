// In crates/execution/src/simulated.rs

use crate::types::{OrderAck, OrderRequest, SimulationSettings, TokenQuote};
use crate::{Broker, Error, Result};
use async_trait::async_trait;
use core_types::{OrderStatus, OrderType, Side, TokenId, TradingMode};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Book {
    orders: HashMap<String, OrderStatus>,
    last_prices: HashMap<TokenId, Decimal>,
}

/// A broker that fills every order immediately without touching a venue.
///
/// It remembers the last price it traded or was told about for each token so
/// that price refreshes in paper mode have something to report.
pub struct PaperBroker {
    settings: SimulationSettings,
    book: Mutex<Book>,
}

impl PaperBroker {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            settings,
            book: Mutex::new(Book::default()),
        }
    }

    fn fill_price(&self, order: &OrderRequest) -> Result<Decimal> {
        if order.order_type == OrderType::Limit {
            return order.limit_price.ok_or_else(|| Error::Rejected {
                reason: "limit order without a limit price".to_string(),
            });
        }
        let slippage = Decimal::from_f64(self.settings.slippage_percent).unwrap_or(Decimal::ZERO);
        // Slippage always works against us.
        Ok(match order.side {
            Side::Buy => order.reference_price * (dec!(1) + slippage),
            Side::Sell => order.reference_price * (dec!(1) - slippage),
        })
    }
}

#[async_trait]
impl Broker for PaperBroker {
    fn name(&self) -> &'static str {
        "PaperBroker"
    }

    fn mode(&self) -> TradingMode {
        TradingMode::Paper
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck> {
        if order.quantity <= Decimal::ZERO {
            return Err(Error::Rejected {
                reason: format!("quantity must be positive, got {}", order.quantity),
            });
        }
        if order.reference_price <= Decimal::ZERO {
            return Err(Error::InvalidToken(format!("no usable price for {}", order.token_id)));
        }
        let fill_price = self.fill_price(order)?;
        let order_id = format!("paper-{}", uuid::Uuid::new_v4());

        let mut book = self.book.lock().await;
        book.orders.insert(order_id.clone(), OrderStatus::Filled);
        book.last_prices.insert(order.token_id.clone(), order.reference_price);

        tracing::info!(
            order_id = %order_id,
            token = %order.token_id,
            side = %order.side,
            quantity = %order.quantity,
            price = %fill_price,
            "Paper order filled."
        );
        Ok(OrderAck {
            order_id,
            status: OrderStatus::Filled,
            fill_price: Some(fill_price),
        })
    }

    async fn check_order_status(&self, order_id: &str) -> Result<OrderStatus> {
        let book = self.book.lock().await;
        Ok(book.orders.get(order_id).copied().unwrap_or(OrderStatus::Unknown))
    }

    async fn cancel_order(&self, order_id: &str) -> Result<bool> {
        // Paper orders fill on placement, so there is never anything left to cancel.
        let book = self.book.lock().await;
        Ok(book.orders.get(order_id).is_some_and(|s| !s.is_terminal()))
    }

    async fn get_token_info(&self, token_id: &TokenId) -> Result<TokenQuote> {
        let book = self.book.lock().await;
        let price = book
            .last_prices
            .get(token_id)
            .copied()
            .ok_or_else(|| Error::InvalidToken(format!("no paper price for {token_id}")))?;
        Ok(TokenQuote { token_id: token_id.clone(), price })
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn observe_price(&self, token_id: &TokenId, price: Decimal) {
        if price > Decimal::ZERO {
            self.book.lock().await.last_prices.insert(token_id.clone(), price);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker(slippage: f64) -> PaperBroker {
        PaperBroker::new(SimulationSettings { slippage_percent: slippage })
    }

    #[tokio::test]
    async fn market_orders_fill_immediately_at_the_reference_price() {
        let broker = broker(0.0);
        let order = OrderRequest::market(TokenId::from("tok"), Side::Buy, dec!(10), 0.02, dec!(1.5));

        let ack = broker.place_order(&order).await.unwrap();

        assert_eq!(ack.status, OrderStatus::Filled);
        assert_eq!(ack.fill_price, Some(dec!(1.5)));
        assert_eq!(broker.check_order_status(&ack.order_id).await.unwrap(), OrderStatus::Filled);
        assert!(!broker.cancel_order(&ack.order_id).await.unwrap());
        assert_eq!(broker.get_token_info(&TokenId::from("tok")).await.unwrap().price, dec!(1.5));
    }

    #[tokio::test]
    async fn slippage_is_adverse_on_both_sides() {
        let broker = broker(0.01);
        let buy = OrderRequest::market(TokenId::from("tok"), Side::Buy, dec!(1), 0.02, dec!(100));
        let sell = OrderRequest::market(TokenId::from("tok"), Side::Sell, dec!(1), 0.02, dec!(100));

        assert_eq!(broker.place_order(&buy).await.unwrap().fill_price, Some(dec!(101)));
        assert_eq!(broker.place_order(&sell).await.unwrap().fill_price, Some(dec!(99)));
    }

    #[tokio::test]
    async fn unknown_tokens_and_orders() {
        let broker = broker(0.0);
        assert!(matches!(
            broker.get_token_info(&TokenId::from("nope")).await,
            Err(Error::InvalidToken(_))
        ));
        assert_eq!(broker.check_order_status("missing").await.unwrap(), OrderStatus::Unknown);
        assert!(broker.health_check().await);
    }

    #[tokio::test]
    async fn observed_prices_are_quoted_back() {
        let broker = broker(0.0);
        let token = TokenId::from("tok");
        broker.observe_price(&token, dec!(0.42)).await;
        broker.observe_price(&token, dec!(0)).await;
        assert_eq!(broker.get_token_info(&token).await.unwrap().price, dec!(0.42));
    }

    #[tokio::test]
    async fn rejects_non_positive_quantities() {
        let broker = broker(0.0);
        let order = OrderRequest::market(TokenId::from("tok"), Side::Buy, dec!(0), 0.02, dec!(1));
        assert!(matches!(broker.place_order(&order).await, Err(Error::Rejected { .. })));
    }
}
