//! Mock back-end services for the checkout flow.
//!
//! Every service is a pending [`Target`] that settles after a multiple of
//! the configured base latency.

use std::time::Duration;

use serde_json::{json, Value};
use yield_effect::Target;

pub const SHIPPING_ADDRESS: &str = "Stationsplein, 1012 AB Amsterdam, Netherlands";
pub const CARD_NUMBER: u64 = 1111222233334444;
pub const PRODUCT_PRICE: f64 = 24.99;
pub const ORDER_ID: &str = "ORD_ID_4242";

#[derive(Debug, Clone)]
pub struct MockServices {
    latency: Duration,
    card_valid: bool,
}

fn first_arg(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or(Value::Null)
}

impl MockServices {
    pub fn new(latency: Duration, card_valid: bool) -> Self {
        Self {
            latency,
            card_valid,
        }
    }

    fn delayed<F>(&self, name: &str, units: u32, respond: F) -> Target
    where
        F: Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    {
        let wait = self.latency * units;
        let respond = std::sync::Arc::new(respond);
        Target::future(name, move |args| {
            let respond = respond.clone();
            async move {
                tokio::time::sleep(wait).await;
                Ok(respond(args))
            }
        })
    }

    pub fn fetch_user_address(&self) -> Target {
        self.delayed("fetch_user_address", 4, |args| {
            json!({"userId": first_arg(&args), "address": SHIPPING_ADDRESS})
        })
    }

    pub fn fetch_product_price(&self) -> Target {
        self.delayed("fetch_product_price", 4, |args| {
            json!({"productId": first_arg(&args), "price": PRODUCT_PRICE})
        })
    }

    pub fn reserve_product(&self) -> Target {
        self.delayed("reserve_product", 3, |args| {
            json!({"productId": first_arg(&args), "status": "reserved"})
        })
    }

    pub fn cancel_product_reservation(&self) -> Target {
        self.delayed("cancel_product_reservation", 1, |args| {
            json!({"productId": first_arg(&args), "status": "success"})
        })
    }

    pub fn fetch_user_payment_details(&self) -> Target {
        self.delayed("fetch_user_payment_details", 2, |args| {
            json!({"userId": first_arg(&args), "cardNumber": CARD_NUMBER})
        })
    }

    /// Settles immediately with `success` or `failure`.
    pub fn validate_card(&self) -> Target {
        let status = if self.card_valid { "success" } else { "failure" };
        Target::function("validate_card", move |args| {
            Ok(json!({"cardNumber": first_arg(&args), "status": status}))
        })
    }

    pub fn pay(&self) -> Target {
        self.delayed("pay", 2, |_args| Value::Null)
    }

    pub fn complete_order(&self) -> Target {
        self.delayed("complete_order", 2, |args| {
            json!({
                "orderId": ORDER_ID,
                "productId": args.first().cloned().unwrap_or(Value::Null),
                "userId": args.get(1).cloned().unwrap_or(Value::Null),
                "address": args.get(2).cloned().unwrap_or(Value::Null),
            })
        })
    }
}
