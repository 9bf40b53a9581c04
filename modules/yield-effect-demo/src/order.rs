//! Checkout flow written as effect-yielding coroutines.

use serde_json::{json, Value};
use tracing::info;
use yield_effect::{from_fn, Co, EffectError, EffectResult, FnCoroutine, Target};

use crate::services::MockServices;

/// Reserve, pay for, and ship a product.
///
/// Address and price lookups are forked up front and joined when needed.
/// Any failure after the reservation cancels it, dispatches `ORDER_FAILED`,
/// and rejects with the original error.
pub fn order_product(services: MockServices, product_id: String, user_id: String) -> FnCoroutine {
    from_fn(move |co| async move {
        let address_task = co
            .fork(services.fetch_user_address(), vec![json!(user_id)])
            .await?;
        let price_task = co
            .fork(services.fetch_product_price(), vec![json!(product_id)])
            .await?;

        let checkout = async {
            co.call(services.reserve_product(), vec![json!(product_id)])
                .await?;

            let payment = co
                .call(services.fetch_user_payment_details(), vec![json!(user_id)])
                .await?;
            let card_number = payment["cardNumber"].clone();
            co.put(json!({"type": "UPDATE_USER_CARD_NUMBER", "payload": card_number}))
                .await?;

            let price = co.join(&price_task).await?;
            co.call(
                make_payment(services.clone()),
                vec![card_number, price["price"].clone()],
            )
            .await?;

            let address = co.join(&address_task).await?["address"].clone();
            co.put(json!({"type": "UPDATE_USER_ADDRESS", "payload": address}))
                .await?;
            let order = co
                .call(
                    services.complete_order(),
                    vec![json!(product_id), json!(user_id), address],
                )
                .await?;
            co.put(json!({"type": "COMPLETE_ORDER", "payload": order["orderId"]}))
                .await?;

            Ok::<Value, EffectError>(order)
        }
        .await;

        match checkout {
            Ok(order) => Ok(order),
            Err(error) => rollback(&co, &services, &product_id, error).await,
        }
    })
}

async fn rollback(
    co: &Co,
    services: &MockServices,
    product_id: &str,
    error: EffectError,
) -> EffectResult<Value> {
    info!(product_id, error = %error, "Order failed, cancelling reservation");
    co.call(services.cancel_product_reservation(), vec![json!(product_id)])
        .await?;
    co.put(json!({"type": "ORDER_FAILED", "error": error.to_string()}))
        .await?;
    Err(error)
}

/// Payment sub-flow, invoked through `call` as a nested coroutine.
/// Arguments: card number, amount.
pub fn make_payment(services: MockServices) -> Target {
    Target::coroutine("make_payment", move |args| {
        let services = services.clone();
        from_fn(move |co| async move {
            let card_number = args.first().cloned().unwrap_or(Value::Null);
            let amount = args.get(1).cloned().unwrap_or(Value::Null);

            let validation = co
                .call(services.validate_card(), vec![card_number.clone()])
                .await?;
            if validation["status"] != "success" {
                return Err(EffectError::failure_with(
                    format!("card number {card_number} is not valid"),
                    json!({"cardNumber": card_number}),
                ));
            }

            co.put(json!({"type": "CARD_VALIDATION_SUCCESS"})).await?;
            co.call(services.pay(), vec![card_number, amount]).await?;
            co.put(json!({"type": "PAYMENT_COMPLETE"})).await?;
            Ok(Value::Null)
        })
    })
}
