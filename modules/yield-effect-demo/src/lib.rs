//! Order-checkout scenario driven through a [`yield_effect::HostAdapter`].

pub mod config;
pub mod order;
pub mod services;

pub use config::DemoConfig;
pub use order::{make_payment, order_product};
pub use services::MockServices;
