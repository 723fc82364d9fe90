pub mod catalog_api;
pub mod checkout_api;
pub mod order_flow_api;
