//! 订单生命周期模块
//!
//! [`OrderService`] 是订单的唯一变更入口：下单、支付对账、
//! 取消、配送状态推进、退款记录。HTTP 层只做提取和转发。

pub mod service;

pub use service::{CheckoutResponse, OrderService};
