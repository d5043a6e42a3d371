//! 认证模块
//!
//! 令牌签发由外部认证服务负责；本服务只做校验：
//! - [`JwtService`] - JWT 令牌校验
//! - [`CurrentUser`] - 当前用户上下文 (axum extractor)
//! - [`Role`] - 买家 / 卖家 / 管理员

pub mod extractor;
pub mod jwt;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService, Role};
