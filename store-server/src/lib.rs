//! Bookstall Store Server - 图书市场后端
//!
//! # 架构概述
//!
//! 本模块是 Store Server 的主入口，提供以下核心功能：
//!
//! - **目录** (`db`): 嵌入式 SurrealDB 存储 (图书、购物车、订单、设置)
//! - **订单生命周期** (`orders`): 下单、支付对账、库存扣减、取消
//! - **支付网关** (`payment`): Chapa 适配器 + webhook 签名校验
//! - **认证** (`auth`): JWT 校验与角色提取
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! store-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 校验、当前用户
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层 (models + repository)
//! ├── orders/        # 订单生命周期服务
//! ├── payment/       # 支付网关适配器
//! ├── notify/        # 订单事件通知
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod notify;
pub mod orders;
pub mod payment;
pub mod routes;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService, Role};
pub use core::{Config, Server, ServerState};
pub use orders::OrderService;
pub use payment::{ChapaGateway, PaymentGateway};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() {
    let _ = dotenv::dotenv();
    init_logger();
}

pub fn print_banner() {
    println!(
        r#"
    ____              __        __        ____
   / __ )____  ____  / /_______/ /_____ _/ / /
  / __  / __ \/ __ \/ //_/ ___/ __/ __ `/ / /
 / /_/ / /_/ / /_/ / ,< (__  ) /_/ /_/ / / /
/_____/\____/\____/_/|_/____/\__/\__,_/_/_/
    "#
    );
}
