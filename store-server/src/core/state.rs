use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::db::repository::{
    BookRepository, CartRepository, OrderRepository, SettingsRepository,
};
use crate::notify::{LogNotifier, Notifier};
use crate::orders::OrderService;
use crate::payment::{ChapaGateway, PaymentGateway};
use crate::utils::AppError;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，每个请求 clone 的成本极低。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | db | 嵌入式数据库 (SurrealDB) |
/// | jwt_service | JWT 校验服务 |
/// | orders | 订单生命周期服务 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库
    pub db: Surreal<Db>,
    /// JWT 校验服务
    pub jwt_service: Arc<JwtService>,
    /// 订单生命周期服务
    pub orders: Arc<OrderService>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 数据目录结构
    /// 2. 数据库 (data_dir/database/store.db)
    /// 3. 支付网关适配器和订单服务
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        config
            .ensure_data_dir_structure()
            .map_err(|e| AppError::internal(format!("Failed to create data directory: {e}")))?;

        let db_path = config.database_dir().join("store.db");
        let db_service = DbService::new(&db_path.to_string_lossy()).await?;

        let gateway: Arc<dyn PaymentGateway> = Arc::new(ChapaGateway::new(
            config.chapa_secret_key.clone(),
            config.chapa_base_url.clone(),
            config.gateway_timeout_ms,
        ));

        Ok(Self::with_parts(
            config.clone(),
            db_service.db,
            gateway,
            Arc::new(LogNotifier),
        ))
    }

    /// 从既有组件构造状态 (测试用 in-memory 数据库和 mock 网关)
    pub fn with_parts(
        config: Config,
        db: Surreal<Db>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let orders = Arc::new(OrderService::new(
            OrderRepository::new(db.clone()),
            BookRepository::new(db.clone()),
            CartRepository::new(db.clone()),
            SettingsRepository::new(db.clone()),
            gateway,
            notifier,
            config.currency.clone(),
            config.public_base_url.clone(),
        ));

        Self {
            config: config.clone(),
            db,
            jwt_service: Arc::new(JwtService::new(config.jwt)),
            orders,
        }
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }
}
