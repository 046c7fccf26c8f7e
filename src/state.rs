use std::sync::Arc;

use axum::extract::FromRef;

use crate::{auth::AuthManager, storage::DBPool};

/// 处理器共享的认证服务
pub type Auth = Arc<AuthManager<DBPool>>;

/// 应用程序上下文
///
/// [`AppState`] 封装了数据库连接池和认证服务，处理器按需从中提取。
#[derive(Clone, FromRef)]
pub struct AppState {
    pool: DBPool,
    auth: Auth,
}

impl AppState {
    /// 创建一个新的 [`AppState`] 实例，签名密钥此后不可更改
    pub fn new(pool: DBPool, jwt_secret: &[u8]) -> Self {
        Self {
            auth: Arc::new(AuthManager::new(pool.clone(), jwt_secret)),
            pool,
        }
    }
}
