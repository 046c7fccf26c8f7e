use uuid::Uuid;

use super::{Admin, DBPool};
use crate::error::Result;

/// 管理员账户查询
pub trait AdminRepository: Send + Sync {
    /// 按用户名查找启用中的管理员
    fn find_active_admin_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<Admin>>> + Send;

    /// 按 id 查找启用中的管理员
    fn find_active_admin(&self, id: Uuid) -> impl Future<Output = Result<Option<Admin>>> + Send;

    /// 记录最近登录时间
    fn touch_last_login(&self, id: Uuid) -> impl Future<Output = Result<()>> + Send;
}

const ADMIN_COLUMNS: &str =
    "id, username, password_hash, email, is_active, created_at, last_login";

impl AdminRepository for DBPool {
    async fn find_active_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE username = $1 AND is_active = TRUE"
        ))
        .bind(username)
        .fetch_optional(self)
        .await?;
        Ok(admin)
    }

    async fn find_active_admin(&self, id: Uuid) -> Result<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(id)
        .fetch_optional(self)
        .await?;
        Ok(admin)
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE admins SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(self)
            .await?;
        Ok(())
    }
}
