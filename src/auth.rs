mod password;
mod token;

pub use password::{hash_password, verify_password};
pub use token::{IssuedToken, TOKEN_TTL_HOURS, TokenSigner};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    storage::{Admin, AdminRepository},
};

/// 对外暴露的管理员信息，不含密码哈希
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSummary {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
}

impl From<Admin> for AdminSummary {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            username: admin.username,
            email: admin.email,
        }
    }
}

/// 登录成功的结果
#[derive(Debug, Clone)]
pub struct Login {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub admin: AdminSummary,
}

/// 管理员认证
///
/// 校验用户名密码并签发令牌，之后的请求凭令牌识别管理员。
pub struct AuthManager<R> {
    repo: R,
    signer: TokenSigner,
}

impl<R: AdminRepository> AuthManager<R> {
    pub fn new(repo: R, secret: &[u8]) -> Self {
        Self {
            repo,
            signer: TokenSigner::new(secret, Duration::hours(TOKEN_TTL_HOURS)),
        }
    }

    /// 用户名密码登录
    ///
    /// 用户不存在、已停用或密码错误时统一返回 [`Error::InvalidCredentials`]。
    pub async fn login(&self, username: &str, password: &str) -> Result<Login> {
        let admin = self
            .repo
            .find_active_admin_by_username(username)
            .await?
            .ok_or(Error::InvalidCredentials)?;

        let matched =
            password::verify_password_blocking(password.to_string(), admin.password_hash.clone())
                .await
                .or_else(|e| match e {
                    e @ (Error::PasswordHash(_) | Error::Bcrypt(_)) => {
                        tracing::warn!(%username, error = %e, "stored password hash is malformed");
                        Ok(false)
                    }
                    other => Err(other),
                })?;
        if !matched {
            return Err(Error::InvalidCredentials);
        }

        // 登录时间只做记录，写入失败不影响登录
        if let Err(e) = self.repo.touch_last_login(admin.id).await {
            tracing::warn!(admin_id = %admin.id, error = %e, "failed to update last login");
        }

        let issued = self.signer.issue(admin.id, Utc::now())?;
        tracing::info!(%username, "admin logged in");

        Ok(Login {
            token: issued.token,
            expires_at: issued.expires_at,
            admin: admin.into(),
        })
    }

    /// 校验令牌并返回管理员 id
    pub fn validate_token(&self, token: &str) -> Result<Uuid> {
        self.signer.verify(token)
    }

    /// 按 id 获取启用中的管理员
    pub async fn get_admin_by_id(&self, id: Uuid) -> Result<AdminSummary> {
        self.repo
            .find_active_admin(id)
            .await?
            .map(Into::into)
            .ok_or(Error::NotFound("admin"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    const SECRET: &[u8] = b"test-secret";

    fn setup() -> (MemoryStore, AuthManager<MemoryStore>, Admin) {
        let store = MemoryStore::default();
        let admin = store.add_admin("admin", &hash_password("hunter2").unwrap(), true);
        let auth = AuthManager::new(store.clone(), SECRET);
        (store, auth, admin)
    }

    #[tokio::test]
    async fn test_login_success() {
        let (store, auth, admin) = setup();

        let before = Utc::now();
        let login = auth.login("admin", "hunter2").await.unwrap();

        assert_eq!(login.admin.id, admin.id);
        assert_eq!(login.admin.email.as_deref(), Some("admin@example.com"));
        assert!(login.expires_at >= before + Duration::hours(24));
        assert_eq!(auth.validate_token(&login.token).unwrap(), admin.id);
        assert!(store.admin(admin.id).unwrap().last_login.is_some());
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let (store, auth, _) = setup();
        store.add_admin("retired", &hash_password("hunter2").unwrap(), false);
        store.add_admin("broken", "not-a-phc-string", true);

        for (username, password) in [
            ("admin", "wrong"),
            ("nobody", "hunter2"),
            ("retired", "hunter2"),
            ("broken", "hunter2"),
        ] {
            assert!(
                matches!(
                    auth.login(username, password).await,
                    Err(Error::InvalidCredentials)
                ),
                "{username}"
            );
        }
    }

    #[tokio::test]
    async fn test_login_with_bcrypt_hash() {
        let store = MemoryStore::default();
        let hash = bcrypt::hash("hunter2", 4).unwrap().replacen("$2b$", "$2a$", 1);
        let admin = store.add_admin("legacy", &hash, true);
        let auth = AuthManager::new(store, SECRET);

        assert_eq!(auth.login("legacy", "hunter2").await.unwrap().admin.id, admin.id);
        assert!(matches!(
            auth.login("legacy", "wrong").await,
            Err(Error::InvalidCredentials)
        ));
    }

    /// 记录登录时间总是失败
    struct TouchFails(MemoryStore);

    impl AdminRepository for TouchFails {
        async fn find_active_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
            self.0.find_active_admin_by_username(username).await
        }

        async fn find_active_admin(&self, id: Uuid) -> Result<Option<Admin>> {
            self.0.find_active_admin(id).await
        }

        async fn touch_last_login(&self, _id: Uuid) -> Result<()> {
            Err(Error::Sqlx(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn test_login_survives_last_login_failure() {
        let store = MemoryStore::default();
        let admin = store.add_admin("admin", &hash_password("hunter2").unwrap(), true);
        let auth = AuthManager::new(TouchFails(store.clone()), SECRET);

        let login = auth.login("admin", "hunter2").await.unwrap();
        assert_eq!(login.admin.id, admin.id);
        assert!(store.admin(admin.id).unwrap().last_login.is_none());
    }

    #[tokio::test]
    async fn test_get_admin_by_id() {
        let (store, auth, admin) = setup();
        let retired = store.add_admin("retired", "x", false);

        assert_eq!(auth.get_admin_by_id(admin.id).await.unwrap().username, "admin");
        assert!(matches!(
            auth.get_admin_by_id(retired.id).await,
            Err(Error::NotFound("admin"))
        ));
        assert!(matches!(
            auth.get_admin_by_id(Uuid::new_v4()).await,
            Err(Error::NotFound("admin"))
        ));
    }

    #[test]
    fn test_validate_token_rejects_garbage() {
        let (_, auth, _) = setup();
        assert!(matches!(
            auth.validate_token("garbage"),
            Err(Error::InvalidToken)
        ));
    }
}
