use argon2::{
    Argon2,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::error::{Error, Result};

/// 生成 Argon2id PHC 格式的密码哈希
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(Error::PasswordHash)
}

/// 以 bcrypt 前缀开头的哈希，由早期的账户初始化工具生成
fn is_bcrypt(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}

/// 校验密码
///
/// 新哈希为 Argon2，同时接受已有账户的 bcrypt 哈希。
/// 密码不匹配返回 `Ok(false)`，存储的哈希无法解析时返回错误。
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    if is_bcrypt(hash) {
        return Ok(bcrypt::verify(password, hash)?);
    }

    let parsed = PasswordHash::new(hash).map_err(Error::PasswordHash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::PasswordHash(e)),
    }
}

/// 在阻塞线程池中校验密码，避免占用异步执行器
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_password("s3cret", "plain-text").is_err());
    }

    #[test]
    fn test_verify_bcrypt_hash() {
        let hash = bcrypt::hash("s3cret", 4).unwrap();
        assert!(hash.starts_with("$2b$"));
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());

        // 其他实现常用 $2a$ 前缀，算法相同
        let legacy = hash.replacen("$2b$", "$2a$", 1);
        assert!(verify_password("s3cret", &legacy).unwrap());
    }

    #[test]
    fn test_malformed_bcrypt_hash_is_error() {
        assert!(matches!(
            verify_password("s3cret", "$2a$10$tooshort"),
            Err(Error::Bcrypt(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_blocking() {
        let hash = hash_password("s3cret").unwrap();
        assert!(
            verify_password_blocking("s3cret".into(), hash)
                .await
                .unwrap()
        );
    }
}
