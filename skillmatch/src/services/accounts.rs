//! Registration and authentication

use anyhow::{Context, Result, anyhow};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sqlx::SqlitePool;

use crate::config::repository::users::{self, NewUser};
use crate::forms::{FormErrors, ProviderAccount, SeekerRegistration};
use crate::models::{Role, User};

/// Outcome of a registration attempt
pub type Registration = std::result::Result<User, FormErrors>;

/// Hash a password into an argon2 PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("Failed to hash password: {}", e))
}

/// Verify a password against a stored PHC string. Unparseable hashes never verify.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Run CPU-heavy password work on the blocking pool
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("Password hashing task failed")
}

/// Insert the account, reporting a lost race on the username as a form error
async fn insert_or_taken(
    pool: &SqlitePool,
    user: &NewUser<'_>,
) -> Result<std::result::Result<i64, FormErrors>> {
    match users::insert_user(pool, user).await {
        Ok(id) => Ok(Ok(id)),
        Err(e) if users::is_unique_violation(&e) => {
            log::info!("Username '{}' was taken concurrently", user.username);
            Ok(Err(FormErrors::single("Username already taken.")))
        }
        Err(e) => Err(e),
    }
}

async fn create_account(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
    location: &str,
    role: Role,
) -> Result<Registration> {
    if users::username_exists(pool, username).await? {
        return Ok(Err(FormErrors::single("Username already taken.")));
    }

    let password = password.to_string();
    let password_hash = run_blocking(move || hash_password(&password)).await??;
    let inserted = insert_or_taken(
        pool,
        &NewUser {
            username,
            email,
            password_hash: &password_hash,
            role,
            location,
        },
    )
    .await?;
    let id = match inserted {
        Ok(id) => id,
        Err(errors) => return Ok(Err(errors)),
    };

    log::info!("Registered {} account '{}' (id {})", role.as_db(), username, id);

    let user = users::get_user(pool, id)
        .await?
        .ok_or_else(|| anyhow!("User {} vanished after insert", id))?;
    Ok(Ok(user))
}

/// Register a service seeker
pub async fn register_seeker(pool: &SqlitePool, input: &SeekerRegistration) -> Result<Registration> {
    create_account(
        pool,
        &input.username,
        &input.email,
        &input.password,
        &input.location,
        Role::Seeker,
    )
    .await
}

/// Onboarding step 1: create the provider account (no profile yet)
pub async fn register_provider_account(
    pool: &SqlitePool,
    input: &ProviderAccount,
) -> Result<Registration> {
    create_account(pool, &input.username, &input.email, &input.password, "", Role::Provider).await
}

/// Look up an active account by credentials
pub async fn authenticate(pool: &SqlitePool, username: &str, password: &str) -> Result<Option<User>> {
    let Some(user) = users::get_user_by_username(pool, username.trim()).await? else {
        return Ok(None);
    };

    if !user.is_active {
        log::info!("Rejected login for inactive account '{}'", user.username);
        return Ok(None);
    }

    let password = password.to_string();
    let stored_hash = user.password_hash.clone();
    if run_blocking(move || verify_password(&password, &stored_hash)).await? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// Admin: enable or disable an account. Disabled accounts cannot log in and
/// their open sessions stop resolving to a user.
pub async fn set_active(pool: &SqlitePool, username: &str, active: bool) -> Result<User> {
    let user = users::get_user_by_username(pool, username)
        .await?
        .ok_or_else(|| anyhow!("No account named '{}'", username))?;
    users::set_user_active(pool, user.id, active).await?;
    log::info!("Account '{}' active set to {}", user.username, active);
    Ok(User {
        is_active: active,
        ..user
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::memory_pool;

    fn seeker(username: &str) -> SeekerRegistration {
        SeekerRegistration {
            username: username.to_string(),
            email: format!("{}@example.test", username),
            password: "hunter22".to_string(),
            location: "Nairobi".to_string(),
        }
    }

    #[test]
    fn test_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let pool = memory_pool().await.unwrap();
        let first = register_seeker(&pool, &seeker("alice")).await.unwrap().unwrap();
        assert_eq!(first.role, Role::Seeker);
        assert_eq!(first.location, "Nairobi");

        let second = register_seeker(&pool, &seeker("alice")).await.unwrap();
        assert_eq!(second.unwrap_err().messages(), &["Username already taken.".to_string()]);
    }

    #[tokio::test]
    async fn test_insert_race_reports_taken_username() {
        let pool = memory_pool().await.unwrap();
        register_seeker(&pool, &seeker("carol")).await.unwrap().unwrap();

        // Skips the existence check, as a concurrent registration would
        let duplicate = NewUser {
            username: "carol",
            email: "other@example.test",
            password_hash: "x",
            role: Role::Seeker,
            location: "",
        };
        let outcome = insert_or_taken(&pool, &duplicate).await.unwrap();
        assert_eq!(outcome.unwrap_err().messages(), &["Username already taken.".to_string()]);
    }

    #[tokio::test]
    async fn test_password_work_leaves_the_runtime_thread() {
        let caller = std::thread::current().id();
        let worker = run_blocking(|| std::thread::current().id()).await.unwrap();
        assert_ne!(caller, worker);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let pool = memory_pool().await.unwrap();
        let account = ProviderAccount {
            username: "acme".into(),
            email: "ops@acme.test".into(),
            password: "s3cret!".into(),
        };
        let user = register_provider_account(&pool, &account).await.unwrap().unwrap();
        assert!(user.is_provider());

        assert!(authenticate(&pool, "acme", "s3cret!").await.unwrap().is_some());
        assert!(authenticate(&pool, "acme", "nope").await.unwrap().is_none());
        assert!(authenticate(&pool, "ghost", "s3cret!").await.unwrap().is_none());

        users::set_user_active(&pool, user.id, false).await.unwrap();
        assert!(authenticate(&pool, "acme", "s3cret!").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_active() {
        let pool = memory_pool().await.unwrap();
        register_seeker(&pool, &seeker("bob")).await.unwrap().unwrap();

        let user = set_active(&pool, "bob", false).await.unwrap();
        assert!(!user.is_active);
        assert!(authenticate(&pool, "bob", "hunter22").await.unwrap().is_none());

        set_active(&pool, "bob", true).await.unwrap();
        assert!(authenticate(&pool, "bob", "hunter22").await.unwrap().is_some());
        assert!(set_active(&pool, "nobody", true).await.is_err());
    }
}
