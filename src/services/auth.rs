// src/services/auth.rs

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RegisterRequest, User},
    utils::{
        clock::Clock,
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

/// Registration, login and token-subject validation over the `users` table.
pub struct AuthService<'a> {
    pool: &'a SqlitePool,
    config: &'a Config,
    clock: &'a dyn Clock,
}

impl<'a> AuthService<'a> {
    pub fn new(pool: &'a SqlitePool, config: &'a Config, clock: &'a dyn Clock) -> Self {
        Self {
            pool,
            config,
            clock,
        }
    }

    /// Creates a new account.
    ///
    /// Username and email must both be unused; the username is checked first.
    pub async fn register(&self, payload: RegisterRequest) -> Result<User, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ? OR email = ?");
        let existing = sqlx::query_as::<_, User>(&sql)
            .bind(&payload.username)
            .bind(&payload.email)
            .fetch_all(self.pool)
            .await?;

        if existing.iter().any(|u| u.username == payload.username) {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        if existing.iter().any(|u| u.email == payload.email) {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let hashed_password = hash_password(&payload.password)?;
        let now = self.clock.now();

        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&payload.username)
            .bind(&payload.email)
            .bind(&hashed_password)
            .bind(now)
            .bind(now)
            .fetch_one(self.pool)
            .await
            .map_err(|e| {
                // Lost a race with a concurrent registration.
                let email_taken = e
                    .as_database_error()
                    .filter(|db_err| db_err.is_unique_violation())
                    .map(|db_err| db_err.message().contains("users.email"));

                match email_taken {
                    Some(true) => AppError::Conflict("Email already exists".to_string()),
                    Some(false) => AppError::Conflict("Username already exists".to_string()),
                    None => {
                        tracing::error!("Failed to register user: {:?}", e);
                        AppError::from(e)
                    }
                }
            })?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Checks credentials and issues a signed access token.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, payload: LoginRequest) -> Result<String, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&payload.email)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Login DB error: {:?}", e);
                AppError::from(e)
            })?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(&payload.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(invalid_credentials());
        }

        let token = sign_jwt(&user, &self.config.jwt_secret, self.config.jwt_expiration)?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(token)
    }

    /// Resolves the user a verified token refers to.
    /// Fails if the subject is malformed or the account no longer exists.
    pub async fn validate_user(&self, claims: &Claims) -> Result<User, AppError> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("User no longer exists".to_string()))
    }
}

fn invalid_credentials() -> AppError {
    AppError::AuthError("Invalid credentials".to_string())
}
