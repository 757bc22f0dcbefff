use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password, MIN_PASSWORD_LEN},
    principal::Principal,
};
use crate::{
    config::AdminBootstrap,
    error::AppError,
    users::{NewUser, Role, User, UserRegistry},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn issue(keys: &JwtKeys, user: User) -> Result<AuthResponse, AppError> {
    let principal = Principal::new(user.id, user.role);
    Ok(AuthResponse {
        access_token: keys.sign_access(&principal)?,
        refresh_token: keys.sign_refresh(&principal)?,
        user: user.into(),
    })
}

/// Self-registration always yields a regular user.
pub async fn register(
    users: &dyn UserRegistry,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> Result<AuthResponse, AppError> {
    let email = req.email.trim().to_lowercase();
    let name = req.name.trim();

    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("Password too short"));
    }
    if users.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(req.password).await?;
    let user = users
        .create(NewUser {
            name,
            email: &email,
            role: Role::User,
            password_hash: &hash,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    issue(keys, user)
}

pub async fn login(
    users: &dyn UserRegistry,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<AuthResponse, AppError> {
    let email = req.email.trim().to_lowercase();
    let Some(user) = users.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::unauthorized("Invalid credentials"));
    };

    if !verify_password(req.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    info!(user_id = %user.id, "user logged in");
    issue(keys, user)
}

/// Re-reads the user so a changed role takes effect on the next token pair.
pub async fn refresh(
    users: &dyn UserRegistry,
    keys: &JwtKeys,
    refresh_token: &str,
) -> Result<AuthResponse, AppError> {
    let claims = keys
        .verify_refresh(refresh_token)
        .map_err(|e| AppError::unauthorized(e.to_string()))?;
    let user = users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;
    issue(keys, user)
}

pub async fn me(users: &dyn UserRegistry, principal: &Principal) -> Result<PublicUser, AppError> {
    users
        .find_by_id(principal.id)
        .await?
        .map(PublicUser::from)
        .ok_or_else(|| AppError::unauthorized("User not found"))
}

/// Creates the configured admin account unless its email is already taken.
pub async fn bootstrap_admin(users: &dyn UserRegistry, admin: &AdminBootstrap) -> anyhow::Result<()> {
    if let Some(existing) = users.find_by_email(&admin.email).await? {
        if existing.role != Role::Admin {
            warn!(email = %admin.email, "bootstrap admin email belongs to a regular user");
        }
        return Ok(());
    }
    let hash = hash_password(admin.password.clone()).await?;
    let user = users
        .create(NewUser {
            name: &admin.name,
            email: &admin.email,
            role: Role::Admin,
            password_hash: &hash,
        })
        .await?;
    info!(user_id = %user.id, email = %user.email, "admin account created");
    Ok(())
}
