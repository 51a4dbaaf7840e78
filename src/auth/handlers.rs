use axum::{
    extract::{FromRef, Path, State},
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, LoginRequest, MessageResponse, ResetPasswordRequest,
            SignupRequest, UserResponse, UsersResponse, VerifyEmailRequest,
        },
        password::{hash_password, verify_password},
        repo::User,
        session::{clear_session_cookie, session_cookie, AuthUser, SessionKeys},
        tokens,
    },
    error::AuthError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/verify-email", post(verify_email))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/:token", post(reset_password))
        .route("/check-auth", get(check_auth))
        .route("/users", get(fetch_users))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Register a new, unverified user.
///
/// A session is issued immediately, before the email is verified; this
/// mirrors the product's flow where signup logs the user in and verification
/// happens on the next screen.
#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() || payload.name.trim().is_empty()
    {
        return Err(AuthError::Validation("All fields are required"));
    }
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        return Err(AuthError::Validation("Invalid email address"));
    }

    let hash = hash_password(&payload.password)?;
    let code = tokens::verification_code();
    let expires_at = tokens::verification_code_expiry();

    // The unique index on email decides conflicts; no racy pre-check.
    let user = User::create(
        &state.db,
        &email,
        &hash,
        payload.name.trim(),
        &code,
        expires_at,
    )
    .await
    .map_err(AuthError::from_insert)?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(user.id)?;
    let cookie = session_cookie(&token, keys.ttl, state.config.cookie_secure)
        .map_err(anyhow::Error::from)?;

    let notifier = state.notifier.clone();
    let to = user.email.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.send_verification_email(&to, &code).await {
            warn!(error = %e, "failed to send verification email");
        }
    });

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(UserResponse {
            success: true,
            message: "User registered successfully. Please verify your email to complete the registration.",
            user,
        }),
    ))
}

/// Consume a pending verification code and activate the account.
#[instrument(skip(state, payload))]
async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.code.trim().is_empty() {
        return Err(AuthError::Validation("Verification code is required"));
    }

    // Single-statement consume: the code cannot verify twice, and expired or
    // unknown codes are indistinguishable to the caller.
    let user = User::consume_verification_code(&state.db, payload.code.trim())
        .await?
        .ok_or(AuthError::InvalidOrExpired("verification code"))?;

    let notifier = state.notifier.clone();
    let to = user.email.clone();
    let name = user.name.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.send_welcome_email(&to, &name).await {
            warn!(error = %e, "failed to send welcome email");
        }
    });

    info!(user_id = %user.id, "email verified");
    Ok(Json(MessageResponse {
        success: true,
        message: "Email verified successfully. Your account is now activated.",
    }))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation("Email and password are required"));
    }
    let email = normalize_email(&payload.email);

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(user.id)?;
    let cookie = session_cookie(&token, keys.ttl, state.config.cookie_secure)
        .map_err(anyhow::Error::from)?;

    User::record_login(&state.db, user.id).await?;

    info!(user_id = %user.id, "user logged in");
    Ok((
        [(SET_COOKIE, cookie)],
        Json(UserResponse {
            success: true,
            message: "Logged in successfully",
            user,
        }),
    ))
}

/// Clear the session cookie. The credential itself stays valid until its
/// natural expiry; there is no server-side revocation.
#[instrument(skip(state))]
async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = clear_session_cookie(state.config.cookie_secure);
    (
        [(SET_COOKIE, cookie)],
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully",
        }),
    )
}

/// Issue a reset token and email a reset link. A missing account is reported
/// as 404, matching the public API contract.
#[instrument(skip(state, payload))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.email.trim().is_empty() {
        return Err(AuthError::Validation("Email is required"));
    }
    let email = normalize_email(&payload.email);

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or(AuthError::NotFound)?;

    let token = tokens::reset_token();
    let expires_at = tokens::reset_token_expiry();
    User::set_reset_token(&state.db, user.id, &token, expires_at).await?;

    let reset_url = format!("{}/reset-password/{}", state.config.client_url, token);
    let notifier = state.notifier.clone();
    let to = user.email.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.send_password_reset_email(&to, &reset_url).await {
            warn!(error = %e, "failed to send password reset email");
        }
    });

    info!(user_id = %user.id, "password reset requested");
    Ok(Json(MessageResponse {
        success: true,
        message: "Password reset link sent to your email. Please check your inbox.",
    }))
}

/// Consume a reset token and replace the password.
#[instrument(skip(state, payload, token))]
async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if token.trim().is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation("Token and new password are required"));
    }
    if payload.password.len() < 8 {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters long",
        ));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::consume_reset_token(&state.db, token.trim(), &hash)
        .await?
        .ok_or(AuthError::InvalidOrExpired("reset token"))?;

    let notifier = state.notifier.clone();
    let to = user.email.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.send_reset_success_email(&to).await {
            warn!(error = %e, "failed to send reset success email");
        }
    });

    info!(user_id = %user.id, "password reset completed");
    Ok(Json(MessageResponse {
        success: true,
        message: "Password reset successful",
    }))
}

/// Resolve the session back into the full user record.
#[instrument(skip(state))]
async fn check_auth(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, AuthError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(Json(UserResponse {
        success: true,
        message: "Authenticated",
        user,
    }))
}

/// List all users, minus secrets. Admin only: the acting user's email must
/// match the configured admin email, checked server-side.
#[instrument(skip(state))]
async fn fetch_users(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, AuthError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    let is_admin = state
        .config
        .admin_email
        .as_deref()
        .is_some_and(|admin| admin == user.email);
    if !is_admin {
        warn!(user_id = %user.id, "non-admin attempted to list users");
        return Err(AuthError::Forbidden);
    }

    let users = User::list_all(&state.db).await?;
    Ok(Json(UsersResponse {
        success: true,
        users,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
        assert_eq!(normalize_email("a@x.com"), "a@x.com");
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ann@example.com"));
        assert!(is_valid_email("a@x.co"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a @x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn signup_requires_all_fields() {
        let state = AppState::fake();
        let err = signup(
            State(state),
            Json(SignupRequest {
                email: "a@x.com".into(),
                password: "longpassword".into(),
                name: "  ".into(),
            }),
        )
        .await
        .err()
        .expect("signup without a name must fail");
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn signup_rejects_malformed_email() {
        let state = AppState::fake();
        let err = signup(
            State(state),
            Json(SignupRequest {
                email: "not-an-email".into(),
                password: "longpassword".into(),
                name: "Ann".into(),
            }),
        )
        .await
        .err()
        .expect("signup with a malformed email must fail");
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn login_requires_email_and_password() {
        let state = AppState::fake();
        let err = login(
            State(state),
            Json(LoginRequest {
                email: "a@x.com".into(),
                password: "".into(),
            }),
        )
        .await
        .err()
        .expect("login without a password must fail");
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn verify_email_requires_code() {
        let state = AppState::fake();
        let err = verify_email(State(state), Json(VerifyEmailRequest { code: " ".into() }))
            .await
            .err()
            .expect("verify without a code must fail");
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn forgot_password_requires_email() {
        let state = AppState::fake();
        let err = forgot_password(
            State(state),
            Json(ForgotPasswordRequest { email: "".into() }),
        )
        .await
        .err()
        .expect("forgot-password without an email must fail");
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn reset_password_rejects_short_password_before_token_lookup() {
        let state = AppState::fake();
        let err = reset_password(
            State(state),
            Path(tokens::reset_token()),
            Json(ResetPasswordRequest {
                password: "short".into(),
            }),
        )
        .await
        .err()
        .expect("short password must fail even with a well-formed token");
        assert!(matches!(
            err,
            AuthError::Validation("Password must be at least 8 characters long")
        ));
    }
}
