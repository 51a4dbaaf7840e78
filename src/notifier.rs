use axum::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

/// Outbound email collaborator. Delivery is best-effort: callers spawn sends
/// off the request path and a failed send never fails the triggering request.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verification_email(&self, to: &str, code: &str) -> anyhow::Result<()>;
    async fn send_welcome_email(&self, to: &str, name: &str) -> anyhow::Result<()>;
    async fn send_password_reset_email(&self, to: &str, reset_url: &str) -> anyhow::Result<()>;
    async fn send_reset_success_email(&self, to: &str) -> anyhow::Result<()>;
}

/// SMTP-backed notifier.
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpNotifier {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?
            .port(cfg.port)
            .credentials(Credentials::new(
                cfg.username.clone(),
                cfg.password.clone(),
            ))
            .build();
        Ok(Self {
            mailer,
            from: cfg.from_address.clone(),
        })
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)?;
        self.mailer.send(email).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_verification_email(&self, to: &str, code: &str) -> anyhow::Result<()> {
        let html = format!(
            "<p>Welcome to Eventflow! Your verification code is:</p>\
             <h2>{code}</h2>\
             <p>It expires in 24 hours.</p>"
        );
        self.send(to, "Verify your email", html).await
    }

    async fn send_welcome_email(&self, to: &str, name: &str) -> anyhow::Result<()> {
        let html = format!(
            "<p>Welcome to Eventflow, {name}!</p>\
             <p>Your account is verified. Get ready to explore, create, and enjoy events.</p>"
        );
        self.send(to, "Welcome to Eventflow!", html).await
    }

    async fn send_password_reset_email(&self, to: &str, reset_url: &str) -> anyhow::Result<()> {
        let html = format!(
            "<p>We received a request to reset your password.</p>\
             <p><a href=\"{reset_url}\">Reset your password</a></p>\
             <p>This link expires in 1 hour. If you did not request it, ignore this email.</p>"
        );
        self.send(to, "Reset your password", html).await
    }

    async fn send_reset_success_email(&self, to: &str) -> anyhow::Result<()> {
        let html = "<p>Your Eventflow password was changed successfully.</p>".to_string();
        self.send(to, "Password reset successful", html).await
    }
}

/// Development fallback used when SMTP is not configured: logs the intent
/// instead of sending. Verification codes are logged on purpose so local
/// signups can be completed; reset links carry their own secret and are not.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_email(&self, to: &str, code: &str) -> anyhow::Result<()> {
        info!(to = %to, code = %code, "verification email (log-only mode)");
        Ok(())
    }

    async fn send_welcome_email(&self, to: &str, name: &str) -> anyhow::Result<()> {
        info!(to = %to, name = %name, "welcome email (log-only mode)");
        Ok(())
    }

    async fn send_password_reset_email(&self, to: &str, _reset_url: &str) -> anyhow::Result<()> {
        info!(to = %to, "password reset email (log-only mode)");
        Ok(())
    }

    async fn send_reset_success_email(&self, to: &str) -> anyhow::Result<()> {
        info!(to = %to, "reset success email (log-only mode)");
        Ok(())
    }
}

/// No-op notifier for tests.
#[cfg(test)]
pub struct NullNotifier;

#[cfg(test)]
#[async_trait]
impl Notifier for NullNotifier {
    async fn send_verification_email(&self, _to: &str, _code: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn send_welcome_email(&self, _to: &str, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn send_password_reset_email(&self, _to: &str, _url: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn send_reset_success_email(&self, _to: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
