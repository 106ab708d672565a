use anyhow::Context;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;

/// Outbound transactional mail. When SMTP is not configured the service
/// logs and drops messages instead of failing the calling request, so a
/// bare development setup still works end to end.
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    pub async fn send_welcome(&self, to: &str, name: &str, account_url: &str) -> anyhow::Result<()> {
        let body = format!(
            "Hi {name},\n\n\
             Welcome to Trailhead, we're glad to have you.\n\
             Manage your account here: {account_url}\n\n\
             The Trailhead team"
        );
        self.send(to, "Welcome to Trailhead!", body).await
    }

    pub async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        reset_url: &str,
    ) -> anyhow::Result<()> {
        let body = format!(
            "Hi {name},\n\n\
             Forgot your password? Submit a PATCH request with your new password to:\n\
             {reset_url}\n\n\
             This link is valid for 10 minutes. If you didn't request a reset,\n\
             please ignore this email.\n\n\
             The Trailhead team"
        );
        self.send(to, "Your password reset token (valid for 10 minutes)", body)
            .await
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> anyhow::Result<()> {
        let (Some(host), Some(username), Some(password)) = (
            self.config.smtp_host.as_deref(),
            self.config.smtp_username.as_deref(),
            self.config.smtp_password.as_deref(),
        ) else {
            tracing::warn!(to, subject, "SMTP not configured, dropping outbound email");
            return Ok(());
        };

        let message = Message::builder()
            .from(
                format!("{} <{}>", self.config.from_name, self.config.from_address)
                    .parse()
                    .context("invalid sender address")?,
            )
            .to(to.parse().context("invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("failed to build email")?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .context("failed to create SMTP transport")?
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .port(self.config.smtp_port)
            .build();

        transport
            .send(message)
            .await
            .context("failed to send email")?;

        tracing::debug!(to, subject, "email sent");
        Ok(())
    }
}
