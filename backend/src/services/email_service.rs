//! Outbound email (SMTP via lettre). Currently only password-reset mail.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Config;
use crate::error::{AppError, Result};

/// SMTP mailer.
pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    public_url: String,
}

impl EmailService {
    pub fn new(config: &Config) -> Result<Self> {
        let transport = if config.smtp_username.is_empty() {
            // Unauthenticated relay, used against local dev mailcatchers
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.smtp_host.as_str())
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| AppError::Config(format!("SMTP relay setup failed: {}", e)))?
                .credentials(Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.clone(),
                ))
                .build()
        };

        Ok(Self {
            transport,
            from: config.smtp_from.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send the password-reset link for a raw (un-hashed) token.
    pub async fn send_password_reset(&self, to: &str, raw_token: &str) -> Result<()> {
        let link = reset_link(&self.public_url, raw_token);
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| AppError::Config(format!("invalid SMTP from address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::Validation(format!("invalid recipient address: {}", e)))?)
            .subject("Reset your password")
            .header(ContentType::TEXT_PLAIN)
            .body(reset_body(&link))
            .map_err(|e| AppError::Email(format!("message build failed: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Email(format!("SMTP send failed: {}", e)))?;

        tracing::info!(recipient = to, "Password reset email sent");
        Ok(())
    }
}

fn reset_link(public_url: &str, raw_token: &str) -> String {
    format!("{}/reset-password?token={}", public_url, raw_token)
}

fn reset_body(link: &str) -> String {
    format!(
        "We received a request to reset your password.\n\n\
         Open the link below to choose a new one. The link expires in 1 hour.\n\n\
         {}\n\n\
         If you did not request this, you can ignore this email.\n",
        link
    )
}
