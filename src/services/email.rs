//! Email notifications

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// Outgoing message sink
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> AppResult<()>;
}

/// SMTP delivery
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, to: &str, subject: &str, html_body: &str) -> AppResult<Message> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Public Library");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }

    fn transport(&self) -> AppResult<SmtpTransport> {
        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) = (
            &self.config.smtp_username,
            &self.config.smtp_password,
        ) {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}

#[async_trait]
impl Notifier for EmailService {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> AppResult<()> {
        let email = self.build_message(to, subject, html_body)?;
        let mailer = self.transport()?;

        // The SMTP transport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        tracing::debug!(to, subject, "Email sent");
        Ok(())
    }
}

/// Used when email delivery is disabled: messages are only logged
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> AppResult<()> {
        tracing::info!(to, subject, body_len = html_body.len(), "Email delivery disabled, not sending");
        Ok(())
    }
}

/// HTML body of the email confirmation message
pub fn confirmation_email_body(confirmation_link: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <title>Confirm Your Email</title>
  </head>
  <body style="font-family: Arial, sans-serif; background-color: #f4f4f4;">
    <div style="max-width: 600px; margin: 30px auto; background-color: #ffffff; padding: 20px; border-radius: 8px;">
      <h1>Confirm Your Email Address</h1>
      <p>Hello,</p>
      <p>Thank you for registering with the library. To complete your registration, please confirm your email address by clicking the button below:</p>
      <p style="text-align: center;">
        <a href="{link}" style="display: inline-block; padding: 12px 24px; background-color: #007bff; color: #ffffff; text-decoration: none; border-radius: 5px;">Confirm Email</a>
      </p>
      <p>If the button does not work, copy and paste the following link into your browser:</p>
      <p>{link}</p>
      <p style="font-size: 0.9em; color: #777777;">This link expires in 24 hours. If you did not register, please ignore this email.</p>
    </div>
  </body>
</html>"#,
        link = confirmation_link
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_body_contains_link() {
        let body = confirmation_email_body("https://ui.example/auth/confirmemail?token=abc");
        assert_eq!(
            body.matches("https://ui.example/auth/confirmemail?token=abc").count(),
            2
        );
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let service = EmailService::new(EmailConfig::default());
        assert!(service.build_message("not an address", "Hi", "<p>Hi</p>").is_err());
        assert!(service
            .build_message("reader@example.org", "Hi", "<p>Hi</p>")
            .is_ok());
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        LogNotifier
            .send("reader@example.org", "Subject", "<p>body</p>")
            .await
            .unwrap();
    }
}
