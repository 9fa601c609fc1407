// Outbound mail for OTP codes and account decisions
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{info, warn};

use crate::config::SmtpConfig;
use crate::error::{AppError, Result};

/// A rendered plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    pub fn otp(to: &str, code: &str, expires_minutes: i64) -> Self {
        Self {
            to: to.trim().to_lowercase(),
            subject: "Your Digital House verification code".to_string(),
            body: format!(
                "Your verification code is {code}. It expires in {expires_minutes} minutes. Welcome to the community!"
            ),
        }
    }

    pub fn approval(to: &str, full_name: &str, remarks: Option<&str>) -> Self {
        let greeting = greeting(full_name);
        let remark_line = match remarks.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => format!("\n\nRemarks: {r}"),
            None => String::new(),
        };
        Self {
            to: to.trim().to_lowercase(),
            subject: "Your Digital House account has been approved".to_string(),
            body: format!(
                "{greeting},\n\nYour Digital House account has been approved. You can now sign in with your \
                 email and use the one-time code sent to your inbox. Welcome to the community!{remark_line}\n\n\
                 Digital House"
            ),
        }
    }

    pub fn rejection(to: &str, full_name: &str, remarks: Option<&str>) -> Self {
        let greeting = greeting(full_name);
        let remark_line = match remarks.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => format!("\n\nReason: {r}"),
            None => "\n\nPlease contact support if you have questions.".to_string(),
        };
        Self {
            to: to.trim().to_lowercase(),
            subject: "Your Digital House account was not approved".to_string(),
            body: format!(
                "{greeting},\n\nAfter review, your Digital House account was not approved at this time.\
                 {remark_line}\n\nDigital House"
            ),
        }
    }
}

fn greeting(full_name: &str) -> String {
    let name = full_name.trim();
    if name.is_empty() {
        "Hi".to_string()
    } else {
        format!("Hi {name}")
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<()>;
}

/// Async SMTP transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct EmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl EmailService {
    /// Build the mailer from configuration.
    ///
    /// An empty SMTP host selects no-op mode, which only logs.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid SMTP from address: {}", e)))?;

        let transport = if config.host.trim().is_empty() {
            warn!("SMTP host not configured; email service will operate in no-op mode");
            None
        } else {
            let builder = if config.starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            }
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to configure SMTP transport: {}", e)))?
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.connection_timeout_seconds)));

            let builder = if let (Some(username), Some(password)) = (&config.username, &config.password) {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        let Some(transport) = &self.transport else {
            info!(
                subject = %mail.subject,
                recipient = %mask_for_log(&mail.to),
                "Email service running in no-op mode; skipping actual send"
            );
            return Ok(());
        };

        let to = mail
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid recipient email address: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.as_str())
            .header(header::ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build email message: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to send email: {}", e)))?;
        info!(subject = %mail.subject, "email sent successfully");
        Ok(())
    }
}

/// `jo***@example.com` style masking for log lines.
pub fn mask_for_log(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let visible: String = local.chars().take(2).collect();
            format!("{visible}***@{domain}")
        }
        None => "***".to_string(),
    }
}
