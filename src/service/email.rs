//! Email Dispatch
//!
//! Outbound email collaborator. Flows hand a fully rendered
//! [`OutgoingEmail`] to an [`EmailDispatcher`]; the production dispatcher is
//! an async SMTP transport, and tests use [`RecordingMailer`]. Bodies are
//! rendered from embedded Tera templates by [`EmailTemplates`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tera::{Context, Tera};
use thiserror::Error;

use crate::config::EmailConfig;

/// Errors raised by email rendering and dispatch
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("template rendering failed: {0}")]
    Template(String),

    #[error("email transport failed: {0}")]
    Transport(String),
}

/// A rendered email ready for dispatch
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Outbound email collaborator. Dispatch failures are distinguishable from
/// success so callers can decide fatal-vs-non-fatal handling per flow.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(&self, mail: OutgoingEmail) -> Result<(), EmailError>;
}

/// SMTP-backed dispatcher
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_name: String,
    from_email: String,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let credentials =
            Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| EmailError::Transport(format!("failed to configure SMTP relay: {}", e)))?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_name: config.from_name.clone(),
            from_email: config.from_email.clone(),
        })
    }
}

#[async_trait]
impl EmailDispatcher for SmtpMailer {
    async fn send(&self, mail: OutgoingEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                format!("{} <{}>", self.from_name, self.from_email)
                    .parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("from address: {}", e)))?,
            )
            .to(mail
                .recipient
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("recipient: {}", e)))?)
            .subject(&mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| EmailError::Transport(format!("failed to build message: {}", e)))?;

        match self.transport.send(message).await {
            Ok(_) => {
                log::info!("email sent to {}", mail.recipient);
                Ok(())
            }
            Err(e) => {
                log::error!("failed to send email to {}: {}", mail.recipient, e);
                Err(EmailError::Transport(e.to_string()))
            }
        }
    }
}

/// Embedded plain-text templates for the identity flows
pub struct EmailTemplates {
    tera: Tera,
    frontend_base_url: String,
}

const VERIFICATION_CODE_TEMPLATE: &str = "\
Hello!

Your verification code is: {{ verification_code }}

This code will expire in {{ expires_in_minutes }} minutes.

If you didn't request this code, please ignore this email.
";

const VERIFICATION_SUCCESS_TEMPLATE: &str = "\
Congratulations!

Your email has been successfully verified. You can now log in to your account.

Login here: {{ login_url }}
";

const PASSWORD_RESET_TEMPLATE: &str = "\
Hello {{ full_name }},

You recently requested to reset your password. Click the link below to reset it:

{{ reset_password_url }}

This link will expire in {{ expires_in_minutes }} minutes.

If you didn't request this, please ignore this email.
";

const PASSWORD_CHANGED_TEMPLATE: &str = "\
Hello {{ full_name }},

Your password has been successfully changed.

You can now login with your new password here: {{ login_url }}

If you didn't make this change, please contact support immediately.
";

impl EmailTemplates {
    /// Build the template set; `frontend_base_url` is the base of the links
    /// embedded in the bodies
    pub fn new(frontend_base_url: &str) -> Result<Self, EmailError> {
        let mut tera = Tera::default();
        tera.add_raw_templates([
            ("verification_code.txt", VERIFICATION_CODE_TEMPLATE),
            ("verification_success.txt", VERIFICATION_SUCCESS_TEMPLATE),
            ("password_reset.txt", PASSWORD_RESET_TEMPLATE),
            ("password_changed.txt", PASSWORD_CHANGED_TEMPLATE),
        ])
        .map_err(|e| EmailError::Template(e.to_string()))?;

        Ok(Self {
            tera,
            frontend_base_url: frontend_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn verification_code(
        &self,
        code: &str,
        expires_in_minutes: i64,
    ) -> Result<String, EmailError> {
        let mut context = Context::new();
        context.insert("verification_code", code);
        context.insert("expires_in_minutes", &expires_in_minutes);
        self.render("verification_code.txt", &context)
    }

    pub fn verification_success(&self) -> Result<String, EmailError> {
        let mut context = Context::new();
        context.insert("login_url", &self.login_url());
        self.render("verification_success.txt", &context)
    }

    pub fn password_reset(
        &self,
        full_name: &str,
        reset_token: &str,
        expires_in_minutes: i64,
    ) -> Result<String, EmailError> {
        let mut context = Context::new();
        context.insert("full_name", full_name);
        context.insert("reset_password_url", &self.reset_password_url(reset_token));
        context.insert("expires_in_minutes", &expires_in_minutes);
        self.render("password_reset.txt", &context)
    }

    pub fn password_changed(&self, full_name: &str) -> Result<String, EmailError> {
        let mut context = Context::new();
        context.insert("full_name", full_name);
        context.insert("login_url", &self.login_url());
        self.render("password_changed.txt", &context)
    }

    fn login_url(&self) -> String {
        format!("{}/login", self.frontend_base_url)
    }

    fn reset_password_url(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.frontend_base_url, token)
    }

    fn render(&self, name: &str, context: &Context) -> Result<String, EmailError> {
        self.tera
            .render(name, context)
            .map_err(|e| EmailError::Template(e.to_string()))
    }
}

/// Dispatcher double that records every send and can be told to fail, used
/// by the service tests
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `send` fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of everything dispatched so far
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .map(|mails| mails.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EmailDispatcher for RecordingMailer {
    async fn send(&self, mail: OutgoingEmail) -> Result<(), EmailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::Transport("simulated dispatch failure".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail);
        }
        Ok(())
    }
}
