//! SMTP mailer for meeting confirmations.
//!
//! Uses lettre's async STARTTLS transport. Without SMTP credentials the
//! mailer is a no-op that reports success.

use lettre::message::{Mailbox, Message, SinglePart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use secrecy::ExposeSecret;
use tracing::{debug, info};

use leadpilot_core::integration::mail::{Mailer, OutgoingEmail};
use leadpilot_types::config::EmailConfig;
use leadpilot_types::error::IntegrationError;

struct Relay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

/// SMTP mailer, or a no-op when credentials are missing.
pub struct SmtpMailer {
    relay: Option<Relay>,
}

impl SmtpMailer {
    pub fn from_config(config: &EmailConfig) -> Result<Self, IntegrationError> {
        let (Some(username), Some(password)) = (&config.username, &config.password) else {
            info!("SMTP credentials not configured, confirmation emails disabled");
            return Ok(Self::disabled());
        };

        let from = sender(config)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| IntegrationError::Transport(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ))
            .build();

        Ok(Self {
            relay: Some(Relay { transport, from }),
        })
    }

    pub fn disabled() -> Self {
        Self { relay: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.relay.is_some()
    }
}

fn sender(config: &EmailConfig) -> Result<Mailbox, IntegrationError> {
    let address = config
        .from_email
        .parse::<Address>()
        .map_err(|e| IntegrationError::InvalidMessage(format!("invalid sender address: {e}")))?;
    Ok(Mailbox::new(Some(config.from_name.clone()), address))
}

/// Assemble the MIME message.
pub fn build_message(from: &Mailbox, email: &OutgoingEmail) -> Result<Message, IntegrationError> {
    let address = email
        .to_email
        .parse::<Address>()
        .map_err(|e| IntegrationError::InvalidMessage(format!("invalid recipient address: {e}")))?;
    let to = Mailbox::new(email.to_name.clone(), address);

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(&email.subject)
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(email.html_body.clone()),
        )
        .map_err(|e| IntegrationError::InvalidMessage(e.to_string()))
}

impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), IntegrationError> {
        let Some(relay) = &self.relay else {
            debug!(to = %email.to_email, "mailer disabled, skipping email");
            return Ok(());
        };

        let message = build_message(&relay.from, email)?;
        relay
            .transport
            .send(message)
            .await
            .map_err(|e| IntegrationError::Transport(format!("failed to send email: {e}")))?;
        debug!(to = %email.to_email, subject = %email.subject, "email sent");
        Ok(())
    }
}
