//! Outbound mail port.

use leadpilot_types::error::IntegrationError;

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html_body: String,
}

pub trait Mailer: Send + Sync {
    /// Deliver `email`. An unconfigured mailer succeeds without sending.
    fn send(
        &self,
        email: &OutgoingEmail,
    ) -> impl std::future::Future<Output = Result<(), IntegrationError>> + Send;
}
