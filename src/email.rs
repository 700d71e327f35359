use anyhow::{Context, Result};
use lettre::{
    message::{header, Attachment, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use tracing::info;

use crate::config::Config;
use crate::error::DomainError;
use crate::models::{Client, Company, Invoice};

/// SMTP delivery for rendered invoices.
pub struct Mailer {
    transport: SmtpTransport,
    from: String,
}

impl Mailer {
    /// Build a mailer from configuration. Fails when any of the SMTP
    /// settings is missing rather than attempting an unauthenticated send.
    pub fn from_config(config: &Config) -> Result<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| DomainError::validation("SMTP_HOST is not configured"))?;
        let username = config
            .smtp_username
            .as_deref()
            .ok_or_else(|| DomainError::validation("SMTP_USERNAME is not configured"))?;
        let password = config
            .smtp_password
            .as_deref()
            .ok_or_else(|| DomainError::validation("SMTP_PASSWORD is not configured"))?;

        let creds = Credentials::new(username.to_string(), password.to_string());
        let transport = SmtpTransport::relay(host)?.credentials(creds).build();

        Ok(Self {
            transport,
            from: config.smtp_from.clone(),
        })
    }

    /// Email an invoice PDF to the invoice's client. The client must have an
    /// email address on record; the caller stamps the status change after a
    /// successful send.
    pub fn send_invoice(
        &self,
        invoice: &Invoice,
        client: &Client,
        company: &Company,
        pdf: Vec<u8>,
        filename: &str,
    ) -> Result<()> {
        let recipient = client
            .email
            .as_deref()
            .ok_or(DomainError::MissingClientEmail(client.id))?;

        let subject = format!("Invoice {} from {}", invoice.invoice_number, company.name);
        let body = format!(
            "Dear {},\n\n\
            Please find attached invoice {}.\n\n\
            Issue date: {}\n\
            Due date: {}\n\n\
            Thank you for your business.\n\n\
            {}",
            client.name,
            invoice.invoice_number,
            invoice.issue_date.format("%Y-%m-%d"),
            invoice.due_date.format("%Y-%m-%d"),
            company.name,
        );

        let email = Message::builder()
            .from(self.from.parse().context("invalid sender address")?)
            .to(recipient.parse().context("invalid recipient address")?)
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body))
                    .singlepart(
                        Attachment::new(filename.to_string())
                            .body(pdf, header::ContentType::parse(mime::APPLICATION_PDF.as_ref())?),
                    ),
            )?;

        self.transport.send(&email)?;
        info!(invoice = %invoice.invoice_number, to = recipient, "invoice email sent");

        Ok(())
    }
}
