use crate::domain::appointment::Appointment;
use crate::domain::ports::EmailProviderRef;
use crate::error::{ConfirmationError, ProviderError, Result};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument};

/// Rendered confirmation email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEmail {
    pub subject: String,
    pub html_body: String,
}

impl ConfirmationEmail {
    pub fn render(appointment: &Appointment) -> Self {
        let date = appointment.appointment_date.format("%A, %B %-d, %Y").to_string();
        let time = appointment.appointment_time.format("%H:%M").to_string();
        let subject = format!(
            "Appointment Confirmed: {} on {}",
            appointment.appointment_type,
            appointment.appointment_date.format("%Y-%m-%d")
        );

        let html_body = format!(
            concat!(
                "<h1>Your appointment is confirmed</h1>",
                "<p>Dear {name},</p>",
                "<p>Thank you for your payment. Your appointment has been booked.</p>",
                "<table>",
                "<tr><td>Appointment type</td><td>{kind}</td></tr>",
                "<tr><td>Date</td><td>{date}</td></tr>",
                "<tr><td>Time</td><td>{time}</td></tr>",
                "<tr><td>Amount paid</td><td>{amount}</td></tr>",
                "<tr><td>Confirmation ID</td><td>{id}</td></tr>",
                "</table>",
                "<p>Please keep this confirmation ID for your records.</p>"
            ),
            name = escape_html(&appointment.patient_name),
            kind = escape_html(&appointment.appointment_type),
            date = date,
            time = time,
            amount = appointment.total(),
            id = appointment.id,
        );

        Self { subject, html_body }
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Best-effort delivery of the confirmation email.
pub struct NotificationDispatcher {
    provider: EmailProviderRef,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(provider: EmailProviderRef, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Sends the confirmation and returns the provider's message id.
    #[instrument(skip_all, fields(appointment_id = %appointment.id))]
    pub async fn send_confirmation(
        &self,
        recipient_email: &str,
        appointment: &Appointment,
    ) -> Result<String> {
        let email = ConfirmationEmail::render(appointment);
        let sent = timeout(
            self.timeout,
            self.provider
                .send(recipient_email, &email.subject, &email.html_body),
        )
        .await;

        let message_id = match sent {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        }
        .map_err(|source| ConfirmationError::Notification {
            appointment_id: appointment.id.to_string(),
            source,
        })?;

        info!(appointment_id = %appointment.id, message_id = %message_id, "confirmation email sent");
        Ok(message_id)
    }
}
