// src/notify.rs

//! Change digest rendering and delivery.
//!
//! Rendering is a pure function so it can be tested without any
//! transport; delivery is a trait with a logging implementation and an
//! SMTP implementation behind the `smtp` feature. Delivery failure is
//! always the caller's problem to tolerate — the run must save its
//! state whether or not the digest went out.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ChangeEvent;

/// Render events as a plain-text digest, one line per event.
pub fn render_digest(events: &[ChangeEvent]) -> String {
    events
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trait for digest delivery backends.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a digest of this run's events.
    async fn notify(&self, events: &[ChangeEvent]) -> Result<()>;
}

/// Notifier that writes the digest to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, events: &[ChangeEvent]) -> Result<()> {
        log::info!("{} change(s) detected:", events.len());
        for line in render_digest(events).lines() {
            log::info!("{}", line);
        }
        Ok(())
    }
}

#[cfg(feature = "smtp")]
pub use smtp::SmtpNotifier;

#[cfg(feature = "smtp")]
mod smtp {
    use async_trait::async_trait;
    use lettre::message::header::ContentType;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

    use crate::error::{AppError, Result};
    use crate::models::{ChangeEvent, SmtpConfig};
    use crate::notify::{Notifier, render_digest};

    /// Notifier that emails the digest via SMTP (STARTTLS).
    pub struct SmtpNotifier {
        config: SmtpConfig,
    }

    impl SmtpNotifier {
        pub fn new(config: SmtpConfig) -> Self {
            Self { config }
        }

        fn build_message(&self, digest: String) -> Result<Message> {
            let mut builder = Message::builder()
                .from(
                    self.config
                        .from_address()
                        .parse()
                        .map_err(AppError::notify)?,
                )
                .subject(&self.config.subject)
                .header(ContentType::TEXT_PLAIN);

            for recipient in &self.config.to {
                builder = builder.to(recipient.parse().map_err(AppError::notify)?);
            }

            builder.body(digest).map_err(AppError::notify)
        }
    }

    #[async_trait]
    impl Notifier for SmtpNotifier {
        async fn notify(&self, events: &[ChangeEvent]) -> Result<()> {
            let message = self.build_message(render_digest(events))?;

            let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
                .map_err(AppError::notify)?
                .port(self.config.port)
                .credentials(Credentials::new(
                    self.config.username.clone(),
                    self.config.password.clone(),
                ))
                .build();

            mailer.send(message).await.map_err(AppError::notify)?;
            log::info!(
                "Digest of {} event(s) sent to {} recipient(s)",
                events.len(),
                self.config.to.len()
            );
            Ok(())
        }
    }
}
