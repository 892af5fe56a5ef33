//! Hand-rolled mail relay client.
//!
//! Delivers one plaintext message per call by speaking SMTP directly to the
//! configured relay over TLS — no mail-sending crate, no fallback transport,
//! no queue. A failed delivery is reported once and never retried.

pub mod client;
pub mod message;
pub mod reply;

pub use client::SmtpError;

use once_cell::sync::Lazy;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::config::RelayConfig;
use client::{Envelope, EXCHANGE_TIMEOUT};

/// Operator misconfiguration detected before any connection is attempted.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum MailConfigError {
    #[error("contact recipient not configured (FOLIOD_CONTACT_RECIPIENT)")]
    MissingRecipient,
    #[error("mail relay not configured — set FOLIOD_RELAY_HOST, FOLIOD_RELAY_IDENTITY and FOLIOD_RELAY_SECRET")]
    MissingRelay,
}

/// Webpki root store, built once per process.
static TLS_CONFIG: Lazy<Arc<ClientConfig>> = Lazy::new(|| {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .expect("ring provider supports the default TLS versions")
    .with_root_certificates(roots)
    .with_no_client_auth();
    Arc::new(config)
});

/// One fully-configured relay endpoint.
#[derive(Debug)]
pub struct Mailer {
    host: String,
    port: u16,
    identity: String,
    secret: String,
    recipient: String,
    subject: String,
}

impl Mailer {
    /// Check the relay configuration is complete.
    ///
    /// Recipient first, then relay credentials — the same precedence the
    /// operator-facing messages imply.
    pub fn from_config(relay: &RelayConfig) -> Result<Self, MailConfigError> {
        let recipient = relay
            .recipient
            .clone()
            .ok_or(MailConfigError::MissingRecipient)?;
        let (host, identity, secret) = match (&relay.host, &relay.identity, &relay.secret) {
            (Some(h), Some(i), Some(s)) => (h.clone(), i.clone(), s.clone()),
            _ => return Err(MailConfigError::MissingRelay),
        };
        Ok(Self {
            host,
            port: relay.port,
            identity,
            secret,
            recipient,
            subject: relay.subject.clone(),
        })
    }

    /// Deliver one contact submission. The socket is closed on every exit
    /// path, success or failure.
    pub async fn send_contact(
        &self,
        name: &str,
        email: &str,
        body: &str,
    ) -> Result<(), SmtpError> {
        // Relays generally insist the envelope sender matches the
        // authenticated account; fall back to the visitor only when the
        // identity is not itself an address.
        let sender = if self.identity.contains('@') {
            self.identity.clone()
        } else {
            email.to_string()
        };

        let env = Envelope {
            host: self.host.clone(),
            identity: self.identity.clone(),
            secret: self.secret.clone(),
            sender,
            recipient: self.recipient.clone(),
            payload: message::build(&self.subject, name, email, &self.recipient, body),
        };

        let mut stream = self.connect().await?;
        let result = client::drive(&mut stream, &env).await;
        let _ = stream.shutdown().await;

        match &result {
            Ok(()) => debug!(relay = %self.host, "message delivered"),
            Err(e) => debug!(relay = %self.host, err = %e, "delivery aborted"),
        }
        result
    }

    async fn connect(
        &self,
    ) -> Result<tokio_rustls::client::TlsStream<TcpStream>, SmtpError> {
        let tcp = timeout(
            EXCHANGE_TIMEOUT,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| SmtpError::Timeout { stage: "connect" })?
        .map_err(SmtpError::Connect)?;

        let server_name = ServerName::try_from(self.host.clone())
            .map_err(|_| SmtpError::InvalidHost(self.host.clone()))?;
        let connector = TlsConnector::from(TLS_CONFIG.clone());

        timeout(EXCHANGE_TIMEOUT, connector.connect(server_name, tcp))
            .await
            .map_err(|_| SmtpError::Timeout { stage: "TLS handshake" })?
            .map_err(SmtpError::Tls)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
