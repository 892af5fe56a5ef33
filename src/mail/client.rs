//! The delivery state machine.
//!
//! One send is a scripted exchange: every stage writes a command, blocks for
//! a classified reply, and either transitions or aborts. The stages form a
//! straight line —
//!
//! ```text
//! Connect → Greeted → Identified → AuthUser → AuthPass → Authenticated
//!         → SenderAccepted → RecipientAccepted → BodySent → Delivered
//! ```
//!
//! — and every stage shares the same timeout and abort handling. A failure
//! code, malformed line, transport error or timeout at any stage aborts the
//! whole send; nothing later is attempted. The only exception is the final
//! QUIT, which is best-effort.
//!
//! The driver is generic over the stream so tests can run it against an
//! in-memory relay; production wraps a TLS socket around it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use super::reply::{Reply, ReplyError, ReplyParser};

/// Bound on each command/response exchange.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Everything one delivery needs: connection identity, envelope addresses
/// and the fully-escaped DATA payload.
#[derive(Debug)]
pub(crate) struct Envelope {
    /// Relay hostname, echoed in EHLO.
    pub host: String,
    /// AUTH LOGIN account identity.
    pub identity: String,
    /// AUTH LOGIN account secret.
    pub secret: String,
    /// Envelope sender for MAIL FROM.
    pub sender: String,
    /// Envelope recipient for RCPT TO.
    pub recipient: String,
    /// Full message, dot-stuffed and terminated by the lone-dot line.
    pub payload: String,
}

/// Errors that abort a delivery. All of them classify as a delivery
/// failure at the API boundary — never a fatal process error.
#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
    #[error("could not reach the mail relay: {0}")]
    Connect(#[source] std::io::Error),
    #[error("TLS handshake with the mail relay failed: {0}")]
    Tls(#[source] std::io::Error),
    #[error("invalid relay host name: {0}")]
    InvalidHost(String),
    #[error("timed out waiting for the mail relay during {stage}")]
    Timeout { stage: &'static str },
    #[error("relay closed the connection")]
    Closed,
    #[error("relay rejected {stage}: {reply}")]
    Rejected { stage: &'static str, reply: String },
    #[error("unexpected relay response during {stage}: {reply}")]
    Unexpected { stage: &'static str, reply: String },
    #[error(transparent)]
    Malformed(#[from] ReplyError),
    #[error("relay connection error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reply class a stage requires to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// 2xx — action completed.
    Completed,
    /// 3xx — continuation prompt.
    Intermediate,
}

/// One variant per stage of the exchange. Each stage knows what it sends,
/// what reply class it requires, and where it goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryState {
    Connect,
    Greeted,
    Identified,
    AuthUser,
    AuthPass,
    Authenticated,
    SenderAccepted,
    RecipientAccepted,
    BodySent,
    Delivered,
}

impl DeliveryState {
    /// Bytes to write on entering this stage. `None` for the implicit
    /// transport handshake — the relay speaks first.
    fn command(&self, env: &Envelope) -> Option<Vec<u8>> {
        match self {
            DeliveryState::Connect => None,
            DeliveryState::Greeted => Some(format!("EHLO {}\r\n", env.host).into_bytes()),
            DeliveryState::Identified => Some(b"AUTH LOGIN\r\n".to_vec()),
            DeliveryState::AuthUser => {
                Some(format!("{}\r\n", BASE64.encode(&env.identity)).into_bytes())
            }
            DeliveryState::AuthPass => {
                Some(format!("{}\r\n", BASE64.encode(&env.secret)).into_bytes())
            }
            DeliveryState::Authenticated => {
                Some(format!("MAIL FROM:<{}>\r\n", env.sender).into_bytes())
            }
            DeliveryState::SenderAccepted => {
                Some(format!("RCPT TO:<{}>\r\n", env.recipient).into_bytes())
            }
            DeliveryState::RecipientAccepted => Some(b"DATA\r\n".to_vec()),
            DeliveryState::BodySent => Some(env.payload.clone().into_bytes()),
            DeliveryState::Delivered => Some(b"QUIT\r\n".to_vec()),
        }
    }

    fn expects(&self) -> Expect {
        match self {
            DeliveryState::Identified
            | DeliveryState::AuthUser
            | DeliveryState::RecipientAccepted => Expect::Intermediate,
            _ => Expect::Completed,
        }
    }

    fn next(&self) -> Option<DeliveryState> {
        match self {
            DeliveryState::Connect => Some(DeliveryState::Greeted),
            DeliveryState::Greeted => Some(DeliveryState::Identified),
            DeliveryState::Identified => Some(DeliveryState::AuthUser),
            DeliveryState::AuthUser => Some(DeliveryState::AuthPass),
            DeliveryState::AuthPass => Some(DeliveryState::Authenticated),
            DeliveryState::Authenticated => Some(DeliveryState::SenderAccepted),
            DeliveryState::SenderAccepted => Some(DeliveryState::RecipientAccepted),
            DeliveryState::RecipientAccepted => Some(DeliveryState::BodySent),
            DeliveryState::BodySent => Some(DeliveryState::Delivered),
            DeliveryState::Delivered => None,
        }
    }

    /// Stage label for errors and trace logs. Never includes payload bytes,
    /// so credentials stay out of logs.
    fn name(&self) -> &'static str {
        match self {
            DeliveryState::Connect => "greeting",
            DeliveryState::Greeted => "EHLO",
            DeliveryState::Identified => "AUTH LOGIN",
            DeliveryState::AuthUser => "AUTH username",
            DeliveryState::AuthPass => "AUTH password",
            DeliveryState::Authenticated => "MAIL FROM",
            DeliveryState::SenderAccepted => "RCPT TO",
            DeliveryState::RecipientAccepted => "DATA",
            DeliveryState::BodySent => "message body",
            DeliveryState::Delivered => "QUIT",
        }
    }
}

/// Run the full exchange over an established stream.
///
/// The caller owns the stream and is responsible for shutting it down on
/// every exit path.
pub(crate) async fn drive<S>(stream: &mut S, env: &Envelope) -> Result<(), SmtpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut parser = ReplyParser::new();
    let mut state = DeliveryState::Connect;

    loop {
        tracing::trace!(stage = state.name(), "smtp exchange");
        let outcome = exchange(stream, &mut parser, &state, env).await;

        match outcome {
            Ok(_) => {}
            // QUIT failures are ignored; the message is already accepted.
            Err(e) if state == DeliveryState::Delivered => {
                tracing::debug!(err = %e, "relay QUIT failed (ignored)");
            }
            Err(e) => return Err(e),
        }

        match state.next() {
            Some(next) => state = next,
            None => return Ok(()),
        }
    }
}

/// Send one stage's command and block until a matching reply class arrives,
/// bounded by [`EXCHANGE_TIMEOUT`].
async fn exchange<S>(
    stream: &mut S,
    parser: &mut ReplyParser,
    state: &DeliveryState,
    env: &Envelope,
) -> Result<Reply, SmtpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let stage = state.name();
    let reply = timeout(EXCHANGE_TIMEOUT, async {
        if let Some(bytes) = state.command(env) {
            stream.write_all(&bytes).await?;
            stream.flush().await?;
        }
        read_reply(stream, parser).await
    })
    .await
    .map_err(|_| SmtpError::Timeout { stage })??;

    if !reply.is_positive() {
        return Err(SmtpError::Rejected {
            stage,
            reply: reply.last_line().to_string(),
        });
    }
    let class_ok = match state.expects() {
        Expect::Completed => reply.is_completed(),
        Expect::Intermediate => reply.is_intermediate(),
    };
    if !class_ok {
        return Err(SmtpError::Unexpected {
            stage,
            reply: reply.last_line().to_string(),
        });
    }
    Ok(reply)
}

/// Read until the parser has a complete reply. Replies may arrive in any
/// number of fragments; leftovers from a previous read are drained first.
async fn read_reply<S>(stream: &mut S, parser: &mut ReplyParser) -> Result<Reply, SmtpError>
where
    S: AsyncRead + Unpin,
{
    if let Some(reply) = parser.push(&[])? {
        return Ok(reply);
    }
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(SmtpError::Closed);
        }
        if let Some(reply) = parser.push(&chunk[..n])? {
            return Ok(reply);
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
