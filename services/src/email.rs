//! Outbound mail for relayed mentor messages.
//!
//! [`Mailer`] is the seam the relay service sends through. [`SmtpMailer`] delivers via
//! SMTP using `lettre`; [`RecordingMailer`] keeps messages in memory and is used by tests
//! and by local runs without an SMTP host.
//!
//! Transport failures are split in two: [`MailError::RecipientsRefused`] when the server
//! rejects a recipient at `RCPT TO` (or a recipient address does not parse), and
//! [`MailError::Other`] for everything else, including a rejected sender.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{AsyncSmtpConnection, TlsParameters},
        commands::{Data, Mail, Rcpt},
        extension::ClientId,
        Error as SmtpError,
    },
    Message,
};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use util::config;

const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

const AUTH_MECHANISMS: [Mechanism; 2] = [Mechanism::Plain, Mechanism::Login];

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    /// Sender address; the configured display name is prepended when sending.
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment: Option<MailAttachment>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MailError {
    #[error("{0}")]
    RecipientsRefused(String),
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// One delivery attempt, no retries.
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Sends each message over its own SMTP session.
///
/// The transaction is driven command by command so a permanent reply to `RCPT TO` can be
/// told apart from a rejected sender or a failed `DATA`.
pub struct SmtpMailer {
    host: String,
    port: u16,
    starttls: bool,
    credentials: Option<Credentials>,
    from_name: String,
    hello: ClientId,
}

impl SmtpMailer {
    /// `localhost` gets a plain connection (local relays and mail catchers); any other host
    /// requires STARTTLS.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        credentials: Option<Credentials>,
        from_name: impl Into<String>,
    ) -> Self {
        let host = host.into();
        let starttls = !(host == "localhost" || host == "127.0.0.1");
        Self {
            host,
            port,
            starttls,
            credentials,
            from_name: from_name.into(),
            hello: ClientId::default(),
        }
    }

    /// Builds the mailer from `SMTP_*` settings.
    pub fn from_config() -> Self {
        let username = config::smtp_username();
        let credentials =
            (!username.is_empty()).then(|| Credentials::new(username, config::smtp_password()));
        Self::new(
            config::smtp_host(),
            config::smtp_port(),
            credentials,
            config::email_from_name(),
        )
    }

    async fn connect(&self) -> Result<AsyncSmtpConnection, SmtpError> {
        let mut conn = AsyncSmtpConnection::connect_tokio1(
            (self.host.as_str(), self.port),
            Some(SMTP_TIMEOUT),
            &self.hello,
            None,
            None,
        )
        .await?;

        if self.starttls {
            conn.starttls(TlsParameters::new(self.host.clone())?, &self.hello)
                .await?;
        }
        if let Some(credentials) = &self.credentials {
            conn.auth(&AUTH_MECHANISMS, credentials).await?;
        }
        Ok(conn)
    }

    async fn transact(&self, conn: &mut AsyncSmtpConnection, message: &Message) -> Result<(), MailError> {
        let envelope = message.envelope();

        conn.command(Mail::new(envelope.from().cloned(), vec![]))
            .await
            .map_err(|e| MailError::Other(format!("sender rejected: {e}")))?;

        for to in envelope.to() {
            conn.command(Rcpt::new(to.clone(), vec![]))
                .await
                .map_err(|e| recipient_error(to, e))?;
        }

        conn.command(Data).await.map_err(other)?;
        conn.message(&message.formatted()).await.map_err(other)?;
        Ok(())
    }
}

fn other(err: SmtpError) -> MailError {
    MailError::Other(err.to_string())
}

/// A permanent reply to `RCPT TO` refuses that recipient; transient ones may succeed later.
fn recipient_error(to: &lettre::Address, err: SmtpError) -> MailError {
    if err.is_permanent() {
        MailError::RecipientsRefused(format!("{to}: {err}"))
    } else {
        MailError::Other(format!("{to}: {err}"))
    }
}

/// Assembles the MIME message. Unparseable recipient addresses count as refused.
fn build_message(from_name: &str, mail: &OutgoingMail) -> Result<Message, MailError> {
    let from: Mailbox = format!("{} <{}>", from_name, mail.from)
        .parse()
        .map_err(|e| MailError::Other(format!("invalid sender address '{}': {e}", mail.from)))?;

    let mut builder = Message::builder().from(from).subject(mail.subject.as_str());
    for to in &mail.to {
        let mailbox: Mailbox = to
            .parse()
            .map_err(|e| MailError::RecipientsRefused(format!("{to}: invalid address ({e})")))?;
        builder = builder.to(mailbox);
    }

    let text = SinglePart::plain(mail.body.clone());
    let built = match &mail.attachment {
        Some(att) => {
            let content_type = ContentType::parse(&att.content_type)
                .or_else(|_| ContentType::parse(OCTET_STREAM))
                .map_err(|e| MailError::Other(e.to_string()))?;
            let part = Attachment::new(att.filename.clone()).body(att.bytes.clone(), content_type);
            builder.multipart(MultiPart::mixed().singlepart(text).singlepart(part))
        }
        None => builder.singlepart(text),
    };

    built.map_err(|e| MailError::Other(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = build_message(&self.from_name, &mail)?;
        let mut conn = self.connect().await.map_err(other)?;

        let result = self.transact(&mut conn, &message).await;
        match result {
            Ok(()) => {
                if let Err(e) = conn.quit().await {
                    tracing::debug!(error = %e, "SMTP QUIT failed after delivery");
                }
            }
            Err(_) => conn.abort().await,
        }
        result
    }
}

/// Keeps every message instead of sending it. A scripted failure can be queued for the
/// next send.
#[derive(Default)]
pub struct RecordingMailer {
    from_name: String,
    sent: Mutex<Vec<OutgoingMail>>,
    next_failure: Mutex<Option<MailError>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            from_name: config::email_from_name(),
            ..Self::default()
        }
    }

    /// Makes the next `send` fail with `err`.
    pub fn fail_next(&self, err: MailError) {
        if let Ok(mut slot) = self.next_failure.lock() {
            *slot = Some(err);
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if let Some(err) = self.next_failure.lock().ok().and_then(|mut slot| slot.take()) {
            return Err(err);
        }
        // Same validation a real send would hit.
        build_message(&self.from_name, &mail)?;
        tracing::info!(to = ?mail.to, subject = %mail.subject, "captured outgoing mail");
        self.sent
            .lock()
            .map_err(|_| MailError::Other("mailbox lock poisoned".into()))?
            .push(mail);
        Ok(())
    }
}
