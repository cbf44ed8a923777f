//! Relays a staff member's message and attachment to the course mentor by email.
//!
//! Every request ends in exactly one [`RelayOutcome`]. A recipient refusal is not an error
//! for the caller: it is written to `mentor_messages` and answered like a delivery.

use crate::actor::Actor;
use crate::email::{MailAttachment, MailError, Mailer, OutgoingMail};
use crate::error::ServiceError;
use db::models::{mentor::Model as MentorModel, mentor_message::Model as MentorMessageModel};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::Span;

pub const NO_MENTOR_ADDRESSES: &str = "no mentor addresses configured for this course";

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Why a relay request could not be understood.
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedRequest {
    MissingField(&'static str),
    Multipart(String),
}

impl fmt::Display for MalformedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedRequest::MissingField(name) => write!(f, "missing field '{name}'"),
            MalformedRequest::Multipart(detail) => write!(f, "malformed multipart body: {detail}"),
        }
    }
}

/// Fields collected from the multipart body, before validation.
#[derive(Debug, Default, Clone)]
pub struct RelayForm {
    pub subject: Option<String>,
    pub message: Option<String>,
    pub file: Option<MailAttachment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayRequest {
    pub subject: String,
    pub message: String,
    pub attachment: MailAttachment,
}

impl RelayForm {
    pub fn into_request(self) -> Result<RelayRequest, MalformedRequest> {
        let attachment = self.file.ok_or(MalformedRequest::MissingField("file"))?;
        let subject = self.subject.ok_or(MalformedRequest::MissingField("subject"))?;
        let message = self.message.ok_or(MalformedRequest::MissingField("message"))?;
        Ok(RelayRequest {
            subject,
            message,
            attachment,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    Delivered { recipients: Vec<String> },
    RecipientsRefused { record_id: i64, error: String },
    Malformed(MalformedRequest),
}

/// HTTP-shaped answer: body, status and content type (empty when there is no body).
#[derive(Debug, Clone, PartialEq)]
pub struct RelayReply {
    pub body: String,
    pub status: u16,
    pub content_type: &'static str,
}

/// True when an `Accept` header asks for JSON.
pub fn accepts_json(accept: Option<&str>) -> bool {
    accept.is_some_and(|v| v.contains(JSON_CONTENT_TYPE))
}

impl RelayOutcome {
    pub fn reply(&self, wants_json: bool) -> RelayReply {
        match self {
            RelayOutcome::Delivered { .. } | RelayOutcome::RecipientsRefused { .. } => RelayReply {
                body: String::new(),
                status: 201,
                content_type: "",
            },
            RelayOutcome::Malformed(reason) if wants_json => RelayReply {
                body: json!({ "error": reason.to_string() }).to_string(),
                status: 400,
                content_type: JSON_CONTENT_TYPE,
            },
            RelayOutcome::Malformed(reason) => RelayReply {
                body: format!("Bad Request {reason}"),
                status: 400,
                content_type: TEXT_CONTENT_TYPE,
            },
        }
    }
}

pub struct RelayService {
    db: DatabaseConnection,
    mailer: Arc<dyn Mailer>,
    span: Span,
}

impl RelayService {
    pub fn new(db: DatabaseConnection, mailer: Arc<dyn Mailer>, span: Span) -> Self {
        Self { db, mailer, span }
    }

    /// Sends `form` to the mentor addresses of `course_id` on behalf of `sender`.
    ///
    /// Only staff may relay. Transport failures other than recipient refusal are returned
    /// as [`ServiceError::Transport`].
    pub async fn relay_message(
        &self,
        sender: &Actor,
        course_id: i64,
        form: Result<RelayForm, MalformedRequest>,
    ) -> Result<RelayOutcome, ServiceError> {
        if !sender.is_staff() {
            return Err(ServiceError::PermissionDenied);
        }

        let request = match form.and_then(RelayForm::into_request) {
            Ok(request) => request,
            Err(reason) => {
                tracing::error!(parent: &self.span, %reason, "bad relay request");
                return Ok(RelayOutcome::Malformed(reason));
            }
        };

        let recipients = MentorModel::find_by_course(&self.db, course_id)
            .await?
            .map(|m| m.recipients())
            .unwrap_or_default();

        if recipients.is_empty() {
            return self
                .record_refusal(sender, course_id, &recipients, &request, NO_MENTOR_ADDRESSES)
                .await;
        }

        let mail = OutgoingMail {
            from: sender.email.clone(),
            to: recipients.clone(),
            subject: request.subject.clone(),
            body: request.message.clone(),
            attachment: Some(request.attachment.clone()),
        };

        match self.mailer.send(mail).await {
            Ok(()) => {
                tracing::info!(
                    parent: &self.span,
                    course_id,
                    sent_by = sender.user_id,
                    recipients = recipients.len(),
                    "relayed message to mentor"
                );
                Ok(RelayOutcome::Delivered { recipients })
            }
            Err(MailError::RecipientsRefused(error)) => {
                self.record_refusal(sender, course_id, &recipients, &request, &error)
                    .await
            }
            Err(other) => {
                tracing::error!(parent: &self.span, course_id, error = %other, "mail transport failed");
                Err(ServiceError::Transport(other))
            }
        }
    }

    async fn record_refusal(
        &self,
        sender: &Actor,
        course_id: i64,
        recipients: &[String],
        request: &RelayRequest,
        error: &str,
    ) -> Result<RelayOutcome, ServiceError> {
        tracing::info!(parent: &self.span, course_id, %error, "recipients refused");
        let record = MentorMessageModel::record_undelivered(
            &self.db,
            course_id,
            sender.user_id,
            &recipients.join(", "),
            &request.subject,
            &request.message,
            error,
        )
        .await?;

        Ok(RelayOutcome::RecipientsRefused {
            record_id: record.id,
            error: error.to_string(),
        })
    }
}
