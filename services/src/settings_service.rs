//! Author-facing configuration of an assignment block.
//!
//! Incoming values are loosely typed (form fields arrive as strings, JSON clients send
//! numbers). Every field is validated before anything is written, so a rejected save
//! leaves the stored configuration exactly as it was.

use crate::block::{fields, AssignmentSettings, BlockContext};
use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use db::field_store::{FieldWrite, Namespace};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::Span;

pub const POINTS_NOT_INTEGER: &str = "Points must be an integer";
pub const POINTS_NEGATIVE: &str = "Points must be a positive integer";
pub const WEIGHT_NOT_DECIMAL: &str = "Weight must be a decimal number";
pub const WEIGHT_NEGATIVE: &str = "Weight must be a positive decimal number";
pub const DUE_INVALID: &str = "Due must be an RFC 3339 timestamp";

/// A save request as submitted by the author. Absent fields keep their stored value.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub assignment_name: Option<String>,
    pub points: Option<Value>,
    /// `Some(Value::Null)` clears the weight; `None` leaves it alone.
    #[serde(deserialize_with = "present")]
    pub weight: Option<Value>,
    #[serde(deserialize_with = "present")]
    pub due: Option<Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)` so it can be told apart from a
/// missing key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn validation(msg: &str) -> ServiceError {
    ServiceError::Validation(msg.to_string())
}

/// Accepts integers, integral floats and integer strings. Negative values are refused.
pub fn parse_points(raw: &Value) -> Result<u64, ServiceError> {
    let n: i128 = match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i as i128
            } else if let Some(u) = n.as_u64() {
                u as i128
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 => f as i128,
                    _ => return Err(validation(POINTS_NOT_INTEGER)),
                }
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|_| validation(POINTS_NOT_INTEGER))?,
        _ => return Err(validation(POINTS_NOT_INTEGER)),
    };

    if n < 0 {
        return Err(validation(POINTS_NEGATIVE));
    }
    u64::try_from(n).map_err(|_| validation(POINTS_NOT_INTEGER))
}

/// `null` or an empty string clears the weight.
pub fn parse_weight(raw: &Value) -> Result<Option<f64>, ServiceError> {
    let w = match raw {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| validation(WEIGHT_NOT_DECIMAL))?,
        Value::Number(n) => n.as_f64().ok_or_else(|| validation(WEIGHT_NOT_DECIMAL))?,
        _ => return Err(validation(WEIGHT_NOT_DECIMAL)),
    };

    if !w.is_finite() {
        return Err(validation(WEIGHT_NOT_DECIMAL));
    }
    if w < 0.0 {
        return Err(validation(WEIGHT_NEGATIVE));
    }
    Ok(Some(w))
}

/// `null` or an empty string removes the due date.
pub fn parse_due(raw: &Value) -> Result<Option<DateTime<Utc>>, ServiceError> {
    match raw {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| validation(DUE_INVALID)),
        _ => Err(validation(DUE_INVALID)),
    }
}

pub struct SettingsService {
    span: Span,
}

impl SettingsService {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    /// Validates `raw` against the current configuration and persists it in one commit.
    ///
    /// Returns the configuration as it now stands. On a validation error nothing is
    /// written.
    pub async fn save_settings(
        &self,
        block: &BlockContext,
        raw: RawSettings,
    ) -> Result<AssignmentSettings, ServiceError> {
        let mut next = block.settings().await?.clone();

        if let Some(points) = &raw.points {
            next.points = parse_points(points)?;
        }
        if let Some(weight) = &raw.weight {
            next.weight = parse_weight(weight)?;
        }
        if let Some(due) = &raw.due {
            next.due = parse_due(due)?;
        }
        if let Some(name) = raw.display_name {
            next.display_name = name;
        }
        if let Some(description) = raw.description {
            next.description = Some(description);
        }
        if let Some(assignment_name) = raw.assignment_name {
            next.assignment_name = Some(assignment_name);
        }

        let writes = vec![
            FieldWrite::new(Namespace::Settings, fields::DISPLAY_NAME, next.display_name.clone()),
            FieldWrite::new(Namespace::Settings, fields::POINTS, next.points),
            FieldWrite::new(Namespace::Settings, fields::WEIGHT, serde_json::to_value(next.weight)?),
            FieldWrite::new(Namespace::Settings, fields::DUE, serde_json::to_value(next.due)?),
            FieldWrite::new(
                Namespace::Content,
                fields::DESCRIPTION,
                serde_json::to_value(&next.description)?,
            ),
            FieldWrite::new(
                Namespace::Content,
                fields::ASSIGNMENT_NAME,
                serde_json::to_value(&next.assignment_name)?,
            ),
        ];
        block.store().commit(block.key(), writes).await?;

        tracing::info!(
            parent: &self.span,
            course_id = block.key().course_id,
            block_id = block.key().block_id,
            points = next.points,
            "saved assignment settings"
        );
        Ok(next)
    }
}
