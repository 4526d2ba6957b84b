//! Inbound request decoding and response shaping.
//!
//! An [`InboundEvent`] is what the invocation layer hands over: a content
//! type, a body, and whether that body is base64 encoded. Decoding checks the
//! content type, parses JSON, and validates required fields before anything
//! reaches the service. Every failure maps to a 400 [`Response`] whose body
//! is the error text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{CoreError, RequestError};
use crate::goal::NewGoal;
use crate::streak::parse_date;

/// The only accepted request media type.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Action name for a completion toggle.
pub const MARK_COMPLETED: &str = "mark_completed";

/// Raw inbound request.
#[derive(Debug, Clone, Default)]
pub struct InboundEvent {
    /// Target goal, for requests addressed to one goal.
    pub goal_id: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl InboundEvent {
    /// A plain JSON request.
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            goal_id: None,
            content_type: Some(JSON_CONTENT_TYPE.to_string()),
            body: body.into(),
            is_base64_encoded: false,
        }
    }

    /// A plain JSON request addressed to `goal_id`.
    pub fn for_goal(goal_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            goal_id: Some(goal_id.into()),
            ..Self::json(body)
        }
    }

    /// The addressed goal id.
    ///
    /// # Errors
    /// [`RequestError::Validation`] when the event names no goal.
    pub fn require_goal_id(&self) -> Result<&str, RequestError> {
        self.goal_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RequestError::Validation {
                field: "goal_id".to_string(),
                message: "required".to_string(),
            })
    }

    /// Body bytes after base64 decoding and the content-type check.
    ///
    /// # Errors
    /// [`RequestError::Decode`] for bad base64, or
    /// [`RequestError::UnsupportedMediaType`] unless the media type is
    /// `application/json` (parameters such as `charset` are ignored).
    pub fn decode_body(&self) -> Result<Vec<u8>, RequestError> {
        let body = if self.is_base64_encoded {
            STANDARD
                .decode(self.body.trim())
                .map_err(|e| RequestError::Decode(e.to_string()))?
        } else {
            self.body.clone().into_bytes()
        };

        let content_type = self.content_type.as_deref().unwrap_or_default();
        let media_type = content_type.split(';').next().unwrap_or_default().trim();
        if !media_type.eq_ignore_ascii_case(JSON_CONTENT_TYPE) {
            return Err(RequestError::UnsupportedMediaType(content_type.to_string()));
        }

        Ok(body)
    }

    fn decode_json<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        Ok(serde_json::from_slice(&self.decode_body()?)?)
    }
}

/// A validated goal action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalAction {
    MarkCompleted(MarkCompleted),
}

/// Set or clear completion for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkCompleted {
    pub is_completed: bool,
    pub date: NaiveDate,
}

#[derive(Deserialize)]
struct RawAction {
    action: Option<String>,
    is_completed: Option<bool>,
    date: Option<String>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, RequestError> {
    value.ok_or_else(|| RequestError::Validation {
        field: field.to_string(),
        message: "required".to_string(),
    })
}

/// Decode and validate a goal action request.
///
/// # Errors
/// Any [`RequestError`]: decoding, content type, JSON shape, a missing
/// `action`/`is_completed`/`date`, a malformed date, or an unknown action.
pub fn parse_action(event: &InboundEvent) -> Result<GoalAction, RequestError> {
    let raw: RawAction = event.decode_json()?;
    let action = required(raw.action, "action")?;
    if action != MARK_COMPLETED {
        return Err(RequestError::UnknownAction(action));
    }

    let is_completed = required(raw.is_completed, "is_completed")?;
    let date = required(raw.date, "date")?;
    let date = parse_date(&date).map_err(|e| RequestError::Validation {
        field: "date".to_string(),
        message: e.to_string(),
    })?;

    Ok(GoalAction::MarkCompleted(MarkCompleted { is_completed, date }))
}

/// Decode and validate a goal creation request.
pub fn parse_new_goal(event: &InboundEvent) -> Result<NewGoal, RequestError> {
    let new_goal: NewGoal = event.decode_json()?;
    new_goal.validate()?;
    Ok(new_goal)
}

/// Outbound response: status code, optional content type, body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: String,
}

impl Response {
    /// 201 with no body.
    pub fn created() -> Self {
        Self {
            status: 201,
            content_type: None,
            body: String::new(),
        }
    }

    /// 200 with a JSON body.
    pub fn json(body: String) -> Self {
        Self {
            status: 200,
            content_type: Some(JSON_CONTENT_TYPE),
            body,
        }
    }

    /// 200 with a plain-text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: Some("text/plain"),
            body: body.into(),
        }
    }

    /// 400 with the error text as the body.
    pub fn error(err: &CoreError) -> Self {
        Self {
            status: 400,
            content_type: Some("text/plain"),
            body: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body of the completed-lookup response: `{"<date>": <bool>}`.
pub fn completed_body(date: &str, completed: bool) -> String {
    let mut body = serde_json::Map::new();
    body.insert(date.to_string(), serde_json::Value::Bool(completed));
    serde_json::Value::Object(body).to_string()
}
