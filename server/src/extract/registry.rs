//! Action registry and request dispatch
//!
//! Each extraction operation is described once, at startup, by an
//! `ActionDescriptor`: its name, HTTP path, request schema, handler and
//! human-readable metadata. The registry is an explicitly constructed
//! object (no process-global), write-once before the router is built and
//! read-only afterwards.
//!
//! Dispatch validates the raw JSON body against the descriptor's schema
//! before the handler runs, so malformed requests never reach the decode
//! or algorithm stages.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, extract::State};
use metrics::counter;
use serde::Serialize;
use serde_json::Value;

use super::routes::ExtractState;

/// Boxed future returned by action handlers
pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// An action handler: validated JSON body in, HTTP response out
pub type ActionHandler = Arc<dyn Fn(ExtractState, Value) -> HandlerFuture + Send + Sync>;

/// Expected JSON type of a request field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            FieldKind::String => "string",
        }
    }
}

/// One field of a request schema
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Request body schema checked at the dispatch boundary
#[derive(Debug, Clone, Copy)]
pub struct RequestSchema {
    pub fields: &'static [FieldSpec],
}

/// A single field-level validation failure
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl RequestSchema {
    /// Check required fields and field types against a raw JSON body.
    pub fn validate(&self, body: &Value) -> Result<(), Vec<FieldError>> {
        let Some(object) = body.as_object() else {
            return Err(vec![FieldError {
                field: "".to_string(),
                message: "request body must be a JSON object".to_string(),
            }]);
        };

        let mut errors = Vec::new();
        for spec in self.fields {
            match object.get(spec.name) {
                None | Some(Value::Null) if spec.required => errors.push(FieldError {
                    field: spec.name.to_string(),
                    message: "missing required field".to_string(),
                }),
                Some(value) if !value.is_null() && !spec.kind.matches(value) => {
                    errors.push(FieldError {
                        field: spec.name.to_string(),
                        message: format!("expected a {}", spec.kind.name()),
                    })
                }
                _ => {}
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Static description of one extraction action
pub struct ActionDescriptor {
    pub name: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
    pub description: &'static str,
    pub tags: &'static [&'static str],
    pub schema: RequestSchema,
    pub handler: ActionHandler,
}

/// Descriptor metadata exposed on `GET /actions`
#[derive(Debug, Clone, Serialize)]
pub struct ActionInfo {
    pub name: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
    pub description: &'static str,
    pub tags: &'static [&'static str],
}

impl From<&ActionDescriptor> for ActionInfo {
    fn from(d: &ActionDescriptor) -> Self {
        Self {
            name: d.name,
            path: d.path,
            summary: d.summary,
            description: d.description,
            tags: d.tags,
        }
    }
}

/// Body of a 400 response for schema violations
#[derive(Debug, Serialize)]
struct ValidationErrorBody {
    detail: String,
    code: &'static str,
    errors: Vec<FieldError>,
}

/// Registry of extraction actions, populated once at startup
#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<Arc<ActionDescriptor>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action. Duplicate paths are a startup wiring bug.
    pub fn register(&mut self, descriptor: ActionDescriptor) {
        assert!(
            self.actions.iter().all(|d| d.path != descriptor.path),
            "duplicate action path {}",
            descriptor.path
        );
        self.actions.push(Arc::new(descriptor));
    }

    /// Metadata for all registered actions, in registration order
    pub fn action_infos(&self) -> Vec<ActionInfo> {
        self.actions.iter().map(|d| ActionInfo::from(d.as_ref())).collect()
    }

    /// Build the HTTP router: one POST route per action plus `GET /actions`.
    pub fn into_router(self, state: ExtractState) -> Router {
        let infos = self.action_infos();
        let mut router = Router::new();
        for descriptor in self.actions {
            let path = descriptor.path;
            router = router.route(
                path,
                post(move |State(state): State<ExtractState>, Json(body): Json<Value>| {
                    let descriptor = descriptor.clone();
                    async move { dispatch(&descriptor, state, body).await }
                }),
            );
        }
        router
            .route(
                "/actions",
                get(move || {
                    let infos = infos.clone();
                    async move { Json(infos) }
                }),
            )
            .with_state(state)
    }
}

/// Validate a request body against the action's schema, then invoke the
/// handler. Handler failures propagate verbatim.
async fn dispatch(descriptor: &ActionDescriptor, state: ExtractState, body: Value) -> Response {
    counter!("ifcb_action_requests_total", "action" => descriptor.name).increment(1);

    if let Err(errors) = descriptor.schema.validate(&body) {
        counter!("ifcb_validation_failures_total", "action" => descriptor.name).increment(1);
        tracing::warn!(
            action = descriptor.name,
            fields = errors.len(),
            "request body failed schema validation"
        );
        return (
            StatusCode::BAD_REQUEST,
            Json(ValidationErrorBody {
                detail: "request body failed validation".to_string(),
                code: "validation_error",
                errors,
            }),
        )
            .into_response();
    }

    (descriptor.handler)(state, body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: RequestSchema = RequestSchema {
        fields: &[FieldSpec {
            name: "image_data",
            kind: FieldKind::String,
            required: true,
        }],
    };

    #[test]
    fn test_valid_body_passes() {
        assert!(SCHEMA.validate(&json!({"image_data": "aGVsbG8="})).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let errors = SCHEMA.validate(&json!({})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "image_data");
        assert!(errors[0].message.contains("missing"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let errors = SCHEMA.validate(&json!({"image_data": null})).unwrap_err();
        assert_eq!(errors[0].field, "image_data");
    }

    #[test]
    fn test_wrong_type() {
        let errors = SCHEMA.validate(&json!({"image_data": 42})).unwrap_err();
        assert!(errors[0].message.contains("string"));
    }

    #[test]
    fn test_non_object_body() {
        assert!(SCHEMA.validate(&json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let body = json!({"image_data": "aGVsbG8=", "extra": true});
        assert!(SCHEMA.validate(&body).is_ok());
    }
}
