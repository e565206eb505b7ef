use axum::http::StatusCode;
use modkit::api::problem::{Problem, ProblemResponse, ValidationError};

use crate::domain::error::DomainError;

/// Client-safe detail for a unique-constraint violation.
fn conflict_detail(constraint: Option<&str>, message: &str) -> &'static str {
    let hint = constraint.unwrap_or(message);
    if hint.contains("email") {
        "A user with this email already exists"
    } else if hint.contains("name") {
        "A client with this name already exists"
    } else {
        "The resource conflicts with an existing one"
    }
}

/// Map domain errors to RFC 9457 problems.
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    let problem = match e {
        DomainError::ClientNotFound { id } => {
            Problem::from_status(StatusCode::NOT_FOUND, format!("Client {id} was not found"))
                .with_code("CLIENT_NOT_FOUND")
        }
        DomainError::UserNotFound { id } => {
            Problem::from_status(StatusCode::NOT_FOUND, format!("User {id} was not found"))
                .with_code("USER_NOT_FOUND")
        }
        DomainError::UserEmailNotFound { email } => Problem::from_status(
            StatusCode::NOT_FOUND,
            format!("User with email '{email}' was not found"),
        )
        .with_code("USER_NOT_FOUND"),
        DomainError::Conflict {
            constraint,
            message,
        } => Problem::from_status(
            StatusCode::CONFLICT,
            conflict_detail(constraint.as_deref(), message),
        )
        .with_code("CONFLICT"),
        DomainError::MalformedId(err) => {
            Problem::from_status(StatusCode::BAD_REQUEST, err.to_string()).with_code("MALFORMED_ID")
        }
        DomainError::Validation { field, message } => {
            Problem::from_status(StatusCode::BAD_REQUEST, "Input validation failed")
                .with_code("VALIDATION")
                .with_errors(vec![ValidationError {
                    detail: message.clone(),
                    pointer: format!("/{field}"),
                }])
        }
        DomainError::Unavailable { message } => {
            tracing::warn!(error = %message, "storage unavailable");
            Problem::from_status(StatusCode::SERVICE_UNAVAILABLE, "Storage is unavailable")
                .with_code("UNAVAILABLE")
        }
        DomainError::Cancelled => {
            Problem::from_status(StatusCode::SERVICE_UNAVAILABLE, "The request was cancelled")
                .with_code("CANCELLED")
        }
        DomainError::Transaction { message } | DomainError::Database { message } => {
            tracing::error!(error = %message, "storage failure");
            Problem::from_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred",
            )
            .with_code("INTERNAL")
        }
    };
    problem.with_instance(instance).into()
}

/// Problem for a request body that could not be read or decoded.
pub fn bad_body(detail: impl Into<String>, instance: &str) -> ProblemResponse {
    Problem::from_status(StatusCode::BAD_REQUEST, detail)
        .with_code("BAD_BODY")
        .with_instance(instance)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::id::{Id, IdError};

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (DomainError::client_not_found(Id::new()), 404),
            (DomainError::user_email_not_found("a@b.c"), 404),
            (
                DomainError::Conflict {
                    constraint: None,
                    message: "UNIQUE constraint failed: clients.name".into(),
                },
                409,
            ),
            (
                DomainError::MalformedId(IdError::Malformed { input: "x".into() }),
                400,
            ),
            (DomainError::validation("email", "must contain '@'"), 400),
            (DomainError::Cancelled, 503),
            (DomainError::database("syntax error near SELECT"), 500),
        ];
        for (err, status) in cases {
            assert_eq!(map_domain_error(&err, "/x").0.status, status, "{err}");
        }
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let p = map_domain_error(&DomainError::database("SELECT * FROM users failed"), "/users").0;
        assert!(!p.detail.contains("SELECT"));
        assert_eq!(p.instance, "/users");
    }

    #[test]
    fn conflicts_name_the_field_without_sql() {
        let p = map_domain_error(
            &DomainError::Conflict {
                constraint: None,
                message: "UNIQUE constraint failed: users.email".into(),
            },
            "/users",
        )
        .0;
        assert_eq!(p.detail, "A user with this email already exists");
    }

    #[test]
    fn validation_points_at_the_field() {
        let p = map_domain_error(&DomainError::validation("name", "must not be blank"), "/clients").0;
        let errors = p.errors.unwrap();
        assert_eq!(errors[0].pointer, "/name");
    }
}
