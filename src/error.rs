use thiserror::Error;

// Display text is written verbatim as `error_reason`

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedLine {
    #[error("expected 3 whitespace-separated tokens, found {0}")]
    TokenCount(usize),

    #[error("unknown status '{0}'")]
    UnknownStatus(String),

    #[error("temperature '{0}' is not a number")]
    BadReading(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejection {
    #[error("missing or invalid email")]
    InvalidEmail,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventRejection {
    #[error("missing user_id")]
    MissingUserId,

    #[error("user_id not convertible to int")]
    UserIdNotInt,

    #[error("invalid event_type '{0}'")]
    InvalidEventType(String),

    #[error("invalid or missing timestamp")]
    InvalidTimestamp,

    #[error("invalid amount for purchase")]
    InvalidAmount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_reasons_render_verbatim() {
        assert_eq!(EventRejection::MissingUserId.to_string(), "missing user_id");
        assert_eq!(
            EventRejection::InvalidEventType("signup".to_string()).to_string(),
            "invalid event_type 'signup'"
        );
        assert_eq!(
            EventRejection::InvalidEventType(String::new()).to_string(),
            "invalid event_type ''"
        );
    }
}
