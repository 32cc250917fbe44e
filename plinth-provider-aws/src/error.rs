//! AWS error classification
//!
//! Converts SDK errors into backend-agnostic [`BackendError`]s using the
//! error metadata (`.code()`), and decides which probe failures mean
//! "resource does not exist".

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use plinth_core::{BackendError, ExistenceProbeResult};

/// How a service signals that a probed resource does not exist
#[derive(Debug, Clone, Copy)]
pub struct NotFoundSignal {
    pub codes: &'static [&'static str],
    pub status: Option<u16>,
}

impl NotFoundSignal {
    /// Map a failed probe to `NotFound` or `ProbeError`
    ///
    /// Anything that is not the service's explicit not-found signal,
    /// including 403 and transport failures, stays a `ProbeError`.
    pub fn classify(&self, cause: BackendError, status: Option<u16>) -> ExistenceProbeResult {
        let code_matches = cause
            .code
            .as_deref()
            .is_some_and(|code| self.codes.contains(&code));
        let status_matches = self.status.is_some() && status == self.status;

        if code_matches || status_matches {
            ExistenceProbeResult::NotFound
        } else {
            ExistenceProbeResult::ProbeError(cause)
        }
    }
}

/// `HeadBucket` has no body on 404, so the status alone is authoritative
pub const HEAD_BUCKET: NotFoundSignal = NotFoundSignal {
    codes: &["NotFound", "NoSuchBucket"],
    status: Some(404),
};

/// `DescribeTable` answers a missing table with a 400 and this code
pub const DESCRIBE_TABLE: NotFoundSignal = NotFoundSignal {
    codes: &["ResourceNotFoundException"],
    status: None,
};

/// Convert an SDK error into a [`BackendError`], keeping its error code
pub fn backend_error<E>(err: &SdkError<E>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = ProvideErrorMetadata::message(err)
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(err).to_string());
    let error = BackendError::new(message);
    match ProvideErrorMetadata::code(err) {
        Some(code) => error.with_code(code),
        None => error,
    }
}

/// HTTP status of the response, when one was received
pub fn http_status<E>(err: &SdkError<E>) -> Option<u16> {
    err.raw_response().map(|raw| raw.status().as_u16())
}

/// Error for a request the SDK refused to build
pub(crate) fn invalid_request(context: &str, err: impl std::fmt::Display) -> BackendError {
    BackendError::new(format!("{}: {}", context, err))
}

/// Error code to operator hint mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "AccessDenied",
        "Check that the active credentials may manage S3 buckets and DynamoDB tables.",
    ),
    (
        "AccessDeniedException",
        "Check that the active credentials may manage S3 buckets and DynamoDB tables.",
    ),
    (
        "BucketAlreadyExists",
        "Bucket names are global and this one belongs to another account. Choose a different state_bucket.",
    ),
    (
        "BucketAlreadyOwnedByYou",
        "The bucket was created concurrently. Re-run to verify it.",
    ),
    (
        "ResourceInUseException",
        "The table was created concurrently. Re-run once it is active.",
    ),
    (
        "IllegalLocationConstraintException",
        "The configured region does not match the region of the endpoint.",
    ),
    (
        "InvalidBucketName",
        "Bucket names must be 3-63 lowercase letters, digits, '-' or '.'.",
    ),
    (
        "ExpiredToken",
        "The session credentials have expired. Refresh them and re-run.",
    ),
    (
        "ExpiredTokenException",
        "The session credentials have expired. Refresh them and re-run.",
    ),
    (
        "LimitExceededException",
        "Too many tables are being created in this account. Retry later.",
    ),
    (
        "ThrottlingException",
        "AWS API rate limit hit. Retry later.",
    ),
    ("SlowDown", "AWS API rate limit hit. Retry later."),
];

/// Get a user-friendly suggestion for a known error code
pub fn suggestion_for_code(code: &str) -> Option<&'static str> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| *s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;

    #[test]
    fn test_head_bucket_404_is_not_found() {
        let cause = BackendError::new("service error");
        assert_eq!(
            HEAD_BUCKET.classify(cause, Some(404)),
            ExistenceProbeResult::NotFound
        );
    }

    #[test]
    fn test_head_bucket_not_found_codes() {
        for code in HEAD_BUCKET.codes {
            let cause = BackendError::new("missing").with_code(*code);
            assert!(
                HEAD_BUCKET.classify(cause, None).is_not_found(),
                "Expected NotFound for code: {code}"
            );
        }
    }

    #[test]
    fn test_head_bucket_forbidden_is_probe_error() {
        let cause = BackendError::new("Forbidden").with_code("Forbidden");
        assert_eq!(
            HEAD_BUCKET.classify(cause.clone(), Some(403)),
            ExistenceProbeResult::ProbeError(cause)
        );
    }

    #[test]
    fn test_describe_table_classification() {
        let missing = BackendError::new("Requested resource not found")
            .with_code("ResourceNotFoundException");
        assert!(DESCRIBE_TABLE.classify(missing, Some(400)).is_not_found());

        let denied = BackendError::new("not authorized").with_code("AccessDeniedException");
        assert!(matches!(
            DESCRIBE_TABLE.classify(denied, Some(400)),
            ExistenceProbeResult::ProbeError(_)
        ));

        // A 404 is not DynamoDB's not-found signal
        let odd = BackendError::new("proxy says no");
        assert!(matches!(
            DESCRIBE_TABLE.classify(odd, Some(404)),
            ExistenceProbeResult::ProbeError(_)
        ));
    }

    #[test]
    fn test_transport_failure_is_probe_error() {
        let err: SdkError<DescribeTableError> = SdkError::construction_failure("no credentials");
        let cause = backend_error(&err);
        assert!(cause.code.is_none());
        assert!(!cause.message.is_empty());
        assert_eq!(http_status(&err), None);
        assert!(matches!(
            DESCRIBE_TABLE.classify(cause, http_status(&err)),
            ExistenceProbeResult::ProbeError(_)
        ));
    }

    #[test]
    fn test_suggestions() {
        for (code, _) in SUGGESTIONS {
            assert!(
                suggestion_for_code(code).is_some(),
                "No suggestion for code: {code}"
            );
        }
        assert!(suggestion_for_code("SomeUnknownCode").is_none());
    }

    #[test]
    fn test_invalid_request() {
        let err = invalid_request("Failed to build key schema", "missing attribute_name");
        assert_eq!(
            err.message,
            "Failed to build key schema: missing attribute_name"
        );
        assert!(err.code.is_none());
    }
}
