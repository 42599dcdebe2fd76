/// Coarse classification of a Lambda API failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AwsErrorKind {
    /// `ResourceNotFoundException`
    NotFound,
    /// `ResourceConflictException`, `PreconditionFailedException`
    Conflict,
    /// `InvalidParameterValueException`, `ValidationException`, ...
    Validation,
    /// `TooManyRequestsException`, `ThrottlingException`
    Throttling,
    /// `ResourceInUseException`
    InUse,
    /// `ServiceException`, dispatch failures, timeouts
    Service,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AwsError {
    pub kind: AwsErrorKind,
    /// The AWS error code, e.g. `ResourceNotFoundException`.
    pub code: String,
    pub message: String,
}

impl AwsError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            kind: kind_for_code(code),
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("ResourceNotFoundException", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("ResourceConflictException", message)
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new("PreconditionFailedException", message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new("InvalidParameterValueException", message)
    }

    pub fn throttled(message: impl Into<String>) -> Self {
        Self::new("TooManyRequestsException", message)
    }

    pub fn in_use(message: impl Into<String>) -> Self {
        Self::new("ResourceInUseException", message)
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::new("ServiceException", message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == AwsErrorKind::NotFound
    }

    /// Worth retrying in place with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            AwsErrorKind::Throttling | AwsErrorKind::Service | AwsErrorKind::InUse
        )
    }
}

pub fn kind_for_code(code: &str) -> AwsErrorKind {
    match code {
        "ResourceNotFoundException"
        | "NotFoundException"
        | "ProvisionedConcurrencyConfigNotFoundException" => {
            AwsErrorKind::NotFound
        }
        "ResourceConflictException" | "PreconditionFailedException" => {
            AwsErrorKind::Conflict
        }
        "InvalidParameterValueException"
        | "InvalidRequestContentException"
        | "ValidationException"
        | "CodeVerificationFailedException"
        | "InvalidCodeSignatureException"
        | "CodeSigningConfigNotFoundException"
        | "PolicyLengthExceededException"
        | "CodeStorageExceededException" => AwsErrorKind::Validation,
        "TooManyRequestsException" | "ThrottlingException" => {
            AwsErrorKind::Throttling
        }
        "ResourceInUseException" | "ResourceNotReadyException" => {
            AwsErrorKind::InUse
        }
        "ServiceException"
        | "EC2ThrottledException"
        | "ENILimitReachedException"
        | "DispatchFailure"
        | "TimeoutError" => AwsErrorKind::Service,
        _ => AwsErrorKind::Other,
    }
}

pub trait AwsResultExt<T> {
    /// Map `ResourceNotFoundException` to `Ok(None)`.
    fn found(self) -> Result<Option<T>, AwsError>;
    /// Treat `ResourceNotFoundException` as success; used by deletes.
    fn ignore_not_found(self) -> Result<(), AwsError>;
}

impl<T> AwsResultExt<T> for Result<T, AwsError> {
    fn found(self) -> Result<Option<T>, AwsError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn ignore_not_found(self) -> Result<(), AwsError> {
        match self {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
