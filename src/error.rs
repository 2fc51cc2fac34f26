/// Top-level error carried back to `main`, which prints it and exits with
/// `exit_code` (2 = usage/input/config, 3 = no usable rows, 4 = runtime).
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<crate::model::ModelError> for AppError {
    fn from(err: crate::model::ModelError) -> Self {
        use crate::model::ModelError;
        let exit_code = match &err {
            ModelError::Io { .. } | ModelError::Parse(_) | ModelError::Invalid(_) => 2,
            ModelError::UnknownCategory { .. } | ModelError::NonFinite => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl From<crate::logging::LoggingError> for AppError {
    fn from(err: crate::logging::LoggingError) -> Self {
        AppError::new(4, err.to_string())
    }
}
