use std::error::Error;
use std::fmt::{Display, Formatter};

pub type Gm2Result<T> = Result<T, Gm2Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gm2ErrorCategory {
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl Gm2ErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gm2Error {
    category: Gm2ErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl Gm2Error {
    pub fn new(
        category: Gm2ErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(Gm2ErrorCategory::InputValidationError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(Gm2ErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(Gm2ErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(Gm2ErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> Gm2ErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for Gm2Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for Gm2Error {}

impl From<crate::numerics::VectorError> for Gm2Error {
    fn from(error: crate::numerics::VectorError) -> Self {
        let placeholder = match error {
            crate::numerics::VectorError::OutOfBounds { .. } => "NUM.OUT_OF_BOUNDS",
            crate::numerics::VectorError::OutOfMemory { .. } => "SYS.OUT_OF_MEMORY",
        };
        Self::internal(placeholder, error.to_string())
    }
}

impl From<crate::numerics::RootFindingError> for Gm2Error {
    fn from(error: crate::numerics::RootFindingError) -> Self {
        match error {
            crate::numerics::RootFindingError::Vector(source) => source.into(),
            other => Self::computation("RUN.ROOT_FINDER", other.to_string()),
        }
    }
}

impl From<crate::physics::WeinbergAngleError> for Gm2Error {
    fn from(error: crate::physics::WeinbergAngleError) -> Self {
        Self::computation("RUN.WEINBERG_ANGLE", error.to_string())
    }
}

impl From<crate::slha::SlhaError> for Gm2Error {
    fn from(error: crate::slha::SlhaError) -> Self {
        match error {
            crate::slha::SlhaError::Io { .. } => Self::io_system("IO.SLHA", error.to_string()),
            _ => Self::input_validation("INPUT.SLHA", error.to_string()),
        }
    }
}
