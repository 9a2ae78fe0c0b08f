//! Error types.

use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// The error type used by the statistics repository and its components.
#[derive(Debug)]
pub enum StatisticsError {
    /// This error indicates that a function has been called with an invalid argument.
    Argument(ArgumentError),
    /// This error indicates that a table, column, partition or a statistic value supplied by a caller
    /// can not be resolved. Operations that fail with this error perform no writes.
    Analysis(AnalysisError),
    /// This error indicates that a statement that modifies statistics tables has failed.
    Ddl(DdlError),
    /// This error indicates that the statistics store failed to execute a query.
    Execution(ExecutionError),
    /// This error indicates that one of internal invariants has been violated
    /// (e.g. an identifier that must be unique matches more than one row).
    Internal(InternalError),
}

impl StatisticsError {
    /// Creates an [argument error](StatisticsError::Argument).
    pub fn argument<T>(message: T) -> StatisticsError
    where
        T: Into<String>,
    {
        StatisticsError::Argument(ArgumentError::new(message))
    }

    /// Creates an [analysis error](StatisticsError::Analysis).
    pub fn analysis<T>(message: T) -> StatisticsError
    where
        T: Into<String>,
    {
        StatisticsError::Analysis(AnalysisError::new(message))
    }

    /// Creates a [DDL error](StatisticsError::Ddl) that wraps the given execution error.
    /// The message of the new error is the message of the execution error.
    pub fn ddl(cause: ExecutionError) -> StatisticsError {
        StatisticsError::Ddl(DdlError::new(cause))
    }

    /// Creates an [internal error](StatisticsError::Internal).
    /// This method is a shorthand for `StatisticsError::Internal(InternalError::new(message))`.
    pub fn internal<T>(message: T) -> StatisticsError
    where
        T: Into<String>,
    {
        StatisticsError::Internal(InternalError::new(message))
    }
}

impl Display for StatisticsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StatisticsError::Argument(err) => write!(f, "Argument error: {}", err),
            StatisticsError::Analysis(err) => write!(f, "Analysis error: {}", err),
            StatisticsError::Ddl(err) => write!(f, "DDL error: {}", err),
            StatisticsError::Execution(err) => write!(f, "Execution error: {}", err),
            StatisticsError::Internal(err) => write!(f, "Internal error: {}", err),
        }
    }
}

impl Error for StatisticsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StatisticsError::Argument(_) => None,
            StatisticsError::Analysis(_) => None,
            StatisticsError::Ddl(DdlError { cause, .. }) => Some(cause),
            StatisticsError::Execution(err) => err.source(),
            StatisticsError::Internal(_) => None,
        }
    }
}

impl From<ArgumentError> for StatisticsError {
    fn from(err: ArgumentError) -> Self {
        StatisticsError::Argument(err)
    }
}

impl From<AnalysisError> for StatisticsError {
    fn from(err: AnalysisError) -> Self {
        StatisticsError::Analysis(err)
    }
}

impl From<ExecutionError> for StatisticsError {
    fn from(err: ExecutionError) -> Self {
        StatisticsError::Execution(err)
    }
}

impl From<InternalError> for StatisticsError {
    fn from(err: InternalError) -> Self {
        StatisticsError::Internal(err)
    }
}

/// Argument error. See [StatisticsError::Argument].
#[derive(Debug)]
pub struct ArgumentError {
    message: String,
    backtrace: Backtrace,
}

impl ArgumentError {
    /// Creates a new instance of an [ArgumentError].
    pub fn new<T>(message: T) -> Self
    where
        T: Into<String>,
    {
        ArgumentError {
            message: message.into(),
            backtrace: Backtrace::new(),
        }
    }
}

impl Display for ArgumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.message)
    }
}

/// Analysis error. See [StatisticsError::Analysis].
#[derive(Debug)]
pub struct AnalysisError {
    message: String,
    backtrace: Backtrace,
}

impl AnalysisError {
    /// Creates a new instance of an [AnalysisError].
    pub fn new<T>(message: T) -> Self
    where
        T: Into<String>,
    {
        AnalysisError {
            message: message.into(),
            backtrace: Backtrace::new(),
        }
    }

    /// The message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for AnalysisError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.message)
    }
}

/// DDL error. See [StatisticsError::Ddl].
#[derive(Debug)]
pub struct DdlError {
    message: String,
    cause: ExecutionError,
    backtrace: Backtrace,
}

impl DdlError {
    /// Creates an instance of a [DdlError] that carries the message of the given execution error.
    /// This method captures a backtrace.
    pub fn new(cause: ExecutionError) -> Self {
        DdlError {
            message: cause.message().to_string(),
            cause,
            backtrace: Backtrace::new(),
        }
    }

    /// The message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The error returned by the statistics store.
    pub fn cause(&self) -> &ExecutionError {
        &self.cause
    }
}

impl Display for DdlError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// An error returned by a [statistics store](crate::store::StatsStore) when
/// it can not execute a statement.
#[derive(Debug)]
pub struct ExecutionError {
    message: String,
    cause: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ExecutionError {
    /// Creates an execution error with the given message.
    pub fn new<T>(message: T) -> Self
    where
        T: Into<String>,
    {
        ExecutionError {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates an execution error with the given message and cause.
    pub fn with_cause<T, E>(message: T, cause: E) -> Self
    where
        T: Into<String>,
        E: Error + Send + Sync + 'static,
    {
        ExecutionError {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// The message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ExecutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(cause) = self.cause.as_ref() {
            write!(f, " caused by: {}", cause)?
        }
        Ok(())
    }
}

impl Error for ExecutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_ref().map(|cause| cause.as_ref() as &(dyn Error + 'static))
    }
}

/// Internal error. See [StatisticsError::Internal].
#[derive(Debug)]
pub struct InternalError {
    message: String,
    backtrace: Backtrace,
}

impl InternalError {
    /// Creates an instance of an [InternalError] with the given message.
    /// This method captures a backtrace.
    pub fn new<T>(message: T) -> Self
    where
        T: Into<String>,
    {
        InternalError {
            message: message.into(),
            backtrace: Backtrace::new(),
        }
    }
}

impl From<&str> for InternalError {
    fn from(message: &str) -> Self {
        InternalError::new(message)
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        InternalError::new(message)
    }
}

impl Display for InternalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod test {
    use crate::error::{ExecutionError, StatisticsError};
    use std::error::Error;

    #[test]
    fn ddl_error_source() {
        let cause = ExecutionError::new("connection reset");
        let err = StatisticsError::ddl(cause);

        assert_eq!(format!("{}", err), "DDL error: connection reset");
        let source = err.source().expect("no source error");
        assert_eq!(format!("{}", source), "connection reset", "source error");
    }

    #[test]
    fn execution_error_with_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "broken pipe");
        let err = StatisticsError::from(ExecutionError::with_cause("query failed", io));

        assert_eq!(format!("{}", err), "Execution error: query failed caused by: broken pipe");
        assert!(err.source().is_some(), "no source error");
    }

    #[test]
    fn internal_error_without_source() {
        let err = StatisticsError::internal("id: 1--1-a should be unique");
        assert!(err.source().is_none())
    }
}
