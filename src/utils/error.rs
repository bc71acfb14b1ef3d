use crate::domain::model::{ItemKind, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Corrupt record in {file} at line {line}: {reason}")]
    CorruptRecord {
        file: String,
        line: u64,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    #[error("User '{name}' already exists")]
    DuplicateUser { name: String },

    #[error("Wrong password for user '{name}'")]
    WrongPassword { name: String },

    #[error("{actor} is not allowed to {action}")]
    PermissionDenied { actor: String, action: String },

    #[error("Subject '{name}' already exists (professor {professor_id})")]
    SubjectExists { name: String, professor_id: UserId },

    #[error("Professor {professor_id} does not teach '{subject}'")]
    NotSubjectOwner {
        professor_id: UserId,
        subject: String,
    },

    #[error("Student {student_id} is not enrolled in '{subject}'")]
    NotEnrolled { student_id: UserId, subject: String },

    #[error("Student {student_id} is already enrolled in '{subject}'")]
    AlreadyEnrolled { student_id: UserId, subject: String },

    #[error("{kind} '{name}' is not declared on '{subject}'")]
    UnknownItem {
        kind: ItemKind,
        subject: String,
        name: String,
    },

    #[error("{kind} '{name}' already exists on '{subject}'")]
    DuplicateItem {
        kind: ItemKind,
        subject: String,
        name: String,
    },

    #[error("Submission of '{item}' in '{subject}' is already awaiting review")]
    DuplicateSubmission { subject: String, item: String },

    #[error("No pending submission of '{item}' in '{subject}' for student {student_id}")]
    NoPendingSubmission {
        student_id: UserId,
        subject: String,
        item: String,
    },

    #[error("'{item}' in '{subject}' has already been graded")]
    AlreadyGraded { subject: String, item: String },

    #[error("Score {score} is outside 0..={max}")]
    ScoreOutOfRange { score: f64, max: f64 },

    #[error("Report '{topic}' is full")]
    ReportFull { topic: String },

    #[error("Report '{topic}' is already completed")]
    ReportCompleted { topic: String },

    #[error("Student {student_id} is already signed up for '{topic}'")]
    AlreadySignedUp { student_id: UserId, topic: String },

    #[error("Student {student_id} is not signed up for '{topic}'")]
    NotSignedUp { student_id: UserId, topic: String },

    #[error("Nobody is signed up for report '{topic}'")]
    EmptyRoster { topic: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Precondition,
    Authentication,
    Configuration,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RecordsError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        RecordsError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        use RecordsError::*;
        match self {
            IoError(_) | CsvError(_) | SerializationError(_) | CorruptRecord { .. } => {
                ErrorCategory::Storage
            }
            ConfigError { .. } | InvalidConfigValueError { .. } | MissingConfigError { .. } => {
                ErrorCategory::Configuration
            }
            NotFound { .. } => ErrorCategory::NotFound,
            WrongPassword { .. } | PermissionDenied { .. } => ErrorCategory::Authentication,
            _ => ErrorCategory::Precondition,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Storage => ErrorSeverity::Critical,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Authentication => ErrorSeverity::Medium,
            ErrorCategory::NotFound | ErrorCategory::Precondition => ErrorSeverity::Low,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        use RecordsError::*;
        match self {
            IoError(_) => "Check that the data directory exists and is writable",
            CsvError(_) | CorruptRecord { .. } => {
                "Inspect the named data file; fix or remove the malformed line"
            }
            SerializationError(_) => "Re-run the export; the snapshot could not be encoded",
            ConfigError { .. } | InvalidConfigValueError { .. } | MissingConfigError { .. } => {
                "Review the configuration file and command line flags"
            }
            ValidationError { .. } => "Correct the input and try again",
            NotFound { .. } => "Check the spelling; subject codes are entered as $CODE",
            DuplicateUser { .. } => "Pick a different user name",
            WrongPassword { .. } => "Re-enter the password",
            PermissionDenied { .. } => "Log in with an account that has the required role",
            SubjectExists { .. } => "Take over the existing subject or choose another name",
            NotSubjectOwner { .. } => "Only the professor teaching the subject may change it",
            NotEnrolled { .. } => "Ask the professor to enroll the student first",
            AlreadyEnrolled { .. } => "Nothing to do; the enrollment already exists",
            UnknownItem { .. } => "List the subject's assignments and reports and pick one",
            DuplicateItem { .. } => "Use a name that is not yet declared on the subject",
            DuplicateSubmission { .. } => "Wait for the professor to review the submission",
            NoPendingSubmission { .. } => "Refresh the list of pending submissions",
            AlreadyGraded { .. } => "Grades are final once recorded",
            ScoreOutOfRange { .. } => "Enter a score within the allowed range",
            ReportFull { .. } | ReportCompleted { .. } => "Choose another report",
            AlreadySignedUp { .. } | NotSignedUp { .. } => "Check the report roster",
            EmptyRoster { .. } => "Wait until students sign up for the report",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Storage => format!("Could not access stored records: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecordsError>;
