use bucketvis_core::{CheckOutcome, Severity};
use std::fmt;
use std::process::ExitCode;

pub const CHECK_NAME: &str = "CheckS3BucketVisibility";

/// Terminal state of a monitoring check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status { Ok, Warning, Critical, Unknown }

impl Status {
    pub fn code(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }
}

impl From<Severity> for Status {
    fn from(s: Severity) -> Self {
        match s {
            Severity::Ok => Status::Ok,
            Severity::Warning => Status::Warning,
            Severity::Critical => Status::Critical,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        })
    }
}

pub struct Report { pub status: Status, pub message: String }

impl Report {
    pub fn unknown(err: &anyhow::Error) -> Self {
        Self { status: Status::Unknown, message: format!("{err:#}") }
    }

    pub fn line(&self) -> String { format!("{CHECK_NAME} {}: {}", self.status, self.message) }

    /// Prints the single status line and returns the matching exit code.
    pub fn emit(self) -> ExitCode {
        println!("{}", self.line());
        ExitCode::from(self.status.code())
    }
}

impl From<CheckOutcome> for Report {
    fn from(o: CheckOutcome) -> Self { Self { status: o.severity.into(), message: o.message } }
}
