//! Per-migration results and the aggregate outcome of a run.

use std::error::Error as StdError;
use std::fmt;

/// What happened to one migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Applied and recorded.
    Success,
    /// Empty; skipped without being recorded.
    Warning,
    /// Failed; the run stopped here.
    Error {
        /// The error message.
        message: String,
        /// Messages of the underlying causes, outermost first.
        causes: Vec<String>,
    },
}

impl Status {
    /// Builds an error status from `err` and its source chain.
    #[must_use]
    pub fn error(err: &(dyn StdError + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self::Error {
            message: err.to_string(),
            causes,
        }
    }
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The migration name.
    pub name: String,
    /// Its status.
    pub status: Status,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            Status::Success => write!(f, "Success: Migration '{}' successfully applied", self.name),
            Status::Warning => write!(f, "Warning: Migration '{}' is empty. Skipped", self.name),
            Status::Error { message, .. } => write!(
                f,
                "Error: while working on migration '{}'\n{message}",
                self.name
            ),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing was applied.
    NoChanges,
    /// Migrations were applied and kept.
    Applied,
    /// Migrations ran inside a transaction that was rolled back because
    /// `apply` was not set.
    TestRun,
    /// A migration failed and the transaction was rolled back.
    RolledBack,
    /// A migration failed after earlier ones had been applied without a
    /// transaction.
    Partial,
}

/// The itemized result of a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Processed migrations in order.
    pub entries: Vec<Entry>,
    /// How the run ended.
    pub outcome: Outcome,
    /// Number of migrations that succeeded.
    pub applied: usize,
}

impl MigrationReport {
    /// Returns whether the run failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::RolledBack | Outcome::Partial)
    }

    /// Returns the process exit code for the run.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.is_failure() {
            1
        } else {
            0
        }
    }

    /// Returns the closing summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let count = migrations(self.applied);
        match self.outcome {
            Outcome::RolledBack => String::from("Due to errors no migrations applied"),
            Outcome::NoChanges => String::from("No migrations applied"),
            Outcome::Applied => format!("{count} successfully applied"),
            Outcome::TestRun => format!(
                "Test run only\nWould apply {count}. Use the switch --apply to make it happen"
            ),
            Outcome::Partial => format!("{count} applied until the error occurred"),
        }
    }

    /// Returns the names of the successfully applied migrations.
    pub fn applied_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.status == Status::Success)
            .map(|entry| entry.name.as_str())
    }
}

fn migrations(n: usize) -> String {
    if n == 1 {
        String::from("1 migration")
    } else {
        format!("{n} migrations")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: Outcome, applied: usize) -> MigrationReport {
        MigrationReport {
            entries: Vec::new(),
            outcome,
            applied,
        }
    }

    #[test]
    fn test_summaries() {
        assert_eq!(
            report(Outcome::Applied, 1).summary(),
            "1 migration successfully applied"
        );
        assert_eq!(
            report(Outcome::Applied, 3).summary(),
            "3 migrations successfully applied"
        );
        assert_eq!(
            report(Outcome::TestRun, 2).summary(),
            "Test run only\nWould apply 2 migrations. Use the switch --apply to make it happen"
        );
        assert_eq!(
            report(Outcome::Partial, 2).summary(),
            "2 migrations applied until the error occurred"
        );
        assert_eq!(
            report(Outcome::RolledBack, 0).summary(),
            "Due to errors no migrations applied"
        );
        assert_eq!(report(Outcome::NoChanges, 0).summary(), "No migrations applied");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(report(Outcome::NoChanges, 0).exit_code(), 0);
        assert_eq!(report(Outcome::TestRun, 1).exit_code(), 0);
        assert_eq!(report(Outcome::RolledBack, 0).exit_code(), 1);
        assert_eq!(report(Outcome::Partial, 1).exit_code(), 1);
    }

    #[test]
    fn test_error_status_collects_causes() {
        let io = std::io::Error::other("disk full");
        let err = crate::error::MigrateError::Io(io);
        let Status::Error { message, causes } = Status::error(&err) else {
            panic!("expected an error status");
        };
        assert_eq!(message, "IO error: disk full");
        assert_eq!(causes, vec!["disk full".to_string()]);
    }

    #[test]
    fn test_entry_display() {
        let entry = Entry {
            name: "a.sql".to_string(),
            status: Status::Warning,
        };
        assert_eq!(entry.to_string(), "Warning: Migration 'a.sql' is empty. Skipped");
    }
}
