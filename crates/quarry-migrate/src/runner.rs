//! Applies pending migrations in order.

use std::collections::BTreeMap;
use std::fs;

use quarry_core::template::Context;
use quarry_core::{ScriptKind, TemplateEngine, DEFAULT_NAMESPACE};
use tracing::{debug, info, warn};

use crate::environment::Environment;
use crate::error::Result;
use crate::migration::{self, CodeMigration, MigrationFile};
use crate::report::{Entry, MigrationReport, Outcome, Status};

/// A pending migration, from disk or from code.
enum Candidate<'a> {
    File(MigrationFile),
    Code(&'a dyn CodeMigration),
}

impl Candidate<'_> {
    fn name(&self) -> &str {
        match self {
            Self::File(file) => &file.name,
            Self::Code(migration) => migration.name(),
        }
    }
}

/// Runs the migrations of one namespace.
///
/// On transactional dialects the whole batch runs in one transaction that is
/// only committed when [`Migrator::apply`] is set; otherwise every migration
/// is applied as it runs.
#[derive(Default)]
pub struct Migrator {
    namespace: Option<String>,
    apply: bool,
    code: BTreeMap<String, Vec<Box<dyn CodeMigration>>>,
}

impl Migrator {
    /// Creates a migrator for the `default` namespace in test-run mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the namespace to migrate.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Commits the batch instead of rolling it back.
    #[must_use]
    pub const fn apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    /// Registers a code migration for `namespace`.
    #[must_use]
    pub fn register(
        mut self,
        namespace: impl Into<String>,
        migration: impl CodeMigration + 'static,
    ) -> Self {
        self.code
            .entry(namespace.into())
            .or_default()
            .push(Box::new(migration));
        self
    }

    /// Runs every pending migration of the selected namespace.
    ///
    /// Failures of individual migrations end up in the report; the returned
    /// error covers only what happens before the first migration runs.
    ///
    /// # Errors
    ///
    /// Returns `NoMigrationDirectories` or `NamespaceNotFound` for a bad
    /// selection, `Io` if a directory cannot be listed and `SqlExecution` if
    /// the migrations table cannot be created or read.
    pub fn run(&self, env: &mut Environment) -> Result<MigrationReport> {
        if env.ensure_migrations_table()? {
            info!(table = %env.history().table(), "Created missing migrations table");
        }

        let dirs = migration::namespace_dirs(
            env.connection().migration_dirs(),
            self.namespace.as_deref(),
        )?;
        let candidates = self.candidates(&migration::discover(dirs)?);
        let transactional = env.dialect().supports_transactions();

        if transactional {
            env.db_mut().begin()?;
        }
        let done = match env.applied_migrations() {
            Ok(done) => done,
            Err(err) => {
                if transactional {
                    env.db_mut().rollback()?;
                }
                return Err(err);
            }
        };

        let dialect = env.dialect();
        let mut entries = Vec::new();
        let mut applied = 0;
        let mut failed = false;
        for candidate in &candidates {
            let name = candidate.name();
            if done.contains(name) {
                debug!(migration = name, "Already applied");
                continue;
            }
            if !migration::applies_to(name, dialect) {
                debug!(migration = name, dialect = %dialect, "Not for this dialect");
                continue;
            }

            info!(migration = name, "Applying migration");
            let status = match migrate(env, candidate) {
                Ok(true) => {
                    applied += 1;
                    Status::Success
                }
                Ok(false) => {
                    warn!(migration = name, "Migration is empty, skipping");
                    Status::Warning
                }
                Err(err) => {
                    warn!(migration = name, error = %err, "Migration failed");
                    failed = true;
                    Status::error(&err)
                }
            };
            entries.push(Entry {
                name: name.to_string(),
                status,
            });
            if failed {
                break;
            }
        }

        let outcome = self.finish(env, transactional, failed, applied)?;
        let report = MigrationReport {
            entries,
            outcome,
            applied,
        };
        info!(applied, outcome = ?outcome, "{}", report.summary());
        Ok(report)
    }

    /// Merges the files with the code migrations of the namespace.
    fn candidates(&self, files: &[MigrationFile]) -> Vec<Candidate<'_>> {
        let namespace = self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
        let mut candidates: Vec<Candidate<'_>> =
            files.iter().cloned().map(Candidate::File).collect();
        if let Some(code) = self.code.get(namespace) {
            candidates.extend(code.iter().map(|m| Candidate::Code(m.as_ref())));
        }
        candidates.sort_by(|a, b| a.name().cmp(b.name()));
        candidates
    }

    fn finish(
        &self,
        env: &mut Environment,
        transactional: bool,
        failed: bool,
        applied: usize,
    ) -> Result<Outcome> {
        if !transactional {
            return Ok(if failed {
                Outcome::Partial
            } else if applied == 0 {
                Outcome::NoChanges
            } else {
                Outcome::Applied
            });
        }

        let outcome = if failed {
            Outcome::RolledBack
        } else if applied == 0 {
            Outcome::NoChanges
        } else if self.apply {
            Outcome::Applied
        } else {
            Outcome::TestRun
        };
        if outcome == Outcome::Applied {
            env.db_mut().commit()?;
        } else {
            env.db_mut().rollback()?;
        }
        Ok(outcome)
    }
}

/// Applies one migration and records it. Returns `false` for an empty one.
fn migrate(env: &mut Environment, candidate: &Candidate<'_>) -> Result<bool> {
    match candidate {
        Candidate::File(file) => {
            let source = fs::read_to_string(&file.path)?;
            if source.trim().is_empty() {
                return Ok(false);
            }
            let sql = match file.kind {
                ScriptKind::Plain => source,
                ScriptKind::Template => render(env, file, &source)?,
            };
            if sql.trim().is_empty() {
                return Ok(false);
            }
            env.db_mut().execute_unprepared(&sql)?;
        }
        Candidate::Code(migration) => migration.run(env.db_mut())?,
    }
    env.record_migration(candidate.name())?;
    Ok(true)
}

fn render(env: &Environment, file: &MigrationFile, source: &str) -> Result<String> {
    let dialect = env.dialect();
    let context = Context::new(dialect).with("driver", dialect.as_str());
    Ok(TemplateEngine::new(dialect).render_source(&file.path, source, &context)?)
}
