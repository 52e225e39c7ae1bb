//! The database reset procedure
//!
//! Resets the application's SQLite database inside the running container to
//! the baseline the e2e suite expects. The statement batch is inert
//! configuration: fixed deletions that clear test-generated data while
//! preserving the e2e service-account row and the default group row.

use std::sync::Arc;

use tracing::info;

use crate::config::Settings;
use crate::errors::ProcedureError;
use crate::jobs::Job;
use crate::runner;

/// Rows matching these predicates survive every reset: the e2e suite logs in
/// as the service account and assigns new users to the default group.
const RESET_STATEMENTS: &[&str] = &[
    "DELETE FROM chat;",
    "DELETE FROM chatidtag;",
    "DELETE FROM document;",
    "DELETE FROM file;",
    "DELETE FROM memory;",
    "DELETE FROM prompt;",
    "DELETE FROM tag;",
    "DELETE FROM feedback;",
    "DELETE FROM auth WHERE email <> 'e2e-service@beta.local';",
    "DELETE FROM user WHERE email <> 'e2e-service@beta.local';",
    "DELETE FROM \"group\" WHERE name <> 'default';",
];

fn reset_batch() -> String {
    format!("BEGIN;\n{}\nCOMMIT;", RESET_STATEMENTS.join("\n"))
}

pub async fn run(settings: Arc<Settings>, job: Arc<Job>) -> Result<(), ProcedureError> {
    let container = settings.container_name.as_str();
    info!(container, "Starting database reset");

    job.set_step("checking for sqlite3 in container");
    let have_sqlite = runner::run(
        "docker",
        &["exec", container, "sh", "-c", "command -v sqlite3"],
        None,
        &[],
    )
    .await
    .is_ok();

    if !have_sqlite {
        job.set_step("installing sqlite3 in container");
        runner::run(
            "docker",
            &[
                "exec",
                container,
                "sh",
                "-c",
                "apt-get update -qq && apt-get install -y -qq sqlite3",
            ],
            None,
            &[],
        )
        .await
        .map_err(|e| {
            ProcedureError::Precondition(format!(
                "sqlite3 is missing and could not be installed: {}",
                e
            ))
        })?;
    }

    job.set_step("checking database file");
    runner::run(
        "docker",
        &["exec", container, "test", "-f", &settings.db_path],
        None,
        &[],
    )
    .await
    .map_err(|_| {
        ProcedureError::Precondition(format!(
            "database file {} not found in container {}",
            settings.db_path, container
        ))
    })?;

    job.set_step("clearing e2e tables");
    let batch = reset_batch();
    runner::run(
        "docker",
        &["exec", container, "sqlite3", &settings.db_path, &batch],
        None,
        &[],
    )
    .await?;

    info!(container, "Database reset finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_batch_is_transactional() {
        let batch = reset_batch();
        assert!(batch.starts_with("BEGIN;"));
        assert!(batch.ends_with("COMMIT;"));
    }

    #[test]
    fn test_reset_preserves_designated_rows() {
        for statement in RESET_STATEMENTS {
            let guarded = statement.contains("FROM auth")
                || statement.contains("FROM user")
                || statement.contains("FROM \"group\"");
            if guarded {
                assert!(
                    statement.contains("WHERE"),
                    "unguarded delete on protected table: {}",
                    statement
                );
            }
            assert!(statement.ends_with(';'));
        }

        let batch = reset_batch();
        assert!(batch.contains("<> 'e2e-service@beta.local'"));
        assert!(batch.contains("<> 'default'"));
    }
}
