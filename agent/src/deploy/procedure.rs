//! The deployment procedure
//!
//! A fixed ordered phase sequence that brings the Beta environment to a new
//! branch's build. Each phase updates the job's `step` immediately before
//! execution so a concurrent poller observes accurate progress. Any phase
//! failure aborts the remaining phases; the caller captures the cause into
//! the job's terminal state.

use std::sync::Arc;

use tracing::info;

use crate::config::Settings;
use crate::deploy::compose;
use crate::deploy::git::GitAccessor;
use crate::errors::ProcedureError;
use crate::jobs::Job;
use crate::runner;

pub async fn run(
    settings: Arc<Settings>,
    branch: String,
    job: Arc<Job>,
) -> Result<(), ProcedureError> {
    info!(%branch, "Starting deploy");

    job.set_step("stopping application stack");
    compose::down(&settings.compose_dir).await?;

    let git = GitAccessor::new(
        settings.repo_dir.clone(),
        settings.git_username.clone(),
        settings.git_token.clone(),
    );

    git.with_authenticated_remote(|| async {
        job.set_step(format!("fast-forwarding {}", settings.main_branch));
        git.git(&["checkout", &settings.main_branch]).await?;
        // --ff-only: fail rather than silently diverge
        git.git(&["pull", "--ff-only", "origin", &settings.main_branch])
            .await?;

        job.set_step(format!("switching checkout to {}", branch));
        // Fetch before switching so branches unknown to the local checkout
        // resolve against the remote
        git.git(&["fetch", "origin", &branch]).await?;
        git.git(&["checkout", "-B", &branch, &format!("origin/{}", branch)])
            .await?;
        Ok(())
    })
    .await?;

    job.set_step("removing previous application image");
    runner::run("docker", &["image", "rm", &settings.app_image], None, &[]).await?;
    runner::run("docker", &["builder", "prune", "-f"], None, &[]).await?;

    job.set_step("building application image");
    compose::build(&settings.compose_dir).await?;

    job.set_step("starting application stack");
    compose::up(&settings.compose_dir).await?;

    info!(%branch, "Deploy finished");
    Ok(())
}
