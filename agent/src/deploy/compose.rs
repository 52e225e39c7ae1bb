//! Docker Compose invocations for the application stack

use std::path::Path;

use crate::runner::{self, CommandFailure};

/// Stop the application stack.
pub async fn down(dir: &Path) -> Result<(), CommandFailure> {
    runner::run("docker", &["compose", "down"], Some(dir), &[]).await
}

/// Rebuild the application image from the checkout.
pub async fn build(dir: &Path) -> Result<(), CommandFailure> {
    runner::run("docker", &["compose", "build"], Some(dir), &[]).await
}

/// Start the application stack from the current image.
pub async fn up(dir: &Path) -> Result<(), CommandFailure> {
    runner::run("docker", &["compose", "up", "-d"], Some(dir), &[]).await
}
