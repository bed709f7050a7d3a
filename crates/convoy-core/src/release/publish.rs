//! Concurrent publish execution
//!
//! Uploads run batch by batch: batches are serial, the packages inside one
//! batch upload concurrently up to the configured worker limit. A failed
//! upload is recorded and does not block independent uploads already in
//! flight or scheduled. The one retry in the system is the OTP challenge:
//! the operator is prompted once, the code is cached, and the same upload
//! is retried with it attached.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, instrument, warn};

use crate::error::{PublishError, Result, WorkflowError};
use crate::package::Package;
use crate::prompt::Prompter;
use crate::registry::RegistryClient;

/// Aggregated result of the publish stage
#[derive(Debug, Default)]
pub struct PublishOutcome {
    /// Packages whose upload succeeded, in completion order
    pub published: Vec<String>,
    /// Packages whose upload failed, with the failure text
    pub failed: Vec<(String, String)>,
}

/// Shared one-time-password state: prompted for at most once per run
struct OtpState {
    code: Mutex<Option<String>>,
    prompter: Arc<dyn Prompter>,
}

impl OtpState {
    /// Return a usable code, prompting the operator on first use. `stale` is
    /// the code the failed attempt already carried; a cached code equal to it
    /// has expired and is replaced.
    async fn obtain(&self, package: &str, stale: Option<&str>) -> Result<String> {
        let mut guard = self.code.lock().await;
        if let Some(code) = guard.as_ref() {
            if stale != Some(code.as_str()) {
                return Ok(code.clone());
            }
        }

        let prompter = self.prompter.clone();
        let prompt = format!(
            "This operation requires a one-time password (requested for {})",
            package
        );
        let code = tokio::task::spawn_blocking(move || prompter.text_input(&prompt))
            .await
            .map_err(|e| WorkflowError::ValidationFailed(format!("prompt task failed: {}", e)))??;

        *guard = Some(code.clone());
        Ok(code)
    }
}

/// Execute the publish stage over the prepared batches.
///
/// `artifacts` maps package name to its packed tarball; `dist_tags` maps
/// package name to the distribution tag its upload carries. Private
/// packages are skipped. `otp` seeds the shared one-time-password cache
/// when supplied up front.
#[instrument(skip_all, fields(batches = batches.len(), concurrency))]
pub fn publish_batches(
    batches: &[Vec<Package>],
    artifacts: &HashMap<String, PathBuf>,
    dist_tags: &HashMap<String, String>,
    registry: Arc<dyn RegistryClient>,
    prompter: Arc<dyn Prompter>,
    otp: Option<String>,
    concurrency: usize,
) -> Result<PublishOutcome> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let otp_state = Arc::new(OtpState {
        code: Mutex::new(otp),
        prompter,
    });

    runtime.block_on(async {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut outcome = PublishOutcome::default();

        for batch in batches {
            let mut handles = Vec::new();

            for pkg in batch {
                if pkg.private {
                    debug!(package = %pkg.name, "private package; not published");
                    continue;
                }
                let Some(tarball) = artifacts.get(&pkg.name).cloned() else {
                    debug!(package = %pkg.name, "no artifact; not published");
                    continue;
                };
                let dist_tag = dist_tags
                    .get(&pkg.name)
                    .cloned()
                    .unwrap_or_else(|| "latest".to_string());

                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let registry = registry.clone();
                let otp_state = otp_state.clone();
                let pkg = pkg.clone();

                handles.push(tokio::spawn(async move {
                    let result =
                        publish_one(registry, otp_state, &pkg, tarball, &dist_tag).await;
                    drop(permit);
                    (pkg.name, result)
                }));
            }

            // Batches are serial: the next batch starts only when every
            // upload of this one has settled
            for handle in handles {
                match handle.await {
                    Ok((name, Ok(()))) => outcome.published.push(name),
                    Ok((name, Err(e))) => outcome.failed.push((name, e.to_string())),
                    Err(e) => warn!(error = %e, "publish task panicked"),
                }
            }
        }

        info!(
            published = outcome.published.len(),
            failed = outcome.failed.len(),
            "publish stage complete"
        );
        Ok(outcome)
    })
}

/// Upload one package, retrying exactly once on an OTP challenge.
async fn publish_one(
    registry: Arc<dyn RegistryClient>,
    otp_state: Arc<OtpState>,
    pkg: &Package,
    tarball: PathBuf,
    dist_tag: &str,
) -> std::result::Result<(), PublishError> {
    let attempt_otp = otp_state.code.lock().await.clone();
    let first = blocking_publish(
        registry.clone(),
        pkg.clone(),
        tarball.clone(),
        dist_tag.to_string(),
        attempt_otp.clone(),
    )
    .await;

    match first {
        Ok(()) => Ok(()),
        Err(e) if e.is_otp_challenge() => {
            debug!(package = %pkg.name, "OTP challenge; prompting and retrying once");
            let code = otp_state
                .obtain(&pkg.name, attempt_otp.as_deref())
                .await
                .map_err(|e| PublishError::UploadFailed {
                    package: pkg.name.clone(),
                    reason: e.to_string(),
                })?;
            blocking_publish(
                registry,
                pkg.clone(),
                tarball,
                dist_tag.to_string(),
                Some(code),
            )
            .await
        }
        Err(e) => Err(e),
    }
}

/// The registry client is synchronous (it drives a child process), so every
/// upload runs on the blocking pool.
async fn blocking_publish(
    registry: Arc<dyn RegistryClient>,
    pkg: Package,
    tarball: PathBuf,
    dist_tag: String,
    otp: Option<String>,
) -> std::result::Result<(), PublishError> {
    tokio::task::spawn_blocking(move || {
        registry.publish(&pkg, &tarball, &dist_tag, otp.as_deref())
    })
    .await
    .map_err(|e| PublishError::CommandFailed {
        command: "publish".to_string(),
        reason: format!("upload task failed: {}", e),
    })?
}
