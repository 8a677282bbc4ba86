//! Batch execution across devices.
//!
//! Runs one sequence per device, concurrently across devices, bounded by a
//! `forks` limit. Devices share nothing: a failure, or even a panic, in one
//! device's task never affects another.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::error::Error;
use crate::network::{
    AuditReport, Auditor, ConfigUrl, DeviceDescriptor, InstallFailure, InstallReport, Installer,
};

/// Outcome of an install run for one device.
pub type InstallOutcome = std::result::Result<InstallReport, InstallFailure>;

/// Runs device sequences concurrently with a bounded number of forks.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    forks: usize,
    semaphore: Arc<Semaphore>,
}

impl BatchRunner {
    /// Create a runner handling at most `forks` devices at once.
    pub fn new(forks: usize) -> Self {
        let forks = forks.max(1);
        Self {
            forks,
            semaphore: Arc::new(Semaphore::new(forks)),
        }
    }

    /// Concurrency limit
    pub fn forks(&self) -> usize {
        self.forks
    }

    /// Run `job` for every device and return the outcomes in input order.
    ///
    /// A device whose task panics gets `Err(Error::Internal)`.
    pub async fn run<T, F, Fut>(
        &self,
        devices: Vec<DeviceDescriptor>,
        job: F,
    ) -> Vec<(DeviceDescriptor, std::result::Result<T, Error>)>
    where
        T: Send + 'static,
        F: Fn(DeviceDescriptor) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        debug!(devices = devices.len(), forks = self.forks, "Starting batch");
        let job = Arc::new(job);

        let handles: Vec<_> = devices
            .iter()
            .cloned()
            .map(|device| {
                let semaphore = Arc::clone(&self.semaphore);
                let job = Arc::clone(&job);

                tokio::spawn(async move {
                    let _permit = semaphore.acquire().await.ok();
                    job(device).await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(devices)
            .map(|(joined, device)| {
                let outcome = joined.map_err(|e| {
                    error!(host = %device.host, error = %e, "Device task aborted");
                    Error::Internal(format!("task for '{}' failed: {}", device.host, e))
                });
                (device, outcome)
            })
            .collect()
    }

    /// Audit every device with the same command list.
    pub async fn run_audit(
        &self,
        auditor: Arc<Auditor>,
        devices: Vec<DeviceDescriptor>,
        commands: Arc<Vec<String>>,
    ) -> Vec<AuditReport> {
        self.run(devices, move |device| {
            let auditor = Arc::clone(&auditor);
            let commands = Arc::clone(&commands);
            async move { auditor.run(&device, &commands).await }
        })
        .await
        .into_iter()
        .map(|(device, outcome)| match outcome {
            Ok(report) => report,
            Err(error) => AuditReport::failed(&device.host, error),
        })
        .collect()
    }

    /// Install the same configuration URL on every device.
    pub async fn run_install(
        &self,
        installer: Arc<Installer>,
        devices: Vec<DeviceDescriptor>,
        url: ConfigUrl,
        backup_name: Option<String>,
    ) -> Vec<InstallOutcome> {
        let failed_url = url.clone();
        let url = Arc::new(url);
        let backup_name = Arc::new(backup_name);

        self.run(devices, move |device| {
            let installer = Arc::clone(&installer);
            let url = Arc::clone(&url);
            let backup_name = Arc::clone(&backup_name);
            async move {
                installer
                    .run(&device, &url, backup_name.as_deref())
                    .await
            }
        })
        .await
        .into_iter()
        .map(|(device, outcome)| match outcome {
            Ok(result) => result,
            Err(error) => Err(InstallFailure::aborted(&device.host, &failed_url, error)),
        })
        .collect()
    }
}
