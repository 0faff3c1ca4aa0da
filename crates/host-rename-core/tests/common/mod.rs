//! Test doubles and common utilities for contract tests
//!
//! These doubles stand in for the inventory API and the rename command so
//! the contract tests can drive the engine without network or processes.

#![allow(dead_code)]

use async_trait::async_trait;
use host_rename_core::config::LimitsConfig;
use host_rename_core::error::{Error, Result};
use host_rename_core::traits::{InventoryPage, InventorySource, NotifyOutcome, RenameNotifier};
use host_rename_core::{HostRecord, RenameEngine};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An inventory that serves a fixed host list in pages
///
/// When `fail_on_page` is set, that page returns an error instead.
pub struct StaticInventory {
    hosts: Vec<HostRecord>,
    fail_on_page: Option<u32>,
    fetch_count: Arc<AtomicUsize>,
}

impl StaticInventory {
    pub fn new(hosts: Vec<HostRecord>) -> Self {
        Self {
            hosts,
            fail_on_page: None,
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail when `page` is requested
    pub fn failing_on_page(mut self, page: u32) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    /// Shared counter of fetch_page() calls
    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetch_count)
    }
}

#[async_trait]
impl InventorySource for StaticInventory {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<InventoryPage> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_on_page == Some(page) {
            return Err(Error::import(format!("connection reset on page {}", page)));
        }

        let start = (page as usize - 1) * per_page as usize;
        let records = self
            .hosts
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect();
        Ok(InventoryPage::new(records, self.hosts.len() as u64))
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// An inventory that never answers
pub struct HangingInventory;

#[async_trait]
impl InventorySource for HangingInventory {
    async fn fetch_page(&self, _page: u32, _per_page: u32) -> Result<InventoryPage> {
        std::future::pending::<Result<InventoryPage>>().await
    }

    fn source_name(&self) -> &'static str {
        "hanging"
    }
}

/// A notifier that records every call
#[derive(Clone)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<(String, String)>>>,
    outcome: NotifyOutcome,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::with_outcome(NotifyOutcome::Succeeded)
    }

    pub fn with_outcome(outcome: NotifyOutcome) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            outcome,
        }
    }

    /// Every (old_name, new_name) pair passed so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenameNotifier for RecordingNotifier {
    async fn notify(&self, old_name: &str, new_name: &str) -> Result<NotifyOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push((old_name.to_string(), new_name.to_string()));
        Ok(self.outcome.clone())
    }
}

/// Collects formatted log lines written while its guard is held
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Route this thread's events at `WARN` and above into the capture
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Everything logged so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Hosts `1..=n` named `hostN.example.com`
pub fn hosts(n: i64) -> Vec<HostRecord> {
    (1..=n)
        .map(|i| HostRecord::new(i, format!("host{}.example.com", i)))
        .collect()
}

/// Limits with short timeouts for tests
pub fn test_limits(page_size: u32) -> LimitsConfig {
    LimitsConfig {
        lock_timeout_secs: 2,
        import_timeout_secs: 2,
        notify_timeout_secs: 2,
        page_size,
    }
}

/// Engine over `path` with a static inventory and a recording notifier
pub fn engine_with(
    path: &Path,
    inventory: impl InventorySource + 'static,
    notifier: &RecordingNotifier,
) -> RenameEngine {
    RenameEngine::new(
        path,
        Box::new(inventory),
        Box::new(notifier.clone()),
        test_limits(100),
    )
}

/// Write an executable shell script into `dir`
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
