// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Progress reporting.
//!
//! Workers push events into a channel; a single consumer thread serializes
//! them as JSON lines on stderr. Results go to stdout, so the two streams
//! never mix and sending never blocks a worker.

use std::io::Write;
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, unbounded};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Scanning,
    Loading,
    Searching,
    Complete,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub stage: Stage,
    pub message: String,
    pub total_files: usize,
    pub processed_files: usize,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(stage: Stage, message: impl Into<String>, total: usize, processed: usize) -> Self {
        Self {
            kind: "progress",
            stage,
            message: message.into(),
            total_files: total,
            processed_files: processed,
        }
    }
}

/// Owns the consumer thread. Clone [`ProgressReporter::sender`] into workers;
/// call [`ProgressReporter::finish`] after they quiesce.
pub struct ProgressReporter {
    tx: Sender<ProgressEvent>,
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    #[must_use]
    pub fn spawn() -> Self {
        let (tx, rx) = unbounded::<ProgressEvent>();
        let handle = std::thread::spawn(move || {
            let stderr = std::io::stderr();
            for event in rx {
                if let Ok(line) = serde_json::to_string(&event) {
                    let mut out = stderr.lock();
                    let _ = writeln!(out, "{line}");
                }
            }
        });
        Self { tx, handle }
    }

    #[must_use]
    pub fn sender(&self) -> Sender<ProgressEvent> {
        self.tx.clone()
    }

    pub fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }

    /// Drop the sender and wait for the consumer to drain.
    pub fn finish(self) {
        drop(self.tx);
        let _ = self.handle.join();
    }
}
