//! Terminal rendering of store events.

use crate::store::{SnackKind, Store, StoreEvent, TransferStatus};
use std::collections::HashMap;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use transfer_http::CancellationToken;

/// Progress lines are printed once per this many percent
const PROGRESS_STEP: u32 = 25;

#[derive(Default)]
pub(crate) struct EventPrinter {
    names: HashMap<String, String>,
    printed_steps: HashMap<String, u32>,
}

impl EventPrinter {
    fn name<'a>(&'a self, instance_id: &'a str) -> &'a str {
        self.names
            .get(instance_id)
            .map(String::as_str)
            .unwrap_or(instance_id)
    }

    /// Line to print for `event`, if it deserves one.
    pub(crate) fn describe(&mut self, event: &StoreEvent) -> Option<String> {
        match event {
            StoreEvent::TransferAdded(item) => {
                self.names
                    .insert(item.instance_id.clone(), item.prefix.clone());
                Some(format!("{} started: {}/{}", item.kind, item.bucket_name, item.prefix))
            }
            StoreEvent::TransferProgress {
                instance_id,
                percentage,
            } => {
                let step = percentage / PROGRESS_STEP;
                let last = self.printed_steps.get(instance_id).copied().unwrap_or(0);
                if step == 0 || step <= last || *percentage >= 100 {
                    return None;
                }
                self.printed_steps.insert(instance_id.clone(), step);
                Some(format!("  {} {}%", self.name(instance_id), percentage))
            }
            StoreEvent::TransferStatusChanged {
                instance_id,
                status,
                error,
            } => {
                let name = self.name(instance_id).to_string();
                self.printed_steps.remove(instance_id);
                match (status, error) {
                    (TransferStatus::Failed, Some(message)) => {
                        Some(format!("{}: failed - {}", name, message))
                    }
                    (TransferStatus::Completed | TransferStatus::Failed | TransferStatus::Cancelled, _) => {
                        Some(format!("{}: {}", name, status))
                    }
                    _ => None,
                }
            }
            StoreEvent::Snack(snack) => {
                let mut line = match snack.kind {
                    SnackKind::Error => format!("error: {}", snack.message),
                    SnackKind::Info => snack.message.clone(),
                };
                if !snack.detailed_message.is_empty() {
                    line.push_str(&format!(" ({})", snack.detailed_message));
                }
                Some(line)
            }
            StoreEvent::ListReload => None,
        }
    }
}

/// Print store events to stderr until `stop` fires, then flush what is queued.
pub fn spawn_renderer(store: &Store, stop: CancellationToken) -> JoinHandle<()> {
    let mut events = store.subscribe();
    tokio::spawn(async move {
        let mut printer = EventPrinter::default();
        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Ok(event) => {
                        if let Some(line) = printer.describe(&event) {
                            eprintln!("{}", line);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("renderer lagged, {} events skipped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = stop.cancelled() => {
                    while let Ok(event) = events.try_recv() {
                        if let Some(line) = printer.describe(&event) {
                            eprintln!("{}", line);
                        }
                    }
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SnackMessage, TransferItem};
    use crate::transfer::TransferKind;

    fn progress(percentage: u32) -> StoreEvent {
        StoreEvent::TransferProgress {
            instance_id: "id-1".into(),
            percentage,
        }
    }

    #[test]
    fn progress_is_throttled_to_quarters() {
        let mut printer = EventPrinter::default();
        printer.describe(&StoreEvent::TransferAdded(TransferItem::new(
            "X",
            "id-1",
            "b",
            "dir/a.bin",
            TransferKind::Upload,
        )));

        assert_eq!(printer.describe(&progress(10)), None);
        assert_eq!(printer.describe(&progress(30)).as_deref(), Some("  dir/a.bin 30%"));
        assert_eq!(printer.describe(&progress(40)), None);
        assert_eq!(printer.describe(&progress(51)).as_deref(), Some("  dir/a.bin 51%"));
        assert_eq!(printer.describe(&progress(100)), None);
    }

    #[test]
    fn failures_and_snacks_are_described() {
        let mut printer = EventPrinter::default();
        let failed = StoreEvent::TransferStatusChanged {
            instance_id: "unknown".into(),
            status: TransferStatus::Failed,
            error: Some("Error - File size too large".into()),
        };
        assert_eq!(
            printer.describe(&failed).as_deref(),
            Some("unknown: failed - Error - File size too large")
        );

        let snack = StoreEvent::Snack(SnackMessage {
            kind: SnackKind::Error,
            message: "There were some errors during file upload".into(),
            detailed_message: "Uploaded files 1/2".into(),
        });
        assert_eq!(
            printer.describe(&snack).as_deref(),
            Some("error: There were some errors during file upload (Uploaded files 1/2)")
        );
        assert_eq!(printer.describe(&StoreEvent::ListReload), None);
    }
}
