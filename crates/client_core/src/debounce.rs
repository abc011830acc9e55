//! Trailing-edge debounce for the search box.

use std::{future::Future, time::Duration};

use tokio::{sync::mpsc, time::Instant};

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(700);

/// Holds the latest raw input until it has been quiet for `quiet`, then
/// commits it. Every new input restarts the window. A settled value equal to
/// the last committed one is dropped.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
    committed: T,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    pub fn new(initial: T, quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            committed: initial,
        }
    }

    pub fn input(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.quiet));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn committed(&self) -> &T {
        &self.committed
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => self.flush(),
            _ => None,
        }
    }

    /// Commits whatever is pending without waiting out the window.
    pub fn flush(&mut self) -> Option<T> {
        let (value, _) = self.pending.take()?;
        if value == self.committed {
            return None;
        }
        self.committed = value.clone();
        Some(value)
    }
}

/// Drives a `Debouncer` from a channel of raw inputs, awaiting `commit` for
/// each settled value. Pending input is flushed when the sender side closes.
pub async fn debounce_commits<T, F, Fut>(
    mut inputs: mpsc::Receiver<T>,
    initial: T,
    quiet: Duration,
    mut commit: F,
) where
    T: Clone + PartialEq,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut debouncer = Debouncer::new(initial, quiet);
    loop {
        let next = match debouncer.deadline() {
            Some(deadline) => {
                tokio::select! {
                    next = inputs.recv() => next,
                    _ = tokio::time::sleep_until(deadline) => {
                        if let Some(value) = debouncer.poll(Instant::now()) {
                            commit(value).await;
                        }
                        continue;
                    }
                }
            }
            None => inputs.recv().await,
        };

        match next {
            Some(value) => debouncer.input(value, Instant::now()),
            None => {
                if let Some(value) = debouncer.flush() {
                    commit(value).await;
                }
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn commits_only_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(String::new(), DEFAULT_SEARCH_DEBOUNCE);

        debouncer.input("l".to_string(), start);
        assert_eq!(debouncer.poll(start + Duration::from_millis(699)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(700)),
            Some("l".to_string())
        );
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn keystrokes_restart_the_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(String::new(), DEFAULT_SEARCH_DEBOUNCE);

        debouncer.input("l".to_string(), start);
        debouncer.input("la".to_string(), start + Duration::from_millis(500));
        debouncer.input("lamp".to_string(), start + Duration::from_millis(1000));
        assert_eq!(debouncer.poll(start + Duration::from_millis(1200)), None);
        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(1700))
        );
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(1700)),
            Some("lamp".to_string())
        );
        assert_eq!(debouncer.committed(), "lamp");
    }

    #[test]
    fn settling_back_on_committed_value_is_not_a_commit() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new("lamp".to_string(), DEFAULT_SEARCH_DEBOUNCE);

        debouncer.input("lam".to_string(), start);
        debouncer.input("lamp".to_string(), start + Duration::from_millis(100));
        assert_eq!(debouncer.poll(start + Duration::from_secs(5)), None);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn channel_driver_commits_settled_values() {
        let (tx, rx) = mpsc::channel(16);
        let commits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&commits);

        let driver = tokio::spawn(async move {
            debounce_commits(rx, String::new(), DEFAULT_SEARCH_DEBOUNCE, move |value| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().expect("commits lock").push(value);
                }
            })
            .await;
        });

        tx.send("d".to_string()).await.expect("send");
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send("desk".to_string()).await.expect("send");
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(*commits.lock().expect("commits lock"), vec!["desk"]);

        tx.send("desk lamp".to_string()).await.expect("send");
        drop(tx);
        driver.await.expect("driver");
        assert_eq!(
            *commits.lock().expect("commits lock"),
            vec!["desk", "desk lamp"]
        );
    }
}
