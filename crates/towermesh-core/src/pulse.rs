//! Periodic pulse
//!
//! [`Pulse`] emits a numbered signal every `period` until it is cancelled or
//! dropped. The first signal arrives one full period after start. Signals are
//! not buffered beyond one: a slow consumer delays the next pulse instead of
//! accumulating a backlog.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::trace;

use crate::error::{CoreError, CoreResult};

/// A fixed-cadence signal source
#[derive(Debug)]
pub struct Pulse {
    period: Duration,
    signals: mpsc::Receiver<u64>,
    cancel: Option<oneshot::Sender<()>>,
}

impl Pulse {
    /// Start pulsing on the current tokio runtime
    pub fn start(period: Duration) -> CoreResult<Self> {
        if period.is_zero() {
            return Err(CoreError::ZeroPeriod);
        }

        let (signal_tx, signal_rx) = mpsc::channel(1);
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut seq = 0u64;

            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    _ = interval.tick() => {}
                }

                seq += 1;
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    sent = signal_tx.send(seq) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            trace!(pulses = seq, "Pulse stopped");
        });

        Ok(Self {
            period,
            signals: signal_rx,
            cancel: Some(cancel_tx),
        })
    }

    /// Wait for the next pulse
    ///
    /// Returns `None` once the pulse has been cancelled.
    pub async fn tick(&mut self) -> Option<u64> {
        if self.cancel.is_none() {
            return None;
        }
        self.signals.recv().await
    }

    /// Stop pulsing
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.signals.close();
    }

    /// Whether [`Pulse::cancel`] has been called
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }

    /// Configured period
    pub fn period(&self) -> Duration {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_period_rejected() {
        assert!(matches!(
            Pulse::start(Duration::ZERO),
            Err(CoreError::ZeroPeriod)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulses_are_numbered() {
        let mut pulse = Pulse::start(Duration::from_millis(100)).unwrap();
        assert_eq!(pulse.period(), Duration::from_millis(100));

        assert_eq!(pulse.tick().await, Some(1));
        assert_eq!(pulse.tick().await, Some(2));
        assert_eq!(pulse.tick().await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_pulse_after_one_period() {
        let start = Instant::now();
        let mut pulse = Pulse::start(Duration::from_secs(5)).unwrap();

        pulse.tick().await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_pulses() {
        let mut pulse = Pulse::start(Duration::from_millis(10)).unwrap();
        assert_eq!(pulse.tick().await, Some(1));

        pulse.cancel();
        assert!(pulse.is_cancelled());
        assert_eq!(pulse.tick().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_consumer_does_not_build_backlog() {
        let mut pulse = Pulse::start(Duration::from_millis(10)).unwrap();
        time::sleep(Duration::from_millis(1000)).await;

        // At most one pulse was buffered plus one pending in the sender
        let first = pulse.tick().await.unwrap();
        let second = pulse.tick().await.unwrap();
        assert!(first <= 2);
        assert_eq!(second, first + 1);
    }
}
