// src/watch/debounce.rs

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

/// Collapse bursts of events.
///
/// After an event arrives, keep absorbing events until `quiet` passes with
/// none; then call `on_settled` with the last one. The quiet period restarts
/// on every event, so the action is timed from the end of the burst.
///
/// Returns when the channel closes. A burst cut short by the channel closing
/// is dropped.
pub async fn debounce<T, F>(mut rx: mpsc::UnboundedReceiver<T>, quiet: Duration, mut on_settled: F)
where
    F: FnMut(T),
{
    while let Some(mut latest) = rx.recv().await {
        loop {
            match timeout(quiet, rx.recv()).await {
                Ok(Some(next)) => latest = next,
                Ok(None) => return,
                Err(_) => break,
            }
        }
        on_settled(latest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::{sleep, Instant};

    fn spawn_debouncer(
        quiet: Duration,
    ) -> (mpsc::UnboundedSender<u32>, Arc<Mutex<Vec<(u32, Instant)>>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        tokio::spawn(debounce(rx, quiet, move |v| {
            sink.lock().unwrap().push((v, Instant::now()));
        }));
        (tx, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn a_burst_fires_once_with_the_last_event() {
        let (tx, fired) = spawn_debouncer(Duration::from_secs(5));

        let mut last = Instant::now();
        for i in 0..8 {
            tx.send(i).unwrap();
            last = Instant::now();
            sleep(Duration::from_millis(500)).await;
        }

        sleep(Duration::from_secs(10)).await;

        let fired = fired.lock().unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, 7);
        assert!(fired[0].1 - last >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_fire_separately() {
        let (tx, fired) = spawn_debouncer(Duration::from_secs(5));

        tx.send(1).unwrap();
        sleep(Duration::from_secs(6)).await;
        tx.send(2).unwrap();
        sleep(Duration::from_secs(6)).await;

        let values: Vec<u32> = fired.lock().unwrap().iter().map(|(v, _)| *v).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_mid_burst_drops_it() {
        let (tx, fired) = spawn_debouncer(Duration::from_secs(5));
        tx.send(1).unwrap();
        sleep(Duration::from_secs(1)).await;
        drop(tx);
        sleep(Duration::from_secs(10)).await;
        assert!(fired.lock().unwrap().is_empty());
    }
}
