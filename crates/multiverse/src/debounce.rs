//! Quiet-period debouncing for search box input.

use std::time::Duration;

use tokio::sync::mpsc;

/// Forwards a value from `input` only after `quiet` has passed without a
/// newer one. When `input` closes, a pending value is flushed immediately.
pub fn debounce<T: Send + 'static>(
    mut input: mpsc::Receiver<T>,
    quiet: Duration,
) -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut pending: Option<T> = None;
        loop {
            let Some(value) = pending.take() else {
                match input.recv().await {
                    Some(value) => pending = Some(value),
                    None => break,
                }
                continue;
            };
            tokio::select! {
                newer = input.recv() => match newer {
                    Some(newer) => pending = Some(newer),
                    None => {
                        let _ = tx.send(value).await;
                        break;
                    }
                },
                _ = tokio::time::sleep(quiet) => {
                    if tx.send(value).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_last_value() {
        let (tx, rx) = mpsc::channel(8);
        let mut out = debounce(rx, Duration::from_millis(400));

        for text in ["r", "ri", "ric", "rick"] {
            tx.send(text.to_string()).await.expect("send");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(out.recv().await.as_deref(), Some("rick"));

        tx.send("morty".to_string()).await.expect("send");
        tokio::time::sleep(Duration::from_millis(500)).await;
        tx.send("".to_string()).await.expect("send");
        assert_eq!(out.recv().await.as_deref(), Some("morty"));
        assert_eq!(out.recv().await.as_deref(), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn closing_input_flushes_pending_value() {
        let (tx, rx) = mpsc::channel(8);
        let mut out = debounce(rx, Duration::from_secs(60));

        tx.send(1).await.expect("send");
        tx.send(2).await.expect("send");
        drop(tx);

        assert_eq!(out.recv().await, Some(2));
        assert_eq!(out.recv().await, None);
    }
}
