use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

/// Exit status used when a second interrupt forces the process down.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Ctrl-C events as a stream. Ends if the signal handler cannot be installed.
pub fn ctrl_c_stream() -> impl Stream<Item = ()> {
    futures::stream::unfold((), |()| async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Some(((), ())),
            Err(err) => {
                tracing::error!("cannot listen for Ctrl-C: {}", err);
                None
            }
        }
    })
}

/// The first signal cancels `cancel` so images in flight can finish. Returns
/// `true` once a second signal arrives; the caller should then exit right
/// away. Returns `false` if the stream ends first.
pub async fn escalate<S>(signals: S, cancel: CancellationToken) -> bool
where
    S: Stream<Item = ()>,
{
    let mut signals = std::pin::pin!(signals);

    if signals.next().await.is_none() {
        return false;
    }
    tracing::warn!("interrupted, finishing images in flight (press Ctrl-C again to abort)");
    cancel.cancel();

    if signals.next().await.is_none() {
        return false;
    }
    tracing::error!("interrupted twice, aborting");
    true
}
