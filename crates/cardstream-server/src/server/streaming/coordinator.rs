use super::tracker::StreamGuard;
use cardstream_core::{ChannelSink, SessionReport, StreamSession, Termination};
use tokio::time::Instant;

/// Runs alongside one response body until its session is closed.
///
/// `watch` is a clone of the session's sink, kept only to learn when the
/// response body (the channel's receiver) is dropped. That happens as soon as
/// the client disconnects, so the session is cancelled right away rather than
/// at its next write.
///
/// Once the session is closed `watch` is dropped too. It is then the last
/// sender, so the body sees end-of-stream and the response completes.
pub async fn supervise(
    session: StreamSession,
    watch: ChannelSink,
    guard: StreamGuard,
) -> SessionReport {
    let start = Instant::now();
    let handle = session.handle();
    let wait = session.wait();
    tokio::pin!(wait);

    let report = tokio::select! {
        report = &mut wait => report,
        () = watch.closed() => {
            tracing::debug!("Response body dropped, cancelling session");
            handle.cancel();
            wait.await
        }
    };
    drop(watch);

    let elapsed_ms = start.elapsed().as_millis() as u64;
    match &report.termination {
        Termination::Failed(e) => tracing::warn!(
            emitted = report.emitted,
            elapsed_ms,
            "Stream ended early: {e}"
        ),
        _ => tracing::info!(
            emitted = report.emitted,
            dispatched = report.pool.dispatched,
            peak_in_flight = report.pool.peak_in_flight,
            drained = report.drained,
            elapsed_ms,
            "Stream closed"
        ),
    }

    drop(guard);
    report
}
