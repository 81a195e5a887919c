use model::execution::report::ErrorReport;
use tokio::sync::mpsc;

/// Collects failure reports from readers and workers. The orchestrator holds
/// the only receiver.
pub fn error_channel() -> (ErrorSender, ErrorReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ErrorSender { tx }, ErrorReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct ErrorSender {
    tx: mpsc::UnboundedSender<ErrorReport>,
}

impl ErrorSender {
    /// Reports are dropped silently once the receiver is gone, since nobody
    /// is left to act on them.
    pub fn report(&self, report: ErrorReport) {
        let _ = self.tx.send(report);
    }
}

#[derive(Debug)]
pub struct ErrorReceiver {
    rx: mpsc::UnboundedReceiver<ErrorReport>,
}

impl ErrorReceiver {
    pub async fn recv(&mut self) -> Option<ErrorReport> {
        self.rx.recv().await
    }

    /// Everything already queued, in arrival order.
    pub fn try_recv_all(&mut self) -> Vec<ErrorReport> {
        let mut reports = Vec::new();
        while let Ok(report) = self.rx.try_recv() {
            reports.push(report);
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::execution::report::ErrorKind;

    #[tokio::test]
    async fn test_reports_keep_arrival_order() {
        let (tx, mut rx) = error_channel();
        let other = tx.clone();
        tx.report(ErrorReport::new(ErrorKind::Format, "first"));
        other.report(ErrorReport::new(ErrorKind::Schema, "second"));

        assert_eq!(rx.recv().await.unwrap().message, "first");
        let rest = rx.try_recv_all();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].kind, ErrorKind::Schema);
    }
}
