use shipstore::models::{DirectionFilter, Record};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use wmsfetcher::ProgressReporter;

/// One resolution request. The term is opaque: an order id, customer
/// name, tracking number, or any other indexed field.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub term: String,
    pub store: Option<String>,
    pub direction: DirectionFilter,
    pub cancel: CancellationToken,
}

/// Terminal outcome of one resolution. `error` is only set when no
/// primary record was found.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: Option<Record>,
    pub related: Option<Record>,
    pub error: Option<String>,
}

/// One unit of the streamed output. Consumers read events until the
/// channel closes; a close without a `Done` means the resolution was
/// cancelled, and no `Done` will ever follow.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Log(String),
    Done(Resolution),
}

/// Bridges the planner's reporter seam onto the progress channel, so
/// planner attempt lines interleave with the state machine's own lines in
/// strict causal order.
pub struct ChannelReporter {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelReporter {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressReporter for ChannelReporter {
    fn log(&self, message: String) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(ProgressEvent::Log(message));
    }
}
