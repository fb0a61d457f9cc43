//! Fetches quotes for the current swap inputs
//!
//! The fetcher follows a `watch` channel of [`QuoteTarget`]s published by the
//! flow controller. A new target is fetched after the debounce delay if only
//! the amount changed, immediately otherwise, and then refreshed on a fixed
//! interval until the target changes or fetching is disabled. A target change
//! aborts any fetch in flight.

use std::sync::Arc;

use tokio::{
    sync::{mpsc::UnboundedSender, watch},
    time::{sleep_until, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::SwapFlowConfig,
    error::{SwapFlowError, SwapFlowResult},
    flow::FlowEvent,
    quote::{Quote, QuoteRequest},
    router_client::RoutingApi,
};

/// What the fetcher should be quoting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteTarget {
    /// The input generation the target was built for
    pub generation: u64,
    /// The request to quote, if the inputs are complete and valid
    pub request: Option<QuoteRequest>,
    /// Whether the first fetch should wait out the debounce delay
    pub debounce: bool,
    /// Whether fetching is allowed; false while a deposit session is locked
    pub enabled: bool,
}

impl QuoteTarget {
    /// Whether there is anything to fetch
    fn is_fetchable(&self) -> bool {
        self.enabled && self.request.is_some()
    }
}

/// Fetch and convert a quote for a request
pub async fn fetch_quote(
    router: &dyn RoutingApi,
    config: &SwapFlowConfig,
    request: &QuoteRequest,
) -> SwapFlowResult<Quote> {
    let params = request.to_params(config);
    let response = router.get_quote(&params).await.map_err(|e| match e {
        SwapFlowError::QuoteUnavailable(_) => e,
        other => SwapFlowError::quote_unavailable(other),
    })?;

    Quote::from_response(request, response)
}

/// The quote fetcher task
pub struct QuoteFetcher {
    /// The router client
    router: Arc<dyn RoutingApi>,
    /// The flow config
    config: SwapFlowConfig,
    /// The targets published by the controller
    targets: watch::Receiver<QuoteTarget>,
    /// The channel on which fetch results are reported
    events: UnboundedSender<FlowEvent>,
    /// Cancelled on teardown or terminal failure
    cancel: CancellationToken,
}

impl QuoteFetcher {
    /// Constructor
    pub fn new(
        router: Arc<dyn RoutingApi>,
        config: SwapFlowConfig,
        targets: watch::Receiver<QuoteTarget>,
        events: UnboundedSender<FlowEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self { router, config, targets, events, cancel }
    }

    /// Decide when to fetch after the target changes from `prev` to `next`
    ///
    /// Re-enabling an unchanged target resumes the refresh schedule from the
    /// last completed fetch
    fn schedule(
        &self,
        prev: &QuoteTarget,
        next: &QuoteTarget,
        current: Option<Instant>,
        last_fetch: Option<Instant>,
    ) -> Option<Instant> {
        if !next.is_fetchable() {
            return None;
        }

        let now = Instant::now();
        if prev.generation != next.generation || prev.request != next.request {
            let delay = if next.debounce { self.config.debounce() } else { Default::default() };
            return Some(now + delay);
        }

        if !prev.enabled {
            let resume = last_fetch.map(|at| at + self.config.refetch_interval());
            return Some(resume.map_or(now, |at| at.max(now)));
        }

        current
    }

    /// Run the fetch loop until cancelled
    #[instrument(name = "quote_fetcher", skip_all)]
    pub async fn run(mut self) {
        let mut target = QuoteTarget::default();
        let mut deadline: Option<Instant> = None;
        let mut last_fetch: Option<Instant> = None;
        self.targets.mark_changed();

        loop {
            // Wait for a new target or for the next scheduled fetch
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                changed = self.targets.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next = self.targets.borrow_and_update().clone();
                    deadline = self.schedule(&target, &next, deadline, last_fetch);
                    target = next;
                    continue;
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {},
            }

            let Some(request) = target.request.clone() else {
                deadline = None;
                continue;
            };
            let generation = target.generation;
            if self.events.send(FlowEvent::QuoteFetchStarted { generation }).is_err() {
                break;
            }

            debug!(generation, "fetching quote");
            let router = self.router.clone();
            let config = self.config.clone();
            let fetch = async move { fetch_quote(router.as_ref(), &config, &request).await };

            let result = tokio::select! {
                _ = self.cancel.cancelled() => break,
                changed = self.targets.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    info!(generation, "quote target changed, abandoning fetch");
                    let next = self.targets.borrow_and_update().clone();
                    deadline = self.schedule(&target, &next, deadline, last_fetch);
                    target = next;
                    continue;
                },
                res = fetch => res,
            };

            if let Err(e) = &result {
                warn!(generation, "failed to fetch quote: {e}");
            }
            if self.events.send(FlowEvent::QuoteFetched { generation, result }).is_err() {
                break;
            }

            let now = Instant::now();
            last_fetch = Some(now);
            deadline = Some(now + self.config.refetch_interval());
        }

        debug!("quote fetcher stopped");
    }
}
