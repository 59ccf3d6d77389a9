//! Shared queue state.
//!
//! One [`QueueCore`] per queue, owned by the manager task through an
//! `Rc<RefCell<_>>` and referenced weakly by its reader tasks. It holds the
//! waiting FIFO, the reader slots (including each reader's in-flight map),
//! the durable-retry bookkeeping and the variant dispatch rules, so manager
//! and readers observe one consistent queue no matter which of them runs.

// Layer 1: Standard library imports
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::config::{QueueConfig, QueueKind};
use super::error::QueueError;
use crate::message::{Address, Envelope, Event, ResponsePayload, StatusCode};
use crate::scheduler::SchedulerContext;

/// Default cap on a reader's in-flight requests.
pub const DEFAULT_READER_LIMIT: usize = 1;

/// An envelope handed to a reader, waiting for the reader's verdict.
#[derive(Debug, Clone)]
pub struct InFlightRequest {
    /// The original envelope, with the sender-side request id intact.
    pub envelope: Envelope,
    pub sent_at: Instant,
}

/// Durable bookkeeping for one queued request, keyed by the original
/// sender-side request id. Retries clear only the assigned reader; the id
/// itself never changes.
#[derive(Debug, Clone, Default)]
pub struct DurableRequestInfo {
    /// When the request becomes (or became) eligible; also the base for the
    /// result/store timeout measurement.
    start_time: Option<Instant>,
    pub retry_count: u32,
    /// Name of the reader currently working the request; empty while the
    /// envelope waits in the FIFO.
    pub reader_name: String,
}

impl DurableRequestInfo {
    fn is_time_to_start(&self, now: Instant) -> bool {
        self.start_time.is_none_or(|start| now >= start)
    }

    fn elapsed(&self, now: Instant) -> Duration {
        self.start_time
            .map_or(Duration::ZERO, |start| now.saturating_duration_since(start))
    }
}

/// One bound reader as the queue sees it.
#[derive(Debug)]
pub struct ReaderSlot {
    pub task_name: String,
    pub target: String,
    pub last_contact: Instant,
    /// In-flight cap; 0 means unlimited.
    pub limit: usize,
    /// Outbound request id -> original envelope.
    pub in_flight: HashMap<u32, InFlightRequest>,
    /// Multicast assignments waiting for this reader.
    pub pending: VecDeque<Envelope>,
    pub processed: u64,
}

impl ReaderSlot {
    fn new(task_name: String, target: String) -> Self {
        Self {
            task_name,
            target,
            last_contact: Instant::now(),
            limit: DEFAULT_READER_LIMIT,
            in_flight: HashMap::new(),
            pending: VecDeque::new(),
            processed: 0,
        }
    }

    pub fn below_limit(&self) -> bool {
        self.limit == 0 || self.in_flight.len() < self.limit
    }
}

/// Shared state of one named queue.
pub struct QueueCore {
    name: String,
    config: QueueConfig,
    waiting: VecDeque<Envelope>,
    readers: Vec<ReaderSlot>,
    requests: HashMap<u32, DurableRequestInfo>,
    last_accepted_reader: String,
}

impl QueueCore {
    pub fn new(name: impl Into<String>, config: QueueConfig) -> Self {
        Self {
            name: name.into(),
            config,
            waiting: VecDeque::new(),
            readers: Vec::new(),
            requests: HashMap::new(),
            last_accepted_reader: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> QueueKind {
        self.config.kind
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// `Waiting-messages: N, readers: M` - the `get_status` text.
    pub fn status_text(&self) -> String {
        format!(
            "Waiting-messages: {}, readers: {}",
            self.waiting.len(),
            self.readers.len()
        )
    }

    // --- intake ---

    /// Verdict for an inbound envelope: discard (null sink), reject
    /// (overflow / missing id) or park it in the FIFO (`FORWARDED`).
    pub fn handle_incoming(&mut self, envelope: &Envelope) -> Result<StatusCode, QueueError> {
        if self.config.kind == QueueKind::NullSink {
            return Ok(StatusCode::OK);
        }
        if self.config.limit > 0 && self.waiting.len() >= self.config.limit {
            return Ok(StatusCode::OVERFLOW);
        }
        if self.config.kind != QueueKind::Multicast && envelope.request_id() == 0 {
            return Ok(StatusCode::MSG_ID_REQUIRED);
        }
        self.put(envelope.clone())?;
        Ok(StatusCode::FORWARDED)
    }

    fn put(&mut self, envelope: Envelope) -> Result<(), QueueError> {
        if self.config.kind.uses_request_map() {
            let request_id = envelope.request_id();
            if self.requests.contains_key(&request_id) {
                return Err(QueueError::DuplicateRequest {
                    request_id,
                    queue: self.name.clone(),
                });
            }
            self.requests.insert(
                request_id,
                DurableRequestInfo {
                    start_time: Some(Instant::now()),
                    ..DurableRequestInfo::default()
                },
            );
        }
        self.waiting.push_back(envelope);
        Ok(())
    }

    /// Re-queue a request for another attempt: bump the retry count, delay
    /// eligibility, clear the assigned reader. The request id is never
    /// touched.
    fn prepare_retry(&mut self, envelope: Envelope) {
        let request_id = envelope.request_id();
        match self.requests.get_mut(&request_id) {
            Some(info) => {
                info.retry_count += 1;
                info.start_time = Some(Instant::now() + self.config.retry_delay);
                info.reader_name.clear();
                self.waiting.push_back(envelope);
            }
            None => warn!(queue = %self.name, request_id, "retry for unknown request"),
        }
    }

    fn clear_request_info(&mut self, request_id: u32) {
        self.requests.remove(&request_id);
        self.waiting.retain(|e| e.request_id() != request_id);
    }

    pub fn clear(&mut self) {
        self.waiting.clear();
        self.requests.clear();
        for slot in &mut self.readers {
            slot.pending.clear();
        }
    }

    // --- readers ---

    pub fn add_reader(&mut self, task_name: &str, target: &str) -> Result<(), QueueError> {
        if self.config.kind == QueueKind::Pull {
            return Err(QueueError::ReadersNotSupported {
                queue: self.name.clone(),
            });
        }
        self.readers
            .push(ReaderSlot::new(task_name.to_owned(), target.to_owned()));
        Ok(())
    }

    pub fn remove_reader(&mut self, task_name: &str) {
        self.readers.retain(|slot| slot.task_name != task_name);
    }

    pub fn slot(&self, task_name: &str) -> Option<&ReaderSlot> {
        self.readers.iter().find(|s| s.task_name == task_name)
    }

    pub fn slot_mut(&mut self, task_name: &str) -> Option<&mut ReaderSlot> {
        self.readers.iter_mut().find(|s| s.task_name == task_name)
    }

    pub fn reader_targets(&self) -> Vec<String> {
        self.readers.iter().map(|s| s.target.clone()).collect()
    }

    pub fn has_reader_target(&self, target: &str) -> bool {
        self.readers.iter().any(|s| s.target == target)
    }

    pub fn reader_task_names(&self) -> Vec<String> {
        self.readers.iter().map(|s| s.task_name.clone()).collect()
    }

    /// Refresh the last-contact time of readers matching a source address.
    pub fn mark_reader_alive(&mut self, source: &str) -> bool {
        let mut found = false;
        for slot in &mut self.readers {
            if slot.target == source {
                slot.last_contact = Instant::now();
                found = true;
            }
        }
        found
    }

    pub fn note_contact(&mut self, task_name: &str) {
        if let Some(slot) = self.slot_mut(task_name) {
            slot.last_contact = Instant::now();
        }
    }

    // --- dispatch rules ---

    /// Whether the queue would hand an envelope to this reader right now.
    pub fn has_message_for(&self, task_name: &str) -> bool {
        match self.config.kind {
            QueueKind::NullSink | QueueKind::Pull => false,
            QueueKind::Multicast => self
                .slot(task_name)
                .is_some_and(|slot| !slot.pending.is_empty()),
            QueueKind::Forward => !self.waiting.is_empty(),
            QueueKind::RoundRobin => {
                if self.waiting.is_empty() {
                    return false;
                }
                // never two consecutive envelopes to the same reader
                self.readers.len() <= 1 || task_name != self.last_accepted_reader
            }
            QueueKind::HighAvail => {
                !self.waiting.is_empty()
                    && self
                        .readers
                        .first()
                        .is_some_and(|first| first.task_name == task_name)
            }
        }
    }

    /// Dequeue the next envelope for this reader, honoring retry delays.
    pub fn take_for(&mut self, task_name: &str) -> Option<Envelope> {
        match self.config.kind {
            QueueKind::NullSink | QueueKind::Pull => None,
            QueueKind::Multicast => self.slot_mut(task_name)?.pending.pop_front(),
            QueueKind::Forward => self.waiting.pop_front(),
            QueueKind::RoundRobin | QueueKind::HighAvail => {
                let now = Instant::now();
                let index = self.waiting.iter().position(|e| {
                    self.requests
                        .get(&e.request_id())
                        .is_some_and(|info| info.is_time_to_start(now))
                })?;
                let envelope = self.waiting.remove(index)?;
                if let Some(info) = self.requests.get_mut(&envelope.request_id()) {
                    info.start_time = Some(now);
                }
                Some(envelope)
            }
        }
    }

    /// Return an envelope the reader refused.
    pub fn give_back(&mut self, envelope: Envelope) {
        if self.config.kind == QueueKind::Multicast {
            // multicast assignments are offers; a refusal discards
            return;
        }
        self.waiting.push_back(envelope);
    }

    /// Sender-skip rules for a reader about to take an envelope.
    pub fn accept_allows(&self, task_name: &str, envelope: &Envelope) -> bool {
        if envelope.is_response() {
            return false;
        }
        let Some(slot) = self.slot(task_name) else {
            return false;
        };
        if !slot.below_limit() {
            return false;
        }
        let mut sender_ok = self.config.allow_sender_as_reader
            || envelope.sender.to_string() != slot.target;
        if !sender_ok {
            let skip = envelope
                .event
                .as_message()
                .and_then(|m| m.params.node("_squeue"))
                .map(|sq| sq.bool_or("skip_sender", true));
            if skip == Some(false) {
                sender_ok = true;
            }
        }
        sender_ok
    }

    pub fn note_accepted(&mut self, task_name: &str) {
        if self.config.kind == QueueKind::RoundRobin {
            self.last_accepted_reader = task_name.to_owned();
        }
    }

    /// Record which reader took a request.
    pub fn note_sent(&mut self, task_name: &str, original_request_id: u32) {
        if let Some(info) = self.requests.get_mut(&original_request_id) {
            info.reader_name = task_name.to_owned();
        }
    }

    /// Distribute the FIFO to every reader (multicast); each waiting
    /// envelope is offered to all readers and then removed.
    pub fn run_multicast(&mut self) -> u32 {
        let mut count = 0;
        while let Some(envelope) = self.waiting.pop_front() {
            for slot in &mut self.readers {
                slot.pending.push_back(envelope.clone());
            }
            count += 1;
        }
        count
    }

    // --- responses and retry ---

    /// Process a reader's verdict for `original`. Returns true when the
    /// reader should relay the response to the original sender; false when
    /// the queue kept the request for another attempt.
    pub fn handle_reader_response(
        &mut self,
        reader_name: &str,
        original: &Envelope,
        response: &ResponsePayload,
    ) -> bool {
        if self.last_accepted_reader == reader_name {
            self.last_accepted_reader.clear();
        }
        let request_id = original.request_id();
        if !self.config.kind.uses_request_map() || !self.config.durable || !response.is_error() {
            self.clear_request_info(request_id);
            return true;
        }

        let retry_count = self
            .requests
            .get(&request_id)
            .map_or(0, |info| info.retry_count);
        if self.config.retry_limit > 0 && retry_count >= self.config.retry_limit {
            warn!(
                queue = %self.name,
                request_id,
                retry_count,
                "retry budget exhausted, surfacing failure"
            );
            self.clear_request_info(request_id);
            return true;
        }

        debug!(queue = %self.name, request_id, retry_count, "requeueing failed request");
        self.prepare_retry(original.clone());
        false
    }

    /// Cancel every in-flight request of one reader with the given status.
    /// Durable queues re-queue them; others answer the original senders.
    pub fn cancel_reader_requests(
        &mut self,
        ctx: &mut SchedulerContext,
        reader_name: &str,
        status: StatusCode,
    ) {
        let Some(slot) = self.slot_mut(reader_name) else {
            return;
        };
        let target = slot.target.clone();
        let drained: Vec<(u32, InFlightRequest)> = slot.in_flight.drain().collect();
        for (outbound_id, pending) in drained {
            let response = ResponsePayload::new(status, outbound_id);
            if self.handle_reader_response(reader_name, &pending.envelope, &response) {
                Self::relay_response(ctx, &target, &pending.envelope, &response);
            }
        }
    }

    /// Relay a reader's response to the original sender, restoring the
    /// original request id.
    pub fn relay_response(
        ctx: &mut SchedulerContext,
        reader_target: &str,
        original: &Envelope,
        response: &ResponsePayload,
    ) {
        let mut payload = response.clone();
        payload.request_id = original.request_id();
        let envelope = Envelope::new(
            Address::parse(reader_target),
            original.sender.clone(),
            Event::Response(payload),
        );
        if let Err(e) = ctx.post_envelope(envelope, None) {
            warn!(error = %e, "queue response undeliverable");
        }
    }

    /// Synthesize a failure response to the original sender of a queued
    /// request.
    fn send_request_failed(&mut self, ctx: &mut SchedulerContext, envelope: &Envelope, status: StatusCode) {
        let mut payload = ResponsePayload::new(status, envelope.request_id());
        payload.set_error_text(format!(
            "Request failed in queue [{}], status: {}",
            self.name,
            status.code()
        ));
        let reply = Envelope::new(
            ctx.own_address(envelope.sender.protocol()),
            envelope.sender.clone(),
            Event::Response(payload),
        );
        if let Err(e) = ctx.post_envelope(reply, None) {
            warn!(queue = %self.name, error = %e, "failure response undeliverable");
        }
    }

    // --- validation (the timeout ladder) ---

    /// Enforce contact, result and store timeouts plus reader-gone cleanup.
    pub fn validate(&mut self, ctx: &mut SchedulerContext) {
        self.validate_readers(ctx);
        self.validate_requests(ctx);
    }

    fn validate_readers(&mut self, ctx: &mut SchedulerContext) {
        if self.config.contact_timeout.is_zero() {
            return;
        }
        let stale: Vec<String> = self
            .readers
            .iter()
            .filter(|slot| slot.last_contact.elapsed() >= self.config.contact_timeout)
            .map(|slot| slot.task_name.clone())
            .collect();
        for reader in stale {
            let target = self.slot(&reader).map(|s| s.target.clone()).unwrap_or_default();
            warn!(queue = %self.name, reader = %target, "reader contact timeout");
            self.cancel_reader_requests(ctx, &reader, StatusCode::TIMEOUT);
            ctx.stop_task(&reader);
        }
    }

    fn validate_requests(&mut self, ctx: &mut SchedulerContext) {
        if !self.config.kind.uses_request_map() {
            return;
        }
        let now = Instant::now();

        enum Expiry {
            ResultTimeout(String),
            Dropped,
        }

        let mut expired: Vec<(u32, Expiry)> = Vec::new();
        for (request_id, info) in &self.requests {
            if !info.reader_name.is_empty()
                && !self.config.result_timeout.is_zero()
                && info.elapsed(now) >= self.config.result_timeout
            {
                expired.push((*request_id, Expiry::ResultTimeout(info.reader_name.clone())));
            } else if info.reader_name.is_empty()
                && !self.config.store_timeout.is_zero()
                && info.elapsed(now) >= self.config.store_timeout
            {
                expired.push((*request_id, Expiry::Dropped));
            } else if !info.reader_name.is_empty() && self.slot(&info.reader_name).is_none() {
                expired.push((*request_id, Expiry::Dropped));
            }
        }

        for (request_id, expiry) in expired {
            let envelope = match &expiry {
                Expiry::ResultTimeout(reader) => {
                    warn!(queue = %self.name, request_id, "result timeout");
                    self.slot_mut(reader).and_then(|slot| {
                        let outbound = slot
                            .in_flight
                            .iter()
                            .find(|(_, p)| p.envelope.request_id() == request_id)
                            .map(|(id, _)| *id);
                        outbound.and_then(|id| slot.in_flight.remove(&id)).map(|p| p.envelope)
                    })
                }
                Expiry::Dropped => {
                    warn!(queue = %self.name, request_id, "request outdated, removing");
                    self.waiting
                        .iter()
                        .find(|e| e.request_id() == request_id)
                        .cloned()
                }
            };
            if let Some(envelope) = envelope {
                self.send_request_failed(ctx, &envelope, StatusCode::TIMEOUT);
            }
            self.clear_request_info(request_id);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::message::Params;

    fn envelope(sender: &str, request_id: u32) -> Envelope {
        Envelope::new(
            Address::parse(sender),
            Address::parse("q#Q"),
            Event::message("job.run", Some(Params::new().with("n", 1u64)), request_id),
        )
    }

    fn core(kind: QueueKind, durable: bool) -> QueueCore {
        QueueCore::new(
            "Q",
            QueueConfig {
                kind,
                durable,
                retry_limit: 2,
                retry_delay: Duration::from_millis(10),
                ..QueueConfig::default()
            },
        )
    }

    #[test]
    fn test_null_sink_discards() {
        let mut q = core(QueueKind::NullSink, false);
        let verdict = q.handle_incoming(&envelope("a", 1));
        assert_eq!(verdict.unwrap(), StatusCode::OK);
        assert!(q.is_empty());
    }

    #[test]
    fn test_missing_request_id_rejected() {
        let mut q = core(QueueKind::RoundRobin, false);
        let verdict = q.handle_incoming(&envelope("a", 0));
        assert_eq!(verdict.unwrap(), StatusCode::MSG_ID_REQUIRED);
    }

    #[test]
    fn test_overflow_when_limited() {
        let mut q = QueueCore::new(
            "Q",
            QueueConfig {
                limit: 1,
                ..QueueConfig::default()
            },
        );
        assert_eq!(
            q.handle_incoming(&envelope("a", 1)).unwrap(),
            StatusCode::FORWARDED
        );
        assert_eq!(
            q.handle_incoming(&envelope("a", 2)).unwrap(),
            StatusCode::OVERFLOW
        );
    }

    #[test]
    fn test_duplicate_request_id_is_an_error() {
        let mut q = core(QueueKind::RoundRobin, true);
        assert!(q.handle_incoming(&envelope("a", 1)).is_ok());
        assert!(q.handle_incoming(&envelope("a", 1)).is_err());
    }

    #[test]
    fn test_round_robin_rotation() {
        let mut q = core(QueueKind::RoundRobin, false);
        q.add_reader("r1", "w1").unwrap();
        q.add_reader("r2", "w2").unwrap();
        q.handle_incoming(&envelope("a", 1)).unwrap();
        q.handle_incoming(&envelope("a", 2)).unwrap();

        assert!(q.has_message_for("r1"));
        assert!(q.has_message_for("r2"));

        let taken = q.take_for("r1");
        assert!(taken.is_some());
        q.note_accepted("r1");
        q.note_sent("r1", 1);

        // r1 just accepted, so the next envelope must go elsewhere
        assert!(!q.has_message_for("r1"));
        assert!(q.has_message_for("r2"));

        // with a single reader there is no rotation
        q.remove_reader("r2");
        assert!(q.has_message_for("r1"));
    }

    #[test]
    fn test_high_avail_only_first_reader() {
        let mut q = core(QueueKind::HighAvail, false);
        q.add_reader("r1", "w1").unwrap();
        q.add_reader("r2", "w2").unwrap();
        q.handle_incoming(&envelope("a", 1)).unwrap();

        assert!(q.has_message_for("r1"));
        assert!(!q.has_message_for("r2"));
    }

    #[test]
    fn test_pull_refuses_readers() {
        let mut q = core(QueueKind::Pull, false);
        assert!(q.add_reader("r1", "w1").is_err());
    }

    #[test]
    fn test_retry_delays_eligibility() {
        let mut q = core(QueueKind::RoundRobin, true);
        q.add_reader("r1", "w1").unwrap();
        q.handle_incoming(&envelope("a", 1)).unwrap();

        let env = q.take_for("r1").unwrap();
        q.note_sent("r1", 1);

        // first failure: requeued, not relayed
        let failure = ResponsePayload::new(StatusCode::WRONG_PARAMS, 1);
        assert!(!q.handle_reader_response("r1", &env, &failure));
        assert_eq!(q.waiting_count(), 1);

        // not eligible until the retry delay passes
        assert!(q.take_for("r1").is_none());
        std::thread::sleep(Duration::from_millis(15));
        assert!(q.take_for("r1").is_some());
    }

    #[test]
    fn test_retry_budget_exhaustion_relays_error() {
        let mut q = core(QueueKind::RoundRobin, true);
        q.add_reader("r1", "w1").unwrap();
        q.handle_incoming(&envelope("a", 1)).unwrap();

        let failure = ResponsePayload::new(StatusCode::WRONG_PARAMS, 1);
        let mut relayed = false;
        for _ in 0..5 {
            std::thread::sleep(Duration::from_millis(12));
            let Some(env) = q.take_for("r1") else { continue };
            q.note_sent("r1", 1);
            if q.handle_reader_response("r1", &env, &failure) {
                relayed = true;
                break;
            }
        }
        assert!(relayed);
        assert_eq!(q.waiting_count(), 0);
    }

    #[test]
    fn test_non_durable_relays_first_error() {
        let mut q = core(QueueKind::RoundRobin, false);
        q.add_reader("r1", "w1").unwrap();
        q.handle_incoming(&envelope("a", 1)).unwrap();

        let env = q.take_for("r1").unwrap();
        let failure = ResponsePayload::new(StatusCode::WRONG_PARAMS, 1);
        assert!(q.handle_reader_response("r1", &env, &failure));
    }

    #[test]
    fn test_multicast_offers_to_every_reader() {
        let mut q = core(QueueKind::Multicast, false);
        q.add_reader("r1", "w1").unwrap();
        q.add_reader("r2", "w2").unwrap();
        q.handle_incoming(&envelope("a", 0)).unwrap();

        assert_eq!(q.run_multicast(), 1);
        assert!(q.is_empty());
        assert!(q.has_message_for("r1"));
        assert!(q.has_message_for("r2"));
        assert!(q.take_for("r1").is_some());
        assert!(q.take_for("r1").is_none());
        assert!(q.take_for("r2").is_some());
    }

    #[test]
    fn test_sender_skip_rules() {
        let mut q = core(QueueKind::RoundRobin, false);
        q.add_reader("r1", "alpha").unwrap();

        // sender equals the reader target: refused by default
        let own = envelope("alpha", 1);
        assert!(!q.accept_allows("r1", &own));

        // explicit skip_sender=false override
        let mut params = Params::new();
        params.push(
            "_squeue",
            Params::new().with("skip_sender", false),
        );
        let override_env = Envelope::new(
            Address::parse("alpha"),
            Address::parse("q#Q"),
            Event::message("job.run", Some(params), 2),
        );
        assert!(q.accept_allows("r1", &override_env));

        // other senders pass
        assert!(q.accept_allows("r1", &envelope("beta", 3)));
    }

    #[test]
    fn test_mark_reader_alive_matches_target() {
        let mut q = core(QueueKind::RoundRobin, false);
        q.add_reader("r1", "w1").unwrap();
        assert!(q.mark_reader_alive("w1"));
        assert!(!q.mark_reader_alive("w9"));
    }

    #[test]
    fn test_status_text() {
        let mut q = core(QueueKind::RoundRobin, false);
        q.add_reader("r1", "w1").unwrap();
        q.handle_incoming(&envelope("a", 1)).unwrap();
        assert_eq!(q.status_text(), "Waiting-messages: 1, readers: 1");
    }

    #[test]
    fn test_clear_drops_fifo_and_bookkeeping() {
        let mut q = core(QueueKind::RoundRobin, true);
        q.handle_incoming(&envelope("a", 1)).unwrap();
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.handle_incoming(&envelope("a", 1)).unwrap(), StatusCode::FORWARDED);
    }
}
