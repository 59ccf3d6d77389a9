//! Queue reader task.
//!
//! A reader binds a remote target address to a queue. While below its
//! in-flight limit and the queue has a message for it, it dequeues an
//! envelope, rewrites the sender to its own task address, allocates a fresh
//! outbound request id and posts it; the original envelope (with the
//! original id) is parked in the reader's slot. When the response comes
//! back the queue decides whether to relay it to the original sender or
//! keep the request for a retry. Stopping cancels every outstanding
//! request with a Timeout status.

// Layer 1: Standard library imports
use std::cell::RefCell;
use std::rc::Weak;
use std::time::Instant;

// Layer 2: Third-party crate imports
use tracing::debug;

// Layer 3: Internal module imports
use super::core::{InFlightRequest, QueueCore};
use crate::message::{Address, MessagePayload, ResponsePayload, StatusCode};
use crate::module::HandlerError;
use crate::scheduler::SchedulerContext;
use crate::task::{Task, TaskControl, TaskStatus};

/// Forwards queue envelopes to one target address.
pub struct ReaderTask {
    control: TaskControl,
    queue: Weak<RefCell<QueueCore>>,
    target: String,
}

impl ReaderTask {
    pub fn new(queue: Weak<RefCell<QueueCore>>, target: impl Into<String>) -> Self {
        Self {
            control: TaskControl::new(""),
            queue,
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn forward_one(&mut self, ctx: &mut SchedulerContext) -> Result<bool, HandlerError> {
        let Some(queue) = self.queue.upgrade() else {
            self.control.request_stop();
            return Ok(false);
        };
        let name = self.control.name().to_owned();
        let mut core = queue.borrow_mut();

        if !core.slot(&name).is_some_and(|slot| slot.below_limit()) {
            return Ok(false);
        }
        if !core.has_message_for(&name) {
            return Ok(false);
        }
        let Some(envelope) = core.take_for(&name) else {
            return Ok(false);
        };
        if !core.accept_allows(&name, &envelope) {
            core.give_back(envelope);
            return Ok(false);
        }
        core.note_accepted(&name);

        let original_id = envelope.request_id();
        let mut outbound = envelope.clone();
        outbound.receiver = Address::parse(&self.target);
        let mut sender = ctx.own_address(outbound.receiver.protocol());
        sender.set_task(&name);
        outbound.sender = sender;

        let outbound_id = if original_id != 0 {
            ctx.next_request_id()
        } else {
            0
        };
        outbound.event.set_request_id(outbound_id);

        debug!(queue = core.name(), target = %self.target, outbound_id, "forwarding envelope");
        ctx.post_envelope(outbound, None)?;

        if outbound_id != 0 {
            if let Some(slot) = core.slot_mut(&name) {
                slot.in_flight.insert(
                    outbound_id,
                    InFlightRequest {
                        envelope,
                        sent_at: Instant::now(),
                    },
                );
                slot.processed += 1;
            }
            core.note_sent(&name, original_id);
        }
        Ok(true)
    }
}

impl Task for ReaderTask {
    fn control(&self) -> &TaskControl {
        &self.control
    }

    fn control_mut(&mut self) -> &mut TaskControl {
        &mut self.control
    }

    fn run_starting(&mut self, _ctx: &mut SchedulerContext) -> Result<u32, HandlerError> {
        // the task name is final once the scheduler adopted us; bind the
        // slot now
        if let Some(queue) = self.queue.upgrade() {
            queue
                .borrow_mut()
                .add_reader(self.control.name(), &self.target)?;
        }
        self.control.set_status(TaskStatus::Running);
        Ok(0)
    }

    fn run_step(&mut self, ctx: &mut SchedulerContext) -> Result<u32, HandlerError> {
        let mut forwarded = 0;
        while self.forward_one(ctx)? {
            forwarded += 1;
        }
        Ok(forwarded)
    }

    fn run_stopping(&mut self, ctx: &mut SchedulerContext) -> Result<u32, HandlerError> {
        debug!(reader = self.control.name(), "queue reader stopping");
        if let Some(queue) = self.queue.upgrade() {
            let name = self.control.name().to_owned();
            let mut core = queue.borrow_mut();
            core.cancel_reader_requests(ctx, &name, StatusCode::TIMEOUT);
            core.remove_reader(&name);
        }
        self.control.set_status(TaskStatus::Stopped);
        Ok(0)
    }

    fn handle_response(
        &mut self,
        ctx: &mut SchedulerContext,
        _message: &MessagePayload,
        response: &ResponsePayload,
    ) -> Result<StatusCode, HandlerError> {
        let Some(queue) = self.queue.upgrade() else {
            return Ok(StatusCode::UNKNOWN_MSG);
        };
        let name = self.control.name().to_owned();
        let mut core = queue.borrow_mut();

        let pending = match core.slot_mut(&name) {
            Some(slot) => slot.in_flight.remove(&response.request_id),
            None => None,
        };
        let Some(pending) = pending else {
            return Ok(StatusCode::UNKNOWN_MSG);
        };
        core.note_contact(&name);

        if response.is_error() {
            debug!(
                reader = %name,
                target = %self.target,
                request_id = pending.envelope.request_id(),
                "reader received error response"
            );
        }
        if core.handle_reader_response(&name, &pending.envelope, response) {
            QueueCore::relay_response(ctx, &self.target, &pending.envelope, response);
        }
        Ok(StatusCode::OK)
    }

    fn needs_run(&self) -> bool {
        match self.control.status() {
            TaskStatus::Busy => false,
            TaskStatus::Running => {
                if self.target.is_empty() {
                    return false;
                }
                let Some(queue) = self.queue.upgrade() else {
                    return true;
                };
                let name = self.control.name();
                let core = queue.borrow();
                core.slot(name).is_some_and(|slot| slot.below_limit())
                    && core.has_message_for(name)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::message::{Envelope, Event, Params};
    use crate::queue::config::{QueueConfig, QueueKind};
    use crate::registry::LocalNodeRegistry;
    use crate::scheduler::{SchedulerConfig, SchedulerStatus};
    use crate::task::drive_task;
    use std::rc::Rc;
    use std::sync::Arc;

    fn ctx() -> SchedulerContext {
        let local = Arc::new(LocalNodeRegistry::new());
        // register the target node so forwarded envelopes have a home
        local.register("w1");
        let mut ctx = SchedulerContext::new(SchedulerConfig::named("q"), local);
        ctx.set_status(SchedulerStatus::Running);
        ctx
    }

    fn queue() -> Rc<RefCell<QueueCore>> {
        Rc::new(RefCell::new(QueueCore::new(
            "Q",
            QueueConfig {
                kind: QueueKind::RoundRobin,
                ..QueueConfig::default()
            },
        )))
    }

    fn work(request_id: u32) -> Envelope {
        Envelope::new(
            Address::parse("client"),
            Address::parse("q#Q"),
            Event::message("job.run", Some(Params::new()), request_id),
        )
    }

    fn started_reader(queue: &Rc<RefCell<QueueCore>>, ctx: &mut SchedulerContext) -> ReaderTask {
        let mut reader = ReaderTask::new(Rc::downgrade(queue), "w1#T");
        reader.control_mut().set_name("r1");
        reader.control_mut().set_status(TaskStatus::Starting);
        drive_task(&mut reader, ctx);
        reader
    }

    #[test]
    fn test_starting_binds_slot() {
        let mut ctx = ctx();
        let queue = queue();
        let reader = started_reader(&queue, &mut ctx);

        assert_eq!(reader.control().status(), TaskStatus::Running);
        assert!(queue.borrow().has_reader_target("w1#T"));
    }

    #[test]
    fn test_forward_rewrites_ids_and_sender() {
        let mut ctx = ctx();
        let queue = queue();
        let mut reader = started_reader(&queue, &mut ctx);

        queue.borrow_mut().handle_incoming(&work(11)).unwrap();
        assert!(reader.needs_run());
        drive_task(&mut reader, &mut ctx);

        // the outbound envelope sits in the output gate with a fresh id
        // and the reader's task address as sender
        ctx.run_gates();
        let inbox = ctx.local_registry().find("w1").unwrap();
        let outbound = inbox.try_get().expect("no envelope forwarded");
        assert_eq!(outbound.sender.to_string(), "q#r1");
        assert_eq!(outbound.receiver.to_string(), "w1#T");
        assert_ne!(outbound.request_id(), 11);

        // original id preserved in the in-flight map
        let core = queue.borrow();
        let slot = core.slot("r1").unwrap();
        let in_flight: Vec<u32> = slot
            .in_flight
            .values()
            .map(|p| p.envelope.request_id())
            .collect();
        assert_eq!(in_flight, vec![11]);
    }

    #[test]
    fn test_in_flight_limit_blocks_more_work() {
        let mut ctx = ctx();
        let queue = queue();
        let mut reader = started_reader(&queue, &mut ctx);

        queue.borrow_mut().handle_incoming(&work(1)).unwrap();
        queue.borrow_mut().handle_incoming(&work(2)).unwrap();
        drive_task(&mut reader, &mut ctx);

        // default limit is one in-flight request
        let in_flight = queue.borrow().slot("r1").map(|s| s.in_flight.len());
        assert_eq!(in_flight, Some(1));
        assert_eq!(queue.borrow().waiting_count(), 1);
        assert!(!reader.needs_run());
    }

    #[test]
    fn test_response_relays_to_original_sender() {
        let mut ctx = ctx();
        ctx.local_registry().register("client");
        let queue = queue();
        let mut reader = started_reader(&queue, &mut ctx);

        queue.borrow_mut().handle_incoming(&work(21)).unwrap();
        drive_task(&mut reader, &mut ctx);
        let outbound_id = queue
            .borrow()
            .slot("r1")
            .and_then(|s| s.in_flight.keys().next().copied())
            .unwrap();
        assert_ne!(outbound_id, 0);

        let response = ResponsePayload::new(StatusCode::OK, outbound_id);
        let verdict = reader.handle_response(
            &mut ctx,
            &MessagePayload::new("job.run", None, outbound_id),
            &response,
        );
        assert_eq!(verdict.unwrap(), StatusCode::OK);

        // the relayed response carries the original request id
        ctx.run_gates();
        let relayed = ctx.local_registry().find("client").and_then(|i| i.try_get());
        assert_eq!(relayed.map(|e| e.request_id()), Some(21));
    }

    #[test]
    fn test_stopping_cancels_outstanding_requests() {
        let mut ctx = ctx();
        ctx.local_registry().register("client");
        let queue = queue();
        let mut reader = started_reader(&queue, &mut ctx);

        queue.borrow_mut().handle_incoming(&work(31)).unwrap();
        drive_task(&mut reader, &mut ctx);

        reader.control_mut().request_stop();
        drive_task(&mut reader, &mut ctx);
        assert_eq!(reader.control().status(), TaskStatus::Destroying);
        assert_eq!(queue.borrow().reader_count(), 0);

        // non-durable queue: the cancellation surfaces as a Timeout
        // response to the original sender
        ctx.run_gates();
        let relayed = ctx.local_registry().find("client").and_then(|i| i.try_get());
        let payload = relayed.as_ref().and_then(|e| e.event.as_response()).cloned();
        assert_eq!(payload.as_ref().map(|p| p.status), Some(StatusCode::TIMEOUT));
        assert_eq!(payload.map(|p| p.request_id), Some(31));
    }
}
