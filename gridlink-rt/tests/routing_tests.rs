//! End-to-end routing scenarios: echo, timeouts, command-map defaults,
//! cross-node delivery and dispatcher forwarding.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use gridlink_rt::message::{
    Address, Envelope, Event, MessagePayload, Params, ResponsePayload, StatusCode,
};
use gridlink_rt::module::HandlerError;
use gridlink_rt::scheduler::{
    HandlerRef, RequestHandler, Scheduler, SchedulerConfig, SchedulerContext,
};
use gridlink_rt::system::NodeGroup;
use gridlink_rt::task::{Task, TaskControl};

type ResponseLog = Rc<RefCell<Vec<ResponsePayload>>>;

struct CollectHandler {
    seen: ResponseLog,
}

impl CollectHandler {
    fn pair() -> (HandlerRef, ResponseLog) {
        let seen: ResponseLog = Rc::new(RefCell::new(Vec::new()));
        let handler: HandlerRef = Rc::new(CollectHandler {
            seen: Rc::clone(&seen),
        });
        (handler, seen)
    }
}

impl RequestHandler for CollectHandler {
    fn on_result(
        &self,
        _ctx: &mut SchedulerContext,
        _message: &MessagePayload,
        response: &ResponsePayload,
    ) {
        self.seen.borrow_mut().push(response.clone());
    }

    fn on_error(
        &self,
        _ctx: &mut SchedulerContext,
        _message: &MessagePayload,
        response: &ResponsePayload,
    ) {
        self.seen.borrow_mut().push(response.clone());
    }
}

type WorkLog = Rc<RefCell<Vec<(String, String, Instant)>>>;

/// Worker task that records every command it receives.
struct RecordingTask {
    control: TaskControl,
    label: String,
    log: WorkLog,
    verdict: StatusCode,
}

impl RecordingTask {
    fn new(name: &str, label: &str, log: WorkLog, verdict: StatusCode) -> Self {
        Self {
            control: TaskControl::new(name),
            label: label.to_owned(),
            log,
            verdict,
        }
    }
}

impl Task for RecordingTask {
    fn control(&self) -> &TaskControl {
        &self.control
    }

    fn control_mut(&mut self) -> &mut TaskControl {
        &mut self.control
    }

    fn handle_message(
        &mut self,
        _ctx: &mut SchedulerContext,
        envelope: &Envelope,
        _response: &mut ResponsePayload,
    ) -> Result<StatusCode, HandlerError> {
        let command = envelope
            .event
            .as_message()
            .map(|m| m.command.clone())
            .unwrap_or_default();
        self.log
            .borrow_mut()
            .push((self.label.clone(), command, Instant::now()));
        Ok(self.verdict)
    }
}

/// Task that accepts messages but never answers them.
struct SilentTask {
    control: TaskControl,
}

impl Task for SilentTask {
    fn control(&self) -> &TaskControl {
        &self.control
    }

    fn control_mut(&mut self) -> &mut TaskControl {
        &mut self.control
    }

    fn handle_message(
        &mut self,
        _ctx: &mut SchedulerContext,
        _envelope: &Envelope,
        _response: &mut ResponsePayload,
    ) -> Result<StatusCode, HandlerError> {
        Ok(StatusCode::FORWARDED)
    }
}

fn pump(nodes: &mut [&mut Scheduler], duration: Duration) {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        for node in nodes.iter_mut() {
            node.tick();
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

fn pump_until(
    nodes: &mut [&mut Scheduler],
    limit: Duration,
    mut done: impl FnMut() -> bool,
) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        for node in nodes.iter_mut() {
            node.tick();
        }
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn test_echo_to_own_address() {
    let group = NodeGroup::new();
    let mut node = group.build_node(SchedulerConfig::named("alpha")).unwrap();
    let (handler, seen) = CollectHandler::pair();

    node.post_message("@this", "core.echo", None, 1, Some(handler))
        .unwrap();
    assert!(pump_until(&mut [&mut node], Duration::from_secs(1), || {
        !seen.borrow().is_empty()
    }));

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].status, StatusCode::OK);
    assert_eq!(seen[0].request_id, 1);
    assert!(seen[0].result.is_none());
    assert!(seen[0].error.is_none());
}

#[test]
fn test_cross_node_task_dispatch() {
    let group = NodeGroup::new();
    let mut client = group.build_node(SchedulerConfig::named("alpha")).unwrap();
    let mut worker_node = group.build_node(SchedulerConfig::named("w1")).unwrap();

    let log: WorkLog = Rc::new(RefCell::new(Vec::new()));
    worker_node
        .add_task(Box::new(RecordingTask::new(
            "work",
            "w1",
            Rc::clone(&log),
            StatusCode::OK,
        )))
        .unwrap();

    let (handler, seen) = CollectHandler::pair();
    client
        .post_message("w1#work", "job.run", Some(Params::new().with("n", 1u64)), 5, Some(handler))
        .unwrap();

    assert!(pump_until(
        &mut [&mut client, &mut worker_node],
        Duration::from_secs(1),
        || !seen.borrow().is_empty()
    ));

    assert_eq!(log.borrow().len(), 1);
    assert_eq!(log.borrow()[0].1, "job.run");
    let seen = seen.borrow();
    assert_eq!(seen[0].status, StatusCode::OK);
    assert_eq!(seen[0].request_id, 5);
}

#[test]
fn test_request_timeout_delivers_exactly_one_outcome() {
    let group = NodeGroup::new();
    let mut client = group.build_node(SchedulerConfig::named("alpha")).unwrap();
    let mut worker_node = group.build_node(SchedulerConfig::named("w1")).unwrap();
    worker_node
        .add_task(Box::new(SilentTask {
            control: TaskControl::new("silent"),
        }))
        .unwrap();

    let (handler, seen) = CollectHandler::pair();
    let envelope = Envelope::new(
        Address::empty(),
        Address::parse("w1#silent"),
        Event::message("job.slow", None, 30),
    )
    .with_timeout(Duration::from_millis(100));
    client.post_envelope(envelope, Some(handler)).unwrap();

    // run well past the deadline so a duplicate outcome would show up
    pump(&mut [&mut client, &mut worker_node], Duration::from_millis(300));

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].status, StatusCode::TIMEOUT);
    assert_eq!(seen[0].request_id, 30);
    assert!(seen[0].result.is_none());
}

#[test]
fn test_command_map_routes_unaddressed_commands() {
    let group = NodeGroup::new();
    let mut client = group.build_node(SchedulerConfig::named("alpha")).unwrap();
    let mut worker_node = group.build_node(SchedulerConfig::named("w1")).unwrap();

    let log: WorkLog = Rc::new(RefCell::new(Vec::new()));
    worker_node
        .add_task(Box::new(RecordingTask::new(
            "work",
            "w1",
            Rc::clone(&log),
            StatusCode::OK,
        )))
        .unwrap();

    client
        .register_node_as("@worker", "w1#work", Default::default())
        .unwrap();
    client.register_command_map("job.*", "@worker", 10).unwrap();

    let (handler_a, seen_a) = CollectHandler::pair();
    let (handler_b, seen_b) = CollectHandler::pair();
    client
        .post_message("", "job.run", None, 41, Some(handler_a))
        .unwrap();
    // no explicit rule matches, so the built-in *.* -> @worker applies
    client
        .post_message("", "other.run", None, 42, Some(handler_b))
        .unwrap();

    assert!(pump_until(
        &mut [&mut client, &mut worker_node],
        Duration::from_secs(1),
        || seen_a.borrow().len() + seen_b.borrow().len() == 2
    ));

    let commands: Vec<String> = log.borrow().iter().map(|(_, c, _)| c.clone()).collect();
    assert!(commands.contains(&"job.run".to_owned()));
    assert!(commands.contains(&"other.run".to_owned()));
}

#[test]
fn test_unknown_node_answered_with_error() {
    let group = NodeGroup::new();
    let mut client = group.build_node(SchedulerConfig::named("alpha")).unwrap();

    let (handler, seen) = CollectHandler::pair();
    client
        .post_message("ghost", "job.run", None, 50, Some(handler))
        .unwrap();

    assert!(pump_until(&mut [&mut client], Duration::from_secs(1), || {
        !seen.borrow().is_empty()
    }));

    let seen = seen.borrow();
    assert_eq!(seen[0].status, StatusCode::UNKNOWN_NODE);
    assert!(seen[0].is_error());
}

#[test]
fn test_unresolvable_role_fails_without_dispatcher() {
    let group = NodeGroup::new();
    let mut client = group.build_node(SchedulerConfig::named("alpha")).unwrap();

    let result = client.post_message("@nowhere", "job.run", None, 0, None);
    assert!(result.is_err());
}

#[test]
fn test_forward_through_dispatcher() {
    let group = NodeGroup::new();
    let mut client = group
        .build_node(SchedulerConfig::named("alpha").with_dispatcher("beta"))
        .unwrap();
    let mut dispatcher = group.build_node(SchedulerConfig::named("beta")).unwrap();
    let mut worker_node = group.build_node(SchedulerConfig::named("w1")).unwrap();

    let log: WorkLog = Rc::new(RefCell::new(Vec::new()));
    worker_node
        .add_task(Box::new(RecordingTask::new(
            "work",
            "w1",
            Rc::clone(&log),
            StatusCode::OK,
        )))
        .unwrap();
    // only the dispatcher knows where @svc lives
    dispatcher
        .register_node_as("@svc", "w1#work", Default::default())
        .unwrap();

    let (handler, seen) = CollectHandler::pair();
    client
        .post_message("@svc", "job.run", None, 60, Some(handler))
        .unwrap();

    assert!(pump_until(
        &mut [&mut client, &mut dispatcher, &mut worker_node],
        Duration::from_secs(1),
        || !seen.borrow().is_empty()
    ));

    assert_eq!(log.borrow().len(), 1);
    let seen = seen.borrow();
    assert_eq!(seen[0].status, StatusCode::OK);
    assert_eq!(seen[0].request_id, 60);
}

#[test]
fn test_directory_resolution_reposts_original_message() {
    let group = NodeGroup::new();
    let mut client = group
        .build_node(SchedulerConfig::named("alpha").with_directory("dir"))
        .unwrap();
    let mut directory = group.build_node(SchedulerConfig::named("dir")).unwrap();
    let mut worker_node = group.build_node(SchedulerConfig::named("w1")).unwrap();

    let log: WorkLog = Rc::new(RefCell::new(Vec::new()));
    worker_node
        .add_task(Box::new(RecordingTask::new(
            "work",
            "w1",
            Rc::clone(&log),
            StatusCode::OK,
        )))
        .unwrap();
    directory
        .register_node_as(
            "@svc",
            "w1#work",
            gridlink_rt::registry::RegisterOptions {
                public: true,
                ..Default::default()
            },
        )
        .unwrap();

    let (handler, seen) = CollectHandler::pair();
    client
        .post_message("@svc", "job.run", None, 70, Some(handler))
        .unwrap();

    assert!(pump_until(
        &mut [&mut client, &mut directory, &mut worker_node],
        Duration::from_secs(1),
        || !seen.borrow().is_empty()
    ));

    assert_eq!(log.borrow().len(), 1);
    let seen = seen.borrow();
    assert_eq!(seen[0].status, StatusCode::OK);
    // the discovered mapping is cached locally
    drop(seen);
    assert_eq!(client.evaluate_address("@svc"), "w1#work");
}
