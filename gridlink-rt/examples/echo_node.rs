//! Minimal node walkthrough.
//!
//! Builds a two-node group: a hub carrying a round-robin queue and a
//! worker answering `job.greet`. The hub probes itself with `core.echo`,
//! then posts a job through the queue; both responses land in a request
//! handler that logs them.
//!
//! # Run This Example
//!
//! ```bash
//! RUST_LOG=debug cargo run --example echo_node
//! ```

use std::rc::Rc;
use std::time::Duration;

use gridlink_rt::prelude::*;

/// Logs every request outcome it receives.
struct PrintHandler;

impl RequestHandler for PrintHandler {
    fn on_result(
        &self,
        _ctx: &mut SchedulerContext,
        message: &MessagePayload,
        response: &ResponsePayload,
    ) {
        tracing::info!(command = %message.command, status = %response.status, "response arrived");
    }

    fn on_error(
        &self,
        _ctx: &mut SchedulerContext,
        message: &MessagePayload,
        response: &ResponsePayload,
    ) {
        tracing::warn!(
            command = %message.command,
            status = %response.status,
            error = ?response.error_text(),
            "request failed"
        );
    }
}

/// Worker task answering `job.greet`.
struct GreetTask {
    control: TaskControl,
}

impl Task for GreetTask {
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
        response: &mut ResponsePayload,
    ) -> Result<StatusCode, HandlerError> {
        let who = envelope
            .event
            .as_message()
            .and_then(|m| m.params.get_string("who"))
            .unwrap_or_else(|| "stranger".to_owned());
        response.set_result(Params::new().with("text", format!("hello, {who}")));
        Ok(StatusCode::OK)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let group = NodeGroup::new();
    let mut hub = group.build_node(SchedulerConfig::named("hub"))?;
    let mut worker = group.build_node(SchedulerConfig::named("worker"))?;
    worker.add_task(Box::new(GreetTask {
        control: TaskControl::new("greet"),
    }))?;

    let handler: HandlerRef = Rc::new(PrintHandler);

    // liveness probe against the hub itself
    hub.post_message("@this", "core.echo", None, 1, Some(Rc::clone(&handler)))?;

    // a round-robin queue on the hub with one reader bound to the worker
    hub.post_message(
        "@this",
        "squeue.init",
        Some(Params::new().with("name", "jobs").with("type", "rrobin")),
        0,
        None,
    )?;
    hub.post_message(
        "@this",
        "squeue.listen",
        Some(
            Params::new()
                .with("queue_name", "jobs")
                .with("target_name", "worker#greet"),
        ),
        0,
        None,
    )?;
    hub.flush_events();

    hub.post_message(
        "hub#jobs",
        "job.greet",
        Some(Params::new().with("who", "gridlink")),
        2,
        Some(handler),
    )?;

    for _ in 0..100 {
        hub.tick();
        worker.tick();
        std::thread::sleep(Duration::from_millis(2));
    }
    Ok(())
}
