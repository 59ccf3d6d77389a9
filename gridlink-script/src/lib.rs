//! # gridlink-script - Command-Script Front End
//!
//! Text front end for the gridlink runtime: parses script lines of the
//! form `[addr]cmd param,name=value:cmd2 ...` into
//! [`Scheduler::post_message`](gridlink_rt::scheduler::Scheduler::post_message)
//! calls, with quoting, `#NAME#` variable substitution and command
//! aliases. `core.flush_events` without an address is executed
//! synchronously so scripts can observe their own side effects mid-line.
//!
//! ```rust
//! use gridlink_rt::{NodeGroup, SchedulerConfig};
//! use gridlink_script::CommandParser;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let group = NodeGroup::new();
//! let mut node = group.build_node(SchedulerConfig::named("alpha"))?;
//!
//! let mut parser = CommandParser::new();
//! parser.run_line(&mut node, "squeue.init Q,type=rrobin:core.flush_events")?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod parser;

pub use error::ScriptError;
pub use parser::{CommandParser, ParsedCommand};

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use gridlink_rt::{NodeGroup, SchedulerConfig};

    #[test]
    fn test_run_line_posts_and_flushes() {
        let group = NodeGroup::new();
        let mut node = group.build_node(SchedulerConfig::named("alpha")).unwrap();

        let mut parser = CommandParser::new();
        // init is handled synchronously by the flush, so the queue manager
        // task exists before run_line returns
        let count = parser
            .run_line(&mut node, "squeue.init Q,type=rrobin:core.flush_events")
            .unwrap();
        assert_eq!(count, 2);
        assert!(node.has_task("Q"));
    }

    #[test]
    fn test_run_line_rejects_unknown_receiver() {
        let group = NodeGroup::new();
        let mut node = group.build_node(SchedulerConfig::named("alpha")).unwrap();

        let mut parser = CommandParser::new();
        let result = parser.run_line(&mut node, "[@ghost]job.run");
        assert!(result.is_err());
    }
}
