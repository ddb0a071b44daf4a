//! Process discovery and resource sampling.
//!
//! This module provides the two OS-facing collaborators of the monitor:
//! a [`ProcessResolver`] that turns a pid or name pattern into a concrete
//! process once at startup, and a [`MetricSampler`] that reads one
//! [`Sample`](crate::metrics::Sample) per tick.

mod monitor;
mod resolver;

pub use monitor::{Capabilities, MetricSampler, ProcessMonitor};
pub use resolver::{pick_match, ProcessInfo, ProcessResolver, SystemResolver, Target};
