//! Declarative-effect interpreter.
//!
//! Business logic is written as coroutines that yield *descriptions* of side
//! effects (`put`, `call`, `fork`, `join`, or a custom kind). A [`Scheduler`]
//! routes each description to its processor and resumes the coroutine with
//! the outcome, until the coroutine returns or fails.
//!
//! Consumers extend the interpreter by registering a [`Processor`] for a
//! custom [`EffectKind`], and embed it behind a [`HostAdapter`] that starts
//! coroutine work items and forwards everything else.

pub mod config;
pub mod coroutine;
pub mod dispatch;
pub mod effect;
pub mod error;
pub mod host;
pub mod processor;
pub mod processors;
pub mod registry;
pub mod scheduler;
pub mod task;

pub use config::{ConfigError, SchedulerConfig};
pub use coroutine::{from_fn, Co, Coroutine, FnCoroutine, Output, Resume, Step, Yielded};
pub use dispatch::{Dispatch, MemoryDispatchSink};
pub use effect::{call, fork, join, put, Effect, EffectKind, Target};
pub use error::{EffectError, EffectResult};
pub use host::{Dispatched, HostAdapter, WorkItem};
pub use processor::{processor_fn, EffectContext, FnProcessor, Processor, ProcessorRegistry};
pub use registry::{ActiveTasks, TaskSnapshot};
pub use scheduler::{Scheduler, SchedulerBuilder};
pub use task::{TaskHandle, TaskId, TaskState, TerminationToken};
