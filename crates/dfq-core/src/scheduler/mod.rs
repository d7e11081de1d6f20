//! Job scheduler: admission under a global worker budget, event-driven drain
//! loop, and chunk fan-out execution.
//!
//! Triggers (enqueue, job completion, backstop tick) converge on one drain
//! procedure that admits the highest-priority pending job while the budget
//! allows, launching each admitted job as its own task.

mod admit;
mod execute;
mod ledger;
mod run;

pub use admit::try_admit_next;
pub use execute::{run_job, JobReport, ProcessingError};
pub use ledger::WorkerLedger;
pub use run::{CompletionSink, JobCompletion, LoggingSink, Scheduler};
