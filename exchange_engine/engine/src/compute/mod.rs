//! Consumer side: pay for a task, wait for the committee, rebuild the plaintext.

pub mod orchestrator;
pub mod poller;
pub mod reconstruct;

pub use orchestrator::TaskOrchestrator;
pub use poller::wait_for_completion;
pub use reconstruct::Reconstructor;
