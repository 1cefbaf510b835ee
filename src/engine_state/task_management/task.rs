//! # Task Traits
//!
//! A [`Task`] is work that runs on a worker thread; its [`TaskResult`] is applied to the
//! [`ChunkWorld`] back on the main thread.
//!
//! 1. A task is scheduled with `TaskManager::publish_task()`
//! 2. A worker calls `process()` and sends the boxed result back
//! 3. `TaskManager::process_completed_tasks()` calls `handle_result()` with the world
//! 4. Any follow-up tasks returned are published in turn
//!
//! Tasks own everything they work on. Nothing is shared with the main thread while a task
//! runs; the only hand-off is the result travelling back over a channel.

use crate::engine_state::voxels::world::ChunkWorld;

/// A unit of work that can be executed on a worker thread.
///
/// # Implementation Guidelines
/// - Must be `Send` to be transferred between threads
/// - Should be coarse-grained to amortize scheduling overhead
/// - Should own its inputs rather than reference shared state
pub trait Task: Send {
    /// Processes the task and returns a result.
    ///
    /// Runs on a background thread.
    ///
    /// # Returns
    /// A boxed `TaskResult` that will be processed on the main thread.
    fn process(&self) -> Box<dyn TaskResult + Send>;
}

/// The result of processing a `Task`.
pub trait TaskResult: Send {
    /// Applies the result on the main thread.
    ///
    /// # Arguments
    /// * `world` - The world owned by the main thread
    ///
    /// # Returns
    /// Follow-up tasks to schedule (can be empty).
    fn handle_result(self: Box<Self>, world: &mut ChunkWorld) -> Vec<Box<dyn Task + Send>>;
}
