//! # Task Management System
//!
//! This module runs self-contained work on worker threads (native) or web workers (WASM) and
//! hands the results back to the main thread, which owns the world.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed asynchronously
//! - `TaskResult`: The result of a completed task, applied to the world on the main thread
//! - `TaskChannel`: Communication channel between the main thread and one worker
//!
//! ## Platform-Specific Behavior
//!
//! ### Native (Desktop) Implementation
//! - Uses `std::thread` for the worker pool
//! - Each worker has a dedicated channel for task distribution
//!
//! ### Web (WASM) Implementation
//! - Uses the `wasm_thread` crate, backed by Web Workers
//! - Tasks are processed asynchronously but may not run in parallel
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers process tasks and send back results
//! 4. Results are applied on the main thread in `process_completed_tasks()`
//! 5. Results can spawn new tasks
//!
//! Workers never touch the world. A task owns its inputs, and its result is the only thing
//! that crosses back, in a single message.
//!
//! ## Example Usage
//! ```no_run
//! use voxel_volume_engine::{
//!     ChunkWorld, Mesher, TaskManager, TerrainGenerationTask, Volume,
//!     engine_state::voxels::worldgen::FlatTerrain,
//! };
//!
//! let mut world = ChunkWorld::new(Volume::new(32, 32, 32, 16).unwrap(), Mesher::new());
//! let mut task_manager = TaskManager::new(1);
//!
//! task_manager.publish_task(Box::new(TerrainGenerationTask::new(
//!     Box::new(FlatTerrain::new(4, 1)),
//!     32,
//!     32,
//!     32,
//! )));
//!
//! // In the main loop:
//! task_manager.process_completed_tasks(&mut world);
//! task_manager.process_queued_tasks();
//! ```

pub mod task;

use log::{info, warn};
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use task::{Task, TaskResult};

#[cfg(target_family = "wasm")]
mod wasm_imports {
    pub use wasm_thread as thread;
    pub use wasm_thread::JoinHandle;
}

#[cfg(target_family = "wasm")]
use self::wasm_imports::*;

#[cfg(not(target_family = "wasm"))]
use std::thread::{self, JoinHandle};

use super::voxels::world::ChunkWorld;

/// A communication channel between the main thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from main thread to worker
/// - `result_receiver`: Receives task results from worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `_worker`: Handle to the worker thread (kept alive by this struct)
///
/// Dropping the channel closes `task_sender`, which ends the worker's receive loop.
pub struct TaskChannel {
    task_sender: Sender<Box<dyn Task + Send>>,
    result_receiver: Receiver<Box<dyn TaskResult + Send>>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// # Fields
/// - `channels`: Set of active worker channels
/// - `queued_tasks`: Tasks waiting for an available worker
/// - `current_channel`: Index for round-robin scheduling
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task + Send>>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// This is set to 1 to ensure tasks are processed in order within each channel.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl TaskManager {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create. With zero workers every task
    ///   stays queued.
    ///
    /// # Platform Notes
    /// - **Native**: Creates actual OS threads
    /// - **Web**: Creates Web Workers
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        info!(
            "Starting {} task workers (available parallelism: {:?})",
            num_workers,
            thread::available_parallelism()
        );

        for _ in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult + Send>>();

            let task_closure = move || {
                while let Ok(task) = task_rx.recv() {
                    let result = task.process();
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            };

            let worker = thread::spawn(task_closure);

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                _worker: worker,
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was successfully sent to the worker
    /// - `Err(task)` if the send failed (worker disconnected), handing the task back
    fn try_send_task(
        &mut self,
        task: Box<dyn Task + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task + Send>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => Err(task.0),
        }
    }

    /// Finds an available worker channel using round-robin from the last used channel.
    ///
    /// # Returns
    /// - `Some(usize)` index of a channel below `MAX_TASKS_IN_FLIGHT`
    /// - `None` if all channels are busy or there are no channels
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }

        let start_channel = self.current_channel;
        let mut current = start_channel;

        loop {
            if self.channels[current].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT {
                return Some(current);
            }
            current = (current + 1) % self.channels.len();
            if current == start_channel {
                return None;
            }
        }
    }

    /// Publishes a new task for execution.
    ///
    /// # Returns
    /// - `true` if the task was immediately scheduled on an available worker
    /// - `false` if the task was queued because all workers are busy
    pub fn publish_task(&mut self, task: Box<dyn Task + Send>) -> bool {
        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    warn!("Task worker {} disconnected, queueing task", channel_idx);
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Hands queued tasks to workers until the queue is empty or every worker is busy.
    ///
    /// Tasks are sent oldest first.
    pub fn process_queued_tasks(&mut self) {
        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                return;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => {
                    // Channel is disconnected, put task back and stop processing
                    self.queued_tasks.push_front(task);
                    return;
                }
            }
        }
    }

    /// Applies every result that has arrived, without blocking.
    ///
    /// Must be called on the main thread. Follow-up tasks returned by the results are
    /// published afterwards.
    ///
    /// # Returns
    /// The number of results applied.
    pub fn process_completed_tasks(&mut self, world: &mut ChunkWorld) -> usize {
        let mut tasks_to_queue = Vec::new();
        let mut handled = 0;
        for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight -= 1;
                tasks_to_queue.extend(result.handle_result(world));
                handled += 1;
            }
        }

        for task in tasks_to_queue {
            self.publish_task(task);
        }
        handled
    }

    /// Blocks until every published task, including follow-ups, has been applied.
    ///
    /// Meant for loading screens and headless runs; a frame loop should poll
    /// [`TaskManager::process_completed_tasks`] instead. Returns immediately when there are
    /// no workers.
    pub fn wait_until_idle(&mut self, world: &mut ChunkWorld) -> usize {
        let mut handled = 0;
        loop {
            self.process_queued_tasks();
            let Some(channel_idx) = self
                .channels
                .iter()
                .position(|channel| channel.num_tasks_in_flight > 0)
            else {
                return handled;
            };
            let channel = &mut self.channels[channel_idx];
            match channel.result_receiver.recv() {
                Ok(result) => {
                    channel.num_tasks_in_flight -= 1;
                    let follow_ups = result.handle_result(world);
                    handled += 1;
                    for task in follow_ups {
                        self.publish_task(task);
                    }
                }
                Err(_) => {
                    warn!("Task worker {} hung up with tasks in flight", channel_idx);
                    channel.num_tasks_in_flight = 0;
                }
            }
        }
    }

    /// Tasks sent to workers whose results have not been applied yet.
    pub fn tasks_in_flight(&self) -> usize {
        self.channels.iter().map(|c| c.num_tasks_in_flight).sum()
    }

    /// Tasks waiting for a free worker.
    pub fn queued_tasks(&self) -> usize {
        self.queued_tasks.len()
    }

    /// `true` when nothing is queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.tasks_in_flight() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{meshing::Mesher, voxels::volume::Volume};
    use cgmath::Point3;

    struct SetVoxel(Point3<i32>);

    struct SetVoxelResult(Point3<i32>);

    impl Task for SetVoxel {
        fn process(&self) -> Box<dyn TaskResult + Send> {
            Box::new(SetVoxelResult(self.0))
        }
    }

    impl TaskResult for SetVoxelResult {
        fn handle_result(self: Box<Self>, world: &mut ChunkWorld) -> Vec<Box<dyn Task + Send>> {
            world.update(self.0, 1, crate::engine_state::voxels::world::Stroke::Fill(1));
            // Chain one follow-up along x until the edge of the first chunk.
            if self.0.x < 3 {
                vec![Box::new(SetVoxel(Point3::new(self.0.x + 1, self.0.y, self.0.z)))]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn results_and_follow_ups_are_applied_on_the_calling_thread() {
        let mut world = ChunkWorld::new(Volume::new(8, 8, 8, 4).unwrap(), Mesher::new());
        let mut manager = TaskManager::new(2);
        assert!(manager.publish_task(Box::new(SetVoxel(Point3::new(0, 0, 0)))));

        let handled = manager.wait_until_idle(&mut world);
        assert_eq!(handled, 4);
        assert!(manager.is_idle());
        for x in 0..4 {
            assert!(world.volume().is_solid(Point3::new(x, 0, 0)));
        }
    }

    #[test]
    fn tasks_queue_while_workers_are_busy() {
        let mut world = ChunkWorld::new(Volume::new(8, 8, 8, 4).unwrap(), Mesher::new());
        let mut manager = TaskManager::new(1);
        assert!(manager.publish_task(Box::new(SetVoxel(Point3::new(3, 2, 2)))));
        assert!(!manager.publish_task(Box::new(SetVoxel(Point3::new(3, 5, 5)))));
        assert_eq!(manager.queued_tasks(), 1);

        manager.wait_until_idle(&mut world);
        assert!(world.volume().is_solid(Point3::new(3, 2, 2)));
        assert!(world.volume().is_solid(Point3::new(3, 5, 5)));
    }

    #[test]
    fn without_workers_tasks_stay_queued() {
        let mut world = ChunkWorld::new(Volume::new(4, 4, 4, 4).unwrap(), Mesher::new());
        let mut manager = TaskManager::new(0);
        assert!(!manager.publish_task(Box::new(SetVoxel(Point3::new(0, 0, 0)))));
        assert_eq!(manager.wait_until_idle(&mut world), 0);
        assert_eq!(manager.queued_tasks(), 1);
    }
}
