//! Batched light engine shared between threads.
//!
//! Callers on any thread queue tasks. Tasks are split into two phases around
//! each propagation pass: `PreUpdate` tasks feed changes into the engine and
//! `PostUpdate` tasks run once the light they depend on is published.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use steel_utils::{BlockPos, ChunkPos, SectionPos};

use super::level_light_engine::LevelLightEngine;
use crate::{
    LightChunk, LightChunkGetter, LightEngineConfig, LightError, LightLayer,
    data_layer::DataLayer, storage::LightSectionReader,
};

/// When a queued task runs relative to the propagation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// Before light propagation (marking blocks and sections).
    PreUpdate,
    /// After light propagation (completion callbacks).
    PostUpdate,
}

type LightTask = (TaskType, Box<dyn FnOnce(&mut LevelLightEngine) + Send>);

/// A [`LevelLightEngine`] behind a lock, fed through a task queue.
///
/// Writers queue tasks and one batch runs at a time. Readers use
/// [`ThreadedLevelLightEngine::reader`] and never take the lock.
pub struct ThreadedLevelLightEngine {
    engine: Mutex<LevelLightEngine>,
    light_tasks: Mutex<Vec<LightTask>>,
    block_reader: Option<LightSectionReader>,
    sky_reader: Option<LightSectionReader>,
    /// Set while a batch is running, so concurrent schedulers back off.
    scheduled: AtomicBool,
    task_batch_size: usize,
    min_section_y: i32,
    max_section_y: i32,
}

impl ThreadedLevelLightEngine {
    /// Creates the engine and its layers as enabled in `config`.
    pub fn new(
        chunk_source: Arc<dyn LightChunkGetter>,
        config: &LightEngineConfig,
    ) -> Result<Self, LightError> {
        let engine = LevelLightEngine::new(chunk_source, config)?;
        Ok(Self {
            block_reader: engine.get_layer_listener(LightLayer::Block),
            sky_reader: engine.get_layer_listener(LightLayer::Sky),
            engine: Mutex::new(engine),
            light_tasks: Mutex::new(Vec::new()),
            scheduled: AtomicBool::new(false),
            task_batch_size: config.task_batch_size,
            min_section_y: config.min_section_y,
            max_section_y: config.min_section_y + config.section_count as i32,
        })
    }

    /// Lock-free reader of the published light of `layer`.
    #[must_use]
    pub fn reader(&self, layer: LightLayer) -> Option<&LightSectionReader> {
        match layer {
            LightLayer::Block => self.block_reader.as_ref(),
            LightLayer::Sky => self.sky_reader.as_ref(),
        }
    }

    /// Published light of `layer` at `pos`, without locking.
    #[must_use]
    pub fn get_light_value(&self, layer: LightLayer, pos: BlockPos) -> u8 {
        self.reader(layer)
            .map_or(0, |reader| reader.get_light_value(pos))
    }

    /// Registers the non-empty sections of `chunk` and afterwards enables or
    /// disables light for it.
    pub fn initialize_light(&self, chunk: Arc<dyn LightChunk>, light_enabled: bool) {
        let column = chunk.pos();
        let (min_section_y, max_section_y) = (self.min_section_y, self.max_section_y);
        self.add_task(TaskType::PreUpdate, move |engine| {
            for section_y in min_section_y..max_section_y {
                if !chunk.is_section_empty(section_y) {
                    engine.update_section_status(SectionPos::of_chunk(column, section_y), false);
                }
            }
        });
        self.add_task(TaskType::PostUpdate, move |engine| {
            engine.set_light_enabled(column, light_enabled);
            engine.retain_data(column, false);
        });
    }

    /// Lights `column` from scratch unless it already carries light, then
    /// calls `on_lit` once the result is published.
    pub fn light_chunk<F>(&self, column: ChunkPos, is_lighted: bool, on_lit: F)
    where
        F: FnOnce(ChunkPos) + Send + 'static,
    {
        self.add_task(TaskType::PreUpdate, move |engine| {
            if !is_lighted {
                engine.propagate_light_sources(column);
            }
        });
        self.add_task(TaskType::PostUpdate, move |_| on_lit(column));
    }

    /// Marks the block at `pos` as changed.
    pub fn check_block(&self, pos: BlockPos) {
        self.add_task(TaskType::PreUpdate, move |engine| engine.check_block(pos));
    }

    /// Records whether block section `section` is empty.
    pub fn update_section_status(&self, section: SectionPos, is_empty: bool) {
        self.add_task(TaskType::PreUpdate, move |engine| {
            engine.update_section_status(section, is_empty);
        });
    }

    /// Enables light for `column` and queues all its light sources.
    pub fn propagate_light_sources(&self, column: ChunkPos) {
        self.add_task(TaskType::PreUpdate, move |engine| {
            engine.propagate_light_sources(column);
        });
    }

    /// Enables or disables light for `column`.
    pub fn set_light_enabled(&self, column: ChunkPos, enabled: bool) {
        self.add_task(TaskType::PreUpdate, move |engine| {
            engine.set_light_enabled(column, enabled);
        });
    }

    /// Hands in externally loaded light of `layer` for `section`.
    pub fn queue_section_data(&self, layer: LightLayer, section: SectionPos, data: Option<DataLayer>) {
        self.add_task(TaskType::PreUpdate, move |engine| {
            engine.queue_section_data(layer, section, data);
        });
    }

    /// Keeps the light of `column` around while its sections are unloaded.
    pub fn retain_data(&self, column: ChunkPos, retain: bool) {
        self.add_task(TaskType::PreUpdate, move |engine| {
            engine.retain_data(column, retain);
        });
    }

    fn add_task<F>(&self, task_type: TaskType, task: F)
    where
        F: FnOnce(&mut LevelLightEngine) + Send + 'static,
    {
        let queued = {
            let mut tasks = self.light_tasks.lock();
            tasks.push((task_type, Box::new(task)));
            tasks.len()
        };
        if queued >= self.task_batch_size {
            self.schedule();
        }
    }

    /// Runs a batch if any task or light work is pending and no other thread
    /// is running one already.
    pub fn try_schedule_update(&self) {
        if self.has_work() {
            self.schedule();
        }
    }

    fn schedule(&self) {
        if self
            .scheduled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.run_update();
        self.scheduled.store(false, Ordering::Release);
    }

    /// Runs up to one batch of tasks: its `PreUpdate` tasks, a full
    /// propagation pass, then its `PostUpdate` tasks.
    ///
    /// Returns the number of light changes processed.
    pub fn run_update(&self) -> usize {
        let batch: Vec<LightTask> = {
            let mut tasks = self.light_tasks.lock();
            let count = tasks.len().min(self.task_batch_size);
            tasks.drain(..count).collect()
        };

        let _span = tracing::debug_span!("light_update", tasks = batch.len()).entered();
        let (pre_update, post_update): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .partition(|(task_type, _)| *task_type == TaskType::PreUpdate);

        let mut engine = self.engine.lock();
        for (_, task) in pre_update {
            task(&mut *engine);
        }
        let processed = engine.run_light_updates();
        for (_, task) in post_update {
            task(&mut *engine);
        }
        tracing::debug!(processed, "Light update finished");
        processed
    }

    /// Returns true if tasks are queued or the engine has pending work.
    #[must_use]
    pub fn has_work(&self) -> bool {
        let has_tasks = !self.light_tasks.lock().is_empty();
        has_tasks || self.engine.lock().has_light_work()
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn queued_task_count(&self) -> usize {
        self.light_tasks.lock().len()
    }

    /// Runs `f` with the engine locked.
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut LevelLightEngine) -> T) -> T {
        f(&mut *self.engine.lock())
    }
}
