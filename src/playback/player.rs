use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::container::{ParseOpts, detect_format, parse_animation};
use crate::foundation::core::{ByteOrder, Size};
use crate::foundation::error::{FrameSeqError, FrameSeqResult};
use crate::foundation::math::floor_pow2;
use crate::frame::compositor::Compositor;
use crate::frame::model::AnimationInfo;
use crate::io::reader::BinaryReader;
use crate::io::source::{ByteSource, SeekableStream};
use crate::playback::cursor::LoopCursor;
use crate::playback::lanes::{Lane, LanePool};
use crate::playback::listener::{ListenerId, RenderListener};
use crate::raster::{ImageRasterDecoder, RasterDecoder};
use crate::render::buffer::PixelBuffer;
use crate::render::pool::{BufferPool, PoolOpts};

/// Options for a playback session.
#[derive(Clone, Debug)]
pub struct PlayerOpts {
    /// Lanes to draw from; `None` uses [`LanePool::global`].
    pub lane_pool: Option<Arc<LanePool>>,
    /// Initial loop-limit override (0 = forever). `None` follows the container.
    pub loop_limit: Option<u32>,
    /// Retention caps for the session's buffer pool.
    pub pool: PoolOpts,
    /// Verify chunk checksums while parsing.
    pub verify_crc: bool,
}

impl Default for PlayerOpts {
    fn default() -> Self {
        Self {
            lane_pool: None,
            loop_limit: None,
            pool: PoolOpts::default(),
            verify_crc: true,
        }
    }
}

/// Session lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    /// Nothing loaded or playing.
    Idle,
    /// Parsing and allocating.
    Initializing,
    /// Ticks are scheduled.
    Running,
    /// Teardown in progress.
    Finishing,
}

#[derive(Clone, Copy, Debug)]
struct Meta {
    viewport: Size,
    frame_count: usize,
    loop_count: u32,
}

type ListenerEntry = (ListenerId, Arc<dyn RenderListener>);

struct Session {
    source: Arc<dyn ByteSource>,
    raster: Box<dyn RasterDecoder>,
    pool: BufferPool,
    verify_crc: bool,
    state: PlayerState,
    paused: bool,
    sample: u32,
    loop_limit: Option<u32>,
    meta: Option<Meta>,
    info: Option<Arc<AnimationInfo>>,
    reader: Option<BinaryReader<Box<dyn SeekableStream>>>,
    compositor: Option<Compositor>,
    cursor: LoopCursor,
    generation: u64,
    listeners: Vec<ListenerEntry>,
}

impl Session {
    fn num_plays(&self) -> u32 {
        let declared = self.meta.map_or(1, |m| m.loop_count);
        self.loop_limit.unwrap_or(declared)
    }

    fn listeners(&self) -> Vec<Arc<dyn RenderListener>> {
        self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
    }

    fn load(&mut self) -> FrameSeqResult<()> {
        let stream = self.source.open()?;
        let mut reader = BinaryReader::new(stream, ByteOrder::BigEndian)?;
        let opts = ParseOpts {
            verify_crc: self.verify_crc,
        };
        let info = match parse_animation(&mut reader, opts) {
            Ok(info) => info,
            Err(err) if err.is_recoverable() => {
                tracing::warn!(
                    source = %self.source.describe(),
                    %err,
                    "animation metadata unusable, falling back to a still image"
                );
                self.still_info(&mut reader)?
            }
            Err(err) => return Err(err),
        };
        if info.viewport.is_empty() {
            return Err(FrameSeqError::BufferSize {
                width: info.viewport.width,
                height: info.viewport.height,
            });
        }
        self.meta = Some(Meta {
            viewport: info.viewport,
            frame_count: info.frames.len(),
            loop_count: info.loop_count,
        });
        self.info = Some(Arc::new(info));
        self.reader = Some(reader);
        Ok(())
    }

    fn still_info(
        &mut self,
        reader: &mut BinaryReader<Box<dyn SeekableStream>>,
    ) -> FrameSeqResult<AnimationInfo> {
        let format = detect_format(reader)?;
        let bytes = reader.read_vec(reader.available() as usize)?;
        let viewport = self.raster.probe(format, &bytes)?;
        Ok(AnimationInfo::still(format, viewport))
    }

    fn initialize(&mut self) -> FrameSeqResult<()> {
        if self.info.is_some()
            && let Some(reader) = self.reader.as_mut()
        {
            reader.reset()?;
        } else {
            self.load()?;
        }
        let Some(info) = &self.info else {
            return Err(FrameSeqError::Other(anyhow::anyhow!(
                "no animation after load"
            )));
        };
        self.compositor = Some(Compositor::new(Arc::clone(info), self.sample));
        Ok(())
    }

    fn composite(&mut self, index: usize) -> FrameSeqResult<()> {
        let (Some(reader), Some(compositor)) = (self.reader.as_mut(), self.compositor.as_mut())
        else {
            return Err(FrameSeqError::Other(anyhow::anyhow!(
                "tick without an initialized session"
            )));
        };
        compositor
            .render(index, reader, &mut *self.raster, &self.pool)
            .map(|_| ())
    }

    fn teardown(&mut self) {
        if let Some(mut compositor) = self.compositor.take() {
            compositor.release(&self.pool);
        }
        self.reader = None;
        self.info = None;
        self.pool.clear();
    }

    fn memory_footprint(&self) -> usize {
        self.pool.memory_size() + self.compositor.as_ref().map_or(0, Compositor::memory_size)
    }
}

struct Shared {
    lane: Lane,
    next_listener: AtomicU64,
    session: Mutex<Session>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_lane(self: &Arc<Self>, task: impl FnOnce(&Arc<Self>) + Send + 'static) {
        let shared = Arc::clone(self);
        if !self.lane.post(move || task(&shared)) {
            tracing::error!(lane = self.lane.id(), "playback lane is gone; call dropped");
        }
    }

    fn schedule_tick(self: &Arc<Self>, generation: u64, delay: Duration) {
        let shared = Arc::clone(self);
        self.lane
            .post_delayed(delay, move || shared.tick(generation));
    }

    fn ensure_parsed(&self) -> Option<Meta> {
        let mut s = self.lock();
        if s.meta.is_none()
            && let Err(err) = s.load()
        {
            log_init_error(&err);
        }
        s.meta
    }

    fn start(self: &Arc<Self>) {
        let running = matches!(
            self.lock().state,
            PlayerState::Running | PlayerState::Initializing
        );
        if running {
            self.stop(false);
        }

        let mut s = self.lock();
        if s.state != PlayerState::Idle {
            tracing::warn!(state = ?s.state, "start() ignored");
            return;
        }
        if s.cursor.is_finished() && s.num_plays() != 0 {
            tracing::debug!("playback already finished; reset() to play again");
            return;
        }

        s.state = PlayerState::Initializing;
        s.paused = false;
        s.cursor.rewind();
        let started = Instant::now();
        if let Err(err) = s.initialize() {
            s.teardown();
            s.state = PlayerState::Idle;
            log_init_error(&err);
            return;
        }
        s.state = PlayerState::Running;
        s.generation += 1;
        let generation = s.generation;
        let listeners = s.listeners();
        tracing::debug!(
            source = %s.source.describe(),
            sample = s.sample,
            cost_ms = started.elapsed().as_millis() as u64,
            "playback running"
        );
        drop(s);

        for listener in &listeners {
            listener.on_start();
        }
        self.schedule_tick(generation, Duration::ZERO);
    }

    fn stop(self: &Arc<Self>, explicit: bool) {
        let mut s = self.lock();
        if matches!(s.state, PlayerState::Idle | PlayerState::Finishing) {
            if explicit {
                tracing::warn!(state = ?s.state, "stop() with nothing to stop");
            }
            return;
        }
        s.state = PlayerState::Finishing;
        s.generation += 1;
        s.teardown();
        s.state = PlayerState::Idle;
        let listeners = s.listeners();
        drop(s);

        for listener in &listeners {
            listener.on_end();
        }
    }

    fn tick(self: &Arc<Self>, generation: u64) {
        let mut s = self.lock();
        if s.generation != generation || s.paused || s.state != PlayerState::Running {
            return;
        }
        let Some(info) = s.info.clone() else {
            return;
        };
        let frame_count = info.frames.len();
        let num_plays = s.num_plays();
        if !s.cursor.can_step(num_plays, frame_count) {
            drop(s);
            tracing::debug!(num_plays, "loop limit reached");
            self.stop(false);
            return;
        }

        let index = s.cursor.step(frame_count);
        let started = Instant::now();
        let result = s.composite(index);
        let cost = started.elapsed();
        if let Err(err) = result {
            if err.is_fatal() {
                drop(s);
                tracing::error!(frame = index, %err, "stream failed during playback");
                self.stop(false);
                return;
            }
            tracing::warn!(frame = index, %err, "frame skipped");
        }

        let duration = Duration::from_millis(u64::from(info.frames[index].duration_ms));
        self.schedule_tick(generation, duration.saturating_sub(cost));

        let output = s.compositor.as_mut().and_then(Compositor::take_output);
        let listeners = s.listeners();
        drop(s);

        let Some(frame) = output else {
            return;
        };
        for listener in &listeners {
            listener.on_render(index, &frame);
        }
        let mut s = self.lock();
        match s.compositor.as_mut() {
            Some(compositor) => compositor.restore_output(frame),
            None => s.pool.recycle(Some(frame)),
        }
    }

    fn set_paused(self: &Arc<Self>, paused: bool) {
        let mut s = self.lock();
        if s.paused == paused {
            return;
        }
        s.paused = paused;
        s.generation += 1;
        let generation = s.generation;
        let running = s.state == PlayerState::Running;
        drop(s);
        if !paused && running {
            self.schedule_tick(generation, Duration::ZERO);
        }
    }

    fn resample(self: &Arc<Self>, sample: u32) {
        let running = matches!(
            self.lock().state,
            PlayerState::Running | PlayerState::Initializing
        );
        self.stop(false);
        self.lock().sample = sample;
        if running {
            self.start();
        }
    }
}

fn log_init_error(err: &FrameSeqError) {
    match err {
        FrameSeqError::InvalidSignature(_) => {
            tracing::warn!(%err, "not a supported animation; viewport is empty")
        }
        _ => tracing::error!(%err, "playback initialization failed"),
    }
}

fn desired_sample(viewport: Size, width: u32, height: u32) -> u32 {
    if width == 0 || height == 0 {
        return 1;
    }
    floor_pow2((viewport.width / width).min(viewport.height / height))
}

/// One playback session over a byte source.
///
/// Every state change runs on the session's lane, so calls return immediately and take
/// effect in call order. Notifications reach listeners on that lane.
pub struct Player {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("lane", &self.shared.lane.id())
            .field("state", &self.state())
            .finish()
    }
}

impl Player {
    /// Session with the default raster decoder and options.
    pub fn new(source: impl ByteSource + 'static) -> FrameSeqResult<Self> {
        Self::with_options(
            Arc::new(source),
            Box::new(ImageRasterDecoder::new()),
            PlayerOpts::default(),
        )
    }

    /// Session with an explicit decoder and options.
    pub fn with_options(
        source: Arc<dyn ByteSource>,
        raster: Box<dyn RasterDecoder>,
        opts: PlayerOpts,
    ) -> FrameSeqResult<Self> {
        let lanes = opts.lane_pool.unwrap_or_else(LanePool::global);
        let lane = lanes.acquire()?;
        let session = Session {
            source,
            raster,
            pool: BufferPool::new(opts.pool),
            verify_crc: opts.verify_crc,
            state: PlayerState::Idle,
            paused: false,
            sample: 1,
            loop_limit: opts.loop_limit,
            meta: None,
            info: None,
            reader: None,
            compositor: None,
            cursor: LoopCursor::new(),
            generation: 0,
            listeners: Vec::new(),
        };
        Ok(Self {
            shared: Arc::new(Shared {
                lane,
                next_listener: AtomicU64::new(1),
                session: Mutex::new(session),
            }),
        })
    }

    /// Begin (or restart) playback from the first frame.
    pub fn start(&self) {
        self.shared.on_lane(|shared| shared.start());
    }

    /// Stop playback and release buffers and the open stream.
    pub fn stop(&self) {
        self.shared.on_lane(|shared| shared.stop(true));
    }

    /// Hold the current frame. State stays [`PlayerState::Running`].
    pub fn pause(&self) {
        self.shared.on_lane(|shared| shared.set_paused(true));
    }

    /// Continue after [`Player::pause`].
    pub fn resume(&self) {
        self.shared.on_lane(|shared| shared.set_paused(false));
    }

    /// Rewind to before the first frame and clear the finished flag.
    pub fn reset(&self) {
        self.shared.on_lane(|shared| {
            let mut s = shared.lock();
            s.cursor.reset();
            if let Some(compositor) = s.compositor.as_mut() {
                compositor.reset();
            }
        });
    }

    /// Override the container's loop count; `0` loops forever, negative restores it.
    pub fn set_loop_limit(&self, limit: i32) {
        let limit = u32::try_from(limit).ok();
        self.shared
            .on_lane(move |shared| shared.lock().loop_limit = limit);
    }

    /// Register a listener.
    pub fn add_listener(&self, listener: Arc<dyn RenderListener>) -> ListenerId {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::Relaxed));
        self.shared
            .on_lane(move |shared| shared.lock().listeners.push((id, listener)));
        id
    }

    /// Unregister a listener; unknown ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        self.shared
            .on_lane(move |shared| shared.lock().listeners.retain(|(l, _)| *l != id));
    }

    /// Stop if nobody is listening any more.
    pub fn stop_if_no_listeners(&self) {
        self.shared.on_lane(|shared| {
            let empty = shared.lock().listeners.is_empty();
            if empty {
                shared.stop(false);
            }
        });
    }

    /// Canvas size, parsing the container on the lane (and blocking) the first time.
    /// Empty when the source is not a supported animation.
    pub fn viewport(&self) -> Size {
        self.meta().map_or_else(Size::default, |m| m.viewport)
    }

    /// Frames in the container; parses like [`Player::viewport`].
    pub fn frame_count(&self) -> usize {
        self.meta().map_or(0, |m| m.frame_count)
    }

    fn meta(&self) -> Option<Meta> {
        if let Some(meta) = self.shared.lock().meta {
            return Some(meta);
        }
        let shared = Arc::clone(&self.shared);
        self.shared
            .lane
            .execute(move || shared.ensure_parsed())
            .flatten()
    }

    /// Pick the power-of-two downscale for a target size. Returns whether it changed; a
    /// running session restarts at the new scale.
    pub fn set_desired_size(&self, width: u32, height: u32) -> bool {
        let sample = desired_sample(self.viewport(), width, height);
        if sample == self.shared.lock().sample {
            return false;
        }
        self.shared.on_lane(move |shared| shared.resample(sample));
        true
    }

    /// Current downscale factor.
    pub fn sample_size(&self) -> u32 {
        self.shared.lock().sample
    }

    /// Lifecycle state.
    pub fn state(&self) -> PlayerState {
        self.shared.lock().state
    }

    /// `true` while initializing or running.
    pub fn is_running(&self) -> bool {
        matches!(
            self.state(),
            PlayerState::Running | PlayerState::Initializing
        )
    }

    /// `true` between [`Player::pause`] and [`Player::resume`].
    pub fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    /// Copy of the last composited canvas.
    pub fn current_frame(&self) -> Option<PixelBuffer> {
        let s = self.shared.lock();
        s.compositor.as_ref().and_then(Compositor::output).cloned()
    }

    /// Bytes held by the buffer pool and the compositor.
    pub fn memory_footprint(&self) -> usize {
        self.shared.lock().memory_footprint()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.shared.on_lane(|shared| shared.stop(false));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/player.rs"]
mod tests;
