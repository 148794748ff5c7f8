use std::sync::Mutex;
use std::sync::mpsc;

use crate::render::buffer::PixelBuffer;

/// Receives playback notifications on the session's lane.
///
/// Order per session is always `on_start`, any number of `on_render`, then `on_end`.
pub trait RenderListener: Send + Sync {
    /// Playback entered the running state.
    fn on_start(&self) {}

    /// A tick finished. `frame` is the persistent canvas; copy it to keep it.
    fn on_render(&self, frame_index: usize, frame: &PixelBuffer);

    /// Playback stopped and resources were released.
    fn on_end(&self) {}
}

/// Handle returned by `Player::add_listener`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Notification forwarded by a [`ChannelListener`].
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    /// See [`RenderListener::on_start`].
    Started,
    /// See [`RenderListener::on_render`].
    Rendered {
        /// Frame that was composited.
        index: usize,
        /// Copy of the canvas, if frames are being captured.
        frame: Option<PixelBuffer>,
    },
    /// See [`RenderListener::on_end`].
    Ended,
}

/// Listener that turns callbacks into an `mpsc` stream.
#[derive(Debug)]
pub struct ChannelListener {
    sender: Mutex<mpsc::Sender<PlaybackEvent>>,
    capture_frames: bool,
}

impl ChannelListener {
    /// Listener plus the receiving end. With `capture_frames`, each render event carries a
    /// copy of the canvas.
    pub fn new(capture_frames: bool) -> (Self, mpsc::Receiver<PlaybackEvent>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                sender: Mutex::new(tx),
                capture_frames,
            },
            rx,
        )
    }

    fn send(&self, event: PlaybackEvent) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Receiver hung up; nothing left to tell.
        let _ = sender.send(event);
    }
}

impl RenderListener for ChannelListener {
    fn on_start(&self) {
        self.send(PlaybackEvent::Started);
    }

    fn on_render(&self, frame_index: usize, frame: &PixelBuffer) {
        self.send(PlaybackEvent::Rendered {
            index: frame_index,
            frame: self.capture_frames.then(|| frame.clone()),
        });
    }

    fn on_end(&self) {
        self.send(PlaybackEvent::Ended);
    }
}
