/// Position in the frame list plus the loop-count policy.
///
/// `index` is `None` before the first step of a playthrough.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopCursor {
    index: Option<usize>,
    play_count: u32,
    finished: bool,
}

impl LoopCursor {
    /// Cursor positioned before the first frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the last frame stepped to.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Completed wrap-arounds.
    pub fn play_count(&self) -> u32 {
        self.play_count
    }

    /// Playback ran out of permitted steps since the last [`LoopCursor::reset`].
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether another frame may be shown. `num_plays == 0` loops forever.
    ///
    /// Marks the cursor finished when the answer is no.
    pub fn can_step(&mut self, num_plays: u32, frame_count: usize) -> bool {
        if frame_count == 0 {
            return false;
        }
        if num_plays == 0 {
            return true;
        }
        let last = frame_count - 1;
        if self.play_count < num_plays - 1 {
            return true;
        }
        if self.play_count == num_plays - 1 && self.index.is_none_or(|i| i < last) {
            return true;
        }
        self.finished = true;
        false
    }

    /// Advance to the next frame, wrapping to 0 and counting a play at the end of the list.
    pub fn step(&mut self, frame_count: usize) -> usize {
        let next = self.index.map_or(0, |i| i + 1);
        let next = if next >= frame_count {
            self.play_count += 1;
            0
        } else {
            next
        };
        self.index = Some(next);
        next
    }

    /// Back to before the first frame; the finished flag survives.
    pub fn rewind(&mut self) {
        self.index = None;
        self.play_count = 0;
    }

    /// Rewind and clear the finished flag.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/cursor.rs"]
mod tests;
