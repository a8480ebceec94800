//! Render collaborator. A pure reader of [`RenderFrame`]s.

use biotope_data::RenderFrame;

pub trait RenderSink: Send {
    /// Draws one frame. `fresh` is false when the frame is a repeat of the last one.
    fn render(&mut self, frame: &RenderFrame, fresh: bool);
}

/// Headless sink that logs a short summary of each frame.
#[derive(Debug, Default)]
pub struct TracingRenderSink {
    frames: u64,
    repeats: u64,
}

impl TracingRenderSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn repeats(&self) -> u64 {
        self.repeats
    }
}

impl RenderSink for TracingRenderSink {
    fn render(&mut self, frame: &RenderFrame, fresh: bool) {
        self.frames += 1;
        if !fresh {
            self.repeats += 1;
        }
        tracing::debug!(
            tick = frame.tick,
            agents = frame.count(),
            fresh,
            "Frame rendered"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_repeats() {
        let mut sink = TracingRenderSink::new();
        let frame = RenderFrame::default();
        sink.render(&frame, true);
        sink.render(&frame, false);
        sink.render(&frame, false);
        assert_eq!(sink.frames(), 3);
        assert_eq!(sink.repeats(), 2);
    }
}
