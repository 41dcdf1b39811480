use crate::render::media::AudioPcm;
use crate::render::slide::Slide;

/// Ordered slides plus an optional soundtrack, ready to encode.
#[derive(Debug)]
pub struct Timeline {
    slides: Vec<Slide>,
    fps: u32,
    audio: Option<AudioPcm>,
}

impl Timeline {
    /// Concatenate `slides` in the given order.
    pub fn assemble(slides: Vec<Slide>, fps: u32) -> Self {
        Self {
            slides,
            fps,
            audio: None,
        }
    }

    pub fn audio(&self) -> Option<&AudioPcm> {
        self.audio.as_ref()
    }

    /// Sum of slide durations in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.slides.iter().map(Slide::duration).sum()
    }

    /// Frames needed to cover `duration_secs` at the timeline frame rate.
    pub fn total_frames(&self) -> u64 {
        if self.slides.is_empty() {
            return 0;
        }
        ((self.duration_secs() * f64::from(self.fps.max(1))).round() as u64).max(1)
    }

    /// Attach `track` looped or trimmed to exactly the timeline duration.
    pub fn mix_audio(&mut self, track: AudioPcm) {
        let fitted = fit_to_duration(&track, self.duration_secs());
        tracing::debug!(
            source_secs = track.duration_secs(),
            loops = loop_count(track.duration_secs(), self.duration_secs()),
            mixed_secs = fitted.duration_secs(),
            "Mixed background audio"
        );
        self.audio = Some(fitted);
    }

    /// Call `f` with each frame as packed RGB24, in playback order.
    ///
    /// Frame `g` shows time `g / fps` of the concatenated slides, so the
    /// frame count tracks the summed durations rather than per-slide
    /// rounding.
    pub fn for_each_frame<E>(
        &self,
        mut f: impl FnMut(u64, &[u8]) -> Result<(), E>,
    ) -> Result<(), E> {
        let fps = f64::from(self.fps.max(1));
        let mut buf = Vec::new();
        let mut current = 0usize;
        let mut start = 0.0;

        for global in 0..self.total_frames() {
            let t = global as f64 / fps;
            while current + 1 < self.slides.len()
                && t + BOUNDARY_EPSILON >= start + self.slides[current].duration()
            {
                start += self.slides[current].duration();
                current += 1;
            }
            let slide = &self.slides[current];
            slide.write_frame((t - start).max(0.0), &mut buf);
            f(global, &buf)?;
        }
        Ok(())
    }
}

// Absorbs float drift in the summed slide boundaries.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Number of whole-track repeats concatenated before trimming; 1 means the
/// track is already long enough.
pub fn loop_count(track_secs: f64, target_secs: f64) -> usize {
    if track_secs <= 0.0 || track_secs >= target_secs {
        1
    } else {
        (target_secs / track_secs).ceil() as usize
    }
}

/// Repeat `track` as needed and cut it to exactly `target_secs`.
pub fn fit_to_duration(track: &AudioPcm, target_secs: f64) -> AudioPcm {
    let channels = usize::from(track.channels.max(1));
    let target_frames = (target_secs * f64::from(track.sample_rate)).round() as usize;
    let target_len = target_frames * channels;

    let mut interleaved = Vec::with_capacity(target_len);
    if !track.interleaved.is_empty() {
        for _ in 0..loop_count(track.duration_secs(), target_secs) {
            interleaved.extend_from_slice(&track.interleaved);
        }
    }
    // Silence if the source was empty.
    interleaved.resize(target_len, 0.0);

    AudioPcm {
        sample_rate: track.sample_rate,
        channels: track.channels,
        interleaved,
    }
}
