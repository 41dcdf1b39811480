use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::render::media::{AudioPcm, EncodeParams, MediaBackend, MediaError, MIX_SAMPLE_RATE};
use crate::render::timeline::Timeline;

/// [`MediaBackend`] driving the system `ffmpeg` binary.
///
/// Frames are streamed to stdin as raw RGB24; mixed audio goes through an
/// `f32le` file in the scratch directory.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    program: PathBuf,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Whether the configured binary runs at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-hide_banner", "-loglevel", "error"]);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> MediaError {
        MediaError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl MediaBackend for FfmpegBackend {
    fn decode_audio(&self, path: &Path) -> Result<AudioPcm, MediaError> {
        let out = self
            .command()
            .arg("-i")
            .arg(path)
            .args([
                "-vn",
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "-ac",
                "2",
                "-ar",
                &MIX_SAMPLE_RATE.to_string(),
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !out.status.success() {
            return Err(MediaError::Ffmpeg {
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }

        let interleaved = out
            .stdout
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(AudioPcm {
            sample_rate: MIX_SAMPLE_RATE,
            channels: 2,
            interleaved,
        })
    }

    fn encode(
        &self,
        timeline: &Timeline,
        params: &EncodeParams,
        output: &Path,
        scratch: &Path,
        on_progress: &mut dyn FnMut(f64),
    ) -> Result<(), MediaError> {
        validate_params(params)?;
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let audio_path = match timeline.audio() {
            Some(audio) => {
                let path = scratch.join("mix.f32le");
                write_f32le(&path, &audio.interleaved)?;
                Some((path, audio.sample_rate, audio.channels))
            }
            None => None,
        };

        let mut cmd = self.command();
        cmd.arg("-y")
            .args([
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
                &format!("{}x{}", params.width, params.height),
                "-r",
                &params.fps.to_string(),
                "-i",
                "pipe:0",
            ]);
        if let Some((path, sample_rate, channels)) = &audio_path {
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &sample_rate.to_string(),
                "-ac",
                &channels.to_string(),
                "-i",
            ])
            .arg(path)
            .args(["-c:a", params.audio_codec, "-b:a", &params.audio_bitrate]);
        } else {
            cmd.arg("-an");
        }
        cmd.args([
            "-c:v",
            params.video_codec,
            "-preset",
            &params.preset,
            "-b:v",
            &params.bitrate,
            "-pix_fmt",
            "yuv420p",
            "-r",
            &params.fps.to_string(),
            "-movflags",
            "+faststart",
            "-f",
            "mp4",
        ])
        .arg(output)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

        tracing::debug!(output = %output.display(), ?params, "Spawning ffmpeg encoder");
        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::InvalidParams("ffmpeg stdin unavailable".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::InvalidParams("ffmpeg stderr unavailable".into()))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf);
            buf
        });

        let total = timeline.total_frames().max(1);
        let written = timeline.for_each_frame(|idx, frame| {
            stdin.write_all(frame)?;
            if idx % u64::from(params.fps.max(1)) == 0 {
                on_progress(idx as f64 / total as f64);
            }
            Ok::<_, std::io::Error>(())
        });
        drop(stdin);

        let status = child.wait()?;
        let stderr = stderr_drain.join().unwrap_or_default();
        if !status.success() {
            return Err(MediaError::Ffmpeg {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        written?;
        on_progress(1.0);
        Ok(())
    }
}

/// yuv420p output needs even, non-zero dimensions.
fn validate_params(params: &EncodeParams) -> Result<(), MediaError> {
    if params.width == 0 || params.height == 0 || params.fps == 0 {
        return Err(MediaError::InvalidParams(
            "width, height and fps must be non-zero".into(),
        ));
    }
    if params.width % 2 != 0 || params.height % 2 != 0 {
        return Err(MediaError::InvalidParams(format!(
            "{}x{} is not even (required for yuv420p)",
            params.width, params.height
        )));
    }
    Ok(())
}

fn write_f32le(path: &Path, samples: &[f32]) -> std::io::Result<()> {
    let mut bytes = Vec::with_capacity(samples.len() * 4);
    for &sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(path, bytes)
}
