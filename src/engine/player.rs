//! Real-time audio playback using cpal

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, Stream, StreamConfig, SupportedBufferSize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::audio::{AudioContext, AudioGraph};
use crate::error::{EngineError, Result};

/// Real-time audio player
pub struct Player {
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl Player {
    pub fn new() -> Self {
        Self {
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start rendering `ctx` to the default output device.
    ///
    /// The graph is switched to the device's sample rate before the stream
    /// opens. `buffer_size` is in frames and is clamped to the device's range.
    pub fn start(&mut self, ctx: &AudioContext, buffer_size: u32) -> Result<()> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| EngineError::BackendUnavailable("no output device available".to_string()))?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let config = device
            .default_output_config()
            .map_err(|e| EngineError::BackendUnavailable(e.to_string()))?;
        let sample_format = config.sample_format();
        let buffer = stream_buffer_size(buffer_size, config.buffer_size());
        let mut stream_config: StreamConfig = config.into();
        stream_config.buffer_size = buffer;

        ctx.set_sample_rate(stream_config.sample_rate.0 as f64);
        info!(
            device = %name,
            sample_rate = stream_config.sample_rate.0,
            channels = stream_config.channels,
            buffer = ?stream_config.buffer_size,
            "opening output stream"
        );

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let graph = ctx.graph();

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, graph, running)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, graph, running)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, graph, running)?,
            other => return Err(EngineError::UnsupportedSampleFormat(format!("{other:?}"))),
        };

        stream
            .play()
            .map_err(|e| EngineError::BackendUnavailable(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stream = None;
    }

    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed buffer of `requested` frames within the device's supported range.
/// Devices that do not report a range keep their own default.
pub fn stream_buffer_size(requested: u32, supported: &SupportedBufferSize) -> BufferSize {
    match supported {
        SupportedBufferSize::Range { min, max } => {
            BufferSize::Fixed(requested.max(*min).min(*max))
        }
        SupportedBufferSize::Unknown => BufferSize::Default,
    }
}

fn build_stream<T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>>(
    device: &Device,
    config: &StreamConfig,
    graph: Arc<Mutex<AudioGraph>>,
    running: Arc<AtomicBool>,
) -> Result<Stream> {
    let channels = config.channels as usize;

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let graph = if running.load(Ordering::SeqCst) {
                    graph.try_lock().ok()
                } else {
                    None
                };

                // Stopped, or the graph is busy with a control change
                let Some(mut graph) = graph else {
                    data.fill(T::EQUILIBRIUM);
                    return;
                };

                for frame in data.chunks_mut(channels) {
                    frame.fill(T::from_sample(graph.next_sample() as f32));
                }
            },
            |err| {
                warn!(error = %err, "audio stream error");
            },
            None,
        )
        .map_err(|e| EngineError::BackendUnavailable(e.to_string()))?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_is_idle() {
        let player = Player::new();
        assert!(!player.is_playing());
    }

    #[test]
    fn test_stop_without_start() {
        let mut player = Player::default();
        player.stop();
        assert!(!player.is_playing());
    }

    #[test]
    fn test_buffer_size_within_device_range() {
        let range = SupportedBufferSize::Range { min: 64, max: 4096 };
        assert_eq!(stream_buffer_size(512, &range), BufferSize::Fixed(512));
        assert_eq!(stream_buffer_size(32, &range), BufferSize::Fixed(64));
        assert_eq!(stream_buffer_size(8192, &range), BufferSize::Fixed(4096));
    }

    #[test]
    fn test_buffer_size_unknown_range() {
        assert_eq!(
            stream_buffer_size(512, &SupportedBufferSize::Unknown),
            BufferSize::Default
        );
    }
}
