//! Audio processing graph
//!
//! Builds and maintains the source → transform → sink chain for one
//! captured stream, owns the DSP execution context, and carries live
//! parameter updates into the running transform without rebuilding
//! anything.

use crate::audio::params::{ParamMessage, ParameterSender, parameter_channel};
use crate::audio::runtime::AudioRuntime;
use crate::config::AudioEffectsConfig;
use crate::error::{Error, Result};
use crate::media::{MediaKind, MediaStream, MediaTrack, StreamId};
use log::{debug, info};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

struct AudioChain {
    source_id: StreamId,
    output: MediaStream,
    params: ParameterSender,
    pump: CancellationToken,
}

/// Builds and maintains the audio processing chain for one captured stream.
pub struct AudioGraph {
    config: AudioEffectsConfig,
    runtime: Option<AudioRuntime>,
    chain: Option<AudioChain>,
    level: f32,
}

impl AudioGraph {
    /// Create the graph and bring up its execution context, loading the DSP
    /// module from its fixed logical path.
    ///
    /// A module-load failure surfaces as [`Error::Initialization`] and
    /// commits nothing; the call may be retried.
    pub async fn initialize(config: AudioEffectsConfig) -> Result<Self> {
        let level = config.default_suppression_level.clamp(0.0, 1.0);
        let runtime = AudioRuntime::start(&config.worklet_module, level)?;
        Ok(Self {
            config,
            runtime: Some(runtime),
            chain: None,
            level,
        })
    }

    /// Current suppression level
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Process a captured stream, returning a stream whose audio track is
    /// the transform's sink.
    ///
    /// Calling again with the same source stream while the sink is live
    /// returns the existing output without rebuilding the chain. Otherwise
    /// any prior wiring is severed (the execution context stays up, and is
    /// transparently recreated if it was closed) and a fresh
    /// source → transform → sink chain is built, the transform
    /// parameterized with the current suppression level.
    pub async fn process(&mut self, stream: &MediaStream) -> Result<MediaStream> {
        if let Some(chain) = &self.chain {
            if chain.source_id == stream.id()
                && chain.output.audio_track().is_some_and(|t| t.is_live())
            {
                return Ok(chain.output.clone());
            }
        }

        let source = stream
            .audio_track()
            .ok_or(Error::MissingTrack(MediaKind::Audio))?
            .clone();

        if self.runtime.is_none() {
            self.runtime = Some(AudioRuntime::start(&self.config.worklet_module, self.level)?);
        }
        self.teardown_chain();
        let runtime = self.runtime.as_ref().expect("runtime present after ensure");

        let sink = MediaTrack::audio(format!("processed:{}", source.label()));
        let output = MediaStream::new(vec![sink.clone()]);

        let transform = runtime.module().instantiate(self.level);
        let (param_tx, param_rx) = parameter_channel();
        let block_tx = runtime.connect(transform, param_rx, sink.clone());

        // Bridge source blocks into the worker queue. The bridge ends with
        // the source track or when the chain is severed, and the sink track
        // ends with it.
        let pump = CancellationToken::new();
        let mut rx = source.subscribe_audio().expect("source is an audio track");
        let pump_guard = pump.clone();
        let pump_sink = sink;
        let pump_source = source;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = pump_guard.cancelled() => break,
                    _ = pump_source.ended() => break,
                    block = rx.recv() => match block {
                        // A full queue means the worker is behind; dropping
                        // the block keeps the capture path real-time.
                        Ok(block) => {
                            let _ = block_tx.try_send(block);
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!("audio bridge lagged, skipped {skipped} blocks");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            pump_sink.stop();
        });

        info!("audio chain wired for {}", stream.id());
        self.chain = Some(AudioChain {
            source_id: stream.id(),
            output: output.clone(),
            params: param_tx,
            pump,
        });
        Ok(output)
    }

    /// Clamp the suppression level to [0, 1], store it, and propagate it to
    /// a running transform over both live channels: an asynchronous message
    /// and a direct parameter write. Fire-and-forget; audio flow is never
    /// interrupted and the chain is never rebuilt.
    pub fn set_level(&mut self, level: f32) {
        self.level = level.clamp(0.0, 1.0);
        if let Some(chain) = &self.chain {
            chain.params.send(ParamMessage::UpdateSuppressionLevel { level: self.level });
        }
        if let Some(runtime) = &self.runtime {
            runtime.live_level().set(self.level);
        }
    }

    /// Disconnect the source and transform nodes. The execution context
    /// stays open for reuse.
    pub fn cleanup(&mut self) {
        self.teardown_chain();
    }

    /// Sever the chain and fully release the execution context. A later
    /// `process` call recreates the context transparently.
    pub fn close(&mut self) {
        self.teardown_chain();
        if self.runtime.take().is_some() {
            info!("audio execution context closed");
        }
    }

    fn teardown_chain(&mut self) {
        if let Some(chain) = self.chain.take() {
            chain.pump.cancel();
            if let Some(runtime) = &self.runtime {
                runtime.disconnect();
            }
            debug!("audio chain severed for {}", chain.source_id);
        }
    }
}

impl std::fmt::Debug for AudioGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioGraph")
            .field("level", &self.level)
            .field("has_runtime", &self.runtime.is_some())
            .field("has_chain", &self.chain.is_some())
            .finish()
    }
}
