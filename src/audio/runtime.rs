//! The real-time audio execution context
//!
//! A dedicated worker thread hosts the DSP transform independently of the
//! control thread's scheduling. Source blocks reach the worker over a
//! bounded sync channel; processed blocks go straight to the sink track.
//! The worker re-reads both live-parameter channels before every block.

use crate::audio::params::{LiveParam, ParamMessage, ParameterReceiver};
use crate::audio::worklet::{self, AudioTransform, SUPPRESSION_LEVEL_PARAM, WorkletModule};
use crate::error::{Error, Result};
use crate::media::{AudioBlock, MediaTrack};
use log::debug;
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Block queue depth between the bridge and the worker
const BLOCK_QUEUE_DEPTH: usize = 64;

/// How long the worker waits for a block before re-checking control
/// messages
const IDLE_POLL: Duration = Duration::from_millis(5);

enum Control {
    Connect(Connection),
    Disconnect,
    Shutdown,
}

struct Connection {
    blocks: mpsc::Receiver<AudioBlock>,
    params: ParameterReceiver,
    transform: Box<dyn AudioTransform>,
    sink: MediaTrack,
    scratch: Vec<f32>,
}

/// The audio execution context: worker thread plus the DSP module loaded
/// into it.
///
/// Created at most once per graph lifetime and reused across chain rebuilds;
/// parameter changes never recreate it. Dropping the runtime shuts the
/// worker down and joins it.
pub struct AudioRuntime {
    control: mpsc::Sender<Control>,
    live_level: LiveParam,
    module: WorkletModule,
    worker: Option<JoinHandle<()>>,
}

impl AudioRuntime {
    /// Start the execution context, loading the DSP module from its logical
    /// path exactly once.
    pub fn start(module_path: &str, level: f32) -> Result<Self> {
        let module = worklet::load(module_path)?;
        let live_level = LiveParam::new(level);

        let (control_tx, control_rx) = mpsc::channel();
        let worker_level = live_level.clone();
        let worker = thread::Builder::new()
            .name("streamfx-dsp".into())
            .spawn(move || worker_loop(control_rx, worker_level))
            .map_err(|e| Error::Initialization(format!("failed to spawn DSP worker: {e}")))?;

        debug!("audio runtime started with module {}", module.path());
        Ok(Self {
            control: control_tx,
            live_level,
            module,
            worker: Some(worker),
        })
    }

    /// The directly writable suppression-level parameter
    pub fn live_level(&self) -> &LiveParam {
        &self.live_level
    }

    /// The module loaded into this context
    pub fn module(&self) -> &WorkletModule {
        &self.module
    }

    /// Wire a new source → transform → sink connection, replacing any prior
    /// one. Returns the sender the bridge feeds source blocks into.
    pub fn connect(
        &self,
        transform: Box<dyn AudioTransform>,
        params: ParameterReceiver,
        sink: MediaTrack,
    ) -> SyncSender<AudioBlock> {
        let (block_tx, block_rx) = mpsc::sync_channel(BLOCK_QUEUE_DEPTH);
        let _ = self.control.send(Control::Connect(Connection {
            blocks: block_rx,
            params,
            transform,
            sink,
            scratch: Vec::new(),
        }));
        block_tx
    }

    /// Sever the current connection without tearing the context down
    pub fn disconnect(&self) {
        let _ = self.control.send(Control::Disconnect);
    }
}

impl std::fmt::Debug for AudioRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioRuntime")
            .field("module", &self.module.path())
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl Drop for AudioRuntime {
    fn drop(&mut self) {
        let _ = self.control.send(Control::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(control: mpsc::Receiver<Control>, live_level: LiveParam) {
    let mut connection: Option<Connection> = None;

    loop {
        // With no connection the worker parks on the control channel.
        let command = if connection.is_none() {
            match control.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        } else {
            match control.try_recv() {
                Ok(command) => Some(command),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        };

        match command {
            Some(Control::Connect(next)) => {
                debug!("DSP worker wired to {}", next.transform.name());
                connection = Some(next);
                continue;
            }
            Some(Control::Disconnect) => {
                connection = None;
                continue;
            }
            Some(Control::Shutdown) => break,
            None => {}
        }

        let Some(conn) = connection.as_mut() else { continue };
        match conn.blocks.recv_timeout(IDLE_POLL) {
            Ok(block) => {
                // Message channel first, direct write second; both carry the
                // same final value.
                for message in conn.params.drain() {
                    let ParamMessage::UpdateSuppressionLevel { level } = message;
                    conn.transform.set_parameter(SUPPRESSION_LEVEL_PARAM, level);
                }
                conn.transform.set_parameter(SUPPRESSION_LEVEL_PARAM, live_level.get());

                conn.scratch.clear();
                conn.scratch.extend_from_slice(&block.samples);
                conn.transform.process(&mut conn.scratch, block.sample_rate);

                let processed = AudioBlock::new(
                    conn.scratch.clone(),
                    block.channels,
                    block.sample_rate,
                    block.pts,
                );
                conn.sink.push_audio(processed);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                connection = None;
            }
        }
    }

    debug!("DSP worker exited");
}
