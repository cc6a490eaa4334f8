//! Engine Module
//!
//! Runs one board connection on two threads.
//!
//! ## Concurrency Model: Single Owner Loop
//!
//! ```text
//!   transport ──► firmata-reader ──frames──┐
//!                                          ▼
//!   callers ─────────jobs────────────► firmata-loop ──► Session
//!      ▲                                   │         (board, writer, hooks)
//!      └──────────────reply────────────────┘
//! ```
//!
//! - **firmata-reader**: decodes frames and forwards each one (or the error
//!   that ended the stream) over a bounded queue
//! - **firmata-loop**: sole owner of the `Session`; selects over frames, caller
//!   jobs and the close signal, running each item to completion
//! - **callers**: submit a closure and block on its reply
//!
//! The session needs no locks. Callers never see a partially applied frame
//! because frames and jobs never interleave inside the loop.
//!
//! ## Closing
//! The first of explicit close, fatal frame error or transport error records
//! the close reason, closes the transport and disconnects the close signal.
//! Every pending and future call then fails with `FirmataError::Closed`.

mod hooks;
mod session;

use std::io::{BufReader, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam::channel::{self, select, Receiver, Sender};
use parking_lot::Mutex;

use crate::board::{BoardSnapshot, Pin, PinMode, PinName, Stage};
use crate::config::Config;
use crate::error::{FirmataError, Result};
use crate::protocol::{Frame, FrameReader};
use crate::transport::{Close, Transport};

pub use hooks::{BytesHook, ConnectedHook, DigitalHook, Hooks, I2cHook, PinHook};
pub use session::Session;

type Job = Box<dyn FnOnce(&mut Session) + Send>;

// =============================================================================
// Shared Close State
// =============================================================================

struct CloseState {
    reason: Option<Arc<FirmataError>>,

    /// Dropped on close; never sends
    done_tx: Option<Sender<()>>,
}

/// Close bookkeeping shared by the handle and the loop
struct Shared {
    state: Mutex<CloseState>,
    closer: Box<dyn Close>,
    done: Receiver<()>,
}

impl Shared {
    /// Record the reason and close the transport; only the first call acts
    fn shutdown(&self, reason: FirmataError) {
        let mut state = self.state.lock();
        let Some(done_tx) = state.done_tx.take() else {
            return;
        };
        match reason {
            FirmataError::Closed => tracing::info!("Connection closed"),
            ref fatal => tracing::error!("Connection closed: {}", fatal),
        }
        state.reason = Some(Arc::new(reason));
        drop(done_tx);
        drop(state);

        if let Err(e) = self.closer.close() {
            tracing::warn!("Error closing transport: {}", e);
        }
    }

    fn is_closed(&self) -> bool {
        self.state.lock().done_tx.is_none()
    }
}

/// Closes the connection if the loop unwinds out of a hook
struct ShutdownOnExit(Arc<Shared>);

impl Drop for ShutdownOnExit {
    fn drop(&mut self) {
        self.0
            .shutdown(FirmataError::Protocol("engine loop terminated".to_string()));
    }
}

// =============================================================================
// Threads
// =============================================================================

fn read_frames<R: Read>(mut reader: FrameReader<R>, frames: Sender<Result<Frame>>) {
    loop {
        let result = reader.read_frame();
        let failed = match &result {
            Ok(frame) => {
                tracing::trace!("Received frame: {:?}", frame);
                false
            }
            Err(FirmataError::Io(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::UnexpectedEof
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::ConnectionAborted
                ) =>
            {
                tracing::debug!("Transport disconnected: {}", e);
                true
            }
            Err(e) => {
                tracing::warn!("Error reading frame: {}", e);
                true
            }
        };
        // Loop gone, or the stream cannot be resynchronized
        if frames.send(result).is_err() || failed {
            break;
        }
    }
}

fn run_loop(
    mut session: Session,
    jobs: Receiver<Job>,
    frames: Receiver<Result<Frame>>,
    shared: Arc<Shared>,
) {
    let guard = ShutdownOnExit(Arc::clone(&shared));
    tracing::debug!("Engine loop started");

    let reason = loop {
        select! {
            recv(jobs) -> job => match job {
                Ok(job) => job(&mut session),
                Err(_) => break FirmataError::Closed,
            },
            recv(frames) -> frame => {
                let result = match frame {
                    Ok(frame) => frame.and_then(|f| session.process_frame(f)),
                    Err(_) => Err(FirmataError::Closed),
                };
                if let Err(e) = result {
                    break e;
                }
            },
            recv(shared.done) -> _ => break FirmataError::Closed,
        }
    };

    shared.shutdown(reason);
    drop(guard);
    tracing::debug!("Engine loop stopped");
}

// =============================================================================
// Firmata Handle
// =============================================================================

struct Inner {
    jobs: Sender<Job>,
    shared: Arc<Shared>,
    loop_thread: Mutex<Option<JoinHandle<()>>>,
    loop_thread_id: ThreadId,
}

impl Inner {
    fn join_loop(&self) {
        if thread::current().id() == self.loop_thread_id {
            return;
        }
        if let Some(handle) = self.loop_thread.lock().take() {
            if handle.join().is_err() {
                tracing::error!("Engine loop panicked");
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shared.shutdown(FirmataError::Closed);
        self.join_loop();
    }
}

/// Handle to a connected board
///
/// Cheap to clone; every clone talks to the same loop. The connection closes
/// on `close`, on a fatal error, or when the last handle is dropped.
#[derive(Clone)]
pub struct Firmata {
    inner: Arc<Inner>,
}

impl Firmata {
    /// Start the engine on `transport` and run the handshake
    ///
    /// Returns once the board reported its pin names, or fails with
    /// `HandshakeTimeout` after `config.handshake_timeout`.
    pub fn connect<T: Transport>(transport: T, config: Config, hooks: Hooks) -> Result<Self> {
        let (reader, writer, closer) = transport.split()?;

        let (done_tx, done_rx) = channel::bounded::<()>(0);
        let (jobs_tx, jobs_rx) = channel::bounded::<Job>(config.command_queue_capacity);
        let (frames_tx, frames_rx) = channel::bounded(config.frame_queue_capacity);
        let (connected_tx, connected_rx) = channel::bounded::<()>(1);

        let shared = Arc::new(Shared {
            state: Mutex::new(CloseState {
                reason: None,
                done_tx: Some(done_tx),
            }),
            closer: Box::new(closer),
            done: done_rx,
        });
        let session = Session::new(writer, hooks).with_connected_signal(connected_tx);

        thread::Builder::new()
            .name("firmata-reader".to_string())
            .spawn(move || read_frames(FrameReader::new(BufReader::new(reader)), frames_tx))?;

        let loop_shared = Arc::clone(&shared);
        let loop_thread = match thread::Builder::new()
            .name("firmata-loop".to_string())
            .spawn(move || run_loop(session, jobs_rx, frames_rx, loop_shared))
        {
            Ok(handle) => handle,
            Err(e) => {
                shared.shutdown(FirmataError::Protocol("engine loop failed to start".to_string()));
                return Err(e.into());
            }
        };

        let firmata = Firmata {
            inner: Arc::new(Inner {
                jobs: jobs_tx,
                shared,
                loop_thread_id: loop_thread.thread().id(),
                loop_thread: Mutex::new(Some(loop_thread)),
            }),
        };

        if let Err(e) = firmata.handshake(&config, &connected_rx) {
            firmata
                .inner
                .shared
                .shutdown(FirmataError::Protocol(format!("handshake failed: {}", e)));
            return Err(e);
        }
        Ok(firmata)
    }

    fn handshake(&self, config: &Config, connected: &Receiver<()>) -> Result<()> {
        let interval = config.sampling_interval_ms;
        self.call(move |session| {
            session.set_sampling_interval(interval)?;
            session.request_next()
        })?;

        let timeout = config.handshake_timeout;
        select! {
            recv(connected) -> signal => signal.map_err(|_| FirmataError::Closed),
            recv(self.inner.shared.done) -> _ => Err(FirmataError::Closed),
            recv(channel::after(timeout)) -> _ => {
                self.inner.shared.shutdown(FirmataError::HandshakeTimeout(timeout));
                Err(FirmataError::HandshakeTimeout(timeout))
            }
        }
    }

    /// Run `f` inside the engine loop and return its result
    ///
    /// Blocks until the loop has run the closure. Must not be called from a
    /// hook.
    pub fn call<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        if thread::current().id() == self.inner.loop_thread_id {
            return Err(FirmataError::Protocol(
                "engine call from inside a hook".to_string(),
            ));
        }

        let (reply_tx, reply_rx) = channel::bounded(1);
        let job: Job = Box::new(move |session| {
            let _ = reply_tx.send(f(session));
        });

        let done = &self.inner.shared.done;
        select! {
            send(self.inner.jobs, job) -> sent => sent.map_err(|_| FirmataError::Closed)?,
            recv(done) -> _ => return Err(FirmataError::Closed),
        }
        select! {
            recv(reply_rx) -> reply => reply.map_err(|_| FirmataError::Closed)?,
            // The job may have finished right before the close
            recv(done) -> _ => reply_rx.try_recv().unwrap_or(Err(FirmataError::Closed)),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close the connection; later calls are no-ops
    pub fn close(&self) {
        self.inner.shared.shutdown(FirmataError::Closed);
        self.inner.join_loop();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shared.is_closed()
    }

    /// Why the connection closed, `None` while open
    pub fn closed_reason(&self) -> Option<Arc<FirmataError>> {
        self.inner.shared.state.lock().reason.clone()
    }

    /// A receiver that disconnects when the connection closes
    pub fn close_notify(&self) -> Receiver<()> {
        self.inner.shared.done.clone()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub fn reset(&self) -> Result<()> {
        self.call(|s| s.reset())
    }

    pub fn set_sampling_interval(&self, ms: u32) -> Result<()> {
        self.call(move |s| s.set_sampling_interval(ms))
    }

    pub fn set_pin_mode(&self, pin: u8, mode: PinMode) -> Result<()> {
        self.call(move |s| s.set_pin_mode(pin, mode))
    }

    pub fn set_digital_pin_value(&self, pin: u8, value: u8) -> Result<()> {
        self.call(move |s| s.set_digital_pin_value(pin, value))
    }

    pub fn set_digital_pin_high(&self, pin: u8) -> Result<()> {
        self.call(move |s| s.set_digital_pin_high(pin))
    }

    pub fn set_digital_pin_low(&self, pin: u8) -> Result<()> {
        self.call(move |s| s.set_digital_pin_low(pin))
    }

    pub fn set_pin_value(&self, pin: u8, value: u32) -> Result<()> {
        self.call(move |s| s.set_pin_value(pin, value))
    }

    /// Returns the mask of pins whose model changed
    pub fn digital_write(&self, port: u8, values: u8) -> Result<u8> {
        self.call(move |s| s.digital_write(port, values))
    }

    pub fn analog_write(&self, pin: u8, value: u32) -> Result<()> {
        self.call(move |s| s.analog_write(pin, value))
    }

    pub fn servo_config(&self, pin: u8, min_pulse: u32, max_pulse: u32) -> Result<()> {
        self.call(move |s| s.servo_config(pin, min_pulse, max_pulse))
    }

    pub fn pin_state_query(&self, pin: u8) -> Result<()> {
        self.call(move |s| s.pin_state_query(pin))
    }

    pub fn pin_state(&self, pin: u8) -> Result<u32> {
        self.call(move |s| s.pin_state(pin))
    }

    pub fn report_analog(&self, analog_pin: u8, enable: bool) -> Result<()> {
        self.call(move |s| s.report_analog(analog_pin, enable))
    }

    pub fn report_digital(&self, port: u8, enable: bool) -> Result<()> {
        self.call(move |s| s.report_digital(port, enable))
    }

    pub fn i2c_config(&self, delay_us: u32) -> Result<()> {
        self.call(move |s| s.i2c_config(delay_us))
    }

    pub fn i2c_write(&self, address: u16, data: &[u8]) -> Result<()> {
        let data = data.to_vec();
        self.call(move |s| s.i2c_write(address, &data))
    }

    pub fn i2c_read(
        &self,
        address: u16,
        auto_restart: bool,
        continuous: bool,
        count: u16,
    ) -> Result<()> {
        self.call(move |s| s.i2c_read(address, auto_restart, continuous, count))
    }

    pub fn i2c_stop_reading(&self, address: u16) -> Result<()> {
        self.call(move |s| s.i2c_stop_reading(address))
    }

    pub fn string_write(&self, data: &[u8]) -> Result<()> {
        let data = data.to_vec();
        self.call(move |s| s.string_write(&data))
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub fn stage(&self) -> Result<Stage> {
        self.call(|s| Ok(s.stage()))
    }

    pub fn snapshot(&self) -> Result<BoardSnapshot> {
        self.call(|s| Ok(s.board().snapshot()))
    }

    pub fn snapshot_pin(&self, pin: u8) -> Result<Option<Pin>> {
        self.call(move |s| Ok(s.board().pin(pin).cloned()))
    }

    pub fn snapshot_analog_pin(&self, analog_pin: u8) -> Result<Option<Pin>> {
        self.call(move |s| Ok(s.board().analog_pin(analog_pin).cloned()))
    }

    pub fn snapshot_pins(&self) -> Result<Vec<Pin>> {
        self.call(|s| Ok(s.board().pins().to_vec()))
    }

    pub fn snapshot_analog_pins(&self) -> Result<Vec<Pin>> {
        self.call(|s| Ok(s.board().analog_pins().cloned().collect()))
    }

    pub fn snapshot_pin_by_name(&self, name: PinName) -> Result<Option<Pin>> {
        self.call(move |s| Ok(s.board().pin_by_name(name).cloned()))
    }
}

impl std::fmt::Debug for Firmata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Firmata")
            .field("closed", &self.is_closed())
            .finish()
    }
}
