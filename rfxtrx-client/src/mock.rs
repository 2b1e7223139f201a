use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rfxtrx_rs_protocol::ByteFramer;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

use crate::transport::{Connector, StreamTransport, Transport};

/// A frame the engine wrote, with the (virtual) time it arrived.
#[derive(Debug)]
pub struct Written {
    pub at: Instant,
    pub bytes: Vec<u8>,
}

enum Action {
    Send(Vec<u8>),
    Hangup,
}

struct Behaviour {
    answer_status: AtomicBool,
    ack_commands: AtomicBool,
    refuse_open: AtomicBool,
    stall_open: AtomicBool,
    open_delay_ms: AtomicU64,
    writes_left: AtomicUsize,
    fail_discard: AtomicBool,
    boot_noise: std::sync::Mutex<Vec<u8>>,
    opens: AtomicUsize,
}

/// Test side of an emulated RFXtrx.
pub struct MockDevice {
    behaviour: Arc<Behaviour>,
    written: mpsc::UnboundedReceiver<Written>,
    actions: mpsc::UnboundedSender<Action>,
}

/// Engine side: opens an in-memory link to the emulated device.
pub struct MockConnector {
    behaviour: Arc<Behaviour>,
    written: mpsc::UnboundedSender<Written>,
    actions: Arc<Mutex<mpsc::UnboundedReceiver<Action>>>,
}

impl MockDevice {
    pub fn new() -> (MockConnector, MockDevice) {
        let behaviour = Arc::new(Behaviour {
            answer_status: AtomicBool::new(true),
            ack_commands: AtomicBool::new(false),
            refuse_open: AtomicBool::new(false),
            stall_open: AtomicBool::new(false),
            open_delay_ms: AtomicU64::new(0),
            writes_left: AtomicUsize::new(usize::MAX),
            fail_discard: AtomicBool::new(false),
            boot_noise: std::sync::Mutex::new(Vec::new()),
            opens: AtomicUsize::new(0),
        });
        let (written_tx, written_rx) = mpsc::unbounded_channel();
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let connector = MockConnector {
            behaviour: behaviour.clone(),
            written: written_tx,
            actions: Arc::new(Mutex::new(actions_rx)),
        };
        let device = MockDevice {
            behaviour,
            written: written_rx,
            actions: actions_tx,
        };
        (connector, device)
    }

    /// Answer get-status and set-mode with a status frame.
    pub fn answer_status(&self, on: bool) {
        self.behaviour.answer_status.store(on, Ordering::SeqCst);
    }

    /// Acknowledge every non-control command with an OK response.
    pub fn ack_commands(&self, on: bool) {
        self.behaviour.ack_commands.store(on, Ordering::SeqCst);
    }

    pub fn refuse_open(&self, on: bool) {
        self.behaviour.refuse_open.store(on, Ordering::SeqCst);
    }

    /// Never complete `open()`.
    pub fn stall_open(&self, on: bool) {
        self.behaviour.stall_open.store(on, Ordering::SeqCst);
    }

    /// Take this long to hand over the transport.
    pub fn open_delay(&self, delay: Duration) {
        self.behaviour
            .open_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Let `n` more engine writes through, then fail every write with
    /// `BrokenPipe`.
    pub fn fail_writes_after(&self, n: usize) {
        self.behaviour.writes_left.store(n, Ordering::SeqCst);
    }

    /// Fail `discard_input` on the engine side.
    pub fn fail_discard(&self, on: bool) {
        self.behaviour.fail_discard.store(on, Ordering::SeqCst);
    }

    /// Bytes the device emits as soon as a link opens.
    pub fn boot_noise(&self, bytes: &[u8]) {
        *self.behaviour.boot_noise.lock().unwrap() = bytes.to_vec();
    }

    pub fn opens(&self) -> usize {
        self.behaviour.opens.load(Ordering::SeqCst)
    }

    pub async fn next_written(&mut self) -> Written {
        self.written.recv().await.expect("mock connector dropped")
    }

    pub fn try_written(&mut self) -> Option<Written> {
        self.written.try_recv().ok()
    }

    pub fn send(&self, bytes: impl Into<Vec<u8>>) {
        self.actions.send(Action::Send(bytes.into())).unwrap();
    }

    pub fn hangup(&self) {
        self.actions.send(Action::Hangup).unwrap();
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self) -> io::Result<Box<dyn Transport>> {
        self.behaviour.opens.fetch_add(1, Ordering::SeqCst);
        if self.behaviour.stall_open.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let delay = self.behaviour.open_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.behaviour.refuse_open.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "mock device refused",
            ));
        }

        let (near, far) = tokio::io::duplex(4096);
        tokio::spawn(serve(
            far,
            self.behaviour.clone(),
            self.written.clone(),
            self.actions.clone(),
        ));
        Ok(Box::new(FaultyTransport {
            inner: StreamTransport::new(near),
            behaviour: self.behaviour.clone(),
        }))
    }
}

/// Engine end of the link, with injectable write and flush failures.
struct FaultyTransport {
    inner: StreamTransport<DuplexStream>,
    behaviour: Arc<Behaviour>,
}

#[async_trait]
impl Transport for FaultyTransport {
    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let left = self.behaviour.writes_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        }
        if left != usize::MAX {
            self.behaviour.writes_left.store(left - 1, Ordering::SeqCst);
        }
        self.inner.write(data).await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).await
    }

    async fn discard_input(&mut self) -> io::Result<()> {
        if self.behaviour.fail_discard.load(Ordering::SeqCst) {
            return Err(io::Error::other("flush rejected"));
        }
        self.inner.discard_input().await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.inner.close().await
    }
}

async fn serve(
    mut stream: DuplexStream,
    behaviour: Arc<Behaviour>,
    written: mpsc::UnboundedSender<Written>,
    actions: Arc<Mutex<mpsc::UnboundedReceiver<Action>>>,
) {
    let mut actions = actions.lock().await;

    let noise = behaviour.boot_noise.lock().unwrap().clone();
    if !noise.is_empty() && stream.write_all(&noise).await.is_err() {
        return;
    }

    let mut framer = ByteFramer::new();
    let mut buf = [0u8; 256];
    loop {
        tokio::select! {
            read = stream.read(&mut buf) => {
                let n = match read {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                for frame in framer.push(&buf[..n]) {
                    let bytes = frame.as_bytes().to_vec();
                    let reply = reply_for(&behaviour, &bytes);
                    let _ = written.send(Written { at: Instant::now(), bytes });
                    if let Some(reply) = reply {
                        if stream.write_all(&reply).await.is_err() {
                            return;
                        }
                    }
                }
            }
            action = actions.recv() => match action {
                Some(Action::Send(bytes)) => {
                    if stream.write_all(&bytes).await.is_err() {
                        break;
                    }
                }
                Some(Action::Hangup) | None => break,
            },
        }
    }
}

fn reply_for(behaviour: &Behaviour, frame: &[u8]) -> Option<Vec<u8>> {
    let seq = frame[3];
    match frame[1] {
        0x00 => {
            if !behaviour.answer_status.load(Ordering::SeqCst) {
                return None;
            }
            match frame[4] {
                0x02 => Some(status_frame(seq, 0x02, 0x53, [0x00, 0x02, 0x2D])),
                // set-mode echoes the requested receiver type and protocols
                0x03 => Some(status_frame(seq, 0x03, frame[5], [frame[7], frame[8], frame[9]])),
                _ => None,
            }
        }
        _ if behaviour.ack_commands.load(Ordering::SeqCst) => {
            Some(vec![0x04, 0x02, 0x01, seq, 0x00])
        }
        _ => None,
    }
}

/// Interface status frame: firmware 95, hardware 1.2.
pub fn status_frame(seq: u8, command: u8, receiver: u8, protocols: [u8; 3]) -> Vec<u8> {
    vec![
        0x0C, 0x01, 0x00, seq, command, receiver, 0x5F, protocols[0], protocols[1],
        protocols[2], 0x01, 0x01, 0x02,
    ]
}
