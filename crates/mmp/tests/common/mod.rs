//! Simulated ATmega328P on the far end of a `MemoryTransport` pair.
//!
//! Starts in its bootloader. `R` starts the application, which answers the
//! ping (0), version (1) and sample (2) commands and drops back into the
//! bootloader on a reboot request.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use mmp::boot::ERASED;
use mmp::frame::{encode_frame, Frame, Framer, FramerEvent, BOOT, COMMAND};
use mmp::link::{Link, LinkConfig, LogSink};
use mmp::transport::{MemoryTransport, Transport};

pub const SIGNATURE: [u8; 3] = [0x1E, 0x95, 0x0F];
pub const BOOT_PAGE: u8 = 16;
pub const PAGE_SIZE: usize = 128;
pub const FLASH_SIZE: usize = 32_768;
pub const EEPROM_SIZE: usize = 1024;
pub const BOOT_VERSION: &str = "app1.0 lib2.0";
pub const FIRMWARE_VERSION: &str = "c1b1-3-g26e2f24 2.2-1-g14e1c77";

pub const SAMPLE_COMMAND: u8 = 2;
pub const SAMPLE_EVENT: &[u8] = b"temp=21.5";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Bootloader,
    Application,
}

#[derive(Debug)]
pub struct AvrState {
    pub mode: Mode,
    pub flash: Vec<u8>,
    pub eeprom: Vec<u8>,
    /// Flash page whose first byte never programs.
    pub stuck_page: Option<usize>,
    /// Every frame received, in order.
    pub requests: Vec<Frame>,
}

impl AvrState {
    fn new() -> Self {
        Self {
            mode: Mode::Bootloader,
            flash: vec![ERASED; FLASH_SIZE],
            eeprom: vec![ERASED; EEPROM_SIZE],
            stuck_page: None,
            requests: Vec::new(),
        }
    }

    /// Requests whose first byte is `opcode`.
    pub fn count(&self, opcode: u8) -> usize {
        self.requests
            .iter()
            .filter(|frame| frame.data.first() == Some(&opcode))
            .count()
    }

    fn handle(&mut self, frame: &Frame) -> Vec<Vec<u8>> {
        match self.mode {
            Mode::Bootloader => self.bootloader(&frame.data),
            Mode::Application => self.application(&frame.data),
        }
    }

    fn bootloader(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        match data {
            [b'V'] => {
                let mut reply = vec![b'V'];
                reply.extend_from_slice(&SIGNATURE);
                reply.push(BOOT_PAGE);
                reply.extend_from_slice(BOOT_VERSION.as_bytes());
                vec![wire(BOOT, &reply)]
            }
            [op @ (b'f' | b'e'), lo, hi, len] => {
                let address = u16::from_le_bytes([*lo, *hi]) as usize;
                let memory = if *op == b'f' {
                    &self.flash
                } else {
                    &self.eeprom
                };
                vec![wire(BOOT, &memory[address..address + *len as usize])]
            }
            [b'F', page, bytes @ ..] => {
                let start = *page as usize * PAGE_SIZE;
                self.flash[start..start + bytes.len()].copy_from_slice(bytes);
                if self.stuck_page == Some(*page as usize) {
                    self.flash[start] = ERASED;
                }
                vec![wire(BOOT, &[1])]
            }
            [b'C', page] => {
                let start = *page as usize * PAGE_SIZE;
                self.flash[start..start + PAGE_SIZE].fill(ERASED);
                vec![wire(BOOT, &[1])]
            }
            [b'E', lo, hi, len, bytes @ ..] if bytes.len() == *len as usize => {
                let address = u16::from_le_bytes([*lo, *hi]) as usize;
                self.eeprom[address..address + bytes.len()].copy_from_slice(bytes);
                vec![wire(BOOT, &[1])]
            }
            [b'R'] => {
                self.mode = Mode::Application;
                vec![wire(BOOT, b"R")]
            }
            _ => Vec::new(),
        }
    }

    fn application(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        match data {
            [b'r'] => {
                self.mode = Mode::Bootloader;
                vec![b"\tLOG rebooting\n".to_vec()]
            }
            [0, id] => vec![wire(COMMAND, &[0, 0, *id, id.wrapping_add(1)])],
            [1] => {
                let mut reply = vec![1, 0];
                reply.extend_from_slice(FIRMWARE_VERSION.as_bytes());
                vec![wire(COMMAND, &reply)]
            }
            [SAMPLE_COMMAND] => vec![
                b"\tLOG sampling\n".to_vec(),
                wire(0x04, SAMPLE_EVENT),
                wire(COMMAND, &[SAMPLE_COMMAND, 0]),
            ],
            [command, ..] => vec![wire(COMMAND, &[*command, 0xFF])],
            [] => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Avr(Arc<Mutex<AvrState>>);

impl Avr {
    pub fn state(&self) -> MutexGuard<'_, AvrState> {
        self.0.lock().expect("avr lock")
    }
}

pub fn wire(flags: u8, data: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_frame(flags, data, &mut buf).expect("test frame should encode");
    buf.to_vec()
}

/// Run the simulated device on `end` until the host end closes.
pub fn spawn_avr(mut end: MemoryTransport) -> Avr {
    let avr = Avr(Arc::new(Mutex::new(AvrState::new())));
    let state = avr.clone();
    thread::spawn(move || {
        let mut framer = Framer::new();
        loop {
            match end.read_byte(Duration::from_millis(5)) {
                Ok(Some(byte)) => {
                    if let Some(FramerEvent::Frame(frame)) = framer.push_byte(byte) {
                        let replies = {
                            let mut state = state.state();
                            state.requests.push(frame.clone());
                            state.handle(&frame)
                        };
                        for chunk in replies {
                            if end.write(&chunk).is_err() {
                                return;
                            }
                        }
                    }
                }
                Ok(None) => {
                    framer.on_timeout();
                }
                Err(_) => return,
            }
        }
    });
    avr
}

/// A link to a fresh simulated device.
pub fn connect() -> (Link, Avr) {
    let (host, device) = MemoryTransport::pair();
    let avr = spawn_avr(device);
    let link = Link::open(host, LinkConfig::default()).expect("link should open");
    (link, avr)
}

/// A link to a fresh simulated device, with device log lines sent to `sink`.
pub fn connect_with_sink<S: LogSink + 'static>(sink: S) -> (Link, Avr) {
    let (host, device) = MemoryTransport::pair();
    let avr = spawn_avr(device);
    let link = Link::open_with_sink(host, LinkConfig::default(), sink).expect("link should open");
    (link, avr)
}

pub fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("mmp-it-{}-{name}", std::process::id()))
}
