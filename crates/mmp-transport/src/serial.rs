//! Serial port transport.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};

use crate::error::{Result, TransportError};
use crate::transport::Transport;

/// Default serial baud rate.
pub const DEFAULT_BAUD: u32 = 38_400;

/// Default per-byte poll timeout used by the reader thread.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(4);

/// Serial port settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Line speed. Default: 38400.
    pub baud: u32,
    /// Initial read timeout. Default: 4ms.
    pub poll_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Serial port transport, 8N1 without flow control.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    name: String,
    timeout: Duration,
}

impl SerialTransport {
    /// Open a serial port.
    pub fn open(path: &str, config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(path, config.baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.poll_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: path.to_string(),
                source,
            })?;

        tracing::info!(port = path, baud = config.baud, "opened serial port");

        Ok(Self {
            port,
            name: path.to_string(),
            timeout: config.poll_timeout,
        })
    }

    /// Device path this transport was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Transport for SerialTransport {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        if timeout != self.timeout {
            self.port.set_timeout(timeout)?;
            self.timeout = timeout;
        }

        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(1) => Ok(Some(byte[0])),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == ErrorKind::TimedOut => Ok(None),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(None),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn Transport>> {
        let port = self.port.try_clone()?;
        Ok(Box::new(Self {
            port,
            name: self.name.clone(),
            timeout: self.timeout,
        }))
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A serial port visible to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub name: String,
    /// Port kind: `usb`, `pci`, `bluetooth` or `unknown`.
    pub kind: &'static str,
    /// USB product string, when known.
    pub product: Option<String>,
}

/// List the serial ports available on this host.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|port| {
            let (kind, product) = match port.port_type {
                SerialPortType::UsbPort(info) => ("usb", info.product),
                SerialPortType::PciPort => ("pci", None),
                SerialPortType::BluetoothPort => ("bluetooth", None),
                SerialPortType::Unknown => ("unknown", None),
            };
            PortInfo {
                name: port.port_name,
                kind,
                product,
            }
        })
        .collect())
}
