use mmp_transport::{available_ports, PortInfo};
use serde::Serialize;

use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    product: Option<&'a str>,
}

impl<'a> From<&'a PortInfo> for PortOutput<'a> {
    fn from(port: &'a PortInfo) -> Self {
        Self {
            name: &port.name,
            kind: port.kind,
            product: port.product.as_deref(),
        }
    }
}

pub fn run(format: OutputFormat) -> CliResult<i32> {
    let ports = available_ports().map_err(|err| transport_error("cannot list ports", err))?;
    if ports.is_empty() {
        tracing::warn!("no serial ports found");
    }

    let out: Vec<PortOutput<'_>> = ports.iter().map(PortOutput::from).collect();
    let rows = out
        .iter()
        .map(|port| {
            vec![
                port.name.to_string(),
                port.kind.to_string(),
                port.product.unwrap_or("-").to_string(),
            ]
        })
        .collect();
    print_rows(&["PORT", "TYPE", "PRODUCT"], &out, rows, format);
    Ok(SUCCESS)
}
