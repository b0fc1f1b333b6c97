//! Static device tables.

use serde::Serialize;

/// Memory geometry of a device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceProfile {
    pub name: &'static str,
    pub flash_size: usize,
    pub page_size: usize,
    pub eeprom_size: usize,
}

/// Profiles keyed by the first two signature bytes as uppercase hex.
static PROFILES: &[(&str, DeviceProfile)] = &[
    (
        "1E92",
        DeviceProfile {
            name: "ATMEGA48",
            flash_size: 4096,
            page_size: 64,
            eeprom_size: 256,
        },
    ),
    (
        "1E93",
        DeviceProfile {
            name: "ATMEGA88",
            flash_size: 8192,
            page_size: 64,
            eeprom_size: 512,
        },
    ),
    (
        "1E94",
        DeviceProfile {
            name: "ATMEGA168",
            flash_size: 16384,
            page_size: 128,
            eeprom_size: 512,
        },
    ),
    (
        "1E95",
        DeviceProfile {
            name: "ATMEGA328",
            flash_size: 32768,
            page_size: 128,
            eeprom_size: 1024,
        },
    ),
];

/// Part names by full signature, sorted by signature.
static PART_NAMES: &[(&str, &str)] = &[
    ("1E9205", "ATMEGA48"),
    ("1E920A", "ATMEGA48P"),
    ("1E9306", "ATMEGA8515"),
    ("1E9307", "ATMEGA8"),
    ("1E9308", "ATMEGA8535"),
    ("1E930A", "ATMEGA88"),
    ("1E930F", "ATMEGA88P"),
    ("1E9389", "ATMEGA8U2"),
    ("1E9403", "ATMEGA16"),
    ("1E9404", "ATMEGA162"),
    ("1E9405", "ATMEGA169P"),
    ("1E9406", "ATMEGA168"),
    ("1E9407", "ATMEGA165P"),
    ("1E940A", "ATMEGA164P"),
    ("1E940B", "ATMEGA168P"),
    ("1E940D", "ATMEGA16HVB"),
    ("1E940F", "ATMEGA164A"),
    ("1E9410", "ATMEGA165A"),
    ("1E9411", "ATMEGA169A"),
    ("1E9484", "ATMEGA16M1"),
    ("1E9488", "ATMEGA16U4"),
    ("1E9489", "ATMEGA16U2"),
    ("1E9502", "ATMEGA32"),
    ("1E9503", "ATMEGA329"),
    ("1E9504", "ATMEGA3290"),
    ("1E9505", "ATMEGA325"),
    ("1E9506", "ATMEGA3250"),
    ("1E9508", "ATMEGA324P"),
    ("1E950B", "ATMEGA329P"),
    ("1E950C", "ATMEGA3290P"),
    ("1E950D", "ATMEGA325P"),
    ("1E950E", "ATMEGA3250P"),
    ("1E950F", "ATMEGA328P"),
    ("1E9510", "ATMEGA32HVB"),
    ("1E9511", "ATMEGA324PA"),
    ("1E9514", "ATMEGA328"),
    ("1E9515", "ATMEGA324A"),
    ("1E9584", "ATMEGA32M1"),
    ("1E9586", "ATMEGA32C1"),
    ("1E9587", "ATMEGA32U4"),
    ("1E958A", "ATMEGA32U2"),
    ("1E9602", "ATMEGA64"),
    ("1E9603", "ATMEGA649"),
    ("1E9604", "ATMEGA6490"),
    ("1E9605", "ATMEGA645"),
    ("1E9606", "ATMEGA6450"),
    ("1E9608", "ATMEGA640"),
    ("1E9609", "ATMEGA644"),
    ("1E960A", "ATMEGA644P"),
    ("1E960B", "ATMEGA649P"),
    ("1E960C", "ATMEGA6490P"),
    ("1E960D", "ATMEGA645P"),
    ("1E960E", "ATMEGA6450P"),
    ("1E9684", "ATMEGA64M1"),
    ("1E9686", "ATMEGA64C1"),
    ("1E9702", "ATMEGA128"),
    ("1E9703", "ATMEGA1280"),
    ("1E9704", "ATMEGA1281"),
    ("1E9705", "ATMEGA1284P"),
    ("1E9706", "ATMEGA1284"),
    ("1E9801", "ATMEGA2560"),
    ("1E9802", "ATMEGA2561"),
    ("1EA701", "ATMEGA128RFA1"),
];

/// Uppercase hex rendering of signature bytes, e.g. `1E950F`.
pub fn signature_hex(signature: &[u8]) -> String {
    signature.iter().map(|b| format!("{b:02X}")).collect()
}

/// Look up the profile for a hex signature. Only the first 4 characters are
/// significant.
pub fn lookup_profile(signature: &str) -> Option<&'static DeviceProfile> {
    let prefix = signature.get(..4)?;
    PROFILES
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(prefix))
        .map(|(_, profile)| profile)
}

/// Exact part name for a full hex signature.
pub fn part_name(signature: &str) -> Option<&'static str> {
    let signature = signature.to_ascii_uppercase();
    PART_NAMES
        .binary_search_by(|(key, _)| (*key).cmp(signature.as_str()))
        .ok()
        .map(|i| PART_NAMES[i].1)
}

/// Every known profile.
pub fn profiles() -> impl Iterator<Item = &'static DeviceProfile> {
    PROFILES.iter().map(|(_, profile)| profile)
}
