//! Decoder for `hcidump --raw` event lines.
//!
//! A dump line is a sequence of two-character hex tokens separated by spaces,
//! prefixed with `"> "` when the packet is an event received from the
//! controller. Decoding is positional:
//!
//! ```text
//! > 04 3E 2B 02 01 00 01 BF D7 AD 8A 1E FE 1F 02 01 06 1B FF 99 04 ... B1
//!   |  |  |  |  |  |  |  `- MAC, 6 bytes, least significant first
//!   |  |  |  |  |  |  `- peer address type
//!   |  |  |  |  |  `- event type
//!   |  |  |  |  `- number of reports
//!   |  |  |  `- LE meta sub-event (advertising report)
//!   |  |  `- parameter length
//!   |  `- event code (LE meta event)
//!   `- packet type (HCI event)
//! ```
//!
//! After the MAC come the length-prefixed reports, each holding length-prefixed
//! AD structures. The final token of the line is the RSSI as a signed byte.

use crate::mac_address::MacAddress;
use thiserror::Error;

/// Prefix marking a line as an HCI event received from the controller.
pub const EVENT_MARKER: &str = "> ";

// HCI packet types
const HCI_EVENT_PKT: u8 = 0x04;

// HCI events
const EVT_LE_META_EVENT: u8 = 0x3E;

// LE Meta event sub-events
const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

const HEADER_LEN: usize = 7;
const MAC_LEN: usize = 6;

/// Header, address and trailing RSSI byte.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + MAC_LEN + 1;

/// Reasons a line does not decode into a [`Frame`].
///
/// None of these are failures of the collector: scanners emit plenty of lines
/// that are not advertising reports.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("not an HCI event line")]
    NotAnEvent,
    #[error("frame too short: {0} bytes")]
    TooShort(usize),
    #[error("invalid hex token '{0}'")]
    InvalidToken(String),
    #[error("not an LE advertising report (packet type {packet_type:#04x}, event {event_code:#04x}, sub-event {sub_event:#04x})")]
    NotAdvertisingReport {
        packet_type: u8,
        event_code: u8,
        sub_event: u8,
    },
    #[error("structure at byte {offset} declares {declared} bytes but only {available} remain")]
    Truncated {
        offset: usize,
        declared: usize,
        available: usize,
    },
}

/// One AD structure: `length`, `ad_type`, then `length - 1` bytes of data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementData {
    pub length: u8,
    pub ad_type: u8,
    pub data: Vec<u8>,
}

/// One LE advertising report inside a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub length: u8,
    pub advertisements: Vec<AdvertisementData>,
}

/// A fully decoded HCI event line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub packet_type: u8,
    pub event_code: u8,
    pub packet_length: u8,
    pub sub_event: u8,
    pub number_of_reports: u8,
    pub event_type: u8,
    pub peer_address_type: u8,
    pub mac: MacAddress,
    pub rssi: i8,
    pub reports: Vec<Report>,
}

impl Frame {
    /// First AD structure of the given type in the first report.
    pub fn find_advertisement(&self, ad_type: u8) -> Option<&AdvertisementData> {
        self.reports
            .first()?
            .advertisements
            .iter()
            .find(|ad| ad.ad_type == ad_type)
    }
}

/// Forward-only reader over the frame bytes that never reads past the end.
struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FrameError> {
        if n > self.remaining() {
            return Err(FrameError::Truncated {
                offset: self.offset,
                declared: n,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, FrameError> {
        Ok(self.take(1)?[0])
    }
}

fn parse_tokens(body: &str) -> Result<Vec<u8>, FrameError> {
    body.split_whitespace()
        .map(|token| {
            if token.len() != 2 {
                return Err(FrameError::InvalidToken(token.to_string()));
            }
            u8::from_str_radix(token, 16).map_err(|_| FrameError::InvalidToken(token.to_string()))
        })
        .collect()
}

fn parse_advertisements(body: &[u8]) -> Result<Vec<AdvertisementData>, FrameError> {
    let mut cursor = Cursor::new(body);
    let mut advertisements = Vec::new();

    while !cursor.is_empty() {
        let length = cursor.byte()?;
        // A zero length marks the start of padding; the rest carries nothing.
        if length == 0 {
            break;
        }
        let structure = cursor.take(usize::from(length))?;
        advertisements.push(AdvertisementData {
            length,
            ad_type: structure[0],
            data: structure[1..].to_vec(),
        });
    }

    Ok(advertisements)
}

/// Decode one dump line into a [`Frame`].
///
/// Returns an error for anything that is not a complete LE advertising report
/// event; the error describes why the line was skipped.
pub fn parse_line(line: &str) -> Result<Frame, FrameError> {
    let body = line.strip_prefix(EVENT_MARKER).ok_or(FrameError::NotAnEvent)?;
    let bytes = parse_tokens(body)?;

    if bytes.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort(bytes.len()));
    }

    let (payload, rssi) = bytes.split_at(bytes.len() - 1);
    let rssi = rssi[0] as i8;

    let mut cursor = Cursor::new(payload);
    let header = cursor.take(HEADER_LEN)?;
    let (packet_type, event_code, sub_event) = (header[0], header[1], header[3]);
    if packet_type != HCI_EVENT_PKT
        || event_code != EVT_LE_META_EVENT
        || sub_event != EVT_LE_ADVERTISING_REPORT
    {
        return Err(FrameError::NotAdvertisingReport {
            packet_type,
            event_code,
            sub_event,
        });
    }

    let mut address = [0u8; MAC_LEN];
    address.copy_from_slice(cursor.take(MAC_LEN)?);

    let number_of_reports = header[4];
    let mut reports = Vec::with_capacity(usize::from(number_of_reports));
    for _ in 0..number_of_reports {
        let length = cursor.byte()?;
        let body = cursor.take(usize::from(length))?;
        reports.push(Report {
            length,
            advertisements: parse_advertisements(body)?,
        });
    }

    Ok(Frame {
        packet_type,
        event_code,
        packet_length: header[2],
        sub_event,
        number_of_reports,
        event_type: header[5],
        peer_address_type: header[6],
        mac: MacAddress::from_le_bytes(address),
        rssi,
        reports,
    })
}

/// Joins `hcidump --raw` output, which wraps long packets over several lines,
/// back into one line per event.
///
/// Continuation lines are indented. An event is complete once the number of
/// bytes after the parameter-length byte matches that length.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    pending: Option<String>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw line. Returns a line ready for [`parse_line`] when one is
    /// complete. Lines that are neither events nor continuations are passed
    /// through untouched so callers can inspect them.
    pub fn push(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end();

        if line.starts_with(EVENT_MARKER) {
            if let Some(dropped) = self.pending.take() {
                log::trace!("Dropping incomplete event: {dropped}");
            }
            return self.complete_or_hold(line.to_string());
        }

        if line.starts_with(char::is_whitespace) {
            if let Some(mut pending) = self.pending.take() {
                pending.push(' ');
                pending.push_str(line.trim_start());
                return self.complete_or_hold(pending);
            }
            return None;
        }

        if let Some(dropped) = self.pending.take() {
            log::trace!("Dropping incomplete event: {dropped}");
        }
        Some(line.to_string())
    }

    /// Take whatever is buffered, complete or not.
    pub fn flush(&mut self) -> Option<String> {
        self.pending.take()
    }

    fn complete_or_hold(&mut self, line: String) -> Option<String> {
        if Self::is_complete(&line) {
            Some(line)
        } else {
            self.pending = Some(line);
            None
        }
    }

    fn is_complete(line: &str) -> bool {
        let mut tokens = line[EVENT_MARKER.len()..].split_whitespace();
        let declared = match tokens.nth(2).map(|t| u8::from_str_radix(t, 16)) {
            Some(Ok(len)) => usize::from(len),
            // Unparseable header: let the decoder reject it.
            Some(Err(_)) => return true,
            None => return false,
        };
        tokens.count() >= declared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{DF5_LINE, df5_line};

    #[test]
    fn test_parse_all_fields() {
        let frame = parse_line(DF5_LINE).unwrap();

        assert_eq!(frame.packet_type, 4);
        assert_eq!(frame.event_code, 62);
        assert_eq!(frame.packet_length, 43);
        assert_eq!(frame.sub_event, 2);
        assert_eq!(frame.number_of_reports, 1);
        assert_eq!(frame.event_type, 0);
        assert_eq!(frame.peer_address_type, 1);
        assert_eq!(frame.mac.to_string(), "FE1E8AADD7BF");
        assert_eq!(frame.rssi, -79);

        assert_eq!(frame.reports.len(), 1);
        let report = &frame.reports[0];
        assert_eq!(report.length, 31);
        assert_eq!(report.advertisements.len(), 2);

        let flags = &report.advertisements[0];
        assert_eq!(flags.length, 2);
        assert_eq!(flags.ad_type, 0x01);
        assert_eq!(flags.data, vec![0x06]);

        let manufacturer = &report.advertisements[1];
        assert_eq!(manufacturer.length, 27);
        assert_eq!(manufacturer.ad_type, 0xFF);
        assert_eq!(
            manufacturer.data,
            vec![
                0x99, 0x04, 0x05, 0x11, 0x17, 0x34, 0xAF, 0xCE, 0xE2, 0x03, 0xF8, 0xFF, 0xE8, 0xFF,
                0xD8, 0xB0, 0xB6, 0x4D, 0x61, 0x31, 0xFE, 0x1E, 0x8A, 0xAD, 0xD7, 0xBF,
            ]
        );
    }

    #[test]
    fn test_parse_is_repeatable() {
        assert_eq!(parse_line(DF5_LINE), parse_line(DF5_LINE));
    }

    #[test]
    fn test_mac_is_reversed_from_wire_order() {
        let frame = parse_line(&df5_line("11 22 33 44 55 66", 20.0)).unwrap();
        assert_eq!(frame.mac.to_string(), "112233445566");
    }

    #[test]
    fn test_positive_rssi() {
        let line = DF5_LINE.replace(" B1", " 7F");
        assert_eq!(parse_line(&line).unwrap().rssi, 127);
        let line = DF5_LINE.replace(" B1", " 80");
        assert_eq!(parse_line(&line).unwrap().rssi, -128);
    }

    #[test]
    fn test_rejects_non_event_lines() {
        for line in [
            "",
            "HCI sniffer - Bluetooth packet analyzer ver 5.50",
            "device: hci0 snap_len: 1500 filter: 0xffffffff",
            "< 01 0B 20 07 00 10 00 10 00 00 00",
            "04 3E 2B 02 01 00 01 BF D7 AD 8A 1E FE 1F 02 01 06",
        ] {
            assert_eq!(parse_line(line), Err(FrameError::NotAnEvent), "{line}");
        }
    }

    #[test]
    fn test_rejects_short_lines() {
        assert_eq!(parse_line("> "), Err(FrameError::TooShort(0)));
        assert_eq!(
            parse_line("> 04 0E 04 01 0C 20 00"),
            Err(FrameError::TooShort(7))
        );
        // Every prefix of the reference line that drops the header is too short.
        let tokens: Vec<&str> = DF5_LINE[2..].split(' ').collect();
        for n in 0..MIN_FRAME_LEN {
            let line = format!("> {}", tokens[..n].join(" "));
            assert!(matches!(parse_line(&line), Err(FrameError::TooShort(_))));
        }
    }

    #[test]
    fn test_rejects_invalid_tokens() {
        let line = DF5_LINE.replace("AF", "ZZ");
        assert!(matches!(parse_line(&line), Err(FrameError::InvalidToken(_))));
        let line = DF5_LINE.replace(" 1F ", " 1F0 ");
        assert!(matches!(parse_line(&line), Err(FrameError::InvalidToken(_))));
    }

    #[test]
    fn test_rejects_other_events() {
        let line = DF5_LINE.replacen("04 3E 2B 02", "04 3E 2B 01", 1);
        assert!(matches!(
            parse_line(&line),
            Err(FrameError::NotAdvertisingReport { sub_event: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_truncated_structures() {
        let tokens: Vec<&str> = DF5_LINE[2..].split(' ').collect();
        // Drop bytes from the middle of the manufacturer data, keep the RSSI.
        for cut in 1..20 {
            let kept = &tokens[..tokens.len() - 1 - cut];
            let line = format!("> {} B1", kept.join(" "));
            assert!(
                matches!(parse_line(&line), Err(FrameError::Truncated { .. })),
                "cut {cut}"
            );
        }
    }

    #[test]
    fn test_rejects_ad_length_past_report() {
        // Manufacturer AD claims 0x30 bytes inside a 31 byte report.
        let line = DF5_LINE.replace(" 1B FF ", " 30 FF ");
        assert!(matches!(parse_line(&line), Err(FrameError::Truncated { .. })));
    }

    #[test]
    fn test_rejects_report_count_past_line() {
        let line = DF5_LINE.replacen("02 01 00 01", "02 02 00 01", 1);
        assert!(matches!(parse_line(&line), Err(FrameError::Truncated { .. })));
    }

    #[test]
    fn test_zero_reports() {
        let line = "> 04 3E 08 02 00 00 01 BF D7 AD 8A 1E FE B1";
        let frame = parse_line(line).unwrap();
        assert!(frame.reports.is_empty());
        assert!(frame.find_advertisement(0xFF).is_none());
    }

    #[test]
    fn test_zero_length_ad_ends_report() {
        let line = "> 04 3E 0F 02 01 00 01 BF D7 AD 8A 1E FE 05 02 01 06 00 00 C0";
        let frame = parse_line(line).unwrap();
        assert_eq!(frame.reports[0].advertisements.len(), 1);
        assert_eq!(frame.rssi, -64);
    }

    #[test]
    fn test_find_advertisement() {
        let frame = parse_line(DF5_LINE).unwrap();
        assert_eq!(frame.find_advertisement(0xFF).unwrap().length, 27);
        assert_eq!(frame.find_advertisement(0x01).unwrap().data, vec![0x06]);
        assert!(frame.find_advertisement(0x16).is_none());
    }

    #[test]
    fn test_assembler_single_line_event() {
        let mut assembler = FrameAssembler::new();
        assert_eq!(assembler.push(DF5_LINE).as_deref(), Some(DF5_LINE));
        assert!(assembler.flush().is_none());
    }

    #[test]
    fn test_assembler_joins_wrapped_event() {
        let mut assembler = FrameAssembler::new();
        assert!(
            assembler
                .push("> 04 3E 2B 02 01 00 01 BF D7 AD 8A 1E FE 1F 02 01 06 1B FF 99")
                .is_none()
        );
        assert!(
            assembler
                .push("  04 05 11 17 34 AF CE E2 03 F8 FF E8 FF D8 B0 B6 4D 61 31 FE")
                .is_none()
        );
        let joined = assembler.push("  1E 8A AD D7 BF B1").unwrap();
        assert_eq!(joined, DF5_LINE);
        assert_eq!(parse_line(&joined).unwrap().rssi, -79);
    }

    #[test]
    fn test_assembler_passes_through_other_lines() {
        let mut assembler = FrameAssembler::new();
        assert_eq!(
            assembler.push("HCI sniffer - Bluetooth packet analyzer ver 5.50"),
            Some("HCI sniffer - Bluetooth packet analyzer ver 5.50".to_string())
        );
        // Continuation without a pending event is noise.
        assert!(assembler.push("  04 05 11").is_none());
    }

    #[test]
    fn test_assembler_drops_incomplete_event() {
        let mut assembler = FrameAssembler::new();
        assert!(assembler.push("> 04 3E 2B 02 01").is_none());
        assert_eq!(assembler.push(DF5_LINE).as_deref(), Some(DF5_LINE));
        assert!(assembler.push("> 04 3E 2B 02 01").is_none());
        assert_eq!(assembler.flush().as_deref(), Some("> 04 3E 2B 02 01"));
    }
}
