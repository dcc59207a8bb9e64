//! DAP wire framing: `Content-Length`-prefixed JSON payloads, plus the
//! optional raw transcript log. This is the whole transport; everything
//! above it deals in parsed messages.

use std::io::{self, BufRead, BufWriter, Write};
use std::sync::{Arc, Mutex};

/// Read one framed payload. `Ok(None)` means the peer closed the stream.
pub(super) fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut content_length = None;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let header = line.trim_end_matches(['\r', '\n']);
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("Content-Length") {
                content_length = value.trim().parse::<usize>().ok();
            }
        }
    }

    let length = content_length.ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "missing Content-Length header")
    })?;
    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload)?;
    String::from_utf8(payload)
        .map(Some)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "payload is not utf-8"))
}

pub(super) fn write_message<W: Write>(writer: &mut W, payload: &str) -> io::Result<()> {
    write!(writer, "Content-Length: {}\r\n\r\n", payload.len())?;
    writer.write_all(payload.as_bytes())?;
    writer.flush()
}

pub(super) fn write_message_locked(
    writer: &Arc<Mutex<BufWriter<io::Stdout>>>,
    payload: &str,
) -> io::Result<()> {
    let mut writer = writer
        .lock()
        .map_err(|_| io::Error::other("stdout lock poisoned"))?;
    write_message(&mut *writer, payload)
}

pub(super) fn write_protocol_log(
    logger: &Arc<Mutex<BufWriter<std::fs::File>>>,
    direction: &str,
    payload: &str,
) -> io::Result<()> {
    let mut logger = logger
        .lock()
        .map_err(|_| io::Error::other("transcript lock poisoned"))?;
    writeln!(logger, "{direction} {payload}")?;
    logger.flush()
}
