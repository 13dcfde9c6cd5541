//! Control-channel replies

use std::fmt;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::transport::TransportError;

/// Longest reply line accepted before the server is considered broken
const MAX_REPLY_LINE: usize = 8192;

/// A complete (possibly multi-line) server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    /// 1xx: the action started, expect another reply
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2xx
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

/// Split a reply line into code, separator and text
///
/// The separator is `' '` on the last line of a reply and `'-'` on the first
/// line of a multi-line reply.
pub(crate) fn parse_reply_line(line: &str) -> Option<(u16, char, &str)> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let code = line[..3].parse().ok()?;
    match bytes.get(3) {
        None => Some((code, ' ', "")),
        Some(b' ') => Some((code, ' ', &line[4..])),
        Some(b'-') => Some((code, '-', &line[4..])),
        Some(_) => None,
    }
}

async fn read_line<R>(reader: &mut R) -> Result<String, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(MAX_REPLY_LINE as u64 + 1)
        .read_until(b'\n', &mut line)
        .await?;
    if read == 0 {
        return Err(TransportError::Closed);
    }
    if line.len() > MAX_REPLY_LINE {
        return Err(TransportError::Protocol("reply line too long".to_string()));
    }
    let line = String::from_utf8_lossy(&line);
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Read one reply from the control channel
///
/// A multi-line reply runs from `nnn-text` to the first line starting with
/// `nnn ` using the same code; lines in between are kept verbatim.
pub(crate) async fn read_reply<R>(reader: &mut R) -> Result<Reply, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let first = read_line(reader).await?;
    let Some((code, separator, text)) = parse_reply_line(&first) else {
        return Err(TransportError::Protocol(format!("malformed reply '{first}'")));
    };

    let mut reply = Reply {
        code,
        text: text.to_string(),
    };
    if separator == ' ' {
        return Ok(reply);
    }

    loop {
        let line = read_line(reader).await?;
        match parse_reply_line(&line) {
            Some((last, ' ', text)) if last == code => {
                reply.text.push('\n');
                reply.text.push_str(text);
                return Ok(reply);
            }
            _ => {
                reply.text.push('\n');
                reply.text.push_str(&line);
            }
        }
    }
}

/// Port from an EPSV reply such as `229 Entering Extended Passive Mode (|||6446|)`
pub(crate) fn parse_epsv_port(text: &str) -> Option<u16> {
    let start = text.find('(')?;
    let end = text[start..].find(')')? + start;
    let inner = &text[start + 1..end];

    let delimiter = inner.chars().next()?;
    let fields: Vec<&str> = inner.split(delimiter).collect();
    // "|||6446|" splits into ["", "", "", "6446", ""]
    if fields.len() != 5 {
        return None;
    }
    fields[3].parse().ok()
}

/// Port from a PASV reply such as `227 Entering Passive Mode (10,0,0,1,200,21)`
///
/// The host part is ignored; the data connection goes to the control peer.
pub(crate) fn parse_pasv_port(text: &str) -> Option<u16> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let numbers: Vec<u16> = text[start..]
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .take(6)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;

    if numbers.len() != 6 || numbers.iter().any(|&n| n > 255) {
        return None;
    }
    Some(numbers[4] * 256 + numbers[5])
}
