//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Mdir.
//
// Mdir is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Mdir is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mdir. If not, see <http://www.gnu.org/licenses/>.

use std::collections::BTreeMap;
use std::io::Write;

use memchr::memchr;

use crate::support::error::Error;

/// A message as stored in a Maildir.
///
/// Headers are kept sorted by name, which is also the order in which they are
/// written out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    headers: BTreeMap<String, String>,
    raw_body: Vec<u8>,
}

impl Message {
    pub fn new(headers: BTreeMap<String, String>, raw_body: Vec<u8>) -> Self {
        Message { headers, raw_body }
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.headers
    }

    /// Look up a header by name.
    ///
    /// An exact match is preferred; otherwise the first header whose name
    /// matches ignoring ASCII case is returned.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|&(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    pub fn into_parts(self) -> (BTreeMap<String, String>, Vec<u8>) {
        (self.headers, self.raw_body)
    }

    /// Parse the raw content of a stored message.
    ///
    /// The header block ends at the first empty line (either `\n` or
    /// `\r\n`); everything after it is the body, byte for byte. Input with no
    /// empty line at all is taken to be headers only.
    ///
    /// Folded header lines are unfolded by simply removing the line break.
    /// Exactly one space or tab after the colon is dropped; any further
    /// whitespace belongs to the value. When a header name occurs more than
    /// once, the first occurrence wins. Header text which is not valid UTF-8
    /// is decoded lossily.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        Self::parse_noting_duplicates(data).map(|(message, _)| message)
    }

    /// Like `parse`, but also returns the name of every header occurrence
    /// that was dropped because an earlier header had the same name.
    pub fn parse_noting_duplicates(
        data: &[u8],
    ) -> Result<(Self, Vec<String>), Error> {
        let mut headers = BTreeMap::<String, String>::new();
        let mut duplicates = Vec::<String>::new();
        let mut keep = |(name, value): (String, String)| {
            if headers.contains_key(&name) {
                duplicates.push(name);
            } else {
                headers.insert(name, value);
            }
        };
        let mut current: Option<(String, String)> = None;
        let mut raw_body: &[u8] = &[];
        let mut rest = data;

        while !rest.is_empty() {
            let (line, next) = match memchr(b'\n', rest) {
                Some(lf) => (&rest[..lf], &rest[lf + 1..]),
                None => (rest, &rest[rest.len()..]),
            };
            rest = next;
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            if line.is_empty() {
                raw_body = rest;
                break;
            }

            if b' ' == line[0] || b'\t' == line[0] {
                match current {
                    Some((_, ref mut value)) => {
                        value.push_str(&String::from_utf8_lossy(line))
                    }
                    None => {
                        return Err(Error::BadMessage(
                            "Continuation line before first header".to_owned(),
                        ))
                    }
                }
                continue;
            }

            let colon = memchr(b':', line).ok_or_else(|| {
                Error::BadMessage(format!(
                    "Header line without colon: {:?}",
                    String::from_utf8_lossy(line)
                ))
            })?;

            let name = trim_end_wsp(&line[..colon]);
            if name.is_empty() || !name.iter().copied().all(is_ftext) {
                return Err(Error::BadMessage(format!(
                    "Bad header name: {:?}",
                    String::from_utf8_lossy(&line[..colon])
                )));
            }

            let value = &line[colon + 1..];
            let value = match value.split_first() {
                Some((&first, tail)) if is_wsp(first) => tail,
                _ => value,
            };

            if let Some(header) = current.take() {
                keep(header);
            }
            current = Some((
                String::from_utf8_lossy(name).into_owned(),
                String::from_utf8_lossy(value).into_owned(),
            ));
        }

        if let Some(header) = current {
            keep(header);
        }

        Ok((
            Message {
                headers,
                raw_body: raw_body.to_vec(),
            },
            duplicates,
        ))
    }

    /// Write this message in stored form to `dst`.
    ///
    /// Each header becomes one `Name: value\n` line, followed by a single
    /// `\n` and the raw body. All headers are validated before anything is
    /// written, so an invalid message never produces partial output.
    ///
    /// Returns the number of bytes written.
    pub fn write_to(&self, mut dst: impl Write) -> Result<u64, Error> {
        for (name, value) in &self.headers {
            check_header(name, value)?;
        }

        for (name, value) in &self.headers {
            dst.write_all(name.as_bytes())?;
            dst.write_all(b": ")?;
            dst.write_all(value.as_bytes())?;
            dst.write_all(b"\n")?;
        }
        dst.write_all(b"\n")?;
        dst.write_all(&self.raw_body)?;

        Ok(self.serialized_len())
    }

    /// The number of bytes `write_to` produces for this message.
    pub fn serialized_len(&self) -> u64 {
        let headers: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.len() + 2 + value.len() + 1)
            .sum();
        (headers + 1 + self.raw_body.len()) as u64
    }
}

fn check_header(name: &str, value: &str) -> Result<(), Error> {
    if name.is_empty() || !name.bytes().all(is_ftext) {
        return Err(Error::BadMessage(format!("Bad header name: {:?}", name)));
    }

    if value.find(|c| c == '\r' || c == '\n').is_some() {
        return Err(Error::BadMessage(format!(
            "Line break in value of header {}",
            name
        )));
    }

    Ok(())
}

// RFC 5322 2.2 "ftext"
fn is_ftext(b: u8) -> bool {
    b >= 33 && b <= 126 && b != b':'
}

fn is_wsp(b: u8) -> bool {
    b' ' == b || b'\t' == b
}

fn trim_end_wsp(mut s: &[u8]) -> &[u8] {
    while let Some((&last, init)) = s.split_last() {
        if !is_wsp(last) {
            break;
        }
        s = init;
    }
    s
}
