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

//! Generation of unique message names.
//!
//! A message name has the form
//!
//! ```text
//! <unix-seconds>.R<32 hex digits>P<pid>Q<counter>.<host>
//! ```
//!
//! The 128 random bits are what actually keep concurrent writers (other
//! processes, other hosts, other handles in this process) from colliding. The
//! counter additionally guarantees that one generator never repeats itself,
//! and the PID and host name make collisions traceable should they ever
//! happen anyway.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering::SeqCst};

use rand::{rngs::OsRng, RngCore};

use crate::support::error::Error;

const RANDOM_BYTES: usize = 16;

#[derive(Debug)]
pub struct UniqueNameGenerator {
    counter: AtomicU64,
    pid: i32,
    host_name: String,
}

impl UniqueNameGenerator {
    /// Create a generator for the given process and (already sanitised) host
    /// name. The counter starts at 0.
    pub fn new(pid: i32, host_name: String) -> Self {
        UniqueNameGenerator {
            counter: AtomicU64::new(0),
            pid,
            host_name,
        }
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// The number of names generated so far.
    pub fn counter(&self) -> u64 {
        self.counter.load(SeqCst)
    }

    /// Generate the next unique name.
    ///
    /// Fails only if the operating system random source does. There is no
    /// fallback to a weaker source in that case.
    pub fn next_name(&self) -> Result<String, Error> {
        let mut random = [0u8; RANDOM_BYTES];
        OsRng
            .try_fill_bytes(&mut random)
            .map_err(Error::RandomSourceUnavailable)?;

        let timestamp = chrono::Utc::now().timestamp();
        let counter = self.counter.fetch_add(1, SeqCst) + 1;

        let mut name = String::with_capacity(
            20 + 2 * RANDOM_BYTES + 24 + self.host_name.len(),
        );
        let _ = write!(name, "{}.R", timestamp);
        for b in &random {
            let _ = write!(name, "{:02x}", b);
        }
        let _ = write!(name, "P{}Q{}.{}", self.pid, counter, self.host_name);
        Ok(name)
    }
}

/// Split a file name found in `new` or `cur` into the unique part and the
/// info part after the first `:`, if any.
pub fn split_info(file_name: &str) -> (&str, Option<&str>) {
    match file_name.find(':') {
        Some(colon) => (&file_name[..colon], Some(&file_name[colon + 1..])),
        None => (file_name, None),
    }
}
