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

//! Mdir stores email messages in Maildir directories.
//!
//! Delivery is crash-safe and needs no locks: each message is written to
//! `tmp` under a name nobody else can generate, then renamed into `new`.
//! Lookup copes with mail clients moving messages into `cur` and renaming
//! them there. See the `maildir` module for the details.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod maildir;
pub mod mime;
pub mod support;

pub use crate::maildir::{Maildir, ScanReport, StoredMessage, Subdir};
pub use crate::mime::message::Message;
pub use crate::support::error::Error;

/// Send log output to standard error.
///
/// This is used when running interactively, where neither syslog nor a
/// logging configuration file is wanted.
pub fn init_simple_log() {
    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S%.3f)} [{l}][{t}] {m}{n}",
        )))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(
            Root::builder()
                .appender("stderr")
                .build(log::LevelFilter::Info),
        );

    match config {
        Ok(config) => {
            // Fails only if a logger is already installed, which is fine
            let _ = log4rs::init_config(config);
        }
        Err(e) => eprintln!("Failed to configure logging: {}", e),
    }
}
