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

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::{error, warn};

use super::main::{open_maildir, DeliverSubcommand};
use mdir::support::sysexits::*;
use mdir::support::system_config::SystemConfig;
use mdir::{Maildir, Message};

pub(super) fn deliver(system_config: SystemConfig, cmd: DeliverSubcommand) {
    let maildir = open_maildir(&system_config, &cmd.common);

    if let Err(exit) = run_delivery(
        &maildir,
        &cmd.inputs,
        cmd.keep_first_duplicate,
        io::stdin().lock(),
        io::stdout().lock(),
    ) {
        exit.exit();
    }
}

/// Deliver each of `inputs` into `maildir`, writing the new names to `out`.
///
/// `stdin` is read for the input `-`. An input with repeated headers fails
/// with `EX_DATAERR` unless `keep_first_duplicate` is set. On failure, the
/// problem has already been logged and the exit status is returned.
fn run_delivery(
    maildir: &Maildir,
    inputs: &[PathBuf],
    keep_first_duplicate: bool,
    mut stdin: impl Read,
    mut out: impl Write,
) -> Result<(), Sysexit> {
    for input in inputs {
        let data = read_input(input, &mut stdin).map_err(|e| {
            error!("Failed to read {}: {}", input.display(), e);
            EX_NOINPUT
        })?;

        let (message, duplicates) = Message::parse_noting_duplicates(&data)
            .map_err(|e| {
                error!("{}: {}", input.display(), e);
                EX_DATAERR
            })?;

        if !duplicates.is_empty() && !keep_first_duplicate {
            error!(
                "{}: repeated headers cannot be stored: {}",
                input.display(),
                duplicates.join(", ")
            );
            return Err(EX_DATAERR);
        }
        for duplicate in &duplicates {
            warn!(
                "{}: dropping repeated {} header",
                input.display(),
                duplicate
            );
        }

        let name = maildir.write(&message).map_err(|e| {
            error!(
                "Failed to deliver {} to {}: {}",
                input.display(),
                maildir.path().display(),
                e
            );
            Sysexit::from(&e)
        })?;

        writeln!(out, "{}", name).map_err(|e| {
            error!("Failed to report delivery of {}: {}", name, e);
            EX_IOERR
        })?;
    }

    Ok(())
}

fn read_input(input: &Path, stdin: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    if Path::new("-") == input {
        stdin.read_to_end(&mut data)?;
    } else {
        fs::File::open(input)?.read_to_end(&mut data)?;
    }
    Ok(data)
}
