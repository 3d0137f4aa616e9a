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

use std::io::{self, Write};

use log::{error, info, warn};

use super::main::{
    open_existing_maildir, open_maildir, CatSubcommand, CommonOptions,
};
use mdir::support::sysexits::*;
use mdir::support::system_config::SystemConfig;
use mdir::{Error, Maildir, StoredMessage};

pub(super) fn init(system_config: SystemConfig, cmd: CommonOptions) {
    let maildir = open_maildir(&system_config, &cmd);
    info!("Maildir ready at {}", maildir.path().display());
}

pub(super) fn cat(system_config: SystemConfig, cmd: CatSubcommand) {
    let maildir = open_existing_maildir(&system_config, &cmd.common);

    let message = match maildir.open(&cmd.name) {
        Ok(message) => message,
        Err(e @ Error::AmbiguousMessage { .. }) => die!(
            EX_SOFTWARE,
            "{}: {}; the Maildir needs attention",
            cmd.name,
            e
        ),
        Err(e) => die!(Sysexit::from(&e), "{}: {}", cmd.name, e),
    };

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    if let Err(e) = message
        .write_to(&mut stdout)
        .and_then(|_| stdout.flush().map_err(Error::from))
    {
        die!(EX_IOERR, "Failed to write {}: {}", cmd.name, e);
    }
}

pub(super) fn list(system_config: SystemConfig, cmd: CommonOptions) {
    let maildir = open_existing_maildir(&system_config, &cmd);

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    match list_to(&maildir, &mut stdout) {
        Ok(0) => (),
        Ok(skipped) => {
            warn!("{} entries could not be read", skipped);
            EX_DATAERR.exit();
        }
        Err(e) => die!(Sysexit::from(&e), "Failed to list messages: {}", e),
    }
}

/// Write one line per readable message in `maildir` to `out`.
///
/// Returns the number of entries that were skipped.
fn list_to(maildir: &Maildir, mut out: impl Write) -> Result<usize, Error> {
    let report = maildir.scan(|m| {
        writeln!(out, "{}", format_entry(&m))?;
        Ok::<(), Error>(())
    })?;
    out.flush()?;

    for skipped in &report.skipped {
        error!("{}: {}", skipped.path.display(), skipped.error);
    }
    Ok(report.skipped.len())
}

fn format_entry(m: &StoredMessage) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        m.subdir.name(),
        m.name,
        m.info.as_deref().unwrap_or(""),
        m.message.header("Subject").unwrap_or(""),
    )
}
