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
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{error, warn};
use structopt::StructOpt;

use mdir::support::sysexits::*;
use mdir::support::system_config::SystemConfig;
use mdir::{Error, Maildir};

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Create a Maildir, or complete one that is missing subdirectories.
    ///
    /// Existing directories and messages are never touched.
    Init(CommonOptions),
    Deliver(DeliverSubcommand),
    /// Print a stored message on standard output.
    ///
    /// The message is found by the name printed by `deliver`, whether it is
    /// still in `new` or a mail client has since moved it to `cur`.
    Cat(CatSubcommand),
    /// List the messages in a Maildir.
    ///
    /// Each line holds the subdirectory, the message name, the info suffix
    /// (flags) and the subject, separated by tabs. Files which are not
    /// readable messages are reported and skipped.
    List(CommonOptions),
}

#[derive(StructOpt)]
pub(super) struct CommonOptions {
    /// Path to the configuration file [default: built-in defaults]
    #[structopt(long, parse(from_os_str))]
    pub(super) config: Option<PathBuf>,

    /// Path to a log4rs configuration file. When standard error is a
    /// terminal logs go there; otherwise this file is used, or syslog if it
    /// is not given.
    #[structopt(long, parse(from_os_str))]
    pub(super) log_config: Option<PathBuf>,

    /// The Maildir to operate on.
    #[structopt(parse(from_os_str))]
    pub(super) maildir: PathBuf,
}

/// Deliver mail into a Maildir.
///
/// Each input is parsed as a message (a header block, an empty line, and the
/// body) and written into the Maildir under a new unique name, which is
/// printed on standard output.
///
/// Only one value can be stored per header name, so an input which repeats a
/// header (several `Received` lines, for example) is refused unless
/// --keep-first-duplicate is given.
///
/// Exit codes follow the `sysexits.h` convention expected of mail delivery
/// agents. Inputs are delivered in order; delivery stops at the first input
/// that fails, and everything delivered before it stays delivered.
#[derive(StructOpt)]
pub(super) struct DeliverSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// Deliver inputs with repeated headers anyway, keeping only the first
    /// occurrence of each and logging a warning for every one dropped.
    #[structopt(long)]
    pub(super) keep_first_duplicate: bool,

    /// The files to deliver. "-" will read from stdin.
    #[structopt(parse(from_os_str), default_value = "-")]
    pub(super) inputs: Vec<PathBuf>,
}

#[derive(StructOpt)]
pub(super) struct CatSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// The unique name of the message.
    pub(super) name: String,
}

impl Command {
    fn common_options(&self) -> &CommonOptions {
        match *self {
            Command::Init(ref c) | Command::List(ref c) => c,
            Command::Deliver(ref c) => &c.common,
            Command::Cat(ref c) => &c.common,
        }
    }
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    let common = cmd.common_options();
    let system_config = load_config(common.config.as_deref());
    init_logging(common.log_config.as_deref());

    match cmd {
        Command::Init(cmd) => super::read::init(system_config, cmd),
        Command::Deliver(cmd) => super::deliver::deliver(system_config, cmd),
        Command::Cat(cmd) => super::read::cat(system_config, cmd),
        Command::List(cmd) => super::read::list(system_config, cmd),
    }
}

fn load_config(path: Option<&Path>) -> SystemConfig {
    let path = match path {
        Some(path) => path,
        None => return SystemConfig::default(),
    };

    let mut system_config_toml = Vec::new();
    if let Err(e) = fs::File::open(path)
        .and_then(|mut f| f.read_to_end(&mut system_config_toml))
    {
        eprintln!("Error reading '{}': {}", path.display(), e);
        EX_CONFIG.exit();
    }

    match toml::from_slice(&system_config_toml) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error in config file at '{}': {}", path.display(), e);
            EX_CONFIG.exit()
        }
    }
}

fn init_logging(log_config: Option<&Path>) {
    if Ok(true) == nix::unistd::isatty(2) {
        // Running interactively; ignore logging configuration and just write
        // to stderr.
        mdir::init_simple_log();
        return;
    }

    if let Some(log_config) = log_config {
        if let Err(e) =
            log4rs::init_file(log_config, log4rs::file::Deserializers::new())
        {
            eprintln!(
                "Error in logging config at '{}': {}",
                log_config.display(),
                e
            );
            EX_CONFIG.exit();
        }
        return;
    }

    let formatter = syslog::Formatter3164 {
        facility: syslog::Facility::LOG_MAIL,
        hostname: None,
        process: env!("CARGO_PKG_NAME").to_owned(),
        pid: nix::unistd::getpid().as_raw(),
    };

    match syslog::unix(formatter) {
        Ok(logger) => {
            if log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
                .is_ok()
            {
                log::set_max_level(log::LevelFilter::Info);
            }
        }
        Err(e) => {
            // Delivery matters more than logging; carry on with stderr
            mdir::init_simple_log();
            warn!("Failed to connect to syslog: {}", e);
        }
    }
}

/// Open the Maildir named by `common` for reading, or exit with an
/// appropriate status. Nothing is created if it does not exist.
pub(super) fn open_existing_maildir(
    system_config: &SystemConfig,
    common: &CommonOptions,
) -> Maildir {
    match Maildir::open_existing(&common.maildir, &system_config.delivery) {
        Ok(maildir) => maildir,
        Err(e @ Error::Nix(..)) => die!(
            EX_OSERR,
            "Failed to determine host name; you may need to explicitly \
             configure it: {}",
            e
        ),
        Err(e) => die!(
            Sysexit::from(&e),
            "Failed to open Maildir {}: {}",
            common.maildir.display(),
            e
        ),
    }
}

/// Open the Maildir named by `common`, creating it as necessary, or exit with
/// an appropriate status.
pub(super) fn open_maildir(
    system_config: &SystemConfig,
    common: &CommonOptions,
) -> Maildir {
    match Maildir::with_config(&common.maildir, &system_config.delivery) {
        Ok(maildir) => maildir,
        Err(e @ Error::Nix(..)) => die!(
            EX_OSERR,
            "Failed to determine host name; you may need to explicitly \
             configure it: {}",
            e
        ),
        Err(e) => die!(
            EX_CANTCREAT,
            "Failed to open Maildir {}: {}",
            common.maildir.display(),
            e
        ),
    }
}
