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

use serde::{Deserialize, Serialize};

/// The configuration for Mdir.
///
/// This is stored in a TOML file, conventionally named `mdir.toml`, whose
/// path is given to the command-line tool. Every option has a default, so an
/// empty file (or no file at all) is a valid configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SystemConfig {
    /// Options controlling how messages are written.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// The host name to embed in new message names.
    ///
    /// If unset, the system host name is used.
    pub host_name: String,

    /// If true, each message is flushed to stable storage before it is moved
    /// into `new`.
    ///
    /// Turning this off makes delivery faster, but a crash shortly after a
    /// delivery can then leave an empty or truncated file in `new`.
    pub sync_writes: bool,

    /// The UNIX permissions given to message files.
    pub file_mode: u32,

    /// The UNIX permissions given to `tmp`, `new` and `cur` when they are
    /// created. Existing directories are left alone.
    pub dir_mode: u32,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        DeliveryConfig {
            host_name: String::new(),
            sync_writes: true,
            file_mode: 0o600,
            dir_mode: 0o700,
        }
    }
}
