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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No such message")]
    NxMessage,
    #[error("Not a Maildir: {0}")]
    NxMaildir(String),
    #[error("Multiple messages in cur match {name}: {candidates:?}")]
    AmbiguousMessage {
        name: String,
        candidates: Vec<String>,
    },
    #[error("Malformed message: {0}")]
    BadMessage(String),
    #[error("Unsafe message name")]
    UnsafeName,
    #[error("Random source unavailable: {0}")]
    RandomSourceUnavailable(#[source] rand::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Nix(#[from] nix::Error),
}

impl Error {
    /// Whether this error is a failure of the underlying storage (or the OS
    /// facilities around it) rather than a problem with the request or the
    /// data.
    ///
    /// These are the errors it may make sense to retry later.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(*self, Error::Io(..) | Error::Nix(..))
    }
}
