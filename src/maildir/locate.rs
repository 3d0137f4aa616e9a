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

//! Finding stored messages by name.
//!
//! A freshly delivered message sits in `new` under exactly the name it was
//! given. Once a mail client has seen it, the client moves it to `cur` and
//! usually appends an info suffix (`:2,S` and so on) which it may change at
//! any time. Lookup therefore tries `new` first and then falls back to a
//! prefix scan of `cur`.
//!
//! Nothing in here ever modifies the file system.

use std::fs;
use std::io::{self, Read};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::mime::message::Message;
use crate::support::error::Error;
use crate::support::file_ops::ErrorTransforms;
use crate::support::safe_name::is_safe_name;

/// The subdirectory of a Maildir holding a finished message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subdir {
    New,
    Cur,
}

impl Subdir {
    pub fn name(self) -> &'static str {
        match self {
            Subdir::New => "new",
            Subdir::Cur => "cur",
        }
    }
}

/// An open message file.
pub(super) struct Located {
    pub(super) subdir: Subdir,
    pub(super) path: PathBuf,
    pub(super) file: fs::File,
}

/// Find and open the message called `name` under the Maildir at `root`.
pub(super) fn open(root: &Path, name: &str) -> Result<Located, Error> {
    if !is_safe_name(name) {
        return Err(Error::UnsafeName);
    }

    let path = root.join(Subdir::New.name()).join(name);
    match fs::File::open(&path) {
        Ok(file) => {
            return Ok(Located {
                subdir: Subdir::New,
                path,
                file,
            })
        }
        Err(e) if io::ErrorKind::NotFound == e.kind() => (),
        Err(e) => return Err(e.into()),
    }

    let path = find_in_cur(&root.join(Subdir::Cur.name()), name)?;
    // The client may have renamed it again between the scan and now; we
    // report that as absent rather than trying to chase it.
    let file = fs::File::open(&path).on_not_found(Error::NxMessage)?;
    Ok(Located {
        subdir: Subdir::Cur,
        path,
        file,
    })
}

/// Find the single entry in `cur` whose name begins with `name`.
///
/// This is a plain lexical comparison over the directory listing, so `name`
/// is never interpreted as a pattern.
pub(super) fn find_in_cur(cur: &Path, name: &str) -> Result<PathBuf, Error> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(cur)? {
        let entry = entry?;
        let file_name = entry.file_name();
        if file_name.as_bytes().starts_with(name.as_bytes()) {
            candidates.push(file_name);
        }
    }

    match candidates.len() {
        0 => Err(Error::NxMessage),
        1 => Ok(cur.join(&candidates[0])),
        _ => {
            let mut candidates = candidates
                .iter()
                .map(|c| c.to_string_lossy().into_owned())
                .collect::<Vec<_>>();
            candidates.sort();
            Err(Error::AmbiguousMessage {
                name: name.to_owned(),
                candidates,
            })
        }
    }
}

/// Read the remainder of `file` and parse it as a message.
///
/// The file is closed when this returns, whatever the outcome.
pub(super) fn read_message(mut file: fs::File) -> Result<Message, Error> {
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Message::parse(&data)
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    fn set_up() -> TempDir {
        let root = TempDir::new().unwrap();
        for sub in &["tmp", "new", "cur"] {
            fs::create_dir(root.path().join(sub)).unwrap();
        }
        root
    }

    #[test]
    fn prefers_new() {
        let root = set_up();
        fs::write(root.path().join("new/m1"), b"A: new\n\n").unwrap();
        fs::write(root.path().join("cur/m1:2,S"), b"A: cur\n\n").unwrap();

        let located = open(root.path(), "m1").unwrap();
        assert_eq!(Subdir::New, located.subdir);
        assert_eq!(root.path().join("new/m1"), located.path);
        assert_eq!(
            Some("new"),
            read_message(located.file).unwrap().header("A")
        );
    }

    #[test]
    fn falls_back_to_cur_prefix() {
        let root = set_up();
        fs::write(root.path().join("cur/m1:2,RS"), b"A: cur\n\n").unwrap();
        fs::write(root.path().join("cur/m2"), b"A: other\n\n").unwrap();

        let located = open(root.path(), "m1").unwrap();
        assert_eq!(Subdir::Cur, located.subdir);
        assert_eq!(root.path().join("cur/m1:2,RS"), located.path);

        // An exact name in cur is a zero-length suffix
        let located = open(root.path(), "m2").unwrap();
        assert_eq!(root.path().join("cur/m2"), located.path);
    }

    #[test]
    fn not_found_and_ambiguous() {
        let root = set_up();
        assert_matches!(
            Err(Error::NxMessage),
            open(root.path(), "m1").map(|_| ())
        );

        fs::write(root.path().join("cur/m1:2,S"), b"").unwrap();
        fs::write(root.path().join("cur/m1:2,R"), b"").unwrap();
        match find_in_cur(&root.path().join("cur"), "m1") {
            Err(Error::AmbiguousMessage { name, candidates }) => {
                assert_eq!("m1", name);
                assert_eq!(
                    vec!["m1:2,R".to_owned(), "m1:2,S".to_owned()],
                    candidates
                );
            }
            r => panic!("Unexpected result: {:?}", r),
        }
    }

    #[test]
    fn glob_characters_are_literal() {
        let root = set_up();
        fs::write(root.path().join("cur/m1:2,S"), b"").unwrap();

        assert_matches!(
            Err(Error::NxMessage),
            find_in_cur(&root.path().join("cur"), "m*")
        );
        assert_matches!(
            Err(Error::NxMessage),
            find_in_cur(&root.path().join("cur"), "m?")
        );
    }

    #[test]
    fn unsafe_names_rejected() {
        let root = set_up();
        fs::write(root.path().join("tmp/inflight"), b"").unwrap();

        for &name in &["", ".", "..", "../tmp/inflight", ".hidden", "a/b"] {
            assert_matches!(
                Err(Error::UnsafeName),
                open(root.path(), name).map(|_| ())
            );
        }
    }

    #[test]
    fn missing_cur_is_an_io_error() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("new")).unwrap();

        assert_matches!(
            Err(Error::Io(_)),
            open(root.path(), "m1").map(|_| ())
        );
    }
}
