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

//! The Maildir message store.
//!
//! # Layout
//!
//! A Maildir is a directory with three subdirectories:
//!
//! - `tmp` holds messages that are still being written. Nothing in `tmp` is
//! ever considered to be a message.
//!
//! - `new` holds delivered messages which no mail client has seen yet. The
//! file name is exactly the unique name assigned at delivery.
//!
//! - `cur` holds messages which a client has seen. Clients move messages here
//! from `new` and append an info suffix beginning with `:` to record flags.
//!
//! All three must be on the same file system, since delivery depends on
//! `rename()` between them being atomic.
//!
//! # Delivery
//!
//! A message is written in full to `tmp/<name>` under a freshly generated
//! unique name (see `unique_name`), then renamed to `new/<name>`. Readers
//! thus never see a partially written message, and no locking is needed no
//! matter how many processes deliver into the same Maildir at once.
//!
//! If the rename fails, the file is left in `tmp`. Cleaning up stale files in
//! `tmp` is left to whatever housekeeping the installation already does.
//!
//! # Lookup
//!
//! See `locate`. Lookup and iteration never modify anything.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::mime::message::Message;
use crate::support::error::Error;
use crate::support::file_ops::{self, IgnoreKinds};
use crate::support::safe_name::sanitise_host_name;
use crate::support::system_config::DeliveryConfig;

pub mod locate;
pub mod unique_name;

pub use self::locate::Subdir;
use self::unique_name::{split_info, UniqueNameGenerator};

const TMP: &str = "tmp";

/// A message found while iterating a Maildir.
#[derive(Clone, Debug)]
pub struct StoredMessage {
    /// The unique name of the message, without any info suffix. This is the
    /// name that can be passed to `Maildir::open()`.
    pub name: String,
    pub subdir: Subdir,
    /// The text after the first `:` in the file name, e.g. `2,S`.
    pub info: Option<String>,
    pub message: Message,
}

/// An entry passed over by `Maildir::scan()` because it could not be read.
#[derive(Debug)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub error: Error,
}

/// The outcome of `Maildir::scan()`.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// The number of messages passed to the handler.
    pub delivered: usize,
    pub skipped: Vec<SkippedEntry>,
}

/// A handle on one Maildir.
///
/// A handle can be shared between threads. Giving each thread its own handle
/// works just as well: names stay unique either way, since uniqueness comes
/// from the random part of the name rather than from the counter.
#[derive(Debug)]
pub struct Maildir {
    root: PathBuf,
    names: UniqueNameGenerator,
    sync_writes: bool,
    file_mode: u32,
}

impl Maildir {
    /// Open the Maildir at `root` with the default configuration, creating
    /// it as necessary.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, Error> {
        Self::with_config(root, &DeliveryConfig::default())
    }

    /// Open the Maildir at `root`, creating it as necessary.
    ///
    /// `root` and any missing parents are created, as are `tmp`, `new` and
    /// `cur` beneath it. Anything that already exists is left untouched, so
    /// this is safe to call any number of times on the same path, including
    /// concurrently.
    pub fn with_config(
        root: impl AsRef<Path>,
        config: &DeliveryConfig,
    ) -> Result<Self, Error> {
        let root = root.as_ref().to_owned();

        fs::create_dir_all(&root)?;
        for sub in &[TMP, Subdir::New.name(), Subdir::Cur.name()] {
            fs::DirBuilder::new()
                .mode(config.dir_mode)
                .create(root.join(sub))
                .ignore_already_exists()?;
        }

        Self::from_parts(root, config)
    }

    /// Open the Maildir at `root` without creating anything.
    ///
    /// Fails with `NxMaildir` if `root` does not have all of `tmp`, `new` and
    /// `cur` as directories.
    pub fn open_existing(
        root: impl AsRef<Path>,
        config: &DeliveryConfig,
    ) -> Result<Self, Error> {
        let root = root.as_ref().to_owned();

        for sub in &[TMP, Subdir::New.name(), Subdir::Cur.name()] {
            match fs::metadata(root.join(sub)) {
                Ok(md) if md.is_dir() => (),
                Ok(_) => {
                    return Err(Error::NxMaildir(root.display().to_string()))
                }
                Err(e) if io::ErrorKind::NotFound == e.kind() => {
                    return Err(Error::NxMaildir(root.display().to_string()))
                }
                Err(e) => return Err(e.into()),
            }
        }

        Self::from_parts(root, config)
    }

    fn from_parts(
        root: PathBuf,
        config: &DeliveryConfig,
    ) -> Result<Self, Error> {
        let host_name = if config.host_name.is_empty() {
            system_host_name()?
        } else {
            config.host_name.clone()
        };

        Ok(Maildir {
            root,
            names: UniqueNameGenerator::new(
                nix::unistd::getpid().as_raw(),
                sanitise_host_name(&host_name),
            ),
            sync_writes: config.sync_writes,
            file_mode: config.file_mode,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// The host name used in new message names, after sanitising.
    pub fn host_name(&self) -> &str {
        self.names.host_name()
    }

    /// The number of names this handle has generated.
    pub fn write_count(&self) -> u64 {
        self.names.counter()
    }

    /// Deliver `message` into `new`.
    ///
    /// Returns the unique name of the new message, which can later be passed
    /// to `open()`.
    pub fn write(&self, message: &Message) -> Result<String, Error> {
        let name = self.names.next_name()?;
        let tmp_path = self.root.join(TMP).join(&name);
        let new_path = self.root.join(Subdir::New.name()).join(&name);

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(self.file_mode)
            .open(&tmp_path)?;

        if let Err(e) = self.write_tmp(file, &tmp_path, message) {
            file_ops::remove_quietly(&tmp_path);
            return Err(e);
        }

        if let Err(e) = fs::rename(&tmp_path, &new_path) {
            error!(
                "Failed to move {} into {}: {}",
                tmp_path.display(),
                new_path.display(),
                e
            );
            return Err(e.into());
        }

        info!("Delivered {} to {}", name, self.root.display());
        Ok(name)
    }

    fn write_tmp(
        &self,
        file: fs::File,
        tmp_path: &Path,
        message: &Message,
    ) -> Result<(), Error> {
        // The mode given at creation is subject to the umask
        file_ops::chmod(tmp_path, self.file_mode)?;

        let mut writer = BufWriter::new(file);
        message.write_to(&mut writer)?;
        writer.flush()?;
        if self.sync_writes {
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    /// Read the message with the given unique name.
    ///
    /// The message is looked for in `new` first, then in `cur` allowing for
    /// an info suffix. Fails with `NxMessage` if it is in neither place, and
    /// with `AmbiguousMessage` if several files in `cur` match.
    pub fn open(&self, name: &str) -> Result<Message, Error> {
        let located = locate::open(&self.root, name)?;
        locate::read_message(located.file)
    }

    /// Find where the message with the given unique name currently lives,
    /// without reading it.
    pub fn locate(&self, name: &str) -> Result<(Subdir, PathBuf), Error> {
        let located = locate::open(&self.root, name)?;
        Ok((located.subdir, located.path))
    }

    /// Pass every message in `new` and `cur` to `handler`.
    ///
    /// `tmp` is not visited. Subdirectories, hidden files, and anything else
    /// which is not a regular file are skipped. Other than that, every entry
    /// is expected to be a message: iteration stops at the first entry that
    /// cannot be read or parsed, or whose name is not UTF-8, or at the first
    /// error from `handler`, and that error is returned. Use `scan()` to
    /// carry on past bad entries.
    ///
    /// Entries which disappear while iterating are skipped. A message moved
    /// from `new` to `cur` during iteration may therefore be missed or seen
    /// twice; messages are visited in no particular order in any case.
    pub fn each_message<E: From<Error>>(
        &self,
        mut handler: impl FnMut(StoredMessage) -> Result<(), E>,
    ) -> Result<(), E> {
        for &subdir in &[Subdir::New, Subdir::Cur] {
            for (path, file_name) in self.candidates(subdir)? {
                if let Some(message) =
                    read_candidate(subdir, &path, &file_name)?
                {
                    handler(message)?;
                }
            }
        }

        Ok(())
    }

    /// Like `each_message()`, but entries that cannot be read or parsed are
    /// skipped and collected in the returned report instead of stopping the
    /// scan.
    ///
    /// Errors from `handler`, or from listing `new` or `cur` themselves, still
    /// stop the scan.
    pub fn scan<E: From<Error>>(
        &self,
        mut handler: impl FnMut(StoredMessage) -> Result<(), E>,
    ) -> Result<ScanReport, E> {
        let mut report = ScanReport::default();

        for &subdir in &[Subdir::New, Subdir::Cur] {
            for (path, file_name) in self.candidates(subdir)? {
                match read_candidate(subdir, &path, &file_name) {
                    Ok(Some(message)) => {
                        handler(message)?;
                        report.delivered += 1;
                    }
                    Ok(None) => (),
                    Err(error) => {
                        warn!("Skipping {}: {}", path.display(), error);
                        report.skipped.push(SkippedEntry { path, error });
                    }
                }
            }
        }

        Ok(report)
    }

    /// List the entries of `subdir` which could be messages.
    fn candidates(
        &self,
        subdir: Subdir,
    ) -> Result<Vec<(PathBuf, OsString)>, Error> {
        let mut candidates = Vec::new();
        for entry in fs::read_dir(self.root.join(subdir.name()))? {
            let entry = entry?;
            let file_name = entry.file_name();

            if file_name.as_bytes().starts_with(b".") {
                continue;
            }

            // file_type() does not follow symlinks
            match fs::metadata(entry.path()) {
                Ok(md) if md.is_file() => (),
                Ok(_) => continue,
                Err(e) if io::ErrorKind::NotFound == e.kind() => continue,
                Err(e) => return Err(e.into()),
            }

            candidates.push((entry.path(), file_name));
        }

        Ok(candidates)
    }
}

/// Read one entry found by `Maildir::candidates()`.
///
/// Returns `None` if the entry is gone, which happens when a client moves or
/// renames it after the directory was listed. A file name which is not UTF-8
/// could never be passed to `Maildir::open()`, so it fails with `UnsafeName`.
fn read_candidate(
    subdir: Subdir,
    path: &Path,
    file_name: &OsStr,
) -> Result<Option<StoredMessage>, Error> {
    let file_name = file_name.to_str().ok_or(Error::UnsafeName)?;
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if io::ErrorKind::NotFound == e.kind() => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let message = locate::read_message(file)?;
    let (name, info) = split_info(file_name);
    Ok(Some(StoredMessage {
        name: name.to_owned(),
        subdir,
        info: info.map(str::to_owned),
        message,
    }))
}

fn system_host_name() -> Result<String, Error> {
    let mut buf = [0u8; 256];
    let host_name = nix::unistd::gethostname(&mut buf)?;
    Ok(host_name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::os::unix::fs::PermissionsExt;

    use proptest::prelude::*;
    use rayon::prelude::*;
    use tempfile::TempDir;

    use super::*;

    const HOST: &str = "test.example.org";

    fn config() -> DeliveryConfig {
        DeliveryConfig {
            host_name: HOST.to_owned(),
            ..DeliveryConfig::default()
        }
    }

    fn set_up() -> (TempDir, Maildir) {
        let root = TempDir::new().unwrap();
        let maildir =
            Maildir::with_config(root.path().join("Maildir"), &config())
                .unwrap();
        (root, maildir)
    }

    fn message(headers: &[(&str, &str)], body: &str) -> Message {
        Message::new(
            headers
                .iter()
                .map(|&(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            body.as_bytes().to_vec(),
        )
    }

    fn list(dir: impl AsRef<Path>) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    #[test]
    fn create_populates_children() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("a/b/Maildir");
        let maildir = Maildir::with_config(&path, &config()).unwrap();

        assert_eq!(path, maildir.path());
        assert!(path.join("tmp").is_dir());
        assert!(path.join("new").is_dir());
        assert!(path.join("cur").is_dir());
        assert_eq!(0, maildir.write_count());

        let mode = fs::metadata(path.join("new")).unwrap().permissions().mode();
        assert_eq!(0, mode & 0o077);
    }

    #[test]
    fn create_is_idempotent() {
        let (root, maildir) = set_up();
        let name = maildir.write(&message(&[("To", "a@x.org")], "hi")).unwrap();
        fs::write(maildir.path().join("tmp/in-flight"), b"partial").unwrap();
        fs::write(maildir.path().join("cur/seen:2,S"), b"\nseen").unwrap();

        let again =
            Maildir::with_config(root.path().join("Maildir/"), &config())
                .unwrap();

        assert_eq!(vec![name.clone()], list(again.path().join("new")));
        assert_eq!(
            vec!["in-flight".to_owned()],
            list(again.path().join("tmp"))
        );
        assert_eq!(
            vec!["seen:2,S".to_owned()],
            list(again.path().join("cur"))
        );
        assert_eq!(b"hi", again.open(&name).unwrap().raw_body());
    }

    #[test]
    fn uses_system_host_name_by_default() {
        let root = TempDir::new().unwrap();
        let maildir = Maildir::new(root.path()).unwrap();
        assert!(!maildir.host_name().is_empty());
        assert!(!maildir.host_name().contains('/'));
        assert!(!maildir.host_name().contains(':'));

        let name = maildir.write(&message(&[], "x")).unwrap();
        assert!(name.ends_with(&format!(".{}", maildir.host_name())));
    }

    #[test]
    fn configured_host_name_is_sanitised() {
        let root = TempDir::new().unwrap();
        let maildir = Maildir::with_config(
            root.path(),
            &DeliveryConfig {
                host_name: "evil/host:name".to_owned(),
                ..DeliveryConfig::default()
            },
        )
        .unwrap();

        assert_eq!("evil\\057host\\072name", maildir.host_name());
        let name = maildir.write(&message(&[], "x")).unwrap();
        assert!(name.ends_with(".evil\\057host\\072name"));
        assert!(maildir.path().join("new").join(&name).is_file());
    }

    #[test]
    fn write_and_open() {
        let (_root, maildir) = set_up();
        let original =
            message(&[("To", "a@x.org"), ("From", "b@y.net")], "hello");

        let name = maildir.write(&original).unwrap();
        assert!(name.ends_with(&format!(".{}", HOST)));
        assert!(name.contains(&format!("P{}Q1.", std::process::id())));

        let md = fs::metadata(maildir.path().join("new").join(&name)).unwrap();
        assert_eq!(
            ("To: a@x.org\n".len() + "From: b@y.net\n".len() + 1 + 5) as u64,
            md.len()
        );
        assert_eq!(0o600, md.permissions().mode() & 0o777);
        assert!(list(maildir.path().join("tmp")).is_empty());

        let reloaded = maildir.open(&name).unwrap();
        assert_eq!(original, reloaded);
        assert_eq!(
            (Subdir::New, maildir.path().join("new").join(&name)),
            maildir.locate(&name).unwrap()
        );
    }

    #[test]
    fn written_size_matches_raw_message() {
        let (_root, maildir) = set_up();
        let raw = "Content-Type: text/html\n\
                   From: recipient@example.net\n\
                   To: sender@example.org\n\
                   \n\
                   This is the email body";
        let original = Message::parse(raw.as_bytes()).unwrap();

        let name = maildir.write(&original).unwrap();
        let md = fs::metadata(maildir.path().join("new").join(&name)).unwrap();
        assert_eq!(raw.len() as u64, md.len());
        assert_eq!(
            raw.as_bytes(),
            &fs::read(maildir.path().join("new").join(&name)).unwrap()[..]
        );
    }

    #[test]
    fn open_after_client_moves_to_cur() {
        let (_root, maildir) = set_up();
        let original = message(&[("Subject", "moving")], "body\r\n");
        let name = maildir.write(&original).unwrap();

        let cur_path = maildir.path().join("cur").join(format!("{}:2,S", name));
        fs::rename(maildir.path().join("new").join(&name), &cur_path).unwrap();

        assert_eq!(original, maildir.open(&name).unwrap());
        assert_eq!(
            (Subdir::Cur, cur_path.clone()),
            maildir.locate(&name).unwrap()
        );

        // Flags changing again doesn't matter either
        let cur_path2 =
            maildir.path().join("cur").join(format!("{}:2,RS", name));
        fs::rename(&cur_path, &cur_path2).unwrap();
        assert_eq!(original, maildir.open(&name).unwrap());

        // Nothing was modified by looking
        assert_eq!(
            vec![format!("{}:2,RS", name)],
            list(maildir.path().join("cur"))
        );
        assert!(list(maildir.path().join("new")).is_empty());
    }

    #[test]
    fn open_missing_and_ambiguous() {
        let (_root, maildir) = set_up();
        let name = maildir.write(&message(&[], "x")).unwrap();

        assert_matches!(
            Err(Error::NxMessage),
            maildir.open("1.R00P1Q1.nowhere")
        );

        fs::rename(
            maildir.path().join("new").join(&name),
            maildir.path().join("cur").join(format!("{}:2,S", name)),
        )
        .unwrap();
        fs::write(
            maildir.path().join("cur").join(format!("{}:2,T", name)),
            b"\ncopy",
        )
        .unwrap();

        assert_matches!(
            Err(Error::AmbiguousMessage { .. }),
            maildir.open(&name)
        );
        assert_matches!(Err(Error::UnsafeName), maildir.open("../new"));
    }

    #[test]
    fn successive_writes_get_unique_names() {
        let (_root, maildir) = set_up();
        let m = message(&[("Subject", "same")], "same");

        let mut names = HashSet::new();
        for i in 1..=50u64 {
            assert!(names.insert(maildir.write(&m).unwrap()));
            assert_eq!(i, maildir.write_count());
        }
        assert_eq!(50, list(maildir.path().join("new")).len());
    }

    #[test]
    fn concurrent_writers_on_shared_handle() {
        let (_root, maildir) = set_up();
        let m = message(&[("Subject", "shared")], "shared");

        let names: Vec<String> = (0..200)
            .into_par_iter()
            .map(|_| maildir.write(&m).unwrap())
            .collect();

        let unique = names.iter().collect::<HashSet<_>>();
        assert_eq!(200, unique.len());
        assert_eq!(200, maildir.write_count());
        assert_eq!(200, list(maildir.path().join("new")).len());
    }

    #[test]
    fn concurrent_writers_with_own_handles() {
        let root = TempDir::new().unwrap();
        let m = message(&[("Subject", "separate")], "separate");

        let names: Vec<String> = (0..8)
            .into_par_iter()
            .flat_map(|_| {
                let maildir =
                    Maildir::with_config(root.path(), &config()).unwrap();
                (0..25)
                    .map(|_| maildir.write(&m).unwrap())
                    .collect::<Vec<_>>()
            })
            .collect();

        let unique = names.iter().collect::<HashSet<_>>();
        assert_eq!(200, unique.len());
        assert_eq!(200, list(root.path().join("new")).len());
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let (_root, maildir) = set_up();
        let bad = message(&[("Subject", "line\nbreak")], "x");

        assert_matches!(Err(Error::BadMessage(_)), maildir.write(&bad));
        assert!(list(maildir.path().join("tmp")).is_empty());
        assert!(list(maildir.path().join("new")).is_empty());
    }

    #[test]
    fn missing_tmp_fails_before_anything_is_published() {
        let (_root, maildir) = set_up();
        fs::remove_dir(maildir.path().join("tmp")).unwrap();

        let result = maildir.write(&message(&[], "x"));
        assert_matches!(Err(Error::Io(_)), result);
        assert!(list(maildir.path().join("new")).is_empty());
    }

    #[test]
    fn failed_rename_leaves_message_in_tmp() {
        let (_root, maildir) = set_up();
        fs::remove_dir(maildir.path().join("new")).unwrap();

        let result = maildir.write(&message(&[("Subject", "stuck")], "x"));
        assert_matches!(Err(Error::Io(_)), result);

        let tmp = list(maildir.path().join("tmp"));
        assert_eq!(1, tmp.len());
        assert!(tmp[0].ends_with(&format!(".{}", HOST)));
        assert_eq!(
            b"Subject: stuck\n\nx",
            &fs::read(maildir.path().join("tmp").join(&tmp[0])).unwrap()[..]
        );
        assert!(!maildir.path().join("new").exists());
        assert_matches!(Err(Error::NxMessage), maildir.open(&tmp[0]));
    }

    #[test]
    fn leading_whitespace_in_headers_survives_delivery() {
        let (_root, maildir) = set_up();
        let original =
            message(&[("X-Pad", "  padded"), ("X-Tab", "\tx")], "body");

        let name = maildir.write(&original).unwrap();
        assert_eq!(original, maildir.open(&name).unwrap());
    }

    #[test]
    fn open_existing_creates_nothing() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("Mialdir");

        assert_matches!(
            Err(Error::NxMaildir(_)),
            Maildir::open_existing(&path, &config())
        );
        assert!(!path.exists());

        fs::create_dir_all(path.join("new")).unwrap();
        fs::create_dir_all(path.join("cur")).unwrap();
        fs::write(path.join("tmp"), b"not a directory").unwrap();
        assert_matches!(
            Err(Error::NxMaildir(_)),
            Maildir::open_existing(&path, &config())
        );

        let (_root, created) = set_up();
        let name = created.write(&message(&[], "x")).unwrap();
        let existing =
            Maildir::open_existing(created.path(), &config()).unwrap();
        assert_eq!(HOST, existing.host_name());
        assert_eq!(b"x", existing.open(&name).unwrap().raw_body());
    }

    #[test]
    fn custom_file_mode_and_unsynced_writes() {
        let root = TempDir::new().unwrap();
        let maildir = Maildir::with_config(
            root.path(),
            &DeliveryConfig {
                host_name: HOST.to_owned(),
                sync_writes: false,
                file_mode: 0o640,
                dir_mode: 0o750,
            },
        )
        .unwrap();

        let name = maildir.write(&message(&[], "x")).unwrap();
        let md = fs::metadata(root.path().join("new").join(&name)).unwrap();
        assert_eq!(0o640, md.permissions().mode() & 0o777);
        assert_eq!(b"x", maildir.open(&name).unwrap().raw_body());
    }

    fn collect_all(maildir: &Maildir) -> Result<Vec<StoredMessage>, Error> {
        let mut seen = Vec::new();
        maildir.each_message(|m| {
            seen.push(m);
            Ok::<(), Error>(())
        })?;
        seen.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(seen)
    }

    #[test]
    fn each_message_visits_new_and_cur() {
        let (_root, maildir) = set_up();
        let n1 = maildir.write(&message(&[("Subject", "one")], "1")).unwrap();
        let n2 = maildir.write(&message(&[("Subject", "two")], "2")).unwrap();
        let n3 = maildir.write(&message(&[("Subject", "three")], "3")).unwrap();
        fs::rename(
            maildir.path().join("new").join(&n2),
            maildir.path().join("cur").join(format!("{}:2,FS", n2)),
        )
        .unwrap();

        // None of these are candidates
        fs::create_dir(maildir.path().join("new/subdir")).unwrap();
        fs::write(maildir.path().join("cur/.hidden"), b"not a message")
            .unwrap();
        fs::write(maildir.path().join("tmp/partial"), b"not a message")
            .unwrap();

        let seen = collect_all(&maildir).unwrap();
        let mut expected = vec![n1.clone(), n2.clone(), n3.clone()];
        expected.sort();
        assert_eq!(
            expected,
            seen.iter().map(|m| m.name.clone()).collect::<Vec<_>>()
        );

        for m in &seen {
            if m.name == n2 {
                assert_eq!(Subdir::Cur, m.subdir);
                assert_eq!(Some("2,FS"), m.info.as_deref());
                assert_eq!(Some("two"), m.message.header("Subject"));
            } else {
                assert_eq!(Subdir::New, m.subdir);
                assert_eq!(None, m.info);
            }
        }
    }

    #[test]
    fn each_message_stops_at_first_error() {
        let (_root, maildir) = set_up();
        for _ in 0..3 {
            maildir.write(&message(&[], "x")).unwrap();
        }

        let mut calls = 0;
        let result = maildir.each_message(|_| {
            calls += 1;
            Err(Error::BadMessage("handler says no".to_owned()))
        });
        assert_matches!(Err(Error::BadMessage(_)), result);
        assert_eq!(1, calls);

        fs::write(maildir.path().join("cur/garbage"), b"no colon\n\n").unwrap();
        assert_matches!(Err(Error::BadMessage(_)), collect_all(&maildir));
    }

    #[test]
    fn each_message_with_custom_error_type() {
        #[derive(Debug)]
        enum AppError {
            Store(Error),
            Stop,
        }

        impl From<Error> for AppError {
            fn from(e: Error) -> Self {
                AppError::Store(e)
            }
        }

        let (_root, maildir) = set_up();
        maildir.write(&message(&[], "x")).unwrap();

        assert_matches!(
            Err(AppError::Stop),
            maildir.each_message(|_| Err(AppError::Stop))
        );

        fs::remove_dir(maildir.path().join("cur")).unwrap();
        assert_matches!(
            Err(AppError::Store(Error::Io(_))),
            maildir.each_message(|_| Ok::<(), AppError>(()))
        );
    }

    #[test]
    fn scan_skips_bad_entries() {
        let (_root, maildir) = set_up();
        let good = maildir.write(&message(&[("Subject", "ok")], "ok")).unwrap();
        fs::write(maildir.path().join("cur/garbage:2,S"), b"no colon\n\n")
            .unwrap();

        let mut names = Vec::new();
        let report = maildir
            .scan(|m| {
                names.push(m.name);
                Ok::<(), Error>(())
            })
            .unwrap();

        assert_eq!(vec![good], names);
        assert_eq!(1, report.delivered);
        assert_eq!(1, report.skipped.len());
        assert_eq!(
            maildir.path().join("cur/garbage:2,S"),
            report.skipped[0].path
        );
        assert_matches!(&Error::BadMessage(_), &report.skipped[0].error);
    }

    #[test]
    fn non_utf8_names_are_not_reported_as_messages() {
        let (_root, maildir) = set_up();
        let good = maildir.write(&message(&[("Subject", "ok")], "ok")).unwrap();
        let bad_path = maildir
            .path()
            .join("cur")
            .join(OsStr::from_bytes(b"bad\xff:2,S"));
        fs::write(&bad_path, b"Subject: unreachable\n\n").unwrap();

        let mut names = Vec::new();
        let report = maildir
            .scan(|m| {
                names.push(m.name);
                Ok::<(), Error>(())
            })
            .unwrap();

        assert_eq!(vec![good], names);
        assert_eq!(1, report.delivered);
        assert_eq!(1, report.skipped.len());
        assert_eq!(bad_path, report.skipped[0].path);
        assert_matches!(&Error::UnsafeName, &report.skipped[0].error);

        assert_matches!(Err(Error::UnsafeName), collect_all(&maildir));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn write_open_round_trip(
            headers in prop::collection::btree_map(
                "[A-Za-z][A-Za-z0-9-]{0,15}",
                "[ -~\t]{0,40}",
                0..6,
            ),
            body in prop::collection::vec(any::<u8>(), 0..2048),
        ) {
            let (_root, maildir) = set_up();
            let original = Message::new(headers, body);

            let name = maildir.write(&original).unwrap();
            let md = fs::metadata(maildir.path().join("new").join(&name))
                .unwrap();
            prop_assert_eq!(original.serialized_len(), md.len());

            let reloaded = maildir.open(&name).unwrap();
            prop_assert_eq!(original.raw_body(), reloaded.raw_body());
            prop_assert_eq!(original.headers(), reloaded.headers());
        }
    }
}
