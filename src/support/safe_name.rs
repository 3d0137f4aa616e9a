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

/// Determine whether the given message name is "safe".
///
/// Message names are joined onto the `new` and `cur` directories, so this
/// excludes empty names and anything that could escape those directories or
/// refer to something other than a plain entry within them. Hidden names are
/// rejected too, since Maildir readers ignore dot files.
///
/// This does not check that the name has the shape of a name we would
/// generate; names written by other Maildir writers are perfectly valid.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty() &&
        // Block directory traversal through .. and hidden files
        name.chars().next() != Some('.') &&
        name.find('/').is_none() &&
        // Only a path separator on Windows, but always block since it has high
        // potential of causing problems
        name.find('\\').is_none() &&
        // Don't allow any ASCII control characters, which includes NUL
        name.find(|c| c < ' ' || c == '\x7F').is_none()
}

/// Make `host_name` usable as the last component of a message name.
///
/// Following the Maildir convention, `/` is replaced with `\057` and `:` with
/// `\072`. A `/` would otherwise create a path separator and a `:` would be
/// taken as the start of the info suffix by other readers.
pub fn sanitise_host_name(host_name: &str) -> String {
    let mut out = String::with_capacity(host_name.len());
    for ch in host_name.chars() {
        match ch {
            '/' => out.push_str("\\057"),
            ':' => out.push_str("\\072"),
            ch => out.push(ch),
        }
    }
    out
}
