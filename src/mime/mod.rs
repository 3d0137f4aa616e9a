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

//! The minimal message model needed to store and retrieve messages.
//!
//! A stored message is a block of `Name: value` header lines, an empty line,
//! and then the body. Nothing here understands MIME; the body is carried as
//! opaque bytes and comes back exactly as it went in. Headers are a plain
//! mapping, so their order in the file carries no meaning.

pub mod message;
