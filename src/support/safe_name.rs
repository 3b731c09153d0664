//-
// Copyright (c) 2026, Clientzone contributors
//
// This file is part of Clientzone.
//
// Clientzone is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Clientzone is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Clientzone. If not, see <http://www.gnu.org/licenses/>.

/// Determine whether the given configured root path is "safe".
///
/// This excludes empty paths, anything containing `..` (even where it would
/// not actually be a parent-directory component; the check is deliberately
/// textual), and ASCII control characters.
///
/// This does not care about whether the path exists or is a valid file name;
/// for that, we simply rely on the OS rejecting it later.
pub fn is_safe_root(path: &str) -> bool {
    let path = path.trim();
    !path.is_empty()
        && !path.contains("..")
        && path.find(|c| c < ' ' || c == '\x7F').is_none()
}
