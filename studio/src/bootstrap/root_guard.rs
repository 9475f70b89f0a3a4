// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
}

/// Everything a studio runtime root may hold.
const ROOT_LAYOUT: [(&str, EntryKind); 3] = [
    ("config.yaml", EntryKind::File),
    ("users.yaml", EntryKind::File),
    ("state", EntryKind::Dir),
];

/// Resolves the runtime root, creating it when missing, and refuses roots
/// that hold anything besides the studio layout.
pub fn ensure_root_is_clean(root: &Path) -> Result<PathBuf, BootstrapError> {
    let root_path = if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root.to_path_buf()
    };

    if !root_path.exists() {
        fs::create_dir_all(&root_path)?;
        log_action(format!("created runtime root {}", root_path.display()));
        return Ok(root_path);
    }
    if !root_path.is_dir() {
        return Err(invalid(format!(
            "Runtime root is not a directory: {}",
            root_path.display()
        )));
    }

    let mut problems = Vec::new();
    for entry in fs::read_dir(&root_path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type()?;
        match ROOT_LAYOUT.iter().find(|(expected, _)| *expected == name) {
            Some((_, EntryKind::File)) if !file_type.is_file() => {
                problems.push(format!("{} (expected a file)", name));
            }
            Some((_, EntryKind::Dir)) if !file_type.is_dir() => {
                problems.push(format!("{} (expected a directory)", name));
            }
            Some(_) => {}
            None => problems.push(name),
        }
    }

    if problems.is_empty() {
        return Ok(root_path);
    }
    problems.sort();
    let expected: Vec<&str> = ROOT_LAYOUT.iter().map(|(name, _)| *name).collect();
    Err(invalid(format!(
        "Runtime root '{}' contains unexpected entries: {}. Expected only: {}.",
        root_path.display(),
        problems.join(", "),
        expected.join(", ")
    )))
}

fn invalid(message: String) -> BootstrapError {
    BootstrapError::Io(io::Error::new(io::ErrorKind::InvalidInput, message))
}
