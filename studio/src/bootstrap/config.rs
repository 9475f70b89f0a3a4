// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use uuid::Uuid;

const DEFAULT_PORT: u16 = 8001;
const DEFAULT_WORKERS: u16 = 4;

pub fn ensure_config(root: &Path) -> Result<bool, BootstrapError> {
    let config_path = root.join("config.yaml");

    if config_path.exists() {
        return Ok(false);
    }

    let contents = default_config_yaml(&generate_jwt_secret());

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&config_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(BootstrapError::Io(err)),
    };

    file.write_all(contents.as_bytes())?;
    file.sync_all()?;

    log_action(format!(
        "created config.yaml (http port {}, demo course MITx/999/2014)",
        DEFAULT_PORT
    ));

    Ok(true)
}

/// 256 bits from two v4 uuids, hex encoded.
fn generate_jwt_secret() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

fn default_config_yaml(jwt_secret: &str) -> String {
    format!(
        "server:\n  host: \"127.0.0.1\"\n  port: {port}\n  workers: {workers}\n\napp:\n  name: \"Studio\"\n  description: \"Course authoring item service\"\n\nlogging:\n  level: \"info\"\n\nauth:\n  jwt:\n    secret: \"{jwt_secret}\"\n\nstore:\n  persist: true\n\nblocking:\n  workers: 4\n  overflow_workers: 2\n\ncourses:\n  - org: \"MITx\"\n    course: \"999\"\n    run: \"2014\"\n    display_name: \"Robot Super Course\"\n",
        port = DEFAULT_PORT,
        workers = DEFAULT_WORKERS,
        jwt_secret = jwt_secret,
    )
}
