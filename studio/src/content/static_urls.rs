// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static STATIC_URL_REGEX: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r#"(?P<quote>["'])/static/(?P<rest>[^"'?#]+)(?P<suffix>[^"']*)["']"#));

/// Rewrites quoted `/static/<path>` references to the course asset
/// namespace `/c4x/<org>/<course>/asset/<path>`, flattening sub paths.
pub fn replace_static_urls(text: &str, org: &str, course: &str) -> String {
    let regex = match STATIC_URL_REGEX.as_ref() {
        Ok(regex) => regex,
        Err(err) => {
            log::error!("Static url pattern failed to compile: {}", err);
            return text.to_string();
        }
    };
    regex
        .replace_all(text, |caps: &Captures| {
            let quote = &caps["quote"];
            // A mismatched closing quote means this is not one quoted url.
            if !caps[0].ends_with(quote) {
                return caps[0].to_string();
            }
            format!(
                "{quote}/c4x/{org}/{course}/asset/{asset}{suffix}{quote}",
                quote = quote,
                org = org,
                course = course,
                asset = caps["rest"].replace('/', "_"),
                suffix = &caps["suffix"],
            )
        })
        .into_owned()
}
