// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const LOCATION_SCHEME: &str = "i4x://";
pub const COURSE_CATEGORY: &str = "course";
pub const DEFAULT_BRANCH: &str = "draft";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    Empty,
    MissingScheme,
    WrongSegmentCount { expected: usize, found: usize },
    InvalidSegment(String),
    MissingMarker(&'static str),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::Empty => write!(f, "address must not be empty"),
            AddressError::MissingScheme => {
                write!(f, "location must start with '{}'", LOCATION_SCHEME)
            }
            AddressError::WrongSegmentCount { expected, found } => write!(
                f,
                "address must have {} segments, found {}",
                expected, found
            ),
            AddressError::InvalidSegment(segment) => {
                write!(f, "address segment '{}' contains invalid characters", segment)
            }
            AddressError::MissingMarker(marker) => {
                write!(f, "locator is missing the '{}' marker", marker)
            }
        }
    }
}

impl std::error::Error for AddressError {}

pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | ':' | '~'))
}

fn checked_segment(segment: &str) -> Result<String, AddressError> {
    if is_valid_segment(segment) {
        Ok(segment.to_string())
    } else {
        Err(AddressError::InvalidSegment(segment.to_string()))
    }
}

/// Storage address of one content node: `i4x://org/course/category/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location {
    pub org: String,
    pub course: String,
    pub category: String,
    pub name: String,
}

impl Location {
    pub fn new(org: &str, course: &str, category: &str, name: &str) -> Result<Self, AddressError> {
        Ok(Self {
            org: checked_segment(org)?,
            course: checked_segment(course)?,
            category: checked_segment(category)?,
            name: checked_segment(name)?,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }
        let rest = trimmed
            .strip_prefix(LOCATION_SCHEME)
            .ok_or(AddressError::MissingScheme)?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != 4 {
            return Err(AddressError::WrongSegmentCount {
                expected: 4,
                found: parts.len(),
            });
        }
        Self::new(parts[0], parts[1], parts[2], parts[3])
    }

    pub fn url(&self) -> String {
        format!(
            "{}{}/{}/{}/{}",
            LOCATION_SCHEME, self.org, self.course, self.category, self.name
        )
    }

    /// Sibling address in the same course with a different category and name.
    pub fn replace_category_name(&self, category: &str, name: &str) -> Location {
        Location {
            org: self.org.clone(),
            course: self.course.clone(),
            category: category.to_string(),
            name: name.to_string(),
        }
    }

    pub fn replace_name(&self, name: &str) -> Location {
        self.replace_category_name(&self.category, name)
    }

    pub fn same_course(&self, other: &Location) -> bool {
        self.org == other.org && self.course == other.course
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

impl FromStr for Location {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Location::parse(s)
    }
}

impl TryFrom<String> for Location {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Location::parse(&value)
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.url()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseKey {
    pub org: String,
    pub course: String,
    pub run: String,
}

impl CourseKey {
    pub fn new(org: &str, course: &str, run: &str) -> Result<Self, AddressError> {
        for segment in [org, course, run] {
            // Package ids join the parts with '.', so the parts themselves must not contain one.
            if !is_valid_segment(segment) || segment.contains('.') {
                return Err(AddressError::InvalidSegment(segment.to_string()));
            }
        }
        Ok(Self {
            org: org.to_string(),
            course: course.to_string(),
            run: run.to_string(),
        })
    }

    pub fn package_id(&self) -> String {
        format!("{}.{}.{}", self.org, self.course, self.run)
    }

    pub fn course_id(&self) -> String {
        format!("{}/{}/{}", self.org, self.course, self.run)
    }

    pub fn root_location(&self) -> Location {
        Location {
            org: self.org.clone(),
            course: self.course.clone(),
            category: COURSE_CATEGORY.to_string(),
            name: self.run.clone(),
        }
    }
}

/// Client-facing block address:
/// `package_id/branch/<branch>[/version/<guid>]/block/<block_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub package_id: String,
    pub branch: String,
    pub version_guid: Option<String>,
    pub block_id: String,
}

impl Locator {
    pub fn new(
        package_id: &str,
        branch: &str,
        version_guid: Option<&str>,
        block_id: &str,
    ) -> Result<Self, AddressError> {
        Ok(Self {
            package_id: checked_segment(package_id)?,
            branch: checked_segment(branch)?,
            version_guid: version_guid.map(checked_segment).transpose()?,
            block_id: checked_segment(block_id)?,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }
        let parts: Vec<&str> = trimmed.split('/').collect();
        match parts.as_slice() {
            [package_id, "branch", branch, "block", block_id] => {
                Self::new(package_id, branch, None, block_id)
            }
            [package_id, "branch", branch, "version", version, "block", block_id] => {
                Self::new(package_id, branch, Some(version), block_id)
            }
            [_, "branch", ..] => Err(AddressError::MissingMarker("block")),
            _ => Err(AddressError::MissingMarker("branch")),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_guid {
            Some(version) => write!(
                f,
                "{}/branch/{}/version/{}/block/{}",
                self.package_id, self.branch, version, self.block_id
            ),
            None => write!(
                f,
                "{}/branch/{}/block/{}",
                self.package_id, self.branch, self.block_id
            ),
        }
    }
}

impl FromStr for Locator {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_url_roundtrip() {
        let location = Location::new("MITx", "999", "vertical", "a1b2").unwrap();
        assert_eq!(location.url(), "i4x://MITx/999/vertical/a1b2");
        assert_eq!(Location::parse(&location.url()).unwrap(), location);
    }

    #[test]
    fn location_rejects_bad_scheme_and_segments() {
        assert_eq!(
            Location::parse("MITx/999/vertical/a1b2"),
            Err(AddressError::MissingScheme)
        );
        assert!(matches!(
            Location::parse("i4x://MITx/999/vertical"),
            Err(AddressError::WrongSegmentCount { found: 3, .. })
        ));
        assert!(matches!(
            Location::parse("i4x://MITx/999/vertical/a b"),
            Err(AddressError::InvalidSegment(_))
        ));
    }

    #[test]
    fn location_serializes_as_url_string() {
        let location = Location::new("MITx", "999", "html", "intro").unwrap();
        let json = serde_json::to_string(&location).unwrap();
        assert_eq!(json, "\"i4x://MITx/999/html/intro\"");
        let back: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(back, location);
    }

    #[test]
    fn locator_parses_with_and_without_version() {
        let plain = Locator::parse("MITx.999.2014/branch/draft/block/intro").unwrap();
        assert_eq!(plain.package_id, "MITx.999.2014");
        assert_eq!(plain.version_guid, None);
        assert_eq!(plain.to_string(), "MITx.999.2014/branch/draft/block/intro");

        let versioned =
            Locator::parse("MITx.999.2014/branch/draft/version/abc123/block/intro").unwrap();
        assert_eq!(versioned.version_guid.as_deref(), Some("abc123"));
        assert_eq!(
            versioned.to_string(),
            "MITx.999.2014/branch/draft/version/abc123/block/intro"
        );
    }

    #[test]
    fn locator_rejects_missing_markers() {
        assert_eq!(
            Locator::parse("MITx.999.2014/block/intro"),
            Err(AddressError::MissingMarker("branch"))
        );
        assert_eq!(
            Locator::parse("MITx.999.2014/branch/draft/intro"),
            Err(AddressError::MissingMarker("block"))
        );
    }

    #[test]
    fn course_key_rejects_dotted_parts() {
        assert!(CourseKey::new("MITx", "6.002", "2014").is_err());
        let key = CourseKey::new("MITx", "999", "2014").unwrap();
        assert_eq!(key.package_id(), "MITx.999.2014");
        assert_eq!(key.root_location().url(), "i4x://MITx/999/course/2014");
    }
}
