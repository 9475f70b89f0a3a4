// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::types::User;
use crate::content::location::Location;

pub const INSTRUCTOR_ROLE_PREFIX: &str = "instructor:";
pub const COURSE_STAFF_ROLE_PREFIX: &str = "staff:";

/// Capability checks the item operations ask before touching a course.
pub trait AccessCheck: Send + Sync {
    /// Whether the user may author content in the course owning `course_location`.
    fn has_course_access(&self, user: &User, course_location: &Location) -> bool;

    /// Global staff, required for destructive course-wide operations.
    fn is_staff(&self, user: &User) -> bool;
}

/// Role-membership check: global `staff`, or `instructor:<org>/<course>` /
/// `staff:<org>/<course>` for a single course.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleAccess;

pub fn course_role(prefix: &str, location: &Location) -> String {
    format!("{}{}/{}", prefix, location.org, location.course)
}

impl AccessCheck for RoleAccess {
    fn has_course_access(&self, user: &User, course_location: &Location) -> bool {
        user.is_staff()
            || user.has_role(&course_role(INSTRUCTOR_ROLE_PREFIX, course_location))
            || user.has_role(&course_role(COURSE_STAFF_ROLE_PREFIX, course_location))
    }

    fn is_staff(&self, user: &User) -> bool {
        user.is_staff()
    }
}
