// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use crate::config::{
    AppConfig, AuthConfig, BlockingConfig, CourseConfig, JwtConfig, LoggingConfig, ServerConfig,
    StoreConfig, ValidatedConfig,
};

#[derive(Debug, Clone)]
pub struct TestConfigBuilder {
    config: ValidatedConfig,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ValidatedConfig {
                server: ServerConfig {
                    host: "127.0.0.1".to_string(),
                    port: 5466,
                    workers: 1,
                },
                app: AppConfig {
                    name: "Test Studio".to_string(),
                    description: "Test Description".to_string(),
                },
                logging: LoggingConfig {
                    level: "info".to_string(),
                },
                auth: AuthConfig {
                    jwt: JwtConfig {
                        secret: "test-secret".to_string(),
                        issuer: "studio".to_string(),
                        audience: "studio-authors".to_string(),
                        expiration_hours: 12,
                        cookie_name: "studio_jwt".to_string(),
                    },
                },
                store: StoreConfig { persist: false },
                blocking: BlockingConfig {
                    workers: 2,
                    overflow_workers: 1,
                },
                courses: vec![CourseConfig {
                    org: "MITx".to_string(),
                    course: "999".to_string(),
                    run: "2014".to_string(),
                    display_name: Some("Robot Super Course".to_string()),
                }],
            },
        }
    }

    pub fn with_persistence(mut self, persist: bool) -> Self {
        self.config.store.persist = persist;
        self
    }

    pub fn with_blocking(mut self, workers: usize, overflow_workers: usize) -> Self {
        self.config.blocking = BlockingConfig {
            workers,
            overflow_workers,
        };
        self
    }

    pub fn with_course(mut self, org: &str, course: &str, run: &str) -> Self {
        self.config.courses.push(CourseConfig {
            org: org.to_string(),
            course: course.to_string(),
            run: run.to_string(),
            display_name: None,
        });
        self
    }

    pub fn build(self) -> ValidatedConfig {
        self.config
    }
}

pub fn test_config() -> ValidatedConfig {
    TestConfigBuilder::new().build()
}
