// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::content::errors::{ItemError, ItemResult};
use crate::content::location::Location;
use crate::content::node::ContentNode;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

const TRANSCRIPT_FIELDS: &[&str] = &["sub", "transcripts", "youtube_id_1_0"];
const MAX_RECORDED_CHANGES: usize = 256;

/// Hook run after the settings of a video block were edited.
pub trait SubtitleManager: Send + Sync {
    fn manage_subtitles_save(
        &self,
        node: &ContentNode,
        old_metadata: &Map<String, Value>,
        user: &str,
    ) -> ItemResult<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptChange {
    pub location: Location,
    pub field: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
    pub user: String,
}

/// Keeps the most recent transcript field changes in memory.
#[derive(Default)]
pub struct TranscriptRecorder {
    changes: Mutex<VecDeque<TranscriptChange>>,
}

impl TranscriptRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<TranscriptChange> {
        self.changes
            .lock()
            .map(|changes| changes.iter().cloned().collect())
            .unwrap_or_default()
    }
}

pub fn diff_transcript_fields(
    old_metadata: &Map<String, Value>,
    new_metadata: &Map<String, Value>,
) -> Vec<(String, Option<Value>, Option<Value>)> {
    TRANSCRIPT_FIELDS
        .iter()
        .filter_map(|field| {
            let old = old_metadata.get(*field);
            let new = new_metadata.get(*field);
            (old != new).then(|| (field.to_string(), old.cloned(), new.cloned()))
        })
        .collect()
}

impl SubtitleManager for TranscriptRecorder {
    fn manage_subtitles_save(
        &self,
        node: &ContentNode,
        old_metadata: &Map<String, Value>,
        user: &str,
    ) -> ItemResult<()> {
        let diff = diff_transcript_fields(old_metadata, &node.metadata);
        if diff.is_empty() {
            return Ok(());
        }
        let mut changes = self
            .changes
            .lock()
            .map_err(|_| ItemError::store("transcript log lock poisoned"))?;
        for (field, old, new) in diff {
            log::info!("Transcript field {} of {} changed by {}", field, node.location, user);
            if changes.len() == MAX_RECORDED_CHANGES {
                changes.pop_front();
            }
            changes.push_back(TranscriptChange {
                location: node.location.clone(),
                field,
                old,
                new,
                user: user.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn video() -> ContentNode {
        ContentNode::new(Location::new("MITx", "999", "video", "v1").unwrap())
    }

    #[test]
    fn only_transcript_fields_are_recorded() {
        let recorder = TranscriptRecorder::new();
        let old = video().metadata;
        let mut node = video();
        node.metadata.insert("sub".to_string(), json!("abc"));
        node.metadata.insert("display_name".to_string(), json!("Lecture"));

        recorder.manage_subtitles_save(&node, &old, "alice@example.com").unwrap();
        let changes = recorder.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "sub");
        assert_eq!(changes[0].old, None);
        assert_eq!(changes[0].new, Some(json!("abc")));
    }

    #[test]
    fn unchanged_transcripts_record_nothing() {
        let recorder = TranscriptRecorder::new();
        let mut node = video();
        node.metadata.insert("transcripts".to_string(), json!({"en": "a.srt"}));
        let old = node.metadata.clone();
        recorder.manage_subtitles_save(&node, &old, "alice@example.com").unwrap();
        assert!(recorder.changes().is_empty());
    }
}
