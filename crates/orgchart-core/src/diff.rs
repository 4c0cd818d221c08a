//! Snapshot comparison.
//!
//! [`diff`] labels every record of the target document relative to the base document. The
//! comparison is asymmetric: names that only exist in the base are not labeled. Use
//! [`DiffReport::removed_names`] when the deletions are needed.

use crate::record::{Document, Record};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLabel {
    /// Present in the target only.
    New,
    /// Lower level number in the target.
    Promoted,
    /// Higher level number in the target.
    Demoted,
    /// Same level, different parent.
    Moved,
}

/// Presentation name for [`DiffLabel::Demoted`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffVocabulary {
    #[default]
    Demoted,
    Realigned,
}

impl FromStr for DiffVocabulary {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demoted" => Ok(Self::Demoted),
            "realigned" => Ok(Self::Realigned),
            _ => Err(()),
        }
    }
}

impl DiffLabel {
    pub fn as_str(self, vocabulary: DiffVocabulary) -> &'static str {
        match (self, vocabulary) {
            (Self::New, _) => "new",
            (Self::Promoted, _) => "promoted",
            (Self::Demoted, DiffVocabulary::Demoted) => "demoted",
            (Self::Demoted, DiffVocabulary::Realigned) => "realigned",
            (Self::Moved, _) => "moved",
        }
    }

    pub fn css_class(self, vocabulary: DiffVocabulary) -> &'static str {
        match (self, vocabulary) {
            (Self::New, _) => "diff-new",
            (Self::Promoted, _) => "diff-promoted",
            (Self::Demoted, DiffVocabulary::Demoted) => "diff-demoted",
            (Self::Demoted, DiffVocabulary::Realigned) => "diff-realigned",
            (Self::Moved, _) => "diff-moved",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub record: Record,
    pub label: Option<DiffLabel>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub new: usize,
    pub promoted: usize,
    pub demoted: usize,
    pub moved: usize,
    pub unchanged: usize,
}

/// Target records annotated with their labels, in target document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffReport {
    entries: IndexMap<String, DiffEntry>,
}

pub fn diff(base: &Document, target: &Document) -> DiffReport {
    let entries = target
        .records()
        .map(|record| {
            let label = classify(base.get(&record.name), record);
            (
                record.name.clone(),
                DiffEntry {
                    record: record.clone(),
                    label,
                },
            )
        })
        .collect();
    let report = DiffReport { entries };
    let summary = report.summary();
    tracing::debug!(
        new = summary.new,
        promoted = summary.promoted,
        demoted = summary.demoted,
        moved = summary.moved,
        "compared org snapshots"
    );
    report
}

fn classify(base: Option<&Record>, target: &Record) -> Option<DiffLabel> {
    let Some(base) = base else {
        return Some(DiffLabel::New);
    };
    if let (Some(before), Some(after)) = (base.level, target.level) {
        if after < before {
            return Some(DiffLabel::Promoted);
        }
        if after > before {
            return Some(DiffLabel::Demoted);
        }
    }
    if base.level == target.level && base.under != target.under {
        return Some(DiffLabel::Moved);
    }
    None
}

impl DiffReport {
    pub fn get(&self, name: &str) -> Option<&DiffEntry> {
        self.entries.get(name)
    }

    pub fn label_of(&self, name: &str) -> Option<DiffLabel> {
        self.entries.get(name).and_then(|e| e.label)
    }

    pub fn entries(&self) -> impl Iterator<Item = &DiffEntry> {
        self.entries.values()
    }

    /// Records that carry a label.
    pub fn labeled(&self) -> impl Iterator<Item = (&str, DiffLabel)> {
        self.entries
            .iter()
            .filter_map(|(name, e)| e.label.map(|l| (name.as_str(), l)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        let mut s = DiffSummary::default();
        for e in self.entries.values() {
            match e.label {
                Some(DiffLabel::New) => s.new += 1,
                Some(DiffLabel::Promoted) => s.promoted += 1,
                Some(DiffLabel::Demoted) => s.demoted += 1,
                Some(DiffLabel::Moved) => s.moved += 1,
                None => s.unchanged += 1,
            }
        }
        s
    }

    /// Names present in `base` but absent from the compared target. Not part of the label set.
    pub fn removed_names<'a>(&self, base: &'a Document) -> Vec<&'a str> {
        base.names()
            .filter(|name| !self.entries.contains_key(*name))
            .collect()
    }

    /// `{ name: label | null }` in target order.
    pub fn labels_value(&self, vocabulary: DiffVocabulary) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(name, e)| {
                    let label = e
                        .label
                        .map(|l| Value::from(l.as_str(vocabulary)))
                        .unwrap_or(Value::Null);
                    (name.clone(), label)
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(&value).unwrap()
    }

    #[test]
    fn identical_documents_have_no_labels() {
        let d = doc(json!({
            "CEO": { "level": 1 },
            "VP": { "level": 2, "under": "CEO" },
            "Dev": { "level": 3, "under": "VP", "position": "Engineer" }
        }));
        let report = diff(&d, &d);
        assert_eq!(report.labeled().count(), 0);
        assert_eq!(report.summary().unchanged, 3);
    }

    #[test]
    fn promotion_to_level_one() {
        let base = doc(json!({ "A": { "level": 2, "under": "X" } }));
        let target = doc(json!({ "A": { "level": 1, "under": null } }));
        assert_eq!(diff(&base, &target).label_of("A"), Some(DiffLabel::Promoted));
    }

    #[test]
    fn single_level_decrease_labels_only_that_record() {
        let base = doc(json!({
            "CEO": { "level": 1 },
            "VP": { "level": 2, "under": "CEO" },
            "Dev": { "level": 3, "under": "VP" }
        }));
        let target = doc(json!({
            "CEO": { "level": 1 },
            "VP": { "level": 2, "under": "CEO" },
            "Dev": { "level": 2, "under": "VP" }
        }));
        let report = diff(&base, &target);
        assert_eq!(
            report.labeled().collect::<Vec<_>>(),
            [("Dev", DiffLabel::Promoted)]
        );
    }

    #[test]
    fn labels_cover_new_demoted_and_moved() {
        let base = doc(json!({
            "CEO": { "level": 1 },
            "A": { "level": 2, "under": "CEO" },
            "B": { "level": 2, "under": "CEO" },
            "C": { "level": 3, "under": "A" }
        }));
        let target = doc(json!({
            "CEO": { "level": 1 },
            "A": { "level": 2, "under": "CEO" },
            "B": { "level": 3, "under": "A" },
            "C": { "level": 3, "under": "B" },
            "D": { "level": 3, "under": "A" }
        }));
        let report = diff(&base, &target);
        assert_eq!(report.label_of("B"), Some(DiffLabel::Demoted));
        assert_eq!(report.label_of("C"), Some(DiffLabel::Moved));
        assert_eq!(report.label_of("D"), Some(DiffLabel::New));
        assert_eq!(report.label_of("A"), None);
    }

    #[test]
    fn deletions_are_not_labeled_but_can_be_listed() {
        let base = doc(json!({ "CEO": { "level": 1 }, "Gone": { "level": 2, "under": "CEO" } }));
        let target = doc(json!({ "CEO": { "level": 1 } }));
        let report = diff(&base, &target);
        assert!(report.get("Gone").is_none());
        assert_eq!(report.removed_names(&base), ["Gone"]);
    }

    #[test]
    fn realigned_vocabulary_only_changes_presentation() {
        assert_eq!(DiffLabel::Demoted.as_str(DiffVocabulary::Realigned), "realigned");
        assert_eq!(DiffLabel::Demoted.css_class(DiffVocabulary::Demoted), "diff-demoted");
        assert_eq!(DiffLabel::Moved.as_str(DiffVocabulary::Realigned), "moved");
    }

    #[test]
    fn labels_value_keeps_target_order() {
        let base = doc(json!({ "A": { "level": 1 } }));
        let target = doc(json!({ "B": { "level": 2, "under": "A" }, "A": { "level": 1 } }));
        let value = diff(&base, &target).labels_value(DiffVocabulary::Demoted);
        assert_eq!(value, json!({ "B": "new", "A": null }));
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["B", "A"]);
    }

    #[test]
    fn missing_level_on_one_side_falls_back_to_parent_comparison() {
        let base = doc(json!({ "A": { "under": "X" } }));
        let target = doc(json!({ "A": { "level": 2, "under": "X" } }));
        assert_eq!(diff(&base, &target).label_of("A"), None);
    }
}
