//! The backing verification document: features plus aggregate statistics

use super::feature::Feature;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_version() -> u32 {
    1
}

/// Top-level structure of `.verification.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VerificationDocument {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Features keyed by stable id
    #[serde(default)]
    pub features: BTreeMap<String, Feature>,

    #[serde(default)]
    pub statistics: Statistics,
}

impl VerificationDocument {
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.get(id)
    }

    pub fn feature_mut(&mut self, id: &str) -> Option<&mut Feature> {
        self.features.get_mut(id)
    }

    /// Recompute `statistics` from the current feature set
    pub fn refresh_statistics(&mut self) {
        self.statistics = Statistics::from_features(self.features.values());
    }

    /// Group feature ids by category in the caller-defined order
    ///
    /// Categories named in `order` come first, in that order. Remaining
    /// categories follow alphabetically, and features without a category land
    /// in a trailing `uncategorized` group. Within a group ids are sorted.
    pub fn grouped(&self, order: &[String]) -> Vec<FeatureGroup> {
        let mut buckets: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (id, feature) in &self.features {
            let category = feature.category.as_deref().unwrap_or(UNCATEGORIZED);
            buckets.entry(category).or_default().push(id.clone());
        }

        let mut groups = Vec::new();
        for name in order {
            if let Some(ids) = buckets.remove(name.as_str()) {
                groups.push(FeatureGroup {
                    name: name.clone(),
                    feature_ids: ids,
                });
            }
        }

        let uncategorized = buckets.remove(UNCATEGORIZED);
        for (name, ids) in buckets {
            groups.push(FeatureGroup {
                name: name.to_string(),
                feature_ids: ids,
            });
        }
        if let Some(ids) = uncategorized {
            groups.push(FeatureGroup {
                name: UNCATEGORIZED.to_string(),
                feature_ids: ids,
            });
        }

        groups
    }
}

/// Group name for features without a category
pub const UNCATEGORIZED: &str = "uncategorized";

/// A named, ordered set of feature ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureGroup {
    pub name: String,
    pub feature_ids: Vec<String>,
}

/// Count and percentage for one verification track
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Coverage {
    pub verified: usize,
    pub coverage_percent: f64,
}

impl Coverage {
    pub fn new(verified: usize, total: usize) -> Self {
        Self {
            verified,
            coverage_percent: percent(verified, total),
        }
    }
}

/// Aggregate checklist statistics persisted after each machine run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    #[serde(default)]
    pub total_items: usize,
    #[serde(default)]
    pub machine: Coverage,
    #[serde(default)]
    pub human: Coverage,
    /// Items verified on both tracks
    #[serde(default)]
    pub fully_verified: Coverage,
}

impl Statistics {
    pub fn from_features<'a>(features: impl IntoIterator<Item = &'a Feature>) -> Self {
        let mut total = 0;
        let mut machine = 0;
        let mut human = 0;
        let mut both = 0;

        for item in features.into_iter().flat_map(|f| f.checklist.iter()) {
            total += 1;
            let by_machine = item.machine_verified();
            if by_machine {
                machine += 1;
            }
            if item.completed {
                human += 1;
            }
            if by_machine && item.completed {
                both += 1;
            }
        }

        Self {
            total_items: total,
            machine: Coverage::new(machine, total),
            human: Coverage::new(human, total),
            fully_verified: Coverage::new(both, total),
        }
    }
}

/// Percentage rounded to one decimal place; 0 when `total` is 0
pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((part as f64 * 1000.0) / total as f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feature::ChecklistItem;
    use crate::models::machine::MachineSpec;

    fn feature(category: Option<&str>) -> Feature {
        let mut feature = Feature::new("f");
        feature.category = category.map(str::to_string);
        feature
    }

    #[test]
    fn test_grouped_respects_configured_order() {
        let mut doc = VerificationDocument::default();
        doc.features.insert("restore".into(), feature(Some("core")));
        doc.features.insert("backup".into(), feature(Some("core")));
        doc.features.insert("deploy".into(), feature(Some("release")));
        doc.features.insert("badges".into(), feature(None));
        doc.features.insert("audit".into(), feature(Some("extras")));

        let groups = doc.grouped(&["release".to_string(), "core".to_string()]);
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["release", "core", "extras", UNCATEGORIZED]);
        assert_eq!(groups[1].feature_ids, vec!["backup", "restore"]);
    }

    #[test]
    fn test_statistics() {
        let mut f = Feature::new("Backup");
        let mut machine = MachineSpec::default();
        machine.state.verified = true;

        let mut both = ChecklistItem::new("both").with_machine(machine.clone());
        both.completed = true;
        let machine_only = ChecklistItem::new("machine").with_machine(machine);
        let mut human_only = ChecklistItem::new("human");
        human_only.completed = true;
        let neither = ChecklistItem::new("neither");

        f.checklist = vec![both, machine_only, human_only, neither];

        let stats = Statistics::from_features([&f]);
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.machine.verified, 2);
        assert_eq!(stats.machine.coverage_percent, 50.0);
        assert_eq!(stats.human.verified, 2);
        assert_eq!(stats.fully_verified.verified, 1);
        assert_eq!(stats.fully_verified.coverage_percent, 25.0);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(1, 3), 33.3);
        assert_eq!(percent(2, 3), 66.7);
        assert_eq!(percent(3, 3), 100.0);
    }
}
