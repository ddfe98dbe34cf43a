//! Report data model.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fixed, ordered recruiting funnel stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunnelStage {
    Contact,
    HrInterview,
    ClientInterview,
    FinalInterview,
    Offer,
    Hired,
}

impl FunnelStage {
    pub const COUNT: usize = 6;

    pub const ALL: [FunnelStage; Self::COUNT] = [
        Self::Contact,
        Self::HrInterview,
        Self::ClientInterview,
        Self::FinalInterview,
        Self::Offer,
        Self::Hired,
    ];

    /// Position in the funnel (0-based).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column label used in the cache file, the dashboard and the export.
    pub fn column_name(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::HrInterview => "HR interview",
            Self::ClientInterview => "client interview",
            Self::FinalInterview => "final interview",
            Self::Offer => "offer made",
            Self::Hired => "hired",
        }
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.column_name() == name)
    }

    /// This stage and every stage before it.
    pub fn up_to(self) -> &'static [FunnelStage] {
        &Self::ALL[..=self.index()]
    }
}

impl fmt::Display for FunnelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// All-time total and this week's factual count for one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCount {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub current: u64,
}

impl fmt::Display for StageCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.total, self.current)
    }
}

/// Per-stage counts; always holds every stage, in funnel order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCounts([StageCount; FunnelStage::COUNT]);

impl StageCounts {
    pub fn get(&self, stage: FunnelStage) -> StageCount {
        self.0[stage.index()]
    }

    pub fn get_mut(&mut self, stage: FunnelStage) -> &mut StageCount {
        &mut self.0[stage.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (FunnelStage, StageCount)> + '_ {
        FunnelStage::ALL.into_iter().map(|stage| (stage, self.get(stage)))
    }
}

// Serialized as one key per stage so rows can flatten the counts inline.
impl Serialize for StageCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FunnelStage::COUNT))?;
        for (stage, count) in self.iter() {
            map.serialize_entry(stage.column_name(), &count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StageCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StageCountsVisitor;

        impl<'de> Visitor<'de> for StageCountsVisitor {
            type Value = StageCounts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of funnel stage names to counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<StageCounts, A::Error> {
                let mut counts = StageCounts::default();
                while let Some(key) = map.next_key::<String>()? {
                    match FunnelStage::from_column_name(&key) {
                        Some(stage) => *counts.get_mut(stage) = map.next_value()?,
                        None => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(counts)
            }
        }

        deserializer.deserialize_map(StageCountsVisitor)
    }
}

/// One dashboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyFunnelRow {
    pub vacancy_name: String,
    #[serde(flatten)]
    pub stage_counts: StageCounts,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub is_priority: bool,
    /// Coworker ids with access to the vacancy; drives the recruiter filter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<u64>,
}

impl VacancyFunnelRow {
    pub fn new(vacancy_name: impl Into<String>, is_priority: bool) -> Self {
        Self {
            vacancy_name: vacancy_name.into(),
            stage_counts: StageCounts::default(),
            comment: String::new(),
            is_priority,
            members: Vec::new(),
        }
    }
}

/// Coworker id -> display name.
pub type Coworkers = BTreeMap<u64, String>;

/// Output of one fetch cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub rows: Vec<VacancyFunnelRow>,
    pub coworkers: Coworkers,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(mut rows: Vec<VacancyFunnelRow>, coworkers: Coworkers) -> Self {
        sort_priority_first(&mut rows);
        Self {
            rows,
            coworkers,
            generated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Priority rows first; relative order is kept inside each group.
pub fn sort_priority_first(rows: &mut [VacancyFunnelRow]) {
    rows.sort_by_key(|row| !row.is_priority);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_prefix() {
        assert_eq!(FunnelStage::ALL.len(), FunnelStage::COUNT);
        assert_eq!(FunnelStage::Contact.up_to(), &[FunnelStage::Contact]);
        assert_eq!(
            FunnelStage::FinalInterview.up_to(),
            &[
                FunnelStage::Contact,
                FunnelStage::HrInterview,
                FunnelStage::ClientInterview,
                FunnelStage::FinalInterview,
            ]
        );
        assert_eq!(FunnelStage::Hired.up_to().len(), FunnelStage::COUNT);
    }

    #[test]
    fn test_column_name_lookup() {
        for stage in FunnelStage::ALL {
            assert_eq!(FunnelStage::from_column_name(stage.column_name()), Some(stage));
        }
        assert_eq!(FunnelStage::from_column_name("screening"), None);
    }

    #[test]
    fn test_row_serializes_stages_inline() {
        let mut row = VacancyFunnelRow::new("Backend engineer", true);
        *row.stage_counts.get_mut(FunnelStage::Offer) = StageCount {
            total: 4,
            current: 1,
        };

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["vacancy_name"], "Backend engineer");
        assert_eq!(value["offer made"]["total"], 4);
        assert_eq!(value["offer made"]["current"], 1);
        assert_eq!(value["contact"]["total"], 0);
        assert_eq!(value["is_priority"], true);
    }

    #[test]
    fn test_sparse_row_gets_every_stage() {
        let json = r#"{
            "vacancy_name": "Designer",
            "HR interview": {"total": 3, "current": 2},
            "legacy column": {"total": 9, "current": 9}
        }"#;

        let row: VacancyFunnelRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.stage_counts.iter().count(), FunnelStage::COUNT);
        assert_eq!(
            row.stage_counts.get(FunnelStage::HrInterview),
            StageCount {
                total: 3,
                current: 2
            }
        );
        assert_eq!(row.stage_counts.get(FunnelStage::Hired), StageCount::default());
        assert_eq!(row.comment, "");
        assert!(!row.is_priority);
    }

    #[test]
    fn test_stage_count_display() {
        let count = StageCount {
            total: 12,
            current: 3,
        };
        assert_eq!(count.to_string(), "12 (3)");
    }

    #[test]
    fn test_priority_sort_is_stable() {
        let mut rows = vec![
            VacancyFunnelRow::new("B", false),
            VacancyFunnelRow::new("A", true),
            VacancyFunnelRow::new("C", false),
            VacancyFunnelRow::new("D", true),
        ];
        sort_priority_first(&mut rows);

        let names: Vec<_> = rows.iter().map(|r| r.vacancy_name.as_str()).collect();
        assert_eq!(names, ["A", "D", "B", "C"]);
    }
}
