/*
Per-category diagnostics for a validation run.
Entries can only be appended: once a check records a violation it stays failed
and every earlier entry is kept.
*/

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RecordedTrail")]
pub struct CheckDetail {
    passed: bool,
    trail: Vec<String>,
}

// Incoming `passed` is ignored; it is rebuilt from the trail.
#[derive(Deserialize)]
struct RecordedTrail {
    #[serde(default)]
    trail: Vec<String>,
}

impl From<RecordedTrail> for CheckDetail {
    fn from(raw: RecordedTrail) -> Self {
        CheckDetail { passed: raw.trail.is_empty(), trail: raw.trail }
    }
}

impl Default for CheckDetail {
    fn default() -> Self {
        CheckDetail { passed: true, trail: Vec::new() }
    }
}

impl CheckDetail {
    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn trail(&self) -> &[String] {
        &self.trail
    }

    /// Append a violation and mark the check failed.
    pub fn record(&mut self, entry: impl Into<String>) {
        self.passed = false;
        self.trail.push(entry.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationDetails {
    pub frequency: CheckDetail,
    pub weekday: CheckDetail,
    pub time: CheckDetail,
}

impl ValidationDetails {
    pub fn all_passed(&self) -> bool {
        self.frequency.passed() && self.weekday.passed() && self.time.passed()
    }

    /// Every recorded entry, in category order.
    pub fn issues(&self) -> Vec<String> {
        [&self.weekday, &self.time, &self.frequency]
            .into_iter()
            .flat_map(|c| c.trail().iter().cloned())
            .collect()
    }
}
