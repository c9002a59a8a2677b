//! Duplicate-output detection per hook identity

use hookwatch_telemetry::HookEvent;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// Which hook fired: event type, tool, and hook command when known
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookIdentity {
    pub event_type: String,
    pub tool_name: Option<String>,
    pub hook_command: Option<String>,
}

impl HookIdentity {
    pub fn of(event: &HookEvent) -> Self {
        Self {
            event_type: event.event_type.as_str().to_string(),
            tool_name: event.tool_name.clone(),
            hook_command: event.hook_command(),
        }
    }
}

impl fmt::Display for HookIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event_type)?;
        if let Some(tool) = &self.tool_name {
            write!(f, ":{}", tool)?;
        }
        if let Some(command) = &self.hook_command {
            write!(f, " ({})", command)?;
        }
        Ok(())
    }
}

impl Serialize for HookIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// SHA-256 of normalized hook output, lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(output: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(output.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Fingerprint of the record's observed output, if it carries any
    pub fn of_event(event: &HookEvent) -> Option<Self> {
        event.observed_output().map(|output| Self::of(&output))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

/// When a hook counts as noisy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedupPolicy {
    pub min_fires: usize,
    pub threshold: f64,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            min_fires: 5,
            threshold: 0.8,
        }
    }
}

/// Repetition verdict for one hook identity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    pub hook_identity: HookIdentity,
    pub total_fires: usize,
    pub fires_with_output: usize,
    pub top_fingerprint: Option<Fingerprint>,
    pub top_fingerprint_count: usize,
    /// `top_fingerprint_count / fires_with_output`, 0 for silent hooks
    pub duplicate_ratio: f64,
    pub flagged: bool,
    /// Fired but never produced observable output
    pub zero_output: bool,
}

#[derive(Debug, Default)]
struct Tally {
    total: usize,
    with_output: usize,
    // First-seen order doubles as the tie-break
    fingerprints: Vec<(Fingerprint, usize)>,
    positions: HashMap<Fingerprint, usize>,
}

impl Tally {
    fn record(&mut self, fingerprint: Option<Fingerprint>) {
        self.total += 1;
        let Some(fingerprint) = fingerprint else {
            return;
        };
        self.with_output += 1;
        match self.positions.get(&fingerprint) {
            Some(&pos) => self.fingerprints[pos].1 += 1,
            None => {
                self.positions.insert(fingerprint.clone(), self.fingerprints.len());
                self.fingerprints.push((fingerprint, 1));
            }
        }
    }

    fn top(&self) -> Option<&(Fingerprint, usize)> {
        self.fingerprints
            .iter()
            .fold(None, |best: Option<&(Fingerprint, usize)>, entry| match best {
                Some(b) if b.1 >= entry.1 => Some(b),
                _ => Some(entry),
            })
    }

    fn into_report(self, hook_identity: HookIdentity, policy: &DedupPolicy) -> DuplicateReport {
        let (top_fingerprint, top_count) = match self.top() {
            Some((fp, count)) => (Some(fp.clone()), *count),
            None => (None, 0),
        };
        let duplicate_ratio = if self.with_output == 0 {
            0.0
        } else {
            top_count as f64 / self.with_output as f64
        };
        DuplicateReport {
            hook_identity,
            total_fires: self.total,
            fires_with_output: self.with_output,
            top_fingerprint,
            top_fingerprint_count: top_count,
            duplicate_ratio,
            flagged: self.with_output >= policy.min_fires && duplicate_ratio >= policy.threshold,
            zero_output: self.with_output == 0,
        }
    }
}

/// Group records by hook identity and score how repetitive each one's
/// output is. Reports come back in order of each identity's first fire.
pub fn detect<'a>(
    events: impl IntoIterator<Item = &'a HookEvent>,
    policy: &DedupPolicy,
) -> Vec<DuplicateReport> {
    let mut groups: Vec<(HookIdentity, Tally)> = Vec::new();
    let mut index: HashMap<HookIdentity, usize> = HashMap::new();

    for event in events {
        let identity = HookIdentity::of(event);
        let pos = match index.get(&identity) {
            Some(&pos) => pos,
            None => {
                index.insert(identity.clone(), groups.len());
                groups.push((identity, Tally::default()));
                groups.len() - 1
            }
        };
        groups[pos].1.record(Fingerprint::of_event(event));
    }

    groups
        .into_iter()
        .map(|(identity, tally)| tally.into_report(identity, policy))
        .collect()
}
