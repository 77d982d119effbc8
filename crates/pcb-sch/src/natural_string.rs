use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// String wrapper with natural ordering (R1 < R2 < R10).
/// Maintains natural sort order in BTreeSet/BTreeMap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NaturalString(String);

impl NaturalString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Numeric suffix after `prefix`, e.g. `R12` with prefix `R` is `Some(12)`.
    pub fn numbered_suffix(&self, prefix: &str) -> Option<u32> {
        self.0.strip_prefix(prefix)?.parse().ok()
    }
}

impl From<&str> for NaturalString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::borrow::Borrow<str> for NaturalString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NaturalString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for NaturalString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NaturalString {
    fn cmp(&self, other: &Self) -> Ordering {
        natord::compare(&self.0, &other.0)
    }
}

/// First `{prefix}{n}` (n >= 1) not already taken, walking the taken ids in
/// natural order.
pub fn first_free_id<'a>(prefix: &str, taken: impl IntoIterator<Item = &'a str>) -> String {
    let taken: BTreeSet<NaturalString> = taken.into_iter().map(NaturalString::from).collect();
    let mut next = 1;
    for id in &taken {
        match id.numbered_suffix(prefix) {
            Some(n) if n == next => next += 1,
            Some(n) if n > next => break,
            _ => {}
        }
    }
    format!("{prefix}{next}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_order() {
        let mut ids: Vec<NaturalString> = ["R10", "R2", "R1"].into_iter().map(Into::into).collect();
        ids.sort();
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(ids, ["R1", "R2", "R10"]);
    }

    #[test]
    fn first_free_id_fills_gaps() {
        assert_eq!(first_free_id("R", []), "R1");
        assert_eq!(first_free_id("R", ["R1", "R2", "R10"]), "R3");
        assert_eq!(first_free_id("R", ["R2", "U1"]), "R1");
        assert_eq!(first_free_id("L", ["L1", "L2", "R3"]), "L3");
    }
}
