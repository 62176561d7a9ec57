use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::character::NpcId;

/// How a stat is compared against a rule threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

impl Comparator {
    pub fn holds(&self, value: i64, threshold: i64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Ge => value >= threshold,
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
            Self::Eq => value == threshold,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
        }
    }
}

/// One row of the mood-escalation table: when `stat comparator threshold`
/// holds for an NPC, its mood becomes `mood`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodRule {
    pub stat: String,
    pub comparator: Comparator,
    pub threshold: i64,
    pub mood: String,
    /// Restricts the rule to one NPC; applies to every NPC when absent.
    #[serde(default)]
    pub npc: Option<NpcId>,
}

impl MoodRule {
    /// A missing stat never satisfies a rule.
    pub fn matches(&self, npc: &NpcId, stats: &BTreeMap<String, i64>) -> bool {
        if self.npc.as_ref().is_some_and(|only| only != npc) {
            return false;
        }
        stats
            .get(&self.stat)
            .is_some_and(|value| self.comparator.holds(*value, self.threshold))
    }
}

impl fmt::Display for MoodRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} -> {}",
            self.stat,
            self.comparator.symbol(),
            self.threshold,
            self.mood
        )
    }
}

/// Ordered mood rules. The first matching entry wins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoodRuleTable {
    pub rules: Vec<MoodRule>,
}

impl MoodRuleTable {
    pub fn new(rules: Vec<MoodRule>) -> Self {
        Self { rules }
    }

    pub fn first_match(&self, npc: &NpcId, stats: &BTreeMap<String, i64>) -> Option<&MoodRule> {
        self.rules.iter().find(|rule| rule.matches(npc, stats))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(stat: &str, comparator: Comparator, threshold: i64, mood: &str) -> MoodRule {
        MoodRule {
            stat: stat.to_string(),
            comparator,
            threshold,
            mood: mood.to_string(),
            npc: None,
        }
    }

    #[test]
    fn comparators() {
        assert!(Comparator::Gt.holds(6, 5));
        assert!(!Comparator::Gt.holds(5, 5));
        assert!(Comparator::Ge.holds(5, 5));
        assert!(Comparator::Lt.holds(-1, 0));
        assert!(Comparator::Le.holds(0, 0));
        assert!(Comparator::Eq.holds(3, 3));
        assert!(!Comparator::Eq.holds(3, 4));
    }

    #[test]
    fn earlier_rule_wins() {
        let table = MoodRuleTable::new(vec![
            rule("mind_altered", Comparator::Gt, 5, "altered"),
            rule("mind_altered", Comparator::Gt, 2, "uneasy"),
        ]);
        let stats = BTreeMap::from([("mind_altered".to_string(), 6)]);
        let hit = table.first_match(&NpcId::new("aiko"), &stats).unwrap();
        assert_eq!(hit.mood, "altered");

        let stats = BTreeMap::from([("mind_altered".to_string(), 3)]);
        let hit = table.first_match(&NpcId::new("aiko"), &stats).unwrap();
        assert_eq!(hit.mood, "uneasy");
    }

    #[test]
    fn missing_stat_never_matches() {
        let table = MoodRuleTable::new(vec![rule("trust", Comparator::Lt, 1, "wary")]);
        assert!(table.first_match(&NpcId::new("aiko"), &BTreeMap::new()).is_none());
    }

    #[test]
    fn scoped_rule_only_applies_to_its_npc() {
        let mut scoped = rule("trust", Comparator::Ge, 3, "friendly");
        scoped.npc = Some(NpcId::new("ren"));
        let stats = BTreeMap::from([("trust".to_string(), 5)]);
        assert!(scoped.matches(&NpcId::new("ren"), &stats));
        assert!(!scoped.matches(&NpcId::new("aiko"), &stats));
    }

    #[test]
    fn rule_table_parses_from_ron() {
        let table: MoodRuleTable = ron::from_str(
            r#"[(stat: "mind_altered", comparator: Gt, threshold: 5, mood: "altered")]"#,
        )
        .unwrap();
        assert_eq!(table.rules.len(), 1);
        assert_eq!(table.rules[0].to_string(), "mind_altered > 5 -> altered");
    }
}
