use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{EgtaError, Result};

const RESERVED: [char; 3] = [';', ':', ','];

/// `count` players of `role` playing `strategy`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymmetryGroup {
    pub role: String,
    pub strategy: String,
    pub count: i64,
}

impl SymmetryGroup {
    pub fn new(role: impl Into<String>, strategy: impl Into<String>, count: i64) -> Self {
        Self {
            role: role.into(),
            strategy: strategy.into(),
            count,
        }
    }
}

/// Renders symmetry groups as the service's assignment string,
/// e.g. `buyers: 2 low, 1 high; sellers: 3 fair`.
///
/// Roles are sorted by name and strategies by `(strategy, count)`, so any
/// ordering of the same groups yields the same string. Zero-count groups are
/// skipped, and so is a role left without any.
pub fn symgrps_to_assignment(groups: &[SymmetryGroup]) -> Result<String> {
    let mut roles: BTreeMap<&str, Vec<(&str, i64)>> = BTreeMap::new();
    let mut seen = BTreeSet::new();
    for group in groups {
        check_name("role", &group.role)?;
        check_name("strategy", &group.strategy)?;
        if group.count < 0 {
            return Err(EgtaError::Validation(format!(
                "negative count {} for {} {}",
                group.count, group.role, group.strategy
            )));
        }
        if !seen.insert((group.role.as_str(), group.strategy.as_str())) {
            return Err(EgtaError::Validation(format!(
                "strategy {} listed twice for role {}",
                group.strategy, group.role
            )));
        }
        if group.count > 0 {
            roles
                .entry(group.role.as_str())
                .or_default()
                .push((group.strategy.as_str(), group.count));
        }
    }

    let rendered: Vec<String> = roles
        .into_iter()
        .map(|(role, mut strategies)| {
            strategies.sort_unstable();
            let strategies: Vec<String> = strategies
                .into_iter()
                .map(|(strategy, count)| format!("{count} {strategy}"))
                .collect();
            format!("{role}: {}", strategies.join(", "))
        })
        .collect();
    Ok(rendered.join("; "))
}

fn check_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EgtaError::Validation(format!("empty {kind} name")));
    }
    if name.trim() != name || name.contains(&RESERVED[..]) {
        return Err(EgtaError::Validation(format!(
            "{kind} name {name:?} has surrounding whitespace or one of ; : ,"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<SymmetryGroup> {
        vec![
            SymmetryGroup::new("a", "1", 8),
            SymmetryGroup::new("b", "5", 1),
            SymmetryGroup::new("b", "7", 1),
        ]
    }

    #[test]
    fn renders_service_format() {
        assert_eq!(
            symgrps_to_assignment(&sample()).unwrap(),
            "a: 8 1; b: 1 5, 1 7"
        );
    }

    #[test]
    fn order_independent() {
        let mut reversed = sample();
        reversed.reverse();
        let mut rotated = sample();
        rotated.rotate_left(1);
        let expected = symgrps_to_assignment(&sample()).unwrap();
        assert_eq!(symgrps_to_assignment(&reversed).unwrap(), expected);
        assert_eq!(symgrps_to_assignment(&rotated).unwrap(), expected);
    }

    #[test]
    fn deterministic() {
        let first = symgrps_to_assignment(&sample()).unwrap();
        for _ in 0..10 {
            assert_eq!(symgrps_to_assignment(&sample()).unwrap(), first);
        }
    }

    #[test]
    fn skips_zero_counts() {
        let groups = vec![
            SymmetryGroup::new("a", "1", 2),
            SymmetryGroup::new("a", "2", 0),
            SymmetryGroup::new("b", "3", 0),
        ];
        assert_eq!(symgrps_to_assignment(&groups).unwrap(), "a: 2 1");
    }

    #[test]
    fn empty_input_is_empty_assignment() {
        assert_eq!(symgrps_to_assignment(&[]).unwrap(), "");
    }

    #[test]
    fn rejects_negative_counts() {
        let err = symgrps_to_assignment(&[SymmetryGroup::new("a", "1", -1)]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn rejects_reserved_characters() {
        for (role, strategy) in [("a;b", "1"), ("a", "x: y"), ("a", "p,q"), ("", "1"), (" a", "1")] {
            let err = symgrps_to_assignment(&[SymmetryGroup::new(role, strategy, 1)]).unwrap_err();
            assert!(err.is_validation(), "{role:?}/{strategy:?}");
        }
    }

    #[test]
    fn rejects_duplicate_pairs() {
        let groups = vec![SymmetryGroup::new("a", "1", 1), SymmetryGroup::new("a", "1", 2)];
        assert!(symgrps_to_assignment(&groups).unwrap_err().is_validation());
    }
}
