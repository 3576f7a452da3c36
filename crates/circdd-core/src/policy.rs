use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

/// Strategy for resolving inversions when permuting to a target order
///
/// Given the current and the target order, every pair of variables in the
/// wrong relative order must be exchanged by an adjacent swap eventually. The
/// policies only differ in which inversion they remove next, which influences
/// the intermediate diagram sizes (and thus time and peak memory), but not the
/// number of swaps.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub enum ReorderPolicy {
    /// Remove the top-most inversion first (`LI`)
    LowestInversion,
    /// Remove the bottom-most inversion first (`HI`)
    HighestInversion,
    /// Sink the top-most misplaced variable as far as necessary (`BD`)
    SinkDown,
    /// Bubble the bottom-most misplaced variable up as far as necessary (`BU`)
    BubbleUp,
    /// Swap the pair of levels with the fewest nodes in total (`LC`)
    LowestCost,
    /// Swap the pair whose upper level has the fewest nodes (`LM`)
    LowestMemory,
    /// Remove a uniformly chosen inversion (`RAN`)
    Random,
    /// Move the variable with the lowest average relative cost into place
    /// (`LARC`)
    #[default]
    LowestAverageRelativeCost,
}

impl ReorderPolicy {
    /// All policies
    pub const ALL: [ReorderPolicy; 8] = [
        ReorderPolicy::LowestInversion,
        ReorderPolicy::HighestInversion,
        ReorderPolicy::SinkDown,
        ReorderPolicy::BubbleUp,
        ReorderPolicy::LowestCost,
        ReorderPolicy::LowestMemory,
        ReorderPolicy::Random,
        ReorderPolicy::LowestAverageRelativeCost,
    ];

    /// Short name as accepted by [`FromStr`]
    pub const fn name(self) -> &'static str {
        match self {
            ReorderPolicy::LowestInversion => "LI",
            ReorderPolicy::HighestInversion => "HI",
            ReorderPolicy::SinkDown => "BD",
            ReorderPolicy::BubbleUp => "BU",
            ReorderPolicy::LowestCost => "LC",
            ReorderPolicy::LowestMemory => "LM",
            ReorderPolicy::Random => "RAN",
            ReorderPolicy::LowestAverageRelativeCost => "LARC",
        }
    }
}

impl fmt::Display for ReorderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReorderPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| ConfigError::UnknownHeuristic(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        for policy in ReorderPolicy::ALL {
            assert_eq!(policy.name().parse::<ReorderPolicy>(), Ok(policy));
        }
        assert_eq!(
            "LARC".parse::<ReorderPolicy>(),
            Ok(ReorderPolicy::default())
        );
    }

    #[test]
    fn unknown_name() {
        assert_eq!(
            "larc".parse::<ReorderPolicy>(),
            Err(ConfigError::UnknownHeuristic("larc".to_string()))
        );
        let err = "SIFT".parse::<ReorderPolicy>().unwrap_err();
        assert_eq!(err.to_string(), "unknown reorder heuristic 'SIFT'");
    }
}
