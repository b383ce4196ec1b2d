use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Aggregated knowledge for one nutrient, keyed by nutrient name.
///
/// Each family is a real set: absence means an empty set, never a missing
/// field, and duplicates from the graph collapse on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientRecord {
    pub nutrient: String,
    pub paper_sources: BTreeSet<String>,
    pub sources: BTreeSet<String>,
    pub daily_intake: BTreeSet<String>,
    pub benefits: BTreeSet<String>,
}

/// Folds the four relationship branches into grouped records.
///
/// A nutrient qualifies only if its symptom branch matched a queried label
/// AND it has at least one leaf in each of the source, daily-intake and
/// benefit branches (conjunctive across all four relationships). Each
/// family deduplicates independently, so a nutrient linked to the same
/// leaf twice contributes it once. Output is ordered by nutrient name.
pub(crate) fn aggregate_branches(
    symptom_rows: Vec<(String, Option<String>)>,
    source_rows: Vec<(String, String)>,
    intake_rows: Vec<(String, String)>,
    benefit_rows: Vec<(String, String)>,
) -> Vec<NutrientRecord> {
    let mut paper_sources: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (nutrient, paper_source) in symptom_rows {
        let entry = paper_sources.entry(nutrient).or_default();
        if let Some(paper_source) = paper_source {
            entry.insert(paper_source);
        }
    }

    let sources = into_family_sets(source_rows);
    let daily_intake = into_family_sets(intake_rows);
    let benefits = into_family_sets(benefit_rows);

    paper_sources
        .into_iter()
        .filter_map(|(nutrient, papers)| {
            let sources = sources.get(&nutrient)?.clone();
            let daily_intake = daily_intake.get(&nutrient)?.clone();
            let benefits = benefits.get(&nutrient)?.clone();
            Some(NutrientRecord {
                nutrient,
                paper_sources: papers,
                sources,
                daily_intake,
                benefits,
            })
        })
        .collect()
}

fn into_family_sets(rows: Vec<(String, String)>) -> HashMap<String, BTreeSet<String>> {
    let mut sets: HashMap<String, BTreeSet<String>> = HashMap::new();
    for (nutrient, value) in rows {
        sets.entry(nutrient).or_default().insert(value);
    }
    sets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_groups_and_deduplicates_per_family() {
        let records = aggregate_branches(
            vec![
                ("Iron".to_string(), Some("doi:10.1000/iron".to_string())),
                ("Iron".to_string(), Some("doi:10.1000/iron".to_string())),
            ],
            // Double-linked source must appear exactly once.
            owned(&[
                ("Iron", "Spinach"),
                ("Iron", "Spinach"),
                ("Iron", "Red Meat"),
            ]),
            owned(&[("Iron", "18 mg/day")]),
            owned(&[("Iron", "Oxygen transport")]),
        );

        assert_eq!(records.len(), 1);
        let iron = &records[0];
        assert_eq!(iron.nutrient, "Iron");
        assert_eq!(iron.sources.len(), 2);
        assert!(iron.sources.contains("Spinach"));
        assert_eq!(iron.paper_sources.len(), 1);
        assert_eq!(iron.daily_intake.len(), 1);
        assert_eq!(iron.benefits.len(), 1);
    }

    #[test]
    fn test_join_is_conjunctive_not_disjunctive() {
        // "Zinc" matched the symptom branch but has no benefit leaves, so
        // it must be excluded entirely, not returned with a gap.
        let records = aggregate_branches(
            vec![
                ("Iron".to_string(), None),
                ("Zinc".to_string(), None),
            ],
            owned(&[("Iron", "Spinach"), ("Zinc", "Oysters")]),
            owned(&[("Iron", "18 mg/day"), ("Zinc", "11 mg/day")]),
            owned(&[("Iron", "Oxygen transport")]),
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].nutrient, "Iron");
    }

    #[test]
    fn test_symptom_branch_gates_membership() {
        // "Calcium" is fully connected on the other branches but did not
        // match any queried symptom label.
        let records = aggregate_branches(
            vec![("Iron".to_string(), None)],
            owned(&[("Iron", "Spinach"), ("Calcium", "Milk")]),
            owned(&[("Iron", "18 mg/day"), ("Calcium", "1000 mg/day")]),
            owned(&[("Iron", "Oxygen transport"), ("Calcium", "Bone health")]),
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].nutrient, "Iron");
    }

    #[test]
    fn test_missing_paper_source_yields_empty_set() {
        let records = aggregate_branches(
            vec![("Iron".to_string(), None)],
            owned(&[("Iron", "Spinach")]),
            owned(&[("Iron", "18 mg/day")]),
            owned(&[("Iron", "Oxygen transport")]),
        );

        assert_eq!(records.len(), 1);
        assert!(records[0].paper_sources.is_empty());
    }

    #[test]
    fn test_empty_branches_yield_empty_result() {
        let records = aggregate_branches(Vec::new(), Vec::new(), Vec::new(), Vec::new());
        assert!(records.is_empty());
    }

    #[test]
    fn test_output_ordered_by_nutrient_name() {
        let records = aggregate_branches(
            vec![
                ("Zinc".to_string(), None),
                ("Iron".to_string(), None),
            ],
            owned(&[("Iron", "Spinach"), ("Zinc", "Oysters")]),
            owned(&[("Iron", "18 mg/day"), ("Zinc", "11 mg/day")]),
            owned(&[("Iron", "Oxygen transport"), ("Zinc", "Immune function")]),
        );

        let names: Vec<&str> = records.iter().map(|r| r.nutrient.as_str()).collect();
        assert_eq!(names, vec!["Iron", "Zinc"]);
    }
}
