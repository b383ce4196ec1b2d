use std::collections::BTreeSet;
use std::fmt::Write;

use crate::graph_store::NutrientRecord;

/// Builds the fixed two-section prompt for the generation service from
/// the raw phrase, the resolved labels and the aggregated records.
/// Formatting only; the generated answer is opaque to this crate.
pub fn compose_prompt(phrase: &str, labels: &[String], records: &[NutrientRecord]) -> String {
    let labels_block = if labels.is_empty() {
        "- none".to_string()
    } else {
        labels
            .iter()
            .map(|label| format!("- {}", label))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut records_block = String::new();
    if records.is_empty() {
        records_block.push_str("- none");
    } else {
        for record in records {
            let _ = write!(
                records_block,
                "- {} | paper sources: {} | food sources: {} | daily intake: {} | benefits: {}",
                record.nutrient,
                join_set(&record.paper_sources),
                join_set(&record.sources),
                join_set(&record.daily_intake),
                join_set(&record.benefits),
            );
            records_block.push('\n');
        }
        records_block.pop();
    }

    format!(
        "Based on the matched symptoms and the nutrient records below, generate the response strictly in the required format.

User input:
{phrase}

Matched symptoms:
{labels_block}

Deficient nutrient candidates:
{records_block}

Required format:
### Analysis:
<description>Based on the symptoms you provided [matched symptoms], I suspect you have a deficiency of [nutrient names].</description>

### Recommendations:
<recommended-foods>I advise that you consider these [names of food sources].</recommended-foods>
"
    )
}

fn join_set(values: &BTreeSet<String>) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}
