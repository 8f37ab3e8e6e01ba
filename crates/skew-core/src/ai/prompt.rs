//! Prompt assembly for variance narratives

use crate::models::RootCauseResult;

/// Render the prompt for a root-cause decomposition.
///
/// The prompt carries the already-computed numbers; the model is asked to
/// phrase them, not to recalculate anything.
pub fn render_prompt(result: &RootCauseResult) -> String {
    let mut prompt = String::from(
        "You are a financial controller. Explain the following deviation in two to four \
         plain sentences for a management report. Use only the numbers given; do not \
         invent figures.\n\n",
    );

    prompt.push_str(&format!(
        "Account {} ({}): prior period {:.2}, current period {:.2}, change {:+.2} ({:+.1}%)\n",
        result.account,
        result.account_name,
        result.prior_total,
        result.current_total,
        result.delta_abs,
        result.delta_pct
    ));

    if !result.clusters.is_empty() {
        prompt.push_str("Change decomposition:\n");
        for cluster in &result.clusters {
            prompt.push_str(&format!(
                "- {}: {:+.2} ({:.1}% of the change, {} bookings)\n",
                cluster.kind.label(),
                cluster.amount,
                cluster.contribution_pct,
                cluster.transactions.len()
            ));
        }
    }

    if !result.drivers.is_empty() {
        prompt.push_str("Largest dimension movements:\n");
        for driver in result.drivers.iter().take(3) {
            prompt.push_str(&format!(
                "- {} '{}': {:.2} -> {:.2}\n",
                driver.dimension, driver.key, driver.prior_amount, driver.current_amount
            ));
        }
    }

    prompt.push_str(&format!(
        "Decomposition confidence: {:.2}\n",
        result.confidence
    ));
    prompt
}
