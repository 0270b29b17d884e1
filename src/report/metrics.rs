// Local metric extraction from completion text
//
// The LLM answers are prose; these helpers pull out the first concrete
// percentage per key group and a coarse trend signal so the strategic
// assessment can carry a data appendix that is computed, not generated.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Fallback when an answer names no percentage at all.
const DEFAULT_PERCENTAGE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Positive,
    Negative,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Positive => write!(f, "positive"),
            Trend::Negative => write!(f, "negative"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricReading {
    pub trend: Trend,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketPosition {
    pub strong: bool,
    pub competitive: bool,
}

/// Everything the assessment appendix reports, grouped the way the
/// report presents it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    pub revenue: Option<MetricReading>,
    pub gross_margin: Option<MetricReading>,
    pub first_pass_yield: Option<MetricReading>,
    pub on_time_delivery: Option<MetricReading>,
    pub market: Option<MarketPosition>,
}

/// First percentage named in the text, or the 50.0 fallback.
pub fn extract_percentage(text: &str) -> f64 {
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    let re = PERCENT.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("valid regex"));

    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(DEFAULT_PERCENTAGE)
}

fn reading(answer: &str, positive_phrase: &str) -> MetricReading {
    let lower = answer.to_lowercase();
    MetricReading {
        trend: if lower.contains(positive_phrase) {
            Trend::Positive
        } else {
            Trend::Negative
        },
        value: extract_percentage(answer),
    }
}

/// Pull the appendix metrics out of the per-group answers.
pub fn extract_metrics(completions: &BTreeMap<String, String>) -> Metrics {
    let mut metrics = Metrics::default();

    if let Some(answer) = completions.get("revenue_growth") {
        metrics.revenue = Some(reading(answer, "grown revenues"));
    }
    if let Some(answer) = completions.get("gross_margin") {
        metrics.gross_margin = Some(reading(answer, "improved"));
    }
    if let Some(answer) = completions.get("first_pass_yield") {
        metrics.first_pass_yield = Some(reading(answer, "trending positively"));
    }
    if let Some(answer) = completions.get("on_time_delivery") {
        metrics.on_time_delivery = Some(reading(answer, "trending positively"));
    }
    if let Some(answer) = completions.get("market_assessment") {
        let lower = answer.to_lowercase();
        metrics.market = Some(MarketPosition {
            strong: lower.contains("strong"),
            competitive: lower.contains("competitive"),
        });
    }

    metrics
}

/// Markdown appendix table for the strategic assessment.
pub fn render_appendix(metrics: &Metrics) -> String {
    let mut out = String::from("| Metric | Trend | Value |\n|---|---|---|\n");

    let mut row = |name: &str, reading: &Option<MetricReading>| {
        if let Some(r) = reading {
            out.push_str(&format!("| {} | {} | {:.1}% |\n", name, r.trend, r.value));
        }
    };
    row("Revenue growth", &metrics.revenue);
    row("Gross margin", &metrics.gross_margin);
    row("First-pass yield", &metrics.first_pass_yield);
    row("On-time delivery", &metrics.on_time_delivery);

    if let Some(market) = &metrics.market {
        out.push_str(&format!(
            "| Market position | {} | {} |\n",
            if market.strong { "strong" } else { "weak" },
            if market.competitive {
                "competitive"
            } else {
                "uncontested"
            }
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_extraction() {
        assert_eq!(extract_percentage("margin improved to 41.5% this year"), 41.5);
        assert_eq!(extract_percentage("grew 12% then 15%"), 12.0);
        assert_eq!(extract_percentage("no numbers here"), 50.0);
    }

    #[test]
    fn test_trend_detection() {
        let mut completions = BTreeMap::new();
        completions.insert(
            "revenue_growth".to_string(),
            "1. The company has grown revenues 18% year over year.".to_string(),
        );
        completions.insert(
            "gross_margin".to_string(),
            "1. Margins declined to 35%.".to_string(),
        );
        completions.insert(
            "market_assessment".to_string(),
            "1. The position is strong in a competitive segment.".to_string(),
        );

        let metrics = extract_metrics(&completions);

        let revenue = metrics.revenue.unwrap();
        assert_eq!(revenue.trend, Trend::Positive);
        assert_eq!(revenue.value, 18.0);

        assert_eq!(metrics.gross_margin.unwrap().trend, Trend::Negative);

        let market = metrics.market.unwrap();
        assert!(market.strong);
        assert!(market.competitive);

        assert!(metrics.first_pass_yield.is_none());
    }

    #[test]
    fn test_appendix_renders_only_present_metrics() {
        let mut completions = BTreeMap::new();
        completions.insert(
            "on_time_delivery".to_string(),
            "1. Delivery is trending positively at 94%.".to_string(),
        );

        let appendix = render_appendix(&extract_metrics(&completions));

        assert!(appendix.contains("| On-time delivery | positive | 94.0% |"));
        assert!(!appendix.contains("Revenue growth"));
    }
}
