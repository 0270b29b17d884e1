// Blueprint group registry
//
// The 30 fixed assessment groups every pipeline stage agrees on, plus
// the units/scales annotation embedded into prompts.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// The 30 blueprint group identifiers, in presentation order.
pub const BLUEPRINT_GROUPS: [&str; 30] = [
    "vision",
    "market_assessment",
    "strategic_assessment",
    "risk_assessment",
    "competitive_assessment",
    "portfolio_assessment",
    "strengths_assessment",
    "weaknesses_assessment",
    "opportunities_assessment",
    "threats_assessment",
    "revenue_growth",
    "operating_income",
    "cash_flow",
    "gross_margin",
    "finance_metrics",
    "time_to_hire",
    "employee_turnover",
    "employee_engagement",
    "management_team_quality",
    "hr_metrics",
    "inventory_turnover",
    "on_time_delivery",
    "first_pass_yield",
    "total_cycle_time",
    "operations_metrics",
    "annual_recurring_revenue",
    "customer_acquisition_cost",
    "design_win",
    "sales_opportunities",
    "sales_marketing_metrics",
];

/// Units/scales annotation for a group's data columns.
///
/// Serializes to either a bare string (`"USD_M"`) or a per-column map
/// (`{"prob":"1_5","impact":"1_9"}`), matching how the annotation is
/// embedded as JSON in prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitSpec {
    Scalar(&'static str),
    PerColumn(&'static [(&'static str, &'static str)]),
}

impl Serialize for UnitSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            UnitSpec::Scalar(s) => serializer.serialize_str(s),
            UnitSpec::PerColumn(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (k, v) in pairs.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl UnitSpec {
    /// JSON form used verbatim in the prompt's Units/Scales line.
    pub fn to_json(&self) -> String {
        // Infallible for these shapes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// True when `id` is one of the 30 blueprint groups.
pub fn is_blueprint_group(id: &str) -> bool {
    BLUEPRINT_GROUPS.contains(&id)
}

/// Units/scales annotation for a blueprint group, if one is defined.
pub fn units_for(id: &str) -> Option<UnitSpec> {
    use UnitSpec::{PerColumn, Scalar};

    let spec = match id {
        "vision" => Scalar("score_0_10"),
        "market_assessment" => Scalar("0_100"),
        "strategic_assessment" => Scalar("0_100"),
        "risk_assessment" => PerColumn(&[
            ("prob", "1_5"),
            ("impact", "1_9"),
            ("derived", "risk_index"),
        ]),
        "competitive_assessment" => Scalar("0_10"),
        "portfolio_assessment" => {
            PerColumn(&[("position", "0_100"), ("revenue_share", "%")])
        }
        "strengths_assessment" => Scalar("%"),
        "weaknesses_assessment" => Scalar("%"),
        "opportunities_assessment" => PerColumn(&[("value", "USD_M"), ("score", "%")]),
        "threats_assessment" => Scalar("%"),
        "revenue_growth" => Scalar("USD_M"),
        "operating_income" => Scalar("%"),
        "cash_flow" => Scalar("%"),
        "gross_margin" => Scalar("%"),
        "finance_metrics" => PerColumn(&[("value", "num")]),
        "time_to_hire" => Scalar("days"),
        "employee_turnover" => Scalar("%"),
        "employee_engagement" => Scalar("%"),
        "management_team_quality" => Scalar("score_0_10"),
        "hr_metrics" => Scalar("mixed"),
        "inventory_turnover" => Scalar("turns"),
        "on_time_delivery" => Scalar("%"),
        "first_pass_yield" => Scalar("%"),
        "total_cycle_time" => Scalar("days"),
        "operations_metrics" => PerColumn(&[("value", "num")]),
        "annual_recurring_revenue" => Scalar("USD_M"),
        "customer_acquisition_cost" => Scalar("USD_k"),
        "design_win" => Scalar("USD_M"),
        "sales_opportunities" => Scalar("USD_M"),
        "sales_marketing_metrics" => Scalar("mixed"),
        _ => return None,
    };

    Some(spec)
}
