use crate::model::{Entry, Payload, Report, SourceResult};

use super::{signed, title};

const RULE_WIDTH: usize = 50;

pub(super) fn render(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&title(report));
    out.push('\n');
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');

    for (group, entries) in report.groups() {
        out.push('\n');
        out.push_str(group);
        out.push('\n');

        for entry in entries {
            out.push_str(&line(entry));
            out.push('\n');
        }
    }

    if let Some(direction) = report.volatility() {
        out.push_str(&format!(
            "\nMarket Volatility is {} {}\n",
            direction.as_str(),
            direction.arrow()
        ));
    }

    out
}

pub(super) fn line(entry: &Entry) -> String {
    match &entry.result {
        SourceResult::Ok(Payload::Observation(obs)) => {
            let mut line = format!("{}: {}", entry.label, obs.unit.format_value(obs.latest));
            if let Some(change) = &entry.change {
                line.push_str(&format!(
                    " {} {} {}",
                    change.direction.as_str(),
                    change.direction.arrow(),
                    obs.unit.format_change(change)
                ));
            }
            line
        }
        SourceResult::Ok(Payload::Flow(flow)) => {
            let parts: Vec<String> = flow
                .categories
                .iter()
                .map(|c| format!("{} {} {}", c.category, signed(c.net()), c.direction().arrow()))
                .collect();

            format!(
                "{} ({}): {}",
                entry.label,
                flow.period.format("%Y-%m-%d"),
                parts.join(", ")
            )
        }
        SourceResult::Missing(_) | SourceResult::Stale { .. } => {
            format!("{}: data not available", entry.label)
        }
    }
}
