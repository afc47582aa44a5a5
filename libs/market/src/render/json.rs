use serde_json::{Value, json};

use crate::model::{Entry, Payload, Report, SourceResult};

use super::round2;

/// Pretty JSON document. Absent numbers are explicit `null`s.
pub(super) fn render(report: &Report) -> String {
    let doc = json!({
        "title": super::title(report),
        "date": report.date().format("%Y-%m-%d").to_string(),
        "generated_at": report.generated_at().to_rfc3339(),
        "volatility": report.volatility(),
        "entries": report.entries().iter().map(entry).collect::<Vec<_>>(),
    });

    format!("{doc:#}")
}

fn entry(entry: &Entry) -> Value {
    let mut value = json!({
        "label": entry.label,
        "group": entry.group,
        "status": "ok",
        "reason": Value::Null,
        "unit": Value::Null,
        "as_of": Value::Null,
        "value": Value::Null,
        "previous": Value::Null,
        "absolute_change": Value::Null,
        "percent_change": Value::Null,
        "direction": Value::Null,
        "flows": Value::Null,
    });

    match &entry.result {
        SourceResult::Ok(Payload::Observation(obs)) => {
            value["unit"] = json!(obs.unit);
            value["as_of"] = json!(obs.as_of.format("%Y-%m-%d").to_string());
            value["value"] = json!(round2(obs.latest));
            value["previous"] = json!(round2(obs.previous));

            if let Some(change) = &entry.change {
                value["absolute_change"] = json!(round2(change.absolute_change));
                value["percent_change"] = json!(change.percent_change.map(round2));
                value["direction"] = json!(change.direction);
            }
        }
        SourceResult::Ok(Payload::Flow(flow)) => {
            value["as_of"] = json!(flow.period.format("%Y-%m-%d").to_string());
            value["flows"] = flow
                .categories
                .iter()
                .map(|c| {
                    json!({
                        "category": c.category,
                        "buy": round2(c.buy),
                        "sell": round2(c.sell),
                        "net": round2(c.net()),
                        "direction": c.direction(),
                    })
                })
                .collect();
        }
        SourceResult::Missing(reason) => {
            value["status"] = json!("missing");
            value["reason"] = json!(reason);
        }
        SourceResult::Stale { as_of, .. } => {
            value["status"] = json!("stale");
            value["as_of"] = json!(as_of.format("%Y-%m-%d").to_string());
        }
    }

    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fixtures;

    fn doc() -> Value {
        serde_json::from_str(&render(&fixtures::report())).unwrap()
    }

    #[test]
    fn entries_keep_report_order() {
        let doc = doc();
        let labels: Vec<&str> = doc["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["label"].as_str().unwrap())
            .collect();

        assert_eq!(labels, vec!["A", "B", "10Y Treasury", "Investor Flows"]);
        assert_eq!(doc["date"], "2026-10-17");
    }

    #[test]
    fn observation_numbers_are_rounded_at_render() {
        let doc = doc();
        let a = &doc["entries"][0];

        assert_eq!(a["status"], "ok");
        assert_eq!(a["value"], 20.0);
        assert_eq!(a["previous"], 18.0);
        assert_eq!(a["absolute_change"], 2.0);
        assert_eq!(a["percent_change"], 11.11);
        assert_eq!(a["direction"], "up");
        assert_eq!(a["unit"], "price");
    }

    #[test]
    fn missing_entry_uses_nulls_not_sentinels() {
        let doc = doc();
        let b = &doc["entries"][1];

        assert_eq!(b["status"], "missing");
        assert_eq!(b["reason"], "timeout");
        for field in ["value", "previous", "absolute_change", "percent_change", "direction"] {
            assert!(b[field].is_null(), "{field} should be null");
        }
    }

    #[test]
    fn flow_entry_lists_categories() {
        let doc = doc();
        let flows = doc["entries"][3]["flows"].as_array().unwrap();

        assert_eq!(flows.len(), 2);
        assert_eq!(flows[0]["category"], "foreign");
        assert_eq!(flows[0]["net"], 300.25);
        assert_eq!(flows[1]["net"], -150.5);
        assert_eq!(flows[1]["direction"], "down");
        assert!(doc["entries"][3]["value"].is_null());
    }

    #[test]
    fn volatility_is_null_unless_observed() {
        assert!(doc()["volatility"].is_null());

        let report = fixtures::report().with_volatility(Some(crate::change::Direction::Up));
        let doc: Value = serde_json::from_str(&render(&report)).unwrap();
        assert_eq!(doc["volatility"], "up");
    }
}
