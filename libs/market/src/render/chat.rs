use serde_json::{Value, json};

use crate::model::{Entry, Payload, Report, SourceResult};

use super::{grouped, signed, title};

const MISSING_GLYPH: &str = "⚠️";

/// Block-kit payload: header, then per group a divider, a bold heading and
/// the entry fields laid out two per section.
pub(super) fn render(report: &Report) -> String {
    let title = title(report);

    let mut blocks = vec![json!({
        "type": "header",
        "text": {
            "type": "plain_text",
            "text": format!("📊 {title}"),
            "emoji": true,
        }
    })];

    for (group, entries) in report.groups() {
        blocks.push(json!({ "type": "divider" }));
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*{group}*") }
        }));

        let fields: Vec<Value> = entries
            .iter()
            .flat_map(|e| fields(e))
            .map(|text| json!({ "type": "mrkdwn", "text": text }))
            .collect();

        for pair in fields.chunks(2) {
            blocks.push(json!({ "type": "section", "fields": pair }));
        }
    }

    json!({ "text": title, "blocks": blocks }).to_string()
}

fn fields(entry: &Entry) -> Vec<String> {
    match &entry.result {
        SourceResult::Ok(Payload::Observation(obs)) => {
            let value = obs.unit.format_value(obs.latest);
            let text = match &entry.change {
                Some(change) => format!(
                    "{} *{}*\n{} {}",
                    change.direction.glyph(),
                    entry.label,
                    value,
                    obs.unit.format_change(change)
                ),
                None => format!("*{}*\n{}", entry.label, value),
            };
            vec![text]
        }
        SourceResult::Ok(Payload::Flow(flow)) => flow
            .categories
            .iter()
            .map(|c| {
                format!(
                    "{} *{} net*\n{} (buy {} / sell {})",
                    c.direction().glyph(),
                    c.category,
                    signed(c.net()),
                    grouped(c.buy),
                    grouped(c.sell)
                )
            })
            .collect(),
        SourceResult::Missing(_) | SourceResult::Stale { .. } => {
            vec![format!("{MISSING_GLYPH} *{}*\nData not available", entry.label)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fixtures;

    fn payload() -> Value {
        serde_json::from_str(&render(&fixtures::report())).unwrap()
    }

    fn field_texts(payload: &Value) -> Vec<String> {
        payload["blocks"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|b| b["fields"].as_array())
            .flatten()
            .map(|f| f["text"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn starts_with_header_and_fallback_text() {
        let payload = payload();
        assert_eq!(payload["text"], "Market Summary for 2026-10-17");
        assert_eq!(payload["blocks"][0]["type"], "header");
        assert_eq!(
            payload["blocks"][0]["text"]["text"],
            "📊 Market Summary for 2026-10-17"
        );
    }

    #[test]
    fn fields_are_grouped_in_pairs() {
        let payload = payload();
        for block in payload["blocks"].as_array().unwrap() {
            if let Some(fields) = block["fields"].as_array() {
                assert!(!fields.is_empty() && fields.len() <= 2);
            }
        }

        // A and B share the first section.
        let first = payload["blocks"]
            .as_array()
            .unwrap()
            .iter()
            .find(|b| b["fields"].is_array())
            .unwrap();
        assert_eq!(first["fields"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn every_field_carries_a_glyph() {
        let texts = field_texts(&payload());
        assert_eq!(texts.len(), 5);

        assert_eq!(texts[0], "🟢 *A*\n20.00 +2.00 (+11.11%)");
        assert_eq!(texts[1], "⚠️ *B*\nData not available");
        assert_eq!(texts[2], "🟢 *10Y Treasury*\n4.33% +0.10 pp");
        assert_eq!(texts[3], "🟢 *foreign net*\n+300.25 (buy 1,500.25 / sell 1,200.00)");
        assert_eq!(texts[4], "🔴 *institutional net*\n-150.50 (buy 800.00 / sell 950.50)");
    }
}
