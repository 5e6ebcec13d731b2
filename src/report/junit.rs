//! JUnit-style XML for CI test reporting

use crate::orchestrator::{CheckStatus, ItemResult, RunSummary};
use std::fmt::Write;

/// Render a run as JUnit XML: one testsuite per feature, one testcase per item
pub fn render(summary: &RunSummary) -> String {
    let mut suites: Vec<(&str, &str, Vec<&ItemResult>)> = Vec::new();
    for result in &summary.results {
        if let Some((_, _, items)) = suites
            .last_mut()
            .filter(|(id, _, _)| *id == result.feature_id)
        {
            items.push(result);
            continue;
        }
        suites.push((
            result.feature_id.as_str(),
            result.feature_name.as_str(),
            vec![result],
        ));
    }

    let total_time: f64 = summary.results.iter().map(|r| r.duration.as_secs_f64()).sum();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        xml,
        "<testsuites name=\"featverify ({})\" tests=\"{}\" failures=\"{}\" skipped=\"{}\" time=\"{:.3}\">",
        summary.depth,
        summary.total(),
        summary.failed,
        summary.skipped,
        total_time
    );

    for (feature_id, feature_name, items) in suites {
        let failures = items.iter().filter(|r| r.status == CheckStatus::Fail).count();
        let skipped = items.iter().filter(|r| r.status == CheckStatus::Skip).count();
        let time: f64 = items.iter().map(|r| r.duration.as_secs_f64()).sum();

        let _ = writeln!(
            xml,
            "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" skipped=\"{}\" time=\"{:.3}\">",
            escape(feature_name),
            items.len(),
            failures,
            skipped,
            time
        );

        for result in items {
            let _ = write!(
                xml,
                "    <testcase classname=\"{}\" name=\"{}\" time=\"{:.3}\"",
                escape(feature_id),
                escape(&format!("{}. {}", result.item_index + 1, result.text)),
                result.duration.as_secs_f64()
            );
            match result.status {
                CheckStatus::Pass => xml.push_str("/>\n"),
                CheckStatus::Fail => {
                    let body = if result.output.trim().is_empty() {
                        &result.detail
                    } else {
                        &result.output
                    };
                    let _ = writeln!(
                        xml,
                        ">\n      <failure message=\"{}\">{}</failure>\n    </testcase>",
                        escape(&result.detail),
                        escape(body.trim_end())
                    );
                }
                CheckStatus::Skip => {
                    let _ = writeln!(
                        xml,
                        ">\n      <skipped message=\"{}\"/>\n    </testcase>",
                        escape(&result.detail)
                    );
                }
            }
        }

        xml.push_str("  </testsuite>\n");
    }

    xml.push_str("</testsuites>\n");
    xml
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && !matches!(c, '\n' | '\t' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}
