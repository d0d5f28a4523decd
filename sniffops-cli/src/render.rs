// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Plain-text rendering of dashboard views

use sniffops_core::{flatten_json, format_timestamp, RiskLevel, Trace};
use sniffops_query::{FilterOptions, PageWindow, StatsReport, StatsSource};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cost with a fixed number of decimals, e.g. `$0.001200`
pub fn format_cost(cost: f64, decimals: usize) -> String {
    format!("${:.*}", decimals, cost)
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let cut: String = value.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// One row per trace, newest first as given
pub fn trace_table(traces: &[Trace]) -> String {
    if traces.is_empty() {
        return "No traces found".to_string();
    }

    let mut lines = vec![format!(
        "{:<19}  {:<8}  {:<8}  {:<14}  {:<24}  {:<7}  {:>8}  {}",
        "TIME", "RISK", "TOOL", "NAMESPACE", "TARGET", "RESULT", "LATENCY", "ID"
    )];
    for trace in traces {
        lines.push(format!(
            "{:<19}  {:<8}  {:<8}  {:<14}  {:<24}  {:<7}  {:>6}ms  {}",
            format_timestamp(trace.timestamp, TIME_FORMAT),
            trace.risk_level.as_str(),
            truncate(trace.short_tool_name(), 8),
            truncate(or_na(&trace.namespace), 14),
            truncate(or_na(&trace.target_resource), 24),
            trace.result.as_str(),
            trace.latency_ms,
            trace.id,
        ));
    }
    lines.join("\n")
}

/// `Showing 1 to 50 of 156 results · Page 1 of 4`
pub fn pagination_footer(window: &PageWindow) -> String {
    format!(
        "{} · Page {} of {}",
        window.summary(),
        window.current_page(),
        window.total_pages().max(1)
    )
}

fn section(lines: &mut Vec<String>, title: &str) {
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(title.to_string());
    lines.push("-".repeat(title.chars().count()));
}

fn output_lines(output: &str) -> Vec<String> {
    match serde_json::from_str::<serde_json::Value>(output) {
        Ok(value) if value.is_object() || value.is_array() => {
            let mut lines: Vec<String> = serde_json::to_string_pretty(&value)
                .unwrap_or_else(|_| output.to_string())
                .lines()
                .map(str::to_string)
                .collect();

            let rows = flatten_json(&value);
            let width = rows.iter().map(|r| r.key.chars().count()).max().unwrap_or(3).max(3);
            lines.push(String::new());
            lines.push(format!("{:<width$}  {}", "KEY", "VALUE", width = width));
            for row in rows {
                lines.push(format!("{:<width$}  {}", row.key, row.value, width = width));
            }
            lines
        }
        // Not structured; shown as-is
        _ => output.lines().map(str::to_string).collect(),
    }
}

/// Full detail view of a single trace
pub fn trace_detail(trace: &Trace) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Trace {}  ({})",
        trace.id,
        format_timestamp(trace.timestamp, TIME_FORMAT)
    ));
    if let Some(intent) = &trace.user_intent {
        lines.push(format!("Intent: {}", intent));
    }

    section(&mut lines, "Risk & Status");
    lines.push(format!("{} Risk  [{}]", trace.risk_level.label(), trace.result));
    if let Some(reason) = &trace.risk_reason {
        lines.push(format!("  {}", reason));
    }

    section(&mut lines, "Tool Information");
    lines.push(format!("  Tool:            {}", trace.tool_name));
    lines.push(format!("  Namespace:       {}", or_na(&trace.namespace)));
    lines.push(format!("  Resource Kind:   {}", or_na(&trace.resource_kind)));
    lines.push(format!("  Target Resource: {}", or_na(&trace.target_resource)));
    if let Some(cluster) = &trace.cluster_name {
        lines.push(format!("  Cluster:         {}", cluster));
    }

    section(&mut lines, "Command");
    lines.push(format!("  {}", trace.command));

    if let Some(output) = &trace.output {
        section(&mut lines, "Output");
        lines.extend(output_lines(output));
    }

    if let Some(error) = &trace.error_message {
        section(&mut lines, "Error");
        lines.push(error.clone());
    }

    section(&mut lines, "Metrics");
    let latency = if trace.latency_ms > 0 {
        format!("{}ms", trace.latency_ms)
    } else {
        "N/A".to_string()
    };
    lines.push(format!("  Latency:         {}", latency));
    lines.push(format!("  Session ID:      {}", or_na(&trace.session_id)));
    if trace.tokens_input.is_some() || trace.tokens_output.is_some() {
        let show = |v: Option<u64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
        lines.push(format!(
            "  Tokens (In/Out): {} / {}",
            show(trace.tokens_input),
            show(trace.tokens_output)
        ));
    }
    if let Some(cost) = trace.cost_estimate {
        lines.push(format!("  Cost Estimate:   {}", format_cost(cost, 6)));
    }

    lines.join("\n")
}

/// Summary cards, risk distribution, top tools and the hourly timeline
pub fn stats_report(report: &StatsReport, top: usize) -> String {
    let stats = &report.stats;
    let mut lines = Vec::new();

    section(&mut lines, &format!("Statistics ({})", report.period));
    if report.source == StatsSource::Page {
        lines.push("  (store unavailable; computed from the displayed traces only)".to_string());
    }
    lines.push(format!("  Total Operations: {}", stats.total_operations));
    lines.push(format!(
        "  Critical Risks:   {}",
        stats.risk_distribution.get(RiskLevel::Critical)
    ));
    lines.push(format!(
        "  Estimated Cost:   {}",
        format_cost(stats.total_cost_estimate, 4)
    ));
    if let Some(latency) = &stats.latency {
        if latency.count > 0 {
            lines.push(format!(
                "  Latency:          avg {:.0}ms, min {:.0}ms, max {:.0}ms",
                latency.avg(),
                latency.min,
                latency.max
            ));
        }
    }
    if let Some(tokens) = &stats.tokens {
        lines.push(format!(
            "  Tokens:           {} in / {} out",
            tokens.input, tokens.output
        ));
    }

    section(&mut lines, "Risk Distribution");
    let total = stats.risk_distribution.total();
    for (level, count) in stats.risk_distribution.entries() {
        let pct = if total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / total as f64
        };
        lines.push(format!("  {:<9} {:>6}  {:>5.1}%", level.label(), count, pct));
    }

    section(&mut lines, &format!("Top {} Tools", top));
    let tools = stats.top_tools(top);
    if tools.is_empty() {
        lines.push("  No data".to_string());
    }
    for (rank, tool) in tools.iter().enumerate() {
        lines.push(format!("  {}. {:<20} {}", rank + 1, tool.tool, tool.count));
    }

    if !stats.timeline.is_empty() {
        section(&mut lines, "Timeline (hourly)");
        for point in &stats.timeline {
            lines.push(format!("  {}  {}", point.hour, point.count));
        }
    }

    lines.join("\n")
}

pub fn filter_options(options: &FilterOptions) -> String {
    let mut lines = Vec::new();
    section(&mut lines, "Namespaces");
    lines.extend(options.namespaces.iter().map(|n| format!("  {}", n)));
    section(&mut lines, "Tools");
    lines.extend(options.tools.iter().map(|t| format!("  {}", t)));
    section(&mut lines, "Risk Levels");
    lines.extend(RiskLevel::ALL.iter().map(|r| format!("  {}", r)));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sniffops_query::{compute_stats, sample_traces, PageSize, StatsPeriod};

    const NOW: i64 = 1_750_000_000_000;

    fn sample(id: &str) -> Trace {
        sample_traces(NOW).into_iter().find(|t| t.id == id).unwrap()
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(0.0012, 6), "$0.001200");
        assert_eq!(format_cost(0.0097, 4), "$0.0097");
        assert_eq!(format_cost(0.0, 4), "$0.0000");
    }

    #[test]
    fn test_detail_flattens_json_output() {
        let detail = trace_detail(&sample("trace-003"));
        assert!(detail.contains("Low Risk"));
        assert!(detail.contains("\"kind\": \"PodList\""));
        assert!(detail.contains("metadata.resourceVersion  48213"));
        assert!(detail.contains("Cost Estimate:   $0.001500"));
        assert!(detail.contains("Tokens (In/Out): 75 / 200"));
    }

    #[test]
    fn test_detail_plain_output_and_error() {
        let mut trace = sample("trace-005");
        trace.output = Some("service/api-service configured\n{partial".to_string());

        let detail = trace_detail(&trace);
        assert!(detail.contains("service/api-service configured"));
        assert!(!detail.contains("KEY"));
        assert!(detail.contains("Error\n-----\nInvalid service specification"));
    }

    #[test]
    fn test_detail_without_metrics() {
        let trace = Trace::new("t-1", "sniff_get", RiskLevel::High, NOW);
        let detail = trace_detail(&trace);
        assert!(detail.contains("Latency:         N/A"));
        assert!(detail.contains("Session ID:      N/A"));
        assert!(!detail.contains("Tokens"));
        assert!(!detail.contains("Cost Estimate"));
    }

    #[test]
    fn test_trace_table() {
        let traces = sample_traces(NOW);
        let table = trace_table(&traces);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[0].starts_with("TIME"));
        assert!(lines[2].contains("critical"));
        assert!(lines[2].contains("delete"));
        assert!(lines[2].ends_with("trace-002"));

        assert_eq!(trace_table(&[]), "No traces found");
    }

    #[test]
    fn test_pagination_footer() {
        let window = PageWindow::new(PageSize::DEFAULT, 50, 156);
        assert_eq!(
            pagination_footer(&window),
            "Showing 51 to 100 of 156 results · Page 2 of 4"
        );
        let empty = PageWindow::new(PageSize::DEFAULT, 0, 0);
        assert_eq!(pagination_footer(&empty), "Showing 0 of 0 results · Page 1 of 1");
    }

    #[test]
    fn test_stats_report() {
        let report = StatsReport {
            period: StatsPeriod::LastDay,
            source: StatsSource::Store,
            stats: compute_stats(&sample_traces(NOW)),
        };
        let text = stats_report(&report, 2);
        assert!(text.contains("Total Operations: 7"));
        assert!(text.contains("Estimated Cost:   $0.0097"));
        assert!(text.contains("Top 2 Tools"));
        assert!(text.contains("1. sniff_apply"));
        assert!(!text.contains("3. "));
        assert!(!text.contains("store unavailable"));
    }
}
