//! Server-rendered dashboard page (plain HTML).

use chrono::{DateTime, FixedOffset};

use crate::export::header_row;
use crate::report::CachedReport;

const STYLES: &str = r#"<style>
  body { font-family: system-ui, sans-serif; margin: 24px; color: #1d2430; }
  h1 { font-size: 20px; margin-bottom: 4px; }
  .subtitle { color: #667085; margin-top: 0; }
  .actions { margin: 16px 0; display: flex; gap: 8px; }
  table { border-collapse: collapse; width: 100%; font-size: 14px; }
  th, td { border: 1px solid #d0d5dd; padding: 6px 8px; text-align: left; vertical-align: top; }
  th { background: #f2f4f7; }
  tr.priority td { background: #ffff99; }
  td.stage { white-space: nowrap; text-align: right; }
  textarea { width: 100%; min-height: 36px; font: inherit; }
  .empty { color: #667085; padding: 24px 0; }
  .filters { display: flex; gap: 16px; align-items: flex-start; margin-bottom: 12px; }
  .filters select[multiple] { min-width: 220px; min-height: 72px; }
  tr.hidden-by-filters { display: none; }
</style>"#;

const SCRIPT: &str = r#"<script>
function selectedValues(select) {
  return select ? Array.from(select.selectedOptions).map(o => o.value) : [];
}
function applyFilters() {
  const priorityOnly = document.getElementById("priority-toggle")?.checked;
  const recruiter = document.getElementById("recruiter-filter")?.value || "all";
  const vacancies = selectedValues(document.getElementById("vacancy-filter"));
  document.querySelectorAll("table tbody tr").forEach(row => {
    const members = JSON.parse(row.dataset.members || "[]");
    const visible = (!priorityOnly || row.dataset.priority === "true")
      && (recruiter === "all" || members.includes(parseInt(recruiter, 10)))
      && (vacancies.length === 0 || vacancies.includes(row.dataset.vacancyName));
    row.classList.toggle("hidden-by-filters", !visible);
  });
}
document.addEventListener("DOMContentLoaded", () => {
  ["priority-toggle", "recruiter-filter", "vacancy-filter"].forEach(id => {
    document.getElementById(id)?.addEventListener("change", applyFilters);
  });
  applyFilters();
});
async function saveComment(button) {
  const row = button.closest("tr");
  const body = { vacancy_name: row.dataset.vacancyName, comment: row.querySelector("textarea").value };
  const res = await fetch("/update-comment", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify(body),
  });
  const data = await res.json();
  button.textContent = res.ok ? "Saved" : (data.message || "Error");
}
async function refreshReport(button) {
  button.disabled = true;
  button.textContent = "Refreshing...";
  const res = await fetch("/refresh-report", { method: "POST" });
  const data = await res.json();
  if (res.ok) { location.reload(); } else { button.textContent = data.message || "Error"; button.disabled = false; }
}
</script>"#;

/// Render the report table.
pub fn render_dashboard(report: &CachedReport, last_updated: Option<DateTime<FixedOffset>>) -> String {
    let updated = last_updated
        .map(|ts| ts.format("%d.%m.%Y %H:%M (UTC%:z)").to_string())
        .unwrap_or_else(|| "never".to_string());

    let body = if report.is_empty() {
        r#"<p class="empty">No report data yet.</p>"#.to_string()
    } else {
        format!("{}{}", render_filters(report), render_table(report))
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width,initial-scale=1" />
  <title>Hiring funnel</title>
  {STYLES}
</head>
<body>
  <h1>Hiring funnel</h1>
  <p class="subtitle">Last updated: {updated}. Stage cells show all-time total (this week).</p>
  <div class="actions">
    <button onclick="refreshReport(this)">Refresh now</button>
    <a href="/download-report"><button>Download XLSX</button></a>
  </div>
  {body}
  {SCRIPT}
</body>
</html>"#
    )
}

/// Priority toggle, recruiter selector (from coworkers) and vacancy multi-select.
fn render_filters(report: &CachedReport) -> String {
    let mut recruiters: Vec<(&u64, &String)> = report.coworkers.iter().collect();
    recruiters.sort_by(|a, b| a.1.cmp(b.1));
    let recruiter_options: String = recruiters
        .into_iter()
        .map(|(id, name)| format!(r#"<option value="{id}">{}</option>"#, escape_html(name)))
        .collect();

    let vacancy_options: String = report
        .rows
        .iter()
        .map(|row| {
            let name = escape_html(&row.vacancy_name);
            format!(r#"<option value="{name}">{name}</option>"#)
        })
        .collect();

    format!(
        r#"<div class="filters">
    <label><input type="checkbox" id="priority-toggle" /> Priority only</label>
    <label>Recruiter <select id="recruiter-filter"><option value="all">All</option>{recruiter_options}</select></label>
    <label>Vacancies <select id="vacancy-filter" multiple>{vacancy_options}</select></label>
  </div>"#
    )
}

fn render_table(report: &CachedReport) -> String {
    let header: String = header_row()
        .iter()
        .map(|h| format!("<th>{}</th>", escape_html(h)))
        .collect();

    let rows: String = report
        .rows
        .iter()
        .map(|row| {
            let class = if row.is_priority { r#" class="priority""# } else { "" };
            let name = escape_html(&row.vacancy_name);
            let members = format!(
                "[{}]",
                row.members
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            );
            let stages: String = row
                .stage_counts
                .iter()
                .map(|(_, count)| format!(r#"<td class="stage">{count}</td>"#))
                .collect();
            format!(
                r#"<tr{class} data-vacancy-name="{name}" data-priority="{}" data-members="{members}"><td>{name}</td>{stages}<td><textarea>{}</textarea><button onclick="saveComment(this)">Save</button></td></tr>"#,
                row.is_priority,
                escape_html(&row.comment)
            )
        })
        .collect();

    format!("<table><thead><tr>{header}</tr></thead><tbody>{rows}</tbody></table>")
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
