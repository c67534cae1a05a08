//! Markdown report generation
//!
//! This module generates human-readable markdown reports of crawl results,
//! including statistics, the explored state tree, and failed URLs.

use crate::output::CrawlReport;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report to `output_path`
pub fn write_markdown_report(report: &CrawlReport, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_report(report: &CrawlReport) -> String {
    let mut md = String::new();
    let stats = &report.statistics;

    md.push_str("# Delta-Ripple Crawl Report\n\n");

    // Run metadata
    if let Some(run) = &report.run {
        md.push_str("## Run Information\n\n");
        md.push_str(&format!("- **Run ID**: {}\n", run.id));
        md.push_str(&format!("- **Started**: {}\n", run.started_at));
        if let Some(finished) = &run.finished_at {
            md.push_str(&format!("- **Finished**: {}\n", finished));
        }
        if let Some(duration) = report.duration_seconds {
            md.push_str(&format!(
                "- **Duration**: {} seconds ({:.2} minutes)\n",
                duration,
                duration as f64 / 60.0
            ));
        }
        md.push_str(&format!("- **Status**: {}\n", run.status.to_db_string()));
        md.push_str(&format!("- **Config Hash**: {}\n\n", run.config_hash));
    }

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Web Pages**: {}\n", stats.pages.web));
    md.push_str(&format!("- **Delta Pages**: {}\n", stats.pages.delta));
    md.push_str(&format!("- **URLs Discovered**: {}\n", stats.urls.discovered));
    md.push_str(&format!("- **URLs Visited**: {}\n", stats.urls.visited));
    md.push_str(&format!("- **URLs Failed**: {}\n", stats.urls.failed));
    md.push_str(&format!("- **Clickables**: {}\n", stats.total_clickables()));
    md.push_str(&format!(
        "- **Classified**: {:.2}%\n\n",
        stats.classified_rate()
    ));

    // Clickable breakdown
    if stats.total_clickables() > 0 {
        md.push_str("## Clickable Breakdown\n\n");
        md.push_str("| Type | Count |\n");
        md.push_str("|------|-------|\n");
        for (clickable_type, count) in stats.sorted_clickable_types() {
            md.push_str(&format!("| {} | {} |\n", clickable_type, count));
        }
        md.push('\n');
    }

    if !report.delta_depth_breakdown.is_empty() {
        md.push_str("## Delta Depth Breakdown\n\n");
        md.push_str("| Delta Depth | Delta Pages |\n");
        md.push_str("|-------------|-------------|\n");
        for (depth, count) in &report.delta_depth_breakdown {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    // Explored states, children listed under their parent
    if !report.pages.is_empty() {
        md.push_str("## Explored States\n\n");
        for page in report.pages.iter().filter(|p| p.parent_id.is_none()) {
            push_state(&mut md, report, page.id, 0);
        }
        md.push('\n');
    }

    if !report.clusters.is_empty() {
        md.push_str("## Page Clusters\n\n");
        for (index, members) in report.clusters.iter().enumerate() {
            let ids: Vec<String> = members.iter().map(|id| id.to_string()).collect();
            md.push_str(&format!("- Cluster {}: pages {}\n", index + 1, ids.join(", ")));
        }
        md.push('\n');
    }

    if !report.failed_urls.is_empty() {
        md.push_str("## Failed URLs\n\n");
        md.push_str("| URL | Status | Landing URL |\n");
        md.push_str("|-----|--------|-------------|\n");
        for url in report.failed_urls.iter().take(50) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                url.url,
                url.response_code.unwrap_or(0),
                url.landing_url.as_deref().unwrap_or("-")
            ));
        }
        if report.failed_urls.len() > 50 {
            md.push_str(&format!(
                "\n... and {} more\n",
                report.failed_urls.len() - 50
            ));
        }
        md.push('\n');
    }

    md
}

fn push_state(md: &mut String, report: &CrawlReport, id: i64, indent: usize) {
    let Some(page) = report.pages.iter().find(|p| p.id == id) else {
        return;
    };

    let label = match &page.generator {
        Some(generator) => format!("delta {} via `{}`", page.id, generator),
        None => format!("page {} {}", page.id, page.url),
    };
    md.push_str(&format!(
        "{}- {} ({} clickables, {} links, {} forms)\n",
        "  ".repeat(indent),
        label,
        page.clickable_count,
        page.link_count,
        page.form_count
    ));

    for child in report.pages.iter().filter(|p| p.parent_id == Some(id)) {
        push_state(md, report, child.id, indent + 1);
    }
}
