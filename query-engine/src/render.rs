//! Plain-text report rendering with character-budget truncation.

use crate::types::QueryOutput;

/// Truncation notice format; `N` is the configured budget.
fn truncation_notice(n: usize) -> String {
    format!("\n...[truncated max_context_chars={n}]\n")
}

/// Renders a query output as the human-readable report, truncated to
/// `max_context_chars` characters.
pub fn render_report(output: &QueryOutput, max_context_chars: usize) -> String {
    let mut s = String::new();
    s.push_str(&format!(
        "# query: {} (mode: {})\n",
        output.query,
        output.mode.as_str()
    ));

    if let Some(arch) = &output.architecture {
        s.push_str(&format!(
            "relations: imports={} depends_on={}\n",
            arch.imports, arch.depends_on
        ));
        if !arch.top_pairs.is_empty() {
            s.push_str("top depends_on pairs:\n");
            for (from, to, count) in &arch.top_pairs {
                s.push_str(&format!("  {from} -> {to} ({count})\n"));
            }
        }
        return truncate_report(s, max_context_chars);
    }

    if let Some(q) = &output.quality {
        s.push_str(&format!(
            "symbols={} relations={} doc_links={} text_docs={}\n",
            q.symbols, q.relations, q.doc_links, q.text_docs
        ));
        return truncate_report(s, max_context_chars);
    }

    if output.hits.is_empty() {
        s.push_str("no results\n");
        return truncate_report(s, max_context_chars);
    }

    for (i, hit) in output.hits.iter().enumerate() {
        let span = if hit.line_end > hit.line {
            format!("{}-{}", hit.line, hit.line_end)
        } else {
            hit.line.to_string()
        };
        s.push_str(&format!(
            "{}. {}:{} [{}] {} {} score={:.3}\n",
            i + 1,
            hit.file,
            span,
            hit.source,
            hit.kind,
            hit.name,
            hit.score
        ));
        if !hit.snippet.is_empty() {
            for line in hit.snippet.lines() {
                s.push_str("   ");
                s.push_str(line);
                s.push('\n');
            }
        }
        for group in &hit.relations {
            s.push_str(&format!("   {}: {}\n", group.kind, group.edges.join(", ")));
        }
        if !hit.doc_links.is_empty() {
            let links: Vec<String> = hit
                .doc_links
                .iter()
                .map(|l| format!("{} ({}:{})", l.symbol, l.file, l.line))
                .collect();
            s.push_str(&format!("   doc_links: {}\n", links.join(", ")));
        }
    }
    truncate_report(s, max_context_chars)
}

/// Rune-based truncation with the budget notice appended.
fn truncate_report(report: String, max_context_chars: usize) -> String {
    let budget = if max_context_chars == 0 {
        20_000
    } else {
        max_context_chars
    };
    if report.chars().count() <= budget {
        return report;
    }
    let mut out: String = report.chars().take(budget).collect();
    out.push_str(&truncation_notice(budget));
    out
}
