//! Output formatting for iam4sa

use crate::diagnose::{ClusterReport, RoleState, ServiceAccountReport, SummaryRow};
use chrono::{DateTime, SecondsFormat, Utc};
use owo_colors::{OwoColorize, Stream};
use std::fmt::Write;

/// Failed events shown per service account in `get`
pub const MAX_FAILED_EVENTS: usize = 5;

/// Audience IRSA tokens are issued for
pub const STS_AUDIENCE: &str = "sts.amazonaws.com";

/// Bold when stdout supports colors and they are not disabled
pub fn bold(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.bold()).to_string()
}

pub fn green(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.green()).to_string()
}

pub fn red(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.red()).to_string()
}

pub fn yellow(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.yellow()).to_string()
}

/// Align headers and rows into space separated columns.
///
/// Widths are measured with colour escapes removed, so a cell painted by
/// [`red`] (a non-zero FAILED count, say) pads like its plain text. Cells past
/// the last header are dropped.
pub fn format_table_raw(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }

    let mut lines = vec![bold(&table_line(headers.iter().copied(), &widths))];
    for row in rows {
        lines.push(table_line(row.iter().map(String::as_str), &widths));
    }
    lines.join("\n")
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut line = String::new();
    for (cell, width) in cells.zip(widths) {
        line.push_str(cell);
        line.push_str(&" ".repeat(width - display_width(cell) + 2));
    }
    line.trim_end().to_string()
}

/// Printed width of a cell, ignoring SGR colour sequences (`ESC [ ... m`)
fn display_width(cell: &str) -> usize {
    strip_ansi_codes(cell).chars().count()
}

/// Drop SGR colour sequences, leaving the visible text
fn strip_ansi_codes(s: &str) -> String {
    let mut visible = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // skip through the terminating 'm'
            chars.by_ref().find(|&c| c == 'm');
        } else {
            visible.push(c);
        }
    }
    visible
}

/// Pretty print a JSON document, `None` if it is not JSON
pub fn json_pretty(document: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(document).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

fn rfc3339(time: Option<&DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn yes_no(value: bool) -> String {
    if value {
        green("yes")
    } else {
        red("no")
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `list` table
pub fn format_summary(rows: &[SummaryRow]) -> String {
    let headers = [
        "NAMESPACE",
        "SERVICE ACCOUNT",
        "PODS",
        "IAM ROLE ACCOUNT",
        "IAM ROLE",
        "EVENTS",
        "FAILED",
    ];
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let failed = if row.failed_events > 0 {
                red(&row.failed_events.to_string())
            } else {
                row.failed_events.to_string()
            };
            vec![
                row.namespace.clone(),
                row.name.clone(),
                row.pods.to_string(),
                row.role_account.clone(),
                row.role_name.clone(),
                row.events.to_string(),
                failed,
            ]
        })
        .collect();

    format_table_raw(&headers, &rows)
}

/// `get` report for one service account
pub fn format_report(report: &ServiceAccountReport) -> String {
    let sa = &report.service_account;
    let mut out = String::new();

    let _ = writeln!(out, "Namespace: {} Name: {}", sa.namespace, bold(&sa.name));
    let _ = writeln!(out, "Pods:");
    for pod in &sa.pods {
        let _ = writeln!(out, "  {pod}");
    }
    let _ = writeln!(out, "IAM Role ARN: {}", sa.iam_role_arn);

    match &report.oidc_provider {
        Some(provider) => {
            let _ = writeln!(out, "  Expected Federated Principal: {}", provider.arn);
            let _ = writeln!(out, "  Expected aud: \"{}:aud\": \"{STS_AUDIENCE}\"", provider.url);
            let _ = writeln!(
                out,
                "  Expected sub: \"{}:sub\": \"{}\"",
                provider.url,
                sa.username()
            );
        }
        None => {
            let _ = writeln!(out, "  Expected Federated Principal: {}", yellow("unknown"));
        }
    }

    match &report.role {
        RoleState::Found(role) => {
            if !role.description.is_empty() {
                let _ = writeln!(out, "  Description: {}", role.description);
            }
            let _ = writeln!(out, "  Created: {}", rfc3339(role.create_date.as_ref()));
            if let Some(last_used) = role.last_used.as_ref() {
                let _ = writeln!(out, "  Last Used: {}", rfc3339(Some(last_used)));
            }
            if let Some(trusted) = report.trust_matches() {
                let _ = writeln!(out, "  Trusts Service Account: {}", yes_no(trusted));
            }
            let _ = writeln!(out, "  Assume Policy Document:");
            let document = json_pretty(&role.assume_role_policy_document)
                .unwrap_or_else(|| role.assume_role_policy_document.clone());
            let _ = writeln!(out, "{}", indent(&document, "    "));
        }
        RoleState::NotFound => {
            let _ = writeln!(out, "  Role: {}", red("not found"));
        }
        RoleState::Failed(reason) => {
            let _ = writeln!(out, "  Role: {} ({reason})", red("not found"));
        }
    }

    let failed = report.failed_events();
    if !failed.is_empty() {
        let _ = writeln!(out, "Failed Events:");
        let rows: Vec<Vec<String>> = failed
            .iter()
            .take(MAX_FAILED_EVENTS)
            .map(|event| {
                vec![
                    rfc3339(event.event_time.as_ref()),
                    event.error_code.clone(),
                    event.error_message.clone(),
                    event.request_parameters.role_arn.clone(),
                    sa.iam_role_arn.clone(),
                ]
            })
            .collect();
        let _ = writeln!(
            out,
            "{}",
            format_table_raw(
                &["TIME", "CODE", "MESSAGE", "REQUEST ROLE", "ACTUAL ROLE"],
                &rows
            )
        );
    }

    out
}

/// `cluster` report
pub fn format_cluster(report: &ClusterReport) -> String {
    let cluster = &report.cluster;
    let mut out = String::new();

    let _ = writeln!(out, "Name:        {}", cluster.name);
    let _ = writeln!(out, "Status:      {}", cluster.status);
    let _ = writeln!(out, "Endpoint:    {}", cluster.endpoint);
    let _ = writeln!(out, "Created:     {}", rfc3339(cluster.created_at.as_ref()));
    let _ = writeln!(out, "OIDC Issuer:");
    let _ = writeln!(out, "  Url:         {}", cluster.oidc_issuer);
    let _ = writeln!(
        out,
        "  Thumbprint:  {}",
        report.fingerprint.as_deref().unwrap_or("unavailable")
    );

    let Some(provider) = report.oidc_provider.as_found() else {
        let _ = writeln!(out, "OIDC Provider: {}", red("not found"));
        return out;
    };

    let _ = writeln!(out, "OIDC Provider:");
    let _ = writeln!(out, "  Arn:         {}", provider.arn);
    let _ = writeln!(out, "  Url:         {}", provider.url);
    let _ = writeln!(out, "  Created:     {}", rfc3339(provider.create_date.as_ref()));
    let _ = writeln!(out, "  Client Ids:");
    for id in &provider.client_ids {
        let _ = writeln!(out, "    {id}");
    }
    let _ = writeln!(out, "  Thumbprints:");
    for thumbprint in &provider.thumbprints {
        let _ = writeln!(out, "    {thumbprint}");
    }
    if let Some(matches) = report.thumbprint_matches() {
        let _ = writeln!(out, "  Thumbprint Match: {}", yes_no(matches));
    }

    out
}

/// Serialize any report as pretty JSON
pub fn format_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
