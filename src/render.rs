use crate::report::{ReportSnapshot, Warning};
use clap::ValueEnum;
use std::fmt::Write;
use std::time::{Duration, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Html,
    Json,
}

pub fn render(
    format: Format,
    title: &str,
    snapshot: &ReportSnapshot,
    warnings: &[Warning],
) -> Result<String, serde_json::Error> {
    match format {
        Format::Html => Ok(render_html(title, snapshot, warnings)),
        Format::Json => render_json(snapshot, warnings),
    }
}

pub fn render_json(
    snapshot: &ReportSnapshot,
    warnings: &[Warning],
) -> Result<String, serde_json::Error> {
    #[derive(serde::Serialize)]
    struct Document<'a> {
        #[serde(flatten)]
        snapshot: &'a ReportSnapshot,
        warnings: &'a [Warning],
    }

    serde_json::to_string_pretty(&Document { snapshot, warnings })
}

pub fn render_html(title: &str, snapshot: &ReportSnapshot, warnings: &[Warning]) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_html(&mut out, title, snapshot, warnings);
    out
}

fn write_html(
    out: &mut String,
    title: &str,
    s: &ReportSnapshot,
    warnings: &[Warning],
) -> std::fmt::Result {
    writeln!(out, "<html>")?;
    writeln!(out, "<head><title>{}</title></head>", escape(title))?;
    writeln!(out, "<body>")?;
    if let Some(host) = &s.host_name {
        writeln!(out, "    <h1>{}</h1>", escape(host))?;
    }
    writeln!(
        out,
        "    <p>Generated at {}</p>",
        format_unix(s.generated_at_unix)
    )?;

    writeln!(out, "    <h2>Uptime:</h2>")?;
    writeln!(out, "    {}", format_uptime(s.uptime))?;

    writeln!(out, "    <h2>External IP address (WAN):</h2>")?;
    writeln!(out, "    {}", escape(&s.external_ip))?;

    writeln!(out, "    <h2>Network interfaces:</h2>")?;
    writeln!(out, "    <ul>")?;
    for iface in &s.interfaces {
        writeln!(out, "        <li>{}</li>", escape(iface))?;
    }
    writeln!(out, "    </ul>")?;

    writeln!(out, "    <h2>Failed logins:</h2>")?;
    writeln!(out, "    <table style=\"width: 350px\">")?;
    writeln!(
        out,
        "    <tr><th style=\"text-align: left\">IP address</th><th style=\"text-align: left\"># of failures</th></tr>"
    )?;
    for f in &s.failures {
        writeln!(
            out,
            "    <tr><td>{}</td><td>{}</td></tr>",
            escape(&f.source_address),
            f.attempt_count
        )?;
    }
    writeln!(out, "    </table>")?;

    writeln!(out, "    <h3>Disk usage</h3>")?;
    writeln!(out, "    <table style=\"width: 100%\">")?;
    write!(out, "        <thead><tr>")?;
    for head in [
        "Filesystem",
        "Size",
        "Used",
        "Available",
        "Percentage used",
        "Mount point",
    ] {
        write!(out, "<th style=\"text-align: left\">{head}</th>")?;
    }
    writeln!(out, "</tr></thead>")?;
    writeln!(out, "        <tbody>")?;
    for d in &s.disks {
        write!(out, "            <tr>")?;
        for cell in [
            &d.filesystem,
            &d.size,
            &d.used,
            &d.available,
            &d.use_percent,
            &d.mount_point,
        ] {
            write!(out, "<td>{}</td>", escape(cell))?;
        }
        writeln!(out, "</tr>")?;
    }
    writeln!(out, "        </tbody>")?;
    writeln!(out, "    </table>")?;

    if !warnings.is_empty() {
        writeln!(out, "    <h3>Collection warnings</h3>")?;
        writeln!(out, "    <ul>")?;
        for w in warnings {
            writeln!(
                out,
                "        <li>{}: {}</li>",
                w.source,
                escape(&w.message)
            )?;
        }
        writeln!(out, "    </ul>")?;
    }

    writeln!(out, "</body>")?;
    writeln!(out, "</html>")
}

pub fn format_uptime(d: Duration) -> String {
    let total = d.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    format!("{days} days, {hours} hours, {mins} minutes and {secs} seconds")
}

fn format_unix(ts: i64) -> String {
    let st = UNIX_EPOCH + Duration::from_secs(ts.max(0) as u64);
    humantime::format_rfc3339_seconds(st).to_string()
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authlog::FailureRecord;
    use crate::report::{DiskEntry, FactSource};

    fn snapshot() -> ReportSnapshot {
        ReportSnapshot {
            host_name: Some("web-1".to_string()),
            generated_at_unix: 0,
            uptime: Duration::from_secs(93_784),
            external_ip: "203.0.113.7".to_string(),
            interfaces: vec!["eth0: 192.168.1.10/24".to_string()],
            failures: vec![
                FailureRecord {
                    source_address: "10.0.0.5".to_string(),
                    attempt_count: 3,
                },
                FailureRecord {
                    source_address: "<script>".to_string(),
                    attempt_count: 1,
                },
            ],
            disks: vec![DiskEntry {
                filesystem: "/dev/sda1".to_string(),
                size: "50G".to_string(),
                used: "20G".to_string(),
                available: "30G".to_string(),
                use_percent: "40%".to_string(),
                mount_point: "/".to_string(),
            }],
        }
    }

    #[test]
    fn uptime_reads_like_a_sentence() {
        assert_eq!(
            format_uptime(Duration::from_secs(93_784)),
            "1 days, 2 hours, 3 minutes and 4 seconds"
        );
        assert_eq!(
            format_uptime(Duration::ZERO),
            "0 days, 0 hours, 0 minutes and 0 seconds"
        );
    }

    #[test]
    fn html_contains_every_section() {
        let html = render_html("Server report", &snapshot(), &[]);
        assert!(html.contains("<title>Server report</title>"));
        assert!(html.contains("<h1>web-1</h1>"));
        assert!(html.contains("1970-01-01T00:00:00Z"));
        assert!(html.contains("1 days, 2 hours, 3 minutes and 4 seconds"));
        assert!(html.contains("203.0.113.7"));
        assert!(html.contains("<li>eth0: 192.168.1.10/24</li>"));
        assert!(html.contains("<tr><td>10.0.0.5</td><td>3</td></tr>"));
        assert!(html.contains("<td>/dev/sda1</td><td>50G</td><td>20G</td><td>30G</td><td>40%</td><td>/</td>"));
        assert!(!html.contains("Collection warnings"));
    }

    #[test]
    fn html_escapes_log_content() {
        let html = render_html("a & b", &snapshot(), &[]);
        assert!(html.contains("<title>a &amp; b</title>"));
        assert!(html.contains("<td>&lt;script&gt;</td>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn html_lists_warnings() {
        let warnings = vec![Warning {
            source: FactSource::AuthLog,
            message: "unable to read `/var/log/auth.log': denied".to_string(),
        }];
        let html = render_html("Server report", &snapshot(), &warnings);
        assert!(html.contains("Collection warnings"));
        assert!(html.contains("<li>auth log: unable to read `/var/log/auth.log&#39;: denied</li>"));
    }

    #[test]
    fn json_flattens_snapshot_and_warnings() {
        let warnings = vec![Warning {
            source: FactSource::ExternalIp,
            message: "timeout".to_string(),
        }];
        let text = render(Format::Json, "ignored", &snapshot(), &warnings).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["external_ip"], "203.0.113.7");
        assert_eq!(v["uptime_seconds"], 93_784);
        assert_eq!(v["failures"][0]["source_address"], "10.0.0.5");
        assert_eq!(v["failures"][0]["attempt_count"], 3);
        assert_eq!(v["disks"][0]["mount_point"], "/");
        assert_eq!(v["warnings"][0]["source"], "external_ip");
    }
}
