use crate::collectors::CollectError;
use crate::report::DiskEntry;
use std::process::Command;
use tracing::debug;

const PSEUDO_FILESYSTEM: &str = "none";

pub fn collect_disk_usage(command: &str, args: &[String]) -> Result<Vec<DiskEntry>, CollectError> {
    let command_line = std::iter::once(command)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");

    let output = Command::new(command)
        .args(args)
        .output()
        .map_err(|err| CollectError::Command {
            command: command_line.clone(),
            reason: err.to_string(),
        })?;
    if !output.status.success() {
        return Err(CollectError::Command {
            command: command_line,
            reason: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    let entries = parse_df_output(&String::from_utf8_lossy(&output.stdout));
    debug!(command = %command_line, entries = entries.len(), "disk usage collected");
    Ok(entries)
}

/// Parses `df`-style output. The first line is a header; only rows with
/// exactly six columns are kept and the fields are copied verbatim.
pub fn parse_df_output(text: &str) -> Vec<DiskEntry> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let [filesystem, size, used, available, use_percent, mount_point] = parts[..] else {
                return None;
            };
            if filesystem == PSEUDO_FILESYSTEM {
                return None;
            }

            Some(DiskEntry {
                filesystem: filesystem.to_string(),
                size: size.to_string(),
                used: used.to_string(),
                available: available.to_string(),
                use_percent: use_percent.to_string(),
                mount_point: mount_point.to_string(),
            })
        })
        .collect()
}
