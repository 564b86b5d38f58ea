use crate::collectors::CollectError;
use if_addrs::IfAddr;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;
use sysinfo::{System, SystemExt};

pub fn read_uptime(path: &Path) -> Result<Duration, CollectError> {
    let text = fs::read_to_string(path).map_err(|source| CollectError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_uptime(&text)
}

/// `/proc/uptime` holds two fractional second counters; the first is uptime.
pub fn parse_uptime(text: &str) -> Result<Duration, CollectError> {
    let first = text.split_whitespace().next().unwrap_or_default();
    first
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| CollectError::Parse {
            what: "uptime",
            detail: format!("{first:?}"),
        })
}

pub fn collect_interfaces() -> Result<Vec<String>, CollectError> {
    let ifs = if_addrs::get_if_addrs().map_err(|source| CollectError::Io {
        path: "network interfaces".to_string(),
        source,
    })?;

    let addrs = ifs.into_iter().map(|iface| {
        let (ip, prefix) = match iface.addr {
            IfAddr::V4(v4) => (
                IpAddr::V4(v4.ip),
                v4.netmask.octets().iter().map(|b| b.count_ones()).sum::<u32>(),
            ),
            IfAddr::V6(v6) => (
                IpAddr::V6(v6.ip),
                v6.netmask.segments().iter().map(|s| s.count_ones()).sum::<u32>(),
            ),
        };
        (iface.name, format!("{ip}/{prefix}"))
    });

    Ok(group_by_interface(addrs))
}

/// One line per interface, `name: addr, addr`, in first-seen order.
pub fn group_by_interface<I>(addrs: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (name, addr) in addrs {
        match grouped.iter_mut().find(|(n, _)| *n == name) {
            Some((_, list)) => list.push(addr),
            None => grouped.push((name, vec![addr])),
        }
    }

    grouped
        .into_iter()
        .map(|(name, list)| format!("{name}: {}", list.join(", ")))
        .collect()
}

pub fn host_name() -> Option<String> {
    System::new().host_name()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_proc_uptime() {
        let d = parse_uptime("350735.47 234388.90\n").unwrap();
        assert_eq!(d.as_secs(), 350_735);
        assert!(d.subsec_millis() >= 469);
    }

    #[test]
    fn rejects_garbage_uptime() {
        assert!(parse_uptime("").is_err());
        assert!(parse_uptime("abc 1.0").is_err());
        assert!(parse_uptime("-5.0 1.0").is_err());
        assert!(parse_uptime("NaN 1.0").is_err());
    }

    #[test]
    fn out_of_range_uptime_is_a_parse_error() {
        let err = parse_uptime("1e30 0.0\n").unwrap_err();
        assert!(matches!(err, CollectError::Parse { what: "uptime", .. }));
    }

    #[test]
    fn reads_uptime_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"90061.00 10.00\n").unwrap();
        assert_eq!(read_uptime(file.path()).unwrap(), Duration::from_secs(90_061));
    }

    #[test]
    fn missing_uptime_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_uptime(&dir.path().join("uptime")).unwrap_err();
        assert!(matches!(err, CollectError::Io { .. }));
    }

    #[test]
    fn groups_addresses_per_interface() {
        let lines = group_by_interface(vec![
            ("lo".to_string(), "127.0.0.1/8".to_string()),
            ("eth0".to_string(), "192.168.1.10/24".to_string()),
            ("lo".to_string(), "::1/128".to_string()),
            ("eth0".to_string(), "fe80::1/64".to_string()),
        ]);
        assert_eq!(
            lines,
            vec![
                "lo: 127.0.0.1/8, ::1/128".to_string(),
                "eth0: 192.168.1.10/24, fe80::1/64".to_string(),
            ]
        );
    }
}
