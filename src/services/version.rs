// Plugin version comparison.
// Versions are dotted numeric releases with an optional pre-release suffix
// ("2.0.0-RC1"). Missing trailing components count as zero.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedVersion {
    release: Vec<u64>,
    pre_release: Option<String>,
}

fn parse(version: &str) -> ParsedVersion {
    let version = version.trim().trim_start_matches(['v', 'V']);
    let (release, pre_release) = match version.find(['-', '+']) {
        Some(idx) => (&version[..idx], Some(version[idx + 1..].to_string())),
        None => (version, None),
    };

    let release = release
        .split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u64>().unwrap_or(0)
        })
        .collect();

    ParsedVersion {
        release,
        pre_release: pre_release.filter(|p| !p.is_empty()),
    }
}

/// Compares two version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    let a = parse(a);
    let b = parse(b);

    let len = a.release.len().max(b.release.len());
    for i in 0..len {
        let x = a.release.get(i).copied().unwrap_or(0);
        let y = b.release.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    match (&a.pre_release, &b.pre_release) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()),
    }
}

/// Returns true if `version` is strictly older than `current`.
pub fn is_older(version: &str, current: &str) -> bool {
    compare(version, current) == Ordering::Less
}
