//! Beacon map parsing
//!
//! Site layouts are distributed as `Name;X;Y` text, one anchor per line,
//! with an optional `Name;X;Y` header. Decimal commas (`2,5`) are accepted.

use crate::core::AnchorPosition;
use crate::validation::error::{PositioningError, PositioningResult};
use tracing::warn;

/// Parse a beacon map, failing on the first malformed row
pub fn parse_beacon_map(text: &str) -> PositioningResult<Vec<AnchorPosition>> {
    let mut anchors = Vec::new();
    for (line, row) in rows(text) {
        anchors.push(parse_row(line, row)?);
    }
    Ok(anchors)
}

/// Parse a beacon map, skipping malformed rows.
///
/// Returns the anchors that parsed and one error per skipped row.
pub fn parse_beacon_map_lenient(text: &str) -> (Vec<AnchorPosition>, Vec<PositioningError>) {
    let mut anchors = Vec::new();
    let mut skipped = Vec::new();
    for (line, row) in rows(text) {
        match parse_row(line, row) {
            Ok(anchor) => anchors.push(anchor),
            Err(err) => {
                warn!(%err, "skipping beacon map row");
                skipped.push(err);
            }
        }
    }
    (anchors, skipped)
}

/// Non-empty, non-comment rows with 1-based line numbers, header removed
fn rows(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut header_checked = false;
    text.lines()
        .enumerate()
        .map(|(i, row)| (i + 1, row.trim()))
        .filter(|(_, row)| !row.is_empty() && !row.starts_with('#'))
        .filter(move |(_, row)| {
            if header_checked {
                return true;
            }
            header_checked = true;
            !is_header(row)
        })
}

fn is_header(row: &str) -> bool {
    row.split(';').next().is_some_and(|first| first.trim().eq_ignore_ascii_case("name"))
}

fn parse_row(line: usize, row: &str) -> PositioningResult<AnchorPosition> {
    let fields: Vec<&str> = row.split(';').map(str::trim).collect();
    if fields.len() < 3 {
        return Err(PositioningError::BeaconMap {
            line,
            reason: format!("expected Name;X;Y, got {} field(s)", fields.len()),
        });
    }

    let name = fields[0];
    if name.is_empty() {
        return Err(PositioningError::BeaconMap { line, reason: "empty anchor name".to_string() });
    }
    let x = parse_coordinate(line, "x", fields[1])?;
    let y = parse_coordinate(line, "y", fields[2])?;
    Ok(AnchorPosition::new(name, x, y))
}

fn parse_coordinate(line: usize, axis: &str, field: &str) -> PositioningResult<f64> {
    let value: f64 = field.replace(',', ".").parse().map_err(|_| PositioningError::BeaconMap {
        line,
        reason: format!("{axis} coordinate {field:?} is not a number"),
    })?;
    if !value.is_finite() {
        return Err(PositioningError::BeaconMap { line, reason: format!("{axis} coordinate is not finite") });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_header() {
        let text = "Name;X;Y\nbeacon_1;0;0\nbeacon_2;10,5;0\n\nbeacon_3; 5 ; 8.66\n";
        let anchors = parse_beacon_map(text).unwrap();
        assert_eq!(anchors.len(), 3);
        assert_eq!(anchors[1], AnchorPosition::new("beacon_2", 10.5, 0.0));
        assert_eq!(anchors[2].y, 8.66);
    }

    #[test]
    fn test_parse_without_header_and_comments() {
        let text = "# hall A\nA;1;2\nB;3;4\n";
        let anchors = parse_beacon_map(text).unwrap();
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].id.as_str(), "A");
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let text = "Name;X;Y\nA;1;2\nB;oops;4\n";
        let err = parse_beacon_map(text).unwrap_err();
        assert!(matches!(err, PositioningError::BeaconMap { line: 3, .. }));

        let err = parse_beacon_map("A;1\n").unwrap_err();
        assert!(matches!(err, PositioningError::BeaconMap { line: 1, .. }));
    }

    #[test]
    fn test_lenient_skips_bad_rows() {
        let text = "A;1;2\nB;x;4\n;5;5\nC;inf;1\nD;7;8\n";
        let (anchors, skipped) = parse_beacon_map_lenient(text);
        let ids: Vec<_> = anchors.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "D"]);
        assert_eq!(skipped.len(), 3);
    }

    #[test]
    fn test_empty_map() {
        assert!(parse_beacon_map("").unwrap().is_empty());
        assert!(parse_beacon_map("Name;X;Y\n").unwrap().is_empty());
    }
}
