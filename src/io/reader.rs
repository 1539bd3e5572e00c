use crate::agents::vehicle::Vehicle;
use crate::network::crossing::Crossing;
use crate::network::road::{Road, RoadID};
use std::fmt;
use std::fs;
use std::io;

/// Custom error types for input parsing.
#[derive(Debug)]
pub enum ReadError {
    /// The file could not be read at all.
    Io { path: String, source: io::Error },
    /// A data line is malformed; `line` is 1-based and counts every line.
    Parse {
        file: String,
        line: usize,
        reason: String,
    },
}

impl fmt::Display for ReadError {
    /// Formats the error message for `ReadError`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Io { path, source } => {
                write!(f, "Cannot read '{}': {}", path, source)
            }
            ReadError::Parse { file, line, reason } => {
                write!(f, "{}:{}: {}", file, line, reason)
            }
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io { source, .. } => Some(source),
            ReadError::Parse { .. } => None,
        }
    }
}

/// One car input record: `(id, from, to, max_speed, planned_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarRecord {
    pub id: i64,
    pub from: i64,
    pub to: i64,
    pub max_speed: i64,
    pub planned_time: i64,
}

impl fmt::Display for CarRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {})",
            self.id, self.from, self.to, self.max_speed, self.planned_time
        )
    }
}

/// One road input record: `(id, length, max_speed, lane_count, from, to, is_duplex)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadRecord {
    pub id: i64,
    pub length: i64,
    pub max_speed: i64,
    pub lane_count: i64,
    pub from: i64,
    pub to: i64,
    pub is_duplex: bool,
}

impl fmt::Display for RoadRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {}, {}, {})",
            self.id,
            self.length,
            self.max_speed,
            self.lane_count,
            self.from,
            self.to,
            if self.is_duplex { 1 } else { 0 }
        )
    }
}

/// One crossing input record: `(id, r1, r2, r3, r4)`, `-1` marking an empty slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossRecord {
    pub id: i64,
    pub slots: [i64; 4],
}

impl fmt::Display for CrossRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {})",
            self.id, self.slots[0], self.slots[1], self.slots[2], self.slots[3]
        )
    }
}

/// Parses a parenthesized comma-separated integer file.
///
/// Empty lines and lines starting with `#` are skipped; everything else
/// must be `(v1, v2, ...)` with optional whitespace around the commas.
fn parse_records(path: &str) -> Result<Vec<(usize, Vec<i64>)>, ReadError> {
    let content = fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: path.to_string(),
        source,
    })?;
    let mut records = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let inner = trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| ReadError::Parse {
                file: path.to_string(),
                line,
                reason: "record is not parenthesized".to_string(),
            })?;
        let mut fields = Vec::new();
        for field in inner.split(',') {
            let field = field.trim();
            let value = field.parse::<i64>().map_err(|_| ReadError::Parse {
                file: path.to_string(),
                line,
                reason: format!("not an integer field: '{}'", field),
            })?;
            fields.push(value);
        }
        records.push((line, fields));
    }
    Ok(records)
}

fn expect_fields(
    path: &str,
    line: usize,
    fields: &[i64],
    expected: usize,
) -> Result<(), ReadError> {
    if fields.len() != expected {
        return Err(ReadError::Parse {
            file: path.to_string(),
            line,
            reason: format!("expected {} fields, got {}", expected, fields.len()),
        });
    }
    Ok(())
}

/// Reads the car file.
pub fn read_cars(path: &str) -> Result<Vec<CarRecord>, ReadError> {
    let mut cars = Vec::new();
    for (line, fields) in parse_records(path)? {
        expect_fields(path, line, &fields, 5)?;
        cars.push(CarRecord {
            id: fields[0],
            from: fields[1],
            to: fields[2],
            max_speed: fields[3],
            planned_time: fields[4],
        });
    }
    Ok(cars)
}

/// Reads the road file.
pub fn read_roads(path: &str) -> Result<Vec<RoadRecord>, ReadError> {
    let mut roads = Vec::new();
    for (line, fields) in parse_records(path)? {
        expect_fields(path, line, &fields, 7)?;
        let is_duplex = match fields[6] {
            0 => false,
            1 => true,
            other => {
                return Err(ReadError::Parse {
                    file: path.to_string(),
                    line,
                    reason: format!("is_duplex must be 0 or 1, got {}", other),
                })
            }
        };
        roads.push(RoadRecord {
            id: fields[0],
            length: fields[1],
            max_speed: fields[2],
            lane_count: fields[3],
            from: fields[4],
            to: fields[5],
            is_duplex,
        });
    }
    Ok(roads)
}

/// Reads the crossing file.
pub fn read_crosses(path: &str) -> Result<Vec<CrossRecord>, ReadError> {
    let mut crosses = Vec::new();
    for (line, fields) in parse_records(path)? {
        expect_fields(path, line, &fields, 5)?;
        crosses.push(CrossRecord {
            id: fields[0],
            slots: [fields[1], fields[2], fields[3], fields[4]],
        });
    }
    Ok(crosses)
}

/// Materializes directed roads from input records, splitting duplex records
/// into their two directions.
pub fn build_roads(records: &[RoadRecord], block_threshold: f64) -> Vec<Road> {
    let mut roads = Vec::new();
    for record in records {
        let mut endpoints = vec![(1u8, record.from, record.to)];
        if record.is_duplex {
            endpoints.push((2, record.to, record.from));
        }
        for (direction, from, to) in endpoints {
            roads.push(
                Road::new(RoadID::new(record.id, direction))
                    .with_length(record.length)
                    .with_speed_limit(record.max_speed)
                    .with_lane_count(record.lane_count as usize)
                    .with_endpoints(from, to)
                    .with_block_threshold(block_threshold)
                    .build(),
            );
        }
    }
    roads
}

/// Materializes crossings from input records.
pub fn build_crossings(records: &[CrossRecord]) -> Vec<Crossing> {
    records
        .iter()
        .map(|record| Crossing::new(record.id, record.slots))
        .collect()
}

/// Materializes garaged vehicles from input records.
pub fn build_vehicles(records: &[CarRecord]) -> Vec<Vehicle> {
    records
        .iter()
        .map(|record| {
            Vehicle::new(record.id)
                .with_origin(record.from)
                .with_destination(record.to)
                .with_max_speed(record.max_speed)
                .with_planned_departure(record.planned_time)
                .build()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}_{}", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_cars_skips_comments_and_blanks() {
        let path = temp_file(
            "cars_ok.txt",
            "# id, from, to, speed, planned\n\n(1001, 1, 2, 4, 0)\n( 1002 ,2,  3, 6 , 5 )\n",
        );
        let cars = read_cars(path.to_str().unwrap()).unwrap();
        assert_eq!(2, cars.len());
        assert_eq!(
            CarRecord {
                id: 1002,
                from: 2,
                to: 3,
                max_speed: 6,
                planned_time: 5
            },
            cars[1],
            "Whitespace around fields must be tolerated"
        );
    }

    #[test]
    fn test_parse_error_carries_file_and_line() {
        let path = temp_file("cars_bad.txt", "# header\n(1, 2, 3, 4, 0)\n(2, x, 3, 4, 0)\n");
        let err = read_cars(path.to_str().unwrap()).unwrap_err();
        match err {
            ReadError::Parse { line, ref reason, .. } => {
                assert_eq!(3, line, "Line numbers are 1-based and count every line");
                assert!(reason.contains("'x'"), "Reason must name the bad field: {}", reason);
            }
            other => panic!("Expected a parse error, got {}", other),
        }
    }

    #[test]
    fn test_field_count_is_enforced() {
        let path = temp_file("roads_short.txt", "(5, 10, 4, 2, 1)\n");
        let err = read_roads(path.to_str().unwrap()).unwrap_err();
        assert!(
            matches!(err, ReadError::Parse { line: 1, .. }),
            "Short records must be rejected, got {}",
            err
        );
    }

    #[test]
    fn test_records_round_trip_modulo_whitespace() {
        let source = "(5, 10, 4, 2, 1, 2, 1)\n(6,12,6,3,2,3,0)\n";
        let path = temp_file("roads_rt.txt", source);
        let roads = read_roads(path.to_str().unwrap()).unwrap();
        let rendered: String = roads.iter().map(|r| format!("{}\n", r)).collect();
        let normalized: String = source
            .lines()
            .map(|line| {
                let inner: Vec<String> = line
                    .trim()
                    .trim_start_matches('(')
                    .trim_end_matches(')')
                    .split(',')
                    .map(|field| field.trim().to_string())
                    .collect();
                format!("({})\n", inner.join(", "))
            })
            .collect();
        assert_eq!(normalized, rendered, "Parse then render must round-trip");
    }

    #[test]
    fn test_duplex_roads_split_into_two_directions() {
        let records = vec![RoadRecord {
            id: 7,
            length: 8,
            max_speed: 4,
            lane_count: 2,
            from: 1,
            to: 2,
            is_duplex: true,
        }];
        let roads = build_roads(&records, 0.0);
        assert_eq!(2, roads.len());
        assert_eq!(RoadID::new(7, 1), roads[0].get_id());
        assert_eq!((1, 2), (roads[0].get_from_cross(), roads[0].get_to_cross()));
        assert_eq!(RoadID::new(7, 2), roads[1].get_id());
        assert_eq!(
            (2, 1),
            (roads[1].get_from_cross(), roads[1].get_to_cross()),
            "The second direction must run the reverse way"
        );
    }
}
