use crate::agents::vehicle::CarID;
use crate::agents::vehicles_storage::VehiclesStorage;
use std::fmt;
use std::fs;
use std::io;

/// Custom error types for answer writing.
#[derive(Debug)]
pub enum WriteError {
    /// The answer file could not be written.
    Io { path: String, source: io::Error },
}

impl fmt::Display for WriteError {
    /// Formats the error message for `WriteError`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Io { path, source } => {
                write!(f, "Cannot write '{}': {}", path, source)
            }
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WriteError::Io { source, .. } => Some(source),
        }
    }
}

/// Renders the answer payload: one `(car_id, departure_time, road, ...)`
/// line per scheduled vehicle in the given order. Road identifiers are the
/// original pre-split integers. Vehicles that never departed (unroutable
/// trips) are omitted.
pub fn format_answer(order: &[CarID], vehicles: &VehiclesStorage) -> String {
    let mut out = String::new();
    for car in order {
        let Some(vehicle) = vehicles.get(car) else {
            continue;
        };
        let Some(departure) = vehicle.actual_departure else {
            continue;
        };
        out.push('(');
        out.push_str(&vehicle.id.to_string());
        out.push_str(", ");
        out.push_str(&departure.to_string());
        for road in &vehicle.traversed_roads {
            out.push_str(", ");
            out.push_str(&road.base.to_string());
        }
        out.push_str(")\n");
    }
    out
}

/// Writes the answer file.
pub fn write_answer(
    path: &str,
    order: &[CarID],
    vehicles: &VehiclesStorage,
) -> Result<(), WriteError> {
    fs::write(path, format_answer(order, vehicles)).map_err(|source| WriteError::Io {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::vehicle::Vehicle;
    use crate::network::road::RoadID;

    #[test]
    fn test_format_answer_uses_base_road_ids() {
        let mut vehicles = VehiclesStorage::new();
        let mut vehicle = Vehicle::new(1001)
            .with_origin(1)
            .with_destination(3)
            .with_max_speed(4)
            .with_planned_departure(0)
            .build();
        vehicle.actual_departure = Some(2);
        vehicle.record_traversal(RoadID::new(7, 2), 1, 2);
        vehicle.record_traversal(RoadID::new(9, 1), 2, 3);
        vehicles.insert_vehicle(vehicle);

        assert_eq!(
            "(1001, 2, 7, 9)\n",
            format_answer(&[1001], &vehicles),
            "Directions must be stripped from the emitted road ids"
        );
    }

    #[test]
    fn test_format_answer_skips_undeparted_and_keeps_order() {
        let mut vehicles = VehiclesStorage::new();
        for (id, departure) in [(3, Some(5)), (1, None), (2, Some(1))] {
            let mut vehicle = Vehicle::new(id)
                .with_origin(1)
                .with_destination(1)
                .with_max_speed(2)
                .with_planned_departure(0)
                .build();
            vehicle.actual_departure = departure;
            vehicles.insert_vehicle(vehicle);
        }
        assert_eq!(
            "(3, 5)\n(2, 1)\n",
            format_answer(&[3, 1, 2], &vehicles),
            "Output must follow the given order and skip undeparted vehicles"
        );
    }
}
