//! The fixed set of tracked points, loaded once at startup.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub id: String,
    pub name: String,
    /// Bengali display name, empty when the file has none.
    pub bn_name: String,
    pub lat: f64,
    pub long: f64,
}

/// On-disk shape: coordinates are stored as strings.
#[derive(Deserialize)]
struct RawPoint {
    id: String,
    name: String,
    #[serde(default)]
    bn_name: String,
    lat: String,
    long: String,
}

#[derive(Deserialize)]
struct PointFile {
    districts: Vec<RawPoint>,
}

#[derive(Debug, Clone)]
pub struct PointStore {
    points: Vec<Point>,
}

impl PointStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: PointFile = serde_json::from_str(json)
            .map_err(|e| AppError::Config(format!("Invalid point file: {}", e)))?;

        let points = file
            .districts
            .into_iter()
            .filter_map(|raw| {
                let lat = raw.lat.trim().parse::<f64>();
                let long = raw.long.trim().parse::<f64>();
                match (lat, long) {
                    (Ok(lat), Ok(long)) => Some(Point { id: raw.id, name: raw.name, bn_name: raw.bn_name, lat, long }),
                    _ => {
                        warn!(id = %raw.id, name = %raw.name, "skipping point with unparsable coordinates");
                        None
                    }
                }
            })
            .collect();

        Self::from_points(points)
    }

    /// Names are the advisory lookup key, so they must be unique.
    pub fn from_points(points: Vec<Point>) -> Result<Self> {
        if points.is_empty() {
            return Err(AppError::Config("point set is empty".to_string()));
        }

        let mut seen = HashSet::with_capacity(points.len());
        for point in &points {
            if !seen.insert(point.name.as_str()) {
                return Err(AppError::Config(format!("duplicate point name: {}", point.name)));
            }
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Point> {
        self.points.iter().find(|p| p.name == name)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "districts": [
            {"id": "1", "division_id": "3", "name": "Dhaka", "bn_name": "ঢাকা", "lat": "23.7115253", "long": "90.4111451"},
            {"id": "2", "division_id": "2", "name": "Cox's Bazar", "bn_name": "কক্সবাজার", "lat": "21.44315751", "long": "91.97381741"},
            {"id": "3", "division_id": "2", "name": "Broken", "bn_name": "", "lat": "north", "long": "90.0"}
        ]
    }"#;

    #[test]
    fn loads_points_and_skips_bad_coordinates() {
        let store = PointStore::from_json(SAMPLE).unwrap();
        assert_eq!(store.points().len(), 2);
        assert_eq!(store.points()[0].name, "Dhaka");
        assert_eq!(store.points()[1].bn_name, "কক্সবাজার");
        assert!((store.points()[1].lat - 21.44315751).abs() < 1e-9);
    }

    #[test]
    fn finds_by_exact_name() {
        let store = PointStore::from_json(SAMPLE).unwrap();
        assert_eq!(store.find_by_name("Cox's Bazar").map(|p| p.id.as_str()), Some("2"));
        assert!(store.find_by_name("dhaka").is_none());
        assert!(store.find_by_name("Broken").is_none());
    }

    #[test]
    fn rejects_duplicate_names() {
        let points = vec![
            Point { id: "1".into(), name: "Sylhet".into(), bn_name: String::new(), lat: 24.9, long: 91.9 },
            Point { id: "2".into(), name: "Sylhet".into(), bn_name: String::new(), lat: 24.8, long: 91.8 },
        ];
        let err = PointStore::from_points(points).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("Sylhet")));
    }

    #[test]
    fn rejects_empty_set() {
        assert!(matches!(PointStore::from_json(r#"{"districts": []}"#), Err(AppError::Config(_))));
    }

    #[test]
    fn missing_file_is_config_error() {
        assert!(matches!(
            PointStore::load("/nonexistent/districts.json"),
            Err(AppError::Config(_))
        ));
    }
}
