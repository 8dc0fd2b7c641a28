//! Unit conversion of fetched points.
//!
//! Every convertible unit carries a base conversion factor: a value `v` in
//! that unit equals `v * factor + offset` in the base unit of its
//! dimension. Converting between two units of the same dimension goes
//! through the base unit.

use serde::Deserialize;
use std::collections::HashMap;

use crate::model::{DataPoint, IngestError};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ConversionFactor {
    pub factor: Option<f64>,
    #[serde(default)]
    pub offset: Option<f64>,
}

impl ConversionFactor {
    fn usable_factor(&self, unit_id: u64) -> Result<f64, IngestError> {
        match self.factor {
            Some(f) if f != 0.0 && f.is_finite() => Ok(f),
            _ => Err(IngestError::NotConvertible(unit_id)),
        }
    }
}

/// Converts `point` from its own unit (described by `from`) to
/// `target_unit_id` (described by `to`).
///
/// Points already in the target unit, or without a unit, come back
/// unchanged. Missing values stay missing; only `unit_id` changes.
pub fn convert_point(
    mut point: DataPoint,
    from: &ConversionFactor,
    to: &ConversionFactor,
    target_unit_id: u64,
) -> Result<DataPoint, IngestError> {
    let Some(source_unit_id) = point.unit_id else {
        return Ok(point);
    };
    if source_unit_id == target_unit_id {
        return Ok(point);
    }

    let from_factor = from.usable_factor(source_unit_id)?;
    let to_factor = to.usable_factor(target_unit_id)?;

    point.value = point.value.map(|v| {
        let base = v * from_factor + from.offset.unwrap_or(0.0);
        (base - to.offset.unwrap_or(0.0)) / to_factor
    });
    point.unit_id = Some(target_unit_id);
    Ok(point)
}

/// Converts every point of a fetch to `target_unit_id`.
///
/// `factor_of` resolves a unit's conversion factor. It is called at most
/// once per distinct unit, and never when every point is already in the
/// target unit or has no unit.
pub fn convert_points<F>(
    points: Vec<DataPoint>,
    target_unit_id: u64,
    mut factor_of: F,
) -> Result<Vec<DataPoint>, IngestError>
where
    F: FnMut(u64) -> Result<ConversionFactor, IngestError>,
{
    let mut factors: HashMap<u64, ConversionFactor> = HashMap::new();
    let mut factor = |unit_id: u64| -> Result<ConversionFactor, IngestError> {
        if let Some(f) = factors.get(&unit_id) {
            return Ok(*f);
        }
        let f = factor_of(unit_id)?;
        factors.insert(unit_id, f);
        Ok(f)
    };

    points
        .into_iter()
        .map(|point| match point.unit_id {
            Some(unit_id) if unit_id != target_unit_id => {
                let from = factor(unit_id)?;
                let to = factor(target_unit_id)?;
                convert_point(point, &from, &to, target_unit_id)
            }
            _ => Ok(point),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn point(value: Option<f64>, unit_id: Option<u64>) -> DataPoint {
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        DataPoint {
            start_date: end,
            end_date: end,
            value,
            unit_id,
            metric_id: 2540047,
            item_id: 3457,
            region_id: 13100,
            frequency_id: Some(1),
            reporting_date: None,
        }
    }

    // Kelvin is the base unit; Celsius is offset by 273.15.
    const KELVIN: ConversionFactor = ConversionFactor { factor: Some(1.0), offset: None };
    const CELSIUS: ConversionFactor = ConversionFactor { factor: Some(1.0), offset: Some(273.15) };

    #[test]
    fn test_celsius_to_kelvin() {
        let converted = convert_point(point(Some(20.0), Some(36)), &CELSIUS, &KELVIN, 37)
            .expect("both units are convertible");
        assert!((converted.value.unwrap() - 293.15).abs() < 1e-9);
        assert_eq!(converted.unit_id, Some(37));
    }

    #[test]
    fn test_scaled_units() {
        let millimeters = ConversionFactor { factor: Some(0.001), offset: None };
        let meters = ConversionFactor { factor: Some(1.0), offset: None };
        let converted = convert_point(point(Some(2500.0), Some(2)), &millimeters, &meters, 1)
            .expect("both units are convertible");
        assert!((converted.value.unwrap() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_value_keeps_none_but_changes_unit() {
        let converted = convert_point(point(None, Some(36)), &CELSIUS, &KELVIN, 37)
            .expect("both units are convertible");
        assert_eq!(converted.value, None);
        assert_eq!(converted.unit_id, Some(37));
    }

    #[test]
    fn test_same_unit_or_no_unit_is_unchanged() {
        let p = point(Some(5.0), Some(37));
        assert_eq!(convert_point(p.clone(), &KELVIN, &KELVIN, 37), Ok(p));
        let q = point(Some(5.0), None);
        assert_eq!(convert_point(q.clone(), &KELVIN, &KELVIN, 37), Ok(q));
    }

    #[test]
    fn test_unit_without_factor_is_not_convertible() {
        let none = ConversionFactor { factor: None, offset: None };
        assert_eq!(
            convert_point(point(Some(1.0), Some(99)), &none, &KELVIN, 37),
            Err(IngestError::NotConvertible(99))
        );
        assert_eq!(
            convert_point(point(Some(1.0), Some(36)), &CELSIUS, &none, 37),
            Err(IngestError::NotConvertible(37))
        );
    }

    // --- Whole fetches ------------------------------------------------------

    #[test]
    fn test_points_already_in_target_unit_need_no_factor_lookup() {
        let points = vec![point(Some(0.4), Some(5)), point(None, None)];
        let mut lookups = Vec::new();
        let converted = convert_points(points.clone(), 5, |unit_id| {
            lookups.push(unit_id);
            Err(IngestError::NotConvertible(unit_id))
        })
        .expect("nothing needs converting");
        assert_eq!(converted, points);
        assert!(lookups.is_empty());
    }

    #[test]
    fn test_each_unit_factor_is_looked_up_once() {
        let points = vec![
            point(Some(10.0), Some(36)),
            point(Some(20.0), Some(36)),
            point(Some(300.0), Some(37)),
        ];
        let mut lookups = Vec::new();
        let converted = convert_points(points, 37, |unit_id| {
            lookups.push(unit_id);
            match unit_id {
                36 => Ok(CELSIUS),
                37 => Ok(KELVIN),
                other => Err(IngestError::NotConvertible(other)),
            }
        })
        .expect("both units are convertible");
        assert_eq!(lookups, vec![36, 37]);
        assert!((converted[1].value.unwrap() - 293.15).abs() < 1e-9);
        assert_eq!(converted[2].value, Some(300.0));
        assert!(converted.iter().all(|p| p.unit_id == Some(37)));
    }

    #[test]
    fn test_unconvertible_source_unit_fails_the_fetch() {
        let points = vec![point(Some(1.0), Some(99))];
        let result = convert_points(points, 37, |unit_id| match unit_id {
            37 => Ok(KELVIN),
            other => Err(IngestError::NotConvertible(other)),
        });
        assert_eq!(result, Err(IngestError::NotConvertible(99)));
    }
}
