use crate::{format::dms_to_degrees, TagRegistry, TagStore, TagValue};

/// Position of an image, combined from its GPS tags.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GpsInfo {
    /// Decimal degrees, negative south of the equator.
    pub latitude: f64,
    /// Decimal degrees, negative west of Greenwich.
    pub longitude: f64,
    /// Meters, negative below sea level.
    pub altitude: Option<f64>,
}

impl GpsInfo {
    /// Returns an ISO 6709 geographic point location string such as
    /// `+48.85770+002.29500/`, or `+27.98806+086.92528+8848.9CRSWGS_84/`
    /// with altitude.
    pub fn to_iso6709(&self) -> String {
        let altitude = match self.altitude {
            Some(alt) => format!("{alt:+.1}CRSWGS_84"),
            None => String::new(),
        };
        format!(
            "{}{:08.5}{}{:09.5}{altitude}/",
            if self.latitude >= 0.0 { '+' } else { '-' },
            self.latitude.abs(),
            if self.longitude >= 0.0 { '+' } else { '-' },
            self.longitude.abs(),
        )
    }

    pub(crate) fn from_store(store: &TagStore, registry: &TagRegistry) -> Option<Self> {
        let value = |name: &str| store.get(registry, name, None).ok().map(|t| t.value());
        // refs are often stored with their ASCII terminator
        let negative = |name: &str, flag: &str| {
            value(name)
                .and_then(TagValue::as_str)
                .map(|x| x.trim_end_matches('\0'))
                == Some(flag)
        };

        let mut latitude = dms_to_degrees(value("GPSLatitude")?)?;
        if negative("GPSLatitudeRef", "S") {
            latitude = -latitude;
        }
        let mut longitude = dms_to_degrees(value("GPSLongitude")?)?;
        if negative("GPSLongitudeRef", "W") {
            longitude = -longitude;
        }

        let altitude = value("GPSAltitude").and_then(|v| v.as_number()).map(|alt| {
            let below = match value("GPSAltitudeRef") {
                Some(TagValue::Bytes(b)) => b.first() == Some(&1),
                Some(v) => v.as_int() == Some(1),
                None => false,
            };
            if below {
                -alt
            } else {
                alt
            }
        });

        Some(GpsInfo {
            latitude,
            longitude,
            altitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        testkit::{default_context, open_memory},
        MemoryBackend,
    };

    fn gps(tags: &[(&str, TagValue)]) -> Option<GpsInfo> {
        let ctx = default_context();
        let backend = Arc::new(MemoryBackend::new());
        open_memory(&ctx, &backend, "a.jpg", tags).get_gps_info()
    }

    #[test]
    fn gps_iso6709() {
        let palace = gps(&[
            ("GPSLatitudeRef", "N".into()),
            ("GPSLatitude", [(39, 1), (55, 1), (0, 1)].into()),
            ("GPSLongitudeRef", "E".into()),
            ("GPSLongitude", [(116, 1), (23, 1), (27, 1)].into()),
        ])
        .unwrap();
        assert_eq!(palace.altitude, None);
        assert_eq!(palace.to_iso6709(), "+39.91667+116.39083/");

        let liberty = gps(&[
            ("GPSLatitudeRef", "N".into()),
            ("GPSLatitude", [(40, 1), (41, 1), (21, 1)].into()),
            ("GPSLongitudeRef", "W".into()),
            ("GPSLongitude", [(74, 1), (2, 1), (40, 1)].into()),
            ("GPSAltitudeRef", vec![0u8].into()),
            ("GPSAltitude", (93, 1).into()),
        ])
        .unwrap();
        assert!((liberty.latitude - 40.68917).abs() < 1e-5);
        assert!((liberty.longitude + 74.04444).abs() < 1e-5);
        assert_eq!(liberty.to_iso6709(), "+40.68917-074.04444+93.0CRSWGS_84/");
    }

    #[test]
    fn southern_hemisphere_below_sea() {
        let info = gps(&[
            ("GPSLatitudeRef", "S".into()),
            ("GPSLatitude", [(33, 1), (52, 1), (4, 1)].into()),
            ("GPSLongitude", [(151, 1), (12, 1), (36, 1)].into()),
            ("GPSAltitudeRef", vec![1u8].into()),
            ("GPSAltitude", (5, 2).into()),
        ])
        .unwrap();
        assert!(info.latitude < 0.0);
        assert!(info.longitude > 0.0);
        assert_eq!(info.altitude, Some(-2.5));
    }

    #[test]
    fn nul_terminated_refs() {
        let info = gps(&[
            ("GPSLatitudeRef", "S\0".into()),
            ("GPSLatitude", [(33, 1), (52, 1), (4, 1)].into()),
            ("GPSLongitudeRef", "W\0".into()),
            ("GPSLongitude", [(70, 1), (40, 1), (0, 1)].into()),
        ])
        .unwrap();
        assert!((info.latitude + 33.86778).abs() < 1e-5);
        assert!((info.longitude + 70.66667).abs() < 1e-5);
        assert_eq!(info.to_iso6709(), "-33.86778-070.66667/");
    }

    #[test]
    fn incomplete() {
        assert_eq!(gps(&[]), None);
        assert_eq!(gps(&[("GPSLatitude", [(40, 1), (44, 1), (52, 1)].into())]), None);
    }
}
