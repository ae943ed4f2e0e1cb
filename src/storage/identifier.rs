//! Series key derivation
//!
//! A series is identified by the SHA-256 of its six defining fields joined
//! with `_`. Identical definitions collide on purpose: the id doubles as the
//! de-duplication key of the Metadata relation.

use super::types::SeriesId;
use sha2::{Digest, Sha256};

const SEPARATOR: &str = "_";

/// Derive the id of a measurement definition
pub fn derive(
    msr: &str,
    msr_attribute: &str,
    start_date: &str,
    end_date: &str,
    raster_size: i64,
    raster_unit: &str,
) -> SeriesId {
    let raster_size = raster_size.to_string();
    let name = [msr, msr_attribute, start_date, end_date, &raster_size, raster_unit].join(SEPARATOR);

    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    SeriesId::from_digest(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_derive_is_deterministic() {
        let a = derive("10BGA.80.01", "ISTWERT", "2016-01-01", "2024-01-01", 15, "min");
        let b = derive("10BGA.80.01", "ISTWERT", "2016-01-01", "2024-01-01", 15, "min");
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_known_digest() {
        // sha256("a_b_c_d_1_e")
        let id = derive("a", "b", "c", "d", 1, "e");
        let mut hasher = Sha256::new();
        hasher.update(b"a_b_c_d_1_e");
        assert_eq!(id.as_str(), format!("{:x}", hasher.finalize()));
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_each_field_changes_id() {
        let base = derive("M", "ATTR", "2023-01-01", "2023-12-31", 15, "min");
        let variants = [
            derive("M2", "ATTR", "2023-01-01", "2023-12-31", 15, "min"),
            derive("M", "ATTR2", "2023-01-01", "2023-12-31", 15, "min"),
            derive("M", "ATTR", "2023-01-02", "2023-12-31", 15, "min"),
            derive("M", "ATTR", "2023-01-01", "2023-12-30", 15, "min"),
            derive("M", "ATTR", "2023-01-01", "2023-12-31", 60, "min"),
            derive("M", "ATTR", "2023-01-01", "2023-12-31", 15, "h"),
        ];
        for v in &variants {
            assert_ne!(&base, v);
        }
    }

    #[test]
    fn test_field_order_matters() {
        let a = derive("X", "Y", "2023-01-01", "2023-12-31", 15, "min");
        let b = derive("Y", "X", "2023-01-01", "2023-12-31", 15, "min");
        assert_ne!(a, b);
    }

    #[test]
    fn test_no_collisions_across_corpus() {
        let mut seen = HashSet::new();
        for point in 0..50 {
            for attr in ["ISTWERT", "SOLLWERT", "MAX"] {
                for raster in [1, 15, 60] {
                    let id = derive(
                        &format!("10BGA.80.{:02}", point),
                        attr,
                        "2023-01-01",
                        "2023-12-31",
                        raster,
                        "min",
                    );
                    assert!(seen.insert(id));
                }
            }
        }
        assert_eq!(seen.len(), 50 * 3 * 3);
    }
}
