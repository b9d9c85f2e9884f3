//! Per-model position resolution

/// Static description of an actuator model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Model {
    /// Marketing name
    pub name: &'static str,
    /// Value of the `ModelNumber` register
    pub model_number: u16,
    /// Degrees per position unit
    pub degrees_per_unit: f32,
    /// Largest valid goal position
    pub max_position: u16,
}

impl Model {
    /// AX-12 / AX-12A: 300° over 0..=1023
    pub const AX12: Self = Self {
        name: "AX-12",
        model_number: 12,
        degrees_per_unit: 0.29,
        max_position: 1023,
    };

    /// MX-28: 360° over 0..=4095
    pub const MX28: Self = Self {
        name: "MX-28",
        model_number: 29,
        degrees_per_unit: 0.088,
        max_position: 4095,
    };

    /// Models this crate knows about
    pub const KNOWN: [Self; 2] = [Self::AX12, Self::MX28];

    /// Look up a model by the number an actuator reports in `ModelNumber`
    #[must_use]
    pub fn from_model_number(model_number: u16) -> Option<Self> {
        Self::KNOWN
            .into_iter()
            .find(|model| model.model_number == model_number)
    }

    /// Convert a raw position to degrees
    #[must_use]
    pub fn position_to_degrees(&self, position: u16) -> f32 {
        f32::from(position) * self.degrees_per_unit
    }

    /// Convert degrees to a raw position, clamped to `0..=max_position`
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn degrees_to_position(&self, degrees: f32) -> u16 {
        let units = (degrees / self.degrees_per_unit).round();
        if units.is_nan() || units <= 0.0 {
            0
        } else {
            units.min(f32::from(self.max_position)) as u16
        }
    }

    /// Full travel in degrees
    #[must_use]
    pub fn range_degrees(&self) -> f32 {
        self.position_to_degrees(self.max_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_model_number() {
        assert_eq!(Model::from_model_number(12), Some(Model::AX12));
        assert_eq!(Model::from_model_number(29), Some(Model::MX28));
        assert_eq!(Model::from_model_number(0xFFFF), None);
    }

    #[test]
    fn test_position_conversion() {
        let degrees = Model::AX12.position_to_degrees(512);
        assert!((degrees - 148.48).abs() < 0.01);
        assert_eq!(Model::AX12.degrees_to_position(148.48), 512);

        assert_eq!(Model::MX28.degrees_to_position(180.0), 2045);
    }

    #[test]
    fn test_degrees_clamped() {
        assert_eq!(Model::AX12.degrees_to_position(-10.0), 0);
        assert_eq!(Model::AX12.degrees_to_position(1000.0), 1023);
        assert_eq!(Model::MX28.degrees_to_position(f32::NAN), 0);
    }

    #[test]
    fn test_range() {
        assert!((Model::AX12.range_degrees() - 296.67).abs() < 0.01);
        assert!((Model::MX28.range_degrees() - 360.36).abs() < 0.01);
    }
}
