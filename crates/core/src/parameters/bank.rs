//! Parameter bank
//!
//! The flat, fixed-schema aggregate of all tunable fields. Consumers read
//! typed fields directly (`bank.controller.velocity_clamp`); remote access
//! goes through the registry and the byte image.
//!
//! # Image layout
//!
//! ```text
//! [0]      force_default_parameters (u8, 0 or 1)
//! [1..]    registry fields in registry order, little-endian, packed
//! ```

use super::error::ParameterError;
use super::registry::{
    lookup, FieldInfo, ParamType, ParamValue, BANK_LENGTH, MAX_VALUE_LEN, OFFSETS, REGISTRY,
};
use heapless::Vec;

/// Compiled default of the force-defaults flag (see `build.rs`)
pub const FORCE_DEFAULT_PARAMETERS: bool = parse_flag(env!("KUGLE_FORCE_DEFAULT_PARAMETERS"));

const fn parse_flag(value: &str) -> bool {
    matches!(value.as_bytes(), b"1" | b"true" | b"TRUE" | b"True")
}

/// Debug output switches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugParams {
    pub enable_log_output: bool,
    pub enable_raw_sensor_output: bool,
    /// Emit raw sensor packages every N-th sample
    pub raw_sensor_decimation: u16,
}

/// Behavioural mode flags
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviouralParams {
    pub independent_heading: bool,
    pub yaw_velocity_braking: bool,
    pub step_test_enabled: bool,
    pub velocity_controller_enabled: bool,
    pub joystick_velocity_control: bool,
}

/// Balance and velocity controller settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerParams {
    /// Controller loop rate in Hz
    pub sample_rate: f32,
    pub mode: u8,
    pub controller_type: u8,
    pub enable_torque_lpf: bool,
    /// Velocity reference clamp in m/s
    pub velocity_clamp: f32,
    pub velocity_integral_gain: f32,
    /// Maximum tilt correction in degrees
    pub velocity_max_tilt: f32,
    /// Maximum integral tilt correction in degrees
    pub velocity_max_integral_correction: f32,
}

/// State estimator settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorParams {
    /// Estimator loop rate in Hz
    pub sample_rate: f32,
    pub enable_sensor_lpf_filters: bool,
    pub enable_software_lpf_filters: bool,
    pub create_qdot_from_q_difference: bool,
    pub use_madgwick: bool,
    pub use_velocity_estimator: bool,
    pub estimate_com: bool,
}

/// Physical model constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    /// Distance from ball centre to body centre of mass in metres
    pub l: f32,
    /// Ball mass in kg
    pub mk: f32,
    /// Body mass in kg
    pub mb: f32,
    pub encoder_ticks_per_rev: u32,
}

/// Scratch values for bench testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestParams {
    pub tmp: f32,
    pub tmp2: f32,
}

/// The complete parameter bank
///
/// `Copy`, so snapshots and commits are whole-value assignments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterBank {
    /// Overwrite persisted parameters with the compiled defaults at attach time
    pub force_default_parameters: bool,
    pub debug: DebugParams,
    pub behavioural: BehaviouralParams,
    pub controller: ControllerParams,
    pub estimator: EstimatorParams,
    pub model: ModelParams,
    pub test: TestParams,
}

impl ParameterBank {
    /// Compiled defaults
    pub const DEFAULT: Self = Self {
        force_default_parameters: FORCE_DEFAULT_PARAMETERS,
        debug: DebugParams {
            enable_log_output: true,
            enable_raw_sensor_output: false,
            raw_sensor_decimation: 1,
        },
        behavioural: BehaviouralParams {
            independent_heading: false,
            yaw_velocity_braking: true,
            step_test_enabled: false,
            velocity_controller_enabled: false,
            joystick_velocity_control: false,
        },
        controller: ControllerParams {
            sample_rate: 200.0,
            mode: 1,
            controller_type: 0,
            enable_torque_lpf: true,
            velocity_clamp: 1.0,
            velocity_integral_gain: 1.0,
            velocity_max_tilt: 5.0,
            velocity_max_integral_correction: 10.0,
        },
        estimator: EstimatorParams {
            sample_rate: 200.0,
            enable_sensor_lpf_filters: true,
            enable_software_lpf_filters: false,
            create_qdot_from_q_difference: false,
            use_madgwick: false,
            use_velocity_estimator: true,
            estimate_com: false,
        },
        model: ModelParams {
            l: 0.42,
            mk: 1.46,
            mb: 11.0,
            encoder_ticks_per_rev: 4480,
        },
        test: TestParams { tmp: 0.0, tmp2: 0.0 },
    };

    /// Serialize the bank into its flat image
    pub fn to_image(&self) -> [u8; BANK_LENGTH] {
        let mut image = [0u8; BANK_LENGTH];
        image[0] = self.force_default_parameters as u8;
        for (field, &offset) in REGISTRY.iter().zip(OFFSETS.iter()) {
            (field.get)(self).write_le_bytes(&mut image[offset..offset + field.value_len()]);
        }
        image
    }

    /// Deserialize a bank from its flat image
    ///
    /// Fails if the image length differs from [`BANK_LENGTH`] or if any field
    /// holds a value the typed bank cannot represent.
    pub fn from_image(image: &[u8]) -> Result<Self, ParameterError> {
        if image.len() != BANK_LENGTH {
            return Err(ParameterError::TypeOrLengthMismatch);
        }

        let mut bank = Self::DEFAULT;
        bank.force_default_parameters = match image[0] {
            0 => false,
            1 => true,
            _ => return Err(ParameterError::TypeOrLengthMismatch),
        };
        for (field, &offset) in REGISTRY.iter().zip(OFFSETS.iter()) {
            let bytes = &image[offset..offset + field.value_len()];
            let value = ParamValue::from_le_bytes(field.param_type, bytes)?;
            (field.set)(&mut bank, value)?;
        }
        Ok(bank)
    }

    /// Read a field by registry address
    pub fn get(&self, group: u8, id: u8) -> Result<ParamValue, ParameterError> {
        let info = lookup(group, id).ok_or(ParameterError::UnknownParameter)?;
        Ok((info.descriptor.get)(self))
    }

    /// Encoded value of a field, together with its registry entry
    pub fn get_bytes(
        &self,
        group: u8,
        id: u8,
    ) -> Result<(FieldInfo, Vec<u8, MAX_VALUE_LEN>), ParameterError> {
        let info = lookup(group, id).ok_or(ParameterError::UnknownParameter)?;
        let mut buf = [0u8; MAX_VALUE_LEN];
        let len = (info.descriptor.get)(self).write_le_bytes(&mut buf);
        let mut value = Vec::new();
        value
            .extend_from_slice(&buf[..len])
            .map_err(|_| ParameterError::TypeOrLengthMismatch)?;
        Ok((info, value))
    }

    /// Write a typed value by registry address
    pub fn set(&mut self, group: u8, id: u8, value: ParamValue) -> Result<(), ParameterError> {
        let info = lookup(group, id).ok_or(ParameterError::UnknownParameter)?;
        (info.descriptor.set)(self, value)
    }

    /// Write a field from its wire representation
    ///
    /// The declared type tag and array length must match the registry entry,
    /// and `payload` must be exactly `array_len * width` bytes. On any error
    /// the bank is left untouched.
    pub fn set_bytes(
        &mut self,
        group: u8,
        id: u8,
        declared_type: u8,
        declared_array_len: u8,
        payload: &[u8],
    ) -> Result<FieldInfo, ParameterError> {
        let info = lookup(group, id).ok_or(ParameterError::UnknownParameter)?;

        let declared_type =
            ParamType::from_u8(declared_type).ok_or(ParameterError::TypeOrLengthMismatch)?;
        if declared_type != info.param_type()
            || declared_array_len != info.array_len()
            || payload.len() != info.value_len()
        {
            return Err(ParameterError::TypeOrLengthMismatch);
        }

        let value = ParamValue::from_le_bytes(declared_type, payload)?;
        (info.descriptor.set)(self, value)?;
        Ok(info)
    }
}

impl Default for ParameterBank {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::registry::{param_id, ParamGroup};

    const CONTROLLER: u8 = ParamGroup::Controller as u8;
    const TEST: u8 = ParamGroup::Test as u8;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("yes please"));
    }

    #[test]
    fn test_image_round_trip_of_defaults() {
        let bank = ParameterBank::DEFAULT;
        let image = bank.to_image();
        assert_eq!(ParameterBank::from_image(&image), Ok(bank));
    }

    #[test]
    fn test_image_places_fields_at_registry_offsets() {
        let mut bank = ParameterBank::DEFAULT;
        bank.controller.mode = 7;
        bank.model.encoder_ticks_per_rev = 0x0102_0304;

        let image = bank.to_image();
        let mode = lookup(CONTROLLER, param_id::controller::MODE).unwrap();
        assert_eq!(image[mode.offset], 7);

        let ticks = lookup(ParamGroup::Model as u8, param_id::model::ENCODER_TICKS_PER_REV).unwrap();
        assert_eq!(
            &image[ticks.offset..ticks.offset + 4],
            &[0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn test_from_image_rejects_wrong_length() {
        let image = ParameterBank::DEFAULT.to_image();
        assert!(ParameterBank::from_image(&image[..BANK_LENGTH - 1]).is_err());
    }

    #[test]
    fn test_from_image_rejects_erased_flash() {
        let image = [0xFFu8; BANK_LENGTH];
        assert!(ParameterBank::from_image(&image).is_err());
    }

    #[test]
    fn test_set_bytes_then_get_bytes() {
        let mut bank = ParameterBank::DEFAULT;
        let payload = 2.5f32.to_le_bytes();
        bank.set_bytes(TEST, param_id::test::TMP, ParamType::Float.as_u8(), 1, &payload)
            .unwrap();
        assert_eq!(bank.test.tmp, 2.5);

        let (info, value) = bank.get_bytes(TEST, param_id::test::TMP).unwrap();
        assert_eq!(info.param_type(), ParamType::Float);
        assert_eq!(value.as_slice(), &payload);
    }

    #[test]
    fn test_set_bytes_rejects_mismatches_without_mutation() {
        let mut bank = ParameterBank::DEFAULT;
        let before = bank;
        let mode = param_id::controller::MODE;

        // Wrong type
        assert_eq!(
            bank.set_bytes(CONTROLLER, mode, ParamType::Uint16.as_u8(), 1, &[2, 0])
                .err(),
            Some(ParameterError::TypeOrLengthMismatch)
        );
        // Wrong array length
        assert!(bank
            .set_bytes(CONTROLLER, mode, ParamType::Uint8.as_u8(), 2, &[2, 2])
            .is_err());
        // Payload length differs from array_len * width
        assert!(bank
            .set_bytes(CONTROLLER, mode, ParamType::Uint8.as_u8(), 1, &[2, 0])
            .is_err());
        assert!(bank
            .set_bytes(CONTROLLER, mode, ParamType::Uint8.as_u8(), 1, &[])
            .is_err());
        // Unknown type tag
        assert!(bank.set_bytes(CONTROLLER, mode, 9, 1, &[2]).is_err());
        // Unknown address
        assert_eq!(
            bank.set_bytes(CONTROLLER, 0x7F, ParamType::Uint8.as_u8(), 1, &[2])
                .err(),
            Some(ParameterError::UnknownParameter)
        );

        assert_eq!(bank, before);
    }

    #[test]
    fn test_set_bytes_rejects_non_canonical_bool() {
        let mut bank = ParameterBank::DEFAULT;
        let before = bank;
        let result = bank.set_bytes(
            CONTROLLER,
            param_id::controller::ENABLE_TORQUE_LPF,
            ParamType::Bool.as_u8(),
            1,
            &[2],
        );
        assert_eq!(result.err(), Some(ParameterError::TypeOrLengthMismatch));
        assert_eq!(bank, before);
    }

    #[test]
    fn test_typed_set_checks_variant() {
        let mut bank = ParameterBank::DEFAULT;
        assert!(bank
            .set(CONTROLLER, param_id::controller::MODE, ParamValue::Float(1.0))
            .is_err());
        bank.set(CONTROLLER, param_id::controller::MODE, ParamValue::Uint8(3))
            .unwrap();
        assert_eq!(
            bank.get(CONTROLLER, param_id::controller::MODE),
            Ok(ParamValue::Uint8(3))
        );
    }
}
