//! Parameter registry
//!
//! Compile-time table mapping `(group, id)` to a typed field of the
//! [`ParameterBank`] and to its offset inside the flat bank image.
//!
//! Each entry carries a type discriminant and a pair of typed accessors, so
//! remote get/set requests are validated against the discriminant and never
//! touch the bank through raw addresses.

use super::bank::ParameterBank;
use super::error::ParameterError;

/// Wire type tag of a parameter field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ParamType {
    /// Boolean, one byte (0 or 1)
    Bool = 0,
    /// 32-bit IEEE 754 float
    Float = 1,
    /// 8-bit unsigned integer
    Uint8 = 2,
    /// 16-bit unsigned integer
    Uint16 = 3,
    /// 32-bit unsigned integer
    Uint32 = 4,
}

impl ParamType {
    /// Encoded width of one element in bytes
    pub const fn width(self) -> usize {
        match self {
            ParamType::Bool | ParamType::Uint8 => 1,
            ParamType::Uint16 => 2,
            ParamType::Float | ParamType::Uint32 => 4,
        }
    }

    /// Decode a wire type tag
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ParamType::Bool),
            1 => Some(ParamType::Float),
            2 => Some(ParamType::Uint8),
            3 => Some(ParamType::Uint16),
            4 => Some(ParamType::Uint32),
            _ => None,
        }
    }

    /// Wire type tag
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Typed parameter value (union of supported field types)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Float(f32),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
}

impl ParamValue {
    /// Get parameter type
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::Bool(_) => ParamType::Bool,
            ParamValue::Float(_) => ParamType::Float,
            ParamValue::Uint8(_) => ParamType::Uint8,
            ParamValue::Uint16(_) => ParamType::Uint16,
            ParamValue::Uint32(_) => ParamType::Uint32,
        }
    }

    /// Decode a little-endian value of the given type
    ///
    /// `bytes` must be exactly one element wide. A bool must be 0 or 1.
    pub fn from_le_bytes(param_type: ParamType, bytes: &[u8]) -> Result<Self, ParameterError> {
        if bytes.len() != param_type.width() {
            return Err(ParameterError::TypeOrLengthMismatch);
        }

        let value = match param_type {
            ParamType::Bool => match bytes[0] {
                0 => ParamValue::Bool(false),
                1 => ParamValue::Bool(true),
                _ => return Err(ParameterError::TypeOrLengthMismatch),
            },
            ParamType::Uint8 => ParamValue::Uint8(bytes[0]),
            ParamType::Uint16 => ParamValue::Uint16(u16::from_le_bytes([bytes[0], bytes[1]])),
            ParamType::Uint32 => {
                ParamValue::Uint32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            ParamType::Float => ParamValue::Float(f32::from_bits(u32::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]))),
        };

        Ok(value)
    }

    /// Encode little-endian into the front of `buf`, returning the number of bytes written
    ///
    /// # Panics
    ///
    /// Panics if `buf` is shorter than the type width.
    pub fn write_le_bytes(&self, buf: &mut [u8]) -> usize {
        match *self {
            ParamValue::Bool(v) => buf[0] = v as u8,
            ParamValue::Uint8(v) => buf[0] = v,
            ParamValue::Uint16(v) => buf[..2].copy_from_slice(&v.to_le_bytes()),
            ParamValue::Uint32(v) => buf[..4].copy_from_slice(&v.to_le_bytes()),
            ParamValue::Float(v) => buf[..4].copy_from_slice(&v.to_bits().to_le_bytes()),
        }
        self.param_type().width()
    }
}

macro_rules! impl_try_from_value {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl TryFrom<ParamValue> for $ty {
                type Error = ParameterError;

                fn try_from(value: ParamValue) -> Result<Self, Self::Error> {
                    match value {
                        ParamValue::$variant(v) => Ok(v),
                        _ => Err(ParameterError::TypeOrLengthMismatch),
                    }
                }
            }
        )*
    };
}

impl_try_from_value!(Bool => bool, Float => f32, Uint8 => u8, Uint16 => u16, Uint32 => u32);

/// Parameter group (first byte of a parameter address)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ParamGroup {
    Debug = 0x01,
    Behavioural = 0x02,
    Controller = 0x03,
    Estimator = 0x04,
    Model = 0x05,
    Test = 0x06,
}

impl ParamGroup {
    /// Decode a wire group id
    pub fn from_u8(id: u8) -> Option<Self> {
        match id {
            0x01 => Some(ParamGroup::Debug),
            0x02 => Some(ParamGroup::Behavioural),
            0x03 => Some(ParamGroup::Controller),
            0x04 => Some(ParamGroup::Estimator),
            0x05 => Some(ParamGroup::Model),
            0x06 => Some(ParamGroup::Test),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            ParamGroup::Debug => "debug",
            ParamGroup::Behavioural => "behavioural",
            ParamGroup::Controller => "controller",
            ParamGroup::Estimator => "estimator",
            ParamGroup::Model => "model",
            ParamGroup::Test => "test",
        }
    }
}

/// Parameter ids within each group
pub mod param_id {
    pub mod debug {
        pub const ENABLE_LOG_OUTPUT: u8 = 0x01;
        pub const ENABLE_RAW_SENSOR_OUTPUT: u8 = 0x02;
        pub const RAW_SENSOR_DECIMATION: u8 = 0x03;
    }

    pub mod behavioural {
        pub const INDEPENDENT_HEADING: u8 = 0x01;
        pub const YAW_VELOCITY_BRAKING: u8 = 0x02;
        pub const STEP_TEST_ENABLED: u8 = 0x03;
        pub const VELOCITY_CONTROLLER_ENABLED: u8 = 0x04;
        pub const JOYSTICK_VELOCITY_CONTROL: u8 = 0x05;
    }

    pub mod controller {
        pub const SAMPLE_RATE: u8 = 0x01;
        pub const MODE: u8 = 0x02;
        pub const TYPE: u8 = 0x03;
        pub const ENABLE_TORQUE_LPF: u8 = 0x04;
        pub const VELOCITY_CLAMP: u8 = 0x05;
        pub const VELOCITY_INTEGRAL_GAIN: u8 = 0x06;
        pub const VELOCITY_MAX_TILT: u8 = 0x07;
        pub const VELOCITY_MAX_INTEGRAL_CORRECTION: u8 = 0x08;
    }

    pub mod estimator {
        pub const SAMPLE_RATE: u8 = 0x01;
        pub const ENABLE_SENSOR_LPF_FILTERS: u8 = 0x02;
        pub const ENABLE_SOFTWARE_LPF_FILTERS: u8 = 0x03;
        pub const CREATE_QDOT_FROM_Q_DIFFERENCE: u8 = 0x04;
        pub const USE_MADGWICK: u8 = 0x05;
        pub const USE_VELOCITY_ESTIMATOR: u8 = 0x06;
        pub const ESTIMATE_COM: u8 = 0x07;
    }

    pub mod model {
        pub const L: u8 = 0x01;
        pub const MK: u8 = 0x02;
        pub const MB: u8 = 0x03;
        pub const ENCODER_TICKS_PER_REV: u8 = 0x04;
    }

    pub mod test {
        pub const TMP: u8 = 0x01;
        pub const TMP2: u8 = 0x02;
    }
}

/// Static description of one bank field
pub struct FieldDescriptor {
    pub group: ParamGroup,
    pub id: u8,
    pub name: &'static str,
    pub param_type: ParamType,
    /// Always 1; array fields are not supported
    pub array_len: u8,
    pub get: fn(&ParameterBank) -> ParamValue,
    pub set: fn(&mut ParameterBank, ParamValue) -> Result<(), ParameterError>,
}

impl FieldDescriptor {
    /// Encoded length of the field value in bytes
    pub const fn value_len(&self) -> usize {
        self.param_type.width() * self.array_len as usize
    }
}

impl core::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("group", &self.group)
            .field("id", &self.id)
            .field("name", &self.name)
            .field("param_type", &self.param_type)
            .field("array_len", &self.array_len)
            .finish()
    }
}

macro_rules! field {
    ($group:ident, $id:expr, $name:literal, $ty:ident, $($path:ident).+) => {
        FieldDescriptor {
            group: ParamGroup::$group,
            id: $id,
            name: $name,
            param_type: ParamType::$ty,
            array_len: 1,
            get: |bank| ParamValue::$ty(bank.$($path).+),
            set: |bank, value| {
                bank.$($path).+ = value.try_into()?;
                Ok(())
            },
        }
    };
}

/// Number of registered fields
pub const FIELD_COUNT: usize = 29;

/// Bytes at the start of the bank image that are not registry fields
///
/// Holds the force-defaults flag.
pub const IMAGE_HEADER_LEN: usize = 1;

const FIELDS: [FieldDescriptor; FIELD_COUNT] = {
    use param_id::*;
    [
        field!(Debug, debug::ENABLE_LOG_OUTPUT, "EnableLogOutput", Bool, debug.enable_log_output),
        field!(Debug, debug::ENABLE_RAW_SENSOR_OUTPUT, "EnableRawSensorOutput", Bool, debug.enable_raw_sensor_output),
        field!(Debug, debug::RAW_SENSOR_DECIMATION, "RawSensorDecimation", Uint16, debug.raw_sensor_decimation),
        field!(Behavioural, behavioural::INDEPENDENT_HEADING, "IndependentHeading", Bool, behavioural.independent_heading),
        field!(Behavioural, behavioural::YAW_VELOCITY_BRAKING, "YawVelocityBraking", Bool, behavioural.yaw_velocity_braking),
        field!(Behavioural, behavioural::STEP_TEST_ENABLED, "StepTestEnabled", Bool, behavioural.step_test_enabled),
        field!(Behavioural, behavioural::VELOCITY_CONTROLLER_ENABLED, "VelocityControllerEnabled", Bool, behavioural.velocity_controller_enabled),
        field!(Behavioural, behavioural::JOYSTICK_VELOCITY_CONTROL, "JoystickVelocityControl", Bool, behavioural.joystick_velocity_control),
        field!(Controller, controller::SAMPLE_RATE, "SampleRate", Float, controller.sample_rate),
        field!(Controller, controller::MODE, "mode", Uint8, controller.mode),
        field!(Controller, controller::TYPE, "type", Uint8, controller.controller_type),
        field!(Controller, controller::ENABLE_TORQUE_LPF, "EnableTorqueLPF", Bool, controller.enable_torque_lpf),
        field!(Controller, controller::VELOCITY_CLAMP, "VelocityController_VelocityClamp", Float, controller.velocity_clamp),
        field!(Controller, controller::VELOCITY_INTEGRAL_GAIN, "VelocityController_IntegralGain", Float, controller.velocity_integral_gain),
        field!(Controller, controller::VELOCITY_MAX_TILT, "VelocityController_MaxTilt", Float, controller.velocity_max_tilt),
        field!(Controller, controller::VELOCITY_MAX_INTEGRAL_CORRECTION, "VelocityController_MaxIntegralCorrection", Float, controller.velocity_max_integral_correction),
        field!(Estimator, estimator::SAMPLE_RATE, "SampleRate", Float, estimator.sample_rate),
        field!(Estimator, estimator::ENABLE_SENSOR_LPF_FILTERS, "EnableSensorLPFfilters", Bool, estimator.enable_sensor_lpf_filters),
        field!(Estimator, estimator::ENABLE_SOFTWARE_LPF_FILTERS, "EnableSoftwareLPFfilters", Bool, estimator.enable_software_lpf_filters),
        field!(Estimator, estimator::CREATE_QDOT_FROM_Q_DIFFERENCE, "CreateQdotFromQDifference", Bool, estimator.create_qdot_from_q_difference),
        field!(Estimator, estimator::USE_MADGWICK, "UseMadgwick", Bool, estimator.use_madgwick),
        field!(Estimator, estimator::USE_VELOCITY_ESTIMATOR, "UseVelocityEstimator", Bool, estimator.use_velocity_estimator),
        field!(Estimator, estimator::ESTIMATE_COM, "EstimateCOM", Bool, estimator.estimate_com),
        field!(Model, model::L, "l", Float, model.l),
        field!(Model, model::MK, "Mk", Float, model.mk),
        field!(Model, model::MB, "Mb", Float, model.mb),
        field!(Model, model::ENCODER_TICKS_PER_REV, "EncoderTicksPerRev", Uint32, model.encoder_ticks_per_rev),
        field!(Test, test::TMP, "tmp", Float, test.tmp),
        field!(Test, test::TMP2, "tmp2", Float, test.tmp2),
    ]
};

/// The registry, in image order
pub static REGISTRY: [FieldDescriptor; FIELD_COUNT] = FIELDS;

const fn layout() -> ([usize; FIELD_COUNT], usize) {
    let mut offsets = [0usize; FIELD_COUNT];
    let mut offset = IMAGE_HEADER_LEN;
    let mut i = 0;
    while i < FIELD_COUNT {
        offsets[i] = offset;
        offset += FIELDS[i].value_len();
        i += 1;
    }
    (offsets, offset)
}

const LAYOUT: ([usize; FIELD_COUNT], usize) = layout();

/// Byte offset of each registry entry inside the bank image
pub const OFFSETS: [usize; FIELD_COUNT] = LAYOUT.0;

/// Total byte length of the bank image
///
/// This is the unit of persistence and of the dump protocol.
pub const BANK_LENGTH: usize = LAYOUT.1;

/// Largest encoded field value
pub const MAX_VALUE_LEN: usize = 4;

/// Result of a successful registry lookup
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo {
    pub descriptor: &'static FieldDescriptor,
    /// Byte offset of the field inside the bank image
    pub offset: usize,
}

impl FieldInfo {
    pub fn param_type(&self) -> ParamType {
        self.descriptor.param_type
    }

    pub fn array_len(&self) -> u8 {
        self.descriptor.array_len
    }

    pub fn value_len(&self) -> usize {
        self.descriptor.value_len()
    }
}

/// Look up a field by wire group and id
///
/// Returns `None` for an unknown group or id.
pub fn lookup(group: u8, id: u8) -> Option<FieldInfo> {
    let group = ParamGroup::from_u8(group)?;
    REGISTRY
        .iter()
        .zip(OFFSETS.iter())
        .find(|(field, _)| field.group == group && field.id == id)
        .map(|(descriptor, &offset)| FieldInfo { descriptor, offset })
}
