use core::fmt;

#[derive(Debug, PartialEq, Eq)]
pub enum PduParseErr {
    InvalidPduType { expected: u64, found: u64 },
    BufferEnded { field: Option<&'static str> },
    InvalidMagic { found: u16 },
    InvalidValue { field: &'static str, value: u64 },
    InvalidAddress { field: &'static str },
    InconsistentLength { expected: usize, found: usize },
    Inconsistency { field: &'static str, reason: &'static str },
    TooLong { field: &'static str, max: usize, found: usize },
    FieldNotPresent { field: Option<&'static str> },
    NotImplemented { field: Option<&'static str> },
}

impl fmt::Display for PduParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PduParseErr::InvalidPduType { expected, found } => write!(f, "invalid pdu type: expected {} found {}", expected, found),
            PduParseErr::BufferEnded { field } => write!(f, "buffer ended reading {}", field.unwrap_or("?")),
            PduParseErr::InvalidMagic { found } => write!(f, "invalid magic 0x{:04x}", found),
            PduParseErr::InvalidValue { field, value } => write!(f, "invalid value {} for {}", value, field),
            PduParseErr::InvalidAddress { field } => write!(f, "invalid address in {}", field),
            PduParseErr::InconsistentLength { expected, found } => write!(f, "inconsistent length: expected {} found {}", expected, found),
            PduParseErr::Inconsistency { field, reason } => write!(f, "inconsistent {}: {}", field, reason),
            PduParseErr::TooLong { field, max, found } => write!(f, "{} too long: {} > {}", field, found, max),
            PduParseErr::FieldNotPresent { field } => write!(f, "field not present: {}", field.unwrap_or("?")),
            PduParseErr::NotImplemented { field } => write!(f, "not implemented: {}", field.unwrap_or("?")),
        }
    }
}

/// `Ok(())` if the raw type equals `$expected.into_raw()`, else InvalidPduType
#[macro_export]
macro_rules! expect_pdu_type {
    ($value:expr, $expected:expr) => {{
        let raw_expected = $expected.into_raw();
        if $value == raw_expected {
            Ok(())
        } else {
            Err($crate::PduParseErr::InvalidPduType {
                expected: raw_expected as u64,
                found: $value as u64,
            })
        }
    }};
}

/// `Ok(())` if the value equals `$expected`, else InvalidValue naming the field
#[macro_export]
macro_rules! expect_value {
    ($value:ident, $expected:expr) => {
        $crate::expect_value!(@inner $value, $expected, stringify!($value))
    };
    ($value:expr, $expected:expr, $field:expr) => {
        $crate::expect_value!(@inner $value, $expected, $field)
    };

    (@inner $value:expr, $expected:expr, $field:expr) => {{
        let val = $value;
        if val == $expected {
            Ok(())
        } else {
            Err($crate::PduParseErr::InvalidValue {
                field: $field,
                value: val.into(),
            })
        }
    }};
}

/// Reads a little-endian field of `$bytes` bytes into a binding of the same name
#[macro_export]
macro_rules! let_field {
    ($buf:expr, $ident:ident, $bytes:expr) => {
        let $ident = $buf.read_field($bytes, stringify!($ident))?;
    };
}
