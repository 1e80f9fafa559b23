//! Conversion between basic values and text.
//!
//! Format strings:
//!
//! - `F<n>` - fixed-point with `n` decimals (default 2)
//! - `D<n>` - integer zero-padded to `n` digits
//! - `X<n>` / `x<n>` - upper/lower-case hexadecimal integer
//! - anything containing `%` - a `chrono` date-time pattern

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use xmap_common::{Guid, TimeSpan};

use crate::{DataType, EnumValue, Error, Result, TypeRegistry, Value};

/// Canonical date-time text form.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const DATE_TIME_FALLBACKS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parsed format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Format {
    Fixed(usize),
    Padded(usize),
    Hex { upper: bool, width: usize },
    Pattern(String),
}

impl Format {
    /// Parse a format string.
    pub fn parse(format: &str) -> Option<Self> {
        if format.contains('%') {
            return Some(Self::Pattern(format.to_string()));
        }
        let mut chars = format.chars();
        let spec = chars.next()?;
        let digits = chars.as_str();
        let width = if digits.is_empty() {
            None
        } else {
            Some(digits.parse::<usize>().ok()?)
        };
        match spec {
            'F' | 'f' => Some(Self::Fixed(width.unwrap_or(2))),
            'D' | 'd' => Some(Self::Padded(width.unwrap_or(0))),
            'X' => Some(Self::Hex {
                upper: true,
                width: width.unwrap_or(0),
            }),
            'x' => Some(Self::Hex {
                upper: false,
                width: width.unwrap_or(0),
            }),
            _ => None,
        }
    }
}

fn invalid_format(format: &str, data_type: &DataType) -> Error {
    Error::InvalidFormat {
        format: format.to_string(),
        type_name: data_type.type_name(),
    }
}

fn malformed(text: &str, data_type: &DataType, reason: impl fmt::Display) -> Error {
    Error::MalformedValue {
        text: text.to_string(),
        type_name: data_type.type_name(),
        reason: reason.to_string(),
    }
}

fn format_integer<T>(value: T, format: Option<&Format>) -> Option<String>
where
    T: fmt::Display + fmt::UpperHex + fmt::LowerHex,
{
    Some(match format {
        None => value.to_string(),
        Some(Format::Fixed(0)) => value.to_string(),
        Some(Format::Fixed(n)) => format!("{}.{}", value, "0".repeat(*n)),
        Some(Format::Padded(width)) => format!("{:0width$}", value, width = *width),
        Some(Format::Hex { upper: true, width }) => format!("{:0width$X}", value, width = *width),
        Some(Format::Hex { upper: false, width }) => format!("{:0width$x}", value, width = *width),
        Some(Format::Pattern(_)) => return None,
    })
}

fn format_float(value: f64, format: Option<&Format>) -> Option<String> {
    match format {
        None => Some(value.to_string()),
        Some(Format::Fixed(n)) => Some(format!("{:.*}", *n, value)),
        _ => None,
    }
}

/// Convert a basic value to text.
///
/// `Guid`, `TimeSpan` and `Type` values use their canonical text forms.
/// Null converts to an empty string.
pub fn format_basic(value: &Value, format: Option<&str>, registry: &TypeRegistry) -> Result<String> {
    let parsed = match format {
        Some(f) => Some(Format::parse(f).ok_or_else(|| Error::InvalidFormat {
            format: f.to_string(),
            type_name: value
                .runtime_type()
                .map(|t| t.type_name())
                .unwrap_or_default(),
        })?),
        None => None,
    };
    let parsed = parsed.as_ref();

    let text = match value {
        Value::Null => Some(String::new()),
        Value::Bool(v) => Some(v.to_string()),
        Value::Char(c) => Some(c.to_string()),
        Value::Int8(v) => format_integer(*v, parsed),
        Value::Int16(v) => format_integer(*v, parsed),
        Value::Int32(v) => format_integer(*v, parsed),
        Value::Int64(v) => format_integer(*v, parsed),
        Value::UInt8(v) => format_integer(*v, parsed),
        Value::UInt16(v) => format_integer(*v, parsed),
        Value::UInt32(v) => format_integer(*v, parsed),
        Value::UInt64(v) => format_integer(*v, parsed),
        Value::Float(v) => match parsed {
            None => Some(v.to_string()),
            _ => format_float(*v as f64, parsed),
        },
        Value::Double(v) => format_float(*v, parsed),
        Value::String(s) => Some(s.clone()),
        Value::Guid(g) => Some(g.to_string()),
        Value::TimeSpan(t) => Some(t.to_string()),
        Value::Type(t) => Some(t.type_name()),
        Value::DateTime(d) => match parsed {
            None => Some(d.format(DATE_TIME_FORMAT).to_string()),
            Some(Format::Pattern(pattern)) => Some(d.format(pattern).to_string()),
            Some(_) => None,
        },
        Value::Enum(e) => return format_enum(e, registry),
        other => {
            return Err(Error::NotBasic(
                other.runtime_type().map(|t| t.type_name()).unwrap_or_default(),
            ))
        }
    };

    text.ok_or_else(|| {
        invalid_format(
            format.unwrap_or_default(),
            &value.runtime_type().unwrap_or(DataType::Any),
        )
    })
}

fn format_enum(value: &EnumValue, registry: &TypeRegistry) -> Result<String> {
    let def = registry
        .enum_def(&value.enum_name)
        .ok_or_else(|| Error::UnknownType(value.enum_name.to_string()))?;

    let mut parts = Vec::with_capacity(value.variants.len());
    for name in &value.variants {
        let variant = def.variant(name).ok_or_else(|| Error::UnknownEnumVariant {
            enum_name: value.enum_name.to_string(),
            text: name.clone(),
        })?;
        parts.push(variant.text());
    }
    Ok(parts.join(", "))
}

macro_rules! parse_integer {
    ($text:expr, $format:expr, $data_type:expr, $signed:ty, $unsigned:ty, $variant:ident) => {{
        let text: &str = $text;
        let parsed: Option<$signed> = match $format {
            Some(Format::Hex { .. }) => {
                let digits = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                    .unwrap_or(text);
                <$unsigned>::from_str_radix(digits, 16).ok().map(|v| v as $signed)
            }
            Some(Format::Fixed(_)) => match text.split_once('.') {
                Some((whole, fraction)) if fraction.bytes().all(|b| b == b'0') => {
                    whole.parse::<$signed>().ok()
                }
                Some(_) => None,
                None => text.parse::<$signed>().ok(),
            },
            _ => text.parse::<$signed>().ok(),
        };
        parsed
            .map(Value::$variant)
            .ok_or_else(|| malformed(text, $data_type, "not a valid integer"))
    }};
}

/// Convert text to a value of a basic type.
///
/// Empty text yields an empty `String`, [`Value::Null`] for the other
/// nullable types, and an error for types that always carry a value.
pub fn parse_basic(
    text: &str,
    data_type: &DataType,
    format: Option<&str>,
    registry: &TypeRegistry,
) -> Result<Value> {
    if *data_type == DataType::String {
        return Ok(Value::String(text.to_string()));
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        if data_type.is_nullable() {
            return Ok(Value::Null);
        }
        return Err(malformed(text, data_type, "empty text"));
    }

    let parsed = match format {
        Some(f) => Some(Format::parse(f).ok_or_else(|| invalid_format(f, data_type))?),
        None => None,
    };
    let parsed = parsed.as_ref();
    if matches!(parsed, Some(Format::Pattern(_))) && *data_type != DataType::DateTime {
        return Err(invalid_format(format.unwrap_or_default(), data_type));
    }

    match data_type {
        DataType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(malformed(trimmed, data_type, "expected true or false")),
        },
        DataType::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(malformed(text, data_type, "expected a single character")),
            }
        }
        DataType::SByte => parse_integer!(trimmed, parsed, data_type, i8, u8, Int8),
        DataType::Int16 => parse_integer!(trimmed, parsed, data_type, i16, u16, Int16),
        DataType::Int32 => parse_integer!(trimmed, parsed, data_type, i32, u32, Int32),
        DataType::Int64 => parse_integer!(trimmed, parsed, data_type, i64, u64, Int64),
        DataType::Byte => parse_integer!(trimmed, parsed, data_type, u8, u8, UInt8),
        DataType::UInt16 => parse_integer!(trimmed, parsed, data_type, u16, u16, UInt16),
        DataType::UInt32 => parse_integer!(trimmed, parsed, data_type, u32, u32, UInt32),
        DataType::UInt64 => parse_integer!(trimmed, parsed, data_type, u64, u64, UInt64),
        DataType::Single => trimmed
            .parse::<f32>()
            .map(Value::Float)
            .map_err(|e| malformed(trimmed, data_type, e)),
        DataType::Double => trimmed
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|e| malformed(trimmed, data_type, e)),
        DataType::Guid => trimmed
            .parse::<Guid>()
            .map(Value::Guid)
            .map_err(|e| malformed(trimmed, data_type, e)),
        DataType::TimeSpan => trimmed
            .parse::<TimeSpan>()
            .map(Value::TimeSpan)
            .map_err(|e| malformed(trimmed, data_type, e)),
        DataType::DateTime => parse_date_time(trimmed, parsed)
            .map(Value::DateTime)
            .ok_or_else(|| malformed(trimmed, data_type, "unrecognized date-time")),
        DataType::Type => registry
            .resolve_type_name(trimmed)
            .map(Value::Type)
            .ok_or_else(|| malformed(trimmed, data_type, "unknown type name")),
        DataType::Enum(name) => parse_enum(trimmed, name, registry).map(Value::Enum),
        other => Err(Error::NotBasic(other.type_name())),
    }
}

fn parse_date_time(text: &str, format: Option<&Format>) -> Option<NaiveDateTime> {
    let patterns: Vec<&str> = match format {
        Some(Format::Pattern(pattern)) => vec![pattern.as_str()],
        _ => DATE_TIME_FALLBACKS.to_vec(),
    };
    for pattern in &patterns {
        if let Ok(value) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(value);
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, pattern) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn parse_enum(text: &str, enum_name: &str, registry: &TypeRegistry) -> Result<EnumValue> {
    let def = registry
        .enum_def(enum_name)
        .ok_or_else(|| Error::UnknownType(enum_name.to_string()))?;

    let unknown = |part: &str| Error::UnknownEnumVariant {
        enum_name: enum_name.to_string(),
        text: part.to_string(),
    };

    let parts: Vec<&str> = if def.flags {
        text.split(',').map(str::trim).filter(|p| !p.is_empty()).collect()
    } else {
        vec![text]
    };
    if parts.is_empty() {
        return Err(unknown(text));
    }

    let mut variants = Vec::with_capacity(parts.len());
    for part in parts {
        let variant = def.variant_by_text(part).ok_or_else(|| unknown(part))?;
        variants.push(variant.name.clone());
    }
    Ok(EnumValue {
        enum_name: def.name.clone(),
        variants,
    })
}
