//! Kubernetes resource quantity parsing
//!
//! Converts quantity strings such as `"250m"`, `"1.5"`, `"128Mi"` or `"1e3"`
//! into integer milli-units (CPU) or bytes (memory). Arithmetic is exact and
//! fractional results round up, so `"1n"` of CPU is one millicore.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Number followed by an optional suffix (SI, binary or exponent)
static QUANTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?(\d*)(?:\.(\d*))?([a-zA-Z][a-zA-Z0-9+\-]*)?$").unwrap());

/// Mantissa digits beyond this would not fit the u128 working value
const MAX_DIGITS: usize = 30;

/// Errors produced while parsing a quantity
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,

    #[error("negative quantity not allowed: {0}")]
    Negative(String),

    #[error("invalid quantity format: {0}")]
    InvalidFormat(String),

    #[error("unknown quantity suffix '{suffix}' in {quantity}")]
    UnknownSuffix { quantity: String, suffix: String },

    #[error("quantity out of range: {0}")]
    Overflow(String),
}

/// Scale carried by a suffix: a power of ten plus a power of two
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scale {
    decimal_exp: i32,
    binary_shift: u32,
}

impl Scale {
    const fn decimal(exp: i32) -> Self {
        Self {
            decimal_exp: exp,
            binary_shift: 0,
        }
    }

    const fn binary(shift: u32) -> Self {
        Self {
            decimal_exp: 0,
            binary_shift: shift,
        }
    }
}

/// A parsed quantity: `digits * 10^exp * 2^shift`
#[derive(Debug, Clone, Copy)]
struct Parsed {
    digits: u128,
    scale: Scale,
}

/// Parse a CPU quantity into millicores
///
/// # Examples
/// - "100m" -> 100
/// - "1" -> 1000
/// - "0.5" -> 500
/// - "250000000n" -> 250
pub fn parse_cpu_millis(quantity: &str) -> Result<u64, QuantityError> {
    to_unit(quantity, 3)
}

/// Parse a memory quantity into bytes
///
/// # Examples
/// - "128Mi" -> 134217728
/// - "1G" -> 1000000000
/// - "1e3" -> 1000
pub fn parse_memory_bytes(quantity: &str) -> Result<u64, QuantityError> {
    to_unit(quantity, 0)
}

fn to_unit(quantity: &str, target_exp: i32) -> Result<u64, QuantityError> {
    let parsed = parse(quantity)?;
    let overflow = || QuantityError::Overflow(quantity.to_string());

    let shifted = parsed
        .digits
        .checked_mul(1u128 << parsed.scale.binary_shift)
        .ok_or_else(overflow)?;

    let exp = parsed.scale.decimal_exp + target_exp;
    let value = if exp >= 0 {
        let factor = 10u128.checked_pow(exp as u32).ok_or_else(overflow)?;
        shifted.checked_mul(factor).ok_or_else(overflow)?
    } else {
        match 10u128.checked_pow(exp.unsigned_abs()) {
            Some(divisor) => shifted.div_ceil(divisor),
            // Divisor exceeds any representable mantissa
            None => u128::from(shifted > 0),
        }
    };

    u64::try_from(value).map_err(|_| overflow())
}

fn parse(quantity: &str) -> Result<Parsed, QuantityError> {
    let trimmed = quantity.trim();
    if trimmed.is_empty() {
        return Err(QuantityError::Empty);
    }
    if trimmed.starts_with('-') {
        return Err(QuantityError::Negative(trimmed.to_string()));
    }

    let caps = QUANTITY_REGEX
        .captures(trimmed)
        .ok_or_else(|| QuantityError::InvalidFormat(trimmed.to_string()))?;

    let whole = caps.get(1).map_or("", |m| m.as_str());
    let fraction = caps.get(2).map_or("", |m| m.as_str());
    let suffix = caps.get(3).map_or("", |m| m.as_str());

    if whole.is_empty() && fraction.is_empty() {
        return Err(QuantityError::InvalidFormat(trimmed.to_string()));
    }

    let mantissa = format!("{whole}{fraction}");
    let mantissa = mantissa.trim_start_matches('0');
    if mantissa.len() > MAX_DIGITS {
        return Err(QuantityError::Overflow(trimmed.to_string()));
    }
    let digits = if mantissa.is_empty() {
        0
    } else {
        mantissa
            .parse::<u128>()
            .map_err(|_| QuantityError::InvalidFormat(trimmed.to_string()))?
    };

    let mut scale = suffix_scale(suffix).ok_or_else(|| QuantityError::UnknownSuffix {
        quantity: trimmed.to_string(),
        suffix: suffix.to_string(),
    })?;
    scale.decimal_exp -= fraction.len() as i32;

    Ok(Parsed { digits, scale })
}

fn suffix_scale(suffix: &str) -> Option<Scale> {
    let scale = match suffix {
        "" => Scale::decimal(0),
        "n" => Scale::decimal(-9),
        "u" => Scale::decimal(-6),
        "m" => Scale::decimal(-3),
        "k" => Scale::decimal(3),
        "M" => Scale::decimal(6),
        "G" => Scale::decimal(9),
        "T" => Scale::decimal(12),
        "P" => Scale::decimal(15),
        "E" => Scale::decimal(18),
        "Ki" => Scale::binary(10),
        "Mi" => Scale::binary(20),
        "Gi" => Scale::binary(30),
        "Ti" => Scale::binary(40),
        "Pi" => Scale::binary(50),
        "Ei" => Scale::binary(60),
        other => {
            let exp = other.strip_prefix(['e', 'E'])?;
            let exp: i32 = exp.parse().ok()?;
            if exp.unsigned_abs() > 64 {
                return None;
            }
            Scale::decimal(exp)
        }
    };
    Some(scale)
}

/// Format millicores as a human-readable string
pub fn format_cpu(millicores: u64) -> String {
    if millicores >= 1000 {
        format!("{:.1}", millicores as f64 / 1000.0)
    } else {
        format!("{}m", millicores)
    }
}

/// Format bytes as a human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2}Gi", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}
