//! Numeric codec: literal parsing, canonical text and key hashing.
//!
//! Literals accept an optional radix prefix (`0b`, `0o`, `0x`), a fraction
//! and an exponent. Decimal literals use `e` as exponent marker and scale by
//! powers of ten; prefixed literals use `p` and scale by powers of two.
//! `repr_radix` writes the prefixed forms back out.
use crate::mu_runtime::mu_limits::{
    MU_NUM_EXP_DIGITS, MU_NUM_FIXED_MAXEXP, MU_NUM_FIXED_MINEXP, MU_NUMLEN,
};
use crate::mu_value::MuValue;

struct Radix {
    radix: u32,
    exp_base: f64,
    exp_marker: u8,
    prefix: &'static str,
}

const DECIMAL: Radix = Radix {
    radix: 10,
    exp_base: 10.0,
    exp_marker: b'e',
    prefix: "",
};
const BINARY: Radix = Radix {
    radix: 2,
    exp_base: 2.0,
    exp_marker: b'p',
    prefix: "0b",
};
const OCTAL: Radix = Radix {
    radix: 8,
    exp_base: 2.0,
    exp_marker: b'p',
    prefix: "0o",
};
const HEX: Radix = Radix {
    radix: 16,
    exp_base: 2.0,
    exp_marker: b'p',
    prefix: "0x",
};

const DIGITS: &[u8; 16] = b"0123456789abcdef";

/// 2^53: every integer below it is an exact f64
const EXACT_INT_LIMIT: f64 = 9007199254740992.0;

/// 1.5 * 2^52: adding it rounds to an integer and pins the exponent
const HASH_BIAS: f64 = 6755399441055744.0;
/// Sign and the low 51 mantissa bits of the biased integer part
const HASH_INT_MASK: u64 = 0x8007_FFFF_FFFF_FFFF;

#[inline]
fn digit_value(c: u8) -> u32 {
    match c {
        b'0'..=b'9' => (c - b'0') as u32,
        b'a'..=b'z' => (c - b'a') as u32 + 10,
        b'A'..=b'Z' => (c - b'A') as u32 + 10,
        _ => u32::MAX,
    }
}

/// `n * base^exp`, in two steps when `base^exp` alone leaves the normal range
fn scale_by(n: f64, base: f64, exp: f64) -> f64 {
    if n == 0.0 {
        return n;
    }
    let scale = base.powf(exp);
    if scale.is_normal() {
        return n * scale;
    }
    let half = (exp / 2.0).trunc();
    n * base.powf(half) * base.powf(exp - half)
}

/// Scan digits of `radix` starting at `pos`, feeding each one to `f`.
/// Returns the position after the last digit.
#[inline]
fn scan_digits(text: &[u8], mut pos: usize, radix: u32, mut f: impl FnMut(u32)) -> usize {
    while let Some(&c) = text.get(pos) {
        let d = digit_value(c);
        if d >= radix {
            break;
        }
        f(d);
        pos += 1;
    }
    pos
}

/// Parse a numeric literal at the start of `text`.
///
/// Returns the value and the number of bytes consumed, or `None` when no
/// digit could be read. Signs are left to the caller.
pub fn parse(text: &[u8]) -> Option<(f64, usize)> {
    let mut base = &DECIMAL;
    let mut pos = 0;

    if text.len() > 2 && text[0] == b'0' {
        let prefixed = match text[1] {
            b'b' | b'B' => Some(&BINARY),
            b'o' | b'O' => Some(&OCTAL),
            b'x' | b'X' => Some(&HEX),
            _ => None,
        };
        if let Some(radix) = prefixed {
            base = radix;
            pos = 2;
        }
    }

    let radix = base.radix as f64;
    let mut res = 0.0f64;
    let mut digits = 0usize;

    pos = scan_digits(text, pos, base.radix, |d| {
        res = res * radix + d as f64;
        digits += 1;
    });

    if text.get(pos) == Some(&b'.') {
        let mut scale = 1.0f64;
        pos = scan_digits(text, pos + 1, base.radix, |d| {
            scale /= radix;
            res += scale * d as f64;
            digits += 1;
        });
    }

    if digits == 0 {
        return None;
    }

    if text
        .get(pos)
        .is_some_and(|c| c.to_ascii_lowercase() == base.exp_marker)
    {
        let mut exp_pos = pos + 1;
        let mut sign = 1.0f64;
        match text.get(exp_pos) {
            Some(b'+') => exp_pos += 1,
            Some(b'-') => {
                sign = -1.0;
                exp_pos += 1;
            }
            _ => {}
        }

        let mut exp = 0.0f64;
        let mut exp_digits = 0usize;
        let end = scan_digits(text, exp_pos, base.radix, |d| {
            exp = exp * radix + d as f64;
            exp_digits += 1;
        });

        // a marker without digits belongs to whatever follows
        if exp_digits > 0 {
            res = scale_by(res, base.exp_base, sign * exp);
            pos = end;
        }
    }

    Some((res, pos))
}

/// Parse `text` as a number literal that must span the whole input
pub fn parse_exact(text: &str) -> Option<MuValue> {
    match parse(text.as_bytes()) {
        Some((n, used)) if used == text.len() => Some(MuValue::float(n)),
        _ => None,
    }
}

/// Number held by `value`: nil is 0, numbers are themselves and texts must
/// read entirely as a literal, optionally signed. Anything else has none.
pub fn from_mu(value: &MuValue) -> Option<MuValue> {
    if value.is_nil() {
        return Some(MuValue::uint(0));
    }
    if value.is_num() {
        return Some(value.clone());
    }
    let text = value.as_str()?;
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let n = parse_exact(digits)?.get_float();
    Some(MuValue::float(if negative { -n } else { n }))
}

/// Round `n` (positive, finite) to `sig` significant digits.
/// Returns the digits without trailing zeros and the decimal exponent of the first one.
fn round_digits(n: f64, sig: usize) -> (Vec<u8>, i32) {
    let text = format!("{:.*e}", sig.saturating_sub(1), n);
    let (mantissa, exp) = text.split_once('e').unwrap_or((&text, "0"));
    let exp = exp.parse::<i32>().unwrap_or(0);

    let mut digits: Vec<u8> = mantissa.bytes().filter(u8::is_ascii_digit).collect();
    while digits.len() > 1 && digits.last() == Some(&b'0') {
        digits.pop();
    }
    (digits, exp)
}

/// Decimal exponent of the leading digit of `n` before any rounding
fn decimal_exponent(n: f64) -> i32 {
    let text = format!("{:e}", n);
    text.split_once('e')
        .and_then(|(_, exp)| exp.parse::<i32>().ok())
        .unwrap_or(0)
}

#[inline]
fn is_exponential(exp: i32) -> bool {
    !(MU_NUM_FIXED_MINEXP..=MU_NUM_FIXED_MAXEXP).contains(&exp)
}

fn significant_digits(exp: i32) -> usize {
    if is_exponential(exp) {
        MU_NUM_EXP_DIGITS
    } else if exp < 0 {
        // leading zeros of the fraction eat into the budget
        (MU_NUMLEN + exp) as usize
    } else {
        MU_NUMLEN as usize
    }
}

/// Canonical text of a number
pub fn repr(n: f64) -> String {
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let mut out = String::with_capacity(MU_NUMLEN as usize + 8);
    let mut n = n;
    if n < 0.0 {
        out.push('-');
        n = -n;
    }

    // integers in fixed range print exactly
    if n.fract() == 0.0 && n < 10f64.powi(MU_NUM_FIXED_MAXEXP + 1) {
        let mut buffer = itoa::Buffer::new();
        out.push_str(buffer.format(n as u64));
        return out;
    }

    let estimate = decimal_exponent(n);
    let (mut digits, mut exp) = round_digits(n, significant_digits(estimate));
    if is_exponential(exp) != is_exponential(estimate) {
        // rounding carried across a layout boundary
        (digits, exp) = round_digits(n, significant_digits(exp));
    }

    if is_exponential(exp) {
        out.push(digits[0] as char);
        if digits.len() > 1 {
            out.push('.');
            out.extend(digits[1..].iter().map(|&d| d as char));
        }
        out.push('e');
        if exp < 0 {
            out.push('-');
        }
        let magnitude = exp.unsigned_abs();
        if magnitude < 10 {
            out.push('0');
        }
        let mut buffer = itoa::Buffer::new();
        out.push_str(buffer.format(magnitude));
    } else {
        let top = exp.max(0);
        let last = exp - digits.len() as i32 + 1;
        for power in (last.min(0)..=top).rev() {
            if power == -1 {
                out.push('.');
            }
            let index = exp - power;
            let digit = usize::try_from(index)
                .ok()
                .and_then(|i| digits.get(i))
                .copied()
                .unwrap_or(b'0');
            out.push(digit as char);
        }
    }

    out
}

fn push_digits(out: &mut String, mut value: u64, radix: u32) {
    let radix = radix as u64;
    let mut buffer = [0u8; 64];
    let mut start = buffer.len();
    loop {
        start -= 1;
        buffer[start] = DIGITS[(value % radix) as usize];
        value /= radix;
        if value == 0 {
            break;
        }
    }
    out.extend(buffer[start..].iter().map(|&d| d as char));
}

/// Text of `n` in base 2, 8 or 16 behind its `0b`, `0o` or `0x` prefix.
///
/// Integers below 2^53 print as plain digits. Other values print an odd
/// mantissa then `p` and the power-of-two exponent, whose digits use the same
/// radix. The text parses back to exactly `n`. `None` for any other radix.
pub fn repr_radix(n: f64, radix: u32) -> Option<String> {
    let base = match radix {
        2 => &BINARY,
        8 => &OCTAL,
        16 => &HEX,
        _ => return None,
    };
    if n.is_nan() || n.is_infinite() {
        return Some(repr(n));
    }

    let mut out = String::new();
    if n.is_sign_negative() {
        out.push('-');
    }
    out.push_str(base.prefix);
    let n = n.abs();

    if n.fract() == 0.0 && n < EXACT_INT_LIMIT {
        push_digits(&mut out, n as u64, radix);
        return Some(out);
    }

    let bits = n.to_bits();
    let biased = ((bits >> 52) & 0x7FF) as i32;
    let fraction = bits & ((1 << 52) - 1);
    let (mut mantissa, mut exp) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), biased - 1075)
    };
    let shift = mantissa.trailing_zeros();
    mantissa >>= shift;
    exp += shift as i32;

    push_digits(&mut out, mantissa, radix);
    out.push('p');
    if exp < 0 {
        out.push('-');
    }
    push_digits(&mut out, exp.unsigned_abs() as u64, radix);
    Some(out)
}

/// Binary text of `n`, see `repr_radix`
pub fn bin(n: f64) -> String {
    repr_radix(n, 2).unwrap_or_default()
}

/// Octal text of `n`, see `repr_radix`
pub fn oct(n: f64) -> String {
    repr_radix(n, 8).unwrap_or_default()
}

/// Hexadecimal text of `n`, see `repr_radix`
pub fn hex(n: f64) -> String {
    repr_radix(n, 16).unwrap_or_default()
}

/// Hash of a number used as a table key.
///
/// Small non-negative integers hash to themselves; fractional values mix
/// their residue into the low bits.
pub fn hash(n: f64) -> u64 {
    let ipart = n + HASH_BIAS;
    let fpart = n - (ipart - HASH_BIAS);

    let ibits = ipart.to_bits();
    let fbits = fpart.to_bits();
    (ibits & HASH_INT_MASK) ^ (fbits ^ (fbits >> 52))
}
