//! Numbers.

use crate::object::Value;
use crate::reader::Reader;

fn is_digit(byte: u8) -> bool {
    byte.is_ascii_digit()
}

/// Parse a run of decimal digits as an unsigned integer.
pub(crate) fn parse_unsigned(r: &mut Reader<'_>) -> Option<u64> {
    let start = r.offset();
    r.forward_while_1(is_digit)?;
    let digits = r.range(start..r.offset())?;

    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Parse an integer or real number.
///
/// Numbers are an optional sign followed by decimal digits; the presence of
/// a `.` turns the value into a 64-bit float, otherwise it parses as a
/// 64-bit signed integer.
pub(crate) fn parse(r: &mut Reader<'_>) -> Option<Value> {
    let start = r.offset();

    r.eat(|b| b == b'+' || b == b'-');

    let mut real = false;
    match r.peek_byte()? {
        b'.' => {
            r.forward();
            r.forward_while_1(is_digit)?;
            real = true;
        }
        b'0'..=b'9' => {
            r.forward_while(is_digit);
            if r.eat(|b| b == b'.').is_some() {
                r.forward_while(is_digit);
                real = true;
            }
        }
        _ => return None,
    }

    let lexeme = std::str::from_utf8(r.range(start..r.offset())?).ok()?;

    if real {
        lexeme.parse().ok().map(Value::Real)
    } else {
        lexeme.parse().ok().map(Value::Integer)
    }
}
