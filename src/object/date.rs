//! PDF date strings.

/// A date and time extracted from a PDF date string.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DateTime {
    /// The year.
    pub year: u16,
    /// The month.
    pub month: u8,
    /// The day.
    pub day: u8,
    /// The hour.
    pub hour: u8,
    /// The minute.
    pub minute: u8,
    /// The second.
    pub second: u8,
    /// The offset in hours from UTC.
    pub utc_offset_hour: i8,
    /// The offset in minutes from UTC.
    pub utc_offset_minute: u8,
}

impl DateTime {
    /// Parse a PDF date string.
    ///
    /// Apostrophes are stripped before matching. The recognized shapes are,
    /// in order: `D:YYYYMMDDHHMMSS±hhmm`, `D:YYYYMMDDHHMMSS`,
    /// `D:YYYYMMDDHHMMSSZ` and `D:YYYYMMDD`. Anything else yields `None`.
    pub fn parse(bytes: &[u8]) -> Option<DateTime> {
        let cleaned: Vec<u8> = bytes.iter().copied().filter(|b| *b != b'\'').collect();
        let rest = cleaned.strip_prefix(b"D:")?;

        match rest.len() {
            // YYYYMMDDHHMMSS±hhmm
            19 => {
                let mut date = Self::from_full(&rest[..14])?;
                let sign = match rest[14] {
                    b'+' => 1i8,
                    b'-' => -1i8,
                    _ => return None,
                };
                let hours = read_num(&rest[15..17], 0, 23)? as i8;
                let minutes = read_num(&rest[17..19], 0, 59)? as u8;
                date.utc_offset_hour = sign * hours;
                date.utc_offset_minute = minutes;

                Some(date)
            }
            // YYYYMMDDHHMMSS
            14 => Self::from_full(rest),
            // YYYYMMDDHHMMSSZ
            15 => {
                if rest[14] != b'Z' {
                    return None;
                }
                Self::from_full(&rest[..14])
            }
            // YYYYMMDD
            8 => Some(DateTime {
                year: read_num(&rest[0..4], 0, 9999)?,
                month: read_num(&rest[4..6], 1, 12)? as u8,
                day: read_num(&rest[6..8], 1, 31)? as u8,
                hour: 0,
                minute: 0,
                second: 0,
                utc_offset_hour: 0,
                utc_offset_minute: 0,
            }),
            _ => None,
        }
    }

    fn from_full(digits: &[u8]) -> Option<DateTime> {
        Some(DateTime {
            year: read_num(&digits[0..4], 0, 9999)?,
            month: read_num(&digits[4..6], 1, 12)? as u8,
            day: read_num(&digits[6..8], 1, 31)? as u8,
            hour: read_num(&digits[8..10], 0, 23)? as u8,
            minute: read_num(&digits[10..12], 0, 59)? as u8,
            second: read_num(&digits[12..14], 0, 59)? as u8,
            utc_offset_hour: 0,
            utc_offset_minute: 0,
        })
    }
}

fn read_num(digits: &[u8], min: u16, max: u16) -> Option<u16> {
    let mut value = 0u16;
    for b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add(u16::from(b - b'0'))?;
    }

    if value < min || value > max {
        return None;
    }

    Some(value)
}
