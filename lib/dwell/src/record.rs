use crate::clock::DateTime;
use thiserror::Error;

/// Canonical fixed-width record: `start(19) SP end(19) SP id(8) CR LF`.
pub const FIXED_RECORD_LEN: usize = 50;
pub const TIMESTAMP_LEN: usize = 19;
const ID_DIGITS: usize = 8;

/// Why one record was skipped. Local to a single record; lanes count these
/// instead of aborting.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("record shorter than the fixed layout")]
    Truncated,
    #[error("non-digit byte in a numeric field")]
    BadDigit,
    #[error("field delimiter missing or misplaced")]
    BadDelimiter,
    #[error("line terminator missing")]
    BadTerminator,
    #[error("calendar fields out of range")]
    BadCalendar,
    #[error("vehicle id outside the accumulator key domain")]
    IdOutOfDomain,
}

/// One decoded entry/exit event. Folded into an accumulator immediately,
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedEvent {
    pub id: u32,
    pub duration_secs: i64,
}

/// Positional decimal parse of an ASCII digit run. No allocation, no generic
/// number parsing on the hot path.
fn digits(bytes: &[u8]) -> Result<u32, MalformedRecord> {
    let mut value: u32 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return Err(MalformedRecord::BadDigit);
        }
        value = value * 10 + (b - b'0') as u32;
    }
    Ok(value)
}

fn parse_timestamp(bytes: &[u8]) -> Result<DateTime, MalformedRecord> {
    if bytes.len() != TIMESTAMP_LEN {
        return Err(MalformedRecord::Truncated);
    }
    if bytes[4] != b'-' || bytes[7] != b'-' || bytes[10] != b'T' || bytes[13] != b':' || bytes[16] != b':' {
        return Err(MalformedRecord::BadDelimiter);
    }
    let dt = DateTime {
        year: digits(&bytes[0..4])? as i64,
        month: digits(&bytes[5..7])?,
        day: digits(&bytes[8..10])?,
        hour: digits(&bytes[11..13])?,
        minute: digits(&bytes[14..16])?,
        second: digits(&bytes[17..19])?,
    };
    if !dt.is_valid() {
        return Err(MalformedRecord::BadCalendar);
    }
    Ok(dt)
}

/// Stateless record decoder. An id limit is set when the run uses a dense
/// accumulator, so out-of-domain ids are rejected here rather than indexed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    id_limit: Option<u32>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_limit(limit: u32) -> Self {
        Self { id_limit: Some(limit) }
    }

    fn check_id(&self, id: u32) -> Result<u32, MalformedRecord> {
        match self.id_limit {
            Some(limit) if id >= limit => Err(MalformedRecord::IdOutOfDomain),
            _ => Ok(id),
        }
    }

    /// Decode one 50-byte fixed-layout record.
    pub fn decode_fixed(&self, record: &[u8]) -> Result<ParsedEvent, MalformedRecord> {
        if record.len() < FIXED_RECORD_LEN {
            return Err(MalformedRecord::Truncated);
        }
        if record[19] != b' ' || record[39] != b' ' {
            return Err(MalformedRecord::BadDelimiter);
        }
        if record[48] != b'\r' || record[49] != b'\n' {
            return Err(MalformedRecord::BadTerminator);
        }
        let start = parse_timestamp(&record[0..19])?;
        let end = parse_timestamp(&record[20..39])?;
        let id = self.check_id(digits(&record[40..48])?)?;
        // End before start yields a negative duration; surfaced, not clamped.
        Ok(ParsedEvent { id, duration_secs: end.abs_seconds() - start.abs_seconds() })
    }

    /// Decode one text line (terminator already stripped): two timestamps and
    /// a decimal id, single-space separated. The id need not be zero-padded.
    pub fn decode_line(&self, line: &[u8]) -> Result<ParsedEvent, MalformedRecord> {
        let mut fields = line.split(|&b| b == b' ');
        let (start, end, id) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(start), Some(end), Some(id), None) => (start, end, id),
            _ => return Err(MalformedRecord::BadDelimiter),
        };
        let start = parse_timestamp(start)?;
        let end = parse_timestamp(end)?;
        if id.is_empty() {
            return Err(MalformedRecord::BadDigit);
        }
        if id.len() > ID_DIGITS {
            return Err(MalformedRecord::IdOutOfDomain);
        }
        let id = self.check_id(digits(id)?)?;
        Ok(ParsedEvent { id, duration_secs: end.abs_seconds() - start.abs_seconds() })
    }
}

/// Append one record in the canonical fixed layout. The same bytes parse under
/// the line framing too.
pub fn encode_record(out: &mut Vec<u8>, start: &DateTime, end: &DateTime, id: u32) {
    out.extend_from_slice(format!("{start} {end} {id:08}\r\n").as_bytes());
}

/// Append one text-form record with an unpadded id.
pub fn encode_line(out: &mut Vec<u8>, start: &DateTime, end: &DateTime, id: u32) {
    out.extend_from_slice(format!("{start} {end} {id}\r\n").as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(year: i64, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> DateTime {
        DateTime { year, month, day, hour, minute, second }
    }

    fn one_record(start: &DateTime, end: &DateTime, id: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_record(&mut buf, start, end, id);
        buf
    }

    #[test]
    fn fixed_round_trip() {
        let start = dt(2021, 1, 1, 0, 0, 0);
        let end = dt(2021, 1, 1, 0, 5, 0);
        let buf = one_record(&start, &end, 42);
        assert_eq!(buf.len(), FIXED_RECORD_LEN);
        let ev = Decoder::new().decode_fixed(&buf).unwrap();
        assert_eq!(ev, ParsedEvent { id: 42, duration_secs: 300 });
    }

    #[test]
    fn line_round_trip_unpadded_id() {
        let start = dt(2021, 3, 14, 9, 26, 53);
        let end = dt(2021, 3, 14, 10, 0, 0);
        let mut buf = Vec::new();
        encode_line(&mut buf, &start, &end, 7);
        // strip CRLF as the line framer does
        let line = &buf[..buf.len() - 2];
        let ev = Decoder::new().decode_line(line).unwrap();
        assert_eq!(ev.id, 7);
        assert_eq!(ev.duration_secs, end.abs_seconds() - start.abs_seconds());
    }

    #[test]
    fn fixed_bytes_parse_as_line() {
        let buf = one_record(&dt(2021, 5, 1, 8, 0, 0), &dt(2021, 5, 1, 9, 30, 0), 123);
        let ev = Decoder::new().decode_line(&buf[..buf.len() - 2]).unwrap();
        assert_eq!(ev, ParsedEvent { id: 123, duration_secs: 5400 });
    }

    #[test]
    fn inverted_record_is_negative() {
        let start = dt(2021, 1, 2, 0, 0, 0);
        let end = dt(2021, 1, 1, 0, 0, 0);
        let buf = one_record(&start, &end, 9);
        let ev = Decoder::new().decode_fixed(&buf).unwrap();
        assert_eq!(ev.duration_secs, -86_400);
    }

    #[test]
    fn truncated_record_rejected() {
        let buf = one_record(&dt(2021, 1, 1, 0, 0, 0), &dt(2021, 1, 1, 1, 0, 0), 1);
        assert_eq!(
            Decoder::new().decode_fixed(&buf[..FIXED_RECORD_LEN - 3]),
            Err(MalformedRecord::Truncated)
        );
    }

    #[test]
    fn bad_digit_rejected() {
        let mut buf = one_record(&dt(2021, 1, 1, 0, 0, 0), &dt(2021, 1, 1, 1, 0, 0), 1);
        buf[41] = b'x';
        assert_eq!(Decoder::new().decode_fixed(&buf), Err(MalformedRecord::BadDigit));
    }

    #[test]
    fn bad_delimiter_rejected() {
        let mut buf = one_record(&dt(2021, 1, 1, 0, 0, 0), &dt(2021, 1, 1, 1, 0, 0), 1);
        buf[19] = b'_';
        assert_eq!(Decoder::new().decode_fixed(&buf), Err(MalformedRecord::BadDelimiter));
    }

    #[test]
    fn missing_terminator_rejected() {
        let mut buf = one_record(&dt(2021, 1, 1, 0, 0, 0), &dt(2021, 1, 1, 1, 0, 0), 1);
        buf[48] = b' ';
        assert_eq!(Decoder::new().decode_fixed(&buf), Err(MalformedRecord::BadTerminator));
    }

    #[test]
    fn invalid_calendar_rejected() {
        // Feb 29 of a non-leap century year
        let bad = dt(1900, 2, 29, 0, 0, 0);
        let buf = one_record(&bad, &dt(1900, 3, 1, 0, 0, 0), 1);
        assert_eq!(Decoder::new().decode_fixed(&buf), Err(MalformedRecord::BadCalendar));
    }

    #[test]
    fn id_domain_enforced_at_decode() {
        let buf = one_record(&dt(2021, 1, 1, 0, 0, 0), &dt(2021, 1, 1, 1, 0, 0), 500);
        let bounded = Decoder::with_id_limit(100);
        assert_eq!(bounded.decode_fixed(&buf), Err(MalformedRecord::IdOutOfDomain));
        assert!(Decoder::with_id_limit(501).decode_fixed(&buf).is_ok());
    }

    #[test]
    fn line_field_count_enforced() {
        let d = Decoder::new();
        assert_eq!(
            d.decode_line(b"2021-01-01T00:00:00 2021-01-01T01:00:00"),
            Err(MalformedRecord::BadDelimiter)
        );
        assert_eq!(
            d.decode_line(b"2021-01-01T00:00:00 2021-01-01T01:00:00 1 extra"),
            Err(MalformedRecord::BadDelimiter)
        );
    }
}
