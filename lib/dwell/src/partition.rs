use crate::record::FIXED_RECORD_LEN;
use memchr::memchr;
use std::ops::Range;

/// Lane assignment over the input bytes: contiguous, non-overlapping ranges,
/// one per lane, none of which splits a record. `trailing_bytes` is the
/// unassignable partial record at the end of a fixed-width input.
#[derive(Debug, Clone)]
pub struct Partition {
    pub ranges: Vec<Range<usize>>,
    pub trailing_bytes: usize,
}

impl Partition {
    pub fn record_bytes(&self) -> usize {
        self.ranges.iter().map(|r| r.len()).sum()
    }
}

/// Fixed-width chunking: boundaries fall on multiples of the record length,
/// the last lane absorbs the remainder of the division by lane count.
pub fn fixed_plan(len: usize, lanes: usize) -> Partition {
    let lanes = lanes.max(1);
    let trailing_bytes = len % FIXED_RECORD_LEN;
    let records = len / FIXED_RECORD_LEN;
    let per_lane = records / lanes;
    let mut ranges = Vec::with_capacity(lanes);
    let mut start = 0usize;
    for lane in 0..lanes {
        let count = if lane == lanes - 1 { records - per_lane * (lanes - 1) } else { per_lane };
        let end = start + count * FIXED_RECORD_LEN;
        ranges.push(start..end);
        start = end;
    }
    Partition { ranges, trailing_bytes }
}

/// Line chunking: even byte targets, each boundary snapped forward past the
/// next newline so every line lands in exactly one lane.
pub fn line_plan(data: &[u8], lanes: usize) -> Partition {
    let lanes = lanes.max(1);
    let len = data.len();
    let target = len / lanes;
    let mut ranges = Vec::with_capacity(lanes);
    let mut start = 0usize;
    for lane in 1..lanes {
        let cut = (lane * target).max(start).min(len);
        let cut = match memchr(b'\n', &data[cut..]) {
            Some(i) => cut + i + 1,
            None => len,
        };
        ranges.push(start..cut);
        start = cut;
    }
    ranges.push(start..len);
    Partition { ranges, trailing_bytes: 0 }
}

/// Iterate lines of a chunk, stripping `\r\n` / `\n` and skipping empties.
pub fn lines(chunk: &[u8]) -> Lines<'_> {
    Lines { chunk, pos: 0 }
}

pub struct Lines<'a> {
    chunk: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        while self.pos < self.chunk.len() {
            let rest = &self.chunk[self.pos..];
            let (line_end, advance) = match memchr(b'\n', rest) {
                Some(i) => (i, i + 1),
                None => (rest.len(), rest.len()),
            };
            let mut line = &rest[..line_end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            self.pos += advance;
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_plan_covers_whole_records() {
        for records in [0usize, 1, 7, 64] {
            for lanes in [1usize, 2, 3, 8, 100] {
                let plan = fixed_plan(records * FIXED_RECORD_LEN, lanes);
                assert_eq!(plan.ranges.len(), lanes);
                assert_eq!(plan.trailing_bytes, 0);
                let mut pos = 0usize;
                for r in &plan.ranges {
                    assert_eq!(r.start, pos, "lanes contiguous");
                    assert_eq!(r.len() % FIXED_RECORD_LEN, 0, "no split record");
                    pos = r.end;
                }
                assert_eq!(pos, records * FIXED_RECORD_LEN, "all records assigned");
            }
        }
    }

    #[test]
    fn fixed_plan_reports_truncated_tail() {
        let plan = fixed_plan(3 * FIXED_RECORD_LEN + 17, 2);
        assert_eq!(plan.trailing_bytes, 17);
        assert_eq!(plan.record_bytes(), 3 * FIXED_RECORD_LEN);
    }

    #[test]
    fn line_plan_assigns_each_line_once() {
        let mut data = Vec::new();
        for i in 0..23 {
            data.extend_from_slice(format!("line-{i}\r\n").as_bytes());
        }
        for lanes in [1usize, 2, 3, 8, 40] {
            let plan = line_plan(&data, lanes);
            let mut seen = Vec::new();
            let mut pos = 0usize;
            for r in &plan.ranges {
                assert_eq!(r.start, pos);
                pos = r.end;
                for line in lines(&data[r.clone()]) {
                    seen.push(String::from_utf8(line.to_vec()).unwrap());
                }
            }
            assert_eq!(pos, data.len());
            assert_eq!(seen.len(), 23, "lanes={lanes}");
            for (i, line) in seen.iter().enumerate() {
                assert_eq!(line, &format!("line-{i}"));
            }
        }
    }

    #[test]
    fn lines_handle_missing_final_terminator() {
        let collected: Vec<_> = lines(b"a b c\r\nd e f").collect();
        assert_eq!(collected, vec![b"a b c".as_slice(), b"d e f".as_slice()]);
    }
}
