/*!
Trace wire-format parsing: `"<T> <addr>"` per line, `T ∈ {R,W,F,C,M}`.

Grounded on spec.md §6's "Request type wire format (from front-end/trace)".
The trace *driver loop* and the address decoder are explicitly out of
scope (spec §1's OUT OF SCOPE list); this module only covers the wire
format itself, which spec §6 defines as part of the core's external
interface. `TraceReader` is the idiomatic replacement for the original's
file-reading front-end -- an `Iterator` over any `BufRead`, so callers can
feed it a file, a string, or a socket the same way.
*/

use crate::error::ConfigError;
use crate::request::RequestType;
use std::io::BufRead;

/// One parsed trace line: a request type plus its raw decimal address.
/// Mapping `addr` to an `AddrVec` is the address decoder's job, which
/// spec §1 places outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    pub request_type: RequestType,
    pub addr: u64,
}

fn parse_line(line: &str) -> Result<Option<TraceEntry>, ConfigError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut parts = line.split_whitespace();
    let token = parts.next().ok_or_else(|| ConfigError::InvalidTraceToken(line.to_string()))?;
    let addr_str = parts.next().ok_or_else(|| ConfigError::InvalidTraceToken(line.to_string()))?;
    let addr: u64 = addr_str.parse().map_err(|_| ConfigError::InvalidTraceToken(line.to_string()))?;
    let request_type = match token {
        "R" => RequestType::Read,
        "W" => RequestType::Write,
        "F" => RequestType::Fractional,
        "C" => RequestType::RowClone,
        "M" => RequestType::Majority,
        other => return Err(ConfigError::InvalidTraceToken(other.to_string())),
    };
    Ok(Some(TraceEntry { request_type, addr }))
}

/// Iterates `TraceEntry`s out of any `BufRead`, skipping blank lines and
/// `#`-comments. Terminates at end-of-input rather than wrapping, per
/// SPEC_FULL.md's resolution of the index-wraparound open question.
pub struct TraceReader<R> {
    lines: std::io::Lines<R>,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> TraceReader<R> {
        TraceReader { lines: reader.lines() }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceEntry, ConfigError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?.expect("trace source is not a valid UTF-8 stream");
            match parse_line(&line) {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_all_known_tokens() {
        let src = "R 0\nW 64\nF 128\nC 256\nM 512\n";
        let entries: Result<Vec<_>, _> = TraceReader::new(Cursor::new(src)).collect();
        let entries = entries.unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0], TraceEntry { request_type: RequestType::Read, addr: 0 });
        assert_eq!(entries[4], TraceEntry { request_type: RequestType::Majority, addr: 512 });
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let src = "R 0\n\n# a comment\nW 8\n";
        let entries: Vec<_> = TraceReader::new(Cursor::new(src)).map(|e| e.unwrap()).collect();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn unknown_token_is_a_config_error() {
        let src = "X 0\n";
        let mut reader = TraceReader::new(Cursor::new(src));
        assert!(matches!(reader.next(), Some(Err(ConfigError::InvalidTraceToken(_)))));
    }
}
