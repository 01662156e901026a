//! Motif registry and per-instance payloads.
//!
//! A motif is a named primitive matcher: a small state machine that consumes
//! a run of input and optionally extracts a value from it. The registry is a
//! closed family, so motifs are represented as the [`Motif`] tag enum plus
//! the [`MotifData`] payload enum whose variants carry motif-specific
//! configuration. Custom-type and repeat payloads carry graph references and
//! are driven by the matcher; every other payload matches through
//! [`MotifData::run`], a pure function of the input and the payload.
//!
//! Each motif has an intrinsic priority between 0 (most specific, tried
//! first) and 255 (catch-all). Multi-character literals and address parsers
//! sit low, character-class matchers high, and `rest`, which always matches,
//! at the very bottom.

use crate::dag::entities::{Component, Node};
use crate::result::{BuildError, BuildResult};
use core::fmt;
use core::str::FromStr;
use serde_json::Value;

/// A named primitive matcher in the registry.
///
/// `Motif` is the tag half of a [`MotifData`] payload, useful wherever only
/// the kind of an edge matters (statistics, display, priority tables).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Motif {
    /// Fixed text.
    Literal,
    /// RFC 3164 syslog timestamp, `Mmm [d]d hh:mm:ss`.
    DateRfc3164,
    /// RFC 5424 timestamp, `yyyy-mm-ddThh:mm:ss` with optional fraction and
    /// zone.
    DateRfc5424,
    /// Dotted-quad IPv4 address.
    Ipv4,
    /// Run of decimal digits, captured as an integer.
    Number,
    /// `0x`-prefixed run of hex digits.
    HexNumber,
    /// Double-quoted string honoring backslash escapes.
    QuotedString,
    /// Everything up to a configured character.
    CharTo,
    /// Everything up to the first of a configured set of characters.
    CharSep,
    /// Run of spaces and tabs.
    Whitespace,
    /// Everything up to the next space.
    Word,
    /// Run of ASCII letters.
    Alpha,
    /// A sub-DAG matched repeatedly with a separator sub-DAG between items.
    Repeat,
    /// The remainder of the line, including nothing.
    Rest,
    /// An invocation of a named component. Never configured by name;
    /// rules spell it `@component`.
    CustomType,
}

impl Motif {
    /// Registry name, as spelled in the `type` key of parser configurations.
    pub fn name(self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::DateRfc3164 => "date-rfc3164",
            Self::DateRfc5424 => "date-rfc5424",
            Self::Ipv4 => "ipv4",
            Self::Number => "number",
            Self::HexNumber => "hexnumber",
            Self::QuotedString => "quoted-string",
            Self::CharTo => "char-to",
            Self::CharSep => "char-sep",
            Self::Whitespace => "whitespace",
            Self::Word => "word",
            Self::Alpha => "alpha",
            Self::Repeat => "repeat",
            Self::Rest => "rest",
            Self::CustomType => "custom-type",
        }
    }

    /// Intrinsic priority: the tiebreak between edges whose rules carry the
    /// same user priority. Lower is tried first.
    pub fn intrinsic_priority(self) -> u8 {
        match self {
            Self::Literal => 4,
            Self::DateRfc3164 | Self::DateRfc5424 => 8,
            Self::Ipv4 | Self::Number | Self::HexNumber => 16,
            Self::QuotedString => 24,
            Self::CharTo | Self::CharSep | Self::Whitespace => 32,
            Self::Word | Self::Alpha => 128,
            Self::Repeat | Self::CustomType => 64,
            Self::Rest => 255,
        }
    }
}

impl fmt::Display for Motif {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Motif {
    type Err = &'static str;

    /// Look up a motif by registry name. `custom-type` is not a name rules
    /// may use directly; component invocations are spelled `@component`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "literal" => Ok(Self::Literal),
            "date-rfc3164" => Ok(Self::DateRfc3164),
            "date-rfc5424" => Ok(Self::DateRfc5424),
            "ipv4" => Ok(Self::Ipv4),
            "number" => Ok(Self::Number),
            "hexnumber" => Ok(Self::HexNumber),
            "quoted-string" => Ok(Self::QuotedString),
            "char-to" => Ok(Self::CharTo),
            "char-sep" => Ok(Self::CharSep),
            "whitespace" => Ok(Self::Whitespace),
            "word" => Ok(Self::Word),
            "alpha" => Ok(Self::Alpha),
            "repeat" => Ok(Self::Repeat),
            "rest" => Ok(Self::Rest),
            _ => Err("unknown motif"),
        }
    }
}

/// The payload of one parser instance: the motif tag together with whatever
/// configuration that motif's constructor extracted.
#[derive(Clone, Debug, PartialEq)]
pub enum MotifData {
    /// Fixed text to match verbatim.
    Literal {
        /// The text, never empty.
        text: String,
    },
    /// RFC 3164 timestamp.
    DateRfc3164,
    /// RFC 5424 timestamp.
    DateRfc5424,
    /// IPv4 address.
    Ipv4,
    /// Decimal integer.
    Number,
    /// Hexadecimal integer with `0x` prefix.
    HexNumber,
    /// Double-quoted string.
    QuotedString,
    /// Everything up to (not including) a terminator character.
    CharTo {
        /// The terminator; must occur for the motif to match.
        to: char,
    },
    /// Everything up to the first separator character or end of input.
    CharSep {
        /// The separator set, never empty.
        seps: String,
    },
    /// Run of spaces and tabs.
    Whitespace,
    /// Everything up to the next space.
    Word,
    /// Run of ASCII letters.
    Alpha,
    /// Repeated sub-DAG with a separator sub-DAG between iterations. Both
    /// roots are anonymous subgraphs owned by the builder.
    Repeat {
        /// Root of the per-item subgraph; must match for every item.
        parser: Node,
        /// Root of the separator subgraph; a failure here ends the
        /// repetition cleanly.
        while_: Node,
    },
    /// The remainder of the line.
    Rest,
    /// Invocation of a named component.
    Component {
        /// The component whose root the matcher descends into.
        component: Component,
    },
}

impl MotifData {
    /// The motif tag of this payload.
    pub fn motif(&self) -> Motif {
        match *self {
            Self::Literal { .. } => Motif::Literal,
            Self::DateRfc3164 => Motif::DateRfc3164,
            Self::DateRfc5424 => Motif::DateRfc5424,
            Self::Ipv4 => Motif::Ipv4,
            Self::Number => Motif::Number,
            Self::HexNumber => Motif::HexNumber,
            Self::QuotedString => Motif::QuotedString,
            Self::CharTo { .. } => Motif::CharTo,
            Self::CharSep { .. } => Motif::CharSep,
            Self::Whitespace => Motif::Whitespace,
            Self::Word => Motif::Word,
            Self::Alpha => Motif::Alpha,
            Self::Repeat { .. } => Motif::Repeat,
            Self::Rest => Motif::Rest,
            Self::Component { .. } => Motif::CustomType,
        }
    }

    /// Construct the payload for `motif` from the motif-specific parameters
    /// of a configuration object (everything but `type`, `name`, and
    /// `priority`). Unknown parameters are rejected.
    ///
    /// `repeat` and custom-type payloads carry graph references and are
    /// assembled by the builder, not here.
    pub fn from_config(motif: Motif, params: &serde_json::Map<String, Value>) -> BuildResult<Self> {
        match motif {
            Motif::Literal => {
                let text = require_str(motif, params, "text")?;
                if text.is_empty() {
                    return Err(invalid(motif, "text", "must not be empty"));
                }
                reject_unknown(motif, params, &["text"])?;
                Ok(Self::Literal {
                    text: text.to_string(),
                })
            }
            Motif::CharTo => {
                let s = require_str(motif, params, "char")?;
                let mut chars = s.chars();
                let to = chars
                    .next()
                    .ok_or_else(|| invalid(motif, "char", "must be a single character"))?;
                if chars.next().is_some() {
                    return Err(invalid(motif, "char", "must be a single character"));
                }
                reject_unknown(motif, params, &["char"])?;
                Ok(Self::CharTo { to })
            }
            Motif::CharSep => {
                let seps = require_str(motif, params, "chars")?;
                if seps.is_empty() {
                    return Err(invalid(motif, "chars", "must not be empty"));
                }
                reject_unknown(motif, params, &["chars"])?;
                Ok(Self::CharSep {
                    seps: seps.to_string(),
                })
            }
            Motif::Repeat | Motif::CustomType => unreachable!("assembled by the builder"),
            _ => {
                reject_unknown(motif, params, &[])?;
                Ok(match motif {
                    Motif::DateRfc3164 => Self::DateRfc3164,
                    Motif::DateRfc5424 => Self::DateRfc5424,
                    Motif::Ipv4 => Self::Ipv4,
                    Motif::Number => Self::Number,
                    Motif::HexNumber => Self::HexNumber,
                    Motif::QuotedString => Self::QuotedString,
                    Motif::Whitespace => Self::Whitespace,
                    Motif::Word => Self::Word,
                    Motif::Alpha => Self::Alpha,
                    Motif::Rest => Self::Rest,
                    _ => unreachable!(),
                })
            }
        }
    }

    /// Attempt to consume input at byte `offset`.
    ///
    /// Returns the number of bytes consumed and, only when `capture` is set,
    /// the extracted value. Offsets stay on UTF-8 boundaries: every motif
    /// stops at an ASCII delimiter or consumes to end of input.
    ///
    /// Repeat and component payloads recurse through the graph and are
    /// driven by the matcher instead.
    pub fn run(&self, input: &str, offset: usize, capture: bool) -> Option<(usize, Option<Value>)> {
        let tail = &input.as_bytes()[offset..];
        let consumed = match *self {
            Self::Literal { ref text } => {
                if !input[offset..].starts_with(text.as_str()) {
                    return None;
                }
                text.len()
            }
            Self::DateRfc3164 => match_date_rfc3164(tail)?,
            Self::DateRfc5424 => match_date_rfc5424(tail)?,
            Self::Ipv4 => match_ipv4(tail)?,
            Self::Number => match_run(tail, u8::is_ascii_digit, MAX_NUMBER_DIGITS)?,
            Self::HexNumber => match_hexnumber(tail)?,
            Self::QuotedString => match_quoted_string(tail)?,
            Self::CharTo { to } => match_char_to(&input[offset..], to)?,
            Self::CharSep { ref seps } => match_char_sep(&input[offset..], seps)?,
            Self::Whitespace => match_run(tail, |b| *b == b' ' || *b == b'\t', usize::MAX)?,
            Self::Word => match_run(tail, |b| *b != b' ', usize::MAX)?,
            Self::Alpha => match_run(tail, u8::is_ascii_alphabetic, usize::MAX)?,
            Self::Rest => tail.len(),
            Self::Repeat { .. } | Self::Component { .. } => {
                unreachable!("driven by the matcher")
            }
        };
        if !capture {
            return Some((consumed, None));
        }
        let text = &input[offset..offset + consumed];
        let value = match *self {
            Self::Number => Value::from(text.parse::<i64>().ok()?),
            Self::QuotedString => Value::from(&text[1..text.len() - 1]),
            _ => Value::from(text),
        };
        Some((consumed, Some(value)))
    }
}

/// `number` stops here so the captured value always fits an `i64`.
const MAX_NUMBER_DIGITS: usize = 18;

/// Longest prefix of bytes satisfying `pred`, at least one, at most `max`.
fn match_run(s: &[u8], pred: impl Fn(&u8) -> bool, max: usize) -> Option<usize> {
    let run = s.iter().take_while(|&b| pred(b)).count();
    if run == 0 || run > max { None } else { Some(run) }
}

fn match_hexnumber(s: &[u8]) -> Option<usize> {
    if !s.starts_with(b"0x") {
        return None;
    }
    let run = s[2..].iter().take_while(|b| b.is_ascii_hexdigit()).count();
    if run == 0 { None } else { Some(2 + run) }
}

fn match_ipv4(s: &[u8]) -> Option<usize> {
    let mut pos = 0;
    for octet in 0..4 {
        if octet > 0 {
            if s.get(pos) != Some(&b'.') {
                return None;
            }
            pos += 1;
        }
        let run = s[pos..].iter().take_while(|b| b.is_ascii_digit()).count();
        if run == 0 || run > 3 {
            return None;
        }
        let value = s[pos..pos + run]
            .iter()
            .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));
        if value > 255 {
            return None;
        }
        pos += run;
    }
    Some(pos)
}

fn match_quoted_string(s: &[u8]) -> Option<usize> {
    if s.first() != Some(&b'"') {
        return None;
    }
    let mut pos = 1;
    loop {
        match s.get(pos)? {
            b'"' => return Some(pos + 1),
            b'\\' => pos += 2,
            _ => pos += 1,
        }
    }
}

fn match_char_to(s: &str, to: char) -> Option<usize> {
    let end = s.find(to)?;
    if end == 0 { None } else { Some(end) }
}

fn match_char_sep(s: &str, seps: &str) -> Option<usize> {
    let end = s
        .find(|c| seps.contains(c))
        .unwrap_or(s.len());
    if end == 0 { None } else { Some(end) }
}

const MONTHS: [&[u8]; 12] = [
    b"Jan", b"Feb", b"Mar", b"Apr", b"May", b"Jun", b"Jul", b"Aug", b"Sep", b"Oct", b"Nov", b"Dec",
];

fn digits_at(s: &[u8], pos: usize, n: usize) -> bool {
    s.get(pos..pos + n)
        .is_some_and(|d| d.iter().all(u8::is_ascii_digit))
}

/// `Mmm [d]d hh:mm:ss` with a space-padded, zero-padded, or bare day.
fn match_date_rfc3164(s: &[u8]) -> Option<usize> {
    let month = s.get(..3)?;
    if !MONTHS.iter().any(|m| *m == month) {
        return None;
    }
    if *s.get(3)? != b' ' {
        return None;
    }
    let mut pos = 4;
    if *s.get(pos)? == b' ' {
        pos += 1;
        if !s.get(pos)?.is_ascii_digit() {
            return None;
        }
        pos += 1;
    } else {
        if !s.get(pos)?.is_ascii_digit() {
            return None;
        }
        pos += 1;
        if s.get(pos).is_some_and(u8::is_ascii_digit) {
            pos += 1;
        }
    }
    if *s.get(pos)? != b' ' {
        return None;
    }
    pos += 1;
    if !digits_at(s, pos, 2)
        || s.get(pos + 2) != Some(&b':')
        || !digits_at(s, pos + 3, 2)
        || s.get(pos + 5) != Some(&b':')
        || !digits_at(s, pos + 6, 2)
    {
        return None;
    }
    Some(pos + 8)
}

/// `yyyy-mm-ddThh:mm:ss` with optional `.frac` and optional `Z`/`±hh:mm`.
fn match_date_rfc5424(s: &[u8]) -> Option<usize> {
    if !digits_at(s, 0, 4)
        || s.get(4) != Some(&b'-')
        || !digits_at(s, 5, 2)
        || s.get(7) != Some(&b'-')
        || !digits_at(s, 8, 2)
        || s.get(10) != Some(&b'T')
        || !digits_at(s, 11, 2)
        || s.get(13) != Some(&b':')
        || !digits_at(s, 14, 2)
        || s.get(16) != Some(&b':')
        || !digits_at(s, 17, 2)
    {
        return None;
    }
    let mut pos = 19;
    if s.get(pos) == Some(&b'.') {
        let frac = s[pos + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if frac == 0 {
            return None;
        }
        pos += 1 + frac;
    }
    match s.get(pos) {
        Some(&b'Z') => pos += 1,
        Some(&b'+') | Some(&b'-') => {
            if !digits_at(s, pos + 1, 2)
                || s.get(pos + 3) != Some(&b':')
                || !digits_at(s, pos + 4, 2)
            {
                return None;
            }
            pos += 6;
        }
        _ => {}
    }
    Some(pos)
}

fn require_str<'a>(
    motif: Motif,
    params: &'a serde_json::Map<String, Value>,
    key: &str,
) -> BuildResult<&'a str> {
    params
        .get(key)
        .ok_or_else(|| BuildError::MissingParameter {
            motif: motif.name().to_string(),
            key: key.to_string(),
        })?
        .as_str()
        .ok_or_else(|| invalid(motif, key, "must be a string"))
}

fn invalid(motif: Motif, key: &str, message: &str) -> BuildError {
    BuildError::InvalidParameter {
        motif: motif.name().to_string(),
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn reject_unknown(
    motif: Motif,
    params: &serde_json::Map<String, Value>,
    allowed: &[&str],
) -> BuildResult<()> {
    for key in params.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(BuildError::UnexpectedParameter {
                motif: motif.name().to_string(),
                key: key.clone(),
            });
        }
    }
    Ok(())
}
