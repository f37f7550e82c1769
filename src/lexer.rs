//! Lexical analysis of a single command line.
//!
//! The lexer never copies: every lexeme is a byte span `[begin, end)` over
//! the input it was created with. Number literals are converted while lexing
//! and carried in [`Lexeme::value`].

use crate::error::{Error, ErrorKind, Range};
use crate::rune::{self, Rune};
use log::trace;
use strum::EnumIs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum LexemeKind {
    /// Not lexed yet, or lexing failed.
    Bad,
    Number,
    Str,
    Colon,
    Identifier,
    Dollar,
    Newline,
    Eof,
}

/// Value of a number literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Exact(u64),
    Inexact(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lexeme {
    pub kind: LexemeKind,
    pub begin: usize,
    pub end: usize,
    pub value: Option<Number>,
}

impl Lexeme {
    fn start(at: usize) -> Self {
        Self {
            kind: LexemeKind::Bad,
            begin: at,
            end: at,
            value: None,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn range(&self) -> Range {
        Range::new(self.begin, self.end)
    }

    /// Span of the lexeme's contents: string literals lose their delimiters,
    /// everything else is returned whole.
    pub fn body(&self) -> (usize, usize) {
        match self.kind {
            LexemeKind::Str if self.len() >= 2 => (self.begin + 1, self.end - 1),
            _ => (self.begin, self.end),
        }
    }
}

/// The rune as an ASCII byte, if it is one.
fn ascii(r: Rune) -> Option<u8> {
    u8::try_from(r).ok().filter(u8::is_ascii)
}

fn is_whitespace(r: Rune) -> bool {
    matches!(ascii(r), Some(b' ' | b'\r' | b'\t'))
}

fn is_decimal(r: Rune) -> bool {
    matches!(ascii(r), Some(b'0'..=b'9' | b'_'))
}

fn is_hexadecimal(r: Rune) -> bool {
    matches!(ascii(r), Some(b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F' | b'_'))
}

fn is_binary(r: Rune) -> bool {
    matches!(ascii(r), Some(b'0' | b'1' | b'_'))
}

fn is_ident_start(r: Rune) -> bool {
    matches!(
        ascii(r),
        Some(
            b'a'..=b'z'
                | b'A'..=b'Z'
                | b'~'
                | b'+'
                | b'-'
                | b'_'
                | b'*'
                | b'/'
                | b'?'
                | b'='
                | b'&'
                | b'%'
                | b'<'
                | b'>'
                | b'!'
        )
    )
}

fn is_ident_continue(r: Rune) -> bool {
    is_ident_start(r) || matches!(ascii(r), Some(b'0'..=b'9'))
}

/// Folds the digits of `digits` in base `radix`, skipping separators.
/// Overflow wraps.
fn exact_value(digits: &[u8], radix: u32) -> u64 {
    digits
        .iter()
        .filter_map(|&b| char::from(b).to_digit(radix))
        .fold(0u64, |acc, d| {
            acc.wrapping_mul(u64::from(radix))
                .wrapping_add(u64::from(d))
        })
}

fn inexact_value(digits: &[u8]) -> f64 {
    let mut value = 0.0;
    let mut position: Option<i32> = None;
    for &b in digits {
        match (b, position) {
            (b'.', _) => position = Some(0),
            (b'0'..=b'9', None) => value = value * 10.0 + f64::from(b - b'0'),
            (b'0'..=b'9', Some(p)) => {
                let p = p + 1;
                value += f64::from(b - b'0') / 10f64.powi(p);
                position = Some(p);
            }
            _ => {}
        }
    }
    value
}

/// Cursor over one line of input.
pub struct Lexer<'a> {
    input: &'a [u8],
    lexeme: Lexeme,
    error: Option<Error>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            lexeme: Lexeme::start(0),
            error: None,
            finished: false,
        }
    }

    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    /// The most recent lexeme, or the partial span of a failed one.
    pub fn lexeme(&self) -> Lexeme {
        self.lexeme
    }

    /// The failure recorded by the last call, if any.
    pub fn error(&self) -> Option<Error> {
        self.error
    }

    pub fn text(&self, lexeme: &Lexeme) -> &'a [u8] {
        self.input.get(lexeme.begin..lexeme.end).unwrap_or_default()
    }

    /// Lexes the next lexeme, starting where the previous one ended.
    pub fn next_lexeme(&mut self) -> Result<Lexeme, Error> {
        self.lexeme = Lexeme::start(self.lexeme.end);
        self.error = None;
        match self.read_any() {
            Ok(()) => {
                trace!(
                    "lexeme {:?} at {}..{}",
                    self.lexeme.kind, self.lexeme.begin, self.lexeme.end
                );
                Ok(self.lexeme)
            }
            Err(err) => {
                self.lexeme.kind = LexemeKind::Bad;
                self.error = Some(err);
                Err(err)
            }
        }
    }

    /// The rune at the cursor, `None` at end of input.
    pub fn peek_rune(&self) -> Result<Option<Rune>, Error> {
        self.decode_at_cursor().map(|decoded| decoded.map(|(r, _)| r))
    }

    /// Consumes the rune at the cursor into the current lexeme.
    pub fn advance_rune(&mut self) -> Result<Option<Rune>, Error> {
        let decoded = self.decode_at_cursor()?;
        if let Some((_, len)) = decoded {
            self.lexeme.end += len;
        }
        Ok(decoded.map(|(r, _)| r))
    }

    /// Skips spaces, carriage returns and tabs; the next lexeme starts after them.
    pub fn skip_whitespace(&mut self) -> Result<(), Error> {
        self.accept_run(is_whitespace)?;
        self.lexeme.begin = self.lexeme.end;
        Ok(())
    }

    fn decode_at_cursor(&self) -> Result<Option<(Rune, usize)>, Error> {
        let rest = self.input.get(self.lexeme.end..).unwrap_or_default();
        if rest.is_empty() {
            return Ok(None);
        }
        rune::decode(rest)
            .map(Some)
            .map_err(|_| self.fail(ErrorKind::BadRune))
    }

    fn fail(&self, kind: ErrorKind) -> Error {
        Error::new(kind, self.lexeme.range())
    }

    fn accept_run(&mut self, accept: fn(Rune) -> bool) -> Result<(), Error> {
        while let Some(r) = self.peek_rune()? {
            if !accept(r) {
                break;
            }
            self.advance_rune()?;
        }
        Ok(())
    }

    fn read_any(&mut self) -> Result<(), Error> {
        self.skip_whitespace()?;
        let Some(r) = self.peek_rune()? else {
            self.lexeme.kind = LexemeKind::Eof;
            return Ok(());
        };

        if matches!(ascii(r), Some(b'0'..=b'9')) {
            return self.read_number();
        }
        if is_ident_start(r) {
            self.accept_run(is_ident_continue)?;
            self.lexeme.kind = LexemeKind::Identifier;
            return Ok(());
        }

        let kind = match ascii(r) {
            Some(delimiter @ (b'"' | b'\'')) => return self.read_string(delimiter),
            Some(b':') => LexemeKind::Colon,
            Some(b'$') => LexemeKind::Dollar,
            Some(b'\n') => LexemeKind::Newline,
            _ => {
                self.advance_rune()?;
                return Err(self.fail(ErrorKind::UnrecognizedRune));
            }
        };
        self.advance_rune()?;
        self.lexeme.kind = kind;
        Ok(())
    }

    fn read_number(&mut self) -> Result<(), Error> {
        if self.advance_rune()? == Some(Rune::from(b'0')) {
            let radix = match self.peek_rune()?.and_then(ascii) {
                Some(b'x') => Some((16, is_hexadecimal as fn(Rune) -> bool)),
                Some(b'b') => Some((2, is_binary as fn(Rune) -> bool)),
                _ => None,
            };
            if let Some((radix, accept)) = radix {
                self.advance_rune()?;
                self.accept_run(accept)?;
                let digits = self.current(self.lexeme.begin + 2);
                return Ok(self.number(Number::Exact(exact_value(digits, radix))));
            }
        }

        self.accept_run(is_decimal)?;
        if self.peek_rune()? == Some(Rune::from(b'.')) {
            self.advance_rune()?;
            self.accept_run(is_decimal)?;
            let value = inexact_value(self.current(self.lexeme.begin));
            return Ok(self.number(Number::Inexact(value)));
        }
        let value = exact_value(self.current(self.lexeme.begin), 10);
        Ok(self.number(Number::Exact(value)))
    }

    fn read_string(&mut self, delimiter: u8) -> Result<(), Error> {
        self.advance_rune()?;
        loop {
            match self.advance_rune()?.map(ascii) {
                None => return Err(self.fail(ErrorKind::UnexpectedEof)),
                Some(Some(b)) if b == delimiter => break,
                Some(Some(b'\\')) => {
                    if self.advance_rune()?.is_none() {
                        return Err(self.fail(ErrorKind::UnexpectedEof));
                    }
                }
                Some(_) => {}
            }
        }
        self.lexeme.kind = LexemeKind::Str;
        Ok(())
    }

    /// Bytes of the current lexeme from `from` to the cursor.
    fn current(&self, from: usize) -> &'a [u8] {
        self.input.get(from..self.lexeme.end).unwrap_or_default()
    }

    fn number(&mut self, value: Number) {
        self.lexeme.kind = LexemeKind::Number;
        self.lexeme.value = Some(value);
    }
}

/// Yields lexemes up to and including end of input, or the first error.
impl Iterator for Lexer<'_> {
    type Item = Result<Lexeme, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_lexeme();
        self.finished = !matches!(result, Ok(l) if !l.kind.is_eof());
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(input: &str) -> Lexeme {
        Lexer::new(input.as_bytes()).next_lexeme().unwrap()
    }

    fn value(input: &str) -> Number {
        let lexeme = single(input);
        assert_eq!(lexeme.kind, LexemeKind::Number, "{input}");
        lexeme.value.unwrap()
    }

    fn kinds(input: &str) -> Vec<LexemeKind> {
        Lexer::new(input.as_bytes())
            .map(|l| l.unwrap().kind)
            .collect()
    }

    fn failure(input: &str) -> Error {
        let mut lexer = Lexer::new(input.as_bytes());
        loop {
            match lexer.next_lexeme() {
                Ok(l) if l.kind.is_eof() => panic!("{input:?} lexed without error"),
                Ok(_) => {}
                Err(err) => {
                    assert_eq!(lexer.error(), Some(err));
                    return err;
                }
            }
        }
    }

    #[test]
    fn test_number_bases() {
        assert_eq!(value("0xFF"), Number::Exact(255));
        assert_eq!(value("0xff_ff"), Number::Exact(0xffff));
        assert_eq!(value("0b1010"), Number::Exact(10));
        assert_eq!(value("1_000"), Number::Exact(1000));
        assert_eq!(value("0"), Number::Exact(0));
        assert_eq!(value("007"), Number::Exact(7));
        assert_eq!(value("0x"), Number::Exact(0));
    }

    #[test]
    fn test_inexact_numbers() {
        let Number::Inexact(x) = value("123.001") else {
            panic!("expected an inexact number");
        };
        assert!((x - 123.001).abs() < 1e-9);
        assert_eq!(value("0.5"), Number::Inexact(0.5));
        assert_eq!(value("2."), Number::Inexact(2.0));
        let Number::Inexact(x) = value("1_0.2_5") else {
            panic!("expected an inexact number");
        };
        assert!((x - 10.25).abs() < 1e-9);
    }

    #[test]
    fn test_exact_overflow_wraps() {
        assert_eq!(value("18446744073709551615"), Number::Exact(u64::MAX));
        assert_eq!(value("18446744073709551616"), Number::Exact(0));
    }

    #[test]
    fn test_number_ends_at_first_foreign_rune() {
        let mut lexer = Lexer::new(b"0b102");
        let first = lexer.next_lexeme().unwrap();
        assert_eq!(first.value, Some(Number::Exact(2)));
        assert_eq!((first.begin, first.end), (0, 4));
        assert_eq!(lexer.next_lexeme().unwrap().value, Some(Number::Exact(2)));
    }

    #[test]
    fn test_identifiers() {
        for input in ["def", "i2cscan", "a-b", "<=>", "_private", "x+1", "!ok?"] {
            let lexeme = single(input);
            assert_eq!(lexeme.kind, LexemeKind::Identifier, "{input}");
            assert_eq!(lexeme.len(), input.len(), "{input}");
        }
    }

    #[test]
    fn test_string_literals() {
        let input = br#""hello world" 'it''s'"#;
        let mut lexer = Lexer::new(input);

        let first = lexer.next_lexeme().unwrap();
        assert_eq!(first.kind, LexemeKind::Str);
        assert_eq!(lexer.text(&first), br#""hello world""#);
        let (begin, end) = first.body();
        assert_eq!(&input[begin..end], b"hello world");

        let second = lexer.next_lexeme().unwrap();
        assert_eq!(lexer.text(&second), b"'it'");
        let third = lexer.next_lexeme().unwrap();
        assert_eq!(lexer.text(&third), b"'s'");
    }

    #[test]
    fn test_backslash_keeps_escaped_rune() {
        let input = br#""say \"hi\"" 'a\'b'"#;
        let mut lexer = Lexer::new(input);

        let (begin, end) = lexer.next_lexeme().unwrap().body();
        assert_eq!(&input[begin..end], br#"say \"hi\""#);
        let (begin, end) = lexer.next_lexeme().unwrap().body();
        assert_eq!(&input[begin..end], br"a\'b");
    }

    #[test]
    fn test_empty_string_literal() {
        let lexeme = single("\"\"");
        assert_eq!(lexeme.kind, LexemeKind::Str);
        assert_eq!(lexeme.body(), (1, 1));
    }

    #[test]
    fn test_unterminated_string() {
        let err = failure("echo \"abc");
        assert_eq!(err.kind, ErrorKind::UnexpectedEof);
        assert_eq!(err.range, Range::new(5, 9));

        assert_eq!(failure("'abc\\").kind, ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_unrecognized_rune() {
        let err = failure("echo #");
        assert_eq!(err.kind, ErrorKind::UnrecognizedRune);
        assert_eq!(err.range, Range::new(5, 6));
    }

    #[test]
    fn test_bad_rune() {
        // non-ASCII runes are only allowed inside strings
        let err = failure("echo \u{0068}\u{0393}");
        assert_eq!(err.kind, ErrorKind::UnrecognizedRune);
        assert_eq!(err.range, Range::new(6, 8));

        let mut lexer = Lexer::new(b"def \xff");
        lexer.next_lexeme().unwrap();
        let err = lexer.next_lexeme().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRune);
        assert_eq!(lexer.lexeme().kind, LexemeKind::Bad);
    }

    #[test]
    fn test_multibyte_runes_inside_strings() {
        let input = "\"\u{68}\u{393}\u{30AC}\u{101FA}\"";
        let lexeme = single(input);
        assert_eq!(lexeme.kind, LexemeKind::Str);
        assert_eq!(lexeme.len(), 1 + 1 + 2 + 3 + 4 + 1);
    }

    #[test]
    fn test_line_structure() {
        use LexemeKind::*;
        assert_eq!(
            kinds("def a:1 $b\n"),
            vec![Identifier, Identifier, Colon, Number, Dollar, Identifier, Newline, Eof]
        );
        assert_eq!(kinds(" \t\r "), vec![Eof]);
        assert_eq!(kinds(""), vec![Eof]);
    }

    #[test]
    fn test_whitespace_is_not_part_of_a_lexeme() {
        let mut lexer = Lexer::new(b"  echo\t 42");
        let echo = lexer.next_lexeme().unwrap();
        assert_eq!((echo.begin, echo.end), (2, 6));
        let number = lexer.next_lexeme().unwrap();
        assert_eq!((number.begin, number.end), (8, 10));
        let eof = lexer.next_lexeme().unwrap();
        assert!(eof.kind.is_eof());
        assert!(eof.is_empty());
    }

    #[test]
    fn test_iterator_stops_after_first_error() {
        let results: Vec<_> = Lexer::new(b"a # b").collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
