use crate::error::{VauError, VauResult};
use crate::heap::Heap;
use crate::strings::StringTable;
use crate::symbol::{sym, SymbolTable};
use crate::value::Value;

/// Parses source text into value trees. Byte-wise cursor; one expression
/// per `read` call.
pub struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    heap: &'a mut Heap,
    symbols: &'a mut SymbolTable,
    strings: &'a mut StringTable,
}

/// Read one expression starting at `pos`. Returns the value and the new
/// position, or None at end of input. Used by the front end to interleave
/// reading and evaluation.
pub fn read_one_at(
    input: &str,
    pos: usize,
    heap: &mut Heap,
    symbols: &mut SymbolTable,
    strings: &mut StringTable,
) -> VauResult<Option<(Value, usize)>> {
    let mut reader = Reader::new(input, heap, symbols, strings);
    reader.pos = pos;
    match reader.read()? {
        Some(value) => Ok(Some((value, reader.position()))),
        None => Ok(None),
    }
}

impl<'a> Reader<'a> {
    pub fn new(
        input: &'a str,
        heap: &'a mut Heap,
        symbols: &'a mut SymbolTable,
        strings: &'a mut StringTable,
    ) -> Self {
        Reader {
            input: input.as_bytes(),
            pos: 0,
            heap,
            symbols,
            strings,
        }
    }

    /// Read one expression. Returns None at EOF.
    pub fn read(&mut self) -> VauResult<Option<Value>> {
        self.skip_whitespace_and_comments();
        if self.pos >= self.input.len() {
            return Ok(None);
        }
        let val = self.read_expr()?;
        Ok(Some(val))
    }

    /// Return current position in input.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read all expressions from input.
    pub fn read_all(&mut self) -> VauResult<Vec<Value>> {
        let mut results = Vec::new();
        while let Some(value) = self.read()? {
            results.push(value);
        }
        Ok(results)
    }

    fn peek(&self) -> Option<u8> {
        if self.pos < self.input.len() {
            Some(self.input[self.pos])
        } else {
            None
        }
    }

    fn advance(&mut self) -> Option<u8> {
        if self.pos < self.input.len() {
            let ch = self.input[self.pos];
            self.pos += 1;
            Some(ch)
        } else {
            None
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.input.len() {
                let ch = self.input[self.pos];
                if ch == b' ' || ch == b'\t' || ch == b'\n' || ch == b'\r' {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            // Line comments.
            if self.pos < self.input.len() && self.input[self.pos] == b';' {
                while self.pos < self.input.len() && self.input[self.pos] != b'\n' {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn read_expr(&mut self) -> VauResult<Value> {
        self.skip_whitespace_and_comments();

        let ch = self
            .peek()
            .ok_or_else(|| VauError::ReadError("unexpected EOF".into()))?;

        match ch {
            b'(' => self.read_list(),
            b')' => Err(VauError::ReadError("unexpected ')'".into())),
            b'\'' => self.read_quote(),
            b'"' => self.read_string(),
            _ => self.read_word(),
        }
    }

    /// Read a list: (a b c), (a . b), or (a b . c).
    fn read_list(&mut self) -> VauResult<Value> {
        self.advance(); // consume '('
        self.skip_whitespace_and_comments();

        if self.peek() == Some(b')') {
            self.advance();
            return Ok(Value::Nil);
        }

        let mut elements = Vec::new();
        let mut dot_tail = None;

        loop {
            self.skip_whitespace_and_comments();

            if self.peek() == Some(b')') {
                self.advance();
                break;
            }

            if self.pos >= self.input.len() {
                return Err(VauError::ReadError("unterminated list".into()));
            }

            if self.peek() == Some(b'.') && self.is_dot_separator() {
                if elements.is_empty() {
                    return Err(VauError::ReadError("dot before any list element".into()));
                }
                self.advance(); // consume '.'
                self.skip_whitespace_and_comments();
                dot_tail = Some(self.read_expr()?);
                self.skip_whitespace_and_comments();
                if self.peek() != Some(b')') {
                    return Err(VauError::ReadError("expected ')' after dot tail".into()));
                }
                self.advance();
                break;
            }

            elements.push(self.read_expr()?);
        }

        let mut result = dot_tail.unwrap_or(Value::Nil);
        for val in elements.into_iter().rev() {
            let pair = self.heap.alloc(val, result);
            result = Value::Pair(pair);
        }
        Ok(result)
    }

    /// A '.' is a dot separator only when followed by whitespace, ')', or
    /// EOF; otherwise it is part of a word.
    fn is_dot_separator(&self) -> bool {
        let next_pos = self.pos + 1;
        if next_pos >= self.input.len() {
            return true;
        }
        let next = self.input[next_pos];
        next == b' ' || next == b'\t' || next == b'\n' || next == b'\r' || next == b')'
    }

    /// 'x reads as ($quote x).
    fn read_quote(&mut self) -> VauResult<Value> {
        self.advance(); // consume '\''
        let quoted = self.read_expr()?;
        let inner = self.heap.alloc(quoted, Value::Nil);
        let outer = self
            .heap
            .alloc(Value::Symbol(sym::QUOTE), Value::Pair(inner));
        Ok(Value::Pair(outer))
    }

    fn read_string(&mut self) -> VauResult<Value> {
        self.advance(); // consume '"'
        let mut contents = String::new();
        loop {
            match self.advance() {
                None => return Err(VauError::ReadError("unterminated string".into())),
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(b'"') => contents.push('"'),
                    Some(b'\\') => contents.push('\\'),
                    Some(b'n') => contents.push('\n'),
                    Some(b't') => contents.push('\t'),
                    Some(b'r') => contents.push('\r'),
                    other => {
                        return Err(VauError::ReadError(format!(
                            "unknown string escape: {:?}",
                            other.map(|b| b as char)
                        )))
                    }
                },
                Some(byte) => contents.push(byte as char),
            }
        }
        let id = self.strings.alloc(contents);
        Ok(Value::Str(id))
    }

    /// Read a word: an integer, a boolean, `#ignore`, or a symbol.
    fn read_word(&mut self) -> VauResult<Value> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == b' '
                || ch == b'\t'
                || ch == b'\n'
                || ch == b'\r'
                || ch == b'('
                || ch == b')'
                || ch == b'"'
                || ch == b';'
                || ch == b'\''
            {
                break;
            }
            self.pos += 1;
        }
        let word = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| VauError::ReadError("invalid utf-8 in symbol".into()))?;

        if let Some(rest) = word.strip_prefix('#') {
            return match rest {
                "t" => Ok(Value::Bool(true)),
                "f" => Ok(Value::Bool(false)),
                "ignore" => Ok(Value::Symbol(sym::IGNORE)),
                _ => Err(VauError::ReadError(format!("unknown # syntax: {}", word))),
            };
        }

        if looks_numeric(word) {
            let n: i64 = word
                .parse()
                .map_err(|_| VauError::ReadError(format!("bad integer literal: {}", word)))?;
            return Ok(Value::Int(n));
        }

        Ok(Value::Symbol(self.symbols.intern(word)))
    }
}

/// A word is numeric if it is all digits, optionally after a sign. A lone
/// sign is a symbol.
fn looks_numeric(word: &str) -> bool {
    let digits = word
        .strip_prefix('-')
        .or_else(|| word.strip_prefix('+'))
        .unwrap_or(word);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Tables {
        heap: Heap,
        symbols: SymbolTable,
        strings: StringTable,
    }

    fn tables() -> Tables {
        Tables {
            heap: Heap::new(),
            symbols: SymbolTable::new(),
            strings: StringTable::new(),
        }
    }

    fn read_one(t: &mut Tables, src: &str) -> VauResult<Value> {
        let mut reader = Reader::new(src, &mut t.heap, &mut t.symbols, &mut t.strings);
        reader
            .read()?
            .ok_or_else(|| VauError::ReadError("empty input".into()))
    }

    #[test]
    fn reads_atoms() {
        let mut t = tables();
        assert_eq!(read_one(&mut t, "42"), Ok(Value::Int(42)));
        assert_eq!(read_one(&mut t, "-7"), Ok(Value::Int(-7)));
        assert_eq!(read_one(&mut t, "#t"), Ok(Value::Bool(true)));
        assert_eq!(read_one(&mut t, "#f"), Ok(Value::Bool(false)));
        assert_eq!(read_one(&mut t, "#ignore"), Ok(Value::Symbol(sym::IGNORE)));
        assert_eq!(read_one(&mut t, "()"), Ok(Value::Nil));
    }

    #[test]
    fn a_lone_sign_is_a_symbol() {
        let mut t = tables();
        let value = read_one(&mut t, "-").unwrap();
        let id = value.as_symbol().expect("symbol");
        assert_eq!(t.symbols.name(id), "-");
    }

    #[test]
    fn reads_nested_and_dotted_lists() {
        let mut t = tables();
        let value = read_one(&mut t, "(a (b . c) . d)").unwrap();
        let pair = value.as_pair().unwrap();
        assert!(t.heap.head(pair).is_symbol());
        assert!(!t.heap.is_proper_list(value));
    }

    #[test]
    fn quote_sugar_expands() {
        let mut t = tables();
        let value = read_one(&mut t, "'x").unwrap();
        let pair = value.as_pair().unwrap();
        assert_eq!(t.heap.head(pair), Value::Symbol(sym::QUOTE));
    }

    #[test]
    fn comments_are_skipped() {
        let mut t = tables();
        let value = read_one(&mut t, "; nothing here\n  99").unwrap();
        assert_eq!(value, Value::Int(99));
    }

    #[test]
    fn string_escapes() {
        let mut t = tables();
        let value = read_one(&mut t, r#""a\"b\n""#).unwrap();
        match value {
            Value::Str(id) => assert_eq!(t.strings.get(id), "a\"b\n"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn unterminated_forms_error() {
        let mut t = tables();
        assert!(matches!(
            read_one(&mut t, "(1 2"),
            Err(VauError::ReadError(_))
        ));
        assert!(matches!(
            read_one(&mut t, "\"abc"),
            Err(VauError::ReadError(_))
        ));
        assert!(matches!(
            read_one(&mut t, "#what"),
            Err(VauError::ReadError(_))
        ));
    }
}
