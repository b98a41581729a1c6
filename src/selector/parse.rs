//! Parser and matcher behind the in-memory DOM's selector support.
//!
//! Only the subset the content script needs is understood: type selectors,
//! `*`, `#id`, `.class`, attribute tests (`[a]`, `[a=v]`, `[a*=v]`,
//! `[a^=v]`, `[a$=v]`, `[a~=v]`, with an optional ` i` flag) and comma
//! separated lists. Combinators are rejected.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorError {
    pub position: usize,
    pub message: String,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid selector at {}: {}", self.position, self.message)
    }
}

impl std::error::Error for SelectorError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Contains,
    Prefix,
    Suffix,
    Includes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AttrTest {
    name: String,
    op: Option<(AttrOp, String)>,
    case_insensitive: bool,
}

impl AttrTest {
    fn test(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        let Some((op, expected)) = &self.op else {
            return true;
        };

        let (actual, expected) = if self.case_insensitive {
            (actual.to_lowercase(), expected.to_lowercase())
        } else {
            (actual.to_string(), expected.clone())
        };

        match op {
            AttrOp::Equals => actual == expected,
            AttrOp::Contains => !expected.is_empty() && actual.contains(&expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
            AttrOp::Includes => actual.split_whitespace().any(|w| w == expected),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(super) struct Compound {
    /// Lowercased; `None` means any element.
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    pub(super) fn matches<E: ElementView + ?Sized>(&self, el: &E) -> bool {
        if let Some(tag) = &self.tag {
            if !el.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if !self.ids.is_empty() {
            let id = el.attr("id").unwrap_or("");
            if self.ids.iter().any(|want| want != id) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let class = el.attr("class").unwrap_or("");
            if !self
                .classes
                .iter()
                .all(|want| class.split_whitespace().any(|t| t == want))
            {
                return false;
            }
        }

        self.attrs.iter().all(|a| a.test(el.attr(&a.name)))
    }
}

/// Read access an element must offer to be matched.
pub trait ElementView {
    fn tag_name(&self) -> &str;
    fn attr(&self, name: &str) -> Option<&str>;
}

struct Parser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn err(&self, message: impl Into<String>) -> SelectorError {
        SelectorError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, want: char) -> Result<(), SelectorError> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(self.err(format!("expected `{want}`, found `{c}`"))),
            None => Err(self.err(format!("expected `{want}`, found end of input"))),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Compound>, SelectorError> {
        if self.src.trim().is_empty() {
            return Err(self.err("empty selector"));
        }

        let mut out = Vec::new();
        loop {
            self.skip_ws();
            out.push(self.parse_compound()?);
            self.skip_ws();
            match self.bump() {
                None => return Ok(out),
                Some(',') => continue,
                Some(c) => return Err(self.err(format!("unsupported combinator `{c}`"))),
            }
        }
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let start = self.pos;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.err("expected a selector"));
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if !is_ident_char(c) {
                break;
            }
            s.push(c);
            self.pos += 1;
        }
        if s.is_empty() {
            return Err(self.err("expected an identifier"));
        }
        Ok(s)
    }

    fn parse_attr(&mut self) -> Result<AttrTest, SelectorError> {
        self.skip_ws();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttrTest {
                    name,
                    op: None,
                    case_insensitive: false,
                });
            }
            Some('=') => {
                self.pos += 1;
                AttrOp::Equals
            }
            Some(c @ ('*' | '^' | '$' | '~')) => {
                self.pos += 1;
                self.expect('=')?;
                match c {
                    '*' => AttrOp::Contains,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Includes,
                }
            }
            _ => return Err(self.err("expected `]` or an attribute operator")),
        };

        self.skip_ws();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                let mut v = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == q => break,
                        Some(c) => v.push(c),
                        None => return Err(self.err("unterminated string")),
                    }
                }
                v
            }
            _ => self.parse_ident()?,
        };

        self.skip_ws();
        let mut case_insensitive = false;
        if matches!(self.peek(), Some('i' | 'I')) {
            self.pos += 1;
            case_insensitive = true;
            self.skip_ws();
        }
        self.expect(']')?;

        Ok(AttrTest {
            name,
            op: Some((op, value)),
            case_insensitive,
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

pub(super) fn parse_list(src: &str) -> Result<Vec<Compound>, SelectorError> {
    Parser::new(src).parse_list()
}
