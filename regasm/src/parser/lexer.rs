//! Line preprocessing and the canonical line representation

use std::fmt;

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Asciiz,
    Space,
    Byte,
    Word,
}

impl DirectiveKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            ".ASCIIZ" => Some(DirectiveKind::Asciiz),
            ".SPACE" => Some(DirectiveKind::Space),
            ".BYTE" => Some(DirectiveKind::Byte),
            ".WORD" => Some(DirectiveKind::Word),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DirectiveKind::Asciiz => ".ASCIIZ",
            DirectiveKind::Space => ".SPACE",
            DirectiveKind::Byte => ".BYTE",
            DirectiveKind::Word => ".WORD",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    Instruction {
        mnemonic: String,
        operands: Vec<String>,
    },
    Directive {
        kind: DirectiveKind,
        arg: String,
    },
}

/// One canonical line: already macro-expanded, ready for both passes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number in the source text.
    pub number: usize,
    pub label: Option<String>,
    /// `None` for a label-only line.
    pub item: Option<Item>,
}

impl Line {
    pub fn instruction(number: usize, mnemonic: &str, operands: Vec<String>) -> Self {
        Self {
            number,
            label: None,
            item: Some(Item::Instruction {
                mnemonic: mnemonic.to_string(),
                operands,
            }),
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{}:", label)?;
            if self.item.is_some() {
                write!(f, " ")?;
            }
        }
        match &self.item {
            Some(Item::Instruction { mnemonic, operands }) if operands.is_empty() => {
                write!(f, "{}", mnemonic)
            }
            Some(Item::Instruction { mnemonic, operands }) => {
                write!(f, "{} {}", mnemonic, operands.join(", "))
            }
            Some(Item::Directive { kind, arg }) => write!(f, "{} {}", kind.name(), arg),
            None => Ok(()),
        }
    }
}

/// Walk `line` and return the byte index of the first `target` that is not
/// inside a quoted span. Quotes toggle on the character that opened them.
fn find_unquoted(line: &str, target: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, ch) in line.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == target => return Some(i),
            None => {}
        }
    }
    None
}

/// Strip the comment, trim, and split off the label.
///
/// Returns `(label, rest)`; both are empty for a blank line.
pub fn preprocess_line(raw: &str) -> (&str, &str) {
    let line = match find_unquoted(raw, ';') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let line = line.trim();
    match find_unquoted(line, ':') {
        Some(idx) => (line[..idx].trim(), line[idx + 1..].trim()),
        None => ("", line),
    }
}

/// Split an operand list at commas that are not inside quotes.
pub fn split_operands(args: &str) -> Vec<String> {
    let args = args.trim();
    if args.is_empty() {
        return Vec::new();
    }
    let mut operands = Vec::new();
    let mut rest = args;
    while let Some(idx) = find_unquoted(rest, ',') {
        operands.push(rest[..idx].trim().to_string());
        rest = &rest[idx + 1..];
    }
    operands.push(rest.trim().to_string());
    operands
}

/// Split instruction text into its upper-cased mnemonic and the raw operand text.
pub fn split_mnemonic(text: &str) -> (String, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head.to_ascii_uppercase(), rest.trim()),
        None => (text.to_ascii_uppercase(), ""),
    }
}

/// Parse directive text (leading `.`) into its kind and raw argument.
pub fn parse_directive(text: &str) -> Result<Item, ErrorKind> {
    let (name, arg) = split_mnemonic(text);
    let kind = DirectiveKind::from_name(&name).ok_or(ErrorKind::UnknownDirective(name.clone()))?;
    if arg.is_empty() {
        return Err(ErrorKind::Arity(format!("{} needs an argument", kind.name())));
    }
    Ok(Item::Directive {
        kind,
        arg: arg.to_string(),
    })
}

/// Body of an `.ASCIIZ` argument: one pair of matching quotes is removed,
/// an unquoted argument is taken as-is.
pub fn string_body(arg: &str) -> Result<&str, ErrorKind> {
    let arg = arg.trim();
    for q in ['"', '\''] {
        if arg.starts_with(q) {
            return arg[1..]
                .strip_suffix(q)
                .ok_or_else(|| ErrorKind::Lexical(format!("unterminated string {}", arg)));
        }
    }
    Ok(arg)
}
