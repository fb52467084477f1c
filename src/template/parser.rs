//! Template lexer and parser
//!
//! Supports the action subset used for project names and version models:
//! `{{ pipeline }}` with `{{-`/`-}}` trim markers, `{{/* comments */}}`,
//! pipelines joined by `|`, `.Field.Chain` access, `"quoted"` and `` `raw` ``
//! strings, function calls and parenthesized sub-pipelines with a trailing
//! field chain such as `(split "." .Version)._0`.

use super::Value;
use super::functions;

/// Parsed template element.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Action(Pipeline),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub(crate) commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Command {
    pub(crate) operands: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    /// `.`
    Dot,
    /// `.A.B`
    Field(Vec<String>),
    /// Function name
    Function(String),
    /// String literal
    Literal(Value),
    /// `( pipeline ).A.B`
    Group(Pipeline, Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    LeftParen,
    RightParen,
    Pipe,
    Dot,
    Field(Vec<String>),
    Ident(String),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    /// Whitespace separated this token from the previous one.
    spaced: bool,
}

/// Result of lexing one action body.
struct Action {
    tokens: Vec<Token>,
    /// Bytes consumed including the closing delimiter.
    consumed: usize,
    trim_right: bool,
}

pub(crate) fn parse(source: &str) -> Result<Vec<Node>, String> {
    let mut nodes = Vec::new();
    let mut rest = source;
    let mut trim_next = false;

    loop {
        let Some(open) = rest.find("{{") else {
            push_text(&mut nodes, rest, trim_next, false);
            break;
        };
        let mut body = open + 2;
        let trim_left = is_trim_marker(&rest[body..]);
        if trim_left {
            body += 1;
        }
        push_text(&mut nodes, &rest[..open], trim_next, trim_left);

        let action = lex(&rest[body..])?;
        trim_next = action.trim_right;
        if !action.tokens.is_empty() {
            let mut stream = TokenStream {
                tokens: action.tokens,
                pos: 0,
            };
            nodes.push(Node::Action(parse_pipeline(&mut stream, false)?));
        }
        rest = &rest[body + action.consumed..];
    }
    Ok(nodes)
}

fn push_text(nodes: &mut Vec<Node>, text: &str, trim_start: bool, trim_end: bool) {
    let text = if trim_start { text.trim_start() } else { text };
    let text = if trim_end { text.trim_end() } else { text };
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

/// `-` followed by whitespace right after `{{`.
fn is_trim_marker(s: &str) -> bool {
    s.strip_prefix('-')
        .and_then(|r| r.chars().next())
        .is_some_and(char::is_whitespace)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn lex(src: &str) -> Result<Action, String> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut spaced = true;

    if let Some(comment) = src.trim_start().strip_prefix("/*") {
        let end = comment.find("*/").ok_or("unclosed comment")?;
        let after = comment[end + 2..].trim_start();
        let (after, trim_right) = match after.strip_prefix("-}}") {
            Some(a) => (a, true),
            None => (after.strip_prefix("}}").ok_or("comment ends before closing delimiter")?, false),
        };
        return Ok(Action {
            tokens,
            consumed: src.len() - after.len(),
            trim_right,
        });
    }

    loop {
        let rest = &src[pos..];
        let Some(c) = rest.chars().next() else {
            return Err("unclosed action".to_string());
        };

        if c.is_whitespace() {
            if let Some(after) = rest.trim_start().strip_prefix("-}}") {
                return Ok(Action {
                    tokens,
                    consumed: src.len() - after.len(),
                    trim_right: true,
                });
            }
            pos += c.len_utf8();
            spaced = true;
            continue;
        }
        if rest.starts_with("}}") {
            return Ok(Action {
                tokens,
                consumed: pos + 2,
                trim_right: false,
            });
        }

        let (kind, len) = match c {
            '(' => (TokenKind::LeftParen, 1),
            ')' => (TokenKind::RightParen, 1),
            '|' => (TokenKind::Pipe, 1),
            '"' => lex_quoted(rest)?,
            '`' => {
                let end = rest[1..].find('`').ok_or("unterminated raw quoted string")?;
                (TokenKind::Str(rest[1..=end].to_string()), end + 2)
            }
            '.' => lex_field(rest),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let len = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
                (TokenKind::Ident(rest[..len].to_string()), len)
            }
            other => return Err(format!("unexpected {other:?} in command")),
        };
        tokens.push(Token { kind, spaced });
        spaced = false;
        pos += len;
    }
}

fn lex_quoted(rest: &str) -> Result<(TokenKind, usize), String> {
    let mut value = String::new();
    let mut chars = rest.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((TokenKind::Str(value), i + 1)),
            '\\' => {
                let (_, escaped) = chars.next().ok_or("unterminated quoted string")?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '\\' => '\\',
                    '"' => '"',
                    other => return Err(format!("unknown escape sequence: \\{other}")),
                });
            }
            '\n' => break,
            c => value.push(c),
        }
    }
    Err("unterminated quoted string".to_string())
}

fn lex_field(rest: &str) -> (TokenKind, usize) {
    let mut path = Vec::new();
    let mut pos = 0;
    while rest[pos..].starts_with('.') {
        let name = &rest[pos + 1..];
        let len = name.find(|c: char| !is_ident_char(c)).unwrap_or(name.len());
        if len == 0 {
            break;
        }
        path.push(name[..len].to_string());
        pos += len + 1;
    }
    if path.is_empty() {
        (TokenKind::Dot, 1)
    } else {
        (TokenKind::Field(path), pos)
    }
}

struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }
}

fn parse_pipeline(stream: &mut TokenStream, in_group: bool) -> Result<Pipeline, String> {
    let mut commands = Vec::new();
    let mut operands = Vec::new();

    loop {
        match stream.peek().map(|t| &t.kind) {
            None if in_group => return Err("unclosed left paren".to_string()),
            None => break,
            Some(TokenKind::RightParen) if in_group => break,
            Some(TokenKind::RightParen) => return Err("unexpected right paren".to_string()),
            Some(TokenKind::Pipe) => {
                stream.next();
                if operands.is_empty() {
                    return Err("missing command before '|'".to_string());
                }
                commands.push(Command {
                    operands: std::mem::take(&mut operands),
                });
            }
            Some(_) => operands.push(parse_operand(stream)?),
        }
    }

    if operands.is_empty() {
        return Err("missing value for command".to_string());
    }
    commands.push(Command { operands });
    Ok(Pipeline { commands })
}

fn parse_operand(stream: &mut TokenStream) -> Result<Operand, String> {
    let Some(token) = stream.next() else {
        return Err("unexpected end of action".to_string());
    };
    Ok(match token.kind {
        TokenKind::Dot => Operand::Dot,
        TokenKind::Field(path) => Operand::Field(path),
        TokenKind::Str(s) => Operand::Literal(Value::Str(s)),
        TokenKind::Ident(name) => {
            if !functions::exists(&name) {
                return Err(format!("function {name:?} not defined"));
            }
            Operand::Function(name)
        }
        TokenKind::LeftParen => {
            let pipeline = parse_pipeline(stream, true)?;
            stream.next();
            let chain = match stream.peek() {
                Some(Token {
                    kind: TokenKind::Field(path),
                    spaced: false,
                }) => {
                    let path = path.clone();
                    stream.next();
                    path
                }
                _ => Vec::new(),
            };
            Operand::Group(pipeline, chain)
        }
        TokenKind::RightParen | TokenKind::Pipe => {
            return Err("unexpected token in operand".to_string());
        }
    })
}
