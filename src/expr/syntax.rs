//! Expression syntax
//!
//! `${ ... }` bodies are Lua expressions plus two forms from configuration
//! files:
//!
//! - `"key": value` fields in table constructors, `{"foo": 1, "bar": 2}`;
//! - membership, `"foo" in {"foo": 1}` and `x not in vars.list`.
//!
//! Source is tokenized and parsed by recursive descent into an [`Expr`] tree,
//! which prints back as plain Lua for the evaluator. Function literals and
//! varargs are rejected, so the grammar has no binding forms: every [`Expr::Name`]
//! is a reference into the evaluation environment.

use crate::error::{ExpressionError, ExpressionResult};
use logos::{Logos, Skip};
use std::fmt;

/// Global the membership operator is lowered to
pub const CONTAINS: &str = "__contains";

const UNARY_PRIORITY: u8 = 12;

#[derive(Debug, Clone, Default, PartialEq)]
enum LexError {
    #[default]
    UnexpectedCharacter,
    UnfinishedLongBracket,
}

/// Spelled as an alias so the `Logos` derive keeps the `'static` lifetime
type StaticStr = &'static str;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token {
    #[token("--", comment)]
    Comment,

    #[token("and", |_| "and")]
    #[token("break", |_| "break")]
    #[token("do", |_| "do")]
    #[token("else", |_| "else")]
    #[token("elseif", |_| "elseif")]
    #[token("end", |_| "end")]
    #[token("false", |_| "false")]
    #[token("for", |_| "for")]
    #[token("function", |_| "function")]
    #[token("goto", |_| "goto")]
    #[token("if", |_| "if")]
    #[token("in", |_| "in")]
    #[token("local", |_| "local")]
    #[token("nil", |_| "nil")]
    #[token("not", |_| "not")]
    #[token("or", |_| "or")]
    #[token("repeat", |_| "repeat")]
    #[token("return", |_| "return")]
    #[token("then", |_| "then")]
    #[token("true", |_| "true")]
    #[token("until", |_| "until")]
    #[token("while", |_| "while")]
    Keyword(StaticStr),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),

    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    #[regex(r"0[xX][0-9a-fA-F]+(\.[0-9a-fA-F]*)?([pP][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),

    /// String literal as written, quotes included
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice().to_string())]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| lex.slice().to_string())]
    #[regex(r"\[=*\[", long_string)]
    Str(String),

    #[token("...", |_| "...")]
    #[token("..", |_| "..")]
    #[token("==", |_| "==")]
    #[token("~=", |_| "~=")]
    #[token("!=", |_| "~=")]
    #[token("<=", |_| "<=")]
    #[token(">=", |_| ">=")]
    #[token("<<", |_| "<<")]
    #[token(">>", |_| ">>")]
    #[token("//", |_| "//")]
    #[token("+", |_| "+")]
    #[token("-", |_| "-")]
    #[token("*", |_| "*")]
    #[token("/", |_| "/")]
    #[token("%", |_| "%")]
    #[token("^", |_| "^")]
    #[token("#", |_| "#")]
    #[token("&", |_| "&")]
    #[token("~", |_| "~")]
    #[token("|", |_| "|")]
    #[token("<", |_| "<")]
    #[token(">", |_| ">")]
    #[token("=", |_| "=")]
    #[token("(", |_| "(")]
    #[token(")", |_| ")")]
    #[token("{", |_| "{")]
    #[token("}", |_| "}")]
    #[token("[", |_| "[")]
    #[token("]", |_| "]")]
    #[token(";", |_| ";")]
    #[token(":", |_| ":")]
    #[token(",", |_| ",")]
    #[token(".", |_| ".")]
    Symbol(StaticStr),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Comment => write!(f, "--"),
            Token::Name(s) | Token::Number(s) | Token::Str(s) => write!(f, "{}", s),
            Token::Keyword(s) | Token::Symbol(s) => write!(f, "{}", s),
        }
    }
}

/// Closing bracket for an opening long bracket `[`, `=`*level, `[`
fn closing_bracket(level: usize) -> String {
    format!("]{}]", "=".repeat(level))
}

/// `[[ ... ]]`, `[==[ ... ]==]`
fn long_string(lex: &mut logos::Lexer<Token>) -> Result<String, LexError> {
    let close = closing_bracket(lex.slice().len() - 2);
    let end = lex
        .remainder()
        .find(&close)
        .ok_or(LexError::UnfinishedLongBracket)?;
    lex.bump(end + close.len());
    Ok(lex.slice().to_string())
}

/// `-- line` or `--[[ long ]]`
fn comment(lex: &mut logos::Lexer<Token>) -> Result<Skip, LexError> {
    let rest = lex.remainder();
    let long = rest
        .strip_prefix('[')
        .map(|after| after.trim_start_matches('='))
        .filter(|after| after.starts_with('['));

    match long {
        Some(after) => {
            let opening = rest.len() - after.len() + 1;
            let close = closing_bracket(opening - 2);
            let end = rest[opening..]
                .find(&close)
                .ok_or(LexError::UnfinishedLongBracket)?;
            lex.bump(opening + end + close.len());
        }
        None => lex.bump(rest.find('\n').unwrap_or(rest.len())),
    }
    Ok(Skip)
}

/// A parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Nil,
    Bool(bool),
    /// Numeral, as written
    Number(String),
    /// String literal including its quotes or long brackets
    Str(String),
    Name(String),
    Field(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Method(Box<Expr>, String, Vec<Expr>),
    Table(Vec<TableField>),
    Unary(&'static str, Box<Expr>),
    Binary(Box<Expr>, &'static str, Box<Expr>),
    Contains {
        needle: Box<Expr>,
        haystack: Box<Expr>,
        negated: bool,
    },
    Paren(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableField {
    /// `value`
    Positional(Expr),
    /// `name = value`
    Named(String, Expr),
    /// `[key] = value` or `"key": value`
    Keyed(Expr, Expr),
}

impl Expr {
    /// Call `visit` with every name the expression reads, left to right
    pub fn walk_names<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Nil | Expr::Bool(_) | Expr::Number(_) | Expr::Str(_) => {}
            Expr::Name(name) => visit(name),
            Expr::Field(base, _) => base.walk_names(visit),
            Expr::Index(base, key) => {
                base.walk_names(visit);
                key.walk_names(visit);
            }
            Expr::Call(base, args) | Expr::Method(base, _, args) => {
                base.walk_names(visit);
                args.iter().for_each(|arg| arg.walk_names(visit));
            }
            Expr::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Positional(value) | TableField::Named(_, value) => {
                            value.walk_names(visit)
                        }
                        TableField::Keyed(key, value) => {
                            key.walk_names(visit);
                            value.walk_names(visit);
                        }
                    }
                }
            }
            Expr::Unary(_, operand) | Expr::Paren(operand) => operand.walk_names(visit),
            Expr::Binary(left, _, right) => {
                left.walk_names(visit);
                right.walk_names(visit);
            }
            Expr::Contains {
                needle, haystack, ..
            } => {
                needle.walk_names(visit);
                haystack.walk_names(visit);
            }
        }
    }

    /// Whether Lua accepts this expression directly before `.`, `[`, `:` or `(`
    fn is_prefix(&self) -> bool {
        matches!(
            self,
            Expr::Name(_)
                | Expr::Field(..)
                | Expr::Index(..)
                | Expr::Call(..)
                | Expr::Method(..)
                | Expr::Paren(_)
        )
    }
}

struct Prefix<'a>(&'a Expr);

impl fmt::Display for Prefix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_prefix() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "({})", self.0)
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Prints the expression as Lua source
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Nil => write!(f, "nil"),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Number(raw) | Expr::Str(raw) | Expr::Name(raw) => write!(f, "{}", raw),
            Expr::Field(base, name) => write!(f, "{}.{}", Prefix(base), name),
            Expr::Index(base, key) => write!(f, "{}[{}]", Prefix(base), key),
            Expr::Call(base, args) => {
                write!(f, "{}(", Prefix(base))?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Method(base, name, args) => {
                write!(f, "{}:{}(", Prefix(base), name)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Table(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match field {
                        TableField::Positional(value) => write!(f, "{}", value)?,
                        TableField::Named(name, value) => write!(f, "{} = {}", name, value)?,
                        TableField::Keyed(key, value) => write!(f, "[{}] = {}", key, value)?,
                    }
                }
                write!(f, "}}")
            }
            Expr::Unary(op, operand) => write!(f, "({} {})", op, operand),
            Expr::Binary(left, op, right) => write!(f, "({} {} {})", left, op, right),
            Expr::Contains {
                needle,
                haystack,
                negated,
            } => {
                let call = format!("{}({}, {})", CONTAINS, needle, haystack);
                if *negated {
                    write!(f, "(not {})", call)
                } else {
                    write!(f, "{}", call)
                }
            }
            Expr::Paren(inner) => write!(f, "({})", inner),
        }
    }
}

/// Parse an expression body
pub fn parse(source: &str) -> ExpressionResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let expr = parser.parse_expr(0)?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parser.error(format!("unexpected '{}'", token))),
    }
}

fn syntax_error(source: &str, message: impl Into<String>) -> ExpressionError {
    ExpressionError::Compile {
        expr: source.to_string(),
        message: message.into(),
    }
}

fn tokenize(source: &str) -> ExpressionResult<Vec<Token>> {
    let mut tokens = Vec::new();
    for (token, span) in Token::lexer(source).spanned() {
        let rest = &source[span.start..];
        match token {
            Ok(token) => tokens.push(token),
            Err(LexError::UnfinishedLongBracket) => {
                return Err(syntax_error(source, "unfinished long string or comment"))
            }
            Err(LexError::UnexpectedCharacter) if rest.starts_with(['"', '\'']) => {
                return Err(syntax_error(source, "unfinished string"))
            }
            Err(LexError::UnexpectedCharacter) => {
                let c = rest.chars().next().unwrap_or(' ');
                return Err(syntax_error(source, format!("unexpected character '{}'", c)));
            }
        }
    }
    Ok(tokens)
}

/// Left and right priorities of a binary operator
fn binary_priority(op: &str) -> Option<(u8, u8)> {
    Some(match op {
        "or" => (1, 1),
        "and" => (2, 2),
        "<" | ">" | "<=" | ">=" | "~=" | "==" | "in" => (3, 3),
        "|" => (4, 4),
        "~" => (5, 5),
        "&" => (6, 6),
        "<<" | ">>" => (7, 7),
        ".." => (9, 8),
        "+" | "-" => (10, 10),
        "*" | "/" | "//" | "%" => (11, 11),
        "^" => (14, 13),
        _ => return None,
    })
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_symbol(&self, symbol: &str) -> bool {
        matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol)
    }

    fn error(&self, message: impl Into<String>) -> ExpressionError {
        syntax_error(self.source, message)
    }

    fn unexpected(&self) -> ExpressionError {
        match self.peek() {
            Some(token) => self.error(format!("unexpected '{}'", token)),
            None => self.error("unexpected end of expression"),
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> ExpressionResult<()> {
        if self.at_symbol(symbol) {
            self.pos += 1;
            return Ok(());
        }
        match self.peek() {
            Some(token) => Err(self.error(format!("expected '{}' near '{}'", symbol, token))),
            None => Err(self.error(format!("expected '{}' at end of expression", symbol))),
        }
    }

    fn expect_name(&mut self) -> ExpressionResult<String> {
        match self.advance() {
            Some(Token::Name(name)) => Ok(name),
            Some(token) => Err(self.error(format!("expected a name near '{}'", token))),
            None => Err(self.error("expected a name at end of expression")),
        }
    }

    /// Binary operator at the cursor, with the number of tokens it spans
    fn binary_operator(&self) -> Option<(&'static str, usize)> {
        match self.peek()? {
            Token::Symbol(s) => binary_priority(s).map(|_| (*s, 1)),
            Token::Keyword(k @ ("and" | "or" | "in")) => Some((*k, 1)),
            Token::Keyword("not") if self.peek_at(1) == Some(&Token::Keyword("in")) => {
                Some(("not in", 2))
            }
            _ => None,
        }
    }

    /// Operators binding tighter than `limit`
    fn parse_expr(&mut self, limit: u8) -> ExpressionResult<Expr> {
        let unary = match self.peek() {
            Some(Token::Keyword("not")) => Some("not"),
            Some(Token::Symbol(op @ ("-" | "#" | "~"))) => Some(*op),
            _ => None,
        };
        let mut left = match unary {
            Some(op) => {
                self.pos += 1;
                Expr::Unary(op, Box::new(self.parse_expr(UNARY_PRIORITY)?))
            }
            None => self.parse_simple()?,
        };

        while let Some((op, width)) = self.binary_operator() {
            let key = if op == "not in" { "in" } else { op };
            let right_priority = match binary_priority(key) {
                Some((left_priority, right_priority)) if left_priority > limit => right_priority,
                _ => break,
            };
            self.pos += width;
            let right = self.parse_expr(right_priority)?;
            left = match op {
                "in" | "not in" => Expr::Contains {
                    needle: Box::new(left),
                    haystack: Box::new(right),
                    negated: op == "not in",
                },
                _ => Expr::Binary(Box::new(left), op, Box::new(right)),
            };
        }

        Ok(left)
    }

    fn parse_simple(&mut self) -> ExpressionResult<Expr> {
        match self.peek() {
            Some(Token::Keyword("nil")) => {
                self.pos += 1;
                Ok(Expr::Nil)
            }
            Some(Token::Keyword("true")) => {
                self.pos += 1;
                Ok(Expr::Bool(true))
            }
            Some(Token::Keyword("false")) => {
                self.pos += 1;
                Ok(Expr::Bool(false))
            }
            Some(Token::Number(raw)) => {
                let number = Expr::Number(raw.clone());
                self.pos += 1;
                Ok(number)
            }
            Some(Token::Str(raw)) => {
                let literal = Expr::Str(raw.clone());
                self.pos += 1;
                self.parse_suffixes(literal, true)
            }
            Some(Token::Symbol("{")) => {
                let table = self.parse_table()?;
                self.parse_suffixes(table, true)
            }
            Some(Token::Keyword("function")) => {
                Err(self.error("function literals are not supported in expressions"))
            }
            Some(Token::Symbol("...")) => Err(self.error("'...' is not supported in expressions")),
            _ => {
                let primary = self.parse_primary()?;
                self.parse_suffixes(primary, false)
            }
        }
    }

    fn parse_primary(&mut self) -> ExpressionResult<Expr> {
        match self.peek() {
            Some(Token::Name(name)) => {
                let name = Expr::Name(name.clone());
                self.pos += 1;
                Ok(name)
            }
            Some(Token::Symbol("(")) => {
                self.pos += 1;
                let inner = self.parse_expr(0)?;
                self.expect_symbol(")")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Member access and calls; a `literal` base only takes `.`, `[` and `:`
    fn parse_suffixes(&mut self, mut base: Expr, mut literal: bool) -> ExpressionResult<Expr> {
        loop {
            base = match self.peek() {
                Some(Token::Symbol(".")) => {
                    self.pos += 1;
                    Expr::Field(Box::new(base), self.expect_name()?)
                }
                Some(Token::Symbol("[")) => {
                    self.pos += 1;
                    let key = self.parse_expr(0)?;
                    self.expect_symbol("]")?;
                    Expr::Index(Box::new(base), Box::new(key))
                }
                Some(Token::Symbol(":")) => {
                    self.pos += 1;
                    let name = self.expect_name()?;
                    Expr::Method(Box::new(base), name, self.parse_args()?)
                }
                Some(Token::Symbol("(" | "{") | Token::Str(_)) if !literal => {
                    Expr::Call(Box::new(base), self.parse_args()?)
                }
                _ => return Ok(base),
            };
            literal = false;
        }
    }

    fn parse_args(&mut self) -> ExpressionResult<Vec<Expr>> {
        match self.peek() {
            Some(Token::Str(raw)) => {
                let arg = Expr::Str(raw.clone());
                self.pos += 1;
                Ok(vec![arg])
            }
            Some(Token::Symbol("{")) => Ok(vec![self.parse_table()?]),
            Some(Token::Symbol("(")) => {
                self.pos += 1;
                let mut args = Vec::new();
                if !self.at_symbol(")") {
                    args.push(self.parse_expr(0)?);
                    while self.at_symbol(",") {
                        self.pos += 1;
                        args.push(self.parse_expr(0)?);
                    }
                }
                self.expect_symbol(")")?;
                Ok(args)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_table(&mut self) -> ExpressionResult<Expr> {
        self.expect_symbol("{")?;
        let mut fields = Vec::new();

        while !self.at_symbol("}") {
            let field = match (self.peek(), self.peek_at(1)) {
                (Some(Token::Symbol("[")), _) => {
                    self.pos += 1;
                    let key = self.parse_expr(0)?;
                    self.expect_symbol("]")?;
                    self.expect_symbol("=")?;
                    TableField::Keyed(key, self.parse_expr(0)?)
                }
                (Some(Token::Name(name)), Some(Token::Symbol("="))) => {
                    let name = name.clone();
                    self.pos += 2;
                    TableField::Named(name, self.parse_expr(0)?)
                }
                (Some(Token::Str(raw)), Some(Token::Symbol(":"))) => {
                    let key = Expr::Str(raw.clone());
                    self.pos += 2;
                    TableField::Keyed(key, self.parse_expr(0)?)
                }
                _ => TableField::Positional(self.parse_expr(0)?),
            };
            fields.push(field);

            if self.at_symbol(",") || self.at_symbol(";") {
                self.pos += 1;
            } else {
                break;
            }
        }

        self.expect_symbol("}")?;
        Ok(Expr::Table(fields))
    }
}
