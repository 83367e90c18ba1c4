//! Tokenizer and recursive-descent parser for the expression language.

use serde_json::Value;

use crate::error::ParseError;
use crate::types::number_value;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Literal(Value),
    /// `$`: the inbound event.
    Root,
    /// `$name` that is not a function call. Always evaluates to undefined.
    Variable(String),
    Field {
        target: Box<Node>,
        name: String,
    },
    Index {
        target: Box<Node>,
        index: i64,
    },
    Negate(Box<Node>),
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Condition {
        test: Box<Node>,
        then: Box<Node>,
        otherwise: Option<Box<Node>>,
    },
    Call {
        function: Function,
        arg: Box<Node>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Concat,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Concat => "&",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Built-in functions. All take exactly one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    FlowContext,
    GlobalContext,
    Env,
    Number,
    String,
    Boolean,
    Not,
    Abs,
    Round,
    Floor,
    Ceil,
    Exists,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "flowContext" => Self::FlowContext,
            "globalContext" => Self::GlobalContext,
            "env" => Self::Env,
            "number" => Self::Number,
            "string" => Self::String,
            "boolean" => Self::Boolean,
            "not" => Self::Not,
            "abs" => Self::Abs,
            "round" => Self::Round,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "exists" => Self::Exists,
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Name(String),
    Variable(String),
    Op(&'static str),
    End,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    position: usize,
}

/// Operators, longest first so that `<=` wins over `<`.
const OPERATORS: &[&str] = &[
    "!=", "<=", ">=", "+", "-", "*", "/", "%", "&", "=", "<", ">", ".", ",", "(", ")", "[", "]",
    "?", ":",
];

fn syntax_error(position: usize, message: impl Into<String>) -> ParseError {
    ParseError::Expression {
        position,
        message: message.into(),
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        let start = pos;

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        let token = if c.is_ascii_digit() {
            while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                // A second '.' or '.' followed by a name is a path step, not a fraction.
                if chars[pos] == '.' && !chars.get(pos + 1).is_some_and(char::is_ascii_digit) {
                    break;
                }
                pos += 1;
            }
            if pos < chars.len() && matches!(chars[pos], 'e' | 'E') {
                let mut exp = pos + 1;
                if chars.get(exp).is_some_and(|c| matches!(*c, '+' | '-')) {
                    exp += 1;
                }
                if chars.get(exp).is_some_and(char::is_ascii_digit) {
                    pos = exp;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
            }
            let text: String = chars[start..pos].iter().collect();
            let n = text
                .parse::<f64>()
                .map_err(|_| syntax_error(start, format!("Invalid number {text}")))?;
            Token::Number(n)
        } else if c == '"' || c == '\'' {
            pos += 1;
            let mut text = String::new();
            loop {
                match chars.get(pos) {
                    None => return Err(syntax_error(start, "Unterminated string literal")),
                    Some('\\') => {
                        let escaped = match chars.get(pos + 1) {
                            Some('n') => '\n',
                            Some('t') => '\t',
                            Some('r') => '\r',
                            Some(&other) => other,
                            None => return Err(syntax_error(start, "Unterminated string literal")),
                        };
                        text.push(escaped);
                        pos += 2;
                    }
                    Some(&q) if q == c => {
                        pos += 1;
                        break;
                    }
                    Some(&other) => {
                        text.push(other);
                        pos += 1;
                    }
                }
            }
            Token::Str(text)
        } else if c == '`' {
            pos += 1;
            let name_start = pos;
            while pos < chars.len() && chars[pos] != '`' {
                pos += 1;
            }
            if pos == chars.len() {
                return Err(syntax_error(start, "Unterminated quoted name"));
            }
            let name: String = chars[name_start..pos].iter().collect();
            pos += 1;
            Token::Name(name)
        } else if c == '$' {
            pos += 1;
            let name_start = pos;
            while pos < chars.len() && is_name_char(chars[pos]) {
                pos += 1;
            }
            Token::Variable(chars[name_start..pos].iter().collect())
        } else if is_name_start(c) {
            while pos < chars.len() && is_name_char(chars[pos]) {
                pos += 1;
            }
            Token::Name(chars[start..pos].iter().collect())
        } else {
            let op = OPERATORS
                .iter()
                .find(|op| {
                    op.chars()
                        .enumerate()
                        .all(|(i, oc)| chars.get(start + i) == Some(&oc))
                })
                .ok_or_else(|| syntax_error(start, format!("Unexpected character '{c}'")))?;
            pos += op.chars().count();
            Token::Op(*op)
        };

        tokens.push(Spanned {
            token,
            position: start,
        });
    }

    tokens.push(Spanned {
        token: Token::End,
        position: chars.len(),
    });
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse `source` into an expression tree.
pub(crate) fn parse(source: &str) -> Result<Node, ParseError> {
    let tokens = tokenize(source)?;
    if tokens.len() == 1 {
        return Err(syntax_error(0, "Empty expression"));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let node = parser.condition()?;
    match parser.peek() {
        Token::End => Ok(node),
        other => Err(syntax_error(
            parser.position(),
            format!("Unexpected token {}", describe(other)),
        )),
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => n.to_string(),
        Token::Str(s) => format!("\"{s}\""),
        Token::Name(n) => n.clone(),
        Token::Variable(v) => format!("${v}"),
        Token::Op(op) => format!("'{op}'"),
        Token::End => "end of expression".to_string(),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn position(&self) -> usize {
        self.tokens[self.pos].position
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if !matches!(token, Token::End) {
            self.pos += 1;
        }
        token
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Token::Op(o) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Token::Name(n) if n == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), ParseError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(syntax_error(
                self.position(),
                format!("Expected '{op}' but found {}", describe(self.peek())),
            ))
        }
    }

    fn condition(&mut self) -> Result<Node, ParseError> {
        let test = self.or()?;
        if !self.eat_op("?") {
            return Ok(test);
        }
        let then = self.condition()?;
        let otherwise = if self.eat_op(":") {
            Some(Box::new(self.condition()?))
        } else {
            None
        };
        Ok(Node::Condition {
            test: Box::new(test),
            then: Box::new(then),
            otherwise,
        })
    }

    fn or(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.and()?;
        while self.eat_keyword("or") {
            let rhs = self.and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.comparison()?;
        while self.eat_keyword("and") {
            let rhs = self.comparison()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Token::Op("=") => BinaryOp::Eq,
                Token::Op("!=") => BinaryOp::NotEq,
                Token::Op("<") => BinaryOp::Lt,
                Token::Op("<=") => BinaryOp::Le,
                Token::Op(">") => BinaryOp::Gt,
                Token::Op(">=") => BinaryOp::Ge,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.additive()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn additive(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Op("+") => BinaryOp::Add,
                Token::Op("-") => BinaryOp::Sub,
                Token::Op("&") => BinaryOp::Concat,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn multiplicative(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Op("*") => BinaryOp::Mul,
                Token::Op("/") => BinaryOp::Div,
                Token::Op("%") => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Node, ParseError> {
        if self.eat_op("-") {
            return Ok(Node::Negate(Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Node, ParseError> {
        let mut node = self.primary()?;
        loop {
            if self.eat_op(".") {
                let position = self.position();
                match self.advance() {
                    Token::Name(name) => {
                        node = Node::Field {
                            target: Box::new(node),
                            name,
                        }
                    }
                    other => {
                        return Err(syntax_error(
                            position,
                            format!("Expected a field name but found {}", describe(&other)),
                        ))
                    }
                }
            } else if self.eat_op("[") {
                let position = self.position();
                let negative = self.eat_op("-");
                let index = match self.advance() {
                    Token::Number(n) if n.fract() == 0.0 => n as i64,
                    other => {
                        return Err(syntax_error(
                            position,
                            format!("Expected an integer index but found {}", describe(&other)),
                        ))
                    }
                };
                self.expect_op("]")?;
                node = Node::Index {
                    target: Box::new(node),
                    index: if negative { -index } else { index },
                };
            } else {
                return Ok(node);
            }
        }
    }

    fn primary(&mut self) -> Result<Node, ParseError> {
        let position = self.position();
        match self.advance() {
            Token::Number(n) => Ok(Node::Literal(
                number_value(n).ok_or_else(|| syntax_error(position, "Number out of range"))?,
            )),
            Token::Str(s) => Ok(Node::Literal(Value::String(s))),
            Token::Name(name) => Ok(match name.as_str() {
                "true" => Node::Literal(Value::Bool(true)),
                "false" => Node::Literal(Value::Bool(false)),
                "null" => Node::Literal(Value::Null),
                _ => Node::Field {
                    target: Box::new(Node::Root),
                    name,
                },
            }),
            Token::Variable(name) if name.is_empty() => Ok(Node::Root),
            Token::Variable(name) => {
                if !self.eat_op("(") {
                    return Ok(Node::Variable(name));
                }
                let function = Function::from_name(&name).ok_or_else(|| {
                    syntax_error(position, format!("Unknown function ${name}"))
                })?;
                let arg = self.condition()?;
                self.expect_op(")")?;
                Ok(Node::Call {
                    function,
                    arg: Box::new(arg),
                })
            }
            Token::Op("(") => {
                let inner = self.condition()?;
                self.expect_op(")")?;
                Ok(inner)
            }
            other => Err(syntax_error(
                position,
                format!("Unexpected token {}", describe(&other)),
            )),
        }
    }
}

fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Node {
    Node::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
