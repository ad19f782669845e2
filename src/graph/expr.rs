//! Expressions in one variable `x`, parsed once and evaluated many times.
//!
//! Accepts the notation models tend to emit for plots: Python/numpy style
//! (`x**2`, `np.sin(x)`, `np.pi`) as well as `^` for powers. Implicit
//! multiplication (`2x`) is rejected.

use std::f64::consts;
use thiserror::Error;

const NAMESPACE_PREFIXES: [&str; 3] = ["numpy.", "np.", "math."];

/// Bound on parser recursion and on the depth of the built tree.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected {found} at {pos}")]
    UnexpectedToken { found: String, pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("{name} takes {expected} argument(s), got {got}")]
    Arity { name: String, expected: &'static str, got: usize },
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("Invalid function: {0}")]
    InvalidFunction(#[from] ExprError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Sin, Cos, Tan, Cot, Sec, Csc,
    Asin, Acos, Atan,
    Sinh, Cosh, Tanh,
    Asinh, Acosh, Atanh,
    Exp, Ln, Log10, Log2, Sqrt, Cbrt,
    Abs, Floor, Ceil, Sign,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        let f = match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "cot" => Func::Cot,
            "sec" => Func::Sec,
            "csc" => Func::Csc,
            "asin" | "arcsin" => Func::Asin,
            "acos" | "arccos" => Func::Acos,
            "atan" | "arctan" => Func::Atan,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            "tanh" => Func::Tanh,
            "asinh" | "arcsinh" => Func::Asinh,
            "acosh" | "arccosh" => Func::Acosh,
            "atanh" | "arctanh" => Func::Atanh,
            "exp" => Func::Exp,
            "log" | "ln" => Func::Ln,
            "log10" => Func::Log10,
            "log2" => Func::Log2,
            "sqrt" => Func::Sqrt,
            "cbrt" => Func::Cbrt,
            "abs" | "Abs" | "fabs" => Func::Abs,
            "floor" => Func::Floor,
            "ceil" | "ceiling" => Func::Ceil,
            "sign" => Func::Sign,
            _ => {
                return None;
            }
        };
        Some(f)
    }

    fn apply(self, v: f64) -> f64 {
        match self {
            Func::Sin => v.sin(),
            Func::Cos => v.cos(),
            Func::Tan => v.tan(),
            Func::Cot => 1.0 / v.tan(),
            Func::Sec => 1.0 / v.cos(),
            Func::Csc => 1.0 / v.sin(),
            Func::Asin => v.asin(),
            Func::Acos => v.acos(),
            Func::Atan => v.atan(),
            Func::Sinh => v.sinh(),
            Func::Cosh => v.cosh(),
            Func::Tanh => v.tanh(),
            Func::Asinh => v.asinh(),
            Func::Acosh => v.acosh(),
            Func::Atanh => v.atanh(),
            Func::Exp => v.exp(),
            Func::Ln => v.ln(),
            Func::Log10 => v.log10(),
            Func::Log2 => v.log2(),
            Func::Sqrt => v.sqrt(),
            Func::Cbrt => v.cbrt(),
            Func::Abs => v.abs(),
            Func::Floor => v.floor(),
            Func::Ceil => v.ceil(),
            Func::Sign => {
                if v.is_nan() || v == 0.0 { v } else { v.signum() }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Log,
    Atan2,
    Min,
    Max,
}

impl BinOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Pow => a.powf(b),
            BinOp::Log => a.ln() / b.ln(),
            BinOp::Atan2 => a.atan2(b),
            BinOp::Min => a.min(b),
            BinOp::Max => a.max(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Num(f64),
    X,
    Neg(Box<Node>),
    Call(Func, Box<Node>),
    Bin(BinOp, Box<Node>, Box<Node>),
}

impl Node {
    fn eval(&self, x: f64) -> f64 {
        match self {
            Node::Num(v) => *v,
            Node::X => x,
            Node::Neg(inner) => -inner.eval(x),
            Node::Call(f, arg) => f.apply(arg.eval(x)),
            Node::Bin(op, a, b) => op.apply(a.eval(x), b.eval(x)),
        }
    }
}

/// A parsed function of `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    source: String,
    root: Node,
}

impl Function {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Out-of-domain inputs give NaN, never an error.
    pub fn eval(&self, x: f64) -> f64 {
        self.root.eval(x)
    }

    pub fn eval_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.root.eval(x)).collect()
    }
}

/// Parses `expression` after stripping `np.`-style namespace prefixes.
pub fn evaluate_function(expression: &str) -> Result<Function, EvalError> {
    let cleaned = strip_namespaces(expression);
    let tokens = tokenize(&cleaned)?;
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let root = parser.expression()?;
    if let Some((tok, pos)) = parser.tokens.get(parser.pos) {
        return Err(ExprError::UnexpectedToken { found: tok.describe(), pos: *pos }.into());
    }
    Ok(Function { source: expression.to_string(), root })
}

pub fn strip_namespaces(expression: &str) -> String {
    NAMESPACE_PREFIXES.iter().fold(expression.to_string(), |acc, prefix| acc.replace(prefix, ""))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Num(v) => format!("number {}", v),
            Token::Ident(name) => format!("name '{}'", name),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::Pow => "'**'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::Comma => "','".into(),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() {
                    let ch = chars[i].1;
                    let prev = if i > start { Some(chars[i - 1].1) } else { None };
                    let signed_exp = (ch == '+' || ch == '-') && matches!(prev, Some('e' | 'E'));
                    if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || signed_exp {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let end = chars.get(i).map(|(p, _)| *p).unwrap_or(src.len());
                let raw = &src[pos..end];
                let value = raw
                    .parse::<f64>()
                    .map_err(|_| ExprError::InvalidNumber(raw.to_string()))?;
                tokens.push((Token::Num(value), pos));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().map(|(_, c)| *c).collect();
                tokens.push((Token::Ident(name), pos));
            }
            '*' if next == Some('*') => {
                tokens.push((Token::Pow, pos));
                i += 2;
            }
            _ => {
                let tok = match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '^' => Token::Pow,
                    '(' | '[' => Token::LParen,
                    ')' | ']' => Token::RParen,
                    ',' => Token::Comma,
                    other => {
                        return Err(ExprError::UnexpectedChar { ch: other, pos });
                    }
                };
                tokens.push((tok, pos));
                i += 1;
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Result<(Token, usize), ExprError> {
        let item = self.tokens.get(self.pos).cloned().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(item)
    }

    // Every tree level costs one step, so evaluation and drop stay shallow too.
    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        let (tok, pos) = self.next()?;
        if tok == expected {
            Ok(())
        } else {
            Err(ExprError::UnexpectedToken { found: tok.describe(), pos })
        }
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Node, ExprError> {
        let mut node = self.term()?;
        let base = self.depth;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => {
                    self.depth = base;
                    return Ok(node);
                }
            };
            self.pos += 1;
            self.descend()?;
            node = Node::Bin(op, Box::new(node), Box::new(self.term()?));
        }
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Node, ExprError> {
        let mut node = self.unary()?;
        let base = self.depth;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => {
                    self.depth = base;
                    return Ok(node);
                }
            };
            self.pos += 1;
            self.descend()?;
            node = Node::Bin(op, Box::new(node), Box::new(self.unary()?));
        }
    }

    // unary := ('+' | '-') unary | power
    fn unary(&mut self) -> Result<Node, ExprError> {
        self.descend()?;
        let node = match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Node::Neg(Box::new(self.unary()?))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()?
            }
            _ => self.power()?,
        };
        self.depth -= 1;
        Ok(node)
    }

    // power := primary ('**' unary)?, so -x**2 is -(x**2) and 2**-1 works
    fn power(&mut self) -> Result<Node, ExprError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Pow) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Node::Bin(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node, ExprError> {
        let (tok, pos) = self.next()?;
        match tok {
            Token::Num(v) => Ok(Node::Num(v)),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let args = self.arguments()?;
                    call(&name, args)
                } else {
                    symbol(&name)
                }
            }
            other => Err(ExprError::UnexpectedToken { found: other.describe(), pos }),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Node>, ExprError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            let (tok, pos) = self.next()?;
            match tok {
                Token::Comma => {}
                Token::RParen => {
                    return Ok(args);
                }
                other => {
                    return Err(ExprError::UnexpectedToken { found: other.describe(), pos });
                }
            }
        }
    }
}

fn symbol(name: &str) -> Result<Node, ExprError> {
    match name {
        "x" => Ok(Node::X),
        "pi" | "PI" => Ok(Node::Num(consts::PI)),
        "e" | "E" => Ok(Node::Num(consts::E)),
        "tau" => Ok(Node::Num(consts::TAU)),
        "inf" | "oo" => Ok(Node::Num(f64::INFINITY)),
        _ => Err(ExprError::UnknownSymbol(name.to_string())),
    }
}

fn call(name: &str, mut args: Vec<Node>) -> Result<Node, ExprError> {
    let binary = match name {
        "log" if args.len() == 2 => Some(BinOp::Log),
        "atan2" | "arctan2" => Some(BinOp::Atan2),
        "pow" | "power" => Some(BinOp::Pow),
        "Min" | "min" | "minimum" => Some(BinOp::Min),
        "Max" | "max" | "maximum" => Some(BinOp::Max),
        _ => None,
    };

    if let Some(op) = binary {
        if args.len() != 2 {
            return Err(ExprError::Arity { name: name.to_string(), expected: "2", got: args.len() });
        }
        let b = args.pop().ok_or(ExprError::UnexpectedEnd)?;
        let a = args.pop().ok_or(ExprError::UnexpectedEnd)?;
        return Ok(Node::Bin(op, Box::new(a), Box::new(b)));
    }

    let func = Func::lookup(name).ok_or_else(|| ExprError::UnknownFunction(name.to_string()))?;
    if args.len() != 1 {
        return Err(ExprError::Arity { name: name.to_string(), expected: "1", got: args.len() });
    }
    let arg = args.pop().ok_or(ExprError::UnexpectedEnd)?;
    Ok(Node::Call(func, Box::new(arg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(expr: &str, x: f64) -> f64 {
        evaluate_function(expr).unwrap().eval(x)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn numpy_prefix_is_stripped() {
        assert!(close(at("np.sin(x)", 0.0), 0.0));
        assert!(close(at("np.cos(np.pi * x)", 1.0), -1.0));
        assert!(close(at("numpy.exp(x) + math.sqrt(4)", 0.0), 3.0));
    }

    #[test]
    fn dangling_operator_is_invalid() {
        let err = evaluate_function("x^").unwrap_err();
        assert_eq!(err, EvalError::InvalidFunction(ExprError::UnexpectedEnd));
        assert!(err.to_string().starts_with("Invalid function:"));
    }

    #[test]
    fn precedence_and_associativity() {
        assert!(close(at("x**2", 3.0), 9.0));
        assert!(close(at("x^2", -3.0), 9.0));
        assert!(close(at("-x**2", 3.0), -9.0));
        assert!(close(at("2**3**2", 0.0), 512.0));
        assert!(close(at("2**-1", 0.0), 0.5));
        assert!(close(at("1 - 2 - 3", 0.0), -4.0));
        assert!(close(at("8 / 4 / 2", 0.0), 1.0));
        assert!(close(at("2 + 3 * x", 2.0), 8.0));
        assert!(close(at("(2 + 3) * x", 2.0), 10.0));
        assert!(close(at("1.5e1 + .5", 0.0), 15.5));
    }

    #[test]
    fn functions_and_constants() {
        assert!(close(at("log(e)", 0.0), 1.0));
        assert!(close(at("log(8, 2)", 0.0), 3.0));
        assert!(close(at("Abs(x)", -2.0), 2.0));
        assert!(close(at("Max(x, 1)", 0.0), 1.0));
        assert!(close(at("arctan(1) * 4", 0.0), std::f64::consts::PI));
        assert!(close(at("sign(x)", -5.0), -1.0));
    }

    #[test]
    fn out_of_domain_is_nan() {
        assert!(at("sqrt(x)", -1.0).is_nan());
        assert!(at("log(x)", -1.0).is_nan());
    }

    #[test]
    fn eval_many_matches_eval() {
        let f = evaluate_function("x**2 - 1").unwrap();
        assert_eq!(f.eval_many(&[-1.0, 0.0, 2.0]), vec![0.0, -1.0, 3.0]);
        assert_eq!(f.source(), "x**2 - 1");
    }

    #[test]
    fn malformed_inputs() {
        assert!(matches!(
            evaluate_function("2x"),
            Err(EvalError::InvalidFunction(ExprError::UnexpectedToken { .. }))
        ));
        assert!(matches!(
            evaluate_function("y + 1"),
            Err(EvalError::InvalidFunction(ExprError::UnknownSymbol(s))) if s == "y"
        ));
        assert!(matches!(
            evaluate_function("foo(x)"),
            Err(EvalError::InvalidFunction(ExprError::UnknownFunction(_)))
        ));
        assert!(matches!(
            evaluate_function("sin(x, 2)"),
            Err(EvalError::InvalidFunction(ExprError::Arity { .. }))
        ));
        assert!(matches!(
            evaluate_function("x $ 2"),
            Err(EvalError::InvalidFunction(ExprError::UnexpectedChar { ch: '$', .. }))
        ));
        assert!(evaluate_function("(x + 1").is_err());
        assert!(evaluate_function("").is_err());
    }

    #[test]
    fn deep_nesting_is_rejected_not_overflowed() {
        let deep = 200_000;
        let cases = [
            format!("{}x{}", "(".repeat(deep), ")".repeat(deep)),
            format!("{}x", "-".repeat(deep)),
            format!("x{}", "**x".repeat(deep)),
            format!("{}x{}", "sin(".repeat(deep), ")".repeat(deep)),
            vec!["x"; deep].join(" + "),
            vec!["x"; deep].join(" * "),
        ];
        for case in &cases {
            assert_eq!(
                evaluate_function(case).unwrap_err(),
                EvalError::InvalidFunction(ExprError::TooDeep(MAX_DEPTH))
            );
        }
    }

    #[test]
    fn moderate_nesting_still_parses() {
        let nested = format!("{}x{}", "(".repeat(50), ")".repeat(50));
        assert!(close(at(&nested, 3.0), 3.0));
        let sum = vec!["x"; 100].join(" + ");
        assert!(close(at(&sum, 1.0), 100.0));
    }
}
