//! Tokenizer and parser for the infix surface syntax. Precedence, loosest
//! first: `= := $=` and `->` (right-associative), `? :`, `||`, `&&`,
//! comparisons, `+ -`, `* /`, unary `! -`, then call application.
//!
//! A `:` immediately followed by `(` opens a quote; the else-colon of a
//! ternary is written with surrounding whitespace.

use failure::Error;

use crate::ast::{Expr, Tag};
use crate::errors::ParseError;
use crate::values::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Num(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Let,
    Begin,
    End,
    If,
    Elseif,
    Else,
    Global,
    Assign,      // =
    FExprAssign, // :=
    MacroAssign, // $=
    Dollar,      // $
    QuoteOpen,   // :(
    Arrow,       // ->
    AndAnd,      // &&
    OrOr,        // ||
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    Question,
    Colon,
    Comma,
    Semi,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

/// parse a string of source text into a single expression; multiple
/// statements come back under a `Toplevel` head
pub fn parse(text: &str) -> Result<Expr, Error> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };

    let mut stmts = parser.statements(&[])?;
    if let Some(extra) = parser.peek() {
        return Err(ParseError::UnexpectedToken(format!("{:?}", extra)).into());
    }

    match stmts.len() {
        0 => Err(ParseError::Empty.into()),
        1 => Ok(stmts.remove(0)),
        _ => Ok(Expr::Node(Tag::Toplevel, stmts)),
    }
}

// {{{ tokenizer
/// split source text into tokens. Newlines separate statements only at
/// bracket depth zero, and only after a token that can end an expression,
/// so multi-line constructs keep flowing.
pub fn tokenize(text: &str) -> Result<Vec<Token>, Error> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            ' ' | '\t' | '\r' => i += 1,

            '\n' => {
                if depth == 0 && ends_expression(tokens.last()) {
                    tokens.push(Token::Semi);
                }
                i += 1;
            }

            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }

            '(' => {
                depth += 1;
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                depth += 1;
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                depth = depth.saturating_sub(1);
                tokens.push(Token::RBracket);
                i += 1;
            }

            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semi);
                i += 1;
            }
            '?' => {
                tokens.push(Token::Question);
                i += 1;
            }

            '"' => {
                let (string, consumed) = read_string(&chars[i + 1..])?;
                tokens.push(Token::Str(string));
                i += consumed + 1;
            }

            '0'..='9' => {
                let (number, consumed) = read_number(&chars[i..])?;
                tokens.push(Token::Num(number));
                i += consumed;
            }

            '=' => {
                if next == Some('=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    tokens.push(Token::Assign);
                    i += 1;
                }
            }
            '!' => {
                if next == Some('=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    tokens.push(Token::Bang);
                    i += 1;
                }
            }
            '<' => {
                if next == Some('=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if next == Some('=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '&' => {
                if next == Some('&') {
                    tokens.push(Token::AndAnd);
                    i += 2;
                } else {
                    return Err(ParseError::ErroneousToken("&".to_owned()).into());
                }
            }
            '|' => {
                if next == Some('|') {
                    tokens.push(Token::OrOr);
                    i += 2;
                } else {
                    return Err(ParseError::ErroneousToken("|".to_owned()).into());
                }
            }

            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                if next == Some('>') {
                    tokens.push(Token::Arrow);
                    i += 2;
                } else {
                    tokens.push(Token::Minus);
                    i += 1;
                }
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }

            '$' => {
                if next == Some('=') {
                    tokens.push(Token::MacroAssign);
                    i += 2;
                } else {
                    tokens.push(Token::Dollar);
                    i += 1;
                }
            }
            ':' => {
                if next == Some('=') {
                    tokens.push(Token::FExprAssign);
                    i += 2;
                } else if next == Some('(') {
                    depth += 1;
                    tokens.push(Token::QuoteOpen);
                    i += 2;
                } else {
                    tokens.push(Token::Colon);
                    i += 1;
                }
            }

            c if c.is_alphabetic() || c == '_' => {
                let (word, consumed) = read_ident(&chars[i..]);
                tokens.push(keyword_or_ident(word));
                i += consumed;
            }

            other => return Err(ParseError::ErroneousToken(other.to_string()).into()),
        }
    }

    Ok(tokens)
}

/// can this token be the last of a complete expression?
fn ends_expression(token: Option<&Token>) -> bool {
    match token {
        Some(Token::Num(_))
        | Some(Token::Str(_))
        | Some(Token::Ident(_))
        | Some(Token::True)
        | Some(Token::False)
        | Some(Token::End)
        | Some(Token::RParen)
        | Some(Token::RBracket) => true,
        _ => false,
    }
}

/// read a string body up to the closing quote; returns (string, chars
/// consumed including the close quote)
fn read_string(chars: &[char]) -> Result<(String, usize), Error> {
    let mut string = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '"' => return Ok((string, i + 1)),
            '\\' => {
                match chars.get(i + 1) {
                    Some('n') => string.push('\n'),
                    Some('t') => string.push('\t'),
                    Some('"') => string.push('"'),
                    Some('\\') => string.push('\\'),
                    Some(other) => {
                        string.push('\\');
                        string.push(*other);
                    }
                    None => return Err(ParseError::UnterminatedString.into()),
                }
                i += 2;
            }
            other => {
                string.push(other);
                i += 1;
            }
        }
    }

    Err(ParseError::UnterminatedString.into())
}

fn read_number(chars: &[char]) -> Result<(f64, usize), Error> {
    let mut i = 0;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if chars.get(i) == Some(&'.') && chars.get(i + 1).map_or(false, |c| c.is_ascii_digit()) {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }

    let text: String = chars[..i].iter().collect();
    match text.parse::<f64>() {
        Ok(number) => Ok((number, i)),
        Err(_) => Err(ParseError::ErroneousToken(text).into()),
    }
}

/// identifiers may carry trailing `!` (as in `push!`), unless the `!`
/// begins a `!=`
fn read_ident(chars: &[char]) -> (String, usize) {
    let mut i = 0;
    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    while chars.get(i) == Some(&'!') && chars.get(i + 1) != Some(&'=') {
        i += 1;
    }

    (chars[..i].iter().collect(), i)
}

fn keyword_or_ident(word: String) -> Token {
    match word.as_str() {
        "let" => Token::Let,
        "begin" => Token::Begin,
        "end" => Token::End,
        "if" => Token::If,
        "elseif" => Token::Elseif,
        "else" => Token::Else,
        "global" => Token::Global,
        "true" => Token::True,
        "false" => Token::False,
        _ => Token::Ident(word),
    }
}
// }}}

// {{{ parser
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), Error> {
        match self.bump() {
            Some(ref found) if *found == token => Ok(()),
            Some(found) => Err(ParseError::UnexpectedToken(format!(
                "{:?} (expected {:?})",
                found, token
            ))
            .into()),
            None => Err(ParseError::UnexpectedEof.into()),
        }
    }

    /// a `;`-separated statement run, stopping (without consuming) at any
    /// of `stops` or at the end of input
    fn statements(&mut self, stops: &[Token]) -> Result<Vec<Expr>, Error> {
        let mut stmts = Vec::new();

        loop {
            while self.eat(&Token::Semi) {}
            match self.peek() {
                None => break,
                Some(token) if stops.contains(token) => break,
                _ => {}
            }

            stmts.push(self.expr()?);

            match self.peek() {
                None => {}
                Some(Token::Semi) => {}
                Some(token) if stops.contains(token) => {}
                Some(token) => {
                    return Err(
                        ParseError::UnexpectedToken(format!("{:?}", token)).into()
                    );
                }
            }
        }

        Ok(stmts)
    }

    /// assignment level: `=`, `:=`, `$=` and `->`, all right-associative
    fn expr(&mut self) -> Result<Expr, Error> {
        let lhs = self.ternary()?;

        let tag = match self.peek() {
            Some(Token::Arrow) => Tag::Lambda,
            Some(Token::Assign) => Tag::Assign,
            Some(Token::FExprAssign) => Tag::FExprDef,
            Some(Token::MacroAssign) => Tag::MacroDef,
            _ => return Ok(lhs),
        };
        self.bump();

        let rhs = self.expr()?;
        Ok(Expr::Node(tag, vec![lhs, rhs]))
    }

    fn ternary(&mut self) -> Result<Expr, Error> {
        let cond = self.or_expr()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }

        let conseq = self.ternary()?;
        self.expect(Token::Colon)?;
        let alt = self.ternary()?;
        Ok(Expr::Node(Tag::If, vec![cond, conseq, alt]))
    }

    fn or_expr(&mut self) -> Result<Expr, Error> {
        let mut parts = vec![self.and_expr()?];
        while self.eat(&Token::OrOr) {
            parts.push(self.and_expr()?);
        }

        if parts.len() == 1 {
            Ok(parts.remove(0))
        } else {
            Ok(Expr::Node(Tag::OrOp, parts))
        }
    }

    fn and_expr(&mut self) -> Result<Expr, Error> {
        let mut parts = vec![self.comparison()?];
        while self.eat(&Token::AndAnd) {
            parts.push(self.comparison()?);
        }

        if parts.len() == 1 {
            Ok(parts.remove(0))
        } else {
            Ok(Expr::Node(Tag::And, parts))
        }
    }

    fn comparison(&mut self) -> Result<Expr, Error> {
        let lhs = self.additive()?;

        let op = match self.peek() {
            Some(Token::EqEq) => "==",
            Some(Token::NotEq) => "!=",
            Some(Token::Lt) => "<",
            Some(Token::Gt) => ">",
            Some(Token::Le) => "<=",
            Some(Token::Ge) => ">=",
            _ => return Ok(lhs),
        };
        self.bump();

        let rhs = self.additive()?;
        Ok(operator_call(op, lhs, rhs))
    }

    fn additive(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => "+",
                Some(Token::Minus) => "-",
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.multiplicative()?;
            lhs = operator_call(op, lhs, rhs);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => "*",
                Some(Token::Slash) => "/",
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.unary()?;
            lhs = operator_call(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, Error> {
        if self.eat(&Token::Bang) {
            let operand = self.unary()?;
            return Ok(Expr::Node(
                Tag::Call,
                vec![Expr::Sym("!".to_owned()), operand],
            ));
        }
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Node(
                Tag::Call,
                vec![Expr::Sym("-".to_owned()), operand],
            ));
        }

        self.postfix()
    }

    /// call application: `f(a, b)(c)` chains left
    fn postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.primary()?;

        while self.eat(&Token::LParen) {
            let mut args = vec![expr];
            args.extend(self.comma_list(&Token::RParen)?);
            self.expect(Token::RParen)?;
            expr = Expr::Node(Tag::Call, args);
        }

        Ok(expr)
    }

    fn comma_list(&mut self, close: &Token) -> Result<Vec<Expr>, Error> {
        let mut items = Vec::new();
        if self.peek() == Some(close) {
            return Ok(items);
        }

        loop {
            items.push(self.expr()?);
            if !self.eat(&Token::Comma) {
                return Ok(items);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, Error> {
        let token = match self.bump() {
            Some(token) => token,
            None => return Err(ParseError::UnexpectedEof.into()),
        };

        match token {
            Token::Num(n) => Ok(Expr::Num(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::True => Ok(Expr::Lit(Box::new(Value::Bool(true)))),
            Token::False => Ok(Expr::Lit(Box::new(Value::Bool(false)))),
            Token::Ident(name) => Ok(Expr::Sym(name)),

            Token::Dollar => match self.bump() {
                Some(Token::Ident(name)) => {
                    Ok(Expr::Node(Tag::Interpolate, vec![Expr::Sym(name)]))
                }
                Some(Token::LParen) => {
                    let inner = self.expr()?;
                    self.expect(Token::RParen)?;
                    Ok(Expr::Node(Tag::Interpolate, vec![inner]))
                }
                Some(other) => {
                    Err(ParseError::UnexpectedToken(format!("{:?}", other)).into())
                }
                None => Err(ParseError::UnexpectedEof.into()),
            },

            Token::QuoteOpen => {
                let stmts = self.statements(&[Token::RParen])?;
                self.expect(Token::RParen)?;
                Ok(Expr::Node(Tag::Quote, stmts))
            }

            Token::LParen => {
                if self.eat(&Token::RParen) {
                    // the empty tuple: a zero-parameter lambda head
                    return Ok(Expr::Node(Tag::Other("tuple".to_owned()), vec![]));
                }

                let first = self.expr()?;
                if self.eat(&Token::Comma) {
                    let mut items = vec![first];
                    items.extend(self.comma_list(&Token::RParen)?);
                    self.expect(Token::RParen)?;
                    return Ok(Expr::Node(Tag::Other("tuple".to_owned()), items));
                }

                self.expect(Token::RParen)?;
                Ok(first)
            }

            Token::LBracket => {
                let items = self.comma_list(&Token::RBracket)?;
                self.expect(Token::RBracket)?;
                Ok(Expr::Node(Tag::Other("vect".to_owned()), items))
            }

            Token::Let => self.let_expr(),
            Token::Begin => {
                let stmts = self.statements(&[Token::End])?;
                self.expect(Token::End)?;
                Ok(Expr::Node(Tag::Block, stmts))
            }
            Token::If => self.if_chain(Tag::If),
            Token::Global => {
                let mut items = vec![self.expr()?];
                while self.eat(&Token::Comma) {
                    items.push(self.expr()?);
                }
                Ok(Expr::Node(Tag::Global, items))
            }

            other => Err(ParseError::UnexpectedToken(format!("{:?}", other)).into()),
        }
    }

    /// `let bind, bind; stmts… end`
    fn let_expr(&mut self) -> Result<Expr, Error> {
        let mut bindings = Vec::new();
        if self.peek() != Some(&Token::Semi) {
            bindings.push(self.expr()?);
            while self.eat(&Token::Comma) {
                bindings.push(self.expr()?);
            }
        }

        let body = self.statements(&[Token::End])?;
        self.expect(Token::End)?;

        Ok(Expr::Node(
            Tag::Let,
            vec![
                Expr::Node(Tag::Block, bindings),
                Expr::Node(Tag::Block, body),
            ],
        ))
    }

    /// `if c; … elseif c2; … else; … end`; elseif arms nest in the
    /// alternative slot
    fn if_chain(&mut self, head: Tag) -> Result<Expr, Error> {
        let cond = self.expr()?;
        let conseq = self.statements(&[Token::Elseif, Token::Else, Token::End])?;
        let mut args = vec![cond, Expr::Node(Tag::Block, conseq)];

        if self.eat(&Token::Elseif) {
            args.push(self.if_chain(Tag::Elseif)?);
        } else if self.eat(&Token::Else) {
            let alt = self.statements(&[Token::End])?;
            args.push(Expr::Node(Tag::Block, alt));
            self.expect(Token::End)?;
        } else {
            self.expect(Token::End)?;
        }

        Ok(Expr::Node(head, args))
    }
}

fn operator_call(op: &str, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Node(Tag::Call, vec![Expr::Sym(op.to_owned()), lhs, rhs])
}
// }}}

// {{{ tests
#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Expr {
        Expr::Sym(s.to_owned())
    }

    #[test]
    fn tokenizes_bang_idents_and_not_equals() {
        let tokens = tokenize("push!(x) != y").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("push!".into()),
                Token::LParen,
                Token::Ident("x".into()),
                Token::RParen,
                Token::NotEq,
                Token::Ident("y".into()),
            ]
        );
    }

    #[test]
    fn tokenizes_the_assignment_family() {
        assert_eq!(
            tokenize("= := $= $x :(").unwrap(),
            vec![
                Token::Assign,
                Token::FExprAssign,
                Token::MacroAssign,
                Token::Dollar,
                Token::Ident("x".into()),
                Token::QuoteOpen,
            ]
        );
    }

    #[test]
    fn newlines_separate_only_complete_statements() {
        // the trailing `=` keeps the statement open across the newline
        let tokens = tokenize("x =\n1\ny").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("x".into()),
                Token::Assign,
                Token::Num(1.0),
                Token::Semi,
                Token::Ident("y".into()),
            ]
        );
    }

    #[test]
    fn parses_operator_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        let product = Expr::Node(
            Tag::Call,
            vec![sym("*"), Expr::Num(2.0), Expr::Num(3.0)],
        );
        assert_eq!(
            expr,
            Expr::Node(Tag::Call, vec![sym("+"), Expr::Num(1.0), product])
        );
    }

    #[test]
    fn parses_definitions_right_associatively() {
        let expr = parse("f(x) = x + 1").unwrap();
        match expr {
            Expr::Node(Tag::Assign, args) => {
                assert_eq!(
                    args[0],
                    Expr::Node(Tag::Call, vec![sym("f"), sym("x")])
                );
            }
            other => panic!("expected an assignment, got {:?}", other),
        }
    }

    #[test]
    fn parses_zero_parameter_lambdas() {
        let expr = parse("() -> 1").unwrap();
        assert_eq!(
            expr,
            Expr::Node(
                Tag::Lambda,
                vec![Expr::Node(Tag::Other("tuple".into()), vec![]), Expr::Num(1.0)]
            )
        );
    }

    #[test]
    fn lambda_bodies_extend_through_assignments() {
        let expr = parse("() -> x = x + 1").unwrap();
        match expr {
            Expr::Node(Tag::Lambda, args) => match &args[1] {
                Expr::Node(Tag::Assign, _) => {}
                other => panic!("expected an assignment body, got {:?}", other),
            },
            other => panic!("expected a lambda, got {:?}", other),
        }
    }

    #[test]
    fn parses_let_with_bindings_and_body() {
        let expr = parse("let x = 0; x end").unwrap();
        match expr {
            Expr::Node(Tag::Let, args) => {
                assert_eq!(args.len(), 2);
                match &args[0] {
                    Expr::Node(Tag::Block, binds) => assert_eq!(binds.len(), 1),
                    other => panic!("expected a bindings block, got {:?}", other),
                }
            }
            other => panic!("expected a let, got {:?}", other),
        }
    }

    #[test]
    fn parses_ternaries_and_quotes() {
        let expr = parse("x > 0 ? 1 : 2").unwrap();
        match expr {
            Expr::Node(Tag::If, args) => assert_eq!(args.len(), 3),
            other => panic!("expected an if, got {:?}", other),
        }

        let quoted = parse(":($x)").unwrap();
        assert_eq!(
            quoted,
            Expr::Node(
                Tag::Quote,
                vec![Expr::Node(Tag::Interpolate, vec![sym("x")])]
            )
        );
    }

    #[test]
    fn parses_if_elseif_else_chains() {
        let expr = parse("if a; 1; elseif b; 2; else; 3; end").unwrap();
        match expr {
            Expr::Node(Tag::If, args) => {
                assert_eq!(args.len(), 3);
                match &args[2] {
                    Expr::Node(Tag::Elseif, inner) => assert_eq!(inner.len(), 3),
                    other => panic!("expected an elseif arm, got {:?}", other),
                }
            }
            other => panic!("expected an if, got {:?}", other),
        }
    }

    #[test]
    fn parses_global_declarations() {
        let expr = parse("global x = 1").unwrap();
        match expr {
            Expr::Node(Tag::Global, args) => match &args[0] {
                Expr::Node(Tag::Assign, _) => {}
                other => panic!("expected an assignment, got {:?}", other),
            },
            other => panic!("expected a global, got {:?}", other),
        }
    }

    #[test]
    fn parses_vector_literals() {
        let expr = parse("[1, 2]").unwrap();
        assert_eq!(
            expr,
            Expr::Node(
                Tag::Other("vect".into()),
                vec![Expr::Num(1.0), Expr::Num(2.0)]
            )
        );
    }

    #[test]
    fn multiple_statements_build_a_toplevel() {
        let expr = parse("x = 1; x").unwrap();
        match expr {
            Expr::Node(Tag::Toplevel, args) => assert_eq!(args.len(), 2),
            other => panic!("expected a toplevel, got {:?}", other),
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse("").is_err());
        assert!(parse("  \n# comment only\n").is_err());
    }

    #[test]
    fn strings_unescape() {
        assert_eq!(
            parse(r#""a\"b\n""#).unwrap(),
            Expr::Str("a\"b\n".to_owned())
        );
    }
}
// }}}
