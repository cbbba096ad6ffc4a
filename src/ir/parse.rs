//! Parser for the textual IR printed by `ir::format`.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

use crate::ir::builder::FunctionBuilder;
use crate::ir::types::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar { ch: char, line: usize },

    #[error("line {line}: invalid number literal '{text}'")]
    InvalidNumber { text: String, line: usize },

    #[error("line {line}: expected {expected}, found {found}")]
    Expected {
        expected: String,
        found: String,
        line: usize,
    },

    #[error("line {line}: unknown type '{name}'")]
    UnknownType { name: String, line: usize },

    #[error("line {line}: unknown instruction '{name}'")]
    UnknownInstruction { name: String, line: usize },

    #[error("line {line}: instruction '{name}' must define a result")]
    MissingResult { name: String, line: usize },

    #[error("line {line}: instruction '{name}' does not define a result")]
    UnexpectedResult { name: String, line: usize },

    #[error("line {line}: value {value} is defined more than once")]
    Redefined { value: ValueId, line: usize },

    #[error("line {line}: block {block} is defined more than once")]
    DuplicateBlock { block: BlockId, line: usize },

    #[error("line {line}: function '{func}' has no blocks")]
    EmptyFunction { func: String, line: usize },

    #[error("line {line}: signature of '{func}' does not match its entry block parameters")]
    SignatureMismatch { func: String, line: usize },
}

/// Parses one or more functions.
pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    let mut funcs = Vec::new();
    while !parser.at_eof() {
        funcs.push(parser.parse_function()?);
    }
    Ok(Module { funcs })
}

/// Parses exactly one function.
pub fn parse_func(source: &str) -> Result<Function, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    let func = parser.parse_function()?;
    if !parser.at_eof() {
        return Err(parser.expected("end of input"));
    }
    Ok(func)
}

// ----------- Lexer -----------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Value(u32),
    Global(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Eq,
    Arrow,
    Lt,
    Gt,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "'{}'", name),
            Token::Value(id) => write!(f, "'%v{}'", id),
            Token::Global(name) => write!(f, "'@{}'", name),
            Token::Int(value) => write!(f, "'{}'", value),
            Token::Float(value) => write!(f, "'{:?}'", value),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::Comma => write!(f, "','"),
            Token::Colon => write!(f, "':'"),
            Token::Eq => write!(f, "'='"),
            Token::Arrow => write!(f, "'->'"),
            Token::Lt => write!(f, "'<'"),
            Token::Gt => write!(f, "'>'"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

struct Lexer<'a> {
    source: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            source: source.chars().peekable(),
            line: 1,
        }
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let line = self.line;
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push((token, line));
            if done {
                return Ok(tokens);
            }
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.next();
        if ch == Some('\n') {
            self.line += 1;
        }
        ch
    }

    fn skip_trivia(&mut self) {
        loop {
            while let Some(&ch) = self.source.peek()
                && ch.is_whitespace()
            {
                self.advance();
            }

            // `//` runs to end of line; a lone '/' is left for next_token to reject.
            let mut lookahead = self.source.clone();
            if lookahead.next() == Some('/') && lookahead.next() == Some('/') {
                while let Some(&ch) = self.source.peek()
                    && ch != '\n'
                {
                    self.advance();
                }
            } else {
                return;
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.source.peek()
            && pred(ch)
        {
            text.push(ch);
            self.advance();
        }
        text
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia();
        let Some(&ch) = self.source.peek() else {
            return Ok(Token::Eof);
        };

        if ch.is_alphabetic() || ch == '_' {
            let ident = self.take_while(|c| c.is_alphanumeric() || c == '_' || c == '.');
            return Ok(Token::Ident(ident));
        }
        if ch.is_ascii_digit() {
            return self.number(String::new());
        }

        self.advance();
        let token = match ch {
            '%' => {
                let name = self.take_while(|c| c.is_alphanumeric());
                let id = name
                    .strip_prefix('v')
                    .and_then(|digits| digits.parse::<u32>().ok())
                    .filter(|id| *id != u32::MAX)
                    .ok_or(ParseError::InvalidNumber {
                        text: format!("%{}", name),
                        line: self.line,
                    })?;
                Token::Value(id)
            }
            '@' => {
                Token::Global(self.take_while(|c| c.is_alphanumeric() || c == '_' || c == '.'))
            }
            '-' => match self.source.peek() {
                Some('>') => {
                    self.advance();
                    Token::Arrow
                }
                Some(c) if c.is_ascii_digit() => return self.number("-".to_string()),
                _ => {
                    return Err(ParseError::UnexpectedChar {
                        ch: '-',
                        line: self.line,
                    });
                }
            },
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '=' => Token::Eq,
            '<' => Token::Lt,
            '>' => Token::Gt,
            other => {
                return Err(ParseError::UnexpectedChar {
                    ch: other,
                    line: self.line,
                });
            }
        };
        Ok(token)
    }

    fn number(&mut self, mut text: String) -> Result<Token, ParseError> {
        text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        let is_float = self.source.peek() == Some(&'.');
        if is_float {
            self.advance();
            text.push('.');
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }

        let invalid = |text: &String, line| ParseError::InvalidNumber {
            text: text.clone(),
            line,
        };
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| invalid(&text, self.line))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| invalid(&text, self.line))
        }
    }
}

// ----------- Parser -----------

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<(Token, usize)>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].0
    }

    fn line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].1
    }

    fn at_eof(&self) -> bool {
        *self.peek() == Token::Eof
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expected(&self, what: &str) -> ParseError {
        ParseError::Expected {
            expected: what.to_string(),
            found: self.peek().to_string(),
            line: self.line(),
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        if *self.peek() == token {
            self.bump();
            Ok(())
        } else {
            Err(self.expected(&token.to_string()))
        }
    }

    fn eat(&mut self, token: Token) -> bool {
        if *self.peek() == token {
            self.bump();
            true
        } else {
            false
        }
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek() {
            Token::Ident(name) => Some(name.as_str()),
            _ => None,
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            _ => Err(self.expected(what)),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.peek_ident() == Some(keyword) {
            self.bump();
            Ok(())
        } else {
            Err(self.expected(&format!("'{}'", keyword)))
        }
    }

    fn parse_function(&mut self) -> Result<Function, ParseError> {
        let start_line = self.line();
        self.expect_keyword("fn")?;
        let name = self.expect_ident("function name")?;

        self.expect(Token::LParen)?;
        let mut sig = Vec::new();
        if !self.eat(Token::RParen) {
            loop {
                sig.push(self.parse_type()?);
                if self.eat(Token::RParen) {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::Arrow)?;
        let ret_ty = self.parse_type()?;
        self.expect(Token::LBrace)?;

        let mut builder = FunctionBuilder::new(name.clone(), ret_ty);
        let mut entry_params: Option<Vec<IrType>> = None;
        while !self.eat(Token::RBrace) {
            let params = self.parse_block(&mut builder)?;
            entry_params.get_or_insert(params);
        }

        match entry_params {
            None => Err(ParseError::EmptyFunction {
                func: name,
                line: start_line,
            }),
            Some(params) if params != sig => Err(ParseError::SignatureMismatch {
                func: name,
                line: start_line,
            }),
            Some(_) => Ok(builder.finish()),
        }
    }

    /// Parses one block and returns its parameter types.
    fn parse_block(&mut self, builder: &mut FunctionBuilder) -> Result<Vec<IrType>, ParseError> {
        let line = self.line();
        let block = self.parse_block_ref()?;
        if builder.has_block(block) {
            return Err(ParseError::DuplicateBlock { block, line });
        }
        builder.insert_block(block);

        let mut param_tys = Vec::new();
        self.expect(Token::LParen)?;
        if !self.eat(Token::RParen) {
            loop {
                let (value, ty) = self.parse_value_def(builder)?;
                builder.push_block_param(block, value);
                param_tys.push(ty);
                if self.eat(Token::RParen) {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::Colon)?;

        loop {
            match self.peek_ident() {
                Some("br") | Some("ret") | Some("unreachable") => break,
                Some(name) if name.starts_with("cbr.") => break,
                _ => {
                    let inst = self.parse_instruction(builder)?;
                    builder.push_inst(block, inst);
                }
            }
        }

        let term = self.parse_terminator()?;
        builder.set_terminator(block, term);
        Ok(param_tys)
    }

    fn parse_value_def(
        &mut self,
        builder: &mut FunctionBuilder,
    ) -> Result<(ValueId, IrType), ParseError> {
        let line = self.line();
        let Token::Value(id) = *self.peek() else {
            return Err(self.expected("value"));
        };
        self.bump();
        self.expect(Token::Colon)?;
        let ty = self.parse_type()?;
        let value = ValueId(id);
        if builder.declare_value(value, ty.clone()).is_some() {
            return Err(ParseError::Redefined { value, line });
        }
        Ok((value, ty))
    }

    fn parse_instruction(
        &mut self,
        builder: &mut FunctionBuilder,
    ) -> Result<Instruction, ParseError> {
        let result = match self.peek() {
            Token::Value(_) => {
                let (value, _) = self.parse_value_def(builder)?;
                self.expect(Token::Eq)?;
                Some(value)
            }
            _ => None,
        };

        let line = self.line();
        let name = self.expect_ident("instruction")?;
        let kind = match name.as_str() {
            "copy" => InstKind::Copy {
                src: self.parse_operand()?,
            },
            "neg" | "not" => {
                let op = if name == "neg" { UnOp::Neg } else { UnOp::Not };
                InstKind::UnOp {
                    op,
                    operand: self.parse_operand()?,
                }
            }
            "load" => InstKind::Load {
                ptr: self.parse_operand()?,
            },
            "store" => {
                let (ptr, value) = self.parse_operand_pair()?;
                InstKind::Store { ptr, value }
            }
            "call" => {
                let Token::Global(callee) = self.peek().clone() else {
                    return Err(self.expected("callee"));
                };
                self.bump();
                self.expect(Token::LParen)?;
                let args = self.parse_operand_list_tail()?;
                InstKind::Call { name: callee, args }
            }
            other => {
                if let Some(op) = other.strip_prefix("cmp.").and_then(CmpOp::from_mnemonic) {
                    let (lhs, rhs) = self.parse_operand_pair()?;
                    InstKind::Cmp { op, lhs, rhs }
                } else if let Some(op) = BinOp::from_mnemonic(other) {
                    let (lhs, rhs) = self.parse_operand_pair()?;
                    InstKind::BinOp { op, lhs, rhs }
                } else {
                    return Err(ParseError::UnknownInstruction { name, line });
                }
            }
        };

        match (&kind, result) {
            (InstKind::Call { .. }, _) => {}
            (InstKind::Store { .. }, Some(_)) => {
                return Err(ParseError::UnexpectedResult { name, line });
            }
            (InstKind::Store { .. }, None) => {}
            (_, None) => return Err(ParseError::MissingResult { name, line }),
            (_, Some(_)) => {}
        }

        Ok(Instruction { result, kind })
    }

    fn parse_terminator(&mut self) -> Result<Terminator, ParseError> {
        let line = self.line();
        let name = self.expect_ident("terminator")?;
        match name.as_str() {
            "br" => {
                let target = self.parse_block_ref()?;
                let args = self.parse_edge_args()?;
                Ok(Terminator::Br { target, args })
            }
            "ret" => {
                let value = if self.at_operand() {
                    Some(self.parse_operand()?)
                } else {
                    None
                };
                Ok(Terminator::Return { value })
            }
            "unreachable" => Ok(Terminator::Unreachable),
            other => {
                let op = other
                    .strip_prefix("cbr.")
                    .and_then(CmpOp::from_mnemonic)
                    .ok_or(ParseError::UnknownInstruction {
                        name: name.clone(),
                        line,
                    })?;
                let (lhs, rhs) = self.parse_operand_pair()?;
                self.expect(Token::Comma)?;
                let then_bb = self.parse_block_ref()?;
                let then_args = self.parse_edge_args()?;
                self.expect(Token::Comma)?;
                let else_bb = self.parse_block_ref()?;
                let else_args = self.parse_edge_args()?;
                Ok(Terminator::CondBr {
                    cond: Condition { op, lhs, rhs },
                    then_bb,
                    then_args,
                    else_bb,
                    else_args,
                })
            }
        }
    }

    fn parse_block_ref(&mut self) -> Result<BlockId, ParseError> {
        let id = self
            .peek_ident()
            .and_then(|name| name.strip_prefix("bb"))
            .and_then(|digits| digits.parse::<u32>().ok());
        match id {
            // The builder allocates fresh ids past the largest one seen.
            Some(u32::MAX) => Err(ParseError::InvalidNumber {
                text: format!("bb{}", u32::MAX),
                line: self.line(),
            }),
            Some(id) => {
                self.bump();
                Ok(BlockId(id))
            }
            None => Err(self.expected("block")),
        }
    }

    fn parse_edge_args(&mut self) -> Result<Vec<Operand>, ParseError> {
        if self.eat(Token::LParen) {
            self.parse_operand_list_tail()
        } else {
            Ok(Vec::new())
        }
    }

    /// Parses `a, b, c)` after the opening parenthesis.
    fn parse_operand_list_tail(&mut self) -> Result<Vec<Operand>, ParseError> {
        let mut operands = Vec::new();
        if self.eat(Token::RParen) {
            return Ok(operands);
        }
        loop {
            operands.push(self.parse_operand()?);
            if self.eat(Token::RParen) {
                return Ok(operands);
            }
            self.expect(Token::Comma)?;
        }
    }

    fn parse_operand_pair(&mut self) -> Result<(Operand, Operand), ParseError> {
        let lhs = self.parse_operand()?;
        self.expect(Token::Comma)?;
        let rhs = self.parse_operand()?;
        Ok((lhs, rhs))
    }

    fn at_operand(&self) -> bool {
        match self.peek() {
            Token::Value(_) | Token::Int(_) | Token::Float(_) => true,
            Token::Ident(name) => matches!(name.as_str(), "true" | "false" | "unit"),
            _ => false,
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        match self.peek().clone() {
            Token::Value(id) => {
                self.bump();
                Ok(Operand::Value(ValueId(id)))
            }
            Token::Int(value) => {
                self.bump();
                self.expect(Token::Colon)?;
                let line = self.line();
                match self.parse_type()? {
                    IrType::Int { bits, signed } => {
                        let ty = IrType::int(bits, signed);
                        let in_range = ty
                            .int_range()
                            .is_some_and(|range| range.contains(&(value as i128)));
                        if !in_range {
                            return Err(ParseError::InvalidNumber {
                                text: format!("{}:{}", value, ty),
                                line,
                            });
                        }
                        Ok(Operand::Const(IrConst::int(value, bits, signed)))
                    }
                    IrType::Float { bits } => {
                        Ok(Operand::Const(IrConst::float(value as f64, bits)))
                    }
                    other => Err(ParseError::Expected {
                        expected: "numeric type".to_string(),
                        found: format!("'{}'", other),
                        line,
                    }),
                }
            }
            Token::Float(value) => {
                self.bump();
                self.expect(Token::Colon)?;
                let line = self.line();
                match self.parse_type()? {
                    IrType::Float { bits } => Ok(Operand::Const(IrConst::float(value, bits))),
                    other => Err(ParseError::Expected {
                        expected: "float type".to_string(),
                        found: format!("'{}'", other),
                        line,
                    }),
                }
            }
            Token::Ident(name) if name == "true" || name == "false" => {
                self.bump();
                Ok(Operand::Const(IrConst::Bool(name == "true")))
            }
            Token::Ident(name) if name == "unit" => {
                self.bump();
                Ok(Operand::Const(IrConst::Unit))
            }
            _ => Err(self.expected("operand")),
        }
    }

    fn parse_type(&mut self) -> Result<IrType, ParseError> {
        if self.eat(Token::LParen) {
            self.expect(Token::RParen)?;
            return Ok(IrType::Unit);
        }

        let line = self.line();
        let name = self.expect_ident("type")?;
        match name.as_str() {
            "bool" => return Ok(IrType::Bool),
            "ptr" => {
                self.expect(Token::Lt)?;
                let elem = self.parse_type()?;
                self.expect(Token::Gt)?;
                return Ok(IrType::ptr(elem));
            }
            _ => {}
        }

        let mut chars = name.chars();
        let kind = chars.next();
        let bits = chars
            .as_str()
            .parse::<u8>()
            .ok()
            .filter(|bits| *bits > 0 && *bits <= 64);
        match (kind, bits) {
            (Some('i'), Some(bits)) => Ok(IrType::int(bits, true)),
            (Some('u'), Some(bits)) => Ok(IrType::int(bits, false)),
            (Some('f'), Some(bits @ (32 | 64))) => Ok(IrType::Float { bits }),
            _ => Err(ParseError::UnknownType { name, line }),
        }
    }
}

#[cfg(test)]
#[path = "../tests/ir/t_parse.rs"]
mod tests;
