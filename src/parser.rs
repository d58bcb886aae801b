use std::iter::Peekable;
use std::vec::IntoIter;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use miette::Result;

use crate::error;
use crate::lexer::{lex, Token, TokenKind};
use crate::program::{Arg, Command, Line, Program};
use crate::symbol::{FxMap, Span, SrcOffset};

const ALLOC_DIRECTIVE: &str = "allocate-registers";

/// Operand shape of an instruction, paired with how to build it.
enum Shape {
    Three(fn(Arg, Arg, Arg) -> Command),
    Two(fn(Arg, Arg) -> Command),
    One(fn(Arg) -> Command),
    Zero(Command),
}

impl Shape {
    fn of(mnemonic: &str) -> Option<Shape> {
        let shape = match mnemonic {
            "add" => Shape::Three(|dst, src1, src2| Command::Add { dst, src1, src2 }),
            "sub" => Shape::Three(|dst, src1, src2| Command::Sub { dst, src1, src2 }),
            "mul" => Shape::Three(|dst, src1, src2| Command::Mul { dst, src1, src2 }),
            "div" => Shape::Three(|dst, src1, src2| Command::Div { dst, src1, src2 }),
            "quo" => Shape::Three(|dst, src1, src2| Command::Quo { dst, src1, src2 }),
            "rem" => Shape::Three(|dst, src1, src2| Command::Rem { dst, src1, src2 }),
            "seq" => Shape::Three(|dst, src1, src2| Command::Seq { dst, src1, src2 }),
            "sne" => Shape::Three(|dst, src1, src2| Command::Sne { dst, src1, src2 }),
            "slt" => Shape::Three(|dst, src1, src2| Command::Slt { dst, src1, src2 }),
            "sgt" => Shape::Three(|dst, src1, src2| Command::Sgt { dst, src1, src2 }),
            "sle" => Shape::Three(|dst, src1, src2| Command::Sle { dst, src1, src2 }),
            "sge" => Shape::Three(|dst, src1, src2| Command::Sge { dst, src1, src2 }),
            "ld" => Shape::Two(|dst, addr_reg| Command::Ld { dst, addr_reg }),
            "st" => Shape::Two(|src, addr_reg| Command::St { src, addr_reg }),
            "li" => Shape::Two(|dst, val| Command::Li { dst, val }),
            "jeqz" => Shape::Two(|src, line_reg| Command::Jeqz { src, line_reg }),
            "read" => Shape::One(|dst| Command::Read { dst }),
            "write" => Shape::One(|src| Command::Write { src }),
            "j" => Shape::One(|line_reg| Command::J { line_reg }),
            "halt" => Shape::Zero(Command::Halt),
            _ => return None,
        };
        Some(shape)
    }

    fn arity(&self) -> usize {
        match self {
            Shape::Three(_) => 3,
            Shape::Two(_) => 2,
            Shape::One(_) => 1,
            Shape::Zero(_) => 0,
        }
    }
}

/// Parse SLIM source text into a program.
pub fn parse(src: &str) -> Result<Program> {
    AsmParser::new(src)?.parse()
}

/// Transforms token stream into a [`Program`]
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    /// Peekable iterator over tokens, without whitespace or comments
    toks: Peekable<IntoIter<Token>>,
    lines: Vec<Line>,
    spans: Vec<Span>,
    /// Where each label was first defined
    labels: FxMap<String, Span>,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Result<Self> {
        let toks = lex(src)?;
        Ok(AsmParser {
            src,
            toks: toks.into_iter().peekable(),
            lines: Vec::new(),
            spans: Vec::new(),
            labels: IndexMap::with_hasher(FxBuildHasher::default()),
        })
    }

    /// Create the program out of the token stream
    pub fn parse(mut self) -> Result<Program> {
        while self.toks.peek().is_some() {
            let (toks, end) = self.next_source_line();
            self.parse_line(toks, end)?;
        }
        // Consume self to return the program
        Ok(Program::with_spans(self.lines, self.spans))
    }

    /// Tokens up to the next newline, plus the span of the line terminator.
    fn next_source_line(&mut self) -> (Vec<Token>, Span) {
        let mut line = Vec::new();
        for tok in self.toks.by_ref() {
            if tok.kind == TokenKind::Newline {
                return (line, tok.span);
            }
            line.push(tok);
        }
        (line, Span::new(SrcOffset(self.src.len()), 0))
    }

    fn push(&mut self, line: Line, span: Span) {
        self.lines.push(line);
        self.spans.push(span);
    }

    fn parse_line(&mut self, toks: Vec<Token>, end: Span) -> Result<()> {
        let mut toks = toks.as_slice();

        // Prefix label, with the colon directly after the name
        if let [Token {
            kind: TokenKind::Ident(name),
            span: name_span,
        }, Token {
            kind: TokenKind::Colon,
            span: colon_span,
        }, rest @ ..] = toks
        {
            if colon_span.offs() == name_span.end() {
                if self.labels.contains_key(name) {
                    return Err(error::parse_duplicate_label(*name_span, self.src));
                }
                self.labels.insert(name.clone(), *name_span);
                self.push(Line::Lab(name.clone()), name_span.join(*colon_span));
                if rest.is_empty() {
                    return Ok(());
                }
                toks = rest;
            }
        }

        let Some((head, rest)) = toks.split_first() else {
            self.push(Line::Blank, end);
            return Ok(());
        };
        let span = rest.last().map_or(head.span, |last| head.span.join(last.span));

        let mnemonic = match &head.kind {
            TokenKind::Ident(name) => name.to_ascii_lowercase(),
            other => {
                return Err(error::parse_generic_unexpected(
                    head.span,
                    self.src,
                    "an instruction or directive",
                    &other.to_string(),
                ))
            }
        };

        let line = if mnemonic == ALLOC_DIRECTIVE {
            self.parse_alloc(head.span, rest)?
        } else {
            Line::Cmd(self.parse_instr(&mnemonic, head.span, span, rest)?)
        };
        self.push(line, span);
        Ok(())
    }

    fn parse_alloc(&self, head: Span, rest: &[Token]) -> Result<Line> {
        if rest.is_empty() {
            return Err(error::parse_empty_alloc(head, self.src));
        }
        let names = rest
            .iter()
            .map(|tok| match &tok.kind {
                TokenKind::Ident(name) => Ok(name.clone()),
                other => Err(error::parse_generic_unexpected(
                    tok.span,
                    self.src,
                    "a register name",
                    &other.to_string(),
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Line::Alloc(names))
    }

    /// Process operand tokens to form a valid command
    fn parse_instr(
        &self,
        mnemonic: &str,
        head: Span,
        span: Span,
        rest: &[Token],
    ) -> Result<Command> {
        let Some(shape) = Shape::of(mnemonic) else {
            return Err(error::parse_unknown_mnemonic(head, self.src, mnemonic));
        };
        let args = rest
            .iter()
            .map(|tok| self.expect_arg(tok))
            .collect::<Result<Vec<_>>>()?;

        let found = args.len();
        let arity_err =
            |_: Vec<Arg>| error::parse_arity(span, self.src, mnemonic, shape.arity(), found);
        let command = match &shape {
            Shape::Three(build) => {
                let [a, b, c]: [Arg; 3] = args.try_into().map_err(arity_err)?;
                build(a, b, c)
            }
            Shape::Two(build) => {
                let [a, b]: [Arg; 2] = args.try_into().map_err(arity_err)?;
                build(a, b)
            }
            Shape::One(build) => {
                let [a]: [Arg; 1] = args.try_into().map_err(arity_err)?;
                build(a)
            }
            Shape::Zero(command) => {
                let []: [Arg; 0] = args.try_into().map_err(arity_err)?;
                command.clone()
            }
        };
        Ok(command)
    }

    fn expect_arg(&self, tok: &Token) -> Result<Arg> {
        match &tok.kind {
            TokenKind::Ident(name) => Ok(Arg::Name(name.clone())),
            TokenKind::Lit(value) => Ok(Arg::Num(*value)),
            other => Err(error::parse_generic_unexpected(
                tok.span,
                self.src,
                "an operand",
                &other.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cmd(command: Command) -> Line {
        Line::Cmd(command)
    }

    fn code_of(src: &str) -> String {
        let err = parse(src).unwrap_err();
        err.code().map(|c| c.to_string()).unwrap_or_default()
    }

    #[test]
    fn parses_every_line_kind() {
        let src = "\
; sum two numbers
allocate-registers a, b

start:
    read a
    READ b
    add a, a, b
    write a
    halt
";
        let program = parse(src).unwrap();
        assert_eq!(
            program.lines(),
            &[
                Line::Blank,
                Line::Alloc(vec!["a".into(), "b".into()]),
                Line::Blank,
                Line::Lab("start".into()),
                cmd(Command::Read { dst: "a".into() }),
                cmd(Command::Read { dst: "b".into() }),
                cmd(Command::Add {
                    dst: "a".into(),
                    src1: "a".into(),
                    src2: "b".into()
                }),
                cmd(Command::Write { src: "a".into() }),
                cmd(Command::Halt),
            ]
        );
    }

    #[test]
    fn label_prefix_splits_line() {
        assert_eq!(parse("end:halt").unwrap().len(), 2);
        let program = parse("loop: j loop\n").unwrap();
        assert_eq!(
            program.lines(),
            &[
                Line::Lab("loop".into()),
                cmd(Command::J {
                    line_reg: "loop".into()
                })
            ]
        );
    }

    #[test]
    fn numeric_operands() {
        let program = parse("li 3, -0x10\nst 0, 1").unwrap();
        assert_eq!(
            program.lines(),
            &[
                cmd(Command::Li {
                    dst: Arg::Num(3),
                    val: Arg::Num(-16)
                }),
                cmd(Command::St {
                    src: Arg::Num(0),
                    addr_reg: Arg::Num(1)
                }),
            ]
        );
    }

    #[test]
    fn records_spans() {
        let src = "allocate-registers x\n  li x, 4\nhalt";
        let program = parse(src).unwrap();
        assert_eq!(&src[program.span(0).unwrap().range()], "allocate-registers x");
        assert_eq!(&src[program.span(1).unwrap().range()], "li x, 4");
        assert_eq!(&src[program.span(2).unwrap().range()], "halt");
    }

    #[test]
    fn trailing_newline_adds_no_line() {
        assert_eq!(parse("halt\n").unwrap().len(), 1);
        assert_eq!(parse("\n\nhalt").unwrap().len(), 3);
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn reports_errors() {
        assert_eq!(code_of("frob a, b"), "parse::mnemonic");
        assert_eq!(code_of("add a, b"), "parse::arity");
        assert_eq!(code_of("halt now"), "parse::arity");
        assert_eq!(code_of("a:\na:\nhalt"), "parse::duplicate_label");
        assert_eq!(code_of("5 add"), "parse::unexpected_token");
        assert_eq!(code_of("write :"), "parse::unexpected_token");
        assert_eq!(code_of("loop :\nhalt"), "parse::mnemonic");
        assert_eq!(code_of("allocate-registers"), "parse::alloc");
        assert_eq!(code_of("allocate-registers a, 2"), "parse::unexpected_token");
        assert_eq!(code_of("li a, #5"), "lex::unknown");
    }
}
