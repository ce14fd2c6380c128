//! Recursive-descent parser for Lua 5.4
//!
//! Produces the tree in [`super::ast`]. Any syntax error aborts the parse
//! with a [`ParseError`] pointing at the offending token.

use super::ast::{Kind, Node};
use super::lexer::{tokenize, Token, TokenKind};
use crate::adapter::framework::{Language, ParseError};

/// Nesting limit for blocks and expressions.
const MAX_DEPTH: usize = 200;

/// Unary operator priority.
const UNARY_PRIORITY: u8 = 12;

pub fn parse(source: &str) -> Result<Node, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
    };
    parser.chunk()
}

/// Left and right binding power of a binary operator.
fn binary_priority(op: &str) -> Option<(u8, u8)> {
    let priority = match op {
        "or" => (1, 1),
        "and" => (2, 2),
        "<" | ">" | "<=" | ">=" | "~=" | "==" => (3, 3),
        "|" => (4, 4),
        "~" => (5, 5),
        "&" => (6, 6),
        "<<" | ">>" => (7, 7),
        ".." => (9, 8),
        "+" | "-" => (10, 10),
        "*" | "/" | "//" | "%" => (11, 11),
        "^" => (14, 13),
        _ => return None,
    };
    Some(priority)
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

type ParseResult = Result<Node, ParseError>;

impl<'s> Parser<'s> {
    // ---- token helpers ----

    fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> Token {
        self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn text(&self, token: Token) -> &'s str {
        &self.source[token.start..token.end]
    }

    /// Whether the current token is the keyword or symbol `s`.
    fn check(&self, s: &str) -> bool {
        let token = self.peek();
        matches!(token.kind, TokenKind::Keyword | TokenKind::Symbol) && self.text(token) == s
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn accept(&mut self, s: &str) -> bool {
        if self.check(s) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, s: &str) -> Result<Token, ParseError> {
        if self.check(s) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}' expected", s)))
        }
    }

    fn expect_name(&mut self) -> Result<Token, ParseError> {
        if self.peek().kind == TokenKind::Name {
            Ok(self.advance())
        } else {
            Err(self.unexpected("<name> expected"))
        }
    }

    /// End offset of the last consumed token.
    fn last_end(&self) -> usize {
        match self.pos {
            0 => 0,
            n => self.tokens[n - 1].end,
        }
    }

    fn unexpected(&self, message: &str) -> ParseError {
        let token = self.peek();
        let near = match token.kind {
            TokenKind::Eof => "<eof>".to_string(),
            _ => self.text(token).to_string(),
        };
        ParseError::new(
            Language::Lua,
            format!("{} near '{}'", message, near),
            self.source,
            token.start,
        )
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.unexpected("too many nested levels"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ---- statements ----

    fn chunk(&mut self) -> ParseResult {
        let body = self.block()?;
        if self.peek().kind != TokenKind::Eof {
            return Err(self.unexpected("'<eof>' expected"));
        }
        Ok(Node::new(Kind::Chunk, 0, self.source.len()).with_all("body", body))
    }

    fn block_follows(&self) -> bool {
        self.peek().kind == TokenKind::Eof
            || ["end", "else", "elseif", "until"].iter().any(|kw| self.check(kw))
    }

    fn block(&mut self) -> Result<Vec<Node>, ParseError> {
        self.enter()?;
        let mut body = Vec::new();
        while !self.block_follows() {
            if self.check("return") {
                body.push(self.return_statement()?);
                break;
            }
            if let Some(statement) = self.statement()? {
                body.push(statement);
            }
        }
        self.leave();
        Ok(body)
    }

    fn statement(&mut self) -> Result<Option<Node>, ParseError> {
        let start = self.peek().start;
        if self.accept(";") {
            return Ok(None);
        }

        let keyword = match self.peek().kind {
            TokenKind::Keyword | TokenKind::Symbol => self.text(self.peek()),
            _ => "",
        };

        let node = match keyword {
            "::" => {
                self.advance();
                let label = self.name_node(Kind::Identifier)?;
                self.expect("::")?;
                Node::new(Kind::LabelStatement, start, self.last_end()).with("label", label)
            }
            "break" => {
                self.advance();
                Node::new(Kind::BreakStatement, start, self.last_end())
            }
            "goto" => {
                self.advance();
                let label = self.name_node(Kind::Identifier)?;
                Node::new(Kind::GotoStatement, start, self.last_end()).with("label", label)
            }
            "do" => {
                self.advance();
                let body = self.block()?;
                self.expect("end")?;
                Node::new(Kind::DoStatement, start, self.last_end()).with_all("body", body)
            }
            "while" => {
                self.advance();
                let condition = self.expression()?;
                self.expect("do")?;
                let body = self.block()?;
                self.expect("end")?;
                Node::new(Kind::WhileStatement, start, self.last_end())
                    .with("condition", condition)
                    .with_all("body", body)
            }
            "repeat" => {
                self.advance();
                let body = self.block()?;
                self.expect("until")?;
                let condition = self.expression()?;
                Node::new(Kind::RepeatStatement, start, self.last_end())
                    .with_all("body", body)
                    .with("condition", condition)
            }
            "if" => self.if_statement()?,
            "for" => self.for_statement()?,
            "function" => {
                self.advance();
                let identifier = self.function_name()?;
                let (parameters, body) = self.function_body()?;
                Node::new(Kind::FunctionDeclaration, start, self.last_end())
                    .with("identifier", identifier)
                    .with_all("parameters", parameters)
                    .with_all("body", body)
            }
            "local" => {
                self.advance();
                if self.accept("function") {
                    let identifier = self.name_node(Kind::Identifier)?;
                    let (parameters, body) = self.function_body()?;
                    Node::new(Kind::LocalFunction, start, self.last_end())
                        .with("identifier", identifier)
                        .with_all("parameters", parameters)
                        .with_all("body", body)
                } else {
                    self.local_statement(start)?
                }
            }
            _ => self.expression_statement()?,
        };
        Ok(Some(node))
    }

    fn return_statement(&mut self) -> ParseResult {
        let start = self.expect("return")?.start;
        let arguments = if self.block_follows() || self.check(";") {
            Vec::new()
        } else {
            self.expression_list()?
        };
        self.accept(";");
        Ok(Node::new(Kind::ReturnStatement, start, self.last_end()).with_all("arguments", arguments))
    }

    fn if_statement(&mut self) -> ParseResult {
        let start = self.expect("if")?.start;
        let mut clauses = Vec::new();

        let condition = self.expression()?;
        self.expect("then")?;
        let body = self.block()?;
        clauses.push(
            Node::new(Kind::IfClause, start, self.last_end())
                .with("condition", condition)
                .with_all("body", body),
        );

        while self.check("elseif") {
            let clause_start = self.advance().start;
            let condition = self.expression()?;
            self.expect("then")?;
            let body = self.block()?;
            clauses.push(
                Node::new(Kind::ElseifClause, clause_start, self.last_end())
                    .with("condition", condition)
                    .with_all("body", body),
            );
        }

        if self.check("else") {
            let clause_start = self.advance().start;
            let body = self.block()?;
            clauses.push(Node::new(Kind::ElseClause, clause_start, self.last_end()).with_all("body", body));
        }

        self.expect("end")?;
        Ok(Node::new(Kind::IfStatement, start, self.last_end()).with_all("clauses", clauses))
    }

    fn for_statement(&mut self) -> ParseResult {
        let start = self.expect("for")?.start;
        let first = self.name_node(Kind::Identifier)?;

        if self.accept("=") {
            let from = self.expression()?;
            self.expect(",")?;
            let to = self.expression()?;
            let step = if self.accept(",") {
                Some(self.expression()?)
            } else {
                None
            };
            self.expect("do")?;
            let body = self.block()?;
            self.expect("end")?;
            return Ok(Node::new(Kind::ForNumericStatement, start, self.last_end())
                .with("variable", first)
                .with("start", from)
                .with("end", to)
                .with_opt("step", step)
                .with_all("body", body));
        }

        let mut variables = vec![first];
        while self.accept(",") {
            variables.push(self.name_node(Kind::Identifier)?);
        }
        self.expect("in")?;
        let iterators = self.expression_list()?;
        self.expect("do")?;
        let body = self.block()?;
        self.expect("end")?;
        Ok(Node::new(Kind::ForGenericStatement, start, self.last_end())
            .with_all("variables", variables)
            .with_all("iterators", iterators)
            .with_all("body", body))
    }

    fn local_statement(&mut self, start: usize) -> ParseResult {
        let mut variables = Vec::new();
        loop {
            variables.push(self.name_node(Kind::Identifier)?);
            // attribute: <const> or <close>
            if self.accept("<") {
                self.expect_name()?;
                self.expect(">")?;
            }
            if !self.accept(",") {
                break;
            }
        }
        let init = if self.accept("=") {
            self.expression_list()?
        } else {
            Vec::new()
        };
        Ok(Node::new(Kind::LocalStatement, start, self.last_end())
            .with_all("variables", variables)
            .with_all("init", init))
    }

    fn expression_statement(&mut self) -> ParseResult {
        let start = self.peek().start;
        let first = self.suffixed_expression()?;

        if self.check("=") || self.check(",") {
            let mut variables = vec![first];
            while self.accept(",") {
                variables.push(self.suffixed_expression()?);
            }
            if let Some(bad) = variables.iter().find(|v| {
                !matches!(
                    v.kind,
                    Kind::Identifier | Kind::MemberExpression | Kind::IndexExpression
                )
            }) {
                return Err(ParseError::new(
                    Language::Lua,
                    "cannot assign to this expression",
                    self.source,
                    bad.start,
                ));
            }
            self.expect("=")?;
            let init = self.expression_list()?;
            return Ok(Node::new(Kind::AssignmentStatement, start, self.last_end())
                .with_all("variables", variables)
                .with_all("init", init));
        }

        if first.kind != Kind::CallExpression {
            return Err(self.unexpected("syntax error"));
        }
        Ok(Node::new(Kind::CallStatement, start, self.last_end()).with("expression", first))
    }

    // ---- functions ----

    /// `a.b.c:d` as nested member expressions.
    fn function_name(&mut self) -> ParseResult {
        let mut name = self.name_node(Kind::Identifier)?;
        loop {
            let is_method = self.check(":");
            if !(self.check(".") || is_method) {
                break;
            }
            self.advance();
            let property = self.name_node(Kind::Property)?;
            name = Node::new(Kind::MemberExpression, name.start, property.end)
                .with("base", name)
                .with("identifier", property);
            if is_method {
                break;
            }
        }
        Ok(name)
    }

    fn function_body(&mut self) -> Result<(Vec<Node>, Vec<Node>), ParseError> {
        self.expect("(")?;
        let mut parameters = Vec::new();
        if !self.check(")") {
            loop {
                if self.check("...") {
                    let token = self.advance();
                    parameters.push(Node::new(Kind::VarargLiteral, token.start, token.end));
                    break;
                }
                parameters.push(self.name_node(Kind::Identifier)?);
                if !self.accept(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        let body = self.block()?;
        self.expect("end")?;
        Ok((parameters, body))
    }

    // ---- expressions ----

    fn expression_list(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut list = vec![self.expression()?];
        while self.accept(",") {
            list.push(self.expression()?);
        }
        Ok(list)
    }

    fn expression(&mut self) -> ParseResult {
        self.binary_expression(0)
    }

    fn operator(&self) -> Option<&'s str> {
        let token = self.peek();
        match token.kind {
            TokenKind::Keyword | TokenKind::Symbol => Some(self.text(token)),
            _ => None,
        }
    }

    fn binary_expression(&mut self, limit: u8) -> ParseResult {
        self.enter()?;
        let start = self.peek().start;

        let mut left = match self.operator() {
            Some("not") | Some("-") | Some("#") | Some("~") => {
                self.advance();
                let argument = self.binary_expression(UNARY_PRIORITY)?;
                Node::new(Kind::UnaryExpression, start, self.last_end()).with("argument", argument)
            }
            _ => self.simple_expression()?,
        };

        while let Some((lhs, rhs)) = self.operator().and_then(binary_priority) {
            if lhs <= limit {
                break;
            }
            let token = self.advance();
            let op = self.text(token);
            let right = self.binary_expression(rhs)?;
            let kind = if op == "and" || op == "or" {
                Kind::LogicalExpression
            } else {
                Kind::BinaryExpression
            };
            left = Node::new(kind, start, self.last_end())
                .with("left", left)
                .with("right", right);
        }

        self.leave();
        Ok(left)
    }

    fn simple_expression(&mut self) -> ParseResult {
        let token = self.peek();
        let literal = |kind| Node::new(kind, token.start, token.end);
        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(literal(Kind::NumericLiteral))
            }
            TokenKind::String => {
                self.advance();
                Ok(literal(Kind::StringLiteral))
            }
            TokenKind::Keyword | TokenKind::Symbol => match self.text(token) {
                "nil" => {
                    self.advance();
                    Ok(literal(Kind::NilLiteral))
                }
                "true" | "false" => {
                    self.advance();
                    Ok(literal(Kind::BooleanLiteral))
                }
                "..." => {
                    self.advance();
                    Ok(literal(Kind::VarargLiteral))
                }
                "{" => self.table_constructor(),
                "function" => {
                    self.advance();
                    let (parameters, body) = self.function_body()?;
                    Ok(Node::new(Kind::FunctionExpression, token.start, self.last_end())
                        .with_all("parameters", parameters)
                        .with_all("body", body))
                }
                _ => self.suffixed_expression(),
            },
            _ => self.suffixed_expression(),
        }
    }

    fn primary_expression(&mut self) -> ParseResult {
        let token = self.peek();
        if token.kind == TokenKind::Name {
            return self.name_node(Kind::Identifier);
        }
        if self.accept("(") {
            let inner = self.expression()?;
            self.expect(")")?;
            return Ok(Node::new(Kind::ParenthesizedExpression, token.start, self.last_end())
                .with("expression", inner));
        }
        Err(self.unexpected("unexpected symbol"))
    }

    fn suffixed_expression(&mut self) -> ParseResult {
        self.enter()?;
        let start = self.peek().start;
        let mut base = self.primary_expression()?;

        loop {
            let token = self.peek();
            let is_string = token.kind == TokenKind::String;
            match self.operator() {
                Some(".") => {
                    self.advance();
                    let property = self.name_node(Kind::Property)?;
                    base = Node::new(Kind::MemberExpression, start, self.last_end())
                        .with("base", base)
                        .with("identifier", property);
                }
                Some("[") => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect("]")?;
                    base = Node::new(Kind::IndexExpression, start, self.last_end())
                        .with("base", base)
                        .with("index", index);
                }
                Some(":") => {
                    self.advance();
                    let property = self.name_node(Kind::Property)?;
                    let callee = Node::new(Kind::MemberExpression, start, property.end)
                        .with("base", base)
                        .with("identifier", property);
                    let arguments = self.call_arguments()?;
                    base = Node::new(Kind::CallExpression, start, self.last_end())
                        .with("base", callee)
                        .with_all("arguments", arguments);
                }
                Some("(") | Some("{") => {
                    let arguments = self.call_arguments()?;
                    base = Node::new(Kind::CallExpression, start, self.last_end())
                        .with("base", base)
                        .with_all("arguments", arguments);
                }
                _ if is_string => {
                    let arguments = self.call_arguments()?;
                    base = Node::new(Kind::CallExpression, start, self.last_end())
                        .with("base", base)
                        .with_all("arguments", arguments);
                }
                _ => break,
            }
        }

        self.leave();
        Ok(base)
    }

    fn call_arguments(&mut self) -> Result<Vec<Node>, ParseError> {
        let token = self.peek();
        if token.kind == TokenKind::String {
            self.advance();
            return Ok(vec![Node::new(Kind::StringLiteral, token.start, token.end)]);
        }
        if self.check("{") {
            return Ok(vec![self.table_constructor()?]);
        }
        self.expect("(")?;
        let arguments = if self.check(")") {
            Vec::new()
        } else {
            self.expression_list()?
        };
        self.expect(")")?;
        Ok(arguments)
    }

    fn table_constructor(&mut self) -> ParseResult {
        let start = self.expect("{")?.start;
        let mut fields = Vec::new();

        while !self.check("}") {
            let field_start = self.peek().start;
            let field = if self.accept("[") {
                let key = self.expression()?;
                self.expect("]")?;
                self.expect("=")?;
                let value = self.expression()?;
                Node::new(Kind::TableKey, field_start, self.last_end())
                    .with("key", key)
                    .with("value", value)
            } else if self.peek().kind == TokenKind::Name
                && self.peek_next().kind == TokenKind::Symbol
                && self.text(self.peek_next()) == "="
            {
                let key = self.name_node(Kind::Property)?;
                self.advance();
                let value = self.expression()?;
                Node::new(Kind::TableKeyString, field_start, self.last_end())
                    .with("key", key)
                    .with("value", value)
            } else {
                let value = self.expression()?;
                Node::new(Kind::TableValue, field_start, self.last_end()).with("value", value)
            };
            fields.push(field);

            if !(self.accept(",") || self.accept(";")) {
                break;
            }
        }

        self.expect("}")?;
        Ok(Node::new(Kind::TableConstructorExpression, start, self.last_end()).with_all("fields", fields))
    }

    fn name_node(&mut self, kind: Kind) -> ParseResult {
        let token = self.expect_name()?;
        Ok(Node::new(kind, token.start, token.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(node: &Node) -> Vec<Kind> {
        node.children.iter().map(|(_, c)| c.kind).collect()
    }

    #[test]
    fn test_statements() {
        let source = r#"
local x, y <const> = 1, "two"
function M.helper(a, ...) return a end
local function f() end
x = x + 1
print(x)
do local z = 3 end
while x < 10 do x = x * 2 end
repeat x = x - 1 until x == 0
if x then y = 1 elseif y then y = 2 else y = 3 end
for i = 1, 10, 2 do print(i) end
for k, v in pairs(t) do print(k, v) end
::top:: goto top
"#;
        let chunk = parse(source).unwrap();
        assert_eq!(
            kinds(&chunk),
            vec![
                Kind::LocalStatement,
                Kind::FunctionDeclaration,
                Kind::LocalFunction,
                Kind::AssignmentStatement,
                Kind::CallStatement,
                Kind::DoStatement,
                Kind::WhileStatement,
                Kind::RepeatStatement,
                Kind::IfStatement,
                Kind::ForNumericStatement,
                Kind::ForGenericStatement,
                Kind::LabelStatement,
                Kind::GotoStatement,
            ]
        );
    }

    #[test]
    fn test_function_declaration_shape() {
        let source = "function a.b:c(x) return self end";
        let chunk = parse(source).unwrap();
        let func = &chunk.children[0].1;
        assert_eq!(func.kind, Kind::FunctionDeclaration);
        assert_eq!((func.start, func.end), (0, source.len()));

        let name = func.field("identifier").unwrap();
        assert_eq!(name.kind, Kind::MemberExpression);
        assert_eq!(&source[name.start..name.end], "a.b:c");
        assert_eq!(func.children.iter().filter(|(f, _)| *f == "parameters").count(), 1);
        assert_eq!(func.children.iter().filter(|(f, _)| *f == "body").count(), 1);
    }

    #[test]
    fn test_expression_precedence() {
        let source = "x = 1 + 2 * 3 .. 'a' .. 'b'";
        let chunk = parse(source).unwrap();
        let assign = &chunk.children[0].1;
        let init = assign.field("init").unwrap();
        // `..` binds looser than `+` and is right associative.
        assert_eq!(init.kind, Kind::BinaryExpression);
        let left = init.field("left").unwrap();
        assert_eq!(&source[left.start..left.end], "1 + 2 * 3");
        let right = init.field("right").unwrap();
        assert_eq!(&source[right.start..right.end], "'a' .. 'b'");
    }

    #[test]
    fn test_calls_and_members() {
        let source = "obj:method(1).field[2] = require 'mod'; f{1, k = 2, [3] = 4}";
        let chunk = parse(source).unwrap();
        let assign = &chunk.children[0].1;
        let target = assign.field("variables").unwrap();
        assert_eq!(target.kind, Kind::IndexExpression);
        let init = assign.field("init").unwrap();
        assert_eq!(init.kind, Kind::CallExpression);

        let call = chunk.children[1].1.field("expression").unwrap();
        let table = call.field("arguments").unwrap();
        assert_eq!(
            kinds(table),
            vec![Kind::TableValue, Kind::TableKeyString, Kind::TableKey]
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("local = 1").is_err());
        assert!(parse("function f() return 1").is_err());
        assert!(parse("x + 1").is_err());
        assert!(parse("f() = 1").is_err());
        assert!(parse("if x then else").is_err());

        let err = parse("local a = 1\nlocal b = = 2\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("near '='"));
    }

    #[test]
    fn test_deep_nesting_is_an_error_not_a_crash() {
        let source = format!("x = {}1{}", "(".repeat(500), ")".repeat(500));
        assert!(parse(&source).is_err());
    }
}
