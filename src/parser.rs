use anyhow::anyhow;
use strum::IntoDiscriminant;

use crate::ast::{
    CreateTableStatement, DeleteStatement, DropTableStatement, InsertStatement, MergeStatement,
    SchemaPart, Script, Statement, TablePath, Token, TokenType, TokenTypeVariant, UpdateStatement,
};
use crate::scanner::Scanner;

pub struct Parser<'a> {
    source_tokens: &'a Vec<Token>,
    curr: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a Vec<Token>) -> Parser<'a> {
        Self {
            source_tokens: tokens,
            curr: 0,
        }
    }

    fn peek_prev(&self) -> &Token {
        &self.source_tokens[self.curr - 1]
    }

    fn peek(&self) -> &Token {
        &self.source_tokens[self.curr]
    }

    fn peek_next_i(&self, i: usize) -> &Token {
        if self.curr + i >= self.source_tokens.len() {
            self.source_tokens.last().unwrap() // Eof
        } else {
            &self.source_tokens[self.curr + i]
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            // Do not advance if we peek Eof
            self.curr += 1;
        }
        self.peek_prev()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenType::Eof
    }

    fn check_token_type(&self, token_type: TokenTypeVariant) -> bool {
        self.peek().kind.discriminant() == token_type
    }

    fn match_token_type(&mut self, token_type: TokenTypeVariant) -> bool {
        if self.check_token_type(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, token_type: TokenTypeVariant) -> anyhow::Result<&Token> {
        if self.check_token_type(token_type) {
            Ok(self.advance())
        } else {
            let err_msg = format!("Expected `{}`.", token_type.variant_str());
            Err(anyhow!(self.error(self.peek(), &err_msg)))
        }
    }

    fn check_identifier(&self) -> bool {
        self.check_token_type(TokenTypeVariant::Identifier)
            || self.check_token_type(TokenTypeVariant::QuotedIdentifier)
    }

    fn check_table_path_start(&self) -> bool {
        self.check_identifier() || self.check_token_type(TokenTypeVariant::Placeholder)
    }

    fn error(&self, token: &Token, message: &str) -> String {
        format!(
            "[line {}, col {}] Error {}: {}",
            token.line,
            token.col,
            &format!("at '{}'", token.lexeme),
            message
        )
    }

    /// Parse the script's statement sequence. A statement that cannot be
    /// classified is skipped to the next top-level `;` with a warning;
    /// the remaining statements still contribute to the provenance graph.
    pub fn parse_script(&mut self) -> Script {
        let mut statements = vec![];

        loop {
            if self.check_token_type(TokenTypeVariant::Eof) {
                break;
            }
            if self.match_token_type(TokenTypeVariant::Semicolon) {
                continue;
            }
            let stmt_token = self.peek().clone();
            match self.parse_statement() {
                Ok(Some(statement)) => {
                    statements.push(statement);
                }
                Ok(None) => {}
                Err(err) => {
                    log::warn!(
                        "Skipping statement at line {}: cannot classify it due to: {}",
                        stmt_token.line,
                        err
                    );
                }
            }
            self.synchronize();
        }

        Script { statements }
    }

    // Skip to just past the next top-level `;`.
    fn synchronize(&mut self) {
        let mut depth: u32 = 0;
        loop {
            if self.is_at_end() {
                break;
            }
            let token = self.advance();
            match token.kind {
                TokenType::LeftParen => depth += 1,
                TokenType::RightParen => depth = depth.saturating_sub(1),
                TokenType::Semicolon if depth == 0 => break,
                _ => {}
            }
        }
    }

    fn parse_statement(&mut self) -> anyhow::Result<Option<Statement>> {
        match self.peek().kind.discriminant() {
            TokenTypeVariant::Insert => Ok(Some(self.parse_insert()?)),
            TokenTypeVariant::Update => Ok(Some(self.parse_update()?)),
            TokenTypeVariant::Create => Ok(Some(self.parse_create_table()?)),
            TokenTypeVariant::Merge => Ok(Some(self.parse_merge()?)),
            TokenTypeVariant::Delete => Ok(Some(self.parse_delete()?)),
            TokenTypeVariant::Drop => Ok(Some(self.parse_drop_table()?)),
            // A bare SELECT writes nothing; it contributes no edges.
            TokenTypeVariant::Select | TokenTypeVariant::With => {
                log::debug!(
                    "Ignoring read-only statement at line {}",
                    self.peek().line
                );
                Ok(None)
            }
            _ => Err(anyhow!(self.error(
                self.peek(),
                "Statement does not start with a recognized BTEQ SQL form."
            ))),
        }
    }

    // insert -> "INSERT" "INTO" table_path [ "(" columns ")" ] (select | "VALUES" ...)
    fn parse_insert(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Insert)?;
        self.consume(TokenTypeVariant::Into)?;
        let target = self.parse_table_path()?;

        // Column list, but not a parenthesized SELECT.
        if self.check_token_type(TokenTypeVariant::LeftParen)
            && self.peek_next_i(1).kind.discriminant() != TokenTypeVariant::Select
        {
            self.skip_balanced_parens();
        }

        let sources = self.collect_query_sources();
        Ok(Statement::Insert(InsertStatement { target, sources }))
    }

    // update -> "UPDATE" table_path [alias] ["FROM" from_list] "SET" ...
    //
    // Teradata also accepts the alias form `UPDATE a FROM real_target a, ...`
    // where the bare update name is an alias bound in the FROM list; the
    // aliased path is the real write target then.
    fn parse_update(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Update)?;
        let mut target = self.parse_table_path()?;
        if self.check_identifier() {
            self.advance(); // target alias
        }

        let mut entries = vec![];
        if self.match_token_type(TokenTypeVariant::From) {
            self.collect_from_list_aliased(&mut entries);
        }
        if target.schema.is_none() {
            if let Some((path, _)) = entries.iter().find(|(_, alias)| {
                alias
                    .as_deref()
                    .is_some_and(|a| a.eq_ignore_ascii_case(&target.table))
            }) {
                target = path.clone();
            }
        }

        let mut sources: Vec<TablePath> = entries.into_iter().map(|(path, _)| path).collect();
        sources.extend(self.collect_query_sources());
        Ok(Statement::Update(UpdateStatement { target, sources }))
    }

    // create_table -> "CREATE" ["SET"|"MULTISET"] ["VOLATILE"|"GLOBAL" "TEMPORARY"]
    //                 "TABLE" table_path (["AS"] "(" select ")" | "AS" table_path | "(" columns ")") ...
    fn parse_create_table(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Create)?;
        self.match_token_type(TokenTypeVariant::Set);
        self.match_token_type(TokenTypeVariant::Multiset);
        let volatile = self.match_token_type(TokenTypeVariant::Volatile);
        if self.match_token_type(TokenTypeVariant::Global) {
            self.consume(TokenTypeVariant::Temporary)?;
        }
        self.match_token_type(TokenTypeVariant::Volatile);
        self.consume(TokenTypeVariant::Table)?;
        let target = self.parse_table_path()?;

        let mut sources = vec![];
        // CREATE TABLE t AS src WITH DATA: a direct table copy.
        if self.check_token_type(TokenTypeVariant::As) && self.peek_next_i(1).is_table_path_start()
        {
            self.advance();
            sources.push(self.parse_table_path()?);
        }
        sources.extend(self.collect_query_sources());
        Ok(Statement::CreateTable(CreateTableStatement {
            target,
            volatile,
            sources,
        }))
    }

    // merge -> "MERGE" ["INTO"] table_path [alias] "USING" source ...
    fn parse_merge(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Merge)?;
        self.match_token_type(TokenTypeVariant::Into);
        let target = self.parse_table_path()?;
        if self.match_token_type(TokenTypeVariant::As) {
            self.consume(TokenTypeVariant::Identifier)?;
        } else if self.check_identifier() {
            self.advance();
        }
        let sources = self.collect_query_sources();
        Ok(Statement::Merge(MergeStatement { target, sources }))
    }

    // delete -> "DELETE" ["FROM"] table_path ...
    fn parse_delete(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Delete)?;
        self.match_token_type(TokenTypeVariant::From);
        let target = self.parse_table_path()?;
        Ok(Statement::Delete(DeleteStatement { target }))
    }

    // drop_table -> "DROP" "TABLE" table_path
    fn parse_drop_table(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Drop)?;
        self.consume(TokenTypeVariant::Table)?;
        let target = self.parse_table_path()?;
        Ok(Statement::DropTable(DropTableStatement { target }))
    }

    // table_path -> (placeholder | identifier) "." identifier | identifier
    fn parse_table_path(&mut self) -> anyhow::Result<TablePath> {
        if self.check_token_type(TokenTypeVariant::Placeholder) {
            let placeholder = match &self.advance().kind {
                TokenType::Placeholder(name) => name.clone(),
                _ => unreachable!(),
            };
            self.consume(TokenTypeVariant::Dot)?;
            let table = self.parse_identifier()?;
            return Ok(TablePath {
                schema: Some(SchemaPart::Placeholder(placeholder)),
                table,
            });
        }

        let first = self.parse_identifier()?;
        if self.check_token_type(TokenTypeVariant::Dot) {
            self.advance();
            let table = self.parse_identifier()?;
            Ok(TablePath {
                schema: Some(SchemaPart::Named(first)),
                table,
            })
        } else {
            Ok(TablePath {
                schema: None,
                table: first,
            })
        }
    }

    fn parse_identifier(&mut self) -> anyhow::Result<String> {
        let token = self.peek();
        match &token.kind {
            TokenType::Identifier(ident) | TokenType::QuotedIdentifier(ident) => {
                let ident = ident.clone();
                self.advance();
                Ok(ident)
            }
            _ => Err(anyhow!(self.error(token, "Expected table identifier."))),
        }
    }

    fn skip_balanced_parens(&mut self) {
        let mut depth = 0;
        loop {
            if self.is_at_end() {
                break;
            }
            match self.advance().kind {
                TokenType::LeftParen => depth += 1,
                TokenType::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    /// Scan the remainder of the statement (up to the top-level `;`) and
    /// collect every table referenced on the read side: FROM lists, JOINs,
    /// MERGE USING sources, and subqueries at any nesting depth.
    ///
    /// FROM is only source-introducing in query context; within a
    /// parenthesized expression (EXTRACT(YEAR FROM x), SUBSTRING(x FROM 1))
    /// it is part of the expression and ignored. A paren group opens query
    /// context when it starts with SELECT (or a further paren, for grouped
    /// set operations).
    fn collect_query_sources(&mut self) -> Vec<TablePath> {
        let mut sources = vec![];
        // Context stack; base statement context is a query.
        let mut ctx_is_query = vec![true];

        loop {
            if self.is_at_end() {
                break;
            }
            match self.peek().kind.discriminant() {
                TokenTypeVariant::Semicolon => break,
                TokenTypeVariant::LeftParen => {
                    let next = self.peek_next_i(1).kind.discriminant();
                    ctx_is_query.push(
                        next == TokenTypeVariant::Select
                            || next == TokenTypeVariant::LeftParen
                            || next == TokenTypeVariant::With,
                    );
                    self.advance();
                }
                TokenTypeVariant::RightParen => {
                    if ctx_is_query.len() > 1 {
                        ctx_is_query.pop();
                    }
                    self.advance();
                }
                TokenTypeVariant::From if *ctx_is_query.last().unwrap() => {
                    self.advance();
                    self.collect_from_list(&mut sources);
                }
                TokenTypeVariant::Join | TokenTypeVariant::Using
                    if *ctx_is_query.last().unwrap() =>
                {
                    self.advance();
                    if self.check_table_path_start() {
                        if let Ok(path) = self.parse_table_path() {
                            sources.push(path);
                        }
                    }
                    // A `(` here is a derived table; the scan will enter it.
                }
                _ => {
                    self.advance();
                }
            }
        }

        sources
    }

    // from_list -> from_item ("," from_item)*
    // from_item -> table_path [["AS"] alias] | "(" ... (handled by the caller's scan)
    fn collect_from_list(&mut self, sources: &mut Vec<TablePath>) {
        let mut entries = vec![];
        self.collect_from_list_aliased(&mut entries);
        sources.extend(entries.into_iter().map(|(path, _)| path));
    }

    fn collect_from_list_aliased(&mut self, entries: &mut Vec<(TablePath, Option<String>)>) {
        loop {
            if !self.check_table_path_start() {
                // Derived table or expression; the outer scan handles it.
                break;
            }
            let path = match self.parse_table_path() {
                Ok(path) => path,
                Err(_) => break,
            };
            let mut alias = None;
            if self.match_token_type(TokenTypeVariant::As) {
                if self.check_identifier() {
                    alias = Some(self.parse_identifier().unwrap_or_default());
                }
            } else if self.check_identifier() {
                alias = Some(self.parse_identifier().unwrap_or_default());
            }
            entries.push((path, alias));
            if !self.match_token_type(TokenTypeVariant::Comma) {
                break;
            }
        }
    }
}

impl Token {
    fn is_table_path_start(&self) -> bool {
        matches!(
            self.kind,
            TokenType::Identifier(_) | TokenType::QuotedIdentifier(_) | TokenType::Placeholder(_)
        )
    }
}

/// Scan and parse a BTEQ script into its classified statement sequence.
pub fn parse_script(sql: &str) -> anyhow::Result<Script> {
    let mut scanner = Scanner::new(sql);
    scanner.scan()?;
    let mut parser = Parser::new(scanner.tokens());
    Ok(parser.parse_script())
}
