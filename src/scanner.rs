use anyhow::anyhow;

use crate::ast::{Token, TokenType};

// BTEQ commands that can open a control directive line.
const DIRECTIVES: &[&str] = &[
    "compile",
    "errorlevel",
    "exit",
    "export",
    "goto",
    "help",
    "if",
    "import",
    "label",
    "logoff",
    "logon",
    "logtable",
    "os",
    "quit",
    "remark",
    "repeat",
    "run",
    "session",
    "sessions",
    "set",
    "severity",
    "show",
    "sidetitles",
    "width",
];

pub struct Scanner {
    source_chars: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: u32,
    col: u32,
    line_has_token: bool,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            source_chars: source.chars().collect(),
            tokens: vec![],
            start: 0,
            current: 0,
            line: 1,
            col: 0,
            line_has_token: false,
        }
    }

    pub fn tokens(&self) -> &Vec<Token> {
        &self.tokens
    }

    fn advance(&mut self) -> char {
        let c = self.source_chars[self.current];
        self.current += 1;
        self.col += 1;
        c
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source_chars.len()
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source_chars[self.current]
        }
    }

    fn peek_next_i(&self, i: usize) -> char {
        if self.current + i >= self.source_chars.len() {
            '\0'
        } else {
            self.source_chars[self.current + i]
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() != expected {
            return false;
        };

        self.current += 1;
        self.col += 1;
        true
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.tokens.push(Token {
            kind: token_type,
            lexeme: self.source_chars[self.start..self.current].iter().collect(),
            line: self.line,
            col: self.col,
        });
        self.line_has_token = true;
    }

    fn current_source_str(&self) -> String {
        self.source_chars[self.start..self.current].iter().collect()
    }

    fn reset(&mut self) {
        self.tokens.clear();
        self.start = 0;
        self.current = 0;
        self.col = 1;
        self.line = 1;
        self.line_has_token = false;
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.col = 1;
        self.line_has_token = false;
    }

    pub fn scan(&mut self) -> anyhow::Result<()> {
        self.reset();
        while self.current < self.source_chars.len() {
            self.start = self.current;
            self.scan_token()?;
        }
        self.tokens.push(Token {
            kind: TokenType::Eof,
            lexeme: String::from("eof"),
            line: self.line,
            col: self.col,
        });

        Ok(())
    }

    fn directive_follows(&self) -> bool {
        let mut word = String::new();
        let mut i = 0;
        loop {
            let c = self.peek_next_i(i);
            if !c.is_alphabetic() {
                break;
            }
            word.push(c.to_ascii_lowercase());
            i += 1;
        }
        DIRECTIVES.contains(&word.as_str())
    }

    fn skip_to_end_of_line(&mut self) {
        loop {
            let peek_char = self.peek();
            if peek_char == '\n' || peek_char == '\0' {
                break;
            }
            self.advance();
        }
    }

    fn scan_string(&mut self, delimiter: char) -> anyhow::Result<()> {
        loop {
            let peek_char = self.peek();
            if peek_char == '\0' {
                return Err(anyhow!(self.error_str("Found unterminated string")));
            }
            if peek_char == '\n' {
                self.new_line();
            }
            if self.match_char(delimiter) {
                // Teradata escapes a quote by doubling it
                if self.peek() == delimiter {
                    self.advance();
                    continue;
                }
                break;
            }
            self.advance();
        }
        let str_slice = self.source_chars[self.start + 1..self.current - 1]
            .iter()
            .collect::<String>();
        self.add_token(TokenType::String(str_slice));
        Ok(())
    }

    fn match_number(&mut self) {
        let mut found_dot = false;
        loop {
            let peek_char = self.peek();
            if peek_char == '.' && !found_dot && self.peek_next_i(1).is_ascii_digit() {
                found_dot = true;
                self.advance();
            } else if peek_char.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        self.add_token(TokenType::Number(self.current_source_str()));
    }

    // ${NAME} or {NAME}; the opening delimiter has already been consumed.
    // The name is a single identifier, so a missing `}` is caught here
    // instead of at whatever `}` appears later in the script.
    fn match_placeholder(&mut self) -> anyhow::Result<()> {
        let name_start = self.current;
        loop {
            let peek_char = self.peek();
            if peek_char == '}' {
                break;
            }
            if !(peek_char.is_alphanumeric() || peek_char == '_') {
                return Err(anyhow!(
                    self.error_str("Found unterminated schema placeholder")
                ));
            }
            self.advance();
        }
        let name = self.source_chars[name_start..self.current]
            .iter()
            .collect::<String>();
        self.advance(); // closing `}`
        if name.is_empty() {
            return Err(anyhow!(self.error_str("Found empty schema placeholder")));
        }
        self.add_token(TokenType::Placeholder(name));
        Ok(())
    }

    fn match_keyword_or_identifier(&mut self) {
        loop {
            let peek_char = self.peek();
            if !(peek_char.is_alphanumeric() || peek_char == '_' || peek_char == '$') {
                break;
            }
            self.advance();
        }
        let identifier: String = self.source_chars[self.start..self.current].iter().collect();

        match identifier.to_lowercase().as_str() {
            "all" => self.add_token(TokenType::All),
            "and" => self.add_token(TokenType::And),
            "as" => self.add_token(TokenType::As),
            "by" => self.add_token(TokenType::By),
            "case" => self.add_token(TokenType::Case),
            "create" => self.add_token(TokenType::Create),
            "cross" => self.add_token(TokenType::Cross),
            "data" => self.add_token(TokenType::Data),
            "del" | "delete" => self.add_token(TokenType::Delete),
            "distinct" => self.add_token(TokenType::Distinct),
            "drop" => self.add_token(TokenType::Drop),
            "end" => self.add_token(TokenType::End),
            "from" => self.add_token(TokenType::From),
            "full" => self.add_token(TokenType::Full),
            "global" => self.add_token(TokenType::Global),
            "group" => self.add_token(TokenType::Group),
            "having" => self.add_token(TokenType::Having),
            "inner" => self.add_token(TokenType::Inner),
            "ins" | "insert" => self.add_token(TokenType::Insert),
            "into" => self.add_token(TokenType::Into),
            "join" => self.add_token(TokenType::Join),
            "left" => self.add_token(TokenType::Left),
            "matched" => self.add_token(TokenType::Matched),
            "merge" => self.add_token(TokenType::Merge),
            "multiset" => self.add_token(TokenType::Multiset),
            "not" => self.add_token(TokenType::Not),
            "on" => self.add_token(TokenType::On),
            "or" => self.add_token(TokenType::Or),
            "order" => self.add_token(TokenType::Order),
            "outer" => self.add_token(TokenType::Outer),
            "qualify" => self.add_token(TokenType::Qualify),
            "right" => self.add_token(TokenType::Right),
            // BTEQ accepts the SEL abbreviation
            "sel" | "select" => self.add_token(TokenType::Select),
            "set" => self.add_token(TokenType::Set),
            "table" => self.add_token(TokenType::Table),
            "temporary" => self.add_token(TokenType::Temporary),
            "then" => self.add_token(TokenType::Then),
            "union" => self.add_token(TokenType::Union),
            "update" | "upd" => self.add_token(TokenType::Update),
            "using" => self.add_token(TokenType::Using),
            "values" => self.add_token(TokenType::Values),
            "volatile" => self.add_token(TokenType::Volatile),
            "when" => self.add_token(TokenType::When),
            "where" => self.add_token(TokenType::Where),
            "with" => self.add_token(TokenType::With),
            _ => self.add_token(TokenType::Identifier(self.current_source_str())),
        }
    }

    fn scan_token(&mut self) -> anyhow::Result<()> {
        let curr_char = self.advance();
        match curr_char {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '*' => self.add_token(TokenType::Star),
            ',' => self.add_token(TokenType::Comma),
            ':' => self.add_token(TokenType::Colon),
            ';' => self.add_token(TokenType::Semicolon),
            '.' => {
                // A dot opening a line is a BTEQ control directive
                // (.LOGON, .IF ERRORCODE <> 0 THEN .QUIT, .LABEL, ...)
                // and runs to end of line. A qualified name continued onto
                // a new line (`INSERT INTO db\n.tbl`) also opens with a
                // dot, so the word after it must match a BTEQ command.
                if !self.line_has_token && self.directive_follows() {
                    self.skip_to_end_of_line();
                } else if self.peek().is_ascii_digit() {
                    self.match_number();
                } else {
                    self.add_token(TokenType::Dot);
                }
            }
            '+' => self.add_token(TokenType::Plus),
            '=' => self.add_token(TokenType::Equal),
            '/' => {
                if self.match_char('*') {
                    loop {
                        if self.peek() == '\0' {
                            return Err(anyhow!(self.error_str("Found unterminated comment")));
                        }
                        if self.peek() == '\n' {
                            self.new_line();
                        }
                        if self.peek() == '*' && self.peek_next_i(1) == '/' {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash)
                }
            }
            '-' => {
                if self.match_char('-') {
                    self.skip_to_end_of_line();
                } else {
                    self.add_token(TokenType::Minus)
                }
            }
            '<' => {
                if self.match_char('>') {
                    self.add_token(TokenType::NotEqual);
                } else if self.match_char('=') {
                    self.add_token(TokenType::LessEqual);
                } else {
                    self.add_token(TokenType::Less);
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.add_token(TokenType::GreaterEqual);
                } else {
                    self.add_token(TokenType::Greater);
                }
            }
            '|' => {
                if self.match_char('|') {
                    self.add_token(TokenType::ConcatOperator);
                } else {
                    return Err(anyhow!(self.error_str("Found lone `|`")));
                }
            }
            '\n' => {
                self.new_line();
            }
            '\r' | ' ' | '\t' => {}

            '\'' => {
                self.scan_string('\'')?;
            }

            // Standard SQL double-quoted identifier
            '"' => {
                loop {
                    let peek_char = self.peek();
                    if peek_char == '\0' {
                        return Err(anyhow!(
                            self.error_str("Found unterminated quoted identifier")
                        ));
                    }
                    if self.match_char('"') {
                        break;
                    }
                    self.advance();
                }
                let ident = self.source_chars[self.start + 1..self.current - 1]
                    .iter()
                    .collect::<String>();
                if ident.is_empty() {
                    return Err(anyhow!(self.error_str("Found empty quoted identifier")));
                }
                self.add_token(TokenType::QuotedIdentifier(ident));
            }

            '$' => {
                if self.match_char('{') {
                    self.match_placeholder()?;
                } else {
                    // $var identifiers exist in Teradata; treat as identifier
                    self.match_keyword_or_identifier();
                }
            }

            '{' => self.match_placeholder()?,

            c if c.is_ascii_digit() => {
                self.match_number();
            }

            c if c.is_alphabetic() || c == '_' => {
                self.match_keyword_or_identifier();
            }

            '?' => {
                // Bind parameter marker; no token needed for lineage.
            }

            _ => {
                return Err(anyhow!(self.error_str(&format!(
                    "Found unexpected character while scanning: {}",
                    curr_char
                ))));
            }
        }
        Ok(())
    }

    fn error_str(&mut self, error: &str) -> String {
        format!(
            "[line: {}, col: {}] Scanner error: {}",
            self.line, self.col, error
        )
    }
}
