use serde::{Deserialize, Serialize};
use std::fmt::Display;
use strum_macros::EnumDiscriminants;

#[derive(PartialEq, Clone, Debug, EnumDiscriminants, Serialize, Deserialize)]
#[strum_discriminants(name(TokenTypeVariant))]
pub enum TokenType {
    LeftParen,
    RightParen,
    Comma,
    Dot,
    Minus,
    Plus,
    Colon,
    Semicolon,
    Slash,
    Star,
    ConcatOperator,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Identifier(String),
    QuotedIdentifier(String),
    Placeholder(String),
    String(String),
    Number(String),
    Eof,

    // Reserved keywords
    All,
    And,
    As,
    By,
    Case,
    Create,
    Cross,
    Data,
    Delete,
    Distinct,
    Drop,
    End,
    From,
    Full,
    Global,
    Group,
    Having,
    Inner,
    Insert,
    Into,
    Join,
    Left,
    Matched,
    Merge,
    Multiset,
    Not,
    On,
    Or,
    Order,
    Outer,
    Qualify,
    Right,
    Select,
    Set,
    Table,
    Temporary,
    Then,
    Union,
    Update,
    Using,
    Values,
    Volatile,
    When,
    Where,
    With,
}

impl TokenTypeVariant {
    pub(crate) fn variant_str(&self) -> &str {
        match self {
            TokenTypeVariant::LeftParen => "(",
            TokenTypeVariant::RightParen => ")",
            TokenTypeVariant::Comma => ",",
            TokenTypeVariant::Dot => ".",
            TokenTypeVariant::Minus => "-",
            TokenTypeVariant::Plus => "+",
            TokenTypeVariant::Colon => ":",
            TokenTypeVariant::Semicolon => ";",
            TokenTypeVariant::Slash => "/",
            TokenTypeVariant::Star => "*",
            TokenTypeVariant::ConcatOperator => "||",
            TokenTypeVariant::Equal => "=",
            TokenTypeVariant::NotEqual => "<>",
            TokenTypeVariant::Greater => ">",
            TokenTypeVariant::GreaterEqual => ">=",
            TokenTypeVariant::Less => "<",
            TokenTypeVariant::LessEqual => "<=",
            TokenTypeVariant::Identifier => "Identifier",
            TokenTypeVariant::QuotedIdentifier => "Quoted Identifier",
            TokenTypeVariant::Placeholder => "Placeholder",
            TokenTypeVariant::String => "String",
            TokenTypeVariant::Number => "Number",
            TokenTypeVariant::Eof => "Eof",
            TokenTypeVariant::All => "ALL",
            TokenTypeVariant::And => "AND",
            TokenTypeVariant::As => "AS",
            TokenTypeVariant::By => "BY",
            TokenTypeVariant::Case => "CASE",
            TokenTypeVariant::Create => "CREATE",
            TokenTypeVariant::Cross => "CROSS",
            TokenTypeVariant::Data => "DATA",
            TokenTypeVariant::Delete => "DELETE",
            TokenTypeVariant::Distinct => "DISTINCT",
            TokenTypeVariant::Drop => "DROP",
            TokenTypeVariant::End => "END",
            TokenTypeVariant::From => "FROM",
            TokenTypeVariant::Full => "FULL",
            TokenTypeVariant::Global => "GLOBAL",
            TokenTypeVariant::Group => "GROUP",
            TokenTypeVariant::Having => "HAVING",
            TokenTypeVariant::Inner => "INNER",
            TokenTypeVariant::Insert => "INSERT",
            TokenTypeVariant::Into => "INTO",
            TokenTypeVariant::Join => "JOIN",
            TokenTypeVariant::Left => "LEFT",
            TokenTypeVariant::Matched => "MATCHED",
            TokenTypeVariant::Merge => "MERGE",
            TokenTypeVariant::Multiset => "MULTISET",
            TokenTypeVariant::Not => "NOT",
            TokenTypeVariant::On => "ON",
            TokenTypeVariant::Or => "OR",
            TokenTypeVariant::Order => "ORDER",
            TokenTypeVariant::Outer => "OUTER",
            TokenTypeVariant::Qualify => "QUALIFY",
            TokenTypeVariant::Right => "RIGHT",
            TokenTypeVariant::Select => "SELECT",
            TokenTypeVariant::Set => "SET",
            TokenTypeVariant::Table => "TABLE",
            TokenTypeVariant::Temporary => "TEMPORARY",
            TokenTypeVariant::Then => "THEN",
            TokenTypeVariant::Union => "UNION",
            TokenTypeVariant::Update => "UPDATE",
            TokenTypeVariant::Using => "USING",
            TokenTypeVariant::Values => "VALUES",
            TokenTypeVariant::Volatile => "VOLATILE",
            TokenTypeVariant::When => "WHEN",
            TokenTypeVariant::Where => "WHERE",
            TokenTypeVariant::With => "WITH",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenType,
    pub lexeme: String,
    pub line: u32,
    pub col: u32,
}

/// Schema portion of a table path as written in the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaPart {
    /// `${NAME}.table` or `{NAME}.table`
    Placeholder(String),
    /// `schema.table`
    Named(String),
}

impl SchemaPart {
    pub fn name(&self) -> &str {
        match self {
            SchemaPart::Placeholder(name) | SchemaPart::Named(name) => name,
        }
    }
}

/// A table path as it appears in a statement, e.g. `${EDW_DB}.SALES_FCT`
/// or a bare `VT_SALES`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePath {
    pub schema: Option<SchemaPart>,
    pub table: String,
}

impl Display for TablePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(SchemaPart::Placeholder(name)) => write!(f, "${{{}}}.{}", name, self.table),
            Some(SchemaPart::Named(name)) => write!(f, "{}.{}", name, self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    Insert(InsertStatement),
    Update(UpdateStatement),
    CreateTable(CreateTableStatement),
    Merge(MergeStatement),
    Delete(DeleteStatement),
    DropTable(DropTableStatement),
}

impl Statement {
    /// The table this statement writes to, if any.
    pub fn write_target(&self) -> Option<&TablePath> {
        match self {
            Statement::Insert(stmt) => Some(&stmt.target),
            Statement::Update(stmt) => Some(&stmt.target),
            Statement::CreateTable(stmt) => Some(&stmt.target),
            Statement::Merge(stmt) => Some(&stmt.target),
            Statement::Delete(_) | Statement::DropTable(_) => None,
        }
    }

    /// The tables this statement reads from.
    pub fn read_sources(&self) -> &[TablePath] {
        match self {
            Statement::Insert(stmt) => &stmt.sources,
            Statement::Update(stmt) => &stmt.sources,
            Statement::CreateTable(stmt) => &stmt.sources,
            Statement::Merge(stmt) => &stmt.sources,
            Statement::Delete(_) | Statement::DropTable(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertStatement {
    pub target: TablePath,
    pub sources: Vec<TablePath>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub target: TablePath,
    pub sources: Vec<TablePath>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTableStatement {
    pub target: TablePath,
    pub volatile: bool,
    pub sources: Vec<TablePath>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeStatement {
    pub target: TablePath,
    pub sources: Vec<TablePath>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub target: TablePath,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropTableStatement {
    pub target: TablePath,
}

/// A parsed BTEQ script: the sequence of SQL statements that survived
/// classification. Statements the parser could not classify are skipped
/// with a warning and do not appear here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub statements: Vec<Statement>,
}
