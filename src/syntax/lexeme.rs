use num_bigint::BigInt;

/// All lexemes in the CoinScript language.
#[derive(Clone, Debug, PartialEq)]
pub enum Lexeme {
    // Keywords
    Coin,
    Storage,
    State,
    Action,
    Event,
    Const,
    Function,
    Inline,
    Modifier,
    Let,
    If,
    Else,
    Require,
    Exception,
    Emit,
    Send,
    Return,
    True,
    False,

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Comma,     // ,
    Colon,     // :
    Semicolon, // ;
    Dot,       // .
    At,        // @
    Arrow,     // ->

    // Operators
    Eq,        // =
    EqEq,      // ==
    NotEq,     // !=
    Lt,        // <
    Gt,        // >
    LtEq,      // <=
    GtEq,      // >=
    StrGt,     // >s
    AndAnd,    // &&
    OrOr,      // ||
    Bang,      // !
    Tilde,     // ~
    Amp,       // &
    Pipe,      // |
    Caret,     // ^
    Shl,       // <<
    Shr,       // >>
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Percent,   // %
    PlusEq,    // +=
    MinusEq,   // -=
    StarEq,    // *=
    SlashEq,   // /=
    PercentEq, // %=

    // Literals
    Integer(BigInt),
    Hex(Vec<u8>),
    Str(String),
    Ident(String),

    // End of file
    Eof,
}

impl Lexeme {
    /// Try to match an identifier string to a keyword lexeme.
    pub fn from_keyword(s: &str) -> Option<Lexeme> {
        match s {
            "coin" => Some(Lexeme::Coin),
            "storage" => Some(Lexeme::Storage),
            "state" => Some(Lexeme::State),
            "action" => Some(Lexeme::Action),
            "event" => Some(Lexeme::Event),
            "const" => Some(Lexeme::Const),
            "function" => Some(Lexeme::Function),
            "inline" => Some(Lexeme::Inline),
            "modifier" => Some(Lexeme::Modifier),
            "let" => Some(Lexeme::Let),
            "if" => Some(Lexeme::If),
            "else" => Some(Lexeme::Else),
            "require" => Some(Lexeme::Require),
            "exception" => Some(Lexeme::Exception),
            "emit" => Some(Lexeme::Emit),
            "send" => Some(Lexeme::Send),
            "return" => Some(Lexeme::Return),
            "true" => Some(Lexeme::True),
            "false" => Some(Lexeme::False),
            _ => None,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Lexeme::Coin => "'coin'".into(),
            Lexeme::Storage => "'storage'".into(),
            Lexeme::State => "'state'".into(),
            Lexeme::Action => "'action'".into(),
            Lexeme::Event => "'event'".into(),
            Lexeme::Const => "'const'".into(),
            Lexeme::Function => "'function'".into(),
            Lexeme::Inline => "'inline'".into(),
            Lexeme::Modifier => "'modifier'".into(),
            Lexeme::Let => "'let'".into(),
            Lexeme::If => "'if'".into(),
            Lexeme::Else => "'else'".into(),
            Lexeme::Require => "'require'".into(),
            Lexeme::Exception => "'exception'".into(),
            Lexeme::Emit => "'emit'".into(),
            Lexeme::Send => "'send'".into(),
            Lexeme::Return => "'return'".into(),
            Lexeme::True => "'true'".into(),
            Lexeme::False => "'false'".into(),
            Lexeme::LParen => "'('".into(),
            Lexeme::RParen => "')'".into(),
            Lexeme::LBrace => "'{'".into(),
            Lexeme::RBrace => "'}'".into(),
            Lexeme::LBracket => "'['".into(),
            Lexeme::RBracket => "']'".into(),
            Lexeme::Comma => "','".into(),
            Lexeme::Colon => "':'".into(),
            Lexeme::Semicolon => "';'".into(),
            Lexeme::Dot => "'.'".into(),
            Lexeme::At => "'@'".into(),
            Lexeme::Arrow => "'->'".into(),
            Lexeme::Eq => "'='".into(),
            Lexeme::EqEq => "'=='".into(),
            Lexeme::NotEq => "'!='".into(),
            Lexeme::Lt => "'<'".into(),
            Lexeme::Gt => "'>'".into(),
            Lexeme::LtEq => "'<='".into(),
            Lexeme::GtEq => "'>='".into(),
            Lexeme::StrGt => "'>s'".into(),
            Lexeme::AndAnd => "'&&'".into(),
            Lexeme::OrOr => "'||'".into(),
            Lexeme::Bang => "'!'".into(),
            Lexeme::Tilde => "'~'".into(),
            Lexeme::Amp => "'&'".into(),
            Lexeme::Pipe => "'|'".into(),
            Lexeme::Caret => "'^'".into(),
            Lexeme::Shl => "'<<'".into(),
            Lexeme::Shr => "'>>'".into(),
            Lexeme::Plus => "'+'".into(),
            Lexeme::Minus => "'-'".into(),
            Lexeme::Star => "'*'".into(),
            Lexeme::Slash => "'/'".into(),
            Lexeme::Percent => "'%'".into(),
            Lexeme::PlusEq => "'+='".into(),
            Lexeme::MinusEq => "'-='".into(),
            Lexeme::StarEq => "'*='".into(),
            Lexeme::SlashEq => "'/='".into(),
            Lexeme::PercentEq => "'%='".into(),
            Lexeme::Integer(n) => format!("integer {}", n),
            Lexeme::Hex(_) => "hex literal".into(),
            Lexeme::Str(_) => "string literal".into(),
            Lexeme::Ident(name) => format!("identifier '{}'", name),
            Lexeme::Eof => "end of file".into(),
        }
    }

    /// Whether this lexeme is a compound-assignment operator.
    pub fn is_assign_op(&self) -> bool {
        matches!(
            self,
            Lexeme::Eq
                | Lexeme::PlusEq
                | Lexeme::MinusEq
                | Lexeme::StarEq
                | Lexeme::SlashEq
                | Lexeme::PercentEq
        )
    }
}
