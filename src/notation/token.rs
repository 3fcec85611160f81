//! Token types shared by the cell tokenizer, the symbol classifier and the parser.

use std::fmt;

use super::symbol::{Family, NoteSymbol};

/// The kind of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Header keywords and punctuation
    Name,
    Identifier,
    Colon,
    Semicolon,
    Period,
    Meter,
    Instrument,
    EndOfPartition,

    // Clefs
    ClefSol,
    ClefFa,

    // Music symbols
    Note,
    Pause,
    HalfPause,
    AlterationSharp,
    AlterationFlat,
    MeasureBar,
    EndStaffBar,

    // Special
    Unknown,
}

/// Legacy keyword codes and the kinds they stand for.
const LEGACY_CODES: [(&str, TokenKind); 17] = [
    ("TOKEN_INCONNU", TokenKind::Unknown),
    ("TOKEN_EO_PARTITION", TokenKind::EndOfPartition),
    ("TOKEN_NOM", TokenKind::Name),
    ("TOKEN_ID", TokenKind::Identifier),
    ("TOKEN_INSTRUMENT", TokenKind::Instrument),
    ("TOKEN_DP", TokenKind::Colon),
    ("TOKEN_PV", TokenKind::Semicolon),
    ("TOKEN_PT", TokenKind::Period),
    ("TOKEN_METER", TokenKind::Meter),
    ("TOKEN_CLE_SOL", TokenKind::ClefSol),
    ("TOKEN_CLE_FA", TokenKind::ClefFa),
    ("TOKEN_PAUSE", TokenKind::Pause),
    ("TOKEN_DEMI_PAUSE", TokenKind::HalfPause),
    ("TOKEN_ALT_BEMOL", TokenKind::AlterationFlat),
    ("TOKEN_ALT_DIESE", TokenKind::AlterationSharp),
    ("TOKEN_BATON_MESURE", TokenKind::MeasureBar),
    ("TOKEN_BATON_FIN_PORTEE", TokenKind::EndStaffBar),
];

impl TokenKind {
    /// Upper-case name used in diagnostics. Rests are emitted under this name.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Name => "NAME",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Colon => "COLON",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Period => "PERIOD",
            TokenKind::Meter => "METER",
            TokenKind::Instrument => "INSTRUMENT",
            TokenKind::EndOfPartition => "END_OF_PARTITION",
            TokenKind::ClefSol => "CLEF_SOL",
            TokenKind::ClefFa => "CLEF_FA",
            TokenKind::Note => "NOTE",
            TokenKind::Pause => "PAUSE",
            TokenKind::HalfPause => "HALF_PAUSE",
            TokenKind::AlterationSharp => "ALTERATION_SHARP",
            TokenKind::AlterationFlat => "ALTERATION_FLAT",
            TokenKind::MeasureBar => "MEASURE_BAR",
            TokenKind::EndStaffBar => "END_STAFF_BAR",
            TokenKind::Unknown => "UNKNOWN",
        }
    }

    /// The legacy keyword code for this kind. Notes have no single code.
    pub fn code(self) -> Option<&'static str> {
        LEGACY_CODES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(code, _)| *code)
    }

    /// Map a legacy keyword code (e.g. `TOKEN_CLE_SOL`) to its kind.
    ///
    /// Anything carrying a note-family prefix (`SOL_TOKEN…`, `FA_TOKEN…`) is a
    /// note whatever the suffix; anything else unrecognised is `Unknown`.
    pub fn from_code(code: &str) -> Self {
        if let Some((_, kind)) = LEGACY_CODES.iter().find(|(c, _)| *c == code) {
            return *kind;
        }
        if Family::ALL.iter().any(|f| code.starts_with(f.prefix())) {
            return TokenKind::Note;
        }
        TokenKind::Unknown
    }

    /// Whether a symbol (note, accidental or rest) can start with this kind.
    pub fn starts_symbol(self) -> bool {
        matches!(
            self,
            TokenKind::AlterationSharp
                | TokenKind::AlterationFlat
                | TokenKind::Note
                | TokenKind::Pause
                | TokenKind::HalfPause
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Staff clef context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Clef {
    #[default]
    None,
    /// Clé de sol.
    Treble,
    /// Clé de fa.
    Bass,
}

/// Accidental applied to the next pitch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Alteration {
    #[default]
    None,
    Sharp,
    Flat,
}

/// Payload carried by a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// Identifier text, or the offending character of an unknown token.
    Text(String),
    /// Meter value.
    Number(u32),
    /// A resolved note.
    Note(NoteSymbol),
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::Text(s) => f.write_str(s),
            TokenValue::Number(n) => write!(f, "{n}"),
            TokenValue::Note(note) => write!(f, "{note}"),
        }
    }
}

/// A token, stamped with the clef and alteration in effect when it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: Option<TokenValue>,
    pub clef: Clef,
    pub alteration: Alteration,
}

impl Token {
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            value: None,
            clef: Clef::None,
            alteration: Alteration::None,
        }
    }

    pub fn with_value(kind: TokenKind, value: TokenValue) -> Self {
        Self {
            value: Some(value),
            ..Self::new(kind)
        }
    }

    /// Stamp the clef/alteration context onto the token.
    pub fn in_context(mut self, clef: Clef, alteration: Alteration) -> Self {
        self.clef = clef;
        self.alteration = alteration;
        self
    }

    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Some(TokenValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self) -> Option<u32> {
        match self.value {
            Some(TokenValue::Number(n)) => Some(n),
            _ => None,
        }
    }

    pub fn note(&self) -> Option<&NoteSymbol> {
        match &self.value {
            Some(TokenValue::Note(note)) => Some(note),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "Token({}, {value})", self.kind),
            None => write!(f, "Token({})", self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_keyword_codes() {
        assert_eq!(TokenKind::from_code("TOKEN_NOM"), TokenKind::Name);
        assert_eq!(TokenKind::from_code("TOKEN_DP"), TokenKind::Colon);
        assert_eq!(TokenKind::from_code("TOKEN_CLE_FA"), TokenKind::ClefFa);
        assert_eq!(TokenKind::from_code("TOKEN_ALT_DIESE"), TokenKind::AlterationSharp);
        assert_eq!(TokenKind::from_code("TOKEN_ALT_BEMOL"), TokenKind::AlterationFlat);
        assert_eq!(
            TokenKind::from_code("TOKEN_BATON_FIN_PORTEE"),
            TokenKind::EndStaffBar
        );
        assert_eq!(TokenKind::from_code("TOKEN_INCONNU"), TokenKind::Unknown);
    }

    #[test]
    fn note_prefixes_map_to_note_whatever_the_suffix() {
        assert_eq!(TokenKind::from_code("SOL_TOKEN_DO_H"), TokenKind::Note);
        assert_eq!(TokenKind::from_code("FA_TOKEN_RE_L_BEMOL"), TokenKind::Note);
        assert_eq!(TokenKind::from_code("FA_TOKEN"), TokenKind::Note);
        assert_eq!(TokenKind::from_code("SOL_TOKEN_NOT_A_PITCH"), TokenKind::Note);
    }

    #[test]
    fn unrecognised_codes_are_unknown() {
        assert_eq!(TokenKind::from_code(""), TokenKind::Unknown);
        assert_eq!(TokenKind::from_code("token_nom"), TokenKind::Unknown);
        assert_eq!(TokenKind::from_code("LA_TOKEN_DO"), TokenKind::Unknown);
    }

    #[test]
    fn code_round_trips_for_keywords() {
        for (code, kind) in LEGACY_CODES {
            assert_eq!(kind.code(), Some(code));
            assert_eq!(TokenKind::from_code(code), kind);
        }
        assert_eq!(TokenKind::Note.code(), None);
    }

    #[test]
    fn rest_names() {
        assert_eq!(TokenKind::Pause.name(), "PAUSE");
        assert_eq!(TokenKind::HalfPause.to_string(), "HALF_PAUSE");
    }

    #[test]
    fn token_display() {
        assert_eq!(Token::new(TokenKind::Colon).to_string(), "Token(COLON)");
        let id = Token::with_value(TokenKind::Identifier, TokenValue::Text("Piano".into()));
        assert_eq!(id.to_string(), "Token(IDENTIFIER, Piano)");
        assert_eq!(id.text(), Some("Piano"));
        assert_eq!(id.number(), None);
    }

    #[test]
    fn context_defaults_to_none() {
        let t = Token::new(TokenKind::Pause);
        assert_eq!(t.clef, Clef::None);
        assert_eq!(t.alteration, Alteration::None);
        let t = t.in_context(Clef::Bass, Alteration::Flat);
        assert_eq!(t.clef, Clef::Bass);
        assert_eq!(t.alteration, Alteration::Flat);
    }
}
