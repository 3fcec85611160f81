//! Notation grammar: sheet cells → tokens → partition → FA/SOL note sequences.

pub mod classifier;
pub mod error;
pub mod parser;
pub mod source;
pub mod symbol;
pub mod token;

pub use classifier::{ClassifierState, SymbolClassifier};
pub use error::{ParseError, ParseErrorKind};
pub use parser::{MeterWarning, NotationParser, ParsedScore};
pub use source::{CellSource, CellTokenizer, ImageHandle, KnownSymbols, SymbolMatcher, TokenSource};
pub use symbol::{lookup, Family, NoteSymbol, PitchPosition, ReferenceSymbol};
pub use token::{Alteration, Clef, Token, TokenKind, TokenValue};

/// The notation front end.
///
/// Reads cells through a tokenizer that classifies images with `matcher`,
/// then runs the partition grammar over the resulting token stream.
pub struct Notation;

impl Notation {
    /// Parse any cell source.
    pub fn parse<S, M>(cells: S, matcher: M) -> Result<ParsedScore, ParseError>
    where
        S: CellSource,
        M: SymbolMatcher,
    {
        let mut parser = NotationParser::new(CellTokenizer::new(cells, matcher));
        parser.parse()
    }

    /// Parse a loaded sheet.
    pub fn parse_sheet<M: SymbolMatcher>(
        sheet: crate::sheet::Sheet,
        matcher: M,
    ) -> Result<ParsedScore, ParseError> {
        Self::parse(sheet, matcher)
    }
}
