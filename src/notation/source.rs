//! Token source: pulls one token at a time out of a grid of cells.
//!
//! Text cells are lexed character by character; image cells go through a
//! [`SymbolMatcher`] and the [`SymbolClassifier`]. The parser only ever sees
//! the resulting [`Token`]s, one at a time.

use std::path::PathBuf;

use tracing::{debug, warn};

use super::classifier::SymbolClassifier;
use super::symbol::ReferenceSymbol;
use super::token::{Token, TokenKind, TokenValue};

/// A picture extracted from a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageHandle {
    /// Image file on disk, to be matched against the reference set.
    File(PathBuf),
    /// A cell already identified as a reference symbol.
    Known(ReferenceSymbol),
}

/// Cursor over the cells of a score.
pub trait CellSource {
    /// Whether the current cell holds text.
    fn has_text(&self) -> bool;

    /// Whether the current cell holds an image.
    fn has_image(&self) -> bool;

    /// Next character of the current text cell. `None` marks the end of the
    /// cell's text; the cursor has then moved on to the next cell.
    fn next_char(&mut self) -> Option<char>;

    /// Extract the current cell's image and move to the next cell.
    fn take_image(&mut self) -> Option<ImageHandle>;

    /// Move past the current cell.
    fn skip_cell(&mut self);

    /// Whether every cell has been consumed.
    fn is_exhausted(&self) -> bool;

    /// Move back to the first cell.
    fn rewind(&mut self);
}

/// Nearest-reference classification of cell images.
pub trait SymbolMatcher {
    fn best_match(&self, image: &ImageHandle) -> Option<ReferenceSymbol>;
}

impl<M: SymbolMatcher + ?Sized> SymbolMatcher for Box<M> {
    fn best_match(&self, image: &ImageHandle) -> Option<ReferenceSymbol> {
        (**self).best_match(image)
    }
}

impl<M: SymbolMatcher + ?Sized> SymbolMatcher for &M {
    fn best_match(&self, image: &ImageHandle) -> Option<ReferenceSymbol> {
        (**self).best_match(image)
    }
}

/// Matcher for sheets with no reference images: only pre-identified cells
/// match, image files never do.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnownSymbols;

impl SymbolMatcher for KnownSymbols {
    fn best_match(&self, image: &ImageHandle) -> Option<ReferenceSymbol> {
        match image {
            ImageHandle::Known(symbol) => Some(*symbol),
            ImageHandle::File(path) => {
                warn!(path = %path.display(), "no reference set loaded, cannot match image");
                None
            }
        }
    }
}

/// What the parser pulls tokens from.
pub trait TokenSource {
    /// Produce the next token. Never fails: unavailable input is `Unknown`.
    fn next_token(&mut self) -> Token;

    /// Return to the start of the input with a fresh clef/alteration context.
    fn reset(&mut self);
}

/// Lexes text cells and classifies image cells, one token per call.
pub struct CellTokenizer<S, M> {
    cells: S,
    matcher: M,
    classifier: SymbolClassifier,
    /// Character read past the end of the previous lexeme.
    pending: Option<char>,
}

impl<S: CellSource, M: SymbolMatcher> CellTokenizer<S, M> {
    pub fn new(cells: S, matcher: M) -> Self {
        Self {
            cells,
            matcher,
            classifier: SymbolClassifier::new(),
            pending: None,
        }
    }

    pub fn classifier(&self) -> &SymbolClassifier {
        &self.classifier
    }

    pub fn cells(&self) -> &S {
        &self.cells
    }

    /// Swap in a different grid of cells. The context is left untouched
    /// until the next [`TokenSource::reset`].
    pub fn replace_cells(&mut self, cells: S) -> S {
        self.pending = None;
        std::mem::replace(&mut self.cells, cells)
    }

    fn next_char(&mut self) -> Option<char> {
        self.pending.take().or_else(|| self.cells.next_char())
    }

    fn lex(&mut self, first: char) -> Token {
        let token = match first {
            ':' => Token::new(TokenKind::Colon),
            ';' => Token::new(TokenKind::Semicolon),
            '.' => Token::new(TokenKind::Period),
            c if c.is_ascii_digit() => self.lex_number(c),
            c if c.is_alphabetic() => self.lex_word(c),
            c => Token::with_value(TokenKind::Unknown, TokenValue::Text(c.to_string())),
        };
        self.classifier.stamp(token)
    }

    fn lex_number(&mut self, first: char) -> Token {
        let mut value = first.to_digit(10).unwrap_or(0);
        while let Some(c) = self.cells.next_char() {
            match c.to_digit(10) {
                Some(d) if c.is_ascii_digit() => {
                    value = value.saturating_mul(10).saturating_add(d);
                }
                _ => {
                    self.pending = Some(c);
                    break;
                }
            }
        }
        Token::with_value(TokenKind::Meter, TokenValue::Number(value))
    }

    fn lex_word(&mut self, first: char) -> Token {
        let mut word = String::from(first);
        while let Some(c) = self.cells.next_char() {
            if c.is_alphanumeric() {
                word.push(c);
            } else {
                self.pending = Some(c);
                break;
            }
        }
        match word.as_str() {
            "Nom" => Token::new(TokenKind::Name),
            "Instrument" => Token::new(TokenKind::Instrument),
            "FIN" => Token::new(TokenKind::EndOfPartition),
            _ => Token::with_value(TokenKind::Identifier, TokenValue::Text(word)),
        }
    }

    fn classify_image(&mut self, image: ImageHandle) -> Token {
        match self.matcher.best_match(&image) {
            Some(symbol) => self.classifier.classify(symbol),
            None => {
                debug!(?image, "no reference symbol matched");
                self.classifier.unknown()
            }
        }
    }
}

impl<S: CellSource, M: SymbolMatcher> TokenSource for CellTokenizer<S, M> {
    fn next_token(&mut self) -> Token {
        loop {
            if self.pending.is_some() || self.cells.has_text() {
                match self.next_char() {
                    Some(c) if c.is_whitespace() => continue,
                    Some(c) => return self.lex(c),
                    // End of the cell's text; the cursor has moved on.
                    None => continue,
                }
            }
            if self.cells.has_image() {
                if let Some(image) = self.cells.take_image() {
                    return self.classify_image(image);
                }
                continue;
            }
            if self.cells.is_exhausted() {
                return self.classifier.unknown();
            }
            self.cells.skip_cell();
        }
    }

    fn reset(&mut self) {
        self.pending = None;
        self.classifier.reset();
        self.cells.rewind();
    }
}
