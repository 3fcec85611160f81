//! Symbol classifier: turns a matched reference symbol into a token.
//!
//! The classifier holds the clef and pending accidental seen so far. Clef marks
//! overwrite the clef, accidental marks overwrite the pending accidental, and
//! every staff position consumes the pending accidental whether or not it
//! resolves to a note.

use tracing::debug;

use super::symbol::{lookup, ReferenceSymbol};
use super::token::{Alteration, Clef, Token, TokenKind, TokenValue};

/// Clef/alteration context carried from one classified symbol to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierState {
    pub clef: Clef,
    pub alteration: Alteration,
}

#[derive(Debug, Default)]
pub struct SymbolClassifier {
    state: ClassifierState,
}

impl SymbolClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ClassifierState {
        self.state
    }

    /// Forget the clef and any pending accidental.
    pub fn reset(&mut self) {
        self.state = ClassifierState::default();
    }

    /// An unknown token stamped with the current context.
    pub fn unknown(&self) -> Token {
        self.stamp(Token::new(TokenKind::Unknown))
    }

    /// Stamp the current context onto a token produced elsewhere (e.g. text).
    pub fn stamp(&self, token: Token) -> Token {
        token.in_context(self.state.clef, self.state.alteration)
    }

    /// Classify a reference symbol by its index in [`ReferenceSymbol::ALL`].
    /// Out-of-range indices classify as unknown.
    pub fn classify_index(&mut self, index: usize) -> Token {
        match ReferenceSymbol::from_index(index) {
            Some(symbol) => self.classify(symbol),
            None => {
                debug!(index, "reference index out of range");
                self.unknown()
            }
        }
    }

    /// Classify a matched reference symbol, updating the held context.
    pub fn classify(&mut self, symbol: ReferenceSymbol) -> Token {
        let token = match symbol {
            ReferenceSymbol::ClefSol => {
                self.state.clef = Clef::Treble;
                self.stamp(Token::new(TokenKind::ClefSol))
            }
            ReferenceSymbol::ClefFa => {
                self.state.clef = Clef::Bass;
                self.stamp(Token::new(TokenKind::ClefFa))
            }
            ReferenceSymbol::Sharp => {
                self.state.alteration = Alteration::Sharp;
                self.stamp(Token::new(TokenKind::AlterationSharp))
            }
            ReferenceSymbol::Flat => {
                self.state.alteration = Alteration::Flat;
                self.stamp(Token::new(TokenKind::AlterationFlat))
            }
            ReferenceSymbol::Pause => self.stamp(Token::new(TokenKind::Pause)),
            ReferenceSymbol::HalfPause => self.stamp(Token::new(TokenKind::HalfPause)),
            ReferenceSymbol::MeasureBar => self.stamp(Token::new(TokenKind::MeasureBar)),
            ReferenceSymbol::EndStaffBar => self.stamp(Token::new(TokenKind::EndStaffBar)),
            ReferenceSymbol::Pitch(position) => {
                let ClassifierState { clef, alteration } = self.state;
                self.state.alteration = Alteration::None;
                match lookup(clef, alteration, position) {
                    Some(note) => Token::with_value(TokenKind::Note, TokenValue::Note(note))
                        .in_context(clef, alteration),
                    None => Token::new(TokenKind::Unknown).in_context(clef, alteration),
                }
            }
        };
        debug!(%symbol, %token, "classified symbol");
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::symbol::{PitchPosition, PITCH_POSITIONS};

    fn pitch(index: usize) -> ReferenceSymbol {
        ReferenceSymbol::Pitch(PitchPosition::new(index).unwrap())
    }

    fn note_name(token: &Token) -> Option<String> {
        token.note().map(|n| n.to_string())
    }

    #[test]
    fn starts_without_context() {
        let classifier = SymbolClassifier::new();
        assert_eq!(classifier.state(), ClassifierState::default());
        assert_eq!(classifier.state().clef, Clef::None);
        assert_eq!(classifier.state().alteration, Alteration::None);
    }

    #[test]
    fn clefs_set_context() {
        let mut c = SymbolClassifier::new();
        let t = c.classify(ReferenceSymbol::ClefSol);
        assert_eq!(t.kind, TokenKind::ClefSol);
        assert_eq!(t.clef, Clef::Treble);
        assert_eq!(c.state().clef, Clef::Treble);

        let t = c.classify(ReferenceSymbol::ClefFa);
        assert_eq!(t.kind, TokenKind::ClefFa);
        assert_eq!(c.state().clef, Clef::Bass);
    }

    #[test]
    fn accidentals_set_pending_alteration() {
        let mut c = SymbolClassifier::new();
        assert_eq!(c.classify(ReferenceSymbol::Sharp).kind, TokenKind::AlterationSharp);
        assert_eq!(c.state().alteration, Alteration::Sharp);
        assert_eq!(c.classify(ReferenceSymbol::Flat).kind, TokenKind::AlterationFlat);
        assert_eq!(c.state().alteration, Alteration::Flat);
    }

    #[test]
    fn structural_symbols() {
        let mut c = SymbolClassifier::new();
        c.classify(ReferenceSymbol::ClefFa);
        let cases = [
            (ReferenceSymbol::Pause, TokenKind::Pause),
            (ReferenceSymbol::HalfPause, TokenKind::HalfPause),
            (ReferenceSymbol::MeasureBar, TokenKind::MeasureBar),
            (ReferenceSymbol::EndStaffBar, TokenKind::EndStaffBar),
        ];
        for (symbol, kind) in cases {
            let t = c.classify(symbol);
            assert_eq!(t.kind, kind);
            assert_eq!(t.clef, Clef::Bass);
            assert!(t.value.is_none());
        }
    }

    #[test]
    fn pitch_without_clef_is_unknown() {
        let mut c = SymbolClassifier::new();
        for index in 0..PITCH_POSITIONS {
            let t = c.classify(pitch(index));
            assert_eq!(t.kind, TokenKind::Unknown, "position {index}");
            assert!(t.value.is_none());
        }
    }

    #[test]
    fn pitch_resolves_under_clef() {
        let mut c = SymbolClassifier::new();
        c.classify(ReferenceSymbol::ClefSol);
        let t = c.classify(pitch(8));
        assert_eq!(t.kind, TokenKind::Note);
        assert_eq!(note_name(&t).as_deref(), Some("SOL_TOKEN_DO_H"));
        assert_eq!(t.clef, Clef::Treble);
    }

    #[test]
    fn empty_table_entry_is_unknown() {
        let mut c = SymbolClassifier::new();
        c.classify(ReferenceSymbol::ClefSol);
        assert_eq!(c.classify(pitch(0)).kind, TokenKind::Unknown);
        c.classify(ReferenceSymbol::ClefFa);
        assert_eq!(c.classify(pitch(15)).kind, TokenKind::Unknown);
    }

    #[test]
    fn alteration_consumed_by_next_pitch_only() {
        let mut c = SymbolClassifier::new();
        c.classify(ReferenceSymbol::ClefSol);
        c.classify(ReferenceSymbol::Sharp);

        let first = c.classify(pitch(4));
        assert_eq!(note_name(&first).as_deref(), Some("FA_TOKEN_SOL_L_SHARP"));
        assert_eq!(first.alteration, Alteration::Sharp);
        assert_eq!(c.state().alteration, Alteration::None);

        let second = c.classify(pitch(4));
        assert_eq!(note_name(&second).as_deref(), Some("SOL_TOKEN_FA_L"));
        assert_eq!(second.alteration, Alteration::None);
    }

    #[test]
    fn alteration_consumed_even_when_unresolved() {
        let mut c = SymbolClassifier::new();
        c.classify(ReferenceSymbol::ClefSol);
        c.classify(ReferenceSymbol::Sharp);
        // Empty slot in the treble sharp row.
        assert_eq!(c.classify(pitch(2)).kind, TokenKind::Unknown);
        assert_eq!(c.state().alteration, Alteration::None);
        assert_eq!(note_name(&c.classify(pitch(2))).as_deref(), Some("SOL_TOKEN_RE_L"));
    }

    #[test]
    fn alteration_survives_structural_symbols() {
        let mut c = SymbolClassifier::new();
        c.classify(ReferenceSymbol::ClefFa);
        c.classify(ReferenceSymbol::Flat);
        c.classify(ReferenceSymbol::MeasureBar);
        let t = c.classify(pitch(1));
        assert_eq!(note_name(&t).as_deref(), Some("FA_TOKEN_RE_L_BEMOL"));
    }

    #[test]
    fn every_combination_matches_lookup() {
        for clef_symbol in [ReferenceSymbol::ClefSol, ReferenceSymbol::ClefFa] {
            for accidental in [None, Some(ReferenceSymbol::Sharp), Some(ReferenceSymbol::Flat)] {
                for index in 0..PITCH_POSITIONS {
                    let mut c = SymbolClassifier::new();
                    c.classify(clef_symbol);
                    if let Some(a) = accidental {
                        c.classify(a);
                    }
                    let ClassifierState { clef, alteration } = c.state();
                    let expected = lookup(clef, alteration, PitchPosition::new(index).unwrap());
                    let t = c.classify(pitch(index));
                    match expected {
                        Some(note) => {
                            assert_eq!(t.kind, TokenKind::Note);
                            assert_eq!(t.note(), Some(&note));
                            assert!(!note.to_string().is_empty());
                        }
                        None => assert_eq!(t.kind, TokenKind::Unknown),
                    }
                }
            }
        }
    }

    #[test]
    fn out_of_range_index_is_unknown() {
        let mut c = SymbolClassifier::new();
        c.classify(ReferenceSymbol::ClefSol);
        c.classify(ReferenceSymbol::Sharp);
        let t = c.classify_index(99);
        assert_eq!(t.kind, TokenKind::Unknown);
        assert_eq!(t.clef, Clef::Treble);
        assert_eq!(t.alteration, Alteration::Sharp);
        assert_eq!(c.classify_index(21).kind, TokenKind::ClefSol);
    }

    #[test]
    fn reset_clears_context() {
        let mut c = SymbolClassifier::new();
        c.classify(ReferenceSymbol::ClefFa);
        c.classify(ReferenceSymbol::Sharp);
        c.reset();
        assert_eq!(c.state(), ClassifierState::default());
        assert_eq!(c.classify(pitch(5)).kind, TokenKind::Unknown);
    }
}
