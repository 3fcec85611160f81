//! Recursive-descent parser for the partition grammar.
//!
//! ```text
//! Partition  := NAME COLON IDENTIFIER SEMICOLON
//!               INSTRUMENT COLON IDENTIFIER PERIOD
//!               Staff* END_OF_PARTITION
//! Staff      := (CLEF_SOL | CLEF_FA) METER? Measure (MEASURE_BAR Measure)* END_STAFF_BAR
//! Measure    := Symbol+
//! Symbol     := (ALTERATION_SHARP | ALTERATION_FLAT)? NOTE | PAUSE | HALF_PAUSE
//! ```
//!
//! One token of lookahead is held in `current`; every `advance` pulls exactly
//! one token from the source. The first mismatch aborts the parse.

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use tracing::{debug, error, warn};

use super::error::ParseError;
use super::source::TokenSource;
use super::symbol::Family;
use super::token::{Clef, Token, TokenKind};

/// Tokens that may follow the last symbol of a measure.
const MEASURE_TERMINATORS: [TokenKind; 5] = [
    TokenKind::EndStaffBar,
    TokenKind::MeasureBar,
    TokenKind::ClefSol,
    TokenKind::ClefFa,
    TokenKind::EndOfPartition,
];

const SYMBOL_STARTS: [TokenKind; 5] = [
    TokenKind::AlterationSharp,
    TokenKind::AlterationFlat,
    TokenKind::Note,
    TokenKind::Pause,
    TokenKind::HalfPause,
];

/// A measure whose symbol count does not match the staff's meter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterWarning {
    /// 1-based staff number.
    pub staff: usize,
    /// 1-based measure number within the staff.
    pub measure: usize,
    pub meter: u32,
}

impl fmt::Display for MeterWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "staff {} measure {}: content does not match meter value {}",
            self.staff, self.measure, self.meter
        )
    }
}

/// Output of a successful parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedScore {
    pub partition_name: String,
    pub instrument: String,
    /// Bass entries in input order.
    pub fa_notes: Vec<String>,
    /// Treble entries in input order.
    pub sol_notes: Vec<String>,
    pub warnings: Vec<MeterWarning>,
}

impl ParsedScore {
    pub fn is_empty(&self) -> bool {
        self.fa_notes.is_empty() && self.sol_notes.is_empty()
    }
}

pub struct NotationParser<T> {
    source: T,
    current: Token,
    partition_name: String,
    instrument: String,
    meter: Option<u32>,
    /// Symbols seen in the current measure.
    measure_symbols: u32,
    staff_count: usize,
    measure_count: usize,
    fa_notes: Vec<String>,
    sol_notes: Vec<String>,
    warnings: Vec<MeterWarning>,
}

impl<T: TokenSource> NotationParser<T> {
    pub fn new(source: T) -> Self {
        Self {
            source,
            current: Token::new(TokenKind::Unknown),
            partition_name: String::new(),
            instrument: String::new(),
            meter: None,
            measure_symbols: 0,
            staff_count: 0,
            measure_count: 0,
            fa_notes: Vec::new(),
            sol_notes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn source(&self) -> &T {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut T {
        &mut self.source
    }

    /// Clear all per-parse state and rewind the source.
    pub fn reset(&mut self) {
        self.source.reset();
        self.current = Token::new(TokenKind::Unknown);
        self.partition_name.clear();
        self.instrument.clear();
        self.reset_meter();
        self.staff_count = 0;
        self.measure_count = 0;
        self.fa_notes.clear();
        self.sol_notes.clear();
        self.warnings.clear();
    }

    /// Parse the whole partition from the start of the source.
    ///
    /// Succeeds on reaching `END_OF_PARTITION` even if no note was produced.
    /// On failure the partially built sequences are dropped.
    pub fn parse(&mut self) -> Result<ParsedScore, ParseError> {
        self.reset();

        let outcome = {
            let _quiet = QuietPanics::enter();
            panic::catch_unwind(AssertUnwindSafe(|| {
                self.advance();
                self.partition()
            }))
        };

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => Err(ParseError::internal(panic_message(payload.as_ref()))),
        };

        match result {
            Ok(()) => Ok(ParsedScore {
                partition_name: std::mem::take(&mut self.partition_name),
                instrument: std::mem::take(&mut self.instrument),
                fa_notes: std::mem::take(&mut self.fa_notes),
                sol_notes: std::mem::take(&mut self.sol_notes),
                warnings: std::mem::take(&mut self.warnings),
            }),
            Err(e) => {
                error!("{e}");
                self.fa_notes.clear();
                self.sol_notes.clear();
                Err(e)
            }
        }
    }

    // --- Productions ---

    fn partition(&mut self) -> Result<(), ParseError> {
        debug!("parsing partition");
        self.expect(TokenKind::Name, "partition name declaration")?;
        self.expect(TokenKind::Colon, "partition name declaration")?;
        self.partition_name = self.expect_identifier("partition name")?;
        self.expect(TokenKind::Semicolon, "partition name terminator")?;

        self.expect(TokenKind::Instrument, "instrument declaration")?;
        self.expect(TokenKind::Colon, "instrument declaration")?;
        self.instrument = self.expect_identifier("instrument name")?;
        self.expect(TokenKind::Period, "instrument declaration terminator")?;

        self.staves()?;

        // Nothing is pulled past the end of the partition.
        self.require(TokenKind::EndOfPartition, "end of partition")
    }

    fn staves(&mut self) -> Result<(), ParseError> {
        debug!("parsing staves");
        loop {
            match self.current.kind {
                TokenKind::EndOfPartition => return Ok(()),
                TokenKind::ClefSol | TokenKind::ClefFa => {
                    self.staff()?;
                    self.reset_meter();
                }
                _ => {
                    return Err(self.unexpected(
                        "multiple staffs",
                        &[TokenKind::ClefSol, TokenKind::ClefFa, TokenKind::EndOfPartition],
                    ))
                }
            }
        }
    }

    fn staff(&mut self) -> Result<(), ParseError> {
        self.staff_count += 1;
        self.measure_count = 0;
        debug!(staff = self.staff_count, clef = %self.current.kind, "parsing staff");
        self.advance();

        self.meter()?;

        self.measure()?;
        while self.check(TokenKind::MeasureBar) {
            self.advance();
            self.measure()?;
        }
        self.expect(TokenKind::EndStaffBar, "end of staff")
    }

    fn meter(&mut self) -> Result<(), ParseError> {
        debug!("parsing meter");
        if self.check(TokenKind::Meter) {
            let value = self.current.number().unwrap_or(0);
            self.meter = Some(value);
            self.advance();
            Ok(())
        } else if self.current.kind.starts_symbol() {
            Ok(())
        } else {
            let mut expected = vec![TokenKind::Meter];
            expected.extend(SYMBOL_STARTS);
            Err(self.unexpected("meter", &expected))
        }
    }

    fn measure(&mut self) -> Result<(), ParseError> {
        self.measure_count += 1;
        self.measure_symbols = 0;
        debug!(measure = self.measure_count, "parsing measure");

        self.symbol()?;
        loop {
            if self.current.kind.starts_symbol() {
                self.symbol()?;
            } else if MEASURE_TERMINATORS.contains(&self.current.kind) {
                break;
            } else {
                let mut expected = SYMBOL_STARTS.to_vec();
                expected.extend(MEASURE_TERMINATORS);
                return Err(self.unexpected("additional symbols", &expected));
            }
        }

        if let Some(meter) = self.meter {
            if self.measure_symbols != meter {
                let warning = MeterWarning {
                    staff: self.staff_count,
                    measure: self.measure_count,
                    meter,
                };
                warn!("semantic error: {warning}");
                self.warnings.push(warning);
            }
        }
        Ok(())
    }

    fn symbol(&mut self) -> Result<(), ParseError> {
        debug!(token = %self.current, "parsing symbol");
        self.measure_symbols = self.measure_symbols.saturating_add(1);

        match self.current.kind {
            TokenKind::AlterationSharp | TokenKind::AlterationFlat => {
                self.advance();
                self.note()
            }
            TokenKind::Note => self.note(),
            TokenKind::Pause | TokenKind::HalfPause => {
                self.pause();
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected("symbol", &SYMBOL_STARTS)),
        }
    }

    fn note(&mut self) -> Result<(), ParseError> {
        if !self.check(TokenKind::Note) {
            return Err(self.unexpected("note height", &[TokenKind::Note]));
        }
        let note = *self
            .current
            .note()
            .ok_or_else(|| ParseError::internal("note token without a resolved note"))?;

        let entry = format!("{note}_{}", self.instrument);
        match note.family() {
            Family::Fa => self.fa_notes.push(entry),
            Family::Sol => self.sol_notes.push(entry),
        }
        self.advance();
        Ok(())
    }

    /// Rests go to the staff recorded on the token itself.
    fn pause(&mut self) {
        let rest = self.current.kind.name().to_string();
        match self.current.clef {
            Clef::Bass => self.fa_notes.push(rest),
            Clef::Treble | Clef::None => self.sol_notes.push(rest),
        }
    }

    // --- Utility methods ---

    fn advance(&mut self) {
        self.current = self.source.next_token();
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn unexpected(&self, context: &str, expected: &[TokenKind]) -> ParseError {
        ParseError::syntax(context, expected, &self.current)
    }

    fn require(&self, kind: TokenKind, context: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            Ok(())
        } else {
            Err(self.unexpected(context, &[kind]))
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<(), ParseError> {
        self.require(kind, context)?;
        self.advance();
        Ok(())
    }

    fn expect_identifier(&mut self, context: &str) -> Result<String, ParseError> {
        self.require(TokenKind::Identifier, context)?;
        let name = self.current.text().unwrap_or_default().to_string();
        self.advance();
        Ok(name)
    }

    fn reset_meter(&mut self) {
        self.meter = None;
        self.measure_symbols = 0;
    }
}

thread_local! {
    static QUIET_PANICS: Cell<bool> = const { Cell::new(false) };
}

fn panics_silenced() -> bool {
    QUIET_PANICS.with(Cell::get)
}

/// Wrap the process panic hook once so that it stays silent on threads that
/// are inside [`NotationParser::parse`]. Those panics are reported as a
/// [`ParseError`] instead.
fn install_quiet_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !panics_silenced() {
                previous(info);
            }
        }));
    });
}

/// Panic output is suppressed on the current thread while this is alive.
struct QuietPanics {
    was_quiet: bool,
}

impl QuietPanics {
    fn enter() -> Self {
        install_quiet_hook();
        Self {
            was_quiet: QUIET_PANICS.with(|quiet| quiet.replace(true)),
        }
    }
}

impl Drop for QuietPanics {
    fn drop(&mut self) {
        QUIET_PANICS.with(|quiet| quiet.set(self.was_quiet));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic while parsing".to_string()
    }
}
