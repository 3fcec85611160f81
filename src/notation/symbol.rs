//! Reference symbols and pitch resolution.
//!
//! A cell picture is matched against one of 24 reference images. Eight of them
//! stand for a structural mark (clef, rest, bar, accidental). The other sixteen
//! are staff positions: what note a position means depends on the clef in
//! effect and on a pending accidental, resolved through a fixed
//! clef × alteration × position table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::token::{Alteration, Clef};

/// Number of staff positions with a reference image.
pub const PITCH_POSITIONS: usize = 16;

/// A staff position, `0..16`, matched by the `Note_H{n+1}` reference images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PitchPosition(u8);

impl PitchPosition {
    pub fn new(index: usize) -> Option<Self> {
        (index < PITCH_POSITIONS).then_some(Self(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One of the reference images a cell picture can be matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReferenceSymbol {
    Pitch(PitchPosition),
    Pause,
    HalfPause,
    MeasureBar,
    Flat,
    Sharp,
    ClefSol,
    ClefFa,
    EndStaffBar,
}

impl ReferenceSymbol {
    /// All reference symbols, in reference-set order (ties in matching resolve
    /// to the earliest).
    pub const ALL: [ReferenceSymbol; 24] = [
        ReferenceSymbol::Pitch(PitchPosition(0)),
        ReferenceSymbol::Pitch(PitchPosition(1)),
        ReferenceSymbol::Pitch(PitchPosition(2)),
        ReferenceSymbol::Pitch(PitchPosition(3)),
        ReferenceSymbol::Pitch(PitchPosition(4)),
        ReferenceSymbol::Pitch(PitchPosition(5)),
        ReferenceSymbol::Pitch(PitchPosition(6)),
        ReferenceSymbol::Pitch(PitchPosition(7)),
        ReferenceSymbol::Pitch(PitchPosition(8)),
        ReferenceSymbol::Pitch(PitchPosition(9)),
        ReferenceSymbol::Pitch(PitchPosition(10)),
        ReferenceSymbol::Pitch(PitchPosition(11)),
        ReferenceSymbol::Pitch(PitchPosition(12)),
        ReferenceSymbol::Pitch(PitchPosition(13)),
        ReferenceSymbol::Pitch(PitchPosition(14)),
        ReferenceSymbol::Pitch(PitchPosition(15)),
        ReferenceSymbol::Pause,
        ReferenceSymbol::HalfPause,
        ReferenceSymbol::MeasureBar,
        ReferenceSymbol::Flat,
        ReferenceSymbol::Sharp,
        ReferenceSymbol::ClefSol,
        ReferenceSymbol::ClefFa,
        ReferenceSymbol::EndStaffBar,
    ];

    /// Look up a reference symbol by its index in [`ReferenceSymbol::ALL`].
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Reference image stem, e.g. `Note_H3` or `BATON_MESURE`.
    pub fn stem(self) -> String {
        match self {
            ReferenceSymbol::Pitch(p) => format!("Note_H{}", p.index() + 1),
            ReferenceSymbol::Pause => "Note_PAUSE".into(),
            ReferenceSymbol::HalfPause => "Note_DEMI_PAUSE".into(),
            ReferenceSymbol::MeasureBar => "BATON_MESURE".into(),
            ReferenceSymbol::Flat => "Alteration_BEMOL".into(),
            ReferenceSymbol::Sharp => "Alteration_DIESE".into(),
            ReferenceSymbol::ClefSol => "Note_CLE_SOL".into(),
            ReferenceSymbol::ClefFa => "Note_CLE_FA".into(),
            ReferenceSymbol::EndStaffBar => "BATON_FIN_PORTEE".into(),
        }
    }

    /// Reference image file name inside the reference directory.
    pub fn file_name(self) -> String {
        format!("{}.JPG", self.stem())
    }
}

impl fmt::Display for ReferenceSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Error for a name that is not one of the reference symbols.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown reference symbol: {0}")]
pub struct UnknownSymbol(pub String);

impl FromStr for ReferenceSymbol {
    type Err = UnknownSymbol;

    /// Accepts the stem or the full file name (`Note_H3`, `Note_H3.JPG`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stem = match s.rsplit_once('.') {
            Some((stem, ext)) if ext.eq_ignore_ascii_case("jpg") => stem,
            _ => s,
        };
        Self::ALL
            .iter()
            .copied()
            .find(|symbol| symbol.stem() == stem)
            .ok_or_else(|| UnknownSymbol(s.to_string()))
    }
}

impl TryFrom<String> for ReferenceSymbol {
    type Error = UnknownSymbol;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ReferenceSymbol> for String {
    fn from(symbol: ReferenceSymbol) -> Self {
        symbol.stem()
    }
}

/// Note family: which audio bank a resolved note belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Sol,
    Fa,
}

impl Family {
    pub const ALL: [Family; 2] = [Family::Sol, Family::Fa];

    pub fn prefix(self) -> &'static str {
        match self {
            Family::Sol => "SOL_TOKEN",
            Family::Fa => "FA_TOKEN",
        }
    }
}

/// A resolved note, named after its audio-bank entry
/// (e.g. `SOL_TOKEN_DO_MILIEU`).
///
/// The family comes from the name, not from the clef that produced it: a few
/// treble positions resolve into the bass bank and the other way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteSymbol(&'static str);

impl NoteSymbol {
    pub fn name(self) -> &'static str {
        self.0
    }

    pub fn family(self) -> Family {
        if self.0.starts_with(Family::Fa.prefix()) {
            Family::Fa
        } else {
            Family::Sol
        }
    }
}

impl fmt::Display for NoteSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

type PitchRow = [&'static str; PITCH_POSITIONS];

/// `[clef][alteration][position]`; clef is treble/bass, alteration is
/// none/sharp/flat. Empty entries have no notation and classify as unknown.
///
/// The bank names are kept exactly as recorded, including the cross-family
/// sharp rows, `FA_TOKEN_FA_H` under bass flat and `FA_TOKEN_SI_SI_BEMOL`.
const PITCH_TABLE: [[PitchRow; 3]; 2] = [
    // Treble
    [
        [
            "",
            "SOL_TOKEN_DO_MILIEU",
            "SOL_TOKEN_RE_L",
            "SOL_TOKEN_MI_L",
            "SOL_TOKEN_FA_L",
            "SOL_TOKEN_SOL_L",
            "SOL_TOKEN_LA_L",
            "SOL_TOKEN_SI_L",
            "SOL_TOKEN_DO_H",
            "SOL_TOKEN_RE_H",
            "SOL_TOKEN_MI_H",
            "SOL_TOKEN_FA_H",
            "SOL_TOKEN_SOL_H",
            "SOL_TOKEN_LA_H",
            "FA_TOKEN_SI_H",
            "FA_TOKEN_DO_H",
        ],
        [
            "FA_TOKEN_DO_L_SHARP",
            "FA_TOKEN_RE_L_SHARP",
            "",
            "FA_TOKEN_FA_L_SHARP",
            "FA_TOKEN_SOL_L_SHARP",
            "FA_TOKEN_LA_L_SHARP",
            "",
            "FA_TOKEN_DO_H_SHARP",
            "FA_TOKEN_RE_H_SHARP",
            "",
            "FA_TOKEN_FA_H_SHARP",
            "FA_TOKEN_SOL_H_SHARP",
            "FA_TOKEN_LA_H_SHARP",
            "",
            "FA_TOKEN_DO_MILIEU_SHARP",
            "",
        ],
        [
            "",
            "",
            "SOL_TOKEN_RE_L_BEMOL",
            "SOL_TOKEN_MI_L_BEMOL",
            "",
            "SOL_TOKEN_SOL_L_BEMOL",
            "SOL_TOKEN_LA_L_BEMOL",
            "SOL_TOKEN_SI_L_BEMOL",
            "",
            "SOL_TOKEN_RE_H_BEMOL",
            "SOL_TOKEN_MI_H_BEMOL",
            "",
            "SOL_TOKEN_SOL_H_BEMOL",
            "SOL_TOKEN_LA_H_BEMOL",
            "FA_TOKEN_SI_H_BEMOL",
            "",
        ],
    ],
    // Bass
    [
        [
            "FA_TOKEN_DO_L",
            "FA_TOKEN_RE_L",
            "FA_TOKEN_MI_L",
            "FA_TOKEN_FA_L",
            "FA_TOKEN_SOL_L",
            "FA_TOKEN_LA_L",
            "FA_TOKEN_SI_L",
            "FA_TOKEN_DO_H",
            "FA_TOKEN_RE_H",
            "FA_TOKEN_MI_H",
            "FA_TOKEN_FA_H",
            "FA_TOKEN_SOL_H",
            "FA_TOKEN_LA_H",
            "FA_TOKEN_SI_H",
            "FA_TOKEN_DO_MILIEU",
            "",
        ],
        [
            "",
            "SOL_TOKEN_DO_MILIEU_SHARP",
            "SOL_TOKEN_RE_L_SHARP",
            "",
            "SOL_TOKEN_FA_L_SHARP",
            "SOL_TOKEN_SOL_L_SHARP",
            "SOL_TOKEN_LA_L_SHARP",
            "",
            "SOL_TOKEN_DO_H_SHARP",
            "SOL_TOKEN_RE_H_SHARP",
            "",
            "SOL_TOKEN_FA_H_SHARP",
            "SOL_TOKEN_SOL_H_SHARP",
            "SOL_TOKEN_LA_H_SHARP",
            "",
            "",
        ],
        [
            "",
            "FA_TOKEN_RE_L_BEMOL",
            "FA_TOKEN_MI_L_BEMOL",
            "",
            "FA_TOKEN_SOL_L_BEMOL",
            "FA_TOKEN_LA_L_BEMOL",
            "FA_TOKEN_SI_L_BEMOL",
            "",
            "FA_TOKEN_RE_H_BEMOL",
            "FA_TOKEN_MI_H_BEMOL",
            "FA_TOKEN_FA_H",
            "FA_TOKEN_SOL_H_BEMOL",
            "FA_TOKEN_LA_H_BEMOL",
            "FA_TOKEN_SI_SI_BEMOL",
            "",
            "",
        ],
    ],
];

/// Resolve a staff position under the given clef and pending accidental.
///
/// Returns `None` without a clef or where the combination has no notation.
pub fn lookup(clef: Clef, alteration: Alteration, position: PitchPosition) -> Option<NoteSymbol> {
    let clef_row = match clef {
        Clef::None => return None,
        Clef::Treble => 0,
        Clef::Bass => 1,
    };
    let alteration_row = match alteration {
        Alteration::None => 0,
        Alteration::Sharp => 1,
        Alteration::Flat => 2,
    };
    PITCH_TABLE
        .get(clef_row)
        .and_then(|rows| rows.get(alteration_row))
        .and_then(|row| row.get(position.index()))
        .copied()
        .filter(|name| !name.is_empty())
        .map(NoteSymbol)
}
