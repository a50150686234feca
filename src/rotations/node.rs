use super::time_period::{TimePeriod, Timed};

/// A versus-mode rotation window: turf war, ranked, X battle, splatfest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VsRotation {
    pub period: TimePeriod,
    pub rule: String,
    pub stages: Vec<String>,
}

/// A limited-time challenge event window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRotation {
    pub period: TimePeriod,
    pub name: String,
    pub description: String,
    pub rule: String,
    pub stages: Vec<String>,
}

/// A salmon-run-family shift: stage, handed-out weapons, and the king
/// salmonid if the feed announces one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoopRotation {
    pub period: TimePeriod,
    pub stage: String,
    pub weapons: Vec<String>,
    pub king_salmonid: Option<String>,
}

/// One schedule entry, tagged by category.
///
/// A closed union rather than a trait object: rendering and classification
/// match on it exhaustively, so adding a category is a compile-checked
/// change everywhere it matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rotation {
    TurfWar(VsRotation),
    RankedSeries(VsRotation),
    RankedOpen(VsRotation),
    XBattle(VsRotation),
    SplatfestOpen(VsRotation),
    SplatfestPro(VsRotation),
    Challenge(ChallengeRotation),
    SalmonRun(CoopRotation),
    BigRun(CoopRotation),
    EggstraWork(CoopRotation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationKind {
    TurfWar,
    RankedSeries,
    RankedOpen,
    XBattle,
    SplatfestOpen,
    SplatfestPro,
    Challenge,
    SalmonRun,
    BigRun,
    EggstraWork,
}

impl RotationKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TurfWar => "Turf War",
            Self::RankedSeries => "Anarchy Battle (Series)",
            Self::RankedOpen => "Anarchy Battle (Open)",
            Self::XBattle => "X Battle",
            Self::SplatfestOpen => "Splatfest Battle (Open)",
            Self::SplatfestPro => "Splatfest Battle (Pro)",
            Self::Challenge => "Challenge",
            Self::SalmonRun => "Salmon Run",
            Self::BigRun => "Big Run",
            Self::EggstraWork => "Eggstra Work",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::TurfWar => "🟩",
            Self::RankedSeries | Self::RankedOpen => "🟧",
            Self::XBattle => "🟦",
            Self::SplatfestOpen | Self::SplatfestPro => "🎉",
            Self::Challenge => "🏅",
            Self::SalmonRun => "🐟",
            Self::BigRun => "🌊",
            Self::EggstraWork => "🥚",
        }
    }
}

impl Rotation {
    pub fn kind(&self) -> RotationKind {
        match self {
            Self::TurfWar(_) => RotationKind::TurfWar,
            Self::RankedSeries(_) => RotationKind::RankedSeries,
            Self::RankedOpen(_) => RotationKind::RankedOpen,
            Self::XBattle(_) => RotationKind::XBattle,
            Self::SplatfestOpen(_) => RotationKind::SplatfestOpen,
            Self::SplatfestPro(_) => RotationKind::SplatfestPro,
            Self::Challenge(_) => RotationKind::Challenge,
            Self::SalmonRun(_) => RotationKind::SalmonRun,
            Self::BigRun(_) => RotationKind::BigRun,
            Self::EggstraWork(_) => RotationKind::EggstraWork,
        }
    }
}

impl Timed for Rotation {
    fn time_period(&self) -> &TimePeriod {
        match self {
            Self::TurfWar(vs)
            | Self::RankedSeries(vs)
            | Self::RankedOpen(vs)
            | Self::XBattle(vs)
            | Self::SplatfestOpen(vs)
            | Self::SplatfestPro(vs) => &vs.period,
            Self::Challenge(event) => &event.period,
            Self::SalmonRun(coop) | Self::BigRun(coop) | Self::EggstraWork(coop) => &coop.period,
        }
    }
}

/// Which half of a festival is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FestState {
    FirstHalf,
    SecondHalf,
}

/// The singleton in-progress splatfest, outside any collection. Present only
/// while the feed reports a first- or second-half festival; tricolor battles
/// hang off this rather than the regular schedule arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentFest {
    pub period: TimePeriod,
    pub title: String,
    pub state: FestState,
    pub tricolor_stages: Vec<String>,
}

impl Timed for CurrentFest {
    fn time_period(&self) -> &TimePeriod {
        &self.period
    }
}
