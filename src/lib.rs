use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

mod narrative;
mod relations;

pub use narrative::{
    build_prompt, generate_analysis, shape_response, GeneratorConfig, MockSource, NarrativeBundle,
    NarrativeError, NarrativeSource, Prompt,
};
pub use relations::{
    branch_relation, na_yin, prosperity_phase, BranchRelation, ProsperityPhase, ProsperityPhases,
    TenGod, TenGods,
};

// ---------------------------
// ## Enumerations
// ---------------------------

/// The ten heavenly stems of the sexagenary cycle, in cycle order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeavenlyStem {
    #[serde(rename = "甲")]
    Jia = 0,
    #[serde(rename = "乙")]
    Yi,
    #[serde(rename = "丙")]
    Bing,
    #[serde(rename = "丁")]
    Ding,
    #[serde(rename = "戊")]
    Wu,
    #[serde(rename = "己")]
    Ji,
    #[serde(rename = "庚")]
    Geng,
    #[serde(rename = "辛")]
    Xin,
    #[serde(rename = "壬")]
    Ren,
    #[serde(rename = "癸")]
    Gui,
}

impl HeavenlyStem {
    pub fn from_index(index: i64) -> HeavenlyStem {
        match index.rem_euclid(10) {
            0 => HeavenlyStem::Jia,
            1 => HeavenlyStem::Yi,
            2 => HeavenlyStem::Bing,
            3 => HeavenlyStem::Ding,
            4 => HeavenlyStem::Wu,
            5 => HeavenlyStem::Ji,
            6 => HeavenlyStem::Geng,
            7 => HeavenlyStem::Xin,
            8 => HeavenlyStem::Ren,
            9 => HeavenlyStem::Gui,
            _ => HeavenlyStem::Jia, // Fallback
        }
    }

    pub fn index(self) -> i64 {
        self as i64
    }

    pub fn all() -> impl Iterator<Item = HeavenlyStem> {
        (0..10).map(HeavenlyStem::from_index)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            HeavenlyStem::Jia => "甲",
            HeavenlyStem::Yi => "乙",
            HeavenlyStem::Bing => "丙",
            HeavenlyStem::Ding => "丁",
            HeavenlyStem::Wu => "戊",
            HeavenlyStem::Ji => "己",
            HeavenlyStem::Geng => "庚",
            HeavenlyStem::Xin => "辛",
            HeavenlyStem::Ren => "壬",
            HeavenlyStem::Gui => "癸",
        }
    }

    pub fn element(self) -> Element {
        match self {
            HeavenlyStem::Jia | HeavenlyStem::Yi => Element::Wood,
            HeavenlyStem::Bing | HeavenlyStem::Ding => Element::Fire,
            HeavenlyStem::Wu | HeavenlyStem::Ji => Element::Earth,
            HeavenlyStem::Geng | HeavenlyStem::Xin => Element::Metal,
            HeavenlyStem::Ren | HeavenlyStem::Gui => Element::Water,
        }
    }

    pub fn polarity(self) -> Polarity {
        if self.index() % 2 == 0 {
            Polarity::Yang
        } else {
            Polarity::Yin
        }
    }

    /// Starting month-stem offset for a year with this stem (five-tiger rule).
    pub fn month_stem_offset(self) -> i64 {
        match self {
            HeavenlyStem::Jia | HeavenlyStem::Ji => 0,
            HeavenlyStem::Yi | HeavenlyStem::Geng => 2,
            HeavenlyStem::Bing | HeavenlyStem::Xin => 4,
            HeavenlyStem::Ding | HeavenlyStem::Ren => 6,
            HeavenlyStem::Wu | HeavenlyStem::Gui => 8,
        }
    }
}

impl fmt::Display for HeavenlyStem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// The twelve earthly branches of the sexagenary cycle, in cycle order
/// starting at 子.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EarthlyBranch {
    #[serde(rename = "子")]
    Zi = 0,
    #[serde(rename = "丑")]
    Chou,
    #[serde(rename = "寅")]
    Yin,
    #[serde(rename = "卯")]
    Mao,
    #[serde(rename = "辰")]
    Chen,
    #[serde(rename = "巳")]
    Si,
    #[serde(rename = "午")]
    Wu,
    #[serde(rename = "未")]
    Wei,
    #[serde(rename = "申")]
    Shen,
    #[serde(rename = "酉")]
    You,
    #[serde(rename = "戌")]
    Xu,
    #[serde(rename = "亥")]
    Hai,
}

impl EarthlyBranch {
    pub fn from_index(index: i64) -> EarthlyBranch {
        match index.rem_euclid(12) {
            0 => EarthlyBranch::Zi,
            1 => EarthlyBranch::Chou,
            2 => EarthlyBranch::Yin,
            3 => EarthlyBranch::Mao,
            4 => EarthlyBranch::Chen,
            5 => EarthlyBranch::Si,
            6 => EarthlyBranch::Wu,
            7 => EarthlyBranch::Wei,
            8 => EarthlyBranch::Shen,
            9 => EarthlyBranch::You,
            10 => EarthlyBranch::Xu,
            11 => EarthlyBranch::Hai,
            _ => EarthlyBranch::Zi, // Fallback
        }
    }

    pub fn index(self) -> i64 {
        self as i64
    }

    pub fn all() -> impl Iterator<Item = EarthlyBranch> {
        (0..12).map(EarthlyBranch::from_index)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            EarthlyBranch::Zi => "子",
            EarthlyBranch::Chou => "丑",
            EarthlyBranch::Yin => "寅",
            EarthlyBranch::Mao => "卯",
            EarthlyBranch::Chen => "辰",
            EarthlyBranch::Si => "巳",
            EarthlyBranch::Wu => "午",
            EarthlyBranch::Wei => "未",
            EarthlyBranch::Shen => "申",
            EarthlyBranch::You => "酉",
            EarthlyBranch::Xu => "戌",
            EarthlyBranch::Hai => "亥",
        }
    }

    pub fn element(self) -> Element {
        match self {
            EarthlyBranch::Zi | EarthlyBranch::Hai => Element::Water,
            EarthlyBranch::Yin | EarthlyBranch::Mao => Element::Wood,
            EarthlyBranch::Si | EarthlyBranch::Wu => Element::Fire,
            EarthlyBranch::Shen | EarthlyBranch::You => Element::Metal,
            EarthlyBranch::Chou | EarthlyBranch::Chen | EarthlyBranch::Wei | EarthlyBranch::Xu => {
                Element::Earth
            }
        }
    }

    pub fn polarity(self) -> Polarity {
        if self.index() % 2 == 0 {
            Polarity::Yang
        } else {
            Polarity::Yin
        }
    }
}

impl fmt::Display for EarthlyBranch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// The five elements every stem and branch maps to. Serialized with the
/// English names the persisted result records use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Wood,
    Fire,
    Earth,
    Metal,
    Water,
}

impl Element {
    pub fn all() -> impl Iterator<Item = Element> {
        [
            Element::Wood,
            Element::Fire,
            Element::Earth,
            Element::Metal,
            Element::Water,
        ]
        .iter()
        .copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Element::Wood => "wood",
            Element::Fire => "fire",
            Element::Earth => "earth",
            Element::Metal => "metal",
            Element::Water => "water",
        }
    }

    /// The element this one generates in the 相生 cycle.
    pub fn generates(self) -> Element {
        match self {
            Element::Wood => Element::Fire,
            Element::Fire => Element::Earth,
            Element::Earth => Element::Metal,
            Element::Metal => Element::Water,
            Element::Water => Element::Wood,
        }
    }

    /// The element this one overcomes in the 相克 cycle.
    pub fn overcomes(self) -> Element {
        match self {
            Element::Wood => Element::Earth,
            Element::Fire => Element::Metal,
            Element::Earth => Element::Water,
            Element::Metal => Element::Wood,
            Element::Water => Element::Fire,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    #[serde(rename = "阳")]
    Yang,
    #[serde(rename = "阴")]
    Yin,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// A life domain the user can request narrative guidance for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusArea {
    Health,
    Wealth,
    Career,
    Relationship,
    Children,
}

impl FocusArea {
    /// All focus areas in declaration order. Prompt sections are always
    /// emitted in this order, never in the caller's order.
    pub fn all() -> impl Iterator<Item = FocusArea> {
        [
            FocusArea::Health,
            FocusArea::Wealth,
            FocusArea::Career,
            FocusArea::Relationship,
            FocusArea::Children,
        ]
        .iter()
        .copied()
    }

    /// Unrecognized names map to `None` and are silently ignored downstream.
    pub fn from_name(name: &str) -> Option<FocusArea> {
        match name {
            "health" => Some(FocusArea::Health),
            "wealth" => Some(FocusArea::Wealth),
            "career" => Some(FocusArea::Career),
            "relationship" => Some(FocusArea::Relationship),
            "children" => Some(FocusArea::Children),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FocusArea::Health => "health",
            FocusArea::Wealth => "wealth",
            FocusArea::Career => "career",
            FocusArea::Relationship => "relationship",
            FocusArea::Children => "children",
        }
    }
}

// ---------------------------
// ## Structures
// ---------------------------

/// A birth date and hour. Constructed through [`BirthMoment::new`], which
/// rejects out-of-range fields and dates that do not exist in the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBirthMoment")]
pub struct BirthMoment {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
}

#[derive(Deserialize)]
struct RawBirthMoment {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
}

impl TryFrom<RawBirthMoment> for BirthMoment {
    type Error = ChartError;

    fn try_from(raw: RawBirthMoment) -> Result<BirthMoment, ChartError> {
        BirthMoment::new(raw.year, raw.month, raw.day, raw.hour)
    }
}

impl BirthMoment {
    pub fn new(year: i32, month: u32, day: u32, hour: u32) -> Result<BirthMoment, ChartError> {
        if !(1..=12).contains(&month) {
            return Err(ChartError::MonthOutOfRange(month));
        }
        if !(1..=31).contains(&day) {
            return Err(ChartError::DayOutOfRange(day));
        }
        if hour > 23 {
            return Err(ChartError::HourOutOfRange(hour));
        }
        if NaiveDate::from_ymd_opt(year, month, day).is_none() {
            return Err(ChartError::NoSuchDate { year, month, day });
        }
        Ok(BirthMoment {
            year,
            month,
            day,
            hour,
        })
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn day(self) -> u32 {
        self.day
    }

    pub fn hour(self) -> u32 {
        self.hour
    }

    /// Whole days between the Unix epoch and this date.
    fn epoch_days(self) -> i64 {
        // Both dates exist; the fields are validated at construction.
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
        let date =
            NaiveDate::from_ymd_opt(self.year, self.month, self.day).unwrap_or(NaiveDate::MIN);
        date.signed_duration_since(epoch).num_days()
    }
}

/// One stem-branch pair of a chart. `element` is the element of the stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pillar {
    pub heavenly_stem: HeavenlyStem,
    pub earthly_branch: EarthlyBranch,
    pub element: Element,
}

impl Pillar {
    pub fn new(heavenly_stem: HeavenlyStem, earthly_branch: EarthlyBranch) -> Pillar {
        Pillar {
            heavenly_stem,
            earthly_branch,
            element: heavenly_stem.element(),
        }
    }

    /// The melodic element (纳音) of this stem-branch pair. Every pillar the
    /// calculator produces has one, as its stem and branch indices always
    /// share parity.
    pub fn na_yin(self) -> Option<&'static str> {
        na_yin(self.heavenly_stem, self.earthly_branch)
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.heavenly_stem, self.earthly_branch)
    }
}

/// How often each element appears among the four stems and four branches of
/// a chart. The five counts always sum to 8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiveElementTally {
    pub wood: u32,
    pub fire: u32,
    pub earth: u32,
    pub metal: u32,
    pub water: u32,
}

impl FiveElementTally {
    fn tally(pillars: &[Pillar; 4]) -> FiveElementTally {
        let mut counts = FiveElementTally::default();
        for pillar in pillars {
            counts.add(pillar.heavenly_stem.element());
            counts.add(pillar.earthly_branch.element());
        }
        counts
    }

    fn add(&mut self, element: Element) {
        match element {
            Element::Wood => self.wood += 1,
            Element::Fire => self.fire += 1,
            Element::Earth => self.earth += 1,
            Element::Metal => self.metal += 1,
            Element::Water => self.water += 1,
        }
    }

    pub fn get(self, element: Element) -> u32 {
        match element {
            Element::Wood => self.wood,
            Element::Fire => self.fire,
            Element::Earth => self.earth,
            Element::Metal => self.metal,
            Element::Water => self.water,
        }
    }

    pub fn total(self) -> u32 {
        self.wood + self.fire + self.earth + self.metal + self.water
    }
}

/// One forthcoming calendar year of the forecast sequence. Stem and branch
/// depend only on the year number, not on the birth data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastYear {
    pub year: i32,
    pub heavenly_stem: HeavenlyStem,
    pub earthly_branch: EarthlyBranch,
    pub element: Element,
}

/// A complete computed chart. Immutable once produced; the owning
/// collaborator persists it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResult {
    pub year_pillar: Pillar,
    pub month_pillar: Pillar,
    pub day_pillar: Pillar,
    pub hour_pillar: Pillar,
    pub five_element_tally: FiveElementTally,
    pub forecast: Vec<ForecastYear>,
}

impl ChartResult {
    pub fn pillars(&self) -> [Pillar; 4] {
        [
            self.year_pillar,
            self.month_pillar,
            self.day_pillar,
            self.hour_pillar,
        ]
    }

    /// The day-master stem (日主), the reference point for ten-god and
    /// prosperity analysis.
    pub fn day_master(&self) -> HeavenlyStem {
        self.day_pillar.heavenly_stem
    }
}

// ---------------------------
// ## Error Handling
// ---------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChartError {
    #[error("month out of range: {0}")]
    MonthOutOfRange(u32),
    #[error("day out of range: {0}")]
    DayOutOfRange(u32),
    #[error("hour out of range: {0}")]
    HourOutOfRange(u32),
    #[error("no such calendar date: {year:04}-{month:02}-{day:02}")]
    NoSuchDate { year: i32, month: u32, day: u32 },
}

// ---------------------------
// ## Chart Calculation
// ---------------------------

/// Computes the four pillars, the five-element tally and a ten-year forecast
/// anchored at the current calendar year.
///
/// Lunar input is passed through unchanged (no perpetual-calendar data), and
/// the month, day and hour pillars use simplified formulas without solar-term
/// or true-solar-time corrections. `gender` does not affect the chart itself;
/// it drives the luck-cycle direction in [`compute_luck_cycles`].
pub fn compute_chart(birth: BirthMoment, is_lunar: bool, gender: Gender) -> ChartResult {
    compute_chart_from(birth, is_lunar, gender, Utc::now().year())
}

/// Same as [`compute_chart`] with an explicit forecast start year, so that
/// results are reproducible regardless of the wall clock.
pub fn compute_chart_from(
    birth: BirthMoment,
    is_lunar: bool,
    gender: Gender,
    forecast_start: i32,
) -> ChartResult {
    debug!(
        year = birth.year(),
        month = birth.month(),
        day = birth.day(),
        hour = birth.hour(),
        is_lunar,
        ?gender,
        "computing chart"
    );

    let solar = if is_lunar {
        convert_lunar_to_solar(birth)
    } else {
        birth
    };

    let year_pillar = year_pillar(solar.year());
    let month_pillar = month_pillar(solar.year(), solar.month());
    let day_pillar = day_pillar(solar);
    let hour_pillar = hour_pillar(solar);

    let pillars = [year_pillar, month_pillar, day_pillar, hour_pillar];
    let five_element_tally = FiveElementTally::tally(&pillars);

    ChartResult {
        year_pillar,
        month_pillar,
        day_pillar,
        hour_pillar,
        five_element_tally,
        forecast: forecast_years(forecast_start),
    }
}

// Lunar dates are currently returned unchanged under the solar name; a real
// conversion needs perpetual-calendar data.
fn convert_lunar_to_solar(lunar: BirthMoment) -> BirthMoment {
    lunar
}

pub fn year_pillar(year: i32) -> Pillar {
    let stem = HeavenlyStem::from_index(i64::from(year) - 4);
    let branch = EarthlyBranch::from_index(i64::from(year) - 4);
    Pillar::new(stem, branch)
}

pub fn month_pillar(year: i32, month: u32) -> Pillar {
    let year_stem = HeavenlyStem::from_index(i64::from(year) - 4);
    let month_index = i64::from(month) - 1;
    let stem = HeavenlyStem::from_index(year_stem.month_stem_offset() + month_index);
    // 正月建寅: month 1 sits on the third branch.
    let branch = EarthlyBranch::from_index(month_index + 2);
    Pillar::new(stem, branch)
}

pub fn day_pillar(solar: BirthMoment) -> Pillar {
    let index = day_cycle_index(solar);
    Pillar::new(
        HeavenlyStem::from_index(index),
        EarthlyBranch::from_index(index),
    )
}

pub fn hour_pillar(solar: BirthMoment) -> Pillar {
    let hour_index = i64::from(solar.hour() / 2);
    let day_index = day_cycle_index(solar);
    let stem = HeavenlyStem::from_index(day_index.rem_euclid(10) * 2 + hour_index);
    let branch = EarthlyBranch::from_index(hour_index);
    Pillar::new(stem, branch)
}

// Position of the date in the 60-term day cycle: epoch-day count plus a fixed
// alignment offset. An authoritative version would use a perpetual calendar.
fn day_cycle_index(solar: BirthMoment) -> i64 {
    (solar.epoch_days() + 49).rem_euclid(60)
}

/// Ten consecutive forecast years starting at `start_year`, each derived by
/// the year-pillar formula applied to the year number itself.
pub fn forecast_years(start_year: i32) -> Vec<ForecastYear> {
    (0..10)
        .map(|i| {
            let year = start_year + i;
            let stem = HeavenlyStem::from_index(i64::from(year) - 4);
            let branch = EarthlyBranch::from_index(i64::from(year) - 4);
            ForecastYear {
                year,
                heavenly_stem: stem,
                earthly_branch: branch,
                element: stem.element(),
            }
        })
        .collect()
}

// ---------------------------
// ## Luck Cycles
// ---------------------------

/// One ten-year luck cycle (大运).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuckCycle {
    pub index: u32,
    pub start_age: i32,
    pub end_age: i32,
    pub start_year: i32,
    pub end_year: i32,
    pub heavenly_stem: HeavenlyStem,
    pub earthly_branch: EarthlyBranch,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuckCycleSet {
    pub start_age: i32,
    pub start_year: i32,
    pub cycles: Vec<LuckCycle>,
}

/// Ten decade cycles stepping the month pillar through the sexagenary cycle:
/// forward for yang-year males and yin-year females, backward otherwise. The
/// start age is a simplified estimate, not a solar-term computation.
pub fn compute_luck_cycles(birth: BirthMoment, gender: Gender) -> LuckCycleSet {
    compute_luck_cycles_from(birth, gender, Utc::now().year())
}

/// Same as [`compute_luck_cycles`] with an explicit current year for the
/// `is_current` flags.
pub fn compute_luck_cycles_from(
    birth: BirthMoment,
    gender: Gender,
    current_year: i32,
) -> LuckCycleSet {
    let year_stem = year_pillar(birth.year()).heavenly_stem;
    let month = month_pillar(birth.year(), birth.month());

    let forward = matches!(
        (year_stem.polarity(), gender),
        (Polarity::Yang, Gender::Male) | (Polarity::Yin, Gender::Female)
    );

    let start_age = if forward {
        1 + birth.year().rem_euclid(6)
    } else {
        4 + birth.year().rem_euclid(6)
    };
    let start_year = birth.year() + start_age;

    let stem_base = month.heavenly_stem.index();
    let branch_base = month.earthly_branch.index();

    let cycles = (0..10i64)
        .map(|i| {
            let step = if forward { i } else { -i };
            let cycle_start_age = start_age + 10 * i as i32;
            let cycle_start_year = start_year + 10 * i as i32;
            LuckCycle {
                index: i as u32 + 1,
                start_age: cycle_start_age,
                end_age: cycle_start_age + 9,
                start_year: cycle_start_year,
                end_year: cycle_start_year + 9,
                heavenly_stem: HeavenlyStem::from_index(stem_base + step),
                earthly_branch: EarthlyBranch::from_index(branch_base + step),
                is_current: current_year >= cycle_start_year
                    && current_year <= cycle_start_year + 9,
            }
        })
        .collect();

    LuckCycleSet {
        start_age,
        start_year,
        cycles,
    }
}
