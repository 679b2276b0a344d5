use serde::{Deserialize, Serialize};

use super::*;

// ---------------------------
// ## Ten Gods
// ---------------------------

/// The ten gods (十神): the relation of a stem to the day-master stem.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TenGod {
    #[serde(rename = "比肩")]
    Friend,
    #[serde(rename = "劫财")]
    RobWealth,
    #[serde(rename = "食神")]
    EatingGod,
    #[serde(rename = "伤官")]
    HurtingOfficer,
    #[serde(rename = "偏财")]
    IndirectWealth,
    #[serde(rename = "正财")]
    DirectWealth,
    #[serde(rename = "七杀")]
    SevenKillings,
    #[serde(rename = "正官")]
    DirectOfficer,
    #[serde(rename = "偏印")]
    IndirectResource,
    #[serde(rename = "正印")]
    DirectResource,
}

impl TenGod {
    pub fn symbol(self) -> &'static str {
        match self {
            TenGod::Friend => "比肩",
            TenGod::RobWealth => "劫财",
            TenGod::EatingGod => "食神",
            TenGod::HurtingOfficer => "伤官",
            TenGod::IndirectWealth => "偏财",
            TenGod::DirectWealth => "正财",
            TenGod::SevenKillings => "七杀",
            TenGod::DirectOfficer => "正官",
            TenGod::IndirectResource => "偏印",
            TenGod::DirectResource => "正印",
        }
    }

    /// The ten god `other` is with respect to `day_master`, from the stem
    /// index difference. Yang and yin day masters read the difference through
    /// mirrored tables.
    pub fn between(day_master: HeavenlyStem, other: HeavenlyStem) -> TenGod {
        let diff = (other.index() - day_master.index()).rem_euclid(10);
        match day_master.polarity() {
            Polarity::Yang => match diff {
                0 => TenGod::Friend,
                1 => TenGod::RobWealth,
                2 => TenGod::EatingGod,
                3 => TenGod::HurtingOfficer,
                4 => TenGod::IndirectWealth,
                5 => TenGod::DirectWealth,
                6 => TenGod::SevenKillings,
                7 => TenGod::DirectOfficer,
                8 => TenGod::IndirectResource,
                _ => TenGod::DirectResource,
            },
            Polarity::Yin => match diff {
                0 => TenGod::Friend,
                9 => TenGod::RobWealth,
                8 => TenGod::EatingGod,
                7 => TenGod::HurtingOfficer,
                6 => TenGod::IndirectWealth,
                5 => TenGod::DirectWealth,
                4 => TenGod::SevenKillings,
                3 => TenGod::DirectOfficer,
                2 => TenGod::IndirectResource,
                _ => TenGod::DirectResource,
            },
        }
    }
}

/// Ten gods of the year, month and hour stems relative to the day master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenGods {
    pub year: TenGod,
    pub month: TenGod,
    pub hour: TenGod,
}

// ---------------------------
// ## Prosperity Phases
// ---------------------------

/// Prosperity (旺衰) of the day master against a branch element.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProsperityPhase {
    #[serde(rename = "旺")]
    Prosperous,
    #[serde(rename = "相")]
    Assisted,
    #[serde(rename = "休")]
    Resting,
    #[serde(rename = "囚")]
    Trapped,
    #[serde(rename = "死")]
    Dead,
}

impl ProsperityPhase {
    pub fn symbol(self) -> &'static str {
        match self {
            ProsperityPhase::Prosperous => "旺",
            ProsperityPhase::Assisted => "相",
            ProsperityPhase::Resting => "休",
            ProsperityPhase::Trapped => "囚",
            ProsperityPhase::Dead => "死",
        }
    }
}

/// Phase of the day master over a branch, read off the generating and
/// overcoming cycles. Any two elements stand in exactly one of the five
/// relations, so the match is total.
pub fn prosperity_phase(day_master: HeavenlyStem, branch: EarthlyBranch) -> ProsperityPhase {
    let master = day_master.element();
    let target = branch.element();
    if target == master {
        ProsperityPhase::Prosperous
    } else if master.generates() == target {
        ProsperityPhase::Assisted
    } else if master.overcomes() == target {
        ProsperityPhase::Resting
    } else if target.generates() == master {
        ProsperityPhase::Dead
    } else {
        ProsperityPhase::Trapped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProsperityPhases {
    pub year: ProsperityPhase,
    pub month: ProsperityPhase,
    pub day: ProsperityPhase,
    pub hour: ProsperityPhase,
}

impl ChartResult {
    pub fn ten_gods(&self) -> TenGods {
        let day_master = self.day_master();
        TenGods {
            year: TenGod::between(day_master, self.year_pillar.heavenly_stem),
            month: TenGod::between(day_master, self.month_pillar.heavenly_stem),
            hour: TenGod::between(day_master, self.hour_pillar.heavenly_stem),
        }
    }

    pub fn prosperity_phases(&self) -> ProsperityPhases {
        let day_master = self.day_master();
        ProsperityPhases {
            year: prosperity_phase(day_master, self.year_pillar.earthly_branch),
            month: prosperity_phase(day_master, self.month_pillar.earthly_branch),
            day: prosperity_phase(day_master, self.day_pillar.earthly_branch),
            hour: prosperity_phase(day_master, self.hour_pillar.earthly_branch),
        }
    }
}

// ---------------------------
// ## Na Yin
// ---------------------------

/// The melodic element (纳音) of a stem-branch pair. `None` for the pairs
/// outside the sexagenary cycle (stem and branch of unequal parity).
pub fn na_yin(stem: HeavenlyStem, branch: EarthlyBranch) -> Option<&'static str> {
    use EarthlyBranch as B;
    use HeavenlyStem as S;

    let name = match (stem, branch) {
        (S::Jia, B::Zi) | (S::Yi, B::Chou) => "海中金",
        (S::Bing, B::Yin) | (S::Ding, B::Mao) => "炉中火",
        (S::Wu, B::Chen) | (S::Ji, B::Si) => "大林木",
        (S::Geng, B::Wu) | (S::Xin, B::Wei) => "路旁土",
        (S::Ren, B::Shen) | (S::Gui, B::You) => "剑锋金",
        (S::Jia, B::Xu) | (S::Yi, B::Hai) => "山头火",
        (S::Bing, B::Zi) | (S::Ding, B::Chou) => "涧下水",
        (S::Wu, B::Yin) | (S::Ji, B::Mao) => "城头土",
        (S::Geng, B::Chen) | (S::Xin, B::Si) => "白蜡金",
        (S::Ren, B::Wu) | (S::Gui, B::Wei) => "杨柳木",
        (S::Jia, B::Shen) | (S::Yi, B::You) => "泉中水",
        (S::Bing, B::Xu) | (S::Ding, B::Hai) => "屋上土",
        (S::Wu, B::Zi) | (S::Ji, B::Chou) => "霹雳火",
        (S::Geng, B::Yin) | (S::Xin, B::Mao) => "松柏木",
        (S::Ren, B::Chen) | (S::Gui, B::Si) => "长流水",
        (S::Jia, B::Wu) | (S::Yi, B::Wei) => "砂石金",
        (S::Bing, B::Shen) | (S::Ding, B::You) => "山下火",
        (S::Wu, B::Xu) | (S::Ji, B::Hai) => "平地木",
        (S::Geng, B::Zi) | (S::Xin, B::Chou) => "壁上土",
        (S::Ren, B::Yin) | (S::Gui, B::Mao) => "金薄金",
        (S::Jia, B::Chen) | (S::Yi, B::Si) => "覆灯火",
        (S::Bing, B::Wu) | (S::Ding, B::Wei) => "天河水",
        (S::Wu, B::Shen) | (S::Ji, B::You) => "大驿土",
        (S::Geng, B::Xu) | (S::Xin, B::Hai) => "钗钏金",
        (S::Ren, B::Zi) | (S::Gui, B::Chou) => "桑柘木",
        (S::Jia, B::Yin) | (S::Yi, B::Mao) => "大溪水",
        (S::Bing, B::Chen) | (S::Ding, B::Si) => "沙中土",
        (S::Wu, B::Wu) | (S::Ji, B::Wei) => "天上火",
        (S::Geng, B::Shen) | (S::Xin, B::You) => "石榴木",
        (S::Ren, B::Xu) | (S::Gui, B::Hai) => "大海水",
        _ => return None,
    };
    Some(name)
}

// ---------------------------
// ## Branch Relations
// ---------------------------

/// A relation between two earthly branches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchRelation {
    #[serde(rename = "六冲")]
    SixClash,
    #[serde(rename = "三合")]
    TrineCombination,
    #[serde(rename = "六合")]
    SixCombination,
    #[serde(rename = "三会")]
    DirectionalCombination,
    #[serde(rename = "相刑")]
    Punishment,
    #[serde(rename = "相害")]
    Harm,
}

impl BranchRelation {
    pub fn symbol(self) -> &'static str {
        match self {
            BranchRelation::SixClash => "六冲",
            BranchRelation::TrineCombination => "三合",
            BranchRelation::SixCombination => "六合",
            BranchRelation::DirectionalCombination => "三会",
            BranchRelation::Punishment => "相刑",
            BranchRelation::Harm => "相害",
        }
    }
}

// Trine groups (三合局): fire, wood, water, metal.
const TRINES: [[EarthlyBranch; 3]; 4] = [
    [EarthlyBranch::Yin, EarthlyBranch::Wu, EarthlyBranch::Xu],
    [EarthlyBranch::Hai, EarthlyBranch::Mao, EarthlyBranch::Wei],
    [EarthlyBranch::Shen, EarthlyBranch::Zi, EarthlyBranch::Chen],
    [EarthlyBranch::Si, EarthlyBranch::You, EarthlyBranch::Chou],
];

// Six-combination pairs (六合), unordered.
const SIX_COMBINATIONS: [(EarthlyBranch, EarthlyBranch); 6] = [
    (EarthlyBranch::Zi, EarthlyBranch::Chou),
    (EarthlyBranch::Yin, EarthlyBranch::Hai),
    (EarthlyBranch::Mao, EarthlyBranch::Xu),
    (EarthlyBranch::Chen, EarthlyBranch::You),
    (EarthlyBranch::Si, EarthlyBranch::Shen),
    (EarthlyBranch::Wu, EarthlyBranch::Wei),
];

// Directional groups (三会): east, south, west, north.
const DIRECTIONAL: [[EarthlyBranch; 3]; 4] = [
    [EarthlyBranch::Yin, EarthlyBranch::Mao, EarthlyBranch::Chen],
    [EarthlyBranch::Si, EarthlyBranch::Wu, EarthlyBranch::Wei],
    [EarthlyBranch::Shen, EarthlyBranch::You, EarthlyBranch::Xu],
    [EarthlyBranch::Hai, EarthlyBranch::Zi, EarthlyBranch::Chou],
];

// Punishment pairs (相刑), ordered: 子卯 and 丑戌 run both ways, the
// 寅巳申 cycle only one way.
const PUNISHMENTS: [(EarthlyBranch, EarthlyBranch); 5] = [
    (EarthlyBranch::Zi, EarthlyBranch::Mao),
    (EarthlyBranch::Mao, EarthlyBranch::Zi),
    (EarthlyBranch::Chou, EarthlyBranch::Xu),
    (EarthlyBranch::Xu, EarthlyBranch::Chou),
    (EarthlyBranch::Yin, EarthlyBranch::Si),
];

// Remaining legs of the 寅巳申 punishment cycle.
const PUNISHMENT_CYCLE: [(EarthlyBranch, EarthlyBranch); 2] = [
    (EarthlyBranch::Si, EarthlyBranch::Shen),
    (EarthlyBranch::Shen, EarthlyBranch::Yin),
];

// Harm pairs (相害), unordered.
const HARMS: [(EarthlyBranch, EarthlyBranch); 6] = [
    (EarthlyBranch::Zi, EarthlyBranch::Wei),
    (EarthlyBranch::Chou, EarthlyBranch::Wu),
    (EarthlyBranch::Yin, EarthlyBranch::Si),
    (EarthlyBranch::Mao, EarthlyBranch::Chen),
    (EarthlyBranch::Shen, EarthlyBranch::Hai),
    (EarthlyBranch::You, EarthlyBranch::Xu),
];

/// The relation between two branches, checked in a fixed precedence order:
/// clash, trine, six-combination, directional, punishment, harm. The
/// punishment tables are direction-sensitive, so the result can differ with
/// the argument order (寅巳 is a punishment, 巳寅 a harm).
pub fn branch_relation(first: EarthlyBranch, second: EarthlyBranch) -> Option<BranchRelation> {
    if (first.index() - second.index()).abs() == 6 {
        return Some(BranchRelation::SixClash);
    }

    for group in &TRINES {
        if group.contains(&first) && group.contains(&second) {
            return Some(BranchRelation::TrineCombination);
        }
    }

    for &(a, b) in &SIX_COMBINATIONS {
        if (first, second) == (a, b) || (first, second) == (b, a) {
            return Some(BranchRelation::SixCombination);
        }
    }

    for group in &DIRECTIONAL {
        if group.contains(&first) && group.contains(&second) {
            return Some(BranchRelation::DirectionalCombination);
        }
    }

    for &pair in PUNISHMENTS.iter().chain(PUNISHMENT_CYCLE.iter()) {
        if (first, second) == pair {
            return Some(BranchRelation::Punishment);
        }
    }

    for &(a, b) in &HARMS {
        if (first, second) == (a, b) || (first, second) == (b, a) {
            return Some(BranchRelation::Harm);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compute_chart_from, BirthMoment, ChartResult, EarthlyBranch, Gender, HeavenlyStem,
    };

    fn chart_1995() -> ChartResult {
        let birth = BirthMoment::new(1995, 6, 15, 12).unwrap();
        compute_chart_from(birth, false, Gender::Male, 2025)
    }

    #[test]
    fn test_ten_god_of_day_master_itself_is_friend() {
        for stem in HeavenlyStem::all() {
            assert_eq!(TenGod::between(stem, stem), TenGod::Friend);
        }
    }

    #[test]
    fn test_ten_gods_for_known_chart() {
        // Day master 己 (yin, index 5); year 乙 reads at difference 6,
        // month 辛 at 2, hour 庚 at 1 through the yin-day table.
        let gods = chart_1995().ten_gods();
        assert_eq!(gods.year, TenGod::IndirectWealth);
        assert_eq!(gods.month, TenGod::IndirectResource);
        assert_eq!(gods.hour, TenGod::DirectResource);
    }

    #[test]
    fn test_ten_god_uses_polarity_specific_tables() {
        // Yang day master 甲: 戊 at difference 4, 庚 at 6.
        assert_eq!(
            TenGod::between(HeavenlyStem::Jia, HeavenlyStem::Wu),
            TenGod::IndirectWealth
        );
        assert_eq!(
            TenGod::between(HeavenlyStem::Jia, HeavenlyStem::Geng),
            TenGod::SevenKillings
        );
        // Yin day master 乙 reads 甲 (difference 9) as rob-wealth.
        assert_eq!(
            TenGod::between(HeavenlyStem::Yi, HeavenlyStem::Jia),
            TenGod::RobWealth
        );
    }

    #[test]
    fn test_prosperity_phases_for_known_chart() {
        // Day master 己 (earth): 亥 water is overcome (休), 未 earth is the
        // same (旺), 酉 metal is generated (相), 午 fire generates (死).
        let phases = chart_1995().prosperity_phases();
        assert_eq!(phases.year, ProsperityPhase::Resting);
        assert_eq!(phases.month, ProsperityPhase::Prosperous);
        assert_eq!(phases.day, ProsperityPhase::Assisted);
        assert_eq!(phases.hour, ProsperityPhase::Dead);
    }

    #[test]
    fn test_prosperity_trapped_when_branch_overcomes() {
        // 甲 wood against 申 metal: metal overcomes wood.
        assert_eq!(
            prosperity_phase(HeavenlyStem::Jia, EarthlyBranch::Shen),
            ProsperityPhase::Trapped
        );
    }

    #[test]
    fn test_na_yin_table_entries() {
        assert_eq!(na_yin(HeavenlyStem::Jia, EarthlyBranch::Zi), Some("海中金"));
        assert_eq!(na_yin(HeavenlyStem::Ji, EarthlyBranch::You), Some("大驿土"));
        assert_eq!(na_yin(HeavenlyStem::Gui, EarthlyBranch::Hai), Some("大海水"));
        // Unequal parity never occurs in the cycle.
        assert_eq!(na_yin(HeavenlyStem::Jia, EarthlyBranch::Chou), None);
    }

    #[test]
    fn test_na_yin_defined_for_every_computed_pillar() {
        for (year, month, day, hour) in [(1960, 1, 5, 3), (1987, 11, 2, 19), (2012, 7, 30, 8)] {
            let birth = BirthMoment::new(year, month, day, hour).unwrap();
            let chart = compute_chart_from(birth, false, Gender::Female, 2025);
            for pillar in chart.pillars() {
                assert!(pillar.na_yin().is_some(), "{}", pillar);
            }
        }
    }

    #[test]
    fn test_branch_relation_precedence() {
        assert_eq!(
            branch_relation(EarthlyBranch::Zi, EarthlyBranch::Wu),
            Some(BranchRelation::SixClash)
        );
        assert_eq!(
            branch_relation(EarthlyBranch::Yin, EarthlyBranch::Xu),
            Some(BranchRelation::TrineCombination)
        );
        assert_eq!(
            branch_relation(EarthlyBranch::Zi, EarthlyBranch::Chou),
            Some(BranchRelation::SixCombination)
        );
        assert_eq!(
            branch_relation(EarthlyBranch::Hai, EarthlyBranch::Zi),
            Some(BranchRelation::DirectionalCombination)
        );
        // 卯辰 appear in the harm table, but the directional east group wins.
        assert_eq!(
            branch_relation(EarthlyBranch::Mao, EarthlyBranch::Chen),
            Some(BranchRelation::DirectionalCombination)
        );
        assert_eq!(
            branch_relation(EarthlyBranch::Zi, EarthlyBranch::Wei),
            Some(BranchRelation::Harm)
        );
        assert_eq!(branch_relation(EarthlyBranch::Zi, EarthlyBranch::You), None);
    }

    #[test]
    fn test_branch_relation_same_branch_falls_into_its_trine() {
        // Every branch shares a trine group with itself.
        for branch in EarthlyBranch::all() {
            assert_eq!(
                branch_relation(branch, branch),
                Some(BranchRelation::TrineCombination)
            );
        }
    }

    #[test]
    fn test_punishment_is_direction_sensitive() {
        assert_eq!(
            branch_relation(EarthlyBranch::Yin, EarthlyBranch::Si),
            Some(BranchRelation::Punishment)
        );
        assert_eq!(
            branch_relation(EarthlyBranch::Si, EarthlyBranch::Yin),
            Some(BranchRelation::Harm)
        );
        assert_eq!(
            branch_relation(EarthlyBranch::Chou, EarthlyBranch::Xu),
            Some(BranchRelation::Punishment)
        );
    }
}
