//! The built-in pivot formula catalog.
//!
//! Every formula is a pure function of one prior-session OHLC input set. A
//! formula that needs an absent optional open returns `None` ("not
//! applicable") and is skipped by the caller rather than defaulted.

use crate::data::{round2, ComputedLevel, LevelType, OhlcInput};

/// Raw output of one formula: (label, value) pairs. Labels are unique within
/// one formula but shared freely across formulas (every formula has a "PP").
type LevelMap = Vec<(&'static str, f64)>;

/// One catalog entry. The set is fixed at compile time; there are no
/// user-defined formulas.
pub struct FormulaDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    compute: fn(&OhlcInput) -> Option<LevelMap>,
}

impl FormulaDef {
    /// Evaluate against one input set: compute, drop non-finite values,
    /// round survivors to 2 decimals and tag them with a level type.
    /// Returns `None` when the formula is not applicable to these inputs.
    pub fn evaluate(&self, input: &OhlcInput) -> Option<Vec<ComputedLevel>> {
        let raw = (self.compute)(input)?;
        let levels = raw
            .into_iter()
            .filter(|(_, value)| value.is_finite())
            .map(|(label, value)| ComputedLevel {
                formula: self.name.to_string(),
                label: label.to_string(),
                value: round2(value),
                level_type: LevelType::from_label(label),
            })
            .collect();
        Some(levels)
    }
}

/// Formula identifiers selected on first run or after a full reset.
pub const DEFAULT_SELECTION: [&str; 3] = ["classic-extended", "standard", "four-point"];

pub fn catalog() -> &'static [FormulaDef] {
    CATALOG
}

pub fn find(id: &str) -> Option<&'static FormulaDef> {
    CATALOG.iter().find(|f| f.id == id)
}

fn classic_extended(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let r1 = pp * 2.0 - l;
    let r2 = pp + (h - l);
    let r3 = 2.0 * pp + (h - 2.0 * l);
    let r4 = 3.0 * pp + (h - 3.0 * l);
    let s1 = pp * 2.0 - h;
    let s2 = pp - (h - l);
    let s3 = 2.0 * pp - (2.0 * h - l);
    let s4 = 3.0 * pp - (3.0 * h - l);
    Some(vec![
        ("PP", pp),
        ("R0.5", (r1 + pp) / 2.0),
        ("R1", r1),
        ("R1.5", (r1 + r2) / 2.0),
        ("R2", r2),
        ("R2.5", (r2 + r3) / 2.0),
        ("R3", r3),
        ("R3.5", (r3 + r4) / 2.0),
        ("R4", r4),
        ("S0.5", (s1 + pp) / 2.0),
        ("S1", s1),
        ("S1.5", (s1 + s2) / 2.0),
        ("S2", s2),
        ("S2.5", (s2 + s3) / 2.0),
        ("S3", s3),
        ("S3.5", (s3 + s4) / 2.0),
        ("S4", s4),
    ])
}

fn standard(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    Some(vec![
        ("PP", pp),
        ("R1", pp * 2.0 - l),
        ("R2", pp + (h - l)),
        ("R3", h + (h - l)),
        ("R4", pp + 3.0 * (h - l)),
        ("S1", pp * 2.0 - h),
        ("S2", pp - (h - l)),
        ("S3", 2.0 * pp - h - (h - l)),
        ("S4", pp - 3.0 * (h - l)),
    ])
}

fn four_point(i: &OhlcInput) -> Option<LevelMap> {
    let today_open = i.today_open?;
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c + today_open) / 4.0;
    Some(vec![
        ("PP", pp),
        ("R1", pp * 2.0 - l),
        ("R2", pp + (h - l)),
        ("R3", 2.0 * pp + (h - 2.0 * l)),
        ("R4", 3.0 * pp + (h - 3.0 * l)),
        ("S1", pp * 2.0 - h),
        ("S2", pp - (h - l)),
        ("S3", 2.0 * pp - (2.0 * h - l)),
        ("S4", 3.0 * pp - (3.0 * h - l)),
    ])
}

fn double_open(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    // Today's open when provided, else yesterday's close stands in.
    let open = i.today_open.unwrap_or(c);
    let pp = (h + l + open + open) / 4.0;
    Some(vec![
        ("PP", pp),
        ("R1", pp * 2.0 - l),
        ("R2", pp + (h - l)),
        ("R3", 2.0 * pp + (h - 2.0 * l)),
        ("S1", pp * 2.0 - h),
        ("S2", pp - (h - l)),
        ("S3", 2.0 * pp - (2.0 * h - l)),
        ("S4", 3.0 * pp - (3.0 * h - l)),
    ])
}

fn linear(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    Some(vec![
        ("PP", pp),
        ("R1", 2.0 * pp - l),
        ("R2", pp + (h - l)),
        ("R3", pp + 2.0 * (h - l)),
        ("R4", pp + 3.0 * (h - l)),
        ("S1", 2.0 * pp - h),
        ("S2", pp - (h - l)),
        ("S3", pp - 2.0 * (h - l)),
        ("S4", pp - 3.0 * (h - l)),
    ])
}

fn complex_range(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let range = h - l;
    Some(vec![
        ("PP", pp),
        ("R0.5", c + range * 1.1 / 18.0),
        ("R1", c + range * 1.1 / 12.0),
        ("R1.5", c + range * 1.1 / 9.0),
        ("R2", c + range * 1.1 / 6.0),
        ("R2.5", c + range * 1.1 / 5.0),
        ("R3", c + range * 1.1 / 4.0),
        ("R3.5", c + range * 1.1 / 3.0),
        ("R4", c + range * 1.1 / 2.0),
        ("R4.5", c + range * 1.1 / 1.33),
        // Ratio term goes non-finite when low is zero; evaluate() filters it.
        ("R5", (h / l) * c),
        ("S0.5", c - range * 1.1 / 18.0),
        ("S1", c - range * 1.1 / 12.0),
        ("S1.5", c - range * 1.1 / 9.0),
        ("S2", c - range * 1.1 / 6.0),
        ("S2.5", c - range * 1.1 / 5.0),
        ("S3", c - range * 1.1 / 4.0),
        ("S3.5", c - range * 1.1 / 3.0),
        ("S4", c - range * 1.1 / 2.0),
        ("S4.5", c - range * 1.1 / 1.33),
    ])
}

fn conditional(i: &OhlcInput) -> Option<LevelMap> {
    let yesterday_open = i.yesterday_open?;
    let (h, l, c) = (i.high, i.low, i.close);
    let x = if c < yesterday_open {
        h + l + l + c
    } else if c > yesterday_open {
        h + h + l + c
    } else {
        h + l + c + c
    };
    Some(vec![("PP", x / 4.0), ("R1", x / 2.0), ("S1", x / 2.0)])
}

fn fibonacci(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let range = h - l;
    Some(vec![
        ("PP", pp),
        ("R1", pp + range / 2.0),
        ("R2", pp + range * 0.618),
        ("R3", pp + range),
        ("S1", pp - range / 2.0),
        ("S2", pp - range * 0.618),
        ("S3", pp - range),
    ])
}

fn classic_standard(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let r1 = 2.0 * pp - l;
    let s1 = 2.0 * pp - h;
    Some(vec![
        ("PP", pp),
        ("R1", r1),
        ("R2", pp + (r1 - s1)),
        ("R3", h + 2.0 * (pp - l)),
        ("S1", s1),
        ("S2", pp - (r1 - s1)),
        ("S3", l - 2.0 * (h - pp)),
    ])
}

fn square_root(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let step = pp.sqrt().sqrt();
    Some(vec![
        ("PP", pp),
        ("R1", pp + step),
        ("R2", pp + 2.0 * step),
        ("R3", pp + 3.0 * step),
        ("S1", pp - step),
        ("S2", pp - 2.0 * step),
        ("S3", pp - 3.0 * step),
    ])
}

fn progressive(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let r1 = 2.0 * pp - l;
    let r2 = pp + (h - l);
    let r3 = r1 + (h - l);
    let s1 = 2.0 * pp - h;
    let s2 = pp - (h - l);
    let s3 = s1 - (h - l);
    Some(vec![
        ("PP", pp),
        ("R1", r1),
        ("R2", r2),
        ("R3", r3),
        ("R4", r3 + (r2 - r1)),
        ("S1", s1),
        ("S2", s2),
        ("S3", s3),
        ("S4", s3 - (s2 - s1)),
    ])
}

fn fibonacci_extended(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let range = h - l;
    Some(vec![
        ("PP", pp),
        ("R0.5", pp + 0.5 * range),
        ("R1", pp + 0.618 * range),
        ("R1.5", pp + range),
        ("R2", pp + 1.272 * range),
        ("R2.5", pp + 1.618 * range),
        ("R3", pp + 2.0 * range),
        ("R4", pp + 2.618 * range),
        ("S0.5", pp - 0.5 * range),
        ("S1", pp - 0.618 * range),
        ("S1.5", pp - range),
        ("S2", pp - 1.272 * range),
        ("S2.5", pp - 1.618 * range),
        ("S3", pp - 2.0 * range),
        ("S4", pp - 2.618 * range),
    ])
}

fn golden_ratio(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let range = h - l;
    let r1 = pp + 0.382 * range;
    let r2 = pp + 0.618 * range;
    let r3 = pp + range;
    let s1 = pp - 0.382 * range;
    let s2 = pp - 0.618 * range;
    let s3 = pp - range;
    Some(vec![
        ("PP", pp),
        ("R0.5", (r1 + pp) / 2.0),
        ("R1", r1),
        ("R1.5", (r1 + r2) / 2.0),
        ("R2", r2),
        ("R2.5", (r3 + r2) / 2.0),
        ("R3", r3),
        ("S0.5", (s1 + pp) / 2.0),
        ("S1", s1),
        ("S1.5", (s1 + s2) / 2.0),
        ("S2", s2),
        ("S2.5", (s3 + s2) / 2.0),
        ("S3", s3),
    ])
}

fn advanced_resistance(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let r1 = 2.0 * pp - l;
    let s1 = 2.0 * pp - h;
    let r2 = pp - (h - l) + r1;
    Some(vec![
        ("PP", pp),
        ("R1", r1),
        ("R2", r2),
        ("R3", pp - (h - l) + r2),
        ("S1", s1),
        ("S2", pp - (r1 - s1)),
        ("S3", pp - (r2 - s1)),
    ])
}

fn fibonacci_range(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let range = h - l;
    Some(vec![
        ("PP", pp),
        ("R1", pp + range / 2.0),
        ("R1.5", pp + range * 0.618),
        ("R2", pp + range),
        ("R2.5", pp + range * 1.382),
        ("S1", pp - range / 2.0),
        ("S1.5", pp - range * 0.618),
        ("S2", pp - range),
        ("S2.5", pp - range * 1.382),
    ])
}

fn midpoint(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let s1 = (h + l) / 2.0;
    Some(vec![("PP", pp), ("R1", (pp - s1) + pp), ("S1", s1)])
}

fn three_quarter_range(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    Some(vec![
        ("PP", pp),
        ("R1", pp + (h - l) * 0.75),
        ("S1", pp - (h - l) * 0.75),
    ])
}

fn double_open_weighted(i: &OhlcInput) -> Option<LevelMap> {
    let today_open = i.today_open?;
    let (h, l) = (i.high, i.low);
    let pp = (h + l + 2.0 * today_open) / 4.0;
    Some(vec![
        ("PP", pp),
        ("R1", pp + 2.0 * (h - l)),
        ("S1", pp - 2.0 * (h - l)),
    ])
}

fn absolute_midpoint(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let diff = ((h + l) / 2.0 - pp).abs();
    Some(vec![("PP", pp), ("R1", pp + diff), ("S1", pp - diff)])
}

fn extended_fibonacci(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let range = h - l;
    Some(vec![
        ("PP", pp),
        ("R1", pp + 0.5 * range),
        ("R2", pp + 0.618 * range),
        ("R3", pp + range),
        ("R4", pp + 1.382 * range),
        ("R5", pp + 1.618 * range),
        ("R6", pp + 2.0 * range),
        ("R7", pp + 2.618 * range),
        ("S1", pp - 0.5 * range),
        ("S2", pp - 0.618 * range),
        ("S3", pp - range),
        ("S4", pp - 1.382 * range),
        ("S5", pp - 1.618 * range),
        ("S6", pp - 2.0 * range),
        ("S7", pp - 2.618 * range),
    ])
}

fn prior_range_extension(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let s1 = (h + l) / 2.0;
    let range = h - l;
    Some(vec![
        ("PP", pp),
        ("R1", pp + (pp - s1)),
        ("R2", h + range * 0.25),
        ("R3", h + range * 0.5),
        ("R4", h + range * 0.75),
        ("R5", h + range),
        ("S1", s1),
        ("S2", l - range * 0.25),
        ("S3", l - range * 0.5),
        ("S4", l - range * 0.75),
        ("S5", l - range),
    ])
}

fn enhanced_fibonacci(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let range = h - l;
    Some(vec![
        ("PP", pp),
        ("R1", pp + 0.382 * range),
        ("R2", pp + 0.618 * range),
        ("R3", pp + 0.786 * range),
        ("R4", pp + range),
        ("R5", pp + 1.382 * range),
        ("R6", pp + 1.618 * range),
        ("R7", pp + 2.0 * range),
        ("S1", pp - 0.382 * range),
        ("S2", pp - 0.618 * range),
        ("S3", pp - 0.786 * range),
        ("S4", pp - range),
        ("S5", pp - 1.382 * range),
        ("S6", pp - 1.618 * range),
        ("S7", pp - 2.0 * range),
    ])
}

fn pivot_high_low(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = (h + l + c) / 3.0;
    let range = h - l;
    let mid = (h + l) / 2.0;
    let r = pp - mid;
    let r1 = 2.0 * pp - h;
    let s1 = 2.0 * pp - l;
    let r2 = 2.0 * pp + (r1 - s1);
    let s2 = 2.0 * pp - (r1 - s1);
    let r3 = r1 + range;
    let s3 = s1 - range;
    Some(vec![
        ("PP", pp),
        ("PP-HIGH", pp + r),
        ("PP-LOW", pp - r),
        ("R1", r1),
        ("R2", r2),
        ("R3", r3),
        ("R4", r3 + (r2 - r1)),
        ("S1", s1),
        ("S2", s2),
        ("S3", s3),
        ("S4", s3 - (s2 - s1)),
    ])
}

fn pivotz(i: &OhlcInput) -> Option<LevelMap> {
    let (h, l, c) = (i.high, i.low, i.close);
    let pp = c;
    let range = h - l;
    Some(vec![
        ("PP", pp),
        ("R1", pp + 0.0916 * range),
        ("R2", pp + 0.183 * range),
        ("R3", pp + 0.275 * range),
        ("R4", pp + 0.555 * range),
        ("R5", pp + 0.8244 * range),
        ("R6", pp + 1.0076 * range),
        ("S1", pp - 0.0916 * range),
        ("S2", pp - 0.183 * range),
        ("S3", pp - 0.275 * range),
        ("S4", pp - 0.55 * range),
        ("S5", pp - 0.8244 * range),
        ("S6", pp - 1.0992 * range),
    ])
}

static CATALOG: &[FormulaDef] = &[
    FormulaDef {
        id: "classic-extended",
        name: "CLASSIC PIVOT (EXTENDED)",
        description: "Classic pivot with half levels (R0.5, R1, R1.5, etc.)",
        compute: classic_extended,
    },
    FormulaDef {
        id: "standard",
        name: "STANDARD PIVOT",
        description: "Traditional pivot point formula",
        compute: standard,
    },
    FormulaDef {
        id: "four-point",
        name: "FOUR POINT PIVOT",
        description: "Uses yesterday's OHLC + today's open",
        compute: four_point,
    },
    FormulaDef {
        id: "double-open",
        name: "DOUBLE OPEN PIVOT",
        description: "Uses current open twice in calculation",
        compute: double_open,
    },
    FormulaDef {
        id: "linear",
        name: "LINEAR PIVOT",
        description: "Linear progression pivot levels",
        compute: linear,
    },
    FormulaDef {
        id: "complex-range",
        name: "COMPLEX RANGE PIVOT",
        description: "Complex calculation with range multipliers",
        compute: complex_range,
    },
    FormulaDef {
        id: "conditional",
        name: "CONDITIONAL PIVOT",
        description: "Changes calculation based on close vs open relationship",
        compute: conditional,
    },
    FormulaDef {
        id: "fibonacci",
        name: "FIBONACCI PIVOT",
        description: "Uses Fibonacci ratios for level calculation",
        compute: fibonacci,
    },
    FormulaDef {
        id: "classic-standard",
        name: "CLASSIC STANDARD",
        description: "Classic standard pivot calculation",
        compute: classic_standard,
    },
    FormulaDef {
        id: "square-root",
        name: "SQUARE ROOT PIVOT",
        description: "Uses square root calculations for levels",
        compute: square_root,
    },
    FormulaDef {
        id: "progressive",
        name: "PROGRESSIVE PIVOT",
        description: "Progressive calculation method",
        compute: progressive,
    },
    FormulaDef {
        id: "fibonacci-extended",
        name: "FIBONACCI EXTENDED",
        description: "Extended Fibonacci ratios for pivot calculation",
        compute: fibonacci_extended,
    },
    FormulaDef {
        id: "golden-ratio",
        name: "GOLDEN RATIO PIVOT",
        description: "Golden ratio based pivot calculations",
        compute: golden_ratio,
    },
    FormulaDef {
        id: "advanced-resistance",
        name: "ADVANCED RESISTANCE PIVOT",
        description: "Advanced resistance calculation method",
        compute: advanced_resistance,
    },
    FormulaDef {
        id: "fibonacci-range",
        name: "FIBONACCI RANGE PIVOT",
        description: "Fibonacci ratios with daily range",
        compute: fibonacci_range,
    },
    FormulaDef {
        id: "midpoint",
        name: "MIDPOINT PIVOT",
        description: "Midpoint based calculation",
        compute: midpoint,
    },
    FormulaDef {
        id: "three-quarter-range",
        name: "75% PIVOT",
        description: "75% range pivot calculation",
        compute: three_quarter_range,
    },
    FormulaDef {
        id: "double-open-weighted",
        name: "DOUBLE OPEN WEIGHTED",
        description: "Weighted with double today's open",
        compute: double_open_weighted,
    },
    FormulaDef {
        id: "absolute-midpoint",
        name: "ABSOLUTE MIDPOINT",
        description: "Absolute midpoint difference",
        compute: absolute_midpoint,
    },
    FormulaDef {
        id: "extended-fibonacci",
        name: "EXTENDED FIBONACCI",
        description: "Extended Fibonacci levels",
        compute: extended_fibonacci,
    },
    FormulaDef {
        id: "prior-range",
        name: "PRIOR RANGE EXTENSION",
        description: "Prior range extension method",
        compute: prior_range_extension,
    },
    FormulaDef {
        id: "enhanced-fibonacci",
        name: "ENHANCED FIBONACCI",
        description: "Enhanced Fibonacci with 0.786 level",
        compute: enhanced_fibonacci,
    },
    FormulaDef {
        id: "pivot-high-low",
        name: "PIVOT POINT HIGH/LOW",
        description: "Pivot point high and low calculation",
        compute: pivot_high_low,
    },
    FormulaDef {
        id: "pivotz",
        name: "PIVOTZ ALGORITHM",
        description: "Special algorithm with precise multipliers",
        compute: pivotz,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> OhlcInput {
        OhlcInput::new(100.0, 90.0, 95.0)
    }

    fn level(levels: &[ComputedLevel], label: &str) -> f64 {
        levels
            .iter()
            .find(|lv| lv.label == label)
            .unwrap_or_else(|| panic!("missing level {label}"))
            .value
    }

    #[test]
    fn catalog_is_complete_and_ids_unique() {
        assert_eq!(catalog().len(), 24);
        let mut ids: Vec<_> = catalog().iter().map(|f| f.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 24);
    }

    #[test]
    fn standard_pivot_reference_values() {
        let levels = find("standard").unwrap().evaluate(&input()).unwrap();
        assert_eq!(level(&levels, "PP"), 95.0);
        assert_eq!(level(&levels, "R1"), 100.0);
        assert_eq!(level(&levels, "S1"), 90.0);
    }

    #[test]
    fn open_requiring_formulas_are_not_applicable_without_open() {
        for id in ["four-point", "double-open-weighted"] {
            let def = find(id).unwrap();
            assert!(def.evaluate(&input()).is_none(), "{id} should need open");

            let mut with_open = input();
            with_open.today_open = Some(96.0);
            assert!(def.evaluate(&with_open).is_some());
        }

        let def = find("conditional").unwrap();
        assert!(def.evaluate(&input()).is_none());
        let mut with_prev = input();
        with_prev.yesterday_open = Some(94.0);
        assert!(def.evaluate(&with_prev).is_some());
    }

    #[test]
    fn double_open_substitutes_close_for_missing_open() {
        let def = find("double-open").unwrap();
        // (100 + 90 + 95 + 95) / 4 = 95
        let levels = def.evaluate(&input()).unwrap();
        assert_eq!(level(&levels, "PP"), 95.0);

        let mut with_open = input();
        with_open.today_open = Some(98.0);
        let levels = def.evaluate(&with_open).unwrap();
        assert_eq!(level(&levels, "PP"), 96.5);
    }

    #[test]
    fn conditional_branches_on_close_versus_prior_open() {
        let def = find("conditional").unwrap();

        let mut i = input();
        i.yesterday_open = Some(96.0); // close 95 < open 96
        let levels = def.evaluate(&i).unwrap();
        assert_eq!(level(&levels, "PP"), round2((100.0 + 90.0 + 90.0 + 95.0) / 4.0));

        i.yesterday_open = Some(94.0); // close above open
        let levels = def.evaluate(&i).unwrap();
        assert_eq!(level(&levels, "PP"), round2((100.0 + 100.0 + 90.0 + 95.0) / 4.0));

        i.yesterday_open = Some(95.0); // equal
        let levels = def.evaluate(&i).unwrap();
        assert_eq!(level(&levels, "PP"), round2((100.0 + 90.0 + 95.0 + 95.0) / 4.0));
    }

    #[test]
    fn non_finite_values_are_filtered_not_surfaced() {
        // Zero low drives the ratio term in the complex-range formula to
        // infinity; the rest of the mapping must still come through.
        let i = OhlcInput::new(10.0, 0.0, 5.0);
        let levels = find("complex-range").unwrap().evaluate(&i).unwrap();
        assert!(levels.iter().all(|lv| lv.value.is_finite()));
        assert!(!levels.iter().any(|lv| lv.label == "R5"));
        assert!(levels.iter().any(|lv| lv.label == "R4"));
    }

    #[test]
    fn every_formula_is_total_over_valid_inputs() {
        let cases = [
            OhlcInput::new(100.0, 90.0, 95.0),
            OhlcInput::new(50.0, 50.0, 50.0),
            OhlcInput::new(0.02, 0.01, 0.015),
            OhlcInput {
                high: 23150.0,
                low: 22980.0,
                close: 23100.0,
                today_open: Some(23050.0),
                yesterday_open: Some(23000.0),
            },
        ];
        for case in cases {
            for def in catalog() {
                if let Some(levels) = def.evaluate(&case) {
                    assert!(
                        levels.iter().all(|lv| lv.value.is_finite()),
                        "{} produced a non-finite level",
                        def.id
                    );
                }
            }
        }
    }

    #[test]
    fn labels_unique_within_formula_and_values_rounded() {
        let mut i = input();
        i.today_open = Some(96.0);
        i.yesterday_open = Some(94.0);
        for def in catalog() {
            let levels = def.evaluate(&i).unwrap();
            let mut labels: Vec<_> = levels.iter().map(|lv| lv.label.clone()).collect();
            labels.sort();
            let before = labels.len();
            labels.dedup();
            assert_eq!(labels.len(), before, "{} repeats a label", def.id);
            for lv in &levels {
                assert_eq!(lv.value, round2(lv.value), "{} not rounded", def.id);
            }
        }
    }

    #[test]
    fn default_selection_names_real_formulas() {
        for id in DEFAULT_SELECTION {
            assert!(find(id).is_some());
        }
    }
}
