//! Unicode line-break opportunities (UAX #14, pair-table form).
//!
//! Classes come from the ICU `Line_Break` property; the pair rules below
//! decide, for each adjacent pair of classes, whether a break is direct,
//! allowed only after spaces, or prohibited.

use icu_properties::CodePointMapData;
use icu_properties::props::LineBreak;

/// Line-break classes used by the pair rules
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakClass {
    OP,
    CL,
    CP,
    QU,
    GL,
    NS,
    EX,
    SY,
    IS,
    PR,
    PO,
    NU,
    AL,
    HL,
    ID,
    IN,
    HY,
    BA,
    BB,
    B2,
    ZW,
    CM,
    WJ,
    H2,
    H3,
    JL,
    JV,
    JT,
    RI,
    EB,
    EM,
    ZWJ,
    CB,
    AI,
    BK,
    CJ,
    CR,
    LF,
    NL,
    SA,
    SG,
    SP,
    XX,
}

impl BreakClass {
    /// Raw class of a code point
    pub fn of(c: char) -> BreakClass {
        Self::from_icu(CodePointMapData::<LineBreak>::new().get(c))
    }

    fn from_icu(class: LineBreak) -> BreakClass {
        use BreakClass::*;
        match class {
            LineBreak::Ambiguous => AI,
            LineBreak::Alphabetic => AL,
            LineBreak::BreakBoth => B2,
            LineBreak::BreakAfter => BA,
            LineBreak::BreakBefore => BB,
            LineBreak::MandatoryBreak => BK,
            LineBreak::ContingentBreak => CB,
            LineBreak::ClosePunctuation => CL,
            LineBreak::CombiningMark => CM,
            LineBreak::CarriageReturn => CR,
            LineBreak::Exclamation => EX,
            LineBreak::Glue => GL,
            LineBreak::Hyphen => HY,
            LineBreak::Ideographic => ID,
            LineBreak::Inseparable => IN,
            LineBreak::InfixNumeric => IS,
            LineBreak::LineFeed => LF,
            LineBreak::Nonstarter => NS,
            LineBreak::Numeric => NU,
            LineBreak::OpenPunctuation => OP,
            LineBreak::PostfixNumeric => PO,
            LineBreak::PrefixNumeric => PR,
            LineBreak::Quotation => QU,
            LineBreak::ComplexContext => SA,
            LineBreak::Surrogate => SG,
            LineBreak::Space => SP,
            LineBreak::BreakSymbols => SY,
            LineBreak::ZWSpace => ZW,
            LineBreak::NextLine => NL,
            LineBreak::WordJoiner => WJ,
            LineBreak::H2 => H2,
            LineBreak::H3 => H3,
            LineBreak::JL => JL,
            LineBreak::JT => JT,
            LineBreak::JV => JV,
            LineBreak::CloseParenthesis => CP,
            LineBreak::ConditionalJapaneseStarter => CJ,
            LineBreak::HebrewLetter => HL,
            LineBreak::RegionalIndicator => RI,
            LineBreak::EBase => EB,
            LineBreak::EModifier => EM,
            LineBreak::ZWJ => ZWJ,
            LineBreak::Unknown => XX,
            // Newer classes resolve like alphabetics
            _ => AL,
        }
    }

    /// LB1 resolution of classes the pair rules do not cover
    fn resolved(self) -> BreakClass {
        use BreakClass::*;
        match self {
            AI | SA | SG | XX => AL,
            CJ => NS,
            other => other,
        }
    }

    /// Classes whose characters are laid out one per run
    pub fn is_cjk(self) -> bool {
        use BreakClass::*;
        matches!(self, ID | CJ | H2 | H3 | JL | JV | JT)
    }
}

/// True for code points that lay out as individual CJK units
pub fn is_cjk_char(c: char) -> bool {
    BreakClass::of(c).is_cjk()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairAction {
    /// Break here
    Direct,
    /// Break only if spaces separate the pair
    Indirect,
    /// Combining mark: attach unless after spaces
    CombiningIndirect,
    /// Combining mark that may never break
    CombiningProhibited,
    Prohibited,
}

fn pair_action(before: BreakClass, after: BreakClass) -> PairAction {
    use BreakClass::*;
    use PairAction::*;

    // LB10: a combining mark that starts a sequence acts as AL
    let before = match before {
        CM | ZWJ => AL,
        other => other,
    };

    if after == ZW {
        return Prohibited;
    }
    if before == ZW {
        return Direct;
    }
    if matches!(after, CM | ZWJ) {
        return if before == OP {
            CombiningProhibited
        } else {
            CombiningIndirect
        };
    }
    if before == WJ || after == WJ || before == GL {
        return Prohibited;
    }
    if after == GL {
        return if matches!(before, BA | HY) {
            Direct
        } else {
            Indirect
        };
    }
    if matches!(after, CL | CP | EX | IS | SY) || before == OP {
        return Prohibited;
    }
    if before == QU && after == OP {
        return Prohibited;
    }
    if matches!(before, CL | CP) && after == NS {
        return Prohibited;
    }
    if before == B2 && after == B2 {
        return Prohibited;
    }
    if before == QU || after == QU {
        return Indirect;
    }
    if before == CB || after == CB {
        return Direct;
    }
    if matches!(after, BA | HY | NS) || before == BB {
        return Indirect;
    }
    if before == SY && after == HL {
        return Indirect;
    }
    if after == IN {
        return Indirect;
    }
    let alpha = |c: BreakClass| matches!(c, AL | HL);
    if (alpha(before) && after == NU) || (before == NU && alpha(after)) {
        return Indirect;
    }
    if (before == PR && matches!(after, ID | EB | EM))
        || (matches!(before, ID | EB | EM) && after == PO)
    {
        return Indirect;
    }
    if (matches!(before, PR | PO) && alpha(after)) || (alpha(before) && matches!(after, PR | PO))
    {
        return Indirect;
    }
    let numeric = matches!(
        (before, after),
        (CL | CP | NU, PO | PR) | (PO | PR, OP | NU) | (HY | IS | NU | SY, NU)
    );
    if numeric {
        return Indirect;
    }
    let hangul = matches!(
        (before, after),
        (JL, JL | JV | H2 | H3) | (JV | H2, JV | JT) | (JT | H3, JT)
    ) || (matches!(before, JL | JV | JT | H2 | H3) && after == PO)
        || (before == PR && matches!(after, JL | JV | JT | H2 | H3));
    if hangul {
        return Indirect;
    }
    if alpha(before) && alpha(after) {
        return Indirect;
    }
    if before == IS && alpha(after) {
        return Indirect;
    }
    if (matches!(before, AL | HL | NU) && after == OP) || (before == CP && matches!(after, AL | HL | NU))
    {
        return Indirect;
    }
    if before == RI && after == RI {
        return Indirect;
    }
    if before == EB && after == EM {
        return Indirect;
    }
    Direct
}

/// A break opportunity before the char at `position`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Break {
    /// Char offset into the analysed text
    pub position: usize,
    /// Mandatory breaks come from BK, CR, LF and NL
    pub required: bool,
}

/// Yields break opportunities over a text, in order.
///
/// The final break is always at the end of the text.
pub struct LineBreaker {
    classes: Vec<BreakClass>,
    pos: usize,
    last_pos: usize,
    current: Option<BreakClass>,
    next_class: BreakClass,
    lb8a: bool,
    lb21a: bool,
    lb30a: usize,
}

impl LineBreaker {
    pub fn new(text: &str) -> Self {
        Self {
            classes: text.chars().map(|c| BreakClass::of(c).resolved()).collect(),
            pos: 0,
            last_pos: 0,
            current: None,
            next_class: BreakClass::AL,
            lb8a: false,
            lb21a: false,
            lb30a: 0,
        }
    }

    fn next_char_class(&mut self) -> BreakClass {
        let class = self.classes[self.pos];
        self.pos += 1;
        class
    }

    fn map_first(class: BreakClass) -> BreakClass {
        match class {
            BreakClass::LF | BreakClass::NL => BreakClass::BK,
            BreakClass::SP => BreakClass::WJ,
            other => other,
        }
    }

    /// Spaces and hard line ends never break before themselves
    fn simple_break(&mut self) -> Option<bool> {
        match self.next_class {
            BreakClass::SP => Some(false),
            BreakClass::BK | BreakClass::LF | BreakClass::NL => {
                self.current = Some(BreakClass::BK);
                Some(false)
            }
            BreakClass::CR => {
                self.current = Some(BreakClass::CR);
                Some(false)
            }
            _ => None,
        }
    }

    fn pair_table_break(&mut self, current: BreakClass, last_class: BreakClass) -> bool {
        let mut should_break = match pair_action(current, self.next_class) {
            PairAction::Direct => true,
            PairAction::Indirect => last_class == BreakClass::SP,
            PairAction::CombiningIndirect => {
                if last_class != BreakClass::SP {
                    return false;
                }
                true
            }
            PairAction::CombiningProhibited => {
                if last_class != BreakClass::SP {
                    return false;
                }
                false
            }
            PairAction::Prohibited => false,
        };

        if self.lb8a {
            should_break = false;
        }

        // LB21a: HL (HY | BA) ×
        if self.lb21a && matches!(current, BreakClass::HY | BreakClass::BA) {
            should_break = false;
            self.lb21a = false;
        } else {
            self.lb21a = current == BreakClass::HL;
        }

        // LB30a: break between pairs of regional indicators
        if current == BreakClass::RI {
            self.lb30a += 1;
            if self.lb30a == 2 && self.next_class == BreakClass::RI {
                should_break = true;
                self.lb30a = 0;
            }
        } else {
            self.lb30a = 0;
        }

        self.current = Some(self.next_class);
        should_break
    }
}

impl Iterator for LineBreaker {
    type Item = Break;

    fn next(&mut self) -> Option<Break> {
        if self.classes.is_empty() {
            return None;
        }
        if self.current.is_none() {
            let first = self.next_char_class();
            self.current = Some(Self::map_first(first));
            self.next_class = first;
            self.lb8a = first == BreakClass::ZWJ;
            self.lb30a = 0;
        }

        while self.pos < self.classes.len() {
            self.last_pos = self.pos;
            let last_class = self.next_class;
            self.next_class = self.next_char_class();
            let current = self.current.unwrap_or(BreakClass::AL);

            if current == BreakClass::BK
                || (current == BreakClass::CR && self.next_class != BreakClass::LF)
            {
                self.current = Some(Self::map_first(self.next_class));
                return Some(Break {
                    position: self.last_pos,
                    required: true,
                });
            }

            let should_break = match self.simple_break() {
                Some(should_break) => should_break,
                None => self.pair_table_break(current, last_class),
            };

            self.lb8a = self.next_class == BreakClass::ZWJ;

            if should_break {
                return Some(Break {
                    position: self.last_pos,
                    required: false,
                });
            }
        }

        if self.last_pos < self.classes.len() {
            self.last_pos = self.classes.len();
            let required = matches!(
                self.current,
                Some(BreakClass::BK) | Some(BreakClass::CR)
            );
            return Some(Break {
                position: self.classes.len(),
                required,
            });
        }
        None
    }
}
