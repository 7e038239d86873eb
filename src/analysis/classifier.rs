//! Transaction classification into income, expense or neutral transfer.
//!
//! Rules are evaluated in stages (neutral, expense, income) and the first
//! matching rule decides. Each rule is a named predicate so new
//! title patterns can be appended to a stage without touching the others.
//! Entries no rule recognises fall back to the color hint, then the category,
//! then Expense.

use crate::models::{Classification, ColorHint, LogEntry};

use super::bazaar_parser::{own_trade_shape_re, partner_trade_shape_re};

/// Lower-cased view of the text fields rules look at.
struct TitleView<'a> {
    title: &'a str,
    category: &'a str,
}

impl<'a> TitleView<'a> {
    fn has(&self, needle: &str) -> bool {
        self.title.contains(needle)
    }

    fn has_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.title.contains(n))
    }

    fn category_has(&self, needle: &str) -> bool {
        self.category.contains(needle)
    }
}

/// A single named classification rule.
struct ClassificationRule {
    name: &'static str,
    verdict: Classification,
    matches: fn(&TitleView<'_>) -> bool,
}

impl ClassificationRule {
    fn matches(&self, view: &TitleView<'_>) -> bool {
        (self.matches)(view)
    }
}

const NEUTRAL_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "piggy_bank_deposit",
        verdict: Classification::Neutral,
        matches: |v| v.has("piggy bank deposit"),
    },
    ClassificationRule {
        name: "piggy_bank_withdraw",
        verdict: Classification::Neutral,
        matches: |v| v.has("piggy bank withdraw"),
    },
    ClassificationRule {
        name: "bank_deposit",
        verdict: Classification::Neutral,
        matches: |v| v.has("bank deposit") && !v.has("interest"),
    },
    ClassificationRule {
        name: "bank_withdraw",
        verdict: Classification::Neutral,
        matches: |v| v.has("bank withdraw") && !v.has("fee"),
    },
    ClassificationRule {
        name: "bank_invest",
        verdict: Classification::Neutral,
        matches: |v| v.has("bank invest"),
    },
    ClassificationRule {
        name: "trade_money",
        verdict: Classification::Neutral,
        matches: |v| v.has_any(&["trade money add", "trade money remove"]),
    },
    ClassificationRule {
        name: "faction_balance",
        verdict: Classification::Neutral,
        matches: |v| v.has("faction money balance change"),
    },
];

const EXPENSE_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "purchase",
        verdict: Classification::Expense,
        matches: |v| v.has_any(&["buy", "purchase"]),
    },
    ClassificationRule {
        name: "bet",
        verdict: Classification::Expense,
        matches: |v| v.has("bet"),
    },
    ClassificationRule {
        name: "casino_stake",
        verdict: Classification::Expense,
        matches: |v| {
            (v.has("casino") || v.category_has("casino")) && v.has_any(&["join", "start", "lose"])
        },
    },
    ClassificationRule {
        name: "game_start",
        verdict: Classification::Expense,
        matches: |v| {
            v.has_any(&[
                "spin the wheel start",
                "high-low start",
                "russian roulette join",
                "russian roulette start",
                "blackjack start",
            ])
        },
    },
    ClassificationRule {
        name: "deposit",
        verdict: Classification::Expense,
        matches: |v| v.has_any(&["deposit", "outgoing"]),
    },
    ClassificationRule {
        name: "transfer",
        verdict: Classification::Expense,
        matches: |v| v.has_any(&["send", "transfer"]),
    },
    ClassificationRule {
        name: "upkeep_donation",
        verdict: Classification::Expense,
        matches: |v| v.has_any(&["upkeep", "donate"]),
    },
    ClassificationRule {
        name: "bounty_place",
        verdict: Classification::Expense,
        matches: |v| v.has("bounty place"),
    },
    ClassificationRule {
        name: "mugged",
        verdict: Classification::Expense,
        matches: |v| v.has("mug receive"),
    },
    ClassificationRule {
        name: "education",
        verdict: Classification::Expense,
        matches: |v| v.has("education start"),
    },
    ClassificationRule {
        name: "property_upgrade",
        verdict: Classification::Expense,
        matches: |v| v.has("property upgrade"),
    },
];

const INCOME_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "sale",
        verdict: Classification::Income,
        matches: |v| v.has_any(&["sell", "sale"]),
    },
    ClassificationRule {
        name: "win_withdraw",
        verdict: Classification::Income,
        matches: |v| v.has_any(&["win", "withdraw"]),
    },
    ClassificationRule {
        name: "receive",
        verdict: Classification::Income,
        matches: |v| v.has_any(&["receive", "incoming"]),
    },
    ClassificationRule {
        name: "gain",
        verdict: Classification::Income,
        matches: |v| v.has_any(&["gain", "profit"]),
    },
    ClassificationRule {
        name: "mission_complete",
        verdict: Classification::Income,
        matches: |v| v.has("complete") && v.category_has("missions"),
    },
    ClassificationRule {
        name: "pay",
        verdict: Classification::Income,
        matches: |v| v.has("pay") && !v.has("upkeep"),
    },
    ClassificationRule {
        name: "rent_owner",
        verdict: Classification::Income,
        matches: |v| v.has("rent") && v.has("owner"),
    },
    ClassificationRule {
        name: "cash_in",
        verdict: Classification::Income,
        matches: |v| v.has("cash in"),
    },
];

/// Rule stages in evaluation order.
const STAGES: [&[ClassificationRule]; 3] = [NEUTRAL_RULES, EXPENSE_RULES, INCOME_RULES];

/// What decided a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictBasis {
    Rule(&'static str),
    Color,
    Category,
    /// Nothing recognised the entry; treated as money leaving
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub classification: Classification,
    pub basis: VerdictBasis,
}

impl Verdict {
    /// True when a keyword rule and the game's color hint disagree.
    pub fn contradicts(&self, color: Option<ColorHint>) -> bool {
        if !matches!(self.basis, VerdictBasis::Rule(_)) {
            return false;
        }
        matches!(
            (self.classification, color),
            (Classification::Income, Some(ColorHint::Red))
                | (Classification::Expense, Some(ColorHint::Green))
        )
    }
}

pub fn classify_detailed(entry: &LogEntry) -> Verdict {
    let title = entry.title().to_lowercase();
    let category = entry.category().to_lowercase();
    let view = TitleView {
        title: &title,
        category: &category,
    };

    if let Some(rule) = STAGES
        .iter()
        .flat_map(|stage| stage.iter())
        .find(|rule| rule.matches(&view))
    {
        return Verdict {
            classification: rule.verdict,
            basis: VerdictBasis::Rule(rule.name),
        };
    }

    match entry.color_hint() {
        Some(ColorHint::Green) => {
            return Verdict {
                classification: Classification::Income,
                basis: VerdictBasis::Color,
            }
        }
        Some(ColorHint::Red) => {
            return Verdict {
                classification: Classification::Expense,
                basis: VerdictBasis::Color,
            }
        }
        None => {}
    }

    if view.category_has("incoming") {
        return Verdict {
            classification: Classification::Income,
            basis: VerdictBasis::Category,
        };
    }
    if view.category_has("outgoing") {
        return Verdict {
            classification: Classification::Expense,
            basis: VerdictBasis::Category,
        };
    }

    // Unrecognised entries count as money leaving; this default is pending product owner review
    Verdict {
        classification: Classification::Expense,
        basis: VerdictBasis::Default,
    }
}

/// Whether an entry looks like a bazaar trade worth parsing.
pub fn is_bazaar_candidate(entry: &LogEntry) -> bool {
    let title = entry.title().to_lowercase();
    title.contains("bazaar sell")
        || title.contains("bazaar buy")
        || own_trade_shape_re().is_match(&title)
        || partner_trade_shape_re().is_match(&title)
}
