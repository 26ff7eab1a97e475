//! Ingredient line parsing.
//!
//! Turns a raw line such as `"2 cups flour"` into a quantity, a canonical unit and a
//! lower-cased name. Parsing never fails: a missing or unreadable quantity becomes `1.0`
//! and an unrecognised unit leaves the unit empty.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIngredient {
    /// Always finite and non-negative.
    pub quantity: f64,
    /// Canonical unit (`g`, `ml`, `oz`, `cup`, `tbsp`, `tsp`, `lbs`, `kg`, `l`) or empty.
    pub unit: String,
    pub name: String,
}

pub const DEFAULT_QUANTITY: f64 = 1.0;

lazy_static! {
    /// Accepted spellings (lower-case) mapped to the canonical unit.
    static ref UNITS: HashMap<&'static str, &'static str> = {
        let aliases: &[(&str, &[&str])] = &[
            ("g", &["g", "gram", "grams"]),
            ("ml", &["ml", "milliliter", "milliliters", "millilitre", "millilitres"]),
            ("oz", &["oz", "ounce", "ounces"]),
            ("cup", &["cup", "cups"]),
            ("tbsp", &["tbsp", "tablespoon", "tablespoons"]),
            ("tsp", &["tsp", "teaspoon", "teaspoons"]),
            ("lbs", &["lbs", "lb", "pound", "pounds"]),
            ("kg", &["kg", "kilogram", "kilograms"]),
            ("l", &["l", "liter", "liters", "litre", "litres"]),
        ];
        let mut map = HashMap::new();
        for (canonical, spellings) in aliases {
            for s in spellings.iter() {
                map.insert(*s, *canonical);
            }
        }
        map
    };
}

/// Canonical unit for `token`, matched case-insensitively.
pub fn canonical_unit(token: &str) -> Option<&'static str> {
    UNITS.get(token.to_lowercase().as_str()).copied()
}

/// Parse a leading quantity: a decimal (`2`, `0.5`) or a simple fraction (`1/2`).
fn parse_quantity(token: &str) -> Option<f64> {
    let value = match token.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 { return None; }
            num / den
        }
        None => token.parse().ok()?,
    };
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Parse one ingredient line.
///
/// A first token that reads as a quantity is consumed; the next token is consumed as a
/// unit if it is a known unit spelling. The remaining tokens, lower-cased and joined by
/// single spaces, form the name. When nothing remains the name is the trimmed line.
pub fn parse_ingredient(line: &str) -> ParsedIngredient {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut idx = 0;

    let quantity = match tokens.first().and_then(|t| parse_quantity(t)) {
        Some(q) => {
            idx += 1;
            q
        }
        None => DEFAULT_QUANTITY,
    };

    let unit = match tokens.get(idx).and_then(|t| canonical_unit(t)) {
        Some(u) => {
            idx += 1;
            u.to_string()
        }
        None => String::new(),
    };

    let rest = &tokens[idx..];
    let name = if rest.is_empty() {
        line.trim().to_string()
    } else {
        rest.join(" ").to_lowercase()
    };

    ParsedIngredient { quantity, unit, name }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_unit_and_name() {
        let p = parse_ingredient("2 cups flour");
        assert_eq!(p.quantity, 2.0);
        assert_eq!(p.unit, "cup");
        assert_eq!(p.name, "flour");
    }

    #[test]
    fn bare_name_defaults_quantity() {
        let p = parse_ingredient("flour");
        assert_eq!(p, ParsedIngredient { quantity: 1.0, unit: String::new(), name: "flour".into() });
    }

    #[test]
    fn non_numeric_first_token_stays_in_name() {
        let p = parse_ingredient("abc flour");
        assert_eq!(p.quantity, 1.0);
        assert_eq!(p.unit, "");
        assert_eq!(p.name, "abc flour");
    }

    #[test]
    fn unit_without_quantity() {
        let p = parse_ingredient("Cup Sugar");
        assert_eq!(p.quantity, 1.0);
        assert_eq!(p.unit, "cup");
        assert_eq!(p.name, "sugar");
    }

    #[test]
    fn name_is_lowercased_and_whitespace_collapsed() {
        let p = parse_ingredient("  500   G   Cherry   Tomatoes ");
        assert_eq!(p.quantity, 500.0);
        assert_eq!(p.unit, "g");
        assert_eq!(p.name, "cherry tomatoes");
    }

    #[test]
    fn fractions_and_decimals() {
        assert_eq!(parse_ingredient("1/2 tsp salt").quantity, 0.5);
        assert_eq!(parse_ingredient("0.25 l milk").quantity, 0.25);
        assert_eq!(parse_ingredient("1/0 tsp salt").name, "1/0 tsp salt");
    }

    #[test]
    fn negative_or_non_finite_quantity_is_not_a_quantity() {
        let p = parse_ingredient("-2 eggs");
        assert_eq!(p.quantity, 1.0);
        assert_eq!(p.name, "-2 eggs");
        assert_eq!(parse_ingredient("inf eggs").quantity, 1.0);
    }

    #[test]
    fn nothing_left_falls_back_to_trimmed_line() {
        let p = parse_ingredient(" 2 Cups ");
        assert_eq!(p.quantity, 2.0);
        assert_eq!(p.unit, "cup");
        assert_eq!(p.name, "2 Cups");
        assert_eq!(parse_ingredient("   ").name, "");
    }
}
