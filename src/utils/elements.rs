//! Element lookup table for indexing topics by element.

use serde::Serialize;

/// A chemical element the dataset tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Element {
    pub symbol: &'static str,
    pub name: &'static str,
    pub rare_earth: bool,
}

const fn element(symbol: &'static str, name: &'static str, rare_earth: bool) -> Element {
    Element {
        symbol,
        name,
        rare_earth,
    }
}

/// Commodity, by-product, rare-earth and contaminant elements
pub const ELEMENTS: &[Element] = &[
    // Rare earth elements
    element("Ce", "Cerium", true),
    element("La", "Lanthanum", true),
    element("Nd", "Neodymium", true),
    element("Y", "Yttrium", true),
    element("Pr", "Praseodymium", true),
    element("Dy", "Dysprosium", true),
    element("Sm", "Samarium", true),
    element("Gd", "Gadolinium", true),
    element("Er", "Erbium", true),
    element("Eu", "Europium", true),
    element("Tb", "Terbium", true),
    element("Ho", "Holmium", true),
    element("Tm", "Thulium", true),
    element("Yb", "Ytterbium", true),
    element("Lu", "Lutetium", true),
    element("Sc", "Scandium", true),
    // Primary commodities and by-products
    element("Cu", "Copper", false),
    element("Au", "Gold", false),
    element("Mo", "Molybdenum", false),
    element("Ag", "Silver", false),
    element("Te", "Tellurium", false),
    element("Se", "Selenium", false),
    element("Re", "Rhenium", false),
    // Critical minerals
    element("W", "Tungsten", false),
    element("Sb", "Antimony", false),
    element("Co", "Cobalt", false),
    element("Li", "Lithium", false),
    element("Ni", "Nickel", false),
    element("Ga", "Gallium", false),
    element("Ge", "Germanium", false),
    element("In", "Indium", false),
    // Contaminants
    element("As", "Arsenic", false),
    element("Pb", "Lead", false),
    element("Zn", "Zinc", false),
    element("Cd", "Cadmium", false),
    element("Hg", "Mercury", false),
];

/// Look up an element by symbol or name (case-insensitive)
pub fn lookup(query: &str) -> Option<&'static Element> {
    let query = query.trim();
    ELEMENTS.iter().find(|e| {
        e.symbol.eq_ignore_ascii_case(query) || e.name.eq_ignore_ascii_case(query)
    })
}

impl Element {
    /// Check if a topic name refers to this element.
    ///
    /// Matches the element name as a whole word, the symbol as a
    /// parenthetical "(W)", or for rare earths any "Rare Earth"/"(REE)" topic.
    pub fn matches_topic(&self, topic_name: &str) -> bool {
        let lower = topic_name.to_lowercase();
        if self.rare_earth && (lower.contains("rare earth") || lower.contains("rare-earth") || topic_name.contains("(REE)")) {
            return true;
        }
        if topic_name.contains(&format!("({})", self.symbol)) {
            return true;
        }
        contains_word(&lower, &self.name.to_lowercase())
    }
}

/// Whole-word substring test; `text` and `word` are already lowercased
fn contains_word(text: &str, word: &str) -> bool {
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';
    text.match_indices(word).any(|(start, found)| {
        let before = text[..start].chars().next_back();
        let after = text[start + found.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_symbol_and_name() {
        assert_eq!(lookup("W").map(|e| e.name), Some("Tungsten"));
        assert_eq!(lookup("tungsten").map(|e| e.symbol), Some("W"));
        assert_eq!(lookup(" nd ").map(|e| e.name), Some("Neodymium"));
        assert!(lookup("Unobtainium").is_none());
    }

    #[test]
    fn test_matches_topic_by_word() {
        let tungsten = lookup("W").unwrap();
        assert!(tungsten.matches_topic("Tungsten"));
        assert!(tungsten.matches_topic("Tungsten Deposits (Idaho)"));
        assert!(!tungsten.matches_topic("Rare Earth Elements (REE)"));
    }

    #[test]
    fn test_lead_does_not_match_inside_words() {
        let lead = lookup("Pb").unwrap();
        assert!(lead.matches_topic("Lead and Zinc Contamination"));
        assert!(!lead.matches_topic("Leadville District"));
    }

    #[test]
    fn test_word_match_checks_every_occurrence() {
        let lead = lookup("Pb").unwrap();
        assert!(lead.matches_topic("Leadville and LEAD Smelters"));
        assert!(lead.matches_topic("Mine Tailings: Lead"));
        assert!(!lead.matches_topic("Unleaded"));

        let tungsten = lookup("W").unwrap();
        assert!(tungsten.matches_topic("Tungsten-bearing Skarns"));
        assert!(!tungsten.matches_topic("Tungstenite"));
    }

    #[test]
    fn test_rare_earths_match_ree_topics() {
        let neodymium = lookup("Nd").unwrap();
        assert!(neodymium.matches_topic("Rare Earth Elements (REE)"));
        assert!(neodymium.matches_topic("Coal Ash Rare-Earth Resources"));
        assert!(!neodymium.matches_topic("Tungsten"));
    }
}
