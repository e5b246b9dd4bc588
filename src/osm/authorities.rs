/// Highway authorities with a downloadable rights-of-way dataset, keyed by
/// the two-letter code the rowmaps download endpoint expects.
pub const AUTHORITY_CODES: &[(&str, &str)] = &[
    ("BA", "Bath and North East Somerset"),
    ("BD", "Bedford"),
    ("BK", "Buckinghamshire"),
    ("BN", "Blackburn with Darwen"),
    ("BR", "Bracknell Forest"),
    ("CA", "Cambridgeshire"),
    ("CB", "Central Bedfordshire"),
    ("CH", "Cheshire East"),
    ("CW", "Cheshire West and Chester"),
    ("CO", "Cornwall"),
    ("CU", "Cumbria"),
    ("DB", "Derbyshire"),
    ("DN", "Devon"),
    ("DO", "Dorset"),
    ("DU", "Durham"),
    ("EX", "Essex"),
    ("ER", "East Riding of Yorkshire"),
    ("ES", "East Sussex"),
    ("GL", "Gloucestershire"),
    ("HA", "Hampshire"),
    ("HE", "Herefordshire"),
    ("HT", "Hertfordshire"),
    ("IW", "Isle of Wight"),
    ("KE", "Kent"),
    ("LA", "Lancashire"),
    ("LE", "Leicestershire"),
    ("LI", "Lincolnshire"),
    ("NF", "Norfolk"),
    ("NH", "Northamptonshire"),
    ("NL", "Northumberland"),
    ("NY", "North Yorkshire"),
    ("NT", "Nottinghamshire"),
    ("OX", "Oxfordshire"),
    ("SH", "Shropshire"),
    ("SO", "Somerset"),
    ("ST", "Staffordshire"),
    ("SF", "Suffolk"),
    ("SY", "Surrey"),
    ("WA", "Warwickshire"),
    ("WB", "West Berkshire"),
    ("WS", "West Sussex"),
    ("WI", "Wiltshire"),
    ("WO", "Worcestershire"),
];

/// Resolve an authority name to its dataset code. The part before the first
/// comma is matched, so "Devon, UK" works, case-insensitively.
pub fn reverse_search(name: &str) -> Option<&'static str> {
    let needle = name.split(',').next().unwrap_or(name).trim();
    AUTHORITY_CODES
        .iter()
        .find(|(_, full)| full.eq_ignore_ascii_case(needle))
        .map(|(code, _)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_reverse_search_exact() {
        assert_eq!(reverse_search("Devon"), Some("DN"));
        assert_eq!(reverse_search("Hampshire"), Some("HA"));
    }

    #[test]
    fn test_reverse_search_ignores_suffix_after_comma() {
        assert_eq!(reverse_search("Devon, UK"), Some("DN"));
        assert_eq!(reverse_search("Kent, England, UK"), Some("KE"));
    }

    #[test]
    fn test_reverse_search_case_insensitive() {
        assert_eq!(reverse_search("devon"), Some("DN"));
        assert_eq!(reverse_search("WILTSHIRE"), Some("WI"));
    }

    #[test]
    fn test_reverse_search_unknown() {
        assert_eq!(reverse_search("Atlantis"), None);
    }

    #[test]
    fn test_reverse_search_covers_table() {
        for (code, name) in AUTHORITY_CODES {
            assert_eq!(reverse_search(name), Some(*code));
        }
    }

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<&str> = AUTHORITY_CODES.iter().map(|(c, _)| *c).collect();
        assert_eq!(codes.len(), AUTHORITY_CODES.len());
    }
}
