use crate::utils::SAMPLE_LABELS;
use par_warehouse::labels::{
    COUNTRY_SECTION, PORT_SECTION, STATE_SECTION, TRAVEL_MODE_SECTION, entries_to_batch,
};
use par_warehouse::{LabelEntry, WarehouseError, parse_labels};
use rand::Rng;
use rand::seq::IndexedRandom;

fn pairs(entries: &[LabelEntry]) -> Vec<(&str, &str)> {
    entries
        .iter()
        .map(|e| (e.code.as_str(), e.label.as_str()))
        .collect()
}

/// Sections of the published file layout are all found, in source order
#[test]
fn test_parse_sample_sections() -> par_warehouse::Result<()> {
    let sections = parse_labels(SAMPLE_LABELS);

    for name in [COUNTRY_SECTION, PORT_SECTION, TRAVEL_MODE_SECTION, STATE_SECTION] {
        assert!(sections.contains(name), "missing section {name}");
    }

    assert_eq!(
        pairs(sections.section(COUNTRY_SECTION)?),
        vec![
            ("582", "MEXICO Air Sea, and Not Reported (I-94, no land arrivals)"),
            ("236", "AFGHANISTAN"),
            ("101", "ALBANIA"),
            ("754", "COTE D'IVOIRE"),
            ("999", "INVALID: STATELESS"),
        ]
    );
    assert_eq!(
        pairs(sections.section(TRAVEL_MODE_SECTION)?),
        vec![("1", "Air"), ("2", "Sea"), ("3", "Land"), ("9", "Not reported")]
    );

    let ports = sections.section(PORT_SECTION)?;
    assert_eq!(ports.len(), 6);
    assert_eq!(ports[0], LabelEntry::new("ALC", "ALCAN, AK"));
    assert_eq!(ports[4], LabelEntry::new("XXX", "NOT REPORTED/UNKNOWN"));

    // Sections can be walked more than once
    assert_eq!(ports.iter().count(), ports.iter().count());
    Ok(())
}

/// A leading chunk without the marker is named by its first token
#[test]
fn test_parse_unmarked_first_section() -> par_warehouse::Result<()> {
    let text = "i94cntyl\n582 = 'MEXICO'\n236 = 'AFGHANISTAN';\nvalue i94prtl\n'ALC' = 'ALCAN, AK'\n;";
    let sections = parse_labels(text);

    assert_eq!(sections.len(), 2);
    assert_eq!(
        pairs(sections.section("i94cntyl")?),
        vec![("582", "MEXICO"), ("236", "AFGHANISTAN")]
    );
    assert_eq!(pairs(sections.section("i94prtl")?), vec![("ALC", "ALCAN, AK")]);
    Ok(())
}

fn blanks(rng: &mut impl Rng, min: usize) -> String {
    let len = rng.random_range(min..min + 4);
    (0..len)
        .map(|_| if rng.random_bool(0.5) { ' ' } else { '\t' })
        .collect()
}

fn operand(rng: &mut impl Rng, text: &str) -> String {
    let words = text
        .split(' ')
        .map(str::to_string)
        .collect::<Vec<_>>()
        .join(&blanks(rng, 1));
    let quote = *["'", "\"", ""].choose(rng).unwrap_or(&"'");
    format!("{quote}{words}{quote}")
}

/// Tab and space runs and the quote style never change the parsed pairs
#[test]
fn test_whitespace_and_quote_insensitive() -> par_warehouse::Result<()> {
    let expected = [
        ("582", "MEXICO"),
        ("236", "AFGHANISTAN"),
        ("504", "NEW YORK"),
        ("111", "FRENCH SOUTHERN AND ANTARCTIC"),
    ];
    let mut rng = rand::rng();

    for _ in 0..50 {
        let mut text = format!("{}value{}i94cntyl{}\n", blanks(&mut rng, 0), blanks(&mut rng, 1), blanks(&mut rng, 0));
        for (code, label) in expected {
            text.push_str(&format!(
                "{}{}{}={}{}{}\n",
                blanks(&mut rng, 0),
                operand(&mut rng, code),
                blanks(&mut rng, 0),
                blanks(&mut rng, 0),
                operand(&mut rng, label),
                blanks(&mut rng, 0),
            ));
        }
        text.push_str(&format!("{};\n", blanks(&mut rng, 0)));

        let sections = parse_labels(&text);
        assert_eq!(
            pairs(sections.section("i94cntyl")?),
            expected.to_vec(),
            "text was {text:?}"
        );
    }
    Ok(())
}

/// Requesting an absent section is an error naming the section
#[test]
fn test_missing_section() {
    let sections = parse_labels(SAMPLE_LABELS);
    match sections.section("i94visa") {
        Err(WarehouseError::MissingSection(name)) => assert_eq!(name, "i94visa"),
        other => panic!("expected missing section, got {other:?}"),
    }
}

/// Lines without a delimiter are dropped and text after `;` is ignored
#[test]
fn test_skips_malformed_lines() -> par_warehouse::Result<()> {
    let text = "value i94model\n1 = 'Air'\n   just a note\n2 = 'Sea' ;\n3 = 'Land'\n";
    let sections = parse_labels(text);
    assert_eq!(
        pairs(sections.section("i94model")?),
        vec![("1", "Air"), ("2", "Sea")]
    );
    Ok(())
}

/// A repeated section name keeps the later section
#[test]
fn test_repeated_section_replaces_earlier() -> par_warehouse::Result<()> {
    let text = "value i94model\n1 = 'Air' ;\nvalue i94model\n2 = 'Sea' ;\n";
    let sections = parse_labels(text);
    assert_eq!(sections.len(), 1);
    assert_eq!(pairs(sections.section("i94model")?), vec![("2", "Sea")]);
    Ok(())
}

/// Entries convert to a code/label batch preserving order
#[test]
fn test_entries_to_batch() -> par_warehouse::Result<()> {
    let sections = parse_labels(SAMPLE_LABELS);
    let batch = entries_to_batch(sections.section(TRAVEL_MODE_SECTION)?)?;

    assert_eq!(batch.num_rows(), 4);
    assert_eq!(
        crate::utils::strings(&batch, "label"),
        vec![
            Some("Air".to_string()),
            Some("Sea".to_string()),
            Some("Land".to_string()),
            Some("Not reported".to_string()),
        ]
    );
    Ok(())
}
