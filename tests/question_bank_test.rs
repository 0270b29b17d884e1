// Question bank loading from disk, with a bank shaped like the real one

use anyhow::Result;
use std::fs;
use tempfile::TempDir;

use qmirac::questions::{BankError, Difficulty, QuestionBank};

const BANK: &str = r#"vision:
  - "Is the Vision Statement clear and does it reflect the business's aspirations?"
market_assessment:
  - "Is the served available market growing?"
  - "Which segments drive the growth?"
  - text: "Can the business defend its share against new entrants?"
    difficulty: hard
risk_assessment:
  - text: "Can you reduce risk without losing upside?"
    difficulty: hard
strategic_assessment:
  - "Is the strategic position improving year over year?"
cash_flow:
  - "Is operating cash flow positive?"
  - "How many months of runway does the business hold?"
"#;

#[test]
fn test_load_from_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("group_questions.yaml");
    fs::write(&path, BANK)?;

    let bank = QuestionBank::load(&path)?;

    assert_eq!(bank.len(), 5);
    assert_eq!(bank.total_questions(), 8);

    // groups and questions keep authored order
    let ids: Vec<_> = bank.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "vision",
            "market_assessment",
            "risk_assessment",
            "strategic_assessment",
            "cash_flow"
        ]
    );

    let market = bank.get("market_assessment").unwrap();
    assert_eq!(market.len(), 3);
    assert_eq!(market[0].difficulty, Difficulty::Default);
    assert_eq!(market[2].difficulty, Difficulty::Hard);

    // every group here is a blueprint group, most of the 30 are absent
    assert!(bank.unknown_groups().is_empty());
    assert_eq!(bank.missing_blueprint_groups().len(), 25);

    Ok(())
}

#[test]
fn test_missing_file_is_io_error() {
    let err = QuestionBank::load(std::path::Path::new("/nonexistent/bank.yaml")).unwrap_err();
    assert!(matches!(err, BankError::Io(_)));
}

#[test]
fn test_disk_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let original = QuestionBank::from_str(BANK)?;

    let path = dir.path().join("rewritten.yaml");
    fs::write(&path, original.to_yaml_string()?)?;
    let reparsed = QuestionBank::load(&path)?;

    assert_eq!(original, reparsed);
    Ok(())
}
