//! Labelled email dataset loading and splitting

use csv::ReaderBuilder;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{MlError, Result};
use crate::spam::Label;

const REQUIRED_COLUMNS: [&str; 3] = ["label", "text", "label_num"];

/// One labelled email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRecord {
    pub label: Label,
    pub text: String,
}

impl EmailRecord {
    pub fn new(label: Label, text: impl Into<String>) -> Self {
        Self {
            label,
            text: text.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    label: Option<String>,
    text: Option<String>,
    label_num: Option<String>,
}

/// Load the CSV dataset at `path`
pub fn load_dataset(path: &Path) -> Result<Vec<EmailRecord>> {
    let file = File::open(path)?;
    let records = read_records(file)?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse dataset rows from any CSV source.
///
/// Rows with an empty required field and exact duplicates are dropped.
/// `label_num` decides the class.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<EmailRecord>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h.trim() == column) {
            return Err(MlError::Dataset(format!("Missing column '{}'", column)));
        }
    }

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    let mut dropped = 0usize;

    for (line, row) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = row?;
        let (Some(label), Some(text), Some(label_num)) = (row.label, row.text, row.label_num)
        else {
            dropped += 1;
            continue;
        };
        if label.trim().is_empty() || text.trim().is_empty() || label_num.trim().is_empty() {
            dropped += 1;
            continue;
        }

        let class = label_num
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(Label::from_class)
            .ok_or_else(|| {
                MlError::Dataset(format!(
                    "Row {}: label_num must be 0 or 1, got '{}'",
                    line + 2,
                    label_num
                ))
            })?;

        if !seen.insert((label, text.clone(), label_num)) {
            dropped += 1;
            continue;
        }
        records.push(EmailRecord::new(class, text));
    }

    debug!("Dropped {} empty or duplicate rows", dropped);
    Ok(records)
}

/// Split records into `(train, test)`, preserving the class balance.
///
/// Each class is shuffled with a generator seeded from `seed`, and at least
/// one record of every class stays in the training part. Both parts keep the
/// input order.
pub fn stratified_split(
    records: &[EmailRecord],
    test_fraction: f64,
    seed: u64,
) -> (Vec<EmailRecord>, Vec<EmailRecord>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut in_test = vec![false; records.len()];

    for label in [Label::Ham, Label::Spam] {
        let mut indices: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.label == label)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            continue;
        }
        indices.shuffle(&mut rng);

        let n_test = ((indices.len() as f64 * test_fraction).round() as usize)
            .min(indices.len() - 1);
        for &i in &indices[..n_test] {
            in_test[i] = true;
        }
    }

    let mut train = Vec::new();
    let mut test = Vec::new();
    for (record, &is_test) in records.iter().zip(&in_test) {
        if is_test {
            test.push(record.clone());
        } else {
            train.push(record.clone());
        }
    }
    (train, test)
}

const SAMPLE_SPAM: &[&str] = &[
    "Subject: You are a winner\n\nWIN a free prize today! Click the link to claim your cash money.",
    "Subject: Claim your prize\n\nCongratulations, you win big money. Click now to claim the free reward.",
    "Subject: Limited offer\n\nFree money offer ends soon. Click here to win cash instantly.",
    "Subject: Urgent winner notice\n\nYou have been selected to win a big cash prize. Click to claim your money now!",
    "Subject: Make money fast\n\nEarn big money from home. Click this link for a free trial and win today.",
    "Subject: Free gift card\n\nClaim your free gift card now. Click here, winners get big money bonuses.",
    "Subject: Lottery results\n\nYour email won the lottery! Claim the prize money and cash out, click the link.",
    "Subject: Exclusive deal\n\nAct now for an exclusive deal. Free money and big savings, click to win.",
    "Subject: Account bonus\n\nYour account earned a cash bonus. Click now to claim free money before it expires.",
    "Subject: Casino bonus\n\nPlay online casino and win big. Free spins and cash prizes, click to join.",
    "Subject: Cheap pills\n\nBuy cheap pills online with free shipping and a big discount. Click here to order and win a prize.",
    "Subject: Investment secret\n\nDouble your money in days. Click to learn the secret and win big cash returns.",
    "Subject: Urgent transfer\n\nA prince needs your help to move money. Win a big share of the cash, click to reply.",
    "Subject: Winner selected\n\nYou are our lucky winner. Click to claim your free prize and money today.",
    "Subject: Free vacation\n\nWin a free vacation and cash. Click the link now, limited time offer, big prizes.",
];

const SAMPLE_HAM: &[&str] = &[
    "Subject: Lunch tomorrow\n\nLet's grab lunch tomorrow at noon near the office.",
    "Subject: Team meeting\n\nThe team meeting is moved to tomorrow at noon. Please bring the project notes.",
    "Subject: Project update\n\nThe project is on schedule. Let's review the draft at the meeting tomorrow.",
    "Subject: Lunch plans\n\nAre you around for lunch on Friday? We could grab sandwiches at noon.",
    "Subject: Quarterly report\n\nPlease review the quarterly report before the meeting tomorrow and send comments.",
    "Subject: Code review\n\nI left comments on the pull request. Let's discuss them after lunch.",
    "Subject: Schedule change\n\nThe client call moved to tomorrow morning. The meeting notes are in the project folder.",
    "Subject: Welcome aboard\n\nWelcome to the team. Let's meet for lunch at noon so I can introduce everyone.",
    "Subject: Budget review\n\nFinance wants the project budget by tomorrow. Can we meet at noon to go over it?",
    "Subject: Offsite agenda\n\nThe team offsite agenda is attached. Lunch will be served at noon.",
    "Subject: Dinner Saturday\n\nMom asked if you can come for dinner Saturday. Let me know tomorrow.",
    "Subject: Design document\n\nThe design document for the project is ready. Let's walk through it at the meeting.",
    "Subject: Running late\n\nRunning late this morning, please start the team meeting without me. Lunch is on me.",
    "Subject: Interview feedback\n\nPlease send your interview feedback by tomorrow so the team can decide at the meeting.",
    "Subject: Conference room\n\nI booked the conference room for the project meeting tomorrow at noon. Let's grab lunch after.",
];

/// Small built-in corpus for training without a dataset file
pub fn sample_records() -> Vec<EmailRecord> {
    SAMPLE_SPAM
        .iter()
        .map(|text| EmailRecord::new(Label::Spam, *text))
        .chain(
            SAMPLE_HAM
                .iter()
                .map(|text| EmailRecord::new(Label::Ham, *text)),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_records() {
        let csv = "\
,label,text,label_num
1,ham,\"Meeting at noon, see you there\",0
2,spam,Win money now,1
3,spam,Win money now,1
4,ham,,0
5,spam,Free prize,1
";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].label, Label::Ham);
        assert_eq!(records[0].text, "Meeting at noon, see you there");
        assert_eq!(records[2].label, Label::Spam);
    }

    #[test]
    fn test_missing_column() {
        let csv = "label,text\nham,hello\n";
        match read_records(csv.as_bytes()) {
            Err(MlError::Dataset(msg)) => assert!(msg.contains("label_num")),
            other => panic!("expected dataset error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_label_num() {
        let csv = "label,text,label_num\nspam,hello,7\n";
        assert!(matches!(
            read_records(csv.as_bytes()),
            Err(MlError::Dataset(_))
        ));
    }

    #[test]
    fn test_stratified_split() {
        let records = sample_records();
        let (train, test) = stratified_split(&records, 0.2, 42);

        assert_eq!(train.len() + test.len(), records.len());
        let spam_test = test.iter().filter(|r| r.label == Label::Spam).count();
        let ham_test = test.iter().filter(|r| r.label == Label::Ham).count();
        assert_eq!(spam_test, 3);
        assert_eq!(ham_test, 3);

        let again = stratified_split(&records, 0.2, 42);
        assert_eq!(again.1, test);
    }

    #[test]
    fn test_split_keeps_a_training_row_per_class() {
        let records = vec![
            EmailRecord::new(Label::Spam, "a"),
            EmailRecord::new(Label::Ham, "b"),
            EmailRecord::new(Label::Ham, "c"),
        ];
        let (train, _) = stratified_split(&records, 0.9, 1);
        assert!(train.iter().any(|r| r.label == Label::Spam));
        assert!(train.iter().any(|r| r.label == Label::Ham));
    }

    #[test]
    fn test_sample_records_are_balanced() {
        let records = sample_records();
        let spam = records.iter().filter(|r| r.label == Label::Spam).count();
        assert_eq!(spam * 2, records.len());
        assert!(records.iter().all(|r| r.text.starts_with("Subject:")));
    }
}
