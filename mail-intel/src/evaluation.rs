//! Held-out evaluation of the spam classifier

use serde::Serialize;
use std::fmt;

use crate::bundle::ModelBundle;
use crate::spam::{Label, WeightedTerm};

/// Precision, recall and F1 for one class (or an average)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Rows are true labels, columns predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionMatrix {
    pub ham_as_ham: usize,
    pub ham_as_spam: usize,
    pub spam_as_ham: usize,
    pub spam_as_spam: usize,
}

impl ConfusionMatrix {
    fn record(&mut self, truth: Label, predicted: Label) {
        match (truth, predicted) {
            (Label::Ham, Label::Ham) => self.ham_as_ham += 1,
            (Label::Ham, Label::Spam) => self.ham_as_spam += 1,
            (Label::Spam, Label::Ham) => self.spam_as_ham += 1,
            (Label::Spam, Label::Spam) => self.spam_as_spam += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ham_as_ham + self.ham_as_spam + self.spam_as_ham + self.spam_as_spam
    }

    fn metrics(&self, label: Label) -> ClassMetrics {
        let (tp, fp, fn_, support) = match label {
            Label::Ham => (
                self.ham_as_ham,
                self.spam_as_ham,
                self.ham_as_spam,
                self.ham_as_ham + self.ham_as_spam,
            ),
            Label::Spam => (
                self.spam_as_spam,
                self.ham_as_spam,
                self.spam_as_ham,
                self.spam_as_spam + self.spam_as_ham,
            ),
        };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics {
            precision,
            recall,
            f1,
            support,
        }
    }
}

/// Classification report for one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub ham: ClassMetrics,
    pub spam: ClassMetrics,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    /// ROC AUC, absent without probabilities or with a single class
    pub auc: Option<f64>,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Score predictions against the truth.
///
/// Label slices are paired positionally.
pub fn evaluate(
    y_true: &[Label],
    y_pred: &[Label],
    spam_probabilities: Option<&[f64]>,
) -> EvaluationReport {
    let mut confusion = ConfusionMatrix::default();
    for (&truth, &predicted) in y_true.iter().zip(y_pred) {
        confusion.record(truth, predicted);
    }

    let ham = confusion.metrics(Label::Ham);
    let spam = confusion.metrics(Label::Spam);
    let total = confusion.total();

    let macro_avg = ClassMetrics {
        precision: (ham.precision + spam.precision) / 2.0,
        recall: (ham.recall + spam.recall) / 2.0,
        f1: (ham.f1 + spam.f1) / 2.0,
        support: total,
    };
    let weight = |f: fn(&ClassMetrics) -> f64| {
        if total == 0 {
            0.0
        } else {
            (f(&ham) * ham.support as f64 + f(&spam) * spam.support as f64) / total as f64
        }
    };
    let weighted_avg = ClassMetrics {
        precision: weight(|m| m.precision),
        recall: weight(|m| m.recall),
        f1: weight(|m| m.f1),
        support: total,
    };

    let auc = spam_probabilities
        .filter(|scores| scores.len() == y_true.len())
        .and_then(|scores| roc_auc(y_true, scores));

    EvaluationReport {
        accuracy: ratio(confusion.ham_as_ham + confusion.spam_as_spam, total),
        confusion,
        ham,
        spam,
        macro_avg,
        weighted_avg,
        auc,
    }
}

/// Area under the ROC curve via the Mann-Whitney rank statistic
pub fn roc_auc(y_true: &[Label], spam_scores: &[f64]) -> Option<f64> {
    let n_pos = y_true.iter().filter(|l| **l == Label::Spam).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 || spam_scores.len() != y_true.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..spam_scores.len()).collect();
    order.sort_by(|&a, &b| spam_scores[a].total_cmp(&spam_scores[b]));

    // Average 1-based ranks across ties.
    let mut ranks = vec![0.0; order.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && spam_scores[order[end]] == spam_scores[order[start]] {
            end += 1;
        }
        let avg = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = avg;
        }
        start = end;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(l, _)| **l == Label::Spam)
        .map(|(_, r)| r)
        .sum();
    let n_pos = n_pos as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (name, m) in [("ham", &self.ham), ("spam", &self.spam)] {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.confusion.total()
        )?;
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        if let Some(auc) = self.auc {
            writeln!(f)?;
            writeln!(f, "{:>12} {:>10.4}", "roc auc", auc)?;
        }
        Ok(())
    }
}

/// Most spam- and ham-indicating vocabulary terms
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCoefficients {
    pub spam: Vec<WeightedTerm>,
    pub ham: Vec<WeightedTerm>,
}

/// The `n` largest and `n` smallest coefficients of a bundle
pub fn top_coefficients(bundle: &ModelBundle, n: usize) -> TopCoefficients {
    let terms = bundle.vectorizer().feature_names();
    let mut ranked: Vec<(usize, f64)> = bundle
        .model()
        .coefficients()
        .iter()
        .copied()
        .enumerate()
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let to_term = |&(i, coefficient): &(usize, f64)| WeightedTerm {
        term: terms[i].clone(),
        coefficient,
    };
    let spam = ranked.iter().take(n).map(to_term).collect();
    let ham = ranked.iter().rev().take(n).map(to_term).collect();
    TopCoefficients { spam, ham }
}
