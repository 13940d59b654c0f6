//! Frequent itemset mining (Apriori) and association rule generation

use std::collections::{HashMap, HashSet};
use std::fmt;

use anyhow::Context;
use clap::ValueEnum;
use tracing::{debug, info};

use crate::basket::BasketMatrix;

/// Apriori parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AprioriConfig {
    /// Minimum fraction of orders an itemset must appear in, in `(0, 1]`
    pub min_support: f64,
    /// Largest itemset size to generate; unbounded when `None`
    pub max_len: Option<usize>,
}

impl Default for AprioriConfig {
    fn default() -> Self {
        Self {
            min_support: 0.5,
            max_len: None,
        }
    }
}

impl AprioriConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.min_support > 0.0 && self.min_support <= 1.0) {
            anyhow::bail!(
                "min_support must be in (0, 1], got {}",
                self.min_support
            );
        }
        if self.max_len == Some(0) {
            anyhow::bail!("max_len must be at least 1");
        }
        Ok(())
    }
}

/// A set of products bought together in at least `min_support` of orders
#[derive(Debug, Clone, PartialEq)]
pub struct FrequentItemset {
    /// Product ids in basket column order
    pub items: Vec<String>,
    pub support: f64,
}

/// Metric used to filter generated rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuleMetric {
    Support,
    Confidence,
    Lift,
    Leverage,
    Conviction,
}

impl fmt::Display for RuleMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleMetric::Support => "support",
            RuleMetric::Confidence => "confidence",
            RuleMetric::Lift => "lift",
            RuleMetric::Leverage => "leverage",
            RuleMetric::Conviction => "conviction",
        };
        f.write_str(name)
    }
}

/// `antecedents => consequents` with its statistics
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationRule {
    pub antecedents: Vec<String>,
    pub consequents: Vec<String>,
    pub antecedent_support: f64,
    pub consequent_support: f64,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub leverage: f64,
    /// `+inf` when confidence is 1
    pub conviction: f64,
}

impl AssociationRule {
    pub fn metric(&self, metric: RuleMetric) -> f64 {
        match metric {
            RuleMetric::Support => self.support,
            RuleMetric::Confidence => self.confidence,
            RuleMetric::Lift => self.lift,
            RuleMetric::Leverage => self.leverage,
            RuleMetric::Conviction => self.conviction,
        }
    }
}

/// Find all itemsets with support at or above `config.min_support`
///
/// Candidates of size `k + 1` are joined from frequent `k`-itemsets that share
/// their first `k - 1` items, then pruned unless every `k`-subset is frequent.
///
/// # Arguments
/// * `basket` - Binary order x product matrix
/// * `config` - Support threshold and optional size limit
///
/// # Returns
/// * Frequent itemsets ordered by size, then by basket column order
pub fn apriori(
    basket: &BasketMatrix,
    config: &AprioriConfig,
) -> crate::Result<Vec<FrequentItemset>> {
    config.validate()?;

    let mut found: Vec<(Vec<usize>, f64)> = Vec::new();
    if basket.n_orders() == 0 {
        debug!("empty basket, no itemsets");
        return Ok(Vec::new());
    }

    let mut level: Vec<Vec<usize>> = Vec::new();
    for j in 0..basket.n_products() {
        let support = basket.support(&[j]);
        if support >= config.min_support {
            found.push((vec![j], support));
            level.push(vec![j]);
        }
    }

    let mut size = 1;
    while !level.is_empty() && config.max_len.map_or(true, |max| size < max) {
        let frequent: HashSet<&[usize]> = level.iter().map(Vec::as_slice).collect();
        let mut next = Vec::new();

        for (i, left) in level.iter().enumerate() {
            for right in &level[i + 1..] {
                if left[..size - 1] != right[..size - 1] {
                    continue;
                }
                let mut candidate = left.clone();
                candidate.push(right[size - 1]);

                let all_subsets_frequent = (0..candidate.len()).all(|skip| {
                    let subset: Vec<usize> = candidate
                        .iter()
                        .enumerate()
                        .filter(|(k, _)| *k != skip)
                        .map(|(_, &item)| item)
                        .collect();
                    frequent.contains(subset.as_slice())
                });
                if !all_subsets_frequent {
                    continue;
                }

                let support = basket.support(&candidate);
                if support >= config.min_support {
                    found.push((candidate.clone(), support));
                    next.push(candidate);
                }
            }
        }

        debug!(size = size + 1, itemsets = next.len(), "apriori level done");
        level = next;
        size += 1;
    }

    let products = basket.product_ids();
    let itemsets: Vec<FrequentItemset> = found
        .into_iter()
        .map(|(items, support)| FrequentItemset {
            items: items.iter().map(|&j| products[j].clone()).collect(),
            support,
        })
        .collect();

    info!(
        itemsets = itemsets.len(),
        min_support = config.min_support,
        "frequent itemsets mined"
    );
    Ok(itemsets)
}

/// Generate rules from frequent itemsets, keeping those whose `metric` is at
/// least `min_threshold`
///
/// Every itemset with two or more items is split into each non-empty
/// antecedent/consequent pair, larger antecedents first.
pub fn association_rules(
    itemsets: &[FrequentItemset],
    metric: RuleMetric,
    min_threshold: f64,
) -> crate::Result<Vec<AssociationRule>> {
    let supports: HashMap<&[String], f64> = itemsets
        .iter()
        .map(|itemset| (itemset.items.as_slice(), itemset.support))
        .collect();
    let lookup = |items: &[String]| -> crate::Result<f64> {
        supports.get(items).copied().with_context(|| {
            format!("support of {{{}}} is missing from the itemsets", items.join(", "))
        })
    };

    let mut rules = Vec::new();
    for itemset in itemsets.iter().filter(|i| i.items.len() > 1) {
        let n = itemset.items.len();
        for antecedent_len in (1..n).rev() {
            for picked in combinations(n, antecedent_len) {
                let (antecedents, consequents): (Vec<_>, Vec<_>) = itemset
                    .items
                    .iter()
                    .enumerate()
                    .partition(|(k, _)| picked.contains(k));
                let antecedents: Vec<String> =
                    antecedents.into_iter().map(|(_, item)| item.clone()).collect();
                let consequents: Vec<String> =
                    consequents.into_iter().map(|(_, item)| item.clone()).collect();

                let rule = build_rule(antecedents, consequents, lookup, itemset.support)?;
                if rule.metric(metric) >= min_threshold {
                    rules.push(rule);
                }
            }
        }
    }

    info!(
        rules = rules.len(),
        %metric,
        min_threshold,
        "association rules generated"
    );
    Ok(rules)
}

fn build_rule(
    antecedents: Vec<String>,
    consequents: Vec<String>,
    lookup: impl Fn(&[String]) -> crate::Result<f64>,
    support: f64,
) -> crate::Result<AssociationRule> {
    let antecedent_support = lookup(&antecedents)?;
    let consequent_support = lookup(&consequents)?;

    let confidence = support / antecedent_support;
    let lift = confidence / consequent_support;
    let leverage = support - antecedent_support * consequent_support;
    let conviction = if confidence >= 1.0 {
        f64::INFINITY
    } else {
        (1.0 - consequent_support) / (1.0 - confidence)
    };

    Ok(AssociationRule {
        antecedents,
        consequents,
        antecedent_support,
        consequent_support,
        support,
        confidence,
        lift,
        leverage,
        conviction,
    })
}

/// All `k`-element index combinations of `0..n` in lexicographic order
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k == 0 || k > n {
        return out;
    }
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        out.push(current.clone());
        // rightmost position that can still move forward
        let Some(pos) = (0..k).rev().find(|&i| current[i] < n - k + i) else {
            return out;
        };
        current[pos] += 1;
        for i in pos + 1..k {
            current[i] = current[i - 1] + 1;
        }
    }
}
