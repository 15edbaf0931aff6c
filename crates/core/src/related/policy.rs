//! Selection policies over harvested link bags
//!
//! Pure set algebra and weighting, no I/O. The resolver harvests the
//! bags; these functions turn them into the final ranked title list.

use super::SelectionMethod;
use std::collections::{HashMap, HashSet};

/// Harvested links, partitioned by direction and role
///
/// The `title` bags come from the focal article; the `related` bags are
/// the concatenation of every companion article's links of that
/// direction. Duplicates are kept, they carry weighting information.
#[derive(Debug, Default, Clone)]
pub(crate) struct LinkBags {
    pub back_title: Vec<String>,
    pub back_related: Vec<String>,
    pub fwd_title: Vec<String>,
    pub fwd_related: Vec<String>,
}

impl LinkBags {
    pub fn push(&mut self, direction_is_back: bool, is_focal: bool, links: Vec<String>) {
        let bag = match (direction_is_back, is_focal) {
            (true, true) => &mut self.back_title,
            (true, false) => &mut self.back_related,
            (false, true) => &mut self.fwd_title,
            (false, false) => &mut self.fwd_related,
        };
        bag.extend(links);
    }
}

/// Policy output: ranked related titles, their weights, and the weight
/// assigned to every control-set entry
#[derive(Debug, Clone)]
pub(crate) struct Selection {
    pub titles: Vec<String>,
    pub weights: Vec<f64>,
    pub control_weight: f64,
}

/// Single-article case: no companions were supplied, every focal link
/// counts with weight 1
pub(crate) fn solo(bags: &LinkBags) -> Selection {
    let titles: Vec<String> = bags
        .back_title
        .iter()
        .chain(bags.fwd_title.iter())
        .cloned()
        .collect();
    let weights = vec![1.0; titles.len()];

    Selection {
        titles,
        weights,
        control_weight: 1.0,
    }
}

/// Apply the configured policy to bags harvested with companions
pub(crate) fn select(method: SelectionMethod, bags: &LinkBags) -> Selection {
    match method {
        SelectionMethod::Restrict => restrict(bags),
        SelectionMethod::Extend => extend(bags),
        SelectionMethod::Weight => weight(bags),
    }
}

/// Keep only focal links echoed by at least one companion, per direction
fn restrict(bags: &LinkBags) -> Selection {
    let back_related: HashSet<&str> = bags.back_related.iter().map(String::as_str).collect();
    let fwd_related: HashSet<&str> = bags.fwd_related.iter().map(String::as_str).collect();

    let titles: Vec<String> = bags
        .back_title
        .iter()
        .filter(|title| back_related.contains(title.as_str()))
        .chain(
            bags.fwd_title
                .iter()
                .filter(|title| fwd_related.contains(title.as_str())),
        )
        .cloned()
        .collect();
    let weights = vec![1.0; titles.len()];

    Selection {
        titles,
        weights,
        control_weight: 1.0,
    }
}

/// Union of focal and companion links, duplicates retained
fn extend(bags: &LinkBags) -> Selection {
    let titles: Vec<String> = bags
        .back_title
        .iter()
        .chain(bags.back_related.iter())
        .chain(bags.fwd_title.iter())
        .chain(bags.fwd_related.iter())
        .cloned()
        .collect();
    let weights = vec![1.0; titles.len()];

    Selection {
        titles,
        weights,
        control_weight: 1.0,
    }
}

/// Frequency weighting: reward focal links echoed by companions, assign
/// a sub-unit weight to links only the companions carry
///
/// The denominator is the size of the concatenation of all four bags.
fn weight(bags: &LinkBags) -> Selection {
    let denom = (bags.back_title.len()
        + bags.fwd_title.len()
        + bags.back_related.len()
        + bags.fwd_related.len()) as f64;

    let focal: Vec<&str> = bags
        .back_title
        .iter()
        .chain(bags.fwd_title.iter())
        .map(String::as_str)
        .collect();
    let companion: Vec<&str> = bags
        .back_related
        .iter()
        .chain(bags.fwd_related.iter())
        .map(String::as_str)
        .collect();

    let mut companion_counts: HashMap<&str, usize> = HashMap::new();
    for &title in &companion {
        *companion_counts.entry(title).or_insert(0) += 1;
    }

    let focal_set: HashSet<&str> = focal.iter().copied().collect();

    let mut titles: Vec<String> = Vec::new();
    let mut weights: Vec<f64> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    // Focal links first, in first-occurrence order
    for &title in &focal {
        if seen.insert(title) {
            let echoes = companion_counts.get(title).copied().unwrap_or(0) as f64;
            titles.push(title.to_string());
            weights.push(1.0 + (echoes + 1.0) / (denom + 1.0));
        }
    }

    // Companion-only links after, in first-occurrence order
    for &title in &companion {
        if focal_set.contains(title) || !seen.insert(title) {
            continue;
        }
        let count = companion_counts.get(title).copied().unwrap_or(0) as f64;
        titles.push(title.to_string());
        weights.push(count / (denom + 1.0));
    }

    let control_weight = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let control_weight = if control_weight.is_finite() {
        control_weight
    } else {
        1.0
    };

    Selection {
        titles,
        weights,
        control_weight,
    }
}
