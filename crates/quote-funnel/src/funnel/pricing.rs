use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::answers::Answers;
use super::catalog::{NONE_VALUE, OTHER_VALUE};

/// Additive `{min, max}` contribution, in whole GEL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    pub min: i64,
    pub max: i64,
}

impl PriceBand {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    const ZERO: Self = Self::new(0, 0);

    fn add(&mut self, other: Self) {
        self.min += other.min;
        self.max += other.max;
    }
}

/// Quote shown on the final step: the current (discounted) range and the
/// higher reference range it is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRange {
    pub current_min: u32,
    pub current_max: u32,
    pub reference_min: u32,
    pub reference_max: u32,
}

impl EstimateRange {
    pub fn describe(&self, currency: &str) -> String {
        format!(
            "{}-{} {currency} (regular price {}-{} {currency})",
            self.current_min, self.current_max, self.reference_min, self.reference_max
        )
    }
}

/// Every coefficient of the price model. Factors are whole percentages so
/// the arithmetic stays exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingModel {
    pub currency: String,
    pub base_ranges: BTreeMap<String, PriceBand>,
    pub business_modifiers: BTreeMap<String, PriceBand>,
    pub free_page_count: usize,
    pub per_extra_page: PriceBand,
    pub feature_costs: BTreeMap<String, PriceBand>,
    pub branding_costs: BTreeMap<String, PriceBand>,
    pub timeline_modifiers: BTreeMap<String, PriceBand>,
    pub discount_percent: i64,
    pub absolute_minimum: i64,
    pub minimum_spread: i64,
    pub rounding_step: i64,
    pub reference_min_markup_percent: i64,
    pub reference_max_markup_percent: i64,
    /// Website type exempt from the ceiling.
    pub uncapped_website_type: String,
    pub category_ceiling: i64,
}

fn bands(entries: &[(&str, i64, i64)]) -> BTreeMap<String, PriceBand> {
    entries
        .iter()
        .map(|(key, min, max)| (key.to_string(), PriceBand::new(*min, *max)))
        .collect()
}

impl PricingModel {
    pub fn standard() -> Self {
        Self {
            currency: "GEL".to_string(),
            base_ranges: bands(&[
                ("landing", 500, 900),
                ("informational", 900, 1600),
                ("corporate", 1800, 3200),
                ("ecommerce", 3000, 6000),
            ]),
            business_modifiers: bands(&[
                ("restaurant", 100, 200),
                ("retail", 150, 300),
                ("beauty", 50, 150),
                ("medical", 200, 400),
                ("realestate", 200, 350),
                ("education", 100, 250),
                ("tourism", 150, 300),
                ("services", 0, 100),
                (OTHER_VALUE, 100, 200),
            ]),
            free_page_count: 4,
            per_extra_page: PriceBand::new(80, 150),
            feature_costs: bands(&[
                ("contact_form", 50, 100),
                ("booking", 300, 600),
                ("online_payment", 400, 800),
                ("multilingual", 300, 600),
                ("blog_cms", 200, 400),
                ("live_chat", 100, 200),
                ("google_maps", 30, 60),
                ("social_integration", 80, 150),
                ("seo", 250, 500),
                ("analytics", 60, 120),
                (NONE_VALUE, 0, 0),
            ]),
            branding_costs: bands(&[
                ("logo", 200, 450),
                ("brand_identity", 500, 1000),
                ("copywriting", 150, 400),
                ("photography", 250, 600),
            ]),
            timeline_modifiers: bands(&[
                ("urgent", 300, 600),
                ("standard", 0, 0),
                ("flexible", -50, -100),
                ("exploring", -100, -200),
            ]),
            discount_percent: 85,
            absolute_minimum: 400,
            minimum_spread: 200,
            rounding_step: 10,
            reference_min_markup_percent: 125,
            reference_max_markup_percent: 135,
            uncapped_website_type: "ecommerce".to_string(),
            category_ceiling: 5000,
        }
    }

    /// Number of pages counted towards the page surcharge.
    pub fn page_count(answers: &Answers) -> usize {
        let listed = answers
            .pages
            .iter()
            .filter(|page| page.as_str() != OTHER_VALUE)
            .count();
        let extra = usize::from(!answers.pages_other.trim().is_empty());
        listed + extra
    }

    /// Compute the quote, or `None` when no known website type was chosen.
    pub fn estimate(&self, answers: &Answers) -> Option<EstimateRange> {
        let mut total = *self.base_ranges.get(answers.website_type.as_str())?;

        if let Some(modifier) = self.business_modifiers.get(answers.business_type.as_str()) {
            total.add(*modifier);
        }

        let extra_pages = Self::page_count(answers).saturating_sub(self.free_page_count) as i64;
        total.add(PriceBand::new(
            self.per_extra_page.min * extra_pages,
            self.per_extra_page.max * extra_pages,
        ));

        for feature in &answers.features {
            total.add(self.feature_costs.get(feature).copied().unwrap_or(PriceBand::ZERO));
        }

        if !answers.branding.contains(NONE_VALUE) {
            for item in &answers.branding {
                total.add(self.branding_costs.get(item).copied().unwrap_or(PriceBand::ZERO));
            }
        }

        if let Some(modifier) = self.timeline_modifiers.get(answers.timeline.as_str()) {
            total.add(*modifier);
        }

        // Work in hundredths of a GEL until rounding.
        let min = (total.min * self.discount_percent).max(self.absolute_minimum * 100);
        let max = (total.max * self.discount_percent).max(min + self.minimum_spread * 100);

        let current_min = self.round_hundredths(min);
        let current_max = self.round_hundredths(max);
        let reference_min = self.round_hundredths(current_min * self.reference_min_markup_percent);
        let reference_max = self.round_hundredths(current_max * self.reference_max_markup_percent);

        let mut current = (current_min, current_max);
        let mut reference = (reference_min, reference_max);
        if answers.website_type != self.uncapped_website_type {
            current = self.cap(current);
            reference = self.cap(reference);
        }

        Some(EstimateRange {
            current_min: to_amount(current.0),
            current_max: to_amount(current.1),
            reference_min: to_amount(reference.0),
            reference_max: to_amount(reference.1),
        })
    }

    /// Round an amount in hundredths to the nearest `rounding_step` GEL, halves up.
    fn round_hundredths(&self, hundredths: i64) -> i64 {
        let step = self.rounding_step.max(1);
        let unit = step * 100;
        (hundredths + unit / 2).div_euclid(unit) * step
    }

    fn cap(&self, (min, max): (i64, i64)) -> (i64, i64) {
        let max = max.min(self.category_ceiling);
        let min = min.min(self.category_ceiling).min(max);
        (min, max)
    }
}

impl Default for PricingModel {
    fn default() -> Self {
        Self::standard()
    }
}

fn to_amount(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
