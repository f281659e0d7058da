//! Field-fill policy for writing a fresh extraction onto a stored intent.

use crate::types::IntentRecord;

/// How a fresh extraction is combined with what the inquiry already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// The fresh record replaces the stored one.
    Force,
    /// Only fields that are empty on the stored record are filled.
    #[default]
    FillEmptyOnly,
}

impl MergePolicy {
    /// Policy for a batch run.
    pub fn from_force(force: bool) -> Self {
        if force {
            Self::Force
        } else {
            Self::FillEmptyOnly
        }
    }
}

/// Merge `fresh` into `stored` according to `policy`.
///
/// With [`MergePolicy::FillEmptyOnly`], a field counts as empty when it is
/// `None` or an empty list. Classification fields (`inquiry_kind`, `language`,
/// `extraction_mode`) follow the fresh record when the stored one had no
/// content at all, otherwise they are kept.
pub fn merge_intent(
    stored: Option<&IntentRecord>,
    fresh: IntentRecord,
    policy: MergePolicy,
) -> IntentRecord {
    let Some(stored) = stored else {
        return fresh;
    };
    if policy == MergePolicy::Force {
        return fresh;
    }

    let mut merged = stored.clone();
    fill(&mut merged.region, fresh.region);
    fill(&mut merged.location, fresh.location);
    fill(&mut merged.date_from, fresh.date_from);
    fill(&mut merged.date_to, fresh.date_to);
    fill(&mut merged.date_window, fresh.date_window);
    fill(&mut merged.nights, fresh.nights);
    fill(&mut merged.adults, fresh.adults);
    fill(&mut merged.children_count, fresh.children_count);
    fill(&mut merged.budget_per_night, fresh.budget_per_night);
    fill_list(&mut merged.children, fresh.children);
    fill_list(&mut merged.party_groups, fresh.party_groups);
    fill_list(&mut merged.wants, fresh.wants);

    if is_blank(stored) {
        merged.inquiry_kind = fresh.inquiry_kind;
        merged.language = fresh.language;
        merged.extraction_mode = fresh.extraction_mode;
    }
    merged
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn fill_list<T>(slot: &mut Vec<T>, value: Vec<T>) {
    if slot.is_empty() {
        *slot = value;
    }
}

fn is_blank(intent: &IntentRecord) -> bool {
    intent.region.is_none()
        && intent.location.is_none()
        && intent.date_from.is_none()
        && intent.date_to.is_none()
        && intent.date_window.is_none()
        && intent.nights.is_none()
        && intent.adults.is_none()
        && intent.children.is_empty()
        && intent.party_groups.is_empty()
        && intent.budget_per_night.is_none()
        && intent.wants.is_empty()
}
