//! Merge of weighted variant hits.
//!
//! Hits from the same source retrieved under different query variants merge
//! on `(kind, file, line, line_end, name)` with a cumulative weighted score
//! plus a small bonus for appearing under multiple variants. The result is
//! explicitly sorted; nothing relies on map iteration order.

use std::collections::BTreeMap;

/// Bonus per extra variant that surfaced the same hit.
const MULTI_VARIANT_BONUS: f32 = 0.05;

/// One raw retrieval hit before blending.
#[derive(Debug, Clone)]
pub struct RawHit {
    pub kind: String,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub line_end: u32,
    pub score: f32,
    /// Text-index document id when the hit came from the text path.
    pub doc_id: String,
    pub title: String,
}

/// Merges per-variant result lists. `lists` pairs each variant weight with
/// its hits; scores accumulate as `Σ score × weight` and every repeat
/// appearance adds [`MULTI_VARIANT_BONUS`].
pub fn merge_weighted(lists: &[(f32, Vec<RawHit>)]) -> Vec<RawHit> {
    let mut merged: BTreeMap<(String, String, u32, u32, String), (RawHit, usize)> =
        BTreeMap::new();

    for (weight, hits) in lists {
        for hit in hits {
            let key = (
                hit.kind.clone(),
                hit.file.clone(),
                hit.line,
                hit.line_end,
                hit.name.clone(),
            );
            match merged.get_mut(&key) {
                Some((acc, matches)) => {
                    acc.score += hit.score * weight;
                    *matches += 1;
                }
                None => {
                    let mut first = hit.clone();
                    first.score = hit.score * weight;
                    merged.insert(key, (first, 1));
                }
            }
        }
    }

    let mut out: Vec<RawHit> = merged
        .into_values()
        .map(|(mut hit, matches)| {
            if matches > 1 {
                hit.score += MULTI_VARIANT_BONUS * (matches as f32 - 1.0);
            }
            hit
        })
        .collect();

    out.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line.cmp(&b.line))
    });
    out
}
