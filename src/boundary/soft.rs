use crate::model::{DocumentBoundary, PageFeatures};

const DENSITY_DRIFT: f64 = 0.3;
const FONT_RATIO_HIGH: f64 = 1.5;
const FONT_RATIO_LOW: f64 = 0.67;

const DENSITY_WEIGHT: f64 = 0.15;
const FONT_SIZE_WEIGHT: f64 = 0.15;
const LAYOUT_WEIGHT: f64 = 0.1;
const RESET_WEIGHT: f64 = 0.2;
const SOFT_THRESHOLD: f64 = 0.3;

const RESET_CONFIDENCE: f64 = 0.7;
const RESET_INDICATOR: &str = "page numbering reset";

struct Opening {
    page: usize,
    confidence: f64,
    indicators: Vec<String>,
}

/// Style and layout drift between neighbouring pages, independent of markers.
pub(super) fn soft_boundaries(pages: &[PageFeatures]) -> Vec<DocumentBoundary> {
    let openings = pages
        .windows(2)
        .enumerate()
        .filter_map(|(index, pair)| {
            let (previous, page) = (&pair[0], &pair[1]);
            let mut confidence = 0.0;
            let mut indicators = Vec::new();

            if (page.text_density - previous.text_density).abs() > DENSITY_DRIFT {
                confidence += DENSITY_WEIGHT;
                indicators.push("text density change".to_string());
            }

            if let (Some(current_size), Some(previous_size)) =
                (page.mean_font_size(), previous.mean_font_size())
            {
                let ratio = current_size / previous_size;
                if !(FONT_RATIO_LOW..=FONT_RATIO_HIGH).contains(&ratio) {
                    confidence += FONT_SIZE_WEIGHT;
                    indicators.push("font size change".to_string());
                }
            }

            if page.structural_hash != previous.structural_hash {
                confidence += LAYOUT_WEIGHT;
                indicators.push("layout change".to_string());
            }

            if is_numbering_reset(previous, page) {
                confidence += RESET_WEIGHT;
                indicators.push(RESET_INDICATOR.to_string());
            }

            // Tolerates sums such as 0.15 + 0.15 landing a hair under 0.3.
            (confidence + 1e-9 >= SOFT_THRESHOLD).then(|| Opening {
                page: index + 1,
                confidence: f64::min(confidence, 1.0),
                indicators,
            })
        })
        .collect::<Vec<Opening>>();

    close_openings(openings, pages.len())
}

/// Printed page numbers restarting at 1 after having passed 1.
pub(super) fn numbering_reset_boundaries(pages: &[PageFeatures]) -> Vec<DocumentBoundary> {
    let openings = pages
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| is_numbering_reset(&pair[0], &pair[1]))
        .map(|(index, _)| Opening {
            page: index + 1,
            confidence: RESET_CONFIDENCE,
            indicators: vec![RESET_INDICATOR.to_string()],
        })
        .collect::<Vec<Opening>>();

    close_openings(openings, pages.len())
}

fn is_numbering_reset(previous: &PageFeatures, page: &PageFeatures) -> bool {
    matches!(
        (previous.printed_page_number, page.printed_page_number),
        (Some(before), Some(1)) if before > 1
    )
}

/// Each opening runs until the page before the next one, the last to the end.
fn close_openings(openings: Vec<Opening>, page_count: usize) -> Vec<DocumentBoundary> {
    let next_starts = openings
        .iter()
        .skip(1)
        .map(|opening| opening.page)
        .chain(std::iter::once(page_count))
        .collect::<Vec<usize>>();

    openings
        .into_iter()
        .zip(next_starts)
        .map(|(opening, next_start)| DocumentBoundary {
            start_page: opening.page,
            end_page: next_start.saturating_sub(1).max(opening.page),
            confidence: opening.confidence,
            document_type_hint: None,
            title: None,
            indicators: opening.indicators,
            bates_range: None,
        })
        .collect()
}
