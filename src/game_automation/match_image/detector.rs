//! Screen classification by grayscale template matching

use super::template::{Template, TemplateAction, TemplateRegistry};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::template_matching::{MatchTemplateMethod, find_extremes, match_template_parallel};

type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;
type SumTable = ImageBuffer<Luma<u64>, Vec<u64>>;

// Windows flatter than this (mean squared deviation) have no shape to correlate against
const MIN_WINDOW_VARIANCE: f64 = 1.0;

/// Best placement of one template in one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Top-left corner of the best placement; `None` when nothing could be matched
    pub location: Option<(u32, u32)>,
    pub score: f32,
}

impl MatchResult {
    pub const NONE: MatchResult = MatchResult {
        location: None,
        score: 0.0,
    };
}

/// Slide `template` over `frame` and return the highest mean-subtracted normalised
/// cross-correlation.
///
/// A missing template, or one larger than the frame, yields `MatchResult::NONE`.
pub fn best_match(frame: &GrayImage, template: Option<&Template>) -> MatchResult {
    let Some(template) = template else {
        return MatchResult::NONE;
    };
    if template.width == 0
        || template.height == 0
        || template.width > frame.width()
        || template.height > frame.height()
    {
        return MatchResult::NONE;
    }

    let scores = zero_mean_scores(frame, &template.image);
    let extremes = find_extremes(&scores);
    if !extremes.max_value.is_finite() {
        return MatchResult::NONE;
    }
    MatchResult {
        location: Some(extremes.max_value_location),
        score: extremes.max_value,
    }
}

/// Correlation coefficient of `template` at every top-left placement in `frame`.
///
/// The raw cross-correlation comes from imageproc; window sums from integral images turn
/// it into `sum((I - mean_I) * (T - mean_T)) / sqrt(energy_I * energy_T)`. Flat windows
/// and flat templates score 0.
fn zero_mean_scores(frame: &GrayImage, template: &GrayImage) -> ScoreMap {
    let (tw, th) = template.dimensions();
    let n = f64::from(tw * th);
    let t_mean = template.pixels().map(|p| f64::from(p[0])).sum::<f64>() / n;
    let t_energy: f64 = template
        .pixels()
        .map(|p| {
            let d = f64::from(p[0]) - t_mean;
            d * d
        })
        .sum();

    let raw = match_template_parallel(frame, template, MatchTemplateMethod::CrossCorrelation);
    if t_energy <= f64::EPSILON {
        return ScoreMap::new(raw.width(), raw.height());
    }

    let sums: SumTable = integral_image::<_, u64>(frame);
    let squares: SumTable = integral_squared_image::<_, u64>(frame);
    ScoreMap::from_fn(raw.width(), raw.height(), |x, y| {
        let s = window_sum(&sums, x, y, tw, th) as f64;
        let w_energy = window_sum(&squares, x, y, tw, th) as f64 - s * s / n;
        if w_energy < MIN_WINDOW_VARIANCE * n {
            return Luma([0.0]);
        }
        // sum(I * (T - mean_T)) == sum(I * T) - mean_T * sum(I)
        let num = f64::from(raw.get_pixel(x, y)[0]) - t_mean * s;
        Luma([(num / (t_energy * w_energy).sqrt()).clamp(-1.0, 1.0) as f32])
    })
}

// Sum over the w x h window at (x, y); tables carry a leading zero row and column
fn window_sum(table: &SumTable, x: u32, y: u32, w: u32, h: u32) -> u64 {
    let at = |x: u32, y: u32| table.get_pixel(x, y)[0];
    (at(x + w, y + h) + at(x, y)) - (at(x + w, y) + at(x, y + h))
}

/// A template recognised in the current frame
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub key: String,
    pub label: String,
    pub action: TemplateAction,
    pub location: (u32, u32),
    pub score: f32,
    pub width: u32,
    pub height: u32,
}

impl Detection {
    /// Centre of the matched area, where taps go
    pub fn center(&self) -> (u32, u32) {
        (
            self.location.0 + self.width / 2,
            self.location.1 + self.height / 2,
        )
    }
}

/// Run every registered template in order and return the first one above its threshold
pub fn classify(frame: &GrayImage, registry: &TemplateRegistry) -> Option<Detection> {
    registry.iter().find_map(|template| {
        let result = best_match(frame, Some(template));
        match result.location {
            Some(location) if result.score >= template.threshold => Some(Detection {
                key: template.name.clone(),
                label: template.label.clone(),
                action: template.action,
                location,
                score: result.score,
                width: template.width,
                height: template.height,
            }),
            _ => None,
        }
    })
}

/// Score a single named template, used for the start-up match probe
pub fn score_of(frame: &GrayImage, registry: &TemplateRegistry, key: &str) -> MatchResult {
    best_match(frame, registry.get(key))
}
