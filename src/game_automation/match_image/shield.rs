//! Colour patch correlation for shield icons
//!
//! Shields only render inside the two board bands, so every scan is restricted to a
//! rectangle of the frame. Each patch is slid over that crop and scored with a
//! mean-subtracted normalised correlation summed over the three colour channels.

use super::region::SearchRegion;
use super::template::is_image_file;
use image::RgbImage;
use std::path::Path;

/// Correlation floor for a shield hit
pub const MIN_SHIELD_CONFIDENCE: f32 = 0.75;

/// Absolute screen coordinate of a matched shield centre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShieldTarget {
    pub x: u32,
    pub y: u32,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub struct ShieldScanner {
    patches: Vec<RgbImage>,
    min_confidence: f32,
}

impl ShieldScanner {
    pub fn new(patches: Vec<RgbImage>) -> Self {
        Self {
            patches,
            min_confidence: MIN_SHIELD_CONFIDENCE,
        }
    }

    /// Load every image in `dir`; a missing or empty directory gives a scanner that never hits
    pub fn load(dir: &Path) -> Self {
        let Ok(entries) = std::fs::read_dir(dir) else {
            log::warn!("⚠️ Shield directory {} not found, shield detection disabled", dir.display());
            return Self::new(Vec::new());
        };

        let mut paths: Vec<_> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| is_image_file(p))
            .collect();
        paths.sort();

        let patches: Vec<RgbImage> = paths
            .iter()
            .filter_map(|p| match image::open(p) {
                Ok(img) => Some(img.to_rgb8()),
                Err(e) => {
                    log::warn!("⚠️ Shield patch {} not loaded: {}", p.display(), e);
                    None
                }
            })
            .collect();
        log::info!("🛡️ Loaded {} shield patches from {}", patches.len(), dir.display());
        Self::new(patches)
    }

    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Every location in `region` where any patch correlates at or above the floor, best first
    pub fn scan(&self, frame: &RgbImage, region: SearchRegion) -> Vec<ShieldTarget> {
        if self.patches.is_empty() {
            return Vec::new();
        }
        let region = region.clip_to(frame.width(), frame.height());
        if !region.is_valid() {
            return Vec::new();
        }
        let crop =
            image::imageops::crop_imm(frame, region.x, region.y, region.width, region.height)
                .to_image();
        let integral = ChannelIntegrals::new(&crop);

        let mut targets = Vec::new();
        for patch in &self.patches {
            for (x, y, confidence) in correlate(&crop, &integral, patch, self.min_confidence) {
                targets.push(ShieldTarget {
                    x: region.x + x + patch.width() / 2,
                    y: region.y + y + patch.height() / 2,
                    confidence,
                });
            }
        }
        rank_targets(targets)
    }

    /// Opponent band: at most the single best target
    pub fn scan_enemy(&self, frame: &RgbImage, region: SearchRegion) -> Option<ShieldTarget> {
        self.scan(frame, region).into_iter().next()
    }

    /// Own band: every hit, best first
    pub fn scan_own(&self, frame: &RgbImage, region: SearchRegion) -> Vec<ShieldTarget> {
        self.scan(frame, region)
    }
}

/// Sort targets by descending confidence
pub fn rank_targets(mut targets: Vec<ShieldTarget>) -> Vec<ShieldTarget> {
    targets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    targets
}

// Summed-area tables of value and squared value per channel, (w+1)x(h+1)
struct ChannelIntegrals {
    stride: usize,
    sum: [Vec<f64>; 3],
    sq: [Vec<f64>; 3],
}

impl ChannelIntegrals {
    fn new(img: &RgbImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stride = w + 1;
        let table = vec![0.0; stride * (h + 1)];
        let mut sum = [table.clone(), table.clone(), table.clone()];
        let mut sq = [table.clone(), table.clone(), table];
        for y in 0..h {
            let mut row_sum = [0.0f64; 3];
            let mut row_sq = [0.0f64; 3];
            for x in 0..w {
                let px = img.get_pixel(x as u32, y as u32).0;
                let at = (y + 1) * stride + x + 1;
                let above = y * stride + x + 1;
                for c in 0..3 {
                    let v = px[c] as f64;
                    row_sum[c] += v;
                    row_sq[c] += v * v;
                    sum[c][at] = sum[c][above] + row_sum[c];
                    sq[c][at] = sq[c][above] + row_sq[c];
                }
            }
        }
        Self { stride, sum, sq }
    }

    fn window(table: &[f64], stride: usize, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let a = table[y * stride + x];
        let b = table[y * stride + x + w];
        let c = table[(y + h) * stride + x];
        let d = table[(y + h) * stride + x + w];
        d - b - c + a
    }

    // Sum over channels of the window's centred sum of squares
    fn centred_energy(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let n = (w * h) as f64;
        (0..3)
            .map(|c| {
                let s = Self::window(&self.sum[c], self.stride, x, y, w, h);
                let s2 = Self::window(&self.sq[c], self.stride, x, y, w, h);
                (s2 - s * s / n).max(0.0)
            })
            .sum()
    }
}

/// Slide `patch` over `img`, returning `(x, y, score)` for every placement at or above `floor`
fn correlate(
    img: &RgbImage,
    integral: &ChannelIntegrals,
    patch: &RgbImage,
    floor: f32,
) -> Vec<(u32, u32, f32)> {
    let (pw, ph) = (patch.width() as usize, patch.height() as usize);
    let (iw, ih) = (img.width() as usize, img.height() as usize);
    if pw == 0 || ph == 0 || pw > iw || ph > ih {
        return Vec::new();
    }

    // Centre the patch per channel so only the image window's variance matters in the numerator
    let n = (pw * ph) as f64;
    let mut means = [0.0f64; 3];
    for px in patch.pixels() {
        for c in 0..3 {
            means[c] += px.0[c] as f64;
        }
    }
    for m in means.iter_mut() {
        *m /= n;
    }
    let centred: Vec<[f64; 3]> = patch
        .pixels()
        .map(|px| {
            [
                px.0[0] as f64 - means[0],
                px.0[1] as f64 - means[1],
                px.0[2] as f64 - means[2],
            ]
        })
        .collect();
    let patch_energy: f64 = centred.iter().map(|p| p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sum();
    if patch_energy <= f64::EPSILON {
        return Vec::new();
    }

    let raw = img.as_raw();
    let row_len = iw * 3;
    let mut hits = Vec::new();
    for y in 0..=(ih - ph) {
        for x in 0..=(iw - pw) {
            let window_energy = integral.centred_energy(x, y, pw, ph);
            let denom = (patch_energy * window_energy).sqrt();
            if denom <= f64::EPSILON {
                continue;
            }
            let mut num = 0.0;
            for py in 0..ph {
                let row = &raw[(y + py) * row_len + x * 3..(y + py) * row_len + (x + pw) * 3];
                let prow = &centred[py * pw..(py + 1) * pw];
                for (px, t) in row.chunks_exact(3).zip(prow) {
                    num += px[0] as f64 * t[0] + px[1] as f64 * t[1] + px[2] as f64 * t[2];
                }
            }
            let score = (num / denom) as f32;
            if score >= floor {
                hits.push((x as u32, y as u32, score));
            }
        }
    }
    hits
}
