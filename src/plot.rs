//! SVG charts for training progress and evaluation rewards
//!
//! Written with the SVG backend, so no bitmap codecs are involved. Caption and
//! label layout still goes through plotters' font support.

use std::path::Path;

use plotters::prelude::*;

use crate::error::{Error, Result};

/// One histogram bar: `[lower, upper)`, the last bin also includes `upper`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub lower: f32,
    pub upper: f32,
    pub count: usize,
}

/// Split `values` into `bins` equal-width bins spanning their range
pub fn histogram_bins(values: &[f32], bins: usize) -> Vec<Bin> {
    let finite: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f32::INFINITY, f32::min);
    let max = finite.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    // a degenerate range still gets a visible bar
    let (min, max) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };
    let width = (max - min) / bins as f32;

    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lower: min + i as f32 * width,
            upper: min + (i + 1) as f32 * width,
            count: 0,
        })
        .collect();

    for v in finite {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

fn plot_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Plot(e.to_string())
}

/// Per-episode rewards, their rolling average and the solved threshold
pub fn plot_training_curve(
    path: &Path,
    rewards: &[f32],
    rolling: &[(usize, f32)],
    solved_threshold: f32,
) -> Result<()> {
    let root = SVGBackend::new(path, (900, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    if rewards.is_empty() {
        root.draw(&Text::new(
            "No episodes recorded",
            (450, 250),
            ("sans-serif", 20).into_font().color(&BLACK),
        ))
        .map_err(plot_err)?;
        return root.present().map_err(plot_err);
    }

    let (min_r, max_r) = rewards
        .iter()
        .chain(std::iter::once(&solved_threshold))
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), r| (lo.min(*r), hi.max(*r)));
    let pad = ((max_r - min_r) * 0.05).max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption("Training reward", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0..rewards.len(), (min_r - pad)..(max_r + pad))
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Episode")
        .y_desc("Reward")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            rewards.iter().enumerate().map(|(i, r)| (i, *r)),
            &RGBColor(180, 180, 220),
        ))
        .map_err(plot_err)?
        .label("episode reward")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RGBColor(180, 180, 220)));

    chart
        .draw_series(LineSeries::new(rolling.iter().copied(), BLUE.stroke_width(2)))
        .map_err(plot_err)?
        .label("rolling average")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .draw_series(LineSeries::new(
            [(0, solved_threshold), (rewards.len(), solved_threshold)],
            &RED,
        ))
        .map_err(plot_err)?
        .label("solved")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)
}

/// Histogram of evaluation rewards
pub fn plot_reward_histogram(path: &Path, rewards: &[f32], bins: usize) -> Result<()> {
    let root = SVGBackend::new(path, (800, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let bars = histogram_bins(rewards, bins);
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        root.draw(&Text::new(
            "No evaluation rewards",
            (400, 250),
            ("sans-serif", 20).into_font().color(&BLACK),
        ))
        .map_err(plot_err)?;
        return root.present().map_err(plot_err);
    };
    let max_count = bars.iter().map(|b| b.count).max().unwrap_or(0).max(1);

    let mut chart = ChartBuilder::on(&root)
        .caption("Evaluation reward distribution", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(first.lower..last.upper, 0..max_count + 1)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Episode reward")
        .y_desc("Episodes")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(bars.iter().map(|b| {
            Rectangle::new([(b.lower, 0), (b.upper, b.count)], BLUE.mix(0.6).filled())
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bins_cover_range() {
        let bins = histogram_bins(&[-100.0, 0.0, 50.0, 100.0, 100.0], 4);

        assert_eq!(bins.len(), 4);
        assert_eq!(bins[0].lower, -100.0);
        assert_eq!(bins[3].upper, 100.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
        // the maximum lands in the last bin
        assert_eq!(bins[3].count, 3);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[2].count, 1);
    }

    #[test]
    fn test_degenerate_range() {
        let bins = histogram_bins(&[200.0, 200.0], 3);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert!(bins[0].lower < 200.0 && bins[2].upper > 200.0);
    }

    #[test]
    fn test_empty_and_non_finite() {
        assert!(histogram_bins(&[], 10).is_empty());
        assert!(histogram_bins(&[1.0], 0).is_empty());
        assert!(histogram_bins(&[f32::NAN], 5).is_empty());
        let bins = histogram_bins(&[f32::NAN, 1.0, 2.0], 2);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }
}
