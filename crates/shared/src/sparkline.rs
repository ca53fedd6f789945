//! SVG path data for the price sparklines in the coin table.

pub const SPARKLINE_WIDTH: f64 = 100.0;
pub const SPARKLINE_HEIGHT: f64 = 40.0;

/// Line through `prices`, scaled into a `width` x `height` viewbox.
///
/// The lowest sample sits on the bottom edge and the highest one unit below
/// the top. `None` when there are fewer than two samples.
pub fn sparkline_path(prices: &[f64], width: f64, height: f64) -> Option<String> {
    if prices.len() < 2 {
        return None;
    }

    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if max - min == 0.0 { 1.0 } else { max - min };
    let last = (prices.len() - 1) as f64;

    let segments: Vec<String> = prices
        .iter()
        .enumerate()
        .map(|(i, price)| {
            let x = i as f64 / last * width;
            let y = height - (price - min) / range * (height - 2.0);
            let command = if i == 0 { 'M' } else { 'L' };
            format!("{} {} {}", command, x, y)
        })
        .collect();

    Some(segments.join(" "))
}

/// The sparkline closed down to the baseline, for the gradient fill.
pub fn sparkline_area_path(prices: &[f64], width: f64, height: f64) -> Option<String> {
    let line = sparkline_path(prices, width, height)?;
    Some(format!("{} L {} {} L 0 {} Z", line, width, height, height))
}
